//! A decoder and gap checker for IMAP MAG CCSDS science packets.
//!
//! The magnetometer instrument downlinks vectors as either full-width
//! samples or, in its normal science modes, a differentially-compressed
//! stream (Fibonacci/zig-zag-coded residuals against the previous vector).
//! This crate turns that raw CCSDS telemetry into per-sensor CSV rows
//! ([`decoder`], [`row`], [`writer`]) and checks decoded CSVs for sequence
//! gaps, timing drift, and malformed vectors ([`checker`], [`summary`]).
//!
//! Common abbreviations:
//!
//! - CCSDS: Consultative Committee for Space Data Systems;
//! - APID: application process identifier;
//! - FOB/FIB: outboard/inboard fluxgate magnetometer sensors;
//! - HDR: high dynamic range (the fixed-width escape from differential coding);
//! - IMAP: Interstellar Mapping and Acceleration Probe.

pub mod bitcursor;
pub mod checker;
pub mod decoder;
pub mod error;
pub mod fibonacci;
pub mod mode;
pub mod packet;
pub mod row;
pub mod summary;
pub mod time;
pub mod vector;
pub mod writer;
pub mod zigzag;

pub use checker::{check, CheckReport};
pub use decoder::{decode_packet_rows, decode_stream, DecodeSummary};
pub use error::{CheckFinding, CheckFindingKind, DecodeError, Sensor};
pub use mode::{Mode, ModeConfig};
pub use packet::{CcsdsPrimaryHeader, SciencePacket, SecondaryHeader};
pub use row::DecodedRow;
pub use summary::{summarize_directory, DirectorySummary, FileSummary};
pub use vector::Vector;
pub use writer::ScienceFileWriter;
