//! Error and diagnostic taxonomies for the decoder and the gap checker.

use std::fmt;

/// Which physical/logical sensor channel a diagnostic or field refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Sensor {
    Primary,
    Secondary,
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sensor::Primary => write!(f, "primary"),
            Sensor::Secondary => write!(f, "secondary"),
        }
    }
}

/// Errors raised while decoding a single science packet's vector payload.
///
/// A `DecodeError` against one packet causes that packet to be skipped
/// (§7 of the decoder contract); it never aborts the whole capture.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// The bit cursor ran past the end of the payload buffer.
    #[error("truncated payload: needed {needed} more bit(s), {available} available")]
    TruncatedPayload { needed: usize, available: usize },

    /// No `"11"` terminator was found before the end of the bit-string view.
    #[error("unterminated Fibonacci code starting at bit {start}")]
    UnterminatedFibCode { start: usize },

    /// `reference_width_bits` was 0 or greater than 20.
    #[error("invalid compression reference width: {width} bits")]
    InvalidCompressionWidth { width: u32 },

    /// The packet's APID does not identify a supported science stream.
    #[error("unsupported APID: {apid:#05x}")]
    UnsupportedApid { apid: u16 },
}

/// One diagnostic produced by the gap checker for a single row or packet.
///
/// Each variant carries a stable [`kind`](CheckFinding::kind) and canonical
/// phrase (matched verbatim by the summary aggregator) plus enough context
/// to render a human-readable line.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CheckFinding {
    #[error("Packet has too many rows. line number {line}, sequence count: {sequence}")]
    TooManyRows { line: usize, sequence: u16 },

    #[error(
        "Vectors are all zero for {sensor} on line number {line}, sequence count: {sequence}"
    )]
    VectorsAllZero {
        line: usize,
        sequence: u16,
        sensor: Sensor,
    },

    #[error(
        "Non sequential packet detected! line number {line}, sequence count: {sequence}, vector number {vector_number}"
    )]
    NonSequential {
        line: usize,
        sequence: u16,
        vector_number: usize,
    },

    #[error(
        "Expected {expected} vectors in packet but found {actual} ({sensor} packet is incomplete). line number {line}, sequence count: {sequence}"
    )]
    PacketIncomplete {
        line: usize,
        sequence: u16,
        sensor: Sensor,
        expected: usize,
        actual: usize,
    },

    #[error("Expected line {line} to have a numeric value in column \"{column}\"")]
    ExpectedNumeric { line: usize, column: String },

    #[error(
        "Sequence numbers vary within packet. line number {line}, sequence count: {sequence}"
    )]
    SequenceVaryWithinPacket { line: usize, sequence: u16 },

    #[error(
        "Range value is out of range for {sensor} on line number {line}, sequence count: {sequence}, range: {value}"
    )]
    RangeInvalid {
        line: usize,
        sequence: u16,
        sensor: Sensor,
        value: i64,
    },

    #[error(
        "Vectors are non-empty for {sensor} on line number {line}, sequence count: {sequence}"
    )]
    VectorsNonEmpty {
        line: usize,
        sequence: u16,
        sensor: Sensor,
    },

    #[error(
        "Expected {expected} vectors in packet but found {actual} ({sensor} packet is too big). line number {line}, sequence count: {sequence}"
    )]
    PacketTooBig {
        line: usize,
        sequence: u16,
        sensor: Sensor,
        expected: usize,
        actual: usize,
    },

    #[error(
        "{sensor} timestamp is {delta}s after the previous packets (more than {limit}s). line number {line}, sequence count: {sequence}"
    )]
    TimestampTooLate {
        line: usize,
        sequence: u16,
        sensor: Sensor,
        delta: String,
        limit: String,
    },

    #[error(
        "{sensor} timestamp is {delta}s after the previous packets (less than {limit}s). line number {line}, sequence count: {sequence}"
    )]
    TimestampTooEarly {
        line: usize,
        sequence: u16,
        sensor: Sensor,
        delta: String,
        limit: String,
    },

    #[error(
        "{sensor} timestamp changed within packet. line number {line}, sequence count: {sequence}"
    )]
    TimestampWithinPacket {
        line: usize,
        sequence: u16,
        sensor: Sensor,
    },

    #[error("Timestamp fine value out of range ({fine}). line number {line}")]
    TimestampFineOutOfRange { line: usize, fine: i64 },
}

/// Stable taxonomy kind, independent of the rendered message, used by the
/// summary aggregator to key its counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CheckFindingKind {
    TooManyRows,
    VectorsAllZero,
    NonSequential,
    PacketIncomplete,
    ExpectedNumeric,
    SequenceVaryWithinPacket,
    RangeInvalid,
    VectorsNonEmpty,
    PacketTooBig,
    TimestampTooLate,
    TimestampTooEarly,
    TimestampWithinPacket,
    TimestampFineOutOfRange,
}

impl fmt::Display for CheckFindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Every taxonomy kind, used by the summary aggregator to classify report
/// lines without needing to reconstruct a full `CheckFinding`.
pub const ALL_FINDING_KINDS: [CheckFindingKind; 13] = [
    CheckFindingKind::TooManyRows,
    CheckFindingKind::VectorsAllZero,
    CheckFindingKind::NonSequential,
    CheckFindingKind::PacketIncomplete,
    CheckFindingKind::ExpectedNumeric,
    CheckFindingKind::SequenceVaryWithinPacket,
    CheckFindingKind::RangeInvalid,
    CheckFindingKind::VectorsNonEmpty,
    CheckFindingKind::PacketTooBig,
    CheckFindingKind::TimestampTooLate,
    CheckFindingKind::TimestampTooEarly,
    CheckFindingKind::TimestampWithinPacket,
    CheckFindingKind::TimestampFineOutOfRange,
];

impl CheckFindingKind {
    /// The canonical substring the summary aggregator searches report lines for.
    pub fn canonical_phrase(&self) -> &'static str {
        match self {
            CheckFindingKind::TooManyRows => "Packet has too many rows",
            CheckFindingKind::VectorsAllZero => "Vectors are all zero",
            CheckFindingKind::NonSequential => "Non sequential packet",
            CheckFindingKind::PacketIncomplete => "packet is incomplete",
            CheckFindingKind::ExpectedNumeric => "to have a numeric value",
            CheckFindingKind::SequenceVaryWithinPacket => "Sequence numbers vary within packet",
            CheckFindingKind::RangeInvalid => "Range value is out of range",
            CheckFindingKind::VectorsNonEmpty => "Vectors are non-empty",
            CheckFindingKind::PacketTooBig => "packet is too big",
            CheckFindingKind::TimestampTooLate => "more than",
            CheckFindingKind::TimestampTooEarly => "less than",
            CheckFindingKind::TimestampWithinPacket => "changed within packet",
            CheckFindingKind::TimestampFineOutOfRange => "Timestamp fine value out of range",
        }
    }
}

impl CheckFinding {
    pub fn kind(&self) -> CheckFindingKind {
        match self {
            CheckFinding::TooManyRows { .. } => CheckFindingKind::TooManyRows,
            CheckFinding::VectorsAllZero { .. } => CheckFindingKind::VectorsAllZero,
            CheckFinding::NonSequential { .. } => CheckFindingKind::NonSequential,
            CheckFinding::PacketIncomplete { .. } => CheckFindingKind::PacketIncomplete,
            CheckFinding::ExpectedNumeric { .. } => CheckFindingKind::ExpectedNumeric,
            CheckFinding::SequenceVaryWithinPacket { .. } => {
                CheckFindingKind::SequenceVaryWithinPacket
            }
            CheckFinding::RangeInvalid { .. } => CheckFindingKind::RangeInvalid,
            CheckFinding::VectorsNonEmpty { .. } => CheckFindingKind::VectorsNonEmpty,
            CheckFinding::PacketTooBig { .. } => CheckFindingKind::PacketTooBig,
            CheckFinding::TimestampTooLate { .. } => CheckFindingKind::TimestampTooLate,
            CheckFinding::TimestampTooEarly { .. } => CheckFindingKind::TimestampTooEarly,
            CheckFinding::TimestampWithinPacket { .. } => CheckFindingKind::TimestampWithinPacket,
            CheckFinding::TimestampFineOutOfRange { .. } => {
                CheckFindingKind::TimestampFineOutOfRange
            }
        }
    }
}
