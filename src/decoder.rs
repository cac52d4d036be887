//! Per-packet vector decoding and streaming orchestration (C4, C5, C11).

use std::io::{self, Read};
use std::path::Path;
use std::path::PathBuf;

use crate::bitcursor::BitCursor;
use crate::error::DecodeError;
use crate::mode::{vectors_per_second, ModeConfig};
use crate::packet::{is_mag_apid, SciencePacket, SecondaryHeader};
use crate::row::DecodedRow;
use crate::time;
use crate::vector::{unpack_compressed_vectors, unpack_uncompressed_vectors, Vector};
use crate::writer::ScienceFileWriter;

/// Fixed field width used by the uncompressed vector layout.
const UNCOMPRESSED_WIDTH_BITS: u32 = 16;

/// A gap of more than this many multiples of the packet cadence closes the
/// current output file and starts a new one.
const GAP_MULTIPLIER: f64 = 5.0;

/// Decode the primary and secondary vector sections of one packet's payload.
///
/// Returns the decoded vectors for each sensor plus the compression width
/// actually used (for the `compression_width_bits` output column).
fn decode_vector_section(
    vector_data: &[u8],
    secondary: &SecondaryHeader,
    total_pri: usize,
    total_sec: usize,
) -> Result<(Vec<Vector>, Vec<Vector>, u8), DecodeError> {
    if secondary.compressed {
        if vector_data.is_empty() {
            return Err(DecodeError::TruncatedPayload {
                needed: 8,
                available: 0,
            });
        }
        let descriptor = vector_data[0];
        let width = (descriptor >> 2) & 0x3F;
        let has_range = (descriptor >> 1) & 1 == 1;

        let mut cursor = BitCursor::new(&vector_data[1..]);
        let primary = unpack_compressed_vectors(&mut cursor, total_pri, width as u32, has_range)?;
        let secondary_vecs =
            unpack_compressed_vectors(&mut cursor, total_sec, width as u32, has_range)?;
        Ok((primary, secondary_vecs, width))
    } else {
        let mut cursor = BitCursor::new(vector_data);
        let primary =
            unpack_uncompressed_vectors(&mut cursor, total_pri, UNCOMPRESSED_WIDTH_BITS, true)?;
        let secondary_vecs =
            unpack_uncompressed_vectors(&mut cursor, total_sec, UNCOMPRESSED_WIDTH_BITS, true)?;
        Ok((primary, secondary_vecs, UNCOMPRESSED_WIDTH_BITS as u8))
    }
}

/// Decode one packet into its output rows.
///
/// Primary and secondary vectors are sampled at independent rates; when one
/// sensor has fewer vectors than the other for this packet, the rows beyond
/// its count carry `None` for that sensor's columns rather than a repeated
/// or zero-filled value.
pub fn decode_packet_rows(packet: &SciencePacket) -> Result<Vec<DecodedRow>, DecodeError> {
    if !is_mag_apid(packet.primary.apid) {
        return Err(DecodeError::UnsupportedApid {
            apid: packet.primary.apid,
        });
    }

    let seconds_per_packet = packet.secondary.seconds_per_packet() as f64;
    let total_pri =
        (vectors_per_second(packet.secondary.primary_rate_code) * seconds_per_packet).round()
            as usize;
    let total_sec =
        (vectors_per_second(packet.secondary.secondary_rate_code) * seconds_per_packet).round()
            as usize;

    let (pri_vecs, sec_vecs, width) =
        decode_vector_section(&packet.vector_data, &packet.secondary, total_pri, total_sec)?;

    let pri_active = if packet.secondary.primary_is_fib {
        packet.secondary.fib_active
    } else {
        packet.secondary.fob_active
    };
    let sec_active = if packet.secondary.primary_is_fib {
        packet.secondary.fob_active
    } else {
        packet.secondary.fib_active
    };

    let row_count = pri_vecs.len().max(sec_vecs.len());
    let mut rows = Vec::with_capacity(row_count);
    for i in 0..row_count {
        let pv = pri_vecs.get(i).copied();
        let sv = sec_vecs.get(i).copied();
        rows.push(DecodedRow {
            sequence: packet.primary.sequence_count,
            x_pri: pv.map(|v| v.x),
            y_pri: pv.map(|v| v.y),
            z_pri: pv.map(|v| v.z),
            rng_pri: pv.map(|v| v.rng),
            x_sec: sv.map(|v| v.x),
            y_sec: sv.map(|v| v.y),
            z_sec: sv.map(|v| v.z),
            rng_sec: sv.map(|v| v.rng),
            pri_coarse: packet.secondary.primary_coarse,
            pri_fine: packet.secondary.primary_fine,
            sec_coarse: packet.secondary.secondary_coarse,
            sec_fine: packet.secondary.secondary_fine,
            compression: packet.secondary.compressed,
            compression_width_bits: width,
            pri_active,
            sec_active,
        });
    }
    Ok(rows)
}

/// Aggregate result of draining a packet stream into science CSV files.
#[derive(Debug, Default)]
pub struct DecodeSummary {
    pub packets_processed: usize,
    pub packets_skipped: usize,
    pub rows_written: usize,
    pub files_written: Vec<PathBuf>,
}

/// If `secondary`'s declared rates or cadence no longer match `current`,
/// return the `ModeConfig` it should be replaced with.
fn detect_rate_change(current: &ModeConfig, secondary: &SecondaryHeader) -> Option<ModeConfig> {
    let primary_rate = vectors_per_second(secondary.primary_rate_code).round() as u32;
    let secondary_rate = vectors_per_second(secondary.secondary_rate_code).round() as u32;
    let seconds_per_packet = secondary.seconds_per_packet();
    if primary_rate != current.primary_rate
        || secondary_rate != current.secondary_rate
        || seconds_per_packet != current.seconds_per_packet
    {
        Some(ModeConfig::from_mode(
            current.mode,
            primary_rate,
            secondary_rate,
            seconds_per_packet,
        ))
    } else {
        None
    }
}

fn csv_err_to_io(e: csv::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e)
}

/// Drain packets from `reader`, writing decoded rows to CSV files under
/// `base_path`. A new file is opened whenever the packet stream's declared
/// rate or cadence changes, or whenever a time gap larger than
/// `GAP_MULTIPLIER` packet cadences is observed; back-to-back packets with
/// an identical sequence counter are treated as retransmitted duplicates
/// and dropped (C11).
pub fn decode_stream<R: Read>(
    mut reader: R,
    base_path: &Path,
    mut config: ModeConfig,
) -> io::Result<DecodeSummary> {
    let mut summary = DecodeSummary::default();
    let mut writer: Option<ScienceFileWriter> = None;
    let mut last_sequence: Option<u16> = None;
    let mut last_packet_time: Option<f64> = None;

    while let Some(packet) = SciencePacket::read_from(&mut reader)? {
        summary.packets_processed += 1;

        if Some(packet.primary.sequence_count) == last_sequence {
            log::debug!(
                "dropping duplicate packet at sequence {}",
                packet.primary.sequence_count
            );
            summary.packets_skipped += 1;
            continue;
        }
        last_sequence = Some(packet.primary.sequence_count);

        let packet_time = time::to_epoch_seconds(
            packet.secondary.primary_coarse,
            packet.secondary.primary_fine,
        );

        if let Some(new_config) = detect_rate_change(&config, &packet.secondary) {
            log::info!(
                "rate change detected for {} ({}/{} -> {}/{}), rotating output file",
                config.mode,
                config.primary_rate,
                config.secondary_rate,
                new_config.primary_rate,
                new_config.secondary_rate,
            );
            config = new_config;
            writer = None;
        } else if let Some(prev) = last_packet_time {
            if packet_time > prev + config.seconds_per_packet as f64 * GAP_MULTIPLIER {
                log::warn!(
                    "gap detected before sequence {} ({:.3}s since previous packet), rotating output file",
                    packet.primary.sequence_count,
                    packet_time - prev,
                );
                writer = None;
            }
        }

        if writer.is_none() {
            let start = time::to_datetime(
                packet.secondary.primary_coarse,
                packet.secondary.primary_fine,
            );
            let w = ScienceFileWriter::create(base_path, &config, start)?;
            summary.files_written.push(w.path().to_path_buf());
            writer = Some(w);
        }

        let rows = match decode_packet_rows(&packet) {
            Ok(rows) => rows,
            Err(e) => {
                log::warn!(
                    "skipping packet at sequence {}: {e}",
                    packet.primary.sequence_count
                );
                summary.packets_skipped += 1;
                continue;
            }
        };

        let w = writer.as_mut().unwrap();
        for row in &rows {
            w.write_row(row).map_err(csv_err_to_io)?;
        }
        w.flush()?;
        summary.rows_written += rows.len();
        last_packet_time = Some(packet_time);
    }

    Ok(summary)
}
