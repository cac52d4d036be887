//! Streaming gap and consistency checker (C8).

use std::io::Read;

use crate::error::{CheckFinding, Sensor};
use crate::mode::ModeConfig;
use crate::row::DecodedRow;
use crate::time;
use crate::vector::Vector;

/// Valid dynamic-range selector codes, per the 2-bit `rng` field.
const VALID_RANGE: std::ops::RangeInclusive<i32> = 0..=3;

struct SensorState {
    prev_time: Option<f64>,
    packet_time: Option<f64>,
}

impl SensorState {
    fn new() -> Self {
        SensorState {
            prev_time: None,
            packet_time: None,
        }
    }
}

/// Running state for one line of the gap checker's sweep across a decoded
/// CSV: which packet we're in, how many rows it has contributed so far,
/// and the last-known-good timestamp per sensor.
struct CheckerState {
    vectors_seen: u32,
    packet_start_row: usize,
    prev_sequence: Option<u16>,
    primary: SensorState,
    secondary: SensorState,
}

/// The result of checking an entire decoded CSV.
#[derive(Debug, Default)]
pub struct CheckReport {
    pub findings: Vec<CheckFinding>,
    pub packets_checked: usize,
    pub rows_checked: usize,
}

impl CheckReport {
    /// `0` when the data is clean, `2` when any diagnostic fired.
    pub fn exit_code(&self) -> i32 {
        if self.findings.is_empty() {
            0
        } else {
            2
        }
    }

    pub fn summary_line(&self) -> String {
        if self.findings.is_empty() {
            format!(
                "Gap checker completed successfully. Checked {} packet(s) across {} rows of data.",
                self.packets_checked, self.rows_checked
            )
        } else {
            format!(
                "Error - found bad science data! Checked {} packet(s) across {} rows of data.",
                self.packets_checked, self.rows_checked
            )
        }
    }
}

fn format_tolerance(v: f64, tight: bool) -> String {
    if tight {
        format!("{v:.3}")
    } else {
        format!("{v:.5}")
    }
}

/// Check `fine` (widened so the boundary can be exercised directly in
/// tests; `DecodedRow::pri_fine`/`sec_fine` are `u16` and can never in
/// practice fall outside `0..=65535`).
fn check_fine_time(line: usize, fine: i64) -> Option<CheckFinding> {
    if !(0..=65535).contains(&fine) {
        Some(CheckFinding::TimestampFineOutOfRange { line, fine })
    } else {
        None
    }
}

fn check_sensor_timestamp(
    findings: &mut Vec<CheckFinding>,
    state: &mut SensorState,
    sensor: Sensor,
    line: usize,
    sequence: u16,
    time_secs: f64,
    expected_interval: f64,
    tolerance: f64,
    tight: bool,
    is_new_packet: bool,
) {
    if is_new_packet {
        if let Some(prev) = state.prev_time {
            let delta = time_secs - prev;
            if delta > expected_interval + tolerance {
                findings.push(CheckFinding::TimestampTooLate {
                    line,
                    sequence,
                    sensor,
                    delta: format_tolerance(delta, tight),
                    limit: format_tolerance(expected_interval + tolerance, tight),
                });
            } else if delta < expected_interval - tolerance {
                findings.push(CheckFinding::TimestampTooEarly {
                    line,
                    sequence,
                    sensor,
                    delta: format_tolerance(delta, tight),
                    limit: format_tolerance(expected_interval - tolerance, tight),
                });
            }
        }
        state.prev_time = Some(time_secs);
        state.packet_time = Some(time_secs);
    } else if let Some(packet_time) = state.packet_time {
        if (time_secs - packet_time).abs() > f64::EPSILON {
            findings.push(CheckFinding::TimestampWithinPacket {
                line,
                sequence,
                sensor,
            });
        }
    }
}

/// Reassemble a sensor's vector for this row, or `None` if any of its
/// columns is empty (no sample at this row index for that sensor).
fn row_vector(x: Option<i32>, y: Option<i32>, z: Option<i32>, rng: Option<i32>) -> Option<Vector> {
    Some(Vector {
        x: x?,
        y: y?,
        z: z?,
        rng: rng?,
    })
}

/// When a sensor is inactive for the whole packet, its columns must stay
/// empty; when it's active and a sample is present, its range code must be
/// one of the four valid selectors.
fn check_vector_presence(
    findings: &mut Vec<CheckFinding>,
    sensor: Sensor,
    line: usize,
    sequence: u16,
    active: bool,
    vector: Option<Vector>,
) {
    if !active {
        if let Some(v) = vector {
            if !v.is_all_zero() {
                findings.push(CheckFinding::VectorsNonEmpty { line, sequence, sensor });
            }
        }
    } else if let Some(v) = vector {
        if !VALID_RANGE.contains(&v.rng) {
            findings.push(CheckFinding::RangeInvalid {
                line,
                sequence,
                sensor,
                value: v.rng as i64,
            });
        }
    }
}

/// Stream-check a decoded science CSV against the cadence and rate
/// implied by `config`, returning every diagnostic raised and the totals
/// needed to render the closing summary line.
pub fn check<R: Read>(
    reader: R,
    config: &ModeConfig,
) -> Result<CheckReport, csv::Error> {
    let rows_per_packet = config.rows_per_packet();
    let tight = matches!(config.mode, crate::mode::Mode::IAlirt);
    let tolerance = config.default_time_tolerance();
    let expected_interval = config.seconds_per_packet as f64;

    let mut state = CheckerState {
        vectors_seen: 0,
        packet_start_row: 0,
        prev_sequence: None,
        primary: SensorState::new(),
        secondary: SensorState::new(),
    };
    let mut findings = Vec::new();
    let mut rows_checked = 0usize;
    let mut packets_checked = 0usize;

    let mut csv_reader = csv::Reader::from_reader(reader);
    for (row_index, result) in csv_reader.deserialize::<DecodedRow>().enumerate() {
        let line = row_index + 1;
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                findings.push(CheckFinding::ExpectedNumeric {
                    line,
                    column: e.to_string(),
                });
                continue;
            }
        };
        rows_checked += 1;

        let mut is_new_packet = state.vectors_seen == 0;
        if !is_new_packet && Some(row.sequence) != state.prev_sequence {
            findings.push(CheckFinding::SequenceVaryWithinPacket {
                line,
                sequence: row.sequence,
            });
            if state.vectors_seen < rows_per_packet {
                findings.push(CheckFinding::PacketIncomplete {
                    line: state.packet_start_row,
                    sequence: state.prev_sequence.unwrap_or(row.sequence),
                    sensor: Sensor::Primary,
                    expected: rows_per_packet as usize,
                    actual: state.vectors_seen as usize,
                });
            }
            packets_checked += 1;
            state.vectors_seen = 0;
            is_new_packet = true;
        }

        // `None` means this row index has no sample for that sensor (it ran
        // out of vectors before the packet's other, faster sensor did).
        let pri_vec = row_vector(row.x_pri, row.y_pri, row.z_pri, row.rng_pri);
        let sec_vec = row_vector(row.x_sec, row.y_sec, row.z_sec, row.rng_sec);

        if is_new_packet {
            state.packet_start_row = line;
            if let Some(prev_seq) = state.prev_sequence {
                let expected = prev_seq.wrapping_add(config.sequence_counter_step) & 0x3FFF;
                if row.sequence != expected {
                    findings.push(CheckFinding::NonSequential {
                        line,
                        sequence: row.sequence,
                        vector_number: 1,
                    });
                }
            }

            if row.pri_active && pri_vec.is_some_and(|v| v.is_all_zero()) {
                findings.push(CheckFinding::VectorsAllZero {
                    line,
                    sequence: row.sequence,
                    sensor: Sensor::Primary,
                });
            }
            if row.sec_active && sec_vec.is_some_and(|v| v.is_all_zero()) {
                findings.push(CheckFinding::VectorsAllZero {
                    line,
                    sequence: row.sequence,
                    sensor: Sensor::Secondary,
                });
            }
        }

        check_vector_presence(&mut findings, Sensor::Primary, line, row.sequence, row.pri_active, pri_vec);
        check_vector_presence(&mut findings, Sensor::Secondary, line, row.sequence, row.sec_active, sec_vec);

        if let Some(f) = check_fine_time(line, row.pri_fine as i64) {
            findings.push(f);
        }
        if let Some(f) = check_fine_time(line, row.sec_fine as i64) {
            findings.push(f);
        }

        let pri_time = time::to_epoch_seconds(row.pri_coarse, row.pri_fine);
        check_sensor_timestamp(
            &mut findings,
            &mut state.primary,
            Sensor::Primary,
            line,
            row.sequence,
            pri_time,
            expected_interval,
            tolerance,
            tight,
            is_new_packet,
        );
        let sec_time = time::to_epoch_seconds(row.sec_coarse, row.sec_fine);
        check_sensor_timestamp(
            &mut findings,
            &mut state.secondary,
            Sensor::Secondary,
            line,
            row.sequence,
            sec_time,
            expected_interval,
            tolerance,
            tight,
            is_new_packet,
        );

        state.prev_sequence = Some(row.sequence);
        state.vectors_seen += 1;

        if state.vectors_seen > rows_per_packet {
            findings.push(CheckFinding::TooManyRows {
                line,
                sequence: row.sequence,
            });
        } else if state.vectors_seen == rows_per_packet {
            packets_checked += 1;
            state.vectors_seen = 0;
        }
    }

    if state.vectors_seen > 0 {
        packets_checked += 1;
        if state.vectors_seen < rows_per_packet {
            findings.push(CheckFinding::PacketIncomplete {
                line: state.packet_start_row,
                sequence: state.prev_sequence.unwrap_or(0),
                sensor: Sensor::Primary,
                expected: rows_per_packet as usize,
                actual: state.vectors_seen as usize,
            });
        } else {
            findings.push(CheckFinding::PacketTooBig {
                line: state.packet_start_row,
                sequence: state.prev_sequence.unwrap_or(0),
                sensor: Sensor::Primary,
                expected: rows_per_packet as usize,
                actual: state.vectors_seen as usize,
            });
        }
    }

    Ok(CheckReport {
        findings,
        packets_checked,
        rows_checked,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::Mode;

    fn row(sequence: u16, coarse: u32) -> DecodedRow {
        DecodedRow {
            sequence,
            x_pri: Some(1),
            y_pri: Some(1),
            z_pri: Some(1),
            rng_pri: Some(0),
            x_sec: Some(1),
            y_sec: Some(1),
            z_sec: Some(1),
            rng_sec: Some(0),
            pri_coarse: coarse,
            pri_fine: 0,
            sec_coarse: coarse,
            sec_fine: 0,
            compression: false,
            compression_width_bits: 16,
            pri_active: true,
            sec_active: true,
        }
    }

    fn csv_of(rows: &[DecodedRow]) -> Vec<u8> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for r in rows {
            wtr.serialize(r).unwrap();
        }
        wtr.into_inner().unwrap()
    }

    #[test]
    fn clean_stream_has_no_findings() {
        let config = ModeConfig::from_mode(Mode::NormalE8, 1, 1, 1);
        let rows = vec![row(0, 0), row(1, 1), row(2, 2)];
        let data = csv_of(&rows);
        let report = check(data.as_slice(), &config).unwrap();
        assert!(report.findings.is_empty(), "{:?}", report.findings);
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.packets_checked, 3);
    }

    #[test]
    fn detects_non_sequential_packet() {
        let config = ModeConfig::from_mode(Mode::NormalE8, 1, 1, 1);
        let rows = vec![row(0, 0), row(1, 1), row(99, 2)];
        let data = csv_of(&rows);
        let report = check(data.as_slice(), &config).unwrap();
        assert!(report
            .findings
            .iter()
            .any(|f| matches!(f, CheckFinding::NonSequential { sequence: 99, .. })));
        assert_eq!(report.exit_code(), 2);
    }

    #[test]
    fn detects_all_zero_vector() {
        let config = ModeConfig::from_mode(Mode::NormalE8, 1, 1, 1);
        let mut r = row(0, 0);
        r.x_pri = Some(0);
        r.y_pri = Some(0);
        r.z_pri = Some(0);
        r.rng_pri = Some(0);
        let data = csv_of(&[r]);
        let report = check(data.as_slice(), &config).unwrap();
        assert!(report
            .findings
            .iter()
            .any(|f| matches!(f, CheckFinding::VectorsAllZero { sensor: Sensor::Primary, .. })));
    }

    #[test]
    fn detects_incomplete_packet_at_multi_row_cadence() {
        let config = ModeConfig::from_mode(Mode::NormalE8, 2, 2, 1);
        let rows = vec![row(0, 0)]; // rows_per_packet == 2, only 1 row supplied
        let data = csv_of(&rows);
        let report = check(data.as_slice(), &config).unwrap();
        assert!(report
            .findings
            .iter()
            .any(|f| matches!(f, CheckFinding::PacketIncomplete { .. })));
    }

    #[test]
    fn detects_gap_exceeding_tolerance() {
        let config = ModeConfig::from_mode(Mode::NormalE8, 1, 1, 1);
        let rows = vec![row(0, 0), row(1, 5)];
        let data = csv_of(&rows);
        let report = check(data.as_slice(), &config).unwrap();
        assert!(report
            .findings
            .iter()
            .any(|f| matches!(f, CheckFinding::TimestampTooLate { .. })));
    }

    #[test]
    fn summary_line_reflects_findings() {
        let config = ModeConfig::from_mode(Mode::NormalE8, 1, 1, 1);
        let data = csv_of(&[row(0, 0)]);
        let report = check(data.as_slice(), &config).unwrap();
        assert!(report.summary_line().starts_with("Gap checker completed successfully"));
    }

    #[test]
    fn detects_range_out_of_bounds() {
        let config = ModeConfig::from_mode(Mode::NormalE8, 1, 1, 1);
        let mut r = row(0, 0);
        r.rng_pri = Some(-2);
        let data = csv_of(&[r]);
        let report = check(data.as_slice(), &config).unwrap();
        assert!(report
            .findings
            .iter()
            .any(|f| matches!(f, CheckFinding::RangeInvalid { sensor: Sensor::Primary, .. })));
    }

    #[test]
    fn missing_secondary_sample_is_not_flagged_when_inactive_but_absent() {
        let config = ModeConfig::from_mode(Mode::NormalE8, 1, 1, 1);
        let mut r = row(0, 0);
        r.sec_active = false;
        r.x_sec = None;
        r.y_sec = None;
        r.z_sec = None;
        r.rng_sec = None;
        let data = csv_of(&[r]);
        let report = check(data.as_slice(), &config).unwrap();
        assert!(report.findings.is_empty(), "{:?}", report.findings);
    }

    #[test]
    fn inactive_sensor_with_a_nonzero_sample_is_flagged() {
        let config = ModeConfig::from_mode(Mode::NormalE8, 1, 1, 1);
        let mut r = row(0, 0);
        r.sec_active = false;
        let data = csv_of(&[r]); // row()'s default x_sec/y_sec/z_sec are Some(1)
        let report = check(data.as_slice(), &config).unwrap();
        assert!(report
            .findings
            .iter()
            .any(|f| matches!(f, CheckFinding::VectorsNonEmpty { sensor: Sensor::Secondary, .. })));
    }

    #[test]
    fn ialirt_sequence_steps_by_four_without_flagging_non_sequential() {
        // rows_per_packet = 1 here so every row closes its own packet,
        // isolating the sequence-step check from row-count bookkeeping.
        let config = ModeConfig::from_mode(Mode::IAlirt, 1, 1, 1);
        let rows = vec![row(0, 0), row(4, 1), row(8, 2)];
        let data = csv_of(&rows);
        let report = check(data.as_slice(), &config).unwrap();
        assert!(
            !report.findings.iter().any(|f| matches!(f, CheckFinding::NonSequential { .. })),
            "{:?}",
            report.findings
        );
    }

    #[test]
    fn ialirt_flags_a_sequence_that_does_not_step_by_four() {
        let config = ModeConfig::from_mode(Mode::IAlirt, 1, 1, 1);
        let rows = vec![row(0, 0), row(1, 1)];
        let data = csv_of(&rows);
        let report = check(data.as_slice(), &config).unwrap();
        assert!(report
            .findings
            .iter()
            .any(|f| matches!(f, CheckFinding::NonSequential { sequence: 1, .. })));
    }
}
