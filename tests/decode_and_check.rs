//! End-to-end coverage: build a synthetic CCSDS capture, decode it to CSV,
//! then run the gap checker against the decoded output.

use mag_science_decoder::{check, decode_stream, Mode, ModeConfig};

fn primary_header(apid: u16, sequence: u16, len_minus1: u16) -> [u8; 6] {
    let d1 = (1u16 << 11) | (apid & 0x7FF);
    let d2 = (0b11u16 << 14) | (sequence & 0x3FFF);
    let mut buf = [0u8; 6];
    buf[0..2].copy_from_slice(&d1.to_be_bytes());
    buf[2..4].copy_from_slice(&d2.to_be_bytes());
    buf[4..6].copy_from_slice(&len_minus1.to_be_bytes());
    buf
}

/// One uncompressed packet at 1 vector/sensor/packet, primary/secondary
/// both active, coarse timestamp `coarse_secs`, sequence `sequence`.
fn uncompressed_packet(sequence: u16, coarse_secs: u32) -> Vec<u8> {
    let mut secondary = vec![0u8; 21];
    secondary[7] = 0b0000_0000; // not compressed, both sensors active, primary = FOB
    secondary[7] |= 0b0110_0000; // fob_active + fib_active
    secondary[8] = 0b010_010_00; // 1 Hz / 1 Hz
    secondary[9..13].copy_from_slice(&coarse_secs.to_be_bytes());
    secondary[15..19].copy_from_slice(&coarse_secs.to_be_bytes());

    let mut vector_data = vec![0u8; 13];
    vector_data[1] = 5; // x_pri low byte
    vector_data[7] = 9; // x_sec low byte, roughly

    let mut body = secondary;
    body.extend_from_slice(&vector_data);
    let header = primary_header(mag_science_decoder::packet::APID_MAG_SCIENCE_NM, sequence, (body.len() - 1) as u16);

    let mut packet = header.to_vec();
    packet.extend_from_slice(&body);
    packet
}

#[test]
fn decodes_a_capture_and_the_gap_checker_finds_it_clean() {
    let dir = tempfile::tempdir().unwrap();
    let mut capture = Vec::new();
    for seq in 0..4u16 {
        capture.extend_from_slice(&uncompressed_packet(seq, seq as u32));
    }

    let config = ModeConfig::from_mode(Mode::NormalE8, 1, 1, 1);
    let summary = decode_stream(capture.as_slice(), dir.path(), config.clone()).unwrap();
    assert_eq!(summary.packets_processed, 4);
    assert_eq!(summary.rows_written, 4);
    assert_eq!(summary.files_written.len(), 1);

    let csv_file = std::fs::File::open(&summary.files_written[0]).unwrap();
    let report = check(csv_file, &config).unwrap();
    assert!(report.findings.is_empty(), "{:?}", report.findings);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.packets_checked, 4);
}

#[test]
fn a_dropped_packet_is_flagged_as_non_sequential() {
    let dir = tempfile::tempdir().unwrap();
    let mut capture = Vec::new();
    capture.extend_from_slice(&uncompressed_packet(0, 0));
    capture.extend_from_slice(&uncompressed_packet(2, 1)); // sequence 1 missing

    let config = ModeConfig::from_mode(Mode::NormalE8, 1, 1, 1);
    let summary = decode_stream(capture.as_slice(), dir.path(), config.clone()).unwrap();

    let csv_file = std::fs::File::open(&summary.files_written[0]).unwrap();
    let report = check(csv_file, &config).unwrap();
    assert_eq!(report.exit_code(), 2);
    assert!(report
        .findings
        .iter()
        .any(|f| matches!(f, mag_science_decoder::CheckFinding::NonSequential { sequence: 2, .. })));
}

#[test]
fn duplicate_packets_are_suppressed_during_decode() {
    let dir = tempfile::tempdir().unwrap();
    let mut capture = Vec::new();
    capture.extend_from_slice(&uncompressed_packet(0, 0));
    capture.extend_from_slice(&uncompressed_packet(0, 0)); // exact retransmission
    capture.extend_from_slice(&uncompressed_packet(1, 1));

    let config = ModeConfig::from_mode(Mode::NormalE8, 1, 1, 1);
    let summary = decode_stream(capture.as_slice(), dir.path(), config).unwrap();
    assert_eq!(summary.packets_processed, 3);
    assert_eq!(summary.packets_skipped, 1);
    assert_eq!(summary.rows_written, 2);
}

#[test]
fn mode_config_roundtrips_through_generated_filename() {
    use chrono::{TimeZone, Utc};
    let config = ModeConfig::from_mode(Mode::Burst128, 128, 128, 1);
    let start = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    let name = mag_science_decoder::ScienceFileWriter::file_name(&config, start);
    let parsed = ModeConfig::from_filename(&name).unwrap();
    assert_eq!(parsed.mode, Mode::Burst128);
    assert_eq!(parsed.primary_rate, 128);
    assert_eq!(parsed.secondary_rate, 128);
}
