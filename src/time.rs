//! IMAP mission epoch arithmetic.

use chrono::{DateTime, Duration, TimeZone, Utc};

/// The epoch all IMAP CCSDS coarse/fine timestamps are measured from.
pub fn imap_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap()
}

/// Convert a coarse/fine timestamp pair into seconds since the IMAP epoch.
pub fn to_epoch_seconds(coarse: u32, fine: u16) -> f64 {
    coarse as f64 + fine as f64 / 65535.0
}

/// Convert a coarse/fine timestamp pair into an absolute UTC instant.
pub fn to_datetime(coarse: u32, fine: u16) -> DateTime<Utc> {
    let secs = to_epoch_seconds(coarse, fine);
    imap_epoch() + Duration::microseconds((secs * 1_000_000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timestamp_is_epoch() {
        assert_eq!(to_datetime(0, 0), imap_epoch());
    }

    #[test]
    fn fine_time_is_fractional_seconds() {
        let secs = to_epoch_seconds(0, 65535);
        assert!((secs - 1.0).abs() < 1e-9);
    }

    #[test]
    fn coarse_time_advances_by_whole_seconds() {
        assert_eq!(to_datetime(10, 0), imap_epoch() + Duration::seconds(10));
    }
}
