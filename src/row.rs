//! The decoded CSV row shape shared by the writer (C6) and the checker (C8).

use serde::{Deserialize, Serialize};

/// One row of a science output CSV: one primary and one secondary vector
/// sample, plus the packet-level metadata they were decoded from.
///
/// Field order matches the column order written to disk; `csv` serializes
/// struct fields in declaration order. The vector columns are `None` (an
/// empty CSV field) when this row index has no sample for that sensor —
/// primary and secondary sensors are sampled at independent rates, so a
/// packet's shorter sensor runs out of vectors before its longer one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecodedRow {
    pub sequence: u16,
    pub x_pri: Option<i32>,
    pub y_pri: Option<i32>,
    pub z_pri: Option<i32>,
    pub rng_pri: Option<i32>,
    pub x_sec: Option<i32>,
    pub y_sec: Option<i32>,
    pub z_sec: Option<i32>,
    pub rng_sec: Option<i32>,
    pub pri_coarse: u32,
    pub pri_fine: u16,
    pub sec_coarse: u32,
    pub sec_fine: u16,
    pub compression: bool,
    pub compression_width_bits: u8,
    pub pri_active: bool,
    pub sec_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_in_declared_column_order() {
        let row = DecodedRow {
            sequence: 1,
            x_pri: Some(1),
            y_pri: Some(2),
            z_pri: Some(3),
            rng_pri: Some(0),
            x_sec: Some(4),
            y_sec: Some(5),
            z_sec: Some(6),
            rng_sec: Some(0),
            pri_coarse: 10,
            pri_fine: 0,
            sec_coarse: 10,
            sec_fine: 0,
            compression: true,
            compression_width_bits: 8,
            pri_active: true,
            sec_active: true,
        };
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.serialize(row).unwrap();
        let out = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        let header = out.lines().next().unwrap();
        assert_eq!(
            header,
            "sequence,x_pri,y_pri,z_pri,rng_pri,x_sec,y_sec,z_sec,rng_sec,\
pri_coarse,pri_fine,sec_coarse,sec_fine,compression,compression_width_bits,\
pri_active,sec_active"
        );
    }

    #[test]
    fn absent_secondary_sample_serializes_as_an_empty_field() {
        let row = DecodedRow {
            sequence: 1,
            x_pri: Some(1),
            y_pri: Some(2),
            z_pri: Some(3),
            rng_pri: Some(0),
            x_sec: None,
            y_sec: None,
            z_sec: None,
            rng_sec: None,
            pri_coarse: 10,
            pri_fine: 0,
            sec_coarse: 10,
            sec_fine: 0,
            compression: false,
            compression_width_bits: 16,
            pri_active: true,
            sec_active: false,
        };
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.serialize(row).unwrap();
        let out = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        let data_line = out.lines().nth(1).unwrap();
        // x_sec, y_sec, z_sec, rng_sec are the 6th-9th comma-separated fields.
        let fields: Vec<&str> = data_line.split(',').collect();
        assert_eq!(&fields[5..9], &["", "", "", ""]);
    }
}
