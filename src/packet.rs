//! CCSDS space packet framing and the MAG science secondary header (C10).

use std::io::{self, Read};
use std::ops::RangeInclusive;

/// Normal-mode science packet APID.
pub const APID_MAG_SCIENCE_NM: u16 = 0x41C;
/// Burst-mode science packet APID.
pub const APID_MAG_SCIENCE_BM: u16 = 0x42C;
/// The full APID range MAG telemetry (science and otherwise) is allocated.
pub const APID_MAG_RANGE: RangeInclusive<u16> = 0x3E0..=0x45F;

/// Whether `apid` falls within the MAG instrument's allocated APID range.
pub fn is_mag_apid(apid: u16) -> bool {
    APID_MAG_RANGE.contains(&apid)
}

/// The 6-byte CCSDS primary header common to every packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CcsdsPrimaryHeader {
    pub version: u8,
    pub type_flag: u8,
    pub has_secondary_header: bool,
    pub apid: u16,
    pub sequence_flags: u8,
    pub sequence_count: u16,
    pub len_minus1: u16,
}

impl CcsdsPrimaryHeader {
    pub const LEN: usize = 6;
    pub const SEQUENCE_COUNT_MAX: u16 = 0x3FFF;

    /// Parse a primary header from the first 6 bytes of `buf`.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::LEN {
            return None;
        }
        let d1 = u16::from_be_bytes([buf[0], buf[1]]);
        let d2 = u16::from_be_bytes([buf[2], buf[3]]);
        let d3 = u16::from_be_bytes([buf[4], buf[5]]);
        Some(CcsdsPrimaryHeader {
            version: (d1 >> 13 & 0x7) as u8,
            type_flag: (d1 >> 12 & 0x1) as u8,
            has_secondary_header: (d1 >> 11 & 0x1) == 1,
            apid: d1 & 0x7FF,
            sequence_flags: (d2 >> 14 & 0x3) as u8,
            sequence_count: d2 & Self::SEQUENCE_COUNT_MAX,
            len_minus1: d3,
        })
    }

    /// Total packet length in bytes, header included.
    pub fn packet_len(&self) -> usize {
        Self::LEN + self.len_minus1 as usize + 1
    }
}

/// Difference between two sequence counters, accounting for 14-bit wraparound.
pub fn sequence_gap(current: u16, previous: u16) -> u16 {
    current.wrapping_sub(previous) & CcsdsPrimaryHeader::SEQUENCE_COUNT_MAX
}

/// Fields of the MAG science secondary header (21 bytes, immediately
/// following the CCSDS primary header). Byte layout per the mission packet
/// definition: `SHCOARSE(32) PUS_SPARE1(1) PUS_VERSION(3) PUS_SPARE2(4)
/// PUS_STYPE(8) PUS_SSUBTYPE(8) COMPRESSION(1) FOB_ACT(1) FIB_ACT(1)
/// PRI_SENS(1) SPARE(4) PRI_VECSEC(3) SEC_VECSEC(3) SPARE(2)
/// PRI_COARSETM(32) PRI_FNTM(16) SEC_COARSETM(32) SEC_FNTM(16)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SecondaryHeader {
    pub shcoarse: u32,
    pub pus_stype: u8,
    pub pus_ssubtype: u8,
    pub compressed: bool,
    pub fob_active: bool,
    pub fib_active: bool,
    /// `false` selects FOB as the primary sensor, `true` selects FIB.
    pub primary_is_fib: bool,
    pub primary_rate_code: u8,
    pub secondary_rate_code: u8,
    pub primary_coarse: u32,
    pub primary_fine: u16,
    pub secondary_coarse: u32,
    pub secondary_fine: u16,
}

impl SecondaryHeader {
    pub const LEN: usize = 21;

    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::LEN {
            return None;
        }
        let shcoarse = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let pus_stype = buf[5];
        let pus_ssubtype = buf[6];
        let flags = buf[7];
        let compressed = (flags >> 7) & 1 == 1;
        let fob_active = (flags >> 6) & 1 == 1;
        let fib_active = (flags >> 5) & 1 == 1;
        let primary_is_fib = (flags >> 4) & 1 == 1;
        let rate_byte = buf[8];
        let primary_rate_code = (rate_byte >> 5) & 0x7;
        let secondary_rate_code = (rate_byte >> 2) & 0x7;
        let primary_coarse = u32::from_be_bytes([buf[9], buf[10], buf[11], buf[12]]);
        let primary_fine = u16::from_be_bytes([buf[13], buf[14]]);
        let secondary_coarse = u32::from_be_bytes([buf[15], buf[16], buf[17], buf[18]]);
        let secondary_fine = u16::from_be_bytes([buf[19], buf[20]]);
        Some(SecondaryHeader {
            shcoarse,
            pus_stype,
            pus_ssubtype,
            compressed,
            fob_active,
            fib_active,
            primary_is_fib,
            primary_rate_code,
            secondary_rate_code,
            primary_coarse,
            primary_fine,
            secondary_coarse,
            secondary_fine,
        })
    }

    /// Seconds covered by one packet: `PUS_SSUBTYPE + 1`.
    pub fn seconds_per_packet(&self) -> u32 {
        self.pus_ssubtype as u32 + 1
    }
}

/// A fully-framed science packet: primary header, secondary header, and the
/// raw vector payload that follows the secondary header.
#[derive(Debug, Clone)]
pub struct SciencePacket {
    pub primary: CcsdsPrimaryHeader,
    pub secondary: SecondaryHeader,
    pub vector_data: Vec<u8>,
}

impl SciencePacket {
    /// Read one packet from `reader`. Returns `Ok(None)` on a clean EOF
    /// before any bytes of a new packet are read.
    pub fn read_from<R: Read>(mut reader: R) -> io::Result<Option<Self>> {
        let mut header_buf = [0u8; CcsdsPrimaryHeader::LEN];
        match read_exact_or_eof(&mut reader, &mut header_buf)? {
            false => return Ok(None),
            true => {}
        }
        let primary = CcsdsPrimaryHeader::decode(&header_buf)
            .expect("header_buf is exactly CcsdsPrimaryHeader::LEN bytes");
        let mut rest = vec![0u8; primary.packet_len() - CcsdsPrimaryHeader::LEN];
        reader.read_exact(&mut rest)?;

        let secondary = SecondaryHeader::decode(&rest).ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "packet shorter than secondary header")
        })?;
        let vector_data = rest[SecondaryHeader::LEN..].to_vec();

        Ok(Some(SciencePacket {
            primary,
            secondary,
            vector_data,
        }))
    }
}

/// Like `Read::read_exact`, but returns `Ok(false)` instead of an error when
/// EOF occurs before any byte is read, and still errors on a partial read.
fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                if filled == 0 {
                    return Ok(false);
                }
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "truncated packet header",
                ));
            }
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}
