//! The `(x, y, z, rng)` sample type and the compressed/uncompressed vector
//! unpacking algorithms (C4).

use crate::bitcursor::BitCursor;
use crate::error::DecodeError;
use crate::fibonacci;
use crate::zigzag;

/// Number of vector axes carrying differential/fixed-width magnetic field
/// components (x, y, z — `rng` is handled separately).
pub const AXIS_COUNT: usize = 3;

/// Width, in bits, of an uncompressed reference vector component.
pub const MAX_COMPRESSION_WIDTH: u32 = 20;

/// Once a residual's Fibonacci codeword would exceed this many bits, the
/// sensor permanently falls back to fixed-width reads for the rest of the
/// stream (the "HDR escape").
pub const HDR_THRESHOLD: usize = AXIS_COUNT * MAX_COMPRESSION_WIDTH as usize;

/// One magnetic field sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Vector {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub rng: i32,
}

impl Vector {
    pub fn is_all_zero(&self) -> bool {
        self.x == 0 && self.y == 0 && self.z == 0 && self.rng == 0
    }
}

/// Interpret the low `width` bits of `raw` as a two's-complement signed
/// integer.
fn twos_complement(raw: u32, width: u32) -> i32 {
    let sign_bit = 1u32 << (width - 1);
    if raw & sign_bit != 0 {
        (raw as i64 - (1i64 << width)) as i32
    } else {
        raw as i32
    }
}

fn read_signed(cursor: &mut BitCursor, width: u32) -> Result<i32, DecodeError> {
    Ok(twos_complement(cursor.read(width)?, width))
}

/// Read one vector whose three axes are each `width` bits wide, optionally
/// followed by a 2-bit range field.
fn unpack_one_vector(
    cursor: &mut BitCursor,
    width: u32,
    has_range: bool,
) -> Result<Vector, DecodeError> {
    let x = read_signed(cursor, width)?;
    let y = read_signed(cursor, width)?;
    let z = read_signed(cursor, width)?;
    let rng = if has_range { cursor.read(2)? as i32 } else { 0 };
    Ok(Vector { x, y, z, rng })
}

/// Decode `count` vectors from a differentially-compressed section.
///
/// The first vector is a full-width reference; each subsequent vector is
/// either a Fibonacci/zig-zag-coded residual against its predecessor, or —
/// once the HDR escape has triggered for this sensor — a fresh fixed-width
/// absolute value.
pub fn unpack_compressed_vectors(
    cursor: &mut BitCursor,
    count: usize,
    reference_width_bits: u32,
    has_range: bool,
) -> Result<Vec<Vector>, DecodeError> {
    if reference_width_bits == 0 || reference_width_bits > MAX_COMPRESSION_WIDTH {
        return Err(DecodeError::InvalidCompressionWidth {
            width: reference_width_bits,
        });
    }
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut vectors = Vec::with_capacity(count);
    vectors.push(unpack_one_vector(cursor, reference_width_bits, has_range)?);

    let mut hdr_active = false;
    for _ in 1..count {
        let prev = *vectors.last().unwrap();
        let next = if hdr_active {
            Vector {
                x: read_signed(cursor, reference_width_bits)?,
                y: read_signed(cursor, reference_width_bits)?,
                z: read_signed(cursor, reference_width_bits)?,
                rng: prev.rng,
            }
        } else {
            let start = cursor.position();
            let dx = zigzag::decode(fibonacci::decode(cursor)? as u32);
            let dy = zigzag::decode(fibonacci::decode(cursor)? as u32);
            let dz = zigzag::decode(fibonacci::decode(cursor)? as u32);
            let bits_used = cursor.position() - start;
            if bits_used > HDR_THRESHOLD {
                hdr_active = true;
            }
            Vector {
                x: prev.x.wrapping_add(dx),
                y: prev.y.wrapping_add(dy),
                z: prev.z.wrapping_add(dz),
                rng: prev.rng,
            }
        };
        vectors.push(next);
    }

    if has_range {
        cursor.align_to_byte();
        for v in vectors.iter_mut() {
            v.rng = cursor.read(2)? as i32;
        }
    }

    Ok(vectors)
}

/// Decode `count` vectors from an uncompressed section, each a fixed
/// `width`-bit field per axis with an optional trailing 2-bit range.
pub fn unpack_uncompressed_vectors(
    cursor: &mut BitCursor,
    count: usize,
    width: u32,
    has_range: bool,
) -> Result<Vec<Vector>, DecodeError> {
    let mut vectors = Vec::with_capacity(count);
    for _ in 0..count {
        vectors.push(unpack_one_vector(cursor, width, has_range)?);
    }
    Ok(vectors)
}
