//! Fibonacci (Zeckendorf) coding used for differential residuals.
//!
//! Every codeword is terminated by two consecutive set bits, which cannot
//! occur inside a valid Zeckendorf decomposition (no two consecutive
//! Fibonacci numbers are ever both used), so the terminator is unambiguous.

use crate::bitcursor::BitCursor;
use crate::error::DecodeError;

/// `F[0..=39]`, i.e. the Fibonacci numbers starting at 1, 2 — large enough
/// to cover any residual the 20-bit compressed vector fields can produce.
pub const FIBONACCI_SEQUENCE: [u64; 40] = [
    1, 2, 3, 5, 8, 13, 21, 34, 55, 89, 144, 233, 377, 610, 987, 1597, 2584, 4181, 6765, 10946,
    17711, 28657, 46368, 75025, 121393, 196418, 317811, 514229, 832040, 1346269, 2178309, 3524578,
    5702887, 9227465, 14930352, 24157817, 39088169, 63245986, 102334155, 165580141,
];

/// Bit length of the codeword (including its `"11"` terminator) that would
/// encode `value`. Used by the high-dynamic-range escape check (C4) to
/// decide whether a residual needs the fixed-width fallback.
///
/// A value `v` is encoded by decomposing `v + 1` (never 0, so the
/// decomposition is never empty); `decode` reverses this by subtracting 1
/// from the summed terms.
pub fn encoded_bit_len(value: u64) -> usize {
    encode_indices(value + 1).len() + 1
}

/// Indices into [`FIBONACCI_SEQUENCE`] used by the greedy decomposition of
/// `value`, highest index first.
fn encode_indices(value: u64) -> Vec<usize> {
    if value == 0 {
        return vec![];
    }
    let mut remaining = value;
    let mut indices = Vec::new();
    for i in (0..FIBONACCI_SEQUENCE.len()).rev() {
        if FIBONACCI_SEQUENCE[i] <= remaining {
            indices.push(i);
            remaining -= FIBONACCI_SEQUENCE[i];
        }
    }
    indices
}

/// Read one Fibonacci-coded value from `cursor`, consuming bits up to and
/// including the terminating `"11"`.
///
/// The summed Fibonacci terms are one higher than the decoded value (every
/// codeword encodes `value + 1`, since a decomposition is always non-empty),
/// so the sum is decremented before it's returned.
pub fn decode(cursor: &mut BitCursor) -> Result<u64, DecodeError> {
    let start = cursor.position();
    let view = cursor.bit_string_from(start, cursor.remaining());
    let terminator = view
        .find_double_one()
        .ok_or(DecodeError::UnterminatedFibCode { start })?;
    // `terminator` is the index of the first `1` of the `"11"` pair; the
    // codeword proper is every bit up to and including that first `1`.
    let codeword_len = terminator + 1;

    let mut sum: u64 = 0;
    for i in 0..codeword_len {
        if view.bit_at(i) {
            sum += FIBONACCI_SEQUENCE[i];
        }
    }
    cursor.set_position(start + codeword_len + 1);
    Ok(sum - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build the bits of the codeword that encodes `value`, i.e. the
    /// Zeckendorf decomposition of `value + 1` followed by the `"11"`
    /// terminator.
    fn roundtrip_bits(value: u64) -> Vec<bool> {
        let indices = encode_indices(value + 1);
        let max_index = indices.first().copied().unwrap_or(0);
        let mut bits = vec![false; max_index + 1];
        for i in indices {
            bits[i] = true;
        }
        bits.push(true);
        bits.push(true);
        bits
    }

    fn bits_to_buf(bits: &[bool]) -> Vec<u8> {
        let mut buf = vec![0u8; (bits.len() + 7) / 8];
        for (i, &b) in bits.iter().enumerate() {
            if b {
                buf[i / 8] |= 1 << (7 - i % 8);
            }
        }
        buf
    }

    #[test]
    fn encodes_small_values_without_consecutive_indices() {
        for v in 0..500u64 {
            let indices = encode_indices(v);
            for w in indices.windows(2) {
                assert!(w[0] != w[1] + 1, "consecutive fib indices for {v}");
            }
        }
    }

    #[test]
    fn decode_roundtrips_small_values() {
        for v in 0..2000u64 {
            let bits = roundtrip_bits(v);
            let buf = bits_to_buf(&bits);
            let mut cursor = BitCursor::new(&buf);
            assert_eq!(decode(&mut cursor).unwrap(), v, "value {v}");
        }
    }

    #[test]
    fn decode_consumes_exactly_the_codeword() {
        let bits = roundtrip_bits(12);
        let mut buf = bits_to_buf(&bits);
        buf.push(0xFF);
        let mut cursor = BitCursor::new(&buf);
        decode(&mut cursor).unwrap();
        assert_eq!(cursor.position(), bits.len());
    }

    #[test]
    fn unterminated_code_errors() {
        let buf = [0b0101_0101];
        let mut cursor = BitCursor::new(&buf);
        assert!(matches!(
            decode(&mut cursor),
            Err(DecodeError::UnterminatedFibCode { start: 0 })
        ));
    }

    #[test]
    fn decode_matches_a_hand_built_spec_conformant_codeword() {
        // value 2 encodes as the Zeckendorf decomposition of 3 (= value + 1),
        // which is just F[2] = 3: bits [0, 0, 1] followed by the "11"
        // terminator, packed MSB-first as 0b0011_1000.
        let buf = [0b0011_1000u8];
        let mut cursor = BitCursor::new(&buf);
        assert_eq!(decode(&mut cursor).unwrap(), 2);
    }

    #[test]
    fn encoded_bit_len_matches_roundtrip_bits() {
        for v in [0u64, 1, 4, 60, 999] {
            assert_eq!(encoded_bit_len(v), roundtrip_bits(v).len());
        }
    }
}
