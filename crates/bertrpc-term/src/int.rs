//! Fixed-width integer and bignum byte packing.

use num_bigint::{BigInt, Sign};

use crate::error::{CodecError, Result};

/// Encode `n` as big-endian two's complement in exactly `width` bytes.
///
/// A value fits when it is representable either as a signed or as an
/// unsigned `width`-byte integer, so the same routine packs signed INTEGER
/// payloads and unsigned length/arity fields.
pub fn int_to_bytes(n: i64, width: usize) -> Result<Vec<u8>> {
    if width == 0 || width > 8 {
        return Err(CodecError::EncodeRange(format!(
            "unsupported integer width {width}"
        )));
    }

    let bits = 8 * width as u32;
    let wide = i128::from(n);
    let min = -(1i128 << (bits - 1));
    let max = (1i128 << bits) - 1;
    if wide < min || wide > max {
        return Err(CodecError::EncodeRange(format!(
            "{n} does not fit in {width} byte(s)"
        )));
    }

    let be = wide.to_be_bytes();
    Ok(be[be.len() - width..].to_vec())
}

/// Decode a big-endian integer from the first `width` bytes of `data`.
///
/// A single byte is read unsigned. Wider values are signed: the high bit of
/// the first byte selects two's-complement reconstruction.
pub fn bytes_to_int(data: &[u8], width: usize) -> Result<i64> {
    if width == 0 || width > 8 {
        return Err(CodecError::EncodeRange(format!(
            "unsupported integer width {width}"
        )));
    }
    if data.len() < width {
        return Err(crate::error::Malformed::Truncated {
            what: "integer",
            needed: width,
            available: data.len(),
        }
        .into());
    }

    let bytes = &data[..width];
    if width == 1 {
        return Ok(i64::from(bytes[0]));
    }

    let seed: i64 = if bytes[0] & 0x80 != 0 { -1 } else { 0 };
    Ok(bytes
        .iter()
        .fold(seed, |acc, &byte| (acc << 8) | i64::from(byte)))
}

/// Pack a bignum as one sign byte (0 non-negative, 1 negative) followed by
/// the magnitude in little-endian base-256 digits, shortest form.
pub fn bignum_to_bytes(value: &BigInt) -> Vec<u8> {
    let (sign, magnitude) = value.to_bytes_le();
    let mut out = Vec::with_capacity(magnitude.len() + 1);
    out.push(u8::from(sign == Sign::Minus));
    out.extend_from_slice(&magnitude);
    out
}

/// Reverse of [`bignum_to_bytes`]: sign byte, then little-endian digits.
pub fn bytes_to_bignum(data: &[u8]) -> BigInt {
    let Some((&sign, digits)) = data.split_first() else {
        return BigInt::default();
    };
    let sign = if sign != 0 { Sign::Minus } else { Sign::Plus };
    BigInt::from_bytes_le(sign, digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_signed_and_unsigned_ranges() {
        assert_eq!(int_to_bytes(5000, 4).unwrap(), vec![0, 0, 19, 136]);
        assert_eq!(int_to_bytes(-5000, 4).unwrap(), vec![255, 255, 236, 120]);
        assert_eq!(int_to_bytes(255, 1).unwrap(), vec![255]);
        assert_eq!(int_to_bytes(-1, 1).unwrap(), vec![255]);
        assert_eq!(int_to_bytes(65535, 2).unwrap(), vec![255, 255]);
        assert_eq!(int_to_bytes(4_294_967_295, 4).unwrap(), vec![255; 4]);
    }

    #[test]
    fn rejects_values_outside_width() {
        assert!(matches!(
            int_to_bytes(256, 1),
            Err(CodecError::EncodeRange(_))
        ));
        assert!(int_to_bytes(-129, 1).is_err());
        assert!(int_to_bytes(4_294_967_296, 4).is_err());
        assert!(int_to_bytes(1, 0).is_err());
        assert!(int_to_bytes(1, 9).is_err());
    }

    #[test]
    fn single_byte_reads_unsigned() {
        assert_eq!(bytes_to_int(&[200], 1).unwrap(), 200);
        assert_eq!(bytes_to_int(&[128, 99], 1).unwrap(), 128);
    }

    #[test]
    fn wide_reads_are_signed() {
        assert_eq!(bytes_to_int(&[0, 0, 19, 136], 4).unwrap(), 5000);
        assert_eq!(bytes_to_int(&[255, 255, 236, 120], 4).unwrap(), -5000);
        assert_eq!(bytes_to_int(&[128, 0], 2).unwrap(), -32768);
        assert_eq!(bytes_to_int(&[255, 255, 255, 112], 4).unwrap(), -144);
    }

    #[test]
    fn short_input_is_truncated() {
        assert!(matches!(
            bytes_to_int(&[1, 2], 4),
            Err(CodecError::MalformedTerm(crate::error::Malformed::Truncated { .. }))
        ));
    }

    #[test]
    fn bignum_packing_matches_wire_vectors() {
        assert_eq!(
            bignum_to_bytes(&BigInt::from(987_654_321)),
            vec![0, 177, 104, 222, 58]
        );
        assert_eq!(
            bignum_to_bytes(&BigInt::from(-987_654_321)),
            vec![1, 177, 104, 222, 58]
        );
        assert_eq!(bignum_to_bytes(&BigInt::from(0)), vec![0, 0]);
    }

    #[test]
    fn bignum_unpacking_applies_sign() {
        assert_eq!(
            bytes_to_bignum(&[1, 177, 104, 222, 58]),
            BigInt::from(-987_654_321)
        );
        let huge: BigInt = "123456789012345678901234567890".parse().unwrap();
        assert_eq!(bytes_to_bignum(&bignum_to_bytes(&huge)), huge);
        assert_eq!(bytes_to_bignum(&[]), BigInt::from(0));
    }
}
