use bytes::{BufMut, BytesMut};
use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::error::{CodecError, Result};
use crate::float::format_float;
use crate::int::bignum_to_bytes;
use crate::tag;
use crate::term::{Dictionary, Term};

/// Wire representation of booleans and dictionaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Generation {
    /// `{bert, true}`, `{bert, false}`, `{bert, dict, [...]}`.
    #[default]
    Current,
    /// Bare `true`/`false` atoms; dictionaries as a plain list of pairs.
    Legacy,
}

/// Encoder settings, fixed for the lifetime of an [`Encoder`].
#[derive(Debug, Clone, Default)]
pub struct EncodeConfig {
    pub generation: Generation,
}

impl EncodeConfig {
    pub fn with_generation(mut self, generation: Generation) -> Self {
        self.generation = generation;
        self
    }
}

/// Serializes terms to BERT bytes.
#[derive(Debug, Clone, Default)]
pub struct Encoder {
    config: EncodeConfig,
}

impl Encoder {
    pub fn new(config: EncodeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EncodeConfig {
        &self.config
    }

    /// Encode `term` as a complete top-level BERT value.
    pub fn encode(&self, term: &Term) -> Result<Vec<u8>> {
        let mut buf = BytesMut::new();
        self.encode_into(term, &mut buf)?;
        Ok(buf.to_vec())
    }

    /// Append the encoding of `term` (start byte included) to `dst`.
    ///
    /// On error `dst` is left as it was before the call.
    pub fn encode_into(&self, term: &Term, dst: &mut BytesMut) -> Result<()> {
        let mark = dst.len();
        dst.put_u8(tag::START);
        if let Err(err) = self.write_term(term, dst) {
            dst.truncate(mark);
            return Err(err);
        }
        Ok(())
    }

    fn write_term(&self, term: &Term, dst: &mut BytesMut) -> Result<()> {
        match term {
            Term::Atom(atom) => write_atom(atom.name(), dst),
            Term::Binary(bytes) => {
                let len = checked_u32(bytes.len(), "binary")?;
                dst.put_u8(tag::BINARY);
                dst.put_u32(len);
                dst.put_slice(bytes);
                Ok(())
            }
            Term::Bytelist(bytes) => {
                let len = u16::try_from(bytes.len()).map_err(|_| {
                    CodecError::EncodeRange(format!(
                        "bytelist of {} bytes exceeds 65535",
                        bytes.len()
                    ))
                })?;
                dst.put_u8(tag::STRING);
                dst.put_u16(len);
                dst.put_slice(bytes);
                Ok(())
            }
            Term::Integer(n) => {
                write_integer(*n, dst);
                Ok(())
            }
            Term::BigInteger(n) => match n.to_i64() {
                Some(small) => {
                    write_integer(small, dst);
                    Ok(())
                }
                None => write_bignum(n, dst),
            },
            Term::Float(x) => {
                let text = format_float(*x)?;
                dst.put_u8(tag::FLOAT);
                dst.put_slice(&text);
                Ok(())
            }
            Term::List(items) => self.write_list(items, dst),
            Term::Nil => self.write_list(&[], dst),
            Term::Tuple(items) => self.write_tuple(items, dst),
            Term::Null => {
                write_tuple_header(2, dst)?;
                write_atom("bert", dst)?;
                write_atom("nil", dst)
            }
            Term::Boolean(value) => {
                let name = if *value { "true" } else { "false" };
                if self.config.generation == Generation::Current {
                    write_tuple_header(2, dst)?;
                    write_atom("bert", dst)?;
                }
                write_atom(name, dst)
            }
            Term::Dictionary(dict) => {
                if self.config.generation == Generation::Current {
                    write_tuple_header(3, dst)?;
                    write_atom("bert", dst)?;
                    write_atom("dict", dst)?;
                }
                self.write_pairs(dict, dst)
            }
        }
    }

    fn write_list(&self, items: &[Term], dst: &mut BytesMut) -> Result<()> {
        let len = checked_u32(items.len(), "list")?;
        dst.put_u8(tag::LIST);
        dst.put_u32(len);
        for item in items {
            self.write_term(item, dst)?;
        }
        dst.put_u8(tag::NIL);
        Ok(())
    }

    fn write_tuple(&self, items: &[Term], dst: &mut BytesMut) -> Result<()> {
        write_tuple_header(items.len(), dst)?;
        for item in items {
            self.write_term(item, dst)?;
        }
        Ok(())
    }

    fn write_pairs(&self, dict: &Dictionary, dst: &mut BytesMut) -> Result<()> {
        let len = checked_u32(dict.len(), "dictionary")?;
        dst.put_u8(tag::LIST);
        dst.put_u32(len);
        for (key, value) in dict.iter() {
            write_tuple_header(2, dst)?;
            self.write_term(key, dst)?;
            self.write_term(value, dst)?;
        }
        dst.put_u8(tag::NIL);
        Ok(())
    }
}

/// Encode with the default (current generation) settings.
pub fn encode(term: &Term) -> Result<Vec<u8>> {
    Encoder::default().encode(term)
}

/// Append the default encoding of `term` to `dst`.
pub fn encode_into(term: &Term, dst: &mut BytesMut) -> Result<()> {
    Encoder::default().encode_into(term, dst)
}

fn checked_u32(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| CodecError::EncodeRange(format!("{what} length {len} exceeds u32")))
}

fn write_atom(name: &str, dst: &mut BytesMut) -> Result<()> {
    let len = u16::try_from(name.len()).map_err(|_| {
        CodecError::EncodeRange(format!("atom name of {} bytes exceeds 65535", name.len()))
    })?;
    dst.put_u8(tag::ATOM);
    dst.put_u16(len);
    dst.put_slice(name.as_bytes());
    Ok(())
}

fn write_tuple_header(arity: usize, dst: &mut BytesMut) -> Result<()> {
    match u8::try_from(arity) {
        Ok(small) => {
            dst.put_u8(tag::SMALL_TUPLE);
            dst.put_u8(small);
        }
        Err(_) => {
            dst.put_u8(tag::LARGE_TUPLE);
            dst.put_u32(checked_u32(arity, "tuple")?);
        }
    }
    Ok(())
}

fn write_integer(n: i64, dst: &mut BytesMut) {
    if (0..256).contains(&n) {
        dst.put_u8(tag::SMALL_INTEGER);
        dst.put_u8(n as u8);
    } else if (tag::INTEGER_MIN..=tag::INTEGER_MAX).contains(&n) {
        dst.put_u8(tag::INTEGER);
        dst.put_i32(n as i32);
    } else {
        // Outside the INTEGER window every i64 magnitude fits in 8 bytes.
        let packed = bignum_to_bytes(&BigInt::from(n));
        dst.put_u8(tag::SMALL_BIG);
        dst.put_u8((packed.len() - 1) as u8);
        dst.put_slice(&packed);
    }
}

fn write_bignum(n: &BigInt, dst: &mut BytesMut) -> Result<()> {
    let packed = bignum_to_bytes(n);
    let digits = packed.len() - 1;
    match u8::try_from(digits) {
        Ok(small) => {
            dst.put_u8(tag::SMALL_BIG);
            dst.put_u8(small);
        }
        Err(_) => {
            dst.put_u8(tag::LARGE_BIG);
            dst.put_u32(checked_u32(digits, "bignum")?);
        }
    }
    dst.put_slice(&packed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Atom;

    fn bytes(term: Term) -> Vec<u8> {
        encode(&term).unwrap()
    }

    #[test]
    fn atom() {
        assert_eq!(
            bytes(Term::atom("hello")),
            vec![131, 100, 0, 5, 104, 101, 108, 108, 111]
        );
    }

    #[test]
    fn small_integer() {
        assert_eq!(bytes(42.into()), vec![131, 97, 42]);
        assert_eq!(bytes(0.into()), vec![131, 97, 0]);
        assert_eq!(bytes(255.into()), vec![131, 97, 255]);
    }

    #[test]
    fn integer() {
        assert_eq!(bytes(5000.into()), vec![131, 98, 0, 0, 19, 136]);
        assert_eq!(bytes((-5000).into()), vec![131, 98, 255, 255, 236, 120]);
        assert_eq!(bytes((-144).into()), vec![131, 98, 255, 255, 255, 112]);
        assert_eq!(bytes(256.into()), vec![131, 98, 0, 0, 1, 0]);
        assert_eq!(bytes((-1).into()), vec![131, 98, 255, 255, 255, 255]);
    }

    #[test]
    fn integer_window_edges() {
        assert_eq!(bytes(134_217_727.into())[1], tag::INTEGER);
        assert_eq!(bytes((-134_217_728).into())[1], tag::INTEGER);
        assert_eq!(bytes(134_217_728.into())[1], tag::SMALL_BIG);
        assert_eq!(bytes((-134_217_729).into())[1], tag::SMALL_BIG);
    }

    #[test]
    fn bignum() {
        assert_eq!(
            bytes(987_654_321.into()),
            vec![131, 110, 4, 0, 177, 104, 222, 58]
        );
        assert_eq!(
            bytes((-987_654_321).into()),
            vec![131, 110, 4, 1, 177, 104, 222, 58]
        );
    }

    #[test]
    fn large_bignum_uses_large_big() {
        let huge = BigInt::from(1) << 2048u32;
        let encoded = bytes(Term::big(huge));
        assert_eq!(encoded[1], tag::LARGE_BIG);
        assert_eq!(&encoded[2..6], &257u32.to_be_bytes());
        assert_eq!(encoded[6], 0);
        assert_eq!(encoded.len(), 7 + 257);
    }

    #[test]
    fn float() {
        let mut expected = vec![131, 99];
        let text = b"3.14159e+0";
        expected.extend_from_slice(text);
        expected.resize(2 + 31, 0);
        assert_eq!(bytes(3.14159.into()), expected);
    }

    #[test]
    fn non_finite_float_is_range_error() {
        assert!(matches!(
            encode(&Term::Float(f64::NAN)),
            Err(CodecError::EncodeRange(_))
        ));
    }

    #[test]
    fn list() {
        assert_eq!(
            bytes(Term::list([1.into(), 2.into(), 3.into()])),
            vec![131, 108, 0, 0, 0, 3, 97, 1, 97, 2, 97, 3, 106]
        );
    }

    #[test]
    fn empty_list() {
        let expected = vec![131, 108, 0, 0, 0, 0, 106];
        assert_eq!(bytes(Term::List(vec![])), expected);
        assert_eq!(bytes(Term::Nil), expected);
    }

    #[test]
    fn tuple() {
        assert_eq!(
            bytes(Term::tuple([Term::from("Hello"), 1.into()])),
            vec![131, 104, 2, 109, 0, 0, 0, 5, 72, 101, 108, 108, 111, 97, 1]
        );
    }

    #[test]
    fn tuple_arity_selects_tag() {
        let small = Term::tuple(std::iter::repeat(Term::Integer(0)).take(255));
        let large = Term::tuple(std::iter::repeat(Term::Integer(0)).take(256));
        assert_eq!(&bytes(small)[1..3], &[104, 255]);
        assert_eq!(&bytes(large)[1..6], &[105, 0, 0, 1, 0]);
    }

    #[test]
    fn binary() {
        assert_eq!(
            bytes("hello".into()),
            vec![131, 109, 0, 0, 0, 5, 104, 101, 108, 108, 111]
        );
    }

    #[test]
    fn bytelist() {
        assert_eq!(
            bytes(Term::bytelist(vec![1, 2, 3])),
            vec![131, 107, 0, 3, 1, 2, 3]
        );
    }

    #[test]
    fn booleans_current() {
        assert_eq!(
            bytes(true.into()),
            vec![131, 104, 2, 100, 0, 4, 98, 101, 114, 116, 100, 0, 4, 116, 114, 117, 101]
        );
        assert_eq!(
            bytes(false.into()),
            vec![
                131, 104, 2, 100, 0, 4, 98, 101, 114, 116, 100, 0, 5, 102, 97, 108, 115, 101
            ]
        );
    }

    #[test]
    fn booleans_legacy() {
        let encoder = Encoder::new(EncodeConfig::default().with_generation(Generation::Legacy));
        assert_eq!(
            encoder.encode(&true.into()).unwrap(),
            vec![131, 100, 0, 4, 116, 114, 117, 101]
        );
    }

    #[test]
    fn null() {
        assert_eq!(
            bytes(Term::Null),
            vec![131, 104, 2, 100, 0, 4, 98, 101, 114, 116, 100, 0, 3, 110, 105, 108]
        );
    }

    #[test]
    fn dictionary() {
        let dict = Term::dictionary([("a", 1), ("b", 2), ("c", 3)]);
        assert_eq!(
            bytes(dict),
            vec![
                131, 104, 3, 100, 0, 4, 98, 101, 114, 116, 100, 0, 4, 100, 105, 99, 116, 108, 0,
                0, 0, 3, 104, 2, 100, 0, 1, 97, 97, 1, 104, 2, 100, 0, 1, 98, 97, 2, 104, 2, 100,
                0, 1, 99, 97, 3, 106
            ]
        );
    }

    #[test]
    fn dictionary_legacy_is_bare_pair_list() {
        let encoder = Encoder::new(EncodeConfig::default().with_generation(Generation::Legacy));
        let dict = Term::dictionary([("a", 1)]);
        assert_eq!(
            encoder.encode(&dict).unwrap(),
            vec![131, 108, 0, 0, 0, 1, 104, 2, 100, 0, 1, 97, 97, 1, 106]
        );
    }

    #[test]
    fn oversized_atom_is_range_error() {
        let name = "a".repeat(65_536);
        let term = Term::Atom(Atom::Named(name));
        assert!(matches!(encode(&term), Err(CodecError::EncodeRange(_))));
    }

    #[test]
    fn encode_into_restores_buffer_on_error() {
        let mut buf = BytesMut::from(&b"prefix"[..]);
        let term = Term::list([1.into(), Term::Float(f64::INFINITY)]);
        assert!(encode_into(&term, &mut buf).is_err());
        assert_eq!(&buf[..], b"prefix");
    }
}
