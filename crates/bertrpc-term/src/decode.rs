use bytes::Buf;

use crate::error::{Malformed, Result};
use crate::float::parse_float;
use crate::int::{bytes_to_bignum, bytes_to_int};
use crate::tag;
use crate::term::{Atom, Dictionary, Term};

/// Default nesting limit for lists and tuples.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Decoder limits.
#[derive(Debug, Clone)]
pub struct DecodeConfig {
    /// Maximum list/tuple nesting before the input is rejected.
    pub max_depth: usize,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl DecodeConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Parses BERT bytes into terms.
///
/// Accepts both protocol generations: bare `true`/`false` atoms and
/// `{bert, true}` tuples both decode to [`Term::Boolean`].
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    config: DecodeConfig,
}

impl Decoder {
    pub fn new(config: DecodeConfig) -> Self {
        Self { config }
    }

    /// Decode exactly one top-level term; trailing bytes are an error.
    pub fn decode(&self, bytes: &[u8]) -> Result<Term> {
        let (term, rest) = self.decode_partial(bytes)?;
        if !rest.is_empty() {
            return Err(Malformed::TrailingBytes(rest.len()).into());
        }
        Ok(term)
    }

    /// Decode one top-level term and return it with the unconsumed input.
    pub fn decode_partial<'a>(&self, bytes: &'a [u8]) -> Result<(Term, &'a [u8])> {
        let mut cursor = Cursor {
            buf: bytes,
            max_depth: self.config.max_depth,
        };
        let start = cursor.u8("start byte").map_err(|_| Malformed::Empty)?;
        if start != tag::START {
            return Err(Malformed::BadStart(start).into());
        }
        let term = cursor.term(0)?;
        Ok((term, cursor.buf))
    }
}

/// Decode one top-level term with default limits.
pub fn decode(bytes: &[u8]) -> Result<Term> {
    Decoder::default().decode(bytes)
}

/// Decode one top-level term, returning the bytes that follow it.
pub fn decode_partial(bytes: &[u8]) -> Result<(Term, &[u8])> {
    Decoder::default().decode_partial(bytes)
}

struct Cursor<'a> {
    buf: &'a [u8],
    max_depth: usize,
}

impl<'a> Cursor<'a> {
    fn need(&self, what: &'static str, needed: usize) -> std::result::Result<(), Malformed> {
        if self.buf.remaining() < needed {
            return Err(Malformed::Truncated {
                what,
                needed,
                available: self.buf.remaining(),
            });
        }
        Ok(())
    }

    fn u8(&mut self, what: &'static str) -> std::result::Result<u8, Malformed> {
        self.need(what, 1)?;
        Ok(self.buf.get_u8())
    }

    fn u16(&mut self, what: &'static str) -> std::result::Result<usize, Malformed> {
        self.need(what, 2)?;
        Ok(self.buf.get_u16() as usize)
    }

    fn u32(&mut self, what: &'static str) -> std::result::Result<usize, Malformed> {
        self.need(what, 4)?;
        Ok(self.buf.get_u32() as usize)
    }

    fn take(&mut self, what: &'static str, len: usize) -> std::result::Result<&'a [u8], Malformed> {
        self.need(what, len)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    fn term(&mut self, depth: usize) -> Result<Term> {
        let byte = self.u8("tag")?;
        match byte {
            tag::SMALL_ATOM | tag::SMALL_ATOM_UTF8 => {
                let len = self.u8("atom length")? as usize;
                self.atom(len)
            }
            tag::ATOM | tag::ATOM_UTF8 => {
                let len = self.u16("atom length")?;
                self.atom(len)
            }
            tag::BINARY => {
                let len = self.u32("binary length")?;
                Ok(Term::Binary(self.take("binary", len)?.to_vec()))
            }
            tag::STRING => {
                let len = self.u16("string length")?;
                Ok(Term::Bytelist(self.take("string", len)?.to_vec()))
            }
            tag::SMALL_INTEGER => Ok(Term::Integer(bytes_to_int(self.take("small integer", 1)?, 1)?)),
            tag::INTEGER => Ok(Term::Integer(bytes_to_int(self.take("integer", 4)?, 4)?)),
            tag::SMALL_BIG => {
                let len = self.u8("bignum length")? as usize;
                self.bignum(len)
            }
            tag::LARGE_BIG => {
                let len = self.u32("bignum length")?;
                self.bignum(len)
            }
            tag::FLOAT => {
                let raw = self.take("float", tag::FLOAT_WIDTH)?;
                Ok(Term::Float(parse_float(raw)?))
            }
            tag::NEW_FLOAT => {
                self.need("new float", 8)?;
                Ok(Term::Float(self.buf.get_f64()))
            }
            tag::LIST => {
                let len = self.u32("list length")?;
                self.list(len, depth + 1)
            }
            tag::NIL => Ok(Term::Nil),
            tag::SMALL_TUPLE => {
                let arity = self.u8("tuple arity")? as usize;
                self.tuple(arity, depth + 1)
            }
            tag::LARGE_TUPLE => {
                let arity = self.u32("tuple arity")?;
                self.tuple(arity, depth + 1)
            }
            other => Err(Malformed::UnknownTag(other).into()),
        }
    }

    fn atom(&mut self, len: usize) -> Result<Term> {
        let raw = self.take("atom", len)?;
        let name = match std::str::from_utf8(raw) {
            Ok(text) => text.to_string(),
            // Pre-UTF-8 atoms are Latin-1.
            Err(_) => raw.iter().map(|&b| b as char).collect(),
        };
        Ok(Term::atom(name))
    }

    fn bignum(&mut self, digits: usize) -> Result<Term> {
        let raw = self.take("bignum", digits + 1)?;
        Ok(Term::big(bytes_to_bignum(raw)))
    }

    fn enter(&self, depth: usize) -> std::result::Result<(), Malformed> {
        if depth > self.max_depth {
            return Err(Malformed::TooDeep(self.max_depth));
        }
        Ok(())
    }

    fn elements(&mut self, count: usize, depth: usize) -> Result<Vec<Term>> {
        self.enter(depth)?;
        // Every element takes at least one byte, so a declared count larger
        // than the input is caught by the reads below, not by the allocator.
        let mut items = Vec::with_capacity(count.min(self.buf.remaining()));
        for _ in 0..count {
            items.push(self.term(depth)?);
        }
        Ok(items)
    }

    fn list(&mut self, len: usize, depth: usize) -> Result<Term> {
        let items = self.elements(len, depth)?;
        match self.buf.first().copied() {
            Some(tag::NIL) => {
                self.buf.advance(1);
                Ok(Term::List(items))
            }
            other => Err(Malformed::MissingNil(other).into()),
        }
    }

    fn tuple(&mut self, arity: usize, depth: usize) -> Result<Term> {
        let items = self.elements(arity, depth)?;
        complex(items)
    }
}

/// Resolve `{bert, ...}` complex types; every other tuple passes through.
fn complex(items: Vec<Term>) -> Result<Term> {
    let resolved = match items.as_slice() {
        [Term::Atom(Atom::Bert), Term::Atom(Atom::Nil)] => Some(Term::Null),
        [Term::Atom(Atom::Bert), Term::Boolean(value)] => Some(Term::Boolean(*value)),
        [Term::Atom(Atom::Bert), Term::Atom(Atom::Dict), pairs] => {
            Some(Term::Dictionary(dictionary(pairs)?))
        }
        _ => None,
    };
    Ok(match resolved {
        Some(term) => term,
        None => Term::Tuple(items),
    })
}

fn dictionary(pairs: &Term) -> Result<Dictionary> {
    let pairs = pairs.as_list().ok_or(Malformed::InvalidDictionary)?;
    let mut dict = Dictionary::new();
    for pair in pairs {
        match pair.as_tuple() {
            Some([key, value]) => {
                dict.insert(key.clone(), value.clone());
            }
            _ => return Err(Malformed::InvalidDictionary.into()),
        }
    }
    Ok(dict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{encode, EncodeConfig, Encoder, Generation};
    use crate::error::CodecError;
    use num_bigint::BigInt;

    fn malformed(bytes: &[u8]) -> Malformed {
        match decode(bytes) {
            Err(CodecError::MalformedTerm(reason)) => reason,
            other => panic!("expected malformed term, got {other:?}"),
        }
    }

    #[test]
    fn decodes_known_vectors() {
        assert_eq!(
            decode(&[131, 100, 0, 5, 104, 101, 108, 108, 111]).unwrap(),
            Term::atom("hello")
        );
        assert_eq!(decode(&[131, 97, 42]).unwrap(), Term::Integer(42));
        assert_eq!(decode(&[131, 98, 255, 255, 236, 120]).unwrap(), Term::Integer(-5000));
        assert_eq!(
            decode(&[131, 110, 4, 1, 177, 104, 222, 58]).unwrap(),
            Term::Integer(-987_654_321)
        );
        assert_eq!(
            decode(&[131, 104, 2, 109, 0, 0, 0, 5, 72, 101, 108, 108, 111, 97, 1]).unwrap(),
            Term::tuple([Term::from("Hello"), 1.into()])
        );
    }

    #[test]
    fn decodes_erlang_float_text() {
        let mut bytes = vec![131, 99];
        bytes.extend_from_slice(b"-3.14158999999999988262e+00");
        bytes.resize(2 + 31, 0);
        assert_eq!(decode(&bytes).unwrap(), Term::Float(-3.14159));
    }

    #[test]
    fn decodes_new_float() {
        let bytes = [131, 70, 64, 9, 33, 249, 240, 27, 134, 110];
        assert_eq!(decode(&bytes).unwrap(), Term::Float(3.14159));
    }

    #[test]
    fn bare_nil_tag_is_empty_list() {
        assert_eq!(decode(&[131, 106]).unwrap(), Term::Nil);
        assert_eq!(decode(&[131, 106]).unwrap(), Term::List(vec![]));
    }

    #[test]
    fn small_atom_and_utf8_atoms() {
        assert_eq!(decode(&[131, 115, 2, 111, 107]).unwrap(), Term::atom("ok"));
        assert_eq!(decode(&[131, 119, 2, 111, 107]).unwrap(), Term::atom("ok"));
        assert_eq!(decode(&[131, 118, 0, 2, 111, 107]).unwrap(), Term::atom("ok"));
    }

    #[test]
    fn latin1_atom_falls_back() {
        assert_eq!(decode(&[131, 115, 1, 0xE9]).unwrap(), Term::atom("é"));
    }

    #[test]
    fn string_tag_is_bytelist() {
        assert_eq!(
            decode(&[131, 107, 0, 3, 1, 2, 3]).unwrap(),
            Term::bytelist(vec![1, 2, 3])
        );
    }

    #[test]
    fn reserved_atoms_decode_to_markers() {
        assert_eq!(
            decode(&[131, 100, 0, 4, 116, 114, 117, 101]).unwrap(),
            Term::Boolean(true)
        );
        assert_eq!(
            decode(&[131, 100, 0, 5, 102, 97, 108, 115, 101]).unwrap(),
            Term::Boolean(false)
        );
        assert_eq!(
            decode(&[131, 100, 0, 3, 110, 105, 108]).unwrap(),
            Term::Atom(Atom::Nil)
        );
    }

    #[test]
    fn complex_types_round_trip() {
        let cases = [
            Term::Boolean(true),
            Term::Boolean(false),
            Term::Null,
            Term::dictionary([("a", 1), ("b", 2), ("c", 3)]),
            Term::Dictionary(Dictionary::new()),
        ];
        for term in cases {
            assert_eq!(decode(&encode(&term).unwrap()).unwrap(), term);
        }
    }

    #[test]
    fn legacy_encoding_decodes_booleans() {
        let legacy = Encoder::new(EncodeConfig::default().with_generation(Generation::Legacy));
        let bytes = legacy.encode(&Term::Boolean(false)).unwrap();
        assert_eq!(decode(&bytes).unwrap(), Term::Boolean(false));
    }

    #[test]
    fn nested_round_trip() {
        let term = Term::tuple([
            Term::atom("call"),
            Term::atom("math"),
            Term::atom("sum"),
            Term::list([
                Term::list([1.into(), 2.into()]),
                Term::Float(-1.5e-7),
                Term::big(BigInt::from(1) << 300u32),
                Term::big(-(BigInt::from(1) << 70u32)),
                Term::Integer(i64::MIN),
                Term::bytelist(vec![9, 8]),
                Term::Null,
            ]),
        ]);
        assert_eq!(decode(&encode(&term).unwrap()).unwrap(), term);
    }

    #[test]
    fn unknown_bert_tuples_stay_tuples() {
        let term = Term::tuple([Term::atom("bert"), Term::atom("other")]);
        assert_eq!(decode(&encode(&term).unwrap()).unwrap(), term);
    }

    #[test]
    fn bad_dictionary_payload_is_malformed() {
        let term = Term::tuple([Term::atom("bert"), Term::atom("dict"), Term::list([1.into()])]);
        let bytes = encode(&term).unwrap();
        assert_eq!(malformed(&bytes), Malformed::InvalidDictionary);
    }

    #[test]
    fn empty_and_bad_start() {
        assert_eq!(malformed(&[]), Malformed::Empty);
        assert_eq!(malformed(&[130, 97, 1]), Malformed::BadStart(130));
    }

    #[test]
    fn unknown_tag() {
        assert_eq!(malformed(&[131, 200]), Malformed::UnknownTag(200));
    }

    #[test]
    fn truncated_payloads() {
        assert!(matches!(malformed(&[131]), Malformed::Truncated { .. }));
        assert!(matches!(
            malformed(&[131, 109, 0, 0, 0, 10, 1, 2]),
            Malformed::Truncated {
                what: "binary",
                needed: 10,
                available: 2
            }
        ));
        assert!(matches!(malformed(&[131, 98, 0, 0]), Malformed::Truncated { .. }));
        assert!(matches!(
            malformed(&[131, 108, 255, 255, 255, 255, 97, 1]),
            Malformed::Truncated { .. }
        ));
    }

    #[test]
    fn list_without_nil_is_malformed() {
        assert_eq!(
            malformed(&[131, 108, 0, 0, 0, 1, 97, 1]),
            Malformed::MissingNil(None)
        );
        assert_eq!(
            malformed(&[131, 108, 0, 0, 0, 1, 97, 1, 97, 2]),
            Malformed::MissingNil(Some(97))
        );
    }

    #[test]
    fn trailing_bytes_rejected_by_strict_decode() {
        assert_eq!(malformed(&[131, 97, 1, 0]), Malformed::TrailingBytes(1));
        let (term, rest) = decode_partial(&[131, 97, 1, 0]).unwrap();
        assert_eq!(term, Term::Integer(1));
        assert_eq!(rest, &[0]);
    }

    #[test]
    fn depth_limit() {
        let mut term = Term::Integer(1);
        for _ in 0..10 {
            term = Term::list([term]);
        }
        let bytes = encode(&term).unwrap();
        let shallow = Decoder::new(DecodeConfig::default().with_max_depth(5));
        assert!(matches!(
            shallow.decode(&bytes),
            Err(CodecError::MalformedTerm(Malformed::TooDeep(5)))
        ));
        assert_eq!(Decoder::default().decode(&bytes).unwrap(), term);
    }

    #[test]
    fn invalid_float_text() {
        let mut bytes = vec![131, 99];
        bytes.extend_from_slice(b"not-a-number");
        bytes.resize(2 + 31, 0);
        assert!(matches!(malformed(&bytes), Malformed::InvalidFloat(_)));
    }
}
