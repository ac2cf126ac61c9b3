use std::fmt;

use num_bigint::BigInt;
use num_traits::ToPrimitive;

/// An atom name.
///
/// The names `bert`, `dict` and `nil` are protocol markers and get their own
/// variants so code can match on them structurally. `true` and `false` never
/// appear here: they become [`Term::Boolean`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Atom {
    Bert,
    Dict,
    Nil,
    Named(String),
}

impl Atom {
    /// Classify an atom name, mapping reserved names to their markers.
    ///
    /// `true`/`false` are not classified here; use [`Term::atom`] to get a
    /// [`Term::Boolean`] for them.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        match name.as_str() {
            "bert" => Atom::Bert,
            "dict" => Atom::Dict,
            "nil" => Atom::Nil,
            _ => Atom::Named(name),
        }
    }

    /// The atom's text.
    pub fn name(&self) -> &str {
        match self {
            Atom::Bert => "bert",
            Atom::Dict => "dict",
            Atom::Nil => "nil",
            Atom::Named(name) => name,
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A BERT dictionary: unique keys, insertion order irrelevant.
///
/// Entries keep the order they were inserted in (that is the order they are
/// encoded in) but equality ignores order.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    entries: Vec<(Term, Term)>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value for `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<Term>, value: impl Into<Term>) -> Option<Term> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Look up a value by key.
    pub fn get(&self, key: &Term) -> Option<&Term> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Look up a value by atom-name key.
    pub fn get_atom(&self, name: &str) -> Option<&Term> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_atom_name() == Some(name))
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Term, &Term)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

impl PartialEq for Dictionary {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|ov| ov == v))
    }
}

impl<K: Into<Term>, V: Into<Term>> FromIterator<(K, V)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut dict = Dictionary::new();
        for (k, v) in iter {
            dict.insert(k, v);
        }
        dict
    }
}

/// A BERT value.
///
/// Integers are normalized: anything that fits in `i64` is
/// [`Term::Integer`], everything else is [`Term::BigInteger`]. Use
/// [`Term::big`] to build integers from a `BigInt` so the invariant holds.
#[derive(Debug, Clone)]
pub enum Term {
    Atom(Atom),
    Binary(Vec<u8>),
    Bytelist(Vec<u8>),
    Integer(i64),
    BigInteger(BigInt),
    Float(f64),
    List(Vec<Term>),
    Tuple(Vec<Term>),
    /// The empty list.
    Nil,
    /// The absent value, `{bert, nil}` on the wire.
    Null,
    Boolean(bool),
    Dictionary(Dictionary),
}

impl Term {
    /// Build an atom. `"true"`/`"false"` become booleans.
    pub fn atom(name: impl Into<String>) -> Term {
        let name = name.into();
        match name.as_str() {
            "true" => Term::Boolean(true),
            "false" => Term::Boolean(false),
            _ => Term::Atom(Atom::new(name)),
        }
    }

    pub fn binary(bytes: impl Into<Vec<u8>>) -> Term {
        Term::Binary(bytes.into())
    }

    pub fn bytelist(bytes: impl Into<Vec<u8>>) -> Term {
        Term::Bytelist(bytes.into())
    }

    pub fn tuple(elements: impl IntoIterator<Item = Term>) -> Term {
        Term::Tuple(elements.into_iter().collect())
    }

    pub fn list(elements: impl IntoIterator<Item = Term>) -> Term {
        Term::List(elements.into_iter().collect())
    }

    /// Build a dictionary whose string keys become atoms.
    pub fn dictionary<'a, V: Into<Term>>(entries: impl IntoIterator<Item = (&'a str, V)>) -> Term {
        Term::Dictionary(
            entries
                .into_iter()
                .map(|(k, v)| (Term::atom(k), v.into()))
                .collect(),
        )
    }

    /// Build an integer from a bignum, normalizing to [`Term::Integer`] when
    /// it fits in `i64`.
    pub fn big(value: BigInt) -> Term {
        match value.to_i64() {
            Some(small) => Term::Integer(small),
            None => Term::BigInteger(value),
        }
    }

    /// The atom's name, if this is an atom.
    pub fn as_atom_name(&self) -> Option<&str> {
        match self {
            Term::Atom(atom) => Some(atom.name()),
            _ => None,
        }
    }

    /// Elements of a list (the empty list included).
    pub fn as_list(&self) -> Option<&[Term]> {
        match self {
            Term::List(items) => Some(items),
            Term::Nil => Some(&[]),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Term]> {
        match self {
            Term::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Term::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric value as a float (integers and bignums convert).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Term::Integer(n) => Some(*n as f64),
            Term::BigInteger(n) => n.to_f64(),
            Term::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Raw bytes of a binary or bytelist.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Term::Binary(bytes) | Term::Bytelist(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// A binary or bytelist interpreted as UTF-8 text.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Short name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Term::Atom(_) => "atom",
            Term::Binary(_) => "binary",
            Term::Bytelist(_) => "bytelist",
            Term::Integer(_) | Term::BigInteger(_) => "integer",
            Term::Float(_) => "float",
            Term::List(_) | Term::Nil => "list",
            Term::Tuple(_) => "tuple",
            Term::Null => "nil",
            Term::Boolean(_) => "boolean",
            Term::Dictionary(_) => "dictionary",
        }
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Term::Atom(a), Term::Atom(b)) => a == b,
            (Term::Binary(a), Term::Binary(b)) => a == b,
            (Term::Bytelist(a), Term::Bytelist(b)) => a == b,
            (Term::Integer(a), Term::Integer(b)) => a == b,
            (Term::BigInteger(a), Term::BigInteger(b)) => a == b,
            (Term::Float(a), Term::Float(b)) => a == b,
            (Term::Tuple(a), Term::Tuple(b)) => a == b,
            (Term::Null, Term::Null) => true,
            (Term::Boolean(a), Term::Boolean(b)) => a == b,
            (Term::Dictionary(a), Term::Dictionary(b)) => a == b,
            // `Nil` and `List([])` are both the empty list.
            (Term::List(_) | Term::Nil, Term::List(_) | Term::Nil) => {
                self.as_list() == other.as_list()
            }
            _ => false,
        }
    }
}

impl From<bool> for Term {
    fn from(value: bool) -> Self {
        Term::Boolean(value)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Term {
            fn from(value: $t) -> Self {
                Term::Integer(i64::from(value))
            }
        })*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Term {
    fn from(value: u64) -> Self {
        Term::big(BigInt::from(value))
    }
}

impl From<usize> for Term {
    fn from(value: usize) -> Self {
        Term::big(BigInt::from(value))
    }
}

impl From<BigInt> for Term {
    fn from(value: BigInt) -> Self {
        Term::big(value)
    }
}

impl From<f64> for Term {
    fn from(value: f64) -> Self {
        Term::Float(value)
    }
}

impl From<&str> for Term {
    fn from(value: &str) -> Self {
        Term::Binary(value.as_bytes().to_vec())
    }
}

impl From<String> for Term {
    fn from(value: String) -> Self {
        Term::Binary(value.into_bytes())
    }
}

impl From<Atom> for Term {
    fn from(value: Atom) -> Self {
        Term::Atom(value)
    }
}

impl From<Dictionary> for Term {
    fn from(value: Dictionary) -> Self {
        Term::Dictionary(value)
    }
}

impl From<Vec<Term>> for Term {
    fn from(value: Vec<Term>) -> Self {
        Term::List(value)
    }
}

impl<T: Into<Term>> From<Option<T>> for Term {
    fn from(value: Option<T>) -> Self {
        value.map_or(Term::Null, Into::into)
    }
}

/// Erlang-style notation: `{reply, [1, 2]}`, `<<"text">>`, `<true>`.
impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Atom(atom) => write!(f, "{atom}"),
            Term::Binary(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => write!(f, "<<{text:?}>>"),
                Err(_) => write_byte_repr(f, bytes),
            },
            Term::Bytelist(bytes) => write_byte_repr(f, bytes),
            Term::Integer(n) => write!(f, "{n}"),
            Term::BigInteger(n) => write!(f, "{n}"),
            Term::Float(x) => write!(f, "{x}"),
            Term::List(items) => write_seq(f, "[", items.iter(), "]"),
            Term::Nil => f.write_str("[]"),
            Term::Tuple(items) => write_seq(f, "{", items.iter(), "}"),
            Term::Null => f.write_str("<nil>"),
            Term::Boolean(true) => f.write_str("<true>"),
            Term::Boolean(false) => f.write_str("<false>"),
            Term::Dictionary(dict) => {
                f.write_str("[")?;
                for (i, (k, v)) in dict.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{{{k}, {v}}}")?;
                }
                f.write_str("]")
            }
        }
    }
}

fn write_byte_repr(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    f.write_str("<<")?;
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{b}")?;
    }
    f.write_str(">>")
}

fn write_seq<'a>(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    items: impl Iterator<Item = &'a Term>,
    close: &str,
) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(close)
}
