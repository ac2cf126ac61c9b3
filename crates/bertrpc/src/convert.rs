//! JSON <-> term mapping for command-line arguments and output.
//!
//! JSON in: `null` is nil, strings are binaries, arrays are lists, objects
//! are dictionaries with atom keys. Integers outside i64 become bignums.
//!
//! JSON out: atoms and UTF-8 binaries are strings, other binaries and
//! bytelists are byte arrays, tuples and lists are arrays, bignums are
//! decimal strings. Dictionaries with text keys become objects; any other
//! dictionary is an array of `[key, value]` pairs.

use bertrpc_term::{BigInt, Dictionary, Term};
use serde_json::{Map, Number, Value};

pub fn json_to_term(value: &Value) -> Term {
    match value {
        Value::Null => Term::Null,
        Value::Bool(b) => Term::Boolean(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Term::Integer(i)
            } else if let Some(u) = n.as_u64() {
                Term::big(BigInt::from(u))
            } else {
                Term::Float(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => Term::from(s.as_str()),
        Value::Array(items) => Term::List(items.iter().map(json_to_term).collect()),
        Value::Object(map) => Term::Dictionary(
            map.iter()
                .map(|(k, v)| (Term::atom(k.as_str()), json_to_term(v)))
                .collect(),
        ),
    }
}

/// Parse `--args`: a JSON array is the argument list, any other value is a
/// single argument.
pub fn parse_args(text: &str) -> Result<Vec<Term>, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;
    Ok(match value {
        Value::Array(items) => items.iter().map(json_to_term).collect(),
        other => vec![json_to_term(&other)],
    })
}

pub fn term_to_json(term: &Term) -> Value {
    match term {
        Term::Atom(atom) => Value::String(atom.name().to_string()),
        Term::Binary(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => Value::String(text.to_string()),
            Err(_) => bytes_to_json(bytes),
        },
        Term::Bytelist(bytes) => bytes_to_json(bytes),
        Term::Integer(n) => Value::from(*n),
        Term::BigInteger(n) => Value::String(n.to_string()),
        Term::Float(x) => Number::from_f64(*x).map_or(Value::Null, Value::Number),
        Term::List(items) | Term::Tuple(items) => {
            Value::Array(items.iter().map(term_to_json).collect())
        }
        Term::Nil => Value::Array(Vec::new()),
        Term::Null => Value::Null,
        Term::Boolean(b) => Value::Bool(*b),
        Term::Dictionary(dict) => dictionary_to_json(dict),
    }
}

fn bytes_to_json(bytes: &[u8]) -> Value {
    Value::Array(bytes.iter().map(|b| Value::from(*b)).collect())
}

fn dictionary_to_json(dict: &Dictionary) -> Value {
    let text_keys: Option<Map<String, Value>> = dict
        .iter()
        .map(|(k, v)| {
            let key = k.as_atom_name().or_else(|| match k {
                Term::Binary(_) => k.as_str(),
                _ => None,
            })?;
            Some((key.to_string(), term_to_json(v)))
        })
        .collect();
    match text_keys {
        Some(map) => Value::Object(map),
        None => Value::Array(
            dict.iter()
                .map(|(k, v)| Value::Array(vec![term_to_json(k), term_to_json(v)]))
                .collect(),
        ),
    }
}
