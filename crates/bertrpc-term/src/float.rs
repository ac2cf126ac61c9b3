//! The 31-byte ASCII FLOAT payload.

use crate::error::{CodecError, Malformed, Result};
use crate::tag::FLOAT_WIDTH;

/// Render `value` in exponential notation (`3.14159e+0`), NUL-padded to
/// exactly [`FLOAT_WIDTH`] bytes.
pub fn format_float(value: f64) -> Result<[u8; FLOAT_WIDTH]> {
    if !value.is_finite() {
        return Err(CodecError::EncodeRange(format!(
            "{value} has no BERT float representation"
        )));
    }

    // `{:e}` is the shortest round-trip form; the wire form signs the exponent.
    let mut text = format!("{value:e}");
    if let Some(pos) = text.find('e') {
        if !text[pos + 1..].starts_with('-') {
            text.insert(pos + 1, '+');
        }
    }

    if text.len() > FLOAT_WIDTH {
        return Err(CodecError::EncodeRange(format!(
            "float text {text:?} exceeds {FLOAT_WIDTH} bytes"
        )));
    }

    let mut out = [0u8; FLOAT_WIDTH];
    out[..text.len()].copy_from_slice(text.as_bytes());
    Ok(out)
}

/// Parse a FLOAT payload, ignoring NUL padding.
///
/// Erlang peers write `%.20e` text (`3.14158999999999988262e+00`); both
/// forms parse.
pub fn parse_float(raw: &[u8]) -> std::result::Result<f64, Malformed> {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let text = std::str::from_utf8(&raw[..end])
        .map_err(|_| Malformed::InvalidFloat(String::from_utf8_lossy(&raw[..end]).into_owned()))?
        .trim();
    text.parse::<f64>()
        .map_err(|_| Malformed::InvalidFloat(text.to_string()))
}
