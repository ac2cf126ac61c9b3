//! Wire tag bytes. The numeric values are fixed by the Erlang external
//! term format and must never change.

/// Version byte that prefixes every top-level encoded term.
pub const START: u8 = 131;

/// (len:u8) name_bytes..
pub const SMALL_ATOM: u8 = 115;
/// (len:u16be) name_bytes..
pub const ATOM: u8 = 100;
/// (len:u16be) utf8 name_bytes.. (decode only)
pub const ATOM_UTF8: u8 = 118;
/// (len:u8) utf8 name_bytes.. (decode only)
pub const SMALL_ATOM_UTF8: u8 = 119;
/// (length:u32be) data..
pub const BINARY: u8 = 109;
/// Unsigned 8-bit integer.
pub const SMALL_INTEGER: u8 = 97;
/// Signed 32-bit integer in big-endian format.
pub const INTEGER: u8 = 98;
/// (data_len:u8) (is_neg:u8) little-endian digits..
pub const SMALL_BIG: u8 = 110;
/// (data_len:u32be) (is_neg:u8) little-endian digits..
pub const LARGE_BIG: u8 = 111;
/// 31 bytes of NUL-padded exponential notation.
pub const FLOAT: u8 = 99;
/// 8-byte big-endian IEEE double (decode only).
pub const NEW_FLOAT: u8 = 70;
/// (length:u16be) bytes..
pub const STRING: u8 = 107;
/// (length:u32be) elements.. NIL
pub const LIST: u8 = 108;
/// (arity:u8) elements..
pub const SMALL_TUPLE: u8 = 104;
/// (arity:u32be) elements..
pub const LARGE_TUPLE: u8 = 105;
/// Empty list; also terminates every LIST.
pub const NIL: u8 = 106;

/// Exact width of the FLOAT payload.
pub const FLOAT_WIDTH: usize = 31;

/// Smallest value encoded with INTEGER rather than a bignum.
pub const INTEGER_MIN: i64 = -134_217_728;
/// Largest value encoded with INTEGER rather than a bignum.
pub const INTEGER_MAX: i64 = 134_217_727;

/// Human-readable tag name for diagnostics.
pub fn name(tag: u8) -> &'static str {
    match tag {
        START => "START",
        SMALL_ATOM => "SMALL_ATOM",
        ATOM => "ATOM",
        ATOM_UTF8 => "ATOM_UTF8",
        SMALL_ATOM_UTF8 => "SMALL_ATOM_UTF8",
        BINARY => "BINARY",
        SMALL_INTEGER => "SMALL_INTEGER",
        INTEGER => "INTEGER",
        SMALL_BIG => "SMALL_BIG",
        LARGE_BIG => "LARGE_BIG",
        FLOAT => "FLOAT",
        NEW_FLOAT => "NEW_FLOAT",
        STRING => "STRING",
        LIST => "LIST",
        SMALL_TUPLE => "SMALL_TUPLE",
        LARGE_TUPLE => "LARGE_TUPLE",
        NIL => "NIL",
        _ => "UNKNOWN",
    }
}
