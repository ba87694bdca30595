//! String, hashed-string, and float-constant encodings.

use crate::varint;

/// Resolve backslash escapes to raw bytes.
///
/// `\n`, `\r`, `\t` map to their control characters; any other escaped
/// character stands for itself (`\\`, `\"`).
pub fn unescape(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('n') => out.push(b'\n'),
            Some('r') => out.push(b'\r'),
            Some('t') => out.push(b'\t'),
            Some(c) => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
            None => out.push(b'\\'),
        }
    }
    out
}

/// Length-prefixed string: unsigned varint length, raw bytes, NUL.
/// The length counts the NUL.
pub fn encode_str(s: &str) -> Vec<u8> {
    let mut payload = unescape(s);
    payload.push(0);
    let mut out = varint::encode_uint(payload.len() as u64, None);
    out.extend(payload);
    out
}

/// Selector hash: CRC-32 over the unescaped payload, NUL excluded.
pub fn selector_hash(s: &str) -> u32 {
    crc32fast::hash(&unescape(s))
}

/// Hashed string: length-prefixed string followed by its little-endian
/// CRC-32, matching the runtime's selector hashing.
pub fn encode_str_hash(s: &str) -> Vec<u8> {
    let mut out = encode_str(s);
    out.extend(selector_hash(s).to_le_bytes());
    out
}

/// Render a double in hexadecimal significand form, e.g.
/// `0x1.8000000000000p+1`. The rendering is bit-exact, so float constants
/// survive any host's decimal formatting differences.
pub fn float_hex(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v < 0.0 { "-inf" } else { "inf" }.to_string();
    }
    let bits = v.to_bits();
    let sign = if bits >> 63 != 0 { "-" } else { "" };
    let exp = ((bits >> 52) & 0x7ff) as i64;
    let frac = bits & ((1u64 << 52) - 1);
    if exp == 0 && frac == 0 {
        return format!("{sign}0x0.0p+0");
    }
    if exp == 0 {
        // Subnormal: no implicit leading bit, fixed minimum exponent.
        return format!("{sign}0x0.{frac:013x}p-1022");
    }
    format!("{sign}0x1.{frac:013x}p{:+}", exp - 1023)
}

/// Encoded float constant: the hex rendering as a length-prefixed string.
pub fn encode_float(v: f64) -> Vec<u8> {
    encode_str(&float_hex(v))
}
