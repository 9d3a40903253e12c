//! Shared byte-level helpers and small protocol enums

// TO LOWER CASE

#[rustfmt::skip]
const ASCII_TABLE: [u8; 256] = [
    //   x0    x1    x2    x3    x4    x5    x6    x7    x8    x9    xA    xB    xC    xD    xE    xF
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F, // 0x
    0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1A, 0x1B, 0x1C, 0x1D, 0x1E, 0x1F, // 1x
    0x20, 0x21, 0x22, 0x23, 0x24, 0x25, 0x26, 0x27, 0x28, 0x29, 0x2A, 0x2B, 0x2C, 0x2D, 0x2E, 0x2F, // 2x
    0x30, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3A, 0x3B, 0x3C, 0x3D, 0x3E, 0x3F, // 3x
    0x40, b'a', b'b', b'c', b'd', b'e', b'f', b'g', b'h', b'i', b'j', b'k', b'l', b'm', b'n', b'o', // 4x
    b'p', b'q', b'r', b's', b't', b'u', b'v', b'w', b'x', b'y', b'z', 0x5B, 0x5C, 0x5D, 0x5E, 0x5F, // 5x
    0x60, b'a', b'b', b'c', b'd', b'e', b'f', b'g', b'h', b'i', b'j', b'k', b'l', b'm', b'n', b'o', // 6x
    b'p', b'q', b'r', b's', b't', b'u', b'v', b'w', b'x', b'y', b'z', 0x7B, 0x7C, 0x7D, 0x7E, 0x7F, // 7x
    0x80, 0x81, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89, 0x8A, 0x8B, 0x8C, 0x8D, 0x8E, 0x8F, // 8x
    0x90, 0x91, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9A, 0x9B, 0x9C, 0x9D, 0x9E, 0x9F, // 9x
    0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7, 0xA8, 0xA9, 0xAA, 0xAB, 0xAC, 0xAD, 0xAE, 0xAF, // Ax
    0xB0, 0xB1, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0xBA, 0xBB, 0xBC, 0xBD, 0xBE, 0xBF, // Bx
    0xC0, 0xC1, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7, 0xC8, 0xC9, 0xCA, 0xCB, 0xCC, 0xCD, 0xCE, 0xCF, // Cx
    0xD0, 0xD1, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA, 0xDB, 0xDC, 0xDD, 0xDE, 0xDF, // Dx
    0xE0, 0xE1, 0xE2, 0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8, 0xE9, 0xEA, 0xEB, 0xEC, 0xED, 0xEE, 0xEF, // Ex
    0xF0, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8, 0xF9, 0xFA, 0xFB, 0xFC, 0xFD, 0xFE, 0xFF, // Fx
];

#[inline(always)]
pub(crate) const fn to_lower(byte: u8) -> u8 {
    ASCII_TABLE[byte as usize]
}

/// ASCII case-insensitive comparison, the rule every table lookup uses.
#[inline]
pub fn eq_ignore_case(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| to_lower(*x) == to_lower(*y))
}

#[inline(always)]
pub(crate) fn slice_to_usize(bytes: &[u8]) -> Option<usize> {
    if bytes.is_empty() {
        return None;
    }

    let mut result: usize = 0;

    for &byte in bytes {
        if !byte.is_ascii_digit() {
            return None;
        }

        result = result
            .checked_mul(10)?
            .checked_add((byte - b'0') as usize)?;
    }

    Some(result)
}

/// Parses `[+-]?digits` into an `i64`, rejecting overflow. The whole range
/// is accepted, `i64::MIN` included.
#[inline]
pub(crate) fn slice_to_i64(bytes: &[u8]) -> Option<i64> {
    let (negative, digits) = match bytes.first()? {
        b'-' => (true, &bytes[1..]),
        b'+' => (false, &bytes[1..]),
        _ => (false, bytes),
    };

    if digits.is_empty() {
        return None;
    }

    let mut magnitude: u64 = 0;
    for &byte in digits {
        if !byte.is_ascii_digit() {
            return None;
        }
        magnitude = magnitude
            .checked_mul(10)?
            .checked_add((byte - b'0') as u64)?;
    }

    match negative {
        true => 0i64.checked_sub_unsigned(magnitude),
        false => i64::try_from(magnitude).ok(),
    }
}

/// Strips optional whitespace (space and horizontal tab) from both ends.
#[inline]
pub(crate) fn trim_ows(mut bytes: &[u8]) -> &[u8] {
    while let [b' ' | b'\t', rest @ ..] = bytes {
        bytes = rest;
    }
    while let [rest @ .., b' ' | b'\t'] = bytes {
        bytes = rest;
    }
    bytes
}

// JOIN

/// How each value is re-encoded when several values are joined into one
/// string, see [`Table::join`](crate::Table::join).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Join {
    /// Values are copied unchanged.
    #[default]
    Raw,
    /// URL-style escaping, see [`codec::escape`](crate::codec::escape).
    Escape,
    /// Percent-decoding, see [`codec::unescape`](crate::codec::unescape).
    ///
    /// Joining never fails, so a value that fails to decode is copied
    /// unchanged instead of aborting the join. Stored values were already
    /// decoded strictly on the way in; this is a second pass over trusted
    /// bytes, and each undecodable value is reported with a `trace` event.
    Unescape,
    /// Full form encoding, see [`codec::encode`](crate::codec::encode).
    UrlEncode,
    /// Quoted-string, see [`codec::quote`](crate::codec::quote).
    Quote,
}

// MATCH MODE

/// Matching rule for [`codec::index`](crate::codec::index).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MatchMode {
    /// The whole needle must occur in the haystack.
    Full,
    /// Like `Full`, but a needle prefix that runs up to the very end of the
    /// haystack also counts. Streaming boundary detection relies on this to
    /// spot a delimiter split across two reads.
    Partial,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignore_case() {
        assert!(eq_ignore_case(b"Max-Age", b"max-age"));
        assert!(eq_ignore_case(b"", b""));
        assert!(!eq_ignore_case(b"path", b"paths"));
        assert!(!eq_ignore_case(b"path", b"pata"));
        // Only ASCII letters fold.
        assert!(!eq_ignore_case(&[0xC0], &[0xE0]));
    }

    #[test]
    fn numbers() {
        assert_eq!(slice_to_usize(b"0"), Some(0));
        assert_eq!(slice_to_usize(b"4096"), Some(4096));
        assert_eq!(slice_to_usize(b""), None);
        assert_eq!(slice_to_usize(b"12a"), None);
        assert_eq!(slice_to_usize(b"99999999999999999999999"), None);

        assert_eq!(slice_to_i64(b"-15"), Some(-15));
        assert_eq!(slice_to_i64(b"+15"), Some(15));
        assert_eq!(slice_to_i64(b"-"), None);
        assert_eq!(slice_to_i64(b"9223372036854775808"), None);
        assert_eq!(slice_to_i64(b"-9223372036854775808"), Some(i64::MIN));
        assert_eq!(slice_to_i64(b"-9223372036854775809"), None);
        assert_eq!(slice_to_i64(b"+9223372036854775807"), Some(i64::MAX));
    }

    #[test]
    fn trim() {
        assert_eq!(trim_ows(b"  a b\t "), b"a b");
        assert_eq!(trim_ows(b"   "), b"");
        assert_eq!(trim_ows(b""), b"");
    }
}
