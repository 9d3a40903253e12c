//! Percent-encoding, quoting and search primitives.
//!
//! Every function here is a pure function over byte slices. Decoding is
//! strict: a `%` that is not followed by two hex digits is an error, never
//! passed through, because the input is untrusted request data.
//!
//! # Examples
//! ```
//! use maker_req::codec;
//!
//! let decoded = codec::decode_to_vec(b"caf%C3%A9+au+lait").unwrap();
//! assert_eq!(decoded, "café au lait".as_bytes());
//!
//! let mut encoded = Vec::new();
//! codec::encode(&decoded, &mut encoded);
//! assert_eq!(encoded, b"caf%C3%A9%20au%20lait");
//!
//! assert!(codec::decode_to_vec(b"100%").is_err());
//! ```

use crate::{
    errors::{Error, Result},
    http::types::MatchMode,
};
use memchr::{memchr2, memmem};
use percent_encoding::{percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::borrow::Cow;

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

#[inline(always)]
const fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Everything outside `[A-Za-z0-9_.-]`, the set [`encode`] escapes.
const FORM_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'_').remove(b'.').remove(b'-');

/// Everything but the RFC 3986 unreserved and reserved characters, the set
/// [`escape`] escapes.
const URL_SET: &AsciiSet = &FORM_SET
    .remove(b'~')
    .remove(b':')
    .remove(b'/')
    .remove(b'?')
    .remove(b'#')
    .remove(b'[')
    .remove(b']')
    .remove(b'@')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=');

#[inline]
fn encode_set(src: &[u8], set: &'static AsciiSet, out: &mut Vec<u8>) -> usize {
    let start = out.len();
    for chunk in percent_encode(src, set) {
        out.extend_from_slice(chunk.as_bytes());
    }
    out.len() - start
}

// DECODE

/// Percent-decodes `buf` in place and returns the decoded length.
///
/// `%XX` becomes the byte `0xXX` and `+` becomes a space (form dialect).
/// The decoded bytes occupy `buf[..len]`; the tail is left untouched.
///
/// # Errors
/// [`Error::MalformedEncoding`] when a `%` is not followed by two hex
/// digits, including a `%` truncated at the end of the input. The offset
/// points at the `%`.
// Hand-written: `percent_encoding::percent_decode` passes malformed escapes
// through unchanged.
pub fn decode_in_place(buf: &mut [u8]) -> Result<usize> {
    // Bytes before the first escape decode to themselves.
    let mut read = match memchr2(b'%', b'+', buf) {
        Some(pos) => pos,
        None => return Ok(buf.len()),
    };
    let mut write = read;

    while read < buf.len() {
        let byte = match buf[read] {
            b'+' => {
                read += 1;
                b' '
            }
            b'%' => {
                let hi = buf.get(read + 1).copied().and_then(hex_value);
                let lo = buf.get(read + 2).copied().and_then(hex_value);

                match (hi, lo) {
                    (Some(hi), Some(lo)) => {
                        read += 3;
                        (hi << 4) | lo
                    }
                    _ => return Err(Error::malformed(read)),
                }
            }
            other => {
                read += 1;
                other
            }
        };

        buf[write] = byte;
        write += 1;
    }

    Ok(write)
}

/// Percent-decodes `src` into `dst` and returns the decoded length.
///
/// Decoding never grows the input, so `dst` must be at least as long as
/// `src`.
///
/// # Errors
/// - [`Error::BadArgument`] if `dst` is shorter than `src`
/// - [`Error::MalformedEncoding`] as for [`decode_in_place`]
pub fn decode(dst: &mut [u8], src: &[u8]) -> Result<usize> {
    if dst.len() < src.len() {
        return Err(Error::BadArgument);
    }

    let target = &mut dst[..src.len()];
    target.copy_from_slice(src);
    decode_in_place(target)
}

/// Percent-decodes `src` into a new vector.
pub fn decode_to_vec(src: &[u8]) -> Result<Vec<u8>> {
    let mut buf = src.to_vec();
    let len = decode_in_place(&mut buf)?;
    buf.truncate(len);
    Ok(buf)
}

/// Alias of [`decode_to_vec`] under the name used by [`Join::Unescape`](crate::Join::Unescape).
#[inline]
pub fn unescape(src: &[u8]) -> Result<Vec<u8>> {
    decode_to_vec(src)
}

// ENCODE

/// Exact number of bytes [`encode`] appends for `src`.
#[inline]
pub fn encoded_len(src: &[u8]) -> usize {
    percent_encode(src, FORM_SET).map(str::len).sum()
}

/// Percent-encodes every byte outside `[A-Za-z0-9_.-]` and appends the
/// result to `out`. Returns the number of bytes appended, at most
/// `3 * src.len()`.
///
/// Space is written as `%20`, so the output decodes back to `src` in both
/// the query and the form dialect.
#[inline]
pub fn encode(src: &[u8], out: &mut Vec<u8>) -> usize {
    out.reserve(src.len());
    encode_set(src, FORM_SET, out)
}

/// URL-style escaping: keeps every RFC 3986 unreserved and reserved
/// character and percent-escapes the rest (controls, space, `"`, `%`, `<`,
/// `>`, `\`, `^`, `` ` ``, `{`, `|`, `}` and all non-ASCII bytes).
///
/// Returns the number of bytes appended to `out`.
#[inline]
pub fn escape(src: &[u8], out: &mut Vec<u8>) -> usize {
    encode_set(src, URL_SET, out)
}

// QUOTE

/// Writes `src` as an HTTP quoted-string: wrapped in `"`, with `"` and `\`
/// backslash-escaped and other control bytes written as `\xHH`.
///
/// Returns the number of bytes appended to `out`.
pub fn quote(src: &[u8], out: &mut Vec<u8>) -> usize {
    let start = out.len();
    out.reserve(src.len() + 2);
    out.push(b'"');

    for &byte in src {
        match byte {
            b'"' | b'\\' => out.extend_from_slice(&[b'\\', byte]),
            0x00..=0x1F | 0x7F => out.extend_from_slice(&[
                b'\\',
                b'x',
                HEX_UPPER[(byte >> 4) as usize],
                HEX_UPPER[(byte & 0x0F) as usize],
            ]),
            _ => out.push(byte),
        }
    }

    out.push(b'"');
    out.len() - start
}

/// Reverses [`quote`]. Input that is not wrapped in double quotes is
/// returned unchanged.
///
/// # Errors
/// [`Error::MalformedEncoding`] for a dangling backslash or a `\x` escape
/// without two hex digits.
pub fn unquote(src: &[u8]) -> Result<Cow<'_, [u8]>> {
    let inner = match src {
        [b'"', inner @ .., b'"'] => inner,
        _ => return Ok(Cow::Borrowed(src)),
    };

    if !inner.contains(&b'\\') {
        return Ok(Cow::Borrowed(inner));
    }

    let mut out = Vec::with_capacity(inner.len());
    let mut i = 0;

    while i < inner.len() {
        match inner[i] {
            b'\\' => match inner.get(i + 1) {
                Some(b'x') => {
                    let hi = inner.get(i + 2).copied().and_then(hex_value);
                    let lo = inner.get(i + 3).copied().and_then(hex_value);
                    match (hi, lo) {
                        (Some(hi), Some(lo)) => out.push((hi << 4) | lo),
                        // +1 for the opening quote
                        _ => return Err(Error::malformed(i + 1)),
                    }
                    i += 4;
                }
                Some(&escaped) => {
                    out.push(escaped);
                    i += 2;
                }
                None => return Err(Error::malformed(i + 1)),
            },
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }

    Ok(Cow::Owned(out))
}

/// Position in the quoted-string body `quoted` of the byte that [`unquote`]
/// wrote at `at`.
pub(crate) fn unquoted_offset(quoted: &[u8], at: usize) -> usize {
    let mut src = 0;
    for _ in 0..at {
        src += match quoted.get(src..) {
            Some([b'\\', b'x', ..]) => 4,
            Some([b'\\', ..]) => 2,
            _ => 1,
        };
    }
    src
}

// SEARCH

/// Finds `needle` in `haystack`.
///
/// With [`MatchMode::Partial`], a needle that is only partly present at the
/// very end of the haystack is reported at the position where that prefix
/// starts. A full match anywhere always wins over a partial one.
/// `None` means the needle (or, in partial mode, any prefix of it ending the
/// haystack) does not occur. An empty needle matches at `0`.
///
/// # Examples
/// ```
/// use maker_req::{codec, MatchMode};
///
/// let hay = b"data\r\n--bou";
/// assert_eq!(codec::index(hay, b"\r\n--boundary", MatchMode::Full), None);
/// assert_eq!(codec::index(hay, b"\r\n--boundary", MatchMode::Partial), Some(4));
/// ```
pub fn index(haystack: &[u8], needle: &[u8], mode: MatchMode) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }

    if let Some(pos) = memmem::find(haystack, needle) {
        return Some(pos);
    }

    match mode {
        MatchMode::Full => None,
        MatchMode::Partial => {
            let from = haystack.len().saturating_sub(needle.len() - 1);
            (from..haystack.len()).find(|&start| needle.starts_with(&haystack[start..]))
        }
    }
}

// SIZES

/// Converts a size string such as `512`, `64k` or `10M` to bytes.
///
/// Suffixes `K`, `M` and `G` (any case) are powers of 1024. Surrounding
/// whitespace is ignored.
///
/// # Errors
/// [`Error::MalformedEncoding`] for anything else, including overflow.
pub fn atoi64(src: &[u8]) -> Result<i64> {
    let trimmed = crate::http::types::trim_ows(src);
    let (digits, shift) = match trimmed.last() {
        Some(b'k' | b'K') => (&trimmed[..trimmed.len() - 1], 10),
        Some(b'm' | b'M') => (&trimmed[..trimmed.len() - 1], 20),
        Some(b'g' | b'G') => (&trimmed[..trimmed.len() - 1], 30),
        _ => (trimmed, 0),
    };

    crate::http::types::slice_to_i64(crate::http::types::trim_ows(digits))
        .and_then(|n| n.checked_mul(1i64 << shift))
        .ok_or(Error::malformed(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::*;

    #[test]
    fn decode_basic() {
        let cases: &[(&[u8], &str)] = &[
            (b"", ""),
            (b"plain", "plain"),
            (b"a+b", "a b"),
            (b"%41%62c", "Abc"),
            (b"%2b+%2B", "+ +"),
            (b"x%00y", "x\0y"),
            (b"%e2%82%ac", "€"),
        ];

        for (src, expected) in cases {
            assert_eq!(str_op(&decode_to_vec(src).unwrap()), *expected);
        }
    }

    #[test]
    fn decode_malformed() {
        assert_eq!(decode_to_vec(b"%"), Err(Error::malformed(0)));
        assert_eq!(decode_to_vec(b"%GZ"), Err(Error::malformed(0)));
        assert_eq!(decode_to_vec(b"ab%4"), Err(Error::malformed(2)));
        assert_eq!(decode_to_vec(b"ok%20%zz"), Err(Error::malformed(5)));
    }

    #[test]
    fn decode_buffers() {
        let mut dst = [0u8; 8];
        assert_eq!(decode(&mut dst, b"a%20b"), Ok(3));
        assert_eq!(&dst[..3], b"a b");

        let mut small = [0u8; 2];
        assert_eq!(decode(&mut small, b"abc"), Err(Error::BadArgument));

        let mut buf = *b"%41%42tail";
        let len = decode_in_place(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"ABtail");
    }

    #[test]
    fn encode_exact() {
        let mut out = Vec::new();
        assert_eq!(encode(b"a b&c=d/_.-~", &mut out), 22);
        assert_eq!(str_op(&out), "a%20b%26c%3Dd%2F_.-%7E");
        assert_eq!(encoded_len(b"a b&c=d/_.-~"), 22);
    }

    #[test]
    fn encode_round_trip_all_bytes() {
        let all: Vec<u8> = (0..=255u8).collect();
        let mut encoded = Vec::new();
        let len = encode(&all, &mut encoded);

        assert!(len <= 3 * all.len());
        assert_eq!(decode_to_vec(&encoded).unwrap(), all);
    }

    #[test]
    fn encode_upper_hex_and_non_ascii() {
        let mut out = Vec::new();
        assert_eq!(encode("é~\x7f".as_bytes(), &mut out), 12);
        assert_eq!(str_op(&out), "%C3%A9%7E%7F");
        assert_eq!(encoded_len("é~\x7f".as_bytes()), 12);

        out.clear();
        escape("é ~<>".as_bytes(), &mut out);
        assert_eq!(str_op(&out), "%C3%A9%20~%3C%3E");
    }

    #[test]
    fn escape_keeps_url_syntax() {
        let mut out = Vec::new();
        escape(b"/a b?x=1&y=\"%\"", &mut out);
        assert_eq!(str_op(&out), "/a%20b?x=1&y=%22%25%22");
        assert_eq!(unescape(b"%2Fa%20b").unwrap(), b"/a b");
    }

    #[test]
    fn quote_and_unquote() {
        let mut out = Vec::new();
        quote(b"say \"hi\"\\\n", &mut out);
        assert_eq!(str_op(&out), r#""say \"hi\"\\\x0A""#);
        assert_eq!(&*unquote(&out).unwrap(), b"say \"hi\"\\\n");

        assert_eq!(&*unquote(b"bare").unwrap(), b"bare");
        assert_eq!(&*unquote(b"\"simple\"").unwrap(), b"simple");
        assert!(matches!(unquote(b"\"simple\"").unwrap(), Cow::Borrowed(_)));
        assert_eq!(unquote(b"\"bad\\\""), Err(Error::malformed(4)));
        assert_eq!(unquote(b"\"x\\x4\""), Err(Error::malformed(2)));

        // a \" b \x41 c
        let body = br#"a\"b\x41c"#;
        assert_eq!(&*unquote(b"\"a\\\"b\\x41c\"").unwrap(), b"a\"bAc");
        assert_eq!(unquoted_offset(body, 0), 0);
        assert_eq!(unquoted_offset(body, 2), 3);
        assert_eq!(unquoted_offset(body, 4), 8);
    }

    #[test]
    fn search() {
        assert_eq!(index(b"hello world", b"world", MatchMode::Full), Some(6));
        assert_eq!(index(b"hello world", b"worlds", MatchMode::Full), None);
        assert_eq!(index(b"hello world", b"worlds", MatchMode::Partial), Some(6));
        assert_eq!(index(b"hello wor", b"world", MatchMode::Partial), Some(6));
        assert_eq!(index(b"hello", b"xyz", MatchMode::Partial), None);
        assert_eq!(index(b"abc", b"", MatchMode::Full), Some(0));
        assert_eq!(index(b"", b"abc", MatchMode::Partial), None);
        // A full match earlier in the buffer wins.
        assert_eq!(index(b"--b x --", b"--b", MatchMode::Partial), Some(0));
    }

    #[test]
    fn sizes() {
        assert_eq!(atoi64(b"512"), Ok(512));
        assert_eq!(atoi64(b" 64k "), Ok(64 * 1024));
        assert_eq!(atoi64(b"10M"), Ok(10 << 20));
        assert_eq!(atoi64(b"2g"), Ok(2 << 30));
        assert_eq!(atoi64(b"-1"), Ok(-1));
        assert_eq!(atoi64(b"-9223372036854775808"), Ok(i64::MIN));
        assert!(atoi64(b"").is_err());
        assert!(atoi64(b"12q").is_err());
        assert!(atoi64(b"9999999999999G").is_err());
    }
}
