//! Name/value records allocated from a request [`Pool`].

use crate::{
    codec,
    errors::{Error, Result},
    http::table::Table,
    pool::Pool,
};
use std::fmt;

/// Decoded name/value pair, the shape shared by params and cookies.
///
/// Both byte strings live in the pool and never change once the record is
/// built; updating a param means building a new record. The payload is
/// followed by a NUL byte in the pool so it can be handed to C code as-is,
/// see [`Value::data_with_nul`]. The payload itself may contain NULs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Value<'p> {
    name: &'p [u8],
    // Payload plus its NUL terminator, never empty.
    data: &'p [u8],
    status: Result<()>,
}

impl<'p> Value<'p> {
    /// Copies `name` and `data` into the pool without decoding.
    pub fn make(pool: &'p Pool, name: &[u8], data: &[u8]) -> Self {
        Self {
            name: pool.alloc_bytes(name),
            data: alloc_with_nul(pool, data),
            status: Ok(()),
        }
    }

    /// Percent-decodes an encoded name/value pair into the pool.
    ///
    /// The value is decoded first, then the name.
    ///
    /// # Errors
    /// - [`Error::BadArgument`] if `name` is empty
    /// - [`Error::MalformedEncoding`] if either span fails to decode; the
    ///   offset is relative to the failing span
    pub fn decode(pool: &'p Pool, name: &[u8], value: &[u8]) -> Result<Self> {
        Self::decode_at(pool, (name, 0), (value, 0))
    }

    /// [`Value::decode`] for spans cut out of a larger buffer: each span comes
    /// with its start position, and error offsets point into that buffer.
    pub(crate) fn decode_at(
        pool: &'p Pool,
        (name, name_at): (&[u8], usize),
        (value, value_at): (&[u8], usize),
    ) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::BadArgument);
        }

        let data = decode_with_nul(pool, value).map_err(|e| e.at(value_at))?;
        let name = decode_into_pool(pool, name).map_err(|e| e.at(name_at))?;

        Ok(Self {
            name,
            data,
            status: Ok(()),
        })
    }

    /// Decoded name.
    #[inline(always)]
    pub const fn name(&self) -> &'p [u8] {
        self.name
    }

    /// Decoded payload, without the trailing NUL.
    #[inline(always)]
    pub fn data(&self) -> &'p [u8] {
        let data: &'p [u8] = self.data;
        &data[..data.len() - 1]
    }

    /// Payload including the NUL terminator stored after it.
    #[inline(always)]
    pub const fn data_with_nul(&self) -> &'p [u8] {
        self.data
    }

    /// Payload size in bytes.
    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.data.len() - 1
    }

    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Outcome of the decode that produced this record.
    ///
    /// Always `Ok(())` for records built by this crate: a failed decode
    /// returns the error instead of a record.
    #[inline(always)]
    pub const fn status(&self) -> Result<()> {
        self.status
    }

    /// Name as UTF-8, if it is valid.
    #[inline]
    pub fn name_str(&self) -> Option<&'p str> {
        simdutf8::basic::from_utf8(self.name).ok()
    }

    /// Payload as UTF-8, if it is valid.
    #[inline]
    pub fn as_str(&self) -> Option<&'p str> {
        simdutf8::basic::from_utf8(self.data()).ok()
    }

    /// Re-encodes the record as `name=value`, allocated from `pool`.
    pub fn encode(&self, pool: &'p Pool) -> &'p [u8] {
        let data = self.data();
        let mut out =
            Vec::with_capacity(codec::encoded_len(self.name) + 1 + codec::encoded_len(data));
        codec::encode(self.name, &mut out);
        out.push(b'=');
        codec::encode(data, &mut out);
        pool.alloc_bytes(&out)
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={}",
            String::from_utf8_lossy(self.name),
            String::from_utf8_lossy(self.data())
        )
    }
}

/// Copies `src` into the pool followed by a NUL, returning both.
#[inline]
pub(crate) fn alloc_with_nul<'p>(pool: &'p Pool, src: &[u8]) -> &'p [u8] {
    let buf = pool.alloc_zeroed(src.len() + 1);
    buf[..src.len()].copy_from_slice(src);
    buf
}

/// Percent-decodes `src` into a pool buffer, NUL included in the result.
#[inline]
pub(crate) fn decode_with_nul<'p>(pool: &'p Pool, src: &[u8]) -> Result<&'p [u8]> {
    let buf = pool.alloc_zeroed(src.len() + 1);
    let len = codec::decode(buf, src)?;
    buf[len] = 0;
    let buf: &'p [u8] = buf;
    Ok(&buf[..=len])
}

/// Like [`decode_with_nul`], for names that are stored without the NUL.
#[inline]
pub(crate) fn decode_into_pool<'p>(pool: &'p Pool, src: &[u8]) -> Result<&'p [u8]> {
    let with_nul = decode_with_nul(pool, src)?;
    Ok(&with_nul[..with_nul.len() - 1])
}

// SPOOL

/// Large upload payload owned by the upload collaborator.
///
/// A param only borrows the spool for the lifetime of the request pool; the
/// collaborator decides whether the bytes live in memory or on disk.
pub trait Spool: fmt::Debug {
    /// Total payload size in bytes.
    fn size(&self) -> u64;

    /// Payload chunks in order. Concatenated, they form the whole upload.
    fn chunks(&self) -> Box<dyn Iterator<Item = &[u8]> + '_>;
}

impl Spool for &[u8] {
    fn size(&self) -> u64 {
        self.len() as u64
    }

    fn chunks(&self) -> Box<dyn Iterator<Item = &[u8]> + '_> {
        Box::new(std::iter::once(*self))
    }
}

impl Spool for Vec<u8> {
    fn size(&self) -> u64 {
        self.len() as u64
    }

    fn chunks(&self) -> Box<dyn Iterator<Item = &[u8]> + '_> {
        Box::new(std::iter::once(self.as_slice()))
    }
}

impl Spool for Vec<Vec<u8>> {
    fn size(&self) -> u64 {
        self.iter().map(|chunk| chunk.len() as u64).sum()
    }

    fn chunks(&self) -> Box<dyn Iterator<Item = &[u8]> + '_> {
        Box::new(self.iter().map(Vec::as_slice))
    }
}

// PARAM

/// A param parsed from a query string or form body.
///
/// On top of the [`Value`] it may carry an `info` table (e.g. the MIME
/// headers of a multipart part) and an `upload` spool. `flags` is opaque to
/// this crate (taint marks, charset bits, application bits) and is passed
/// through unchanged.
///
/// # Examples
/// ```
/// use maker_req::{Param, Pool};
///
/// let pool = Pool::new();
/// let param = Param::decode(&pool, b"full%20name", b"Jane+Doe").unwrap();
///
/// assert_eq!(param.name(), b"full name");
/// assert_eq!(param.data(), b"Jane Doe");
/// assert_eq!(param.encode(&pool), b"full%20name=Jane%20Doe");
/// ```
#[derive(Clone, Copy)]
pub struct Param<'p> {
    value: Value<'p>,
    info: Option<&'p Table<'p, Value<'p>>>,
    upload: Option<&'p dyn Spool>,
    flags: u8,
}

impl<'p> Param<'p> {
    /// Builds a param from already decoded bytes.
    pub fn make(pool: &'p Pool, name: &[u8], value: &[u8]) -> &'p Self {
        pool.alloc(Self::from_value(Value::make(pool, name, value)))
    }

    /// Builds a param from percent-encoded name and value spans.
    ///
    /// See [`Value::decode`] for the error cases.
    pub fn decode(pool: &'p Pool, name: &[u8], value: &[u8]) -> Result<&'p Self> {
        Ok(pool.alloc(Self::from_value(Value::decode(pool, name, value)?)))
    }

    #[inline(always)]
    pub(crate) const fn from_value(value: Value<'p>) -> Self {
        Self {
            value,
            info: None,
            upload: None,
            flags: 0,
        }
    }

    /// New record with the same name/value and the given info table.
    pub fn with_info(&self, pool: &'p Pool, info: &'p Table<'p, Value<'p>>) -> &'p Self {
        pool.alloc(Self {
            info: Some(info),
            ..*self
        })
    }

    /// New record with the same name/value and the given upload spool.
    pub fn with_upload(&self, pool: &'p Pool, upload: &'p dyn Spool) -> &'p Self {
        pool.alloc(Self {
            upload: Some(upload),
            ..*self
        })
    }

    /// New record with the same name/value and the given flags.
    pub fn with_flags(&self, pool: &'p Pool, flags: u8) -> &'p Self {
        pool.alloc(Self { flags, ..*self })
    }

    #[inline(always)]
    pub const fn value(&self) -> &Value<'p> {
        &self.value
    }

    #[inline(always)]
    pub const fn name(&self) -> &'p [u8] {
        self.value.name()
    }

    #[inline(always)]
    pub fn data(&self) -> &'p [u8] {
        self.value.data()
    }

    #[inline(always)]
    pub const fn info(&self) -> Option<&'p Table<'p, Value<'p>>> {
        self.info
    }

    #[inline(always)]
    pub fn upload(&self) -> Option<&'p dyn Spool> {
        self.upload
    }

    #[inline(always)]
    pub const fn flags(&self) -> u8 {
        self.flags
    }

    /// Re-encodes the param as `name=value`, see [`Value::encode`].
    #[inline]
    pub fn encode(&self, pool: &'p Pool) -> &'p [u8] {
        self.value.encode(pool)
    }
}

impl fmt::Debug for Param<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Param")
            .field("name", &String::from_utf8_lossy(self.name()))
            .field("data", &String::from_utf8_lossy(self.data()))
            .field("info", &self.info.map(|info| info.len()))
            .field("upload", &self.upload.map(|upload| upload.size()))
            .field("flags", &self.flags)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::*;

    #[test]
    fn make_keeps_bytes() {
        let pool = Pool::new();
        let value = Value::make(&pool, b"a%20b", b"x\0y");

        assert_eq!(value.name(), b"a%20b");
        assert_eq!(value.data(), b"x\0y");
        assert_eq!(value.len(), 3);
        assert_eq!(value.data_with_nul(), b"x\0y\0");
        assert_eq!(value.status(), Ok(()));
    }

    #[test]
    fn decode_pair() {
        let pool = Pool::new();
        let value = Value::decode(&pool, b"k%C3%A9y", b"v+1").unwrap();

        assert_eq!(value.name_str(), Some("kéy"));
        assert_eq!(value.as_str(), Some("v 1"));
        assert_eq!(value.data_with_nul(), b"v 1\0");
        assert_eq!(value.to_string(), "kéy=v 1");
        assert_eq!(value.status(), Ok(()));
    }

    #[test]
    fn decode_errors() {
        let pool = Pool::new();

        assert_eq!(Value::decode(&pool, b"", b"v"), Err(Error::BadArgument));
        assert_eq!(
            Value::decode(&pool, b"k", b"%zz"),
            Err(Error::MalformedEncoding { offset: 0 })
        );
        assert_eq!(
            Value::decode(&pool, b"ok%", b"fine"),
            Err(Error::MalformedEncoding { offset: 2 })
        );
    }

    #[test]
    fn empty_value() {
        let pool = Pool::new();
        let value = Value::decode(&pool, b"flag", b"").unwrap();

        assert!(value.is_empty());
        assert_eq!(value.data_with_nul(), b"\0");
        assert_eq!(value.as_str(), Some(""));
    }

    #[test]
    fn param_builders_copy_on_write() {
        let pool = Pool::new();
        let spool = b"file contents".to_vec();

        let plain = Param::make(&pool, b"file", b"report.txt");
        let uploaded = plain.with_upload(&pool, &spool).with_flags(&pool, 0b10);

        assert!(plain.upload().is_none());
        assert_eq!(plain.flags(), 0);

        assert_eq!(str_op(uploaded.data()), "report.txt");
        assert_eq!(uploaded.upload().map(|u| u.size()), Some(13));
        assert_eq!(uploaded.flags(), 0b10);

        let chunks: Vec<&[u8]> = uploaded.upload().unwrap().chunks().collect();
        assert_eq!(chunks, vec![b"file contents".as_slice()]);
    }

    #[test]
    fn param_encode() {
        let pool = Pool::new();
        let param = Param::make(&pool, b"q", b"a&b c");

        assert_eq!(str_op(param.encode(&pool)), "q=a%26b%20c");
        assert_eq!(Value::decode(&pool, b"q", b"a%26b%20c").unwrap().data(), b"a&b c");
    }

    #[test]
    fn borrowed_slice_spool() {
        let pool = Pool::new();
        let spool: &[u8] = b"inline upload";

        let param = Param::make(&pool, b"note", b"n.txt").with_upload(&pool, &spool);
        let upload = param.upload().unwrap();

        assert_eq!(upload.size(), 13);
        assert_eq!(upload.chunks().collect::<Vec<_>>(), vec![b"inline upload".as_slice()]);
    }

    #[test]
    fn multi_chunk_spool() {
        let spool: Vec<Vec<u8>> = vec![b"ab".to_vec(), b"cde".to_vec()];

        assert_eq!(spool.size(), 5);
        assert_eq!(spool.chunks().collect::<Vec<_>>().concat(), b"abcde");
    }
}
