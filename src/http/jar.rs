//! `Cookie` request header parsing.

use crate::{
    errors::{Error, Result},
    http::{
        cookie::{Cookie, CookieVersion},
        table::Table,
        types::trim_ows,
    },
    limits::ParseLimits,
    pool::Pool,
};
use memchr::memchr;

/// The cookies sent with one request.
///
/// # Examples
/// ```
/// use maker_req::{Jar, Pool};
///
/// let pool = Pool::new();
/// let jar = Jar::parse(&pool, b"id=42; $Path=/app; theme=\"dark\"").unwrap();
///
/// assert_eq!(jar.len(), 2);
///
/// let id = jar.get(b"id").unwrap();
/// assert_eq!(id.data(), b"42");
/// assert_eq!(id.path(), Some(&b"/app"[..]));
/// assert_eq!(jar.get(b"theme").unwrap().data(), b"dark");
/// ```
#[derive(Debug, Clone)]
pub struct Jar<'p> {
    cookies: Table<'p, Cookie<'p>>,
}

impl<'p> Jar<'p> {
    /// An empty jar, for requests without a `Cookie` header.
    #[inline]
    pub fn new(pool: &'p Pool) -> Self {
        Self {
            cookies: Table::new(pool),
        }
    }

    /// Parses a `Cookie` header value with default [`ParseLimits`].
    #[inline]
    pub fn parse(pool: &'p Pool, header: &[u8]) -> Result<Self> {
        Self::parse_with(pool, header, &ParseLimits::default())
    }

    /// Parses a `Cookie` header value.
    ///
    /// Pairs are separated by `;` and trimmed. A pair whose name starts with
    /// `$` (`$Path`, `$Domain`, `$Port`, `$Version`) is an attribute of the
    /// cookie right before it; one that comes before any cookie is ignored.
    /// Empty pairs are skipped.
    ///
    /// # Errors
    /// - [`Error::MalformedEncoding`] when a cookie fails to decode or an
    ///   attribute value is malformed; the offset points into `header`
    /// - [`Error::BadArgument`] for a pair with `=` but no name
    /// - [`Error::OverLimit`] past `limits.max_cookies` cookies, or for a
    ///   name or value longer than `limits.max_value_len`
    pub fn parse_with(pool: &'p Pool, header: &[u8], limits: &ParseLimits) -> Result<Self> {
        let mut jar = Self::new(pool);
        let mut pending: Option<Cookie<'p>> = None;
        let mut start = 0;

        while start < header.len() {
            let end = memchr(b';', &header[start..])
                .map(|pos| start + pos)
                .unwrap_or(header.len());

            let pair = trim_ows(&header[start..end]);
            if pair.is_empty() {
                start = end + 1;
                continue;
            }

            let at = offset_in(header, pair);
            let (name, value, value_at) = match memchr(b'=', pair) {
                Some(pos) => {
                    let value = trim_ows(&pair[pos + 1..]);
                    (trim_ows(&pair[..pos]), value, offset_in(header, value))
                }
                None => (pair, &b""[..], at + pair.len()),
            };

            if name.len() > limits.max_value_len || value.len() > limits.max_value_len {
                return Err(Error::OverLimit {
                    limit: limits.max_value_len,
                });
            }

            if name.first() == Some(&b'$') {
                match pending.as_mut() {
                    Some(cookie) => cookie
                        .set_attr(pool, name, value)
                        .map_err(|e| e.at(value_at))?,
                    None => tracing::trace!(
                        attr = %String::from_utf8_lossy(name),
                        "jar: attribute before any cookie ignored"
                    ),
                }
            } else {
                if let Some(cookie) = pending.take() {
                    jar.add(pool.alloc(cookie));
                }

                if jar.len() >= limits.max_cookies {
                    tracing::debug!(limit = limits.max_cookies, "jar: cookie limit reached");
                    return Err(Error::OverLimit {
                        limit: limits.max_cookies,
                    });
                }

                pending = Some(Cookie::decode_at(pool, (name, at), (value, value_at))?);
            }

            start = end + 1;
        }

        if let Some(cookie) = pending {
            jar.add(pool.alloc(cookie));
        }

        tracing::debug!(cookies = jar.len(), bytes = header.len(), "jar: parsed");
        Ok(jar)
    }

    /// Adds a cookie at the bottom of the jar.
    #[inline]
    pub fn add(&mut self, cookie: &'p Cookie<'p>) {
        self.cookies.add(cookie);
    }

    /// First cookie named `name`.
    #[inline]
    pub fn get(&self, name: &[u8]) -> Option<&'p Cookie<'p>> {
        self.cookies.get(name)
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Cookies in header order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &'p Cookie<'p>> + '_ {
        self.cookies.iter()
    }

    /// The underlying table, for [`as_array`](Table::as_array) and
    /// [`join`](Table::join).
    #[inline(always)]
    pub fn cookies(&self) -> &Table<'p, Cookie<'p>> {
        &self.cookies
    }

    /// Whether any cookie in the jar uses the `RFC` dialect. Stops at the
    /// first one.
    #[inline]
    pub fn has_rfc_cookie(&self) -> bool {
        self.iter().any(|cookie| cookie.version() == CookieVersion::Rfc)
    }
}

/// Position of `inner` inside `outer`; `inner` must be a subslice.
#[inline(always)]
fn offset_in(outer: &[u8], inner: &[u8]) -> usize {
    inner.as_ptr() as usize - outer.as_ptr() as usize
}
