//! Glue between the parsers and the server that owns the request.
//!
//! The server side implements [`Env`] (raw request bytes in) and
//! [`HeaderSink`] (response headers out); everything else here is built on
//! those two traits.

use crate::{
    errors::{Error, Result},
    http::{
        cookie::{Cookie, CookieVersion},
        expires::Clock,
        jar::Jar,
        query::Query,
        table::Table,
        types::{eq_ignore_case, trim_ows},
        value::Param,
    },
    limits::{ParseLimits, COOKIE_MAX_LENGTH},
    pool::Pool,
};
use memchr::memchr;

const FORM_URLENCODED: &[u8] = b"application/x-www-form-urlencoded";

/// Read access to the raw request, implemented by the hosting server.
pub trait Env {
    /// Value of the request header `name` (case-insensitive), if present.
    fn header_in(&self, name: &str) -> Option<&[u8]>;

    /// Raw query string, without the leading `?`.
    fn query_string(&self) -> Option<&[u8]>;

    /// The fully buffered request body, if there is one.
    fn body(&self) -> Option<&[u8]> {
        None
    }

    /// The `Content-Type` request header.
    fn content_type(&self) -> Option<&[u8]> {
        self.header_in("Content-Type")
    }
}

/// Write access to the response headers, implemented by the hosting server.
pub trait HeaderSink {
    fn header_out(&mut self, name: &str, value: &[u8]) -> Result<()>;
}

/// Collects headers as `(name, value)` pairs.
impl HeaderSink for Vec<(String, Vec<u8>)> {
    #[inline]
    fn header_out(&mut self, name: &str, value: &[u8]) -> Result<()> {
        self.push((name.to_owned(), value.to_vec()));
        Ok(())
    }
}

/// Renders headers as `Name: value\r\n` lines.
///
/// # Examples
/// ```
/// use maker_req::{HeaderBuffer, HeaderSink};
///
/// let mut headers = HeaderBuffer::new();
/// headers.header_out("Set-Cookie", b"id=42").unwrap();
/// assert_eq!(headers.as_bytes(), b"Set-Cookie: id=42\r\n");
///
/// // No header injection
/// assert!(headers.header_out("X-Bad", b"a\r\nb: c").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct HeaderBuffer {
    buf: Vec<u8>,
}

impl HeaderBuffer {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    #[inline]
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl HeaderSink for HeaderBuffer {
    /// # Errors
    /// [`Error::BadArgument`] if `name` is empty or either part contains a
    /// CR or LF byte.
    fn header_out(&mut self, name: &str, value: &[u8]) -> Result<()> {
        let breaks_line = |bytes: &[u8]| bytes.iter().any(|b| matches!(b, b'\r' | b'\n'));
        if name.is_empty() || breaks_line(name.as_bytes()) || breaks_line(value) {
            return Err(Error::BadArgument);
        }

        self.buf.reserve(name.len() + value.len() + 4);
        self.buf.extend_from_slice(name.as_bytes());
        self.buf.extend_from_slice(b": ");
        self.buf.extend_from_slice(value);
        self.buf.extend_from_slice(b"\r\n");
        Ok(())
    }
}

// BAKE

#[inline]
fn serialize_bounded(cookie: &Cookie<'_>, clock: &dyn Clock) -> Result<Vec<u8>> {
    let value = cookie.serialize(clock);
    if value.len() >= COOKIE_MAX_LENGTH {
        tracing::warn!(
            name = %String::from_utf8_lossy(cookie.name()),
            len = value.len(),
            "bake: cookie too long, refused"
        );
        return Err(Error::OverLimit {
            limit: COOKIE_MAX_LENGTH,
        });
    }
    Ok(value)
}

/// Emits `cookie` on a `Set-Cookie` header.
///
/// # Errors
/// [`Error::OverLimit`] when the serialized cookie is
/// [`COOKIE_MAX_LENGTH`] bytes or longer; errors from `sink` are passed on.
///
/// # Examples
/// ```
/// use maker_req::{env, Cookie, HeaderBuffer, Pool, SystemClock};
///
/// let pool = Pool::new();
/// let mut headers = HeaderBuffer::new();
///
/// env::bake(&Cookie::make(&pool, b"id", b"42"), &SystemClock, &mut headers).unwrap();
/// assert_eq!(headers.as_bytes(), b"Set-Cookie: id=42\r\n");
/// ```
pub fn bake<S: HeaderSink + ?Sized>(
    cookie: &Cookie<'_>,
    clock: &dyn Clock,
    sink: &mut S,
) -> Result<()> {
    let value = serialize_bounded(cookie, clock)?;
    sink.header_out("Set-Cookie", &value)
}

/// Emits an `RFC` cookie on a `Set-Cookie2` header.
///
/// # Errors
/// - [`Error::DialectConflict`] for a `NETSCAPE` cookie
/// - [`Error::OverLimit`] as for [`bake`]
pub fn bake2<S: HeaderSink + ?Sized>(
    cookie: &Cookie<'_>,
    clock: &dyn Clock,
    sink: &mut S,
) -> Result<()> {
    if cookie.version() == CookieVersion::Netscape {
        tracing::warn!(
            name = %String::from_utf8_lossy(cookie.name()),
            "bake2: NETSCAPE cookie refused on Set-Cookie2"
        );
        return Err(Error::DialectConflict);
    }

    let value = serialize_bounded(cookie, clock)?;
    sink.header_out("Set-Cookie2", &value)
}

/// The cookie dialect the user agent speaks: `RFC` if it sent a `Cookie2`
/// header or any `RFC` cookie, `NETSCAPE` otherwise.
pub fn ua_cookie_version<E: Env + ?Sized>(env: &E, jar: &Jar<'_>) -> CookieVersion {
    match env.header_in("Cookie2").is_some() || jar.has_rfc_cookie() {
        true => CookieVersion::Rfc,
        false => CookieVersion::Netscape,
    }
}

// REQUEST DATA

/// Everything parsed from one request: query args, form body and cookies.
///
/// # Examples
/// ```
/// use maker_req::{limits::ParseLimits, Env, Pool, RequestData};
///
/// struct Cgi;
///
/// impl Env for Cgi {
///     fn header_in(&self, name: &str) -> Option<&[u8]> {
///         match name {
///             "Cookie" => Some(b"sid=abc".as_slice()),
///             "Content-Type" => Some(b"application/x-www-form-urlencoded".as_slice()),
///             _ => None,
///         }
///     }
///
///     fn query_string(&self) -> Option<&[u8]> {
///         Some(b"page=2".as_slice())
///     }
///
///     fn body(&self) -> Option<&[u8]> {
///         Some(b"page=3&title=Hi".as_slice())
///     }
/// }
///
/// let pool = Pool::new();
/// let req = RequestData::parse(&pool, &Cgi, &ParseLimits::default()).unwrap();
///
/// assert_eq!(req.param(b"page").unwrap().data(), b"2");
/// assert_eq!(req.param(b"title").unwrap().data(), b"Hi");
/// assert_eq!(req.params().len(), 3);
/// assert_eq!(req.jar().get(b"sid").unwrap().data(), b"abc");
/// ```
#[derive(Debug, Clone)]
pub struct RequestData<'p> {
    args: Table<'p, Param<'p>>,
    body: Option<Table<'p, Param<'p>>>,
    jar: Jar<'p>,
}

impl<'p> RequestData<'p> {
    /// Parses the query string, an urlencoded body and the `Cookie` header
    /// of the request behind `env`.
    ///
    /// Bodies of any other content type are left to their own parsers and
    /// [`body`](RequestData::body) is `None` for them.
    ///
    /// # Errors
    /// The first error from [`Query::parse_into`] or [`Jar::parse_with`].
    pub fn parse<E: Env + ?Sized>(pool: &'p Pool, env: &E, limits: &ParseLimits) -> Result<Self> {
        let mut args = Table::with_capacity(pool, limits.table_capacity);
        if let Some(query) = env.query_string() {
            Query::parse_into(pool, &mut args, query, limits)?;
        }

        let body = match (env.body(), env.content_type()) {
            (Some(body), Some(content_type)) if is_form_urlencoded(content_type) => {
                let mut table = Table::with_capacity(pool, limits.table_capacity);
                Query::parse_into(pool, &mut table, body, limits)?;
                Some(table)
            }
            _ => None,
        };

        let jar = match env.header_in("Cookie") {
            Some(header) => Jar::parse_with(pool, header, limits)?,
            None => Jar::new(pool),
        };

        tracing::debug!(
            args = args.len(),
            body = body.as_ref().map_or(0, |body| body.len()),
            cookies = jar.len(),
            "request: parsed"
        );

        Ok(Self { args, body, jar })
    }

    /// Params from the query string.
    #[inline(always)]
    pub fn args(&self) -> &Table<'p, Param<'p>> {
        &self.args
    }

    /// Params from an urlencoded body, if the request had one.
    #[inline(always)]
    pub fn body(&self) -> Option<&Table<'p, Param<'p>>> {
        self.body.as_ref()
    }

    #[inline(always)]
    pub fn jar(&self) -> &Jar<'p> {
        &self.jar
    }

    /// First param named `name`, looked up in the query string first and
    /// in the body second.
    pub fn param(&self, name: &[u8]) -> Option<&'p Param<'p>> {
        self.args
            .get(name)
            .or_else(|| self.body.as_ref()?.get(name))
    }

    /// Query string params followed by body params, in one table.
    pub fn params(&self) -> Table<'p, Param<'p>> {
        match &self.body {
            Some(body) => self.args.overlay(body),
            None => self.args.clone(),
        }
    }
}

/// Media type check that ignores parameters such as `; charset=utf-8`.
#[inline]
fn is_form_urlencoded(content_type: &[u8]) -> bool {
    let media_type = match memchr(b';', content_type) {
        Some(pos) => &content_type[..pos],
        None => content_type,
    };
    eq_ignore_case(trim_ows(media_type), FORM_URLENCODED)
}
