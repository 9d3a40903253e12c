//! Cookie records, attribute parsing and `Set-Cookie`/`Set-Cookie2`
//! serialization.

use crate::{
    codec,
    errors::{Error, Result},
    http::{
        expires::{self, Clock, ExpiresFormat},
        types::{eq_ignore_case, slice_to_usize, trim_ows},
        value::Value,
    },
    pool::Pool,
};
use std::borrow::Cow;

/// Cookie dialect, which decides the attribute set and the header a cookie
/// is emitted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CookieVersion {
    /// Original Netscape cookies (`Set-Cookie`, `expires=` dates).
    #[default]
    Netscape,
    /// RFC 2965 cookies (`Set-Cookie2`, quoted values, `max-age`).
    Rfc,
}

/// When a cookie expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expiry<'p> {
    /// Session cookie.
    #[default]
    None,
    /// Seconds relative to the moment the cookie is serialized.
    MaxAge(i64),
    /// Absolute date string, kept as given.
    Expires(&'p [u8]),
}

/// One cookie, either parsed from a `Cookie` header or built for a response.
///
/// A cookie is a plain value while it is being set up; once it is added to a
/// [`Jar`](crate::Jar) it lives in the pool and no longer changes.
///
/// # Examples
/// ```
/// use maker_req::{expires::FixedClock, Cookie, CookieVersion, Pool};
///
/// let pool = Pool::new();
/// let clock = FixedClock::from_timestamp(0).unwrap();
///
/// let mut session = Cookie::make(&pool, b"session", b"a b");
/// session.set_attr(&pool, b"Path", b"/app").unwrap();
/// session.set_attr(&pool, b"secure", b"").unwrap();
/// session.set_expires(&pool, &clock, b"+1h").unwrap();
///
/// assert_eq!(
///     session.serialize(&clock),
///     b"session=a%20b; path=/app; secure; expires=Thu, 01-Jan-1970 01:00:00 GMT"
/// );
///
/// session.set_attr(&pool, b"Version", b"1").unwrap();
/// session.set_expires(&pool, &clock, b"+1h").unwrap();
/// assert_eq!(session.version(), CookieVersion::Rfc);
/// assert_eq!(
///     session.serialize(&clock),
///     b"session=\"a b\"; Version=1; path=\"/app\"; secure; max-age=3600"
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cookie<'p> {
    value: Value<'p>,
    version: CookieVersion,
    path: Option<&'p [u8]>,
    domain: Option<&'p [u8]>,
    port: Option<&'p [u8]>,
    secure: bool,
    comment: Option<&'p [u8]>,
    comment_url: Option<&'p [u8]>,
    expiry: Expiry<'p>,
}

impl<'p> Cookie<'p> {
    #[inline]
    const fn from_value(value: Value<'p>) -> Self {
        Self {
            value,
            version: CookieVersion::Netscape,
            path: None,
            domain: None,
            port: None,
            secure: false,
            comment: None,
            comment_url: None,
            expiry: Expiry::None,
        }
    }

    /// A `NETSCAPE` session cookie from already decoded bytes.
    pub fn make(pool: &'p Pool, name: &[u8], value: &[u8]) -> Self {
        Self::from_value(Value::make(pool, name, value))
    }

    /// A `NETSCAPE` session cookie from encoded name and value spans, as
    /// found in a `Cookie` header. A quoted value is unquoted before it is
    /// percent-decoded.
    ///
    /// # Errors
    /// As for [`Value::decode`], plus [`Error::MalformedEncoding`] for a
    /// broken quoted-string.
    pub fn decode(pool: &'p Pool, name: &[u8], value: &[u8]) -> Result<Self> {
        Self::decode_at(pool, (name, 0), (value, 0))
    }

    pub(crate) fn decode_at(
        pool: &'p Pool,
        name: (&[u8], usize),
        (value, value_at): (&[u8], usize),
    ) -> Result<Self> {
        let unquoted = codec::unquote(value).map_err(|e| e.at(value_at))?;
        let (data, data_at) = match (&unquoted, value) {
            (Cow::Owned(body), [b'"', quoted @ .., b'"']) => {
                // Backslash escapes shift positions, map errors back onto `value`.
                if let Err(Error::MalformedEncoding { offset }) = codec::decode_to_vec(body) {
                    let at = codec::unquoted_offset(quoted, offset);
                    return Err(Error::malformed(value_at + 1 + at));
                }
                (&body[..], value_at + 1)
            }
            (Cow::Borrowed(inner), _) if inner.len() == value.len() => (*inner, value_at),
            (unquoted, _) => (&**unquoted, value_at + 1),
        };

        Value::decode_at(pool, name, (data, data_at)).map(Self::from_value)
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
    pub const fn version(&self) -> CookieVersion {
        self.version
    }

    #[inline(always)]
    pub fn set_version(&mut self, version: CookieVersion) {
        self.version = version;
    }

    #[inline(always)]
    pub const fn path(&self) -> Option<&'p [u8]> {
        self.path
    }

    #[inline(always)]
    pub const fn domain(&self) -> Option<&'p [u8]> {
        self.domain
    }

    #[inline(always)]
    pub const fn port(&self) -> Option<&'p [u8]> {
        self.port
    }

    #[inline(always)]
    pub const fn secure(&self) -> bool {
        self.secure
    }

    #[inline(always)]
    pub const fn comment(&self) -> Option<&'p [u8]> {
        self.comment
    }

    #[inline(always)]
    pub const fn comment_url(&self) -> Option<&'p [u8]> {
        self.comment_url
    }

    #[inline(always)]
    pub const fn expiry(&self) -> Expiry<'p> {
        self.expiry
    }

    /// Sets one attribute by case-insensitive name.
    ///
    /// Known attributes are `Path`, `Domain`, `Port`, `Secure`, `Comment`,
    /// `CommentURL`, `Version`, `Expires` and `Max-Age`; a leading `$` (as
    /// in request headers) is ignored. Unknown names are ignored too, so
    /// newer attributes pass through harmlessly. Quoted values are
    /// unquoted.
    ///
    /// `Secure` is cleared only by `0` or `off`. `Version` `0` selects
    /// `NETSCAPE`, anything higher selects `RFC`.
    ///
    /// # Errors
    /// [`Error::MalformedEncoding`] for a broken quoted-string, a
    /// non-numeric `Version` or a `Max-Age` rejected by
    /// [`expires::max_age`].
    pub fn set_attr(&mut self, pool: &'p Pool, attr: &[u8], value: &[u8]) -> Result<()> {
        let attr = trim_ows(attr.strip_prefix(b"$").unwrap_or(attr));
        let value = codec::unquote(trim_ows(value))?;

        match attr.len() {
            4 if eq_ignore_case(attr, b"path") => self.path = Some(pool.alloc_bytes(&value)),
            6 if eq_ignore_case(attr, b"domain") => self.domain = Some(pool.alloc_bytes(&value)),
            4 if eq_ignore_case(attr, b"port") => self.port = Some(pool.alloc_bytes(&value)),
            6 if eq_ignore_case(attr, b"secure") => {
                self.secure = !(&*value == b"0" || eq_ignore_case(&value, b"off"))
            }
            7 if eq_ignore_case(attr, b"comment") => {
                self.comment = Some(pool.alloc_bytes(&value))
            }
            10 if eq_ignore_case(attr, b"commenturl") => {
                self.comment_url = Some(pool.alloc_bytes(&value))
            }
            7 if eq_ignore_case(attr, b"version") => {
                self.version = match slice_to_usize(&value).ok_or(Error::malformed(0))? {
                    0 => CookieVersion::Netscape,
                    _ => CookieVersion::Rfc,
                }
            }
            7 if eq_ignore_case(attr, b"expires") => {
                self.expiry = Expiry::Expires(pool.alloc_bytes(&value))
            }
            7 if eq_ignore_case(attr, b"max-age") => {
                self.expiry = Expiry::MaxAge(expires::max_age(&value)?)
            }
            _ => tracing::trace!(
                attr = %String::from_utf8_lossy(attr),
                "cookie: unknown attribute ignored"
            ),
        }

        Ok(())
    }

    /// Sets the expiry from a relative [duration](expires::duration) or an
    /// absolute date.
    ///
    /// A `NETSCAPE` cookie stores the resolved `expires` date, computed from
    /// `clock` now. An `RFC` cookie keeps a duration as `max-age` and an
    /// absolute date as given.
    ///
    /// # Errors
    /// [`Error::MalformedEncoding`] when the resolved date is out of range.
    pub fn set_expires(
        &mut self,
        pool: &'p Pool,
        clock: &dyn Clock,
        time_str: &[u8],
    ) -> Result<()> {
        self.expiry = match self.version {
            CookieVersion::Netscape => {
                let date = expires::expires(clock, time_str, ExpiresFormat::Cookie)?;
                Expiry::Expires(pool.alloc_bytes(&date))
            }
            CookieVersion::Rfc => match expires::duration(time_str) {
                Ok(secs) => Expiry::MaxAge(secs),
                Err(_) => Expiry::Expires(pool.alloc_bytes(time_str)),
            },
        };
        Ok(())
    }

    /// The `expires` date of a `NETSCAPE` cookie, resolved against `clock`.
    /// `None` for session cookies and for `RFC` cookies, which use
    /// `max-age`.
    pub fn expires(&self, clock: &dyn Clock) -> Option<Cow<'p, [u8]>> {
        match (self.version, self.expiry) {
            (CookieVersion::Rfc, _) | (_, Expiry::None) => None,
            (_, Expiry::Expires(date)) => Some(Cow::Borrowed(date)),
            (_, Expiry::MaxAge(secs)) => expires::offset(clock, secs).map(|date| {
                Cow::Owned(expires::format_date(date, ExpiresFormat::Cookie).into_bytes())
            }),
        }
    }

    /// Renders the cookie as the value of a `Set-Cookie` (`NETSCAPE`) or
    /// `Set-Cookie2` (`RFC`) header.
    ///
    /// - `NETSCAPE`: `name=value[; path=P][; domain=D][; secure][; expires=DATE]`
    ///   with name and value percent-encoded; a `max-age` is turned into an
    ///   `expires` date relative to `clock`.
    /// - `RFC`: `name="value"; Version=1[; path="P"][; domain="D"][; port="P"]`
    ///   `[; comment="C"][; commentURL="U"][; secure][; max-age=N]`; an
    ///   absolute date becomes `max-age` (never negative) when it parses,
    ///   and is left out otherwise.
    pub fn serialize(&self, clock: &dyn Clock) -> Vec<u8> {
        let mut out = Vec::with_capacity(64 + 3 * (self.name().len() + self.data().len()));
        codec::encode(self.name(), &mut out);
        out.push(b'=');

        match self.version {
            CookieVersion::Netscape => {
                codec::encode(self.data(), &mut out);
                push_attr(&mut out, "path", self.path, false);
                push_attr(&mut out, "domain", self.domain, false);
                if self.secure {
                    out.extend_from_slice(b"; secure");
                }
                if let Some(date) = self.expires(clock) {
                    out.extend_from_slice(b"; expires=");
                    out.extend_from_slice(&date);
                }
            }
            CookieVersion::Rfc => {
                codec::quote(self.data(), &mut out);
                out.extend_from_slice(b"; Version=1");
                push_attr(&mut out, "path", self.path, true);
                push_attr(&mut out, "domain", self.domain, true);
                push_attr(&mut out, "port", self.port, true);
                push_attr(&mut out, "comment", self.comment, true);
                push_attr(&mut out, "commentURL", self.comment_url, true);
                if self.secure {
                    out.extend_from_slice(b"; secure");
                }

                let max_age = match self.expiry {
                    Expiry::None => None,
                    Expiry::MaxAge(secs) => Some(secs),
                    Expiry::Expires(date) => expires::parse_date(date)
                        .map(|date| (date - clock.now()).num_seconds().max(0)),
                };
                if let Some(secs) = max_age {
                    out.extend_from_slice(format!("; max-age={secs}").as_bytes());
                }
            }
        }

        out
    }

    /// Bounded [`serialize`](Cookie::serialize) with `snprintf` semantics.
    ///
    /// Writes at most `buf.len() - 1` bytes followed by a NUL, and returns
    /// the full serialized length. A return value `>= buf.len()` means the
    /// output was truncated. An empty `buf` is left untouched.
    pub fn serialize_into(&self, clock: &dyn Clock, buf: &mut [u8]) -> usize {
        let full = self.serialize(clock);

        if let Some(room) = buf.len().checked_sub(1) {
            let n = full.len().min(room);
            buf[..n].copy_from_slice(&full[..n]);
            buf[n] = 0;
        }

        full.len()
    }

    /// [`serialize`](Cookie::serialize) into the pool.
    #[inline]
    pub fn to_header_value(&self, pool: &'p Pool, clock: &dyn Clock) -> &'p [u8] {
        pool.alloc_bytes(&self.serialize(clock))
    }
}

#[inline]
fn push_attr(out: &mut Vec<u8>, name: &str, value: Option<&[u8]>, quoted: bool) {
    let Some(value) = value else { return };

    out.extend_from_slice(b"; ");
    out.extend_from_slice(name.as_bytes());
    out.push(b'=');
    match quoted {
        true => {
            codec::quote(value, out);
        }
        false => out.extend_from_slice(value),
    }
}
