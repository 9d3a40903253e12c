//! maker_req - Strict, arena-backed parsing of HTTP request data
//!
//! Turns the raw bytes a server hands over (query strings, urlencoded
//! bodies and `Cookie` headers) into ordered, case-insensitive multi-maps of
//! decoded records, and turns cookies back into `Set-Cookie` /
//! `Set-Cookie2` header values.
//!
//! # Design
//!
//! - **One pool per request** - every record, table and joined string is
//!   allocated from a [`Pool`] and released with it in one step; the borrow
//!   checker keeps records from outliving their request
//! - **Strict decoding** - a malformed `%` escape is always an error with
//!   the byte offset of the problem, never passed through
//! - **Multi-valued** - repeated names are kept in arrival order, see
//!   [`Table::as_array`] and [`Table::join`]
//! - **Two cookie dialects** - Netscape and RFC 2965, see [`CookieVersion`]
//! - **Injectable time** - relative expiry dates are computed from a
//!   [`Clock`], so they can be pinned in tests
//! - **No I/O** - the server plugs in through [`Env`] and [`HeaderSink`]
//!
//! # Examples
//!
//! Query strings:
//! ```
//! use maker_req::{Join, Pool, Query};
//!
//! let pool = Pool::new();
//! let args = Query::parse(&pool, b"tag=rust&tag=http&q=cookie+jar").unwrap();
//!
//! assert_eq!(args.get(b"q").unwrap().data(), b"cookie jar");
//! assert_eq!(args.join(Some(b"tag"), Join::Raw), Some(&b"rust, http"[..]));
//! ```
//! Cookies in and out:
//! ```
//! use maker_req::{env, CookieVersion, FixedClock, HeaderBuffer, Jar, Pool};
//!
//! let pool = Pool::new();
//! let clock = FixedClock::from_timestamp(0).unwrap();
//!
//! let jar = Jar::parse(&pool, b"id=42; $Path=/app; $Version=1").unwrap();
//! let id = jar.get(b"id").unwrap();
//! assert_eq!(id.version(), CookieVersion::Rfc);
//!
//! let mut headers = HeaderBuffer::new();
//! env::bake2(id, &clock, &mut headers).unwrap();
//! assert_eq!(
//!     headers.as_bytes(),
//!     b"Set-Cookie2: id=\"42\"; Version=1; path=\"/app\"\r\n"
//! );
//! ```
//! Whole requests, with custom limits:
//! ```
//! use maker_req::{limits::ParseLimits, Env, Error, Pool, RequestData};
//!
//! struct Request(&'static [u8]);
//!
//! impl Env for Request {
//!     fn header_in(&self, _: &str) -> Option<&[u8]> {
//!         None
//!     }
//!
//!     fn query_string(&self) -> Option<&[u8]> {
//!         Some(self.0)
//!     }
//! }
//!
//! let limits = ParseLimits {
//!     max_params: 2,
//!     ..ParseLimits::default()
//! };
//!
//! let pool = Pool::new();
//! let req = RequestData::parse(&pool, &Request(b"a=1&b=2"), &limits).unwrap();
//! assert_eq!(req.params().len(), 2);
//!
//! let err = RequestData::parse(&pool, &Request(b"a=1&b=2&c=3"), &limits).unwrap_err();
//! assert_eq!(err, Error::OverLimit { limit: 2 });
//! assert_eq!(err.as_http_status(), 413);
//! ```
//!
//! # Use Cases
//!
//! - **Server adapters** - parse request data once per request, drop the pool
//! - **CGI-style handlers** - query strings, form posts and cookies with no
//!   framework around them
//! - **Gateways and proxies** - inspect or rewrite cookies byte-exactly

pub(crate) mod http {
    pub mod codec;
    pub(crate) mod cookie;
    pub mod expires;
    pub(crate) mod jar;
    pub(crate) mod query;
    pub(crate) mod table;
    pub(crate) mod types;
    pub(crate) mod value;
}
pub mod env;
pub(crate) mod errors;
pub mod limits;
pub(crate) mod pool;

pub use crate::{
    env::{Env, HeaderBuffer, HeaderSink, RequestData},
    errors::{Error, Result},
    http::{
        codec,
        cookie::{Cookie, CookieVersion, Expiry},
        expires,
        expires::{Clock, ExpiresFormat, FixedClock, SystemClock},
        jar::Jar,
        query::{ParamCollector, Query},
        table::{Record, Table},
        types::{eq_ignore_case, Join, MatchMode},
        value::{Param, Spool, Value},
    },
    pool::Pool,
};

#[cfg(test)]
pub mod tools {
    use std::str::from_utf8;

    #[inline]
    pub fn str(value: Option<&[u8]>) -> Option<&str> {
        Some(from_utf8(value?).unwrap())
    }

    #[inline]
    pub fn str_op(value: &[u8]) -> &str {
        from_utf8(value).unwrap()
    }

    #[inline]
    pub fn str_2<'a>(value: (&'a [u8], &'a [u8])) -> (&'a str, &'a str) {
        (from_utf8(value.0).unwrap(), from_utf8(value.1).unwrap())
    }
}
