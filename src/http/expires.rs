//! Relative durations, the injectable clock and cookie/HTTP date formats.
//!
//! Wall-clock time enters the crate only through a [`Clock`], so every
//! date that ends up in a header can be pinned in tests with
//! [`FixedClock`].
//!
//! # Examples
//! ```
//! use maker_req::expires::{self, ExpiresFormat, FixedClock};
//!
//! let clock = FixedClock::from_timestamp(0).unwrap();
//!
//! assert_eq!(expires::duration(b"+2h").unwrap(), 7200);
//! assert_eq!(
//!     &*expires::expires(&clock, b"+1D", ExpiresFormat::Cookie).unwrap(),
//!     b"Fri, 02-Jan-1970 00:00:00 GMT"
//! );
//! assert_eq!(
//!     &*expires::expires(&clock, b"now", ExpiresFormat::Http).unwrap(),
//!     b"Thu, 01 Jan 1970 00:00:00 GMT"
//! );
//! ```

use crate::{
    errors::{Error, Result},
    http::types::{slice_to_i64, trim_ows},
};
use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use std::borrow::Cow;

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stuck at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Clock fixed at `secs` seconds after the Unix epoch.
    pub fn from_timestamp(secs: i64) -> Option<Self> {
        DateTime::from_timestamp(secs, 0).map(Self)
    }
}

impl Clock for FixedClock {
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Date layout used by [`expires`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiresFormat {
    /// `Wdy, DD Mon YYYY HH:MM:SS GMT` (RFC 1123), for HTTP headers.
    Http,
    /// `Wdy, DD-Mon-YYYY HH:MM:SS GMT`, the Netscape cookie layout.
    Cookie,
}

impl ExpiresFormat {
    #[inline(always)]
    const fn pattern(self) -> &'static str {
        match self {
            ExpiresFormat::Http => "%a, %d %b %Y %H:%M:%S GMT",
            ExpiresFormat::Cookie => "%a, %d-%b-%Y %H:%M:%S GMT",
        }
    }
}

/// Parses a relative duration into seconds.
///
/// Accepted shapes are `now` (zero) and `[+-]?digits\s*[YMDhms]?`:
///
/// | unit | meaning |
/// |------|---------|
/// | `Y`, `y` | 365 days |
/// | `M` | 30 days |
/// | `D`, `d` | days |
/// | `h`, `H` | hours |
/// | `m` | minutes |
/// | `s`, `S`, none | seconds |
///
/// # Errors
/// [`Error::MalformedEncoding`] for any other shape and on overflow.
pub fn duration(src: &[u8]) -> Result<i64> {
    let trimmed = trim_ows(src);
    if trimmed.eq_ignore_ascii_case(b"now") {
        return Ok(0);
    }

    let lead = src.len() - trim_ows_start(src).len();
    let sign = matches!(trimmed.first(), Some(b'+' | b'-')) as usize;
    let end = sign
        + trimmed[sign..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();

    let amount = slice_to_i64(&trimmed[..end]).ok_or(Error::malformed(lead))?;
    let scale = match trim_ows(&trimmed[end..]) {
        b"" | b"s" | b"S" => 1,
        b"m" => MINUTE,
        b"h" | b"H" => HOUR,
        b"D" | b"d" => DAY,
        b"M" => 30 * DAY,
        b"Y" | b"y" => 365 * DAY,
        _ => return Err(Error::malformed(lead + end)),
    };

    amount.checked_mul(scale).ok_or(Error::malformed(lead))
}

/// Parses a `Max-Age` value: a [duration](duration) that also lands on a
/// representable date when counted from the Unix epoch.
///
/// # Errors
/// [`Error::MalformedEncoding`] as for [`duration`], and for a duration
/// past the supported date range.
pub fn max_age(src: &[u8]) -> Result<i64> {
    let secs = duration(src)?;
    match DateTime::from_timestamp(secs, 0) {
        Some(_) => Ok(secs),
        None => Err(Error::malformed(src.len() - trim_ows_start(src).len())),
    }
}

#[inline]
fn trim_ows_start(mut bytes: &[u8]) -> &[u8] {
    while let [b' ' | b'\t', rest @ ..] = bytes {
        bytes = rest;
    }
    bytes
}

/// `now + secs`, if the result is a representable date.
#[inline]
pub(crate) fn offset(clock: &dyn Clock, secs: i64) -> Option<DateTime<Utc>> {
    clock.now().checked_add_signed(TimeDelta::try_seconds(secs)?)
}

/// Formats `date` per `format`.
#[inline]
pub fn format_date(date: DateTime<Utc>, format: ExpiresFormat) -> String {
    date.format(format.pattern()).to_string()
}

/// Resolves an expiry string to a formatted date.
///
/// A relative [duration](duration) is added to `clock.now()`. Anything that
/// is not a duration is taken verbatim as an absolute date and borrowed
/// back unchanged.
///
/// # Errors
/// [`Error::MalformedEncoding`] when a duration lands outside the range of
/// representable dates.
pub fn expires<'a>(
    clock: &dyn Clock,
    time_str: &'a [u8],
    format: ExpiresFormat,
) -> Result<Cow<'a, [u8]>> {
    match duration(time_str) {
        Ok(secs) => {
            let date = offset(clock, secs).ok_or(Error::malformed(0))?;
            Ok(Cow::Owned(format_date(date, format).into_bytes()))
        }
        Err(_) => Ok(Cow::Borrowed(time_str)),
    }
}

/// Parses an absolute date in either [`ExpiresFormat`] (or any RFC 2822
/// date).
pub fn parse_date(src: &[u8]) -> Option<DateTime<Utc>> {
    let src = simdutf8::basic::from_utf8(trim_ows(src)).ok()?;

    if let Ok(date) = DateTime::parse_from_rfc2822(src) {
        return Some(date.with_timezone(&Utc));
    }

    [ExpiresFormat::Cookie, ExpiresFormat::Http]
        .into_iter()
        .find_map(|format| NaiveDateTime::parse_from_str(src, format.pattern()).ok())
        .map(|naive| naive.and_utc())
}
