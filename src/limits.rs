//! Parsing limits and fixed protocol constants
//!
//! # Security-First Defaults
//!
//! Request data is untrusted. Default limits are intentionally conservative
//! to prevent:
//! - Parameter flooding (huge numbers of `&`-separated pairs)
//! - Memory exhaustion through a single oversized value
//! - Cookie header abuse
//!
//! # Memory Consumption
//!
//! Every record is allocated from the request's [`Pool`](crate::Pool), so the
//! worst case for one request is roughly:
//!
//! `Total` = `max_params` * (`max_value_len` + record overhead) +
//!           `max_cookies` * (`max_value_len` + record overhead)
//!
//! and all of it is released in one step when the pool is dropped.
//!
//! # Examples
//!
//! ```
//! use maker_req::{limits::ParseLimits, Pool, Table, Query};
//!
//! let limits = ParseLimits {
//!     max_params: 2,
//!     ..ParseLimits::default()
//! };
//!
//! let pool = Pool::new();
//! let mut args = Table::new(&pool);
//! assert!(Query::parse_into(&pool, &mut args, b"a=1&b=2&c=3", &limits).is_err());
//! ```

/// Maximum length of one serialized cookie, `Set-Cookie` value included.
///
/// This matches what real user agents accept and is not configurable.
pub const COOKIE_MAX_LENGTH: usize = 4096;

/// Per-request parsing limits.
///
/// Default values balance compatibility and safety.
/// Only change if you understand the consequences.
#[derive(Debug, Clone)]
pub struct ParseLimits {
    /// Maximum number of params parsed from one query string or form body
    /// (default: `100`).
    ///
    /// The parse fails with [`OverLimit`](crate::Error::OverLimit) as soon as
    /// one more param would be inserted. Params inserted before that point stay
    /// in the table.
    pub max_params: usize,

    /// Maximum number of cookies parsed from one `Cookie` header (default: `50`).
    pub max_cookies: usize,

    /// Maximum encoded length of a single name or value (default: `1 MiB`).
    pub max_value_len: usize,

    /// Initial capacity of a freshly created table (default: `8`).
    pub table_capacity: usize,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ParseLimits {
    #[inline(always)]
    fn default() -> Self {
        Self {
            max_params: 100,
            max_cookies: 50,
            max_value_len: 1024 * 1024,
            table_capacity: 8,

            _priv: (),
        }
    }
}

impl ParseLimits {
    /// Limits that never trigger, for trusted input such as test fixtures.
    pub fn unlimited() -> Self {
        Self {
            max_params: usize::MAX,
            max_cookies: usize::MAX,
            max_value_len: usize::MAX,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let limits = ParseLimits::default();

        assert_eq!(limits.max_params, 100);
        assert_eq!(limits.max_cookies, 50);
        assert_eq!(limits.max_value_len, 1 << 20);
        assert_eq!(limits.table_capacity, 8);
        assert_eq!(COOKIE_MAX_LENGTH, 4096);
    }

    #[test]
    fn unlimited_keeps_capacity() {
        let limits = ParseLimits::unlimited();

        assert_eq!(limits.max_params, usize::MAX);
        assert_eq!(limits.table_capacity, 8);
    }
}
