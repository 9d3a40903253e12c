//! Error kinds reported by the parsing and serialization engine.

use thiserror::Error as ThisError;

/// Failure of a parse, decode or serialization call.
///
/// Lookups never produce one of these: a missing key is an absent result,
/// not an error. Everything that touches untrusted bytes reports every
/// malformed input, nothing is repaired silently.
#[derive(ThisError, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    /// A `%` escape is truncated or not followed by two hex digits, or a
    /// duration/size string has an unexpected shape.
    ///
    /// `offset` is the byte position of the offending input, relative to
    /// the span that was being decoded.
    #[error("malformed encoding at byte {offset}")]
    MalformedEncoding { offset: usize },

    /// A required field is empty (e.g. `=value` has no name) or a buffer
    /// argument is too small for the operation.
    #[error("bad argument")]
    BadArgument,

    /// A count or length limit was exceeded.
    #[error("limit exceeded: limit={limit}")]
    OverLimit { limit: usize },

    /// The cookie dialect does not allow the requested operation, e.g.
    /// emitting a `NETSCAPE` cookie on `Set-Cookie2`.
    #[error("cookie dialect conflict")]
    DialectConflict,

    /// Routine lookup miss, for callers that prefer an error over `None`.
    #[error("not found")]
    NotFound,

    /// The input ended before a construct was complete.
    #[error("incomplete input")]
    Incomplete,
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

macro_rules! http_errors {
    ($($name:ident: $status:literal => $code:literal; )*) => {
        /// HTTP status a request pipeline should answer with when this
        /// error aborts request parsing.
        pub const fn as_http_status(&self) -> u16 {
            match self { $(
                Self::$name { .. } => $status,
            )* }
        }

        /// Stable machine-readable code, e.g. for JSON error bodies.
        pub const fn code(&self) -> &'static str {
            match self { $(
                Self::$name { .. } => $code,
            )* }
        }
    };
}

impl Error {
    http_errors! {
        MalformedEncoding: 400 => "MALFORMED_ENCODING";
        BadArgument: 400 => "BAD_ARGUMENT";
        OverLimit: 413 => "OVER_LIMIT";
        DialectConflict: 500 => "DIALECT_CONFLICT";
        NotFound: 404 => "NOT_FOUND";
        Incomplete: 400 => "INCOMPLETE";
    }

    #[inline]
    pub(crate) const fn malformed(offset: usize) -> Self {
        Error::MalformedEncoding { offset }
    }

    /// Shifts the offset of a [`Error::MalformedEncoding`] by `base`, so an
    /// error found inside a sub-span points into the whole buffer.
    #[inline]
    pub(crate) const fn at(self, base: usize) -> Self {
        match self {
            Error::MalformedEncoding { offset } => Error::MalformedEncoding {
                offset: base + offset,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            Error::malformed(3).to_string(),
            "malformed encoding at byte 3"
        );
        assert_eq!(
            Error::OverLimit { limit: 4096 }.to_string(),
            "limit exceeded: limit=4096"
        );
        assert_eq!(Error::DialectConflict.to_string(), "cookie dialect conflict");
    }

    #[test]
    fn http_mapping() {
        assert_eq!(Error::malformed(0).as_http_status(), 400);
        assert_eq!(Error::OverLimit { limit: 1 }.as_http_status(), 413);
        assert_eq!(Error::NotFound.as_http_status(), 404);
        assert_eq!(Error::BadArgument.code(), "BAD_ARGUMENT");
        assert_eq!(Error::DialectConflict.code(), "DIALECT_CONFLICT");
    }

    #[test]
    fn shift_offset() {
        assert_eq!(Error::malformed(2).at(10), Error::malformed(12));
        assert_eq!(Error::BadArgument.at(10), Error::BadArgument);
    }
}
