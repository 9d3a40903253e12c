//! URL-encoded query string and form body tokenizer.

use crate::{
    errors::{Error, Result},
    http::{
        table::Table,
        value::{Param, Value},
    },
    limits::ParseLimits,
    pool::Pool,
};
use memchr::{memchr, memchr2};

/// URL-encoded query string parser.
///
/// Splits `name=value` segments on `&` and `;`, percent-decodes both halves
/// (with `+` as space) and inserts one [`Param`] per segment. The same
/// tokenizer handles `application/x-www-form-urlencoded` bodies.
///
/// # Examples
/// ```rust
/// use maker_req::{Pool, Query};
///
/// let pool = Pool::new();
/// let args = Query::parse(&pool, b"name=John+Doe&tag=a;tag=b&flag").unwrap();
///
/// assert_eq!(args.len(), 4);
/// assert_eq!(args.get(b"name").unwrap().data(), b"John Doe");
/// assert_eq!(args.count(b"tag"), 2);
/// assert!(args.get(b"flag").unwrap().value().is_empty());
/// ```
/// All possible formats:
/// ```rust
/// use maker_req::{Error, Pool, Query};
///
/// let pool = Pool::new();
///
/// // Empty segments are skipped, a bare name has an empty value
/// let args = Query::parse(&pool, b"&&debug&name=&key=sda;;").unwrap();
/// assert_eq!(args.len(), 3);
///
/// // An empty buffer is not an error
/// assert!(Query::parse(&pool, b"").unwrap().is_empty());
///
/// // A present '=' needs a name
/// assert_eq!(Query::parse(&pool, b"=Qwe").unwrap_err(), Error::BadArgument);
///
/// // Decoding is strict
/// assert_eq!(
///     Query::parse(&pool, b"a=1&b=%zz").unwrap_err(),
///     Error::MalformedEncoding { offset: 6 }
/// );
/// ```
pub struct Query;

impl Query {
    /// Parses a query string into a new table, with default [`ParseLimits`].
    ///
    /// The input is the raw string without the leading `?`.
    #[inline]
    pub fn parse<'p>(pool: &'p Pool, query: &[u8]) -> Result<Table<'p, Param<'p>>> {
        let limits = ParseLimits::default();
        let mut result = Table::with_capacity(pool, limits.table_capacity);
        Self::parse_into(pool, &mut result, query, &limits)?;
        Ok(result)
    }

    /// Parses a query string into an existing collection.
    ///
    /// Params are appended, so one collection can gather several sources.
    ///
    /// # Errors
    /// - [`Error::MalformedEncoding`] when a name or value fails to decode;
    ///   the offset points into `query`
    /// - [`Error::BadArgument`] for a segment with `=` but no name
    /// - [`Error::OverLimit`] when the collection would grow past
    ///   `limits.max_params`, or a name or value is longer than
    ///   `limits.max_value_len`
    ///
    /// The call stops at the first error. Params inserted before it stay in
    /// the collection.
    ///
    /// # Examples
    /// ```
    /// use maker_req::{limits::ParseLimits, Pool, Query, Table};
    ///
    /// let pool = Pool::new();
    /// let limits = ParseLimits::default();
    /// let mut collector = Table::new(&pool);
    ///
    /// Query::parse_into(&pool, &mut collector, b"a=1&b=2", &limits).unwrap();
    /// Query::parse_into(&pool, &mut collector, b"c=3", &limits).unwrap();
    /// assert_eq!(collector.len(), 3); // parameters are appended
    ///
    /// // No rollback on error
    /// let mut collector: Vec<&maker_req::Param> = Vec::new();
    /// assert!(Query::parse_into(&pool, &mut collector, b"ok=1&bad=%", &limits).is_err());
    /// assert_eq!(collector.len(), 1);
    /// ```
    pub fn parse_into<'p, C: ParamCollector<'p>>(
        pool: &'p Pool,
        result: &mut C,
        query: &[u8],
        limits: &ParseLimits,
    ) -> Result<()> {
        let mut start = 0;
        let mut inserted = 0usize;

        while start < query.len() {
            // Find next '&' or ';' or end of string
            let end = memchr2(b'&', b';', &query[start..])
                .map(|pos| start + pos)
                .unwrap_or(query.len());

            if start == end {
                start = end + 1;
                continue;
            }

            if result.length() >= limits.max_params {
                tracing::debug!(limit = limits.max_params, "query: param limit reached");
                return Err(Error::OverLimit {
                    limit: limits.max_params,
                });
            }

            // Find '=' within current parameter segment
            let segment = &query[start..end];
            let (name, value, value_at) = match memchr(b'=', segment) {
                Some(pos) => (&segment[..pos], &segment[pos + 1..], start + pos + 1),
                None => (segment, &b""[..], end),
            };

            if name.len() > limits.max_value_len || value.len() > limits.max_value_len {
                return Err(Error::OverLimit {
                    limit: limits.max_value_len,
                });
            }

            let value = Value::decode_at(pool, (name, start), (value, value_at))?;
            tracing::trace!(
                name = %String::from_utf8_lossy(value.name()),
                len = value.len(),
                "query: param"
            );

            result.add_param(pool.alloc(Param::from_value(value)));
            inserted += 1;
            start = end + 1;
        }

        tracing::debug!(params = inserted, bytes = query.len(), "query: parsed");
        Ok(())
    }
}

/// A trait for collections that receive parsed params.
///
/// [`Table`] is the usual target; `Vec<&Param>` works when lookups are not
/// needed.
///
/// # Lifetime
/// - `'p`: The lifetime of the request pool the params live in
///
/// # Examples
/// ```rust
/// use maker_req::{limits::ParseLimits, Param, ParamCollector, Pool, Query};
///
/// #[derive(Default)]
/// struct Names(Vec<String>);
///
/// impl<'p> ParamCollector<'p> for Names {
///     fn add_param(&mut self, param: &'p Param<'p>) {
///         self.0.push(String::from_utf8_lossy(param.name()).into_owned());
///     }
///
///     fn length(&self) -> usize {
///         self.0.len()
///     }
/// }
///
/// let pool = Pool::new();
/// let mut names = Names::default();
/// Query::parse_into(&pool, &mut names, b"a=1&b%20c=2", &ParseLimits::default()).unwrap();
/// assert_eq!(names.0, ["a", "b c"]);
/// ```
pub trait ParamCollector<'p> {
    /// Adds a parsed param to the collection.
    fn add_param(&mut self, param: &'p Param<'p>);

    /// Returns the current number of params in the collection.
    // `length` rather than `len` so clippy does not ask for `is_empty`
    fn length(&self) -> usize;
}

impl<'p> ParamCollector<'p> for Table<'p, Param<'p>> {
    #[inline(always)]
    fn add_param(&mut self, param: &'p Param<'p>) {
        self.add(param);
    }

    #[inline(always)]
    fn length(&self) -> usize {
        self.len()
    }
}

// Preserves order, no lookups
impl<'p> ParamCollector<'p> for Vec<&'p Param<'p>> {
    #[inline(always)]
    fn add_param(&mut self, param: &'p Param<'p>) {
        self.push(param);
    }

    #[inline(always)]
    fn length(&self) -> usize {
        self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::*;

    fn pairs<'p>(table: &Table<'p, Param<'p>>) -> Vec<(&'p str, &'p str)> {
        table
            .iter()
            .map(|p| str_2((p.name(), p.data())))
            .collect()
    }

    #[test]
    fn basic() {
        let pool = Pool::new();
        let cases: [&[u8]; 3] = [b"a=1&b=2", b"a=1;b=2", b"&a=1&;b=2;"];

        for line in cases {
            let params = Query::parse(&pool, line).unwrap();
            assert_eq!(pairs(&params), [("a", "1"), ("b", "2")]);
        }
    }

    #[test_log::test]
    fn full() {
        let pool = Pool::new();
        let params = Query::parse(&pool, b"flag&empty=&&key=value&eq=a=b").unwrap();

        assert_eq!(
            pairs(&params),
            [("flag", ""), ("empty", ""), ("key", "value"), ("eq", "a=b")]
        );
    }

    #[test]
    fn decodes_both_halves() {
        let pool = Pool::new();
        let params = Query::parse(&pool, b"first+name=J%C3%BCrgen&q=a%26b%3Dc").unwrap();

        assert_eq!(pairs(&params), [("first name", "Jürgen"), ("q", "a&b=c")]);
    }

    #[test]
    fn repeated_names_keep_order() {
        let pool = Pool::new();
        let params = Query::parse(&pool, b"a=1&b=2&a=3").unwrap();

        let a: Vec<&str> = params
            .as_array(Some(b"a"))
            .iter()
            .map(|p| str_op(p.data()))
            .collect();
        assert_eq!(a, ["1", "3"]);
        assert_eq!(str(params.join(Some(b"a"), crate::Join::Raw)), Some("1, 3"));
    }

    #[test]
    fn empty_input() {
        let pool = Pool::new();
        assert!(Query::parse(&pool, b"").unwrap().is_empty());
        assert!(Query::parse(&pool, b"&;&").unwrap().is_empty());
    }

    #[test]
    fn empty_name_error() {
        let pool = Pool::new();
        assert_eq!(Query::parse(&pool, b"=value").unwrap_err(), Error::BadArgument);
        assert_eq!(Query::parse(&pool, b"a=1&=2").unwrap_err(), Error::BadArgument);
    }

    #[test]
    fn malformed_offsets() {
        let pool = Pool::new();

        assert_eq!(Query::parse(&pool, b"%").unwrap_err(), Error::malformed(0));
        assert_eq!(Query::parse(&pool, b"k=%GZ").unwrap_err(), Error::malformed(2));
        assert_eq!(Query::parse(&pool, b"a=1&b%=2").unwrap_err(), Error::malformed(5));
        assert_eq!(Query::parse(&pool, b"a=1;b=x%4").unwrap_err(), Error::malformed(7));
    }

    #[test]
    fn partial_insert_on_error() {
        let pool = Pool::new();
        let mut table = Table::new(&pool);
        let result = Query::parse_into(&pool, &mut table, b"a=1&b=2&c=%", &ParseLimits::default());

        assert_eq!(result, Err(Error::malformed(10)));
        assert_eq!(pairs(&table), [("a", "1"), ("b", "2")]);
    }

    #[test]
    fn limit_error() {
        let pool = Pool::new();
        let limits = ParseLimits {
            max_params: 1,
            ..ParseLimits::default()
        };

        let mut table = Table::new(&pool);
        assert_eq!(
            Query::parse_into(&pool, &mut table, b"a&a", &limits),
            Err(Error::OverLimit { limit: 1 })
        );
        assert_eq!(table.len(), 1);

        // Skipped segments do not count
        let mut table = Table::new(&pool);
        assert!(Query::parse_into(&pool, &mut table, b"&&a&&", &limits).is_ok());
    }

    #[test]
    fn value_length_limit() {
        let pool = Pool::new();
        let limits = ParseLimits {
            max_value_len: 3,
            ..ParseLimits::default()
        };

        let mut params: Vec<&Param> = Vec::new();
        assert!(Query::parse_into(&pool, &mut params, b"abc=123", &limits).is_ok());
        assert_eq!(
            Query::parse_into(&pool, &mut params, b"k=1234", &limits),
            Err(Error::OverLimit { limit: 3 })
        );
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn segment_count_matches_records() {
        let pool = Pool::new();
        let line = b"a=1&&b;c=&d=%20;;e";
        let segments = line
            .split(|b| *b == b'&' || *b == b';')
            .filter(|s| !s.is_empty())
            .count();

        assert_eq!(Query::parse(&pool, line).unwrap().len(), segments);
    }
}
