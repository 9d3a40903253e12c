//! Ordered multi-map of pool records with case-insensitive lookup.

use crate::{
    codec,
    http::{
        cookie::Cookie,
        types::{eq_ignore_case, Join},
        value::{self, Param, Value},
    },
    pool::Pool,
};
use bumpalo::collections::Vec as BumpVec;
use std::fmt;

/// A record that can live in a [`Table`].
pub trait Record<'p> {
    /// The name/value pair underlying the record.
    fn as_value(&self) -> &Value<'p>;
}

impl<'p> Record<'p> for Value<'p> {
    #[inline(always)]
    fn as_value(&self) -> &Value<'p> {
        self
    }
}

impl<'p> Record<'p> for Param<'p> {
    #[inline(always)]
    fn as_value(&self) -> &Value<'p> {
        self.value()
    }
}

impl<'p> Record<'p> for Cookie<'p> {
    #[inline(always)]
    fn as_value(&self) -> &Value<'p> {
        self.value()
    }
}

/// Insertion-ordered, duplicate-permitting name → record table.
///
/// Lookups compare names ASCII case-insensitively. Repeated submissions of
/// the same name (checkbox groups, repeated cookies) are all kept, in the
/// order they arrived, so joins are deterministic.
///
/// Records are borrowed from the [`Pool`]; the table itself only stores
/// references, also inside the pool.
///
/// # Examples
/// ```
/// use maker_req::{Join, Pool, Query};
///
/// let pool = Pool::new();
/// let args = Query::parse(&pool, b"a=1&b=2&A=3").unwrap();
///
/// let values: Vec<&[u8]> = args.as_array(Some(b"a")).iter().map(|p| p.data()).collect();
/// assert_eq!(values, [b"1", b"3"]);
///
/// assert_eq!(args.join(Some(b"a"), Join::Raw), Some(&b"1, 3"[..]));
/// assert_eq!(args.join(Some(b"missing"), Join::Raw), None);
/// ```
pub struct Table<'p, T> {
    pool: &'p Pool,
    entries: BumpVec<'p, &'p T>,
}

impl<'p, T> Table<'p, T> {
    /// Creates an empty table in `pool`.
    #[inline]
    pub fn new(pool: &'p Pool) -> Self {
        Self::with_capacity(pool, crate::limits::ParseLimits::default().table_capacity)
    }

    #[inline]
    pub fn with_capacity(pool: &'p Pool, capacity: usize) -> Self {
        Self {
            pool,
            entries: pool.vec(capacity),
        }
    }

    /// Number of records, duplicates included.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pool the table allocates from.
    #[inline(always)]
    pub fn pool(&self) -> &'p Pool {
        self.pool
    }

    /// All records in insertion order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &'p T> + '_ {
        self.entries.iter().copied()
    }
}

impl<'p, T: Record<'p>> Table<'p, T> {
    /// Appends a record. Existing records with the same name are kept.
    #[inline]
    pub fn add(&mut self, record: &'p T) {
        self.entries.push(record);
    }

    /// Records whose name matches `key`, or every record for `None`.
    #[inline]
    pub fn matching<'a>(&'a self, key: Option<&'a [u8]>) -> impl Iterator<Item = &'p T> + 'a {
        self.iter().filter(move |record| match key {
            Some(key) => eq_ignore_case(record.as_value().name(), key),
            None => true,
        })
    }

    /// First record named `key`.
    #[inline]
    pub fn get(&self, key: &[u8]) -> Option<&'p T> {
        self.matching(Some(key)).next()
    }

    /// Number of records named `key`.
    #[inline]
    pub fn count(&self, key: &[u8]) -> usize {
        self.matching(Some(key)).count()
    }

    /// All records named `key` (all records for `None`), in insertion order.
    ///
    /// Never fails; no match yields an empty vector.
    pub fn as_array(&self, key: Option<&[u8]>) -> Vec<&'p T> {
        self.matching(key).collect()
    }

    /// Joins the values of every record named `key` (every record for
    /// `None`) with `", "`, re-encoding each value per `mode`.
    ///
    /// Returns `None` when nothing matches, so an absent key is told apart
    /// from a present but empty value. The result is allocated from the
    /// table's pool and NUL-terminated there.
    pub fn join(&self, key: Option<&[u8]>, mode: Join) -> Option<&'p [u8]> {
        let mut matches = self.matching(key).peekable();
        matches.peek()?;

        let mut out = Vec::new();
        for (i, record) in matches.enumerate() {
            if i > 0 {
                out.extend_from_slice(b", ");
            }

            let data = record.as_value().data();
            match mode {
                Join::Raw => out.extend_from_slice(data),
                Join::Escape => {
                    codec::escape(data, &mut out);
                }
                Join::Unescape => match codec::unescape(data) {
                    Ok(decoded) => out.extend_from_slice(&decoded),
                    Err(e) => {
                        tracing::trace!(error = %e, "table: join kept undecodable value");
                        out.extend_from_slice(data);
                    }
                },
                Join::UrlEncode => {
                    codec::encode(data, &mut out);
                }
                Join::Quote => {
                    codec::quote(data, &mut out);
                }
            }
        }

        let joined = value::alloc_with_nul(self.pool, &out);
        Some(&joined[..out.len()])
    }

    /// New table with the records of `self` followed by those of `other`.
    pub fn overlay(&self, other: &Table<'p, T>) -> Table<'p, T> {
        let mut merged = Table::with_capacity(self.pool, self.len() + other.len());
        self.iter().chain(other.iter()).for_each(|record| merged.add(record));
        merged
    }
}

impl<'p> Table<'p, Param<'p>> {
    /// Sub-table of the params that carry an upload spool.
    pub fn uploads(&self) -> Table<'p, Param<'p>> {
        let mut uploads = Table::new(self.pool);
        self.iter()
            .filter(|param| param.upload().is_some())
            .for_each(|param| uploads.add(param));
        uploads
    }

    /// First param named `name` (any name for `None`) that carries an
    /// upload spool. Stops at the first hit.
    pub fn upload(&self, name: Option<&[u8]>) -> Option<&'p Param<'p>> {
        self.matching(name).find(|param| param.upload().is_some())
    }
}

impl<T> Clone for Table<'_, T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool,
            entries: self.entries.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Table<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{tools::*, Query};

    fn data<'p>(records: &[&'p Param<'p>]) -> Vec<&'p str> {
        records.iter().map(|p| str_op(p.data())).collect()
    }

    #[test]
    fn array_in_insertion_order() {
        let pool = Pool::new();
        let args = Query::parse(&pool, b"a=1&b=2&a=3").unwrap();

        assert_eq!(data(&args.as_array(Some(b"a"))), ["1", "3"]);
        assert_eq!(data(&args.as_array(Some(b"A"))), ["1", "3"]);
        assert_eq!(data(&args.as_array(None)), ["1", "2", "3"]);
        assert!(args.as_array(Some(b"c")).is_empty());
        assert_eq!(args.count(b"a"), 2);
        assert_eq!(args.get(b"B").map(|p| p.data()), Some(&b"2"[..]));
    }

    #[test]
    fn join_modes() {
        let pool = Pool::new();
        let args = Query::parse(&pool, b"v=a%20b&v=%22q%22&v=x%2525").unwrap();

        let join = |mode| str(args.join(Some(b"v"), mode));
        assert_eq!(join(Join::Raw), Some(r#"a b, "q", x%25"#));
        assert_eq!(join(Join::Escape), Some("a%20b, %22q%22, x%2525"));
        assert_eq!(join(Join::Unescape), Some(r#"a b, "q", x%"#));
        assert_eq!(join(Join::UrlEncode), Some("a%20b, %22q%22, x%2525"));
        assert_eq!(join(Join::Quote), Some(r#""a b", "\"q\"", "x%25""#));
    }

    #[test]
    fn join_absent_vs_empty() {
        let pool = Pool::new();
        let args = Query::parse(&pool, b"empty=&flag").unwrap();

        assert_eq!(args.join(Some(b"empty"), Join::Raw), Some(&b""[..]));
        assert_eq!(args.join(Some(b"flag"), Join::Raw), Some(&b""[..]));
        assert_eq!(args.join(Some(b"nope"), Join::Raw), None);
        assert_eq!(str(args.join(None, Join::Raw)), Some(", "));

        let empty: Table<Param> = Table::new(&pool);
        assert_eq!(empty.join(None, Join::Quote), None);
    }

    #[test_log::test]
    fn join_unescape_keeps_undecodable() {
        let pool = Pool::new();
        let mut table = Table::new(&pool);
        table.add(Param::make(&pool, b"k", b"50%"));
        table.add(Param::make(&pool, b"k", b"a%2Fb"));

        assert_eq!(str(table.join(Some(b"k"), Join::Unescape)), Some("50%, a/b"));
    }

    #[test]
    fn uploads_filter() {
        let pool = Pool::new();
        let spool_a = b"AAAA".to_vec();
        let spool_b = b"BB".to_vec();

        let mut body = Table::new(&pool);
        body.add(Param::make(&pool, b"title", b"holiday"));
        body.add(Param::make(&pool, b"photo", b"a.jpg").with_upload(&pool, &spool_a));
        body.add(Param::make(&pool, b"note", b""));
        body.add(Param::make(&pool, b"photo", b"b.jpg").with_upload(&pool, &spool_b));

        let uploads = body.uploads();
        assert_eq!(uploads.len(), 2);
        assert_eq!(data(&uploads.as_array(None)), ["a.jpg", "b.jpg"]);

        assert_eq!(body.upload(None).map(|p| p.data()), Some(&b"a.jpg"[..]));
        assert_eq!(body.upload(Some(b"PHOTO")).map(|p| p.data()), Some(&b"a.jpg"[..]));
        assert!(body.upload(Some(b"title")).is_none());
        assert!(body.upload(Some(b"missing")).is_none());
    }

    #[test]
    fn overlay_keeps_order() {
        let pool = Pool::new();
        let args = Query::parse(&pool, b"a=1&b=2").unwrap();
        let body = Query::parse(&pool, b"a=3").unwrap();

        let merged = args.overlay(&body);
        assert_eq!(data(&merged.as_array(None)), ["1", "2", "3"]);
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn info_table_of_values() {
        let pool = Pool::new();
        let mut info = Table::new(&pool);
        info.add(pool_value(&pool, b"Content-Type", b"image/png"));

        let info: &Table<Value> = pool.alloc(info);
        let param = Param::make(&pool, b"avatar", b"me.png").with_info(&pool, info);

        let headers = param.info().unwrap();
        assert_eq!(
            headers.get(b"content-type").map(|v| v.data()),
            Some(&b"image/png"[..])
        );
    }

    fn pool_value<'p>(pool: &'p Pool, name: &[u8], data: &[u8]) -> &'p Value<'p> {
        pool.alloc(Value::make(pool, name, data))
    }
}
