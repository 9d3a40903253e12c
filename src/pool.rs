//! Request-scoped allocation arena.

use bumpalo::{collections::Vec as BumpVec, Bump};

/// Bulk allocator owning every record parsed for one request.
///
/// Records, tables and joined strings borrow from the pool, so the borrow
/// checker guarantees none of them outlives the request. Nothing is freed
/// individually: dropping (or [resetting](Pool::reset)) the pool releases
/// everything at once.
///
/// A pool is `Send` but not `Sync`. Parse concurrent requests with one pool
/// each.
///
/// # Examples
/// ```
/// use maker_req::{Pool, Query};
///
/// let mut pool = Pool::new();
/// {
///     let args = Query::parse(&pool, b"a=1&b=2").unwrap();
///     assert_eq!(args.len(), 2);
/// }
/// pool.reset(); // ready for the next request
/// ```
#[derive(Debug, Default)]
pub struct Pool {
    bump: Bump,
}

impl Pool {
    /// Creates an empty pool. The first chunk is allocated lazily.
    #[inline]
    pub fn new() -> Self {
        Self { bump: Bump::new() }
    }

    /// Creates a pool whose first chunk holds at least `capacity` bytes.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bump: Bump::with_capacity(capacity),
        }
    }

    /// Releases every allocation at once, keeping the largest chunk for reuse.
    #[inline]
    pub fn reset(&mut self) {
        self.bump.reset();
    }

    /// Total bytes currently reserved by the pool.
    #[inline]
    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }

    #[inline(always)]
    pub(crate) fn alloc<T>(&self, value: T) -> &T {
        self.bump.alloc(value)
    }

    #[inline(always)]
    pub(crate) fn alloc_bytes(&self, src: &[u8]) -> &[u8] {
        self.bump.alloc_slice_copy(src)
    }

    /// Zero-filled scratch buffer of `len` bytes.
    #[inline(always)]
    pub(crate) fn alloc_zeroed(&self, len: usize) -> &mut [u8] {
        self.bump.alloc_slice_fill_copy(len, 0u8)
    }

    #[inline(always)]
    pub(crate) fn vec<T>(&self, capacity: usize) -> BumpVec<'_, T> {
        BumpVec::with_capacity_in(capacity, &self.bump)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_and_reset() {
        let mut pool = Pool::with_capacity(1024);
        {
            let bytes = pool.alloc_bytes(b"hello");
            assert_eq!(bytes, b"hello");

            let zeroed = pool.alloc_zeroed(4);
            zeroed[0] = b'x';
            assert_eq!(zeroed, b"x\0\0\0");
        }
        assert!(pool.allocated_bytes() > 0);

        pool.reset();
        assert_eq!(pool.alloc_bytes(b"again"), b"again");
    }

    #[test]
    fn vec_in_pool() {
        let pool = Pool::new();
        let mut v = pool.vec::<u8>(2);
        v.extend_from_slice(b"abc");
        assert_eq!(&v[..], b"abc");
    }
}
