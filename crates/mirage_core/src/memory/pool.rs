//! # Pool Allocator
//!
//! Free-list pool for objects that own heap buffers and are recycled at a high rate.

/// Objects that can be returned to a [`Pool`] and handed out again.
///
/// `recycle` must drop logical contents but keep any heap capacity, so the
/// next `acquire` reuses the allocation instead of making a fresh one.
pub trait Recycle: Default {
    /// Clears the object for reuse.
    fn recycle(&mut self);
}

/// A free-list pool of recyclable objects.
///
/// Released objects are parked on a free list and handed back out by
/// [`Pool::acquire`]. Once warmed up, acquire/release pairs never touch the
/// heap: the free list is pre-sized and the objects keep their capacity.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. Use one pool per owning thread.
///
/// # Example
///
/// ```rust,ignore
/// let mut pool: Pool<Snapshot> = Pool::new(64, 256);
///
/// // Acquire - O(1), recycled object when available
/// let mut snap = pool.acquire();
///
/// // Release - O(1), object parked for reuse
/// pool.release(snap);
/// ```
pub struct Pool<T: Recycle> {
    /// Parked objects ready for reuse.
    free_list: Vec<T>,
    /// Upper bound on parked objects; extras are dropped on release.
    max_free: usize,
    /// Objects handed out and not yet released.
    outstanding: usize,
    /// Acquires that had to construct a new object.
    misses: u64,
}

impl<T: Recycle> Pool<T> {
    /// Creates a pool with `prewarm` ready objects, retaining at most `max_free`.
    ///
    /// # Arguments
    ///
    /// * `prewarm` - Objects constructed up front
    /// * `max_free` - Maximum parked objects (clamped to at least `prewarm`)
    #[must_use]
    pub fn new(prewarm: usize, max_free: usize) -> Self {
        let max_free = max_free.max(prewarm);
        let mut free_list = Vec::with_capacity(max_free);
        free_list.extend((0..prewarm).map(|_| T::default()));

        Self {
            free_list,
            max_free,
            outstanding: 0,
            misses: 0,
        }
    }

    /// Returns the number of parked objects.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    /// Returns the number of objects currently handed out.
    #[inline]
    #[must_use]
    pub const fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Returns how many acquires found the free list empty.
    #[inline]
    #[must_use]
    pub const fn misses(&self) -> u64 {
        self.misses
    }

    /// Hands out a recycled object, or a fresh one if the free list is empty.
    pub fn acquire(&mut self) -> T {
        self.outstanding += 1;
        if let Some(value) = self.free_list.pop() {
            value
        } else {
            self.misses += 1;
            T::default()
        }
    }

    /// Returns an object to the pool.
    ///
    /// The object is recycled and parked, or dropped when the pool is at its
    /// retention limit.
    pub fn release(&mut self, mut value: T) {
        self.outstanding = self.outstanding.saturating_sub(1);
        if self.free_list.len() < self.max_free {
            value.recycle();
            self.free_list.push(value);
        }
    }
}
