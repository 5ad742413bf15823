//! Shared-memory helpers for the parallel build phases.

use std::cell::UnsafeCell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fixed-capacity arena handing out index ranges through an atomic bump
/// cursor. Writers fill their own ranges through [`Arena::slice_mut`];
/// ranges never overlap, which is what makes the shared writes sound.
pub struct Arena<T> {
    slots: Box<[UnsafeCell<T>]>,
    next: AtomicUsize,
}

unsafe impl<T: Send> Send for Arena<T> {}
unsafe impl<T: Send> Sync for Arena<T> {}

impl<T: Clone> Arena<T> {
    pub fn new(capacity: usize, fill: T) -> Self {
        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(fill.clone()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            slots,
            next: AtomicUsize::new(0),
        }
    }
}

impl<T> Arena<T> {
    /// Reserve a contiguous range and return its start index
    pub fn alloc(&self, count: usize) -> usize {
        let start = self.next.fetch_add(count, Ordering::Relaxed);
        assert!(
            start + count <= self.slots.len(),
            "arena overflow: {} + {} > {}",
            start,
            count,
            self.slots.len()
        );
        start
    }

    /// Number of slots handed out so far
    pub fn len(&self) -> usize {
        self.next.load(Ordering::Relaxed).min(self.slots.len())
    }

    /// Mutable view of a reserved range.
    ///
    /// # Safety
    ///
    /// The range must have been returned by [`Arena::alloc`] and no other
    /// live reference may overlap it.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn slice_mut(&self, start: usize, count: usize) -> &mut [T] {
        debug_assert!(start + count <= self.slots.len());
        std::slice::from_raw_parts_mut(self.slots[start].get(), count)
    }

    /// Consume the arena into the allocated prefix
    pub fn into_vec(self) -> Vec<T> {
        let len = self.len();
        let mut slots = Vec::from(self.slots);
        slots.truncate(len);
        slots.into_iter().map(UnsafeCell::into_inner).collect()
    }
}

/// Slice wrapper whose writes may be shared across worker threads.
///
/// Used by the radix sort scatter phase, where the prefix sums guarantee
/// every destination index is written by exactly one worker.
pub struct SyncSlice<'a, T> {
    ptr: *mut T,
    len: usize,
    marker: PhantomData<&'a mut [T]>,
}

unsafe impl<T: Send> Send for SyncSlice<'_, T> {}
unsafe impl<T: Send> Sync for SyncSlice<'_, T> {}

impl<'a, T> SyncSlice<'a, T> {
    pub fn new(slice: &'a mut [T]) -> Self {
        Self {
            ptr: slice.as_mut_ptr(),
            len: slice.len(),
            marker: PhantomData,
        }
    }

    /// Write one element.
    ///
    /// # Safety
    ///
    /// No other thread may read or write index `i` concurrently.
    pub unsafe fn write(&self, i: usize, value: T) {
        debug_assert!(i < self.len);
        self.ptr.add(i).write(value);
    }
}
