use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use geometry::{Bounds3f, Vec3f};

/// Number of primitive references held by one block
pub const BLOCK_CAPACITY: usize = 256;

/// Bounds of one primitive plus its packed geometry/primitive id
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrimRef {
    pub bounds: Bounds3f,
    pub id: u32,
}

impl PrimRef {
    pub const INVALID: Self = Self {
        bounds: Bounds3f::EMPTY,
        id: u32::MAX,
    };

    #[inline]
    pub fn new(bounds: Bounds3f, id: u32) -> Self {
        Self { bounds, id }
    }

    #[inline]
    pub fn centroid(&self) -> Vec3f {
        self.bounds.centroid()
    }
}

/// Fixed-capacity batch of primitive references
pub struct PrimRefBlock {
    items: [PrimRef; BLOCK_CAPACITY],
    len: usize,
}

impl PrimRefBlock {
    pub fn new() -> Self {
        Self {
            items: [PrimRef::INVALID; BLOCK_CAPACITY],
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == BLOCK_CAPACITY
    }

    /// Append a reference; returns false when the block is full
    #[inline]
    pub fn push(&mut self, prim: PrimRef) -> bool {
        if self.len == BLOCK_CAPACITY {
            return false;
        }
        self.items[self.len] = prim;
        self.len += 1;
        true
    }

    #[inline]
    pub fn prims(&self) -> &[PrimRef] {
        &self.items[..self.len]
    }

    /// Reset to empty for reuse through the block allocator
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl Default for PrimRefBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl crate::alloc::Reset for PrimRefBlock {
    fn reset(&mut self) {
        self.clear();
    }
}

/// List of primitive reference blocks shared between build tasks
pub type PrimRefList = AtomicList<Box<PrimRefBlock>>;

struct ListNode<T> {
    item: T,
    next: *mut ListNode<T>,
}

/// Intrusive stack supporting lock-free concurrent pushes.
///
/// Pushes synchronize through a compare-exchange on the head pointer and
/// may run from any number of threads. Draining requires exclusive access,
/// which the builders have at their phase barriers.
pub struct AtomicList<T> {
    head: AtomicPtr<ListNode<T>>,
}

unsafe impl<T: Send> Send for AtomicList<T> {}
unsafe impl<T: Send> Sync for AtomicList<T> {}

impl<T> AtomicList<T> {
    pub const fn new() -> Self {
        Self {
            head: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Push an item; safe to call concurrently with other pushes
    pub fn push(&self, item: T) {
        let node = Box::into_raw(Box::new(ListNode {
            item,
            next: ptr::null_mut(),
        }));
        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            // The node is unpublished, writing its next link is safe
            unsafe { (*node).next = head };
            match self
                .head
                .compare_exchange_weak(head, node, Ordering::Release, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(current) => head = current,
            }
        }
    }

    /// Remove and return the most recently pushed item
    pub fn pop(&mut self) -> Option<T> {
        let head = *self.head.get_mut();
        if head.is_null() {
            return None;
        }
        let node = unsafe { Box::from_raw(head) };
        *self.head.get_mut() = node.next;
        Some(node.item)
    }

    /// Move the whole list out, leaving this one empty
    pub fn take(&mut self) -> Self {
        let head = std::mem::replace(self.head.get_mut(), ptr::null_mut());
        Self {
            head: AtomicPtr::new(head),
        }
    }

    /// Drain every item into a vector
    pub fn drain(&mut self) -> Vec<T> {
        let mut items = Vec::new();
        while let Some(item) = self.pop() {
            items.push(item);
        }
        items
    }

    pub fn is_empty(&mut self) -> bool {
        self.head.get_mut().is_null()
    }

    /// Walk the items without removing them. The exclusive borrow rules out
    /// concurrent pushes while the iterator is alive.
    pub fn iter(&mut self) -> ListIter<'_, T> {
        ListIter {
            cur: *self.head.get_mut(),
            _list: std::marker::PhantomData,
        }
    }
}

pub struct ListIter<'a, T> {
    cur: *mut ListNode<T>,
    _list: std::marker::PhantomData<&'a mut AtomicList<T>>,
}

impl<'a, T> Iterator for ListIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.cur.is_null() {
            return None;
        }
        let node = unsafe { &*self.cur };
        self.cur = node.next;
        Some(&node.item)
    }
}

impl<T> Default for AtomicList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for AtomicList<T> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
    }
}
