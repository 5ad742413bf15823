use std::sync::Mutex;

/// Reusable block that can be returned to an empty state
pub trait Reset {
    fn reset(&mut self);
}

/// Blocks moved between a thread cache and the shared pool per exchange
const EXCHANGE_SIZE: usize = 8;

/// Thread cache capacity; drains back to half when exceeded
const CACHE_CAPACITY: usize = 2 * EXCHANGE_SIZE;

/// Recycling allocator for the fixed-size blocks used during construction.
///
/// Each worker thread owns a small cache of free blocks. Allocation takes
/// from the cache and refills half of it from the shared pool when empty;
/// freeing returns to the cache and drains half of it back when full. The
/// shared pool is the only contended lock and is touched once per
/// `EXCHANGE_SIZE` operations.
pub struct BlockAllocator<T> {
    pool: Mutex<Vec<Box<T>>>,
    caches: Vec<Mutex<Vec<Box<T>>>>,
}

impl<T: Default + Reset + Send> BlockAllocator<T> {
    pub fn new() -> Self {
        // One cache slot per rayon worker plus one for outside threads
        let slots = rayon::current_num_threads() + 1;
        Self {
            pool: Mutex::new(Vec::new()),
            caches: (0..slots).map(|_| Mutex::new(Vec::new())).collect(),
        }
    }

    fn slot(&self) -> &Mutex<Vec<Box<T>>> {
        let index = rayon::current_thread_index().unwrap_or(self.caches.len() - 1);
        &self.caches[index]
    }

    /// Take a cleared block, reusing a freed one when available
    pub fn alloc(&self) -> Box<T> {
        let mut cache = match self.slot().lock() {
            Ok(cache) => cache,
            Err(poisoned) => poisoned.into_inner(),
        };
        if cache.is_empty() {
            let mut pool = match self.pool.lock() {
                Ok(pool) => pool,
                Err(poisoned) => poisoned.into_inner(),
            };
            for _ in 0..EXCHANGE_SIZE {
                match pool.pop() {
                    Some(block) => cache.push(block),
                    None => break,
                }
            }
        }
        cache.pop().unwrap_or_default()
    }

    /// Return a block for reuse
    pub fn free(&self, mut block: Box<T>) {
        block.reset();
        let mut cache = match self.slot().lock() {
            Ok(cache) => cache,
            Err(poisoned) => poisoned.into_inner(),
        };
        cache.push(block);
        if cache.len() > CACHE_CAPACITY {
            let mut pool = match self.pool.lock() {
                Ok(pool) => pool,
                Err(poisoned) => poisoned.into_inner(),
            };
            for _ in 0..EXCHANGE_SIZE {
                match cache.pop() {
                    Some(block) => pool.push(block),
                    None => break,
                }
            }
        }
    }

    /// Drop every cached block
    pub fn clear(&mut self) {
        for cache in &mut self.caches {
            match cache.get_mut() {
                Ok(cache) => cache.clear(),
                Err(poisoned) => poisoned.into_inner().clear(),
            }
        }
        match self.pool.get_mut() {
            Ok(pool) => pool.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    /// Total number of free blocks held across caches and the pool
    pub fn free_blocks(&mut self) -> usize {
        let cached: usize = self
            .caches
            .iter_mut()
            .map(|cache| match cache.get_mut() {
                Ok(cache) => cache.len(),
                Err(poisoned) => poisoned.into_inner().len(),
            })
            .sum();
        let pooled = match self.pool.get_mut() {
            Ok(pool) => pool.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        };
        cached + pooled
    }
}

impl<T: Default + Reset + Send> Default for BlockAllocator<T> {
    fn default() -> Self {
        Self::new()
    }
}
