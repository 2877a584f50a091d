//! Decoding contexts
//!
//! Each load allocates one context. Whoever holds it must release it; drop
//! releases too. The pool only counts, so leaks show up in `live()`.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct PoolCounters {
    next_id: AtomicU64,
    live: AtomicUsize,
    allocated: AtomicU64,
}

/// Allocator and leak counter for audio contexts
#[derive(Clone, Debug, Default)]
pub struct ContextPool {
    counters: Arc<PoolCounters>,
}

impl ContextPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&self) -> AudioContext {
        let id = self.counters.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.counters.live.fetch_add(1, Ordering::AcqRel);
        self.counters.allocated.fetch_add(1, Ordering::Relaxed);
        AudioContext {
            id,
            counters: Some(Arc::clone(&self.counters)),
        }
    }

    /// Contexts allocated and not yet released
    pub fn live(&self) -> usize {
        self.counters.live.load(Ordering::Acquire)
    }

    /// Contexts ever allocated
    pub fn allocated(&self) -> u64 {
        self.counters.allocated.load(Ordering::Relaxed)
    }
}

/// One decoding context handle
pub struct AudioContext {
    id: u64,
    counters: Option<Arc<PoolCounters>>,
}

impl AudioContext {
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_released(&self) -> bool {
        self.counters.is_none()
    }

    /// Release the context. Safe to call more than once.
    pub fn release(&mut self) {
        if let Some(counters) = self.counters.take() {
            counters.live.fetch_sub(1, Ordering::AcqRel);
            tracing::trace!(context = self.id, "audio context released");
        }
    }
}

impl fmt::Debug for AudioContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioContext")
            .field("id", &self.id)
            .field("released", &self.is_released())
            .finish()
    }
}

impl Drop for AudioContext {
    fn drop(&mut self) {
        self.release();
    }
}
