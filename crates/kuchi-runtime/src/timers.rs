//! Live timer accounting

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts timer tasks that are still alive
#[derive(Clone, Debug, Default)]
pub struct TimerGauge {
    live: Arc<AtomicUsize>,
}

impl TimerGauge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one timer until the guard drops
    pub fn guard(&self) -> TimerGuard {
        self.live.fetch_add(1, Ordering::SeqCst);
        TimerGuard {
            live: Arc::clone(&self.live),
        }
    }

    pub fn active(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// Held by a timer task for its whole life
#[derive(Debug)]
pub struct TimerGuard {
    live: Arc<AtomicUsize>,
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_counts() {
        let gauge = TimerGauge::new();
        let a = gauge.guard();
        let b = gauge.clone().guard();
        assert_eq!(gauge.active(), 2);
        drop(a);
        drop(b);
        assert_eq!(gauge.active(), 0);
    }
}
