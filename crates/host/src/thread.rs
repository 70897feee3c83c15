//! Thread identity and timing capture.
//!
//! Probe functions receive a `ThreadSample` captured by the host shim at
//! function entry instead of reading thread-local state ambiently. That keeps
//! probe bodies pure functions of (sample, args) and lets tests fabricate
//! samples without a live worker pool.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static PROCESS_START: Lazy<Instant> = Lazy::new(Instant::now);
static NEXT_THREAD_ORDINAL: AtomicU64 = AtomicU64::new(1);

thread_local! {
    // First capture on a thread pins its ordinal for the process lifetime.
    static THREAD_ORDINAL: u64 = NEXT_THREAD_ORDINAL.fetch_add(1, Ordering::Relaxed);
}

/// Which logical thread a call ran on, and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSample {
    /// Small dense per-thread ordinal (1-based), stable for the thread's life.
    pub thread_id: u64,
    /// Milliseconds since process start at capture time.
    pub tick: u64,
}

impl ThreadSample {
    /// Capture the current thread's identity and a millisecond tick.
    pub fn capture() -> Self {
        let thread_id = THREAD_ORDINAL.with(|id| *id);
        let tick = PROCESS_START.elapsed().as_millis() as u64;
        Self { thread_id, tick }
    }

    /// Fabricate a sample for deterministic tests.
    pub fn fixed(thread_id: u64, tick: u64) -> Self {
        Self { thread_id, tick }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_thread_same_id() {
        let a = ThreadSample::capture();
        let b = ThreadSample::capture();
        assert_eq!(a.thread_id, b.thread_id);
        assert!(b.tick >= a.tick);
    }

    #[test]
    fn spawned_thread_gets_distinct_id() {
        let here = ThreadSample::capture().thread_id;
        let there = std::thread::spawn(|| ThreadSample::capture().thread_id)
            .join()
            .unwrap();
        assert_ne!(here, there);
    }
}
