// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Monotonic clock, injected so retention can be tested without real sleeps.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

/// Source of a monotonically non-decreasing microsecond counter.
///
/// The value has no defined relationship to wall-clock time — only elapsed
/// differences between two calls are meaningful. Record timestamps (`i64`
/// microseconds supplied by callers to `append`) are a separate concept and
/// never come from this trait.
pub trait Clock: Send + Sync {
    fn now_micros(&self) -> i64;
}

/// Production clock, backed by `std::time::Instant`.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_micros(&self) -> i64 {
        static START: OnceLock<Instant> = OnceLock::new();
        let start = START.get_or_init(Instant::now);
        start.elapsed().as_micros() as i64
    }
}

/// Test double: an explicit counter the test advances by hand.
#[derive(Debug, Default)]
pub struct FakeClock(AtomicI64);

impl FakeClock {
    pub fn new(start_micros: i64) -> Self {
        Self(AtomicI64::new(start_micros))
    }

    pub fn advance(&self, micros: i64) {
        self.0.fetch_add(micros, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now_micros(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}
