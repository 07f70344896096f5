// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Embedded, append-only, segmented time-series channel store.
//!
//! A [`Channel`] is one logical stream of `(time, payload)` records, backed
//! by a directory of size-bounded on-disk segments and fronted by a
//! fixed-capacity LRU index cache.

pub mod cache;
pub mod channel;
pub mod clock;
pub mod error;
pub mod segment;

pub use cache::{CachedEntry, IndexCache};
pub use channel::{Channel, ChannelConfig, FindOutcome};
pub use clock::{Clock, FakeClock, SystemClock};
pub use error::{Result, StoreError};
pub use segment::{IndexEntry, Segment};
