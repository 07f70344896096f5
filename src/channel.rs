// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Channel engine — owns a channel's segment list, its index cache, and its
//! configuration, and exposes the full per-channel operation set: open/scan,
//! append with rollover, read, range, find-by-time, retention eviction, and
//! finalize.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::cache::{CachedEntry, IndexCache};
use crate::clock::Clock;
use crate::error::{Result, StoreError};
use crate::segment::{segment_paths, Segment, DATA_HEADER_SIZE};

/// Hard constant: part numbers run `000000..999999`, 1,000,000 of them.
pub const MAX_PARTS: u32 = 1_000_000;
/// Hard constant: fixed slot count of the index cache.
pub const CACHE_CAPACITY: usize = 2048;

pub const MIN_MAX_SEGMENT_SIZE: u64 = 1024 * 1024;
pub const MAX_MAX_SEGMENT_SIZE: u64 = 1024 * 1024 * 1024;
pub const MIN_RETENTION_TIME: i64 = 5_000_000;
pub const MIN_RETENTION_SIZE: u64 = 1024 * 1024;

fn validate_max_segment_size(v: u64) -> Result<()> {
    if (MIN_MAX_SEGMENT_SIZE..=MAX_MAX_SEGMENT_SIZE).contains(&v) {
        Ok(())
    } else {
        Err(StoreError::Invalid(format!(
            "max_segment_size {v} out of range [{MIN_MAX_SEGMENT_SIZE}, {MAX_MAX_SEGMENT_SIZE}]"
        )))
    }
}

fn validate_retention_time(v: i64) -> Result<()> {
    if v >= MIN_RETENTION_TIME {
        Ok(())
    } else {
        Err(StoreError::Invalid(format!(
            "retention_time {v} below minimum {MIN_RETENTION_TIME}"
        )))
    }
}

fn validate_retention_size(v: u64) -> Result<()> {
    if v >= MIN_RETENTION_SIZE {
        Ok(())
    } else {
        Err(StoreError::Invalid(format!(
            "retention_size {v} below minimum {MIN_RETENTION_SIZE}"
        )))
    }
}

/// Construction-time configuration values (§6 of the design).
///
/// This is configuration *surface*, not configuration *loading* — there is
/// deliberately no file-format parsing here; a host process is free to
/// deserialize a value shaped like this from whatever format it likes.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub max_segment_size: u64,
    pub retention_time: i64,
    pub retention_size: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig {
            max_segment_size: MAX_MAX_SEGMENT_SIZE,
            retention_time: i64::MAX,
            retention_size: u64::MAX,
        }
    }
}

impl ChannelConfig {
    pub fn validate(&self) -> Result<()> {
        validate_max_segment_size(self.max_segment_size)?;
        validate_retention_time(self.retention_time)?;
        validate_retention_size(self.retention_size)?;
        Ok(())
    }
}

/// Outcome of `find`: where a target timestamp falls relative to the
/// channel's currently stored records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindOutcome {
    Before { right: (i32, i64) },
    After { left: (i32, i64) },
    Exact { index: i32, time: i64 },
    Between { left: (i32, i64), right: (i32, i64) },
}

struct Inner {
    read_only: bool,
    failed: bool,
    segments: VecDeque<Segment>,
    cache: IndexCache,
    total_payload_bytes: u64,
    max_segment_size: u64,
    retention_time: i64,
    retention_size: u64,
}

impl Inner {
    fn evict_if_needed(&mut self, clock: &dyn Clock) -> Result<()> {
        if self.read_only || self.segments.len() < 2 {
            return Ok(());
        }
        let now = clock.now_micros();
        let (should_evict, begin_index, payload_bytes) = {
            let head = self.segments.front().unwrap();
            let age_trip = now - head.last_append_time() > self.retention_time;
            let size_trip = self.total_payload_bytes - head.payload_bytes() > self.retention_size;
            (age_trip || size_trip, head.begin_index(), head.payload_bytes())
        };
        if !should_evict {
            return Ok(());
        }

        let evicted = self.segments.pop_front().expect("checked len >= 2 above");
        warn!(part = evicted.part(), begin_index, "evicting head segment for retention");
        evicted.delete()?;
        self.total_payload_bytes -= payload_bytes;
        self.cache.invalidate_segment(begin_index);

        for (i, seg) in self.segments.iter_mut().enumerate() {
            seg.rename_to_part(i as u32)?;
        }
        Ok(())
    }

    fn append(&mut self, dir: &Path, name: &str, time: i64, payload: &[u8], clock: &dyn Clock) -> Result<i32> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        if time < 0 {
            return Err(StoreError::Invalid("record time must be non-negative".into()));
        }
        let max_payload = self.max_segment_size - DATA_HEADER_SIZE;
        if payload.len() as u64 > max_payload {
            return Err(StoreError::Invalid(format!(
                "payload of {} bytes exceeds max {} bytes",
                payload.len(),
                max_payload
            )));
        }

        self.evict_if_needed(clock)?;

        let now = clock.now_micros();
        let payload_len = payload.len() as u64;

        if self.segments.is_empty() {
            let seg = Segment::create(dir, name, 0, 0, now)?;
            self.segments.push_back(seg);
        } else {
            // These checks run against the existing tail unconditionally,
            // before any rollover decision — a tail already full or already
            // at its end-time bound must reject the append, not dodge the
            // check by rolling into a fresh segment.
            {
                let tail = self.segments.back().unwrap();
                if tail.end_index() == i32::MAX {
                    return Err(StoreError::Full("record index space exhausted".into()));
                }
                if tail.end_time() >= time {
                    return Err(StoreError::OutOfOrderTime);
                }
            }

            let needs_rollover = {
                let tail = self.segments.back().unwrap();
                tail.payload_bytes() + payload_len > max_payload
                    || now - tail.create_time() > self.retention_time / 5
                    || tail.data_size() + payload_len > self.retention_size / 5 - DATA_HEADER_SIZE
            };
            if needs_rollover {
                let prev_part = self.segments.back().unwrap().part();
                if prev_part + 1 >= MAX_PARTS {
                    return Err(StoreError::Full("maximum number of segment parts reached".into()));
                }
                let next_begin_index = self.segments.back().unwrap().end_index() + 1;
                self.segments.back_mut().unwrap().close_writer();
                let seg = Segment::create(dir, name, prev_part + 1, next_begin_index, now)?;
                debug!(part = prev_part + 1, next_begin_index, "rolled over to new segment");
                self.segments.push_back(seg);
            }
        }

        let tail = self.segments.back_mut().unwrap();
        let entry = tail.append(time, payload, now)?;
        let segment_begin_index = tail.begin_index();
        let assigned_index = tail.end_index();

        self.total_payload_bytes += payload_len;
        self.cache.insert(
            assigned_index,
            CachedEntry {
                time: entry.time,
                offset: entry.offset,
                size: entry.size,
                segment_begin_index,
            },
        );

        debug!(index = assigned_index, time, bytes = payload.len(), "appended record");
        Ok(assigned_index)
    }

    fn read(&mut self, index: i32, buf: Option<&mut [u8]>) -> Result<(usize, i64)> {
        let cached = match self.cache.lookup(index) {
            Some(c) => c,
            None => {
                let seg_pos = self
                    .segments
                    .iter()
                    .position(|s| s.covers(index))
                    .ok_or(StoreError::NotFound)?;
                let entry = self.segments[seg_pos].read_entry(index)?;
                let cached = CachedEntry {
                    time: entry.time,
                    offset: entry.offset,
                    size: entry.size,
                    segment_begin_index: self.segments[seg_pos].begin_index(),
                };
                self.cache.insert(index, cached);
                cached
            }
        };

        match buf {
            None => Ok((cached.size as usize, cached.time)),
            Some(b) => {
                let seg = self
                    .segments
                    .iter()
                    .find(|s| s.begin_index() == cached.segment_begin_index)
                    .ok_or(StoreError::NotFound)?;
                let n = b.len().min(cached.size as usize);
                let read = seg.read_data(cached.offset as u64, &mut b[..n])?;
                Ok((read, cached.time))
            }
        }
    }

    fn range(&self) -> Result<(i32, i32)> {
        let head = self.segments.front().ok_or(StoreError::Empty)?;
        let tail = self.segments.back().expect("non-empty segment list has a back");
        Ok((head.begin_index(), tail.end_index()))
    }

    fn find(&mut self, target: i64) -> Result<FindOutcome> {
        if self.segments.is_empty() {
            return Err(StoreError::Empty);
        }
        let (head_begin_index, head_begin_time) = {
            let head = self.segments.front().unwrap();
            (head.begin_index(), head.begin_time())
        };
        let (tail_end_index, tail_end_time) = {
            let tail = self.segments.back().unwrap();
            (tail.end_index(), tail.end_time())
        };

        if target < head_begin_time {
            return Ok(FindOutcome::Before {
                right: (head_begin_index, head_begin_time),
            });
        }
        if target > tail_end_time {
            return Ok(FindOutcome::After {
                left: (tail_end_index, tail_end_time),
            });
        }

        let mut begin_idx = head_begin_index;
        let mut begin_time = head_begin_time;
        let mut end_idx = tail_end_index;
        let mut end_time = tail_end_time;

        loop {
            if begin_time == target {
                return Ok(FindOutcome::Exact {
                    index: begin_idx,
                    time: begin_time,
                });
            }
            if end_time == target {
                return Ok(FindOutcome::Exact {
                    index: end_idx,
                    time: end_time,
                });
            }
            if end_idx - begin_idx == 1 {
                return Ok(FindOutcome::Between {
                    left: (begin_idx, begin_time),
                    right: (end_idx, end_time),
                });
            }
            let mid = begin_idx + (end_idx - begin_idx) / 2;
            let (_, mid_time) = self.read(mid, None)?;
            if mid_time <= target {
                begin_idx = mid;
                begin_time = mid_time;
            } else {
                end_idx = mid;
                end_time = mid_time;
            }
        }
    }
}

/// One logical append-only time-indexed stream.
///
/// Every public operation (other than the pure getters) acquires the
/// channel's single mutex for its whole duration, serializing all access.
pub struct Channel {
    name: String,
    dir: PathBuf,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl Channel {
    /// Open (scanning existing parts) or initialize a fresh, empty channel.
    ///
    /// If any part already exists on disk, the channel is forced into
    /// read-only mode regardless of `read_only` — existing channels are
    /// immutable.
    pub fn open(dir: &Path, name: &str, read_only: bool, config: ChannelConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(dir)?;

        let mut segments: VecDeque<Segment> = VecDeque::new();
        let mut forced_read_only = read_only;
        let mut total_payload_bytes = 0u64;
        let mut failed = false;

        for part in 0..MAX_PARTS {
            let (index_path, _data_path) = segment_paths(dir, name, part);
            if !index_path.exists() {
                break;
            }

            match Segment::open_existing(dir, name, part) {
                Ok(seg) => {
                    forced_read_only = true;
                    if let Some(prev) = segments.back() {
                        if seg.begin_index() != prev.end_index() + 1 {
                            warn!(part, "segment continuity check failed, truncating to loaded prefix");
                            break;
                        }
                    }
                    total_payload_bytes += seg.payload_bytes();
                    segments.push_back(seg);
                }
                Err(e) => {
                    if segments.is_empty() {
                        warn!(part, error = %e, "first segment failed to open, channel entering failed state");
                        failed = true;
                    } else {
                        warn!(part, error = %e, "segment failed to open, truncating to loaded prefix");
                    }
                    break;
                }
            }
        }

        if forced_read_only && segments.is_empty() {
            failed = true;
        }

        Ok(Channel {
            name: name.to_string(),
            dir: dir.to_path_buf(),
            clock,
            inner: Mutex::new(Inner {
                read_only: forced_read_only,
                failed,
                segments,
                cache: IndexCache::new(CACHE_CAPACITY),
                total_payload_bytes,
                max_segment_size: config.max_segment_size,
                retention_time: config.retention_time,
                retention_size: config.retention_size,
            }),
        })
    }

    fn with_inner<R>(&self, f: impl FnOnce(&mut Inner, &dyn Clock) -> Result<R>) -> Result<R> {
        let mut guard = self.inner.lock();
        if guard.failed {
            return Err(StoreError::Failed);
        }
        let result = f(&mut guard, self.clock.as_ref());
        if matches!(result, Err(StoreError::Io(_)) | Err(StoreError::CorruptFormat(_))) {
            guard.failed = true;
        }
        result
    }

    pub fn append(&self, time: i64, payload: &[u8]) -> Result<i32> {
        let (dir, name) = (self.dir.clone(), self.name.clone());
        self.with_inner(|inner, clock| inner.append(&dir, &name, time, payload, clock))
    }

    pub fn read(&self, index: i32, buf: Option<&mut [u8]>) -> Result<(usize, i64)> {
        self.with_inner(|inner, _clock| inner.read(index, buf))
    }

    pub fn range(&self) -> Result<(i32, i32)> {
        self.with_inner(|inner, _clock| inner.range())
    }

    pub fn find(&self, target: i64) -> Result<FindOutcome> {
        self.with_inner(|inner, _clock| inner.find(target))
    }

    pub fn finalize(&self) -> Result<()> {
        self.with_inner(|inner, _clock| {
            if let Some(tail) = inner.segments.back_mut() {
                tail.close_writer();
            }
            inner.read_only = true;
            Ok(())
        })
    }

    pub fn set_max_segment_size(&self, bytes: u64) -> Result<()> {
        validate_max_segment_size(bytes)?;
        self.with_inner(|inner, _clock| {
            inner.max_segment_size = bytes;
            Ok(())
        })
    }

    pub fn set_retention_time(&self, micros: i64) -> Result<()> {
        validate_retention_time(micros)?;
        self.with_inner(|inner, _clock| {
            inner.retention_time = micros;
            Ok(())
        })
    }

    pub fn set_retention_size(&self, bytes: u64) -> Result<()> {
        validate_retention_size(bytes)?;
        self.with_inner(|inner, _clock| {
            inner.retention_size = bytes;
            Ok(())
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_writable(&self) -> bool {
        let guard = self.inner.lock();
        !guard.read_only && !guard.failed
    }

    pub fn is_failed(&self) -> bool {
        self.inner.lock().failed
    }

    /// Creation time (monotonic microseconds, process-local) of every
    /// currently live segment, oldest first — for observability.
    pub fn segment_creation_times(&self) -> Vec<i64> {
        self.inner.lock().segments.iter().map(|s| s.create_time()).collect()
    }
}
