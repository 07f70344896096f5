// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Fixed-capacity LRU cache of decoded index entries.
//!
//! The slot array is sized once, at construction, and never reallocated.
//! Each occupied slot is a node of an intrusive doubly-linked list (`prev`/
//! `next` are slot indices, not pointers) ordered most-recently-used first;
//! a `HashMap<i32, usize>` maps a record index to its slot for O(1) lookup.

use std::collections::HashMap;

/// A cached `{time, offset, size}` triple plus the stable identity
/// (`begin_index`) of the segment that owns it. `begin_index` is used rather
/// than a position in the segment vector because retention eviction and
/// part-renumbering shift vector positions but never reuse or renumber a
/// segment's `begin_index`.
#[derive(Debug, Clone, Copy)]
pub struct CachedEntry {
    pub time: i64,
    pub offset: u32,
    pub size: u32,
    pub segment_begin_index: i32,
}

struct Slot {
    key: i32,
    entry: CachedEntry,
    prev: Option<usize>,
    next: Option<usize>,
}

pub struct IndexCache {
    slots: Vec<Option<Slot>>,
    map: HashMap<i32, usize>,
    free: Vec<usize>,
    head: Option<usize>, // MRU
    tail: Option<usize>, // LRU
    capacity: usize,
}

impl IndexCache {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        IndexCache {
            slots,
            map: HashMap::with_capacity(capacity),
            free: (0..capacity).rev().collect(),
            head: None,
            tail: None,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn lookup(&mut self, key: i32) -> Option<CachedEntry> {
        let slot_idx = *self.map.get(&key)?;
        self.move_to_front(slot_idx);
        Some(self.slots[slot_idx].as_ref().unwrap().entry)
    }

    pub fn insert(&mut self, key: i32, entry: CachedEntry) {
        if let Some(&slot_idx) = self.map.get(&key) {
            self.slots[slot_idx].as_mut().unwrap().entry = entry;
            self.move_to_front(slot_idx);
            return;
        }

        let slot_idx = if let Some(idx) = self.free.pop() {
            idx
        } else {
            let victim = self.tail.expect("cache at capacity implies a tail slot");
            self.detach(victim);
            let victim_key = self.slots[victim].as_ref().unwrap().key;
            self.map.remove(&victim_key);
            victim
        };

        self.slots[slot_idx] = Some(Slot {
            key,
            entry,
            prev: None,
            next: None,
        });
        self.map.insert(key, slot_idx);
        self.push_front(slot_idx);
    }

    /// Drop every cached entry owned by the segment identified by
    /// `segment_begin_index`. Called once per retention eviction.
    pub fn invalidate_segment(&mut self, segment_begin_index: i32) {
        let victims: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().filter(|s| s.entry.segment_begin_index == segment_begin_index).map(|_| i))
            .collect();
        for slot_idx in victims {
            let key = self.slots[slot_idx].as_ref().unwrap().key;
            self.detach(slot_idx);
            self.slots[slot_idx] = None;
            self.map.remove(&key);
            self.free.push(slot_idx);
        }
    }

    fn detach(&mut self, slot_idx: usize) {
        let (prev, next) = {
            let slot = self.slots[slot_idx].as_ref().unwrap();
            (slot.prev, slot.next)
        };
        match prev {
            Some(p) => self.slots[p].as_mut().unwrap().next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].as_mut().unwrap().prev = prev,
            None => self.tail = prev,
        }
        if let Some(slot) = self.slots[slot_idx].as_mut() {
            slot.prev = None;
            slot.next = None;
        }
    }

    fn push_front(&mut self, slot_idx: usize) {
        let old_head = self.head;
        if let Some(slot) = self.slots[slot_idx].as_mut() {
            slot.prev = None;
            slot.next = old_head;
        }
        if let Some(h) = old_head {
            self.slots[h].as_mut().unwrap().prev = Some(slot_idx);
        }
        self.head = Some(slot_idx);
        if self.tail.is_none() {
            self.tail = Some(slot_idx);
        }
    }

    fn move_to_front(&mut self, slot_idx: usize) {
        if self.head == Some(slot_idx) {
            return;
        }
        self.detach(slot_idx);
        self.push_front(slot_idx);
    }
}
