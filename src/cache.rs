//! Record Cache
//!
//! Optional in-memory copies of hot records.
//!
//! For an ordered store the hot records are the first midpoints of every binary
//! search: the midpoint of the whole range, then the midpoints of both halves,
//! and so on (breadth-first). For an unordered store they are the first
//! records, which a linear scan always reads.

use std::collections::{HashMap, VecDeque};

/// Position → record copies, bounded by `capacity`
#[derive(Debug, Default)]
pub(crate) struct RecordCache {
    capacity: usize,
    entries: HashMap<u64, Vec<u8>>,
}

impl RecordCache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
        }
    }

    pub(crate) fn get(&self, index: u64) -> Option<&[u8]> {
        self.entries.get(&index).map(|r| r.as_slice())
    }

    /// Insert a record; ignored once the cache is full
    pub(crate) fn insert(&mut self, index: u64, record: Vec<u8>) {
        if self.entries.len() < self.capacity || self.entries.contains_key(&index) {
            self.entries.insert(index, record);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Positions a lower-bound binary search over `0..length` visits, in
/// breadth-first order, at most `limit` of them.
///
/// Midpoints are computed as `lo + (hi - lo) / 2` over half-open ranges,
/// the same split the search uses.
pub(crate) fn bisection_order(length: u64, limit: usize) -> Vec<u64> {
    let mut order = Vec::with_capacity(limit.min(length as usize));
    let mut pending = VecDeque::new();
    if length > 0 {
        pending.push_back((0u64, length));
    }

    while let Some((lo, hi)) = pending.pop_front() {
        if order.len() >= limit {
            break;
        }
        let mid = lo + (hi - lo) / 2;
        order.push(mid);

        if lo < mid {
            pending.push_back((lo, mid));
        }
        if mid + 1 < hi {
            pending.push_back((mid + 1, hi));
        }
    }

    order
}
