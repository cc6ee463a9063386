//! Search
//!
//! Value lookups over a `RecordStore`.
//!
//! The strategy is picked from the store's ordered flag alone:
//! - unordered: linear scan from the start, first match wins, O(n)
//! - ordered: lower-bound binary search, leftmost match wins, O(log n)

use std::cmp::Ordering;
use std::ops::Range;

use crate::error::{Result, SobError};
use crate::store::RecordStore;

impl RecordStore {
    /// Position of a record equal to `value`
    pub fn index(&self, value: &[u8]) -> Result<u64> {
        self.index_in(value, 0..self.length())
    }

    /// Position of a record equal to `value` within `range`
    ///
    /// The range is clamped to `0..length`.
    pub fn index_in(&self, value: &[u8], range: Range<u64>) -> Result<u64> {
        let (start, end) = match self.search_bounds(value, range)? {
            Some(bounds) => bounds,
            None => return Err(SobError::NotFound),
        };

        if self.is_ordered() {
            let pos = self.lower_bound(value, start, end)?;
            if pos < end && self.get(pos)? == value {
                return Ok(pos);
            }
            return Err(SobError::NotFound);
        }

        for (offset, record) in self.iter_range(start, end).enumerate() {
            if record? == value {
                return Ok(start + offset as u64);
            }
        }
        Err(SobError::NotFound)
    }

    /// Whether any record equals `value`
    pub fn contains(&self, value: &[u8]) -> Result<bool> {
        match self.index(value) {
            Ok(_) => Ok(true),
            Err(SobError::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Number of records equal to `value`
    pub fn count(&self, value: &[u8]) -> Result<u64> {
        let (start, end) = match self.search_bounds(value, 0..self.length())? {
            Some(bounds) => bounds,
            None => return Ok(0),
        };

        if self.is_ordered() {
            let lo = self.lower_bound(value, start, end)?;
            let hi = self.upper_bound(value, lo, end)?;
            return Ok(hi - lo);
        }

        let mut matches = 0;
        for record in self.iter_range(start, end) {
            if record? == value {
                matches += 1;
            }
        }
        Ok(matches)
    }

    /// Scan adjacent pairs; if sorted, mark the store ordered.
    ///
    /// Lets a reopened, previously sorted file use binary search without
    /// sorting again.
    pub fn verify_ordered(&mut self) -> Result<bool> {
        let mut previous: Option<Vec<u8>> = None;
        for record in self.iter() {
            let record = record?;
            if let Some(prev) = &previous {
                if prev.as_slice() > record.as_slice() {
                    return Ok(false);
                }
            }
            previous = Some(record);
        }

        self.mark_ordered();
        Ok(true)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Validate `value` and clamp `range`. `None` means nothing can match.
    fn search_bounds(&self, value: &[u8], range: Range<u64>) -> Result<Option<(u64, u64)>> {
        let itemsize = match self.itemsize() {
            Some(size) => size,
            // Unset itemsize implies an empty store
            None => return Ok(None),
        };
        Self::check_width(itemsize, value)?;

        let end = range.end.min(self.length());
        let start = range.start.min(end);
        Ok(Some((start, end)))
    }

    /// First position in `lo..hi` whose record is not less than `value`
    fn lower_bound(&self, value: &[u8], lo: u64, hi: u64) -> Result<u64> {
        self.partition_point(lo, hi, |record| record.cmp(value) == Ordering::Less)
    }

    /// First position in `lo..hi` whose record is greater than `value`
    fn upper_bound(&self, value: &[u8], lo: u64, hi: u64) -> Result<u64> {
        self.partition_point(lo, hi, |record| record.cmp(value) != Ordering::Greater)
    }

    /// Binary search for the first position where `pred` turns false.
    ///
    /// Midpoints match `cache::bisection_order` so warmed records are hit.
    fn partition_point<F>(&self, mut lo: u64, mut hi: u64, pred: F) -> Result<u64>
    where
        F: Fn(&[u8]) -> bool,
    {
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let record = self.get(mid)?;
            if pred(record.as_slice()) {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(lo)
    }
}
