//! Record Store
//!
//! The addressing layer over a `StorageHandle`.
//!
//! ## Responsibilities
//! - Validate or derive `itemsize` at open
//! - Map positions to byte offsets (`index * itemsize`)
//! - Append / overwrite / clear, keeping `file_size % itemsize == 0`
//! - Track the `ordered` flag that selects binary search
//! - Scoped open/close

use std::path::Path;

use crate::cache::{bisection_order, RecordCache};
use crate::config::{Config, OpenMode};
use crate::error::{Result, SobError};
use crate::sort::{SortEngine, SortStrategy};
use crate::storage::StorageHandle;

/// Batch size for sequential iteration (in bytes)
const ITER_BATCH_BYTES: u64 = 64 * 1024;

/// A file of fixed-width records
///
/// ## Ordered flag
/// - `false` on open (never persisted, never inferred implicitly)
/// - `append` / `set` / `clear` → `false`
/// - `sort` success → `true`, failure → `false`
/// - `verify_ordered` may set it after an explicit scan
pub struct RecordStore {
    /// Backing file
    handle: StorageHandle,

    /// Store configuration (sort budget, cache size, temp dir)
    config: Config,

    /// Bytes per record, once known
    itemsize: Option<u64>,

    /// Number of records (`file_size / itemsize`)
    length: u64,

    /// Whether the on-disk sequence is known to be sorted
    ordered: bool,

    /// Warm copies of hot records
    cache: RecordCache,
}

impl RecordStore {
    /// Open a store over `path`
    ///
    /// On open:
    /// 1. Open the file in `mode` (CreateTruncate empties it)
    /// 2. If non-empty, require a configured itemsize that divides the size
    /// 3. Derive `length`; start unordered
    pub fn open(path: impl AsRef<Path>, mode: OpenMode, config: Config) -> Result<Self> {
        if config.itemsize == Some(0) {
            return Err(SobError::Config("itemsize must be non-zero".to_string()));
        }

        let handle = StorageHandle::open(path.as_ref(), mode)?;
        let file_size = handle.len()?;

        let length = match config.itemsize {
            Some(itemsize) if file_size % itemsize != 0 => {
                return Err(SobError::SizeMismatch { file_size, itemsize });
            }
            Some(itemsize) => file_size / itemsize,
            None if file_size == 0 => 0,
            None => return Err(SobError::ItemSizeRequired),
        };

        tracing::debug!(
            "Opened {} (mode={}, itemsize={:?}, length={})",
            path.as_ref().display(),
            mode,
            config.itemsize,
            length
        );

        Ok(Self {
            handle,
            itemsize: config.itemsize,
            length,
            ordered: false,
            cache: RecordCache::new(config.cache_size),
            config,
        })
    }

    /// Open a store, run `f`, then flush and close on every exit path.
    ///
    /// If `f` fails its error is returned and any close error is only logged.
    pub fn with_open<P, F, R>(path: P, mode: OpenMode, config: Config, f: F) -> Result<R>
    where
        P: AsRef<Path>,
        F: FnOnce(&mut RecordStore) -> Result<R>,
    {
        let mut store = Self::open(path, mode, config)?;
        let result = f(&mut store);
        let closed = store.close();

        match result {
            Ok(value) => {
                closed?;
                Ok(value)
            }
            Err(e) => {
                if let Err(close_err) = closed {
                    tracing::warn!("Close failed after error ({}): {}", e, close_err);
                }
                Err(e)
            }
        }
    }

    /// Flush all mutations and release the file
    pub fn close(self) -> Result<()> {
        self.handle.close()
    }

    /// Force written records to disk without closing
    pub fn flush(&mut self) -> Result<()> {
        self.handle.flush()
    }

    // =========================================================================
    // Item Size
    // =========================================================================

    /// Bytes per record, if configured
    pub fn itemsize(&self) -> Option<u64> {
        self.itemsize
    }

    /// Set the record width. Only allowed while the store is empty.
    pub fn set_itemsize(&mut self, itemsize: u64) -> Result<()> {
        self.handle.ensure_writable()?;
        if self.length != 0 {
            return Err(SobError::ImmutableItemSize);
        }
        if itemsize == 0 {
            return Err(SobError::Config("itemsize must be non-zero".to_string()));
        }
        self.itemsize = Some(itemsize);
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Number of records
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Whether the records are known to be sorted
    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    /// Read the record at `index`
    pub fn get(&self, index: u64) -> Result<Vec<u8>> {
        self.check_index(index)?;
        if let Some(record) = self.cache.get(index) {
            return Ok(record.to_vec());
        }
        self.read_record(index)
    }

    /// Read the `n`-th record from the end (1 = last)
    pub fn get_from_end(&self, n: u64) -> Result<Vec<u8>> {
        if n == 0 || n > self.length {
            return Err(SobError::IndexOutOfRange {
                index: n,
                length: self.length,
            });
        }
        self.get(self.length - n)
    }

    /// Iterate over every record in position order
    pub fn iter(&self) -> RecordIter<'_> {
        self.iter_range(0, self.length)
    }

    /// Iterate over positions `start..end` (clamped to `length`)
    pub(crate) fn iter_range(&self, start: u64, end: u64) -> RecordIter<'_> {
        let end = end.min(self.length);
        RecordIter {
            store: self,
            next: start.min(end),
            end,
            batch: Vec::new(),
            batch_pos: 0,
        }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Append a record at position `length`
    ///
    /// If the write fails the file is truncated back to its prior size.
    pub fn append(&mut self, record: &[u8]) -> Result<()> {
        self.handle.ensure_writable()?;
        let itemsize = self.require_itemsize()?;
        Self::check_width(itemsize, record)?;

        let offset = self.length * itemsize;
        if let Err(e) = self.handle.write_at(offset, record) {
            tracing::warn!("Append at offset {} failed, rolling back: {}", offset, e);
            if let Err(rollback) = self.handle.set_len(offset) {
                tracing::warn!("Rollback to {} bytes failed: {}", offset, rollback);
            }
            return Err(e);
        }

        self.length += 1;
        self.invalidate();
        Ok(())
    }

    /// Overwrite the record at `index`
    pub fn set(&mut self, index: u64, record: &[u8]) -> Result<()> {
        self.handle.ensure_writable()?;
        self.check_index(index)?;
        let itemsize = self.require_itemsize()?;
        Self::check_width(itemsize, record)?;

        // Even a failed write may have landed partially
        self.invalidate();
        self.handle.write_at(index * itemsize, record)
    }

    /// Remove every record
    pub fn clear(&mut self) -> Result<()> {
        self.handle.ensure_writable()?;
        self.handle.set_len(0)?;
        self.length = 0;
        self.invalidate();
        Ok(())
    }

    /// Sort the records into non-decreasing byte order
    ///
    /// Uses an in-memory sort when the data fits `sort_memory_budget`,
    /// otherwise an external merge sort. Any failure is reported as
    /// `SortFailed` and leaves the store unordered.
    pub fn sort(&mut self) -> Result<()> {
        self.handle.ensure_writable()?;
        self.invalidate();

        let itemsize = match self.itemsize {
            Some(size) => size,
            // No itemsize means no records: trivially sorted
            None => {
                self.ordered = true;
                return Ok(());
            }
        };

        let engine = SortEngine::from_config(&self.config);
        match engine.sort(&mut self.handle, itemsize, self.length) {
            Ok(report) => {
                if let SortStrategy::External { runs } = report.strategy {
                    tracing::info!(
                        "Sorted {} records via {} runs in {} merge passes",
                        self.length,
                        runs,
                        report.merge_passes
                    );
                }
                self.ordered = true;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Sort of {} failed: {}", self.handle.path().display(), e);
                Err(SobError::SortFailed(Box::new(e)))
            }
        }
    }

    // =========================================================================
    // Cache
    // =========================================================================

    /// Warm the read cache; returns the number of cached records.
    ///
    /// Ordered stores cache binary search midpoint positions, unordered stores
    /// cache the leading records.
    pub fn fill_cache(&mut self) -> Result<usize> {
        let limit = self.cache.capacity();
        let positions: Vec<u64> = if self.ordered {
            bisection_order(self.length, limit)
        } else {
            (0..self.length.min(limit as u64)).collect()
        };

        for index in positions {
            let record = self.read_record(index)?;
            self.cache.insert(index, record);
        }

        tracing::trace!("Cache holds {} records", self.cache.len());
        Ok(self.cache.len())
    }

    /// Number of records currently cached
    pub fn cached_records(&self) -> usize {
        self.cache.len()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        self.handle.path()
    }

    /// Mode the store was opened with
    pub fn mode(&self) -> OpenMode {
        self.handle.mode()
    }

    /// The store configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Crate-internal helpers
    // =========================================================================

    /// Mark the store sorted (after an explicit verification scan)
    pub(crate) fn mark_ordered(&mut self) {
        self.ordered = true;
    }

    pub(crate) fn require_itemsize(&self) -> Result<u64> {
        self.itemsize.ok_or(SobError::ItemSizeRequired)
    }

    pub(crate) fn check_width(itemsize: u64, record: &[u8]) -> Result<()> {
        if record.len() as u64 != itemsize {
            return Err(SobError::RecordSizeMismatch {
                expected: itemsize,
                actual: record.len() as u64,
            });
        }
        Ok(())
    }

    fn check_index(&self, index: u64) -> Result<()> {
        if index >= self.length {
            return Err(SobError::IndexOutOfRange {
                index,
                length: self.length,
            });
        }
        Ok(())
    }

    /// Read straight from the file, bypassing the cache
    fn read_record(&self, index: u64) -> Result<Vec<u8>> {
        let itemsize = self.require_itemsize()?;
        let mut record = vec![0u8; itemsize as usize];
        self.handle.read_at(index * itemsize, &mut record)?;
        Ok(record)
    }

    /// Any mutation drops the ordered flag and cached copies
    fn invalidate(&mut self) {
        self.ordered = false;
        self.cache.clear();
    }
}

/// Sequential reader over a range of positions
///
/// Reads records in batches of up to 64 KiB instead of one seek per record.
pub struct RecordIter<'a> {
    store: &'a RecordStore,
    next: u64,
    end: u64,
    batch: Vec<u8>,
    batch_pos: usize,
}

impl RecordIter<'_> {
    fn refill(&mut self, itemsize: u64) -> Result<()> {
        let per_batch = (ITER_BATCH_BYTES / itemsize).max(1);
        let count = per_batch.min(self.end - self.next);
        self.batch.resize((count * itemsize) as usize, 0);
        self.store
            .handle
            .read_at(self.next * itemsize, &mut self.batch)?;
        self.batch_pos = 0;
        Ok(())
    }
}

impl Iterator for RecordIter<'_> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }

        let itemsize = match self.store.require_itemsize() {
            Ok(size) => size,
            Err(e) => return Some(Err(e)),
        };

        if self.batch_pos >= self.batch.len() {
            if let Err(e) = self.refill(itemsize) {
                // Stop after reporting the failure
                self.next = self.end;
                return Some(Err(e));
            }
        }

        let width = itemsize as usize;
        let record = self.batch[self.batch_pos..self.batch_pos + width].to_vec();
        self.batch_pos += width;
        self.next += 1;

        Some(Ok(record))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.end - self.next) as usize;
        (remaining, Some(remaining))
    }
}
