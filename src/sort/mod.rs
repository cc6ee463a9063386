//! Sort Module
//!
//! Rewrites a store's records into non-decreasing byte order.
//!
//! ## Strategy
//! ```text
//!   length * cost <= budget              length * cost > budget
//! ┌──────────────────────────┐      ┌──────────────────────────────────┐
//! │ read all → sort order →  │      │ chunk → sort → run file (×k)     │
//! │ write back in place at 0 │      │ merge ≤ fan-in runs per pass     │
//! └──────────────────────────┘      │ last pass → sibling temp file    │
//!                                   │ rename over the store file       │
//!                                   └──────────────────────────────────┘
//! ```
//!
//! `cost` is the record width plus one `usize` of sort order per record:
//! records are sorted as a permutation over the loaded buffer, then
//! written out in that order through a fixed-size batch.
//!
//! Both paths keep the file size unchanged, so `file_size % itemsize == 0`
//! holds throughout. The external path does not touch the original file
//! until the final rename.

mod merge;
mod run;

use std::fs;
use std::io::{BufWriter, Write};
use std::mem;
use std::path::PathBuf;

use tempfile::TempDir;

use crate::config::Config;
use crate::error::{Result, SobError};
use crate::storage::StorageHandle;

pub(crate) use merge::merge_sorted;
pub(crate) use run::{Run, RunReader, RunWriter};

/// Bytes staged per write while emitting sorted records
const WRITE_BATCH_BYTES: usize = 64 * 1024;

/// Which path a sort took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortStrategy {
    /// Zero or one record: nothing to move
    Trivial,

    /// Whole file sorted in memory
    InMemory,

    /// Chunked runs merged from disk
    External { runs: usize },
}

/// What a finished sort did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortReport {
    pub strategy: SortStrategy,

    /// Merge passes over the data, counting the final one (0 unless external)
    pub merge_passes: usize,

    /// Most run files open at once in any single merge
    pub max_open_runs: usize,
}

/// Sorts fixed-width records within a memory budget
#[derive(Debug, Clone)]
pub struct SortEngine {
    /// Max bytes of record data plus sort order held in memory at once
    memory_budget: usize,

    /// Max runs read by one merge (at least 2)
    max_fanin: usize,

    /// Where run files go (None = system temp dir)
    temp_dir: Option<PathBuf>,
}

impl SortEngine {
    /// Create an engine with an explicit budget and the default fan-in
    pub fn new(memory_budget: usize, temp_dir: Option<PathBuf>) -> Self {
        Self {
            memory_budget,
            max_fanin: Config::default().max_merge_fanin,
            temp_dir,
        }
    }

    /// Create an engine from store configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.sort_memory_budget, config.temp_dir.clone())
            .with_max_fanin(config.max_merge_fanin)
    }

    /// Limit how many runs a single merge opens (clamped to at least 2)
    pub fn with_max_fanin(mut self, runs: usize) -> Self {
        self.max_fanin = runs.max(2);
        self
    }

    /// Pick the strategy for `length` records of `itemsize` bytes
    pub fn plan(&self, itemsize: u64, length: u64) -> SortStrategy {
        if length <= 1 {
            return SortStrategy::Trivial;
        }
        let total = record_cost(itemsize).saturating_mul(length);
        if total <= self.memory_budget as u64 {
            SortStrategy::InMemory
        } else {
            let per_chunk = self.chunk_records(itemsize);
            SortStrategy::External {
                runs: length.div_ceil(per_chunk) as usize,
            }
        }
    }

    /// Sort the records behind `handle` and fsync the result
    pub fn sort(&self, handle: &mut StorageHandle, itemsize: u64, length: u64) -> Result<SortReport> {
        let strategy = self.plan(itemsize, length);
        tracing::debug!(
            "Sorting {} records of {} bytes: {:?}",
            length,
            itemsize,
            strategy
        );

        let mut report = SortReport {
            strategy,
            merge_passes: 0,
            max_open_runs: 0,
        };
        match strategy {
            SortStrategy::Trivial => {}
            SortStrategy::InMemory => self.sort_in_memory(handle, itemsize, length)?,
            SortStrategy::External { .. } => {
                self.sort_external(handle, itemsize, length, &mut report)?
            }
        }
        Ok(report)
    }

    // =========================================================================
    // In-memory path
    // =========================================================================

    fn sort_in_memory(&self, handle: &mut StorageHandle, itemsize: u64, length: u64) -> Result<()> {
        let mut data = vec![0u8; (itemsize * length) as usize];
        handle.read_at(0, &mut data)?;

        let order = sorted_order(&data, itemsize as usize);
        let mut offset = 0;
        write_in_order(&data, &order, itemsize as usize, |batch| {
            handle.write_at(offset, batch)?;
            offset += batch.len() as u64;
            Ok(())
        })?;
        handle.flush()
    }

    // =========================================================================
    // External path
    // =========================================================================

    fn sort_external(
        &self,
        handle: &mut StorageHandle,
        itemsize: u64,
        length: u64,
        report: &mut SortReport,
    ) -> Result<()> {
        let run_dir = match &self.temp_dir {
            Some(dir) => tempfile::Builder::new().prefix("sob-runs-").tempdir_in(dir)?,
            None => tempfile::Builder::new().prefix("sob-runs-").tempdir()?,
        };

        // Phase 1: sorted runs
        let mut runs = self.write_runs(handle, &run_dir, itemsize, length)?;
        tracing::debug!("Wrote {} sorted runs to {}", runs.len(), run_dir.path().display());

        // Phase 2: intermediate passes until one merge can take every run
        let mut next_run = runs.len();
        while runs.len() > self.max_fanin {
            let mut merged = Vec::with_capacity(runs.len().div_ceil(self.max_fanin));
            for group in runs.chunks(self.max_fanin) {
                if let [single] = group {
                    merged.push(single.clone());
                    continue;
                }

                let path = run_dir.path().join(format!("run_{:06}.tmp", next_run));
                next_run += 1;
                let mut writer = RunWriter::create(&path, itemsize)?;
                merge_sorted(open_readers(group, itemsize)?, &mut writer)?;
                merged.push(writer.finish()?);
                report.max_open_runs = report.max_open_runs.max(group.len());

                for run in group {
                    fs::remove_file(&run.path)?;
                }
            }
            report.merge_passes += 1;
            tracing::debug!("Merge pass {} left {} runs", report.merge_passes, merged.len());
            runs = merged;
        }

        // Phase 3: final merge into a sibling of the store file
        let mut out = BufWriter::new(handle.sibling_temp_file()?);
        let written = merge_sorted(open_readers(&runs, itemsize)?, &mut out)?;
        out.flush()?;
        let temp = out.into_inner().map_err(|e| SobError::Io(e.into_error()))?;
        report.max_open_runs = report.max_open_runs.max(runs.len());
        report.merge_passes += 1;

        if written != length {
            return Err(SobError::Storage(format!(
                "Merge produced {} records, expected {}",
                written, length
            )));
        }

        // Phase 4: swap in the merged file
        handle.replace_with(temp)?;
        handle.flush()
    }

    /// Split the file into budget-sized chunks, each sorted into its own run
    fn write_runs(
        &self,
        handle: &StorageHandle,
        run_dir: &TempDir,
        itemsize: u64,
        length: u64,
    ) -> Result<Vec<Run>> {
        let per_chunk = self.chunk_records(itemsize);
        let mut runs = Vec::with_capacity(length.div_ceil(per_chunk) as usize);
        let mut chunk = Vec::new();
        let mut start = 0;
        while start < length {
            let count = per_chunk.min(length - start);
            chunk.resize((count * itemsize) as usize, 0);
            handle.read_at(start * itemsize, &mut chunk)?;

            let path = run_dir.path().join(format!("run_{:06}.tmp", runs.len()));
            let mut writer = RunWriter::create(&path, itemsize)?;
            let order = sorted_order(&chunk, itemsize as usize);
            write_in_order(&chunk, &order, itemsize as usize, |batch| {
                writer.write_all(batch)?;
                Ok(())
            })?;
            runs.push(writer.finish()?);

            start += count;
        }
        Ok(runs)
    }

    /// Records per run: as many as fit the budget, at least one
    fn chunk_records(&self, itemsize: u64) -> u64 {
        (self.memory_budget as u64 / record_cost(itemsize)).max(1)
    }
}

/// Bytes of memory one loaded record costs: its data plus its sort slot
fn record_cost(itemsize: u64) -> u64 {
    itemsize.max(1) + mem::size_of::<usize>() as u64
}

fn open_readers(runs: &[Run], itemsize: u64) -> Result<Vec<RunReader>> {
    runs.iter()
        .map(|run| RunReader::open(&run.path, itemsize, run.records))
        .collect()
}

/// Record indices of packed `data` in non-decreasing byte order
fn sorted_order(data: &[u8], itemsize: usize) -> Vec<usize> {
    let record = |i: usize| &data[i * itemsize..(i + 1) * itemsize];
    let mut order: Vec<usize> = (0..data.len() / itemsize).collect();
    order.sort_unstable_by(|&a, &b| record(a).cmp(record(b)));
    order
}

/// Feed the records of `data` to `sink` in `order`, a batch at a time
fn write_in_order<F>(data: &[u8], order: &[usize], itemsize: usize, mut sink: F) -> Result<()>
where
    F: FnMut(&[u8]) -> Result<()>,
{
    let per_batch = (WRITE_BATCH_BYTES / itemsize).max(1);
    let mut batch = Vec::with_capacity(per_batch * itemsize);
    for indices in order.chunks(per_batch) {
        batch.clear();
        for &i in indices {
            batch.extend_from_slice(&data[i * itemsize..(i + 1) * itemsize]);
        }
        sink(&batch)?;
    }
    Ok(())
}
