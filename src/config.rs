//! Configuration for sobstore
//!
//! Centralized configuration with sensible defaults.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::SobError;

/// Configuration for a record store handle
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Record Layout
    // -------------------------------------------------------------------------
    /// Bytes per record. Required before the first append, and required to
    /// open a non-empty file (the file carries no header to infer it from).
    pub itemsize: Option<u64>,

    // -------------------------------------------------------------------------
    // Sort Configuration
    // -------------------------------------------------------------------------
    /// Max bytes of record data held in memory during sort (in bytes).
    /// Files larger than this are sorted with the external merge path.
    pub sort_memory_budget: usize,

    /// Most run files merged at once by the external sort. More runs than
    /// this are merged in intermediate passes. Values below 2 act as 2.
    pub max_merge_fanin: usize,

    /// Directory for external sort runs (None = system temp dir)
    pub temp_dir: Option<PathBuf>,

    // -------------------------------------------------------------------------
    // Cache Configuration
    // -------------------------------------------------------------------------
    /// Max records kept by `fill_cache` (0 disables the cache)
    pub cache_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            itemsize: None,
            sort_memory_budget: 64 * 1024 * 1024, // 64 MB
            max_merge_fanin: 64,
            temp_dir: None,
            cache_size: 1024,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the record width (in bytes)
    pub fn itemsize(mut self, size: u64) -> Self {
        self.config.itemsize = Some(size);
        self
    }

    /// Set the sort memory budget (in bytes)
    pub fn sort_memory_budget(mut self, bytes: usize) -> Self {
        self.config.sort_memory_budget = bytes;
        self
    }

    /// Set how many runs one merge pass may open at once
    pub fn max_merge_fanin(mut self, runs: usize) -> Self {
        self.config.max_merge_fanin = runs;
        self
    }

    /// Set the directory used for external sort runs
    pub fn temp_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = Some(path.into());
        self
    }

    /// Set the read cache capacity (in records)
    pub fn cache_size(mut self, records: usize) -> Self {
        self.config.cache_size = records;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

/// How the backing file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// File must exist; every mutation fails with `ReadOnlyViolation`
    ReadOnly,

    /// Create if absent, keep existing records
    AppendOrCreate,

    /// Create, discarding any existing records
    CreateTruncate,
}

impl OpenMode {
    /// Whether mutations are allowed in this mode
    pub fn is_writable(self) -> bool {
        !matches!(self, OpenMode::ReadOnly)
    }
}

impl FromStr for OpenMode {
    type Err = SobError;

    /// Parse the single-letter selectors: "r", "a", "w"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "r" => Ok(OpenMode::ReadOnly),
            "a" => Ok(OpenMode::AppendOrCreate),
            "w" => Ok(OpenMode::CreateTruncate),
            other => Err(SobError::Config(format!("Unknown open mode '{}'", other))),
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OpenMode::ReadOnly => "r",
            OpenMode::AppendOrCreate => "a",
            OpenMode::CreateTruncate => "w",
        };
        f.write_str(s)
    }
}
