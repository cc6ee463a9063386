//! # sobstore
//!
//! Sequence Of Bytes On Disk: a file treated as a flat array of
//! fixed-width records, with:
//! - Append, positional read and overwrite
//! - Linear search, or binary search once sorted
//! - In-place sort, in memory or bounded-memory external merge
//! - Scoped open/close with guaranteed flush
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        RecordStore                           │
//! │         itemsize · length · ordered flag · cache             │
//! └──────┬──────────────────────┬───────────────────────┬───────┘
//!        │                      │                       │
//!        ▼                      ▼                       ▼
//!  ┌───────────┐         ┌─────────────┐         ┌─────────────┐
//!  │  Search   │         │ SortEngine  │         │ RecordCache │
//!  │scan/bisect│         │mem/external │         │ (midpoints) │
//!  └─────┬─────┘         └──────┬──────┘         └─────────────┘
//!        │                      │
//!        ▼                      ▼
//!  ┌─────────────────────────────────────────────────────────────┐
//!  │                     StorageHandle                            │
//!  │            read_at · write_at · set_len · fsync              │
//!  └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use sobstore::{Config, OpenMode, RecordStore};
//!
//! let config = Config::builder().itemsize(4).build();
//! RecordStore::with_open("records.sob", OpenMode::CreateTruncate, config, |store| {
//!     store.append(b"efgh")?;
//!     store.append(b"abcd")?;
//!     store.sort()?;
//!     assert_eq!(store.index(b"efgh")?, 1);
//!     Ok(())
//! })?;
//! # Ok::<(), sobstore::SobError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod storage;
pub mod sort;
pub mod store;

mod cache;
mod search;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, SobError};
pub use config::{Config, OpenMode};
pub use sort::{SortEngine, SortReport, SortStrategy};
pub use store::{RecordIter, RecordStore};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of sobstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
