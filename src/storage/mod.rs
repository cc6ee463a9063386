//! Storage Module
//!
//! Owns the backing file and exposes byte-range primitives to the store.
//!
//! ## Responsibilities
//! - Open the file according to `OpenMode`
//! - Positioned reads/writes, truncation, fsync
//! - Reject every mutation on read-only handles
//! - Atomically swap in a rewritten file (external sort output)
//!
//! ## File Format
//! ```text
//! ┌──────────────┬──────────────┬─────┬──────────────┐
//! │ Record 0     │ Record 1     │ ... │ Record N-1   │
//! │ (itemsize)   │ (itemsize)   │     │ (itemsize)   │
//! └──────────────┴──────────────┴─────┴──────────────┘
//!   offset = index * itemsize
//!   file_size = length * itemsize   (no header, no padding)
//! ```

mod handle;

pub use handle::StorageHandle;
