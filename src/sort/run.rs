//! Sort Runs
//!
//! A run is one sorted chunk of records written to its own temp file
//! during external sort. Runs have the same raw layout as a store file.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, SobError};

/// A finished run on disk
#[derive(Debug, Clone)]
pub struct Run {
    /// Run file path
    pub path: PathBuf,
    /// Number of records in the run
    pub records: u64,
}

/// Writes one sorted run. Callers write records in order through `Write`.
pub struct RunWriter {
    /// Output file path
    path: PathBuf,
    /// Buffered writer for performance
    writer: BufWriter<File>,
    /// Record width
    itemsize: u64,
    /// Bytes written so far
    bytes: u64,
}

impl RunWriter {
    /// Create (or truncate) a run file
    pub fn create(path: &Path, itemsize: u64) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            itemsize,
            bytes: 0,
        })
    }

    /// Flush the run and return its metadata.
    ///
    /// Fails if a partial record was written.
    pub fn finish(mut self) -> Result<Run> {
        if self.bytes % self.itemsize != 0 {
            return Err(SobError::Storage(format!(
                "Run of {} bytes is not a multiple of itemsize {}",
                self.bytes, self.itemsize
            )));
        }
        self.writer.flush()?;
        Ok(Run {
            path: self.path,
            records: self.bytes / self.itemsize,
        })
    }
}

impl Write for RunWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.writer.write(buf)?;
        self.bytes += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Streams records back out of a run in order
pub struct RunReader {
    reader: BufReader<File>,
    itemsize: usize,
    remaining: u64,
}

impl RunReader {
    /// Open a run holding `records` records of `itemsize` bytes
    pub fn open(path: &Path, itemsize: u64, records: u64) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            itemsize: itemsize as usize,
            remaining: records,
        })
    }
}

impl Iterator for RunReader {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let mut record = vec![0u8; self.itemsize];
        if let Err(e) = self.reader.read_exact(&mut record) {
            self.remaining = 0;
            return Some(Err(SobError::Io(e)));
        }
        self.remaining -= 1;

        Some(Ok(record))
    }
}
