//! Storage Handle
//!
//! Byte-range access to the backing file. Reads take `&self`; every
//! mutating primitive takes `&mut self` and checks the open mode first.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tempfile::NamedTempFile;

use crate::config::OpenMode;
use crate::error::{Result, SobError};

/// Owns the file behind a record store
pub struct StorageHandle {
    /// Path of the backing file
    path: PathBuf,

    /// Mode the file was opened with
    mode: OpenMode,

    /// File handle. The mutex lets reads seek through `&self`.
    file: Mutex<File>,

    /// Set once `close()` has flushed, so `Drop` does not flush again
    released: bool,

    /// Bytes `write_at` may still write before failing (fault injection)
    #[cfg(test)]
    write_limit: Option<u64>,
}

impl StorageHandle {
    /// Open the backing file in the given mode
    pub fn open(path: &Path, mode: OpenMode) -> Result<Self> {
        let file = Self::open_file(path, mode)?;

        Ok(Self {
            path: path.to_path_buf(),
            mode,
            file: Mutex::new(file),
            released: false,
            #[cfg(test)]
            write_limit: None,
        })
    }

    fn open_file(path: &Path, mode: OpenMode) -> Result<File> {
        let file = match mode {
            OpenMode::ReadOnly => OpenOptions::new().read(true).open(path)?,
            OpenMode::AppendOrCreate => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(path)?,
            OpenMode::CreateTruncate => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?,
        };
        Ok(file)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current file size in bytes
    pub fn len(&self) -> Result<u64> {
        Ok(self.file.lock().metadata()?.len())
    }

    /// Fill `buf` from `offset`. Short files are an error.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
        Ok(())
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Write all of `data` at `offset`
    pub fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        self.ensure_writable()?;

        #[cfg(test)]
        if let Some(limit) = self.write_limit {
            return self.write_limited(offset, data, limit);
        }

        let file = self.file.get_mut();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        Ok(())
    }

    /// Let only `bytes` more bytes through `write_at`, then fail mid-write
    #[cfg(test)]
    pub(crate) fn limit_writes(&mut self, bytes: Option<u64>) {
        self.write_limit = bytes;
    }

    #[cfg(test)]
    fn write_limited(&mut self, offset: u64, data: &[u8], limit: u64) -> Result<()> {
        let allowed = (limit as usize).min(data.len());
        self.write_limit = Some(limit - allowed as u64);

        let file = self.file.get_mut();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&data[..allowed])?;
        if allowed < data.len() {
            return Err(SobError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "write limit reached",
            )));
        }
        Ok(())
    }

    /// Truncate or extend the file to exactly `len` bytes
    pub fn set_len(&mut self, len: u64) -> Result<()> {
        self.ensure_writable()?;
        self.file.get_mut().set_len(len)?;
        Ok(())
    }

    /// fsync file data and metadata. No-op for read-only handles.
    pub fn flush(&mut self) -> Result<()> {
        if !self.mode.is_writable() {
            return Ok(());
        }
        let file = self.file.get_mut();
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }

    /// Create an empty temp file next to the backing file.
    ///
    /// Same directory means same filesystem, so `replace_with` is a rename.
    pub fn sibling_temp_file(&self) -> Result<NamedTempFile> {
        self.ensure_writable()?;
        let temp = tempfile::Builder::new()
            .prefix(".sob-rewrite-")
            .tempfile_in(self.parent_dir())?;
        Ok(temp)
    }

    /// Atomically replace the backing file with `temp`.
    ///
    /// Until the rename lands the original file is untouched. The temp file
    /// takes over the original's permissions, and its open read/write handle
    /// becomes the store's handle, so no reopen is needed after the rename.
    pub fn replace_with(&mut self, temp: NamedTempFile) -> Result<()> {
        self.ensure_writable()?;
        let permissions = fs::metadata(&self.path)?.permissions();
        fs::set_permissions(temp.path(), permissions)?;
        temp.as_file().sync_all()?;

        let file = temp.persist(&self.path).map_err(|e| SobError::Io(e.error))?;
        *self.file.get_mut() = file;

        tracing::trace!("Replaced {} with rewritten file", self.path.display());
        Ok(())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Flush and release the file
    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        self.released = true;
        tracing::debug!("Closed {}", self.path.display());
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mode the file was opened with
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Fail with `ReadOnlyViolation` unless the handle is writable
    pub fn ensure_writable(&self) -> Result<()> {
        if self.mode.is_writable() {
            Ok(())
        } else {
            Err(SobError::ReadOnlyViolation)
        }
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

impl Drop for StorageHandle {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.flush() {
            tracing::warn!("Failed to flush {} on drop: {}", self.path.display(), e);
        }
    }
}
