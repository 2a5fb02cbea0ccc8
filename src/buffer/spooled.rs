use std::{
    fs::File,
    io::{
        Read,
        Seek,
        SeekFrom,
        Write,
    },
    path::PathBuf,
};

use parking_lot::Mutex;
use tempfile::{
    NamedTempFile,
    TempPath,
};

use super::{
    check_range,
    ByteBuffer,
};
use crate::{
    error::Result,
    sweeper::TempFileSweeper,
};

/// A buffer spooled to a named temporary file.
///
/// Construction writes the payload to disk immediately; reads open the file
/// on demand. The temp file is deleted exactly once, on [`close`](Self::close)
/// or on drop, whichever comes first. If deletion fails (another process
/// still holds the file open) and a [`TempFileSweeper`] was attached, the
/// path is handed to it for bounded retries instead of surfacing an error.
pub struct SpooledBuffer {
    path: PathBuf,
    len: u64,
    temp: Mutex<Option<TempPath>>,
    sweeper: Option<TempFileSweeper>,
}

impl SpooledBuffer {
    /// Spools `payload` to a fresh temp file.
    pub fn new(payload: &[u8]) -> Result<Self> {
        Self::create(payload, None)
    }

    /// Spools `payload`, handing failed deletions to `sweeper`.
    pub fn with_sweeper(payload: &[u8], sweeper: TempFileSweeper) -> Result<Self> {
        Self::create(payload, Some(sweeper))
    }

    fn create(payload: &[u8], sweeper: Option<TempFileSweeper>) -> Result<Self> {
        let mut file = NamedTempFile::new()?;
        file.write_all(payload)?;
        file.flush()?;
        let temp = file.into_temp_path();
        Ok(Self {
            path: temp.to_path_buf(),
            len: payload.len() as u64,
            temp: Mutex::new(Some(temp)),
            sweeper,
        })
    }

    /// Path of the backing temp file, valid until the buffer is closed.
    #[inline]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Deletes the backing file. Subsequent reads fail.
    ///
    /// Idempotent; later calls and the drop path do nothing.
    pub fn close(&self) {
        let Some(temp) = self.temp.lock().take() else {
            return;
        };
        if let Err(error) = temp.close() {
            match &self.sweeper {
                Some(sweeper) => sweeper.enqueue(self.path.clone()),
                None => {
                    tracing::warn!(path = %self.path.display(), %error, "failed to delete spooled temp file");
                }
            }
        }
    }
}

impl Drop for SpooledBuffer {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for SpooledBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpooledBuffer")
            .field("path", &self.path)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl ByteBuffer for SpooledBuffer {
    #[inline]
    fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    fn is_in_memory(&self) -> bool {
        false
    }

    fn read_range(&self, offset: u64, dest: &mut [u8]) -> Result<()> {
        check_range(self.len, offset, dest.len())?;
        if dest.is_empty() {
            return Ok(());
        }
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(dest)?;
        Ok(())
    }
}
