use std::{
    fs::File,
    io::{
        Read,
        Seek,
        SeekFrom,
    },
    path::PathBuf,
};

use super::{
    check_range,
    ByteBuffer,
};
use crate::error::Result;

/// A deferred buffer backed by a region of a named file.
///
/// The file is opened anew for every read, so independent slices can run
/// concurrently from multiple threads.
#[derive(Clone, Debug)]
pub struct FileRegionBuffer {
    path: PathBuf,
    offset: u64,
    len: u64,
}

impl FileRegionBuffer {
    pub fn new(path: impl Into<PathBuf>, offset: u64, len: u64) -> Self {
        Self {
            path: path.into(),
            offset,
            len,
        }
    }

    #[inline]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl ByteBuffer for FileRegionBuffer {
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
        file.seek(SeekFrom::Start(self.offset + offset))?;
        file.read_exact(dest)?;
        Ok(())
    }
}
