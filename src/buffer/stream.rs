use std::{
    io::{
        Read,
        Seek,
        SeekFrom,
    },
    sync::Arc,
};

use parking_lot::Mutex;

use super::{
    check_range,
    ByteBuffer,
};
use crate::error::Result;

/// A deferred buffer backed by a region of a shared seekable stream.
///
/// The stream's position is shared mutable state. Every read locks the
/// stream and seeks to its own region, so interleaving with the
/// [`StreamSource`](crate::source::StreamSource) that handed this buffer out
/// is safe, but two slices cannot make progress at the same time.
pub struct StreamRegionBuffer<S> {
    stream: Arc<Mutex<S>>,
    offset: u64,
    len: u64,
}

impl<S> StreamRegionBuffer<S> {
    pub fn new(stream: Arc<Mutex<S>>, offset: u64, len: u64) -> Self {
        Self {
            stream,
            offset,
            len,
        }
    }
}

impl<S> std::fmt::Debug for StreamRegionBuffer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamRegionBuffer")
            .field("offset", &self.offset)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl<S: Read + Seek + Send> ByteBuffer for StreamRegionBuffer<S> {
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
        let mut stream = self.stream.lock();
        stream.seek(SeekFrom::Start(self.offset + offset))?;
        stream.read_exact(dest)?;
        Ok(())
    }
}
