use bytes::Bytes;

use super::{
    check_range,
    ByteBuffer,
    SharedBuffer,
};
use crate::error::{
    Error,
    Result,
};

/// A sub-window of another buffer.
#[derive(Clone)]
pub struct RangeBuffer {
    inner: SharedBuffer,
    offset: u64,
    len: u64,
}

impl RangeBuffer {
    /// Creates a view of `len` bytes of `inner` starting at `offset`.
    ///
    /// Fails if the window extends past the end of `inner`.
    pub fn new(inner: SharedBuffer, offset: u64, len: u64) -> Result<Self> {
        match offset.checked_add(len) {
            Some(end) if end <= inner.len() => {
                Ok(Self {
                    inner,
                    offset,
                    len,
                })
            }
            _ => Err(Error::short_read(len, inner.len().saturating_sub(offset))),
        }
    }

    #[inline]
    pub fn inner(&self) -> &SharedBuffer {
        &self.inner
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl std::fmt::Debug for RangeBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangeBuffer")
            .field("offset", &self.offset)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl ByteBuffer for RangeBuffer {
    #[inline]
    fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    fn is_in_memory(&self) -> bool {
        self.inner.is_in_memory()
    }

    fn read_range(&self, offset: u64, dest: &mut [u8]) -> Result<()> {
        check_range(self.len, offset, dest.len())?;
        self.inner.read_range(self.offset + offset, dest)
    }

    fn slice(&self, offset: u64, count: usize) -> Result<Bytes> {
        check_range(self.len, offset, count)?;
        self.inner.slice(self.offset + offset, count)
    }
}
