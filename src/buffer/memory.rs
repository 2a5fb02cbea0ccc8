use std::sync::Arc;

use bytes::Bytes;

use super::{
    check_range,
    ByteBuffer,
    SharedBuffer,
};
use crate::error::Result;

/// A resident buffer owning a private copy of its content.
#[derive(Clone, Debug, Default)]
pub struct MemoryBuffer {
    data: Bytes,
}

impl MemoryBuffer {
    /// Takes ownership of `data` without copying.
    #[inline]
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Copies `data` into a private buffer.
    #[inline]
    pub fn copy_from(data: &[u8]) -> Self {
        Self {
            data: Bytes::copy_from_slice(data),
        }
    }

    #[inline]
    pub fn shared(data: impl Into<Bytes>) -> SharedBuffer {
        Arc::new(Self::new(data))
    }
}

impl ByteBuffer for MemoryBuffer {
    #[inline]
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    #[inline]
    fn is_in_memory(&self) -> bool {
        true
    }

    fn read_range(&self, offset: u64, dest: &mut [u8]) -> Result<()> {
        check_range(self.len(), offset, dest.len())?;
        let start = offset as usize;
        dest.copy_from_slice(&self.data[start..start + dest.len()]);
        Ok(())
    }

    #[inline]
    fn bytes(&self) -> Result<Bytes> {
        Ok(self.data.clone())
    }

    fn slice(&self, offset: u64, count: usize) -> Result<Bytes> {
        check_range(self.len(), offset, count)?;
        let start = offset as usize;
        Ok(self.data.slice(start..start + count))
    }
}

/// The empty buffer, size 0.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyBuffer;

impl EmptyBuffer {
    #[inline]
    pub fn shared() -> SharedBuffer {
        Arc::new(EmptyBuffer)
    }
}

impl ByteBuffer for EmptyBuffer {
    #[inline]
    fn len(&self) -> u64 {
        0
    }

    #[inline]
    fn is_in_memory(&self) -> bool {
        true
    }

    fn read_range(&self, offset: u64, dest: &mut [u8]) -> Result<()> {
        check_range(0, offset, dest.len())
    }

    #[inline]
    fn bytes(&self) -> Result<Bytes> {
        Ok(Bytes::new())
    }
}
