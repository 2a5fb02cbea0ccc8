use bytes::{
    Bytes,
    BytesMut,
};

use super::{
    ByteBuffer,
    SharedBuffer,
};
use crate::{
    endian::{
        swap_bytes,
        Endian,
    },
    error::Result,
};

/// A view that byte-swaps its content in units of `unit` bytes on every read.
///
/// Built through [`SwapBuffer::create`], which returns the inner buffer
/// untouched when no swap is needed. That fast path is what keeps wrapping
/// free for data that is already in machine order, so it must not be
/// bypassed by constructing the struct directly.
pub struct SwapBuffer {
    inner: SharedBuffer,
    unit: usize,
}

impl SwapBuffer {
    /// Wraps `inner` so reads come back swapped in units of `unit` bytes.
    ///
    /// When `endian` already matches the local machine, or `unit == 1`,
    /// there is nothing to swap and `inner` is returned as-is, same
    /// allocation and all.
    pub fn create(inner: SharedBuffer, unit: usize, endian: Endian) -> SharedBuffer {
        if unit <= 1 || !endian.is_foreign() {
            inner
        }
        else {
            std::sync::Arc::new(Self { inner, unit })
        }
    }
}

impl std::fmt::Debug for SwapBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwapBuffer")
            .field("unit", &self.unit)
            .finish_non_exhaustive()
    }
}

impl ByteBuffer for SwapBuffer {
    #[inline]
    fn len(&self) -> u64 {
        self.inner.len()
    }

    #[inline]
    fn is_in_memory(&self) -> bool {
        self.inner.is_in_memory()
    }

    fn read_range(&self, offset: u64, dest: &mut [u8]) -> Result<()> {
        self.inner.read_range(offset, dest)?;
        swap_bytes(self.unit, dest);
        Ok(())
    }

    fn slice(&self, offset: u64, count: usize) -> Result<Bytes> {
        let mut data = BytesMut::from(&self.inner.slice(offset, count)?[..]);
        swap_bytes(self.unit, &mut data);
        Ok(data.freeze())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::buffer::MemoryBuffer;

    fn foreign() -> Endian {
        match Endian::LOCAL_MACHINE {
            Endian::Little => Endian::Big,
            Endian::Big => Endian::Little,
        }
    }

    #[test]
    fn swaps_units_on_read() {
        let inner = MemoryBuffer::shared(b"\x12\x34\x56\x78".to_vec());
        let swapped = SwapBuffer::create(inner, 2, foreign());
        assert_eq!(&swapped.bytes().unwrap()[..], b"\x34\x12\x78\x56");
        assert_eq!(&swapped.slice(2, 2).unwrap()[..], b"\x78\x56");
    }

    #[test]
    fn double_wrap_restores_native_order() {
        let inner = MemoryBuffer::shared(b"\x12\x34\x56\x78".to_vec());
        let once = SwapBuffer::create(inner.clone(), 4, foreign());
        let twice = SwapBuffer::create(once, 4, foreign());
        assert_eq!(twice.bytes().unwrap(), inner.bytes().unwrap());
    }

    #[test]
    fn matching_endianness_returns_the_same_buffer() {
        let inner = MemoryBuffer::shared(b"\x12\x34".to_vec());
        let wrapped = SwapBuffer::create(inner.clone(), 2, Endian::LOCAL_MACHINE);
        assert!(Arc::ptr_eq(&inner, &wrapped));
    }

    #[test]
    fn unit_1_returns_the_same_buffer() {
        let inner = MemoryBuffer::shared(b"\x12\x34".to_vec());
        let wrapped = SwapBuffer::create(inner.clone(), 1, foreign());
        assert!(Arc::ptr_eq(&inner, &wrapped));
    }
}
