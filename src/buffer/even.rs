use std::io::Write;

use super::{
    check_range,
    ByteBuffer,
    SharedBuffer,
};
use crate::error::Result;

/// Pads an odd-length buffer to even length with one trailing byte.
///
/// DICOM element values must have even length; odd-length payloads are
/// presented through this view instead of being copied and extended. The pad
/// byte is whatever the zero-initialized output holds, i.e. `0x00`.
pub struct EvenLengthBuffer {
    inner: SharedBuffer,
}

impl EvenLengthBuffer {
    /// Wraps `inner` in a padding view if its length is odd; even-length
    /// buffers are returned unchanged.
    pub fn create(inner: SharedBuffer) -> SharedBuffer {
        if inner.len() % 2 == 1 {
            std::sync::Arc::new(Self { inner })
        }
        else {
            inner
        }
    }
}

impl std::fmt::Debug for EvenLengthBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvenLengthBuffer")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl ByteBuffer for EvenLengthBuffer {
    #[inline]
    fn len(&self) -> u64 {
        self.inner.len() + 1
    }

    #[inline]
    fn is_in_memory(&self) -> bool {
        self.inner.is_in_memory()
    }

    fn read_range(&self, offset: u64, dest: &mut [u8]) -> Result<()> {
        check_range(self.len(), offset, dest.len())?;
        dest.fill(0);
        // only the part overlapping the inner buffer is copied; the tail is
        // left zeroed, which is where the pad byte comes from
        let available = self.inner.len().saturating_sub(offset);
        let take = usize::try_from(available).unwrap_or(usize::MAX).min(dest.len());
        if take > 0 {
            self.inner.read_range(offset, &mut dest[..take])?;
        }
        Ok(())
    }

    fn copy_to(&self, writer: &mut dyn Write) -> Result<()> {
        self.inner.copy_to(writer)?;
        writer.write_all(&[0])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{
        tests::assert_round_trip,
        MemoryBuffer,
    };

    #[test]
    fn pads_odd_buffers_with_one_zero_byte() {
        let buffer = EvenLengthBuffer::create(MemoryBuffer::shared(b"abc".to_vec()));
        assert_round_trip(&*buffer, b"abc\x00");
    }

    #[test]
    fn even_buffers_are_returned_unchanged() {
        let inner = MemoryBuffer::shared(b"abcd".to_vec());
        let wrapped = EvenLengthBuffer::create(inner.clone());
        assert!(std::sync::Arc::ptr_eq(&inner, &wrapped));
    }

    #[test]
    fn slice_and_materialize_agree_on_the_pad_byte() {
        let buffer = EvenLengthBuffer::create(MemoryBuffer::shared(b"abcde".to_vec()));
        let all = buffer.bytes().unwrap();
        assert_eq!(all.len(), 6);
        assert_eq!(all[5], 0);
        assert_eq!(buffer.slice(0, 6).unwrap(), all);
        // a slice covering just the pad byte
        assert_eq!(&buffer.slice(5, 1).unwrap()[..], b"\x00");
        // and one straddling the seam
        assert_eq!(&buffer.slice(4, 2).unwrap()[..], b"e\x00");
    }

    #[test]
    fn requests_past_the_padded_end_fail() {
        let buffer = EvenLengthBuffer::create(MemoryBuffer::shared(b"abc".to_vec()));
        assert!(buffer.slice(0, 5).is_err());
        assert!(buffer.slice(4, 1).is_err());
    }
}
