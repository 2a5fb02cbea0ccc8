use std::io::Write;

use bytes::Bytes;

use super::{
    check_range,
    ByteBuffer,
    SharedBuffer,
};
use crate::error::Result;

/// An ordered sequence of child buffers presented as one span.
///
/// Slicing walks the children in order and materializes only those that
/// overlap the requested range, so a composite assembled from lazy file
/// regions stays lazy until the exact bytes are needed.
#[derive(Clone, Default)]
pub struct CompositeBuffer {
    children: Vec<SharedBuffer>,
    len: u64,
}

impl CompositeBuffer {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_children(children: impl IntoIterator<Item = SharedBuffer>) -> Self {
        let mut composite = Self::new();
        for child in children {
            composite.push(child);
        }
        composite
    }

    /// Appends a child. Empty children are dropped.
    pub fn push(&mut self, child: SharedBuffer) {
        if !child.is_empty() {
            self.len += child.len();
            self.children.push(child);
        }
    }

    #[inline]
    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    pub fn children(&self) -> impl Iterator<Item = &SharedBuffer> {
        self.children.iter()
    }
}

impl std::fmt::Debug for CompositeBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeBuffer")
            .field("children", &self.children.len())
            .field("len", &self.len)
            .finish()
    }
}

impl ByteBuffer for CompositeBuffer {
    #[inline]
    fn len(&self) -> u64 {
        self.len
    }

    fn is_in_memory(&self) -> bool {
        self.children.iter().all(|child| child.is_in_memory())
    }

    fn read_range(&self, offset: u64, dest: &mut [u8]) -> Result<()> {
        check_range(self.len, offset, dest.len())?;
        if dest.is_empty() {
            return Ok(());
        }

        let mut skip = offset;
        let mut filled = 0;
        for child in &self.children {
            if skip >= child.len() {
                skip -= child.len();
                continue;
            }
            let available = child.len() - skip;
            let take = usize::try_from(available)
                .unwrap_or(usize::MAX)
                .min(dest.len() - filled);
            child.read_range(skip, &mut dest[filled..filled + take])?;
            filled += take;
            skip = 0;
            if filled == dest.len() {
                break;
            }
        }
        Ok(())
    }

    fn slice(&self, offset: u64, count: usize) -> Result<Bytes> {
        check_range(self.len, offset, count)?;
        if count == 0 {
            return Ok(Bytes::new());
        }
        // a range entirely inside one child can share that child's storage
        let mut skip = offset;
        for child in &self.children {
            if skip >= child.len() {
                skip -= child.len();
                continue;
            }
            if count as u64 <= child.len() - skip {
                return child.slice(skip, count);
            }
            break;
        }
        let mut dest = vec![0u8; count];
        self.read_range(offset, &mut dest)?;
        Ok(dest.into())
    }

    fn copy_to(&self, writer: &mut dyn Write) -> Result<()> {
        for child in &self.children {
            child.copy_to(writer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{
        tests::assert_round_trip,
        EmptyBuffer,
        MemoryBuffer,
    };

    fn composite(parts: &[&[u8]]) -> CompositeBuffer {
        CompositeBuffer::from_children(parts.iter().map(|part| MemoryBuffer::shared(part.to_vec())))
    }

    #[test]
    fn round_trip() {
        let buffer = composite(&[b"Hello", b" ", b"World", b"!"]);
        assert_round_trip(&buffer, b"Hello World!");
        assert!(buffer.is_in_memory());
    }

    #[test]
    fn empty_children_are_dropped() {
        let mut buffer = CompositeBuffer::new();
        buffer.push(MemoryBuffer::shared(b"ab".to_vec()));
        buffer.push(EmptyBuffer::shared());
        buffer.push(MemoryBuffer::shared(b"cd".to_vec()));
        assert_eq!(buffer.num_children(), 2);
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn slices_across_child_boundaries() {
        // children of sizes 5, 0 and 7; the slice spans the seam
        let buffer = composite(&[b"01234", b"", b"56789ab"]);
        assert_eq!(buffer.len(), 12);
        assert_eq!(&buffer.slice(3, 6).unwrap()[..], b"345678");
    }

    #[test]
    fn slice_within_one_child_shares_storage() {
        let inner = Bytes::from_static(b"0123456789");
        let mut buffer = CompositeBuffer::new();
        buffer.push(MemoryBuffer::shared(Bytes::from_static(b"ab")));
        buffer.push(std::sync::Arc::new(MemoryBuffer::new(inner.clone())));
        let slice = buffer.slice(4, 3).unwrap();
        assert_eq!(&slice[..], b"234");
        assert_eq!(slice.as_ptr(), inner[2..].as_ptr());
    }

    #[test]
    fn zero_length_request_touches_no_child() {
        struct Untouchable;
        impl ByteBuffer for Untouchable {
            fn len(&self) -> u64 {
                4
            }
            fn is_in_memory(&self) -> bool {
                false
            }
            fn read_range(&self, _offset: u64, _dest: &mut [u8]) -> Result<()> {
                panic!("child materialized for a zero-length request");
            }
        }

        let mut buffer = CompositeBuffer::new();
        buffer.push(std::sync::Arc::new(Untouchable));
        assert!(buffer.slice(2, 0).unwrap().is_empty());
    }

    #[test]
    fn only_overlapping_children_are_materialized() {
        struct Untouchable;
        impl ByteBuffer for Untouchable {
            fn len(&self) -> u64 {
                4
            }
            fn is_in_memory(&self) -> bool {
                false
            }
            fn read_range(&self, _offset: u64, _dest: &mut [u8]) -> Result<()> {
                panic!("child outside the requested range was materialized");
            }
        }

        let mut buffer = CompositeBuffer::new();
        buffer.push(MemoryBuffer::shared(b"0123".to_vec()));
        buffer.push(std::sync::Arc::new(Untouchable));
        assert_eq!(&buffer.slice(1, 3).unwrap()[..], b"123");
    }

    #[test]
    fn oversized_request_fails() {
        let buffer = composite(&[b"abc", b"def"]);
        assert!(buffer.slice(0, 7).is_err());
        assert!(buffer.slice(5, 2).is_err());
    }
}
