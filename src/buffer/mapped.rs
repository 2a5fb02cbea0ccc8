use std::io::Write;

use memmap2::Mmap;

use super::{
    check_range,
    ByteBuffer,
};
use crate::error::Result;

/// A buffer spooled to an anonymous temporary file and memory-mapped.
///
/// Construction writes the payload out and maps it immediately; afterwards
/// the pages are backed by the OS, not the heap, so the payload does not
/// count against allocator pressure. Dropping the buffer unmaps the region
/// and closes the anonymous file, which deletes it; there is no separate
/// cleanup step.
#[derive(Debug)]
pub struct MappedBuffer {
    map: Mmap,
    // keeps the anonymous backing file open for the lifetime of the mapping
    _file: std::fs::File,
}

impl MappedBuffer {
    /// Spools `payload` to an anonymous temp file and maps it.
    pub fn new(payload: &[u8]) -> Result<Self> {
        let mut file = tempfile::tempfile()?;
        file.write_all(payload)?;
        file.flush()?;
        // the file is fully written and never modified again
        let map = unsafe { Mmap::map(&file)? };
        Ok(Self { map, _file: file })
    }
}

impl ByteBuffer for MappedBuffer {
    #[inline]
    fn len(&self) -> u64 {
        self.map.len() as u64
    }

    #[inline]
    fn is_in_memory(&self) -> bool {
        false
    }

    fn read_range(&self, offset: u64, dest: &mut [u8]) -> Result<()> {
        check_range(self.len(), offset, dest.len())?;
        let start = offset as usize;
        dest.copy_from_slice(&self.map[start..start + dest.len()]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::tests::assert_round_trip;

    #[test]
    fn round_trip() {
        let buffer = MappedBuffer::new(b"mapped payload").unwrap();
        assert!(!buffer.is_in_memory());
        assert_round_trip(&buffer, b"mapped payload");
    }

    #[test]
    fn slices_without_materializing() {
        let buffer = MappedBuffer::new(&vec![7u8; 1 << 16]).unwrap();
        let slice = buffer.slice((1 << 16) - 4, 4).unwrap();
        assert_eq!(&slice[..], &[7, 7, 7, 7]);
        assert!(buffer.slice(1 << 16, 1).is_err());
    }

    #[test]
    fn empty_payload() {
        let buffer = MappedBuffer::new(b"x").unwrap();
        assert!(buffer.slice(1, 0).unwrap().is_empty());
    }
}
