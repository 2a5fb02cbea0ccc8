//! Byte buffers: finite spans of bytes, lazily or eagerly backed.
//!
//! A [`ByteBuffer`] describes *where bytes can be obtained from*, not bytes
//! that have necessarily been read. Resident variants ([`MemoryBuffer`],
//! [`EmptyBuffer`]) already hold their content; deferred variants
//! ([`FileRegionBuffer`], [`StreamRegionBuffer`], [`MappedBuffer`],
//! [`SpooledBuffer`]) perform I/O when asked. Views ([`CompositeBuffer`],
//! [`RangeBuffer`], [`SwapBuffer`], [`EvenLengthBuffer`]) compose other
//! buffers without copying. This is what keeps a half-gigabyte pixel-data
//! element from being pulled into memory just because a dataset was opened.
//!
//! Buffers are not internally synchronized against concurrent use of a single
//! instance; callers serialize access to any one non-memory buffer. The
//! exception is [`FileRegionBuffer`], which opens its file per call and can
//! be sliced from multiple threads.

mod composite;
mod even;
mod file;
mod mapped;
mod memory;
mod range;
mod remote;
mod spooled;
mod stream;
mod swap;

use std::{
    io::Write,
    sync::Arc,
};

use bytes::Bytes;

pub use self::{
    composite::CompositeBuffer,
    even::EvenLengthBuffer,
    file::FileRegionBuffer,
    mapped::MappedBuffer,
    memory::{
        EmptyBuffer,
        MemoryBuffer,
    },
    range::RangeBuffer,
    remote::BulkDataBuffer,
    spooled::SpooledBuffer,
    stream::StreamRegionBuffer,
    swap::SwapBuffer,
};
use crate::error::{
    Error,
    Result,
};

/// A finite span of bytes.
///
/// The one invariant every implementation upholds:
/// `slice(0, len())` and `bytes()` return identical content, and repeated
/// calls return identical content (deferred variants re-read their backing
/// store, so the backing store must not change underneath them).
pub trait ByteBuffer: Send + Sync {
    /// Exact length of the span in bytes.
    fn len(&self) -> u64;

    /// Whether the content is already resident in memory, making
    /// [`bytes`](Self::bytes) cheap and free of I/O.
    fn is_in_memory(&self) -> bool;

    /// Read the sub-range starting at `offset` into `dest`, filling it
    /// completely.
    ///
    /// A request extending past the end of the span is a caller error and
    /// fails with [`Error::ShortRead`]; it is never truncated.
    fn read_range(&self, offset: u64, dest: &mut [u8]) -> Result<()>;

    /// Whether the span is empty.
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Materialize the full content. May perform I/O.
    fn bytes(&self) -> Result<Bytes> {
        self.slice(0, usize::try_from(self.len()).expect("buffer too large to materialize"))
    }

    /// Materialize an arbitrary sub-range without materializing the rest.
    fn slice(&self, offset: u64, count: usize) -> Result<Bytes> {
        if count == 0 {
            return Ok(Bytes::new());
        }
        let mut dest = vec![0u8; count];
        self.read_range(offset, &mut dest)?;
        Ok(dest.into())
    }

    /// Copy the full content into `writer`.
    ///
    /// Composite buffers override this to stream child by child, so writing
    /// a large assembled payload never materializes it whole.
    fn copy_to(&self, writer: &mut dyn Write) -> Result<()> {
        writer.write_all(&self.bytes()?)?;
        Ok(())
    }
}

/// A shared, cheaply clonable handle to a buffer.
pub type SharedBuffer = Arc<dyn ByteBuffer>;

/// Checks that `offset + count` lies within a span of length `len`.
pub(crate) fn check_range(len: u64, offset: u64, count: usize) -> Result<()> {
    let end = offset.checked_add(count as u64);
    match end {
        Some(end) if end <= len => Ok(()),
        _ => Err(Error::short_read(count as u64, len.saturating_sub(offset.min(len)))),
    }
}
