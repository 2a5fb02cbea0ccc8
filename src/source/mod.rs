//! Byte sources: sequential endian-aware cursors over a logical byte stream.
//!
//! A [`ByteSource`] is what a dataset parser reads from. It decodes primitives
//! through a runtime [`Endian`], tracks a single rewindable [`mark`] and a
//! stack of [milestones](ByteSource::push_milestone) bounding nested
//! variable-length structures, and hands out [`SharedBuffer`]s for large
//! payloads instead of copying them ([`read_buffer`](ByteSource::read_buffer)).
//!
//! Four implementations:
//!
//! - [`FileSource`]: a named file; large payloads become
//!   [`FileRegionBuffer`](crate::buffer::FileRegionBuffer)s.
//! - [`StreamSource`]: any `Read + Seek` stream; large payloads become
//!   [`StreamRegionBuffer`](crate::buffer::StreamRegionBuffer)s sharing the
//!   stream.
//! - [`BufferSource`]: an ordered, optionally growable list of buffers, fed
//!   by a producer thread while a consumer parses. This is the network
//!   receive path.
//! - [`UnseekableSource`]: mark/rewind emulation over a forward-only stream.
//!
//! [`mark`]: ByteSource::mark

mod buffers;
mod file;
mod stream;
mod unseekable;

use std::sync::Arc;

pub use self::{
    buffers::BufferSource,
    file::FileSource,
    stream::StreamSource,
    unseekable::UnseekableSource,
};
use crate::{
    buffer::{
        CompositeBuffer,
        MemoryBuffer,
        SharedBuffer,
    },
    endian::Endian,
    error::{
        Error,
        Result,
    },
};

/// Payload size at and above which [`ReadPolicy`] kicks in, unless overridden
/// per source.
pub const DEFAULT_LARGE_OBJECT_THRESHOLD: u64 = 64 * 1024;

/// Cap on a single eager allocation; larger reads are split into a
/// [`CompositeBuffer`] of memory segments.
pub(crate) const MAX_SEGMENT_SIZE: u64 = 1 << 30;

/// What [`ByteSource::read_buffer`] does with payloads at or above the
/// large-object threshold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReadPolicy {
    /// Always read eagerly into memory.
    ReadAll,

    /// Hand out a deferred region buffer and advance the cursor without
    /// reading. Requires a seekable backing; unseekable sources fall back to
    /// [`ReadAll`](Self::ReadAll).
    #[default]
    ReadLargeOnDemand,

    /// Advance the cursor without reading and return no buffer. The payload
    /// is deliberately discarded.
    SkipLarge,
}

/// Continuation registered through [`ByteSource::require_or_notify`].
///
/// Invoked exactly once, by whichever thread appends the satisfying data or
/// completes the source. Callers must not assume re-entry on their own
/// thread.
pub type SourceCallback = Box<dyn FnOnce() + Send>;

macro_rules! read_primitives {
    {
        $(
            $name:ident : $ty:ty, $decode:ident, $bytes:expr;
        )*
    } => {
        $(
            #[doc = concat!("Read a `", stringify!($ty), "` in the source's byte order.")]
            fn $name(&mut self) -> Result<$ty> {
                let mut bytes = [0u8; $bytes];
                self.read_exact(&mut bytes)?;
                Ok(self.endian().$decode(bytes))
            }
        )*
    };
}

/// A sequential cursor over a logical byte stream.
///
/// All operations consume bytes at [`position`](Self::position) and advance
/// it by the operation's width. Implementations are not internally
/// synchronized; one thread drives a source at a time. The sole cross-thread
/// seam is [`require_or_notify`](Self::require_or_notify) on a
/// [`BufferSource`].
pub trait ByteSource {
    /// Byte order applied by the typed reads.
    fn endian(&self) -> Endian;

    fn set_endian(&mut self, endian: Endian);

    /// Current read position, in bytes from the start of the source.
    fn position(&self) -> u64;

    /// Position recorded by the most recent [`mark`](Self::mark).
    fn marker(&self) -> u64;

    /// Whether the cursor sits at the end of a source that will never grow.
    fn is_eof(&self) -> bool;

    /// Whether [`rewind`](Self::rewind) is supported at all.
    fn can_rewind(&self) -> bool;

    /// Depth of the milestone stack.
    fn milestone_count(&self) -> usize;

    /// Read up to `dest.len()` bytes, returning how many were written.
    ///
    /// Returns 0 only when no byte is currently available.
    fn read_into(&mut self, dest: &mut [u8]) -> Result<usize>;

    /// Read `count` bytes as a buffer, subject to the source's
    /// [`ReadPolicy`].
    ///
    /// - `count == 0` yields the empty buffer.
    /// - Below the large-object threshold the bytes are read eagerly.
    /// - At or above it, `ReadLargeOnDemand` on a seekable source yields a
    ///   deferred region buffer and advances the cursor without reading;
    ///   `SkipLarge` advances the cursor and yields `None`; `ReadAll` reads
    ///   eagerly, splitting into segments when a single allocation would be
    ///   oversized.
    fn read_buffer(&mut self, count: u64) -> Result<Option<SharedBuffer>>;

    /// Advance the cursor by `count` bytes without handing them out.
    fn skip(&mut self, count: u64) -> Result<()>;

    /// Record the current position as the rewind bookmark.
    ///
    /// Only one bookmark is retained; marking again moves it forward and
    /// lets go of anything needed only for the old one.
    fn mark(&mut self);

    /// Reset the cursor to the bookmark.
    fn rewind(&mut self) -> Result<()>;

    /// Push `position + count` as the end of a nested bounded region.
    fn push_milestone(&mut self, count: u64);

    /// Pop the innermost milestone.
    ///
    /// # Panics
    ///
    /// Panics if the stack is empty. Push and pop calls are paired by the
    /// parser framing sequences and items; an unpaired pop is a bug there,
    /// not a recoverable condition.
    fn pop_milestone(&mut self);

    /// Whether the cursor has reached or passed the innermost milestone.
    fn has_reached_milestone(&self) -> bool;

    /// Whether at least `count` more bytes are available.
    ///
    /// On a fixed or completed source this is a pure length check and asking
    /// for more than will ever exist fails with [`Error::ShortRead`]. An
    /// incomplete [`BufferSource`] answers `false` instead of blocking.
    fn require(&mut self, count: u64) -> Result<bool>;

    /// Like [`require`](Self::require), but registers `on_ready` when the
    /// data has not arrived yet.
    ///
    /// The callback fires once enough bytes arrive or the source completes,
    /// whichever comes first, and never more than once. Sources that cannot
    /// grow answer immediately and drop the callback.
    fn require_or_notify(&mut self, count: u64, on_ready: SourceCallback) -> Result<bool> {
        let _ = on_ready;
        self.require(count)
    }

    /// Fill `dest` completely.
    ///
    /// Fails with [`Error::ShortRead`] if the source ends first. Multi-byte
    /// primitives go through here, so their bytes are always staged
    /// contiguously before endian decoding, whatever mixture of backing
    /// stores they came from.
    fn read_exact(&mut self, dest: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < dest.len() {
            let n = self.read_into(&mut dest[filled..])?;
            if n == 0 {
                return Err(Error::short_read(dest.len() as u64, filled as u64));
            }
            filled += n;
        }
        Ok(())
    }

    /// Read `count` bytes into an owned vector.
    fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        let mut data = vec![0u8; count];
        self.read_exact(&mut data)?;
        Ok(data)
    }

    /// Read a single byte.
    fn read_u8(&mut self) -> Result<u8> {
        let mut bytes = [0u8; 1];
        self.read_exact(&mut bytes)?;
        Ok(bytes[0])
    }

    read_primitives! {
        read_i16: i16, read_i16, 2;
        read_u16: u16, read_u16, 2;
        read_i32: i32, read_i32, 4;
        read_u32: u32, read_u32, 4;
        read_i64: i64, read_i64, 8;
        read_u64: u64, read_u64, 8;
        read_f32: f32, read_f32, 4;
        read_f64: f64, read_f64, 8;
    }
}

/// LIFO stack of absolute end offsets bounding nested parse regions.
#[derive(Clone, Debug, Default)]
pub(crate) struct Milestones {
    stack: Vec<u64>,
}

impl Milestones {
    pub fn push(&mut self, position: u64, count: u64) {
        self.stack.push(position + count);
    }

    pub fn pop(&mut self) {
        self.stack
            .pop()
            .expect("pop_milestone called with an empty milestone stack");
    }

    pub fn reached(&self, position: u64) -> bool {
        self.stack.last().is_some_and(|end| position >= *end)
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.stack.len()
    }
}

/// Eagerly reads `count` bytes through `fill`, splitting into a composite of
/// capped memory segments when one allocation would be oversized.
pub(crate) fn read_segmented(
    count: u64,
    mut fill: impl FnMut(&mut [u8]) -> Result<()>,
) -> Result<SharedBuffer> {
    if count <= MAX_SEGMENT_SIZE {
        let mut data = vec![0u8; count as usize];
        fill(&mut data)?;
        Ok(MemoryBuffer::shared(data))
    }
    else {
        let mut composite = CompositeBuffer::new();
        let mut remaining = count;
        while remaining > 0 {
            let segment = remaining.min(MAX_SEGMENT_SIZE) as usize;
            let mut data = vec![0u8; segment];
            fill(&mut data)?;
            composite.push(MemoryBuffer::shared(data));
            remaining -= segment as u64;
        }
        Ok(Arc::new(composite))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn milestones_nest() {
        let mut milestones = Milestones::default();
        milestones.push(0, 10);
        milestones.push(0, 4);
        assert_eq!(milestones.count(), 2);
        assert!(!milestones.reached(3));
        assert!(milestones.reached(4));
        milestones.pop();
        assert!(!milestones.reached(4));
        assert!(milestones.reached(10));
    }

    #[test]
    #[should_panic(expected = "empty milestone stack")]
    fn popping_an_empty_stack_panics() {
        Milestones::default().pop();
    }

    #[test]
    fn segmented_read_stays_single_below_the_cap() {
        let buffer = read_segmented(8, |dest| {
            dest.fill(0xab);
            Ok(())
        })
        .unwrap();
        assert_eq!(buffer.len(), 8);
        assert_eq!(&buffer.bytes().unwrap()[..], &[0xab; 8]);
    }
}
