use std::{
    collections::VecDeque,
    sync::Arc,
};

use parking_lot::Mutex;

use super::{
    ByteSource,
    Milestones,
    SourceCallback,
};
use crate::{
    buffer::{
        CompositeBuffer,
        EmptyBuffer,
        RangeBuffer,
        SharedBuffer,
    },
    endian::Endian,
    error::{
        Error,
        Result,
    },
};

/// A source over an ordered, growable list of buffers.
///
/// This is the network receive path: a producer thread [`append`]s each
/// arriving chunk while a consumer parses, and marks the source complete with
/// the last one. Handles are cheap clones of one shared state; a single mutex
/// guards the buffer list and all cursor bookkeeping, which is the only
/// synchronization in this crate's read path.
///
/// [`mark`](ByteSource::mark) reclaims buffers that have fallen entirely
/// behind the marker, since only one bookmark is retained they can never be
/// rewound to again.
///
/// [`append`]: Self::append
#[derive(Clone)]
pub struct BufferSource {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    buffers: VecDeque<SharedBuffer>,
    /// Bytes reclaimed off the front of `buffers`; all positions are absolute.
    expired: u64,
    len: u64,
    position: u64,
    marker: u64,
    milestones: Milestones,
    endian: Endian,
    complete: bool,
    pending: Option<Requirement>,
}

struct Requirement {
    end: u64,
    on_ready: SourceCallback,
}

impl BufferSource {
    /// Creates an empty source that a producer will feed through
    /// [`append`](Self::append).
    pub fn growable() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                buffers: VecDeque::new(),
                expired: 0,
                len: 0,
                position: 0,
                marker: 0,
                milestones: Milestones::default(),
                endian: Endian::default(),
                complete: false,
                pending: None,
            })),
        }
    }

    /// Creates a complete source over pre-existing buffers.
    pub fn fixed(buffers: impl IntoIterator<Item = SharedBuffer>) -> Self {
        let source = Self::growable();
        {
            let mut inner = source.inner.lock();
            for buffer in buffers {
                if !buffer.is_empty() {
                    inner.len += buffer.len();
                    inner.buffers.push_back(buffer);
                }
            }
            inner.complete = true;
        }
        source
    }

    /// Appends a chunk, marking the source complete when `last` is set.
    ///
    /// Appending to a completed source is an error. If a pending
    /// [`require_or_notify`](ByteSource::require_or_notify) is satisfied by
    /// this chunk, or the source just completed, its callback runs on the
    /// calling thread, outside the lock.
    pub fn append(&self, buffer: SharedBuffer, last: bool) -> Result<()> {
        let ready = {
            let mut inner = self.inner.lock();
            if inner.complete {
                return Err(Error::InvalidOperation("source is already complete"));
            }
            if !buffer.is_empty() {
                inner.len += buffer.len();
                inner.buffers.push_back(buffer);
            }
            if last {
                inner.complete = true;
            }
            inner.take_ready_callback()
        };
        if let Some(on_ready) = ready {
            on_ready();
        }
        Ok(())
    }

    /// Total bytes appended so far, including consumed and reclaimed ones.
    pub fn len(&self) -> u64 {
        self.inner.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether no more data will ever arrive.
    pub fn is_complete(&self) -> bool {
        self.inner.lock().complete
    }

    #[cfg(test)]
    fn live_buffers(&self) -> usize {
        self.inner.lock().buffers.len()
    }
}

impl std::fmt::Debug for BufferSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("BufferSource")
            .field("position", &inner.position)
            .field("len", &inner.len)
            .field("expired", &inner.expired)
            .field("complete", &inner.complete)
            .field("pending", &inner.pending.as_ref().map(|req| req.end))
            .finish_non_exhaustive()
    }
}

impl Inner {
    #[inline]
    fn available(&self) -> u64 {
        self.len - self.position
    }

    fn take_ready_callback(&mut self) -> Option<SourceCallback> {
        match &self.pending {
            Some(requirement) if self.len >= requirement.end || self.complete => {
                self.pending.take().map(|requirement| requirement.on_ready)
            }
            _ => None,
        }
    }

    fn read_into(&mut self, dest: &mut [u8]) -> Result<usize> {
        let take = (dest.len() as u64).min(self.available()) as usize;
        if take == 0 {
            return Ok(0);
        }
        let mut offset = self.position - self.expired;
        let mut filled = 0;
        for buffer in &self.buffers {
            if offset >= buffer.len() {
                offset -= buffer.len();
                continue;
            }
            let chunk = (buffer.len() - offset).min((take - filled) as u64) as usize;
            buffer.read_range(offset, &mut dest[filled..filled + chunk])?;
            filled += chunk;
            offset = 0;
            if filled == take {
                break;
            }
        }
        self.position += take as u64;
        Ok(take)
    }

    fn read_buffer(&mut self, count: u64) -> Result<Option<SharedBuffer>> {
        if count == 0 {
            return Ok(Some(EmptyBuffer::shared()));
        }
        if count > self.available() {
            return Err(Error::short_read(count, self.available()));
        }
        // share the backing buffers instead of copying; a chunk wholly inside
        // one child comes back as a window over it
        let mut offset = self.position - self.expired;
        let mut remaining = count;
        let mut composite = CompositeBuffer::new();
        for buffer in &self.buffers {
            if offset >= buffer.len() {
                offset -= buffer.len();
                continue;
            }
            let chunk = (buffer.len() - offset).min(remaining);
            let part: SharedBuffer = if offset == 0 && chunk == buffer.len() {
                buffer.clone()
            }
            else {
                Arc::new(RangeBuffer::new(buffer.clone(), offset, chunk)?)
            };
            composite.push(part);
            remaining -= chunk;
            offset = 0;
            if remaining == 0 {
                break;
            }
        }
        self.position += count;
        let result = if composite.num_children() == 1 {
            composite.children().next().expect("one child").clone()
        }
        else {
            Arc::new(composite) as SharedBuffer
        };
        Ok(Some(result))
    }

    fn mark(&mut self) {
        self.marker = self.position;
        // buffers wholly behind the marker can never be rewound to again
        while let Some(first) = self.buffers.front() {
            let end = self.expired + first.len();
            if end <= self.marker {
                self.expired = end;
                self.buffers.pop_front();
            }
            else {
                break;
            }
        }
    }

    fn require(&mut self, count: u64) -> Result<bool> {
        if self.available() >= count {
            Ok(true)
        }
        else if self.complete {
            Err(Error::short_read(count, self.available()))
        }
        else {
            Ok(false)
        }
    }
}

impl ByteSource for BufferSource {
    fn endian(&self) -> Endian {
        self.inner.lock().endian
    }

    fn set_endian(&mut self, endian: Endian) {
        self.inner.lock().endian = endian;
    }

    fn position(&self) -> u64 {
        self.inner.lock().position
    }

    fn marker(&self) -> u64 {
        self.inner.lock().marker
    }

    fn is_eof(&self) -> bool {
        let inner = self.inner.lock();
        inner.complete && inner.position >= inner.len
    }

    #[inline]
    fn can_rewind(&self) -> bool {
        true
    }

    fn milestone_count(&self) -> usize {
        self.inner.lock().milestones.count()
    }

    fn read_into(&mut self, dest: &mut [u8]) -> Result<usize> {
        self.inner.lock().read_into(dest)
    }

    fn read_buffer(&mut self, count: u64) -> Result<Option<SharedBuffer>> {
        self.inner.lock().read_buffer(count)
    }

    fn skip(&mut self, count: u64) -> Result<()> {
        let mut inner = self.inner.lock();
        if count > inner.available() {
            return Err(Error::short_read(count, inner.available()));
        }
        inner.position += count;
        Ok(())
    }

    fn mark(&mut self) {
        self.inner.lock().mark();
    }

    fn rewind(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.position = inner.marker;
        Ok(())
    }

    fn push_milestone(&mut self, count: u64) {
        let mut inner = self.inner.lock();
        let position = inner.position;
        inner.milestones.push(position, count);
    }

    fn pop_milestone(&mut self) {
        self.inner.lock().milestones.pop();
    }

    fn has_reached_milestone(&self) -> bool {
        let inner = self.inner.lock();
        inner.milestones.reached(inner.position)
    }

    fn require(&mut self, count: u64) -> Result<bool> {
        self.inner.lock().require(count)
    }

    fn require_or_notify(&mut self, count: u64, on_ready: SourceCallback) -> Result<bool> {
        let mut inner = self.inner.lock();
        match inner.require(count)? {
            true => Ok(true),
            false => {
                // at most one requirement is pending at a time; the parser
                // asks again only after the previous callback fired
                inner.pending = Some(Requirement {
                    end: inner.position + count,
                    on_ready,
                });
                Ok(false)
            }
        }
    }
}
