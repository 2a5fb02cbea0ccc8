use std::io::Read;

use super::{
    read_segmented,
    ByteSource,
    Milestones,
    ReadPolicy,
    DEFAULT_LARGE_OBJECT_THRESHOLD,
};
use crate::{
    buffer::{
        EmptyBuffer,
        SharedBuffer,
    },
    endian::Endian,
    error::{
        Error,
        Result,
    },
};

/// Scratch size for draining skipped bytes off the live stream.
const SKIP_CHUNK: usize = 4096;

/// What the rolling buffer is currently doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BufferState {
    /// No rolling buffer in play; reads pass straight through.
    Unused,
    /// Replaying buffered bytes; passthrough once exhausted.
    Read,
    /// Recording every byte read from the stream, for a later rewind.
    Write,
    /// Replaying leftover buffered bytes first, then recording.
    ReadWrite,
}

/// Mark/rewind emulation over a forward-only stream, e.g. a live socket.
///
/// [`mark`](ByteSource::mark) starts recording everything read from the
/// stream into a rolling buffer; [`rewind`](ByteSource::rewind) replays it.
/// The buffer compacts its consumed prefix on every new mark, so memory use
/// is bounded by the span between a mark and its rewind. Multi-byte
/// primitives that straddle the rolling buffer and the live stream are staged
/// contiguously by [`read_exact`](ByteSource::read_exact) before the endian
/// decode; no value is ever decoded half from each.
///
/// [`ReadPolicy::ReadLargeOnDemand`] needs a seekable backing, so it is
/// downgraded to [`ReadPolicy::ReadAll`] here, with a warning.
pub struct UnseekableSource<S> {
    stream: S,
    position: u64,
    endian: Endian,
    marker: u64,
    marked: bool,
    state: BufferState,
    buffer: Vec<u8>,
    buffer_pos: usize,
    milestones: Milestones,
    policy: ReadPolicy,
    threshold: u64,
    eof: bool,
}

impl<S: Read + Send> UnseekableSource<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            position: 0,
            endian: Endian::default(),
            marker: 0,
            marked: false,
            state: BufferState::Unused,
            buffer: Vec::new(),
            buffer_pos: 0,
            milestones: Milestones::default(),
            policy: effective_policy(ReadPolicy::default()),
            threshold: DEFAULT_LARGE_OBJECT_THRESHOLD,
            eof: false,
        }
    }

    pub fn with_policy(mut self, policy: ReadPolicy) -> Self {
        self.policy = effective_policy(policy);
        self
    }

    pub fn with_threshold(mut self, threshold: u64) -> Self {
        self.threshold = threshold;
        self
    }

    /// The policy actually in effect, after any downgrade.
    #[inline]
    pub fn policy(&self) -> ReadPolicy {
        self.policy
    }

    /// Bytes buffered for replay, not yet consumed again.
    fn replay_remaining(&self) -> usize {
        match self.state {
            BufferState::Read | BufferState::ReadWrite => self.buffer.len() - self.buffer_pos,
            BufferState::Unused | BufferState::Write => 0,
        }
    }

    #[cfg(test)]
    fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

fn effective_policy(policy: ReadPolicy) -> ReadPolicy {
    if policy == ReadPolicy::ReadLargeOnDemand {
        tracing::warn!(
            "deferred large-object reads need a seekable stream, reading eagerly instead"
        );
        ReadPolicy::ReadAll
    }
    else {
        policy
    }
}

impl<S> std::fmt::Debug for UnseekableSource<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnseekableSource")
            .field("position", &self.position)
            .field("state", &self.state)
            .field("buffered", &self.buffer.len())
            .field("marked", &self.marked)
            .finish_non_exhaustive()
    }
}

impl<S: Read + Send> ByteSource for UnseekableSource<S> {
    #[inline]
    fn endian(&self) -> Endian {
        self.endian
    }

    #[inline]
    fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    #[inline]
    fn position(&self) -> u64 {
        self.position
    }

    #[inline]
    fn marker(&self) -> u64 {
        self.marker
    }

    fn is_eof(&self) -> bool {
        self.eof && self.replay_remaining() == 0
    }

    #[inline]
    fn can_rewind(&self) -> bool {
        true
    }

    #[inline]
    fn milestone_count(&self) -> usize {
        self.milestones.count()
    }

    fn read_into(&mut self, dest: &mut [u8]) -> Result<usize> {
        if dest.is_empty() {
            return Ok(0);
        }
        let mut filled = 0;

        // replay phase
        if matches!(self.state, BufferState::Read | BufferState::ReadWrite) {
            let take = self.replay_remaining().min(dest.len());
            dest[..take].copy_from_slice(&self.buffer[self.buffer_pos..self.buffer_pos + take]);
            self.buffer_pos += take;
            filled += take;
            if self.buffer_pos == self.buffer.len() {
                match self.state {
                    BufferState::Read => {
                        // nothing pending, the mark is used up
                        self.state = BufferState::Unused;
                        self.buffer.clear();
                        self.buffer_pos = 0;
                        self.marked = false;
                    }
                    BufferState::ReadWrite => {
                        // replayed bytes stay recorded, fresh stream bytes
                        // append after them
                        self.state = BufferState::Write;
                        self.buffer_pos = 0;
                    }
                    _ => unreachable!(),
                }
            }
        }

        // live phase
        while filled < dest.len() {
            let n = self.stream.read(&mut dest[filled..])?;
            if n == 0 {
                self.eof = true;
                break;
            }
            if self.state == BufferState::Write {
                self.buffer.extend_from_slice(&dest[filled..filled + n]);
            }
            filled += n;
        }

        self.position += filled as u64;
        Ok(filled)
    }

    fn read_buffer(&mut self, count: u64) -> Result<Option<SharedBuffer>> {
        if count == 0 {
            return Ok(Some(EmptyBuffer::shared()));
        }
        if count >= self.threshold && self.policy == ReadPolicy::SkipLarge {
            self.skip(count)?;
            return Ok(None);
        }
        read_segmented(count, |dest| self.read_exact(dest)).map(Some)
    }

    fn skip(&mut self, count: u64) -> Result<()> {
        // skipped bytes still flow through read_into so they are recorded
        // while a mark is active
        let mut scratch = [0u8; SKIP_CHUNK];
        let mut remaining = count;
        while remaining > 0 {
            let take = remaining.min(SKIP_CHUNK as u64) as usize;
            let n = self.read_into(&mut scratch[..take])?;
            if n == 0 {
                return Err(Error::short_read(count, count - remaining));
            }
            remaining -= n as u64;
        }
        Ok(())
    }

    fn mark(&mut self) {
        self.marked = true;
        self.marker = self.position;
        match self.state {
            BufferState::Unused => {
                self.buffer.clear();
                self.buffer_pos = 0;
                self.state = BufferState::Write;
            }
            BufferState::Write => {
                // everything recorded so far is behind the new mark
                self.buffer.clear();
            }
            BufferState::Read | BufferState::ReadWrite => {
                self.buffer.drain(..self.buffer_pos);
                self.buffer_pos = 0;
                self.state = if self.buffer.is_empty() {
                    BufferState::Write
                }
                else {
                    BufferState::ReadWrite
                };
            }
        }
    }

    /// # Panics
    ///
    /// Panics when no mark is active: without one there is nothing recorded
    /// to replay, and the stream itself cannot seek.
    fn rewind(&mut self) -> Result<()> {
        if !self.marked {
            panic!("rewind called without an active mark on an unseekable source");
        }
        self.position = self.marker;
        self.buffer_pos = 0;
        if self.state == BufferState::Write && !self.buffer.is_empty() {
            self.state = BufferState::Read;
        }
        Ok(())
    }

    fn push_milestone(&mut self, count: u64) {
        self.milestones.push(self.position, count);
    }

    fn pop_milestone(&mut self) {
        self.milestones.pop();
    }

    fn has_reached_milestone(&self) -> bool {
        self.milestones.reached(self.position)
    }

    /// Prefetches from the live stream until `count` bytes are staged for
    /// replay, so the answer is definite even without a known length.
    fn require(&mut self, count: u64) -> Result<bool> {
        let replay = self.replay_remaining() as u64;
        if replay >= count {
            return Ok(true);
        }
        let needed = (count - replay) as usize;
        let mut fetched = vec![0u8; needed];
        let mut filled = 0;
        while filled < needed {
            let n = self.stream.read(&mut fetched[filled..])?;
            if n == 0 {
                self.eof = true;
                break;
            }
            filled += n;
        }
        // even when the check fails, whatever came off the forward-only
        // stream is staged for replay; those bytes cannot be re-read
        if filled > 0 {
            fetched.truncate(filled);
            match self.state {
                BufferState::Unused => {
                    self.buffer.clear();
                    self.buffer_pos = 0;
                    self.buffer.extend_from_slice(&fetched);
                    self.state = BufferState::Read;
                }
                BufferState::Write => {
                    // replay starts after the already-consumed recorded bytes
                    self.buffer_pos = self.buffer.len();
                    self.buffer.extend_from_slice(&fetched);
                    self.state = BufferState::ReadWrite;
                }
                BufferState::Read | BufferState::ReadWrite => {
                    self.buffer.extend_from_slice(&fetched);
                }
            }
        }
        if filled < needed {
            return Err(Error::short_read(count, replay + filled as u64));
        }
        Ok(true)
    }
}
