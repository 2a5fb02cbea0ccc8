use std::{
    io::{
        Read,
        Seek,
        SeekFrom,
    },
    sync::Arc,
};

use parking_lot::Mutex;

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
        StreamRegionBuffer,
    },
    endian::Endian,
    error::{
        Error,
        Result,
    },
};

/// A source over a seekable stream of known length.
///
/// Large payloads under [`ReadPolicy::ReadLargeOnDemand`] become
/// [`StreamRegionBuffer`]s sharing the stream through an `Arc<Mutex<_>>`. The
/// source seeks to its own tracked position before every read, so slicing a
/// handed-out region between two cursor reads cannot corrupt the cursor.
pub struct StreamSource<S> {
    stream: Arc<Mutex<S>>,
    position: u64,
    len: u64,
    endian: Endian,
    marker: u64,
    milestones: Milestones,
    policy: ReadPolicy,
    threshold: u64,
}

impl<S: Read + Seek + Send> StreamSource<S> {
    /// Creates a source starting at the stream's current position.
    ///
    /// The stream's length is measured once, here; the backing must not grow
    /// or shrink afterwards.
    pub fn new(mut stream: S) -> Result<Self> {
        let position = stream.stream_position()?;
        let len = stream.seek(SeekFrom::End(0))?;
        stream.seek(SeekFrom::Start(position))?;
        Ok(Self {
            stream: Arc::new(Mutex::new(stream)),
            position,
            len,
            endian: Endian::default(),
            marker: position,
            milestones: Milestones::default(),
            policy: ReadPolicy::default(),
            threshold: DEFAULT_LARGE_OBJECT_THRESHOLD,
        })
    }

    pub fn with_policy(mut self, policy: ReadPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_threshold(mut self, threshold: u64) -> Self {
        self.threshold = threshold;
        self
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn remaining(&self) -> u64 {
        self.len - self.position
    }
}

impl<S> std::fmt::Debug for StreamSource<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSource")
            .field("position", &self.position)
            .field("len", &self.len)
            .field("endian", &self.endian)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<S: Read + Seek + Send + 'static> ByteSource for StreamSource<S> {
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

    #[inline]
    fn is_eof(&self) -> bool {
        self.position >= self.len
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
        let take = (dest.len() as u64).min(self.remaining()) as usize;
        if take == 0 {
            return Ok(0);
        }
        {
            let mut stream = self.stream.lock();
            stream.seek(SeekFrom::Start(self.position))?;
            stream.read_exact(&mut dest[..take])?;
        }
        self.position += take as u64;
        Ok(take)
    }

    fn read_buffer(&mut self, count: u64) -> Result<Option<SharedBuffer>> {
        if count == 0 {
            return Ok(Some(EmptyBuffer::shared()));
        }
        if count > self.remaining() {
            return Err(Error::short_read(count, self.remaining()));
        }
        if count >= self.threshold {
            match self.policy {
                ReadPolicy::ReadLargeOnDemand => {
                    let buffer =
                        StreamRegionBuffer::new(self.stream.clone(), self.position, count);
                    self.position += count;
                    return Ok(Some(Arc::new(buffer)));
                }
                ReadPolicy::SkipLarge => {
                    self.position += count;
                    return Ok(None);
                }
                ReadPolicy::ReadAll => {}
            }
        }
        read_segmented(count, |dest| self.read_exact(dest)).map(Some)
    }

    fn skip(&mut self, count: u64) -> Result<()> {
        if count > self.remaining() {
            return Err(Error::short_read(count, self.remaining()));
        }
        self.position += count;
        Ok(())
    }

    fn mark(&mut self) {
        self.marker = self.position;
    }

    fn rewind(&mut self) -> Result<()> {
        self.position = self.marker;
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

    fn require(&mut self, count: u64) -> Result<bool> {
        if count <= self.remaining() {
            Ok(true)
        }
        else {
            Err(Error::short_read(count, self.remaining()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn source_over(data: Vec<u8>) -> StreamSource<Cursor<Vec<u8>>> {
        StreamSource::new(Cursor::new(data)).unwrap()
    }

    #[test]
    fn typed_reads_honor_endianness() {
        let mut source = source_over(b"\x12\x34\x12\x34".to_vec());
        source.set_endian(Endian::Big);
        assert_eq!(source.read_u16().unwrap(), 0x1234);
        source.set_endian(Endian::Little);
        assert_eq!(source.read_u16().unwrap(), 0x3412);
        assert!(source.is_eof());
        assert!(source.read_u8().is_err());
    }

    #[test]
    fn mark_and_rewind_replay_the_same_bytes() {
        let data: Vec<u8> = (0..=255).cycle().take(300).collect();
        let mut source = source_over(data);
        source.skip(7).unwrap();
        source.mark();
        let first = source.read_bytes(100).unwrap();
        source.rewind().unwrap();
        assert_eq!(source.position(), 7);
        let second = source.read_bytes(100).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn milestones_nest_lifo() {
        let mut source = source_over(vec![0; 32]);
        source.push_milestone(10);
        source.push_milestone(4);
        assert_eq!(source.milestone_count(), 2);
        source.skip(4).unwrap();
        // the inner bound (at 4) is reached, the outer (at 10) is not
        assert!(source.has_reached_milestone());
        source.pop_milestone();
        assert!(!source.has_reached_milestone());
        source.skip(6).unwrap();
        assert!(source.has_reached_milestone());
        source.pop_milestone();
        assert!(!source.has_reached_milestone());
    }

    #[test]
    fn small_reads_are_resident() {
        let mut source = source_over(vec![7; 64]).with_threshold(16);
        let buffer = source.read_buffer(15).unwrap().unwrap();
        assert!(buffer.is_in_memory());
        assert_eq!(buffer.len(), 15);
    }

    #[test]
    fn threshold_reads_are_deferred_on_demand() {
        let mut source = source_over((0..64).collect()).with_threshold(16);
        let buffer = source.read_buffer(16).unwrap().unwrap();
        assert!(!buffer.is_in_memory());
        assert_eq!(source.position(), 16);
        // the deferred region reads the bytes the cursor never touched
        assert_eq!(&buffer.bytes().unwrap()[..], &(0..16).collect::<Vec<u8>>()[..]);
        // and the cursor continues past it unharmed
        assert_eq!(source.read_u8().unwrap(), 16);
    }

    #[test]
    fn skip_large_advances_without_a_buffer() {
        let mut source = source_over((0..64).collect())
            .with_threshold(16)
            .with_policy(ReadPolicy::SkipLarge);
        assert!(source.read_buffer(20).unwrap().is_none());
        assert_eq!(source.position(), 20);
        assert_eq!(source.read_u8().unwrap(), 20);
    }

    #[test]
    fn read_all_ignores_the_threshold() {
        let mut source = source_over(vec![1; 64])
            .with_threshold(16)
            .with_policy(ReadPolicy::ReadAll);
        let buffer = source.read_buffer(32).unwrap().unwrap();
        assert!(buffer.is_in_memory());
        assert_eq!(buffer.len(), 32);
    }

    #[test]
    fn zero_length_read_yields_the_empty_buffer() {
        let mut source = source_over(vec![1; 4]);
        let buffer = source.read_buffer(0).unwrap().unwrap();
        assert!(buffer.is_empty());
        assert_eq!(source.position(), 0);
    }

    #[test]
    fn require_past_the_end_is_fatal() {
        let mut source = source_over(vec![0; 8]);
        assert!(source.require(8).unwrap());
        source.skip(4).unwrap();
        assert!(matches!(source.require(5), Err(Error::ShortRead { .. })));
    }

    #[test]
    fn starts_at_the_stream_position() {
        let mut cursor = Cursor::new(b"skip..AB".to_vec());
        cursor.set_position(6);
        let mut source = StreamSource::new(cursor).unwrap();
        assert_eq!(source.position(), 6);
        assert_eq!(source.read_u8().unwrap(), b'A');
    }
}
