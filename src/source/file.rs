use std::{
    fs::File,
    io::{
        Read,
        Seek,
        SeekFrom,
    },
    path::PathBuf,
    sync::Arc,
};

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
        FileRegionBuffer,
        SharedBuffer,
    },
    endian::Endian,
    error::{
        Error,
        Result,
    },
};

/// A source over a named file.
///
/// The open handle is used for sequential cursor reads and closed on drop.
/// Large payloads under [`ReadPolicy::ReadLargeOnDemand`] become
/// [`FileRegionBuffer`]s carrying the path, which open their own handle per
/// read and so stay valid after this source is gone.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    file: File,
    position: u64,
    len: u64,
    endian: Endian,
    marker: u64,
    milestones: Milestones,
    policy: ReadPolicy,
    threshold: u64,
}

impl FileSource {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::open(&path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            path,
            file,
            position: 0,
            len,
            endian: Endian::default(),
            marker: 0,
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
    pub fn path(&self) -> &std::path::Path {
        &self.path
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

impl ByteSource for FileSource {
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
        self.file.seek(SeekFrom::Start(self.position))?;
        self.file.read_exact(&mut dest[..take])?;
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
                    let buffer = FileRegionBuffer::new(&self.path, self.position, count);
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
