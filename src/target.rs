//! Byte targets: append-only endian-aware writers.
//!
//! The write-side mirror of [`source`](crate::source), without markers or
//! milestones; serialization never backtracks. Large assembled payloads go
//! through [`write_buffer`](ByteTarget::write_buffer), which streams a
//! composite chunk by chunk instead of materializing it.

use std::{
    fs::File,
    io::{
        self,
        BufWriter,
        Write,
    },
    path::PathBuf,
};

use crate::{
    buffer::SharedBuffer,
    endian::Endian,
    error::{
        Error,
        Result,
    },
};

macro_rules! write_primitives {
    {
        $(
            $name:ident : $ty:ty, $encode:ident;
        )*
    } => {
        $(
            #[doc = concat!("Write a `", stringify!($ty), "` in the target's byte order.")]
            fn $name(&mut self, value: $ty) -> Result<()> {
                let bytes = self.endian().$encode(value);
                self.write_bytes(&bytes)
            }
        )*
    };
}

/// A sequential writer of endian-encoded primitives and raw bytes.
pub trait ByteTarget {
    /// Byte order applied by the typed writes.
    fn endian(&self) -> Endian;

    fn set_endian(&mut self, endian: Endian);

    /// Bytes written so far.
    fn position(&self) -> u64;

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()>;

    fn flush(&mut self) -> Result<()>;

    /// Write a buffer's full content, streaming composites chunk by chunk so
    /// a multi-gigabyte payload is never materialized whole.
    fn write_buffer(&mut self, buffer: &SharedBuffer) -> Result<()> {
        buffer.copy_to(&mut TargetWriter(self))
    }

    /// Write a single byte.
    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_bytes(&[value])
    }

    write_primitives! {
        write_i16: i16, write_i16;
        write_u16: u16, write_u16;
        write_i32: i32, write_i32;
        write_u32: u32, write_u32;
        write_i64: i64, write_i64;
        write_u64: u64, write_u64;
        write_f32: f32, write_f32;
        write_f64: f64, write_f64;
    }
}

/// Adapts a target to [`io::Write`] so buffers can stream into it.
struct TargetWriter<'a, T: ?Sized>(&'a mut T);

impl<T: ByteTarget + ?Sized> io::Write for TargetWriter<'_, T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .write_bytes(buf)
            .map_err(|error| io::Error::new(io::ErrorKind::Other, error))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0
            .flush()
            .map_err(|error| io::Error::new(io::ErrorKind::Other, error))
    }
}

/// A target over any writable stream.
#[derive(Debug)]
pub struct StreamTarget<W> {
    writer: W,
    position: u64,
    endian: Endian,
}

impl<W: Write> StreamTarget<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            position: 0,
            endian: Endian::default(),
        }
    }

    #[inline]
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Direct access to the underlying stream, for bulk transfers that
    /// bypass the typed writes. Bytes written this way are not counted in
    /// [`position`](ByteTarget::position).
    #[inline]
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ByteTarget for StreamTarget<W> {
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

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        self.position += bytes.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// A buffered target over a newly created file.
#[derive(Debug)]
pub struct FileTarget {
    writer: BufWriter<File>,
    path: PathBuf,
    position: u64,
    endian: Endian,
}

impl FileTarget {
    /// Creates (or truncates) the file at `path`.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::create(&path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path,
            position: 0,
            endian: Endian::default(),
        })
    }

    #[inline]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Flushes and returns the underlying file.
    pub fn into_inner(self) -> Result<File> {
        self.writer
            .into_inner()
            .map_err(|error| Error::Io(error.into_error()))
    }
}

impl ByteTarget for FileTarget {
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

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        self.position += bytes.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::{
        buffer::{
            CompositeBuffer,
            MemoryBuffer,
        },
        source::{
            ByteSource,
            StreamSource,
        },
    };

    #[test]
    fn writes_primitives_in_both_byte_orders() {
        let mut target = StreamTarget::new(Vec::new());
        target.write_u16(0x1234).unwrap();
        target.set_endian(Endian::Big);
        target.write_u16(0x1234).unwrap();
        target.write_u8(0xff).unwrap();
        assert_eq!(target.position(), 5);
        assert_eq!(target.into_inner(), b"\x34\x12\x12\x34\xff");
    }

    #[test]
    fn streams_a_composite_buffer() {
        let buffer: SharedBuffer = std::sync::Arc::new(CompositeBuffer::from_children([
            MemoryBuffer::shared(b"Hello".to_vec()),
            MemoryBuffer::shared(b" ".to_vec()),
            MemoryBuffer::shared(b"World".to_vec()),
        ]));
        let mut target = StreamTarget::new(Vec::new());
        target.write_buffer(&buffer).unwrap();
        assert_eq!(target.position(), 11);
        assert_eq!(target.into_inner(), b"Hello World");
    }

    #[test]
    fn what_a_target_writes_a_source_reads_back() {
        let mut target = StreamTarget::new(Vec::new());
        target.set_endian(Endian::Big);
        target.write_u32(0xdeadbeef).unwrap();
        target.write_f64(-2.25).unwrap();
        target.write_i16(-7).unwrap();

        let mut source = StreamSource::new(Cursor::new(target.into_inner())).unwrap();
        source.set_endian(Endian::Big);
        assert_eq!(source.read_u32().unwrap(), 0xdeadbeef);
        assert_eq!(source.read_f64().unwrap(), -2.25);
        assert_eq!(source.read_i16().unwrap(), -7);
        assert!(source.is_eof());
    }

    #[test]
    fn file_target_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let mut target = FileTarget::create(&path).unwrap();
        target.write_bytes(b"persisted").unwrap();
        target.write_u16(0x0102).unwrap();
        assert_eq!(target.position(), 11);
        target.into_inner().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"persisted\x02\x01");
    }
}
