use bytes::Bytes;
use parking_lot::RwLock;

use super::{
    check_range,
    ByteBuffer,
};
use crate::error::{
    Error,
    Result,
};

/// A buffer whose content lives behind a bulk-data URI and is fetched
/// out-of-band.
///
/// JSON and XML renditions of a dataset replace large values with a URI
/// reference. The de-serializer creates one of these per reference; reads
/// fail with [`Error::NotLoaded`] until the fetcher calls
/// [`load`](Self::load), after which the buffer behaves like an in-memory
/// one.
#[derive(Debug)]
pub struct BulkDataBuffer {
    uri: String,
    data: RwLock<Option<Bytes>>,
}

impl BulkDataBuffer {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            data: RwLock::new(None),
        }
    }

    #[inline]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Whether the content has been fetched.
    pub fn is_loaded(&self) -> bool {
        self.data.read().is_some()
    }

    /// Populates the buffer with the fetched content.
    ///
    /// Loading twice is an error; the fetcher owns exactly one fetch.
    pub fn load(&self, content: impl Into<Bytes>) -> Result<()> {
        let mut data = self.data.write();
        if data.is_some() {
            return Err(Error::InvalidOperation("bulk data buffer is already loaded"));
        }
        *data = Some(content.into());
        Ok(())
    }

    fn loaded(&self) -> Result<Bytes> {
        self.data.read().clone().ok_or_else(|| {
            Error::NotLoaded {
                uri: self.uri.clone(),
            }
        })
    }
}

impl ByteBuffer for BulkDataBuffer {
    /// Length of the fetched content, or 0 while unloaded.
    fn len(&self) -> u64 {
        self.data
            .read()
            .as_ref()
            .map(|data| data.len() as u64)
            .unwrap_or_default()
    }

    fn is_in_memory(&self) -> bool {
        self.is_loaded()
    }

    fn read_range(&self, offset: u64, dest: &mut [u8]) -> Result<()> {
        let data = self.loaded()?;
        check_range(data.len() as u64, offset, dest.len())?;
        let start = offset as usize;
        dest.copy_from_slice(&data[start..start + dest.len()]);
        Ok(())
    }

    fn bytes(&self) -> Result<Bytes> {
        self.loaded()
    }

    fn slice(&self, offset: u64, count: usize) -> Result<Bytes> {
        let data = self.loaded()?;
        check_range(data.len() as u64, offset, count)?;
        let start = offset as usize;
        Ok(data.slice(start..start + count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::tests::assert_round_trip;

    #[test]
    fn fails_until_loaded() {
        let buffer = BulkDataBuffer::new("urn:example:pixels/7");
        assert!(!buffer.is_loaded());
        assert!(matches!(buffer.bytes(), Err(Error::NotLoaded { .. })));
        assert!(matches!(buffer.slice(0, 1), Err(Error::NotLoaded { .. })));

        buffer.load(Bytes::from_static(b"fetched content")).unwrap();
        assert!(buffer.is_loaded());
        assert_round_trip(&buffer, b"fetched content");
        assert_eq!(&buffer.slice(8, 7).unwrap()[..], b"content");
    }

    #[test]
    fn loading_twice_is_rejected() {
        let buffer = BulkDataBuffer::new("urn:example:pixels/7");
        buffer.load(Bytes::from_static(b"once")).unwrap();
        assert!(matches!(
            buffer.load(Bytes::from_static(b"twice")),
            Err(Error::InvalidOperation(_))
        ));
        assert_eq!(&buffer.bytes().unwrap()[..], b"once");
    }
}
