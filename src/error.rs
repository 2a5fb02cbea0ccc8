/// Errors surfaced by buffers, sources and targets.
///
/// I/O failures of the underlying file or stream are propagated unchanged;
/// this layer never retries them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A fixed-length source or buffer was asked for more bytes than remain.
    ///
    /// This is fatal to the current parse. Reads are never silently
    /// truncated.
    #[error("Tried to read {requested} bytes with only {remaining} remaining")]
    ShortRead { requested: u64, remaining: u64 },

    /// A bulk-data buffer was read before its content was fetched.
    ///
    /// Recoverable: fetch the content, call
    /// [`load`](crate::buffer::BulkDataBuffer::load), and retry.
    #[error("Bulk data at {uri:?} has not been loaded")]
    NotLoaded { uri: String },

    /// The operation is not valid in the current state.
    #[error("{0}")]
    InvalidOperation(&'static str),

    /// Underlying file or stream failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn short_read(requested: u64, remaining: u64) -> Self {
        Self::ShortRead {
            requested,
            remaining,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
