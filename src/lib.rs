//! Buffer and stream abstractions for DICOM binary data.
//!
//! This crate is the data-access substrate of a DICOM toolkit. Higher layers
//! (dataset parsers, pixel-data handling, network PDU readers and writers)
//! pull typed values and byte buffers from a [`ByteSource`], and push them
//! into a [`ByteTarget`], without caring whether the bytes live in memory, in
//! a file, behind a memory mapping, or are still arriving on a socket.
//!
//! The three central abstractions:
//!
//! - [`ByteBuffer`]: a finite span of bytes that may or may not be resident
//!   in memory, with zero-copy composition ([`CompositeBuffer`],
//!   [`RangeBuffer`]) and lazily-backed variants ([`FileRegionBuffer`],
//!   [`StreamRegionBuffer`], [`MappedBuffer`], [`SpooledBuffer`]).
//! - [`ByteSource`]: a sequential endian-aware cursor with a rewindable
//!   marker, nested length milestones, and a policy-driven
//!   [`read_buffer`](ByteSource::read_buffer) that defers large payloads
//!   instead of copying them.
//! - [`ByteTarget`]: the append-only endian-aware writer.

pub mod buffer;
pub mod endian;
mod error;
pub mod source;
pub mod sweeper;
pub mod target;

pub use self::{
    buffer::{
        BulkDataBuffer,
        ByteBuffer,
        CompositeBuffer,
        EmptyBuffer,
        EvenLengthBuffer,
        FileRegionBuffer,
        MappedBuffer,
        MemoryBuffer,
        RangeBuffer,
        SharedBuffer,
        SpooledBuffer,
        StreamRegionBuffer,
        SwapBuffer,
    },
    endian::Endian,
    error::{
        Error,
        Result,
    },
    source::{
        BufferSource,
        ByteSource,
        FileSource,
        ReadPolicy,
        SourceCallback,
        StreamSource,
        UnseekableSource,
        DEFAULT_LARGE_OBJECT_THRESHOLD,
    },
    sweeper::TempFileSweeper,
    target::{
        ByteTarget,
        FileTarget,
        StreamTarget,
    },
};
