//! Error types for the bpng core.
//!
//! The transform and quantization path is total and never produces an
//! error. Everything that can fail lives at the edges: importing samples,
//! serializing fixed-width fields, compressing the payload, writing the
//! destination, and reading a container back.

use std::path::PathBuf;

use thiserror::Error;

use crate::frame::Channel;

#[derive(Debug, Error)]
pub enum Error {
    /// The source image could not be read or decoded.
    #[error("import failed: {0}")]
    Import(String),

    /// A value does not fit in the fixed byte width it is serialized into.
    #[error("{value} cannot be represented in {width} byte(s)")]
    EncodeRange { value: u64, width: usize },

    /// The destination could not be created or written.
    #[error("cannot write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The compression collaborator failed.
    #[error("compression failed: {0}")]
    Compress(String),

    #[error("{channel:?} sample ({x}, {y}) is outside the {width}x{height} frame")]
    OutOfBounds {
        channel: Channel,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },

    #[error("invalid block size {0}: must be at least 1")]
    InvalidBlockSize(usize),

    #[error("sample buffer length mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid image header: {0}")]
    InvalidHeader(String),

    /// The byte stream is not a well-formed container.
    #[error("malformed container: {0}")]
    Format(String),

    #[error("{tag} chunk checksum mismatch: stored {expected:#010x}, computed {actual:#010x}")]
    ChecksumMismatch {
        tag: String,
        expected: u32,
        actual: u32,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
