use std::io;

use crate::{
    scanner::SniffError,
    stream::parity::ErasureError,
    tag::TagError,
    telomeres::TelomereError,
};

/// Unified error for encode, scan and restore.
/// - `From<T>` impls let `?` cross module boundaries inside the pipelines.
/// - Per-shard problems are not reported here; they are recorded on `Shard` and `File`.
#[derive(Debug)]
pub enum StreamError {
    /// I/O on a source, destination or shard file.
    Io(io::Error),

    /// Telomere framing error (unpaired escape, bad configuration).
    Telomere(TelomereError),

    /// Shard tag error (truncated tag, tagger exhausted).
    Tag(TagError),

    /// Reed-Solomon construction or coding failure.
    Erasure(ErasureError),

    /// Majority vote could not pick a signature.
    Sniff(SniffError),

    /// A pipeline stage stopped without reporting a cause.
    Pipeline(&'static str),

    /// The operation was cancelled through its `CancelToken`.
    Cancelled,

    /// A shard failed validation while scanning with `ScanPolicy::StopOnFirstError`.
    ShardRejected { source: String, first_byte: u64, reason: String },

    /// Restore was asked to rebuild a `File` whose index entry carries an error.
    FileUnrecoverable(String),

    /// A batch has fewer usable shards than its quorum.
    InsufficientShards { batch: u16, available: usize, required: usize },

    /// Restored byte count differs from the source size.
    SizeMismatch { expected: u64, actual: u64 },

    /// Whole-file checksum of the restored bytes differs from the tag.
    ChecksumMismatch { expected: u32, actual: u32 },

    /// Generic parameter validation with a descriptive message.
    Validation(String),
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamError::Io(e) => write!(f, "I/O error: {}", e),
            StreamError::Telomere(e) => write!(f, "telomere error: {}", e),
            StreamError::Tag(e) => write!(f, "tag error: {}", e),
            StreamError::Erasure(e) => write!(f, "erasure coding error: {}", e),
            StreamError::Sniff(e) => write!(f, "sniff error: {}", e),
            StreamError::Pipeline(msg) => write!(f, "pipeline error: {}", msg),
            StreamError::Cancelled => write!(f, "operation cancelled"),
            StreamError::ShardRejected { source, first_byte, reason } => {
                write!(f, "shard at {}:{} rejected: {}", source, first_byte, reason)
            }
            StreamError::FileUnrecoverable(msg) => write!(f, "file cannot be restored: {}", msg),
            StreamError::InsufficientShards { batch, available, required } => write!(
                f,
                "batch {} has {} usable shards, {} required",
                batch, available, required
            ),
            StreamError::SizeMismatch { expected, actual } => {
                write!(f, "restored {} bytes, expected {}", actual, expected)
            }
            StreamError::ChecksumMismatch { expected, actual } => write!(
                f,
                "restored checksum {:08x} does not match source checksum {:08x}",
                actual, expected
            ),
            StreamError::Validation(msg) => write!(f, "validation error: {}", msg),
        }
    }
}

impl std::error::Error for StreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StreamError::Io(e) => Some(e),
            StreamError::Telomere(e) => Some(e),
            StreamError::Tag(e) => Some(e),
            StreamError::Erasure(e) => Some(e),
            StreamError::Sniff(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StreamError {
    fn from(e: io::Error) -> Self {
        StreamError::Io(e)
    }
}

impl From<TelomereError> for StreamError {
    fn from(e: TelomereError) -> Self {
        match e {
            TelomereError::Io(e) => StreamError::Io(e),
            TelomereError::Cancelled => StreamError::Cancelled,
            other => StreamError::Telomere(other),
        }
    }
}

impl From<TagError> for StreamError {
    fn from(e: TagError) -> Self {
        StreamError::Tag(e)
    }
}

impl From<ErasureError> for StreamError {
    fn from(e: ErasureError) -> Self {
        StreamError::Erasure(e)
    }
}

impl From<SniffError> for StreamError {
    fn from(e: SniffError) -> Self {
        StreamError::Sniff(e)
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(e: serde_json::Error) -> Self {
        StreamError::Validation(format!("index serialization: {}", e))
    }
}
