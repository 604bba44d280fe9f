//! gopar3-core
//!
//! Erasure-coded shard files that survive partial loss and corruption.
//! A source is cut into batches of equal-size shards, Reed-Solomon parity is
//! added, and every shard is written with a checksum and a self-describing
//! tag between telomere boundaries. Scanning recovers shards from damaged or
//! concatenated files, the index regroups them by encode run, and restore
//! rebuilds the original bytes.

#![forbid(unsafe_code)]

// Shared and top level
pub mod constants;
pub mod types;
pub mod checksum;
pub mod cancel;
pub mod telemetry;

// Wire formats
pub mod telomeres;
pub mod tag;

// Discovery
pub mod scanner;
pub mod index;

// Pipelines
pub mod stream;

// -----------------------------------------------------------------------------
// Prelude (Rust users)
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::cancel::CancelToken;
    pub use crate::checksum::{Checksum, ChecksumAlg};
    pub use crate::index::{scan_files, scan_sources, File, Index};
    pub use crate::scanner::{ScanOptions, ScanPolicy, Scanner, Shard};
    pub use crate::stream::{
        encode, encode_scattered, restore, restore_with, source_checksum, EncodeParams,
        FileOpener, MemoryOpener, ParallelismProfile, PipelineConfig, RestoreOptions,
        ShardOpener,
    };
    pub use crate::tag::{Differentiator, Tag, Tagger};
    pub use crate::telemetry::TelemetrySnapshot;
    pub use crate::telomeres::{TelomereConfig, TelomereDecoder, TelomereEncoder};
    pub use crate::types::StreamError;
}
