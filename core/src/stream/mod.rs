//! stream: encode and restore pipelines.
//!
//! Encode: source → batch loader → Reed-Solomon parity → tag + checksum +
//! telomere frame → destination(s).
//!
//! Restore: index entry → shard reload → reconstruction → truncation and
//! whole-file verification → destination.

pub mod batch;
pub mod core;
pub(crate) mod encode;
pub mod io;
pub mod parallelism;
pub mod parity;
pub mod record;
pub(crate) mod restore;
pub mod writer;

pub(crate) mod stage;

pub use self::core::{
    encode,
    encode_scattered,
    restore,
    restore_with,
    source_checksum,
    EncodeParams,
    RestoreOptions,
};
pub use io::{FileOpener, MemoryOpener, ShardOpener};
pub use parallelism::{ParallelismProfile, PipelineConfig};
pub use parity::{ErasureCoder, ErasureError};
