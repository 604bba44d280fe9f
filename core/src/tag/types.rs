use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::TAG_LEN;

/// Shard identity and position.
///
/// Layout (big-endian):
///
/// ```text
/// [ source_crc   (4) ]
/// [ source_size  (8) ]
/// [ shard_quorum (1) ]
/// [ shard_order  (1) ]
/// [ shard_batch  (2) ]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Tag {
    pub source_crc: u32,
    pub source_size: u64,
    pub shard_quorum: u8,
    pub shard_order: u8,
    pub shard_batch: u16,
}

impl Tag {
    pub const LEN: usize = TAG_LEN;

    /// First tag of an encode run: order 0, batch 0.
    pub fn for_source(source_crc: u32, source_size: u64, shard_quorum: u8) -> Self {
        Self {
            source_crc,
            source_size,
            shard_quorum,
            shard_order: 0,
            shard_batch: 0,
        }
    }

    /// Same run, different position.
    pub fn at(&self, shard_batch: u16, shard_order: u8) -> Self {
        Self { shard_batch, shard_order, ..*self }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TagError {
    #[error("tag needs {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("too many shards: batch sequence would exceed {max}")]
    TooManyShards { max: u64 },

    #[error("invalid shard limit {0}")]
    InvalidShardLimit(usize),

    #[error("invalid differentiator: {0}")]
    InvalidDifferentiator(String),
}
