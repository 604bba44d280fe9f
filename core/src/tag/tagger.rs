use byteorder::{BigEndian, ByteOrder};

use crate::constants::{MAX_BATCHES, MAX_SHARDS_PER_BATCH};
use crate::tag::decode::decode_tag;
use crate::tag::encode::write_tag;
use crate::tag::types::{Tag, TagError};

const ORDER_AT: usize = 13;
const BATCH_AT: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaggerMode {
    /// Every shard of every batch goes to one destination.
    Sequential { shard_limit: usize },
    /// One shard order per destination; only the batch advances.
    Lateral,
}

/// Mutable encoded tag, advanced once per written shard.
///
/// Batch never wraps: advancing past batch 65535 exhausts the tagger and
/// every later access fails with `TagError::TooManyShards`.
#[derive(Debug, Clone)]
pub struct Tagger {
    bytes: [u8; Tag::LEN],
    mode: TaggerMode,
    exhausted: bool,
}

impl Tagger {
    pub fn sequential(start: Tag, shard_limit: usize) -> Result<Self, TagError> {
        if shard_limit == 0 || shard_limit > MAX_SHARDS_PER_BATCH || start.shard_order as usize >= shard_limit {
            return Err(TagError::InvalidShardLimit(shard_limit));
        }
        Ok(Self::with_mode(start, TaggerMode::Sequential { shard_limit }))
    }

    pub fn lateral(start: Tag) -> Self {
        Self::with_mode(start, TaggerMode::Lateral)
    }

    fn with_mode(start: Tag, mode: TaggerMode) -> Self {
        let mut bytes = [0u8; Tag::LEN];
        write_tag(&start, &mut bytes);
        Self { bytes, mode, exhausted: false }
    }

    pub fn bytes(&self) -> Result<&[u8; Tag::LEN], TagError> {
        if self.exhausted {
            return Err(TagError::TooManyShards { max: MAX_BATCHES });
        }
        Ok(&self.bytes)
    }

    pub fn tag(&self) -> Result<Tag, TagError> {
        decode_tag(self.bytes()?)
    }

    pub fn advance(&mut self) {
        match self.mode {
            TaggerMode::Sequential { shard_limit } => {
                let order = self.bytes[ORDER_AT] as usize + 1;
                if order >= shard_limit {
                    self.bytes[ORDER_AT] = 0;
                    self.next_batch();
                } else {
                    self.bytes[ORDER_AT] = order as u8;
                }
            }
            TaggerMode::Lateral => self.next_batch(),
        }
    }

    fn next_batch(&mut self) {
        let batch = BigEndian::read_u16(&self.bytes[BATCH_AT..]);
        match batch.checked_add(1) {
            Some(next) => BigEndian::write_u16(&mut self.bytes[BATCH_AT..], next),
            None => self.exhausted = true,
        }
    }
}
