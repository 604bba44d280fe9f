use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{MAX_BATCHES, MAX_SHARDS_PER_BATCH};
use crate::scanner::Shard;
use crate::types::StreamError;

/// All shards of one encode run, plus what `normalize` derives from them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub shards: Vec<Shard>,
    pub quorum: u8,
    /// Source size in bytes.
    pub size: u64,
    /// Payload bytes per shard.
    pub shard_size: u64,
    /// Parity shards per batch, as observed: largest usable order + 1 - quorum.
    pub parity: u8,
    /// Padding bytes at the end of the last batch.
    pub padding: u64,
    pub batches: u64,
    /// Whole-source checksum.
    pub checksum: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl File {
    /// Check that the entry is restorable and that its geometry is
    /// self-consistent. Entries loaded from JSON are not trusted.
    pub fn validate(&self) -> Result<(), StreamError> {
        let unrecoverable = |reason: String| Err(StreamError::FileUnrecoverable(reason));

        if let Some(err) = &self.error {
            return unrecoverable(err.clone());
        }
        if self.shards.is_empty() {
            return unrecoverable("index entry has no shards".into());
        }
        if self.quorum == 0 || self.shard_size == 0 {
            return unrecoverable(format!(
                "invalid geometry: quorum {}, shard size {}",
                self.quorum, self.shard_size
            ));
        }
        if self.quorum as usize + self.parity as usize > MAX_SHARDS_PER_BATCH {
            return unrecoverable(format!(
                "{} data and {} parity shards exceed {} per batch",
                self.quorum, self.parity, MAX_SHARDS_PER_BATCH
            ));
        }
        if self.batches > MAX_BATCHES {
            return unrecoverable(format!("{} batches exceed the limit of {}", self.batches, MAX_BATCHES));
        }
        let expected = self
            .shard_size
            .checked_mul(self.quorum as u64)
            .map(|per_batch| self.size.div_ceil(per_batch).max(1));
        if expected != Some(self.batches) {
            return unrecoverable(format!(
                "{} batches do not fit {} bytes in {}-byte shards",
                self.batches, self.size, self.shard_size
            ));
        }
        Ok(())
    }

    /// Derive aggregates, sort shards by (batch, order), flag duplicates and
    /// out-of-range batches, and check that every batch reaches quorum.
    /// Sets `error` instead of failing.
    pub fn normalize(&mut self) {
        self.error = None;

        let Some(first) = self.shards.iter().find(|s| s.error.is_none()) else {
            self.error = Some("there are no recoverable shards".into());
            return;
        };
        self.checksum = first.tag.source_crc;
        self.size = first.tag.source_size;
        self.quorum = first.tag.shard_quorum;
        self.shard_size = first.size;

        self.shards.sort_by_key(|s| (s.tag.shard_batch, s.tag.shard_order));

        if self.quorum == 0 || self.shard_size == 0 {
            self.error = Some(format!(
                "invalid geometry: quorum {}, shard size {}",
                self.quorum, self.shard_size
            ));
            return;
        }

        let per_batch = self.shard_size * self.quorum as u64;
        self.batches = self.size.div_ceil(per_batch).max(1);
        self.padding = self.batches * per_batch - self.size;
        if self.batches > MAX_BATCHES {
            self.error = Some(format!("{} batches exceed the limit of {}", self.batches, MAX_BATCHES));
            return;
        }

        let batches = self.batches;
        let mut usable = vec![0usize; batches as usize];
        let mut last: Option<(u16, u8)> = None;
        let mut max_order: u8 = 0;

        for shard in self.shards.iter_mut().filter(|s| s.error.is_none()) {
            let key = (shard.tag.shard_batch, shard.tag.shard_order);
            if key.0 as u64 >= batches {
                shard.error = Some(format!("batch {} is outside of {} batches", key.0, batches));
                continue;
            }
            if last == Some(key) {
                shard.error = Some("duplicate".into());
                continue;
            }
            last = Some(key);
            usable[key.0 as usize] += 1;
            max_order = max_order.max(key.1);
        }

        let quorum = self.quorum as usize;
        if let Some((batch, &count)) = usable.iter().enumerate().find(|(_, &n)| n < quorum) {
            self.error = Some(if count == 0 {
                format!("batch {} is missing", batch)
            } else {
                format!(
                    "batch {} has only {} usable shards out of {} required",
                    batch, count, quorum
                )
            });
            return;
        }

        self.parity = (max_order as usize + 1).saturating_sub(quorum) as u8;
        debug!(
            size = self.size,
            quorum = self.quorum,
            parity = self.parity,
            batches = self.batches,
            shards = self.shards.len(),
            "file normalized"
        );
    }
}
