use std::io::Read;

use crate::constants::PADDING_BYTE;
use crate::stream::io::read_exact_or_eof;
use crate::types::StreamError;

/// One quorum-sized slice of the source plus room for its parity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// `quorum` data shards followed by `redundancy` parity shards (zeroed until coded).
    pub shards: Vec<Vec<u8>>,
    pub sequence: u16,
    /// Bytes of the data shards that are not source bytes.
    pub padding: u64,
    /// Source bytes carried by this batch.
    pub loaded: usize,
}

/// Cuts a source into batches of equal-size shards.
#[derive(Debug, Clone)]
pub struct BatchLoader {
    quorum: usize,
    shards: usize,
    shard_size: usize,
    next: u32,
    done: bool,
}

impl BatchLoader {
    pub fn new(quorum: usize, redundancy: usize, shard_size: usize) -> Self {
        Self {
            quorum,
            shards: quorum + redundancy,
            shard_size,
            next: 0,
            done: false,
        }
    }

    /// Bytes of source covered by one batch.
    pub fn batch_bytes(&self) -> u64 {
        (self.quorum * self.shard_size) as u64
    }

    /// Read the next batch, or `None` once the source is exhausted.
    ///
    /// A short read pads the short shard with `PADDING_BYTE` and repeats it
    /// into the remaining data slots. An empty source still yields one
    /// fully padded batch so that it can be restored.
    pub fn load<R: Read + ?Sized>(&mut self, r: &mut R) -> Result<Option<Batch>, StreamError> {
        if self.done {
            return Ok(None);
        }

        let mut shards: Vec<Vec<u8>> = Vec::with_capacity(self.shards);
        let mut loaded = 0usize;

        for i in 0..self.quorum {
            let mut shard = vec![0u8; self.shard_size];
            let n = read_exact_or_eof(r, &mut shard)?;
            loaded += n;

            if n == self.shard_size {
                shards.push(shard);
                continue;
            }

            self.done = true;
            if n == 0 && i == 0 && self.next > 0 {
                return Ok(None);
            }

            let filler = if n == 0 && i > 0 {
                shards[i - 1].clone()
            } else {
                shard[n..].fill(PADDING_BYTE);
                shard
            };
            while shards.len() < self.quorum {
                shards.push(filler.clone());
            }
            break;
        }

        shards.resize_with(self.shards, || vec![0u8; self.shard_size]);

        let sequence = u16::try_from(self.next)
            .map_err(|_| StreamError::Validation("source needs more than 65536 batches".into()))?;
        self.next += 1;

        Ok(Some(Batch {
            shards,
            sequence,
            padding: self.batch_bytes() - loaded as u64,
            loaded,
        }))
    }
}
