//! Reed-Solomon wrapper over GF(2^8).
//!
//! Parity rows depend only on the row index and the data shard count, so a
//! coder built with fewer parity shards than were encoded still repairs
//! batches whose trailing parity shards were never observed.

use reed_solomon_erasure::galois_8::ReedSolomon;
use thiserror::Error;
use tracing::debug;

use crate::constants::MAX_SHARDS_PER_BATCH;

#[derive(Debug, Error)]
pub enum ErasureError {
    #[error("invalid shard counts: {data} data + {parity} parity")]
    InvalidShape { data: usize, parity: usize },

    #[error("expected {expected} shard slots, got {actual}")]
    WrongShardCount { expected: usize, actual: usize },

    #[error(transparent)]
    Coding(#[from] reed_solomon_erasure::Error),
}

pub struct ErasureCoder {
    rs: ReedSolomon,
    data: usize,
    parity: usize,
}

impl ErasureCoder {
    pub fn new(data: usize, parity: usize) -> Result<Self, ErasureError> {
        if data == 0 || parity == 0 || data + parity > MAX_SHARDS_PER_BATCH {
            return Err(ErasureError::InvalidShape { data, parity });
        }
        let rs = ReedSolomon::new(data, parity)?;
        debug!(data, parity, "erasure coder ready");
        Ok(Self { rs, data, parity })
    }

    pub fn data_shards(&self) -> usize {
        self.data
    }

    pub fn parity_shards(&self) -> usize {
        self.parity
    }

    pub fn total_shards(&self) -> usize {
        self.data + self.parity
    }

    /// Fill the parity slots from the data slots. All shards must share one length.
    pub fn encode(&self, shards: &mut [Vec<u8>]) -> Result<(), ErasureError> {
        self.check_width(shards.len())?;
        self.rs.encode(shards)?;
        Ok(())
    }

    /// Fill missing data slots from any `data` present slots.
    /// Missing parity slots stay `None`.
    pub fn reconstruct(&self, shards: &mut [Option<Vec<u8>>]) -> Result<(), ErasureError> {
        self.check_width(shards.len())?;
        self.rs.reconstruct_data(shards)?;
        Ok(())
    }

    fn check_width(&self, actual: usize) -> Result<(), ErasureError> {
        if actual != self.total_shards() {
            return Err(ErasureError::WrongShardCount {
                expected: self.total_shards(),
                actual,
            });
        }
        Ok(())
    }
}
