use std::io::{ErrorKind, Read};

use crc32fast::Hasher;

use crate::cancel::CancelToken;
use crate::types::StreamError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum ChecksumAlg {
    /// CRC-32/IEEE (reflected 0xEDB88320).
    #[default]
    Crc32,
}

/// Checksum configuration shared by the encoder, scanner and restore.
///
/// The same value must be used on both ends: shards sealed with one seed
/// never verify under another.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct Checksum {
    pub alg: ChecksumAlg,
    pub seed: u32,
}

impl Checksum {
    pub fn new(alg: ChecksumAlg, seed: u32) -> Self {
        Self { alg, seed }
    }

    /// Running hasher seeded from this configuration.
    pub fn hasher(&self) -> Hasher {
        match self.alg {
            ChecksumAlg::Crc32 => Hasher::new_with_initial(self.seed),
        }
    }

    pub fn sum(&self, data: &[u8]) -> u32 {
        let mut hasher = self.hasher();
        hasher.update(data);
        hasher.finalize()
    }

    /// Per-shard checksum: tag bytes first, then payload.
    pub fn seal(&self, tag: &[u8], payload: &[u8]) -> u32 {
        let mut hasher = self.hasher();
        hasher.update(tag);
        hasher.update(payload);
        hasher.finalize()
    }

    /// Checksum and length of a whole stream, read to the end.
    pub fn source<R: Read>(&self, reader: &mut R, cancel: &CancelToken) -> Result<(u32, u64), StreamError> {
        let mut hasher = self.hasher();
        let mut buf = vec![0u8; 64 * 1024];
        let mut total = 0u64;
        loop {
            if cancel.is_cancelled() {
                return Err(StreamError::Cancelled);
            }
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(StreamError::Io(e)),
            };
            hasher.update(&buf[..n]);
            total += n as u64;
        }
        Ok((hasher.finalize(), total))
    }
}
