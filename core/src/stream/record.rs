use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;

use crate::checksum::Checksum;
use crate::constants::{CHECKSUM_LEN, SHARD_HEADER_LEN};
use crate::tag::{decode_tag, Tag};

/// Why a decoded chunk is not a usable shard record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordFault {
    #[error("shard too small: {0} bytes")]
    TooSmall(usize),

    #[error("shard too large: {0} bytes")]
    TooLarge(u64),

    #[error("checksum mismatch: stored {stored:08x}, computed {computed:08x}")]
    ChecksumMismatch { stored: u32, computed: u32 },
}

/// Borrowed view of one shard record:
///
/// ```text
/// [ checksum (4, big-endian) ]
/// [ tag      (16)            ]
/// [ payload  (N >= 1)        ]
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RecordView<'a> {
    pub checksum: u32,
    pub tag: Tag,
    pub tag_bytes: &'a [u8],
    pub payload: &'a [u8],
}

impl<'a> RecordView<'a> {
    /// Split a decoded chunk. A record needs at least one payload byte.
    pub fn parse(wire: &'a [u8]) -> Result<Self, RecordFault> {
        if wire.len() <= SHARD_HEADER_LEN {
            return Err(RecordFault::TooSmall(wire.len()));
        }
        let tag_bytes = &wire[CHECKSUM_LEN..SHARD_HEADER_LEN];
        let tag = decode_tag(tag_bytes).map_err(|_| RecordFault::TooSmall(wire.len()))?;
        Ok(Self {
            checksum: BigEndian::read_u32(&wire[..CHECKSUM_LEN]),
            tag,
            tag_bytes,
            payload: &wire[SHARD_HEADER_LEN..],
        })
    }

    pub fn verify(&self, checksum: &Checksum) -> Result<(), RecordFault> {
        let computed = checksum.seal(self.tag_bytes, self.payload);
        if computed != self.checksum {
            return Err(RecordFault::ChecksumMismatch {
                stored: self.checksum,
                computed,
            });
        }
        Ok(())
    }
}

/// Checksum and tag prefix written ahead of `payload`.
pub fn record_header(checksum: &Checksum, tag: &[u8; Tag::LEN], payload: &[u8]) -> [u8; SHARD_HEADER_LEN] {
    let mut head = [0u8; SHARD_HEADER_LEN];
    BigEndian::write_u32(&mut head[..CHECKSUM_LEN], checksum.seal(tag, payload));
    head[CHECKSUM_LEN..].copy_from_slice(tag);
    head
}
