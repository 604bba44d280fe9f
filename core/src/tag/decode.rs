use byteorder::{BigEndian, ByteOrder};

use crate::tag::types::{Tag, TagError};

/// Decode the first 16 bytes of `wire` as a tag. Trailing bytes are ignored.
#[inline]
pub fn decode_tag(wire: &[u8]) -> Result<Tag, TagError> {
    if wire.len() < Tag::LEN {
        return Err(TagError::Truncated {
            expected: Tag::LEN,
            actual: wire.len(),
        });
    }

    Ok(Tag {
        source_crc: BigEndian::read_u32(&wire[0..4]),
        source_size: BigEndian::read_u64(&wire[4..12]),
        shard_quorum: wire[12],
        shard_order: wire[13],
        shard_batch: BigEndian::read_u16(&wire[14..16]),
    })
}
