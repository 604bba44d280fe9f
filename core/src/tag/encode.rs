use byteorder::{BigEndian, ByteOrder};

use crate::tag::types::Tag;

/// Encode a tag into its canonical 16-byte form.
pub fn encode_tag(tag: &Tag) -> [u8; Tag::LEN] {
    let mut out = [0u8; Tag::LEN];
    write_tag(tag, &mut out);
    out
}

#[inline]
pub(crate) fn write_tag(tag: &Tag, out: &mut [u8; Tag::LEN]) {
    BigEndian::write_u32(&mut out[0..4], tag.source_crc);
    BigEndian::write_u64(&mut out[4..12], tag.source_size);
    out[12] = tag.shard_quorum;
    out[13] = tag.shard_order;
    BigEndian::write_u16(&mut out[14..16], tag.shard_batch);
}
