//! Fixed-width shard tag.
//!
//! Sixteen big-endian bytes identify which encode run a shard belongs to
//! (source checksum, source size, quorum) and where it sits inside it
//! (order within the batch, batch sequence).

pub mod types;
pub mod encode;
pub mod decode;
pub mod tagger;
pub mod differentiator;

pub use types::{Tag, TagError};
pub use encode::encode_tag;
pub use decode::decode_tag;
pub use tagger::Tagger;
pub use differentiator::Differentiator;
