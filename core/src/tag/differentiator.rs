use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::TAG_PREFIX_LEN;
use crate::tag::encode::encode_tag;
use crate::tag::types::{Tag, TagError};

/// Grouping key for shards of one encode run.
///
/// Covers the tag prefix (source checksum, source size, quorum) and the
/// observed payload length, so two runs only collide when all four agree.
/// Displayed and serialized as `<26 hex digits>@<len>b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Differentiator {
    prefix: [u8; TAG_PREFIX_LEN],
    shard_size: u64,
}

impl Differentiator {
    pub fn new(tag: &Tag, shard_size: u64) -> Self {
        let wire = encode_tag(tag);
        let mut prefix = [0u8; TAG_PREFIX_LEN];
        prefix.copy_from_slice(&wire[..TAG_PREFIX_LEN]);
        Self { prefix, shard_size }
    }

    pub fn shard_size(&self) -> u64 {
        self.shard_size
    }
}

impl fmt::Display for Differentiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}b", hex::encode(self.prefix), self.shard_size)
    }
}

impl FromStr for Differentiator {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TagError::InvalidDifferentiator(s.to_string());
        let (hex_part, size_part) = s.split_once('@').ok_or_else(invalid)?;
        let size_part = size_part.strip_suffix('b').ok_or_else(invalid)?;

        let mut prefix = [0u8; TAG_PREFIX_LEN];
        hex::decode_to_slice(hex_part, &mut prefix).map_err(|_| invalid())?;
        let shard_size = size_part.parse::<u64>().map_err(|_| invalid())?;

        Ok(Self { prefix, shard_size })
    }
}

impl Serialize for Differentiator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Differentiator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
