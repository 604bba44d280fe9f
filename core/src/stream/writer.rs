use std::io::Write;

use crate::checksum::Checksum;
use crate::constants::SHARD_HEADER_LEN;
use crate::stream::record::record_header;
use crate::tag::Tagger;
use crate::telomeres::{TelomereConfig, TelomereEncoder};
use crate::types::StreamError;

/// Writes framed shard records to one destination.
///
/// Each record is `checksum | tag | payload`, preceded by a boundary on
/// the first write and followed by one after every record.
pub struct ShardWriter<W: Write> {
    encoder: TelomereEncoder<W>,
    tagger: Tagger,
    checksum: Checksum,
    started: bool,
}

impl<W: Write> ShardWriter<W> {
    pub fn new(
        destination: W,
        tagger: Tagger,
        telomeres: TelomereConfig,
        checksum: Checksum,
    ) -> Result<Self, StreamError> {
        Ok(Self {
            encoder: TelomereEncoder::new(destination, telomeres)?,
            tagger,
            checksum,
            started: false,
        })
    }

    /// Frame one shard and advance the tagger. Returns the unescaped record length.
    pub fn write_shard(&mut self, payload: &[u8]) -> Result<usize, StreamError> {
        if !self.started {
            self.encoder.cut()?;
            self.started = true;
        }

        let tag = *self.tagger.bytes()?;
        let head = record_header(&self.checksum, &tag, payload);
        self.encoder.write_all(&head)?;
        self.encoder.write_all(payload)?;
        self.encoder.cut()?;
        self.tagger.advance();

        Ok(SHARD_HEADER_LEN + payload.len())
    }

    pub fn finish(mut self) -> Result<W, StreamError> {
        if !self.started {
            self.encoder.cut()?;
        }
        Ok(self.encoder.into_inner()?)
    }
}
