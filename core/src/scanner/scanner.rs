use std::collections::VecDeque;
use std::io::{Read, Seek};

use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::scanner::policy::ScanPolicy;
use crate::scanner::sniffer::{SniffError, Sniffer};
use crate::scanner::types::{ScanOptions, Shard};
use crate::stream::io::CappedBuffer;
use crate::stream::record::{RecordFault, RecordView};
use crate::tag::{Differentiator, Tag};
use crate::telomeres::{TelomereDecoder, TelomereError};
use crate::types::StreamError;

const FOREIGN_SHARD: &str = "foreign shard";

/// Reads shard records out of one source.
pub struct Scanner<R: Read + Seek> {
    source: String,
    decoder: TelomereDecoder<R>,
    options: ScanOptions,
    chunk: CappedBuffer,
    /// Shards read ahead by `sniff`, returned before reading further.
    pending: VecDeque<Shard>,
    signature: Option<Differentiator>,
}

impl<R: Read + Seek> Scanner<R> {
    pub fn new(source: impl Into<String>, reader: R, options: ScanOptions) -> Result<Self, StreamError> {
        let decoder = TelomereDecoder::new(reader, options.telomeres)?;
        Ok(Self {
            source: source.into(),
            decoder,
            chunk: CappedBuffer::new(options.max_shard_bytes),
            options,
            pending: VecDeque::new(),
            signature: None,
        })
    }

    /// Stop reading, even inside one long chunk, once `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.decoder = self.decoder.with_cancel(cancel);
        self
    }

    /// Signature chosen by the last conclusive `sniff`.
    pub fn signature(&self) -> Option<Differentiator> {
        self.signature
    }

    /// Next shard, valid or not. `None` at end of input.
    ///
    /// Rejected shards are reported to the diagnostics sink; with
    /// `ScanPolicy::StopOnFirstError` they also end the scan.
    pub fn next_shard(&mut self) -> Result<Option<Shard>, StreamError> {
        let mut shard = match self.pending.pop_front() {
            Some(shard) => shard,
            None => match self.read_shard()? {
                Some(shard) => shard,
                None => return Ok(None),
            },
        };

        if let Some(signature) = self.signature {
            if shard.error.is_none() && shard.signature() != signature {
                shard.error = Some(FOREIGN_SHARD.to_string());
            }
        }

        if let Some(reason) = &shard.error {
            self.options.sink.rejected(&shard);
            if self.options.policy == ScanPolicy::StopOnFirstError {
                return Err(StreamError::ShardRejected {
                    source: shard.source.clone(),
                    first_byte: shard.first_byte,
                    reason: reason.clone(),
                });
            }
        }

        Ok(Some(shard))
    }

    /// Vote over the next `samples` valid shards. Shards read while sampling
    /// are kept and returned by later `next_shard` calls.
    ///
    /// A conclusive vote makes every later shard with another signature
    /// foreign. An inconclusive one is logged and filters nothing.
    pub fn sniff(&mut self, samples: usize) -> Result<Option<Differentiator>, StreamError> {
        let mut sniffer = Sniffer::new(samples)?;

        for shard in &self.pending {
            if shard.is_valid() && !sniffer.is_full() {
                sniffer.sample(shard.signature());
            }
        }
        while !sniffer.is_full() {
            match self.read_shard()? {
                Some(shard) => {
                    if shard.is_valid() {
                        sniffer.sample(shard.signature());
                    }
                    self.pending.push_back(shard);
                }
                None => break,
            }
        }

        match sniffer.verdict() {
            Ok((signature, count)) => {
                debug!(source = %self.source, %signature, count, total = sniffer.total(), "sniffed dominant signature");
                self.signature = Some(signature);
                Ok(Some(signature))
            }
            Err(err @ SniffError::Inconclusive { .. }) => {
                warn!(source = %self.source, error = %err, "sniffing inconclusive, no shards filtered");
                self.signature = None;
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn read_shard(&mut self) -> Result<Option<Shard>, StreamError> {
        if !self.decoder.seek_chunk()? {
            return Ok(None);
        }
        let first_byte = self.decoder.cursor();
        self.chunk.clear();

        let outcome = self.decoder.stream_chunk(&mut self.chunk);
        let last_byte = self.decoder.cursor();

        let mut shard = Shard {
            source: self.source.clone(),
            first_byte,
            last_byte,
            size: 0,
            checksum: 0,
            tag: Tag::default(),
            error: None,
        };

        match outcome {
            Ok(Some(_)) => {}
            Ok(None) => return Ok(None),
            Err(TelomereError::UnpairedEscape(at)) => {
                shard.error = Some(format!("unpaired escape at byte {at}"));
                return Ok(Some(shard));
            }
            Err(err) => return Err(err.into()),
        }

        if self.chunk.overflowed() {
            shard.error = Some(RecordFault::TooLarge(self.chunk.offered()).to_string());
            return Ok(Some(shard));
        }

        match RecordView::parse(self.chunk.as_slice()) {
            Ok(view) => {
                shard.size = view.payload.len() as u64;
                shard.checksum = view.checksum;
                shard.tag = view.tag;
                if let Err(fault) = view.verify(&self.options.checksum) {
                    shard.error = Some(fault.to_string());
                }
            }
            Err(fault) => shard.error = Some(fault.to_string()),
        }

        Ok(Some(shard))
    }
}
