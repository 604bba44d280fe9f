//! Stable public API: encode, scatter, restore.

use std::io::{Read, Seek, SeekFrom, Write};
use std::time::Instant;

use tracing::info;

use crate::cancel::CancelToken;
use crate::checksum::Checksum;
use crate::constants::{
    DEFAULT_QUORUM, DEFAULT_REDUNDANCY, DEFAULT_SHARD_SIZE, MAX_BATCHES, MAX_SHARDS_PER_BATCH,
};
use crate::index::File;
use crate::stream::batch::BatchLoader;
use crate::stream::encode::{run_encode_pipeline, Route};
use crate::stream::io::{FileOpener, ShardOpener};
use crate::stream::parallelism::PipelineConfig;
use crate::stream::parity::ErasureCoder;
use crate::stream::restore::run_restore_pipeline;
use crate::stream::writer::ShardWriter;
use crate::tag::{Tag, Tagger};
use crate::telemetry::{Stage, TelemetrySnapshot, TelemetryTimer};
use crate::telomeres::TelomereConfig;
use crate::types::StreamError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeParams {
    /// Data shards per batch; also the number of shards needed to rebuild it.
    pub quorum: u8,
    /// Parity shards per batch.
    pub redundancy: u8,
    /// Payload bytes per shard.
    pub shard_size: usize,
    pub telomeres: TelomereConfig,
    pub checksum: Checksum,
}

impl Default for EncodeParams {
    fn default() -> Self {
        Self {
            quorum: DEFAULT_QUORUM,
            redundancy: DEFAULT_REDUNDANCY,
            shard_size: DEFAULT_SHARD_SIZE,
            telomeres: TelomereConfig::default(),
            checksum: Checksum::default(),
        }
    }
}

impl EncodeParams {
    pub fn new(quorum: u8, redundancy: u8, shard_size: usize) -> Self {
        Self {
            quorum,
            redundancy,
            shard_size,
            ..Self::default()
        }
    }

    pub fn total_shards(&self) -> usize {
        self.quorum as usize + self.redundancy as usize
    }

    pub fn validate(&self) -> Result<(), StreamError> {
        validate_geometry(self.quorum, self.redundancy, self.shard_size)?;
        self.telomeres.validate()?;
        Ok(())
    }

    /// Batches needed for `size` source bytes (an empty source still takes one).
    pub fn batches_for(&self, size: u64) -> u64 {
        let per_batch = self.quorum as u64 * self.shard_size as u64;
        size.div_ceil(per_batch).max(1)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreOptions {
    pub telomeres: TelomereConfig,
    pub checksum: Checksum,
}

pub fn validate_geometry(quorum: u8, redundancy: u8, shard_size: usize) -> Result<(), StreamError> {
    if quorum == 0 {
        return Err(StreamError::Validation("quorum must be at least 1".into()));
    }
    if redundancy == 0 {
        return Err(StreamError::Validation("redundancy must be at least 1".into()));
    }
    let total = quorum as usize + redundancy as usize;
    if total > MAX_SHARDS_PER_BATCH {
        return Err(StreamError::Validation(format!(
            "quorum + redundancy = {} exceeds {} shards per batch",
            total, MAX_SHARDS_PER_BATCH
        )));
    }
    if shard_size == 0 {
        return Err(StreamError::Validation("shard size must be at least 1".into()));
    }
    Ok(())
}

/// Whole-stream checksum and size under `checksum`, read from the current position to the end.
pub fn source_checksum<R: Read>(
    reader: &mut R,
    checksum: &Checksum,
    cancel: &CancelToken,
) -> Result<(u32, u64), StreamError> {
    checksum.source(reader, cancel)
}

/// Encode `source` into one telomere-framed shard stream.
///
/// The source is read twice: once for its checksum and size, which every
/// tag carries, and once for the batches.
pub fn encode<R, W>(
    source: R,
    destination: W,
    params: &EncodeParams,
    config: &PipelineConfig,
) -> Result<TelemetrySnapshot, StreamError>
where
    R: Read + Seek + Send,
    W: Write + Send,
{
    params.validate()?;
    config.profile.validate()?;

    let mut timer = TelemetryTimer::new();
    let (source, tag) = stamp_source(source, params, config, &mut timer)?;
    let tagger = Tagger::sequential(tag, params.total_shards())?;
    let writer = ShardWriter::new(destination, tagger, params.telomeres, params.checksum)?;

    run_encode_pipeline(
        source,
        vec![writer],
        BatchLoader::new(params.quorum as usize, params.redundancy as usize, params.shard_size),
        ErasureCoder::new(params.quorum as usize, params.redundancy as usize)?,
        Route::Sequential,
        config,
        timer,
    )
}

/// Encode `source` with shard order `k` of every batch written to `destinations[k]`.
///
/// Losing any `redundancy` destinations leaves the source recoverable.
pub fn encode_scattered<R, W>(
    source: R,
    destinations: Vec<W>,
    params: &EncodeParams,
    config: &PipelineConfig,
) -> Result<TelemetrySnapshot, StreamError>
where
    R: Read + Seek + Send,
    W: Write + Send,
{
    params.validate()?;
    config.profile.validate()?;
    if destinations.len() != params.total_shards() {
        return Err(StreamError::Validation(format!(
            "scattered encode needs {} destinations, got {}",
            params.total_shards(),
            destinations.len()
        )));
    }

    let mut timer = TelemetryTimer::new();
    let (source, tag) = stamp_source(source, params, config, &mut timer)?;

    let writers = destinations
        .into_iter()
        .enumerate()
        .map(|(order, destination)| {
            let tagger = Tagger::lateral(tag.at(0, order as u8));
            ShardWriter::new(destination, tagger, params.telomeres, params.checksum)
        })
        .collect::<Result<Vec<_>, _>>()?;

    run_encode_pipeline(
        source,
        writers,
        BatchLoader::new(params.quorum as usize, params.redundancy as usize, params.shard_size),
        ErasureCoder::new(params.quorum as usize, params.redundancy as usize)?,
        Route::Scattered,
        config,
        timer,
    )
}

/// Checksum the source, rewind, and build the first tag of the run.
fn stamp_source<R: Read + Seek>(
    mut source: R,
    params: &EncodeParams,
    config: &PipelineConfig,
    timer: &mut TelemetryTimer,
) -> Result<(std::io::Take<R>, Tag), StreamError> {
    let started = Instant::now();
    let start = source.stream_position()?;
    let (crc, size) = params.checksum.source(&mut source, &config.cancel)?;
    source.seek(SeekFrom::Start(start))?;
    timer.add_stage_time(Stage::Checksum, started.elapsed());

    let batches = params.batches_for(size);
    if batches > MAX_BATCHES {
        return Err(StreamError::Validation(format!(
            "source of {} bytes needs {} batches, at most {} fit in a tag",
            size, batches, MAX_BATCHES
        )));
    }

    info!(size, checksum = %format!("{crc:08x}"), batches, "source stamped");
    Ok((source.take(size), Tag::for_source(crc, size, params.quorum)))
}

/// Restore a normalized index entry from files on disk.
pub fn restore<W: Write + Send>(
    destination: W,
    file: &File,
    options: &RestoreOptions,
    config: &PipelineConfig,
) -> Result<TelemetrySnapshot, StreamError> {
    restore_with(&FileOpener, destination, file, options, config)
}

/// Restore a normalized index entry, opening shard sources through `opener`.
pub fn restore_with<O, W>(
    opener: &O,
    destination: W,
    file: &File,
    options: &RestoreOptions,
    config: &PipelineConfig,
) -> Result<TelemetrySnapshot, StreamError>
where
    O: ShardOpener,
    W: Write + Send,
{
    options.telomeres.validate()?;
    config.profile.validate()?;
    run_restore_pipeline(opener, destination, file, options.telomeres, options.checksum, config)
}
