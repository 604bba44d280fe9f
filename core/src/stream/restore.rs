//! Restore pipeline wiring: load → reconstruct → write + verify.

use std::collections::HashMap;
use std::io::Write;
use std::thread;

use crossbeam::channel::{bounded, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::cancel::{recv_or_cancel, send_or_cancel, CancelToken, ErrorSlot};
use crate::checksum::Checksum;
use crate::constants::SHARD_HEADER_LEN;
use crate::index::File;
use crate::scanner::Shard;
use crate::stream::io::{CappedBuffer, ShardOpener};
use crate::stream::parallelism::PipelineConfig;
use crate::stream::parity::ErasureCoder;
use crate::stream::record::RecordView;
use crate::stream::stage::{join_stage, StageReport};
use crate::telemetry::{Stage, TelemetrySnapshot, TelemetryTimer};
use crate::telomeres::{TelomereConfig, TelomereDecoder, TelomereError};
use crate::types::StreamError;

/// One batch as loaded from disk; `None` marks a hole.
struct LoadedBatch {
    sequence: u16,
    slots: Vec<Option<Vec<u8>>>,
}

/// Data shards of one batch, ready to write.
struct RebuiltBatch {
    sequence: u16,
    shards: Vec<Vec<u8>>,
}

pub(crate) fn run_restore_pipeline<O, W>(
    opener: &O,
    mut destination: W,
    file: &File,
    telomeres: TelomereConfig,
    checksum: Checksum,
    config: &PipelineConfig,
) -> Result<TelemetrySnapshot, StreamError>
where
    O: ShardOpener,
    W: Write + Send,
{
    file.validate()?;

    let mut timer = TelemetryTimer::new();
    let plan = plan_batches(file)?;
    let width = file.quorum as usize + file.parity as usize;
    info!(
        size = file.size,
        batches = file.batches,
        quorum = file.quorum,
        parity = file.parity,
        "start restore pipeline"
    );

    let cancel = config.cancel.child();
    let slot = ErrorSlot::new(cancel.clone());
    let cap = config.profile.inflight_batches;

    let (loaded_tx, loaded_rx) = bounded::<LoadedBatch>(cap);
    let (rebuilt_tx, rebuilt_rx) = bounded::<RebuiltBatch>(cap);

    let mut report = StageReport::default();

    thread::scope(|scope| {
        let (slot, cancel, plan) = (&slot, &cancel, &plan);

        // ---- Loader ----
        let loader = scope.spawn(move || {
            let mut report = StageReport::default();
            let mut loader = ShardLoader::new(opener, telomeres, checksum, file.shard_size, cancel);
            if let Err(err) = load_stage(&mut loader, plan, width, &loaded_tx, cancel, &mut report) {
                slot.fail(err);
            }
            drop(loaded_tx);
            report
        });

        // ---- Reconstruct ----
        let rebuild = scope.spawn(move || {
            let mut report = StageReport::default();
            if let Err(err) = rebuild_stage(file, &loaded_rx, &rebuilt_tx, cancel, &mut report) {
                slot.fail(err);
            }
            drop(rebuilt_tx);
            report
        });

        // ---- Writer ----
        let mut written = StageReport::default();
        if let Err(err) = write_stage(&mut destination, file, checksum, &rebuilt_rx, cancel, &mut written) {
            slot.fail(err);
        }
        drop(rebuilt_rx);

        report.merge(join_stage(loader, slot));
        report.merge(join_stage(rebuild, slot));
        report.merge(written);
    });

    slot.finish()?;

    timer.stage_times.merge(&report.times);
    timer.finish();
    info!(
        bytes = report.counters.bytes_written,
        reconstructed = report.counters.shards_reconstructed,
        "restore pipeline finished"
    );
    Ok(TelemetrySnapshot::from(&report.counters, &timer))
}

/// Usable shards grouped by batch, in order.
fn plan_batches(file: &File) -> Result<Vec<Vec<&Shard>>, StreamError> {
    let mut plan: Vec<Vec<&Shard>> = vec![Vec::new(); file.batches as usize];
    for shard in file.shards.iter().filter(|s| s.error.is_none()) {
        let batch = plan.get_mut(shard.tag.shard_batch as usize).ok_or_else(|| {
            StreamError::FileUnrecoverable(format!(
                "batch {} is outside of {} batches",
                shard.tag.shard_batch, file.batches
            ))
        })?;
        batch.push(shard);
    }
    Ok(plan)
}

/// Re-reads recorded shard ranges, keeping one decoder per source.
struct ShardLoader<'a, O: ShardOpener> {
    opener: &'a O,
    telomeres: TelomereConfig,
    checksum: Checksum,
    decoders: HashMap<String, TelomereDecoder<O::Source>>,
    chunk: CappedBuffer,
    shard_size: u64,
    cancel: &'a CancelToken,
}

impl<'a, O: ShardOpener> ShardLoader<'a, O> {
    fn new(
        opener: &'a O,
        telomeres: TelomereConfig,
        checksum: Checksum,
        shard_size: u64,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            opener,
            telomeres,
            checksum,
            decoders: HashMap::new(),
            // One byte of headroom so an oversized chunk is detectable.
            chunk: CappedBuffer::new(SHARD_HEADER_LEN + shard_size as usize + 1),
            shard_size,
            cancel,
        }
    }

    /// Payload of `shard`, or `None` if the bytes on disk no longer match its record.
    fn load(&mut self, shard: &Shard) -> Result<Option<Vec<u8>>, StreamError> {
        if !self.decoders.contains_key(&shard.source) {
            let source = self.opener.open(&shard.source)?;
            let decoder = TelomereDecoder::new(source, self.telomeres)?.with_cancel(self.cancel.clone());
            self.decoders.insert(shard.source.clone(), decoder);
        }
        let decoder = self
            .decoders
            .get_mut(&shard.source)
            .ok_or(StreamError::Pipeline("decoder cache miss"))?;

        decoder.seek_to(shard.first_byte)?;
        self.chunk.clear();
        match decoder.stream_chunk(&mut self.chunk) {
            Ok(Some(_)) => {}
            Ok(None) => return Ok(self.hole(shard, "chunk is gone")),
            Err(TelomereError::UnpairedEscape(_)) => {
                return Ok(self.hole(shard, "unpaired escape"))
            }
            Err(err) => return Err(err.into()),
        }

        if self.chunk.overflowed() {
            return Ok(self.hole(shard, "chunk grew past the recorded shard size"));
        }
        let view = match RecordView::parse(self.chunk.as_slice()) {
            Ok(view) => view,
            Err(_) => return Ok(self.hole(shard, "record too small")),
        };
        if view.verify(&self.checksum).is_err() {
            return Ok(self.hole(shard, "checksum mismatch"));
        }
        if view.tag != shard.tag || view.payload.len() as u64 != self.shard_size {
            return Ok(self.hole(shard, "tag or size differs from the index"));
        }

        Ok(Some(view.payload.to_vec()))
    }

    fn hole(&self, shard: &Shard, reason: &str) -> Option<Vec<u8>> {
        warn!(
            source = %shard.source,
            first_byte = shard.first_byte,
            batch = shard.tag.shard_batch,
            order = shard.tag.shard_order,
            reason,
            "shard failed to reload"
        );
        None
    }
}

fn load_stage<O: ShardOpener>(
    loader: &mut ShardLoader<'_, O>,
    plan: &[Vec<&Shard>],
    width: usize,
    tx: &Sender<LoadedBatch>,
    cancel: &CancelToken,
    report: &mut StageReport,
) -> Result<(), StreamError> {
    for (sequence, shards) in plan.iter().enumerate() {
        cancel.check()?;
        let sequence = sequence as u16;
        let mut slots: Vec<Option<Vec<u8>>> = vec![None; width];

        report.timed(Stage::Load, || -> Result<(), StreamError> {
            for shard in shards {
                let order = shard.tag.shard_order as usize;
                if order >= width || slots[order].is_some() {
                    continue;
                }
                slots[order] = loader.load(shard)?;
            }
            Ok(())
        })?;

        let present = slots.iter().filter(|s| s.is_some()).count();
        report.counters.add_loaded(present, width - present);
        debug!(batch = sequence, present, width, "batch loaded");
        send_or_cancel(tx, LoadedBatch { sequence, slots }, cancel)?;
    }
    Ok(())
}

fn rebuild_stage(
    file: &File,
    rx: &Receiver<LoadedBatch>,
    tx: &Sender<RebuiltBatch>,
    cancel: &CancelToken,
    report: &mut StageReport,
) -> Result<(), StreamError> {
    let quorum = file.quorum as usize;
    let coder = if file.parity > 0 {
        Some(ErasureCoder::new(quorum, file.parity as usize)?)
    } else {
        None
    };

    while let Some(LoadedBatch { sequence, mut slots }) = recv_or_cancel(rx, cancel)? {
        let available = slots.iter().filter(|s| s.is_some()).count();
        if available < quorum {
            return Err(StreamError::InsufficientShards {
                batch: sequence,
                available,
                required: quorum,
            });
        }

        let missing = slots[..quorum].iter().filter(|s| s.is_none()).count();
        if missing > 0 {
            let coder = coder.as_ref().ok_or(StreamError::InsufficientShards {
                batch: sequence,
                available,
                required: quorum,
            })?;
            report.timed(Stage::Reconstruct, || coder.reconstruct(&mut slots))?;
            report.counters.add_reconstructed(missing);
            debug!(batch = sequence, missing, "batch reconstructed");
        }

        let shards = slots
            .into_iter()
            .take(quorum)
            .collect::<Option<Vec<Vec<u8>>>>()
            .ok_or(StreamError::Pipeline("reconstruction left a hole"))?;
        report.counters.batches += 1;
        send_or_cancel(tx, RebuiltBatch { sequence, shards }, cancel)?;
    }
    Ok(())
}

fn write_stage<W: Write>(
    destination: &mut W,
    file: &File,
    checksum: Checksum,
    rx: &Receiver<RebuiltBatch>,
    cancel: &CancelToken,
    report: &mut StageReport,
) -> Result<(), StreamError> {
    let mut hasher = checksum.hasher();
    let mut written = 0u64;

    while let Some(batch) = recv_or_cancel(rx, cancel)? {
        report.timed(Stage::Write, || -> Result<(), StreamError> {
            for shard in &batch.shards {
                let remaining = file.size - written;
                if remaining == 0 {
                    break;
                }
                let take = (shard.len() as u64).min(remaining) as usize;
                destination.write_all(&shard[..take])?;
                hasher.update(&shard[..take]);
                written += take as u64;
            }
            Ok(())
        })?;
        debug!(batch = batch.sequence, written, "batch restored");
    }
    destination.flush()?;
    report.counters.add_restored(written as usize);

    if written != file.size {
        return Err(StreamError::SizeMismatch {
            expected: file.size,
            actual: written,
        });
    }

    let actual = report.timed(Stage::Verify, || hasher.finalize());
    if actual != file.checksum {
        return Err(StreamError::ChecksumMismatch {
            expected: file.checksum,
            actual,
        });
    }
    Ok(())
}
