//! Encode pipeline wiring: read → parity → frame.
//!
//! Three stages joined by bounded queues. Batches move by ownership and are
//! written in the order they were read.

use std::io::{Read, Write};
use std::thread;
use std::time::Instant;

use crossbeam::channel::{bounded, Receiver, Sender};
use tracing::{debug, info};

use crate::cancel::{recv_or_cancel, send_or_cancel, CancelToken, ErrorSlot};
use crate::stream::batch::{Batch, BatchLoader};
use crate::stream::parallelism::PipelineConfig;
use crate::stream::parity::ErasureCoder;
use crate::stream::stage::{join_stage, StageReport};
use crate::stream::writer::ShardWriter;
use crate::telemetry::{Stage, TelemetrySnapshot, TelemetryTimer};
use crate::types::StreamError;

/// Where each shard of a batch goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Route {
    /// Every shard to the single writer.
    Sequential,
    /// Shard order `k` to writer `k`.
    Scattered,
}

pub(crate) fn run_encode_pipeline<R, W>(
    mut source: R,
    mut writers: Vec<ShardWriter<W>>,
    mut loader: BatchLoader,
    coder: ErasureCoder,
    route: Route,
    config: &PipelineConfig,
    mut timer: TelemetryTimer,
) -> Result<TelemetrySnapshot, StreamError>
where
    R: Read + Send,
    W: Write + Send,
{
    let expected = match route {
        Route::Sequential => 1,
        Route::Scattered => coder.total_shards(),
    };
    if writers.len() != expected {
        return Err(StreamError::Validation(format!(
            "expected {} destinations, got {}",
            expected,
            writers.len()
        )));
    }

    info!(
        data = coder.data_shards(),
        parity = coder.parity_shards(),
        destinations = writers.len(),
        "start encode pipeline"
    );

    let cancel = config.cancel.child();
    let slot = ErrorSlot::new(cancel.clone());
    let cap = config.profile.inflight_batches;

    let (batch_tx, batch_rx) = bounded::<Batch>(cap);
    let (coded_tx, coded_rx) = bounded::<Batch>(cap);

    let mut report = StageReport::default();

    thread::scope(|scope| {
        let (slot, cancel) = (&slot, &cancel);

        // ---- Reader ----
        let reader = scope.spawn(move || {
            let mut report = StageReport::default();
            if let Err(err) = read_stage(&mut source, &mut loader, &batch_tx, cancel, &mut report) {
                slot.fail(err);
            }
            drop(batch_tx);
            report
        });

        // ---- Parity ----
        let parity = scope.spawn(move || {
            let mut report = StageReport::default();
            if let Err(err) = parity_stage(&coder, &batch_rx, &coded_tx, cancel, &mut report) {
                slot.fail(err);
            }
            drop(coded_tx);
            report
        });

        // ---- Writer ----
        let mut written = StageReport::default();
        if let Err(err) = write_stage(&mut writers, route, &coded_rx, cancel, &mut written) {
            slot.fail(err);
        }
        drop(coded_rx);

        report.merge(join_stage(reader, slot));
        report.merge(join_stage(parity, slot));
        report.merge(written);
    });

    slot.finish()?;

    for writer in writers {
        writer.finish()?;
    }

    timer.stage_times.merge(&report.times);
    timer.finish();
    info!(
        batches = report.counters.batches,
        shards = report.counters.shards_written,
        "encode pipeline finished"
    );
    Ok(TelemetrySnapshot::from(&report.counters, &timer))
}

fn read_stage<R: Read>(
    source: &mut R,
    loader: &mut BatchLoader,
    tx: &Sender<Batch>,
    cancel: &CancelToken,
    report: &mut StageReport,
) -> Result<(), StreamError> {
    loop {
        cancel.check()?;
        let Some(batch) = report.timed(Stage::Read, || loader.load(&mut *source))? else {
            return Ok(());
        };
        report.counters.add_batch(batch.loaded, batch.padding);
        debug!(batch = batch.sequence, loaded = batch.loaded, padding = batch.padding, "batch read");
        send_or_cancel(tx, batch, cancel)?;
    }
}

fn parity_stage(
    coder: &ErasureCoder,
    rx: &Receiver<Batch>,
    tx: &Sender<Batch>,
    cancel: &CancelToken,
    report: &mut StageReport,
) -> Result<(), StreamError> {
    while let Some(mut batch) = recv_or_cancel(rx, cancel)? {
        report.timed(Stage::Parity, || coder.encode(&mut batch.shards))?;
        send_or_cancel(tx, batch, cancel)?;
    }
    Ok(())
}

fn write_stage<W: Write>(
    writers: &mut [ShardWriter<W>],
    route: Route,
    rx: &Receiver<Batch>,
    cancel: &CancelToken,
    report: &mut StageReport,
) -> Result<(), StreamError> {
    while let Some(batch) = recv_or_cancel(rx, cancel)? {
        let started = Instant::now();
        for (order, payload) in batch.shards.iter().enumerate() {
            let target = match route {
                Route::Sequential => 0,
                Route::Scattered => order,
            };
            let writer = writers
                .get_mut(target)
                .ok_or(StreamError::Pipeline("no destination for shard order"))?;
            let record_len = writer.write_shard(payload)?;
            report.counters.add_shard_written(payload.len(), record_len);
        }
        report.times.add(Stage::Write, started.elapsed());
        debug!(batch = batch.sequence, shards = batch.shards.len(), "batch written");
    }
    Ok(())
}
