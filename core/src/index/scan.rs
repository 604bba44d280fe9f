use std::path::Path;
use std::sync::Mutex;
use std::thread;

use crossbeam::channel::unbounded;
use tracing::{debug, info};

use crate::cancel::{CancelToken, ErrorSlot};
use crate::index::Index;
use crate::scanner::{ScanOptions, Scanner, Sniffer};
use crate::stream::io::{FileOpener, ShardOpener};
use crate::stream::parallelism::PipelineConfig;
use crate::types::StreamError;

/// Scan files from disk into one normalized index.
pub fn scan_files<P: AsRef<Path>>(
    paths: &[P],
    options: &ScanOptions,
    config: &PipelineConfig,
) -> Result<Index, StreamError> {
    let ids: Vec<String> = paths
        .iter()
        .map(|p| p.as_ref().to_string_lossy().into_owned())
        .collect();
    scan_sources(&FileOpener, &ids, options, config)
}

/// Scan every source on a bounded pool of workers, then normalize.
///
/// Workers share one index behind a mutex, held only for a single insert.
pub fn scan_sources<O: ShardOpener>(
    opener: &O,
    ids: &[String],
    options: &ScanOptions,
    config: &PipelineConfig,
) -> Result<Index, StreamError> {
    config.profile.validate()?;
    options.telomeres.validate()?;
    if let Some(samples) = options.sniff_samples {
        Sniffer::new(samples)?;
    }

    let cancel = config.cancel.child();
    cancel.check()?;
    let slot = ErrorSlot::new(cancel.clone());
    let index = Mutex::new(Index::new());

    let (work_tx, work_rx) = unbounded::<&str>();
    for id in ids {
        work_tx
            .send(id.as_str())
            .map_err(|_| StreamError::Pipeline("scan queue closed"))?;
    }
    drop(work_tx);

    let workers = config.profile.workers.min(ids.len()).max(1);
    info!(sources = ids.len(), workers, "scanning sources");

    thread::scope(|scope| {
        for worker in 0..workers {
            let rx = work_rx.clone();
            let (index, slot, cancel) = (&index, &slot, &cancel);
            scope.spawn(move || {
                while let Ok(id) = rx.recv() {
                    if cancel.is_cancelled() {
                        slot.fail(StreamError::Cancelled);
                        break;
                    }
                    if let Err(err) = scan_source(opener, id, options, index, cancel) {
                        debug!(worker, source = id, error = %err, "scan worker stopping");
                        slot.fail(err);
                        break;
                    }
                }
            });
        }
    });

    slot.finish()?;
    let mut index = index
        .into_inner()
        .map_err(|_| StreamError::Pipeline("index lock poisoned"))?;
    index.normalize();
    info!(files = index.len(), "scan complete");
    Ok(index)
}

fn scan_source<O: ShardOpener>(
    opener: &O,
    id: &str,
    options: &ScanOptions,
    index: &Mutex<Index>,
    cancel: &CancelToken,
) -> Result<usize, StreamError> {
    let reader = opener.open(id)?;
    let mut scanner = Scanner::new(id, reader, options.clone())?.with_cancel(cancel.clone());
    if let Some(samples) = options.sniff_samples {
        scanner.sniff(samples)?;
    }

    let mut found = 0usize;
    while let Some(shard) = scanner.next_shard()? {
        cancel.check()?;
        index
            .lock()
            .map_err(|_| StreamError::Pipeline("index lock poisoned"))?
            .add_shard(shard);
        found += 1;
    }

    debug!(source = id, shards = found, "source scanned");
    Ok(found)
}
