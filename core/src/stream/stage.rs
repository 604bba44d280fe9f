use std::thread::ScopedJoinHandle;
use std::time::Instant;

use crate::cancel::ErrorSlot;
use crate::telemetry::{Stage, StageTimes, TelemetryCounters};
use crate::types::StreamError;

/// What one pipeline stage hands back when it stops.
#[derive(Debug, Default)]
pub(crate) struct StageReport {
    pub counters: TelemetryCounters,
    pub times: StageTimes,
}

impl StageReport {
    /// Run `f`, charging its wall time to `stage`.
    pub fn timed<T>(&mut self, stage: Stage, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let out = f();
        self.times.add(stage, started.elapsed());
        out
    }

    pub fn merge(&mut self, other: StageReport) {
        self.counters.merge(&other.counters);
        self.times.merge(&other.times);
    }
}

/// Join a stage thread; a panic counts as a pipeline failure.
pub(crate) fn join_stage(handle: ScopedJoinHandle<'_, StageReport>, slot: &ErrorSlot) -> StageReport {
    match handle.join() {
        Ok(report) => report,
        Err(_) => {
            slot.fail(StreamError::Pipeline("pipeline stage panicked"));
            StageReport::default()
        }
    }
}
