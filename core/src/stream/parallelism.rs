use crate::cancel::CancelToken;
use crate::constants::DEFAULT_QUEUE_CAP;
use crate::types::StreamError;

/// Thread budget for pipelines and parallel scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelismProfile {
    /// Concurrent source scans in `scan_files`.
    pub workers: usize,
    /// Capacity of each bounded queue between pipeline stages.
    pub inflight_batches: usize,
}

impl Default for ParallelismProfile {
    fn default() -> Self {
        Self::dynamic()
    }
}

impl ParallelismProfile {
    pub fn single_threaded() -> Self {
        Self {
            workers: 1,
            inflight_batches: 1,
        }
    }

    /// One scan worker per core, default queue depth.
    pub fn dynamic() -> Self {
        let workers = num_cpus::get().max(1);
        tracing::debug!(workers, inflight_batches = DEFAULT_QUEUE_CAP, "parallelism profile");
        Self {
            workers,
            inflight_batches: DEFAULT_QUEUE_CAP,
        }
    }

    pub fn validate(&self) -> Result<(), StreamError> {
        if self.workers == 0 {
            return Err(StreamError::Validation("worker count must be at least 1".into()));
        }
        if self.inflight_batches == 0 {
            return Err(StreamError::Validation("queue capacity must be at least 1".into()));
        }
        Ok(())
    }
}

/// Runtime settings shared by every public operation.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub profile: ParallelismProfile,
    /// Cancelling this token stops the operation with `StreamError::Cancelled`.
    pub cancel: CancelToken,
}

impl PipelineConfig {
    pub fn new(profile: ParallelismProfile, cancel: CancelToken) -> Self {
        Self { profile, cancel }
    }
}
