use std::sync::Mutex;

use tracing::warn;

use crate::scanner::types::Shard;

/// What the scanner does when a shard fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanPolicy {
    /// Record the error on the shard and keep scanning.
    #[default]
    SkipAndContinue,
    /// Abort the scan with `StreamError::ShardRejected`.
    StopOnFirstError,
}

/// Receives every rejected shard, whatever the policy.
pub trait DiagnosticsSink: Send + Sync {
    fn rejected(&self, shard: &Shard);
}

/// Logs rejected shards at `warn` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn rejected(&self, shard: &Shard) {
        warn!(
            source = %shard.source,
            first_byte = shard.first_byte,
            last_byte = shard.last_byte,
            reason = shard.error.as_deref().unwrap_or("unknown"),
            "shard rejected"
        );
    }
}

/// Keeps rejected shards in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    rejected: Mutex<Vec<Shard>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Shard> {
        match self.rejected.lock() {
            Ok(mut rejected) => std::mem::take(&mut *rejected),
            Err(_) => Vec::new(),
        }
    }
}

impl DiagnosticsSink for CollectingSink {
    fn rejected(&self, shard: &Shard) {
        if let Ok(mut rejected) = self.rejected.lock() {
            rejected.push(shard.clone());
        }
    }
}
