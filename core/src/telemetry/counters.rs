//! telemetry/counters.rs
//! Mutable counters used during encode and restore.
//!
//! Each stage owns its counters and hands them back when it finishes;
//! the pipeline merges them into one `TelemetrySnapshot`.
use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

#[derive(Default, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TelemetryCounters {
    pub batches: u64,
    pub shards_written: u64,
    pub shards_loaded: u64,
    pub shards_missing: u64,
    pub shards_reconstructed: u64,
    pub bytes_source: u64,
    pub bytes_payload: u64,
    pub bytes_padding: u64,
    pub bytes_written: u64,
}

impl TelemetryCounters {
    /// One batch read from the source.
    pub fn add_batch(&mut self, source_len: usize, padding: u64) {
        self.batches += 1;
        self.bytes_source += source_len as u64;
        self.bytes_padding += padding;
    }

    /// One framed shard record: payload length and total bytes handed to the telomere encoder.
    pub fn add_shard_written(&mut self, payload_len: usize, record_len: usize) {
        self.shards_written += 1;
        self.bytes_payload += payload_len as u64;
        self.bytes_written += record_len as u64;
    }

    /// One batch assembled from disk during restore.
    pub fn add_loaded(&mut self, present: usize, missing: usize) {
        self.shards_loaded += present as u64;
        self.shards_missing += missing as u64;
    }

    pub fn add_reconstructed(&mut self, count: usize) {
        self.shards_reconstructed += count as u64;
    }

    /// Restored source bytes written to the destination.
    pub fn add_restored(&mut self, len: usize) {
        self.bytes_written += len as u64;
    }

    pub fn merge(&mut self, other: &TelemetryCounters) {
        self.batches += other.batches;
        self.shards_written += other.shards_written;
        self.shards_loaded += other.shards_loaded;
        self.shards_missing += other.shards_missing;
        self.shards_reconstructed += other.shards_reconstructed;
        self.bytes_source += other.bytes_source;
        self.bytes_payload += other.bytes_payload;
        self.bytes_padding += other.bytes_padding;
        self.bytes_written += other.bytes_written;
    }
}

impl AddAssign for TelemetryCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.merge(&rhs);
    }
}
