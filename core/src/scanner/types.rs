use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::checksum::Checksum;
use crate::constants::DEFAULT_MAX_SHARD_BYTES;
use crate::scanner::policy::{DiagnosticsSink, ScanPolicy, TracingSink};
use crate::tag::{Differentiator, Tag};
use crate::telomeres::TelomereConfig;

/// One delimited record found by the scanner.
///
/// Validation failures are stored in `error` rather than raised, so damaged
/// shards stay visible in reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shard {
    /// Id of the backing source, as understood by its `ShardOpener`.
    pub source: String,
    /// Raw, still escaped, byte range `[first_byte, last_byte)` inside `source`.
    pub first_byte: u64,
    pub last_byte: u64,
    /// Payload length.
    pub size: u64,
    pub checksum: u32,
    pub tag: Tag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Shard {
    pub fn signature(&self) -> Differentiator {
        Differentiator::new(&self.tag, self.size)
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

/// Scanner settings.
#[derive(Clone)]
pub struct ScanOptions {
    pub telomeres: TelomereConfig,
    pub checksum: Checksum,
    /// Chunks longer than this are rejected as "shard too large".
    pub max_shard_bytes: usize,
    /// Sniff this many valid shards per source and mark the rest of the
    /// minority as foreign. `None` disables sniffing.
    pub sniff_samples: Option<usize>,
    pub policy: ScanPolicy,
    pub sink: Arc<dyn DiagnosticsSink>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            telomeres: TelomereConfig::default(),
            checksum: Checksum::default(),
            max_shard_bytes: DEFAULT_MAX_SHARD_BYTES,
            sniff_samples: None,
            policy: ScanPolicy::default(),
            sink: Arc::new(TracingSink),
        }
    }
}

impl fmt::Debug for ScanOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanOptions")
            .field("telomeres", &self.telomeres)
            .field("checksum", &self.checksum)
            .field("max_shard_bytes", &self.max_shard_bytes)
            .field("sniff_samples", &self.sniff_samples)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
