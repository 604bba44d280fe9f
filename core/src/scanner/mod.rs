//! Shard discovery inside arbitrary, possibly damaged byte streams.
//!
//! Responsibilities:
//! - Split a stream into telomere chunks and parse each as a shard record
//! - Verify per-shard checksums, recording failures on the shard
//! - Majority-vote sniffing to reject foreign shards mixed into a stream
//!
//! Non-responsibilities:
//! - Grouping shards by run (see `index`)

pub mod types;
pub mod policy;
pub mod sniffer;
pub mod scanner;

pub use types::{ScanOptions, Shard};
pub use policy::{CollectingSink, DiagnosticsSink, ScanPolicy, TracingSink};
pub use sniffer::{SniffError, Sniffer};
pub use scanner::Scanner;
