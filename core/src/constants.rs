use std::time::Duration;

/// Telomere mark byte. A run of at least `minimum` unescaped marks is a chunk boundary.
pub const DEFAULT_MARK: u8 = b':';
/// Escape byte. Precedes every literal mark or escape inside a payload.
pub const DEFAULT_ESCAPE: u8 = b'\\';
/// Marks written by one `cut()`, and the run length recognized as a boundary.
pub const DEFAULT_TELOMERE_MIN: usize = 8;
/// Encoder and decoder staging buffer (32 KiB).
pub const DEFAULT_TELOMERE_BUFFER: usize = 32 * 1024;
/// Smallest staging buffer that still fits one escape pair with headroom.
pub const MIN_TELOMERE_BUFFER: usize = 4;

/// Per-shard record layout: `checksum | tag | payload`.
pub const CHECKSUM_LEN: usize = 4;
pub const TAG_LEN: usize = 16;
pub const SHARD_HEADER_LEN: usize = CHECKSUM_LEN + TAG_LEN;
/// Tag prefix shared by every shard of one encode run (CRC + size + quorum).
pub const TAG_PREFIX_LEN: usize = 13;

/// Fills unused bytes of the last data shard.
pub const PADDING_BYTE: u8 = b'?';

/// Reed-Solomon over GF(2^8) supports at most 256 shards per batch.
pub const MAX_SHARDS_PER_BATCH: usize = 256;
/// Batch sequence is a u16 on the wire.
pub const MAX_BATCHES: u64 = u16::MAX as u64 + 1;

pub const DEFAULT_QUORUM: u8 = 16;
pub const DEFAULT_REDUNDANCY: u8 = 4;
pub const DEFAULT_SHARD_SIZE: usize = 64 * 1024;
/// Chunks larger than this are rejected by the scanner without being buffered.
pub const DEFAULT_MAX_SHARD_BYTES: usize = 4 * 1024 * 1024;

pub const MIN_SNIFF_SAMPLES: usize = 5;
pub const DEFAULT_SNIFF_SAMPLES: usize = 16;

/// Bounded queue capacity between pipeline stages.
pub const DEFAULT_QUEUE_CAP: usize = 4;
/// How often a blocked stage wakes up to check for cancellation.
pub const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);
