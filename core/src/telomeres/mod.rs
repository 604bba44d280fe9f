//! Telomere boundary codec.
//!
//! Chunks are separated by runs of a reserved mark byte. A run of at least
//! `minimum` unescaped marks is a boundary; payload marks and escapes are
//! always preceded by one escape byte, so a boundary never occurs inside a
//! payload. No length prefixes are used, which lets a scanner resynchronize
//! after any amount of damage.
//!
//! Responsibilities:
//! - Escape payload bytes and write boundaries (`TelomereEncoder`)
//! - Find chunk starts and stream decoded chunks with exact raw ranges (`TelomereDecoder`)
//!
//! Non-responsibilities:
//! - Shard layout, checksums, tags

pub mod types;
pub mod encode;
pub mod decode;

pub use types::{TelomereConfig, TelomereError};
pub use encode::TelomereEncoder;
pub use decode::TelomereDecoder;
