use std::io;

use thiserror::Error;

use crate::constants::{
    DEFAULT_ESCAPE, DEFAULT_MARK, DEFAULT_TELOMERE_BUFFER, DEFAULT_TELOMERE_MIN, MIN_TELOMERE_BUFFER,
};

#[derive(Debug, Error)]
pub enum TelomereError {
    #[error("telomere minimum must be at least 1")]
    ZeroMinimum,

    #[error("mark and escape must differ (both 0x{0:02x})")]
    MarkIsEscape(u8),

    #[error("buffer size {0} is below {} bytes", MIN_TELOMERE_BUFFER)]
    BufferTooSmall(usize),

    #[error("stream ends with an unpaired escape byte at offset {0}")]
    UnpairedEscape(u64),

    #[error("decoding cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Framing parameters. Encoder and decoder must agree on `mark`, `escape` and `minimum`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelomereConfig {
    pub mark: u8,
    pub escape: u8,
    /// Marks written per boundary; also the shortest run recognized as one.
    pub minimum: usize,
    pub buffer_size: usize,
}

impl Default for TelomereConfig {
    fn default() -> Self {
        Self {
            mark: DEFAULT_MARK,
            escape: DEFAULT_ESCAPE,
            minimum: DEFAULT_TELOMERE_MIN,
            buffer_size: DEFAULT_TELOMERE_BUFFER,
        }
    }
}

impl TelomereConfig {
    pub fn with_minimum(minimum: usize) -> Self {
        Self { minimum, ..Self::default() }
    }

    pub fn validate(&self) -> Result<(), TelomereError> {
        if self.minimum < 1 {
            return Err(TelomereError::ZeroMinimum);
        }
        if self.mark == self.escape {
            return Err(TelomereError::MarkIsEscape(self.mark));
        }
        if self.buffer_size < MIN_TELOMERE_BUFFER {
            return Err(TelomereError::BufferTooSmall(self.buffer_size));
        }
        Ok(())
    }

    #[inline]
    pub(crate) fn is_special(&self, b: u8) -> bool {
        b == self.mark || b == self.escape
    }
}
