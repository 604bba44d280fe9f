use std::io::{self, Write};

use crate::telomeres::types::{TelomereConfig, TelomereError};

/// Buffered telomere writer.
///
/// Payload written through `io::Write` is escaped into a staging buffer
/// that always keeps two bytes free, so an escape pair is never split
/// across flushes. `cut()` ends the current chunk.
pub struct TelomereEncoder<W: Write> {
    inner: W,
    buf: Vec<u8>,
    config: TelomereConfig,
    boundary: Vec<u8>,
}

impl<W: Write> TelomereEncoder<W> {
    pub fn new(inner: W, config: TelomereConfig) -> Result<Self, TelomereError> {
        config.validate()?;
        Ok(Self {
            inner,
            buf: Vec::with_capacity(config.buffer_size),
            boundary: vec![config.mark; config.minimum],
            config,
        })
    }

    /// Commit staged bytes, then write exactly `minimum` marks.
    pub fn cut(&mut self) -> io::Result<()> {
        self.flush_buffer()?;
        self.inner.write_all(&self.boundary)
    }

    /// Flush staged bytes and hand back the underlying writer.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.flush_buffer()?;
        self.inner.flush()?;
        Ok(self.inner)
    }

    fn flush_buffer(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            self.inner.write_all(&self.buf)?;
            self.buf.clear();
        }
        Ok(())
    }
}

impl<W: Write> Write for TelomereEncoder<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let limit = self.config.buffer_size;
        for &b in data {
            if self.buf.len() + 2 > limit {
                self.flush_buffer()?;
            }
            if self.config.is_special(b) {
                self.buf.push(self.config.escape);
            }
            self.buf.push(b);
        }
        Ok(data.len())
    }

    /// Commits staged bytes without marking a boundary.
    fn flush(&mut self) -> io::Result<()> {
        self.flush_buffer()?;
        self.inner.flush()
    }
}
