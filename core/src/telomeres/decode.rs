use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};

use crate::cancel::CancelToken;
use crate::telomeres::types::{TelomereConfig, TelomereError};

/// Buffered telomere reader over a seekable source.
///
/// `cursor()` is the raw source offset of the next undecoded byte, minus
/// any marks already consumed into a boundary that has not been resolved
/// yet. Reading it before and after `stream_chunk` gives the chunk's exact
/// raw `[start, end)` range.
pub struct TelomereDecoder<R: Read + Seek> {
    inner: R,
    config: TelomereConfig,
    buf: Vec<u8>,
    pos: usize,
    filled: usize,
    /// Source offset of `buf[0]`.
    base: u64,
    /// Unescaped marks consumed but not yet emitted as data.
    held: u64,
    escaped: bool,
    eof: bool,
    /// Checked before every refill.
    cancel: Option<CancelToken>,
}

impl<R: Read + Seek> TelomereDecoder<R> {
    pub fn new(mut inner: R, config: TelomereConfig) -> Result<Self, TelomereError> {
        config.validate()?;
        let base = inner.stream_position()?;
        Ok(Self {
            inner,
            buf: vec![0u8; config.buffer_size],
            config,
            pos: 0,
            filled: 0,
            base,
            held: 0,
            escaped: false,
            eof: false,
            cancel: None,
        })
    }

    /// Fail with `TelomereError::Cancelled` once `cancel` fires, even mid-chunk.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn cursor(&self) -> u64 {
        self.base + self.pos as u64 - self.held
    }

    /// Reposition at a raw offset, dropping buffered state.
    pub fn seek_to(&mut self, position: u64) -> Result<(), TelomereError> {
        self.inner.seek(SeekFrom::Start(position))?;
        self.base = position;
        self.pos = 0;
        self.filled = 0;
        self.held = 0;
        self.escaped = false;
        self.eof = false;
        Ok(())
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Skip marks up to the next chunk start. Returns `false` at end of input.
    pub fn seek_chunk(&mut self) -> Result<bool, TelomereError> {
        let mark = self.config.mark;
        loop {
            if !self.fill()? {
                self.held = 0;
                return Ok(false);
            }
            let skip = self.buf[self.pos..self.filled]
                .iter()
                .take_while(|&&b| b == mark)
                .count();
            self.pos += skip;
            if self.pos < self.filled {
                self.held = 0;
                return Ok(true);
            }
        }
    }

    /// Decode the next chunk into `to`.
    ///
    /// Returns `Some(n)` with the decoded length when a chunk ended at a
    /// boundary or at end of input, and `None` once input is exhausted
    /// without producing any byte. Marks left dangling at end of input are
    /// treated as a truncated boundary.
    pub fn stream_chunk<W: Write + ?Sized>(&mut self, to: &mut W) -> Result<Option<u64>, TelomereError> {
        if !self.seek_chunk()? {
            return Ok(None);
        }

        let mark = self.config.mark;
        let escape = self.config.escape;
        let minimum = self.config.minimum as u64;
        let mut n = 0u64;

        loop {
            if !self.fill()? {
                if self.escaped {
                    return Err(TelomereError::UnpairedEscape(self.cursor() - 1));
                }
                return Ok(Some(n));
            }

            let b = self.buf[self.pos];

            if self.escaped {
                self.pos += 1;
                self.escaped = false;
                to.write_all(&[b])?;
                n += 1;
                continue;
            }

            if b == mark {
                self.pos += 1;
                self.held += 1;
                if self.held >= minimum {
                    return Ok(Some(n));
                }
                continue;
            }

            if self.held > 0 {
                // A short run is data that lost its escapes.
                for _ in 0..self.held {
                    to.write_all(&[mark])?;
                }
                n += self.held;
                self.held = 0;
            }

            if b == escape {
                self.pos += 1;
                self.escaped = true;
                continue;
            }

            let start = self.pos;
            let run = self.buf[start..self.filled]
                .iter()
                .position(|&c| c == mark || c == escape)
                .unwrap_or(self.filled - start);
            to.write_all(&self.buf[start..start + run])?;
            self.pos += run;
            n += run as u64;
        }
    }

    /// Refill when the window is drained. Returns `false` at end of input.
    fn fill(&mut self) -> Result<bool, TelomereError> {
        if self.pos < self.filled {
            return Ok(true);
        }
        if self.eof {
            return Ok(false);
        }
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(TelomereError::Cancelled);
        }
        self.base += self.filled as u64;
        self.pos = 0;
        self.filled = 0;
        loop {
            match self.inner.read(&mut self.buf) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(false);
                }
                Ok(n) => {
                    self.filled = n;
                    return Ok(true);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}
