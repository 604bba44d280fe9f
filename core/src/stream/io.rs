use std::collections::HashMap;
use std::fs;
use std::io::{self, Cursor, ErrorKind, Read, Seek, Write};
use std::path::PathBuf;
use std::sync::Arc;

use crate::types::StreamError;

/// Opens the backing source of a shard by the id recorded on it.
///
/// Scanning and restoring never touch paths directly; both go through an
/// opener so tests and embedders can serve shards from memory.
pub trait ShardOpener: Sync {
    type Source: Read + Seek + Send;

    fn open(&self, id: &str) -> Result<Self::Source, StreamError>;
}

/// Treats ids as filesystem paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileOpener;

impl ShardOpener for FileOpener {
    type Source = fs::File;

    fn open(&self, id: &str) -> Result<Self::Source, StreamError> {
        Ok(fs::File::open(PathBuf::from(id))?)
    }
}

/// Named in-memory sources.
#[derive(Debug, Clone, Default)]
pub struct MemoryOpener {
    sources: HashMap<String, Arc<[u8]>>,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        self.sources.insert(id.into(), bytes.into());
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sources.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl ShardOpener for MemoryOpener {
    type Source = Cursor<Arc<[u8]>>;

    fn open(&self, id: &str) -> Result<Self::Source, StreamError> {
        match self.sources.get(id) {
            Some(bytes) => Ok(Cursor::new(bytes.clone())),
            None => Err(StreamError::Io(std::io::Error::new(
                ErrorKind::NotFound,
                format!("no in-memory source named {id}"),
            ))),
        }
    }
}

/// Fill `buf` until it is full or the reader is exhausted. Returns the bytes read.
pub fn read_exact_or_eof<R: Read + ?Sized>(r: &mut R, buf: &mut [u8]) -> Result<usize, StreamError> {
    let mut off = 0;

    while off < buf.len() {
        match r.read(&mut buf[off..]) {
            Ok(0) => break,
            Ok(n) => off += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(off)
}

/// Write sink that keeps at most `limit` bytes and counts what it drops.
#[derive(Debug, Clone)]
pub struct CappedBuffer {
    buf: Vec<u8>,
    limit: usize,
    dropped: u64,
}

impl CappedBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            buf: Vec::new(),
            limit,
            dropped: 0,
        }
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.dropped = 0;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn overflowed(&self) -> bool {
        self.dropped > 0
    }

    /// Bytes offered to the buffer, kept or not.
    pub fn offered(&self) -> u64 {
        self.buf.len() as u64 + self.dropped
    }
}

impl Write for CappedBuffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let room = self.limit.saturating_sub(self.buf.len());
        let take = room.min(data.len());
        self.buf.extend_from_slice(&data[..take]);
        self.dropped += (data.len() - take) as u64;
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
