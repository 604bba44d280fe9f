//! Shards regrouped by encode run.
//!
//! Scans insert shards as they find them; `normalize` runs once afterwards
//! and decides, per run, whether every batch can be rebuilt.

pub mod file;
pub mod scan;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::scanner::Shard;
use crate::tag::Differentiator;
use crate::types::StreamError;

pub use file::File;
pub use scan::{scan_files, scan_sources};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Index {
    files: BTreeMap<Differentiator, File>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group a shard under its run. Invalid shards are kept for reporting.
    pub fn add_shard(&mut self, shard: Shard) {
        self.files
            .entry(shard.signature())
            .or_default()
            .shards
            .push(shard);
    }

    pub fn normalize(&mut self) {
        for file in self.files.values_mut() {
            file.normalize();
        }
    }

    pub fn get(&self, key: &Differentiator) -> Option<&File> {
        self.files.get(key)
    }

    pub fn files(&self) -> impl Iterator<Item = (&Differentiator, &File)> {
        self.files.iter()
    }

    /// Runs that normalized without error.
    pub fn recoverable(&self) -> impl Iterator<Item = (&Differentiator, &File)> {
        self.files.iter().filter(|(_, f)| f.error.is_none() && !f.shards.is_empty())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn to_json(&self) -> Result<String, StreamError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, StreamError> {
        Ok(serde_json::from_str(json)?)
    }
}
