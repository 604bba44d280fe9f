use std::collections::BTreeMap;

use thiserror::Error;

use crate::constants::MIN_SNIFF_SAMPLES;
use crate::tag::Differentiator;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SniffError {
    #[error("sample size {requested} is below the minimum of {minimum}")]
    TooFewSamples { requested: usize, minimum: usize },

    #[error("no dominant shard signature: best group holds {top} of {total} samples")]
    Inconclusive { top: usize, total: usize },
}

/// Majority vote over shard signatures.
///
/// The winner must be unique and hold more than a third of the samples.
#[derive(Debug, Clone)]
pub struct Sniffer {
    capacity: usize,
    groups: BTreeMap<Differentiator, usize>,
    total: usize,
}

impl Sniffer {
    pub fn new(capacity: usize) -> Result<Self, SniffError> {
        if capacity < MIN_SNIFF_SAMPLES {
            return Err(SniffError::TooFewSamples {
                requested: capacity,
                minimum: MIN_SNIFF_SAMPLES,
            });
        }
        Ok(Self {
            capacity,
            groups: BTreeMap::new(),
            total: 0,
        })
    }

    pub fn sample(&mut self, signature: Differentiator) {
        *self.groups.entry(signature).or_insert(0) += 1;
        self.total += 1;
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_full(&self) -> bool {
        self.total >= self.capacity
    }

    /// Winning signature and its sample count.
    pub fn verdict(&self) -> Result<(Differentiator, usize), SniffError> {
        let mut best: Option<(Differentiator, usize)> = None;
        let mut tied = false;

        for (signature, &count) in &self.groups {
            match best {
                Some((_, top)) if count < top => {}
                Some((_, top)) if count == top => tied = true,
                _ => {
                    best = Some((*signature, count));
                    tied = false;
                }
            }
        }

        match best {
            Some((signature, top)) if !tied && top * 3 > self.total => Ok((signature, top)),
            Some((_, top)) => Err(SniffError::Inconclusive { top, total: self.total }),
            None => Err(SniffError::Inconclusive { top: 0, total: 0 }),
        }
    }
}
