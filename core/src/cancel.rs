//! Cooperative cancellation shared by pipeline stages.
//!
//! Every blocking queue operation goes through `send_or_cancel` /
//! `recv_or_cancel`, which wake up on `CANCEL_POLL_INTERVAL` to observe the
//! token. The first stage to fail records its error in an `ErrorSlot`, which
//! also cancels the siblings.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam::channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender};

use crate::constants::CANCEL_POLL_INTERVAL;
use crate::types::StreamError;

#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    parent: Option<Arc<AtomicBool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
            || self.parent.as_ref().map_or(false, |p| p.load(Ordering::SeqCst))
    }

    /// Token observing this one. Cancelling the child leaves the parent untouched.
    pub fn child(&self) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            parent: Some(self.flag.clone()),
        }
    }

    pub fn check(&self) -> Result<(), StreamError> {
        if self.is_cancelled() {
            Err(StreamError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// First error reported by any stage of one pipeline run.
#[derive(Debug)]
pub(crate) struct ErrorSlot {
    first: Mutex<Option<StreamError>>,
    cancel: CancelToken,
}

impl ErrorSlot {
    pub(crate) fn new(cancel: CancelToken) -> Self {
        Self { first: Mutex::new(None), cancel }
    }

    /// Record `err` unless an earlier stage already failed, then cancel the run.
    pub(crate) fn fail(&self, err: StreamError) {
        if let Ok(mut first) = self.first.lock() {
            if first.is_none() {
                tracing::debug!(error = %err, "pipeline stage failed");
                *first = Some(err);
            }
        }
        self.cancel.cancel();
    }

    pub(crate) fn finish(self) -> Result<(), StreamError> {
        match self.first.into_inner() {
            Ok(Some(err)) => Err(err),
            Ok(None) => Ok(()),
            Err(_) => Err(StreamError::Pipeline("error slot poisoned")),
        }
    }
}

/// Blocking send that gives up once the token is cancelled.
pub(crate) fn send_or_cancel<T>(tx: &Sender<T>, mut item: T, cancel: &CancelToken) -> Result<(), StreamError> {
    loop {
        cancel.check()?;
        match tx.send_timeout(item, CANCEL_POLL_INTERVAL) {
            Ok(()) => return Ok(()),
            Err(SendTimeoutError::Timeout(back)) => item = back,
            Err(SendTimeoutError::Disconnected(_)) => {
                return Err(StreamError::Pipeline("downstream stage closed"))
            }
        }
    }
}

/// Blocking receive. `Ok(None)` means the upstream stage finished cleanly.
pub(crate) fn recv_or_cancel<T>(rx: &Receiver<T>, cancel: &CancelToken) -> Result<Option<T>, StreamError> {
    loop {
        cancel.check()?;
        match rx.recv_timeout(CANCEL_POLL_INTERVAL) {
            Ok(item) => return Ok(Some(item)),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                // An upstream failure cancels before it closes the queue.
                cancel.check()?;
                return Ok(None);
            }
        }
    }
}
