//! Call identifier allocation
//!
//! Identifiers are handed out in strictly increasing order and never reused.
//! The source is injected into the [`CallManager`](crate::manager::CallManager)
//! so tests can start and reset the sequence where they want it.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::common::errors::{B2buaError, Result};
use crate::common::types::CallId;

pub trait CallIdSource: Send + Sync {
    /// Next unused identifier, or `CallIdsExhausted` once the range is used up
    fn next_id(&self) -> Result<CallId>;
}

/// Lock-free counter starting at 1
#[derive(Debug)]
pub struct SequentialCallIds {
    next: AtomicU64,
}

impl SequentialCallIds {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Restart the sequence. Only meaningful when no calls are live.
    pub fn reset(&self, first: u64) {
        self.next.store(first, Ordering::SeqCst);
    }
}

impl Default for SequentialCallIds {
    fn default() -> Self {
        Self::new()
    }
}

impl CallIdSource for SequentialCallIds {
    fn next_id(&self) -> Result<CallId> {
        // u64::MAX is never issued: it marks the end of the range.
        self.next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |id| id.checked_add(1))
            .map(CallId)
            .map_err(|_| B2buaError::CallIdsExhausted)
    }
}
