//! Live calls indexed by call id

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::common::types::CallId;
use crate::controller::CallController;

/// Map of live calls.
///
/// Guarded independently of any call's own lock and only held for the
/// duration of a map operation.
#[derive(Debug, Default)]
pub struct CallRegistry {
    calls: DashMap<CallId, Arc<CallController>>,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, call: Arc<CallController>) {
        self.calls.insert(call.call_id(), call);
    }

    /// Remove a call. Removing an unknown id is a no-op.
    pub fn remove(&self, id: CallId) -> Option<Arc<CallController>> {
        let removed = self.calls.remove(&id).map(|(_, call)| call);
        if removed.is_none() {
            debug!(call_id = %id, "Call already removed");
        }
        removed
    }

    pub fn get(&self, id: CallId) -> Option<Arc<CallController>> {
        self.calls.get(&id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: CallId) -> bool {
        self.calls.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Point-in-time copy of the live calls. The registry is not locked
    /// while the caller works with the result.
    pub fn snapshot(&self) -> Vec<Arc<CallController>> {
        self.calls.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn ids(&self) -> Vec<CallId> {
        self.calls.iter().map(|entry| *entry.key()).collect()
    }
}
