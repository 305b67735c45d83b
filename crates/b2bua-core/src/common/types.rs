//! Common types used throughout the b2bua-core library

use std::fmt;

/// Unique identifier of a bridged call inside the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallId(pub u64);

impl CallId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which side of a bridged call a leg faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegSide {
    /// Caller-facing leg, created together with the call
    A,
    /// Callee-facing (originating) leg, created on the first Setup
    O,
}

impl fmt::Display for LegSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LegSide::A => write!(f, "uaA"),
            LegSide::O => write!(f, "uaO"),
        }
    }
}

/// Bridging state of a call controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Only the A-leg exists
    NoOLeg,
    /// Both legs exist, events are forwarded verbatim
    Bridged,
    /// The O-leg was replaced after a redirect and the caller has not
    /// confirmed the new destination yet
    TransferInProgress,
    /// A leg reported termination or the call was rejected; further
    /// signals are dropped
    Terminated,
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BridgeState::NoOLeg => "no-o-leg",
            BridgeState::Bridged => "bridged",
            BridgeState::TransferInProgress => "transfer-in-progress",
            BridgeState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}
