//! Next-hop selection for outbound legs

use crate::events::SetupEvent;
use crate::uri::HostPort;

/// Decides where the first outbound leg of a call is sent
pub trait RoutingEngine: Send + Sync {
    fn next_hop(&self, setup: &SetupEvent) -> HostPort;
}

/// Sends every call to one configured next hop
#[derive(Debug, Clone)]
pub struct StaticRoute {
    next_hop: HostPort,
}

impl StaticRoute {
    pub fn new(next_hop: HostPort) -> Self {
        Self { next_hop }
    }
}

impl RoutingEngine for StaticRoute {
    fn next_hop(&self, _setup: &SetupEvent) -> HostPort {
        self.next_hop.clone()
    }
}
