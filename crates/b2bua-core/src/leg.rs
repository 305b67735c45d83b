//! Seams towards the transaction/dialog engine
//!
//! The engine owns the protocol side of every leg. The core only sees:
//!
//! - [`CallLeg`]: a handle it can push events into, fire-and-forget
//! - [`LegFactory`]: how the engine builds such a handle for a destination
//! - [`LegLink`]: the non-owning back-reference the engine uses to deliver
//!   events and the termination signal into the owning call
//!
//! ```text
//!   engine ──LegLink::deliver / terminated──▶ CallController (lock held)
//!   engine ◀──────CallLeg::deliver───────── CallController
//! ```
//!
//! `CallLeg` implementations must not call back into their own `LegLink`
//! synchronously from `deliver` or `disconnect`: the controller's lock is
//! held while it talks to its legs.

use std::fmt;
use std::sync::{Arc, Weak};

use tracing::debug;

use crate::common::types::LegSide;
use crate::controller::CallController;
use crate::events::{CallEvent, MessageBody};
use crate::request::NewDialogRequest;
use crate::uri::HostPort;

/// Engine-side handle for one leg of a bridged call
pub trait CallLeg: Send + Sync + fmt::Display {
    /// Hand an event to the leg for transmission
    fn deliver(&self, event: CallEvent);

    /// Pin the address requests on this leg are sent to
    fn set_remote_addr(&self, addr: &HostPort);

    /// Tear the leg down
    fn disconnect(&self, body: Option<MessageBody>, reason: Option<String>);
}

/// Builds leg handles; wraps the engine handle and its configuration
pub trait LegFactory: Send + Sync {
    fn create_leg(&self, target: &HostPort, link: LegLink) -> Arc<dyn CallLeg>;
}

/// Receiver for requests the dispatcher hands off untouched (registrar or
/// stateless proxy)
pub trait RequestReceiver: Send + Sync {
    fn receive_request(&self, request: &NewDialogRequest);
}

/// What a leg reports to its call
#[derive(Debug, Clone)]
pub enum LegSignal {
    Event(CallEvent),
    /// The leg is gone; no further signals follow from it
    Terminated,
}

/// Back-reference from a leg to the call that owns it.
///
/// Holds the call weakly, so a link never keeps a removed call alive.
/// O-leg links carry the generation of the leg they were created for;
/// signals from a generation the call has since replaced are dropped.
#[derive(Clone)]
pub struct LegLink {
    call: Weak<CallController>,
    side: LegSide,
    generation: u64,
}

impl LegLink {
    pub(crate) fn new(call: Weak<CallController>, side: LegSide, generation: u64) -> Self {
        Self {
            call,
            side,
            generation,
        }
    }

    pub fn side(&self) -> LegSide {
        self.side
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Deliver an event received on this leg
    pub fn deliver(&self, event: CallEvent) {
        self.signal(LegSignal::Event(event));
    }

    /// Report that this leg has terminated
    pub fn terminated(&self) {
        self.signal(LegSignal::Terminated);
    }

    pub fn signal(&self, signal: LegSignal) {
        match self.call.upgrade() {
            Some(call) => call.handle_signal(self, signal),
            None => debug!("{} signal {:?} for a call that no longer exists", self.side, signal),
        }
    }
}

impl fmt::Debug for LegLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegLink")
            .field("side", &self.side)
            .field("generation", &self.generation)
            .field("call", &"Weak<CallController>")
            .finish()
    }
}
