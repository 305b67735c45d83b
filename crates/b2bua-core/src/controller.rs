//! Per-call bridging state machine
//!
//! A [`CallController`] is the session object of one bridged call. It owns
//! the caller-facing A-leg, the callee-facing O-leg (once there is one) and a
//! single lock under which every signal from either leg is handled, so the
//! state machine is effectively single-threaded per call.
//!
//! ## States
//!
//! ```text
//!            Setup from A                 redirecting Disconnect from O
//!  NoOLeg ───────────────────▶ Bridged ────────────────────────────────▶ TransferInProgress
//!    │                           ▲                                               │
//!    │ anything else from A      └──────────── Connect from A ───────────────────┘
//!    ▼
//!  Terminated ◀──────────── termination of either (current) leg, from any state
//! ```
//!
//! While a transfer is in progress the new callee was offered no body, so
//! its PreConnect is turned into an Update towards the caller.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::common::types::{BridgeState, CallId, LegSide};
use crate::events::{CallEvent, DisconnectEvent, EventMeta, SetupEvent, UpdateEvent};
use crate::leg::{CallLeg, LegFactory, LegLink, LegSignal};
use crate::registry::CallRegistry;
use crate::routing::RoutingEngine;
use crate::uri::{self, HostPort, Uri};

/// Origin stamped on events the controller produces itself
pub const LOCAL_ORIGIN: &str = "b2bua";

struct OLeg {
    leg: Arc<dyn CallLeg>,
    generation: u64,
}

struct Session {
    a_leg: Arc<dyn CallLeg>,
    o_leg: Option<OLeg>,
    state: BridgeState,
    /// Setup that created the first O-leg, reused on transfer
    setup: Option<SetupEvent>,
    generations: u64,
}

impl Session {
    fn accepts(&self, link: &LegLink) -> bool {
        match link.side() {
            LegSide::A => true,
            LegSide::O => self
                .o_leg
                .as_ref()
                .is_some_and(|o| o.generation == link.generation()),
        }
    }

    fn next_generation(&mut self) -> u64 {
        self.generations += 1;
        self.generations
    }
}

pub struct CallController {
    id: CallId,
    me: Weak<CallController>,
    registry: Weak<CallRegistry>,
    legs: Arc<dyn LegFactory>,
    routing: Arc<dyn RoutingEngine>,
    session: Mutex<Session>,
}

impl CallController {
    /// Create a call and its A-leg towards `a_target`.
    pub fn new(
        id: CallId,
        registry: Weak<CallRegistry>,
        legs: Arc<dyn LegFactory>,
        routing: Arc<dyn RoutingEngine>,
        a_target: &HostPort,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me: &Weak<CallController>| {
            let a_leg = legs.create_leg(a_target, LegLink::new(me.clone(), LegSide::A, 0));
            Self {
                id,
                me: me.clone(),
                registry,
                legs,
                routing,
                session: Mutex::new(Session {
                    a_leg,
                    o_leg: None,
                    state: BridgeState::NoOLeg,
                    setup: None,
                    generations: 0,
                }),
            }
        })
    }

    pub fn call_id(&self) -> CallId {
        self.id
    }

    pub fn state(&self) -> BridgeState {
        self.session.lock().state
    }

    pub fn a_leg(&self) -> Arc<dyn CallLeg> {
        self.session.lock().a_leg.clone()
    }

    /// Ask the caller-facing leg to hang up; the rest of the teardown
    /// cascades through the engine.
    pub fn shutdown(&self) {
        let session = self.session.lock();
        debug!(call_id = %self.id, "Shutting down call");
        session.a_leg.disconnect(None, None);
    }

    pub(crate) fn handle_signal(&self, link: &LegLink, signal: LegSignal) {
        let mut session = self.session.lock();

        if !session.accepts(link) {
            debug!(
                call_id = %self.id,
                generation = link.generation(),
                "Ignoring {:?} from discarded {}",
                signal,
                link.side()
            );
            return;
        }

        match signal {
            LegSignal::Terminated => self.leg_terminated(&mut session, link.side()),
            LegSignal::Event(event) => {
                if session.state == BridgeState::Terminated {
                    debug!(call_id = %self.id, "Dropping {} from {}: call terminated", event, link.side());
                    return;
                }
                match link.side() {
                    LegSide::A => self.event_from_a(&mut session, event),
                    LegSide::O => self.event_from_o(&mut session, event),
                }
            }
        }
    }

    fn event_from_a(&self, session: &mut Session, event: CallEvent) {
        match session.state {
            BridgeState::NoOLeg => match event {
                CallEvent::Setup(setup) => self.place_outbound_leg(session, setup),
                other => {
                    warn!(call_id = %self.id, "Unexpected {} before any outbound leg, disconnecting caller", other);
                    let meta = EventMeta::new(other.meta().rtime, LOCAL_ORIGIN);
                    session.a_leg.deliver(CallEvent::Disconnect(DisconnectEvent::new(meta)));
                    session.state = BridgeState::Terminated;
                }
            },
            BridgeState::Bridged => self.forward_to_o(session, event),
            BridgeState::TransferInProgress => {
                if matches!(event, CallEvent::Connect(_)) {
                    info!(call_id = %self.id, "Transfer completed");
                    session.state = BridgeState::Bridged;
                }
                self.forward_to_o(session, event);
            }
            BridgeState::Terminated => {}
        }
    }

    fn event_from_o(&self, session: &mut Session, event: CallEvent) {
        match session.state {
            BridgeState::Bridged => match event {
                CallEvent::Disconnect(DisconnectEvent {
                    redirect: Some(target),
                    meta,
                }) => self.transfer(session, target, meta),
                other => self.forward_to_a(session, other),
            },
            BridgeState::TransferInProgress => match event {
                CallEvent::PreConnect(pre) => {
                    // The new leg was set up with a late offer: its answer
                    // reaches the caller as a re-INVITE instead.
                    let update = UpdateEvent {
                        body: pre.body.as_ref().map(|body| Arc::new(body.deep_copy())),
                        meta: pre.meta.clone(),
                    };
                    self.forward_to_a(session, CallEvent::Update(update));
                }
                other => self.forward_to_a(session, other),
            },
            // No O-leg exists in NoOLeg, so nothing from O is accepted there.
            BridgeState::NoOLeg | BridgeState::Terminated => {}
        }
    }

    fn place_outbound_leg(&self, session: &mut Session, setup: SetupEvent) {
        let target = self.routing.next_hop(&setup);
        let generation = session.next_generation();
        let leg = self.legs.create_leg(&target, self.link(LegSide::O, generation));
        leg.set_remote_addr(&target);

        info!(call_id = %self.id, %target, "Placing outbound leg {}", leg);
        session.setup = Some(setup.clone());
        leg.deliver(CallEvent::Setup(setup));
        session.o_leg = Some(OLeg { leg, generation });
        session.state = BridgeState::Bridged;
    }

    fn transfer(&self, session: &mut Session, target: Uri, meta: EventMeta) {
        let Some(original) = session.setup.as_ref() else {
            error!(call_id = %self.id, "Redirect to {} without a saved Setup, ignoring", target);
            return;
        };
        let Some(next_hop) = uri::destination(&target) else {
            warn!(call_id = %self.id, "Redirect to unroutable {}, hanging up caller instead", target);
            let event = CallEvent::Disconnect(DisconnectEvent {
                redirect: Some(target),
                meta,
            });
            self.forward_to_a(session, event);
            return;
        };
        let setup = original.redirected(target.username().map(str::to_string), &meta);

        let generation = session.next_generation();
        let leg = self.legs.create_leg(&next_hop, self.link(LegSide::O, generation));
        info!(call_id = %self.id, %target, %next_hop, "Redirecting call to {}", leg);

        // The previous O-leg is abandoned, not disconnected: it is already
        // going away on its own.
        session.o_leg = Some(OLeg {
            leg: leg.clone(),
            generation,
        });
        session.state = BridgeState::TransferInProgress;
        leg.deliver(CallEvent::Setup(setup));
    }

    fn forward_to_o(&self, session: &Session, event: CallEvent) {
        match &session.o_leg {
            Some(o) => {
                debug!(call_id = %self.id, "{} -> {}", event, LegSide::O);
                o.leg.deliver(event);
            }
            None => error!(call_id = %self.id, "No outbound leg to forward {} to", event),
        }
    }

    fn forward_to_a(&self, session: &Session, event: CallEvent) {
        debug!(call_id = %self.id, "{} -> {}", event, LegSide::A);
        session.a_leg.deliver(event);
    }

    fn leg_terminated(&self, session: &mut Session, side: LegSide) {
        info!(call_id = %self.id, "{} terminated, removing call", side);
        session.state = BridgeState::Terminated;
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }

    fn link(&self, side: LegSide, generation: u64) -> LegLink {
        LegLink::new(self.me.clone(), side, generation)
    }
}

impl fmt::Display for CallController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let session = self.session.lock();
        write!(f, "uaA: {}, uaO: ", session.a_leg)?;
        match &session.o_leg {
            Some(o) => write!(f, "{}", o.leg),
            None => f.write_str("nil"),
        }
    }
}

impl fmt::Debug for CallController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallController")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
