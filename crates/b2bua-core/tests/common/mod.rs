//! Recording legs shared by the integration tests

#![allow(dead_code)]

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rvoip_b2bua_core::events::{CallEvent, EventMeta, MessageBody, SetupEvent};
use rvoip_b2bua_core::{B2buaConfig, CallLeg, CallManager, HostPort, LegFactory, LegLink};

/// Leg that records everything the controller asks of it
pub struct RecordingLeg {
    pub index: usize,
    pub target: HostPort,
    pub link: LegLink,
    events: Mutex<Vec<CallEvent>>,
    remote_addr: Mutex<Option<HostPort>>,
    disconnects: AtomicUsize,
    terminate_on_disconnect: bool,
}

impl RecordingLeg {
    pub fn events(&self) -> Vec<CallEvent> {
        self.events.lock().clone()
    }

    pub fn last_event(&self) -> Option<CallEvent> {
        self.events.lock().last().cloned()
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().len()
    }

    pub fn remote_addr(&self) -> Option<HostPort> {
        self.remote_addr.lock().clone()
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    /// Play the engine: an event arrives on this leg
    pub fn receive(&self, event: CallEvent) {
        self.link.deliver(event);
    }

    /// Play the engine: this leg's dialog is gone
    pub fn terminate(&self) {
        self.link.terminated();
    }
}

impl CallLeg for RecordingLeg {
    fn deliver(&self, event: CallEvent) {
        self.events.lock().push(event);
    }

    fn set_remote_addr(&self, addr: &HostPort) {
        *self.remote_addr.lock() = Some(addr.clone());
    }

    fn disconnect(&self, _body: Option<MessageBody>, _reason: Option<String>) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        if self.terminate_on_disconnect {
            // The controller lock is held here; report from elsewhere.
            let link = self.link.clone();
            std::thread::spawn(move || link.terminated());
        }
    }
}

impl fmt::Display for RecordingLeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "leg#{}({}, {})", self.index, self.link.side(), self.target)
    }
}

#[derive(Default)]
pub struct RecordingLegFactory {
    legs: Mutex<Vec<Arc<RecordingLeg>>>,
    terminate_on_disconnect: bool,
}

impl RecordingLegFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Legs that report termination shortly after being disconnected
    pub fn terminating() -> Arc<Self> {
        Arc::new(Self {
            terminate_on_disconnect: true,
            ..Self::default()
        })
    }

    pub fn legs(&self) -> Vec<Arc<RecordingLeg>> {
        self.legs.lock().clone()
    }

    pub fn leg(&self, index: usize) -> Arc<RecordingLeg> {
        self.legs.lock()[index].clone()
    }

    pub fn count(&self) -> usize {
        self.legs.lock().len()
    }
}

impl LegFactory for RecordingLegFactory {
    fn create_leg(&self, target: &HostPort, link: LegLink) -> Arc<dyn CallLeg> {
        let mut legs = self.legs.lock();
        let leg = Arc::new(RecordingLeg {
            index: legs.len(),
            target: target.clone(),
            link,
            events: Mutex::new(Vec::new()),
            remote_addr: Mutex::new(None),
            disconnects: AtomicUsize::new(0),
            terminate_on_disconnect: self.terminate_on_disconnect,
        });
        legs.push(leg.clone());
        leg
    }
}

pub fn manager(legs: Arc<RecordingLegFactory>) -> CallManager {
    let config = B2buaConfig::new()
        .with_next_hop("10.0.0.2:5060")
        .expect("valid next hop");
    CallManager::new(config, legs)
}

pub fn setup_event() -> SetupEvent {
    SetupEvent::new("a84b4c76e66710@pc33.atlanta.com", EventMeta::now("caller"))
        .with_correlation_id("3C1D1F40-2BA1-11F0-8001-0011223344")
        .with_caller("alice")
        .with_callee("bob")
        .with_caller_name("Alice")
        .with_body(MessageBody::sdp("v=0\r\no=alice 1 1 IN IP4 10.0.0.1\r\n"))
}
