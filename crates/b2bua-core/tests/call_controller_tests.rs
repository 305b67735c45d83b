//! Bridging, transfer and termination behaviour of a single call

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use rvoip_b2bua_core::events::{
    CallEvent, DisconnectEvent, EventMeta, FailEvent, MessageBody, ProgressEvent, UpdateEvent,
};
use rvoip_b2bua_core::{
    BridgeState, CallController, CallId, CallManager, HostPort, LegSide, Method, NewDialogOutcome,
    NewDialogRequest, Uri,
};

use common::{manager, setup_event, RecordingLegFactory};

fn start_call(manager: &CallManager) -> (CallId, Arc<CallController>) {
    let invite = NewDialogRequest::new(Method::Invite, "<sip:bob@b2bua.example.com>");
    match manager.on_new_dialog(&invite) {
        NewDialogOutcome::Call { call_id, .. } => (call_id, manager.call(call_id).unwrap()),
        other => panic!("expected a call, got {:?}", other),
    }
}

/// Call with its first outbound leg placed: legs 0 (A) and 1 (O)
fn bridged_call(legs: &Arc<RecordingLegFactory>) -> (CallManager, Arc<CallController>) {
    let manager = manager(legs.clone());
    let (_, call) = start_call(&manager);
    legs.leg(0).receive(CallEvent::Setup(setup_event()));
    assert_eq!(call.state(), BridgeState::Bridged);
    (manager, call)
}

fn redirect(target: &str, origin: &str) -> CallEvent {
    let meta = EventMeta::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(), origin);
    CallEvent::Disconnect(DisconnectEvent::redirect_to(target.parse::<Uri>().unwrap(), meta))
}

#[test]
fn test_new_call_has_only_a_leg() {
    let legs = RecordingLegFactory::new();
    let manager = manager(legs.clone());
    let (call_id, call) = start_call(&manager);

    assert_eq!(call.call_id(), call_id);
    assert_eq!(call.state(), BridgeState::NoOLeg);
    assert_eq!(legs.count(), 1);
    assert_eq!(legs.leg(0).link.side(), LegSide::A);
    assert_eq!(legs.leg(0).target, HostPort::new("10.0.0.2", 5060));
    assert_eq!(call.to_string(), "uaA: leg#0(uaA, 10.0.0.2:5060), uaO: nil");
}

#[test]
fn test_setup_places_outbound_leg() {
    let legs = RecordingLegFactory::new();
    let (_manager, call) = bridged_call(&legs);

    let o = legs.leg(1);
    assert_eq!(o.link.side(), LegSide::O);
    assert_eq!(o.target, HostPort::new("10.0.0.2", 5060));
    assert_eq!(o.remote_addr(), Some(HostPort::new("10.0.0.2", 5060)));
    let events = o.events();
    assert_eq!(events.len(), 1);
    let CallEvent::Setup(setup) = &events[0] else {
        panic!("expected Setup, got {}", events[0]);
    };
    assert_eq!(setup.callee.as_deref(), Some("bob"));
    assert_eq!(setup.caller.as_deref(), Some("alice"));
    assert!(setup.body.is_some());
    assert!(call.to_string().ends_with("uaO: leg#1(uaO, 10.0.0.2:5060)"));
}

#[test]
fn test_bridging_is_symmetric_and_verbatim() {
    let legs = RecordingLegFactory::new();
    let (_manager, _call) = bridged_call(&legs);
    let (a, o) = (legs.leg(0), legs.leg(1));

    let ring = CallEvent::Ring(ProgressEvent::new(180, "Ringing", EventMeta::now("callee")));
    let connect = CallEvent::Connect(
        ProgressEvent::new(200, "OK", EventMeta::now("callee")).with_body(MessageBody::sdp("v=0\r\n")),
    );
    o.receive(ring.clone());
    o.receive(connect.clone());
    assert_eq!(a.events(), vec![ring, connect.clone()]);

    // Body is shared, not copied, on a verbatim forward.
    let (Some(sent), Some(got)) = (connect.body(), a.last_event().and_then(|e| e.body().cloned())) else {
        panic!("Connect lost its body");
    };
    assert!(Arc::ptr_eq(sent, &got));

    let update = CallEvent::Update(UpdateEvent::new(EventMeta::now("caller").with_max_forwards(69)));
    a.receive(update.clone());
    assert_eq!(o.last_event(), Some(update));
}

#[test]
fn test_plain_disconnect_is_forwarded() {
    let legs = RecordingLegFactory::new();
    let (_manager, call) = bridged_call(&legs);

    let bye = CallEvent::Disconnect(DisconnectEvent::new(EventMeta::now("callee")));
    legs.leg(1).receive(bye.clone());

    assert_eq!(legs.leg(0).events(), vec![bye]);
    assert_eq!(call.state(), BridgeState::Bridged);
    assert_eq!(legs.count(), 2);
}

#[test]
fn test_redirect_starts_transfer() {
    let legs = RecordingLegFactory::new();
    let (_manager, call) = bridged_call(&legs);
    let original = match &legs.leg(1).events()[0] {
        CallEvent::Setup(setup) => setup.clone(),
        other => panic!("expected Setup, got {}", other),
    };

    legs.leg(1).receive(redirect("sip:carol@10.0.0.7:5070;transport=udp", "callee"));

    assert_eq!(call.state(), BridgeState::TransferInProgress);
    assert_eq!(legs.count(), 3);
    assert!(legs.leg(0).events().is_empty(), "redirect must not reach the caller");

    let new_o = legs.leg(2);
    assert_eq!(new_o.link.side(), LegSide::O);
    assert_eq!(new_o.target, HostPort::new("10.0.0.7", 5070));

    let events = new_o.events();
    let CallEvent::Setup(setup) = &events[0] else {
        panic!("expected Setup on the new leg");
    };
    assert_eq!(setup.call_id, original.call_id);
    assert_eq!(setup.correlation_id, original.correlation_id);
    assert_eq!(setup.caller, original.caller);
    assert_eq!(setup.caller_name, original.caller_name);
    assert_eq!(setup.callee.as_deref(), Some("carol"));
    assert_eq!(setup.body, None);
    assert_eq!(setup.auth, None);
    assert_eq!(setup.meta.rtime, Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
    assert_eq!(setup.meta.origin, "callee");
    assert!(call.to_string().ends_with("uaO: leg#2(uaO, 10.0.0.7:5070)"));
}

#[test]
fn test_redirect_without_port_uses_default() {
    let legs = RecordingLegFactory::new();
    let (_manager, _call) = bridged_call(&legs);

    legs.leg(1).receive(redirect("sip:carol@voicemail.example.com", "callee"));
    assert_eq!(legs.leg(2).target, HostPort::new("voicemail.example.com", 5060));
}

#[test]
fn test_preconnect_during_transfer_becomes_update() {
    let legs = RecordingLegFactory::new();
    let (_manager, _call) = bridged_call(&legs);
    legs.leg(1).receive(redirect("sip:carol@10.0.0.7", "callee"));

    let meta = EventMeta::now("callee").with_reason("transfer").with_max_forwards(70);
    let pre = ProgressEvent::new(200, "OK", meta.clone()).with_body(MessageBody::sdp("v=0\r\no=carol\r\n"));
    let sent_body = pre.body.clone().unwrap();
    legs.leg(2).receive(CallEvent::PreConnect(pre));

    let Some(CallEvent::Update(update)) = legs.leg(0).last_event() else {
        panic!("caller should get an Update");
    };
    assert_eq!(update.meta, meta);
    let got_body = update.body.expect("Update carries the answer");
    assert_eq!(*got_body, *sent_body);
    assert!(!Arc::ptr_eq(&got_body, &sent_body));
    assert_ne!(got_body.content().as_ptr(), sent_body.content().as_ptr());
}

#[test]
fn test_connect_from_caller_completes_transfer() {
    let legs = RecordingLegFactory::new();
    let (_manager, call) = bridged_call(&legs);
    legs.leg(1).receive(redirect("sip:carol@10.0.0.7", "callee"));

    let ring = CallEvent::Ring(ProgressEvent::new(180, "Ringing", EventMeta::now("callee")));
    legs.leg(2).receive(ring.clone());
    assert_eq!(legs.leg(0).last_event(), Some(ring));
    assert_eq!(call.state(), BridgeState::TransferInProgress);

    let connect = CallEvent::Connect(ProgressEvent::new(200, "OK", EventMeta::now("caller")));
    legs.leg(0).receive(connect.clone());
    assert_eq!(call.state(), BridgeState::Bridged);
    assert_eq!(legs.leg(2).last_event(), Some(connect));

    // Back to plain bridging: PreConnect is no longer rewritten.
    let pre = CallEvent::PreConnect(ProgressEvent::new(183, "Session Progress", EventMeta::now("callee")));
    legs.leg(2).receive(pre.clone());
    assert_eq!(legs.leg(0).last_event(), Some(pre));
}

#[test]
fn test_redirect_during_transfer_is_forwarded() {
    let legs = RecordingLegFactory::new();
    let (_manager, call) = bridged_call(&legs);
    legs.leg(1).receive(redirect("sip:carol@10.0.0.7", "callee"));

    let second = redirect("sip:dave@10.0.0.8", "callee");
    legs.leg(2).receive(second.clone());

    assert_eq!(legs.count(), 3);
    assert_eq!(legs.leg(0).last_event(), Some(second));
    assert_eq!(call.state(), BridgeState::TransferInProgress);
}

#[test]
fn test_discarded_leg_is_ignored() {
    let legs = RecordingLegFactory::new();
    let (manager, call) = bridged_call(&legs);
    legs.leg(1).receive(redirect("sip:carol@10.0.0.7", "callee"));

    let old = legs.leg(1);
    old.receive(CallEvent::Fail(FailEvent::new(487, "Request Terminated", EventMeta::now("callee"))));
    old.terminate();

    assert!(legs.leg(0).events().is_empty());
    assert_eq!(call.state(), BridgeState::TransferInProgress);
    assert!(manager.call(call.call_id()).is_some());

    legs.leg(2).terminate();
    assert_eq!(call.state(), BridgeState::Terminated);
    assert!(manager.call(call.call_id()).is_none());
}

#[test]
fn test_discarded_leg_is_ignored_after_transfer_completes() {
    let legs = RecordingLegFactory::new();
    let (manager, call) = bridged_call(&legs);
    legs.leg(1).receive(redirect("sip:carol@10.0.0.7", "callee"));
    legs.leg(0).receive(CallEvent::Connect(ProgressEvent::new(200, "OK", EventMeta::now("caller"))));
    assert_eq!(call.state(), BridgeState::Bridged);

    legs.leg(1).terminate();

    assert_eq!(call.state(), BridgeState::Bridged);
    assert!(manager.call(call.call_id()).is_some());

    let ring = CallEvent::Ring(ProgressEvent::new(180, "Ringing", EventMeta::now("callee")));
    legs.leg(1).receive(ring.clone());
    legs.leg(2).receive(ring.clone());
    assert_eq!(legs.leg(0).events(), vec![ring]);
}

#[test]
fn test_unroutable_redirect_reaches_caller() {
    let legs = RecordingLegFactory::new();
    let (_manager, call) = bridged_call(&legs);

    let bye = redirect("tel:+15551234567", "callee");
    legs.leg(1).receive(bye.clone());

    assert_eq!(legs.count(), 2);
    assert_eq!(legs.leg(0).events(), vec![bye]);
    assert_eq!(call.state(), BridgeState::Bridged);
}

#[test]
fn test_concurrent_legs_are_serialized() {
    let legs = RecordingLegFactory::new();
    let (_manager, _call) = bridged_call(&legs);
    let per_leg = 500;
    let start = Arc::new(Barrier::new(2));

    let updates = |origin: &'static str| -> Vec<CallEvent> {
        (0..per_leg)
            .map(|i| CallEvent::Update(UpdateEvent::new(EventMeta::now(origin).with_reason(i.to_string()))))
            .collect()
    };
    let from_caller = updates("caller");
    let from_callee = updates("callee");

    let drive = |leg: Arc<common::RecordingLeg>, events: Vec<CallEvent>| {
        let start = start.clone();
        thread::spawn(move || {
            start.wait();
            for event in events {
                leg.receive(event);
            }
        })
    };
    let a = drive(legs.leg(0), from_caller.clone());
    let o = drive(legs.leg(1), from_callee.clone());
    a.join().unwrap();
    o.join().unwrap();

    // leg 1 also holds the initial Setup
    assert_eq!(legs.leg(1).events()[1..].to_vec(), from_caller);
    assert_eq!(legs.leg(0).events(), from_callee);
}

#[test]
fn test_event_before_setup_disconnects_caller() {
    let legs = RecordingLegFactory::new();
    let manager = manager(legs.clone());
    let (_, call) = start_call(&manager);

    let rtime = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
    legs.leg(0).receive(CallEvent::Update(UpdateEvent::new(EventMeta::new(rtime, "caller"))));

    assert_eq!(legs.count(), 1, "no outbound leg may be created");
    let Some(CallEvent::Disconnect(bye)) = legs.leg(0).last_event() else {
        panic!("caller should be disconnected");
    };
    assert_eq!(bye.redirect, None);
    assert_eq!(bye.meta.rtime, rtime);
    assert_eq!(call.state(), BridgeState::Terminated);

    // Nothing moves once terminated.
    legs.leg(0).receive(CallEvent::Setup(setup_event()));
    assert_eq!(legs.count(), 1);
}

#[test]
fn test_termination_of_either_leg_removes_call() {
    for side in [0, 1] {
        let legs = RecordingLegFactory::new();
        let (manager, call) = bridged_call(&legs);

        legs.leg(side).terminate();
        assert_eq!(manager.active_calls(), 0);
        assert_eq!(call.state(), BridgeState::Terminated);

        // The other leg's termination is a harmless repeat.
        legs.leg(1 - side).terminate();
        assert_eq!(manager.active_calls(), 0);
    }
}

#[test]
fn test_link_outliving_call_is_inert() {
    let legs = RecordingLegFactory::new();
    let (manager, call) = bridged_call(&legs);
    let id = call.call_id();
    drop(call);

    legs.leg(0).terminate();
    assert!(manager.call(id).is_none());

    // Controller is gone now; the stored links only hold it weakly.
    legs.leg(1).receive(CallEvent::Ring(ProgressEvent::new(180, "Ringing", EventMeta::now("callee"))));
    assert!(legs.leg(0).events().is_empty());
}
