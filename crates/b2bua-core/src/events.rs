//! Call-progress events exchanged between the two legs of a call
//!
//! The set is closed: every transition of the call controller matches
//! exhaustively over [`CallEvent`]. Events are immutable values; bodies are
//! shared behind an `Arc` so that forwarding an event verbatim never copies
//! the payload, while an explicit [`MessageBody::deep_copy`] produces a
//! distinct object with equal content.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::uri::Uri;

/// Session description (or other payload) carried by an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBody {
    content_type: String,
    content: Bytes,
}

impl MessageBody {
    pub fn new(content_type: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            content_type: content_type.into(),
            content: content.into(),
        }
    }

    /// An `application/sdp` body
    pub fn sdp(content: impl Into<Bytes>) -> Self {
        Self::new("application/sdp", content)
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Copy that shares no storage with `self`.
    pub fn deep_copy(&self) -> Self {
        Self {
            content_type: self.content_type.clone(),
            content: Bytes::copy_from_slice(&self.content),
        }
    }
}

/// Credentials presented by the caller, passed through opaquely
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthInfo(pub String);

/// Metadata every event carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMeta {
    /// When the triggering message was received
    pub rtime: DateTime<Utc>,
    /// Who produced the event (e.g. "caller", "callee", "switch")
    pub origin: String,
    pub reason: Option<String>,
    pub max_forwards: Option<u32>,
}

impl EventMeta {
    pub fn new(rtime: DateTime<Utc>, origin: impl Into<String>) -> Self {
        Self {
            rtime,
            origin: origin.into(),
            reason: None,
            max_forwards: None,
        }
    }

    /// Metadata stamped with the current time
    pub fn now(origin: impl Into<String>) -> Self {
        Self::new(Utc::now(), origin)
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_max_forwards(mut self, max_forwards: u32) -> Self {
        self.max_forwards = Some(max_forwards);
        self
    }
}

/// Call initiation (an INVITE without a dialog)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupEvent {
    pub call_id: String,
    /// Cross-leg correlation identifier (Cisco-GUID style)
    pub correlation_id: Option<String>,
    /// Calling line identifier
    pub caller: Option<String>,
    /// Called line identifier
    pub callee: Option<String>,
    pub body: Option<Arc<MessageBody>>,
    pub auth: Option<AuthInfo>,
    pub caller_name: Option<String>,
    pub meta: EventMeta,
}

impl SetupEvent {
    pub fn new(call_id: impl Into<String>, meta: EventMeta) -> Self {
        Self {
            call_id: call_id.into(),
            correlation_id: None,
            caller: None,
            callee: None,
            body: None,
            auth: None,
            caller_name: None,
            meta,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    pub fn with_callee(mut self, callee: impl Into<String>) -> Self {
        self.callee = Some(callee.into());
        self
    }

    pub fn with_caller_name(mut self, caller_name: impl Into<String>) -> Self {
        self.caller_name = Some(caller_name.into());
        self
    }

    pub fn with_body(mut self, body: MessageBody) -> Self {
        self.body = Some(Arc::new(body));
        self
    }

    pub fn with_auth(mut self, auth: AuthInfo) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Setup towards a redirect destination.
    ///
    /// Keeps the identity of the original call (call-id, correlation id,
    /// caller and caller name) and takes timing and origin from the event
    /// that requested the redirect. The new leg is offered without a body
    /// (late offer) and without credentials.
    pub fn redirected(&self, callee: Option<String>, trigger: &EventMeta) -> Self {
        Self {
            call_id: self.call_id.clone(),
            correlation_id: self.correlation_id.clone(),
            caller: self.caller.clone(),
            callee,
            body: None,
            auth: None,
            caller_name: self.caller_name.clone(),
            meta: EventMeta::new(trigger.rtime, trigger.origin.clone()),
        }
    }
}

/// Provisional or final acceptance from the far end (Ring, PreConnect,
/// Connect)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub code: u16,
    pub reason_phrase: String,
    pub body: Option<Arc<MessageBody>>,
    pub meta: EventMeta,
}

impl ProgressEvent {
    pub fn new(code: u16, reason_phrase: impl Into<String>, meta: EventMeta) -> Self {
        Self {
            code,
            reason_phrase: reason_phrase.into(),
            body: None,
            meta,
        }
    }

    pub fn with_body(mut self, body: MessageBody) -> Self {
        self.body = Some(Arc::new(body));
        self
    }
}

/// Mid-call renegotiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateEvent {
    pub body: Option<Arc<MessageBody>>,
    pub meta: EventMeta,
}

impl UpdateEvent {
    pub fn new(meta: EventMeta) -> Self {
        Self { body: None, meta }
    }

    pub fn with_body(mut self, body: MessageBody) -> Self {
        self.body = Some(Arc::new(body));
        self
    }
}

/// Termination of a leg, optionally asking to continue the call elsewhere
/// (REFER or BYE with Also:)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectEvent {
    pub redirect: Option<Uri>,
    pub meta: EventMeta,
}

impl DisconnectEvent {
    pub fn new(meta: EventMeta) -> Self {
        Self { redirect: None, meta }
    }

    pub fn redirect_to(target: Uri, meta: EventMeta) -> Self {
        Self {
            redirect: Some(target),
            meta,
        }
    }
}

/// Final failure of a call attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailEvent {
    pub code: u16,
    pub reason_phrase: String,
    pub meta: EventMeta,
}

impl FailEvent {
    pub fn new(code: u16, reason_phrase: impl Into<String>, meta: EventMeta) -> Self {
        Self {
            code,
            reason_phrase: reason_phrase.into(),
            meta,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    Setup(SetupEvent),
    Ring(ProgressEvent),
    PreConnect(ProgressEvent),
    Connect(ProgressEvent),
    Update(UpdateEvent),
    Disconnect(DisconnectEvent),
    Fail(FailEvent),
}

impl CallEvent {
    pub fn meta(&self) -> &EventMeta {
        match self {
            CallEvent::Setup(ev) => &ev.meta,
            CallEvent::Ring(ev) | CallEvent::PreConnect(ev) | CallEvent::Connect(ev) => &ev.meta,
            CallEvent::Update(ev) => &ev.meta,
            CallEvent::Disconnect(ev) => &ev.meta,
            CallEvent::Fail(ev) => &ev.meta,
        }
    }

    pub fn body(&self) -> Option<&Arc<MessageBody>> {
        match self {
            CallEvent::Setup(ev) => ev.body.as_ref(),
            CallEvent::Ring(ev) | CallEvent::PreConnect(ev) | CallEvent::Connect(ev) => ev.body.as_ref(),
            CallEvent::Update(ev) => ev.body.as_ref(),
            CallEvent::Disconnect(_) | CallEvent::Fail(_) => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CallEvent::Setup(_) => "Setup",
            CallEvent::Ring(_) => "Ring",
            CallEvent::PreConnect(_) => "PreConnect",
            CallEvent::Connect(_) => "Connect",
            CallEvent::Update(_) => "Update",
            CallEvent::Disconnect(_) => "Disconnect",
            CallEvent::Fail(_) => "Fail",
        }
    }
}

impl fmt::Display for CallEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallEvent::Setup(ev) => write!(
                f,
                "Setup(call-id={}, cld={})",
                ev.call_id,
                ev.callee.as_deref().unwrap_or("-")
            ),
            CallEvent::Ring(ev) | CallEvent::PreConnect(ev) | CallEvent::Connect(ev) => {
                write!(f, "{}({} {})", self.name(), ev.code, ev.reason_phrase)
            }
            CallEvent::Update(_) => f.write_str("Update"),
            CallEvent::Disconnect(ev) => match &ev.redirect {
                Some(target) => write!(f, "Disconnect(redirect={})", target),
                None => f.write_str("Disconnect"),
            },
            CallEvent::Fail(ev) => write!(f, "Fail({} {})", ev.code, ev.reason_phrase),
        }
    }
}
