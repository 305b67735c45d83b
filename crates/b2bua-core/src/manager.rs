//! Call dispatcher
//!
//! The [`CallManager`] is the engine's entry point for requests that match no
//! known dialog, and the owner of the registry of live calls.
//!
//! ## Request disposition
//!
//! | Request                              | Outcome                           |
//! |--------------------------------------|-----------------------------------|
//! | To header missing or unparseable     | 500 Internal Server Error         |
//! | To header carries a tag              | 481 Call Leg/Transaction Does Not Exist |
//! | INVITE                               | new call, A-leg returned          |
//! | REGISTER                             | handed to the registrar           |
//! | NOTIFY, PING, OPTIONS                | 200 OK                            |
//! | anything else                        | 501 Not Implemented               |

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::common::types::CallId;
use crate::config::B2buaConfig;
use crate::controller::CallController;
use crate::ids::{CallIdSource, SequentialCallIds};
use crate::leg::{CallLeg, LegFactory, RequestReceiver};
use crate::registry::CallRegistry;
use crate::request::{Method, NewDialogRequest, Response, StatusCode};
use crate::routing::{RoutingEngine, StaticRoute};

/// What the engine should do with a request that matched no dialog
pub enum NewDialogOutcome {
    /// A call was created; `leg` receives this request and the rest of the
    /// dialog.
    Call {
        call_id: CallId,
        leg: Arc<dyn CallLeg>,
    },
    /// Pass the request, unmodified, to this receiver
    Delegate(Arc<dyn RequestReceiver>),
    /// Answer the request right away
    Respond(Response),
}

impl NewDialogOutcome {
    fn respond(status: StatusCode) -> Self {
        NewDialogOutcome::Respond(Response::new(status))
    }

    /// The immediate response, if this outcome is one
    pub fn response(&self) -> Option<&Response> {
        match self {
            NewDialogOutcome::Respond(response) => Some(response),
            _ => None,
        }
    }
}

impl std::fmt::Debug for NewDialogOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NewDialogOutcome::Call { call_id, leg } => f
                .debug_struct("Call")
                .field("call_id", call_id)
                .field("leg", &leg.to_string())
                .finish(),
            NewDialogOutcome::Delegate(_) => f.write_str("Delegate"),
            NewDialogOutcome::Respond(response) => f.debug_tuple("Respond").field(response).finish(),
        }
    }
}

pub struct CallManager {
    config: Arc<B2buaConfig>,
    registry: Arc<CallRegistry>,
    ids: Arc<dyn CallIdSource>,
    legs: Arc<dyn LegFactory>,
    routing: Arc<dyn RoutingEngine>,
    registrar: Option<Arc<dyn RequestReceiver>>,
}

impl CallManager {
    /// Manager routing every call to the configured next hop, with ids
    /// starting at 1.
    pub fn new(config: B2buaConfig, legs: Arc<dyn LegFactory>) -> Self {
        let routing = Arc::new(StaticRoute::new(config.next_hop.clone()));
        Self {
            config: Arc::new(config),
            registry: Arc::new(CallRegistry::new()),
            ids: Arc::new(SequentialCallIds::new()),
            legs,
            routing,
            registrar: None,
        }
    }

    pub fn with_call_ids(mut self, ids: Arc<dyn CallIdSource>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_routing(mut self, routing: Arc<dyn RoutingEngine>) -> Self {
        self.routing = routing;
        self
    }

    pub fn with_registrar(mut self, registrar: Arc<dyn RequestReceiver>) -> Self {
        self.registrar = Some(registrar);
        self
    }

    pub fn config(&self) -> &B2buaConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<CallRegistry> {
        &self.registry
    }

    pub fn call(&self, id: CallId) -> Option<Arc<CallController>> {
        self.registry.get(id)
    }

    pub fn active_calls(&self) -> usize {
        self.registry.len()
    }

    /// Dispatch a request that matched no known dialog.
    pub fn on_new_dialog(&self, request: &NewDialogRequest) -> NewDialogOutcome {
        let tag = match request.to_tag() {
            Ok(tag) => tag,
            Err(e) => {
                error!(method = %request.method, call_id = ?request.call_id, "CallManager::on_new_dialog: {}", e);
                return NewDialogOutcome::respond(StatusCode::ServerInternalError);
            }
        };

        if tag.is_some() {
            debug!(method = %request.method, call_id = ?request.call_id, "In-dialog request for unknown dialog");
            return NewDialogOutcome::respond(StatusCode::CallOrTransactionDoesNotExist);
        }

        match &request.method {
            Method::Invite => self.new_call(request),
            Method::Register => match &self.registrar {
                Some(registrar) => NewDialogOutcome::Delegate(registrar.clone()),
                None => {
                    debug!("REGISTER received but no registrar is attached");
                    NewDialogOutcome::respond(StatusCode::NotImplemented)
                }
            },
            Method::Notify | Method::Ping | Method::Options => NewDialogOutcome::respond(StatusCode::Ok),
            other => {
                debug!(method = %other, "Unsupported method outside a dialog");
                NewDialogOutcome::respond(StatusCode::NotImplemented)
            }
        }
    }

    fn new_call(&self, request: &NewDialogRequest) -> NewDialogOutcome {
        let call_id = match self.ids.next_id() {
            Ok(id) => id,
            Err(e) => {
                error!(call_id = ?request.call_id, "Rejecting INVITE: {}", e);
                return NewDialogOutcome::respond(StatusCode::ServiceUnavailable);
            }
        };

        let call = CallController::new(
            call_id,
            Arc::downgrade(&self.registry),
            self.legs.clone(),
            self.routing.clone(),
            &self.config.next_hop,
        );
        let leg = call.a_leg();
        self.registry.insert(call);

        info!(%call_id, sip_call_id = ?request.call_id, "New call");
        NewDialogOutcome::Call { call_id, leg }
    }

    /// Forget a call. Unknown ids are ignored.
    pub fn remove(&self, id: CallId) -> bool {
        self.registry.remove(id).is_some()
    }

    /// Ask every live call to hang up its caller leg.
    ///
    /// Entries are not removed here; they go away as the legs report
    /// termination. Returns the number of calls signalled.
    pub fn shutdown(&self) -> usize {
        let calls = self.registry.snapshot();
        info!("Shutting down {} call(s)", calls.len());
        for call in &calls {
            call.shutdown();
        }
        calls.len()
    }
}
