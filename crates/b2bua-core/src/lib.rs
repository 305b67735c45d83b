//! # RVoIP B2BUA Core
//!
//! Call-control core of a signaling back-to-back user agent.
//!
//! For every inbound call the core bridges a caller-facing leg (A) and a
//! callee-facing leg (O), forwards call-progress events between them and
//! turns a redirect from the callee side into a transfer. Message parsing,
//! transactions and transport belong to the engine driving it; the engine
//! plugs in through the traits in [`leg`].
//!
//! ## Architecture
//!
//! - `manager`: dispatcher for requests outside any dialog; owns the registry
//! - `registry`: live calls by call id
//! - `controller`: per-call bridging state machine
//! - `events`: the closed set of call events exchanged between legs
//! - `leg`: engine seams (leg handles, leg factory, back-links)
//! - `ids`: call identifier allocation
//! - `request`: view of a dialog-initiating request and the responses to it
//! - `uri`: next-hop addresses and redirect destinations
//! - `routing`: next-hop selection
//! - `config`, `logging`, `shutdown`: what a host process needs around the core
//! - `common`: shared types and errors
//!
//! ## Example
//!
//! A host process wiring the core to its engine:
//!
//! ```no_run
//! use std::sync::Arc;
//! use rvoip_b2bua_core::logging::{setup_logging, LoggingConfig};
//! use rvoip_b2bua_core::shutdown::{shutdown_gracefully, wait_for_signal};
//! use rvoip_b2bua_core::{B2buaConfig, CallManager, LegFactory};
//!
//! async fn run(legs: Arc<dyn LegFactory>, level: &str) -> rvoip_b2bua_core::Result<()> {
//!     let _guard = setup_logging(&LoggingConfig::from_level_name(level, "edge-b2bua")?)?;
//!
//!     let config = B2buaConfig::from_file("/etc/b2bua.toml")?;
//!     let grace = config.shutdown_grace();
//!     let manager = CallManager::new(config, legs);
//!
//!     // hand `manager` to the engine's new-dialog hook here
//!
//!     wait_for_signal().await?;
//!     shutdown_gracefully(&manager, grace).await;
//!     Ok(())
//! }
//! ```

pub mod common;
pub mod config;
pub mod controller;
pub mod events;
pub mod ids;
pub mod leg;
pub mod logging;
pub mod manager;
pub mod registry;
pub mod request;
pub mod routing;
pub mod shutdown;
pub mod uri;

// Re-export key types
pub use common::errors::{B2buaError, Result};
pub use common::types::*;
pub use config::B2buaConfig;
pub use controller::CallController;
pub use events::{CallEvent, EventMeta, MessageBody};
pub use ids::{CallIdSource, SequentialCallIds};
pub use leg::{CallLeg, LegFactory, LegLink, LegSignal, RequestReceiver};
pub use manager::{CallManager, NewDialogOutcome};
pub use request::{Method, NewDialogRequest, Response, StatusCode};
pub use routing::{RoutingEngine, StaticRoute};
pub use uri::{HostPort, Uri};
