//! B2BUA configuration
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! next_hop = "10.0.0.5:5070"
//! user_agent = "Edge B2BUA"
//! allowed_formats = [0, 8, 101]
//! local_address = "0.0.0.0"
//! local_port = 5060
//! shutdown_grace_ms = 2000
//! ```

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::common::errors::{B2buaError, Result};
use crate::uri::HostPort;

pub const DEFAULT_NEXT_HOP: &str = "192.168.0.102:5060";
pub const DEFAULT_USER_AGENT: &str = "Sippy B2BUA (Simple)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct B2buaConfig {
    /// Where the outbound leg of every new call is sent
    pub next_hop: HostPort,

    /// Value of the User-Agent and Server headers
    pub user_agent: String,

    /// RTP payload types offered on both legs
    pub allowed_formats: Vec<u8>,

    /// Address to listen on; engine default when unset
    pub local_address: Option<IpAddr>,

    pub local_port: Option<u16>,

    /// How long a graceful shutdown waits for calls to clear
    pub shutdown_grace_ms: u64,
}

impl Default for B2buaConfig {
    fn default() -> Self {
        Self {
            next_hop: HostPort::new("192.168.0.102", 5060),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            allowed_formats: vec![0, 8, 18, 100, 101],
            local_address: None,
            local_port: None,
            shutdown_grace_ms: 1000,
        }
    }
}

impl B2buaConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document and validate the result.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| B2buaError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
            .map_err(|e| B2buaError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Set the next hop from its `host[:port]` text form.
    pub fn with_next_hop(mut self, next_hop: &str) -> Result<Self> {
        self.next_hop = next_hop.parse()?;
        Ok(self)
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_allowed_formats(mut self, formats: Vec<u8>) -> Self {
        self.allowed_formats = formats;
        self
    }

    pub fn with_local_address(mut self, address: IpAddr) -> Self {
        self.local_address = Some(address);
        self
    }

    pub fn with_local_port(mut self, port: u16) -> Self {
        self.local_port = Some(port);
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            return Err(B2buaError::Config("user_agent cannot be empty".to_string()));
        }

        if self.next_hop.port == 0 {
            return Err(B2buaError::Config("next_hop port cannot be 0".to_string()));
        }

        // Static payload types live below 96, dynamic ones in 96..=127.
        if let Some(pt) = self.allowed_formats.iter().find(|pt| **pt > 127) {
            return Err(B2buaError::Config(format!("invalid RTP payload type {}", pt)));
        }

        if self.local_port == Some(0) {
            return Err(B2buaError::Config("local_port cannot be 0".to_string()));
        }

        Ok(())
    }
}
