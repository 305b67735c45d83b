//! Next-hop addresses and redirect destinations
//!
//! URIs and headers are parsed by `rvoip-sip-core`; this module only turns
//! them into the `host:port` a leg is created for.
//!
//! ```text
//! next hop: [2001:db8::1]:5062
//! redirect: sip:carol@10.0.0.7:5070;transport=udp -> 10.0.0.7:5070
//! ```

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

pub use rvoip_sip_core::types::uri::{Host, Scheme, Uri};
use serde::{Deserialize, Serialize};

use crate::common::errors::{B2buaError, Result};

pub const DEFAULT_SIP_PORT: u16 = 5060;
pub const DEFAULT_SIPS_PORT: u16 = 5061;

/// Transport-level destination of a leg.
///
/// Accepts `host`, `host:port`, `[v6]` and `[v6]:port`; the port defaults to
/// 5060. IPv6 literals keep their brackets in `host`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HostPort {
    pub host: String,
    pub port: u16,
}

impl HostPort {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl FromStr for HostPort {
    type Err = B2buaError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = |why: &str| B2buaError::InvalidAddress(format!("{}: '{}'", why, s));

        let (host, port) = if s.starts_with('[') {
            let end = s.find(']').ok_or_else(|| invalid("unterminated IPv6 reference"))?;
            let (host, rest) = s.split_at(end + 1);
            let port = match rest {
                "" => None,
                rest => Some(rest.strip_prefix(':').ok_or_else(|| invalid("garbage after IPv6 reference"))?),
            };
            (host, port)
        } else {
            match s.split_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (s, None),
            }
        };

        if host.is_empty() || host == "[]" {
            return Err(invalid("missing host"));
        }

        let port = match port {
            None => DEFAULT_SIP_PORT,
            Some(port) => port
                .parse::<u16>()
                .ok()
                .filter(|port| *port != 0)
                .ok_or_else(|| invalid("invalid port"))?,
        };

        Ok(Self::new(host, port))
    }
}

impl TryFrom<String> for HostPort {
    type Error = B2buaError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<HostPort> for String {
    fn from(value: HostPort) -> Self {
        value.to_string()
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Where requests for `uri` are sent: its host and port, or the scheme's
/// default port. Only SIP and SIPS URIs name a reachable host; anything else
/// (a `tel:` number, say) has no destination.
pub fn destination(uri: &Uri) -> Option<HostPort> {
    let default_port = match uri.scheme() {
        Scheme::Sip => DEFAULT_SIP_PORT,
        Scheme::Sips => DEFAULT_SIPS_PORT,
        _ => return None,
    };
    let host = match &uri.host {
        Host::Address(IpAddr::V6(addr)) => format!("[{}]", addr),
        host => host.to_string(),
    };
    Some(HostPort::new(host, uri.port.filter(|p| *p != 0).unwrap_or(default_port)))
}
