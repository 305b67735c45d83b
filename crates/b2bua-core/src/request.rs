//! The slice of an inbound request the dispatcher needs, and the responses
//! it can produce on its own.

use std::fmt;
use std::str::FromStr;

use rvoip_sip_core::types::to::To;

use crate::common::errors::{B2buaError, Result};

/// SIP request method
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Invite,
    Ack,
    Bye,
    Cancel,
    Register,
    Options,
    Notify,
    Refer,
    Info,
    /// Non-standard keepalive used by some endpoints
    Ping,
    Other(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::Invite => "INVITE",
            Method::Ack => "ACK",
            Method::Bye => "BYE",
            Method::Cancel => "CANCEL",
            Method::Register => "REGISTER",
            Method::Options => "OPTIONS",
            Method::Notify => "NOTIFY",
            Method::Refer => "REFER",
            Method::Info => "INFO",
            Method::Ping => "PING",
            Method::Other(name) => name,
        }
    }
}

impl FromStr for Method {
    type Err = std::convert::Infallible;

    // Method names are case-sensitive.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "INVITE" => Method::Invite,
            "ACK" => Method::Ack,
            "BYE" => Method::Bye,
            "CANCEL" => Method::Cancel,
            "REGISTER" => Method::Register,
            "OPTIONS" => Method::Options,
            "NOTIFY" => Method::Notify,
            "REFER" => Method::Refer,
            "INFO" => Method::Info,
            "PING" => Method::Ping,
            other => Method::Other(other.to_string()),
        })
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status codes the dispatcher answers with directly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok,
    CallOrTransactionDoesNotExist,
    ServerInternalError,
    NotImplemented,
    ServiceUnavailable,
}

impl StatusCode {
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::CallOrTransactionDoesNotExist => 481,
            StatusCode::ServerInternalError => 500,
            StatusCode::NotImplemented => 501,
            StatusCode::ServiceUnavailable => 503,
        }
    }

    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::CallOrTransactionDoesNotExist => "Call Leg/Transaction Does Not Exist",
            StatusCode::ServerInternalError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.as_u16())
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}

/// A response for the engine to send on the server transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub reason: String,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            reason: status.reason_phrase().to_string(),
        }
    }

    pub fn code(&self) -> u16 {
        self.status.as_u16()
    }
}

/// An inbound request that matched no known dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDialogRequest {
    pub method: Method,
    /// Raw value of the To header, if the request carried one
    pub to: Option<String>,
    /// Call-ID header value, used for logging only
    pub call_id: Option<String>,
}

impl NewDialogRequest {
    pub fn new(method: Method, to: impl Into<String>) -> Self {
        Self {
            method,
            to: Some(to.into()),
            call_id: None,
        }
    }

    pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = Some(call_id.into());
        self
    }

    /// Tag of the To header; `Ok(None)` for a dialog-initiating request.
    pub fn to_tag(&self) -> Result<Option<String>> {
        let to = self
            .to
            .as_deref()
            .ok_or_else(|| B2buaError::HeaderParse("missing To header".to_string()))?;
        let to = To::from_str(to).map_err(|e| B2buaError::HeaderParse(format!("To '{}': {}", to, e)))?;
        Ok(to.tag().filter(|tag| !tag.is_empty()).map(str::to_string))
    }
}
