//! Error types for the b2bua-core library

use thiserror::Error;

#[derive(Error, Debug)]
pub enum B2buaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    #[error("Header parse error: {0}")]
    HeaderParse(String),

    #[error("Call identifier space exhausted")]
    CallIdsExhausted,

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, B2buaError>;
