//! Shared types and errors

pub mod errors;
pub mod types;
