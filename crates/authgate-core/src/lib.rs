//! # AuthGate Core
//!
//! Engine contract, shared types, and configuration for AuthGate.
//!
//! This crate provides:
//! - The [`AuthEngine`] trait the gateway dispatches to
//! - Request-scoped [`Session`] and token payload types
//! - Configuration loading and validation (JSON5 format)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod types;

pub use config::{Config, ConfigError, EmailConfig, EngineConfig, ServerConfig};
pub use engine::{AuthEngine, EngineError};
pub use types::{
    Credentials, DecodedToken, EmailOutcome, Session, TokenData, TokenPair, User, UserLookup,
};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::engine::{AuthEngine, EngineError};
    pub use crate::types::*;
}
