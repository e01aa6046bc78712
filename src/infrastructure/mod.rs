//! Infrastructure layer - Framework implementations
//!
//! This layer contains:
//! - Environment validation (config)
//! - Local access-token verification (auth)
//! - Repository implementations (repositories)
//! - Application state and per-request clients (state)
//! - HTTP server setup (server)

pub mod auth;
pub mod config;
pub mod repositories;
#[cfg(feature = "server")]
pub mod server;
pub mod state;

pub use repositories::*;
pub use state::{AppState, RequestClient};
