//! Clients for the hosted backend: auth, tables and object storage.
//!
//! - `client`: the capability-scoped [`BackendClient`] and its factories
//! - `admin`: service-role client, server builds only
//! - `auth`: session storage, token endpoints, change notifications
//! - `cookies`: request-local cookie store for request-scoped clients
//! - `postgrest`: row query builder
//! - `storage`: bucket operations

#[cfg(all(feature = "server", not(target_arch = "wasm32")))]
pub mod admin;
pub mod auth;
pub mod client;
pub mod cookies;
pub mod error;
pub mod postgrest;
pub mod session;
pub mod storage;

pub use auth::{AuthClient, AuthOptions};
pub use client::{
    create_public_client, create_request_scoped_client, BackendClient, Capability, CapabilityKind,
};
pub use cookies::RequestCookies;
pub use error::{BackendError, ClientError, ConstructionError};
pub use session::{AuthChange, AuthChangeEvent, Session, User};
pub use storage::{FileObject, FileOptions, UploadedObject};
