#[cfg(feature = "server")]
pub mod api;
#[cfg(feature = "server")]
pub mod api_docs;
pub mod domain;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod supabase;

pub use infrastructure::config;
