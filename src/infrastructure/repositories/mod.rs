//! Repository implementations backed by the hosted table API

pub mod content_repository;

pub use content_repository::BackendContentRepository;
