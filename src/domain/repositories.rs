//! Repository trait definitions
//!
//! These traits define the contract for reading portfolio content.
//! Implementations live in the infrastructure layer.

use async_trait::async_trait;

use super::OperationResult;
use crate::models::{BlogPost, BlogTag, PortfolioProject, Service};

/// A published post together with its tags.
#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub struct PostWithTags {
    #[serde(flatten)]
    pub post: BlogPost,
    pub tags: Vec<BlogTag>,
}

/// Read-only access to the public site content
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Active services, in display order
    async fn list_services(&self) -> OperationResult<Vec<Service>>;

    /// Published projects, in display order
    async fn list_projects(&self, featured_only: bool) -> OperationResult<Vec<PortfolioProject>>;

    /// A published project by slug
    async fn find_project(&self, slug: &str) -> OperationResult<Option<PortfolioProject>>;

    /// Published posts, newest first
    async fn list_posts(&self, limit: Option<u64>) -> OperationResult<Vec<BlogPost>>;

    /// A published post by slug, with its tags
    async fn find_post(&self, slug: &str) -> OperationResult<Option<PostWithTags>>;

    /// All tags, by name
    async fn list_tags(&self) -> OperationResult<Vec<BlogTag>>;
}
