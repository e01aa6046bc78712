//! Table-API implementation of ContentRepository

use async_trait::async_trait;

use crate::domain::{ContentRepository, OperationResult, PostWithTags};
use crate::models::{BlogPost, BlogPostTag, BlogTag, PortfolioProject, PostStatus, Service};
use crate::services::{fetch_many, fetch_single, run_query};
use crate::supabase::{BackendClient, ClientError};

/// Reads content with whatever client it is given; the public client is
/// enough since row-level security exposes published rows to anon.
pub struct BackendContentRepository {
    client: BackendClient,
}

impl BackendContentRepository {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ContentRepository for BackendContentRepository {
    async fn list_services(&self) -> OperationResult<Vec<Service>> {
        fetch_many(|| {
            self.client
                .table::<Service>()
                .select("*")
                .eq("is_active", true)
                .order("display_order", true)
                .fetch_many()
        })
        .await
    }

    async fn list_projects(&self, featured_only: bool) -> OperationResult<Vec<PortfolioProject>> {
        let mut query = self
            .client
            .table::<PortfolioProject>()
            .select("*")
            .eq("is_published", true);
        if featured_only {
            query = query.eq("is_featured", true);
        }
        let query = query.order("display_order", true);

        fetch_many(|| query.fetch_many()).await
    }

    async fn find_project(&self, slug: &str) -> OperationResult<Option<PortfolioProject>> {
        fetch_single(|| {
            self.client
                .table::<PortfolioProject>()
                .select("*")
                .eq("slug", slug)
                .eq("is_published", true)
                .fetch_optional()
        })
        .await
    }

    async fn list_posts(&self, limit: Option<u64>) -> OperationResult<Vec<BlogPost>> {
        let mut query = self
            .client
            .table::<BlogPost>()
            .select("*")
            .eq("status", PostStatus::Published.as_str())
            .order("published_at", false);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        fetch_many(|| query.fetch_many()).await
    }

    async fn find_post(&self, slug: &str) -> OperationResult<Option<PostWithTags>> {
        let client = &self.client;
        run_query(|| async move {
            let post: Option<BlogPost> = client
                .table::<BlogPost>()
                .select("*")
                .eq("slug", slug)
                .eq("status", PostStatus::Published.as_str())
                .fetch_optional()
                .await?;

            let Some(post) = post else {
                return Ok(None);
            };

            let links: Vec<BlogPostTag> = client
                .table::<BlogPostTag>()
                .select("*")
                .eq("blog_post_id", post.id)
                .fetch_many()
                .await?;

            let tags = if links.is_empty() {
                Vec::new()
            } else {
                client
                    .table::<BlogTag>()
                    .select("*")
                    .in_list("id", links.iter().map(|link| link.blog_tag_id))
                    .order("name", true)
                    .fetch_many()
                    .await?
            };

            Ok::<_, ClientError>(Some(PostWithTags { post, tags }))
        })
        .await
    }

    async fn list_tags(&self) -> OperationResult<Vec<BlogTag>> {
        fetch_many(|| {
            self.client
                .table::<BlogTag>()
                .select("*")
                .order("name", true)
                .fetch_many()
        })
        .await
    }
}
