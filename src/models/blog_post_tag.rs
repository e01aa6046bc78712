use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Table;

/// Join row between `blog_posts` and `blog_tags`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPostTag {
    pub blog_post_id: Uuid,
    pub blog_tag_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewBlogPostTag {
    pub blog_post_id: Uuid,
    pub blog_tag_id: Uuid,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BlogPostTagUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blog_post_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blog_tag_id: Option<Uuid>,
}

impl Table for BlogPostTag {
    const NAME: &'static str = "blog_post_tags";
}
