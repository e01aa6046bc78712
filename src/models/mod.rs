//! Row shapes of the backend tables.
//!
//! The relational store owns these rows; nothing here enforces cross-row
//! invariants.

pub mod blog_post;
pub mod blog_post_tag;
pub mod blog_tag;
pub mod media;
pub mod portfolio_project;
pub mod profile;
pub mod project_image;
pub mod service;

pub use blog_post::{BlogPost, BlogPostUpdate, NewBlogPost, PostStatus};
pub use blog_post_tag::{BlogPostTag, BlogPostTagUpdate, NewBlogPostTag};
pub use blog_tag::{BlogTag, BlogTagUpdate, NewBlogTag};
pub use media::{Media, MediaUpdate, NewMedia};
pub use portfolio_project::{NewPortfolioProject, PortfolioProject, PortfolioProjectUpdate};
pub use profile::{NewProfile, Profile, ProfileRole, ProfileUpdate};
pub use project_image::{NewProjectImage, ProjectImage, ProjectImageUpdate};
pub use service::{NewService, Service, ServiceUpdate};

/// A row type stored in a named table.
pub trait Table {
    const NAME: &'static str;
}
