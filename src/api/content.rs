use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

use crate::domain::OperationResult;
use crate::infrastructure::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProjectsQuery {
    /// Only featured projects
    #[serde(default)]
    pub featured: bool,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PostsQuery {
    /// Maximum number of posts
    pub limit: Option<u64>,
}

fn not_found(what: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("{} not found", what) })),
    )
        .into_response()
}

fn respond_one<T: serde::Serialize>(
    result: OperationResult<Option<T>>,
    what: &str,
) -> axum::response::Response {
    match result {
        Ok(Some(row)) => Json(row).into_response(),
        Ok(None) => not_found(what),
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/services",
    responses((status = 200, description = "Active services in display order", body = [crate::models::Service]))
)]
pub async fn list_services(State(state): State<AppState>) -> impl IntoResponse {
    state.content_repo.list_services().await.map(Json)
}

#[utoipa::path(
    get,
    path = "/api/projects",
    params(ProjectsQuery),
    responses((status = 200, description = "Published projects", body = [crate::models::PortfolioProject]))
)]
pub async fn list_projects(
    State(state): State<AppState>,
    Query(query): Query<ProjectsQuery>,
) -> impl IntoResponse {
    state.content_repo.list_projects(query.featured).await.map(Json)
}

#[utoipa::path(
    get,
    path = "/api/projects/{slug}",
    params(("slug" = String, Path, description = "Project slug")),
    responses(
        (status = 200, description = "Project found", body = crate::models::PortfolioProject),
        (status = 404, description = "No published project with that slug")
    )
)]
pub async fn get_project(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    respond_one(state.content_repo.find_project(&slug).await, "Project")
}

#[utoipa::path(
    get,
    path = "/api/posts",
    params(PostsQuery),
    responses((status = 200, description = "Published posts, newest first", body = [crate::models::BlogPost]))
)]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PostsQuery>,
) -> impl IntoResponse {
    state.content_repo.list_posts(query.limit).await.map(Json)
}

#[utoipa::path(
    get,
    path = "/api/posts/{slug}",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Post with its tags", body = crate::domain::PostWithTags),
        (status = 404, description = "No published post with that slug")
    )
)]
pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    respond_one(state.content_repo.find_post(&slug).await, "Post")
}

#[utoipa::path(
    get,
    path = "/api/tags",
    responses((status = 200, description = "All tags by name", body = [crate::models::BlogTag]))
)]
pub async fn list_tags(State(state): State<AppState>) -> impl IntoResponse {
    state.content_repo.list_tags().await.map(Json)
}
