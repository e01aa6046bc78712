pub mod auth;
pub mod content;
pub mod health;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::domain::OperationError;
use crate::infrastructure::AppState;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Auth
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        // Content
        .route("/services", get(content::list_services))
        .route("/projects", get(content::list_projects))
        .route("/projects/:slug", get(content::get_project))
        .route("/posts", get(content::list_posts))
        .route("/posts/:slug", get(content::get_post))
        .route("/tags", get(content::list_tags))
        .with_state(state)
}

impl IntoResponse for OperationError {
    fn into_response(self) -> Response {
        let status = if self.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}
