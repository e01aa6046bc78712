use axum::{http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::OperationError;
use crate::infrastructure::RequestClient;
use crate::services::run_query;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `healthy`, `unhealthy` or `error`
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn unhealthy(error: String) -> (StatusCode, HealthResponse) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        HealthResponse {
            status: "unhealthy",
            message: "Supabase connection error".to_string(),
            timestamp: None,
            error: Some(error),
        },
    )
}

/// Probe backend connectivity by retrieving the caller's session.
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Backend reachable", body = HealthResponse),
        (status = 500, description = "Backend error or unexpected failure", body = HealthResponse)
    )
)]
pub async fn health_check(RequestClient { client, cookies }: RequestClient) -> impl IntoResponse {
    let outcome = run_query(|| client.auth().get_session()).await;

    let (status, body) = match outcome {
        Ok(_) => (
            StatusCode::OK,
            HealthResponse {
                status: "healthy",
                message: "Supabase client initialized successfully".to_string(),
                timestamp: Some(Utc::now().to_rfc3339()),
                error: None,
            },
        ),
        Err(OperationError::Backend(e)) => unhealthy(e.message),
        // Transport and decode faults are connectivity problems, not crashes.
        Err(OperationError::Unexpected(e)) if !e.is_panic() => {
            tracing::warn!("Health check could not reach the backend: {}", e);
            unhealthy(e.message().to_string())
        }
        Err(OperationError::Unexpected(e)) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                HealthResponse {
                    status: "error",
                    message: e.message().to_string(),
                    timestamp: None,
                    error: None,
                },
            )
        }
    };

    (status, cookies, Json(body))
}
