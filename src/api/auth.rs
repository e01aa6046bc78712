use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::domain::OperationError;
use crate::infrastructure::auth::decode_access_token;
use crate::infrastructure::{AppState, RequestClient};
use crate::services::run_query;
use crate::supabase::User;

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
}

impl From<User> for MeResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email,
            role: user.role,
        }
    }
}

fn unauthorized(message: &str) -> axum::response::Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
}

/// Password sign-in. The session is written to the response cookies.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in; session cookies set", body = User),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    RequestClient { client, cookies }: RequestClient,
    Json(payload): Json<LoginRequest>,
) -> impl IntoResponse {
    tracing::info!("Login attempt for {}", payload.email);

    let outcome = run_query(|| {
        client
            .auth()
            .sign_in_with_password(&payload.email, &payload.password)
    })
    .await;

    match outcome {
        Ok(session) => (StatusCode::OK, cookies, Json(session.user)).into_response(),
        Err(OperationError::Backend(e)) => {
            tracing::warn!("Sign-in rejected for {}: {}", payload.email, e);
            unauthorized(&e.message)
        }
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 204, description = "Signed out; session cookies cleared"))
)]
pub async fn logout(RequestClient { client, cookies }: RequestClient) -> impl IntoResponse {
    match run_query(|| client.auth().sign_out()).await {
        Ok(()) => (cookies, StatusCode::NO_CONTENT).into_response(),
        Err(e) => (cookies, e).into_response(),
    }
}

/// The signed-in user. Verified locally when a JWT secret is configured,
/// otherwise by asking the auth service.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "No valid session")
    )
)]
pub async fn me(
    State(state): State<AppState>,
    RequestClient { client, cookies }: RequestClient,
) -> impl IntoResponse {
    let Some(secret) = state.config().jwt_secret.clone() else {
        return match run_query(|| client.auth().get_user(None)).await {
            Ok(user) => (cookies, Json(MeResponse::from(user))).into_response(),
            Err(OperationError::Backend(e)) => (cookies, unauthorized(&e.message)).into_response(),
            Err(e) => (cookies, e).into_response(),
        };
    };

    let session = match run_query(|| client.auth().get_session()).await {
        Ok(Some(session)) => session,
        Ok(None) => return (cookies, unauthorized("Not signed in")).into_response(),
        Err(e) => return (cookies, e).into_response(),
    };

    match decode_access_token(&session.access_token, secret.expose_secret()) {
        Ok(claims) => (
            cookies,
            Json(MeResponse {
                id: claims.sub,
                email: claims.email,
                role: claims.role,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!("Rejected access token: {}", e);
            (cookies, unauthorized("Invalid or expired token")).into_response()
        }
    }
}
