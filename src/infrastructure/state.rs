//! Application state shared across all handlers

use std::convert::Infallible;
use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::domain::ContentRepository;
use crate::infrastructure::config::ServerConfig;
use crate::infrastructure::BackendContentRepository;
use crate::supabase::{BackendClient, Capability, RequestCookies};

#[derive(Clone)]
pub struct AppState {
    /// Validated backend settings
    config: Arc<ServerConfig>,
    /// Connection pool shared by every client built from this state
    http: reqwest::Client,
    /// Published content, read with the public client
    pub content_repo: Arc<dyn ContentRepository>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let http = reqwest::Client::new();
        let public = BackendClient::with_http(http.clone(), &config.public, Capability::Public);
        let content_repo = Arc::new(BackendContentRepository::new(public));

        Self {
            config: Arc::new(config),
            http,
            content_repo,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// A client bound to the cookies of one inbound request.
    pub fn request_client(&self, cookies: RequestCookies) -> BackendClient {
        BackendClient::with_http(
            self.http.clone(),
            &self.config.public,
            Capability::RequestScoped(cookies),
        )
    }
}

/// Request-scoped client plus the cookie jar it writes to. Handlers return
/// `cookies` as a response part so refreshed sessions reach the browser.
pub struct RequestClient {
    pub client: BackendClient,
    pub cookies: RequestCookies,
}

#[async_trait]
impl FromRequestParts<AppState> for RequestClient {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookies = RequestCookies::from_headers(&parts.headers);
        let client = state.request_client(cookies.clone());
        Ok(Self { client, cookies })
    }
}
