//! Capability-scoped backend client.
//!
//! One client type covers every execution context; what it may do is fixed
//! by the [`Capability`] it was built with.

use std::sync::Arc;

use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use url::Url;

use super::auth::{AuthClient, AuthOptions, SessionStore};
use super::cookies::RequestCookies;
use super::error::{BackendError, ClientError, ConstructionError};
use super::postgrest::QueryBuilder;
use super::storage::StorageClient;
use crate::infrastructure::config::{validate_public_config, PublicConfig};
use crate::models::Table;

#[cfg(all(feature = "server", not(target_arch = "wasm32")))]
use super::admin::AdminKey;

/// Credential scope a client is built with.
#[derive(Debug, Clone)]
pub enum Capability {
    /// Anon key, session kept in memory. Valid anywhere.
    Public,
    /// Anon key, session kept in the cookies of one inbound request.
    RequestScoped(RequestCookies),
    /// Service-role key, no session. Server builds only.
    #[cfg(all(feature = "server", not(target_arch = "wasm32")))]
    Admin(AdminKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityKind {
    Public,
    RequestScoped,
    Admin,
}

impl Capability {
    pub fn kind(&self) -> CapabilityKind {
        match self {
            Capability::Public => CapabilityKind::Public,
            Capability::RequestScoped(_) => CapabilityKind::RequestScoped,
            #[cfg(all(feature = "server", not(target_arch = "wasm32")))]
            Capability::Admin(_) => CapabilityKind::Admin,
        }
    }
}

struct Inner {
    http: reqwest::Client,
    url: Url,
    api_key: SecretString,
    kind: CapabilityKind,
    auth: Arc<AuthClient>,
}

/// Handle to the hosted backend. Clones share one auth channel.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("url", &self.inner.url.as_str())
            .field("kind", &self.inner.kind)
            .finish()
    }
}

impl BackendClient {
    /// Build a client sharing an existing connection pool.
    pub fn with_http(http: reqwest::Client, config: &PublicConfig, capability: Capability) -> Self {
        let kind = capability.kind();
        let storage_key = storage_key(&config.url);

        let (api_key, options, store) = match capability {
            Capability::Public => (
                SecretString::new(config.anon_key.clone()),
                AuthOptions {
                    auto_refresh_token: true,
                    persist_session: true,
                },
                SessionStore::memory(),
            ),
            Capability::RequestScoped(cookies) => (
                SecretString::new(config.anon_key.clone()),
                AuthOptions {
                    auto_refresh_token: false,
                    persist_session: true,
                },
                SessionStore::cookies(cookies, storage_key),
            ),
            #[cfg(all(feature = "server", not(target_arch = "wasm32")))]
            Capability::Admin(key) => (
                key.into_secret(),
                AuthOptions {
                    auto_refresh_token: false,
                    persist_session: false,
                },
                SessionStore::Disabled,
            ),
        };

        let auth = Arc::new(AuthClient::new(
            http.clone(),
            endpoint(&config.url, "auth/v1"),
            api_key.clone(),
            options,
            store,
        ));

        tracing::debug!("Created {:?} backend client for {}", kind, config.url);

        Self {
            inner: Arc::new(Inner {
                http,
                url: config.url.clone(),
                api_key,
                kind,
                auth,
            }),
        }
    }

    pub fn new(config: &PublicConfig, capability: Capability) -> Self {
        Self::with_http(reqwest::Client::new(), config, capability)
    }

    pub fn public(config: &PublicConfig) -> Self {
        Self::new(config, Capability::Public)
    }

    pub fn request_scoped(config: &PublicConfig, cookies: RequestCookies) -> Self {
        Self::new(config, Capability::RequestScoped(cookies))
    }

    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    pub fn kind(&self) -> CapabilityKind {
        self.inner.kind
    }

    pub fn auth(&self) -> &AuthClient {
        &self.inner.auth
    }

    /// Shared handle to the auth channel, for owners that outlive this borrow.
    pub fn auth_handle(&self) -> Arc<AuthClient> {
        Arc::clone(&self.inner.auth)
    }

    /// Start a query against `table`.
    pub fn from(&self, table: &str) -> QueryBuilder {
        QueryBuilder::new(self.clone(), table)
    }

    /// Start a query against the table of row type `T`.
    pub fn table<T: Table>(&self) -> QueryBuilder {
        self.from(T::NAME)
    }

    pub fn storage(&self) -> StorageClient {
        StorageClient::new(self.clone())
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    pub(crate) fn endpoint(&self, path: &str) -> Url {
        endpoint(&self.inner.url, path)
    }

    /// Attach `apikey` and the bearer token for the current caller.
    ///
    /// The bearer is the session's access token when one exists, otherwise
    /// the client's own key.
    pub(crate) async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let api_key = self.inner.api_key.expose_secret();
        let bearer = match self.inner.kind {
            CapabilityKind::Admin => api_key.clone(),
            _ => self.inner.auth.bearer_or(api_key).await,
        };
        request.header("apikey", api_key).bearer_auth(bearer)
    }
}

/// Public client from the process environment.
pub fn create_public_client() -> Result<BackendClient, ConstructionError> {
    let config = validate_public_config()?;
    Ok(BackendClient::public(&config))
}

/// Request-scoped client from the process environment.
pub fn create_request_scoped_client(
    cookies: RequestCookies,
) -> Result<BackendClient, ConstructionError> {
    let config = validate_public_config()?;
    Ok(BackendClient::request_scoped(&config, cookies))
}

pub(crate) fn endpoint(base: &Url, path: &str) -> Url {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    // Both halves come from an already valid URL.
    Url::parse(&joined).unwrap_or_else(|_| base.clone())
}

/// Cookie name the session is persisted under: `sb-<project-ref>-auth-token`.
pub(crate) fn storage_key(url: &Url) -> String {
    let project_ref = url
        .host_str()
        .and_then(|host| host.split('.').next())
        .unwrap_or("local");
    format!("sb-{}-auth-token", project_ref)
}

/// Send, then decode a success body as `T` or an error body as [`BackendError`].
pub(crate) async fn read_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
    let body = read_text(request).await?;
    Ok(serde_json::from_str(&body)?)
}

pub(crate) async fn read_text(request: RequestBuilder) -> Result<String, ClientError> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(BackendError::from_response(status.as_u16(), &body).into());
    }
    Ok(body)
}
