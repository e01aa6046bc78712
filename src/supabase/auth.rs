//! Identity channel: session storage, token endpoints and change notifications.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use serde_json::json;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use url::Url;

use cookie::{time, Cookie, SameSite};
use secrecy::{ExposeSecret, SecretString};

use super::cookies::RequestCookies;
use super::error::{BackendError, ClientError};
use super::session::{AuthChange, AuthChangeEvent, Session, User};
use super::client::read_json;

/// Refresh when the access token expires within this many seconds.
const EXPIRY_MARGIN_SECS: i64 = 30;
const AUTO_REFRESH_TICK: Duration = Duration::from_secs(30);
const AUTO_REFRESH_TICK_THRESHOLD: i64 = 3;
const EVENT_CAPACITY: usize = 16;

/// Cookie values longer than this are split into `name.0`, `name.1`, ...
const MAX_CHUNK_SIZE: usize = 3180;
const BASE64_PREFIX: &str = "base64-";
/// 400 days, the longest lifetime browsers honour.
const COOKIE_MAX_AGE_SECS: i64 = 400 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthOptions {
    pub auto_refresh_token: bool,
    pub persist_session: bool,
}

/// Where the current session lives.
pub(crate) enum SessionStore {
    Memory(Mutex<Option<Session>>),
    Cookies {
        cookies: RequestCookies,
        name: String,
    },
    Disabled,
}

impl SessionStore {
    pub(crate) fn memory() -> Self {
        SessionStore::Memory(Mutex::new(None))
    }

    pub(crate) fn cookies(cookies: RequestCookies, name: String) -> Self {
        SessionStore::Cookies { cookies, name }
    }

    fn slot(mutex: &Mutex<Option<Session>>) -> MutexGuard<'_, Option<Session>> {
        mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn load(&self) -> Option<Session> {
        match self {
            SessionStore::Memory(slot) => Self::slot(slot).clone(),
            SessionStore::Cookies { cookies, name } => read_cookie_session(cookies, name),
            SessionStore::Disabled => None,
        }
    }

    fn save(&self, session: &Session) {
        match self {
            SessionStore::Memory(slot) => *Self::slot(slot) = Some(session.clone()),
            SessionStore::Cookies { cookies, name } => write_cookie_session(cookies, name, session),
            SessionStore::Disabled => {}
        }
    }

    fn clear(&self) {
        match self {
            SessionStore::Memory(slot) => *Self::slot(slot) = None,
            SessionStore::Cookies { cookies, name } => {
                let stale = existing_cookie_names(cookies, name);
                cookies.set_all(stale.into_iter().map(removal_cookie).collect());
            }
            SessionStore::Disabled => {}
        }
    }
}

fn session_cookie(name: String, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .max_age(time::Duration::seconds(COOKIE_MAX_AGE_SECS))
        .same_site(SameSite::Lax)
        .build()
}

fn removal_cookie(name: String) -> Cookie<'static> {
    let mut cookie = session_cookie(name, String::new());
    cookie.set_max_age(time::Duration::ZERO);
    cookie
}

/// The unchunked cookie and every `name.N` chunk currently present.
fn existing_cookie_names(cookies: &RequestCookies, name: &str) -> Vec<String> {
    let chunk_prefix = format!("{}.", name);
    cookies
        .get_all()
        .into_iter()
        .map(|(k, _)| k)
        .filter(|k| {
            k == name
                || k
                    .strip_prefix(&chunk_prefix)
                    .is_some_and(|idx| idx.parse::<usize>().is_ok())
        })
        .collect()
}

fn read_cookie_session(cookies: &RequestCookies, name: &str) -> Option<Session> {
    let raw = match cookies.get(name) {
        Some(value) => value,
        None => {
            let mut joined = String::new();
            let mut idx = 0;
            while let Some(chunk) = cookies.get(&format!("{}.{}", name, idx)) {
                joined.push_str(&chunk);
                idx += 1;
            }
            if joined.is_empty() {
                return None;
            }
            joined
        }
    };

    let json = match raw.strip_prefix(BASE64_PREFIX) {
        Some(encoded) => match URL_SAFE_NO_PAD.decode(encoded.trim_end_matches('=')) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Ignoring undecodable session cookie {}: {}", name, e);
                return None;
            }
        },
        None => raw.into_bytes(),
    };

    match serde_json::from_slice(&json) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::warn!("Ignoring malformed session cookie {}: {}", name, e);
            None
        }
    }
}

fn write_cookie_session(cookies: &RequestCookies, name: &str, session: &Session) {
    let json = match serde_json::to_vec(session) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to serialize session: {}", e);
            return;
        }
    };
    let value = format!("{}{}", BASE64_PREFIX, URL_SAFE_NO_PAD.encode(json));

    let chunks: Vec<(String, String)> = if value.len() <= MAX_CHUNK_SIZE {
        vec![(name.to_string(), value)]
    } else {
        // base64 output is ASCII, so byte offsets are char boundaries
        value
            .as_bytes()
            .chunks(MAX_CHUNK_SIZE)
            .enumerate()
            .map(|(idx, chunk)| {
                (
                    format!("{}.{}", name, idx),
                    String::from_utf8_lossy(chunk).into_owned(),
                )
            })
            .collect()
    };

    let mut to_set: Vec<Cookie<'static>> = existing_cookie_names(cookies, name)
        .into_iter()
        .filter(|existing| !chunks.iter().any(|(n, _)| n == existing))
        .map(removal_cookie)
        .collect();

    to_set.extend(
        chunks
            .into_iter()
            .map(|(name, value)| session_cookie(name, value)),
    );

    cookies.set_all(to_set);
}

/// Auth half of a [`BackendClient`](super::BackendClient).
pub struct AuthClient {
    http: reqwest::Client,
    auth_url: Url,
    api_key: SecretString,
    options: AuthOptions,
    store: SessionStore,
    events: broadcast::Sender<AuthChange>,
}

impl AuthClient {
    pub(crate) fn new(
        http: reqwest::Client,
        auth_url: Url,
        api_key: SecretString,
        options: AuthOptions,
        store: SessionStore,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            http,
            auth_url,
            api_key,
            options,
            store,
            events,
        }
    }

    pub fn options(&self) -> AuthOptions {
        self.options
    }

    /// Receive every change from now on, in emission order.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }

    fn emit(&self, event: AuthChangeEvent, session: Option<Session>) {
        tracing::debug!("Auth state change: {:?}", event);
        // No subscribers is fine.
        let _ = self.events.send(AuthChange { event, session });
    }

    fn url(&self, path: &str) -> Url {
        super::client::endpoint(&self.auth_url, path)
    }

    /// Current session, refreshed first if it is about to expire.
    pub async fn get_session(&self) -> Result<Option<Session>, ClientError> {
        let Some(session) = self.store.load() else {
            return Ok(None);
        };

        if !session.expires_within(Utc::now(), EXPIRY_MARGIN_SECS) {
            return Ok(Some(session));
        }

        tracing::debug!("Session expires within {}s, refreshing", EXPIRY_MARGIN_SECS);
        self.refresh_with(&session.refresh_token).await.map(Some)
    }

    /// Exchange the stored refresh token for a new session.
    pub async fn refresh_session(&self) -> Result<Option<Session>, ClientError> {
        match self.store.load() {
            Some(session) => self.refresh_with(&session.refresh_token).await.map(Some),
            None => Ok(None),
        }
    }

    async fn refresh_with(&self, refresh_token: &str) -> Result<Session, ClientError> {
        let mut url = self.url("token");
        url.query_pairs_mut().append_pair("grant_type", "refresh_token");

        let request = self
            .http
            .post(url)
            .header("apikey", self.api_key.expose_secret())
            .json(&json!({ "refresh_token": refresh_token }));

        match read_json::<Session>(request).await {
            Ok(session) => {
                let session = session.stamp_expiry(Utc::now());
                self.store.save(&session);
                self.emit(AuthChangeEvent::TokenRefreshed, Some(session.clone()));
                Ok(session)
            }
            Err(ClientError::Api(e)) if e.status.is_some_and(|s| (400..500).contains(&s)) => {
                tracing::warn!("Refresh token rejected, clearing session: {}", e);
                self.store.clear();
                self.emit(AuthChangeEvent::SignedOut, None);
                Err(ClientError::Api(e))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ClientError> {
        let mut url = self.url("token");
        url.query_pairs_mut().append_pair("grant_type", "password");

        let request = self
            .http
            .post(url)
            .header("apikey", self.api_key.expose_secret())
            .json(&json!({ "email": email, "password": password }));

        let session = read_json::<Session>(request).await?.stamp_expiry(Utc::now());
        self.store.save(&session);
        self.emit(AuthChangeEvent::SignedIn, Some(session.clone()));
        tracing::info!("Signed in user {}", session.user.id);
        Ok(session)
    }

    /// Revoke the current session and forget it locally.
    pub async fn sign_out(&self) -> Result<(), ClientError> {
        if let Some(session) = self.store.load() {
            let request = self
                .http
                .post(self.url("logout"))
                .header("apikey", self.api_key.expose_secret())
                .bearer_auth(&session.access_token);

            match super::client::read_text(request).await {
                Ok(_) => {}
                // Already gone on the backend.
                Err(ClientError::Api(e)) if matches!(e.status, Some(401 | 403 | 404)) => {
                    tracing::debug!("Logout ignored backend error: {}", e);
                }
                Err(e) => return Err(e),
            }
        }

        self.store.clear();
        self.emit(AuthChangeEvent::SignedOut, None);
        Ok(())
    }

    /// Fetch the user behind `jwt`, or behind the current session.
    pub async fn get_user(&self, jwt: Option<&str>) -> Result<User, ClientError> {
        let token = match jwt {
            Some(token) => token.to_string(),
            None => match self.get_session().await? {
                Some(session) => session.access_token,
                None => {
                    return Err(BackendError::new("Auth session missing!")
                        .with_status(401)
                        .into())
                }
            },
        };

        let request = self
            .http
            .get(self.url("user"))
            .header("apikey", self.api_key.expose_secret())
            .bearer_auth(token);

        read_json(request).await
    }

    /// Access token of the current session, or `fallback` when there is none.
    pub(crate) async fn bearer_or(&self, fallback: &str) -> String {
        match self.get_session().await {
            Ok(Some(session)) => session.access_token,
            Ok(None) => fallback.to_string(),
            Err(e) => {
                tracing::warn!("Could not load session, using client key: {}", e);
                fallback.to_string()
            }
        }
    }

    /// Keep the stored session fresh in the background.
    ///
    /// Returns `None` for clients built without auto refresh.
    pub fn spawn_auto_refresh(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.options.auto_refresh_token || !self.options.persist_session {
            return None;
        }

        let auth = Arc::clone(self);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(AUTO_REFRESH_TICK);
            let margin = AUTO_REFRESH_TICK.as_secs() as i64 * AUTO_REFRESH_TICK_THRESHOLD;
            loop {
                ticker.tick().await;
                let Some(session) = auth.store.load() else {
                    continue;
                };
                if session.expires_within(Utc::now(), margin) {
                    if let Err(e) = auth.refresh_with(&session.refresh_token).await {
                        tracing::warn!("Auto refresh failed: {}", e);
                    }
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supabase::cookies::is_removal;
    use crate::supabase::session::fixtures;

    const NAME: &str = "sb-test-auth-token";

    #[test]
    fn test_cookie_session_round_trip() {
        let cookies = RequestCookies::new();
        let session = fixtures::session("me@example.com", 2_000_000_000);

        write_cookie_session(&cookies, NAME, &session);

        let stored = cookies.get(NAME).unwrap();
        assert!(stored.starts_with(BASE64_PREFIX));
        assert_eq!(read_cookie_session(&cookies, NAME), Some(session));
    }

    #[test]
    fn test_large_session_is_chunked_and_reassembled() {
        let cookies = RequestCookies::new();
        let mut session = fixtures::session("me@example.com", 2_000_000_000);
        session.access_token = "x".repeat(5000);

        write_cookie_session(&cookies, NAME, &session);

        assert!(cookies.get(NAME).is_none());
        assert!(cookies.get(&format!("{}.0", NAME)).is_some());
        assert!(cookies.get(&format!("{}.1", NAME)).is_some());
        assert_eq!(read_cookie_session(&cookies, NAME), Some(session));
    }

    #[test]
    fn test_clear_removes_every_chunk() {
        let cookies = RequestCookies::new();
        let mut session = fixtures::session("me@example.com", 2_000_000_000);
        session.access_token = "x".repeat(5000);
        let store = SessionStore::cookies(cookies.clone(), NAME.to_string());

        store.save(&session);
        cookies.take_pending();
        store.clear();

        assert!(store.load().is_none());
        let pending = cookies.take_pending();
        assert!(pending.len() >= 2);
        assert!(pending.iter().all(is_removal));
    }

    #[test]
    fn test_malformed_cookie_reads_as_no_session() {
        let cookies = RequestCookies::new();
        cookies.set_all(vec![Cookie::new(NAME, "base64-!!!")]);
        assert!(read_cookie_session(&cookies, NAME).is_none());
    }

    #[test]
    fn test_disabled_store_never_persists() {
        let store = SessionStore::Disabled;
        store.save(&fixtures::session("me@example.com", 2_000_000_000));
        assert!(store.load().is_none());
    }
}
