//! Request-local cookie store used by request-scoped clients.
//!
//! Incoming `Cookie` headers seed the store. Whatever the auth layer writes
//! is applied to the store (so later reads in the same request see it) and
//! queued as `Set-Cookie` for the response, attributes untouched.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponseParts, ResponseParts};
use cookie::Cookie;

#[derive(Debug, Default)]
struct Jar {
    store: BTreeMap<String, String>,
    outgoing: Vec<Cookie<'static>>,
}

/// Cookie view of one inbound request. Cheap to clone; clones share state.
#[derive(Debug, Clone, Default)]
pub struct RequestCookies {
    jar: Arc<Mutex<Jar>>,
}

/// A `Max-Age` of zero or less asks the browser to drop the cookie.
pub fn is_removal(cookie: &Cookie<'_>) -> bool {
    cookie
        .max_age()
        .is_some_and(|age| age.is_zero() || age.is_negative())
}

impl RequestCookies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every `Cookie` header on the request.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut store = BTreeMap::new();
        for value in headers.get_all(header::COOKIE) {
            let Ok(raw) = value.to_str() else {
                continue;
            };
            for parsed in Cookie::split_parse(raw) {
                match parsed {
                    Ok(cookie) => {
                        store.insert(cookie.name().to_string(), cookie.value_trimmed().to_string());
                    }
                    Err(e) => tracing::debug!("Skipping malformed cookie pair: {}", e),
                }
            }
        }
        Self {
            jar: Arc::new(Mutex::new(Jar {
                store,
                outgoing: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Jar> {
        self.jar.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get_all(&self) -> Vec<(String, String)> {
        self.lock()
            .store
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.lock().store.get(name).cloned()
    }

    /// Apply cookies to the request-local store and queue them for the response.
    pub fn set_all(&self, cookies: Vec<Cookie<'static>>) {
        let mut jar = self.lock();
        for cookie in cookies {
            if is_removal(&cookie) {
                jar.store.remove(cookie.name());
            } else {
                jar.store
                    .insert(cookie.name().to_string(), cookie.value().to_string());
            }
            jar.outgoing.push(cookie);
        }
    }

    /// Cookies queued for the response, leaving the queue empty.
    pub fn take_pending(&self) -> Vec<Cookie<'static>> {
        std::mem::take(&mut self.lock().outgoing)
    }

    /// Append queued cookies to `headers` as `Set-Cookie`.
    pub fn apply_to(&self, headers: &mut HeaderMap) {
        for cookie in self.take_pending() {
            match HeaderValue::from_str(&cookie.to_string()) {
                Ok(value) => {
                    headers.append(header::SET_COOKIE, value);
                }
                Err(e) => tracing::warn!("Dropping unrepresentable cookie {}: {}", cookie.name(), e),
            }
        }
    }
}

impl IntoResponseParts for RequestCookies {
    type Error = std::convert::Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        self.apply_to(res.headers_mut());
        Ok(res)
    }
}
