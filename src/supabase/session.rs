use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity embedded in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub aud: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub app_metadata: serde_json::Value,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub user_metadata: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

/// Token bundle issued by the identity provider.
///
/// Never mutated after issue; a refresh produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_in: i64,
    /// Unix seconds. Older token responses omit it; see [`Session::stamp_expiry`].
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    /// Fill `expires_at` from `expires_in` when the backend left it out.
    pub(crate) fn stamp_expiry(mut self, now: DateTime<Utc>) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = Some(now.timestamp() + self.expires_in);
        }
        self
    }

    /// True if the session is expired or will be within `margin_secs`.
    pub fn expires_within(&self, now: DateTime<Utc>, margin_secs: i64) -> bool {
        match self.expires_at {
            Some(at) => at - now.timestamp() <= margin_secs,
            None => false,
        }
    }
}

/// Kind of change published by the auth channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthChangeEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// One notification: the event and the session that is current after it.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthChange {
    pub event: AuthChangeEvent,
    pub session: Option<Session>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn user(email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            aud: "authenticated".to_string(),
            role: Some("authenticated".to_string()),
            email: Some(email.to_string()),
            app_metadata: serde_json::json!({}),
            user_metadata: serde_json::json!({}),
            created_at: None,
            last_sign_in_at: None,
        }
    }

    pub fn session(email: &str, expires_at: i64) -> Session {
        Session {
            access_token: format!("access-{}", email),
            refresh_token: format!("refresh-{}", email),
            token_type: "bearer".to_string(),
            expires_in: 3600,
            expires_at: Some(expires_at),
            user: user(email),
        }
    }
}
