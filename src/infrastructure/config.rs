//! Environment validation for the backend connection.
//!
//! The public pair (endpoint URL + anon key) is required in every execution
//! context. The service-role key and JWT secret are server-only and optional
//! until an admin client or local token verification needs them.

use std::env;
use std::fmt;

use secrecy::SecretString;
use url::Url;

pub const URL_VAR: &str = "NEXT_PUBLIC_SUPABASE_URL";
pub const ANON_KEY_VAR: &str = "NEXT_PUBLIC_SUPABASE_ANON_KEY";
pub const SERVICE_ROLE_KEY_VAR: &str = "SUPABASE_SERVICE_ROLE_KEY";
pub const JWT_SECRET_VAR: &str = "SUPABASE_JWT_SECRET";

const REQUIRED: &str = "Required";
const INVALID_URL: &str = "Invalid url";
const EMPTY_STRING: &str = "String must contain at least 1 character(s)";

/// A single failed field, addressed by its variable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub path: &'static str,
    pub reason: String,
}

/// Every violation found in one validation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    scope: ConfigScope,
    issues: Vec<ConfigIssue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigScope {
    Public,
    Server,
}

impl ConfigError {
    pub fn issues(&self) -> &[ConfigIssue] {
        &self.issues
    }

    /// True if `name` is among the reported fields.
    pub fn names(&self, name: &str) -> bool {
        self.issues.iter().any(|issue| issue.path == name)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            ConfigScope::Public => write!(f, "Missing or invalid environment variables:")?,
            ConfigScope::Server => write!(f, "Missing or invalid server environment variables:")?,
        }
        for issue in &self.issues {
            write!(f, "\n  - {}: {}", issue.path, issue.reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigError {}

/// Connection settings safe to hand to any execution context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicConfig {
    pub url: Url,
    pub anon_key: String,
}

/// Public settings plus the server-only secrets.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub public: PublicConfig,
    pub service_role_key: Option<SecretString>,
    pub jwt_secret: Option<SecretString>,
}

impl PublicConfig {
    /// Validate from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut issues = Vec::new();
        let public = collect_public(&lookup, &mut issues);
        match public {
            Some(config) if issues.is_empty() => Ok(config),
            _ => Err(ConfigError {
                scope: ConfigScope::Public,
                issues,
            }),
        }
    }
}

impl ServerConfig {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut issues = Vec::new();
        let public = collect_public(&lookup, &mut issues);
        let service_role_key = optional_secret(&lookup, SERVICE_ROLE_KEY_VAR, &mut issues);
        let jwt_secret = optional_secret(&lookup, JWT_SECRET_VAR, &mut issues);

        match public {
            Some(public) if issues.is_empty() => Ok(Self {
                public,
                service_role_key,
                jwt_secret,
            }),
            _ => Err(ConfigError {
                scope: ConfigScope::Server,
                issues,
            }),
        }
    }
}

fn collect_public<F>(lookup: &F, issues: &mut Vec<ConfigIssue>) -> Option<PublicConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let url = match lookup(URL_VAR) {
        None => {
            issues.push(issue(URL_VAR, REQUIRED));
            None
        }
        Some(raw) => match Url::parse(raw.trim()) {
            Ok(url) => Some(url),
            Err(_) => {
                issues.push(issue(URL_VAR, INVALID_URL));
                None
            }
        },
    };

    let anon_key = match lookup(ANON_KEY_VAR) {
        None => {
            issues.push(issue(ANON_KEY_VAR, REQUIRED));
            None
        }
        Some(key) if key.is_empty() => {
            issues.push(issue(ANON_KEY_VAR, EMPTY_STRING));
            None
        }
        Some(key) => Some(key),
    };

    Some(PublicConfig {
        url: url?,
        anon_key: anon_key?,
    })
}

fn optional_secret<F>(
    lookup: &F,
    name: &'static str,
    issues: &mut Vec<ConfigIssue>,
) -> Option<SecretString>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if value.is_empty() => {
            issues.push(issue(name, EMPTY_STRING));
            None
        }
        other => other.map(SecretString::new),
    }
}

fn issue(path: &'static str, reason: &str) -> ConfigIssue {
    ConfigIssue {
        path,
        reason: reason.to_string(),
    }
}

fn process_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

/// Validate the public connection settings from the process environment.
pub fn validate_public_config() -> Result<PublicConfig, ConfigError> {
    PublicConfig::from_lookup(process_env)
}

/// Validate public and server-only settings from the process environment.
pub fn validate_server_config() -> Result<ServerConfig, ConfigError> {
    ServerConfig::from_lookup(process_env)
}

/// Process-level settings for the HTTP server.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub backend: ServerConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|s| {
                    s.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            backend: validate_server_config()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn source(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_public_config_accepts_valid_pair() {
        let config = PublicConfig::from_lookup(source(&[
            (URL_VAR, "https://abcd.supabase.co"),
            (ANON_KEY_VAR, "anon"),
        ]))
        .unwrap();

        assert_eq!(config.url.host_str(), Some("abcd.supabase.co"));
        assert_eq!(config.anon_key, "anon");
    }

    #[test]
    fn test_public_config_reports_every_missing_field() {
        let err = PublicConfig::from_lookup(source(&[])).unwrap_err();

        assert_eq!(err.issues().len(), 2);
        assert!(err.names(URL_VAR));
        assert!(err.names(ANON_KEY_VAR));
        assert_eq!(
            err.to_string(),
            "Missing or invalid environment variables:\n  \
             - NEXT_PUBLIC_SUPABASE_URL: Required\n  \
             - NEXT_PUBLIC_SUPABASE_ANON_KEY: Required"
        );
    }

    #[test]
    fn test_public_config_rejects_malformed_url() {
        let err = PublicConfig::from_lookup(source(&[
            (URL_VAR, "not a url"),
            (ANON_KEY_VAR, "anon"),
        ]))
        .unwrap_err();

        assert_eq!(
            err.issues(),
            &[ConfigIssue {
                path: URL_VAR,
                reason: "Invalid url".to_string()
            }]
        );
    }

    #[test]
    fn test_public_config_rejects_empty_key() {
        let err = PublicConfig::from_lookup(source(&[
            (URL_VAR, "http://localhost:54321"),
            (ANON_KEY_VAR, ""),
        ]))
        .unwrap_err();

        assert!(err.names(ANON_KEY_VAR));
        assert!(!err.names(URL_VAR));
    }

    #[test]
    fn test_server_config_optional_secrets() {
        let config = ServerConfig::from_lookup(source(&[
            (URL_VAR, "http://localhost:54321"),
            (ANON_KEY_VAR, "anon"),
        ]))
        .unwrap();
        assert!(config.service_role_key.is_none());
        assert!(config.jwt_secret.is_none());

        let config = ServerConfig::from_lookup(source(&[
            (URL_VAR, "http://localhost:54321"),
            (ANON_KEY_VAR, "anon"),
            (SERVICE_ROLE_KEY_VAR, "service"),
            (JWT_SECRET_VAR, "jwt"),
        ]))
        .unwrap();
        assert_eq!(
            config.service_role_key.as_ref().map(|key| key.expose_secret().as_str()),
            Some("service")
        );
        assert_eq!(
            config.jwt_secret.as_ref().map(|secret| secret.expose_secret().as_str()),
            Some("jwt")
        );
    }

    #[test]
    fn test_server_config_rejects_empty_secret_alongside_public_issues() {
        let err = ServerConfig::from_lookup(source(&[
            (ANON_KEY_VAR, "anon"),
            (SERVICE_ROLE_KEY_VAR, ""),
        ]))
        .unwrap_err();

        assert!(err.names(URL_VAR));
        assert!(err.names(SERVICE_ROLE_KEY_VAR));
        assert!(err
            .to_string()
            .starts_with("Missing or invalid server environment variables:"));
    }

    #[test]
    fn test_server_config_debug_redacts_secrets() {
        let config = ServerConfig::from_lookup(source(&[
            (URL_VAR, "http://localhost:54321"),
            (ANON_KEY_VAR, "anon"),
            (SERVICE_ROLE_KEY_VAR, "very-secret"),
            (JWT_SECRET_VAR, "signing-secret"),
        ]))
        .unwrap();

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("signing-secret"));
        assert!(rendered.contains("http://localhost:54321"));
    }
}
