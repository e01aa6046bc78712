//! Service-role client. Compiled only into server builds.

use secrecy::SecretString;

use super::client::{BackendClient, Capability};
use super::error::ConstructionError;
use crate::infrastructure::config::{validate_server_config, ServerConfig};

/// Service-role secret. Only this module can mint one.
#[derive(Debug, Clone)]
pub struct AdminKey(SecretString);

impl AdminKey {
    pub(crate) fn into_secret(self) -> SecretString {
        self.0
    }
}

/// Admin client from validated server settings.
///
/// Fails immediately when the service-role key is absent. The resulting
/// client neither persists nor refreshes a session.
pub fn admin_client(config: &ServerConfig) -> Result<BackendClient, ConstructionError> {
    admin_client_with_http(reqwest::Client::new(), config)
}

pub fn admin_client_with_http(
    http: reqwest::Client,
    config: &ServerConfig,
) -> Result<BackendClient, ConstructionError> {
    let key = config
        .service_role_key
        .clone()
        .ok_or(ConstructionError::MissingServiceRoleKey)?;

    Ok(BackendClient::with_http(
        http,
        &config.public,
        Capability::Admin(AdminKey(key)),
    ))
}

/// Admin client from the process environment.
pub fn create_admin_client() -> Result<BackendClient, ConstructionError> {
    let config = validate_server_config()?;
    admin_client(&config)
}
