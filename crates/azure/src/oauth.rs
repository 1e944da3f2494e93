use async_trait::async_trait;
use cirrus_materialize::ensure_not_cancelled;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::config::{OAuthProperties, require};
use crate::error::{TaskError, TaskResult};

/// Issues client-credential access tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Acquire a bearer token for `resource` from the authority at
    /// `auth_url`.
    async fn acquire_token(
        &self,
        auth_url: &str,
        client_id: &str,
        client_secret: &str,
        resource: &str,
    ) -> TaskResult<String>;
}

/// Fetch a JWT access token for the configured client.
#[instrument(
    skip(provider, properties, cancel),
    fields(client_id = %properties.client_id, resource = %properties.resource)
)]
pub async fn get_access_token(
    provider: &dyn TokenProvider,
    properties: &OAuthProperties,
    cancel: Option<&CancellationToken>,
) -> TaskResult<String> {
    require("auth_context_url", &properties.auth_context_url)?;
    require("resource", &properties.resource)?;
    require("client_id", &properties.client_id)?;
    require("client_secret", &properties.client_secret)?;
    ensure_not_cancelled(cancel)?;

    let token = provider
        .acquire_token(
            properties.auth_context_url.trim(),
            properties.client_id.trim(),
            &properties.client_secret,
            properties.resource.trim(),
        )
        .await?;
    if token.is_empty() {
        return Err(TaskError::Token("provider returned an empty token".to_owned()));
    }
    debug!(length = token.len(), "access token acquired");
    Ok(token)
}
