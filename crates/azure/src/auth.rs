use std::sync::Arc;

use async_trait::async_trait;
use azure_core::credentials::{Secret, TokenCredential};
use tracing::{debug, error, info};

use crate::config::AzureStorageConfig;
use crate::error::{TaskError, TaskResult, classify_azure_error};
use crate::oauth::TokenProvider;

/// Build the credential a storage client signs requests with.
///
/// A complete service principal in `config` gives a
/// `ClientSecretCredential`; otherwise the Azure CLI login is used.
pub fn build_azure_credential(
    config: &AzureStorageConfig,
) -> TaskResult<Arc<dyn TokenCredential>> {
    if let Some((tenant_id, client_id, client_credential)) = config.service_principal() {
        info!("using service-principal credentials for storage");
        debug!(tenant_id, "building ClientSecretCredential");
        let credential = azure_identity::ClientSecretCredential::new(
            tenant_id,
            client_id.to_owned(),
            Secret::new(client_credential.to_owned()),
            None,
        )
        .map_err(|e| TaskError::Configuration(e.to_string()))?;
        Ok(credential)
    } else {
        info!("using AzureCliCredential for storage");
        let credential = azure_identity::AzureCliCredential::new(None)
            .map_err(|e| TaskError::Configuration(e.to_string()))?;
        Ok(credential)
    }
}

/// [`TokenProvider`] backed by an `azure_identity` client-secret credential.
///
/// The tenant is the last path segment of the authority URL and the scope is
/// `{resource}/.default`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AzureIdentityTokenProvider;

impl AzureIdentityTokenProvider {
    pub fn new() -> Self {
        Self
    }
}

/// Tenant id from an authority URL such as
/// `https://login.microsoftonline.com/{tenant}/`.
pub fn tenant_from_authority(auth_url: &str) -> TaskResult<&str> {
    auth_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|tenant| !tenant.is_empty() && !tenant.contains(':'))
        .ok_or_else(|| TaskError::invalid_input("auth_context_url", "does not name a tenant"))
}

/// Token scope for a resource URI.
pub fn default_scope(resource: &str) -> String {
    format!("{}/.default", resource.trim_end_matches('/'))
}

#[async_trait]
impl TokenProvider for AzureIdentityTokenProvider {
    async fn acquire_token(
        &self,
        auth_url: &str,
        client_id: &str,
        client_secret: &str,
        resource: &str,
    ) -> TaskResult<String> {
        let tenant_id = tenant_from_authority(auth_url)?;
        debug!(tenant_id, "building ClientSecretCredential");

        let credential = azure_identity::ClientSecretCredential::new(
            tenant_id,
            client_id.to_owned(),
            Secret::new(client_secret.to_owned()),
            None,
        )
        .map_err(|e| TaskError::Token(e.to_string()))?;

        let scope = default_scope(resource);
        let token = credential
            .get_token(&[scope.as_str()], None)
            .await
            .map_err(|e| {
                let err_str = e.to_string();
                error!(error = %err_str, "token request failed");
                classify_azure_error(&err_str)
            })?;

        info!(scope = %scope, "access token issued");
        Ok(token.token.secret().to_owned())
    }
}
