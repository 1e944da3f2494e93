use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use cirrus_azure::{OAuthProperties, TaskError, TaskResult, TokenProvider, get_access_token};

// -- Mock provider --------------------------------------------------------

#[derive(Default)]
struct MockProvider {
    token: String,
    requests: Mutex<Vec<(String, String, String)>>,
}

impl MockProvider {
    fn issuing(token: &str) -> Self {
        Self {
            token: token.to_owned(),
            requests: Mutex::default(),
        }
    }
}

#[async_trait]
impl TokenProvider for MockProvider {
    async fn acquire_token(
        &self,
        auth_url: &str,
        client_id: &str,
        _client_secret: &str,
        resource: &str,
    ) -> TaskResult<String> {
        self.requests.lock().unwrap().push((
            auth_url.to_owned(),
            client_id.to_owned(),
            resource.to_owned(),
        ));
        Ok(self.token.clone())
    }
}

fn properties() -> OAuthProperties {
    OAuthProperties::new(
        "https://login.microsoftonline.com/contoso",
        "https://storage.azure.com",
        "app-id",
        "app-secret",
    )
}

#[tokio::test]
async fn token_is_returned_from_provider() {
    let provider = MockProvider::issuing("eyJ0eXAi.payload.sig");
    let token = get_access_token(&provider, &properties(), None).await.unwrap();
    assert_eq!(token, "eyJ0eXAi.payload.sig");

    let requests = provider.requests.lock().unwrap();
    assert_eq!(
        requests.as_slice(),
        [(
            "https://login.microsoftonline.com/contoso".to_owned(),
            "app-id".to_owned(),
            "https://storage.azure.com".to_owned(),
        )]
    );
}

#[tokio::test]
async fn blank_properties_are_rejected() {
    let provider = MockProvider::issuing("token");
    let mut props = properties();
    props.client_secret = "  ".to_owned();

    let err = get_access_token(&provider, &props, None).await.unwrap_err();
    assert!(matches!(err, TaskError::InvalidInput { field: "client_secret", .. }));
    assert!(provider.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn empty_token_is_an_error() {
    let provider = MockProvider::default();
    let err = get_access_token(&provider, &properties(), None).await.unwrap_err();
    assert!(matches!(err, TaskError::Token(_)));
}

#[tokio::test]
async fn cancelled_request_never_reaches_provider() {
    let provider = MockProvider::issuing("token");
    let token = CancellationToken::new();
    token.cancel();

    let err = get_access_token(&provider, &properties(), Some(&token))
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::Cancelled));
    assert!(provider.requests.lock().unwrap().is_empty());
}
