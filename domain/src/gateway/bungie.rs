//! Bungie.net platform API client.
//!
//! Every call takes the user's access token as an argument. The client itself
//! only carries the application API key, so one instance is shared by all
//! sessions.

use crate::error::{DomainErrorKind, Error, ExternalErrorKind};
use bungie_auth::api_key::{ApiKeyAuth, BearerTokenAuth, ProviderAuth};
use log::*;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::Value;
use service::config::Config;

/// `ErrorCode` Bungie.net reports for a successful platform call.
const PLATFORM_SUCCESS: i64 = 1;

/// Wrapper Bungie.net puts around every platform response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Envelope {
    #[serde(default)]
    response: Option<Value>,
    error_code: i64,
    #[serde(default)]
    error_status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub struct PlatformClient {
    client: reqwest::Client,
    base_url: String,
    profile_path: String,
    api_key: Option<ApiKeyAuth>,
}

impl PlatformClient {
    pub fn new(client: reqwest::Client, base_url: &str, profile_path: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            profile_path: profile_path.to_string(),
            api_key: None,
        }
    }

    pub fn from_config(config: &Config, client: reqwest::Client) -> Self {
        let platform = Self::new(client, config.api_base_url(), config.profile_path());
        match config.bungie_api_key() {
            Some(api_key) => platform.with_api_key(ApiKeyAuth::new(SecretString::new(api_key))),
            None => platform,
        }
    }

    pub fn with_api_key(mut self, api_key: ApiKeyAuth) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// Fetches the signed-in user's Bungie.net account and linked memberships.
    pub async fn current_user_memberships(&self, access_token: &SecretString) -> Result<Value, Error> {
        self.get(&self.profile_path, access_token).await
    }

    /// Issues one authenticated GET against `path` and unwraps the envelope.
    pub async fn get(&self, path: &str, access_token: &SecretString) -> Result<Value, Error> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {url}");

        let mut request = BearerTokenAuth::new(access_token.clone()).authenticate(self.client.get(&url));
        if let Some(api_key) = &self.api_key {
            request = api_key.authenticate(request);
        }

        let response = request.send().await.map_err(|e| {
            warn!("Failed to reach Bungie.net platform API: {:?}", e);
            resource_error(Some(Box::new(e)))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Bungie.net platform API returned {status}: {error_text}");
            return Err(resource_error(None));
        }

        let envelope: Envelope = response.json().await.map_err(|e| {
            warn!("Failed to parse Bungie.net platform response: {:?}", e);
            resource_error(Some(Box::new(e)))
        })?;

        if envelope.error_code != PLATFORM_SUCCESS {
            warn!(
                "Bungie.net platform error {} {}: {}",
                envelope.error_code,
                envelope.error_status.as_deref().unwrap_or("Unknown"),
                envelope.message.as_deref().unwrap_or_default()
            );
            return Err(resource_error(None));
        }

        envelope.response.ok_or_else(|| {
            warn!("Bungie.net platform response carried no payload");
            resource_error(None)
        })
    }
}

fn resource_error(source: Option<Box<dyn std::error::Error + Send + Sync>>) -> Error {
    Error {
        source,
        error_kind: DomainErrorKind::External(ExternalErrorKind::ResourceFetch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    const PROFILE_PATH: &str = "/User/GetMembershipsForCurrentUser/";

    fn platform(server: &mockito::ServerGuard) -> PlatformClient {
        PlatformClient::new(
            reqwest::Client::new(),
            &format!("{}/Platform/", server.url()),
            PROFILE_PATH,
        )
        .with_api_key(ApiKeyAuth::new(SecretString::new("key-1".to_string())))
    }

    fn token() -> SecretString {
        SecretString::new("tok-1".to_string())
    }

    #[tokio::test]
    async fn test_get_sends_bearer_and_api_key() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/Platform/User/GetMembershipsForCurrentUser/")
            .match_header("authorization", "Bearer tok-1")
            .match_header("x-api-key", "key-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"Response":{"bungieNetUser":{"displayName":"Guardian"}},"ErrorCode":1,"ErrorStatus":"Success","Message":"Ok"}"#)
            .expect(1)
            .create_async()
            .await;

        let value = platform(&server)
            .current_user_memberships(&token())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(value["bungieNetUser"]["displayName"], "Guardian");
    }

    #[tokio::test]
    async fn test_get_fails_on_non_success_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", Matcher::Any)
            .with_status(500)
            .with_body("upstream down")
            .create_async()
            .await;

        let err = platform(&server)
            .current_user_memberships(&token())
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::ResourceFetch)
        );
    }

    #[tokio::test]
    async fn test_get_fails_on_envelope_error_with_http_ok() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ErrorCode":99,"ErrorStatus":"WebAuthRequired","Message":"Please sign in"}"#)
            .create_async()
            .await;

        let err = platform(&server)
            .current_user_memberships(&token())
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::ResourceFetch)
        );
    }

    #[tokio::test]
    async fn test_get_fails_on_malformed_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", Matcher::Any)
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let err = platform(&server)
            .current_user_memberships(&token())
            .await
            .unwrap_err();

        assert!(err.source.is_some());
        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::ResourceFetch)
        );
    }
}
