//! Bungie.net OAuth provider implementation.

use async_trait::async_trait;
use chrono::Utc;
use log::*;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use crate::api_key::{ApiKeyAuth, ProviderAuth};
use crate::error::{oauth_error, Error, ErrorKind, OAuthErrorKind};
use crate::oauth::token::{TokenResponse, Tokens};
use crate::oauth::AuthorizationRequest;

/// Endpoints of the Bungie.net authorization server.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub authorize_url: String,
    pub token_url: String,
}

/// Error body returned by the token endpoint on a failed exchange.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl ErrorResponse {
    fn describe(&self) -> String {
        match &self.error_description {
            Some(description) => format!("{} ({})", self.error, description),
            None => self.error.clone(),
        }
    }
}

/// Bungie.net OAuth provider for confidential clients.
///
/// Holds the client secret server-side and performs the authorization code
/// exchange with a form encoded POST.
#[derive(Debug)]
pub struct Provider {
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
    scopes: Vec<String>,
    endpoints: Endpoints,
    api_key: Option<ApiKeyAuth>,
    http_client: reqwest::Client,
}

impl Provider {
    /// Create a new Bungie.net OAuth provider.
    ///
    /// # Arguments
    ///
    /// * `client_id` - OAuth client id from the application portal
    /// * `client_secret` - OAuth client secret from the application portal
    /// * `redirect_uri` - The redirect URI registered for the application
    /// * `scopes` - Scopes requested during authorization
    /// * `endpoints` - Authorization and token endpoints
    /// * `http_client` - Shared client used for the exchange
    pub fn new(
        client_id: String,
        client_secret: SecretString,
        redirect_uri: String,
        scopes: Vec<String>,
        endpoints: Endpoints,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
            scopes,
            endpoints,
            api_key: None,
            http_client,
        }
    }

    /// Send the application API key with token exchange requests.
    pub fn with_api_key(mut self, api_key: ApiKeyAuth) -> Self {
        self.api_key = Some(api_key);
        self
    }
}

#[async_trait]
impl crate::oauth::Provider for Provider {
    fn name(&self) -> &'static str {
        "Bungie.net"
    }

    fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    fn authorization_url(&self, state: &str) -> Result<AuthorizationRequest, Error> {
        let mut url = Url::parse(&self.endpoints.authorize_url).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::OAuth(OAuthErrorKind::InvalidConfiguration),
        })?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", &self.scopes.join(","))
            .append_pair("response_type", "code")
            .append_pair("state", state);

        Ok(AuthorizationRequest {
            url: url.into(),
            state: state.to_string(),
        })
    }

    async fn exchange_code(&self, code: &str) -> Result<Tokens, Error> {
        let form = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret().as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        debug!("Exchanging Bungie.net authorization code for an access token");

        let mut request = self.http_client.post(&self.endpoints.token_url).form(&form);
        if let Some(api_key) = &self.api_key {
            request = api_key.authenticate(request);
        }

        let response = request.send().await.map_err(|e| {
            warn!("Failed to reach Bungie.net token endpoint: {:?}", e);
            Error::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.describe())
                .unwrap_or(body);
            warn!("Bungie.net token endpoint returned {status}: {detail}");
            return Err(oauth_error(
                OAuthErrorKind::TokenExchangeFailed,
                &format!("token endpoint returned {status}: {detail}"),
            ));
        }

        let token_response: TokenResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse Bungie.net token response: {:?}", e);
            Error {
                source: Some(Box::new(e)),
                error_kind: ErrorKind::OAuth(OAuthErrorKind::InvalidResponse),
            }
        })?;

        let tokens = token_response.into_tokens(Utc::now())?;
        info!("Successfully exchanged Bungie.net authorization code");
        Ok(tokens)
    }
}
