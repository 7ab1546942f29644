//! Application API key authentication.

use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};

/// Header Bungie.net reads the application API key from.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Trait for authenticating outbound HTTP requests.
///
/// Implementations only decorate the request they are handed. Credentials are
/// always passed in explicitly, never stored as default headers on a shared client.
pub trait ProviderAuth: Send + Sync {
    /// Apply authentication to a request builder.
    fn authenticate(&self, request: RequestBuilder) -> RequestBuilder;
}

/// API key authentication using the `X-API-Key` header.
#[derive(Debug)]
pub struct ApiKeyAuth {
    api_key: SecretString,
}

impl ApiKeyAuth {
    /// Create a new API key authenticator.
    pub fn new(api_key: SecretString) -> Self {
        Self { api_key }
    }
}

impl ProviderAuth for ApiKeyAuth {
    fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(API_KEY_HEADER, self.api_key.expose_secret())
    }
}
