//! OAuth provider trait and types.

use async_trait::async_trait;

use super::token::Tokens;
use crate::error::Error;

/// Authorization request with the URL to send the browser to.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Authorization URL to redirect the user to.
    pub url: String,
    /// CSRF state parameter embedded in `url`.
    pub state: String,
}

/// Trait for OAuth 2.0 authorization code providers.
///
/// Implementations hold the client credentials and the single canonical
/// redirect URI, so the value sent during authorization and the value sent
/// during the exchange can never drift apart.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human readable provider name, used in logs and pages.
    fn name(&self) -> &'static str;

    /// The redirect URI registered with the provider.
    fn redirect_uri(&self) -> &str;

    /// Generate the authorization URL for the given CSRF state.
    ///
    /// The URL carries `client_id`, `redirect_uri`, `scope`, `response_type=code`
    /// and `state`. It never carries the client secret.
    fn authorization_url(&self, state: &str) -> Result<AuthorizationRequest, Error>;

    /// Exchange a single-use authorization code for an access token.
    ///
    /// Called at most once per code; failures are returned, never retried.
    async fn exchange_code(&self, code: &str) -> Result<Tokens, Error>;
}
