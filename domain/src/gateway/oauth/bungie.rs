//! Bungie.net OAuth provider construction.

use crate::error::Error;
use bungie_auth::api_key::ApiKeyAuth;
use bungie_auth::oauth::providers::bungie::{Endpoints, Provider as BungieProvider};
use log::*;
use secrecy::SecretString;
use service::config::{Config, ConfigError};

/// Create the Bungie.net OAuth provider from configuration.
///
/// The client id and secret are required. The API key is optional for the
/// token exchange and is attached when present.
pub fn new_provider(config: &Config, http_client: reqwest::Client) -> Result<BungieProvider, Error> {
    let client_id = config
        .bungie_client_id()
        .filter(|id| !id.is_empty())
        .ok_or(ConfigError::MissingValue("BUNGIE_CLIENT_ID"))?;
    let client_secret = config
        .bungie_client_secret()
        .filter(|secret| !secret.is_empty())
        .ok_or(ConfigError::MissingValue("BUNGIE_CLIENT_SECRET"))?;

    let provider = BungieProvider::new(
        client_id,
        SecretString::new(client_secret),
        config.redirect_uri().to_string(),
        config.scopes().to_vec(),
        Endpoints {
            authorize_url: config.authorize_url().to_string(),
            token_url: config.token_url().to_string(),
        },
        http_client,
    );

    match config.bungie_api_key() {
        Some(api_key) => Ok(provider.with_api_key(ApiKeyAuth::new(SecretString::new(api_key)))),
        None => {
            warn!("BUNGIE_API_KEY is not set, platform requests will be rejected by Bungie.net");
            Ok(provider)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainErrorKind, InternalErrorKind};
    use bungie_auth::oauth::Provider as _;
    use clap::Parser;

    #[test]
    fn test_new_provider_uses_configured_redirect_uri() {
        let config = Config::parse_from([
            "bungie_login_rs",
            "--bungie-client-id",
            "33017",
            "--bungie-client-secret",
            "s3cret",
            "--bungie-redirect-uri",
            "https://login.example.com/callback",
        ]);

        let provider = new_provider(&config, reqwest::Client::new()).unwrap();

        assert_eq!(provider.redirect_uri(), "https://login.example.com/callback");
    }

    #[test]
    fn test_new_provider_requires_client_id() {
        let config = Config::parse_from(["bungie_login_rs", "--bungie-client-id", ""]);

        let err = new_provider(&config, reqwest::Client::new()).unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Config)
        );
    }
}
