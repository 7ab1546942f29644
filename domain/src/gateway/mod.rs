//! Clients for the services behind Bungie.net.

pub mod bungie;
pub mod oauth;

use crate::error::Error;
use bungie_auth::http::HttpClientBuilder;
use service::config::Config;

/// Builds the single outbound HTTP client shared by the token exchange and
/// the platform API calls.
pub fn http_client(config: &Config) -> Result<reqwest::Client, Error> {
    Ok(HttpClientBuilder::new()
        .with_connect_timeout(config.http_connect_timeout())
        .with_timeout(config.http_timeout())
        .with_user_agent(format!(
            "{}/{}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        ))
        .build()?)
}
