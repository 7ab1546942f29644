//! OAuth authentication gateway.
//!
//! Re-exports OAuth types from bungie-auth and builds the configured provider.

pub mod bungie;

pub use bungie_auth::oauth::{
    token::Tokens, AuthorizationRequest, Provider, StateData, StateManager,
};

use service::config::Config;

/// Pending login states expire after the configured TTL.
pub fn state_manager(config: &Config) -> StateManager {
    let ttl = chrono::Duration::from_std(config.oauth_state_ttl())
        .unwrap_or_else(|_| chrono::Duration::minutes(10));
    StateManager::with_ttl(ttl)
}
