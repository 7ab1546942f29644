//! HTTP surface of the Bungie.net login: routes, controllers, session-backed
//! login state and HTML pages.

use std::sync::Arc;

use axum::Router;
use domain::error::Error as DomainError;
use domain::gateway::{self, bungie::PlatformClient, oauth};
use log::*;
use service::config::{Config, MAX_SESSION_EXPIRY_SECONDS};
use tokio::net::TcpListener;
use tower_sessions::cookie::SameSite;
use tower_sessions::session_store::ExpiredDeletion;
use tower_sessions::{Expiry, SessionManagerLayer};

pub use error::{Error, Result};
pub use session_store::ExpiringMemoryStore;

mod controller;
mod error;
mod extractors;
mod params;
mod router;
mod session_store;
mod view;

/// How often sessions that expired without a further request are swept.
const SESSION_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

/// Shared, read-only state handed to every controller.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub provider: Arc<dyn oauth::Provider>,
    pub platform: Arc<PlatformClient>,
    pub states: oauth::StateManager,
    pub sessions: ExpiringMemoryStore,
}

impl AppState {
    pub fn new(config: Config) -> core::result::Result<Self, DomainError> {
        let http_client = gateway::http_client(&config)?;
        let provider = oauth::bungie::new_provider(&config, http_client.clone())?;
        let platform = PlatformClient::from_config(&config, http_client);
        let states = oauth::state_manager(&config);

        Ok(Self {
            config,
            provider: Arc::new(provider),
            platform: Arc::new(platform),
            states,
            sessions: ExpiringMemoryStore::default(),
        })
    }
}

/// Builds the router with the in-memory session layer applied.
pub fn app(app_state: AppState) -> Router {
    let expiry_seconds = app_state
        .config
        .backend_session_expiry_seconds
        .min(MAX_SESSION_EXPIRY_SECONDS);
    let session_expiry =
        time::Duration::seconds(i64::try_from(expiry_seconds).unwrap_or(i64::MAX));
    // Lax so the cookie is sent on the top-level redirect back from Bungie.net.
    let session_layer = SessionManagerLayer::new(app_state.sessions.clone())
        .with_secure(app_state.config.is_production())
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(session_expiry));

    router::define_routes(app_state).layer(session_layer)
}

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let interface = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let listen_addr = format!("{}:{}", interface, app_state.config.port);

    info!(
        "Server starting... listening for connections on http://{listen_addr} ({} environment)",
        app_state.config.runtime_env()
    );

    let sessions = app_state.sessions.clone();
    tokio::spawn(async move {
        let mut sweep = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            sweep.tick().await;
            if let Err(e) = sessions.delete_expired().await {
                warn!("Failed to remove expired sessions: {e}");
            }
        }
    });

    let listener = TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app(app_state)).await
}
