//! CSRF state management for OAuth flows.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// State data stored while a login is pending.
#[derive(Debug, Clone)]
pub struct StateData {
    /// Redirect URI the authorization URL was built with.
    pub redirect_uri: String,
    /// When this state expires.
    pub expires_at: DateTime<Utc>,
}

/// Manager for OAuth state parameters with expiration.
///
/// Generates and validates CSRF state tokens. Each token validates at most once,
/// so a replayed callback can never reach the token endpoint a second time.
#[derive(Clone)]
pub struct StateManager {
    states: Arc<Mutex<HashMap<String, StateData>>>,
    ttl: Duration,
}

impl StateManager {
    /// Create a new state manager with default TTL of 10 minutes.
    pub fn new() -> Self {
        Self::with_ttl(Duration::minutes(10))
    }

    /// Create a new state manager with custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            states: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Generate a new state token for a login that will return to `redirect_uri`.
    ///
    /// Expired entries are purged on every call. A TTL reaching past the
    /// representable range keeps the state until it is used.
    pub fn generate(&self, redirect_uri: &str) -> String {
        let state = Self::generate_token();
        let now = Utc::now();

        let data = StateData {
            redirect_uri: redirect_uri.to_string(),
            expires_at: now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        };

        let mut states = self.lock();
        states.retain(|_, data| data.expires_at > now);
        states.insert(state.clone(), data);

        state
    }

    /// Validate and consume a state token.
    ///
    /// Returns `None` if the token is unknown, expired or was already consumed.
    pub fn validate(&self, state: &str) -> Option<StateData> {
        let data = self.lock().remove(state)?;

        if Utc::now() > data.expires_at {
            return None;
        }
        Some(data)
    }

    /// Number of logins currently pending.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    // A panic while holding the lock cannot leave the map half-updated, so a
    // poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, StateData>> {
        self.states.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Generate a cryptographically random state token.
    fn generate_token() -> String {
        let random_bytes: [u8; 32] = rand::thread_rng().gen();
        hex::encode(random_bytes)
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}
