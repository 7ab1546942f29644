//! The authorization code login flow: initiation and callback handling.
//!
//! The per-browser progress of the flow is modeled by [`LoginState`], which the
//! web layer keeps in the user's session. Operations here never touch the
//! session directly; they take the state they need and return the next one.

use crate::error::{AuthFlowErrorKind, DomainErrorKind, Error, ExternalErrorKind, InternalErrorKind};
use crate::gateway::oauth::{Provider, StateManager, Tokens};
use bungie_auth::error::{token_error, TokenErrorKind};
use bungie_auth::oauth::token::is_expired_at;
use chrono::{DateTime, Utc};
use log::*;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Progress of the login flow for one browser session.
///
/// The absence of any stored state is `Idle`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoginState {
    #[default]
    Idle,
    /// The browser was sent to the authorization server with `csrf_state`.
    Pending { csrf_state: String },
    Authenticated { token: SessionToken },
    Failed { reason: FailureReason },
}

/// Why the flow stopped, shown to the user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    AuthorizationDenied(String),
    InvalidState,
    TokenExchangeFailed,
    TokenExpired,
    ResourceFetchFailed,
    NotAuthenticated,
    Misconfigured,
}

impl FailureReason {
    pub fn message(&self) -> String {
        match self {
            FailureReason::AuthorizationDenied(detail) => {
                format!("Bungie.net did not authorize the login: {detail}")
            }
            FailureReason::InvalidState => {
                "The login response did not match a login started from this browser, or it was already used. Please sign in again.".to_string()
            }
            FailureReason::TokenExchangeFailed => {
                "Bungie.net did not accept the authorization code. Please sign in again.".to_string()
            }
            FailureReason::TokenExpired => {
                "Your Bungie.net session has expired. Please sign in again.".to_string()
            }
            FailureReason::ResourceFetchFailed => {
                "Your profile could not be loaded from Bungie.net.".to_string()
            }
            FailureReason::NotAuthenticated => "You are not signed in.".to_string(),
            FailureReason::Misconfigured => {
                "Login is not configured correctly on this server.".to_string()
            }
        }
    }
}

impl From<&Error> for FailureReason {
    fn from(err: &Error) -> Self {
        match &err.error_kind {
            DomainErrorKind::Auth(AuthFlowErrorKind::AuthorizationDenied(detail)) => {
                FailureReason::AuthorizationDenied(detail.clone())
            }
            DomainErrorKind::Auth(AuthFlowErrorKind::InvalidState) => FailureReason::InvalidState,
            DomainErrorKind::Auth(AuthFlowErrorKind::TokenExpired) => FailureReason::TokenExpired,
            DomainErrorKind::Auth(AuthFlowErrorKind::NotAuthenticated) => {
                FailureReason::NotAuthenticated
            }
            DomainErrorKind::External(ExternalErrorKind::ResourceFetch) => {
                FailureReason::ResourceFetchFailed
            }
            DomainErrorKind::Internal(InternalErrorKind::Config) => FailureReason::Misconfigured,
            DomainErrorKind::External(_) | DomainErrorKind::Internal(_) => {
                FailureReason::TokenExchangeFailed
            }
        }
    }
}

/// Access token as held in the server-side session.
///
/// Lives only in the in-memory session store and is never written to disk.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionToken {
    access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub membership_id: Option<String>,
}

impl SessionToken {
    pub fn new(
        access_token: String,
        expires_at: Option<DateTime<Utc>>,
        membership_id: Option<String>,
    ) -> Self {
        Self {
            access_token,
            expires_at,
            membership_id,
        }
    }

    /// Tokens within a few seconds of expiry count as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        is_expired_at(self.expires_at, now)
    }

    /// The bearer credential, only if it is still valid at `now`.
    pub fn bearer(&self, now: DateTime<Utc>) -> Result<SecretString, Error> {
        if self.is_expired_at(now) {
            return Err(token_error(TokenErrorKind::Expired, "access token has expired").into());
        }
        Ok(SecretString::new(self.access_token.clone()))
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("membership_id", &self.membership_id)
            .finish()
    }
}

impl From<Tokens> for SessionToken {
    fn from(tokens: Tokens) -> Self {
        Self {
            access_token: tokens.access_token.expose_secret().to_string(),
            expires_at: tokens.expires_at,
            membership_id: tokens.membership_id,
        }
    }
}

/// Query parameters the authorization server appends to the redirect URI.
#[derive(Clone, Debug, Default)]
pub struct Callback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Starts a login: registers a fresh CSRF state and builds the authorization URL.
///
/// Returns the URL to redirect the browser to and the state to store as
/// `LoginState::Pending`.
pub fn begin(provider: &dyn Provider, states: &StateManager) -> Result<(String, LoginState), Error> {
    let csrf_state = states.generate(provider.redirect_uri());
    let request = provider.authorization_url(&csrf_state).inspect_err(|e| {
        warn!("Failed to build {} authorization URL: {:?}", provider.name(), e)
    })?;

    info!("Redirecting browser to {} for authorization", provider.name());
    Ok((
        request.url,
        LoginState::Pending {
            csrf_state: request.state,
        },
    ))
}

/// Completes a login from the authorization server's callback.
///
/// * No `code` and no `error`: returns `Ok(None)` and no token request is made.
/// * `error` or `code`: the callback `state` must match the pending state of
///   this session and still be registered, otherwise the callback is rejected
///   as `InvalidState`. The state is consumed either way.
/// * `error`: the user or server refused; no token request is made.
/// * `code`: the code is exchanged, exactly once.
pub async fn complete(
    provider: &dyn Provider,
    states: &StateManager,
    current: &LoginState,
    callback: Callback,
) -> Result<Option<LoginState>, Error> {
    if callback.code.is_none() && callback.error.is_none() {
        debug!("Callback without an authorization code, nothing to exchange");
        return Ok(None);
    }

    consume_state(provider, states, current, callback.state.as_deref())?;

    if let Some(error) = callback.error {
        let detail = match callback.error_description {
            Some(description) => format!("{error}: {description}"),
            None => error,
        };
        warn!("Authorization was denied: {detail}");
        return Err(Error::auth(AuthFlowErrorKind::AuthorizationDenied(detail)));
    }

    let Some(code) = callback.code else {
        return Ok(None);
    };

    let tokens = provider
        .exchange_code(&code)
        .await
        .inspect_err(|e| warn!("Failed to exchange authorization code: {:?}", e))?;

    info!(
        "Login completed for Bungie.net membership {}, token valid for {} minutes",
        tokens.membership_id.as_deref().unwrap_or("unknown"),
        tokens
            .time_until_expiry()
            .map(|remaining| remaining.num_minutes())
            .unwrap_or_default()
    );
    Ok(Some(LoginState::Authenticated {
        token: tokens.into(),
    }))
}

/// Checks that `returned` is the state this session is waiting for and
/// removes it from the registry so it cannot be used again.
fn consume_state(
    provider: &dyn Provider,
    states: &StateManager,
    current: &LoginState,
    returned: Option<&str>,
) -> Result<(), Error> {
    let LoginState::Pending { csrf_state } = current else {
        warn!("Callback received without a pending login in this session");
        return Err(Error::auth(AuthFlowErrorKind::InvalidState));
    };

    let returned = returned.unwrap_or_default();
    if returned != csrf_state {
        warn!("Callback state does not match the pending login");
        return Err(Error::auth(AuthFlowErrorKind::InvalidState));
    }

    let data = states.validate(returned).ok_or_else(|| {
        warn!("Callback state is unknown, expired or already used");
        Error::auth(AuthFlowErrorKind::InvalidState)
    })?;
    if data.redirect_uri != provider.redirect_uri() {
        warn!("Redirect URI changed while the login was pending");
        return Err(Error::auth(AuthFlowErrorKind::InvalidState));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bungie_auth::oauth::providers::bungie::{Endpoints, Provider as BungieProvider};
    use chrono::Duration;
    use mockito::{Matcher, Server, ServerGuard};

    const REDIRECT_URI: &str = "http://localhost:4000/callback";

    fn provider(server: &ServerGuard) -> BungieProvider {
        BungieProvider::new(
            "33017".to_string(),
            SecretString::new("s3cret".to_string()),
            REDIRECT_URI.to_string(),
            vec!["ReadBasicUserProfile".to_string()],
            Endpoints {
                authorize_url: format!("{}/en/oauth/authorize", server.url()),
                token_url: format!("{}/token", server.url()),
            },
            reqwest::Client::new(),
        )
    }

    async fn token_mock(server: &mut ServerGuard, expected_calls: usize) -> mockito::Mock {
        server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("code".into(), "ABC123".into()),
                Matcher::UrlEncoded("redirect_uri".into(), REDIRECT_URI.into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"tok-1","expires_in":3600,"membership_id":"12345"}"#)
            .expect(expected_calls)
            .create_async()
            .await
    }

    fn callback(code: Option<&str>, state: Option<&str>) -> Callback {
        Callback {
            code: code.map(str::to_string),
            state: state.map(str::to_string),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_begin_returns_pending_state_embedded_in_url() {
        let server = Server::new_async().await;
        let provider = provider(&server);
        let states = StateManager::new();

        let (url, state) = begin(&provider, &states).unwrap();

        let LoginState::Pending { csrf_state } = state else {
            panic!("expected pending state, got {state:?}");
        };
        assert!(url.contains(&format!("state={csrf_state}")));
        assert!(url.contains("response_type=code"));
        assert_eq!(states.pending(), 1);
    }

    #[tokio::test]
    async fn test_complete_exchanges_code_once() {
        let mut server = Server::new_async().await;
        let mock = token_mock(&mut server, 1).await;
        let provider = provider(&server);
        let states = StateManager::new();
        let (_, pending) = begin(&provider, &states).unwrap();
        let LoginState::Pending { csrf_state } = &pending else {
            unreachable!()
        };

        let next = complete(
            &provider,
            &states,
            &pending,
            callback(Some("ABC123"), Some(csrf_state)),
        )
        .await
        .unwrap();

        mock.assert_async().await;
        let Some(LoginState::Authenticated { token }) = next else {
            panic!("expected authenticated state, got {next:?}");
        };
        assert_eq!(token.membership_id.as_deref(), Some("12345"));
        assert_eq!(
            token.bearer(Utc::now()).unwrap().expose_secret(),
            "tok-1"
        );
    }

    #[tokio::test]
    async fn test_complete_without_code_is_a_no_op() {
        let mut server = Server::new_async().await;
        let mock = token_mock(&mut server, 0).await;
        let provider = provider(&server);
        let states = StateManager::new();
        let (_, pending) = begin(&provider, &states).unwrap();

        let next = complete(&provider, &states, &pending, callback(None, None))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(next, None);
        assert_eq!(states.pending(), 1);
    }

    #[tokio::test]
    async fn test_complete_with_denied_authorization() {
        let mut server = Server::new_async().await;
        let mock = token_mock(&mut server, 0).await;
        let provider = provider(&server);
        let states = StateManager::new();
        let (_, pending) = begin(&provider, &states).unwrap();
        let LoginState::Pending { csrf_state } = &pending else {
            unreachable!()
        };

        let err = complete(
            &provider,
            &states,
            &pending,
            Callback {
                state: Some(csrf_state.clone()),
                error: Some("access_denied".to_string()),
                error_description: Some("UserDeclined".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

        mock.assert_async().await;
        assert_eq!(
            FailureReason::from(&err),
            FailureReason::AuthorizationDenied("access_denied: UserDeclined".to_string())
        );
        assert_eq!(states.pending(), 0);
    }

    #[tokio::test]
    async fn test_complete_error_callback_needs_matching_state() {
        let server = Server::new_async().await;
        let provider = provider(&server);
        let states = StateManager::new();
        let (_, pending) = begin(&provider, &states).unwrap();
        let authenticated = LoginState::Authenticated {
            token: SessionToken::new("tok-1".to_string(), None, None),
        };

        for (current, state) in [
            (&LoginState::Idle, None),
            (&authenticated, None),
            (&pending, None),
            (&pending, Some("forged")),
        ] {
            let err = complete(
                &provider,
                &states,
                current,
                Callback {
                    state: state.map(str::to_string),
                    error: Some("access_denied".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

            assert_eq!(FailureReason::from(&err), FailureReason::InvalidState);
        }
        assert_eq!(states.pending(), 1);
    }

    #[tokio::test]
    async fn test_complete_rejects_mismatched_state_without_exchange() {
        let mut server = Server::new_async().await;
        let mock = token_mock(&mut server, 0).await;
        let provider = provider(&server);
        let states = StateManager::new();
        let (_, pending) = begin(&provider, &states).unwrap();

        let err = complete(
            &provider,
            &states,
            &pending,
            callback(Some("ABC123"), Some("forged")),
        )
        .await
        .unwrap_err();

        mock.assert_async().await;
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Auth(AuthFlowErrorKind::InvalidState)
        );
    }

    #[tokio::test]
    async fn test_complete_replayed_callback_is_not_exchanged_again() {
        let mut server = Server::new_async().await;
        let mock = token_mock(&mut server, 1).await;
        let provider = provider(&server);
        let states = StateManager::new();
        let (_, pending) = begin(&provider, &states).unwrap();
        let LoginState::Pending { csrf_state } = &pending else {
            unreachable!()
        };

        complete(
            &provider,
            &states,
            &pending,
            callback(Some("ABC123"), Some(csrf_state)),
        )
        .await
        .unwrap();
        let replay = complete(
            &provider,
            &states,
            &pending,
            callback(Some("ABC123"), Some(csrf_state)),
        )
        .await;

        mock.assert_async().await;
        assert_eq!(
            replay.unwrap_err().error_kind,
            DomainErrorKind::Auth(AuthFlowErrorKind::InvalidState)
        );
    }

    #[tokio::test]
    async fn test_complete_without_pending_login_is_rejected() {
        let mut server = Server::new_async().await;
        let mock = token_mock(&mut server, 0).await;
        let provider = provider(&server);
        let states = StateManager::new();

        let err = complete(
            &provider,
            &states,
            &LoginState::Idle,
            callback(Some("ABC123"), Some("anything")),
        )
        .await
        .unwrap_err();

        mock.assert_async().await;
        assert_eq!(FailureReason::from(&err), FailureReason::InvalidState);
    }

    #[tokio::test]
    async fn test_complete_reports_rejected_code() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant"}"#)
            .create_async()
            .await;
        let provider = provider(&server);
        let states = StateManager::new();
        let (_, pending) = begin(&provider, &states).unwrap();
        let LoginState::Pending { csrf_state } = &pending else {
            unreachable!()
        };

        let err = complete(
            &provider,
            &states,
            &pending,
            callback(Some("ABC123"), Some(csrf_state)),
        )
        .await
        .unwrap_err();

        assert_eq!(FailureReason::from(&err), FailureReason::TokenExchangeFailed);
    }

    #[test]
    fn test_session_token_expiry() {
        let now = Utc::now();
        let token = SessionToken::new("tok-1".to_string(), Some(now - Duration::seconds(1)), None);
        let err = token.bearer(now).unwrap_err();
        assert_eq!(FailureReason::from(&err), FailureReason::TokenExpired);
    }

    #[test]
    fn test_session_token_debug_redacts_secret() {
        let token = SessionToken::new("tok-1".to_string(), None, None);
        assert!(!format!("{token:?}").contains("tok-1"));
    }

    #[test]
    fn test_login_state_round_trips_through_session_json() {
        let state = LoginState::Failed {
            reason: FailureReason::AuthorizationDenied("access_denied".to_string()),
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(serde_json::from_value::<LoginState>(json).unwrap(), state);
    }
}
