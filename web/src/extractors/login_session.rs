use crate::extractors::RejectionType;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use domain::error::Error as DomainError;
use domain::LoginState;
use log::*;
use tower_sessions::Session;

const LOGIN_STATE_KEY: &str = "login_state";

/// The login flow state stored in this browser's server-side session.
///
/// A session without a stored state is `LoginState::Idle`.
pub struct LoginSession {
    session: Session,
    state: LoginState,
}

impl<S> FromRequestParts<S> for LoginSession
where
    S: Send + Sync,
{
    type Rejection = RejectionType;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(status, msg)| (status, msg.to_string()))?;

        let login_state = session
            .get::<LoginState>(LOGIN_STATE_KEY)
            .await
            .map_err(|e| {
                warn!("Failed to read login state from session: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to read session".to_string(),
                )
            })?
            .unwrap_or_default();

        Ok(LoginSession {
            session,
            state: login_state,
        })
    }
}

impl LoginSession {
    pub fn state(&self) -> &LoginState {
        &self.state
    }

    pub async fn update(&mut self, next: LoginState) -> Result<(), DomainError> {
        self.session
            .insert(LOGIN_STATE_KEY, &next)
            .await
            .map_err(DomainError::session)?;
        trace!("Login state is now {next:?}");
        self.state = next;
        Ok(())
    }

    /// Issues a new session id, keeping the stored data.
    pub async fn cycle_id(&self) -> Result<(), DomainError> {
        self.session.cycle_id().await.map_err(DomainError::session)
    }

    /// Deletes the session and everything stored in it.
    pub async fn clear(&mut self) -> Result<(), DomainError> {
        self.session.flush().await.map_err(DomainError::session)?;
        self.state = LoginState::Idle;
        Ok(())
    }
}
