//! Controller for the Bungie.net authorization code flow.
//!
//! Both endpoints are reached through browser redirects, so every outcome is
//! a redirect back into the app and failures are recorded in the session
//! for the start page to show.

use crate::extractors::login_session::LoginSession;
use crate::params::oauth::CallbackParams;
use crate::{AppState, Error};

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect};
use domain::{login, FailureReason, LoginState};
use log::*;

/// GET /login
///
/// Starts a login by redirecting the browser to Bungie.net's authorization endpoint.
#[utoipa::path(
    get,
    path = "/login",
    responses(
        (status = 303, description = "Redirect to Bungie.net authorization"),
        (status = 500, description = "Login is not configured correctly"),
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    mut session: LoginSession,
) -> Result<impl IntoResponse, Error> {
    let (url, pending) = login::begin(app_state.provider.as_ref(), &app_state.states)?;
    session.update(pending).await?;
    Ok(Redirect::to(&url))
}

/// GET /callback
///
/// Completes a login when Bungie.net redirects back with an authorization code.
#[utoipa::path(
    get,
    path = "/callback",
    params(CallbackParams),
    responses(
        (status = 303, description = "Redirect to /profile on success, otherwise to / showing why the login failed"),
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn callback(
    State(app_state): State<AppState>,
    mut session: LoginSession,
    Query(params): Query<CallbackParams>,
) -> Result<impl IntoResponse, Error> {
    let outcome = login::complete(
        app_state.provider.as_ref(),
        &app_state.states,
        session.state(),
        params.into(),
    )
    .await;

    match outcome {
        Ok(None) => Ok(Redirect::to("/")),
        Ok(Some(authenticated)) => {
            session.update(authenticated).await?;
            session.cycle_id().await?;
            Ok(Redirect::to("/profile"))
        }
        Err(err) => {
            let reason = FailureReason::from(&err);
            if reason == FailureReason::InvalidState
                && matches!(session.state(), LoginState::Authenticated { .. })
            {
                warn!("Ignoring unsolicited callback for a signed-in session");
                return Ok(Redirect::to("/"));
            }
            debug!("Login failed: {reason:?}");
            session.update(LoginState::Failed { reason }).await?;
            Ok(Redirect::to("/"))
        }
    }
}
