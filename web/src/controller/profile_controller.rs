use crate::extractors::login_session::LoginSession;
use crate::{view, AppState, Error};

use axum::extract::State;
use axum::response::{Html, IntoResponse};
use domain::error::{AuthFlowErrorKind, DomainErrorKind, Error as DomainError};
use domain::{profile, FailureReason, LoginState};
use log::*;

/// GET the signed-in user's Bungie.net profile.
///
/// The profile is fetched from Bungie.net on every request.
#[utoipa::path(
    get,
    path = "/profile",
    responses(
        (status = 200, description = "Profile page", content_type = "text/html"),
        (status = 401, description = "Not signed in, or the access token has expired"),
        (status = 502, description = "Bungie.net did not return the profile"),
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn read(
    State(app_state): State<AppState>,
    mut session: LoginSession,
) -> Result<impl IntoResponse, Error> {
    let token = match session.state() {
        LoginState::Authenticated { token } => token.clone(),
        _ => return Err(DomainError::auth(AuthFlowErrorKind::NotAuthenticated).into()),
    };

    match profile::fetch(&app_state.platform, &token).await {
        Ok(profile) => Ok(Html(view::profile(&profile))),
        Err(err) => {
            if err.error_kind == DomainErrorKind::Auth(AuthFlowErrorKind::TokenExpired) {
                info!("Access token expired, signing the session out");
                session
                    .update(LoginState::Failed {
                        reason: FailureReason::TokenExpired,
                    })
                    .await?;
            }
            Err(err.into())
        }
    }
}
