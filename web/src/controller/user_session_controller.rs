use crate::extractors::login_session::LoginSession;
use crate::Error;
use axum::response::{IntoResponse, Redirect};
use log::*;

/// Signs the browser out by destroying its session.
///
/// The access token is dropped locally; it is not revoked at Bungie.net.
#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 303, description = "Session destroyed, redirect to /"),
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn delete(mut session: LoginSession) -> Result<impl IntoResponse, Error> {
    trace!("UserSessionController::delete()");
    session.clear().await?;
    Ok(Redirect::to("/"))
}
