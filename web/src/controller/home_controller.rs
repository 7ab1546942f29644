use crate::extractors::login_session::LoginSession;
use crate::view;
use axum::response::{Html, IntoResponse};

/// GET the start page showing where this browser is in the login flow.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Start page for the current login state", content_type = "text/html"),
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn index(session: LoginSession) -> impl IntoResponse {
    Html(view::home(session.state()))
}
