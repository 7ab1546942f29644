use crate::controller::{
    health_check_controller, home_controller, oauth_controller, profile_controller,
    user_session_controller,
};
use crate::AppState;
use axum::{
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Json, Router,
};

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Bungie.net Login"
        ),
        paths(
            home_controller::index,
            oauth_controller::login,
            oauth_controller::callback,
            profile_controller::read,
            user_session_controller::delete,
            health_check_controller::health_check,
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "bungie_login_rs", description = "Bungie.net OAuth2 login")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Defines the cookie session that carries the login state between requests.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "cookie_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "id",
                    "Session id value returned via Set-Cookie header",
                ))),
            )
        }
    }
}

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(home_routes())
        .merge(oauth_routes(app_state.clone()))
        .merge(profile_routes(app_state))
        .merge(user_session_routes())
        .merge(health_routes())
        .merge(api_doc_routes())
        .fallback(fallback)
}

fn home_routes() -> Router {
    Router::new().route("/", get(home_controller::index))
}

fn oauth_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/login", get(oauth_controller::login))
        .route("/callback", get(oauth_controller::callback))
        .with_state(app_state)
}

fn profile_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/profile", get(profile_controller::read))
        .with_state(app_state)
}

fn user_session_routes() -> Router {
    Router::new().route("/logout", post(user_session_controller::delete))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn api_doc_routes() -> Router {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}

// Any path we don't serve goes back to the start page.
async fn fallback() -> impl IntoResponse {
    Redirect::to("/")
}
