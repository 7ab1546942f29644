//! Request authentication for the Bungie.net platform API.
//!
//! Every platform request identifies the application with an API key, and
//! requests on behalf of a user additionally carry that user's bearer token.

mod auth;
mod bearer;

pub use auth::{ApiKeyAuth, ProviderAuth, API_KEY_HEADER};
pub use bearer::BearerTokenAuth;
