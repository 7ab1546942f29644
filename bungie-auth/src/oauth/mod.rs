//! OAuth 2.0 authorization code flow infrastructure.

mod provider;
mod state;

pub mod providers;
pub mod token;

pub use provider::{AuthorizationRequest, Provider};
pub use state::{StateData, StateManager};
