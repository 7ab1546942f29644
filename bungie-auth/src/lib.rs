//! # bungie-auth
//!
//! OAuth 2.0 infrastructure for signing users in with Bungie.net:
//! - Authorization URL construction and authorization code exchange
//! - CSRF state generation and one-time validation
//! - Access token types with expiry tracking
//! - Request authentication for the platform API (`X-API-Key` and bearer tokens)
//! - HTTP client building with timeouts
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bungie_auth::{
//!     api_key::{ApiKeyAuth, BearerTokenAuth, ProviderAuth},
//!     http::HttpClientBuilder,
//!     oauth::{providers::bungie, Provider, StateManager},
//! };
//! ```

pub mod api_key;
pub mod error;
pub mod http;
pub mod oauth;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
