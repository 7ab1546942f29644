//! The login flow and profile retrieval, independent of any web framework.
//!
//! `web` depends on this crate only; Bungie.net specific infrastructure from
//! `bungie-auth` is re-exported through `gateway`.

pub mod error;
pub mod gateway;
pub mod login;
pub mod profile;

pub use login::{Callback, FailureReason, LoginState, SessionToken};
pub use profile::{Profile, ProfileSummary};
