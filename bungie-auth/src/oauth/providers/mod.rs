//! OAuth provider implementations.

pub mod bungie;
