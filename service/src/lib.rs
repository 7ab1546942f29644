//! Ambient infrastructure shared by every layer: command line / environment
//! configuration and terminal logging.

pub mod config;
pub mod logging;
