//! Infrastructure layer module
//!
//! Ambient concerns shared by the binary and the library:
//! - Configuration management (figment)
//! - Logging infrastructure (tracing)

pub mod config;
pub mod logging;
