//! Configuration subsystem.
//!
//! # Responsibilities
//! - Define the server configuration schema (port, document root, limits)
//! - Load configuration from TOML files
//! - Supply sensible defaults when no file is given
//!
//! # Design Decisions
//! - All fields carry serde defaults; a partial file is valid
//! - Unrecognized keys are ignored rather than rejected

pub mod loader;
pub mod schema;

pub use loader::{load_config, ConfigError};
pub use schema::ServerConfig;
