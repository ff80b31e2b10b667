//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for a [`Server`](crate::Server).
///
/// Unknown keys in a config file are ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind (without port).
    pub host: String,

    /// Listen port. Port 0 asks the OS for an ephemeral port; the bound
    /// port is available from `Server::local_addr` once listening.
    pub port: u16,

    /// Document root for static file serving. When absent, unmatched
    /// requests go straight to the not-found response.
    pub document_root: Option<PathBuf>,

    /// Maximum concurrent connections (backpressure at accept time).
    pub max_connections: usize,

    /// Optional cap, in seconds, on how long a handler may take to
    /// complete its response. No cap when absent.
    pub request_timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            document_root: None,
            max_connections: 10_000,
            request_timeout_secs: None,
        }
    }
}
