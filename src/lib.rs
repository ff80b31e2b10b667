//! campfire: a minimal HTTP server toolkit.
//!
//! Incoming requests are dispatched to user-registered route handlers by
//! regular-expression match against the request path. A handler finalizes its
//! response through a one-shot [`Completer`]: either with a buffered payload,
//! or with a data object plus a template reference whose rendered fragments
//! are streamed to the client under chunked transfer encoding.
//!
//! # Architecture Overview
//!
//! ```text
//! transport → server (accept loop)
//!           → dispatch (query parse, route resolve)
//!           → routing (first-match-wins table)
//!           → handler(query, match, completer)
//!           → completion: [buffered chunk | render::Renderer fragment stream]
//!           → transport (chunked body, backpressured)
//! ```
//!
//! Unmatched GET/HEAD requests fall through to static file serving from the
//! configured document root, and finally to a `404` body.
//!
//! # Example
//!
//! ```no_run
//! use campfire::{Completer, PathMatch, Query, Server, ServerConfig};
//! use regex::Regex;
//!
//! # async fn run() -> Result<(), campfire::StartError> {
//! let server = Server::start(ServerConfig::default()).await?;
//! server.route(
//!     Regex::new("^/hello$").unwrap(),
//!     |_query: Query, _m: PathMatch, end: Completer| {
//!         let _ = end.end("hello from the campfire");
//!     },
//! );
//! # Ok(())
//! # }
//! ```

// Core subsystems
pub mod config;
pub mod dispatch;
pub mod net;
pub mod routing;
pub mod server;

// Collaborator boundaries
pub mod render;
pub mod statics;

pub use config::{ConfigError, ServerConfig};
pub use dispatch::{CompleteError, Completer, Payload, Query};
pub use render::{FragmentStream, RenderError, Renderer, Template};
pub use routing::{Handler, PathMatch, RouteTable};
pub use server::{Server, ServerState, StartError};
