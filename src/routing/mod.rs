//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → table.rs (ordered scan of registered routes)
//!     → Return: handler + PathMatch, or NoMatch
//!
//! Registration (any time, including after listening):
//!     route(pattern, handler)
//!     → append to the table, order preserved
//! ```
//!
//! # Design Decisions
//! - Patterns are compiled regular expressions, matched against the path only
//! - First match wins in registration order; overlap is resolved by order,
//!   not specificity
//! - Explicit no-match rather than silent default; the dispatcher owns the
//!   fallback behavior
//! - Registration after startup is serialized against resolution by a lock

pub mod table;

pub use table::{Handler, PathMatch, RouteTable};
