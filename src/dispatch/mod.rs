//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted request
//!     → query.rs (parse query string, first-wins)
//!     → routing table resolve(path)
//!     → matched: handler(query, match, completer.rs Completer)
//!         → completion awaited on a one-shot channel
//!         → body.rs (buffered chunk | renderer fragment pump)
//!     → unmatched: statics (GET/HEAD) → literal `404` body
//! ```
//!
//! # Design Decisions
//! - The dispatcher owns the status line and headers; once a response is
//!   built and handed to hyper they never change
//! - Every body is an unknown-length stream, so HTTP/1.1 framing is
//!   uniformly chunked, buffered payloads included
//! - Handler panics and dropped completers become 500s at this boundary;
//!   they never take down the accept loop

pub mod body;
pub mod completer;
pub mod query;

mod dispatcher;

pub use completer::{CompleteError, Completer, Completion, Payload};
pub use dispatcher::Dispatcher;
pub use query::Query;
