//! The one-shot response completion contract.
//!
//! # Responsibilities
//! - Carry exactly one completion from a handler to the dispatcher
//! - Reject a second completion attempt with a reportable error
//! - Signal when the request side has already gone away
//!
//! # Design Decisions
//! - A guarded one-shot channel rather than a bare callback: the
//!   already-completed state is explicit, and a double call can be rejected
//!   without re-sending headers or corrupting framing
//! - The completer is `Send + 'static` so handlers can move it into spawned
//!   tasks and complete asynchronously

use std::sync::Mutex;
use tokio::sync::oneshot;

use crate::render::Template;

/// A buffered response payload.
///
/// Policy (consistent across the toolkit): text is written verbatim as
/// `text/plain`, JSON values are serialized compactly as `application/json`,
/// and `Empty` writes no body bytes. Every buffered payload is delivered as
/// a single chunk of a chunked body.
#[derive(Debug, Clone)]
pub enum Payload {
    Text(String),
    Json(serde_json::Value),
    Empty,
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Text(s)
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Text(s.to_string())
    }
}

impl From<serde_json::Value> for Payload {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Payload::Empty,
            other => Payload::Json(other),
        }
    }
}

impl From<()> for Payload {
    fn from(_: ()) -> Self {
        Payload::Empty
    }
}

/// The value a handler delivers through its completer.
#[derive(Debug)]
pub enum Completion {
    /// A single buffered payload, written as-is and immediately terminating
    /// the response.
    Buffered(Payload),
    /// A data object plus a template reference; the body is produced
    /// incrementally from the renderer's fragment sequence.
    Streamed {
        data: serde_json::Value,
        template: Template,
    },
}

/// Error completing a response.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CompleteError {
    /// The response was already finalized; nothing was sent for this call.
    #[error("completion already finalized")]
    AlreadyCompleted,

    /// The request side is gone (connection closed or dispatcher dropped).
    #[error("connection closed before completion")]
    ConnectionClosed,
}

/// The one-shot object a handler uses to finalize its response.
///
/// Exactly-once: the first call wins; any later call returns
/// [`CompleteError::AlreadyCompleted`] and emits no bytes on the wire.
pub struct Completer {
    tx: Mutex<Option<oneshot::Sender<Completion>>>,
}

impl Completer {
    /// Create a completer and the receiving end the dispatcher awaits.
    pub(crate) fn channel() -> (Self, oneshot::Receiver<Completion>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    /// Finalize with a buffered payload.
    pub fn end(&self, payload: impl Into<Payload>) -> Result<(), CompleteError> {
        self.finish(Completion::Buffered(payload.into()))
    }

    /// Finalize with a data object rendered through `template`; the body is
    /// streamed fragment by fragment under chunked transfer encoding.
    pub fn end_stream(
        &self,
        data: serde_json::Value,
        template: Template,
    ) -> Result<(), CompleteError> {
        self.finish(Completion::Streamed { data, template })
    }

    /// Whether this completer has already delivered its completion.
    pub fn is_completed(&self) -> bool {
        self.tx.lock().expect("completer lock poisoned").is_none()
    }

    fn finish(&self, completion: Completion) -> Result<(), CompleteError> {
        let tx = {
            let mut slot = self.tx.lock().expect("completer lock poisoned");
            slot.take()
        };
        let Some(tx) = tx else {
            tracing::error!("Handler attempted a second completion on a finalized response");
            return Err(CompleteError::AlreadyCompleted);
        };
        tx.send(completion).map_err(|_| {
            tracing::debug!("Completion delivered after the request side went away");
            CompleteError::ConnectionClosed
        })
    }
}

impl std::fmt::Debug for Completer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completer")
            .field("completed", &self.is_completed())
            .finish()
    }
}
