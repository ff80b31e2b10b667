//! Channel-fed response bodies.
//!
//! # Responsibilities
//! - Provide one body shape for every dispatcher response so HTTP/1.1
//!   framing is uniformly chunked
//! - Pump renderer fragments through a bounded channel under flow control
//!
//! The body is a `StreamBody` over a bounded mpsc receiver. hyper polls it
//! only when the transport can accept bytes, so when the peer stops reading
//! the channel fills and the producing task suspends on `send`. A failed
//! `send` means the connection is gone and production is abandoned.

use bytes::Bytes;
use futures_util::StreamExt;
use http_body_util::StreamBody;
use hyper::body::Frame;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::render::FragmentStream;

/// Body error surfaced to hyper. Erroring the body mid-stream aborts the
/// connection without the terminal zero-length chunk, so a truncated body is
/// never mistaken for a complete one.
pub type BodyError = Box<dyn std::error::Error + Send + Sync>;

/// The single response body type used by the dispatcher.
pub type ResponseBody = StreamBody<ReceiverStream<Result<Frame<Bytes>, BodyError>>>;

/// How many fragments may sit between producer and transport before the
/// producer suspends.
pub(crate) const FRAGMENT_CHANNEL_CAPACITY: usize = 8;

/// An open channel-fed body plus its sending side.
pub(crate) fn channel_body(
    capacity: usize,
) -> (mpsc::Sender<Result<Frame<Bytes>, BodyError>>, ResponseBody) {
    let (tx, rx) = mpsc::channel(capacity);
    (tx, StreamBody::new(ReceiverStream::new(rx)))
}

/// A body carrying exactly one already-buffered chunk.
pub(crate) fn buffered_body(bytes: Bytes) -> ResponseBody {
    let (tx, body) = channel_body(1);
    if !bytes.is_empty() {
        // Capacity 1 and the channel is fresh, so this cannot fail.
        let _ = tx.try_send(Ok(Frame::data(bytes)));
    }
    body
}

/// A body that ends immediately (headers plus the terminal chunk only).
pub(crate) fn empty_body() -> ResponseBody {
    let (_tx, body) = channel_body(1);
    body
}

/// Drive a renderer's fragment stream into a channel-fed body.
///
/// Returns the body; the pump runs as its own task. Fragment order is stream
/// order, and a mid-stream render failure is forwarded as a body error.
pub(crate) fn streamed_body(mut fragments: FragmentStream) -> ResponseBody {
    let (tx, body) = channel_body(FRAGMENT_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        while let Some(item) = fragments.next().await {
            match item {
                Ok(fragment) => {
                    if tx.send(Ok(Frame::data(fragment))).await.is_err() {
                        tracing::debug!("Connection closed mid-stream, abandoning fragments");
                        return;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Fragment production failed mid-stream");
                    let _ = tx.send(Err(e.into())).await;
                    return;
                }
            }
        }
    });

    body
}
