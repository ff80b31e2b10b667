//! Per-request dispatch pipeline.

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use hyper::body::Incoming;
use hyper::header::CONTENT_TYPE;
use hyper::{Method, Request, Response, StatusCode};

use crate::dispatch::body::{self, ResponseBody};
use crate::dispatch::completer::{Completer, Completion, Payload};
use crate::dispatch::query::Query;
use crate::render::Template;
use crate::routing::RouteTable;
use crate::statics;

/// Wires an incoming request to route resolution, invokes the matched
/// handler (or the static-file / not-found fallback) with a fresh
/// [`Completer`], and owns the HTTP framing for the request's lifetime.
pub struct Dispatcher {
    routes: Arc<RouteTable>,
    document_root: Option<PathBuf>,
    request_timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(
        routes: Arc<RouteTable>,
        document_root: Option<PathBuf>,
        request_timeout: Option<Duration>,
    ) -> Self {
        Self {
            routes,
            document_root,
            request_timeout,
        }
    }

    /// Handle one request. Always produces a response; handler failures are
    /// contained here and never propagate to the connection task.
    pub async fn dispatch(&self, req: Request<Incoming>) -> Response<ResponseBody> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let query = Query::parse(req.uri().query());

        tracing::debug!(method = %method, path = %path, "Dispatching request");

        let Some((handler, path_match)) = self.routes.resolve(&path) else {
            return self.unmatched(&method, &path).await;
        };

        let (completer, rx) = Completer::channel();
        let invoked = std::panic::catch_unwind(AssertUnwindSafe(|| {
            handler.handle(query, path_match, completer)
        }));
        if invoked.is_err() {
            tracing::error!(path = %path, "Handler panicked before completing");
            // The completer died with the panic; the dropped-sender path
            // below turns this into a 500.
        }

        let completion = match self.request_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, rx).await {
                Ok(received) => received,
                Err(_) => {
                    tracing::warn!(path = %path, "Handler did not complete within the timeout");
                    return internal_error();
                }
            },
            None => rx.await,
        };

        match completion {
            Ok(Completion::Buffered(payload)) => respond_buffered(payload),
            Ok(Completion::Streamed { data, template }) => respond_streamed(&data, &template),
            Err(_) => {
                tracing::error!(path = %path, "Handler dropped its completer without completing");
                internal_error()
            }
        }
    }

    /// Fallback chain for paths with no registered route: static files for
    /// GET/HEAD, then the reference not-found response.
    async fn unmatched(&self, method: &Method, path: &str) -> Response<ResponseBody> {
        if matches!(*method, Method::GET | Method::HEAD) {
            if let Some(root) = &self.document_root {
                if let Some(response) = statics::serve(root, path).await {
                    return response;
                }
            }
        }
        tracing::debug!(path = %path, "No route matched");
        not_found()
    }
}

/// The reference not-found response: status 404 with a body literally equal
/// to `404`, chunked like every other dispatcher body.
fn not_found() -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .body(body::buffered_body(Bytes::from_static(b"404")))
        .unwrap()
}

fn internal_error() -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(body::buffered_body(Bytes::from_static(b"Internal Server Error")))
        .unwrap()
}

fn respond_buffered(payload: Payload) -> Response<ResponseBody> {
    match payload {
        Payload::Text(text) => Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body::buffered_body(Bytes::from(text)))
            .unwrap(),
        Payload::Json(value) => match serde_json::to_string(&value) {
            Ok(json) => Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_TYPE, "application/json")
                .body(body::buffered_body(Bytes::from(json)))
                .unwrap(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize buffered JSON payload");
                internal_error()
            }
        },
        Payload::Empty => Response::builder()
            .status(StatusCode::OK)
            .body(body::empty_body())
            .unwrap(),
    }
}

/// Build the streamed response. The renderer is invoked before any header
/// byte is committed, so a template that fails to parse still gets an error
/// status; failures after the first fragment abort the connection instead.
fn respond_streamed(data: &serde_json::Value, template: &Template) -> Response<ResponseBody> {
    let fragments = match template.render(data) {
        Ok(fragments) => fragments,
        Err(e) => {
            tracing::error!(error = %e, "Template rendering failed before streaming");
            return internal_error();
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/html; charset=utf-8")
        .body(body::streamed_body(fragments))
        .unwrap()
}
