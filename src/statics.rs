//! Static file serving from the document root.
//!
//! # Responsibilities
//! - Map an unmatched GET/HEAD path to a file under the document root
//! - Reject traversal out of the root
//! - Stream file contents in 64 KiB blocks through the chunked body pump
//!
//! This is a collaborator the dispatcher defers to before the not-found
//! fallback; declining (returning `None`) is its normal mode for anything
//! that is not an existing regular file.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use hyper::body::Frame;
use percent_encoding::percent_decode_str;
use hyper::header::CONTENT_TYPE;
use hyper::{Response, StatusCode};
use tokio::io::AsyncReadExt;

use crate::dispatch::body::{channel_body, ResponseBody};

/// Block size for file streaming.
const FILE_BLOCK_SIZE: usize = 64 * 1024;

/// Resolve `request_path` under `root`, declining anything that escapes the
/// root or is not a plain relative path.
///
/// Percent-decoding happens before the component check, so encoded
/// traversal (`%2e%2e`) is rejected the same as a literal `..`.
fn sanitize(root: &Path, request_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(request_path).decode_utf8().ok()?;
    if decoded.contains('\0') {
        return None;
    }
    let relative = decoded.trim_start_matches('/');
    if relative.is_empty() {
        return None;
    }
    let candidate = Path::new(relative);
    for component in candidate.components() {
        match component {
            Component::Normal(_) => {}
            // `..`, a fresh root, drive prefixes: all escape attempts.
            _ => return None,
        }
    }
    Some(root.join(candidate))
}

/// Serve `request_path` from `root` if it names an existing regular file.
///
/// Returns `None` to decline, letting the dispatcher fall through to the
/// not-found response.
pub async fn serve(root: &Path, request_path: &str) -> Option<Response<ResponseBody>> {
    let path = sanitize(root, request_path)?;

    let metadata = tokio::fs::metadata(&path).await.ok()?;
    if !metadata.is_file() {
        return None;
    }

    let mut file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Static file open failed");
            return None;
        }
    };

    tracing::debug!(path = %path.display(), size = metadata.len(), "Serving static file");

    let (tx, body) = channel_body(1);
    tokio::spawn(async move {
        let mut buf = vec![0u8; FILE_BLOCK_SIZE];
        loop {
            match file.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    let frame = Frame::data(Bytes::copy_from_slice(&buf[..n]));
                    if tx.send(Ok(frame)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e.into())).await;
                    break;
                }
            }
        }
    });

    Some(
        Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, content_type_for(&path))
            .body(body)
            .unwrap(),
    )
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}
