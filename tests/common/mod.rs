//! Shared utilities for the integration suite.
//!
//! Raw-socket HTTP helpers (so chunked framing and the HTTP version are
//! observable byte-for-byte) plus small implementations of the consumed
//! `Renderer` capability.

// Each integration binary uses a different slice of these helpers.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use campfire::{FragmentStream, RenderError, Renderer, Server, ServerConfig};

/// Start a server on an ephemeral loopback port.
pub async fn start_server() -> Server {
    start_server_with(ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        ..ServerConfig::default()
    })
    .await
}

pub async fn start_server_with(config: ServerConfig) -> Server {
    Server::start(config).await.expect("server failed to start")
}

/// A parsed raw HTTP response, framing preserved.
#[derive(Debug)]
pub struct RawResponse {
    pub status_line: String,
    pub headers: Vec<(String, String)>,
    pub raw_body: Vec<u8>,
}

impl RawResponse {
    pub fn parse(raw: &[u8]) -> Self {
        let split = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("no header terminator in response");
        let head = String::from_utf8_lossy(&raw[..split]).to_string();
        let raw_body = raw[split + 4..].to_vec();

        let mut lines = head.split("\r\n");
        let status_line = lines.next().unwrap_or_default().to_string();
        let headers = lines
            .filter_map(|line| {
                let (name, value) = line.split_once(':')?;
                Some((name.trim().to_ascii_lowercase(), value.trim().to_string()))
            })
            .collect();

        Self {
            status_line,
            headers,
            raw_body,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// "1.1" for an `HTTP/1.1 ...` status line.
    pub fn http_version(&self) -> &str {
        self.status_line
            .strip_prefix("HTTP/")
            .and_then(|rest| rest.split(' ').next())
            .unwrap_or("")
    }

    pub fn status(&self) -> u16 {
        self.status_line
            .split(' ')
            .nth(1)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }

    /// The body with chunked framing removed (when present). The second
    /// value is true when the terminal zero-length chunk was seen.
    pub fn body(&self) -> (Vec<u8>, bool) {
        if self.header("transfer-encoding") == Some("chunked") {
            dechunk(&self.raw_body)
        } else {
            (self.raw_body.clone(), true)
        }
    }
}

/// Decode chunked transfer encoding. Returns the decoded bytes and whether
/// the terminal zero-length chunk was present.
pub fn dechunk(mut body: &[u8]) -> (Vec<u8>, bool) {
    let mut out = Vec::new();
    loop {
        let Some(line_end) = body.windows(2).position(|w| w == b"\r\n") else {
            return (out, false);
        };
        let size_line = String::from_utf8_lossy(&body[..line_end]);
        let size = match usize::from_str_radix(size_line.trim(), 16) {
            Ok(size) => size,
            Err(_) => return (out, false),
        };
        if size == 0 {
            return (out, true);
        }
        let data_start = line_end + 2;
        if body.len() < data_start + size + 2 {
            // Truncated mid-chunk.
            out.extend_from_slice(&body[data_start..body.len().min(data_start + size)]);
            return (out, false);
        }
        out.extend_from_slice(&body[data_start..data_start + size]);
        body = &body[data_start + size + 2..];
    }
}

/// Issue a GET over a raw socket and read until the server closes.
pub async fn raw_get(addr: SocketAddr, path: &str) -> RawResponse {
    raw_request(addr, "GET", path).await
}

/// Issue a request with an arbitrary method and read until the server closes.
pub async fn raw_request(addr: SocketAddr, method: &str, path: &str) -> RawResponse {
    let mut stream = TcpStream::connect(addr).await.expect("connect failed");
    let request = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => raw.extend_from_slice(&buf[..n]),
            // An aborted connection (mid-stream failure) still leaves the
            // bytes received so far worth inspecting.
            Err(_) => break,
        }
    }
    RawResponse::parse(&raw)
}

/// Open a connection and send a GET without ever reading the response.
/// Used by the backpressure tests.
pub async fn raw_get_no_read(addr: SocketAddr, path: &str) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.expect("connect failed");
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    stream
}

// ---------------------------------------------------------------------------
// Renderer implementations
// ---------------------------------------------------------------------------

/// A small template reader covering `{{= name in plain}}` interpolation and
/// `{{for item in list{{ ... }} }}` loops, emitting each literal run and each
/// interpolated value as its own fragment.
pub struct PlainReader;

impl Renderer for PlainReader {
    fn render(
        &self,
        source: &str,
        data: &serde_json::Value,
    ) -> Result<FragmentStream, RenderError> {
        let mut fragments = Vec::new();
        expand(source, data, &mut fragments)?;
        Ok(Box::pin(futures_util::stream::iter(
            fragments.into_iter().map(|s| Ok(Bytes::from(s))),
        )))
    }
}

fn parse_err(msg: &str) -> RenderError {
    RenderError::Parse(msg.to_string())
}

fn lookup(data: &serde_json::Value, key: &str) -> Result<String, RenderError> {
    let value = data
        .get(key)
        .ok_or_else(|| parse_err(&format!("unknown name: {key}")))?;
    Ok(match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// Split `src` at the `}}` matching an already-consumed `{{`.
fn take_balanced(src: &str) -> Result<(&str, &str), RenderError> {
    let mut depth = 1usize;
    let mut pos = 0usize;
    let bytes = src.as_bytes();
    while pos + 1 < bytes.len() {
        match &bytes[pos..pos + 2] {
            b"{{" => {
                depth += 1;
                pos += 2;
            }
            b"}}" => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&src[..pos], &src[pos + 2..]));
                }
                pos += 2;
            }
            _ => pos += 1,
        }
    }
    Err(parse_err("unbalanced template braces"))
}

fn expand(
    source: &str,
    data: &serde_json::Value,
    out: &mut Vec<String>,
) -> Result<(), RenderError> {
    let mut rest = source;
    while let Some(open) = rest.find("{{") {
        if open > 0 {
            out.push(rest[..open].to_string());
        }
        let after = &rest[open + 2..];

        if let Some(expr) = after.strip_prefix('=') {
            let end = expr.find("}}").ok_or_else(|| parse_err("unterminated {{="))?;
            let mut key = expr[..end].trim();
            if let Some(stripped) = key.strip_suffix("in plain") {
                key = stripped.trim();
            }
            out.push(lookup(data, key)?);
            rest = &expr[end + 2..];
        } else if let Some(for_part) = after.strip_prefix("for ") {
            let body_open = for_part
                .find("{{")
                .ok_or_else(|| parse_err("for loop without a body"))?;
            let header = for_part[..body_open].trim();
            let (var, list_name) = header
                .split_once(" in ")
                .ok_or_else(|| parse_err("malformed for header"))?;
            let (body, tail) = take_balanced(&for_part[body_open + 2..])?;
            let tail = tail
                .trim_start()
                .strip_prefix("}}")
                .ok_or_else(|| parse_err("unterminated for loop"))?;

            let items = data
                .get(list_name.trim())
                .and_then(|v| v.as_array())
                .ok_or_else(|| parse_err(&format!("not a list: {list_name}")))?;
            for item in items {
                let mut scoped = data.clone();
                scoped[var.trim()] = item.clone();
                expand(body, &scoped, out)?;
            }
            rest = tail;
        } else {
            return Err(parse_err("unknown template directive"));
        }
    }
    if !rest.is_empty() {
        out.push(rest.to_string());
    }
    Ok(())
}

/// Emits a fixed list of fragments, ignoring the template source.
pub struct ListReader(pub Vec<&'static str>);

impl Renderer for ListReader {
    fn render(
        &self,
        _source: &str,
        _data: &serde_json::Value,
    ) -> Result<FragmentStream, RenderError> {
        Ok(Box::pin(futures_util::stream::iter(
            self.0.clone().into_iter().map(|s| Ok(Bytes::from(s))),
        )))
    }
}

/// Declines every template at parse time.
pub struct RefusingReader;

impl Renderer for RefusingReader {
    fn render(
        &self,
        _source: &str,
        _data: &serde_json::Value,
    ) -> Result<FragmentStream, RenderError> {
        Err(RenderError::Parse("refused".to_string()))
    }
}

/// Produces one good fragment, then fails mid-stream.
pub struct TrippingReader;

impl Renderer for TrippingReader {
    fn render(
        &self,
        _source: &str,
        _data: &serde_json::Value,
    ) -> Result<FragmentStream, RenderError> {
        Ok(Box::pin(futures_util::stream::iter(vec![
            Ok(Bytes::from("start")),
            Err(RenderError::Render("tripped".to_string())),
        ])))
    }
}

/// An endless lazy fragment source that counts how many fragments have been
/// pulled; used to observe backpressure stalls.
pub struct CountingReader {
    pub produced: Arc<AtomicUsize>,
    pub fragment_size: usize,
}

impl Renderer for CountingReader {
    fn render(
        &self,
        _source: &str,
        _data: &serde_json::Value,
    ) -> Result<FragmentStream, RenderError> {
        let produced = Arc::clone(&self.produced);
        let size = self.fragment_size;
        let stream = futures_util::stream::unfold(0u64, move |n| {
            let produced = Arc::clone(&produced);
            async move {
                produced.fetch_add(1, Ordering::SeqCst);
                Some((Ok(Bytes::from(vec![b'x'; size])), n + 1))
            }
        });
        Ok(Box::pin(stream))
    }
}
