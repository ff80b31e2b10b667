//! Server lifecycle and accept loop.
//!
//! # Responsibilities
//! - Own the listener and the route table
//! - Drive the lifecycle: constructed → binding → listening → stopped
//! - Spawn one connection task per accepted stream, HTTP/1.1 only
//! - Coordinate graceful shutdown and connection drain
//!
//! # Design Decisions
//! - `start` surfaces bind failures distinguishably (`StartError::AddrInUse`)
//!   so port-conflict retry can live entirely in the caller
//! - Servers are explicit owned instances, never process-wide singletons;
//!   several can coexist in one process
//! - Routes may be registered before or after listening begins

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use regex::Regex;
use tokio::sync::{broadcast, watch};

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::net::{ConnectionTracker, Listener};
use crate::routing::{Handler, RouteTable};

pub use crate::net::listener::StartError;

/// Lifecycle states, observable through [`Server::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Constructed,
    Binding,
    Listening,
    Stopped,
}

/// Coordinator for graceful shutdown.
///
/// A broadcast channel that the accept loop (and any other long-running
/// task) subscribes to.
struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

/// An HTTP/1.1 server dispatching requests to registered route handlers.
///
/// Owns the transport listener and the [`RouteTable`]; alive until
/// [`shutdown`](Server::shutdown) or process exit.
pub struct Server {
    routes: Arc<RouteTable>,
    local_addr: SocketAddr,
    state_tx: watch::Sender<ServerState>,
    shutdown: Shutdown,
    tracker: ConnectionTracker,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("local_addr", &self.local_addr)
            .finish_non_exhaustive()
    }
}

impl Server {
    /// Bind and begin accepting connections.
    ///
    /// Moves constructed → binding → listening; on a port conflict returns
    /// [`StartError::AddrInUse`] so the caller can retry with another port.
    pub async fn start(config: ServerConfig) -> Result<Self, StartError> {
        let (state_tx, _) = watch::channel(ServerState::Constructed);
        state_tx.send_replace(ServerState::Binding);

        let listener = Listener::bind(&config).await?;
        let local_addr = listener.local_addr()?;

        let routes = Arc::new(RouteTable::new());
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&routes),
            config.document_root.clone(),
            config.request_timeout_secs.map(Duration::from_secs),
        ));

        let shutdown = Shutdown::new();
        let tracker = ConnectionTracker::new();

        state_tx.send_replace(ServerState::Listening);
        tracing::info!(
            address = %local_addr,
            document_root = ?config.document_root,
            "Server listening"
        );

        tokio::spawn(accept_loop(
            listener,
            dispatcher,
            shutdown.subscribe(),
            tracker.clone(),
        ));

        Ok(Self {
            routes,
            local_addr,
            state_tx,
            shutdown,
            tracker,
        })
    }

    /// Register a route. First registration order wins on overlapping
    /// patterns; registration is valid before or after listening begins.
    pub fn route<H: Handler>(&self, pattern: Regex, handler: H) {
        self.routes.register(pattern, Arc::new(handler));
    }

    /// The bound address; useful with port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Observe lifecycle transitions.
    ///
    /// `start` drives constructed → binding → listening before it returns,
    /// so the first value seen here is always [`ServerState::Listening`];
    /// the receiver then reports [`ServerState::Stopped`] after
    /// [`Server::shutdown`].
    pub fn state(&self) -> watch::Receiver<ServerState> {
        self.state_tx.subscribe()
    }

    /// Current number of open connections.
    pub fn active_connections(&self) -> u64 {
        self.tracker.active_count()
    }

    /// Stop accepting connections and move to stopped. In-flight
    /// connections finish on their own; use [`Server::drain`] to wait.
    pub fn shutdown(&self) {
        tracing::info!(address = %self.local_addr, "Server shutting down");
        self.shutdown.trigger();
        self.state_tx.send_replace(ServerState::Stopped);
    }

    /// Wait until all in-flight connections have closed.
    pub async fn drain(&self) {
        self.tracker.wait_for_drain().await;
    }
}

/// Accept connections until shutdown, handing each to its own task.
async fn accept_loop(
    listener: Listener,
    dispatcher: Arc<Dispatcher>,
    mut shutdown_rx: broadcast::Receiver<()>,
    tracker: ConnectionTracker,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                tracing::debug!("Accept loop stopping");
                break;
            }
            accepted = listener.accept() => {
                let (stream, peer_addr, permit) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                        continue;
                    }
                };

                let guard = tracker.track();
                let dispatcher = Arc::clone(&dispatcher);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let service = service_fn(move |req| {
                        let dispatcher = Arc::clone(&dispatcher);
                        async move { Ok::<_, Infallible>(dispatcher.dispatch(req).await) }
                    });

                    if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                        tracing::debug!(
                            connection_id = %guard.id(),
                            peer_addr = %peer_addr,
                            error = %e,
                            "Connection ended with error"
                        );
                    }
                    drop(permit);
                });
            }
        }
    }
}
