// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Render server -- accepts preview and OCR requests over TCP.
//
// Each connection carries exactly one HTTP/1.1 request and is closed after
// the response. Connections are handled in their own tasks; the number of
// pipelines running at once is bounded by the service's limiter.
//
// Stopping the server cancels a shared token. The accept loop exits, every
// in-flight pipeline sees its context cancelled (and its external tools
// killed), connections still sending their request are dropped, and the loop
// waits for connection tasks to write their responses.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use renderwerk_core::config::ServerConfig;
use renderwerk_core::error::{RenderwerkError, Result};
use renderwerk_core::types::ServerStatus;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::http::{ReadError, read_request, write_response};
use crate::service::{RenderService, client_error};

/// State shared across all connection-handling tasks.
struct SharedState {
    service: Arc<RenderService>,
    active_connections: Arc<AtomicU32>,
    max_request_bytes: usize,
    read_timeout: Duration,
    shutdown: CancellationToken,
}

/// TCP front end for a [`RenderService`].
pub struct RenderServer {
    bind_address: String,
    /// Configured port; after `start` with port 0, the port actually bound.
    port: u16,
    max_request_bytes: usize,
    read_timeout: Duration,
    service: Arc<RenderService>,
    status: ServerStatus,
    shutdown: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
    active_connections: Arc<AtomicU32>,
}

impl RenderServer {
    /// Create a server in `Stopped` state. Call [`start`](Self::start) to
    /// begin accepting connections.
    pub fn new(config: &ServerConfig, service: Arc<RenderService>) -> Self {
        Self {
            bind_address: config.bind_address.clone(),
            port: config.port,
            max_request_bytes: config.max_request_bytes,
            read_timeout: Duration::from_millis(config.read_timeout_ms.max(1)),
            service,
            status: ServerStatus::Stopped,
            shutdown: CancellationToken::new(),
            task_handle: None,
            active_connections: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn status(&self) -> ServerStatus {
        self.status
    }

    /// Number of currently open client connections.
    pub fn active_connections(&self) -> u32 {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Bind the listener and spawn the accept loop.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be parsed or bound.
    pub async fn start(&mut self) -> Result<()> {
        if self.status == ServerStatus::Running {
            debug!(port = self.port, "render server already running");
            return Ok(());
        }
        self.status = ServerStatus::Starting;

        let listener = match self.bind().await {
            Ok(listener) => listener,
            Err(err) => {
                self.status = ServerStatus::Error;
                return Err(err);
            }
        };
        if let Ok(local) = listener.local_addr() {
            self.port = local.port();
        }
        info!(address = %self.bind_address, port = self.port, "render server listening");

        // A stopped server can be started again with a fresh token.
        if self.shutdown.is_cancelled() {
            self.shutdown = CancellationToken::new();
        }
        let shared = Arc::new(SharedState {
            service: Arc::clone(&self.service),
            active_connections: Arc::clone(&self.active_connections),
            max_request_bytes: self.max_request_bytes,
            read_timeout: self.read_timeout,
            shutdown: self.shutdown.clone(),
        });

        self.task_handle = Some(tokio::spawn(Self::accept_loop(listener, shared)));
        self.status = ServerStatus::Running;
        Ok(())
    }

    /// Stop accepting, cancel in-flight requests and wait for their
    /// responses to be written.
    pub async fn stop(&mut self) -> Result<()> {
        if self.status != ServerStatus::Running {
            return Ok(());
        }
        info!(port = self.port, "stopping render server");
        self.shutdown.cancel();

        if let Some(handle) = self.task_handle.take() {
            handle
                .await
                .map_err(|e| RenderwerkError::Server(format!("task join: {e}")))?;
        }

        self.status = ServerStatus::Stopped;
        info!(port = self.port, "render server stopped");
        Ok(())
    }

    async fn bind(&self) -> Result<TcpListener> {
        let addr: SocketAddr = format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| {
                RenderwerkError::Server(format!("bad bind address {}: {e}", self.bind_address))
            })?;
        TcpListener::bind(addr)
            .await
            .map_err(|e| RenderwerkError::Server(format!("bind {addr}: {e}")))
    }

    /// Runs until the shutdown token is cancelled, then drains connection
    /// tasks.
    async fn accept_loop(listener: TcpListener, shared: Arc<SharedState>) {
        let mut connections = JoinSet::new();
        loop {
            tokio::select! {
                _ = shared.shutdown.cancelled() => {
                    debug!("accept loop received shutdown signal");
                    break;
                }

                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "connection task panicked");
                    }
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            debug!(peer = %peer_addr, "incoming connection");
                            let state = Arc::clone(&shared);
                            connections.spawn(async move {
                                state.active_connections.fetch_add(1, Ordering::Relaxed);
                                if let Err(e) = Self::handle_connection(stream, peer_addr, &state).await {
                                    warn!(peer = %peer_addr, error = %e, "connection handler error");
                                }
                                state.active_connections.fetch_sub(1, Ordering::Relaxed);
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "failed to accept connection");
                        }
                    }
                }
            }
        }

        drop(listener);
        if !connections.is_empty() {
            info!(in_flight = connections.len(), "waiting for in-flight requests");
        }
        while let Some(joined) = connections.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "connection task panicked");
            }
        }
    }

    /// Read one request, route it, write the response.
    async fn handle_connection(
        mut stream: TcpStream,
        peer_addr: SocketAddr,
        state: &SharedState,
    ) -> Result<()> {
        let read = tokio::select! {
            biased;
            _ = state.shutdown.cancelled() => {
                debug!(peer = %peer_addr, "shutdown while reading request -- closing");
                return Ok(());
            }
            read = tokio::time::timeout(
                state.read_timeout,
                read_request(&mut stream, state.max_request_bytes),
            ) => read,
        };

        let response = match read {
            Err(_elapsed) => {
                warn!(
                    peer = %peer_addr,
                    timeout_ms = state.read_timeout.as_millis() as u64,
                    "request read timed out"
                );
                client_error(408, "request-timeout", "request was not received in time")
            }
            Ok(Ok(request)) => {
                debug!(
                    peer = %peer_addr,
                    method = %request.head.method,
                    path = %request.head.path,
                    bytes = request.body.len(),
                    "request received"
                );
                state.service.handle(request, &state.shutdown).await
            }
            Ok(Err(ReadError::Empty)) => {
                debug!(peer = %peer_addr, "empty connection -- closing");
                return Ok(());
            }
            Ok(Err(ReadError::Io(e))) => {
                return Err(RenderwerkError::Server(format!("read from {peer_addr}: {e}")));
            }
            Ok(Err(err @ ReadError::TooLarge { .. })) => {
                warn!(peer = %peer_addr, error = %err, "request refused");
                client_error(413, "too-large", err.to_string())
            }
            Ok(Err(err @ ReadError::Malformed(_))) => {
                warn!(peer = %peer_addr, error = %err, "malformed request");
                client_error(400, "bad-request", err.to_string())
            }
        };

        write_response(&mut stream, &response)
            .await
            .map_err(|e| RenderwerkError::Server(format!("write to {peer_addr}: {e}")))?;
        info!(
            peer = %peer_addr,
            status = response.status,
            response_bytes = response.body.len(),
            "response sent"
        );
        Ok(())
    }
}
