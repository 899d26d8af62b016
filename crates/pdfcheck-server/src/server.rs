// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// TCP accept loop. Each connection carries exactly one request: read the
// head, read Content-Length body bytes, route, answer, close.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use pdfcheck_core::{ServerConfig, VerifierConfig};
use pdfcheck_core::error::{PdfCheckError, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::http::{self, HttpError, Request, Response};
use crate::routes;

/// Upper bound on the time spent reading one request.
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// The verification HTTP server.
pub struct PdfCheckServer {
    config: Arc<ServerConfig>,
    /// Notification handle used to signal a graceful shutdown.
    shutdown_signal: Arc<Notify>,
    /// Handle to the Tokio task running the accept loop.
    task_handle: Option<JoinHandle<()>>,
    /// Address actually bound (resolves port 0).
    local_addr: Option<SocketAddr>,
    /// Counter of currently active TCP connections.
    active_connections: Arc<AtomicU32>,
}

impl PdfCheckServer {
    /// Create a stopped server. Call [`start`](Self::start) to listen.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
            shutdown_signal: Arc::new(Notify::new()),
            task_handle: None,
            local_addr: None,
            active_connections: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Bound address, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    pub fn active_connections(&self) -> u32 {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Bind the listener and spawn the accept loop.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if let Some(addr) = self.local_addr.filter(|_| self.is_running()) {
            debug!(%addr, "server already running");
            return Ok(addr);
        }

        let bind_addr = format!("{}:{}", self.config.bind_address, self.config.port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| PdfCheckError::Server(format!("bind {bind_addr}: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| PdfCheckError::Server(format!("local address: {e}")))?;

        info!(%addr, "pdfcheck server listening");

        let shutdown = Arc::clone(&self.shutdown_signal);
        let limits = Limits {
            max_request_bytes: self.config.max_request_bytes,
            verifier: Arc::new(self.config.verifier.clone()),
        };
        let connections = Arc::clone(&self.active_connections);
        self.task_handle = Some(tokio::spawn(async move {
            accept_loop(listener, shutdown, Arc::new(limits), connections).await;
        }));
        self.local_addr = Some(addr);
        Ok(addr)
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    /// Requests already being handled run to completion.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.task_handle.take() else {
            return Ok(());
        };

        info!("stopping pdfcheck server");
        self.shutdown_signal.notify_one();
        handle
            .await
            .map_err(|e| PdfCheckError::Server(format!("task join: {e}")))?;
        info!("pdfcheck server stopped");
        Ok(())
    }
}

/// Per-connection settings shared by every handler task.
struct Limits {
    max_request_bytes: usize,
    /// Handed to the request-scoped verifier of every request.
    verifier: Arc<VerifierConfig>,
}

/// Runs until the shutdown signal is received. Each connection is handled in
/// its own task.
async fn accept_loop(
    listener: TcpListener,
    shutdown: Arc<Notify>,
    limits: Arc<Limits>,
    connections: Arc<AtomicU32>,
) {
    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                debug!("accept loop received shutdown signal");
                break;
            }

            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        debug!(peer = %peer_addr, "incoming connection");
                        let limits = Arc::clone(&limits);
                        let connections = Arc::clone(&connections);
                        tokio::spawn(async move {
                            connections.fetch_add(1, Ordering::Relaxed);
                            if let Err(e) = handle_connection(stream, peer_addr, limits).await {
                                warn!(peer = %peer_addr, error = %e, "connection handler error");
                            }
                            connections.fetch_sub(1, Ordering::Relaxed);
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "failed to accept connection");
                    }
                }
            }
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    limits: Arc<Limits>,
) -> std::result::Result<(), HttpError> {
    let read = tokio::time::timeout(
        READ_TIMEOUT,
        read_request(&mut stream, limits.max_request_bytes),
    )
    .await
    .unwrap_or(Err(HttpError::Timeout));

    let request = match read {
        Ok(Some(request)) => request,
        Ok(None) => {
            debug!(peer = %peer_addr, "empty connection, closing");
            return Ok(());
        }
        Err(err) => {
            let Some(status) = err.status() else {
                return Err(err);
            };
            warn!(peer = %peer_addr, error = %err, "rejecting request");
            send_response(&mut stream, &Response::error(status, &err.to_string())).await?;
            return Ok(());
        }
    };

    let method = request.method.clone();
    let path = request.path.clone();
    let response = routes::route(request, Arc::clone(&limits.verifier)).await;
    send_response(&mut stream, &response).await?;

    info!(
        peer = %peer_addr,
        %method,
        %path,
        status = response.status,
        response_bytes = response.body.len(),
        "request handled"
    );
    Ok(())
}

/// Read one request, bounded by `max_bytes`. `Ok(None)` when the peer closed
/// without sending anything.
async fn read_request(
    stream: &mut TcpStream,
    max_bytes: usize,
) -> std::result::Result<Option<Request>, HttpError> {
    let mut buf = Vec::with_capacity(8192);
    let mut chunk = vec![0u8; 8192];

    let head = loop {
        if let Some(head) = http::parse_head(&buf)? {
            break head;
        }
        if buf.len() > max_bytes {
            return Err(HttpError::TooLarge(max_bytes));
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return if buf.is_empty() {
                Ok(None)
            } else {
                Err(HttpError::Incomplete)
            };
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let total = head
        .body_offset
        .checked_add(head.content_length)
        .filter(|total| *total <= max_bytes)
        .ok_or(HttpError::TooLarge(max_bytes))?;

    while buf.len() < total {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(HttpError::Incomplete);
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    buf.truncate(total);

    Ok(Some(Request {
        method: head.method,
        path: head.path,
        body: buf.split_off(head.body_offset),
    }))
}

async fn send_response(
    stream: &mut TcpStream,
    response: &Response,
) -> std::result::Result<(), HttpError> {
    stream.write_all(&response.to_bytes()).await?;
    stream.flush().await?;
    Ok(())
}
