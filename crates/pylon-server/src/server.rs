//! The HTTP server.
//!
//! Each accepted connection is served by Hyper's HTTP/1.1 machinery. A
//! request is handled in three steps:
//!
//! 1. Collect the body, refusing anything over `max_body_size` (413) or
//!    slower than `request_timeout` (408).
//! 2. Build a [`RequestContext`] and run [`Pipeline::execute`] under the
//!    same timeout (504 when it elapses).
//! 3. Send the pipeline's response. An `Err` from the pipeline, which only
//!    happens when a response filter fails on the success path, becomes a
//!    bare 500.

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use pylon_core::RequestContext;
use pylon_pipeline::Pipeline;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Response type produced by the server.
pub type HttpResponse = Response<Full<Bytes>>;

/// Serves a [`Pipeline`] over HTTP/1.1.
pub struct Server {
    pipeline: Arc<Pipeline>,
    config: ServerConfig,
}

impl Server {
    /// Creates a server for `pipeline`.
    #[must_use]
    pub fn new(pipeline: Pipeline, config: ServerConfig) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            config,
        }
    }

    /// The served pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// The transport settings.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Binds the configured address and serves until SIGTERM or Ctrl+C.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(ShutdownSignal::with_os_signals())
            .await
    }

    /// Binds the configured address and serves until `shutdown` fires.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = self
            .config
            .socket_addr()
            .map_err(|source| ServerError::InvalidAddress {
                addr: self.config.http_addr().to_string(),
                source,
            })?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        self.serve(listener, shutdown).await
    }

    /// Serves connections from an already bound listener.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "server listening");

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();
        let limiter = server
            .config
            .max_connections()
            .map(|max| Arc::new(Semaphore::new(max)));

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, remote_addr) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            error!(failure = %e, "failed to accept connection");
                            continue;
                        }
                    };

                    let permit = match &limiter {
                        Some(limiter) => match Arc::clone(limiter).try_acquire_owned() {
                            Ok(permit) => Some(permit),
                            Err(_) => {
                                warn!(remote = %remote_addr, "connection limit reached, dropping connection");
                                continue;
                            }
                        },
                        None => None,
                    };

                    let server = Arc::clone(&server);
                    let token = tracker.acquire();
                    let shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        if let Err(e) = server.serve_connection(stream, shutdown).await {
                            debug!(remote = %remote_addr, failure = %e, "connection closed with error");
                        }
                        drop(permit);
                        drop(token);
                    });
                }
                () = shutdown.recv() => {
                    info!("shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        let timeout = server.config.shutdown_timeout();
        info!(
            open = tracker.active_connections(),
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "draining connections"
        );
        if tokio::time::timeout(timeout, tracker.wait_idle())
            .await
            .is_err()
        {
            warn!(
                open = tracker.active_connections(),
                "shutdown timeout reached with connections still open"
            );
        }

        info!("server stopped");
        Ok(())
    }

    async fn serve_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let server = Arc::clone(self);
        let service = service_fn(move |req: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { Ok::<_, Infallible>(server.handle(req).await) }
        });

        let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            () = shutdown.recv() => {
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        }
    }

    /// Handles one request without a socket.
    ///
    /// Generic over the body so tests can pass a `Full<Bytes>`.
    pub async fn handle<B>(&self, req: Request<B>) -> HttpResponse
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (parts, body) = req.into_parts();
        let timeout = self.config.request_timeout();

        let limited = Limited::new(body, self.config.max_body_size());
        let entity = match tokio::time::timeout(timeout, limited.collect()).await {
            Ok(Ok(collected)) => collected.to_bytes(),
            Ok(Err(e)) if e.downcast_ref::<LengthLimitError>().is_some() => {
                debug!(limit = self.config.max_body_size(), "request body too large");
                return bare(StatusCode::PAYLOAD_TOO_LARGE);
            }
            Ok(Err(e)) => {
                debug!(failure = %e, "failed to read request body");
                return bare(StatusCode::BAD_REQUEST);
            }
            Err(_) => {
                warn!("timed out reading request body");
                return bare(StatusCode::REQUEST_TIMEOUT);
            }
        };

        let ctx = RequestContext::new(parts.method, parts.uri, parts.headers, entity);
        match tokio::time::timeout(timeout, self.pipeline.execute(ctx)).await {
            Ok(Ok(response)) => response.map(Full::new),
            Ok(Err(err)) => {
                error!(failure = ?err, "response filter failed after a successful invocation");
                bare(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Err(_) => {
                warn!("pipeline execution timed out");
                bare(StatusCode::GATEWAY_TIMEOUT)
            }
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn bare(status: StatusCode) -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}
