//! The server and its shutdown coordinator.
//!
//! [`Server::run`] serves until the caller's cancellation token fires, then
//! stops the server gracefully, escalating to an immediate close when the
//! grace period runs out.
//!
//! # Example
//!
//! ```rust,no_run
//! use httpserver::{HttpResponse, Server};
//! use bytes::Bytes;
//! use http::Request;
//! use http_body_util::Full;
//! use hyper::body::Incoming;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), httpserver::ServerError> {
//!     let config = Server::builder()
//!         .address("", 8080)
//!         .handler(|_req: Request<Incoming>| async {
//!             HttpResponse::new(Full::new(Bytes::from("hello")))
//!         })
//!         .build();
//!
//!     let shutdown = CancellationToken::new();
//!     Server::new(config).run(shutdown).await
//! }
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::backend::{Backend, ServerState};
use crate::config::{ServerConfig, ServerConfigBuilder};
use crate::error::ServerError;
use crate::http_backend::HttpBackend;
use crate::shutdown::os_signal_token;

/// An HTTP server with coordinated graceful shutdown.
///
/// The configuration is frozen at construction. A server serves at most
/// once: running it again after it stopped returns as soon as the
/// cancellation token fires.
pub struct Server {
    backend: HttpBackend,
    shutdown_timeout: Duration,
}

impl Server {
    /// Creates a new server with the given configuration.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let shutdown_timeout = config.shutdown_timeout();
        Self {
            backend: HttpBackend::new(config),
            shutdown_timeout,
        }
    }

    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }

    /// Returns a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        self.backend.config()
    }

    /// Returns the bound address once the server is listening.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.backend.local_addr()
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ServerState {
        self.backend.state()
    }

    /// Returns the number of open connections.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.backend.active_connections()
    }

    /// Runs the server until `shutdown` is cancelled or serving fails.
    ///
    /// On cancellation, the server stops accepting connections and gives
    /// in-flight requests the configured shutdown timeout to finish; any
    /// still running after that are terminated.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The server cannot bind to the configured address
    /// - Stopping the server fails
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), ServerError> {
        coordinate(&self.backend, self.shutdown_timeout, &shutdown).await
    }

    /// Runs the server until the process receives SIGINT or SIGTERM.
    ///
    /// # Errors
    ///
    /// Same as [`Server::run`].
    pub async fn run_until_signal(&self) -> Result<(), ServerError> {
        self.run(os_signal_token()).await
    }
}

impl From<ServerConfig> for Server {
    fn from(config: ServerConfig) -> Self {
        Self::new(config)
    }
}

/// Serves `backend` until `shutdown` is cancelled or serving fails, and
/// always stops it before returning.
///
/// Two futures run concurrently and are both awaited:
///
/// - the serve future, whose failure cancels a child of `shutdown`;
/// - the watch future, which waits for that child token and then stops the
///   backend, falling back to [`Backend::close`] after `grace`.
///
/// A serve error takes priority over a stop error. A deliberate stop
/// ([`ServerError::Closed`]) counts as success.
pub async fn coordinate<B: Backend>(
    backend: &B,
    grace: Duration,
    shutdown: &CancellationToken,
) -> Result<(), ServerError> {
    let scope = shutdown.child_token();

    let serve = async {
        match backend.serve().await {
            Err(e) if e.is_closed() => Ok(()),
            Err(e) => {
                tracing::error!("Server failed: {}", e);
                scope.cancel();
                Err(e)
            }
            Ok(()) => Ok(()),
        }
    };

    let watch = async {
        scope.cancelled().await;
        stop(backend, grace).await
    };

    let (served, stopped) = tokio::join!(serve, watch);
    served.and(stopped)
}

/// Graceful stop bounded by `grace`, escalating to close.
async fn stop<B: Backend>(backend: &B, grace: Duration) -> Result<(), ServerError> {
    tracing::info!("Shutting down, waiting up to {:?} for in-flight requests", grace);

    match tokio::time::timeout(grace, backend.shutdown()).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("Shutdown timeout reached, closing remaining connections");
            backend.close().await
        }
    }
}
