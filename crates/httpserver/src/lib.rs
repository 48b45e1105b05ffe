//! # httpserver
//!
//! A thin layer over [hyper](https://hyper.rs) that adds two things:
//!
//! - a builder-style configuration surface (address, handler, TLS,
//!   timeouts, header limit, shutdown grace period)
//! - graceful shutdown driven by a caller-supplied
//!   [`CancellationToken`](tokio_util::sync::CancellationToken)
//!
//! When the token is cancelled the server stops accepting connections and
//! gives in-flight requests the shutdown grace period to finish. Whatever is
//! still running after that is terminated. If serving fails on its own
//! (e.g. the address is taken), the server is stopped the same way and the
//! failure is returned.
//!
//! ## Example
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use http::Request;
//! use http_body_util::Full;
//! use httpserver::{shutdown::os_signal_token, HttpResponse, Server};
//! use hyper::body::Incoming;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), httpserver::ServerError> {
//!     let handler = |_req: Request<Incoming>| async {
//!         HttpResponse::new(Full::new(Bytes::from(r#"{"foo":"bar"}"#)))
//!     };
//!
//!     httpserver::run(os_signal_token(), 8080, handler, Server::builder()).await
//! }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod backend;
pub mod config;
pub mod error;
pub mod handler;
pub mod http_backend;
pub mod server;
pub mod settings;
pub mod shutdown;

pub use backend::{Backend, ServerState};
pub use config::{
    ServerConfig, ServerConfigBuilder, DEFAULT_ADDR, DEFAULT_READ_TIMEOUT,
    DEFAULT_SHUTDOWN_TIMEOUT, DEFAULT_WRITE_TIMEOUT,
};
pub use error::{ConfigError, ServerError};
pub use handler::{Handler, HandlerFuture, HttpResponse, NotFound, ResponseBody};
pub use http_backend::{HttpBackend, MIN_HEADER_BUF_SIZE};
pub use server::{coordinate, Server};
pub use settings::ServerSettings;

use tokio_util::sync::CancellationToken;

/// Shortcut for `Server::new(options.address("", port).handler(handler).build()).run(shutdown)`.
///
/// `port` and `handler` take precedence over any address or handler set on
/// `options`. The whole address is replaced, so a host set on `options`
/// does not survive: the server binds every interface.
///
/// # Errors
///
/// Same as [`Server::run`].
pub async fn run(
    shutdown: CancellationToken,
    port: u16,
    handler: impl Handler,
    options: ServerConfigBuilder,
) -> Result<(), ServerError> {
    let config = options.address("", port).handler(handler).build();
    Server::new(config).run(shutdown).await
}

/// Builds a server from `options` and runs it until the process receives
/// SIGINT or SIGTERM.
///
/// # Errors
///
/// Same as [`Server::run`].
pub async fn listen_and_serve(options: ServerConfigBuilder) -> Result<(), ServerError> {
    Server::new(options.build()).run_until_signal().await
}
