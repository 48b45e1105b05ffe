//! Hyper-based server primitive.
//!
//! # Architecture
//!
//! - TCP listener bound to the configured address
//! - One task per connection, driven by hyper's HTTP/1 connection
//! - Optional TLS via `tokio-rustls`
//! - A [`ConnectionTracker`] so shutdown can wait for connections to drain
//!
//! Graceful shutdown stops the accept loop and asks every connection to
//! finish its current request. Close drops every connection on the spot.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use http::{Request, StatusCode};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Instant;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;

use crate::backend::{Backend, ServerState, StateCell};
use crate::config::{ServerConfig, DEFAULT_ADDR};
use crate::error::ServerError;
use crate::handler::{status_response, Handler, HttpResponse};
use crate::shutdown::ConnectionTracker;

/// Smallest read buffer hyper accepts; smaller header limits are raised to it.
pub const MIN_HEADER_BUF_SIZE: usize = 8192;

/// Pause after a failed accept, so a persistent error (e.g. out of file
/// descriptors) does not spin the loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(10);

/// HTTP/1 server primitive built on hyper.
pub struct HttpBackend {
    config: ServerConfig,
    tls: Option<TlsAcceptor>,

    /// Cancelled to stop accepting and drain connections
    stop: CancellationToken,

    /// Cancelled to drop connections immediately
    kill: CancellationToken,

    /// Open connections
    tracker: ConnectionTracker,

    /// Held by the accept loop while it runs
    listening: ConnectionTracker,

    state: StateCell,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl HttpBackend {
    /// Creates a backend for the given configuration.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let tls = config.tls_config().cloned().map(TlsAcceptor::from);
        Self {
            config,
            tls,
            stop: CancellationToken::new(),
            kill: CancellationToken::new(),
            tracker: ConnectionTracker::new(),
            listening: ConnectionTracker::new(),
            state: StateCell::new(),
            local_addr: Mutex::new(None),
        }
    }

    /// Returns the configuration this backend serves.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the bound address once the listener is up.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ServerState {
        self.state.get()
    }

    /// Returns the number of open connections.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.tracker.active_connections()
    }

    fn connection_builder(&self) -> http1::Builder {
        let mut builder = http1::Builder::new();
        builder.timer(TokioTimer::new()).keep_alive(true);
        // hyper adds the timeout to the current instant, so an unrepresentable
        // deadline is left unset instead.
        if let Some(timeout) = self
            .config
            .effective_header_timeout()
            .filter(|timeout| std::time::Instant::now().checked_add(*timeout).is_some())
        {
            builder.header_read_timeout(timeout);
        }
        if let Some(max) = self.config.max_header_bytes() {
            builder.max_buf_size(max.max(MIN_HEADER_BUF_SIZE));
        }
        builder
    }

    fn spawn_connection(&self, stream: TcpStream, remote_addr: SocketAddr) {
        let token = self.tracker.acquire();
        let connection = Connection {
            builder: self.connection_builder(),
            handler: Arc::clone(self.config.handler()),
            write_timeout: self.config.write_timeout(),
            idle_timeout: self.config.effective_idle_timeout(),
            stop: self.stop.clone(),
            kill: self.kill.clone(),
        };
        let tls = self.tls.clone();
        let handshake_timeout = self.config.effective_header_timeout();

        tokio::spawn(async move {
            let result = match tls {
                Some(acceptor) => {
                    let kill = connection.kill.clone();
                    match accept_tls(&acceptor, stream, handshake_timeout, &kill).await {
                        Ok(Some(stream)) => connection.drive(stream).await,
                        Ok(None) => Ok(()),
                        Err(e) => Err(e),
                    }
                }
                None => connection.drive(stream).await,
            };
            if let Err(e) = result {
                tracing::debug!("Connection error from {}: {}", remote_addr, e);
            }
            drop(token);
        });
    }

    /// Moves to `Stopping` if running, stops the accept loop, optionally
    /// kills open connections, then waits for the loop and every connection
    /// to finish.
    async fn stop_and_drain(&self, kill: bool) {
        if self.state.transition(ServerState::Running, ServerState::Stopping) {
            tracing::info!(
                "Stopping server, {} connections open",
                self.active_connections()
            );
        }
        self.stop.cancel();
        if kill {
            self.kill.cancel();
        }

        // No connection is spawned once the accept loop has exited.
        self.listening.wait_for_drain().await;
        self.tracker.wait_for_drain().await;
        self.state.set(ServerState::Stopped);
    }
}

impl Backend for HttpBackend {
    async fn serve(&self) -> Result<(), ServerError> {
        let _listening = self.listening.acquire();
        if !self.state.transition(ServerState::NotStarted, ServerState::Running) {
            return match self.state() {
                ServerState::Stopping | ServerState::Stopped => Err(ServerError::Closed),
                _ => Err(ServerError::Io(std::io::Error::other(
                    "server is already running",
                ))),
            };
        }
        if self.stop.is_cancelled() {
            return Err(ServerError::Closed);
        }

        let addr = resolve_bind_addr(self.config.addr())?;
        let listener = TcpListener::bind(addr.as_str())
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;

        let local_addr = listener.local_addr()?;
        *self.local_addr.lock() = Some(local_addr);
        tracing::info!(
            tls = self.tls.is_some(),
            "Server listening on {}",
            local_addr
        );

        loop {
            tokio::select! {
                biased;

                () = self.stop.cancelled() => break,

                accepted = listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => self.spawn_connection(stream, remote_addr),
                    Err(e) => {
                        tracing::error!("Failed to accept connection: {}", e);
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }

        tracing::debug!("Listener on {} closed", local_addr);
        Err(ServerError::Closed)
    }

    async fn shutdown(&self) -> Result<(), ServerError> {
        self.stop_and_drain(false).await;
        tracing::info!("Server stopped");
        Ok(())
    }

    async fn close(&self) -> Result<(), ServerError> {
        self.stop_and_drain(true).await;
        tracing::info!("Server closed");
        Ok(())
    }
}

/// Turns a configured `"host:port"` address into one the listener can bind.
///
/// An unset address becomes [`DEFAULT_ADDR`], an empty host binds every
/// interface, and a bare IPv6 host is bracketed.
pub(crate) fn resolve_bind_addr(addr: Option<&str>) -> Result<String, ServerError> {
    let addr = addr.unwrap_or(DEFAULT_ADDR);
    let Some((host, port)) = addr.rsplit_once(':') else {
        return Err(ServerError::invalid_address(addr, "missing port"));
    };
    let port: u16 = port
        .parse()
        .map_err(|e| ServerError::invalid_address(addr, format!("invalid port: {}", e)))?;

    Ok(if host.is_empty() {
        format!("0.0.0.0:{}", port)
    } else if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    })
}

/// Runs the TLS handshake. `Ok(None)` means the backend was closed
/// mid-handshake.
async fn accept_tls(
    acceptor: &TlsAcceptor,
    stream: TcpStream,
    timeout: Option<Duration>,
    kill: &CancellationToken,
) -> Result<Option<tokio_rustls::server::TlsStream<TcpStream>>, ServerError> {
    let handshake = async {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, acceptor.accept(stream))
                .await
                .unwrap_or_else(|_| Err(std::io::ErrorKind::TimedOut.into())),
            None => acceptor.accept(stream).await,
        }
    };

    tokio::select! {
        biased;
        () = kill.cancelled() => Ok(None),
        result = handshake => result.map(Some).map_err(ServerError::Tls),
    }
}

/// Everything one connection task needs.
struct Connection {
    builder: http1::Builder,
    handler: Arc<dyn Handler>,
    write_timeout: Option<Duration>,
    idle_timeout: Option<Duration>,
    stop: CancellationToken,
    kill: CancellationToken,
}

impl Connection {
    async fn drive<I>(self, io: I) -> Result<(), ServerError>
    where
        I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let activity = Arc::new(Activity::new());
        let service = {
            let activity = Arc::clone(&activity);
            let handler = self.handler;
            let write_timeout = self.write_timeout;
            service_fn(move |req: Request<Incoming>| {
                let handler = Arc::clone(&handler);
                let activity = Arc::clone(&activity);
                async move {
                    let _in_flight = activity.begin();
                    Ok::<_, Infallible>(respond(handler.as_ref(), req, write_timeout).await)
                }
            })
        };

        let conn = self.builder.serve_connection(TokioIo::new(io), service);
        tokio::pin!(conn);

        let mut draining = false;
        loop {
            tokio::select! {
                biased;

                () = self.kill.cancelled() => return Ok(()),

                result = conn.as_mut() => return result.map_err(ServerError::from),

                () = self.stop.cancelled(), if !draining => {
                    draining = true;
                    conn.as_mut().graceful_shutdown();
                }

                () = activity.idle_expired(self.idle_timeout), if !draining => {
                    tracing::debug!("Closing idle connection");
                    draining = true;
                    conn.as_mut().graceful_shutdown();
                }
            }
        }
    }
}

/// Runs the handler, bounded by the write timeout.
async fn respond(
    handler: &dyn Handler,
    req: Request<Incoming>,
    write_timeout: Option<Duration>,
) -> HttpResponse {
    let Some(limit) = write_timeout else {
        return handler.call(req).await;
    };

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    match tokio::time::timeout(limit, handler.call(req)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!("Handler execution timed out for {} {}", method, path);
            status_response(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// Request activity on one connection, for the idle timeout.
#[derive(Debug)]
struct Activity {
    in_flight: AtomicUsize,
    last_active: Mutex<Instant>,
}

impl Activity {
    fn new() -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            last_active: Mutex::new(Instant::now()),
        }
    }

    fn begin(&self) -> InFlight<'_> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        *self.last_active.lock() = Instant::now();
        InFlight(self)
    }

    fn is_idle_for(&self, limit: Duration) -> bool {
        self.in_flight.load(Ordering::SeqCst) == 0 && self.last_active.lock().elapsed() >= limit
    }

    /// Completes once no request has been in flight for `limit`. Never
    /// completes when `limit` is `None`.
    async fn idle_expired(&self, limit: Option<Duration>) {
        let Some(limit) = limit else {
            return std::future::pending().await;
        };

        loop {
            let since = if self.in_flight.load(Ordering::SeqCst) > 0 {
                Instant::now()
            } else {
                *self.last_active.lock()
            };
            // A limit past the clock's range never expires.
            let Some(deadline) = since.checked_add(limit) else {
                return std::future::pending().await;
            };
            tokio::time::sleep_until(deadline).await;

            if self.is_idle_for(limit) {
                return;
            }
        }
    }
}

struct InFlight<'a>(&'a Activity);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.0.last_active.lock() = Instant::now();
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
