//! Server configuration types.
//!
//! Configuration is built by applying setters, in call order, to a record
//! holding the documented defaults. Each setter is independent; when two
//! setters touch the same field the last one wins.
//!
//! # Example
//!
//! ```rust
//! use httpserver::ServerConfig;
//! use std::time::Duration;
//!
//! let config = ServerConfig::builder()
//!     .address("127.0.0.1", 8080)
//!     .shutdown_timeout(Duration::from_secs(5))
//!     .build();
//!
//! assert_eq!(config.addr(), Some("127.0.0.1:8080"));
//! assert_eq!(config.read_timeout(), Some(Duration::from_secs(30)));
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_rustls::rustls;

use crate::handler::{Handler, NotFound};

/// Address bound when none is configured: every interface, port 80.
pub const DEFAULT_ADDR: &str = ":80";

/// Default read timeout.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Default write timeout.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default shutdown grace period.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(15);

/// Server configuration.
///
/// Use [`ServerConfig::builder()`] to construct instances.
#[derive(Clone)]
pub struct ServerConfig {
    /// Bind address formatted as `"host:port"`
    addr: Option<String>,

    /// Request handler, shared rather than copied
    handler: Arc<dyn Handler>,

    /// TLS configuration; plain TCP when unset
    tls_config: Option<Arc<rustls::ServerConfig>>,

    read_timeout: Option<Duration>,
    read_header_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
    idle_timeout: Option<Duration>,
    max_header_bytes: Option<usize>,

    /// How long in-flight requests get to finish during shutdown
    shutdown_timeout: Duration,
}

impl ServerConfig {
    /// Creates a new server configuration builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Returns the configured bind address, if any.
    #[must_use]
    pub fn addr(&self) -> Option<&str> {
        self.addr.as_deref()
    }

    /// Returns the request handler.
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    /// Returns the TLS configuration, if any.
    #[must_use]
    pub fn tls_config(&self) -> Option<&Arc<rustls::ServerConfig>> {
        self.tls_config.as_ref()
    }

    /// Returns the read timeout.
    #[must_use]
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    /// Returns the read-header timeout.
    #[must_use]
    pub fn read_header_timeout(&self) -> Option<Duration> {
        self.read_header_timeout
    }

    /// Returns the write timeout.
    #[must_use]
    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout
    }

    /// Returns the idle timeout.
    #[must_use]
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout
    }

    /// Returns the maximum request header size in bytes.
    #[must_use]
    pub fn max_header_bytes(&self) -> Option<usize> {
        self.max_header_bytes
    }

    /// Returns the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Time allowed for reading request headers: the read-header timeout,
    /// falling back to the read timeout.
    #[must_use]
    pub fn effective_header_timeout(&self) -> Option<Duration> {
        self.read_header_timeout.or(self.read_timeout)
    }

    /// Keep-alive idle limit: the idle timeout, falling back to the read
    /// timeout.
    #[must_use]
    pub fn effective_idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout.or(self.read_timeout)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: None,
            handler: Arc::new(NotFound),
            tls_config: None,
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
            read_header_timeout: None,
            write_timeout: Some(DEFAULT_WRITE_TIMEOUT),
            idle_timeout: None,
            max_header_bytes: None,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("addr", &self.addr)
            .field("tls", &self.tls_config.is_some())
            .field("read_timeout", &self.read_timeout)
            .field("read_header_timeout", &self.read_header_timeout)
            .field("write_timeout", &self.write_timeout)
            .field("idle_timeout", &self.idle_timeout)
            .field("max_header_bytes", &self.max_header_bytes)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ServerConfig`].
///
/// Starts from the defaults (read and write timeouts of 30s, a 15s
/// shutdown grace period, a handler answering `404`). A zero duration or a
/// zero header limit means "no limit".
#[derive(Clone, Debug, Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bind address. An empty host binds every interface.
    ///
    /// ```rust
    /// use httpserver::ServerConfig;
    ///
    /// let config = ServerConfig::builder().address("", 8080).build();
    /// assert_eq!(config.addr(), Some(":8080"));
    /// ```
    #[must_use]
    pub fn address(mut self, host: impl AsRef<str>, port: u16) -> Self {
        self.config.addr = Some(format!("{}:{}", host.as_ref(), port));
        self
    }

    /// Sets the request handler.
    #[must_use]
    pub fn handler(self, handler: impl Handler) -> Self {
        self.shared_handler(Arc::new(handler))
    }

    /// Sets a request handler that is already shared, e.g. between
    /// several servers.
    #[must_use]
    pub fn shared_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.config.handler = handler;
        self
    }

    /// Serves TLS with the given configuration.
    #[must_use]
    pub fn tls_config(mut self, config: Arc<rustls::ServerConfig>) -> Self {
        self.config.tls_config = Some(config);
        self
    }

    /// Sets the read timeout.
    ///
    /// Used as the read-header timeout and the idle timeout when those are
    /// not set. Request bodies are streamed to the handler and are not
    /// bounded by it.
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = non_zero(timeout);
        self
    }

    /// Sets the maximum duration for reading request headers.
    #[must_use]
    pub fn read_header_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_header_timeout = non_zero(timeout);
        self
    }

    /// Sets the maximum duration for producing a response.
    #[must_use]
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = non_zero(timeout);
        self
    }

    /// Sets how long a keep-alive connection may sit idle between requests.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = non_zero(timeout);
        self
    }

    /// Sets the maximum number of bytes read while parsing request headers.
    #[must_use]
    pub fn max_header_bytes(mut self, max: usize) -> Self {
        self.config.max_header_bytes = (max > 0).then_some(max);
        self
    }

    /// Sets the graceful shutdown timeout.
    ///
    /// This is the maximum time the server will wait for in-flight
    /// requests to complete during shutdown before closing their
    /// connections.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    /// Builds the [`ServerConfig`] with the configured values.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        self.config
    }
}

fn non_zero(duration: Duration) -> Option<Duration> {
    (!duration.is_zero()).then_some(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert!(config.addr().is_none());
        assert!(config.tls_config().is_none());
        assert_eq!(config.read_timeout(), Some(DEFAULT_READ_TIMEOUT));
        assert_eq!(config.write_timeout(), Some(DEFAULT_WRITE_TIMEOUT));
        assert!(config.read_header_timeout().is_none());
        assert!(config.idle_timeout().is_none());
        assert!(config.max_header_bytes().is_none());
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_builder_address_format() {
        let config = ServerConfig::builder().address("localhost", 3000).build();
        assert_eq!(config.addr(), Some("localhost:3000"));

        let config = ServerConfig::builder().address(String::new(), 0).build();
        assert_eq!(config.addr(), Some(":0"));
    }

    #[test]
    fn test_builder_last_value_wins() {
        let config = ServerConfig::builder()
            .read_timeout(Duration::from_secs(1))
            .read_timeout(Duration::from_secs(2))
            .address("a", 1)
            .address("b", 2)
            .build();

        assert_eq!(config.read_timeout(), Some(Duration::from_secs(2)));
        assert_eq!(config.addr(), Some("b:2"));
    }

    #[test]
    fn test_builder_preserves_non_conflicting_fields() {
        let config = ServerConfig::builder()
            .read_timeout(Duration::from_secs(5))
            .max_header_bytes(16 * 1024)
            .write_timeout(Duration::from_secs(7))
            .idle_timeout(Duration::from_secs(60))
            .read_timeout(Duration::from_secs(9))
            .build();

        assert_eq!(config.read_timeout(), Some(Duration::from_secs(9)));
        assert_eq!(config.write_timeout(), Some(Duration::from_secs(7)));
        assert_eq!(config.idle_timeout(), Some(Duration::from_secs(60)));
        assert_eq!(config.max_header_bytes(), Some(16 * 1024));
        assert_eq!(config.shutdown_timeout(), DEFAULT_SHUTDOWN_TIMEOUT);
    }

    #[test]
    fn test_zero_means_unlimited() {
        let config = ServerConfig::builder()
            .read_timeout(Duration::ZERO)
            .write_timeout(Duration::ZERO)
            .max_header_bytes(0)
            .build();

        assert!(config.read_timeout().is_none());
        assert!(config.write_timeout().is_none());
        assert!(config.max_header_bytes().is_none());
    }

    #[test]
    fn test_effective_timeouts_fall_back_to_read_timeout() {
        let config = ServerConfig::default();
        assert_eq!(config.effective_header_timeout(), Some(DEFAULT_READ_TIMEOUT));
        assert_eq!(config.effective_idle_timeout(), Some(DEFAULT_READ_TIMEOUT));

        let config = ServerConfig::builder()
            .read_header_timeout(Duration::from_secs(2))
            .idle_timeout(Duration::from_secs(90))
            .build();
        assert_eq!(config.effective_header_timeout(), Some(Duration::from_secs(2)));
        assert_eq!(config.effective_idle_timeout(), Some(Duration::from_secs(90)));

        let config = ServerConfig::builder().read_timeout(Duration::ZERO).build();
        assert!(config.effective_header_timeout().is_none());
        assert!(config.effective_idle_timeout().is_none());
    }

    #[test]
    fn test_shared_handler_is_not_copied() {
        let handler: Arc<dyn Handler> = Arc::new(NotFound);
        let config = ServerConfig::builder()
            .shared_handler(Arc::clone(&handler))
            .build();

        assert!(Arc::ptr_eq(config.handler(), &handler));
    }

    #[derive(Debug)]
    struct NoCertificate;

    impl rustls::server::ResolvesServerCert for NoCertificate {
        fn resolve(
            &self,
            _client_hello: rustls::server::ClientHello<'_>,
        ) -> Option<Arc<rustls::sign::CertifiedKey>> {
            None
        }
    }

    #[test]
    fn test_builder_tls_config() {
        let tls = Arc::new(
            rustls::ServerConfig::builder()
                .with_no_client_auth()
                .with_cert_resolver(Arc::new(NoCertificate)),
        );

        let config = ServerConfig::builder()
            .tls_config(Arc::clone(&tls))
            .build();

        assert!(config
            .tls_config()
            .is_some_and(|configured| Arc::ptr_eq(configured, &tls)));
    }

    #[test]
    fn test_debug_omits_handler() {
        let config = ServerConfig::builder().address("127.0.0.1", 9).build();
        let debug = format!("{:?}", config);

        assert!(debug.contains("127.0.0.1:9"));
        assert!(debug.contains("tls: false"));
    }
}
