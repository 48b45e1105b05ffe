//! Error types for the server and its configuration.

use thiserror::Error;

/// Errors returned by [`Server::run`](crate::Server::run) and by the
/// [`Backend`](crate::Backend) operations.
///
/// [`ServerError::Closed`] is not a failure: it is the sentinel a backend's
/// serve loop returns after it was deliberately stopped. The coordinator
/// turns it into `Ok(())`.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The server was deliberately stopped.
    #[error("server closed")]
    Closed,

    /// The configured address cannot be used as a bind address.
    #[error("invalid address '{addr}': {reason}")]
    InvalidAddress {
        /// The offending address.
        addr: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Binding the listener failed.
    #[error("failed to bind to {addr}")]
    Bind {
        /// The address the bind was attempted on.
        addr: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// TLS handshake with a client failed.
    #[error("TLS handshake failed: {0}")]
    Tls(#[source] std::io::Error),

    /// A connection ended with a protocol error.
    #[error("connection error: {0}")]
    Connection(#[from] hyper::Error),

    /// I/O error during server operation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Returns `true` for the deliberate-stop sentinel.
    ///
    /// # Example
    ///
    /// ```rust
    /// use httpserver::ServerError;
    ///
    /// assert!(ServerError::Closed.is_closed());
    /// ```
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    pub(crate) fn invalid_address(addr: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            addr: addr.into(),
            reason: reason.into(),
        }
    }
}

/// Errors that can occur while loading [`ServerSettings`](crate::ServerSettings).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// TOML parsing error.
    #[error("failed to parse TOML settings: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Invalid settings value.
    #[error("invalid settings value for {field}: {reason}")]
    InvalidValue {
        /// The field with the invalid value.
        field: String,
        /// Explanation of why the value is invalid.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
