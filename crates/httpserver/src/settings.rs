//! Plain-data server settings.
//!
//! [`ServerSettings`] is the serde form of the options that do not carry
//! code (everything except the handler and TLS configuration), for loading
//! from a file or any other serde source. Omitted fields leave the
//! builder untouched.
//!
//! # Example
//!
//! ```rust
//! use httpserver::{ServerConfig, ServerSettings};
//! use std::time::Duration;
//!
//! let settings = ServerSettings::from_toml_str(
//!     r#"
//!     host = "127.0.0.1"
//!     port = 8080
//!     shutdown_timeout_ms = 5000
//!     "#,
//! )
//! .unwrap();
//!
//! let config = settings.apply(ServerConfig::builder()).unwrap().build();
//! assert_eq!(config.addr(), Some("127.0.0.1:8080"));
//! assert_eq!(config.shutdown_timeout(), Duration::from_secs(5));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ServerConfigBuilder;
use crate::error::ConfigError;

/// Serializable server options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    /// Host to bind; empty or omitted binds every interface.
    pub host: Option<String>,

    /// Port to bind. Required whenever `host` is set.
    pub port: Option<u16>,

    /// Read timeout in milliseconds.
    pub read_timeout_ms: Option<u64>,

    /// Read-header timeout in milliseconds.
    pub read_header_timeout_ms: Option<u64>,

    /// Write timeout in milliseconds.
    pub write_timeout_ms: Option<u64>,

    /// Idle timeout in milliseconds.
    pub idle_timeout_ms: Option<u64>,

    /// Maximum request header size in bytes.
    pub max_header_bytes: Option<usize>,

    /// Shutdown grace period in milliseconds.
    pub shutdown_timeout_ms: Option<u64>,
}

impl ServerSettings {
    /// Parses settings from a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Checks the settings for values that cannot be applied.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - `host` is set without `port`
    /// - a duration or the header limit is zero (omit the field instead)
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_some() && self.port.is_none() {
            return Err(ConfigError::invalid_value(
                "port",
                "must be set when host is set",
            ));
        }

        let durations = [
            ("read_timeout_ms", self.read_timeout_ms),
            ("read_header_timeout_ms", self.read_header_timeout_ms),
            ("write_timeout_ms", self.write_timeout_ms),
            ("idle_timeout_ms", self.idle_timeout_ms),
            ("shutdown_timeout_ms", self.shutdown_timeout_ms),
        ];
        for (field, value) in durations {
            if value == Some(0) {
                return Err(ConfigError::invalid_value(
                    field,
                    "must be greater than zero",
                ));
            }
        }

        if self.max_header_bytes == Some(0) {
            return Err(ConfigError::invalid_value(
                "max_header_bytes",
                "must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Validates the settings and applies every present field to `builder`.
    pub fn apply(&self, builder: ServerConfigBuilder) -> Result<ServerConfigBuilder, ConfigError> {
        self.validate()?;

        let mut builder = builder;
        if let Some(port) = self.port {
            builder = builder.address(self.host.as_deref().unwrap_or_default(), port);
        }
        if let Some(ms) = self.read_timeout_ms {
            builder = builder.read_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.read_header_timeout_ms {
            builder = builder.read_header_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.write_timeout_ms {
            builder = builder.write_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.idle_timeout_ms {
            builder = builder.idle_timeout(Duration::from_millis(ms));
        }
        if let Some(max) = self.max_header_bytes {
            builder = builder.max_header_bytes(max);
        }
        if let Some(ms) = self.shutdown_timeout_ms {
            builder = builder.shutdown_timeout(Duration::from_millis(ms));
        }

        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ServerConfig, DEFAULT_SHUTDOWN_TIMEOUT, DEFAULT_WRITE_TIMEOUT};

    #[test]
    fn test_empty_settings_keep_defaults() {
        let settings = ServerSettings::from_toml_str("").unwrap();
        assert_eq!(settings, ServerSettings::default());

        let config = settings.apply(ServerConfig::builder()).unwrap().build();
        assert!(config.addr().is_none());
        assert_eq!(config.write_timeout(), Some(DEFAULT_WRITE_TIMEOUT));
        assert_eq!(config.shutdown_timeout(), DEFAULT_SHUTDOWN_TIMEOUT);
    }

    #[test]
    fn test_port_without_host_binds_all_interfaces() {
        let settings = ServerSettings::from_toml_str("port = 9090").unwrap();
        let config = settings.apply(ServerConfig::builder()).unwrap().build();

        assert_eq!(config.addr(), Some(":9090"));
    }

    #[test]
    fn test_all_fields() {
        let settings = ServerSettings::from_toml_str(
            r#"
            host = "0.0.0.0"
            port = 8443
            read_timeout_ms = 1000
            read_header_timeout_ms = 200
            write_timeout_ms = 3000
            idle_timeout_ms = 60000
            max_header_bytes = 65536
            shutdown_timeout_ms = 250
            "#,
        )
        .unwrap();

        let config = settings.apply(ServerConfig::builder()).unwrap().build();
        assert_eq!(config.addr(), Some("0.0.0.0:8443"));
        assert_eq!(config.read_timeout(), Some(Duration::from_secs(1)));
        assert_eq!(config.read_header_timeout(), Some(Duration::from_millis(200)));
        assert_eq!(config.write_timeout(), Some(Duration::from_secs(3)));
        assert_eq!(config.idle_timeout(), Some(Duration::from_secs(60)));
        assert_eq!(config.max_header_bytes(), Some(65536));
        assert_eq!(config.shutdown_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_settings_override_earlier_builder_values() {
        let builder = ServerConfig::builder()
            .address("10.0.0.1", 80)
            .write_timeout(Duration::from_secs(99));

        let settings = ServerSettings {
            write_timeout_ms: Some(500),
            ..Default::default()
        };
        let config = settings.apply(builder).unwrap().build();

        assert_eq!(config.addr(), Some("10.0.0.1:80"));
        assert_eq!(config.write_timeout(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_host_without_port_is_rejected() {
        let settings = ServerSettings::from_toml_str(r#"host = "localhost""#).unwrap();
        let err = settings.validate().unwrap_err();

        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "port"));
    }

    #[test]
    fn test_zero_duration_is_rejected() {
        let settings = ServerSettings {
            idle_timeout_ms: Some(0),
            ..Default::default()
        };

        let err = settings.apply(ServerConfig::builder()).unwrap_err();
        assert!(err.to_string().contains("idle_timeout_ms"));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result = ServerSettings::from_toml_str("listen = true");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }
}
