//! Shutdown plumbing.
//!
//! - [`os_signal_token`] turns SIGINT/SIGTERM into a cancelled
//!   [`CancellationToken`], ready to hand to [`Server::run`](crate::Server::run).
//! - [`ConnectionTracker`] counts live connections so a graceful shutdown
//!   can wait for them to drain.
//!
//! # Example
//!
//! ```rust,ignore
//! use httpserver::{shutdown::os_signal_token, Server};
//!
//! let config = Server::builder().address("", 8080).build();
//! Server::new(config).run(os_signal_token()).await?;
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Returns a token that is cancelled when the process receives SIGINT or
/// SIGTERM (Ctrl+C on non-Unix platforms).
///
/// Must be called from within a Tokio runtime.
#[must_use]
pub fn os_signal_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        if wait_for_os_signal().await {
            trigger.cancel();
        }
    });

    token
}

/// Waits for an OS shutdown signal. Returns `false` if no signal handler
/// could be installed.
async fn wait_for_os_signal() -> bool {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::warn!("Failed to register SIGTERM handler: {}", e);
                return wait_for_ctrl_c().await;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
                true
            }
            received = wait_for_ctrl_c() => received,
        }
    }

    #[cfg(not(unix))]
    {
        wait_for_ctrl_c().await
    }
}

async fn wait_for_ctrl_c() -> bool {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received SIGINT, initiating graceful shutdown");
            true
        }
        Err(e) => {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            false
        }
    }
}

/// Tracks active connections during shutdown.
///
/// When all [`ConnectionToken`] instances are dropped, the shutdown
/// process knows that all connections have been closed.
///
/// # Example
///
/// ```rust
/// use httpserver::shutdown::ConnectionTracker;
///
/// let tracker = ConnectionTracker::new();
///
/// let token = tracker.acquire();
/// assert_eq!(tracker.active_connections(), 1);
///
/// drop(token);
/// assert_eq!(tracker.active_connections(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl ConnectionTracker {
    /// Creates a new connection tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires a connection token, held for the life of the connection.
    #[must_use]
    pub fn acquire(&self) -> ConnectionToken {
        self.active.fetch_add(1, Ordering::SeqCst);
        ConnectionToken {
            active: Arc::clone(&self.active),
            notify: Arc::clone(&self.notify),
        }
    }

    /// Returns the number of active connections.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Waits until every token has been dropped.
    ///
    /// Completes immediately if there are no active connections.
    pub async fn wait_for_drain(&self) {
        loop {
            // Register before checking so a drop in between is not missed.
            let notified = self.notify.notified();
            if self.active.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// A token representing an active connection.
///
/// When dropped, decrements the connection count in the tracker.
#[derive(Debug)]
pub struct ConnectionToken {
    active: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl Drop for ConnectionToken {
    fn drop(&mut self) {
        if self.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify.notify_waiters();
        }
    }
}
