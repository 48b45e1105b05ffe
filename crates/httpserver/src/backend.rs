//! The server primitive driven by the shutdown coordinator.
//!
//! A [`Backend`] accepts connections and serves a handler. The coordinator
//! only needs three things from it: a blocking serve loop, a graceful
//! stop, and an immediate stop. [`HttpBackend`](crate::HttpBackend) is the
//! hyper-based implementation; tests substitute their own.

use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::ServerError;

/// An HTTP server primitive.
///
/// Implementations must tolerate `shutdown` and `close` being called while
/// `serve` is running, and either of them being called more than once.
pub trait Backend: Send + Sync {
    /// Runs the accept loop until the backend is stopped or fails.
    ///
    /// Returns [`ServerError::Closed`] after a deliberate stop, including
    /// when the backend had already been stopped before this call.
    fn serve(&self) -> impl Future<Output = Result<(), ServerError>> + Send;

    /// Stops accepting connections and waits for in-flight requests to
    /// finish. Has no deadline of its own; the caller bounds it.
    fn shutdown(&self) -> impl Future<Output = Result<(), ServerError>> + Send;

    /// Stops accepting connections and terminates open connections
    /// immediately.
    fn close(&self) -> impl Future<Output = Result<(), ServerError>> + Send;
}

/// Lifecycle of a backend.
///
/// `Stopping` is only entered from `Running`, and only once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// `serve` has not been called yet.
    NotStarted,
    /// The accept loop is running.
    Running,
    /// A stop was requested while running; connections are draining.
    Stopping,
    /// The backend is stopped and will not serve again.
    Stopped,
}

impl ServerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::NotStarted,
            1 => Self::Running,
            2 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

/// Atomic cell holding a [`ServerState`].
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) const fn new() -> Self {
        Self(AtomicU8::new(ServerState::NotStarted as u8))
    }

    pub(crate) fn get(&self) -> ServerState {
        ServerState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Moves `from` to `to`. Returns `false` if the current state was not `from`.
    pub(crate) fn transition(&self, from: ServerState, to: ServerState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub(crate) fn set(&self, state: ServerState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_starts_not_started() {
        let cell = StateCell::new();
        assert_eq!(cell.get(), ServerState::NotStarted);
    }

    #[test]
    fn test_stopping_only_from_running() {
        let cell = StateCell::new();
        assert!(!cell.transition(ServerState::Running, ServerState::Stopping));

        assert!(cell.transition(ServerState::NotStarted, ServerState::Running));
        assert!(cell.transition(ServerState::Running, ServerState::Stopping));
        assert!(!cell.transition(ServerState::Running, ServerState::Stopping));
        assert_eq!(cell.get(), ServerState::Stopping);

        cell.set(ServerState::Stopped);
        assert_eq!(cell.get(), ServerState::Stopped);
    }
}
