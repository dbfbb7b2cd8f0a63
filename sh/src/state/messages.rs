//! State worker messages
//!
//! Commands and errors for the actor pattern.

use std::fmt;

use thiserror::Error;
use tokio::sync::oneshot;

/// Operation attempted while no worker was running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Stop,
    Restart,
    Reset,
    Write,
    Read,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let detail = match self {
            Self::Stop => "nothing to stop",
            Self::Restart => "nothing to restart",
            Self::Reset => "nothing to reset",
            Self::Write => "no write",
            Self::Read => "no read",
        };
        f.write_str(detail)
    }
}

/// Errors from state operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("State already running, nothing to start")]
    AlreadyRunning,

    #[error("State not running, {0}")]
    NotRunning(Operation),

    #[error("State worker went away before replying")]
    Disconnected,

    #[error("State worker did not reply within {0}ms")]
    Timeout(u64),
}

/// Response from state operations
pub type StateResponse<T> = Result<T, StateError>;

/// Commands sent to the state worker
///
/// Reads, writes and resets travel on one channel so that a single caller's
/// operations are applied in the order they were issued.
#[derive(Debug)]
pub enum StateCommand<V> {
    Read {
        key: String,
        reply: oneshot::Sender<Option<V>>,
    },

    /// `reply` is `None` for fire-and-forget writes
    Write {
        key: String,
        value: V,
        reply: Option<oneshot::Sender<V>>,
    },

    Reset,
}

impl<V> StateCommand<V> {
    /// Short label used in event traces
    pub fn label(&self) -> &'static str {
        match self {
            Self::Read { .. } => "READ",
            Self::Write { .. } => "WRITE",
            Self::Reset => "RESET",
        }
    }
}
