//! Error types for fact collection.

use thiserror::Error;

/// Errors raised by a channel while running a remote task.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The channel was closed before or during the call.
    #[error("channel closed")]
    Closed,

    /// The transport failed to deliver the call or its result.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote side raised its own error while running the task.
    #[error("remote task failed: {0}")]
    Remote(String),
}

/// Why a worker's connection could not be used.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Unavailable {
    #[error("no worker")]
    NoWorker,

    #[error("worker has no identity")]
    NoIdentity,

    #[error("no channel")]
    NoChannel,

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Errors surfaced by the collect and cache-write path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LabelerError {
    /// The worker or its connection could not be reached.
    #[error("connection unavailable for '{worker}': {cause}")]
    ConnectionUnavailable { worker: String, cause: Unavailable },
}

impl LabelerError {
    pub fn unavailable(worker: impl Into<String>, cause: impl Into<Unavailable>) -> Self {
        Self::ConnectionUnavailable {
            worker: worker.into(),
            cause: cause.into(),
        }
    }

    /// Returns the reason the connection was unusable.
    pub fn cause(&self) -> &Unavailable {
        match self {
            Self::ConnectionUnavailable { cause, .. } => cause,
        }
    }
}
