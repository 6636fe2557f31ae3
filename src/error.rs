use thiserror::Error;

/// Errors surfaced by timer construction and the playlist handle
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// Rejected timer parameters (zero rounds, zero work time)
    #[error("invalid timer: {0}")]
    InvalidTimer(String),

    /// The driver task is gone; commands have nowhere to go
    #[error("playlist driver is not running")]
    DriverClosed,

    /// Non-blocking send found the command channel full
    #[error("playlist command queue is full")]
    CommandQueueFull,
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for TimerError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        TimerError::DriverClosed
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for TimerError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        TimerError::DriverClosed
    }
}

impl<T> From<tokio::sync::mpsc::error::TrySendError<T>> for TimerError {
    fn from(e: tokio::sync::mpsc::error::TrySendError<T>) -> Self {
        match e {
            tokio::sync::mpsc::error::TrySendError::Full(_) => TimerError::CommandQueueFull,
            tokio::sync::mpsc::error::TrySendError::Closed(_) => TimerError::DriverClosed,
        }
    }
}
