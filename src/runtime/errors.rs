//! Error types for the runtime system

use crossbeam_channel::SendError;

/// Error type for channel and source operations
#[derive(Debug, thiserror::Error)]
pub enum WorkError {
    #[error("Failed to send to output channel: {0}")]
    SendError(String),

    #[error("Shutdown signal received")]
    Shutdown,
}

impl<T> From<SendError<T>> for WorkError {
    fn from(e: SendError<T>) -> Self {
        WorkError::SendError(format!("{}", e))
    }
}

/// Result type for channel operations
pub type WorkResult<T = ()> = Result<T, WorkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_error_conversion() {
        let (tx, rx) = crossbeam_channel::bounded::<u8>(1);
        drop(rx);
        let err: WorkError = tx.send(1).unwrap_err().into();
        assert!(matches!(err, WorkError::SendError(_)));
    }
}
