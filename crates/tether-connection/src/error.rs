//! Error types for connection operations

use tether_json_rpc::{JsonRpcErrorCode, ReadError, ResponseError, WriteError};
use thiserror::Error;

/// Result type for synchronous connection operations
pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// Programmer errors reported synchronously by the connection.
///
/// Transport and peer failures never surface here; they arrive through
/// the error listeners or as a [`ResponseError`] on a pending request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// The connection has been disposed
    #[error("Connection is disposed")]
    Disposed,

    /// `listen()` was already called on this connection
    #[error("Connection is already listening")]
    AlreadyListening,

    /// The outbound writer has shut down
    #[error("Connection writer is closed")]
    Closed,
}

/// Failures of the underlying byte streams, delivered to error listeners
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Read error: {0}")]
    Read(#[from] ReadError),

    #[error("Write error: {0}")]
    Write(#[from] WriteError),
}

impl TransportError {
    /// Whether the connection keeps working after this error
    pub fn is_recoverable(&self) -> bool {
        match self {
            TransportError::Read(e) => e.is_recoverable(),
            TransportError::Write(_) => false,
        }
    }
}

impl From<ConnectionError> for ResponseError {
    fn from(err: ConnectionError) -> Self {
        let code = match err {
            ConnectionError::Disposed => JsonRpcErrorCode::PendingResponseRejected,
            ConnectionError::AlreadyListening | ConnectionError::Closed => {
                JsonRpcErrorCode::ConnectionInactive
            }
        };
        ResponseError::new(code, Some(err.to_string()), None)
    }
}
