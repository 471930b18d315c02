//! Error types for the IRC client session engine.

use thiserror::Error;

/// Convenience type alias for Results using [`ClientError`].
pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Top-level client errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// I/O error during connecting, reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS setup or handshake failure.
    #[error("tls error: {0}")]
    Tls(#[from] tokio_rustls::rustls::Error),

    /// The configured server name is not a valid TLS server name.
    #[error("invalid server name for TLS: {0}")]
    InvalidServerName(String),

    /// An inbound line exceeded the maximum length without a terminator.
    #[error("line too long: {0} bytes")]
    LineTooLong(usize),

    /// The event receiver was dropped while the session was still live.
    ///
    /// Surfaced as session-fatal unless a disconnect was requested.
    #[error("event channel closed")]
    EventChannelClosed,

    /// The session task is gone; no further commands can be delivered.
    #[error("session has shut down")]
    SessionClosed,

    /// A reply channel was dropped before the matching event arrived.
    #[error("reply channel dropped before completion")]
    ReplyDropped,
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for ClientError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Self::SessionClosed
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for ClientError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        Self::ReplyDropped
    }
}
