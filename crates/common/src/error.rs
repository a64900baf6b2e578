use thiserror::Error;

/// Error types for the tunnel client
#[derive(Error, Debug)]
pub enum TunnelError {
    /// The broker answered with a non-success status. Terminal for the open
    /// attempt; carries the broker-supplied message when one was present.
    #[error("tunnel server rejected the request: {0}")]
    BrokerRejected(String),

    /// The broker could not be reached at the transport level. Never surfaced
    /// to callers; the handshake retries until the broker answers.
    #[error("tunnel server unreachable: {0}")]
    BrokerUnreachable(String),

    #[error("tunnel is already open")]
    AlreadyOpen,

    #[error("invalid broker url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for Results using TunnelError
pub type Result<T> = std::result::Result<T, TunnelError>;
