// ABOUTME: Error taxonomy for the transport, mirroring the spec's error classes as thiserror variants
// ABOUTME: Defines HandshakeError and TimeoutKind as nested enums plus the crate-wide Result alias

use std::io;

/// Why a handshake between two freshly-accepted or freshly-connected sockets failed.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    /// Both sockets tagged themselves with the same role.
    #[error("both channels identified as the same role")]
    DuplicateRole,
    /// A socket was closed before it sent its role tag.
    #[error("channel closed before sending its role tag")]
    Eof,
    /// The first frame on a socket did not decode as a known role.
    #[error("could not decode channel role tag: {0}")]
    UndecodableRole(String),
}

/// Which bounded wait timed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    /// Waiting for the deployed process to open its two connections.
    Accept,
    /// Waiting for the deployed process to exit after a graceful shutdown request.
    GracefulShutdown,
}

impl std::fmt::Display for TimeoutKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeoutKind::Accept => write!(f, "accept"),
            TimeoutKind::GracefulShutdown => write!(f, "graceful shutdown"),
        }
    }
}

/// The crate's single error type.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to encode message: {0}")]
    EncodeError(String),

    #[error("failed to decode message: {0}")]
    DecodeError(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    #[error("{0} timed out")]
    Timeout(TimeoutKind),

    #[error("process error: {0}")]
    Process(String),

    #[error("transport already closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
