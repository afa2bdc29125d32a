// ABOUTME: The Message trait pair message payloads implement, plus the ChannelRole handshake tag codec
// ABOUTME: Transport message bodies are opaque to this crate; only the ChannelRole tag has a fixed wire form

use bytes::Bytes;

use crate::error::{HandshakeError, TransportError};

/// A value that can appear as the payload of a frame.
///
/// The transport never inspects the encoded bytes of a message beyond the
/// length prefix `FramedSocket` itself applies — encoding and decoding are
/// entirely the message type's concern.
pub trait Message: Sized {
    fn encode(&self) -> crate::error::Result<Bytes>;
    fn decode(bytes: Bytes) -> crate::error::Result<Self>;
}

/// Lets a `TransportClient`'s request stream recognize the one request
/// variant that should end the stream once delivered.
pub trait ShutdownMarker {
    fn is_shutdown_request(&self) -> bool;
}

/// The tag each side sends as the first frame on a freshly-connected socket
/// during the channel-identity handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelRole {
    Main,
    NotebookUpdates,
}

impl ChannelRole {
    const MAIN: u8 = 0;
    const NOTEBOOK_UPDATES: u8 = 1;

    pub fn encode(self) -> Bytes {
        let byte = match self {
            ChannelRole::Main => Self::MAIN,
            ChannelRole::NotebookUpdates => Self::NOTEBOOK_UPDATES,
        };
        Bytes::copy_from_slice(&[byte])
    }

    pub fn decode(bytes: &[u8]) -> crate::error::Result<Self> {
        match bytes {
            [Self::MAIN] => Ok(ChannelRole::Main),
            [Self::NOTEBOOK_UPDATES] => Ok(ChannelRole::NotebookUpdates),
            other => Err(TransportError::Handshake(HandshakeError::UndecodableRole(
                format!("{other:?}"),
            ))),
        }
    }
}
