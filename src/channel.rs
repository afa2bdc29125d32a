// ABOUTME: ChannelPair bundles the main and notebook-updates sockets; identify_roles runs the handshake
// ABOUTME: The first frame on each socket is a ChannelRole tag; the permutation of the two tags assigns roles

use std::sync::Arc;

use crate::codec::ChannelRole;
use crate::error::{HandshakeError, Result, TransportError};
use crate::framed::{FramedSocket, ReadOutcome};

/// The two sockets that make up one transport session.
pub struct ChannelPair {
    pub main: Arc<FramedSocket>,
    pub updates: Arc<FramedSocket>,
}

impl ChannelPair {
    pub fn is_connected(&self) -> bool {
        self.main.is_connected() && self.updates.is_connected()
    }

    pub async fn close(&self) {
        tokio::join!(self.main.close(), self.updates.close());
    }
}

/// Reads the first frame from each of two freshly-accepted sockets in
/// parallel, decodes it as a `ChannelRole`, and returns `(main, updates)`
/// ordered by the observed roles.
pub async fn identify_roles(
    a: Arc<FramedSocket>,
    b: Arc<FramedSocket>,
) -> Result<(Arc<FramedSocket>, Arc<FramedSocket>)> {
    let (role_a, role_b) = tokio::join!(read_role(&a), read_role(&b));
    match (role_a?, role_b?) {
        (ChannelRole::Main, ChannelRole::NotebookUpdates) => Ok((a, b)),
        (ChannelRole::NotebookUpdates, ChannelRole::Main) => Ok((b, a)),
        _ => Err(TransportError::Handshake(HandshakeError::DuplicateRole)),
    }
}

async fn read_role(socket: &Arc<FramedSocket>) -> Result<ChannelRole> {
    loop {
        match socket.read().await? {
            ReadOutcome::Keepalive => continue,
            ReadOutcome::Closed => return Err(TransportError::Handshake(HandshakeError::Eof)),
            ReadOutcome::Payload(bytes) => return ChannelRole::decode(&bytes),
        }
    }
}
