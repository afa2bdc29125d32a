//! A duplex, length-prefixed transport for talking to a remote kernel
//! process over two TCP connections: one for requests/responses, one for
//! one-way notebook updates.
//!
//! The two connections are told apart by a one-byte handshake tag
//! ([`codec::ChannelRole`]) sent as the first frame on each socket. Message
//! bodies themselves are opaque to this crate — callers supply types
//! implementing [`codec::Message`] (and, for requests, [`codec::ShutdownMarker`]).

pub mod channel;
pub mod client;
pub mod closed;
pub mod codec;
pub mod config;
pub mod deploy;
pub mod error;
pub mod framed;
pub mod process;
pub mod server;
pub mod transport;

pub use channel::ChannelPair;
pub use client::TransportClient;
pub use closed::{ClosedLatch, LatchCause};
pub use codec::{ChannelRole, Message, ShutdownMarker};
pub use config::TransportConfig;
pub use deploy::Deploy;
pub use error::{HandshakeError, Result, TimeoutKind, TransportError};
pub use framed::{FramedSocket, ReadOutcome};
pub use process::DeployedProcess;
pub use server::TransportServer;
pub use transport::SocketTransport;
