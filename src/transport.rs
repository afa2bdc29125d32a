// ABOUTME: SocketTransport is the entry point: serve() deploys a process and accepts its two connections back,
// ABOUTME: connect() opens the two connections outward and tags each with its ChannelRole during the handshake

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use crate::channel::{self, ChannelPair};
use crate::client::TransportClient;
use crate::codec::{ChannelRole, Message, ShutdownMarker};
use crate::config::TransportConfig;
use crate::deploy::Deploy;
use crate::error::{Result, TimeoutKind, TransportError};
use crate::framed::FramedSocket;
use crate::server::TransportServer;

/// Namespace for the two ways a transport session comes into being.
pub struct SocketTransport;

impl SocketTransport {
    /// Binds an ephemeral listener, deploys the kernel process against it,
    /// and accepts its two back-connections within `config.accept_timeout()`.
    /// Kills the process if anything about the handshake fails.
    pub async fn serve<D, Req, Resp, Upd>(
        deploy: D,
        config: TransportConfig,
    ) -> Result<TransportServer<Req, Resp, Upd>>
    where
        D: Deploy,
        Req: Message,
        Resp: Message + Send + 'static,
        Upd: Message,
    {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let local_addr = listener.local_addr()?;

        let process = deploy.deploy_kernel(local_addr).await?;
        config.report_progress(50);

        let first = match Self::accept_one(&listener, &config).await {
            Ok(stream) => stream,
            Err(err) => {
                let _ = process.kill().await;
                return Err(err);
            }
        };
        let second = match Self::accept_one(&listener, &config).await {
            Ok(stream) => stream,
            Err(err) => {
                let _ = process.kill().await;
                return Err(err);
            }
        };

        let a = FramedSocket::new(first, true, config.keepalive_interval());
        let b = FramedSocket::new(second, true, config.keepalive_interval());

        let (main, updates) = match channel::identify_roles(a.clone(), b.clone()).await {
            Ok(pair) => pair,
            Err(err) => {
                tokio::join!(a.close(), b.close());
                let _ = process.kill().await;
                return Err(err);
            }
        };

        Ok(TransportServer::new(
            local_addr,
            process,
            ChannelPair { main, updates },
            config,
        ))
    }

    async fn accept_one(listener: &TcpListener, config: &TransportConfig) -> Result<TcpStream> {
        match timeout(config.accept_timeout(), listener.accept()).await {
            Ok(Ok((stream, _addr))) => Ok(stream),
            Ok(Err(err)) => Err(TransportError::Io(err)),
            Err(_) => Err(TransportError::Timeout(TimeoutKind::Accept)),
        }
    }

    /// Opens two connections to `addr` and tags each with its `ChannelRole`.
    pub async fn connect<Req, Resp, Upd>(
        addr: SocketAddr,
        config: TransportConfig,
    ) -> Result<TransportClient<Req, Resp, Upd>>
    where
        Req: Message + ShutdownMarker,
        Resp: Message,
        Upd: Message,
    {
        let main_stream = TcpStream::connect(addr).await?;
        let updates_stream = TcpStream::connect(addr).await?;

        let main = FramedSocket::new(main_stream, true, config.keepalive_interval());
        let updates = FramedSocket::new(updates_stream, true, config.keepalive_interval());

        main.write(ChannelRole::Main.encode()).await?;
        updates.write(ChannelRole::NotebookUpdates.encode()).await?;

        Ok(TransportClient::new(ChannelPair { main, updates }))
    }
}
