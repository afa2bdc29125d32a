// ABOUTME: TransportServer is the listener-side handle: sends requests and notebook updates, streams responses
// ABOUTME: Tears itself down the moment any of {main closed, updates closed, process exited} happens first

use std::marker::PhantomData;
use std::net::SocketAddr;

use tokio_stream::{Stream, StreamExt};

use crate::channel::ChannelPair;
use crate::closed::{ClosedLatch, LatchCause};
use crate::codec::Message;
use crate::config::TransportConfig;
use crate::error::{Result, TransportError};
use crate::process::DeployedProcess;

/// The listener side of one transport session: owns the deployed process
/// and the channel pair, and exposes the request/response/update surface.
pub struct TransportServer<Req, Resp, Upd> {
    local_addr: SocketAddr,
    process: DeployedProcess,
    channels: ChannelPair,
    closed: ClosedLatch,
    config: TransportConfig,
    _marker: PhantomData<(Req, Resp, Upd)>,
}

impl<Req, Resp, Upd> TransportServer<Req, Resp, Upd>
where
    Req: Message,
    Resp: Message + Send + 'static,
    Upd: Message,
{
    pub(crate) fn new(
        local_addr: SocketAddr,
        process: DeployedProcess,
        channels: ChannelPair,
        config: TransportConfig,
    ) -> Self {
        let closed = ClosedLatch::new();

        let main_watch = closed.clone();
        let main_socket = channels.main.clone();
        tokio::spawn(async move {
            main_socket.await_closed().await;
            main_watch.set(LatchCause::Error(std::sync::Arc::new(TransportError::Closed)));
        });

        let updates_watch = closed.clone();
        let updates_socket = channels.updates.clone();
        tokio::spawn(async move {
            updates_socket.await_closed().await;
            updates_watch.set(LatchCause::Error(std::sync::Arc::new(TransportError::Closed)));
        });

        Self {
            local_addr,
            process,
            channels,
            closed,
            config,
            _marker: PhantomData,
        }
    }

    pub async fn send_request(&self, request: &Req) -> Result<()> {
        let bytes = request.encode()?;
        let result = self.channels.main.write(bytes).await;
        if let Err(err) = &result {
            tracing::warn!(error = %err, "failed to send request, peer likely dead");
        }
        result
    }

    pub async fn send_notebook_update(&self, update: &Upd) -> Result<()> {
        let bytes = update.encode()?;
        let result = self.channels.updates.write(bytes).await;
        if let Err(err) = &result {
            tracing::warn!(error = %err, "failed to send notebook update, peer likely dead");
        }
        result
    }

    /// A lazy sequence of responses arriving on the main channel. A frame
    /// that fails to decode ends the stream and records the failure as the
    /// server's closed cause.
    pub fn responses(&self) -> impl Stream<Item = Resp> + '_ {
        async_stream::stream! {
            let mut frames = Box::pin(self.channels.main.frames());
            while let Some(bytes) = frames.next().await {
                match Resp::decode(bytes) {
                    Ok(response) => yield response,
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to decode response, ending stream");
                        self.closed.set(LatchCause::Error(std::sync::Arc::new(err)));
                        break;
                    }
                }
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.channels.is_connected() && !self.closed.is_set()
    }

    pub fn address(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn await_closed(&self) {
        self.closed.await_closed().await;
    }

    /// Closes both channels and waits for the deployed process to exit,
    /// killing it after the configured shutdown grace if it hasn't. Idempotent.
    pub async fn close(&self) -> Result<()> {
        if self.closed.set(LatchCause::Success) {
            self.channels.close().await;
            self.process.await_or_kill(self.config.shutdown_grace()).await?;
        }
        Ok(())
    }
}
