// ABOUTME: TransportClient is the deployed-process side handle: receives requests, sends responses, receives updates
// ABOUTME: The requests stream ends right after yielding a request for which ShutdownMarker::is_shutdown_request() is true

use std::marker::PhantomData;

use tokio_stream::{Stream, StreamExt};

use crate::channel::ChannelPair;
use crate::closed::{ClosedLatch, LatchCause};
use crate::codec::{Message, ShutdownMarker};
use crate::error::Result;

/// The process side of one transport session.
pub struct TransportClient<Req, Resp, Upd> {
    channels: ChannelPair,
    closed: ClosedLatch,
    _marker: PhantomData<(Req, Resp, Upd)>,
}

impl<Req, Resp, Upd> TransportClient<Req, Resp, Upd>
where
    Req: Message + ShutdownMarker,
    Resp: Message,
    Upd: Message,
{
    pub(crate) fn new(channels: ChannelPair) -> Self {
        Self {
            channels,
            closed: ClosedLatch::new(),
            _marker: PhantomData,
        }
    }

    pub async fn send_response(&self, response: &Resp) -> Result<()> {
        let bytes = response.encode()?;
        self.channels.main.write(bytes).await
    }

    /// A lazy sequence of requests arriving on the main channel. Ends right
    /// after yielding the one request for which `is_shutdown_request()` is
    /// true, when the channel closes, or when a frame fails to decode (which
    /// also records the failure as this client's closed cause).
    pub fn requests(&self) -> impl Stream<Item = Req> + '_ {
        async_stream::stream! {
            let mut frames = Box::pin(self.channels.main.frames());
            while let Some(bytes) = frames.next().await {
                match Req::decode(bytes) {
                    Ok(request) => {
                        let is_shutdown = request.is_shutdown_request();
                        yield request;
                        if is_shutdown {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to decode request, ending stream");
                        self.closed.set(LatchCause::Error(std::sync::Arc::new(err)));
                        break;
                    }
                }
            }
        }
    }

    /// A lazy sequence of updates arriving on the updates channel. Ends (and
    /// records the failure as this client's closed cause) on the first frame
    /// that fails to decode.
    pub fn updates(&self) -> impl Stream<Item = Upd> + '_ {
        async_stream::stream! {
            let mut frames = Box::pin(self.channels.updates.frames());
            while let Some(bytes) = frames.next().await {
                match Upd::decode(bytes) {
                    Ok(update) => yield update,
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to decode update, ending stream");
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

    pub async fn await_closed(&self) {
        self.closed.await_closed().await;
    }

    pub async fn close(&self) -> Result<()> {
        if self.closed.set(LatchCause::Success) {
            self.channels.close().await;
        }
        Ok(())
    }
}
