// ABOUTME: FramedSocket — length-prefixed duplex framing over one TCP socket, with a background keepalive timer
// ABOUTME: A signed 32-bit big-endian length prefix: 0 is a keepalive, negative is a peer-closed marker, positive is a payload

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::closed::{ClosedLatch, LatchCause};
use crate::error::{Result, TransportError};

/// The outcome of one `read()` call.
#[derive(Debug)]
pub enum ReadOutcome {
    /// A payload frame arrived.
    Payload(Bytes),
    /// A zero-length keepalive frame arrived; callers normally skip these.
    Keepalive,
    /// The peer sent the negative-length closed marker, or the socket hit EOF.
    Closed,
}

/// A duplex, length-prefixed framing layer over one `TcpStream`.
///
/// Reads and writes proceed concurrently without blocking each other: writes
/// (including the keepalive timer's attempts) serialize through a write
/// mutex, while reads are the exclusive concern of whichever single task owns
/// the socket's `frames()` stream. `close()` shuts the socket down at the OS
/// level (both directions at once), which is what lets a concurrently
/// blocked `read()` observe the close without coordinating through the write
/// mutex.
pub struct FramedSocket {
    stream: Arc<TcpStream>,
    write_lock: Mutex<()>,
    closed: ClosedLatch,
    peer_addr: std::net::SocketAddr,
    keepalive_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl FramedSocket {
    /// Wraps `stream`, starting a background keepalive timer at
    /// `config.keepalive_interval()` if `keepalive` is true.
    pub fn new(stream: TcpStream, keepalive: bool, keepalive_interval: Duration) -> Arc<Self> {
        let peer_addr = stream
            .peer_addr()
            .unwrap_or_else(|_| std::net::SocketAddr::from(([0, 0, 0, 0], 0)));
        let socket = Arc::new(Self {
            stream: Arc::new(stream),
            write_lock: Mutex::new(()),
            closed: ClosedLatch::new(),
            peer_addr,
            keepalive_task: std::sync::Mutex::new(None),
        });
        if keepalive {
            let task_socket = socket.clone();
            let handle = tokio::spawn(async move {
                let mut ticker = tokio::time::interval(keepalive_interval);
                ticker.tick().await; // first tick fires immediately; skip it
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            if !task_socket.is_connected() {
                                break;
                            }
                            if let Err(err) = task_socket.send_keepalive().await {
                                tracing::debug!(error = %err, "keepalive write failed");
                            }
                        }
                        _ = task_socket.closed.await_closed() => break,
                    }
                }
            });
            *socket.keepalive_task.lock().unwrap() = Some(handle);
        }
        socket
    }

    pub fn peer_addr(&self) -> std::net::SocketAddr {
        self.peer_addr
    }

    pub fn is_connected(&self) -> bool {
        !self.closed.is_set()
    }

    pub async fn await_closed(&self) {
        self.closed.await_closed().await;
    }

    /// Reads one frame, skipping nothing — callers that want keepalives
    /// filtered out should use `frames()` instead.
    pub async fn read(&self) -> Result<ReadOutcome> {
        let mut len_buf = [0u8; 4];
        match (&*self.stream).read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(err) if is_closed_like(&err) => {
                tracing::info!(peer = %self.peer_addr, "channel closed while reading frame length");
                return Ok(ReadOutcome::Closed);
            }
            Err(err) => {
                self.fail(&err);
                return Err(err.into());
            }
        }

        let len = i32::from_be_bytes(len_buf);
        if len == 0 {
            return Ok(ReadOutcome::Keepalive);
        }
        if len < 0 {
            return Ok(ReadOutcome::Closed);
        }

        let mut payload = vec![0u8; len as usize];
        match (&*self.stream).read_exact(&mut payload).await {
            Ok(_) => Ok(ReadOutcome::Payload(Bytes::from(payload))),
            Err(err) if is_closed_like(&err) => {
                tracing::info!(peer = %self.peer_addr, "channel closed mid-frame");
                Ok(ReadOutcome::Closed)
            }
            Err(err) => {
                self.fail(&err);
                Err(err.into())
            }
        }
    }

    /// A lazy sequence of payload frames; keepalives are absorbed silently,
    /// and the stream ends when the channel closes or a read fails.
    pub fn frames(self: &Arc<Self>) -> impl tokio_stream::Stream<Item = Bytes> + 'static {
        let socket = self.clone();
        async_stream::stream! {
            loop {
                match socket.read().await {
                    Ok(ReadOutcome::Payload(bytes)) => yield bytes,
                    Ok(ReadOutcome::Keepalive) => continue,
                    Ok(ReadOutcome::Closed) => break,
                    Err(err) => {
                        tracing::warn!(error = %err, "frame read failed, ending stream");
                        break;
                    }
                }
            }
        }
    }

    /// Writes one payload frame. Uninterruptible: the write is spawned onto
    /// its own task so dropping the caller's future does not abort it
    /// mid-write and corrupt the wire.
    pub async fn write(self: &Arc<Self>, payload: Bytes) -> Result<()> {
        let socket = self.clone();
        let handle = tokio::spawn(async move { socket.write_uncancellable(payload).await });
        handle
            .await
            .unwrap_or_else(|join_err| Err(TransportError::Io(std::io::Error::other(join_err))))
    }

    async fn write_uncancellable(&self, payload: Bytes) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let len = i32::try_from(payload.len())
            .map_err(|_| TransportError::EncodeError("payload exceeds i32::MAX bytes".into()))?;
        let mut framed = Vec::with_capacity(4 + payload.len());
        framed.extend_from_slice(&len.to_be_bytes());
        framed.extend_from_slice(&payload);
        if let Err(err) = (&*self.stream).write_all(&framed).await {
            self.fail(&err);
            return Err(err.into());
        }
        Ok(())
    }

    /// Attempts a zero-length keepalive frame without waiting for an
    /// in-flight write to finish — a real write always takes priority.
    pub async fn send_keepalive(&self) -> Result<()> {
        let Ok(_guard) = self.write_lock.try_lock() else {
            return Ok(());
        };
        if let Err(err) = (&*self.stream).write_all(&0i32.to_be_bytes()).await {
            self.fail(&err);
            return Err(err.into());
        }
        Ok(())
    }

    /// Uninterruptible: closes the socket at the OS level and sets the
    /// closed latch. Idempotent.
    pub async fn close(self: &Arc<Self>) {
        let socket = self.clone();
        let handle = tokio::spawn(async move {
            let _guard = socket.write_lock.lock().await;
            let _ = socket.stream.shutdown(std::net::Shutdown::Both);
        });
        let _ = handle.await;
        self.closed.set(LatchCause::Success);
        if let Some(task) = self.keepalive_task.lock().unwrap().take() {
            task.abort();
        }
    }

    fn fail(&self, err: &std::io::Error) {
        tracing::warn!(peer = %self.peer_addr, error = %err, "transport io error, closing");
        self.closed.set(LatchCause::Error(Arc::new(TransportError::Io(
            std::io::Error::new(err.kind(), err.to_string()),
        ))));
    }
}

fn is_closed_like(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::{TcpListener, TcpStream};
    use tokio_stream::StreamExt;

    async fn loopback_pair() -> (Arc<FramedSocket>, Arc<FramedSocket>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accept = tokio::spawn(async move { listener.accept().await.unwrap().0 });
        let client = TcpStream::connect(addr).await.unwrap();
        let server = accept.await.unwrap();
        (
            FramedSocket::new(server, false, Duration::from_millis(50)),
            FramedSocket::new(client, false, Duration::from_millis(50)),
        )
    }

    #[tokio::test]
    async fn write_then_read_round_trips_a_payload() {
        let (a, b) = loopback_pair().await;
        a.write(Bytes::from_static(b"hello")).await.unwrap();
        match b.read().await.unwrap() {
            ReadOutcome::Payload(bytes) => assert_eq!(&bytes[..], b"hello"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn keepalive_is_observed_and_skipped_by_frames() {
        let (a, b) = loopback_pair().await;
        a.send_keepalive().await.unwrap();
        a.write(Bytes::from_static(b"payload")).await.unwrap();
        let mut stream = b.frames();
        let first = stream.next().await.unwrap();
        assert_eq!(&first[..], b"payload");
    }

    #[tokio::test]
    async fn close_is_idempotent_and_observed_by_await_closed() {
        let (a, _b) = loopback_pair().await;
        a.close().await;
        a.close().await;
        assert!(!a.is_connected());
        a.await_closed().await;
    }

    #[tokio::test]
    async fn peer_close_surfaces_as_closed_outcome() {
        let (a, b) = loopback_pair().await;
        a.close().await;
        match b.read().await.unwrap() {
            ReadOutcome::Closed => {}
            other => panic!("expected Closed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn negative_length_marker_is_treated_as_closed() {
        let (a, b) = loopback_pair().await;
        // write the peer-closed sentinel directly, bypassing write() which only ever emits >= 0
        {
            let _guard = a.write_lock.lock().await;
            (&*a.stream)
                .write_all(&(-1i32).to_be_bytes())
                .await
                .unwrap();
        }
        match b.read().await.unwrap() {
            ReadOutcome::Closed => {}
            other => panic!("expected Closed, got {other:?}"),
        }
    }
}
