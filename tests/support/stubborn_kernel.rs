// ABOUTME: Test-only helper process: connects back like echo_kernel but ignores shutdown requests entirely
// ABOUTME: Replies to every request, then blocks forever instead of exiting — only a forced kill ends it

#[path = "mod.rs"]
mod support;

use support::{TestRequest, TestResponse, TestUpdate};
use kernel_transport::{SocketTransport, TransportConfig};
use tokio_stream::StreamExt;

#[tokio::main]
async fn main() {
    let addr: std::net::SocketAddr = std::env::args()
        .nth(1)
        .expect("usage: stubborn_kernel <addr>")
        .parse()
        .expect("invalid socket address");

    let client = SocketTransport::connect::<TestRequest, TestResponse, TestUpdate>(
        addr,
        TransportConfig::new(),
    )
    .await
    .expect("failed to connect back to listener");

    let mut requests = Box::pin(client.requests());
    while let Some(request) = requests.next().await {
        client
            .send_response(&TestResponse(request.payload))
            .await
            .expect("failed to send response");
    }

    // A shutdown-marked request ends the requests stream on its own, but this
    // process never acts on it: no close(), no exit. Only a forced kill stops it.
    std::future::pending::<()>().await;
}
