// ABOUTME: Test-only helper process: connects back to the address given as argv[1], echoes each request
// ABOUTME: as a response, and exits once it has delivered a response to a ShutdownRequest-marked request

#[path = "mod.rs"]
mod support;

use kernel_transport::{SocketTransport, TransportConfig};
use support::{TestRequest, TestResponse, TestUpdate};
use tokio_stream::StreamExt;

#[tokio::main]
async fn main() {
    let addr: std::net::SocketAddr = std::env::args()
        .nth(1)
        .expect("usage: echo_kernel <addr>")
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
        let shutdown = request.shutdown;
        client
            .send_response(&TestResponse(request.payload))
            .await
            .expect("failed to send response");
        if shutdown {
            break;
        }
    }

    client.close().await.expect("failed to close client");
}
