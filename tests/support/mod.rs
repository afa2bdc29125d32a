// ABOUTME: Shared test-only message types and a Deploy implementation that spawns a real child process
// ABOUTME: Used by both the integration tests and the echo_kernel helper binary, kept in one place to avoid drift

use std::net::SocketAddr;
use std::path::PathBuf;

use bytes::Bytes;
use kernel_transport::{Deploy, DeployedProcess, Message, Result, ShutdownMarker};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRequest {
    pub shutdown: bool,
    pub payload: Vec<u8>,
}

impl Message for TestRequest {
    fn encode(&self) -> Result<Bytes> {
        let mut out = Vec::with_capacity(self.payload.len() + 1);
        out.push(self.shutdown as u8);
        out.extend_from_slice(&self.payload);
        Ok(Bytes::from(out))
    }

    fn decode(bytes: Bytes) -> Result<Self> {
        Ok(TestRequest {
            shutdown: bytes.first().copied().unwrap_or(0) != 0,
            payload: bytes[1..].to_vec(),
        })
    }
}

impl ShutdownMarker for TestRequest {
    fn is_shutdown_request(&self) -> bool {
        self.shutdown
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResponse(pub Vec<u8>);

impl Message for TestResponse {
    fn encode(&self) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(&self.0))
    }

    fn decode(bytes: Bytes) -> Result<Self> {
        Ok(TestResponse(bytes.to_vec()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestUpdate(pub Vec<u8>);

impl Message for TestUpdate {
    fn encode(&self) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(&self.0))
    }

    fn decode(bytes: Bytes) -> Result<Self> {
        Ok(TestUpdate(bytes.to_vec()))
    }
}

/// Spawns the `echo_kernel` helper binary, passing it the listener address
/// to connect back to. A real child process, not an in-process fake, so
/// that `DeployedProcess`'s kill/wait semantics are genuinely exercised.
pub struct TestDeploy {
    bin_path: PathBuf,
}

impl TestDeploy {
    pub fn new(bin_path: PathBuf) -> Self {
        Self { bin_path }
    }
}

#[async_trait::async_trait]
impl Deploy for TestDeploy {
    async fn deploy_kernel(&self, listener_addr: SocketAddr) -> Result<DeployedProcess> {
        let mut command = tokio::process::Command::new(&self.bin_path);
        command.arg(listener_addr.to_string());
        Ok(DeployedProcess::spawn(command)?)
    }
}
