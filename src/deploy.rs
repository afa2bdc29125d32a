// ABOUTME: Deploy is the external-collaborator seam: given where to connect back to, produce a running process
// ABOUTME: Production deploy strategies (spark-submit, containerized, direct spawn) are left entirely to callers

use std::net::SocketAddr;

use crate::error::Result;
use crate::process::DeployedProcess;

/// Launches the remote kernel process, telling it where to connect back.
///
/// Implementations own the command-line construction, environment, and
/// working directory for whatever deploy strategy they represent; this
/// crate only needs the resulting `DeployedProcess` handle.
#[async_trait::async_trait]
pub trait Deploy: Send + Sync {
    async fn deploy_kernel(&self, listener_addr: SocketAddr) -> Result<DeployedProcess>;
}
