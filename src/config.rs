// ABOUTME: TransportConfig carries the spec's default timings and resolves whether they're overridable
// ABOUTME: Every internal call site reads timings through a resolved TransportConfig, never the bare consts

use std::sync::Arc;
use std::time::Duration;

/// Default keepalive period on an idle `FramedSocket`.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_millis(250);
/// Default bound on waiting for a deployed process to open both connections.
pub const ACCEPT_TIMEOUT: Duration = Duration::from_secs(180);
/// Default grace period between asking a process to shut down and killing it.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Resolved configuration for one `serve`/`connect` session.
///
/// Built with spec defaults; override individual fields with the builder
/// methods. Cloning is cheap — the progress callback, if any, is reference
/// counted.
#[derive(Clone)]
pub struct TransportConfig {
    keepalive_interval: Duration,
    accept_timeout: Duration,
    shutdown_grace: Duration,
    progress: Option<Arc<dyn Fn(u8) + Send + Sync>>,
}

impl TransportConfig {
    pub fn new() -> Self {
        Self {
            keepalive_interval: KEEPALIVE_INTERVAL,
            accept_timeout: ACCEPT_TIMEOUT,
            shutdown_grace: SHUTDOWN_GRACE,
            progress: None,
        }
    }

    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    pub fn with_accept_timeout(mut self, timeout: Duration) -> Self {
        self.accept_timeout = timeout;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: Fn(u8) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(progress));
        self
    }

    pub fn keepalive_interval(&self) -> Duration {
        self.keepalive_interval
    }

    pub fn accept_timeout(&self) -> Duration {
        self.accept_timeout
    }

    pub fn shutdown_grace(&self) -> Duration {
        self.shutdown_grace
    }

    pub(crate) fn report_progress(&self, percent: u8) {
        if let Some(progress) = &self.progress {
            progress(percent);
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new()
    }
}
