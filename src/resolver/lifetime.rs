use tokio_util::sync::CancellationToken;
use tracing::info;

/// Owner of the process-wide "application stopping" signal
///
/// Consumers that declare a cancellation parameter receive a clone of this
/// token and are expected to observe it cooperatively.
#[derive(Debug, Clone, Default)]
pub struct ApplicationLifetime {
    stopping: CancellationToken,
}

impl ApplicationLifetime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token cancelled when the application begins shutting down
    pub fn application_stopping(&self) -> CancellationToken {
        self.stopping.clone()
    }

    pub fn stop_application(&self) {
        if !self.stopping.is_cancelled() {
            info!("Application stopping - signalling consumers");
            self.stopping.cancel();
        }
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.is_cancelled()
    }
}
