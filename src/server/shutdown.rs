//! Deferred process shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// Something that can be asked to stop the server after a delay.
/// Fire-and-forget: callers never wait for the shutdown to happen.
pub trait ShutdownSignal: Send + Sync {
    fn schedule(&self, delay: Duration);
}

/// Stops the server once, `delay` after the first [`ShutdownSignal::schedule`].
#[derive(Debug)]
pub struct ShutdownController {
    armed: AtomicBool,
    tx: Arc<watch::Sender<bool>>,
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            armed: AtomicBool::new(false),
            tx: Arc::new(tx),
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// Resolves once the scheduled delay has elapsed.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // the sender lives in self, so the channel cannot close under us
        let _ = rx.wait_for(|fired| *fired).await;
    }
}

impl ShutdownSignal for ShutdownController {
    fn schedule(&self, delay: Duration) {
        if self.armed.swap(true, Ordering::SeqCst) {
            tracing::debug!("Shutdown already scheduled");
            return;
        }

        tracing::info!(delay_secs = delay.as_secs_f64(), "Shutdown scheduled");
        let tx = Arc::clone(&self.tx);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tx.send_replace(true);
        });
    }
}
