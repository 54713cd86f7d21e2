//! Coordinator shared across tasks
//!
//! Hosts that drive the coordinator from several tasks wrap it here. A pump
//! task applies engine, remote and manifest callbacks as they arrive, so the
//! host never has to call `process_pending` itself.

use crate::coordinator::PlaybackCoordinator;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::debug;

pub struct SharedCoordinator {
    inner: Arc<Mutex<PlaybackCoordinator>>,
    pump: Option<JoinHandle<()>>,
}

impl SharedCoordinator {
    /// Move `coordinator` behind a mutex and start applying its callbacks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(mut coordinator: PlaybackCoordinator) -> Self {
        let inbound = coordinator.take_inbound();
        let inner = Arc::new(Mutex::new(coordinator));

        let pump = inbound.map(|mut inbound| {
            let inner = Arc::clone(&inner);
            tokio::spawn(async move {
                while let Some(message) = inbound.recv().await {
                    inner.lock().await.dispatch(message);
                }
                debug!("Coordinator callback pump finished");
            })
        });

        Self { inner, pump }
    }

    pub async fn lock(&self) -> MutexGuard<'_, PlaybackCoordinator> {
        self.inner.lock().await
    }

    pub fn handle(&self) -> Arc<Mutex<PlaybackCoordinator>> {
        Arc::clone(&self.inner)
    }
}

impl Drop for SharedCoordinator {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

impl std::fmt::Debug for SharedCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedCoordinator")
            .field("pumping", &self.pump.is_some())
            .finish()
    }
}
