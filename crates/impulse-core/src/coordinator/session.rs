//! Per-session record kept by the coordinator

use crate::{
    engine::{PlaybackEngine, TimeObserverToken},
    observable::{SessionObservers, SessionSnapshot},
    remote::RemoteSessionProvider,
    surface::SurfaceFlags,
    types::{HostId, PlaybackState, RemoteDevice, SessionId, SurfaceTarget, VideoRef},
};
use tokio::task::JoinHandle;
use tracing::debug;

/// Active hand-off to a remote device
pub(crate) struct RemoteBinding {
    pub(crate) provider: Box<dyn RemoteSessionProvider>,
    pub(crate) device: RemoteDevice,
    pub(crate) start_offset: f64,
    pub(crate) autoplay: bool,
    pub(crate) media_loaded: bool,
    pub(crate) last_position: f64,
}

pub(crate) struct SessionEntry {
    pub(crate) id: SessionId,
    pub(crate) video: VideoRef,
    pub(crate) flags: SurfaceFlags,
    pub(crate) engine: Option<Box<dyn PlaybackEngine>>,
    pub(crate) time_observer: Option<TimeObserverToken>,
    pub(crate) manifest_task: Option<JoinHandle<()>>,
    /// Bumped on every load and teardown; stale callbacks carry an old value
    pub(crate) generation: u64,
    pub(crate) embedded_in: Option<SurfaceTarget>,
    /// Last inline surface, the way back from full screen
    pub(crate) last_embed: Option<SurfaceTarget>,
    pub(crate) presenting_host: Option<HostId>,
    pub(crate) pip_pending: bool,
    pub(crate) autoplay_pending: bool,
    pub(crate) autoplay_on_present: bool,
    pub(crate) pending_seek: Option<f64>,
    pub(crate) finished: bool,
    pub(crate) remote: Option<RemoteBinding>,
    pub(crate) remote_epoch: u64,
    /// Released by its host while PiP keeps it alive
    pub(crate) release_pending: bool,
    pub(crate) observers: SessionObservers,
}

impl SessionEntry {
    pub(crate) fn new(id: SessionId, video: VideoRef, event_capacity: usize) -> Self {
        Self {
            id,
            video,
            flags: SurfaceFlags::new(),
            engine: None,
            time_observer: None,
            manifest_task: None,
            generation: 0,
            embedded_in: None,
            last_embed: None,
            presenting_host: None,
            pip_pending: false,
            autoplay_pending: false,
            autoplay_on_present: false,
            pending_seek: None,
            finished: false,
            remote: None,
            remote_epoch: 0,
            release_pending: false,
            observers: SessionObservers::new(event_capacity),
        }
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        self.observers.snapshot()
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.engine.is_some() && self.observers.snapshot().state.is_ready()
    }

    pub(crate) fn sync_flags(&self) {
        let flags = self.flags.clone();
        self.observers.update(|snapshot| snapshot.flags = flags);
    }

    /// Drop the engine and everything hanging off it.
    ///
    /// The time observer is removed before the engine stops, and only once.
    pub(crate) fn teardown_engine(&mut self) {
        if let Some(task) = self.manifest_task.take() {
            task.abort();
        }
        self.generation += 1;

        let token = self.time_observer.take();
        if let Some(mut engine) = self.engine.take() {
            if let Some(token) = token {
                engine.remove_time_observer(token);
            }
            engine.stop();
            debug!(session = %self.id, "Engine torn down");
        }

        self.pending_seek = None;
        self.autoplay_pending = false;
        self.autoplay_on_present = false;
        self.finished = false;
        self.observers.update(|snapshot| {
            snapshot.is_playing = false;
            snapshot.state = PlaybackState::Unknown;
        });
    }
}
