//! Playback coordinator
//!
//! Owns every playback session and decides, from the surface flags of each,
//! when an engine is created, when it is torn down, and which surface a
//! session is rendered into. Engines, remote providers and manifest fetches
//! report back through a single inbound queue that the coordinator drains
//! with [`PlaybackCoordinator::process_pending`] or
//! [`PlaybackCoordinator::process_next`], so all state is mutated from one
//! place.

mod playback;
mod remote;
mod session;
mod surfaces;

use crate::{
    config::PlayerSettings,
    engine::{EngineEvent, EngineEventSink, EngineFactory},
    error::PlaybackFailure,
    manifest::{fetch_qualities, HttpFetch, ReqwestFetcher, VideoQuality},
    observable::{SessionEvent, SessionObservers, SessionSnapshot, Subscription},
    pip::PipSlot,
    remote::{RemoteEvent, RemoteProviderFactory},
    renderer::{Renderer, UserIntent},
    surface::{SurfaceFlag, SurfaceFlags},
    types::{HostId, PlaybackRate, PlaybackState, SessionId, SurfaceTarget, VideoRef},
    Result,
};
use session::SessionEntry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Callback traffic queued for the coordinator
#[derive(Debug)]
pub(crate) enum Inbound {
    Engine {
        session: SessionId,
        generation: u64,
        event: EngineEvent,
    },
    Remote {
        session: SessionId,
        epoch: u64,
        event: RemoteEvent,
    },
    Qualities {
        session: SessionId,
        generation: u64,
        qualities: Vec<VideoQuality>,
    },
}

/// Outcome of a coordinator operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// Already in the requested state
    Unchanged,
    Ignored(NoOpReason),
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied)
    }
}

/// Why a request was ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    UnknownSession,
    NoKnownHost,
    NotEmbedded,
    NotInFullScreen,
    NotShown,
    DurationUnknown,
    InvalidPosition,
    PictureInPictureDisabled,
    RemoteNotConnected,
    RemoteAlreadyConnected,
    CastDisabled,
    NoRemoteProvider,
}

impl std::fmt::Display for NoOpReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            NoOpReason::UnknownSession => "unknown session",
            NoOpReason::NoKnownHost => "no known host",
            NoOpReason::NotEmbedded => "not embedded",
            NoOpReason::NotInFullScreen => "not in full screen",
            NoOpReason::NotShown => "not shown",
            NoOpReason::DurationUnknown => "duration unknown",
            NoOpReason::InvalidPosition => "invalid position",
            NoOpReason::PictureInPictureDisabled => "picture in picture disabled",
            NoOpReason::RemoteNotConnected => "remote not connected",
            NoOpReason::RemoteAlreadyConnected => "remote already connected",
            NoOpReason::CastDisabled => "cast disabled",
            NoOpReason::NoRemoteProvider => "no remote provider",
        };
        f.write_str(reason)
    }
}

pub(crate) fn ignored(session: SessionId, reason: NoOpReason) -> Transition {
    warn!(session = %session, reason = %reason, "Request ignored");
    Transition::Ignored(reason)
}

/// Builder for [`PlaybackCoordinator`]
pub struct CoordinatorBuilder {
    settings: PlayerSettings,
    engines: Box<dyn EngineFactory>,
    renderer: Box<dyn Renderer>,
    pip: PipSlot,
    fetcher: Option<Arc<dyn HttpFetch>>,
    http_fetch: bool,
    remote_providers: Option<Box<dyn RemoteProviderFactory>>,
    runtime: Option<Handle>,
}

impl CoordinatorBuilder {
    pub fn settings(mut self, settings: PlayerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Registry-level PiP slot shared by all sessions
    pub fn pip_slot(mut self, pip: PipSlot) -> Self {
        self.pip = pip;
        self
    }

    /// Manifest fetcher used to list qualities
    pub fn fetcher(mut self, fetcher: Arc<dyn HttpFetch>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Fetch manifests over HTTP with the configured timeout
    pub fn http_fetcher(mut self) -> Self {
        self.http_fetch = true;
        self
    }

    pub fn remote_providers(mut self, factory: impl RemoteProviderFactory + 'static) -> Self {
        self.remote_providers = Some(Box::new(factory));
        self
    }

    /// Runtime for manifest fetches; defaults to the current one, if any
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> Result<PlaybackCoordinator> {
        self.settings.validate()?;

        let fetcher = match self.fetcher {
            Some(fetcher) => Some(fetcher),
            None if self.http_fetch => {
                let fetcher: Arc<dyn HttpFetch> =
                    Arc::new(ReqwestFetcher::new(self.settings.manifest_timeout())?);
                Some(fetcher)
            }
            None => None,
        };
        let runtime = self.runtime.or_else(|| Handle::try_current().ok());
        if fetcher.is_some() && runtime.is_none() {
            warn!("No async runtime available, manifest qualities will not be fetched");
        }

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        info!(
            pip = self.settings.picture_in_picture_enabled,
            cast = self.settings.cast_enabled,
            "Playback coordinator created"
        );

        Ok(PlaybackCoordinator {
            settings: self.settings,
            sessions: HashMap::new(),
            occupants: HashMap::new(),
            pip: self.pip,
            engines: self.engines,
            renderer: self.renderer,
            fetcher,
            remote_providers: self.remote_providers,
            runtime,
            inbound_tx,
            inbound_rx: Some(inbound_rx),
        })
    }
}

/// Registry and state machine for all playback sessions
pub struct PlaybackCoordinator {
    settings: PlayerSettings,
    sessions: HashMap<SessionId, SessionEntry>,
    /// Which session each inline surface currently renders
    occupants: HashMap<SurfaceTarget, SessionId>,
    pip: PipSlot,
    engines: Box<dyn EngineFactory>,
    renderer: Box<dyn Renderer>,
    fetcher: Option<Arc<dyn HttpFetch>>,
    remote_providers: Option<Box<dyn RemoteProviderFactory>>,
    runtime: Option<Handle>,
    inbound_tx: mpsc::UnboundedSender<Inbound>,
    inbound_rx: Option<mpsc::UnboundedReceiver<Inbound>>,
}

impl PlaybackCoordinator {
    pub fn builder(
        engines: impl EngineFactory + 'static,
        renderer: impl Renderer + 'static,
    ) -> CoordinatorBuilder {
        CoordinatorBuilder {
            settings: PlayerSettings::default(),
            engines: Box::new(engines),
            renderer: Box::new(renderer),
            pip: PipSlot::new(),
            fetcher: None,
            http_fetch: false,
            remote_providers: None,
            runtime: None,
        }
    }

    pub fn settings(&self) -> &PlayerSettings {
        &self.settings
    }

    /// Return a session for `video`.
    ///
    /// A session pinned in Picture-in-Picture for an equal video is handed
    /// back instead of creating a fresh one.
    #[instrument(skip(self), fields(url = %video.url()))]
    pub fn acquire(&mut self, video: VideoRef) -> SessionId {
        if let Some(pinned) = self.pip.pinned() {
            if self.pip.pinned_video() == Some(&video) {
                if let Some(entry) = self.sessions.get_mut(&pinned) {
                    entry.release_pending = false;
                    info!(session = %pinned, "Recovered session from picture in picture");
                    return pinned;
                }
            }
        }

        let id = SessionId::new();
        self.sessions
            .insert(id, SessionEntry::new(id, video, self.settings.event_capacity));
        info!(session = %id, "Session acquired");
        id
    }

    /// Give a session back. Idempotent.
    ///
    /// A session still playing in Picture-in-Picture stays alive until the
    /// PiP window closes; its observers are dropped right away.
    #[instrument(skip(self))]
    pub fn release(&mut self, session: SessionId) -> Transition {
        let pip_active = match self.sessions.get(&session) {
            Some(entry) => entry.flags.contains(SurfaceFlag::PictureInPictureActive),
            None => return Transition::Unchanged,
        };

        if pip_active && self.pip.is_pinned(session) {
            self.detach_inline(session);
            self.exit_full_screen_layers(session);
            self.apply_flags(session, |flags| {
                flags.remove(SurfaceFlag::EmbeddedInline);
                flags.remove(SurfaceFlag::FullScreenPresented);
                flags.remove(SurfaceFlag::LinkedFullScreenPresented);
            });
            if let Some(entry) = self.sessions.get_mut(&session) {
                entry.release_pending = true;
                entry.observers.publish(SessionEvent::Released);
                let snapshot = entry.snapshot();
                entry.observers = SessionObservers::new(self.settings.event_capacity);
                entry.observers.update(|fresh| *fresh = snapshot);
            }
            info!(session = %session, "Release deferred until picture in picture stops");
            return Transition::Applied;
        }

        self.pip.unpin(session);
        self.finalize_release(session);
        Transition::Applied
    }

    /// Remove a session from the registry and free everything it holds
    pub(crate) fn finalize_release(&mut self, session: SessionId) {
        self.detach_inline(session);
        self.exit_full_screen_layers(session);
        let Some(mut entry) = self.sessions.remove(&session) else {
            return;
        };

        if let Some(mut binding) = entry.remote.take() {
            binding.provider.end_session();
        }
        if entry.flags.contains(SurfaceFlag::PictureInPictureActive) {
            self.renderer.stop_picture_in_picture(session);
        }
        self.pip.unpin(session);
        entry.teardown_engine();
        entry.observers.publish(SessionEvent::Released);
        info!(session = %session, "Session released");
    }

    /// Embed a fresh or recovered session for `video` into `target`.
    ///
    /// Whatever `target` rendered before is released unless it already
    /// plays an equal video.
    #[instrument(skip(self, video), fields(url = %video.url()))]
    pub fn load(&mut self, target: SurfaceTarget, video: VideoRef) -> SessionId {
        if let Some(current) = self.occupants.get(&target).copied() {
            let same = self
                .sessions
                .get(&current)
                .map(|entry| entry.video == video)
                .unwrap_or(false);
            if same {
                return current;
            }
            self.release(current);
        }

        let session = self.acquire(video);
        self.embed_inline(session, target);
        session
    }

    pub fn subscribe(&self, session: SessionId) -> Option<Subscription> {
        self.sessions.get(&session).map(|entry| entry.observers.subscribe())
    }

    pub fn snapshot(&self, session: SessionId) -> Option<SessionSnapshot> {
        self.sessions.get(&session).map(|entry| entry.snapshot())
    }

    pub fn flags(&self, session: SessionId) -> Option<SurfaceFlags> {
        self.sessions.get(&session).map(|entry| entry.flags.clone())
    }

    pub fn video(&self, session: SessionId) -> Option<&VideoRef> {
        self.sessions.get(&session).map(|entry| &entry.video)
    }

    pub fn has_engine(&self, session: SessionId) -> bool {
        self.sessions
            .get(&session)
            .map(|entry| entry.engine.is_some())
            .unwrap_or(false)
    }

    pub fn contains(&self, session: SessionId) -> bool {
        self.sessions.contains_key(&session)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn observer_count(&self, session: SessionId) -> usize {
        self.sessions
            .get(&session)
            .map(|entry| entry.observers.observer_count())
            .unwrap_or(0)
    }

    /// Host of the most recent full-screen presentation
    pub fn presenting_host(&self, session: SessionId) -> Option<HostId> {
        self.sessions.get(&session).and_then(|entry| entry.presenting_host)
    }

    pub fn pinned_session(&self) -> Option<SessionId> {
        self.pip.pinned()
    }

    pub fn is_remote_active(&self, session: SessionId) -> bool {
        self.sessions
            .get(&session)
            .map(|entry| entry.remote.is_some())
            .unwrap_or(false)
    }

    /// Session rendered into `target`, if any
    pub fn occupant(&self, target: SurfaceTarget) -> Option<SessionId> {
        self.occupants.get(&target).copied()
    }

    /// Route a user intent from the presentation layer
    #[instrument(skip(self))]
    pub fn handle_intent(&mut self, session: SessionId, intent: UserIntent) -> Transition {
        match intent {
            UserIntent::PlayPausePressed => self.toggle_play_pause(session),
            UserIntent::SeekRequested(fraction) => self.seek_to_fraction(session, fraction),
            UserIntent::SkipForward => self.skip_forward(session),
            UserIntent::SkipBackward => self.skip_backward(session),
            UserIntent::QualitySelected(quality) => self.select_quality(session, quality),
            UserIntent::RateSelected(rate) => self.set_rate(session, rate),
            UserIntent::RemoteDeviceSelected(Some(device)) => {
                if let Some(reason) = self.remote_connect_blocker(session) {
                    return ignored(session, reason);
                }
                match self.remote_providers.as_mut() {
                    Some(factory) => {
                        let provider = factory.create();
                        self.connect_remote(session, provider, device)
                    }
                    None => ignored(session, NoOpReason::NoRemoteProvider),
                }
            }
            UserIntent::RemoteDeviceSelected(None) => self.disconnect_remote(session),
            UserIntent::FullScreenToggled => self.toggle_full_screen(session),
            UserIntent::PictureInPictureToggled => self.toggle_picture_in_picture(session),
            UserIntent::DismissPressed => self.dismiss_full_screen(session),
            UserIntent::RetryPressed => self.retry(session),
        }
    }

    /// Apply everything already queued by engines, remotes and fetches.
    /// Returns how many callbacks were handled.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let message = match self.inbound_rx.as_mut() {
                Some(rx) => match rx.try_recv() {
                    Ok(message) => message,
                    Err(_) => return handled,
                },
                None => return handled,
            };
            self.dispatch(message);
            handled += 1;
        }
    }

    /// Wait for one callback and apply it.
    ///
    /// Returns `false` when the queue has been handed to a
    /// [`SharedCoordinator`](crate::SharedCoordinator).
    pub async fn process_next(&mut self) -> bool {
        let message = match self.inbound_rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => return false,
        };
        match message {
            Some(message) => {
                self.dispatch(message);
                true
            }
            None => false,
        }
    }

    pub(crate) fn take_inbound(&mut self) -> Option<mpsc::UnboundedReceiver<Inbound>> {
        self.inbound_rx.take()
    }

    pub(crate) fn dispatch(&mut self, message: Inbound) {
        match message {
            Inbound::Engine {
                session,
                generation,
                event,
            } => self.on_engine_event(session, generation, event),
            Inbound::Remote {
                session,
                epoch,
                event,
            } => self.on_remote_event(session, epoch, event),
            Inbound::Qualities {
                session,
                generation,
                qualities,
            } => self.on_qualities(session, generation, qualities),
        }
    }

    /// Mutate the flags of `session` as one batch, then react to the result.
    ///
    /// Losing PiP unpins the session. Losing every flag tears the engine
    /// down and finishes a deferred release.
    pub(crate) fn apply_flags<F>(&mut self, session: SessionId, mutate: F)
    where
        F: FnOnce(&mut SurfaceFlags),
    {
        let Some(entry) = self.sessions.get_mut(&session) else {
            return;
        };

        let was_shown = entry.flags.is_being_shown();
        let had_pip = entry.flags.contains(SurfaceFlag::PictureInPictureActive);
        mutate(&mut entry.flags);
        let now_shown = entry.flags.is_being_shown();
        let has_pip = entry.flags.contains(SurfaceFlag::PictureInPictureActive);

        entry.sync_flags();
        debug!(session = %session, flags = %entry.flags, "Surface flags updated");

        if had_pip && !has_pip {
            self.pip.unpin(session);
            self.renderer.show_pip_placeholder(session, false);
            entry.observers.publish(SessionEvent::PictureInPictureStopped);
        }

        if was_shown && !now_shown {
            info!(session = %session, "Session no longer shown, tearing down engine");
            entry.teardown_engine();
            if entry.release_pending {
                self.finalize_release(session);
            }
        }
    }

    /// Create and load an engine if the session has none
    pub(crate) fn ensure_engine(&mut self, session: SessionId) {
        let Some(entry) = self.sessions.get_mut(&session) else {
            return;
        };
        if entry.engine.is_some() {
            return;
        }

        match self.engines.create(&entry.video) {
            Ok(engine) => {
                entry.engine = Some(engine);
                self.start_load(session, None);
            }
            Err(e) => {
                warn!(session = %session, error = %e, "Engine construction failed");
                let failure = PlaybackFailure::from(&e);
                entry.observers.update(|snapshot| {
                    snapshot.state = PlaybackState::Error(failure.clone());
                    snapshot.error = Some(failure.clone());
                    snapshot.is_playing = false;
                });
                entry.observers.publish(SessionEvent::Error { failure });
            }
        }
    }

    /// (Re)load the session's video into its engine under a new generation
    pub(crate) fn start_load(&mut self, session: SessionId, resume_at: Option<f64>) {
        let tx = self.inbound_tx.clone();
        let interval = self.settings.progress_interval();
        let fetcher = self.fetcher.clone();
        let runtime = self.runtime.clone();

        let Some(entry) = self.sessions.get_mut(&session) else {
            return;
        };
        let Some(engine) = entry.engine.as_mut() else {
            return;
        };

        entry.generation += 1;
        let generation = entry.generation;
        entry.finished = false;
        entry.pending_seek = resume_at.filter(|position| *position > 0.0);

        engine.load(&entry.video, EngineEventSink::new(session, generation, tx.clone()));
        let snapshot = entry.observers.snapshot();
        if snapshot.rate != PlaybackRate::Normal {
            engine.set_rate(snapshot.rate.speed());
        }
        if !snapshot.quality.is_automatic() {
            engine.set_peak_bitrate(snapshot.quality.bitrate);
        }
        if entry.time_observer.is_none() {
            entry.time_observer = Some(engine.add_periodic_time_observer(interval));
        }

        entry.observers.update(|snapshot| {
            snapshot.state = PlaybackState::Loading;
            snapshot.error = None;
            snapshot.is_playing = false;
        });
        debug!(session = %session, generation, "Loading video");

        if let Some(task) = entry.manifest_task.take() {
            task.abort();
        }
        if let (Some(fetcher), Some(runtime)) = (fetcher, runtime) {
            let video = entry.video.clone();
            entry.manifest_task = Some(runtime.spawn(async move {
                let qualities = fetch_qualities(fetcher.as_ref(), &video).await;
                let _ = tx.send(Inbound::Qualities {
                    session,
                    generation,
                    qualities,
                });
            }));
        }
    }

    fn on_qualities(&mut self, session: SessionId, generation: u64, qualities: Vec<VideoQuality>) {
        let Some(entry) = self.sessions.get_mut(&session) else {
            debug!(session = %session, "Dropping qualities for released session");
            return;
        };
        if entry.generation != generation {
            debug!(session = %session, "Dropping stale qualities");
            return;
        }

        entry.manifest_task = None;
        let count = qualities.len();
        entry.observers.update(|snapshot| snapshot.qualities = qualities);
        entry.observers.publish(SessionEvent::QualitiesUpdated { count });
    }
}

impl std::fmt::Debug for PlaybackCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackCoordinator")
            .field("settings", &self.settings)
            .field("sessions", &self.sessions.len())
            .field("pinned", &self.pip.pinned())
            .finish()
    }
}
