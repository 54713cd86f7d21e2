//! Hand-off between the local engine and a remote device

use super::{ignored, session::RemoteBinding, NoOpReason, PlaybackCoordinator, Transition};
use crate::{
    error::{Error, PlaybackFailure},
    observable::SessionEvent,
    remote::{RemoteEvent, RemoteEventSink, RemotePlayerState, RemoteSessionProvider},
    surface::SurfaceFlag,
    types::{RemoteDevice, SessionId},
};
use tracing::{debug, info, instrument, warn};
use url::Url;

impl PlaybackCoordinator {
    /// Move playback of `session` to `device`.
    ///
    /// The local engine is paused and the remote starts where the local
    /// position was, playing if the local side was playing.
    #[instrument(skip(self, provider))]
    pub fn connect_remote(
        &mut self,
        session: SessionId,
        mut provider: Box<dyn RemoteSessionProvider>,
        device: RemoteDevice,
    ) -> Transition {
        if let Some(reason) = self.remote_connect_blocker(session) {
            return ignored(session, reason);
        }
        let tx = self.inbound_tx.clone();
        let Some(entry) = self.sessions.get_mut(&session) else {
            return ignored(session, NoOpReason::UnknownSession);
        };

        let snapshot = entry.snapshot();
        let position = entry
            .engine
            .as_ref()
            .map(|engine| engine.current_time())
            .filter(|position| position.is_finite())
            .unwrap_or(snapshot.progress)
            .max(0.0);
        let autoplay = snapshot.is_playing || entry.autoplay_pending;

        if let Some(engine) = entry.engine.as_mut() {
            engine.pause();
        }
        entry.autoplay_pending = false;

        entry.remote_epoch += 1;
        provider.attach(RemoteEventSink::new(session, entry.remote_epoch, tx));
        let connected = provider.is_connected();
        if connected {
            provider.load_media(&entry.video, position, autoplay);
        } else {
            provider.start_session(&device);
        }

        entry.remote = Some(RemoteBinding {
            provider,
            device: device.clone(),
            start_offset: position,
            autoplay,
            media_loaded: connected,
            last_position: position,
        });
        entry.observers.update(|snapshot| {
            snapshot.remote_active = true;
            snapshot.progress = position;
        });
        if connected {
            entry.observers.publish(SessionEvent::RemoteConnected {
                device: device.clone(),
            });
        }

        if entry.flags.contains(SurfaceFlag::PictureInPictureActive) {
            self.renderer.stop_picture_in_picture(session);
        }

        info!(session = %session, device = %device, position, autoplay, "Remote playback requested");
        Transition::Applied
    }

    /// Why `session` cannot hand off to a remote device right now, if anything
    pub(crate) fn remote_connect_blocker(&self, session: SessionId) -> Option<NoOpReason> {
        if !self.settings.cast_enabled {
            return Some(NoOpReason::CastDisabled);
        }
        match self.sessions.get(&session) {
            None => Some(NoOpReason::UnknownSession),
            Some(entry) if entry.remote.is_some() => Some(NoOpReason::RemoteAlreadyConnected),
            Some(_) => None,
        }
    }

    /// End the remote session at the host's request and resume locally
    #[instrument(skip(self))]
    pub fn disconnect_remote(&mut self, session: SessionId) -> Transition {
        let Some(entry) = self.sessions.get_mut(&session) else {
            return ignored(session, NoOpReason::UnknownSession);
        };
        let Some(mut binding) = entry.remote.take() else {
            return ignored(session, NoOpReason::RemoteNotConnected);
        };

        let content_url = binding.provider.content_url();
        binding.provider.end_session();
        self.resume_after_remote(session, binding, content_url);
        Transition::Applied
    }

    pub(super) fn on_remote_event(&mut self, session: SessionId, epoch: u64, event: RemoteEvent) {
        let Some(entry) = self.sessions.get_mut(&session) else {
            debug!(session = %session, "Dropping remote event for released session");
            return;
        };
        if entry.remote_epoch != epoch {
            debug!(session = %session, epoch, "Dropping stale remote event");
            return;
        }

        let event = match event {
            RemoteEvent::DeviceListChanged(devices) => {
                entry
                    .observers
                    .publish(SessionEvent::RemoteDevicesChanged { devices });
                return;
            }
            event => event,
        };

        let Some(binding) = entry.remote.as_mut() else {
            return;
        };

        match event {
            RemoteEvent::SessionStarted => {
                if binding.media_loaded {
                    return;
                }
                binding
                    .provider
                    .load_media(&entry.video, binding.start_offset, binding.autoplay);
                binding.media_loaded = true;
                let device = binding.device.clone();
                info!(session = %session, device = %device, "Remote session started");
                entry
                    .observers
                    .publish(SessionEvent::RemoteConnected { device });
            }
            RemoteEvent::SessionStartFailed(reason) => {
                if let Some(binding) = entry.remote.take() {
                    self.remote_start_failed(session, binding, reason);
                }
            }
            RemoteEvent::StateChanged(state) => {
                let playing = match state {
                    RemotePlayerState::Playing => Some(true),
                    RemotePlayerState::Paused | RemotePlayerState::Idle => Some(false),
                    RemotePlayerState::Buffering => None,
                };
                let Some(playing) = playing else {
                    return;
                };
                if entry.observers.update(|snapshot| snapshot.is_playing = playing) {
                    entry.observers.publish(if playing {
                        SessionEvent::Play
                    } else {
                        SessionEvent::Pause
                    });
                }
            }
            RemoteEvent::PositionUpdate { position, duration } => {
                if !position.is_finite() {
                    return;
                }
                binding.last_position = position;
                entry.observers.update(|snapshot| {
                    snapshot.progress = position;
                    if duration.is_finite() && duration > 0.0 {
                        snapshot.duration = duration;
                    }
                });
            }
            RemoteEvent::SessionEnded { content_url } => {
                if let Some(binding) = entry.remote.take() {
                    self.resume_after_remote(session, binding, content_url);
                }
            }
            RemoteEvent::DeviceListChanged(_) => {}
        }
    }

    /// Local engine takes over again. Playback resumes at the last remote
    /// position only if the remote was playing this session's media.
    fn resume_after_remote(&mut self, session: SessionId, binding: RemoteBinding, content_url: Option<Url>) {
        let Some(entry) = self.sessions.get_mut(&session) else {
            return;
        };
        entry.remote_epoch += 1;

        let same_media = content_url.as_ref() == Some(entry.video.url());
        let position = binding.last_position;
        let resumed = match entry.engine.as_mut() {
            Some(engine) if same_media => {
                engine.seek(position);
                engine.play();
                true
            }
            _ => false,
        };

        entry.observers.update(|snapshot| {
            snapshot.remote_active = false;
            if resumed {
                snapshot.progress = position;
            } else {
                snapshot.is_playing = false;
            }
        });
        entry.observers.publish(SessionEvent::RemoteDisconnected {
            resumed_locally: resumed,
        });
        info!(
            session = %session,
            device = %binding.device,
            resumed,
            position,
            "Remote playback ended"
        );
    }

    /// Connecting failed; local playback carries on as before
    fn remote_start_failed(&mut self, session: SessionId, binding: RemoteBinding, reason: String) {
        let Some(entry) = self.sessions.get_mut(&session) else {
            return;
        };
        entry.remote_epoch += 1;

        warn!(session = %session, device = %binding.device, reason = %reason, "Remote session failed to start");
        if binding.autoplay {
            if let Some(engine) = entry.engine.as_mut() {
                engine.play();
            }
        }

        let failure = PlaybackFailure::from(Error::RemoteConnect(reason));
        entry.observers.update(|snapshot| snapshot.remote_active = false);
        entry.observers.publish(SessionEvent::RemoteError { failure });
    }
}
