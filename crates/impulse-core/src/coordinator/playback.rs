//! Transport controls and engine callbacks

use super::{ignored, NoOpReason, PlaybackCoordinator, Transition};
use crate::{
    engine::EngineEvent,
    manifest::VideoQuality,
    observable::SessionEvent,
    types::{PlaybackRate, PlaybackState, SessionId},
};
use tracing::{debug, info, instrument, warn};

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

impl PlaybackCoordinator {
    /// Start playback on whichever side currently plays the session.
    ///
    /// Before the engine is ready the request is remembered and honoured on
    /// readiness. A finished item restarts from the beginning.
    #[instrument(skip(self))]
    pub fn play(&mut self, session: SessionId) -> Transition {
        let Some(entry) = self.sessions.get_mut(&session) else {
            return ignored(session, NoOpReason::UnknownSession);
        };
        if let Some(binding) = entry.remote.as_mut() {
            binding.provider.play();
            return Transition::Applied;
        }

        let ready = entry.is_ready();
        match entry.engine.as_mut() {
            Some(engine) if ready => {
                if std::mem::take(&mut entry.finished) {
                    engine.seek(0.0);
                    entry.observers.update(|snapshot| snapshot.progress = 0.0);
                }
                engine.play();
            }
            _ => {
                debug!(session = %session, "Play deferred until ready");
                entry.autoplay_pending = true;
            }
        }
        Transition::Applied
    }

    #[instrument(skip(self))]
    pub fn pause(&mut self, session: SessionId) -> Transition {
        let Some(entry) = self.sessions.get_mut(&session) else {
            return ignored(session, NoOpReason::UnknownSession);
        };
        if let Some(binding) = entry.remote.as_mut() {
            binding.provider.pause();
            return Transition::Applied;
        }

        entry.autoplay_pending = false;
        let ready = entry.is_ready();
        if let Some(engine) = entry.engine.as_mut().filter(|_| ready) {
            engine.pause();
        }
        Transition::Applied
    }

    pub fn toggle_play_pause(&mut self, session: SessionId) -> Transition {
        let playing = match self.sessions.get(&session) {
            Some(entry) => entry.snapshot().is_playing || entry.autoplay_pending,
            None => return ignored(session, NoOpReason::UnknownSession),
        };
        if playing {
            self.pause(session)
        } else {
            self.play(session)
        }
    }

    /// Seek to `seconds`, clamped to the known duration
    #[instrument(skip(self))]
    pub fn seek(&mut self, session: SessionId, seconds: f64) -> Transition {
        let Some(entry) = self.sessions.get_mut(&session) else {
            return ignored(session, NoOpReason::UnknownSession);
        };
        if !seconds.is_finite() {
            return ignored(session, NoOpReason::InvalidPosition);
        }

        let duration = entry.snapshot().duration;
        let target = if duration > 0.0 {
            seconds.clamp(0.0, duration)
        } else {
            seconds.max(0.0)
        };

        if let Some(binding) = entry.remote.as_mut() {
            binding.provider.seek(target);
            binding.last_position = target;
        } else {
            let ready = entry.is_ready();
            match entry.engine.as_mut() {
                Some(engine) if ready => {
                    engine.seek(target);
                    entry.finished = false;
                }
                _ => entry.pending_seek = Some(target),
            }
        }

        entry.observers.update(|snapshot| snapshot.progress = target);
        Transition::Applied
    }

    /// Seek to a fraction of the duration, as reported by a scrubber
    pub fn seek_to_fraction(&mut self, session: SessionId, fraction: f64) -> Transition {
        let duration = match self.sessions.get(&session) {
            Some(entry) => entry.snapshot().duration,
            None => return ignored(session, NoOpReason::UnknownSession),
        };
        if duration <= 0.0 {
            return ignored(session, NoOpReason::DurationUnknown);
        }
        if !fraction.is_finite() {
            return ignored(session, NoOpReason::InvalidPosition);
        }
        self.seek(session, fraction.clamp(0.0, 1.0) * duration)
    }

    pub fn skip_forward(&mut self, session: SessionId) -> Transition {
        self.skip_by(session, self.settings.seek_step_secs)
    }

    pub fn skip_backward(&mut self, session: SessionId) -> Transition {
        self.skip_by(session, -self.settings.seek_step_secs)
    }

    fn skip_by(&mut self, session: SessionId, delta: f64) -> Transition {
        let progress = match self.sessions.get(&session) {
            Some(entry) => entry.snapshot().progress,
            None => return ignored(session, NoOpReason::UnknownSession),
        };
        self.seek(session, progress + delta)
    }

    /// Cap the engine's variant bandwidth at `quality`
    #[instrument(skip(self))]
    pub fn select_quality(&mut self, session: SessionId, quality: VideoQuality) -> Transition {
        let Some(entry) = self.sessions.get_mut(&session) else {
            return ignored(session, NoOpReason::UnknownSession);
        };
        let bitrate = quality.bitrate;
        if !entry.observers.update(|snapshot| snapshot.quality = quality) {
            return Transition::Unchanged;
        }
        if let Some(engine) = entry.engine.as_mut() {
            engine.set_peak_bitrate(bitrate);
        }
        Transition::Applied
    }

    #[instrument(skip(self))]
    pub fn set_rate(&mut self, session: SessionId, rate: PlaybackRate) -> Transition {
        let Some(entry) = self.sessions.get_mut(&session) else {
            return ignored(session, NoOpReason::UnknownSession);
        };
        if !entry.observers.update(|snapshot| snapshot.rate = rate) {
            return Transition::Unchanged;
        }
        if let Some(engine) = entry.engine.as_mut() {
            engine.set_rate(rate.speed());
        }
        Transition::Applied
    }

    /// Reload a failed session at its last known position
    #[instrument(skip(self))]
    pub fn retry(&mut self, session: SessionId) -> Transition {
        let Some(entry) = self.sessions.get(&session) else {
            return ignored(session, NoOpReason::UnknownSession);
        };
        if !entry.flags.is_being_shown() {
            return ignored(session, NoOpReason::NotShown);
        }
        let snapshot = entry.snapshot();
        if !matches!(snapshot.state, PlaybackState::Error(_)) {
            return Transition::Unchanged;
        }
        let position = snapshot.progress;
        info!(session = %session, position, "Retrying playback");

        if entry.engine.is_some() {
            self.start_load(session, Some(position));
        } else {
            self.ensure_engine(session);
            if let Some(entry) = self.sessions.get_mut(&session) {
                if entry.engine.is_some() && position > 0.0 {
                    entry.pending_seek = Some(position);
                }
            }
        }
        Transition::Applied
    }

    pub(super) fn on_engine_event(&mut self, session: SessionId, generation: u64, event: EngineEvent) {
        let Some(entry) = self.sessions.get_mut(&session) else {
            debug!(session = %session, "Dropping engine event for released session");
            return;
        };
        if entry.generation != generation {
            debug!(session = %session, generation, "Dropping stale engine event");
            return;
        }
        let Some(engine) = entry.engine.as_mut() else {
            return;
        };
        let local = entry.remote.is_none();

        match event {
            EngineEvent::Ready => {
                let duration = finite_or_zero(engine.duration());
                let seek_to = entry.pending_seek.take();
                if let Some(position) = seek_to {
                    engine.seek(position);
                }
                if local && std::mem::take(&mut entry.autoplay_pending) {
                    engine.play();
                }
                entry.observers.update(|snapshot| {
                    snapshot.state = PlaybackState::Ready;
                    snapshot.error = None;
                    snapshot.duration = duration;
                    if let Some(position) = seek_to {
                        snapshot.progress = position;
                    }
                });
                entry.observers.publish(SessionEvent::Ready);
                info!(session = %session, duration, "Video ready");
            }
            EngineEvent::Playing => {
                entry.finished = false;
                if local {
                    entry.observers.update(|snapshot| snapshot.is_playing = true);
                    entry.observers.publish(SessionEvent::Play);
                }
            }
            EngineEvent::Paused => {
                if local {
                    entry.observers.update(|snapshot| snapshot.is_playing = false);
                    entry.observers.publish(SessionEvent::Pause);
                }
            }
            EngineEvent::Finished => {
                entry.finished = true;
                if local {
                    entry.observers.update(|snapshot| {
                        snapshot.is_playing = false;
                        if snapshot.duration > 0.0 {
                            snapshot.progress = snapshot.duration;
                        }
                    });
                    entry.observers.publish(SessionEvent::Finish);
                }
            }
            EngineEvent::TimeUpdate(seconds) => {
                assert!(
                    seconds.is_finite(),
                    "engine reported a non-finite position: {}",
                    seconds
                );
                if local {
                    let duration = finite_or_zero(engine.duration());
                    entry.observers.update(|snapshot| {
                        snapshot.progress = seconds;
                        if duration > 0.0 {
                            snapshot.duration = duration;
                        }
                    });
                }
            }
            EngineEvent::Error(failure) => {
                warn!(session = %session, error = %failure, "Playback failed");
                entry.autoplay_pending = false;
                entry.observers.update(|snapshot| {
                    snapshot.state = PlaybackState::Error(failure.clone());
                    snapshot.error = Some(failure.clone());
                    snapshot.is_playing = false;
                });
                entry.observers.publish(SessionEvent::Error { failure });
            }
        }
    }
}
