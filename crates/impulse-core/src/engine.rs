//! Local playback engine capability
//!
//! The native media player lives outside this crate. The coordinator drives
//! it through [`PlaybackEngine`] and hears back through an
//! [`EngineEventSink`] handed over at load time.

use crate::{
    coordinator::Inbound,
    error::{Error, PlaybackFailure},
    types::{SessionId, VideoRef},
    Result,
};
use std::time::Duration;
use tokio::sync::mpsc;

/// Events an engine reports
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The loaded item can play; duration is now known
    Ready,
    Playing,
    Paused,
    /// Reached the end of the item
    Finished,
    /// Periodic position report (seconds)
    TimeUpdate(f64),
    Error(PlaybackFailure),
}

impl EngineEvent {
    /// The engine could not ready the loaded item
    pub fn load_failed(reason: impl Into<String>) -> Self {
        EngineEvent::Error(Error::Load(reason.into()).into())
    }
}

/// Handle returned by [`PlaybackEngine::add_periodic_time_observer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeObserverToken(pub u64);

/// The native media player
pub trait PlaybackEngine: Send {
    /// Start loading `video`; report progress through `events`
    fn load(&mut self, video: &VideoRef, events: EngineEventSink);

    fn play(&mut self);

    fn pause(&mut self);

    fn seek(&mut self, seconds: f64);

    fn current_time(&self) -> f64;

    fn duration(&self) -> f64;

    fn set_rate(&mut self, _rate: f32) {}

    /// Cap the variant bandwidth; 0 removes the cap
    fn set_peak_bitrate(&mut self, _bits_per_second: f64) {}

    /// Emit [`EngineEvent::TimeUpdate`] every `interval` until removed
    fn add_periodic_time_observer(&mut self, interval: Duration) -> TimeObserverToken;

    fn remove_time_observer(&mut self, token: TimeObserverToken);

    /// Release decoder resources; the engine is dropped right after
    fn stop(&mut self);
}

/// Builds engines for sessions that need one
pub trait EngineFactory: Send {
    fn create(&mut self, video: &VideoRef) -> Result<Box<dyn PlaybackEngine>>;
}

impl<F> EngineFactory for F
where
    F: FnMut(&VideoRef) -> Result<Box<dyn PlaybackEngine>> + Send,
{
    fn create(&mut self, video: &VideoRef) -> Result<Box<dyn PlaybackEngine>> {
        self(video)
    }
}

/// Where an engine sends its events.
///
/// Each sink is bound to one load of one session; events from a superseded
/// load are discarded by the coordinator.
#[derive(Debug, Clone)]
pub struct EngineEventSink {
    session: SessionId,
    generation: u64,
    tx: mpsc::UnboundedSender<Inbound>,
}

impl EngineEventSink {
    pub(crate) fn new(session: SessionId, generation: u64, tx: mpsc::UnboundedSender<Inbound>) -> Self {
        Self {
            session,
            generation,
            tx,
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Queue `event` for the coordinator. Safe from any thread.
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(Inbound::Engine {
            session: self.session,
            generation: self.generation,
            event,
        });
    }
}
