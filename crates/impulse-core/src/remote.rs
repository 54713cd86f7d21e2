//! Remote (cast) playback capability

use crate::{
    coordinator::Inbound,
    types::{RemoteDevice, SessionId, VideoRef},
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use url::Url;

/// Player state reported by the remote receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemotePlayerState {
    Idle,
    Buffering,
    Playing,
    Paused,
}

/// Events a remote provider reports
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    SessionStarted,
    SessionStartFailed(String),
    StateChanged(RemotePlayerState),
    PositionUpdate { position: f64, duration: f64 },
    DeviceListChanged(Vec<RemoteDevice>),
    /// The receiver session ended; `content_url` is what it was playing
    SessionEnded { content_url: Option<Url> },
}

/// Cast-like remote session
pub trait RemoteSessionProvider: Send {
    /// Called once when the provider is bound to a session
    fn attach(&mut self, events: RemoteEventSink);

    fn is_connected(&self) -> bool;

    fn start_session(&mut self, target: &RemoteDevice);

    fn end_session(&mut self);

    fn load_media(&mut self, video: &VideoRef, start_offset: f64, autoplay: bool);

    fn play(&mut self);

    fn pause(&mut self);

    fn seek(&mut self, seconds: f64);

    /// URL of the media the receiver is playing
    fn content_url(&self) -> Option<Url>;
}

/// Builds a provider when a host picks a remote device
pub trait RemoteProviderFactory: Send {
    fn create(&mut self) -> Box<dyn RemoteSessionProvider>;
}

impl<F> RemoteProviderFactory for F
where
    F: FnMut() -> Box<dyn RemoteSessionProvider> + Send,
{
    fn create(&mut self) -> Box<dyn RemoteSessionProvider> {
        self()
    }
}

/// Where a provider sends its events
#[derive(Debug, Clone)]
pub struct RemoteEventSink {
    session: SessionId,
    epoch: u64,
    tx: mpsc::UnboundedSender<Inbound>,
}

impl RemoteEventSink {
    pub(crate) fn new(session: SessionId, epoch: u64, tx: mpsc::UnboundedSender<Inbound>) -> Self {
        Self { session, epoch, tx }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn emit(&self, event: RemoteEvent) {
        let _ = self.tx.send(Inbound::Remote {
            session: self.session,
            epoch: self.epoch,
            event,
        });
    }
}
