//! Observable session properties and discrete session events
//!
//! Each session owns one `watch` channel carrying a [`SessionSnapshot`] and
//! one `broadcast` bus for [`SessionEvent`]s. Observers hold a
//! [`Subscription`]; dropping it unsubscribes. Releasing a session drops the
//! senders, which closes every outstanding subscription at once.

use crate::{
    error::PlaybackFailure,
    manifest::VideoQuality,
    surface::SurfaceFlags,
    types::{PlaybackRate, PlaybackState, RemoteDevice, VideoState},
};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};

/// Observable fields of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub is_playing: bool,
    pub state: PlaybackState,
    pub progress: f64,
    pub duration: f64,
    pub error: Option<PlaybackFailure>,
    pub qualities: Vec<VideoQuality>,
    pub quality: VideoQuality,
    pub rate: PlaybackRate,
    pub flags: SurfaceFlags,
    pub remote_active: bool,
}

impl SessionSnapshot {
    pub fn video_state(&self) -> VideoState {
        self.state.video_state()
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            is_playing: false,
            state: PlaybackState::Unknown,
            progress: 0.0,
            duration: 0.0,
            error: None,
            qualities: vec![VideoQuality::automatic()],
            quality: VideoQuality::automatic(),
            rate: PlaybackRate::Normal,
            flags: SurfaceFlags::new(),
            remote_active: false,
        }
    }
}

/// Discrete notifications for hosts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Ready,
    Play,
    Pause,
    Finish,
    Error { failure: PlaybackFailure },
    PictureInPictureStarted,
    PictureInPictureStopped,
    PictureInPictureFailed { message: String },
    RemoteConnected { device: RemoteDevice },
    RemoteDisconnected { resumed_locally: bool },
    RemoteError { failure: PlaybackFailure },
    RemoteDevicesChanged { devices: Vec<RemoteDevice> },
    QualitiesUpdated { count: usize },
    Released,
}

/// Sending half owned by the session
#[derive(Debug)]
pub(crate) struct SessionObservers {
    state: watch::Sender<SessionSnapshot>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionObservers {
    pub(crate) fn new(event_capacity: usize) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::default());
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self { state, events }
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Apply `update` and notify only if something changed
    pub(crate) fn update<F>(&self, update: F) -> bool
    where
        F: FnOnce(&mut SessionSnapshot),
    {
        self.state.send_if_modified(|snapshot| {
            let before = snapshot.clone();
            update(snapshot);
            *snapshot != before
        })
    }

    /// Publish an event; dropped silently when nobody listens
    pub(crate) fn publish(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    pub(crate) fn subscribe(&self) -> Subscription {
        Subscription {
            state: self.state.subscribe(),
            events: self.events.subscribe(),
        }
    }

    pub(crate) fn observer_count(&self) -> usize {
        self.state.receiver_count()
    }
}

/// Scoped observer handle. Dropping it detaches the observer.
#[derive(Debug)]
pub struct Subscription {
    state: watch::Receiver<SessionSnapshot>,
    events: broadcast::Receiver<SessionEvent>,
}

impl Subscription {
    /// Latest snapshot
    pub fn current(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Wait for the next snapshot change.
    ///
    /// Returns `None` once the session has been released.
    pub async fn changed(&mut self) -> Option<SessionSnapshot> {
        self.state.changed().await.ok()?;
        Some(self.state.borrow_and_update().clone())
    }

    /// Wait for the next event, skipping over any lag.
    ///
    /// Returns `None` once the session has been released.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        loop {
            match self.events.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Drain events already delivered without waiting
    pub fn pending_events(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(event) => events.push(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return events,
            }
        }
    }

    /// True once the session dropped its senders
    pub fn is_closed(&self) -> bool {
        self.state.has_changed().is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_reports_changes_only() {
        let observers = SessionObservers::new(8);
        assert!(observers.update(|s| s.progress = 4.0));
        assert!(!observers.update(|s| s.progress = 4.0));
        assert_eq!(observers.snapshot().progress, 4.0);
    }

    #[test]
    fn test_subscription_counts_and_drop() {
        let observers = SessionObservers::new(8);
        let first = observers.subscribe();
        let second = observers.subscribe();
        assert_eq!(observers.observer_count(), 2);
        drop(first);
        assert_eq!(observers.observer_count(), 1);
        drop(second);
        assert_eq!(observers.observer_count(), 0);
    }

    #[test]
    fn test_pending_events_drains() {
        let observers = SessionObservers::new(8);
        let mut sub = observers.subscribe();
        observers.publish(SessionEvent::Play);
        observers.publish(SessionEvent::Pause);
        assert_eq!(sub.pending_events(), vec![SessionEvent::Play, SessionEvent::Pause]);
        assert!(sub.pending_events().is_empty());
    }

    #[tokio::test]
    async fn test_closed_after_senders_drop() {
        let observers = SessionObservers::new(8);
        let mut sub = observers.subscribe();
        observers.update(|s| s.is_playing = true);
        assert!(sub.changed().await.unwrap().is_playing);
        drop(observers);
        assert!(sub.is_closed());
        assert!(sub.changed().await.is_none());
        assert!(sub.next_event().await.is_none());
    }

    #[test]
    fn test_default_snapshot_offers_automatic() {
        let snapshot = SessionSnapshot::default();
        assert_eq!(snapshot.qualities, vec![VideoQuality::automatic()]);
        assert_eq!(snapshot.video_state(), VideoState::Loading);
    }
}
