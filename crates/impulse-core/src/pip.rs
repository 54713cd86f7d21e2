//! Picture-in-Picture pin slot
//!
//! The OS shows at most one PiP window, so at most one session is pinned for
//! recovery. The slot is handed to the coordinator at construction.

use crate::types::{SessionId, VideoRef};

#[derive(Debug, Clone)]
struct Pin {
    session: SessionId,
    video: VideoRef,
}

/// Single reservation of a session for PiP recovery
#[derive(Debug, Default)]
pub struct PipSlot {
    pin: Option<Pin>,
}

impl PipSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pinned(&self) -> Option<SessionId> {
        self.pin.as_ref().map(|pin| pin.session)
    }

    pub fn pinned_video(&self) -> Option<&VideoRef> {
        self.pin.as_ref().map(|pin| &pin.video)
    }

    pub fn is_pinned(&self, session: SessionId) -> bool {
        self.pinned() == Some(session)
    }

    /// Pin `session`, returning the previously pinned session if it differs
    pub(crate) fn pin(&mut self, session: SessionId, video: VideoRef) -> Option<SessionId> {
        let previous = self.pinned().filter(|previous| *previous != session);
        self.pin = Some(Pin { session, video });
        previous
    }

    /// Clear the pin if `session` holds it
    pub(crate) fn unpin(&mut self, session: SessionId) -> bool {
        if self.is_pinned(session) {
            self.pin = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn video(path: &str) -> VideoRef {
        VideoRef::new(Url::parse(&format!("https://cdn.example.com/{}", path)).unwrap())
    }

    #[test]
    fn test_pin_replaces_previous() {
        let mut slot = PipSlot::new();
        let a = SessionId::new();
        let b = SessionId::new();

        assert_eq!(slot.pin(a, video("a.m3u8")), None);
        assert_eq!(slot.pin(a, video("a.m3u8")), None);
        assert_eq!(slot.pin(b, video("b.m3u8")), Some(a));
        assert!(slot.is_pinned(b));
        assert_eq!(slot.pinned_video(), Some(&video("b.m3u8")));
    }

    #[test]
    fn test_unpin_only_owner() {
        let mut slot = PipSlot::new();
        let a = SessionId::new();
        let b = SessionId::new();
        slot.pin(a, video("a.m3u8"));

        assert!(!slot.unpin(b));
        assert!(slot.is_pinned(a));
        assert!(slot.unpin(a));
        assert_eq!(slot.pinned(), None);
    }
}
