//! Surface transitions: inline, full screen and Picture-in-Picture

use super::{ignored, NoOpReason, PlaybackCoordinator, Transition};
use crate::{
    observable::SessionEvent,
    renderer::FullScreenLayer,
    surface::SurfaceFlag,
    types::{HostId, SessionId, SurfaceTarget},
};
use tracing::{info, instrument, warn};

impl PlaybackCoordinator {
    /// Render `session` inline in `target`.
    ///
    /// Moving between surfaces never tears the engine down; a different
    /// session occupying `target` is evicted first.
    #[instrument(skip(self))]
    pub fn embed_inline(&mut self, session: SessionId, target: SurfaceTarget) -> Transition {
        let Some(entry) = self.sessions.get(&session) else {
            return ignored(session, NoOpReason::UnknownSession);
        };
        if entry.embedded_in == Some(target) && entry.flags.contains(SurfaceFlag::EmbeddedInline) {
            return Transition::Unchanged;
        }

        self.ensure_engine(session);
        self.attach_inline(session, target);
        self.apply_flags(session, |flags| {
            flags.insert(SurfaceFlag::EmbeddedInline);
        });
        info!(session = %session, target = %target, "Embedded inline");
        Transition::Applied
    }

    /// Present `session` full screen on top of `host`, outside any embedding.
    /// Playback starts once the presentation is confirmed.
    #[instrument(skip(self))]
    pub fn present_full_screen(&mut self, session: SessionId, host: HostId) -> Transition {
        let Some(entry) = self.sessions.get_mut(&session) else {
            return ignored(session, NoOpReason::UnknownSession);
        };
        if entry.flags.contains(SurfaceFlag::LinkedFullScreenPresented) {
            return Transition::Unchanged;
        }
        entry.presenting_host = Some(host);

        self.detach_inline(session);
        self.ensure_engine(session);
        if let Some(entry) = self.sessions.get_mut(&session) {
            entry.autoplay_on_present = true;
        }
        self.renderer
            .enter_full_screen(session, host, FullScreenLayer::Linked);
        self.apply_flags(session, |flags| {
            flags.remove(SurfaceFlag::EmbeddedInline);
            flags.insert(SurfaceFlag::LinkedFullScreenPresented);
        });
        info!(session = %session, host = host.0, "Presented full screen");
        Transition::Applied
    }

    /// The renderer finished presenting full screen
    pub fn notify_full_screen_presented(&mut self, session: SessionId) -> Transition {
        let Some(entry) = self.sessions.get_mut(&session) else {
            return ignored(session, NoOpReason::UnknownSession);
        };
        if !std::mem::take(&mut entry.autoplay_on_present) {
            return Transition::Unchanged;
        }
        self.play(session)
    }

    /// Close a standalone full-screen presentation
    #[instrument(skip(self))]
    pub fn dismiss_full_screen(&mut self, session: SessionId) -> Transition {
        let Some(entry) = self.sessions.get_mut(&session) else {
            return ignored(session, NoOpReason::UnknownSession);
        };
        if !entry.flags.contains(SurfaceFlag::LinkedFullScreenPresented) {
            return Transition::Unchanged;
        }
        entry.autoplay_on_present = false;

        self.renderer
            .exit_full_screen(session, FullScreenLayer::Linked);
        self.apply_flags(session, |flags| {
            flags.remove(SurfaceFlag::LinkedFullScreenPresented);
        });
        info!(session = %session, "Dismissed full screen");
        Transition::Applied
    }

    /// Grow an inline session to full screen
    #[instrument(skip(self))]
    pub fn enter_full_screen(&mut self, session: SessionId) -> Transition {
        let Some(entry) = self.sessions.get(&session) else {
            return ignored(session, NoOpReason::UnknownSession);
        };
        if entry.flags.contains(SurfaceFlag::FullScreenPresented) {
            return Transition::Unchanged;
        }
        let Some(target) = entry.embedded_in else {
            return ignored(session, NoOpReason::NotEmbedded);
        };

        self.detach_inline(session);
        self.renderer
            .enter_full_screen(session, target.host, FullScreenLayer::Presented);
        self.apply_flags(session, |flags| {
            flags.remove(SurfaceFlag::EmbeddedInline);
            flags.insert(SurfaceFlag::FullScreenPresented);
        });
        info!(session = %session, "Entered full screen");
        Transition::Applied
    }

    /// Return from full screen to the last inline surface
    #[instrument(skip(self))]
    pub fn exit_full_screen(&mut self, session: SessionId) -> Transition {
        let Some(entry) = self.sessions.get(&session) else {
            return ignored(session, NoOpReason::UnknownSession);
        };
        if !entry.flags.contains(SurfaceFlag::FullScreenPresented) {
            return ignored(session, NoOpReason::NotInFullScreen);
        }
        let Some(target) = entry.last_embed else {
            return ignored(session, NoOpReason::NoKnownHost);
        };

        self.renderer
            .exit_full_screen(session, FullScreenLayer::Presented);
        self.attach_inline(session, target);
        self.apply_flags(session, |flags| {
            flags.insert(SurfaceFlag::EmbeddedInline);
            flags.remove(SurfaceFlag::FullScreenPresented);
        });
        info!(session = %session, target = %target, "Exited full screen");
        Transition::Applied
    }

    pub fn toggle_full_screen(&mut self, session: SessionId) -> Transition {
        let in_full_screen = match self.sessions.get(&session) {
            Some(entry) => entry.flags.contains(SurfaceFlag::FullScreenPresented),
            None => return ignored(session, NoOpReason::UnknownSession),
        };
        if in_full_screen {
            self.exit_full_screen(session)
        } else {
            self.enter_full_screen(session)
        }
    }

    /// Bring a PiP session back to full screen on `host`.
    ///
    /// Sessions that were ever embedded grow back through the inline layer,
    /// the rest through a standalone presentation.
    #[instrument(skip(self))]
    pub fn restore_full_screen(&mut self, session: SessionId, host: HostId) -> Transition {
        let Some(entry) = self.sessions.get_mut(&session) else {
            return ignored(session, NoOpReason::UnknownSession);
        };
        if !entry.flags.contains(SurfaceFlag::PictureInPictureActive) {
            return Transition::Unchanged;
        }

        let (flag, layer) = if entry.last_embed.is_some() {
            (SurfaceFlag::FullScreenPresented, FullScreenLayer::Presented)
        } else {
            (SurfaceFlag::LinkedFullScreenPresented, FullScreenLayer::Linked)
        };
        if entry.flags.contains(flag) {
            return Transition::Unchanged;
        }
        entry.presenting_host = Some(host);

        if layer == FullScreenLayer::Presented {
            self.detach_inline(session);
        }
        self.renderer.enter_full_screen(session, host, layer);
        self.apply_flags(session, |flags| {
            if layer == FullScreenLayer::Presented {
                flags.remove(SurfaceFlag::EmbeddedInline);
            }
            flags.insert(flag);
        });
        info!(session = %session, host = host.0, "Restored full screen");
        Transition::Applied
    }

    /// True if the session still has a surface the PiP window can return to
    pub fn can_restore_user_interface(&self, session: SessionId) -> bool {
        self.sessions
            .get(&session)
            .map(|entry| entry.embedded_in.is_some() || entry.flags.is_full_screen())
            .unwrap_or(false)
    }

    /// Ask the renderer to start or stop Picture-in-Picture
    #[instrument(skip(self))]
    pub fn toggle_picture_in_picture(&mut self, session: SessionId) -> Transition {
        if !self.settings.picture_in_picture_enabled {
            return ignored(session, NoOpReason::PictureInPictureDisabled);
        }
        let active = match self.sessions.get(&session) {
            Some(entry) => entry.flags.contains(SurfaceFlag::PictureInPictureActive),
            None => return ignored(session, NoOpReason::UnknownSession),
        };
        if active {
            self.renderer.stop_picture_in_picture(session);
        } else {
            self.renderer.start_picture_in_picture(session);
        }
        Transition::Applied
    }

    pub fn is_picture_in_picture_pending(&self, session: SessionId) -> bool {
        self.sessions
            .get(&session)
            .map(|entry| entry.pip_pending)
            .unwrap_or(false)
    }

    pub fn picture_in_picture_will_start(&mut self, session: SessionId) -> Transition {
        let Some(entry) = self.sessions.get_mut(&session) else {
            return ignored(session, NoOpReason::UnknownSession);
        };
        entry.pip_pending = true;
        Transition::Applied
    }

    /// PiP is showing `session`; it takes the pin from any previous holder
    #[instrument(skip(self))]
    pub fn picture_in_picture_did_start(&mut self, session: SessionId) -> Transition {
        let Some(entry) = self.sessions.get_mut(&session) else {
            return ignored(session, NoOpReason::UnknownSession);
        };
        entry.pip_pending = false;
        if entry.flags.contains(SurfaceFlag::PictureInPictureActive) {
            return Transition::Unchanged;
        }
        let video = entry.video.clone();

        if let Some(previous) = self.pip.pinned().filter(|previous| *previous != session) {
            info!(previous = %previous, "Replacing picture in picture session");
            self.renderer.stop_picture_in_picture(previous);
            self.apply_flags(previous, |flags| {
                flags.remove(SurfaceFlag::PictureInPictureActive);
            });
        }

        self.pip.pin(session, video);
        self.renderer.show_pip_placeholder(session, true);
        self.apply_flags(session, |flags| {
            flags.insert(SurfaceFlag::PictureInPictureActive);
        });
        if let Some(entry) = self.sessions.get(&session) {
            entry.observers.publish(SessionEvent::PictureInPictureStarted);
        }
        info!(session = %session, "Picture in picture started");
        Transition::Applied
    }

    /// PiP closed; a session shown nowhere else loses its engine
    #[instrument(skip(self))]
    pub fn picture_in_picture_did_stop(&mut self, session: SessionId) -> Transition {
        let Some(entry) = self.sessions.get_mut(&session) else {
            return ignored(session, NoOpReason::UnknownSession);
        };
        entry.pip_pending = false;
        if !entry.flags.contains(SurfaceFlag::PictureInPictureActive) {
            return Transition::Unchanged;
        }

        self.apply_flags(session, |flags| {
            flags.remove(SurfaceFlag::PictureInPictureActive);
        });
        info!(session = %session, "Picture in picture stopped");
        Transition::Applied
    }

    pub fn picture_in_picture_failed(&mut self, session: SessionId, message: &str) -> Transition {
        let Some(entry) = self.sessions.get_mut(&session) else {
            return ignored(session, NoOpReason::UnknownSession);
        };
        entry.pip_pending = false;
        warn!(session = %session, reason = message, "Picture in picture failed to start");
        entry.observers.publish(SessionEvent::PictureInPictureFailed {
            message: message.to_string(),
        });
        Transition::Applied
    }

    /// Bookkeeping for rendering `session` in `target`, without flags
    pub(crate) fn attach_inline(&mut self, session: SessionId, target: SurfaceTarget) {
        if let Some(occupant) = self.occupants.get(&target).copied() {
            if occupant != session {
                info!(evicted = %occupant, target = %target, "Surface taken over by another session");
                self.detach_inline(occupant);
                self.apply_flags(occupant, |flags| {
                    flags.remove(SurfaceFlag::EmbeddedInline);
                });
            }
        }

        let previous = match self.sessions.get(&session) {
            Some(entry) => entry.embedded_in,
            None => return,
        };
        if let Some(previous) = previous.filter(|previous| *previous != target) {
            self.renderer.detach_surface(session, previous);
            self.occupants.remove(&previous);
        }

        if let Some(entry) = self.sessions.get_mut(&session) {
            entry.embedded_in = Some(target);
            entry.last_embed = Some(target);
        }
        self.occupants.insert(target, session);
        self.renderer.attach_surface(session, target);
    }

    /// Close every full-screen layer the renderer shows for `session`, without flags
    pub(crate) fn exit_full_screen_layers(&mut self, session: SessionId) {
        let Some(entry) = self.sessions.get(&session) else {
            return;
        };
        for (flag, layer) in [
            (SurfaceFlag::FullScreenPresented, FullScreenLayer::Presented),
            (SurfaceFlag::LinkedFullScreenPresented, FullScreenLayer::Linked),
        ] {
            if entry.flags.contains(flag) {
                self.renderer.exit_full_screen(session, layer);
            }
        }
    }

    /// Undo `attach_inline`, without flags
    pub(crate) fn detach_inline(&mut self, session: SessionId) {
        let Some(entry) = self.sessions.get_mut(&session) else {
            return;
        };
        let Some(target) = entry.embedded_in.take() else {
            return;
        };
        if self.occupants.get(&target) == Some(&session) {
            self.occupants.remove(&target);
        }
        self.renderer.detach_surface(session, target);
    }
}
