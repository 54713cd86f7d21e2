//! The presentation layer as seen by the coordinator
//!
//! Layout, view hierarchy and widgets are the host's business. The
//! coordinator only tells the renderer where a session should appear and
//! receives the user's intents back as [`UserIntent`] values.

use crate::{
    manifest::VideoQuality,
    types::{HostId, PlaybackRate, RemoteDevice, SessionId, SurfaceTarget},
};
use serde::{Deserialize, Serialize};

/// Which full-screen layer a request refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FullScreenLayer {
    /// Grown out of an inline embedding
    Presented,
    /// Standalone modal presentation
    Linked,
}

pub trait Renderer: Send {
    fn attach_surface(&mut self, session: SessionId, target: SurfaceTarget);

    /// Undo everything `attach_surface` did for `target`
    fn detach_surface(&mut self, session: SessionId, target: SurfaceTarget);

    fn enter_full_screen(&mut self, session: SessionId, host: HostId, layer: FullScreenLayer);

    fn exit_full_screen(&mut self, session: SessionId, layer: FullScreenLayer);

    fn show_pip_placeholder(&mut self, session: SessionId, visible: bool);

    fn start_picture_in_picture(&mut self, session: SessionId);

    fn stop_picture_in_picture(&mut self, session: SessionId);
}

/// User intents reported by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UserIntent {
    PlayPausePressed,
    /// Scrubber released at a fraction of the duration
    SeekRequested(f64),
    SkipForward,
    SkipBackward,
    QualitySelected(VideoQuality),
    RateSelected(PlaybackRate),
    /// `None` is "this device"
    RemoteDeviceSelected(Option<RemoteDevice>),
    FullScreenToggled,
    PictureInPictureToggled,
    DismissPressed,
    RetryPressed,
}
