//! Surface occupancy flags
//!
//! A session can be visible on several layers at once (an inline embedding
//! that grew into a linked full screen, a PiP window restored into a modal).
//! The flags are a set of enum variants rather than raw bits so every
//! transition names what it touches.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One surface a session can occupy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SurfaceFlag {
    /// Hosted inside a container of the surrounding UI
    EmbeddedInline,
    /// Full screen entered from an embedding (rotation or button)
    FullScreenPresented,
    /// Separate modal presentation when not embedded
    LinkedFullScreenPresented,
    /// Rendered in the system Picture-in-Picture window
    PictureInPictureActive,
}

impl SurfaceFlag {
    /// Whether occupying this surface keeps the session on screen
    fn keeps_visible(self) -> bool {
        match self {
            SurfaceFlag::EmbeddedInline
            | SurfaceFlag::FullScreenPresented
            | SurfaceFlag::LinkedFullScreenPresented
            | SurfaceFlag::PictureInPictureActive => true,
        }
    }
}

impl std::fmt::Display for SurfaceFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceFlag::EmbeddedInline => write!(f, "Embedded Inline"),
            SurfaceFlag::FullScreenPresented => write!(f, "Full Screen Presented"),
            SurfaceFlag::LinkedFullScreenPresented => write!(f, "Linked Full Screen Presented"),
            SurfaceFlag::PictureInPictureActive => write!(f, "Picture In Picture Active"),
        }
    }
}

/// Set of occupied surfaces
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceFlags(BTreeSet<SurfaceFlag>);

impl SurfaceFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, flag: SurfaceFlag) -> bool {
        self.0.contains(&flag)
    }

    /// Returns true if the flag was not already set
    pub fn insert(&mut self, flag: SurfaceFlag) -> bool {
        self.0.insert(flag)
    }

    /// Returns true if the flag was set
    pub fn remove(&mut self, flag: SurfaceFlag) -> bool {
        self.0.remove(&flag)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = SurfaceFlag> + '_ {
        self.0.iter().copied()
    }

    /// True while any surface shows the session
    pub fn is_being_shown(&self) -> bool {
        self.0.iter().any(|flag| flag.keeps_visible())
    }

    pub fn is_full_screen(&self) -> bool {
        self.contains(SurfaceFlag::FullScreenPresented)
            || self.contains(SurfaceFlag::LinkedFullScreenPresented)
    }
}

impl FromIterator<SurfaceFlag> for SurfaceFlags {
    fn from_iter<I: IntoIterator<Item = SurfaceFlag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl std::fmt::Display for SurfaceFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return write!(f, "[]");
        }
        let names: Vec<String> = self.0.iter().map(|flag| flag.to_string()).collect();
        write!(f, "[{}]", names.join(", "))
    }
}
