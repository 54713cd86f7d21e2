//! Impulse Core - playback session coordination for Impulse Player
//!
//! This crate decides where and how each video session is rendered:
//! - Session registry with Picture-in-Picture recovery
//! - Surface flags driving engine creation and teardown
//! - Inline, full screen and Picture-in-Picture transitions
//! - Hand-off to and from remote (cast) devices
//! - HLS master playlist quality extraction
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Impulse Core                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │   Renderer   │  │   Engine     │  │   Remote     │           │
//! │  │  (host UI)   │  │  (native)    │  │  Provider    │           │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘           │
//! │         │                 │   inbound queue │                   │
//! │         └─────────────────┼─────────────────┘                   │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │  Playback   │──── PiP slot                 │
//! │                    │ Coordinator │                              │
//! │                    └──────┬──────┘                              │
//! │                           │                                     │
//! │  ┌──────────────┐  ┌──────┴──────┐                              │
//! │  │   Manifest   │  │  Session    │                              │
//! │  │   Qualities  │  │ Observers   │                              │
//! │  └──────────────┘  └─────────────┘                              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod manifest;
pub mod observable;
pub mod pip;
pub mod remote;
pub mod renderer;
pub mod shared;
pub mod surface;
pub mod types;

pub use config::PlayerSettings;
pub use coordinator::{CoordinatorBuilder, NoOpReason, PlaybackCoordinator, Transition};
pub use engine::{EngineEvent, EngineEventSink, EngineFactory, PlaybackEngine, TimeObserverToken};
pub use error::{Error, PlaybackFailure, Result};
pub use manifest::{parse_qualities, HttpFetch, QualityDefinition, ReqwestFetcher, VideoQuality};
pub use observable::{SessionEvent, SessionSnapshot, Subscription};
pub use pip::PipSlot;
pub use remote::{
    RemoteEvent, RemoteEventSink, RemotePlayerState, RemoteProviderFactory, RemoteSessionProvider,
};
pub use renderer::{FullScreenLayer, Renderer, UserIntent};
pub use shared::SharedCoordinator;
pub use surface::{SurfaceFlag, SurfaceFlags};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the player library with default configuration
pub fn init() {
    tracing::info!(version = VERSION, "Impulse Core initialized");
}
