//! System media control surface for TuneFlow
//!
//! The lock screen / notification controls are a platform surface that we
//! both feed (now-playing metadata, position) and listen to (play, pause,
//! next, previous, seek). [`MediaSessionSync`] keeps the two directions apart
//! because they are timed differently: handlers are registered once at player
//! readiness, metadata and position follow playback.

mod sync;

pub use sync::{position_state, MediaSessionSync};

use crate::utils::error::Result;

/// Actions the platform surface can dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaAction {
    Play,
    Pause,
    NextTrack,
    PreviousTrack,
    SeekTo,
}

/// Details passed to an action handler
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActionDetails {
    /// Target position for `SeekTo`
    pub seek_time: Option<f64>,
}

/// Callback invoked by the platform when an action fires
pub type ActionHandler = Box<dyn Fn(ActionDetails)>;

/// Commands forwarded from the surface into the session
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RemoteCommand {
    Play,
    Pause,
    NextTrack,
    PreviousTrack,
    SeekTo(f64),
}

/// Artwork entry of the now-playing metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Artwork {
    pub src: String,
    pub sizes: String,
    pub mime_type: String,
}

/// Now-playing metadata
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlayingMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Never empty; an empty list hides the surface on some platforms
    pub artwork: Vec<Artwork>,
}

/// Position state; `position <= duration` always holds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionState {
    pub duration: f64,
    pub position: f64,
    pub playback_rate: f64,
}

/// Platform media control surface
pub trait MediaSurface {
    /// Install the callback for an action.
    ///
    /// Returns `PlatformUnsupported` when the platform does not know the action.
    fn set_action_handler(&mut self, action: MediaAction, handler: ActionHandler) -> Result<()>;

    /// Replace the now-playing metadata
    fn set_metadata(&mut self, metadata: &NowPlayingMetadata) -> Result<()>;

    /// Publish the position state
    fn set_position_state(&mut self, state: &PositionState) -> Result<()>;
}
