//! Playback lifecycle module for TuneFlow
//!
//! This module owns the relationship between the embedded player, the system
//! media surface, the background keep-alive and the ad heuristic. Everything
//! reaches the [`PlaybackSession`] as a [`SessionEvent`] on a single queue and
//! leaves it as a [`PlayerEvent`] for whatever UI is attached.

mod ad_detector;
mod controller;
mod progress;
mod simulated;
mod state;
mod visibility;

pub use ad_detector::{AdDetector, AdVerdict};
pub use controller::{PlaybackSession, PlaybackSessionBuilder};
pub use progress::{ProgressSnapshot, ProgressTicker};
pub use simulated::SimulatedPlayer;
pub use state::{Queue, Track};
pub use visibility::{Visibility, VisibilityHandler};

use crate::media_session::RemoteCommand;
use crate::utils::error::Result;
use crate::utils::timer::TimerKind;
use tokio::sync::mpsc::UnboundedSender;

/// Embedded player contract.
///
/// The widget loads asynchronously and reports readiness and state changes
/// by posting [`SessionEvent::AdapterReady`] and
/// [`SessionEvent::AdapterStateChanged`] into the session queue. Readiness is
/// signalled exactly once per session.
pub trait PlayerAdapter {
    /// Load and start the item with this content identifier
    fn load_by_id(&mut self, id: &str) -> Result<()>;

    /// Start or resume playback
    fn play(&mut self) -> Result<()>;

    /// Pause playback
    fn pause(&mut self) -> Result<()>;

    /// Seek to a position
    ///
    /// # Arguments
    ///
    /// * `seconds` - Target position
    /// * `allow_seek_ahead` - Allow the player to fetch unbuffered data
    fn seek_to(&mut self, seconds: f64, allow_seek_ahead: bool) -> Result<()>;

    /// Current position in seconds
    fn current_time(&self) -> f64;

    /// Duration in seconds, 0 while unknown
    fn duration(&self) -> f64;

    /// Momentary player state
    fn state(&self) -> AdapterState;
}

/// State reported by the embedded player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    /// Item cued but not started; handled like `Unstarted`
    Cued,
}

impl AdapterState {
    /// Decode the numeric state codes used by the YouTube iframe API
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::Unstarted),
            0 => Some(Self::Ended),
            1 => Some(Self::Playing),
            2 => Some(Self::Paused),
            3 => Some(Self::Buffering),
            5 => Some(Self::Cued),
            _ => None,
        }
    }
}

/// Session-level playback phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    /// Nothing loaded yet
    Idle,

    /// Load issued, waiting for the player to start
    Loading,

    /// Currently playing
    Playing,

    /// Playback paused
    Paused,

    /// Player is rebuffering
    Buffering,
}

/// User-initiated commands
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Play the item at `index`, optionally replacing the queue first
    PlayAt { index: usize, queue: Option<Vec<Track>> },
    TogglePlayPause,
    Next,
    Previous,
    /// Seek to an absolute position in seconds
    SeekTo(f64),
    /// Seek to a fraction (0.0 - 1.0) of the duration
    SeekFraction(f64),
    /// The favorites store changed; re-read the heart state of the current track
    RefreshFavorite,
}

/// Every input the session reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The embedded player finished loading
    AdapterReady,

    /// The embedded player changed state
    AdapterStateChanged(AdapterState),

    /// The host page/app was hidden or shown
    VisibilityChanged { hidden: bool },

    /// Command from the UI
    Command(Command),

    /// Command from the system media surface
    Remote(RemoteCommand),

    /// A session timer fired
    Timer { kind: TimerKind, generation: u64 },

    /// Stop the event loop
    Shutdown,
}

/// Cloneable sender into the session queue
#[derive(Debug, Clone)]
pub struct SessionHandle {
    events: UnboundedSender<SessionEvent>,
}

impl SessionHandle {
    pub fn new(events: UnboundedSender<SessionEvent>) -> Self {
        Self { events }
    }

    /// Post an event; returns `false` once the session has shut down
    pub fn send(&self, event: SessionEvent) -> bool {
        self.events.send(event).is_ok()
    }

    pub fn command(&self, command: Command) -> bool {
        self.send(SessionEvent::Command(command))
    }

    pub fn remote(&self, command: RemoteCommand) -> bool {
        self.send(SessionEvent::Remote(command))
    }

    pub fn sender(&self) -> UnboundedSender<SessionEvent> {
        self.events.clone()
    }
}

/// Outbound UI projection
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// A new track became current
    TrackChanged { index: usize, track: Track, is_favorite: bool },

    /// The play/pause indicator changed
    PlayingChanged { playing: bool },

    /// The lifecycle phase changed
    PhaseChanged { phase: PlaybackPhase },

    /// Progress bar update
    Progress(ProgressSnapshot),

    /// Heart indicator of the current track changed
    FavoriteChanged { id: String, is_favorite: bool },

    /// An ad was skipped by seeking to its end
    AdSkipped { id: String, attempt: u32 },

    /// The track was abandoned after too many ad skips
    TrackAbandoned { id: String },
}

/// Player event handler trait
pub trait PlayerEventHandler {
    /// Handle player event
    ///
    /// # Arguments
    ///
    /// * `event` - Player event
    fn handle_event(&mut self, event: PlayerEvent);
}
