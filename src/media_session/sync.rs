//! Media control surface synchronization

use crate::media_session::{
    ActionDetails, ActionHandler, Artwork, MediaAction, MediaSurface, NowPlayingMetadata,
    PositionState, RemoteCommand,
};
use crate::player::{SessionHandle, Track};
use crate::utils::config::PlaybackConfig;
use log::{debug, info, warn};

/// Thumbnail size reported for catalog artwork
const ARTWORK_SIZES: &str = "320x180";
const ARTWORK_TYPE: &str = "image/jpeg";

/// Keeps the platform media surface in step with the session
pub struct MediaSessionSync {
    /// `None` when the platform has no media surface
    surface: Option<Box<dyn MediaSurface>>,

    album_label: String,
    fallback_artwork_url: String,

    /// Set once handlers are installed; never cleared within a session
    handlers_registered: bool,

    /// Identity of the track whose metadata is on the surface
    published_id: Option<String>,
}

impl MediaSessionSync {
    pub fn new(surface: Option<Box<dyn MediaSurface>>, config: &PlaybackConfig) -> Self {
        Self {
            surface,
            album_label: config.album_label.clone(),
            fallback_artwork_url: config.fallback_artwork_url.clone(),
            handlers_registered: false,
            published_id: None,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.surface.is_some()
    }

    /// Install the inbound command handlers.
    ///
    /// Only the first call per session registers anything; it returns `true`.
    /// Every later call is a no-op returning `false`.
    pub fn register_handlers(&mut self, session: &SessionHandle) -> bool {
        if self.handlers_registered {
            debug!("Media surface handlers already registered");
            return false;
        }
        self.handlers_registered = true;

        let Some(surface) = self.surface.as_mut() else {
            debug!("No media surface, skipping handler registration");
            return true;
        };

        let simple = [
            (MediaAction::Play, RemoteCommand::Play),
            (MediaAction::Pause, RemoteCommand::Pause),
            (MediaAction::NextTrack, RemoteCommand::NextTrack),
            (MediaAction::PreviousTrack, RemoteCommand::PreviousTrack),
        ];

        for (action, command) in simple {
            let handle = session.clone();
            let handler: ActionHandler = Box::new(move |_details: ActionDetails| {
                handle.remote(command);
            });
            if let Err(e) = surface.set_action_handler(action, handler) {
                warn!("Failed to register {:?} handler: {}", action, e);
            }
        }

        // Seeking from the surface is optional on several platforms
        let handle = session.clone();
        let seek: ActionHandler = Box::new(move |details: ActionDetails| {
            if let Some(time) = details.seek_time {
                handle.remote(RemoteCommand::SeekTo(time));
            }
        });
        match surface.set_action_handler(MediaAction::SeekTo, seek) {
            Ok(()) => {}
            Err(e) if e.is_unsupported() => debug!("Media surface cannot seek: {}", e),
            Err(e) => warn!("Failed to register {:?} handler: {}", MediaAction::SeekTo, e),
        }

        info!("Media surface handlers registered");
        true
    }

    /// Publish now-playing metadata if the track differs from what is shown
    pub fn publish_metadata(&mut self, track: &Track) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        if self.published_id.as_deref() == Some(track.id.as_str()) {
            return;
        }

        let src = if track.thumbnail_url.is_empty() {
            self.fallback_artwork_url.clone()
        } else {
            track.thumbnail_url.clone()
        };

        let metadata = NowPlayingMetadata {
            title: track.title.clone(),
            artist: track.channel_name.clone(),
            album: self.album_label.clone(),
            artwork: vec![Artwork {
                src,
                sizes: ARTWORK_SIZES.to_string(),
                mime_type: ARTWORK_TYPE.to_string(),
            }],
        };

        match surface.set_metadata(&metadata) {
            Ok(()) => {
                debug!("Now playing on media surface: {}", track.title);
                self.published_id = Some(track.id.clone());
            }
            Err(e) => warn!("Failed to publish metadata: {}", e),
        }
    }

    /// Publish `{duration, position, rate = 1}` with the position clamped into
    /// `0..=duration`. Unknown durations are not published.
    pub fn publish_position(&mut self, position: f64, duration: f64) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let Some(state) = position_state(position, duration) else {
            return;
        };

        if let Err(e) = surface.set_position_state(&state) {
            debug!("Media surface rejected position state: {}", e);
        }
    }
}

/// Build a valid position state, or `None` while the duration is unknown
pub fn position_state(position: f64, duration: f64) -> Option<PositionState> {
    if !duration.is_finite() || duration <= 0.0 {
        return None;
    }

    let position = if position.is_finite() { position } else { 0.0 };

    Some(PositionState {
        duration,
        position: position.clamp(0.0, duration),
        playback_rate: 1.0,
    })
}
