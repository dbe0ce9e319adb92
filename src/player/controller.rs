//! Playback session controller for TuneFlow
//!
//! [`PlaybackSession`] is the single owner of playback state. It reacts to
//! [`SessionEvent`]s one at a time: each handler runs to completion before the
//! next event is taken off the queue, so no state here needs locking.
//!
//! The embedded player is the source of truth for what is actually playing;
//! the session keeps the *intent* (does the user want audio?) and reconciles
//! the keep-alive, the media surface, the progress ticker and the ad detector
//! with the player's reported state.

use crate::audio::{AudioBackend, KeepAlive};
use crate::library::FavoritesStore;
use crate::media_session::{MediaSessionSync, MediaSurface, RemoteCommand};
use crate::player::{
    AdDetector, AdVerdict, AdapterState, Command, PlaybackPhase, PlayerAdapter, PlayerEvent,
    PlayerEventHandler, ProgressTicker, Queue, SessionEvent, SessionHandle, Track, Visibility,
    VisibilityHandler,
};
use crate::utils::config::{Config, PlaybackConfig};
use crate::utils::error::{Result, TuneFlowError};
use crate::utils::timer::{Scheduler, TimerKind, TokioScheduler};

use log::{debug, info, warn};
use std::cell::RefCell;
use std::rc::Rc;
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// Builder for [`PlaybackSession`]
pub struct PlaybackSessionBuilder {
    config: Config,
    adapter: Option<Box<dyn PlayerAdapter>>,
    surface: Option<Box<dyn MediaSurface>>,
    audio: Option<Box<dyn AudioBackend>>,
    scheduler: Option<Box<dyn Scheduler>>,
    favorites: Option<Rc<RefCell<dyn FavoritesStore>>>,
    event_handlers: Vec<Box<dyn PlayerEventHandler>>,
}

impl Default for PlaybackSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackSessionBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            adapter: None,
            surface: None,
            audio: None,
            scheduler: None,
            favorites: None,
            event_handlers: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Set the embedded player (required)
    pub fn with_adapter(mut self, adapter: Box<dyn PlayerAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Set the platform media surface; without one, surface sync is skipped
    pub fn with_media_surface(mut self, surface: Box<dyn MediaSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    /// Set the audio graph used by the keep-alive
    pub fn with_audio_backend(mut self, backend: Box<dyn AudioBackend>) -> Self {
        self.audio = Some(backend);
        self
    }

    /// Override the timer backend (defaults to tokio tasks)
    pub fn with_scheduler(mut self, scheduler: Box<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Favorites lookup for the heart indicator
    pub fn with_favorites(mut self, favorites: Rc<RefCell<dyn FavoritesStore>>) -> Self {
        self.favorites = Some(favorites);
        self
    }

    pub fn with_event_handler(mut self, handler: Box<dyn PlayerEventHandler>) -> Self {
        self.event_handlers.push(handler);
        self
    }

    /// Build the session around the queue `handle` posts into
    pub fn build(self, handle: SessionHandle) -> Result<PlaybackSession> {
        let adapter = self.adapter
            .ok_or_else(|| TuneFlowError::InvalidInput("A player adapter is required".to_string()))?;

        let scheduler = self.scheduler
            .unwrap_or_else(|| Box::new(TokioScheduler::new(handle.sender())));

        let keep_alive = if self.config.playback.keep_alive {
            KeepAlive::new(self.audio)
        } else {
            KeepAlive::disabled()
        };

        let playback = self.config.playback;

        Ok(PlaybackSession {
            adapter,
            adapter_ready: false,
            queue: Queue::new(),
            phase: PlaybackPhase::Idle,
            intent: false,
            background_position: None,
            keep_alive,
            media: MediaSessionSync::new(self.surface, &playback),
            visibility: VisibilityHandler::new(playback.visibility_settle()),
            progress: ProgressTicker::new(playback.progress_interval()),
            ad_detector: AdDetector::new(self.config.ad_detector),
            scheduler,
            favorites: self.favorites,
            event_handlers: self.event_handlers,
            handle,
            config: playback,
        })
    }
}

/// The playback lifecycle controller
pub struct PlaybackSession {
    // Embedded player
    adapter: Box<dyn PlayerAdapter>,
    adapter_ready: bool,

    // Playback state
    queue: Queue,
    phase: PlaybackPhase,
    intent: bool,
    background_position: Option<f64>,

    // Sub-components
    keep_alive: KeepAlive,
    media: MediaSessionSync,
    visibility: VisibilityHandler,
    progress: ProgressTicker,
    ad_detector: AdDetector,
    scheduler: Box<dyn Scheduler>,

    favorites: Option<Rc<RefCell<dyn FavoritesStore>>>,
    event_handlers: Vec<Box<dyn PlayerEventHandler>>,
    handle: SessionHandle,
    config: PlaybackConfig,
}

impl PlaybackSession {
    /// Create the session queue
    pub fn channel() -> (SessionHandle, UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (SessionHandle::new(tx), rx)
    }

    /// Process events until `Shutdown` arrives or every sender is gone
    pub async fn run(mut self, mut events: UnboundedReceiver<SessionEvent>) {
        info!("Playback session started");

        while let Some(event) = events.recv().await {
            let shutdown = event == SessionEvent::Shutdown;
            self.handle(event);
            if shutdown {
                break;
            }
        }

        self.shutdown();
        info!("Playback session stopped");
    }

    /// Apply a single event
    pub fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::AdapterReady => self.on_adapter_ready(),
            SessionEvent::AdapterStateChanged(state) => self.on_adapter_state_change(state),
            SessionEvent::VisibilityChanged { hidden } => self.on_visibility_change(hidden),
            SessionEvent::Command(command) => self.on_command(command),
            SessionEvent::Remote(command) => self.on_remote(command),
            SessionEvent::Timer { kind, generation } => self.on_timer(kind, generation),
            SessionEvent::Shutdown => self.shutdown(),
        }
    }

    /// Add event handler
    pub fn add_event_handler(&mut self, handler: Box<dyn PlayerEventHandler>) {
        self.event_handlers.push(handler);
    }

    /// Play the track at `index`, replacing the queue first when one is given.
    ///
    /// Must run inside a user-initiated command: it starts the keep-alive.
    pub fn play_at(&mut self, index: usize, queue: Option<Vec<Track>>) {
        if !self.adapter_ready {
            warn!("Ignoring play request: {}", TuneFlowError::AdapterNotReady);
            return;
        }

        let len = queue.as_ref().map_or(self.queue.len(), Vec::len);
        if index >= len {
            warn!("Ignoring play request: index {} out of range ({} tracks)", index, len);
            return;
        }

        if let Some(tracks) = queue {
            self.queue.replace(tracks);
        }
        let Some(track) = self.queue.select(index).cloned() else {
            return;
        };

        info!("Loading track {} \"{}\" ({})", index, track.title, track.id);

        self.keep_alive.start();

        // Ticks still queued for the previous track become stale
        self.ad_detector.reset(self.scheduler.as_mut());
        self.progress.stop(self.scheduler.as_mut());

        if let Err(e) = self.adapter.load_by_id(&track.id) {
            warn!("Failed to load {}: {}", track.id, e);
        }

        self.set_phase(PlaybackPhase::Loading);
        let is_favorite = self.is_favorite(&track.id);
        self.emit(PlayerEvent::TrackChanged { index, track, is_favorite });
        self.set_playing(true);
    }

    /// Pause when the user wants audio, play otherwise
    pub fn toggle_play_pause(&mut self) {
        if !self.adapter_ready || self.queue.cursor().is_none() {
            debug!("Toggle ignored: nothing loaded");
            return;
        }

        if self.intent {
            self.pause_playback();
        } else {
            self.resume_playback();
        }
    }

    /// Advance to the next track, wrapping after the last
    pub fn next(&mut self) {
        if let Some(index) = self.queue.next_index() {
            self.play_at(index, None);
        }
    }

    /// Restart the current track if it has played for a while, else go back one
    pub fn previous(&mut self) {
        let Some(index) = self.queue.previous_index() else {
            return;
        };

        let elapsed = if self.adapter_ready {
            self.adapter.current_time()
        } else {
            0.0
        };

        if elapsed > self.config.previous_restart_threshold_secs {
            debug!("Restarting current track ({:.1}s elapsed)", elapsed);
            if let Err(e) = self.adapter.seek_to(0.0, true) {
                warn!("Failed to restart track: {}", e);
            }
            let duration = self.adapter.duration();
            self.media.publish_position(0.0, duration);
            return;
        }

        self.play_at(index, None);
    }

    /// Seek to an absolute position in seconds
    pub fn seek_to(&mut self, seconds: f64) {
        if !self.adapter_ready || self.queue.cursor().is_none() {
            debug!("Seek ignored: nothing loaded");
            return;
        }

        let duration = self.adapter.duration();
        let target = if duration > 0.0 {
            seconds.clamp(0.0, duration)
        } else {
            seconds.max(0.0)
        };

        if let Err(e) = self.adapter.seek_to(target, true) {
            warn!("Failed to seek to {:.1}s: {}", target, e);
            return;
        }

        self.media.publish_position(target, duration);
        let snapshot = self.progress.sample(target, duration);
        self.emit(PlayerEvent::Progress(snapshot));
    }

    /// Seek to a fraction of the duration (progress bar click)
    pub fn seek_fraction(&mut self, fraction: f64) {
        if !self.adapter_ready {
            return;
        }
        let duration = self.adapter.duration();
        if duration <= 0.0 || !fraction.is_finite() {
            return;
        }
        self.seek_to(fraction.clamp(0.0, 1.0) * duration);
    }

    /// Re-read the heart state of the current track
    pub fn refresh_favorite(&mut self) {
        let Some(id) = self.queue.current().map(|track| track.id.clone()) else {
            return;
        };
        let is_favorite = self.is_favorite(&id);
        self.emit(PlayerEvent::FavoriteChanged { id, is_favorite });
    }

    /// Central transition function
    pub fn on_adapter_state_change(&mut self, state: AdapterState) {
        debug!("Player state changed: {:?}", state);

        match state {
            AdapterState::Playing => {
                self.set_phase(PlaybackPhase::Playing);
                self.set_playing(true);

                if self.visibility.is_foreground() {
                    self.progress.start(self.scheduler.as_mut());
                }
                self.ad_detector.activate(self.scheduler.as_mut());

                // Duration is only reliable once playback has started
                if let Some(track) = self.queue.current().cloned() {
                    self.media.publish_metadata(&track);
                }
                self.publish_position();
            }
            AdapterState::Paused => {
                self.set_phase(PlaybackPhase::Paused);
                self.set_playing(false);
                self.progress.stop(self.scheduler.as_mut());
                self.ad_detector.suspend(self.scheduler.as_mut());
                self.background_position = Some(self.adapter.current_time());
            }
            AdapterState::Buffering => {
                // Playing flag stays as is to avoid flicker on short rebuffers
                self.set_phase(PlaybackPhase::Buffering);
                self.progress.stop(self.scheduler.as_mut());
            }
            AdapterState::Ended => {
                self.ad_detector.close(self.scheduler.as_mut());
                self.progress.stop(self.scheduler.as_mut());
                self.next();
            }
            AdapterState::Unstarted | AdapterState::Cued => {}
        }
    }

    fn on_adapter_ready(&mut self) {
        if self.adapter_ready {
            debug!("Duplicate player ready signal ignored");
            return;
        }

        self.adapter_ready = true;
        info!("Embedded player ready");

        // Before any play command can come from the system surface
        self.media.register_handlers(&self.handle);
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::PlayAt { index, queue } => self.play_at(index, queue),
            Command::TogglePlayPause => self.toggle_play_pause(),
            Command::Next => self.next(),
            Command::Previous => self.previous(),
            Command::SeekTo(seconds) => self.seek_to(seconds),
            Command::SeekFraction(fraction) => self.seek_fraction(fraction),
            Command::RefreshFavorite => self.refresh_favorite(),
        }
    }

    fn on_remote(&mut self, command: RemoteCommand) {
        debug!("Media surface command: {:?}", command);

        match command {
            RemoteCommand::Play => {
                // Nothing loaded yet
                if self.adapter_ready && self.queue.cursor().is_some() {
                    self.resume_playback();
                }
            }
            RemoteCommand::Pause => {
                if self.adapter_ready {
                    self.pause_playback();
                }
            }
            RemoteCommand::NextTrack => self.next(),
            RemoteCommand::PreviousTrack => self.previous(),
            RemoteCommand::SeekTo(seconds) => self.seek_to(seconds),
        }
    }

    fn on_visibility_change(&mut self, hidden: bool) {
        let Some(visibility) = self.visibility.transition(hidden, self.scheduler.as_mut()) else {
            return;
        };

        match visibility {
            Visibility::Background => {
                info!("App hidden");
                if self.intent {
                    self.background_position = Some(self.adapter.current_time());
                }
                // Nothing to draw while hidden
                self.progress.stop(self.scheduler.as_mut());
            }
            Visibility::Foreground => {
                info!("App visible");
                self.keep_alive.resume();
                if self.intent {
                    self.visibility.schedule_settle(self.scheduler.as_mut());
                }
            }
        }
    }

    /// Reconcile after the platform has reactivated the embedded player
    fn on_visibility_settled(&mut self) {
        if !self.intent || !self.visibility.is_foreground() {
            return;
        }

        if self.adapter_ready && self.adapter.state() == AdapterState::Paused {
            info!("Player was paused while hidden, resuming");
            if let Err(e) = self.adapter.play() {
                warn!("Failed to resume after returning to foreground: {}", e);
            }
        }

        // Buffering or loading restarts the ticker on the next Playing event
        if self.phase == PlaybackPhase::Playing {
            self.progress.start(self.scheduler.as_mut());
        }
        self.publish_position();
    }

    fn on_timer(&mut self, kind: TimerKind, generation: u64) {
        match kind {
            TimerKind::Progress => {
                if self.progress.accept_tick(generation) {
                    self.on_progress_tick();
                }
            }
            TimerKind::AdWatch => {
                if self.ad_detector.accept_tick(generation) {
                    self.on_ad_poll();
                }
            }
            TimerKind::VisibilitySettle => {
                if self.visibility.accept_settle(generation) {
                    self.on_visibility_settled();
                }
            }
        }
    }

    fn on_progress_tick(&mut self) {
        if !self.adapter_ready || !self.intent {
            return;
        }

        let snapshot = self.progress.sample(self.adapter.current_time(), self.adapter.duration());
        self.emit(PlayerEvent::Progress(snapshot));
    }

    fn on_ad_poll(&mut self) {
        let state = self.adapter.state();
        let duration = self.adapter.duration();

        match self.ad_detector.observe(state, duration, self.scheduler.as_mut()) {
            AdVerdict::SkipTo { position, attempt } => {
                info!("Skipping probable ad ({:.1}s, attempt {})", duration, attempt);
                if let Err(e) = self.adapter.seek_to(position, true) {
                    warn!("Ad skip seek failed: {}", e);
                }
                if let Some(id) = self.current_id() {
                    self.emit(PlayerEvent::AdSkipped { id, attempt });
                }
            }
            AdVerdict::AbandonTrack => {
                if let Some(id) = self.current_id() {
                    warn!("Abandoning {} after repeated ads", id);
                    self.emit(PlayerEvent::TrackAbandoned { id });
                }
                self.next();
            }
            AdVerdict::Restart => {
                if let Err(e) = self.adapter.play() {
                    warn!("Failed to restart stalled player: {}", e);
                }
            }
            AdVerdict::Confirmed | AdVerdict::Continue => {}
        }
    }

    fn pause_playback(&mut self) {
        if let Err(e) = self.adapter.pause() {
            warn!("Failed to pause: {}", e);
        }
        self.keep_alive.stop();
    }

    fn resume_playback(&mut self) {
        self.keep_alive.start();
        if let Err(e) = self.adapter.play() {
            warn!("Failed to play: {}", e);
        }
    }

    fn publish_position(&mut self) {
        let position = self.adapter.current_time();
        let duration = self.adapter.duration();
        self.media.publish_position(position, duration);
    }

    fn shutdown(&mut self) {
        self.progress.stop(self.scheduler.as_mut());
        self.ad_detector.close(self.scheduler.as_mut());
        self.visibility.cancel_settle(self.scheduler.as_mut());
        self.keep_alive.stop();
    }

    fn set_phase(&mut self, phase: PlaybackPhase) {
        if self.phase != phase {
            self.phase = phase;
            self.emit(PlayerEvent::PhaseChanged { phase });
        }
    }

    fn set_playing(&mut self, playing: bool) {
        if self.intent != playing {
            self.intent = playing;
            self.emit(PlayerEvent::PlayingChanged { playing });
        }
    }

    fn is_favorite(&self, id: &str) -> bool {
        self.favorites
            .as_ref()
            .is_some_and(|store| store.borrow().is_favorite(id))
    }

    fn current_id(&self) -> Option<String> {
        self.queue.current().map(|track| track.id.clone())
    }

    /// Send event to handlers
    fn emit(&mut self, event: PlayerEvent) {
        for handler in self.event_handlers.iter_mut() {
            handler.handle_event(event.clone());
        }
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    /// Whether the user currently wants audio
    pub fn is_playing(&self) -> bool {
        self.intent
    }

    pub fn is_adapter_ready(&self) -> bool {
        self.adapter_ready
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.queue.current()
    }

    /// Last position captured on pause or hide
    pub fn background_position(&self) -> Option<f64> {
        self.background_position
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility.state()
    }

    pub fn keep_alive(&self) -> &KeepAlive {
        &self.keep_alive
    }

    pub fn is_progress_running(&self) -> bool {
        self.progress.is_running()
    }

    pub fn is_ad_detector_polling(&self) -> bool {
        self.ad_detector.is_polling()
    }

    pub fn media_session(&self) -> &MediaSessionSync {
        &self.media
    }
}
