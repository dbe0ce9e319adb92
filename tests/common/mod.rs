//! Shared fakes for the session integration tests
//!
//! Every fake records into an `Rc` the test keeps, so assertions can be made
//! after the fake itself has been moved into the session.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use tokio::sync::mpsc::UnboundedReceiver;
use tuneflow::audio::{AudioBackend, AudioContext, ContextState, SignalSource};
use tuneflow::library::FavoritesStore;
use tuneflow::media_session::{
    ActionDetails, ActionHandler, MediaAction, MediaSurface, NowPlayingMetadata, PositionState,
};
use tuneflow::player::{
    AdapterState, PlaybackSession, PlaybackSessionBuilder, PlayerAdapter, PlayerEvent,
    PlayerEventHandler, SessionEvent, Track,
};
use tuneflow::utils::{Config, ManualScheduler, Result, TimerKind, TuneFlowError};

/// Calls made on the fake player, plus the values it reports
pub struct AdapterLog {
    pub loads: Vec<String>,
    pub plays: u32,
    pub pauses: u32,
    pub seeks: Vec<f64>,
    pub time: f64,
    pub duration: f64,
    pub state: AdapterState,
}

impl Default for AdapterLog {
    fn default() -> Self {
        Self {
            loads: Vec::new(),
            plays: 0,
            pauses: 0,
            seeks: Vec::new(),
            time: 0.0,
            duration: 0.0,
            state: AdapterState::Unstarted,
        }
    }
}

pub struct FakeAdapter {
    pub log: Rc<RefCell<AdapterLog>>,
}

impl PlayerAdapter for FakeAdapter {
    fn load_by_id(&mut self, id: &str) -> Result<()> {
        let mut log = self.log.borrow_mut();
        log.loads.push(id.to_string());
        log.time = 0.0;
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        self.log.borrow_mut().plays += 1;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.log.borrow_mut().pauses += 1;
        Ok(())
    }

    fn seek_to(&mut self, seconds: f64, _allow_seek_ahead: bool) -> Result<()> {
        let mut log = self.log.borrow_mut();
        log.seeks.push(seconds);
        log.time = seconds;
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.log.borrow().time
    }

    fn duration(&self) -> f64 {
        self.log.borrow().duration
    }

    fn state(&self) -> AdapterState {
        self.log.borrow().state
    }
}

#[derive(Default)]
pub struct SurfaceLog {
    pub handlers: HashMap<MediaAction, ActionHandler>,
    pub registrations: u32,
    pub metadata: Vec<NowPlayingMetadata>,
    pub positions: Vec<PositionState>,
}

pub struct RecordingSurface {
    pub log: Rc<RefCell<SurfaceLog>>,
    pub seek_supported: bool,
}

impl MediaSurface for RecordingSurface {
    fn set_action_handler(&mut self, action: MediaAction, handler: ActionHandler) -> Result<()> {
        if action == MediaAction::SeekTo && !self.seek_supported {
            return Err(TuneFlowError::PlatformUnsupported("seekto".to_string()));
        }
        let mut log = self.log.borrow_mut();
        log.registrations += 1;
        log.handlers.insert(action, handler);
        Ok(())
    }

    fn set_metadata(&mut self, metadata: &NowPlayingMetadata) -> Result<()> {
        self.log.borrow_mut().metadata.push(metadata.clone());
        Ok(())
    }

    fn set_position_state(&mut self, state: &PositionState) -> Result<()> {
        self.log.borrow_mut().positions.push(*state);
        Ok(())
    }
}

#[derive(Default)]
pub struct AudioLog {
    pub contexts: Cell<u32>,
    pub live_sources: Cell<i32>,
    pub resumes: Cell<u32>,
    pub suspended: Cell<bool>,
}

pub struct FakeAudioBackend {
    pub log: Rc<AudioLog>,
}

struct FakeContext {
    log: Rc<AudioLog>,
}

struct FakeSource {
    log: Rc<AudioLog>,
}

impl AudioBackend for FakeAudioBackend {
    fn create_context(&mut self) -> Result<Box<dyn AudioContext>> {
        self.log.contexts.set(self.log.contexts.get() + 1);
        Ok(Box::new(FakeContext { log: Rc::clone(&self.log) }))
    }
}

impl AudioContext for FakeContext {
    fn state(&self) -> ContextState {
        if self.log.suspended.get() {
            ContextState::Suspended
        } else {
            ContextState::Running
        }
    }

    fn resume(&mut self) -> Result<()> {
        self.log.resumes.set(self.log.resumes.get() + 1);
        self.log.suspended.set(false);
        Ok(())
    }

    fn start_silence(&mut self) -> Result<Box<dyn SignalSource>> {
        self.log.live_sources.set(self.log.live_sources.get() + 1);
        Ok(Box::new(FakeSource { log: Rc::clone(&self.log) }))
    }
}

impl SignalSource for FakeSource {
    fn disconnect(&mut self) {
        self.log.live_sources.set(self.log.live_sources.get() - 1);
    }
}

/// In-memory favorites
#[derive(Default)]
pub struct MemoryFavorites {
    pub tracks: Vec<Track>,
}

impl FavoritesStore for MemoryFavorites {
    fn is_favorite(&self, id: &str) -> bool {
        self.tracks.iter().any(|t| t.id == id)
    }

    fn toggle(&mut self, track: &Track) -> Result<bool> {
        if let Some(index) = self.tracks.iter().position(|t| t.id == track.id) {
            self.tracks.remove(index);
            Ok(false)
        } else {
            self.tracks.insert(0, track.clone());
            Ok(true)
        }
    }

    fn list(&self) -> &[Track] {
        &self.tracks
    }
}

pub struct RecordingHandler {
    pub events: Rc<RefCell<Vec<PlayerEvent>>>,
}

impl PlayerEventHandler for RecordingHandler {
    fn handle_event(&mut self, event: PlayerEvent) {
        self.events.borrow_mut().push(event);
    }
}

pub fn track(id: &str) -> Track {
    Track::new(id, format!("Song {}", id), format!("Artist {}", id), format!("https://img/{}.jpg", id))
}

pub fn tracks(ids: &[&str]) -> Vec<Track> {
    ids.iter().map(|id| track(id)).collect()
}

/// A session wired to fakes and a manual clock
pub struct Harness {
    pub session: PlaybackSession,
    pub adapter: Rc<RefCell<AdapterLog>>,
    pub surface: Rc<RefCell<SurfaceLog>>,
    pub audio: Rc<AudioLog>,
    pub events: Rc<RefCell<Vec<PlayerEvent>>>,
    pub favorites: Rc<RefCell<MemoryFavorites>>,
    pub scheduler: ManualScheduler,
    pub queue: UnboundedReceiver<SessionEvent>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self::build(config, true)
    }

    pub fn without_surface() -> Self {
        Self::build(Config::default(), false)
    }

    fn build(config: Config, with_surface: bool) -> Self {
        let adapter = Rc::new(RefCell::new(AdapterLog::default()));
        let surface = Rc::new(RefCell::new(SurfaceLog::default()));
        let audio = Rc::new(AudioLog::default());
        let events = Rc::new(RefCell::new(Vec::new()));
        let favorites = Rc::new(RefCell::new(MemoryFavorites::default()));
        let scheduler = ManualScheduler::new();

        let (handle, queue) = PlaybackSession::channel();

        let mut builder = PlaybackSessionBuilder::new()
            .with_config(config)
            .with_adapter(Box::new(FakeAdapter { log: Rc::clone(&adapter) }))
            .with_audio_backend(Box::new(FakeAudioBackend { log: Rc::clone(&audio) }))
            .with_scheduler(Box::new(scheduler.clone()))
            .with_favorites(favorites.clone())
            .with_event_handler(Box::new(RecordingHandler { events: Rc::clone(&events) }));

        if with_surface {
            builder = builder.with_media_surface(Box::new(RecordingSurface {
                log: Rc::clone(&surface),
                seek_supported: true,
            }));
        }

        let session = builder.build(handle).unwrap();

        Self {
            session,
            adapter,
            surface,
            audio,
            events,
            favorites,
            scheduler,
            queue,
        }
    }

    /// A harness whose player has already signalled readiness
    pub fn ready() -> Self {
        let mut harness = Self::new();
        harness.session.handle(SessionEvent::AdapterReady);
        harness
    }

    /// Change what the fake player reports and notify the session
    pub fn player_state(&mut self, state: AdapterState) {
        self.adapter.borrow_mut().state = state;
        self.session.handle(SessionEvent::AdapterStateChanged(state));
    }

    /// Fire a live timer; returns `false` if none was scheduled
    pub fn fire(&mut self, kind: TimerKind) -> bool {
        match self.scheduler.fire(kind) {
            Some(tick) => {
                self.session.handle(tick);
                true
            }
            None => false,
        }
    }

    /// Feed everything the media surface posted into the session
    pub fn pump(&mut self) {
        while let Ok(event) = self.queue.try_recv() {
            self.session.handle(event);
        }
    }

    /// Invoke the surface handler the session registered for `action`
    pub fn press(&mut self, action: MediaAction, details: ActionDetails) {
        {
            let surface = self.surface.borrow();
            let handler = surface.handlers.get(&action).expect("handler registered");
            handler(details);
        }
        self.pump();
    }

    pub fn loads(&self) -> Vec<String> {
        self.adapter.borrow().loads.clone()
    }

    pub fn progress_events(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| matches!(e, PlayerEvent::Progress(_)))
            .count()
    }
}
