//! Simulated embedded player
//!
//! Stands in for the web widget when running from a terminal. It keeps a
//! wall-clock position for the loaded item and posts the same readiness and
//! state events a real widget would. The item never produces sound; the
//! session does not care.

use crate::player::{AdapterState, PlayerAdapter, SessionEvent, SessionHandle};
use crate::utils::error::{Result, TuneFlowError};
use log::debug;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

struct Inner {
    loaded: Option<String>,
    state: AdapterState,
    /// Position at the last anchor
    offset: f64,
    /// Set while playing; position advances from here
    anchor: Option<Instant>,
    duration: f64,
}

impl Inner {
    fn position(&self) -> f64 {
        let elapsed = self.anchor.map_or(0.0, |anchor| anchor.elapsed().as_secs_f64());
        (self.offset + elapsed).min(self.duration)
    }
}

/// Clock-driven [`PlayerAdapter`]. Clones share the same player.
#[derive(Clone)]
pub struct SimulatedPlayer {
    inner: Rc<RefCell<Inner>>,
    session: SessionHandle,
    track_length: Duration,
}

impl SimulatedPlayer {
    /// Create a player whose items all last `track_length`
    pub fn new(session: SessionHandle, track_length: Duration) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                loaded: None,
                state: AdapterState::Unstarted,
                offset: 0.0,
                anchor: None,
                duration: 0.0,
            })),
            session,
            track_length,
        }
    }

    /// Signal readiness, as the widget does once its script has loaded
    pub fn announce_ready(&self) {
        self.session.send(SessionEvent::AdapterReady);
    }

    /// Report the end of the current item once its clock runs out.
    ///
    /// Returns `true` when an `Ended` event was posted.
    pub fn poll(&self) -> bool {
        let ended = {
            let mut inner = self.inner.borrow_mut();
            if inner.state == AdapterState::Playing && inner.position() >= inner.duration {
                inner.offset = inner.duration;
                inner.anchor = None;
                inner.state = AdapterState::Ended;
                true
            } else {
                false
            }
        };

        if ended {
            self.post(AdapterState::Ended);
        }
        ended
    }

    pub fn loaded_id(&self) -> Option<String> {
        self.inner.borrow().loaded.clone()
    }

    fn post(&self, state: AdapterState) {
        debug!("Simulated player -> {:?}", state);
        self.session.send(SessionEvent::AdapterStateChanged(state));
    }
}

impl PlayerAdapter for SimulatedPlayer {
    fn load_by_id(&mut self, id: &str) -> Result<()> {
        if id.is_empty() {
            return Err(TuneFlowError::InvalidInput("Empty content id".to_string()));
        }

        {
            let mut inner = self.inner.borrow_mut();
            inner.loaded = Some(id.to_string());
            inner.offset = 0.0;
            inner.anchor = Some(Instant::now());
            inner.duration = self.track_length.as_secs_f64();
            inner.state = AdapterState::Playing;
        }

        self.post(AdapterState::Buffering);
        self.post(AdapterState::Playing);
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.loaded.is_none() {
                return Err(TuneFlowError::Adapter("Nothing loaded".to_string()));
            }
            if inner.state == AdapterState::Playing {
                return Ok(());
            }
            if inner.state == AdapterState::Ended {
                inner.offset = 0.0;
            }
            inner.anchor = Some(Instant::now());
            inner.state = AdapterState::Playing;
        }

        self.post(AdapterState::Playing);
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.state != AdapterState::Playing {
                return Ok(());
            }
            inner.offset = inner.position();
            inner.anchor = None;
            inner.state = AdapterState::Paused;
        }

        self.post(AdapterState::Paused);
        Ok(())
    }

    fn seek_to(&mut self, seconds: f64, _allow_seek_ahead: bool) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if inner.loaded.is_none() {
            return Err(TuneFlowError::Adapter("Nothing loaded".to_string()));
        }

        inner.offset = seconds.clamp(0.0, inner.duration);
        if inner.anchor.is_some() {
            inner.anchor = Some(Instant::now());
        }
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.inner.borrow().position()
    }

    fn duration(&self) -> f64 {
        self.inner.borrow().duration
    }

    fn state(&self) -> AdapterState {
        self.inner.borrow().state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn player(length: Duration) -> (SimulatedPlayer, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (SimulatedPlayer::new(SessionHandle::new(tx), length), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_load_reports_buffering_then_playing() {
        let (mut player, mut rx) = player(Duration::from_secs(60));

        player.announce_ready();
        player.load_by_id("abc").unwrap();

        assert_eq!(
            drain(&mut rx),
            vec![
                SessionEvent::AdapterReady,
                SessionEvent::AdapterStateChanged(AdapterState::Buffering),
                SessionEvent::AdapterStateChanged(AdapterState::Playing),
            ]
        );
        assert_eq!(player.duration(), 60.0);
        assert_eq!(player.loaded_id().as_deref(), Some("abc"));
    }

    #[test]
    fn test_pause_freezes_position() {
        let (mut player, mut rx) = player(Duration::from_secs(60));

        player.load_by_id("abc").unwrap();
        player.seek_to(12.0, true).unwrap();
        player.pause().unwrap();
        let frozen = player.current_time();
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(player.current_time(), frozen);
        assert!(frozen >= 12.0);
        assert_eq!(player.state(), AdapterState::Paused);
        assert_eq!(
            drain(&mut rx).last(),
            Some(&SessionEvent::AdapterStateChanged(AdapterState::Paused))
        );
    }

    #[test]
    fn test_seek_is_clamped_to_duration() {
        let (mut player, _rx) = player(Duration::from_secs(30));

        player.load_by_id("abc").unwrap();
        player.pause().unwrap();
        player.seek_to(45.0, true).unwrap();
        assert_eq!(player.current_time(), 30.0);
    }

    #[test]
    fn test_poll_reports_end_once() {
        let (mut player, mut rx) = player(Duration::ZERO);

        player.load_by_id("abc").unwrap();
        drain(&mut rx);

        assert!(player.poll());
        assert!(!player.poll());
        assert_eq!(drain(&mut rx), vec![SessionEvent::AdapterStateChanged(AdapterState::Ended)]);
    }

    #[test]
    fn test_commands_before_load_fail() {
        let (mut player, _rx) = player(Duration::from_secs(10));

        assert!(player.play().is_err());
        assert!(player.seek_to(1.0, true).is_err());
        assert!(player.load_by_id("").is_err());
        assert_eq!(player.state(), AdapterState::Unstarted);
    }
}
