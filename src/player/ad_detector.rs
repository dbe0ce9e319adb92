//! Ad heuristic detector
//!
//! The upstream player sometimes injects short sponsor clips before the
//! requested item. While a detection window is open the session polls the
//! player and feeds each observation to [`AdDetector::observe`], which decides
//! whether to skip the clip, restart a stalled start, or close the window
//! because real content is playing.
//!
//! Short legitimate tracks (under the duration threshold) are misclassified
//! as ads. That risk is accepted.

use crate::player::AdapterState;
use crate::utils::config::AdDetectorConfig;
use crate::utils::timer::{Scheduler, TimerKind, TimerSlot};
use log::{debug, info};

/// Action the session should take after an observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdVerdict {
    /// Nothing to do
    Continue,

    /// Seek the player to this position to finish the ad
    SkipTo { position: f64, attempt: u32 },

    /// Too many ads in this window; move on to the next track
    AbandonTrack,

    /// The player never started; issue `play()` again
    Restart,

    /// Real content confirmed; the window is closed
    Confirmed,
}

/// Per-load counters
#[derive(Debug, Default, Clone, Copy)]
struct DetectionWindow {
    attempts: u32,
    unstarted_polls: u32,
}

/// Ad heuristic detector
pub struct AdDetector {
    config: AdDetectorConfig,
    window: Option<DetectionWindow>,
    timer: TimerSlot,
}

impl AdDetector {
    pub fn new(config: AdDetectorConfig) -> Self {
        Self {
            config,
            window: None,
            timer: TimerSlot::new(TimerKind::AdWatch),
        }
    }

    /// A new track started loading: open a fresh window and stop polling
    /// until the player reports `Playing`.
    pub fn reset(&mut self, scheduler: &mut dyn Scheduler) {
        self.timer.stop(scheduler);
        self.window = self.config.enabled.then(DetectionWindow::default);
    }

    /// Playback entered `Playing`: start polling.
    ///
    /// A window still open from this load keeps its counters; a closed one is
    /// reopened so a mid-track clip after a pause is still caught.
    pub fn activate(&mut self, scheduler: &mut dyn Scheduler) {
        if !self.config.enabled {
            return;
        }
        self.window.get_or_insert_with(DetectionWindow::default);
        self.timer.start(scheduler, self.config.poll_interval(), true);
    }

    /// Stop polling but keep the window (pause)
    pub fn suspend(&mut self, scheduler: &mut dyn Scheduler) {
        self.timer.stop(scheduler);
    }

    /// Stop polling and discard the window (track ended or changed)
    pub fn close(&mut self, scheduler: &mut dyn Scheduler) {
        self.timer.stop(scheduler);
        self.window = None;
    }

    /// Validate a poll tick against the current timer generation
    pub fn accept_tick(&mut self, generation: u64) -> bool {
        self.timer.accept(generation)
    }

    pub fn is_polling(&self) -> bool {
        self.timer.is_active()
    }

    pub fn has_window(&self) -> bool {
        self.window.is_some()
    }

    /// Classify one poll of the player.
    ///
    /// Closing outcomes (`AbandonTrack`, `Confirmed`) stop the poll timer.
    pub fn observe(
        &mut self,
        state: AdapterState,
        duration: f64,
        scheduler: &mut dyn Scheduler,
    ) -> AdVerdict {
        let Some(window) = self.window.as_mut() else {
            return AdVerdict::Continue;
        };

        match state {
            AdapterState::Unstarted | AdapterState::Cued => {
                window.unstarted_polls += 1;
                if window.unstarted_polls > self.config.max_unstarted_polls {
                    info!(
                        "Player stuck unstarted for {} polls, forcing play",
                        window.unstarted_polls
                    );
                    window.unstarted_polls = 0;
                    window.attempts = 0;
                    return AdVerdict::Restart;
                }
                AdVerdict::Continue
            }
            AdapterState::Playing => {
                window.unstarted_polls = 0;

                if duration >= self.config.max_ad_duration_secs {
                    debug!("Content confirmed ({:.1}s), closing ad window", duration);
                    self.close(scheduler);
                    return AdVerdict::Confirmed;
                }

                if duration > 0.0 {
                    window.attempts += 1;
                    if window.attempts > self.config.max_skip_attempts {
                        info!("Ad skip limit exceeded after {} attempts", window.attempts);
                        self.close(scheduler);
                        return AdVerdict::AbandonTrack;
                    }

                    let position = (duration - self.config.end_seek_offset_secs).max(0.0);
                    return AdVerdict::SkipTo {
                        position,
                        attempt: window.attempts,
                    };
                }

                AdVerdict::Continue
            }
            _ => {
                window.unstarted_polls = 0;
                AdVerdict::Continue
            }
        }
    }
}
