//! Progress ticker
//!
//! Polls the player at a bounded rate while playing in the foreground and
//! turns the raw time/duration pair into what a progress bar needs.

use crate::utils::timer::{Scheduler, TimerKind, TimerSlot};
use crate::utils::{format_clock, progress_percent};
use std::time::Duration;

/// One progress sample
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    /// Position in seconds
    pub current: f64,

    /// Duration in seconds (0 while unknown)
    pub duration: f64,

    /// Position as a percentage of the duration
    pub percent: f64,

    /// `m:ss` position label
    pub current_label: String,

    /// `m:ss` duration label
    pub total_label: String,
}

impl ProgressSnapshot {
    pub fn new(current: f64, duration: f64) -> Self {
        Self {
            current,
            duration,
            percent: progress_percent(current, duration),
            current_label: format_clock(current),
            total_label: format_clock(duration),
        }
    }
}

/// Progress ticker
pub struct ProgressTicker {
    interval: Duration,
    timer: TimerSlot,
}

impl ProgressTicker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            timer: TimerSlot::new(TimerKind::Progress),
        }
    }

    /// Start polling; restarting replaces the previous timer
    pub fn start(&mut self, scheduler: &mut dyn Scheduler) {
        self.timer.start(scheduler, self.interval, true);
    }

    pub fn stop(&mut self, scheduler: &mut dyn Scheduler) {
        self.timer.stop(scheduler);
    }

    pub fn accept_tick(&mut self, generation: u64) -> bool {
        self.timer.accept(generation)
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_active()
    }

    pub fn sample(&self, current: f64, duration: f64) -> ProgressSnapshot {
        ProgressSnapshot::new(current, duration)
    }
}
