//! Visibility transition handling
//!
//! Some platforms pause the embedded player when the page is hidden without
//! delivering a paused event. Coming back to the foreground therefore waits a
//! short settle delay and then reconciles the player with the session's
//! playback intent.

use crate::utils::timer::{Scheduler, TimerKind, TimerSlot};
use log::debug;
use std::time::Duration;

/// Host visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Foreground,
    Background,
}

/// Visibility transition handler
pub struct VisibilityHandler {
    state: Visibility,
    settle_delay: Duration,
    settle: TimerSlot,
}

impl VisibilityHandler {
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            state: Visibility::Foreground,
            settle_delay,
            settle: TimerSlot::new(TimerKind::VisibilitySettle),
        }
    }

    /// Record a visibility signal.
    ///
    /// Returns the new state, or `None` if the signal repeats the current one.
    pub fn transition(&mut self, hidden: bool, scheduler: &mut dyn Scheduler) -> Option<Visibility> {
        let next = if hidden {
            Visibility::Background
        } else {
            Visibility::Foreground
        };

        if next == self.state {
            debug!("Ignoring repeated visibility signal ({:?})", next);
            return None;
        }

        self.state = next;
        if next == Visibility::Background {
            // A pending reconcile is meaningless once hidden again
            self.settle.stop(scheduler);
        }
        Some(next)
    }

    /// Arm the one-shot reconcile delay
    pub fn schedule_settle(&mut self, scheduler: &mut dyn Scheduler) {
        self.settle.start(scheduler, self.settle_delay, false);
    }

    pub fn cancel_settle(&mut self, scheduler: &mut dyn Scheduler) {
        self.settle.stop(scheduler);
    }

    pub fn accept_settle(&mut self, generation: u64) -> bool {
        self.settle.accept(generation)
    }

    pub fn state(&self) -> Visibility {
        self.state
    }

    pub fn is_foreground(&self) -> bool {
        self.state == Visibility::Foreground
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::timer::ManualScheduler;

    #[test]
    fn test_transitions_ignore_repeats() {
        let mut scheduler = ManualScheduler::new();
        let mut handler = VisibilityHandler::new(Duration::from_millis(300));

        assert_eq!(handler.transition(false, &mut scheduler), None);
        assert_eq!(handler.transition(true, &mut scheduler), Some(Visibility::Background));
        assert_eq!(handler.transition(true, &mut scheduler), None);
        assert_eq!(handler.transition(false, &mut scheduler), Some(Visibility::Foreground));
        assert!(handler.is_foreground());
    }

    #[test]
    fn test_hiding_cancels_pending_settle() {
        let mut scheduler = ManualScheduler::new();
        let mut handler = VisibilityHandler::new(Duration::from_millis(300));

        handler.transition(true, &mut scheduler);
        handler.transition(false, &mut scheduler);
        handler.schedule_settle(&mut scheduler);
        let tick = scheduler.fire(TimerKind::VisibilitySettle);

        handler.transition(true, &mut scheduler);
        let Some(crate::player::SessionEvent::Timer { generation, .. }) = tick else {
            panic!("expected a settle tick");
        };
        assert!(!handler.accept_settle(generation));
    }
}
