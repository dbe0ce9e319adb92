//! Cancellable timers for the playback session
//!
//! Every periodic or delayed piece of work in the session (progress polling,
//! ad polling, the visibility settle delay) is owned by exactly one component
//! through a [`TimerSlot`]. Ticks come back as [`SessionEvent::Timer`] carrying
//! the generation they were scheduled with, so a tick that was already queued
//! when its slot got restarted or stopped is recognised as stale and dropped.

use crate::player::SessionEvent;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Identifies the owner of a timer. At most one timer per kind is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Progress ticker poll
    Progress,

    /// Ad heuristic poll
    AdWatch,

    /// One-shot delay before reconciling after returning to the foreground
    VisibilitySettle,
}

/// Scheduling backend
pub trait Scheduler {
    /// Schedule a timer, replacing any live timer of the same kind.
    ///
    /// # Arguments
    ///
    /// * `kind` - Timer owner
    /// * `generation` - Echoed back in every tick
    /// * `period` - Delay before the first tick and between ticks
    /// * `repeat` - Keep ticking until cancelled
    fn schedule(&mut self, kind: TimerKind, generation: u64, period: Duration, repeat: bool);

    /// Cancel the live timer of this kind, if any
    fn cancel(&mut self, kind: TimerKind);
}

/// Per-component ownership of one timer kind
#[derive(Debug)]
pub struct TimerSlot {
    kind: TimerKind,
    generation: u64,
    active: bool,
    repeat: bool,
}

impl TimerSlot {
    pub fn new(kind: TimerKind) -> Self {
        Self {
            kind,
            generation: 0,
            active: false,
            repeat: false,
        }
    }

    /// Start (or restart) the timer. Ticks from any earlier start become stale.
    pub fn start(&mut self, scheduler: &mut dyn Scheduler, period: Duration, repeat: bool) {
        self.generation += 1;
        self.active = true;
        self.repeat = repeat;
        scheduler.schedule(self.kind, self.generation, period, repeat);
    }

    /// Stop the timer; a no-op when it is not running
    pub fn stop(&mut self, scheduler: &mut dyn Scheduler) {
        if self.active {
            self.active = false;
            scheduler.cancel(self.kind);
        }
    }

    /// Check an incoming tick against this slot.
    ///
    /// Returns `true` for a current tick. A one-shot slot deactivates itself
    /// on its (single) accepted tick.
    pub fn accept(&mut self, generation: u64) -> bool {
        if !self.active || generation != self.generation {
            debug!("Dropping stale {:?} tick (generation {})", self.kind, generation);
            return false;
        }
        if !self.repeat {
            self.active = false;
        }
        true
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// Scheduler backed by tokio tasks that post ticks into the session queue
pub struct TokioScheduler {
    events: UnboundedSender<SessionEvent>,
    tasks: HashMap<TimerKind, JoinHandle<()>>,
}

impl TokioScheduler {
    pub fn new(events: UnboundedSender<SessionEvent>) -> Self {
        Self {
            events,
            tasks: HashMap::new(),
        }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, kind: TimerKind, generation: u64, period: Duration, repeat: bool) {
        self.cancel(kind);

        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if events.send(SessionEvent::Timer { kind, generation }).is_err() || !repeat {
                    break;
                }
            }
        });

        self.tasks.insert(kind, handle);
    }

    fn cancel(&mut self, kind: TimerKind) {
        if let Some(handle) = self.tasks.remove(&kind) {
            handle.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }
}

/// A timer registered with a [`ManualScheduler`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledTimer {
    pub generation: u64,
    pub period: Duration,
    pub repeat: bool,
}

/// Deterministic scheduler: records timers and fires them on request.
///
/// Clones share state, so a test keeps one handle while the session owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    timers: Rc<RefCell<HashMap<TimerKind, ScheduledTimer>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the tick event a live timer would deliver next.
    ///
    /// One-shot timers are consumed by firing.
    pub fn fire(&self, kind: TimerKind) -> Option<SessionEvent> {
        let mut timers = self.timers.borrow_mut();
        let timer = *timers.get(&kind)?;
        if !timer.repeat {
            timers.remove(&kind);
        }
        Some(SessionEvent::Timer {
            kind,
            generation: timer.generation,
        })
    }

    pub fn is_active(&self, kind: TimerKind) -> bool {
        self.timers.borrow().contains_key(&kind)
    }

    pub fn timer(&self, kind: TimerKind) -> Option<ScheduledTimer> {
        self.timers.borrow().get(&kind).copied()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, kind: TimerKind, generation: u64, period: Duration, repeat: bool) {
        self.timers.borrow_mut().insert(
            kind,
            ScheduledTimer {
                generation,
                period,
                repeat,
            },
        );
    }

    fn cancel(&mut self, kind: TimerKind) {
        self.timers.borrow_mut().remove(&kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_slot_rejects_stale_generation() {
        let mut scheduler = ManualScheduler::new();
        let mut slot = TimerSlot::new(TimerKind::Progress);

        slot.start(&mut scheduler, Duration::from_millis(500), true);
        let stale = scheduler.fire(TimerKind::Progress).unwrap();
        slot.start(&mut scheduler, Duration::from_millis(500), true);

        let SessionEvent::Timer { generation, .. } = stale else {
            panic!("expected timer event");
        };
        assert!(!slot.accept(generation));
        assert!(slot.accept(generation + 1));
        assert!(slot.is_active());
    }

    #[test]
    fn test_one_shot_slot_accepts_once() {
        let mut scheduler = ManualScheduler::new();
        let mut slot = TimerSlot::new(TimerKind::VisibilitySettle);

        slot.start(&mut scheduler, Duration::from_millis(300), false);
        assert!(slot.accept(1));
        assert!(!slot.accept(1));
        assert!(!slot.is_active());
    }

    #[test]
    fn test_stop_cancels_timer() {
        let mut scheduler = ManualScheduler::new();
        let mut slot = TimerSlot::new(TimerKind::AdWatch);

        slot.start(&mut scheduler, Duration::from_millis(700), true);
        assert!(scheduler.is_active(TimerKind::AdWatch));

        slot.stop(&mut scheduler);
        assert!(!scheduler.is_active(TimerKind::AdWatch));
        assert!(scheduler.fire(TimerKind::AdWatch).is_none());

        // Stopping twice is harmless
        slot.stop(&mut scheduler);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_ticks_and_cancels() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = TokioScheduler::new(tx);

        scheduler.schedule(TimerKind::Progress, 7, Duration::from_millis(500), true);

        for _ in 0..2 {
            match rx.recv().await {
                Some(SessionEvent::Timer { kind, generation }) => {
                    assert_eq!(kind, TimerKind::Progress);
                    assert_eq!(generation, 7);
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }

        scheduler.cancel(TimerKind::Progress);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_one_shot() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = TokioScheduler::new(tx);

        scheduler.schedule(TimerKind::VisibilitySettle, 1, Duration::from_millis(300), false);
        assert!(matches!(
            rx.recv().await,
            Some(SessionEvent::Timer { kind: TimerKind::VisibilitySettle, generation: 1 })
        ));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());
    }
}
