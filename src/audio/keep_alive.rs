//! Silent keep-alive stream
//!
//! Nothing here may block playback: every failure is logged and leaves the
//! component doing nothing.

use crate::audio::{AudioBackend, AudioContext, ContextState, SignalSource};
use log::{debug, info, warn};

/// Background audio keep-alive
pub struct KeepAlive {
    /// Graph provider; `None` when the platform has no audio graph
    backend: Option<Box<dyn AudioBackend>>,

    /// Lazily constructed context
    context: Option<Box<dyn AudioContext>>,

    /// The single active silent source
    source: Option<Box<dyn SignalSource>>,

    /// Context construction failed; stay inert for the rest of the session
    inert: bool,
}

impl KeepAlive {
    pub fn new(backend: Option<Box<dyn AudioBackend>>) -> Self {
        Self {
            backend,
            context: None,
            source: None,
            inert: false,
        }
    }

    /// A keep-alive that never does anything
    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// Start the silent source. No-op while a live one is already running.
    ///
    /// Must first be called from inside a user-initiated command.
    pub fn start(&mut self) {
        if self.inert {
            return;
        }
        if self.is_running() {
            return;
        }
        self.discard_dead_source();

        if self.context.is_none() {
            let Some(backend) = self.backend.as_mut() else {
                return;
            };
            match backend.create_context() {
                Ok(context) => {
                    info!("Audio keep-alive context created");
                    self.context = Some(context);
                }
                Err(e) => {
                    warn!("Audio keep-alive unavailable, continuing without it: {}", e);
                    self.inert = true;
                    return;
                }
            }
        }

        let Some(context) = self.context.as_mut() else {
            return;
        };
        match context.start_silence() {
            Ok(source) => {
                debug!("Silent keep-alive source started");
                self.source = Some(source);
            }
            Err(e) => warn!("Failed to start silent keep-alive source: {}", e),
        }
    }

    /// Disconnect and discard the current source; idempotent
    pub fn stop(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.disconnect();
            debug!("Silent keep-alive source stopped");
        }
    }

    /// Resume a platform-suspended context and restart the source if needed
    pub fn resume(&mut self) {
        let Some(context) = self.context.as_mut() else {
            return;
        };
        if context.state() != ContextState::Suspended {
            return;
        }

        match context.resume() {
            Ok(()) => {
                debug!("Audio keep-alive context resumed");
                self.start();
            }
            Err(e) => warn!("Failed to resume audio keep-alive context: {}", e),
        }
    }

    fn discard_dead_source(&mut self) {
        if let Some(mut source) = self.source.take() {
            info!("Silent keep-alive source died, rebuilding");
            source.disconnect();
        }
    }

    pub fn is_running(&self) -> bool {
        self.source.as_ref().is_some_and(|source| source.is_alive())
    }

    pub fn is_inert(&self) -> bool {
        self.inert
    }
}

impl Drop for KeepAlive {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::{Result, TuneFlowError};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Default)]
    struct Counters {
        contexts: Cell<u32>,
        live_sources: Cell<i32>,
        state: RefCell<Option<ContextState>>,
        resume_fails: Cell<bool>,
        builds: Cell<u32>,
        last_source: RefCell<Option<Rc<Cell<bool>>>>,
    }

    struct TestBackend {
        counters: Rc<Counters>,
        fail: bool,
    }

    struct TestContext {
        counters: Rc<Counters>,
    }

    struct TestSource {
        counters: Rc<Counters>,
        alive: Rc<Cell<bool>>,
    }

    impl AudioBackend for TestBackend {
        fn create_context(&mut self) -> Result<Box<dyn AudioContext>> {
            if self.fail {
                return Err(TuneFlowError::Audio("no output device".into()));
            }
            self.counters.contexts.set(self.counters.contexts.get() + 1);
            *self.counters.state.borrow_mut() = Some(ContextState::Running);
            Ok(Box::new(TestContext { counters: Rc::clone(&self.counters) }))
        }
    }

    impl AudioContext for TestContext {
        fn state(&self) -> ContextState {
            self.counters.state.borrow().unwrap_or(ContextState::Closed)
        }

        fn resume(&mut self) -> Result<()> {
            if self.counters.resume_fails.get() {
                return Err(TuneFlowError::Audio("resume rejected".into()));
            }
            *self.counters.state.borrow_mut() = Some(ContextState::Running);
            Ok(())
        }

        fn start_silence(&mut self) -> Result<Box<dyn SignalSource>> {
            self.counters.live_sources.set(self.counters.live_sources.get() + 1);
            self.counters.builds.set(self.counters.builds.get() + 1);
            let alive = Rc::new(Cell::new(true));
            *self.counters.last_source.borrow_mut() = Some(Rc::clone(&alive));
            Ok(Box::new(TestSource { counters: Rc::clone(&self.counters), alive }))
        }
    }

    impl SignalSource for TestSource {
        fn disconnect(&mut self) {
            self.counters.live_sources.set(self.counters.live_sources.get() - 1);
        }

        fn is_alive(&self) -> bool {
            self.alive.get()
        }
    }

    /// Simulate the device dropping the running stream
    fn fault(counters: &Counters) {
        if let Some(alive) = counters.last_source.borrow().as_ref() {
            alive.set(false);
        }
        *counters.state.borrow_mut() = Some(ContextState::Suspended);
    }

    fn keep_alive(fail: bool) -> (KeepAlive, Rc<Counters>) {
        let counters = Rc::new(Counters::default());
        let backend = TestBackend { counters: Rc::clone(&counters), fail };
        (KeepAlive::new(Some(Box::new(backend))), counters)
    }

    #[test]
    fn test_double_start_keeps_one_source() {
        let (mut keep_alive, counters) = keep_alive(false);

        keep_alive.start();
        keep_alive.start();

        assert!(keep_alive.is_running());
        assert_eq!(counters.live_sources.get(), 1);
        assert_eq!(counters.contexts.get(), 1);
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let (mut keep_alive, counters) = keep_alive(false);

        keep_alive.stop();
        keep_alive.start();
        keep_alive.stop();
        keep_alive.stop();

        assert!(!keep_alive.is_running());
        assert_eq!(counters.live_sources.get(), 0);
    }

    #[test]
    fn test_context_is_reused_across_restarts() {
        let (mut keep_alive, counters) = keep_alive(false);

        keep_alive.start();
        keep_alive.stop();
        keep_alive.start();

        assert_eq!(counters.contexts.get(), 1);
        assert_eq!(counters.live_sources.get(), 1);
    }

    #[test]
    fn test_failed_context_leaves_component_inert() {
        let (mut keep_alive, counters) = keep_alive(true);

        keep_alive.start();
        keep_alive.start();
        keep_alive.resume();

        assert!(keep_alive.is_inert());
        assert!(!keep_alive.is_running());
        assert_eq!(counters.live_sources.get(), 0);
    }

    #[test]
    fn test_resume_restarts_source_after_suspension() {
        let (mut keep_alive, counters) = keep_alive(false);

        keep_alive.start();
        keep_alive.stop();
        *counters.state.borrow_mut() = Some(ContextState::Suspended);

        keep_alive.resume();
        assert!(keep_alive.is_running());
        assert_eq!(counters.live_sources.get(), 1);
    }

    #[test]
    fn test_resume_of_running_context_does_nothing() {
        let (mut keep_alive, counters) = keep_alive(false);

        keep_alive.start();
        keep_alive.stop();
        keep_alive.resume();

        assert!(!keep_alive.is_running());
        assert_eq!(counters.live_sources.get(), 0);
    }

    #[test]
    fn test_failed_resume_is_swallowed() {
        let (mut keep_alive, counters) = keep_alive(false);

        keep_alive.start();
        keep_alive.stop();
        *counters.state.borrow_mut() = Some(ContextState::Suspended);
        counters.resume_fails.set(true);

        keep_alive.resume();
        assert!(!keep_alive.is_running());
    }

    #[test]
    fn test_dead_source_is_rebuilt_on_resume() {
        let (mut keep_alive, counters) = keep_alive(false);

        keep_alive.start();
        fault(&counters);
        assert!(!keep_alive.is_running());

        keep_alive.resume();
        assert_eq!(counters.builds.get(), 2);
        assert_eq!(counters.live_sources.get(), 1);
        assert!(keep_alive.is_running());
    }

    #[test]
    fn test_dead_source_is_replaced_on_start() {
        let (mut keep_alive, counters) = keep_alive(false);

        keep_alive.start();
        if let Some(alive) = counters.last_source.borrow().as_ref() {
            alive.set(false);
        }
        keep_alive.start();

        assert_eq!(counters.builds.get(), 2);
        assert_eq!(counters.live_sources.get(), 1);
        assert!(keep_alive.is_running());
    }

    #[test]
    fn test_disabled_keep_alive() {
        let mut keep_alive = KeepAlive::disabled();
        keep_alive.start();
        keep_alive.resume();
        assert!(!keep_alive.is_running());
        assert!(!keep_alive.is_inert());
    }
}
