//! Background audio module for TuneFlow
//!
//! Platforms reclaim the audio session of an app whose visible media is
//! paused or hidden. The [`KeepAlive`] loops a silent signal through the
//! host's low-level audio graph so the session stays active while the
//! embedded player keeps producing sound.

#[cfg(feature = "native-audio")]
mod cpal_backend;
mod keep_alive;

#[cfg(feature = "native-audio")]
pub use cpal_backend::CpalBackend;
pub use keep_alive::KeepAlive;

use crate::utils::error::Result;

/// Low-level audio graph provider
pub trait AudioBackend {
    /// Construct the processing context.
    ///
    /// Platforms may only allow this in response to a user gesture, so it is
    /// called lazily from the first user-initiated play.
    fn create_context(&mut self) -> Result<Box<dyn AudioContext>>;
}

/// Lifecycle of an audio processing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Running,
    /// Suspended by the platform (e.g. after backgrounding)
    Suspended,
    Closed,
}

/// An audio processing context connected to the output device
pub trait AudioContext {
    /// Current context state
    fn state(&self) -> ContextState;

    /// Ask the platform to resume a suspended context
    fn resume(&mut self) -> Result<()>;

    /// Build a looping zero-amplitude source and connect it to the output
    fn start_silence(&mut self) -> Result<Box<dyn SignalSource>>;
}

/// A running signal source
pub trait SignalSource {
    /// Stop the source and detach it from the graph
    fn disconnect(&mut self);

    /// `false` once the platform has torn the source down underneath us
    fn is_alive(&self) -> bool {
        true
    }
}
