//! CPAL keep-alive backend for TuneFlow
//!
//! Opens the host's default output device and plays an endless stream of
//! equilibrium samples. A stream error (device unplugged, session revoked)
//! marks both the stream dead and the context suspended, so the next
//! foreground transition resumes the context and replaces the stream.

use crate::audio::{AudioBackend, AudioContext, ContextState, SignalSource};
use crate::utils::error::{IntoTuneFlowError, Result, TuneFlowError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Host, SizedSample, Stream, StreamConfig};
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// CPAL audio graph provider
pub struct CpalBackend {
    host: Host,
}

impl CpalBackend {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for CpalBackend {
    fn create_context(&mut self) -> Result<Box<dyn AudioContext>> {
        let device = self.host.default_output_device()
            .ok_or_else(|| TuneFlowError::PlatformUnsupported("No default output device found".to_string()))?;

        debug!(
            "Keep-alive output device: {}",
            device.name().unwrap_or_else(|_| "<unknown>".to_string())
        );

        Ok(Box::new(CpalContext {
            host: cpal::default_host(),
            device,
            faulted: Arc::new(AtomicBool::new(false)),
        }))
    }
}

/// Output device plus a fault flag shared with stream error callbacks
struct CpalContext {
    host: Host,
    device: Device,
    faulted: Arc<AtomicBool>,
}

impl AudioContext for CpalContext {
    fn state(&self) -> ContextState {
        if self.faulted.load(Ordering::Relaxed) {
            ContextState::Suspended
        } else {
            ContextState::Running
        }
    }

    fn resume(&mut self) -> Result<()> {
        // The default device may have changed while we were suspended
        self.device = self.host.default_output_device()
            .ok_or_else(|| TuneFlowError::Audio("No default output device found".to_string()))?;
        self.faulted.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn start_silence(&mut self) -> Result<Box<dyn SignalSource>> {
        let supported = self.device.default_output_config()
            .audio_err("Failed to query output config")?;
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.into();

        let dead = Arc::new(AtomicBool::new(false));
        let flags = StreamFlags { faulted: &self.faulted, dead: &dead };

        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_silent_stream::<f32>(&self.device, &config, flags)?,
            cpal::SampleFormat::I16 => build_silent_stream::<i16>(&self.device, &config, flags)?,
            cpal::SampleFormat::U16 => build_silent_stream::<u16>(&self.device, &config, flags)?,
            other => {
                return Err(TuneFlowError::PlatformUnsupported(format!(
                    "Unsupported output sample format {:?}",
                    other
                )));
            }
        };

        stream.play().audio_err("Failed to start silent stream")?;

        Ok(Box::new(CpalSource { stream: Some(stream), dead }))
    }
}

/// Flags a stream error callback raises
#[derive(Clone, Copy)]
struct StreamFlags<'a> {
    faulted: &'a Arc<AtomicBool>,
    dead: &'a Arc<AtomicBool>,
}

fn build_silent_stream<T: SizedSample>(
    device: &Device,
    config: &StreamConfig,
    flags: StreamFlags<'_>,
) -> Result<Stream> {
    let faulted = Arc::clone(flags.faulted);
    let dead = Arc::clone(flags.dead);

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            data.fill(T::EQUILIBRIUM);
        },
        move |err| {
            warn!("Keep-alive stream error: {}", err);
            dead.store(true, Ordering::Relaxed);
            faulted.store(true, Ordering::Relaxed);
        },
        None,
    ).audio_err("Failed to create silent stream")
}

/// A playing silent stream
struct CpalSource {
    stream: Option<Stream>,

    /// Raised by the stream's error callback
    dead: Arc<AtomicBool>,
}

impl SignalSource for CpalSource {
    fn disconnect(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                debug!("Silent stream pause failed: {}", e);
            }
        }
    }

    fn is_alive(&self) -> bool {
        self.stream.is_some() && !self.dead.load(Ordering::Relaxed)
    }
}

impl Drop for CpalSource {
    fn drop(&mut self) {
        self.disconnect();
    }
}
