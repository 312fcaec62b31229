//! Output context — the lazily created handle to the audio device.

use log::debug;

use crate::error::Result;
use crate::voice::{VoiceId, VoiceSpec};

/// Running state of an initialized output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Created but not producing audio (browser autoplay or power policy).
    Suspended,
    Running,
}

/// The platform seam: anything that can schedule and cancel voices on its
/// own clock. The built-in implementation is `dsp::context::SynthContext`.
pub trait AudioBackend {
    /// Current time on the device clock, in seconds.
    fn current_time(&self) -> f64;

    fn state(&self) -> ContextState;

    fn resume(&mut self) -> Result<()>;

    /// Schedule `spec` to sound from `start_time` until
    /// `start_time + spec.duration` (device clock seconds).
    fn start_voice(&mut self, id: VoiceId, start_time: f64, spec: &VoiceSpec) -> Result<()>;

    /// Cut a voice off immediately. Fails with `UnknownVoice` if it already ended.
    fn stop_voice(&mut self, id: VoiceId) -> Result<()>;

    /// Voices that reached their stop time since the last call.
    fn drain_ended(&mut self) -> Vec<VoiceId>;
}

type Factory<B> = Box<dyn FnMut() -> Result<B>>;

/// Singleton device handle, created on first use and never torn down.
pub struct OutputContext<B> {
    factory: Factory<B>,
    backend: Option<B>,
}

impl<B: AudioBackend> OutputContext<B> {
    /// A handle that opens the device with `factory` on the first `acquire`.
    /// A failed open is retried on the next sound request.
    pub fn new(factory: impl FnMut() -> Result<B> + 'static) -> Self {
        OutputContext {
            factory: Box::new(factory),
            backend: None,
        }
    }

    /// Return the device, opening it if needed and resuming it if suspended.
    ///
    /// `None` means audio is unavailable right now; the failure has already
    /// been logged and callers just skip the sound.
    pub fn acquire(&mut self) -> Option<&mut B> {
        if self.backend.is_none() {
            match (self.factory)() {
                Ok(backend) => self.backend = Some(backend),
                Err(e) => {
                    debug!("audio output unavailable: {e}");
                    return None;
                }
            }
        }

        let backend = self.backend.as_mut()?;
        if backend.state() == ContextState::Suspended {
            if let Err(e) = backend.resume() {
                debug!("audio output stays suspended: {e}");
                return None;
            }
        }
        Some(backend)
    }

    pub fn is_initialized(&self) -> bool {
        self.backend.is_some()
    }

    /// The device if it was ever opened. Never opens or resumes it.
    pub fn get(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut B> {
        self.backend.as_mut()
    }
}
