//! SynthContext — a pure-Rust output device.
//!
//! Voices are scheduled on a sample clock and rendered on demand, so the
//! same code feeds an AudioWorklet (via WASM) and the offline WAV renderer.

use crate::error::{AudioError, Result};
use crate::output::{AudioBackend, ContextState};
use crate::voice::{Source, VoiceId, VoiceSpec};

use super::automation::ParamTimeline;
use super::filter::BiquadFilter;
use super::mixer::Mixer;
use super::noise::WhiteNoise;
use super::oscillator::Oscillator;

/// The sounding part of a scheduled voice.
enum Generator {
    Tone {
        oscillator: Oscillator,
        frequency: ParamTimeline,
    },
    Noise {
        noise: WhiteNoise,
        filter: Option<BiquadFilter>,
    },
}

impl Generator {
    fn next_sample(&mut self, t: f64) -> f64 {
        match self {
            Generator::Tone {
                oscillator,
                frequency,
            } => {
                oscillator.frequency = frequency.value_at(t);
                oscillator.next_sample()
            }
            Generator::Noise { noise, filter } => {
                let s = noise.next_sample();
                match filter {
                    Some(f) => f.process(s),
                    None => s,
                }
            }
        }
    }
}

struct ScheduledVoice {
    id: VoiceId,
    generator: Generator,
    gain: ParamTimeline,
    start_frame: u64,
    stop_frame: u64,
}

/// Lowest rate a browser `AudioContext` accepts.
pub const MIN_SAMPLE_RATE: u32 = 3000;

pub struct SynthContext {
    sample_rate: f64,
    frame: u64,
    state: ContextState,
    voices: Vec<ScheduledVoice>,
    ended: Vec<VoiceId>,
    mixer: Mixer,
}

impl SynthContext {
    /// A new context starts suspended, like a browser `AudioContext` created
    /// before any user gesture.
    pub fn new(sample_rate: u32, master_gain: f64) -> Result<Self> {
        if sample_rate < MIN_SAMPLE_RATE {
            return Err(AudioError::Unavailable(format!(
                "sample rate {sample_rate} Hz is below {MIN_SAMPLE_RATE} Hz"
            )));
        }
        Ok(SynthContext {
            sample_rate: sample_rate as f64,
            frame: 0,
            state: ContextState::Suspended,
            voices: Vec::new(),
            ended: Vec::new(),
            mixer: Mixer::new(master_gain),
        })
    }

    /// Freeze the clock and go silent, e.g. while the page is hidden. The
    /// next sound request resumes it.
    pub fn suspend(&mut self) {
        self.state = ContextState::Suspended;
    }

    /// Voices scheduled and not yet past their stop time.
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    fn to_frame(&self, seconds: f64) -> u64 {
        (seconds * self.sample_rate).round().max(0.0) as u64
    }

    /// Render `frames` mono samples. While suspended the output is silent and
    /// the clock does not move.
    pub fn render(&mut self, frames: usize) -> Vec<f32> {
        if self.state == ContextState::Suspended {
            return vec![0.0; frames];
        }

        self.mixer.clear(frames);
        let block_start = self.frame;
        let block_end = block_start + frames as u64;

        for voice in &mut self.voices {
            let from = voice.start_frame.max(block_start);
            let to = voice.stop_frame.min(block_end);
            for f in from..to {
                let t = f as f64 / self.sample_rate;
                let s = voice.generator.next_sample(t) * voice.gain.value_at(t);
                self.mixer.add((f - block_start) as usize, s);
            }
        }

        self.frame = block_end;
        let ended = &mut self.ended;
        self.voices.retain(|v| {
            let done = v.stop_frame <= block_end;
            if done {
                ended.push(v.id);
            }
            !done
        });

        self.mixer.output()
    }
}

impl AudioBackend for SynthContext {
    fn current_time(&self) -> f64 {
        self.frame as f64 / self.sample_rate
    }

    fn state(&self) -> ContextState {
        self.state
    }

    fn resume(&mut self) -> Result<()> {
        self.state = ContextState::Running;
        Ok(())
    }

    fn start_voice(&mut self, id: VoiceId, start_time: f64, spec: &VoiceSpec) -> Result<()> {
        spec.validate()?;

        let generator = match spec.source {
            Source::Tone { waveform, .. } => Generator::Tone {
                oscillator: Oscillator::new(waveform, self.sample_rate),
                frequency: spec
                    .frequency_timeline(start_time)
                    .ok_or_else(|| AudioError::InvalidVoice("tone without pitch".into()))?,
            },
            Source::Noise { filter } => Generator::Noise {
                noise: WhiteNoise::new(),
                filter: filter.map(|nf| BiquadFilter::new(nf.kind, nf.frequency, nf.q, self.sample_rate)),
            },
        };

        let start_frame = self.to_frame(start_time).max(self.frame);
        let stop_frame = self.to_frame(start_time + spec.duration).max(start_frame + 1);
        self.voices.push(ScheduledVoice {
            id,
            generator,
            gain: spec.gain_timeline(start_time),
            start_frame,
            stop_frame,
        });
        Ok(())
    }

    fn stop_voice(&mut self, id: VoiceId) -> Result<()> {
        let idx = self
            .voices
            .iter()
            .position(|v| v.id == id)
            .ok_or(AudioError::UnknownVoice(id))?;
        self.voices.swap_remove(idx);
        Ok(())
    }

    fn drain_ended(&mut self) -> Vec<VoiceId> {
        std::mem::take(&mut self.ended)
    }
}
