//! Test doubles for the audio device.

use std::collections::BTreeSet;

use crate::error::{AudioError, Result};
use crate::output::{AudioBackend, ContextState};
use crate::voice::{VoiceId, VoiceSpec};

/// One `start_voice` call as the backend saw it.
#[derive(Debug, Clone)]
pub struct StartedVoice {
    pub id: VoiceId,
    pub start_time: f64,
    pub spec: VoiceSpec,
}

/// A fake device that records every call and produces no sound.
///
/// Its clock only moves through `advance_to`, which also ends voices whose
/// stop time has passed, the way a real device fires `ended`.
#[derive(Debug)]
pub struct RecordingBackend {
    pub now: f64,
    pub state: ContextState,
    pub fail_resume: bool,
    pub fail_start: bool,
    pub resumes: usize,
    pub started: Vec<StartedVoice>,
    pub stopped: Vec<VoiceId>,
    live: BTreeSet<VoiceId>,
    ended: Vec<VoiceId>,
}

impl RecordingBackend {
    pub fn running() -> Self {
        RecordingBackend {
            now: 0.0,
            state: ContextState::Running,
            fail_resume: false,
            fail_start: false,
            resumes: 0,
            started: Vec::new(),
            stopped: Vec::new(),
            live: BTreeSet::new(),
            ended: Vec::new(),
        }
    }

    pub fn suspended() -> Self {
        RecordingBackend {
            state: ContextState::Suspended,
            ..Self::running()
        }
    }

    /// Voices started and neither stopped nor naturally ended.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn advance_to(&mut self, t: f64) {
        self.now = t;
        for v in &self.started {
            if v.start_time + v.spec.duration <= t && self.live.remove(&v.id) {
                self.ended.push(v.id);
            }
        }
    }

    /// Device start times of every voice started so far, in order.
    pub fn start_times(&self) -> Vec<f64> {
        self.started.iter().map(|v| v.start_time).collect()
    }
}

impl AudioBackend for RecordingBackend {
    fn current_time(&self) -> f64 {
        self.now
    }

    fn state(&self) -> ContextState {
        self.state
    }

    fn resume(&mut self) -> Result<()> {
        if self.fail_resume {
            return Err(AudioError::ResumeFailed("blocked by autoplay policy".into()));
        }
        self.resumes += 1;
        self.state = ContextState::Running;
        Ok(())
    }

    fn start_voice(&mut self, id: VoiceId, start_time: f64, spec: &VoiceSpec) -> Result<()> {
        if self.fail_start {
            return Err(AudioError::InvalidVoice("oscillator construction failed".into()));
        }
        self.started.push(StartedVoice {
            id,
            start_time,
            spec: *spec,
        });
        self.live.insert(id);
        Ok(())
    }

    fn stop_voice(&mut self, id: VoiceId) -> Result<()> {
        if !self.live.remove(&id) {
            return Err(AudioError::UnknownVoice(id));
        }
        self.stopped.push(id);
        Ok(())
    }

    fn drain_ended(&mut self) -> Vec<VoiceId> {
        std::mem::take(&mut self.ended)
    }
}
