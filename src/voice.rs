//! Voices (one synthesized, time-bounded tone each) and the factory that
//! schedules them and tracks which are still sounding.

use std::collections::BTreeMap;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::dsp::automation::ParamTimeline;
use crate::dsp::filter::FilterType;
use crate::dsp::oscillator::Waveform;
use crate::error::{AudioError, Result};
use crate::output::{AudioBackend, OutputContext};

/// Gain an exponential decay aims for; exponential ramps cannot reach zero.
pub const SILENCE: f64 = 0.001;

/// Opaque handle to a scheduled voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoiceId(pub u64);

/// Which subsystem asked for a voice. Stopping background music cuts only
/// its own voices; stop-all cuts every owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceOwner {
    Effect,
    Heartbeat,
    Music,
}

/// Band-shaping for a noise source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseFilter {
    pub kind: FilterType,
    pub frequency: f64,
    pub q: f64,
}

/// What a voice sounds like before the gain envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Source {
    /// An oscillator, optionally gliding exponentially to `target_frequency`
    /// over the voice's duration.
    Tone {
        waveform: Waveform,
        frequency: f64,
        target_frequency: Option<f64>,
    },
    /// White noise, optionally filtered.
    Noise { filter: Option<NoiseFilter> },
}

/// Volume over time, relative to the voice start.
///
/// Without an attack the voice starts at `peak`; with one it rises linearly
/// from silence to `peak`. Either way it then decays exponentially to
/// `SILENCE`, arriving at `decay` seconds after the start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GainEnvelope {
    pub peak: f64,
    pub attack: Option<f64>,
    pub decay: f64,
}

/// Everything needed to schedule one voice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceSpec {
    pub source: Source,
    pub envelope: GainEnvelope,
    /// Seconds from start to hard stop.
    pub duration: f64,
    /// Seconds after the captured "now" at which the voice starts.
    pub start_offset: f64,
}

impl VoiceSpec {
    /// A plain enveloped tone: starts at `volume`, decays over `duration`.
    pub fn tone(waveform: Waveform, frequency: f64, duration: f64, volume: f64) -> Self {
        VoiceSpec {
            source: Source::Tone {
                waveform,
                frequency,
                target_frequency: None,
            },
            envelope: GainEnvelope {
                peak: volume,
                attack: None,
                decay: duration,
            },
            duration,
            start_offset: 0.0,
        }
    }

    pub fn noise(filter: Option<NoiseFilter>, duration: f64, volume: f64) -> Self {
        VoiceSpec {
            source: Source::Noise { filter },
            envelope: GainEnvelope {
                peak: volume,
                attack: None,
                decay: duration,
            },
            duration,
            start_offset: 0.0,
        }
    }

    /// Glide the pitch to `target` over the voice's duration. No effect on noise.
    pub fn glide_to(mut self, target: f64) -> Self {
        if let Source::Tone { target_frequency, .. } = &mut self.source {
            *target_frequency = Some(target);
        }
        self
    }

    pub fn delayed(mut self, offset: f64) -> Self {
        self.start_offset = offset;
        self
    }

    /// Push the voice `by` seconds past its current offset.
    pub fn later(mut self, by: f64) -> Self {
        self.start_offset += by;
        self
    }

    pub fn with_attack(mut self, attack: f64) -> Self {
        self.envelope.attack = Some(attack);
        self
    }

    /// Finish the decay earlier than the hard stop.
    pub fn with_decay(mut self, decay: f64) -> Self {
        self.envelope.decay = decay;
        self
    }

    /// Start time plus duration, relative to the captured "now".
    pub fn end_offset(&self) -> f64 {
        self.start_offset + self.duration
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(AudioError::InvalidVoice(msg));

        if !(self.duration > 0.0 && self.duration.is_finite()) {
            return invalid(format!("duration must be positive, got {}", self.duration));
        }
        let peak = self.envelope.peak;
        if !(peak > 0.0 && peak <= 1.0) {
            return invalid(format!("volume must be in (0, 1], got {peak}"));
        }
        if !(self.start_offset >= 0.0 && self.start_offset.is_finite()) {
            return invalid(format!("start offset must be >= 0, got {}", self.start_offset));
        }
        if !(self.envelope.decay > 0.0) {
            return invalid(format!("decay must be positive, got {}", self.envelope.decay));
        }
        if let Some(attack) = self.envelope.attack {
            if !(attack > 0.0 && attack < self.envelope.decay) {
                return invalid(format!("attack {attack} must be within the decay"));
            }
        }
        if let Source::Tone {
            frequency,
            target_frequency,
            ..
        } = self.source
        {
            if !(frequency > 0.0) || target_frequency.is_some_and(|f| !(f > 0.0)) {
                return invalid("frequencies must be positive".to_string());
            }
        }
        Ok(())
    }

    /// Gain automation for a voice starting at absolute time `start`.
    pub fn gain_timeline(&self, start: f64) -> ParamTimeline {
        let env = self.envelope;
        let mut gain = ParamTimeline::new(0.0);
        match env.attack {
            Some(attack) => {
                gain.set_value_at(0.0, start)
                    .linear_ramp_to(env.peak, start + attack);
            }
            None => {
                gain.set_value_at(env.peak, start);
            }
        }
        gain.exponential_ramp_to(SILENCE, start + env.decay);
        gain
    }

    /// Pitch automation for tone voices; `None` for noise.
    pub fn frequency_timeline(&self, start: f64) -> Option<ParamTimeline> {
        let Source::Tone {
            frequency,
            target_frequency,
            ..
        } = self.source
        else {
            return None;
        };
        let mut freq = ParamTimeline::new(frequency);
        freq.set_value_at(frequency, start);
        if let Some(target) = target_frequency {
            freq.exponential_ramp_to(target, start + self.duration);
        }
        Some(freq)
    }
}

#[derive(Debug, Clone, Copy)]
struct VoiceEntry {
    owner: VoiceOwner,
}

/// Arena of voices that were started and have not ended yet.
#[derive(Debug, Default)]
pub struct VoiceRegistry {
    voices: BTreeMap<VoiceId, VoiceEntry>,
    next_id: u64,
}

impl VoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out a fresh id. Ids are never reused.
    fn allocate(&mut self) -> VoiceId {
        let id = VoiceId(self.next_id);
        self.next_id += 1;
        id
    }

    fn insert(&mut self, id: VoiceId, owner: VoiceOwner) {
        self.voices.insert(id, VoiceEntry { owner });
    }

    pub fn remove(&mut self, id: VoiceId) -> bool {
        self.voices.remove(&id).is_some()
    }

    pub fn contains(&self, id: VoiceId) -> bool {
        self.voices.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn count_of(&self, owner: VoiceOwner) -> usize {
        self.voices.values().filter(|v| v.owner == owner).count()
    }

    fn take_owned_by(&mut self, owner: VoiceOwner) -> Vec<VoiceId> {
        let ids: Vec<VoiceId> = self
            .voices
            .iter()
            .filter(|(_, v)| v.owner == owner)
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            self.voices.remove(id);
        }
        ids
    }

    fn take_all(&mut self) -> Vec<VoiceId> {
        std::mem::take(&mut self.voices).into_keys().collect()
    }
}

/// Builds voices on the output device and keeps the active-voice set.
///
/// Every failure is swallowed here: a voice that cannot be scheduled simply
/// does not sound.
pub struct VoiceFactory<B> {
    output: OutputContext<B>,
    registry: VoiceRegistry,
    muted: bool,
}

impl<B: AudioBackend> VoiceFactory<B> {
    pub fn new(output: OutputContext<B>) -> Self {
        VoiceFactory {
            output,
            registry: VoiceRegistry::new(),
            muted: false,
        }
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Only the engine facade flips mute.
    pub(crate) fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Schedule one tone relative to the device's current time.
    #[allow(clippy::too_many_arguments)]
    pub fn play(
        &mut self,
        owner: VoiceOwner,
        waveform: Waveform,
        start_frequency: f64,
        duration: f64,
        volume: f64,
        target_frequency: Option<f64>,
        start_offset: f64,
    ) -> Option<VoiceId> {
        let mut spec = VoiceSpec::tone(waveform, start_frequency, duration, volume).delayed(start_offset);
        if let Some(target) = target_frequency {
            spec = spec.glide_to(target);
        }
        self.start_all(owner, std::slice::from_ref(&spec)).pop()
    }

    /// Schedule several voices against a single capture of "now" so their
    /// relative offsets hold exactly. Returns how many were started.
    pub fn play_group(&mut self, owner: VoiceOwner, specs: &[VoiceSpec]) -> usize {
        self.start_all(owner, specs).len()
    }

    fn start_all(&mut self, owner: VoiceOwner, specs: &[VoiceSpec]) -> Vec<VoiceId> {
        if self.muted || specs.is_empty() {
            return Vec::new();
        }
        let Some(backend) = self.output.acquire() else {
            return Vec::new();
        };

        let now = backend.current_time();
        let mut started = Vec::with_capacity(specs.len());
        for spec in specs {
            let id = self.registry.allocate();
            let result = spec
                .validate()
                .and_then(|()| backend.start_voice(id, now + spec.start_offset, spec));
            match result {
                Ok(()) => {
                    self.registry.insert(id, owner);
                    started.push(id);
                }
                Err(e) => debug!("voice {id:?} not started: {e}"),
            }
        }
        started
    }

    /// Cut off every voice started by `owner`.
    pub fn stop_owned_by(&mut self, owner: VoiceOwner) {
        let ids = self.registry.take_owned_by(owner);
        self.stop_ids(&ids);
    }

    /// Cut off every tracked voice and empty the set.
    pub fn stop_all(&mut self) {
        let ids = self.registry.take_all();
        self.stop_ids(&ids);
    }

    fn stop_ids(&mut self, ids: &[VoiceId]) {
        let Some(backend) = self.output.get_mut() else {
            return;
        };
        for &id in ids {
            if let Err(e) = backend.stop_voice(id) {
                trace!("skipping stop of {id:?}: {e}");
            }
        }
    }

    /// Apply the device's "voice ended" events to the active set.
    pub fn collect_ended(&mut self) {
        let Some(backend) = self.output.get_mut() else {
            return;
        };
        for id in backend.drain_ended() {
            self.registry.remove(id);
        }
    }

    pub fn active_count(&self) -> usize {
        self.registry.len()
    }

    pub fn active_count_of(&self, owner: VoiceOwner) -> usize {
        self.registry.count_of(owner)
    }

    pub fn is_active(&self, id: VoiceId) -> bool {
        self.registry.contains(id)
    }

    pub fn backend(&self) -> Option<&B> {
        self.output.get()
    }

    pub fn backend_mut(&mut self) -> Option<&mut B> {
        self.output.get_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingBackend;

    fn factory() -> VoiceFactory<RecordingBackend> {
        VoiceFactory::new(OutputContext::new(|| Ok(RecordingBackend::running())))
    }

    #[test]
    fn play_registers_and_schedules() {
        let mut f = factory();
        let id = f
            .play(VoiceOwner::Effect, Waveform::Sine, 1000.0, 0.05, 0.1, None, 0.0)
            .unwrap();
        assert!(f.is_active(id));
        assert_eq!(f.active_count(), 1);

        let backend = f.backend().unwrap();
        assert_eq!(backend.started.len(), 1);
        assert_eq!(backend.started[0].id, id);
    }

    #[test]
    fn natural_end_removes_from_set() {
        let mut f = factory();
        f.play(VoiceOwner::Effect, Waveform::Sine, 800.0, 0.03, 0.05, None, 0.0);
        f.play(VoiceOwner::Effect, Waveform::Sine, 800.0, 1.0, 0.05, None, 0.0);

        f.backend_mut().unwrap().advance_to(0.5);
        f.collect_ended();
        assert_eq!(f.active_count(), 1);

        f.backend_mut().unwrap().advance_to(2.0);
        f.collect_ended();
        assert_eq!(f.active_count(), 0);
    }

    #[test]
    fn group_shares_one_now() {
        let mut f = factory();
        let specs = [
            VoiceSpec::tone(Waveform::Sine, 523.25, 0.15, 0.2),
            VoiceSpec::tone(Waveform::Sine, 783.99, 0.15, 0.2).delayed(0.08),
        ];
        f.play_group(VoiceOwner::Effect, &specs[..1]);
        f.backend_mut().unwrap().advance_to(1.25);
        assert_eq!(f.play_group(VoiceOwner::Effect, &specs), 2);

        let started = &f.backend().unwrap().started;
        assert!((started[1].start_time - 1.25).abs() < 1e-12);
        assert!((started[2].start_time - started[1].start_time - 0.08).abs() < 1e-12);
    }

    #[test]
    fn muted_factory_schedules_nothing() {
        let mut f = factory();
        f.set_muted(true);
        assert!(
            f.play(VoiceOwner::Effect, Waveform::Sine, 440.0, 0.1, 0.2, None, 0.0)
                .is_none()
        );
        assert_eq!(f.active_count(), 0);
        // Muted requests do not even open the device.
        assert!(f.backend().is_none());
    }

    #[test]
    fn invalid_voice_is_swallowed() {
        let mut f = factory();
        assert!(
            f.play(VoiceOwner::Effect, Waveform::Sine, 440.0, 0.0, 0.2, None, 0.0)
                .is_none()
        );
        assert!(
            f.play(VoiceOwner::Effect, Waveform::Sine, 440.0, 0.1, 1.5, None, 0.0)
                .is_none()
        );
        assert_eq!(f.active_count(), 0);
    }

    #[test]
    fn backend_failure_is_swallowed() {
        let mut f = VoiceFactory::new(OutputContext::new(|| {
            let mut b = RecordingBackend::running();
            b.fail_start = true;
            Ok(b)
        }));
        assert!(
            f.play(VoiceOwner::Effect, Waveform::Square, 150.0, 0.5, 0.2, None, 0.0)
                .is_none()
        );
        assert_eq!(f.active_count(), 0);
    }

    #[test]
    fn unavailable_device_is_silent() {
        let mut f: VoiceFactory<RecordingBackend> = VoiceFactory::new(OutputContext::new(|| {
            Err(AudioError::Unavailable("unsupported".into()))
        }));
        assert_eq!(
            f.play_group(VoiceOwner::Effect, &[VoiceSpec::tone(Waveform::Sine, 440.0, 0.1, 0.2)]),
            0
        );
        // Stopping with no device is fine too.
        f.stop_all();
        f.collect_ended();
    }

    #[test]
    fn stop_by_owner_leaves_others() {
        let mut f = factory();
        f.play(VoiceOwner::Music, Waveform::Triangle, 261.63, 3.0, 0.1, None, 0.0);
        f.play(VoiceOwner::Effect, Waveform::Sine, 1000.0, 0.05, 0.1, None, 0.0);

        f.stop_owned_by(VoiceOwner::Music);
        assert_eq!(f.active_count_of(VoiceOwner::Music), 0);
        assert_eq!(f.active_count_of(VoiceOwner::Effect), 1);
        assert_eq!(f.backend().unwrap().stopped.len(), 1);
    }

    #[test]
    fn stop_all_skips_already_ended() {
        let mut f = factory();
        f.play(VoiceOwner::Effect, Waveform::Sine, 800.0, 0.03, 0.05, None, 0.0);
        f.play(VoiceOwner::Effect, Waveform::Sine, 800.0, 1.0, 0.05, None, 0.0);
        // The short voice ends on the device but the event is not yet collected.
        f.backend_mut().unwrap().advance_to(0.5);

        f.stop_all();
        assert_eq!(f.active_count(), 0);
        assert_eq!(f.backend().unwrap().live_count(), 0);
    }

    #[test]
    fn envelope_timelines() {
        let spec = VoiceSpec::tone(Waveform::Triangle, 220.0, 3.0, 0.1).with_attack(0.01);
        let gain = spec.gain_timeline(10.0);
        assert_eq!(gain.value_at(10.0), 0.0);
        assert!((gain.value_at(10.01) - 0.1).abs() < 1e-12);
        assert!((gain.value_at(13.0) - SILENCE).abs() < 1e-12);

        let glide = VoiceSpec::tone(Waveform::Sine, 1200.0, 0.3, 0.3).glide_to(600.0);
        let freq = glide.frequency_timeline(0.0).unwrap();
        assert!((freq.value_at(0.3) - 600.0).abs() < 1e-9);
        assert!(VoiceSpec::noise(None, 0.02, 0.05).frequency_timeline(0.0).is_none());
    }
}
