//! Background music sequencer.
//!
//! Two looping modes, each a fixed note sequence stepped on a fixed
//! interval. Lobby plucks a bright arpeggio over four chords; suspense pulses
//! a low sine drone with an occasional high shimmer on top.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dsp::filter::FilterType;
use crate::dsp::oscillator::Waveform;
use crate::timer::{TaskId, TaskKind, Timers};
use crate::voice::{NoiseFilter, VoiceSpec};

/// C major, G major, A minor, F major arpeggios.
pub const LOBBY_SEQUENCE: [f64; 16] = [
    261.63, 329.63, 392.00, 523.25, // C4 E4 G4 C5
    196.00, 246.94, 293.66, 392.00, // G3 B3 D4 G4
    220.00, 261.63, 329.63, 440.00, // A3 C4 E4 A4
    174.61, 220.00, 261.63, 349.23, // F3 A3 C4 F4
];

/// Bass pulses on A, E, C, D in two registers.
pub const SUSPENSE_SEQUENCE: [f64; 8] = [
    55.00, 82.41, 65.41, 73.42, // A1 E2 C2 D2
    110.00, 82.41, 130.81, 146.83, // A2 E2 C3 D3
];

const LOBBY_STEP: Duration = Duration::from_millis(250);
const SUSPENSE_STEP: Duration = Duration::from_millis(1500);

// Plucked string.
const PLUCK_VOLUME: f64 = 0.06;
const PLUCK_ATTACK: f64 = 0.01;
const PLUCK_DECAY: f64 = 3.0;
const PLUCK_HARMONIC_VOLUME: f64 = 0.02;
const PLUCK_HARMONIC_DECAY: f64 = 2.0;
const PLUCK_NOISE_VOLUME: f64 = 0.03;
const PLUCK_NOISE_LENGTH: f64 = 0.02;

// Suspense drone.
const DRONE_VOLUME: f64 = 0.12;
const DRONE_ATTACK: f64 = 0.2;
const DRONE_DECAY: f64 = 4.0;
const SHIMMER_EVERY: u64 = 4;
const SHIMMER_VOLUME: f64 = 0.015;
const SHIMMER_ATTACK: f64 = 1.0;
const SHIMMER_DECAY: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MusicMode {
    Lobby,
    Suspense,
}

impl MusicMode {
    pub fn from_name(name: &str) -> Option<MusicMode> {
        match name {
            "lobby" => Some(MusicMode::Lobby),
            "suspense" => Some(MusicMode::Suspense),
            _ => None,
        }
    }

    pub fn sequence(self) -> &'static [f64] {
        match self {
            MusicMode::Lobby => &LOBBY_SEQUENCE,
            MusicMode::Suspense => &SUSPENSE_SEQUENCE,
        }
    }

    pub fn step_interval(self) -> Duration {
        match self {
            MusicMode::Lobby => LOBBY_STEP,
            MusicMode::Suspense => SUSPENSE_STEP,
        }
    }

    /// Frequency played at `step` (the cursor wraps around the sequence).
    pub fn frequency_at(self, step: u64) -> f64 {
        let seq = self.sequence();
        seq[(step % seq.len() as u64) as usize]
    }
}

/// Voices for one sequencer step.
pub fn step_voices(mode: MusicMode, step: u64) -> Vec<VoiceSpec> {
    let freq = mode.frequency_at(step);
    match mode {
        MusicMode::Lobby => pluck(freq),
        MusicMode::Suspense => drone(freq, step % SHIMMER_EVERY == 0),
    }
}

/// Triangle fundamental, a quieter octave that dies sooner, and a short
/// band-passed noise tick for the pick attack.
fn pluck(freq: f64) -> Vec<VoiceSpec> {
    vec![
        VoiceSpec::tone(Waveform::Triangle, freq, PLUCK_DECAY, PLUCK_VOLUME).with_attack(PLUCK_ATTACK),
        VoiceSpec::tone(Waveform::Triangle, freq * 2.0, PLUCK_DECAY, PLUCK_HARMONIC_VOLUME)
            .with_attack(PLUCK_ATTACK)
            .with_decay(PLUCK_HARMONIC_DECAY),
        VoiceSpec::noise(
            Some(NoiseFilter {
                kind: FilterType::Bandpass,
                frequency: freq * 4.0,
                q: 1.0,
            }),
            PLUCK_NOISE_LENGTH,
            PLUCK_NOISE_VOLUME,
        ),
    ]
}

fn drone(freq: f64, shimmer: bool) -> Vec<VoiceSpec> {
    let mut voices = vec![
        VoiceSpec::tone(Waveform::Sine, freq, DRONE_DECAY, DRONE_VOLUME).with_attack(DRONE_ATTACK),
    ];
    if shimmer {
        voices.push(
            VoiceSpec::tone(Waveform::Sine, freq * 4.0, SHIMMER_DECAY, SHIMMER_VOLUME)
                .with_attack(SHIMMER_ATTACK),
        );
    }
    voices
}

#[derive(Debug, Clone, Copy)]
struct Session {
    mode: MusicMode,
    step: u64,
    task: TaskId,
}

/// Outcome of `BackgroundMusic::start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MusicStart {
    /// The requested mode was already playing; nothing changed.
    AlreadyPlaying,
    /// Started from idle.
    Started,
    /// A different mode was playing and has been cancelled. The caller must
    /// still cut that mode's voices.
    Switched { from: MusicMode },
}

/// Idle, lobby or suspense. At most one session exists.
#[derive(Debug, Default)]
pub struct BackgroundMusic {
    session: Option<Session>,
}

impl BackgroundMusic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Option<MusicMode> {
        self.session.map(|s| s.mode)
    }

    /// Index of the most recently played step.
    pub fn step(&self) -> Option<u64> {
        self.session.map(|s| s.step)
    }

    /// Begin `mode` at step 0. The caller plays step 0 right away; later
    /// steps arrive as `TaskKind::MusicStep` firings.
    pub fn start(&mut self, mode: MusicMode, timers: &mut Timers) -> MusicStart {
        let outcome = match self.session {
            Some(s) if s.mode == mode => return MusicStart::AlreadyPlaying,
            Some(s) => {
                timers.cancel(s.task);
                MusicStart::Switched { from: s.mode }
            }
            None => MusicStart::Started,
        };

        self.session = Some(Session {
            mode,
            step: 0,
            task: timers.every(mode.step_interval(), TaskKind::MusicStep),
        });
        outcome
    }

    /// Cancel the schedule and return to idle. The caller cuts the voices.
    pub fn stop(&mut self, timers: &mut Timers) -> Option<MusicMode> {
        let session = self.session.take()?;
        timers.cancel(session.task);
        Some(session.mode)
    }

    /// Move the cursor to the next step and return it.
    pub fn next_step(&mut self) -> Option<(MusicMode, u64)> {
        let session = self.session.as_mut()?;
        session.step += 1;
        Some((session.mode, session.step))
    }
}
