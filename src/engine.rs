//! SoundEngine — the public face of the audio system.
//!
//! Game code calls these methods at lifecycle points (answer checked, timer
//! nearly out, screen left) and never learns whether sound actually played.

use std::time::Duration;

use log::{debug, trace};

use crate::config::EngineConfig;
use crate::effects::Effect;
use crate::heartbeat::HeartbeatLoop;
use crate::music::{step_voices, BackgroundMusic, MusicMode, MusicStart};
use crate::output::{AudioBackend, OutputContext};
use crate::timer::{TaskKind, Timers};
use crate::voice::{VoiceFactory, VoiceOwner, VoiceSpec};

/// Longest stretch one `advance` plays through. Anything older, such as the
/// time a tab spent in the background, is skipped rather than replayed.
pub const MAX_CATCH_UP: Duration = Duration::from_secs(10);

pub struct SoundEngine<B> {
    voices: VoiceFactory<B>,
    timers: Timers,
    heartbeat: HeartbeatLoop,
    music: BackgroundMusic,
}

impl<B: AudioBackend> SoundEngine<B> {
    pub fn new(output: OutputContext<B>) -> Self {
        SoundEngine {
            voices: VoiceFactory::new(output),
            timers: Timers::new(),
            heartbeat: HeartbeatLoop::new(),
            music: BackgroundMusic::new(),
        }
    }

    pub fn with_config(output: OutputContext<B>, config: &EngineConfig) -> Self {
        let mut engine = Self::new(output);
        engine.voices.set_muted(config.start_muted);
        engine
    }

    // ── One-shot effects ────────────────────────────────────

    pub fn click(&mut self) {
        self.play_effect(Effect::Click);
    }

    pub fn correct(&mut self) {
        self.play_effect(Effect::Correct);
    }

    pub fn wrong(&mut self) {
        self.play_effect(Effect::Wrong);
    }

    pub fn tick(&mut self) {
        self.play_effect(Effect::Tick);
    }

    pub fn heartbeat_unit(&mut self) {
        self.play_effect(Effect::HeartbeatUnit);
    }

    pub fn light_beep(&mut self) {
        self.play_effect(Effect::LightBeep);
    }

    pub fn go_burst(&mut self) {
        self.play_effect(Effect::GoBurst);
    }

    pub fn false_start(&mut self) {
        self.play_effect(Effect::FalseStart);
    }

    pub fn fanfare(&mut self) {
        self.play_effect(Effect::Fanfare);
    }

    /// Fire-and-forget any effect.
    pub fn play_effect(&mut self, effect: Effect) {
        self.voices.collect_ended();
        self.voices.play_group(VoiceOwner::Effect, &effect.recipe());
    }

    // ── Heartbeat loop ──────────────────────────────────────

    /// Beat now and every 800 ms until stopped. No-op if already beating
    /// or muted.
    pub fn start_heartbeat_loop(&mut self) {
        if self.muted() {
            return;
        }
        if self.heartbeat.start(&mut self.timers) {
            debug!("heartbeat loop started");
            self.play_heartbeat(0.0);
        }
    }

    /// Stop future beats; a beat already sounding finishes.
    pub fn stop_heartbeat_loop(&mut self) {
        if self.heartbeat.stop(&mut self.timers) {
            debug!("heartbeat loop stopped");
        }
    }

    fn play_heartbeat(&mut self, offset: f64) {
        self.voices.collect_ended();
        self.voices
            .play_group(VoiceOwner::Heartbeat, &shifted(Effect::HeartbeatUnit.recipe(), offset));
    }

    // ── Background music ────────────────────────────────────

    /// Switch the background loop to `mode`. Re-requesting the current mode
    /// keeps it playing undisturbed. No-op while muted.
    pub fn start_background_music(&mut self, mode: MusicMode) {
        if self.muted() {
            return;
        }
        match self.music.start(mode, &mut self.timers) {
            MusicStart::AlreadyPlaying => return,
            MusicStart::Switched { from } => {
                debug!("background music {from:?} -> {mode:?}");
                self.voices.stop_owned_by(VoiceOwner::Music);
            }
            MusicStart::Started => debug!("background music {mode:?} started"),
        }
        self.play_music_step(mode, 0, 0.0);
    }

    /// Stop the loop and cut every voice it is still sounding.
    pub fn stop_background_music(&mut self) {
        if let Some(mode) = self.music.stop(&mut self.timers) {
            debug!("background music {mode:?} stopped");
        }
        self.voices.stop_owned_by(VoiceOwner::Music);
    }

    fn play_music_step(&mut self, mode: MusicMode, step: u64, offset: f64) {
        trace!("music {mode:?} step {step} at +{offset:.3}s");
        self.voices.collect_ended();
        self.voices
            .play_group(VoiceOwner::Music, &shifted(step_voices(mode, step), offset));
    }

    // ── Mute and teardown ───────────────────────────────────

    pub fn muted(&self) -> bool {
        self.voices.is_muted()
    }

    /// Flip mute; muting silences everything immediately. Returns the new state.
    pub fn toggle_mute(&mut self) -> bool {
        let muted = !self.muted();
        self.voices.set_muted(muted);
        debug!("muted: {muted}");
        if muted {
            self.stop_all();
        }
        muted
    }

    /// Stop both loops and cut every tracked voice.
    pub fn stop_all(&mut self) {
        self.stop_heartbeat_loop();
        self.stop_background_music();
        self.voices.stop_all();
    }

    // ── Time ────────────────────────────────────────────────

    /// Let `dt` pass on the loop clock, playing every heartbeat and music
    /// step that falls due, and apply voice-ended events from the device.
    ///
    /// Firings keep their spacing on the device clock: one due `x` into the
    /// window is scheduled `x` after the device's current time. Only the
    /// last `MAX_CATCH_UP` of a long window is played.
    pub fn advance(&mut self, dt: Duration) {
        let until = self.timers.now().saturating_add(dt);
        if dt > MAX_CATCH_UP {
            let skipped = dt - MAX_CATCH_UP;
            debug!("skipping {skipped:?} of missed loop firings");
            self.timers.skip_to(until - MAX_CATCH_UP);
        }
        let window_start = self.timers.now();
        self.voices.collect_ended();

        while let Some((_, kind)) = self.timers.pop_due(until) {
            let offset = (self.timers.now() - window_start).as_secs_f64();
            match kind {
                TaskKind::Heartbeat => self.play_heartbeat(offset),
                TaskKind::MusicStep => {
                    if let Some((mode, step)) = self.music.next_step() {
                        self.play_music_step(mode, step, offset);
                    }
                }
            }
        }

        self.timers.settle(until);
        self.voices.collect_ended();
    }

    // ── Inspection ──────────────────────────────────────────

    pub fn heartbeat_running(&self) -> bool {
        self.heartbeat.is_running()
    }

    pub fn background_mode(&self) -> Option<MusicMode> {
        self.music.mode()
    }

    /// Most recently played step of the background loop.
    pub fn background_step(&self) -> Option<u64> {
        self.music.step()
    }

    /// Voices started and not yet ended or cut off.
    pub fn active_voice_count(&self) -> usize {
        self.voices.active_count()
    }

    pub fn active_voice_count_of(&self, owner: VoiceOwner) -> usize {
        self.voices.active_count_of(owner)
    }

    /// Apply pending voice-ended events without moving the loop clock.
    pub fn collect_ended(&mut self) {
        self.voices.collect_ended();
    }

    /// The device, if a sound request has opened it.
    pub fn backend(&self) -> Option<&B> {
        self.voices.backend()
    }

    pub fn backend_mut(&mut self) -> Option<&mut B> {
        self.voices.backend_mut()
    }
}

fn shifted(specs: Vec<VoiceSpec>, offset: f64) -> Vec<VoiceSpec> {
    specs.into_iter().map(|v| v.later(offset)).collect()
}
