pub mod config;
pub mod dsp;
pub mod effects;
pub mod engine;
pub mod error;
pub mod heartbeat;
pub mod music;
pub mod output;
pub mod timer;
pub mod voice;

#[cfg(test)]
pub(crate) mod test_utils;

use std::time::Duration;

use crate::config::EngineConfig;
use crate::dsp::context::SynthContext;
use crate::effects::Effect;
use crate::engine::SoundEngine;
use crate::music::MusicMode;
use crate::output::OutputContext;
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the brainplay-audio version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// Build an engine on the built-in synthesizer.
pub fn synth_engine(config: &EngineConfig) -> SoundEngine<SynthContext> {
    let (sample_rate, master_gain) = (config.sample_rate, config.master_gain);
    SoundEngine::with_config(
        OutputContext::new(move || SynthContext::new(sample_rate, master_gain)),
        config,
    )
}

/// Longest single `WebSoundEngine::advance` step, one day. Only the last
/// `engine::MAX_CATCH_UP` of it is played anyway.
const MAX_ADVANCE_MS: f64 = 86_400_000.0;

/// WASM-exposed sound engine for the game pages.
///
/// Effects and loops are called from game code; the host's AudioWorklet
/// pulls samples with `render`, and a page timer drives `advance`.
#[wasm_bindgen]
pub struct WebSoundEngine {
    inner: SoundEngine<SynthContext>,
}

#[wasm_bindgen]
impl WebSoundEngine {
    /// `config` may be `undefined` for defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<WebSoundEngine, JsValue> {
        let config: EngineConfig = if config.is_undefined() || config.is_null() {
            EngineConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config).map_err(|e| JsValue::from_str(&format!("{e}")))?
        };
        Ok(WebSoundEngine {
            inner: synth_engine(&config),
        })
    }

    pub fn click(&mut self) {
        self.inner.click();
    }

    pub fn correct(&mut self) {
        self.inner.correct();
    }

    pub fn wrong(&mut self) {
        self.inner.wrong();
    }

    pub fn tick(&mut self) {
        self.inner.tick();
    }

    #[wasm_bindgen(js_name = heartbeat)]
    pub fn heartbeat_unit(&mut self) {
        self.inner.heartbeat_unit();
    }

    #[wasm_bindgen(js_name = lightBeep)]
    pub fn light_beep(&mut self) {
        self.inner.light_beep();
    }

    #[wasm_bindgen(js_name = goBurst)]
    pub fn go_burst(&mut self) {
        self.inner.go_burst();
    }

    #[wasm_bindgen(js_name = falseStart)]
    pub fn false_start(&mut self) {
        self.inner.false_start();
    }

    pub fn fanfare(&mut self) {
        self.inner.fanfare();
    }

    /// Play an effect by name; unknown names are ignored.
    #[wasm_bindgen(js_name = playEffect)]
    pub fn play_effect(&mut self, name: &str) {
        if let Some(effect) = Effect::from_name(name) {
            self.inner.play_effect(effect);
        }
    }

    #[wasm_bindgen(js_name = startHeartbeatLoop)]
    pub fn start_heartbeat_loop(&mut self) {
        self.inner.start_heartbeat_loop();
    }

    #[wasm_bindgen(js_name = stopHeartbeatLoop)]
    pub fn stop_heartbeat_loop(&mut self) {
        self.inner.stop_heartbeat_loop();
    }

    /// `"lobby"` or `"suspense"`; anything else is ignored.
    #[wasm_bindgen(js_name = startBackgroundMusic)]
    pub fn start_background_music(&mut self, mode: &str) {
        if let Some(mode) = MusicMode::from_name(mode) {
            self.inner.start_background_music(mode);
        }
    }

    #[wasm_bindgen(js_name = stopBackgroundMusic)]
    pub fn stop_background_music(&mut self) {
        self.inner.stop_background_music();
    }

    #[wasm_bindgen(js_name = toggleMute)]
    pub fn toggle_mute(&mut self) -> bool {
        self.inner.toggle_mute()
    }

    #[wasm_bindgen(getter)]
    pub fn muted(&self) -> bool {
        self.inner.muted()
    }

    #[wasm_bindgen(js_name = stopAll)]
    pub fn stop_all(&mut self) {
        self.inner.stop_all();
    }

    /// Let `ms` milliseconds pass on the loop clock. Negative or non-finite
    /// values are ignored.
    pub fn advance(&mut self, ms: f64) {
        if ms.is_finite() && ms > 0.0 {
            self.inner
                .advance(Duration::from_secs_f64(ms.min(MAX_ADVANCE_MS) / 1000.0));
        }
    }

    /// Silence output and freeze the device clock while the page is hidden.
    /// The next sound request resumes it.
    pub fn suspend(&mut self) {
        if let Some(ctx) = self.inner.backend_mut() {
            ctx.suspend();
        }
    }

    /// Pull `frames` mono samples for the AudioWorklet. Silence until the
    /// first sound request opens the device.
    pub fn render(&mut self, frames: usize) -> Vec<f32> {
        match self.inner.backend_mut() {
            Some(ctx) => ctx.render(frames),
            None => vec![0.0; frames],
        }
    }

    #[wasm_bindgen(js_name = activeVoiceCount)]
    pub fn active_voice_count(&self) -> usize {
        self.inner.active_voice_count()
    }
}

/// WASM-exposed: render a named effect to a mono WAV byte array.
#[wasm_bindgen]
pub fn render_effect_wav(name: &str, sample_rate: u32) -> Result<Vec<u8>, JsValue> {
    let effect =
        Effect::from_name(name).ok_or_else(|| JsValue::from_str(&format!("unknown effect '{name}'")))?;
    dsp::renderer::render_effect_wav(effect, sample_rate).map_err(|e| JsValue::from_str(&format!("{e}")))
}
