//! One-shot sound effects. Each is a fixed recipe of voices whose offsets are
//! relative to a single "now", so multi-voice effects stay phase-locked.

use serde::{Deserialize, Serialize};

use crate::dsp::oscillator::Waveform;
use crate::voice::VoiceSpec;

/// C5 E5 G5 C6.
const FANFARE_NOTES: [f64; 4] = [523.25, 659.25, 783.99, 1046.50];
const FANFARE_SPACING: f64 = 0.12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Effect {
    /// UI tap.
    Click,
    /// Rising two-note chime.
    Correct,
    /// Harsh low buzz.
    Wrong,
    /// Countdown tick.
    Tick,
    /// One "lub-dub".
    HeartbeatUnit,
    /// Reaction-timer light.
    LightBeep,
    /// Downward sweep when the reaction timer says go.
    GoBurst,
    /// Pressed too early.
    FalseStart,
    /// Level complete arpeggio.
    Fanfare,
}

impl Effect {
    pub const ALL: [Effect; 9] = [
        Effect::Click,
        Effect::Correct,
        Effect::Wrong,
        Effect::Tick,
        Effect::HeartbeatUnit,
        Effect::LightBeep,
        Effect::GoBurst,
        Effect::FalseStart,
        Effect::Fanfare,
    ];

    /// Parse the camelCase name used on the JS side.
    pub fn from_name(name: &str) -> Option<Effect> {
        Some(match name {
            "click" => Effect::Click,
            "correct" => Effect::Correct,
            "wrong" => Effect::Wrong,
            "tick" => Effect::Tick,
            "heartbeat" | "heartbeatUnit" => Effect::HeartbeatUnit,
            "lightBeep" => Effect::LightBeep,
            "goBurst" => Effect::GoBurst,
            "falseStart" => Effect::FalseStart,
            "fanfare" => Effect::Fanfare,
            _ => return None,
        })
    }

    /// The voices this effect is made of.
    pub fn recipe(self) -> Vec<VoiceSpec> {
        use Waveform::*;

        match self {
            Effect::Click => vec![VoiceSpec::tone(Sine, 1000.0, 0.05, 0.1)],
            Effect::Correct => vec![
                VoiceSpec::tone(Sine, 523.25, 0.15, 0.2),
                VoiceSpec::tone(Sine, 783.99, 0.2, 0.2).delayed(0.08),
            ],
            Effect::Wrong => vec![VoiceSpec::tone(Sawtooth, 200.0, 0.25, 0.1)],
            Effect::Tick => vec![VoiceSpec::tone(Sine, 800.0, 0.03, 0.05)],
            Effect::HeartbeatUnit => vec![
                VoiceSpec::tone(Sine, 60.0, 0.1, 0.4),
                VoiceSpec::tone(Sine, 60.0, 0.1, 0.3).delayed(0.15),
            ],
            Effect::LightBeep => vec![VoiceSpec::tone(Sine, 440.0, 0.1, 0.15)],
            Effect::GoBurst => vec![VoiceSpec::tone(Sine, 1200.0, 0.3, 0.3).glide_to(600.0)],
            Effect::FalseStart => vec![VoiceSpec::tone(Square, 150.0, 0.5, 0.15)],
            Effect::Fanfare => FANFARE_NOTES
                .iter()
                .enumerate()
                .map(|(i, &freq)| {
                    VoiceSpec::tone(Sine, freq, 0.4, 0.2)
                        .with_attack(0.02)
                        .delayed(i as f64 * FANFARE_SPACING)
                })
                .collect(),
        }
    }

    /// Seconds from the trigger until the last voice stops.
    pub fn length(self) -> f64 {
        self.recipe()
            .iter()
            .map(VoiceSpec::end_offset)
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::Source;

    fn frequencies(effect: Effect) -> Vec<f64> {
        effect
            .recipe()
            .iter()
            .map(|v| match v.source {
                Source::Tone { frequency, .. } => frequency,
                Source::Noise { .. } => 0.0,
            })
            .collect()
    }

    #[test]
    fn every_recipe_is_valid() {
        for effect in Effect::ALL {
            let recipe = effect.recipe();
            assert!(!recipe.is_empty(), "{effect:?} has no voices");
            for spec in recipe {
                spec.validate().unwrap_or_else(|e| panic!("{effect:?}: {e}"));
            }
        }
    }

    #[test]
    fn voice_counts() {
        assert_eq!(Effect::Click.recipe().len(), 1);
        assert_eq!(Effect::Correct.recipe().len(), 2);
        assert_eq!(Effect::HeartbeatUnit.recipe().len(), 2);
        assert_eq!(Effect::Fanfare.recipe().len(), 4);
    }

    #[test]
    fn correct_rises() {
        let recipe = Effect::Correct.recipe();
        let f = frequencies(Effect::Correct);
        assert!(f[1] > f[0]);
        assert!((recipe[1].start_offset - 0.08).abs() < 1e-12);
    }

    #[test]
    fn heartbeat_is_lub_dub() {
        let recipe = Effect::HeartbeatUnit.recipe();
        assert_eq!(frequencies(Effect::HeartbeatUnit), vec![60.0, 60.0]);
        assert!((recipe[1].start_offset - 0.15).abs() < 1e-12);
    }

    #[test]
    fn go_burst_sweeps_down() {
        let recipe = Effect::GoBurst.recipe();
        match recipe[0].source {
            Source::Tone {
                frequency,
                target_frequency: Some(target),
                ..
            } => {
                assert_eq!(frequency, 1200.0);
                assert_eq!(target, 600.0);
            }
            other => panic!("unexpected source {other:?}"),
        }
        assert!((recipe[0].duration - 0.3).abs() < 1e-12);
    }

    #[test]
    fn fanfare_ascends_with_attack() {
        let recipe = Effect::Fanfare.recipe();
        let f = frequencies(Effect::Fanfare);
        assert!(f.windows(2).all(|w| w[1] > w[0]));
        for (i, spec) in recipe.iter().enumerate() {
            assert!((spec.start_offset - i as f64 * 0.12).abs() < 1e-12);
            assert!(spec.envelope.attack.is_some());
        }
    }

    #[test]
    fn waveforms_match_character() {
        let wf = |e: Effect| match e.recipe()[0].source {
            Source::Tone { waveform, .. } => waveform,
            Source::Noise { .. } => unreachable!(),
        };
        assert_eq!(wf(Effect::Wrong), Waveform::Sawtooth);
        assert_eq!(wf(Effect::FalseStart), Waveform::Square);
        assert_eq!(wf(Effect::Tick), Waveform::Sine);
    }

    #[test]
    fn names_round_trip() {
        for effect in Effect::ALL {
            let name = serde_json::to_value(effect).unwrap();
            assert_eq!(Effect::from_name(name.as_str().unwrap()), Some(effect));
        }
        assert_eq!(Effect::from_name("boom"), None);
    }

    #[test]
    fn fanfare_length() {
        assert!((Effect::Fanfare.length() - (0.36 + 0.4)).abs() < 1e-9);
    }
}
