//! WAV renderer — offline previews of effects and music loops.

use crate::effects::Effect;
use crate::error::Result;
use crate::music::{step_voices, MusicMode};
use crate::output::AudioBackend;
use crate::voice::{VoiceId, VoiceSpec};

use super::context::SynthContext;

/// Trailing silence so the last decay is not cut mid-sample.
const TAIL_SECONDS: f64 = 0.05;

/// Render one effect to a mono 16-bit WAV.
pub fn render_effect_wav(effect: Effect, sample_rate: u32) -> Result<Vec<u8>> {
    let samples = render_voices(&effect.recipe(), sample_rate)?;
    Ok(encode_wav(&to_pcm_i16(&samples), sample_rate, 1))
}

/// Render the first `steps` steps of a music mode, including the full decay
/// of the last step, to a mono 16-bit WAV.
pub fn render_music_wav(mode: MusicMode, steps: u64, sample_rate: u32) -> Result<Vec<u8>> {
    let interval = mode.step_interval().as_secs_f64();
    let voices: Vec<VoiceSpec> = (0..steps)
        .flat_map(|step| {
            let offset = step as f64 * interval;
            step_voices(mode, step)
                .into_iter()
                .map(move |v| v.later(offset))
        })
        .collect();
    let samples = render_voices(&voices, sample_rate)?;
    Ok(encode_wav(&to_pcm_i16(&samples), sample_rate, 1))
}

/// Schedule `voices` at time zero on a fresh context and render them out.
pub fn render_voices(voices: &[VoiceSpec], sample_rate: u32) -> Result<Vec<f32>> {
    let mut ctx = SynthContext::new(sample_rate, 0.8)?;
    ctx.resume()?;

    for (i, spec) in voices.iter().enumerate() {
        ctx.start_voice(VoiceId(i as u64), spec.start_offset, spec)?;
    }

    let length = voices.iter().map(VoiceSpec::end_offset).fold(0.0, f64::max) + TAIL_SECONDS;
    let frames = (length * sample_rate as f64).ceil() as usize;
    Ok(ctx.render(frames))
}

fn to_pcm_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect()
}

/// Encode interleaved i16 PCM samples to a WAV byte buffer.
fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
    let block_align = channels * (bits_per_sample / 8);
    let data_size = (samples.len() * 2) as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    buf
}
