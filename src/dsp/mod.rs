//! DSP — pure Rust synthesis for the built-in output device.
//!
//! The same code renders live blocks for the AudioWorklet (via WASM) and
//! offline WAV previews.

pub mod automation;
pub mod context;
pub mod filter;
pub mod mixer;
pub mod noise;
pub mod oscillator;
pub mod renderer;
