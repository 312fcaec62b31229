//! Error types for the audio seams.
//!
//! Nothing here reaches game code: the engine logs a failure and moves on.

use crate::voice::VoiceId;

/// Result alias used by every internal audio seam.
pub type Result<T> = std::result::Result<T, AudioError>;

/// The single failure class the engine recognizes: audio is not available.
///
/// Variants only distinguish *where* it went wrong so the debug log is
/// useful. Callers of the engine never see these; the facade swallows them.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// The platform has no usable output device.
    #[error("audio output unavailable: {0}")]
    Unavailable(String),
    /// The output device was suspended and refused to resume.
    #[error("failed to resume audio output: {0}")]
    ResumeFailed(String),
    /// A voice description the backend cannot synthesize.
    #[error("invalid voice: {0}")]
    InvalidVoice(String),
    /// A stop request for a voice the backend no longer knows about.
    #[error("unknown voice {0:?}")]
    UnknownVoice(VoiceId),
    /// Malformed engine configuration.
    #[error("invalid engine config: {0}")]
    Config(#[from] serde_json::Error),
}
