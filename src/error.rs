/// Errors raised by the sequencer core
use thiserror::Error;

use crate::sequencer::voice::VoiceId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SequencerError {
    #[error("step {step} is outside the sequence (length {length})")]
    OutOfRange { step: usize, length: usize },

    #[error("unknown voice: {0}")]
    UnknownVoice(VoiceId),

    /// Voice ids are derived from the frequency, so equal frequencies collide.
    #[error("a voice with id {0} is already registered")]
    DuplicateVoice(VoiceId),

    #[error("invalid frequency: {0} (must be finite and positive)")]
    InvalidFrequency(f64),

    #[error("invalid tempo: {0} bpm (must be between 20 and 300)")]
    InvalidTempo(f32),

    #[error("cannot build a sequencer without any voices")]
    EmptyScale,
}

pub type Result<T> = std::result::Result<T, SequencerError>;
