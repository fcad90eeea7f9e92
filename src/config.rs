/// Sequencer configuration
use std::fmt;
use std::time::Duration;

use crate::error::{Result, SequencerError};

/// Frequencies of the default grid rows, highest pitch first.
pub const DEFAULT_SCALE: [f64; 12] = [
    1108.74, 987.76, 830.6, 739.98, 659.26, 554.36, 415.3, 370.0, 329.62, 293.66, 246.94, 220.0,
];

pub const DEFAULT_BPM: f32 = 50.0;
pub const MIN_BPM: f32 = 20.0;
pub const MAX_BPM: f32 = 300.0;

/// Oscillator shape handed to the audio side; the core never looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Waveform {
    #[default]
    Sine,
    Triangle,
    Square,
    Sawtooth,
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Waveform::Sine => "sine",
            Waveform::Triangle => "triangle",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SequencerConfig {
    pub bpm: f32,
    /// Steps per beat; 1 gives one step every `60000 / bpm` ms.
    pub steps_per_beat: u32,
    pub waveform: Waveform,
    /// One voice per entry. The sequence length equals the number of voices.
    pub scale: Vec<f64>,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            steps_per_beat: 1,
            waveform: Waveform::default(),
            scale: DEFAULT_SCALE.to_vec(),
        }
    }
}

impl SequencerConfig {
    pub fn validate(&self) -> Result<()> {
        validate_bpm(self.bpm)?;
        if self.scale.is_empty() {
            return Err(SequencerError::EmptyScale);
        }
        Ok(())
    }

    pub fn sequence_length(&self) -> usize {
        self.scale.len()
    }

    pub fn step_period(&self) -> Duration {
        step_period(self.bpm, self.steps_per_beat)
    }
}

pub(crate) fn validate_bpm(bpm: f32) -> Result<()> {
    if (MIN_BPM..=MAX_BPM).contains(&bpm) {
        Ok(())
    } else {
        Err(SequencerError::InvalidTempo(bpm))
    }
}

/// Calculate the time between two ticks
pub fn step_period(bpm: f32, steps_per_beat: u32) -> Duration {
    let steps_per_second = bpm / 60.0 * steps_per_beat.max(1) as f32;
    Duration::from_secs_f32(1.0 / steps_per_second)
}
