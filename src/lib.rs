/// stepgrid - a looping grid step sequencer
///
/// This library provides the core components of a square step sequencer:
/// - One voice per scale frequency, each with an on/off pattern per step
/// - A step clock that loops over the grid at a tempo-derived rate
/// - A trigger engine that fires each active voice exactly once per step
/// - Grid editing with press debouncing and per-cell display state
/// - Audio and MIDI outputs for the triggers

pub mod audio;
pub mod config;
pub mod error;
pub mod midi;
pub mod sequencer;

// Re-export commonly used types
pub use audio::{AudioError, AudioOutput, SynthHandle};
pub use config::{SequencerConfig, Waveform, DEFAULT_SCALE};
pub use error::{Result, SequencerError};
pub use midi::{frequency_to_midi_note, midi_note_name, MidiError, MidiOutputDevice};
pub use sequencer::grid::{CellState, CellView};
pub use sequencer::input::{InputEvent, Key};
pub use sequencer::playback::{PlaybackEngine, PlaybackEvent};
pub use sequencer::trigger::{Trigger, TriggerSink};
pub use sequencer::voice::{Voice, VoiceId};
pub use sequencer::Sequencer;
