/// MIDI output using midir
use midir::{MidiOutput, MidiOutputConnection};
use thiserror::Error;
use tracing::{info, warn};

use crate::sequencer::trigger::{Trigger, TriggerSink};

const CLIENT_NAME: &str = "stepgrid MIDI Output";
// Channel 1
const NOTE_ON: u8 = 0x90;
const NOTE_OFF: u8 = 0x80;
const VELOCITY: u8 = 100;

#[derive(Debug, Error)]
pub enum MidiError {
    #[error("failed to create MIDI output: {0}")]
    Init(#[from] midir::InitError),
    #[error("invalid MIDI port index: {0}")]
    InvalidPort(usize),
    #[error("failed to connect: {0}")]
    Connect(String),
    #[error("failed to send: {0}")]
    Send(#[from] midir::SendError),
}

/// Sends every trigger as a note-on, holding the note until the next step.
pub struct MidiOutputDevice {
    connection: Option<MidiOutputConnection>,
    held: Vec<u8>,
}

impl MidiOutputDevice {
    pub fn new() -> Self {
        Self {
            connection: None,
            held: Vec::new(),
        }
    }

    pub fn available_ports() -> Vec<String> {
        if let Ok(midi_out) = MidiOutput::new(CLIENT_NAME) {
            midi_out
                .ports()
                .iter()
                .filter_map(|p| midi_out.port_name(p).ok())
                .collect()
        } else {
            vec![]
        }
    }

    pub fn connect(&mut self, port_index: usize) -> Result<(), MidiError> {
        let midi_out = MidiOutput::new(CLIENT_NAME)?;

        let ports = midi_out.ports();
        let port = ports
            .get(port_index)
            .ok_or(MidiError::InvalidPort(port_index))?;
        let name = midi_out.port_name(port).unwrap_or_default();

        let connection = midi_out
            .connect(port, "stepgrid")
            .map_err(|e| MidiError::Connect(e.to_string()))?;

        self.all_notes_off();
        self.connection = Some(connection);
        info!(port = %name, "MIDI output connected");
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn send_note_on(&mut self, note: u8) -> Result<(), MidiError> {
        if let Some(ref mut conn) = self.connection {
            conn.send(&[NOTE_ON, note, VELOCITY])?;
            self.held.push(note);
        }
        Ok(())
    }

    pub fn send_note_off(&mut self, note: u8) -> Result<(), MidiError> {
        if let Some(ref mut conn) = self.connection {
            conn.send(&[NOTE_OFF, note, 0])?;
        }
        Ok(())
    }

    /// Release every note still sounding. Used between steps and on pause/reset.
    pub fn all_notes_off(&mut self) {
        for note in std::mem::take(&mut self.held) {
            if let Err(e) = self.send_note_off(note) {
                warn!(err = %e, note, "Failed to release MIDI note");
            }
        }
    }

    pub fn held_notes(&self) -> &[u8] {
        &self.held
    }
}

impl Default for MidiOutputDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerSink for MidiOutputDevice {
    fn begin_step(&mut self, _step: usize) {
        self.all_notes_off();
    }

    fn trigger(&mut self, trigger: Trigger) {
        let note = frequency_to_midi_note(trigger.frequency);
        if let Err(e) = self.send_note_on(note) {
            warn!(err = %e, voice = %trigger.voice, "Failed to send MIDI note");
        }
    }
}

/// Nearest equal-tempered MIDI note (A4 = 440 Hz = 69)
pub fn frequency_to_midi_note(frequency: f64) -> u8 {
    let note = 69.0 + 12.0 * (frequency / 440.0).log2();
    note.round().clamp(0.0, 127.0) as u8
}

pub fn midi_note_name(note: u8) -> String {
    let note_names = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
    let octave = (note / 12) as i32 - 1;
    let note_index = (note % 12) as usize;
    format!("{}{}", note_names[note_index], octave)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SCALE;
    use crate::sequencer::voice::VoiceId;

    #[test]
    fn test_frequency_to_note() {
        assert_eq!(frequency_to_midi_note(440.0), 69);
        assert_eq!(frequency_to_midi_note(220.0), 57);
        assert_eq!(frequency_to_midi_note(370.0), 66);
        assert_eq!(frequency_to_midi_note(1108.74), 85);
        assert_eq!(frequency_to_midi_note(1.0), 0);
        assert_eq!(frequency_to_midi_note(100_000.0), 127);
    }

    #[test]
    fn test_default_scale_names() {
        let names: Vec<String> = DEFAULT_SCALE
            .iter()
            .map(|&f| midi_note_name(frequency_to_midi_note(f)))
            .collect();
        assert_eq!(
            names,
            vec!["C#6", "B5", "G#5", "F#5", "E5", "C#5", "G#4", "F#4", "E4", "D4", "B3", "A3"]
        );
    }

    #[test]
    fn test_disconnected_device_holds_nothing() {
        let mut midi = MidiOutputDevice::new();
        midi.begin_step(0);
        midi.trigger(Trigger {
            voice: VoiceId::from_frequency(440.0),
            frequency: 440.0,
        });
        assert!(!midi.is_connected());
        assert!(midi.held_notes().is_empty());
    }
}
