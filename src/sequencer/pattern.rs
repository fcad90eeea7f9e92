/// Per-voice step patterns
use std::collections::HashMap;

use super::voice::VoiceId;
use crate::error::{Result, SequencerError};

/// Binary step flags for every voice, all rows the same length.
#[derive(Debug, Clone)]
pub struct PatternStore {
    length: usize,
    rows: HashMap<VoiceId, Vec<bool>>,
}

impl PatternStore {
    pub fn new(length: usize) -> Self {
        Self {
            length,
            rows: HashMap::new(),
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Add an all-silent row. Returns false if the voice already has one.
    pub(crate) fn insert_voice(&mut self, voice: &VoiceId) -> bool {
        if self.rows.contains_key(voice) {
            return false;
        }
        self.rows.insert(voice.clone(), vec![false; self.length]);
        true
    }

    pub fn get(&self, voice: &VoiceId, step: usize) -> Result<bool> {
        let row = self.row(voice)?;
        row.get(step).copied().ok_or(SequencerError::OutOfRange {
            step,
            length: self.length,
        })
    }

    pub fn set(&mut self, voice: &VoiceId, step: usize, value: bool) -> Result<()> {
        let length = self.length;
        let row = self.row_mut(voice)?;
        let cell = row
            .get_mut(step)
            .ok_or(SequencerError::OutOfRange { step, length })?;
        *cell = value;
        Ok(())
    }

    pub fn clear_all(&mut self, voice: &VoiceId) -> Result<()> {
        self.row_mut(voice)?.fill(false);
        Ok(())
    }

    pub fn row(&self, voice: &VoiceId) -> Result<&[bool]> {
        self.rows
            .get(voice)
            .map(Vec::as_slice)
            .ok_or_else(|| SequencerError::UnknownVoice(voice.clone()))
    }

    fn row_mut(&mut self, voice: &VoiceId) -> Result<&mut Vec<bool>> {
        self.rows
            .get_mut(voice)
            .ok_or_else(|| SequencerError::UnknownVoice(voice.clone()))
    }
}
