/// Voice identities and their patterns
use std::collections::HashMap;
use std::fmt;

use super::pattern::PatternStore;
use crate::error::{Result, SequencerError};

/// Stable voice key, the frequency printed in its shortest form ("370", "1108.74").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(String);

impl VoiceId {
    pub fn from_frequency(frequency: f64) -> Self {
        Self(frequency.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    id: VoiceId,
    frequency: f64,
}

impl Voice {
    pub fn id(&self) -> &VoiceId {
        &self.id
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }
}

/// Every known voice in registration order, plus the patterns they play.
#[derive(Debug, Clone)]
pub struct VoiceRegistry {
    voices: Vec<Voice>,
    positions: HashMap<VoiceId, usize>,
    patterns: PatternStore,
}

impl VoiceRegistry {
    pub fn new(sequence_length: usize) -> Self {
        Self {
            voices: Vec::new(),
            positions: HashMap::new(),
            patterns: PatternStore::new(sequence_length),
        }
    }

    /// Register a voice with a silent pattern.
    ///
    /// Two equal frequencies map to the same id and the second registration
    /// fails with [`SequencerError::DuplicateVoice`].
    pub fn register(&mut self, frequency: f64) -> Result<VoiceId> {
        if !(frequency.is_finite() && frequency > 0.0) {
            return Err(SequencerError::InvalidFrequency(frequency));
        }

        let id = VoiceId::from_frequency(frequency);
        if self.positions.contains_key(&id) || !self.patterns.insert_voice(&id) {
            return Err(SequencerError::DuplicateVoice(id));
        }

        self.positions.insert(id.clone(), self.voices.len());
        self.voices.push(Voice {
            id: id.clone(),
            frequency,
        });
        Ok(id)
    }

    pub fn resolve(&self, id: &VoiceId) -> Result<&Voice> {
        self.position(id).map(|index| &self.voices[index])
    }

    /// Row of the voice on the grid
    pub fn position(&self, id: &VoiceId) -> Result<usize> {
        self.positions
            .get(id)
            .copied()
            .ok_or_else(|| SequencerError::UnknownVoice(id.clone()))
    }

    pub fn all(&self) -> &[Voice] {
        &self.voices
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn sequence_length(&self) -> usize {
        self.patterns.length()
    }

    pub fn patterns(&self) -> &PatternStore {
        &self.patterns
    }

    pub fn patterns_mut(&mut self) -> &mut PatternStore {
        &mut self.patterns
    }

    pub fn clear_patterns(&mut self) -> Result<()> {
        for voice in &self.voices {
            self.patterns.clear_all(&voice.id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_from_frequency() {
        assert_eq!(VoiceId::from_frequency(370.0).as_str(), "370");
        assert_eq!(VoiceId::from_frequency(1108.74).as_str(), "1108.74");
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = VoiceRegistry::new(4);
        let id = registry.register(440.0).unwrap();

        let voice = registry.resolve(&id).unwrap();
        assert_eq!(voice.frequency(), 440.0);
        assert_eq!(registry.patterns().row(&id).unwrap(), &[false; 4]);
    }

    #[test]
    fn test_registration_order() {
        let mut registry = VoiceRegistry::new(3);
        for frequency in [330.0, 110.0, 220.0] {
            registry.register(frequency).unwrap();
        }

        let order: Vec<f64> = registry.all().iter().map(Voice::frequency).collect();
        assert_eq!(order, vec![330.0, 110.0, 220.0]);
        assert_eq!(registry.position(&VoiceId::from_frequency(220.0)), Ok(2));
    }

    #[test]
    fn test_duplicate_frequency() {
        let mut registry = VoiceRegistry::new(2);
        registry.register(440.0).unwrap();
        assert_eq!(
            registry.register(440.0),
            Err(SequencerError::DuplicateVoice(VoiceId::from_frequency(440.0)))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_invalid_frequency() {
        let mut registry = VoiceRegistry::new(2);
        assert_eq!(
            registry.register(-1.0),
            Err(SequencerError::InvalidFrequency(-1.0))
        );
        assert!(registry.register(f64::NAN).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unknown_voice() {
        let registry = VoiceRegistry::new(2);
        let id = VoiceId::from_frequency(100.0);
        assert_eq!(
            registry.resolve(&id),
            Err(SequencerError::UnknownVoice(id))
        );
    }

    #[test]
    fn test_clear_patterns() {
        let mut registry = VoiceRegistry::new(2);
        let a = registry.register(100.0).unwrap();
        let b = registry.register(200.0).unwrap();
        registry.patterns_mut().set(&a, 0, true).unwrap();
        registry.patterns_mut().set(&b, 1, true).unwrap();

        registry.clear_patterns().unwrap();
        assert_eq!(registry.patterns().row(&a).unwrap(), &[false; 2]);
        assert_eq!(registry.patterns().row(&b).unwrap(), &[false; 2]);
    }
}
