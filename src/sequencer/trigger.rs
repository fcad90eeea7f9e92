/// Fires voice triggers for the patterns active at a step
use tracing::trace;

use super::voice::{VoiceId, VoiceRegistry};
use crate::error::Result;

/// One-shot instruction to play a voice's envelope once.
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub voice: VoiceId,
    pub frequency: f64,
}

/// Anything that can sound a trigger: a synth, a MIDI port, a channel, a test buffer.
pub trait TriggerSink {
    /// Called once per step, before that step's triggers.
    fn begin_step(&mut self, _step: usize) {}

    fn trigger(&mut self, trigger: Trigger);
}

impl TriggerSink for Vec<Trigger> {
    fn trigger(&mut self, trigger: Trigger) {
        self.push(trigger);
    }
}

#[derive(Debug, Default)]
pub struct TriggerEngine {
    fired: u64,
}

impl TriggerEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total triggers fired since construction
    pub fn fired(&self) -> u64 {
        self.fired
    }

    /// Emit one trigger, in registry order, for every voice whose flag is set at `step`.
    /// Returns how many were emitted.
    pub fn on_tick(
        &mut self,
        step: usize,
        voices: &VoiceRegistry,
        sink: &mut dyn TriggerSink,
    ) -> Result<usize> {
        // Sample the whole column first so an error leaves the sink untouched.
        let mut active = Vec::new();
        for voice in voices.all() {
            if voices.patterns().get(voice.id(), step)? {
                active.push(Trigger {
                    voice: voice.id().clone(),
                    frequency: voice.frequency(),
                });
            }
        }

        sink.begin_step(step);
        let count = active.len();
        for trigger in active {
            trace!(step, voice = %trigger.voice, "trigger");
            sink.trigger(trigger);
        }

        self.fired += count as u64;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SequencerError;

    fn registry(frequencies: &[f64]) -> (VoiceRegistry, Vec<VoiceId>) {
        let mut registry = VoiceRegistry::new(frequencies.len());
        let ids = frequencies
            .iter()
            .map(|&f| registry.register(f).unwrap())
            .collect();
        (registry, ids)
    }

    #[test]
    fn test_fires_only_at_active_step() {
        let (mut voices, ids) = registry(&[100.0, 200.0, 300.0]);
        voices.patterns_mut().set(&ids[1], 2, true).unwrap();
        let mut engine = TriggerEngine::new();

        for step in 0..3 {
            let mut sink: Vec<Trigger> = Vec::new();
            let count = engine.on_tick(step, &voices, &mut sink).unwrap();
            if step == 2 {
                assert_eq!(count, 1);
                assert_eq!(
                    sink,
                    vec![Trigger {
                        voice: ids[1].clone(),
                        frequency: 200.0
                    }]
                );
            } else {
                assert!(sink.is_empty());
            }
        }
        assert_eq!(engine.fired(), 1);
    }

    #[test]
    fn test_registry_order() {
        let (mut voices, ids) = registry(&[300.0, 100.0, 200.0]);
        for id in &ids {
            voices.patterns_mut().set(id, 0, true).unwrap();
        }

        let mut sink: Vec<Trigger> = Vec::new();
        TriggerEngine::new().on_tick(0, &voices, &mut sink).unwrap();
        let order: Vec<f64> = sink.iter().map(|t| t.frequency).collect();
        assert_eq!(order, vec![300.0, 100.0, 200.0]);
    }

    #[test]
    fn test_out_of_range_step_fires_nothing() {
        let (mut voices, ids) = registry(&[100.0, 200.0]);
        voices.patterns_mut().set(&ids[0], 0, true).unwrap();

        let mut sink: Vec<Trigger> = Vec::new();
        let result = TriggerEngine::new().on_tick(2, &voices, &mut sink);
        assert_eq!(result, Err(SequencerError::OutOfRange { step: 2, length: 2 }));
        assert!(sink.is_empty());
    }

    #[derive(Default)]
    struct StepLog(Vec<usize>);

    impl TriggerSink for StepLog {
        fn begin_step(&mut self, step: usize) {
            self.0.push(step);
        }

        fn trigger(&mut self, _trigger: Trigger) {}
    }

    #[test]
    fn test_begin_step_called_even_when_silent() {
        let (voices, _) = registry(&[100.0, 200.0]);
        let mut log = StepLog::default();
        let mut engine = TriggerEngine::new();
        engine.on_tick(0, &voices, &mut log).unwrap();
        engine.on_tick(1, &voices, &mut log).unwrap();
        assert_eq!(log.0, vec![0, 1]);
    }
}
