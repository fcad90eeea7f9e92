/// Grid editing and per-cell display state
use std::collections::HashSet;

use super::clock::StepClock;
use super::pattern::PatternStore;
use super::voice::VoiceId;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    Active,
    Stepping,
    Inactive,
}

/// What the renderer needs to know about one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellView {
    pub active: bool,
    pub stepping: bool,
}

impl CellView {
    /// An active cell wins over the step highlight.
    pub fn state(&self) -> CellState {
        if self.active {
            CellState::Active
        } else if self.stepping {
            CellState::Stepping
        } else {
            CellState::Inactive
        }
    }
}

/// Turns edits into pattern writes. Cell `active` is always read from the
/// pattern store, never cached here; the only state kept is the press guard.
#[derive(Debug, Clone, Default)]
pub struct GridController {
    clicked: HashSet<(VoiceId, usize)>,
}

impl GridController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip one cell and return its new value
    pub fn toggle(
        &mut self,
        patterns: &mut PatternStore,
        voice: &VoiceId,
        step: usize,
    ) -> Result<bool> {
        let value = !patterns.get(voice, step)?;
        patterns.set(voice, step, value)?;
        Ok(value)
    }

    pub fn cell_view(
        &self,
        patterns: &PatternStore,
        clock: &StepClock,
        voice: &VoiceId,
        step: usize,
    ) -> Result<CellView> {
        let active = patterns.get(voice, step)?;
        Ok(CellView {
            active,
            stepping: clock.cursor() == Some(step),
        })
    }

    /// Pointer held over a cell. Toggles it the first time in a press and
    /// returns the new value; later frames of the same press return `None`.
    pub fn press(
        &mut self,
        patterns: &mut PatternStore,
        voice: &VoiceId,
        step: usize,
    ) -> Result<Option<bool>> {
        if self.is_clicked(voice, step) {
            return Ok(None);
        }
        let value = self.toggle(patterns, voice, step)?;
        self.clicked.insert((voice.clone(), step));
        Ok(Some(value))
    }

    /// Any pointer release re-arms every cell, not just the one under the pointer.
    pub fn release_all(&mut self) {
        self.clicked.clear();
    }

    pub fn is_clicked(&self, voice: &VoiceId, step: usize) -> bool {
        self.clicked.contains(&(voice.clone(), step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SequencerError;
    use crate::sequencer::voice::VoiceRegistry;

    fn setup() -> (VoiceRegistry, VoiceId) {
        let mut voices = VoiceRegistry::new(4);
        let id = voices.register(440.0).unwrap();
        (voices, id)
    }

    #[test]
    fn test_toggle_round_trip() {
        let (mut voices, id) = setup();
        let clock = StepClock::new(4);
        let mut grid = GridController::new();

        assert_eq!(grid.toggle(voices.patterns_mut(), &id, 1), Ok(true));
        let view = grid.cell_view(voices.patterns(), &clock, &id, 1).unwrap();
        assert!(view.active);

        assert_eq!(grid.toggle(voices.patterns_mut(), &id, 1), Ok(false));
        let view = grid.cell_view(voices.patterns(), &clock, &id, 1).unwrap();
        assert!(!view.active);
    }

    #[test]
    fn test_toggle_errors() {
        let (mut voices, id) = setup();
        let mut grid = GridController::new();
        assert_eq!(
            grid.toggle(voices.patterns_mut(), &id, 9),
            Err(SequencerError::OutOfRange { step: 9, length: 4 })
        );
        let other = VoiceId::from_frequency(1.0);
        assert_eq!(
            grid.toggle(voices.patterns_mut(), &other, 0),
            Err(SequencerError::UnknownVoice(other))
        );
    }

    #[test]
    fn test_stepping_follows_cursor() {
        let (voices, id) = setup();
        let mut clock = StepClock::new(4);
        let grid = GridController::new();

        let view = grid.cell_view(voices.patterns(), &clock, &id, 0).unwrap();
        assert!(!view.stepping);

        clock.start();
        clock.tick();
        clock.tick();
        let views: Vec<bool> = (0..4)
            .map(|s| grid.cell_view(voices.patterns(), &clock, &id, s).unwrap().stepping)
            .collect();
        assert_eq!(views, vec![false, true, false, false]);
    }

    #[test]
    fn test_cell_state_priority() {
        let view = |active, stepping| CellView { active, stepping }.state();
        assert_eq!(view(true, true), CellState::Active);
        assert_eq!(view(true, false), CellState::Active);
        assert_eq!(view(false, true), CellState::Stepping);
        assert_eq!(view(false, false), CellState::Inactive);
    }

    #[test]
    fn test_press_toggles_once_until_release() {
        let (mut voices, id) = setup();
        let mut grid = GridController::new();

        // One press held across several frames
        assert_eq!(grid.press(voices.patterns_mut(), &id, 2), Ok(Some(true)));
        assert_eq!(grid.press(voices.patterns_mut(), &id, 2), Ok(None));
        assert_eq!(grid.press(voices.patterns_mut(), &id, 2), Ok(None));
        assert!(voices.patterns().get(&id, 2).unwrap());

        grid.release_all();
        assert_eq!(grid.press(voices.patterns_mut(), &id, 2), Ok(Some(false)));
    }

    #[test]
    fn test_release_rearms_every_cell() {
        let mut voices = VoiceRegistry::new(2);
        let a = voices.register(100.0).unwrap();
        let b = voices.register(200.0).unwrap();
        let mut grid = GridController::new();

        grid.press(voices.patterns_mut(), &a, 0).unwrap();
        grid.press(voices.patterns_mut(), &b, 1).unwrap();
        assert!(grid.is_clicked(&a, 0) && grid.is_clicked(&b, 1));

        grid.release_all();
        assert!(!grid.is_clicked(&a, 0));
        assert!(!grid.is_clicked(&b, 1));
    }

    #[test]
    fn test_failed_press_is_not_latched() {
        let (mut voices, id) = setup();
        let mut grid = GridController::new();
        assert!(grid.press(voices.patterns_mut(), &id, 7).is_err());
        assert!(!grid.is_clicked(&id, 7));
    }
}
