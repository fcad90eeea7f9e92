/// Input events delivered by the UI after hit-testing
use super::voice::VoiceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Toggles play/pause
    Space,
    /// Resets position and clears every pattern
    Escape,
    Other(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// Pointer is down over a grid cell.
    PointerDown { voice: VoiceId, step: usize },
    PointerUp,
    KeyPress(Key),
}
