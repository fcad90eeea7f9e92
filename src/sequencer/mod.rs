/// Core sequencer logic - voices, patterns, step clock and triggers
/// This is independent of any audio or GUI backend
use std::time::Duration;

use tracing::{debug, info};

use crate::config::{self, SequencerConfig, Waveform};
use crate::error::Result;

pub mod clock;
pub mod grid;
pub mod input;
pub mod pattern;
pub mod playback;
pub mod trigger;
pub mod voice;

use clock::StepClock;
use grid::{CellView, GridController};
use input::{InputEvent, Key};
use trigger::{TriggerEngine, TriggerSink};
use voice::{VoiceId, VoiceRegistry};

/// The whole sequencer state, owned in one place and shared by handle.
#[derive(Debug)]
pub struct Sequencer {
    voices: VoiceRegistry,
    clock: StepClock,
    engine: TriggerEngine,
    grid: GridController,
    bpm: f32,
    steps_per_beat: u32,
    waveform: Waveform,
}

impl Sequencer {
    /// Build a square grid: one voice per scale entry and as many steps as voices.
    pub fn new(config: &SequencerConfig) -> Result<Self> {
        config.validate()?;

        let length = config.sequence_length();
        let mut voices = VoiceRegistry::new(length);
        for &frequency in &config.scale {
            voices.register(frequency)?;
        }

        info!(
            voices = length,
            bpm = config.bpm,
            waveform = %config.waveform,
            "Sequencer created"
        );

        Ok(Self {
            voices,
            clock: StepClock::new(length),
            engine: TriggerEngine::new(),
            grid: GridController::new(),
            bpm: config.bpm,
            steps_per_beat: config.steps_per_beat.max(1),
            waveform: config.waveform,
        })
    }

    pub fn voices(&self) -> &VoiceRegistry {
        &self.voices
    }

    pub fn clock(&self) -> &StepClock {
        &self.clock
    }

    pub fn engine(&self) -> &TriggerEngine {
        &self.engine
    }

    pub fn sequence_length(&self) -> usize {
        self.clock.length()
    }

    pub fn current_step(&self) -> Option<usize> {
        self.clock.cursor()
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    /// Change the tempo. Only allowed while stopped; the timer reads it on start.
    /// Returns the tempo in effect afterwards.
    pub fn set_bpm(&mut self, bpm: f32) -> Result<f32> {
        config::validate_bpm(bpm)?;
        if !self.is_playing() {
            self.bpm = bpm;
        }
        Ok(self.bpm)
    }

    /// Time between two ticks at the current tempo
    pub fn step_period(&self) -> Duration {
        config::step_period(self.bpm, self.steps_per_beat)
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_running()
    }

    pub fn start(&mut self) {
        if !self.is_playing() {
            info!(step = ?self.clock.cursor(), bpm = self.bpm, "Playback started");
        }
        self.clock.start();
    }

    pub fn pause(&mut self) {
        if self.is_playing() {
            info!(step = ?self.clock.cursor(), "Playback paused");
        }
        self.clock.pause();
    }

    pub fn toggle_play(&mut self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.start();
        }
    }

    /// Stop, rewind to before the first step and silence every pattern.
    pub fn reset(&mut self) -> Result<()> {
        self.clock.reset();
        self.voices.clear_patterns()?;
        info!("Sequencer reset");
        Ok(())
    }

    /// One timer callback: advance the cursor and fire the triggers for the new step.
    /// Returns `None` without side effects when stopped.
    pub fn tick(&mut self, sink: &mut dyn TriggerSink) -> Result<Option<usize>> {
        let Some(step) = self.clock.tick() else {
            return Ok(None);
        };
        let fired = self.engine.on_tick(step, &self.voices, sink)?;
        debug!(step, fired, "Tick");
        Ok(Some(step))
    }

    pub fn toggle(&mut self, voice: &VoiceId, step: usize) -> Result<bool> {
        self.grid.toggle(self.voices.patterns_mut(), voice, step)
    }

    pub fn cell_view(&self, voice: &VoiceId, step: usize) -> Result<CellView> {
        self.grid
            .cell_view(self.voices.patterns(), &self.clock, voice, step)
    }

    pub fn press(&mut self, voice: &VoiceId, step: usize) -> Result<Option<bool>> {
        self.grid.press(self.voices.patterns_mut(), voice, step)
    }

    pub fn release_all(&mut self) {
        self.grid.release_all();
    }

    pub fn handle_input(&mut self, event: InputEvent) -> Result<()> {
        match event {
            InputEvent::PointerDown { voice, step } => {
                self.press(&voice, step)?;
            }
            InputEvent::PointerUp => self.release_all(),
            InputEvent::KeyPress(Key::Space) => self.toggle_play(),
            InputEvent::KeyPress(Key::Escape) => self.reset()?,
            InputEvent::KeyPress(Key::Other(_)) => {}
        }
        Ok(())
    }
}
