#[cfg(feature = "gui")]
use std::sync::Arc;

#[cfg(feature = "gui")]
use clap::Parser;
#[cfg(feature = "gui")]
use eframe::egui;
#[cfg(feature = "gui")]
use parking_lot::Mutex;
#[cfg(feature = "gui")]
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "gui")]
use stepgrid::config::{DEFAULT_BPM, MAX_BPM, MIN_BPM};
#[cfg(feature = "gui")]
use stepgrid::{
    frequency_to_midi_note, midi_note_name, AudioOutput, CellState, CellView, InputEvent, Key,
    MidiOutputDevice, PlaybackEngine, PlaybackEvent, Sequencer, SequencerConfig, TriggerSink,
    Voice, Waveform,
};

#[cfg(feature = "gui")]
const ON_COLOR: egui::Color32 = egui::Color32::from_rgb(253, 209, 50);
#[cfg(feature = "gui")]
const OFF_GRAY: u8 = 100;
#[cfg(feature = "gui")]
const STEP_GRAY: u8 = 150;
#[cfg(feature = "gui")]
const CELL_GAP: f32 = 1.0;
#[cfg(feature = "gui")]
const LABEL_WIDTH: f32 = 40.0;

#[cfg(feature = "gui")]
#[derive(Parser)]
#[command(version, about = "A looping grid step sequencer.")]
struct Cli {
    /// Tempo in beats per minute.
    #[arg(long, default_value_t = DEFAULT_BPM)]
    bpm: f32,
    /// Grid steps per beat.
    #[arg(long, default_value_t = 1)]
    steps_per_beat: u32,
    /// Oscillator waveform for every voice.
    #[arg(long, value_enum, default_value_t = Waveform::Sine)]
    waveform: Waveform,
    /// Also send triggers to this MIDI output port.
    #[arg(long)]
    midi_port: Option<usize>,
    /// Lists the available MIDI output ports and exits.
    #[arg(long)]
    list_midi_ports: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(feature = "gui")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    if cli.list_midi_ports {
        for (i, name) in MidiOutputDevice::available_ports().iter().enumerate() {
            println!("{}: {}", i, name);
        }
        return Ok(());
    }

    let config = SequencerConfig {
        bpm: cli.bpm,
        steps_per_beat: cli.steps_per_beat,
        waveform: cli.waveform,
        ..Default::default()
    };
    let app = SequencerApp::new(&config, cli.midi_port)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([800.0, 860.0])
            .with_title("stepgrid"),
        ..Default::default()
    };

    eframe::run_native("stepgrid", options, Box::new(move |_cc| Ok(Box::new(app))))?;
    Ok(())
}

#[cfg(not(feature = "gui"))]
fn main() {
    init_tracing();
    tracing::error!("This binary requires the 'gui' feature to be enabled");
    std::process::exit(1);
}

#[cfg(feature = "gui")]
struct SequencerApp {
    sequencer: Arc<Mutex<Sequencer>>,
    audio_output: AudioOutput,
    midi_output: MidiOutputDevice,
    playback_engine: PlaybackEngine,

    // UI state
    voices: Vec<Voice>,
    row_labels: Vec<String>,
    available_midi_ports: Vec<String>,
    selected_port: Option<usize>,
}

#[cfg(feature = "gui")]
impl SequencerApp {
    fn new(config: &SequencerConfig, midi_port: Option<usize>) -> stepgrid::Result<Self> {
        let sequencer = Sequencer::new(config)?;
        let voices = sequencer.voices().all().to_vec();
        let row_labels = voices
            .iter()
            .map(|v| midi_note_name(frequency_to_midi_note(v.frequency())))
            .collect();

        let mut midi_output = MidiOutputDevice::new();
        let mut selected_port = None;
        if let Some(port) = midi_port {
            match midi_output.connect(port) {
                Ok(()) => selected_port = Some(port),
                Err(e) => warn!(err = %e, port, "Could not open MIDI port"),
            }
        }

        Ok(Self {
            audio_output: AudioOutput::open_or_silent(&voices, sequencer.waveform()),
            sequencer: Arc::new(Mutex::new(sequencer)),
            midi_output,
            playback_engine: PlaybackEngine::new(),
            voices,
            row_labels,
            available_midi_ports: MidiOutputDevice::available_ports(),
            selected_port,
        })
    }

    /// Audio is triggered on the timer thread; MIDI follows the latest step here.
    fn handle_playback_events(&mut self) {
        for event in self.playback_engine.poll_events() {
            match event {
                PlaybackEvent::StepAdvanced(step) => self.midi_output.begin_step(step),
                PlaybackEvent::Trigger(trigger) => self.midi_output.trigger(trigger),
                PlaybackEvent::Stopped => self.midi_output.all_notes_off(),
            }
        }
    }

    /// Route one input event to the sequencer and arm or disarm the timer to match.
    fn dispatch(&mut self, event: InputEvent) {
        let (was_playing, is_playing) = {
            let mut seq = self.sequencer.lock();
            let was_playing = seq.is_playing();
            if let Err(e) = seq.handle_input(event) {
                error!(err = %e, "Input rejected");
            }
            (was_playing, seq.is_playing())
        };

        if is_playing && !was_playing {
            self.playback_engine
                .start(Arc::clone(&self.sequencer), self.audio_output.synth());
        } else if was_playing && !is_playing {
            self.playback_engine.stop();
            self.midi_output.all_notes_off();
        }
    }

    fn transport_ui(&mut self, ui: &mut egui::Ui) -> Vec<InputEvent> {
        let mut events = Vec::new();
        let (is_playing, mut bpm) = {
            let seq = self.sequencer.lock();
            (seq.is_playing(), seq.bpm())
        };

        ui.horizontal(|ui| {
            let label = if is_playing { "⏸ Pause" } else { "▶ Play" };
            if ui.button(label).clicked() {
                events.push(InputEvent::KeyPress(Key::Space));
            }
            if ui.button("⟲ Reset").clicked() {
                events.push(InputEvent::KeyPress(Key::Escape));
            }

            ui.add_space(20.0);

            ui.label("BPM:");
            let slider = egui::Slider::new(&mut bpm, MIN_BPM..=MAX_BPM).step_by(1.0);
            if ui.add_enabled(!is_playing, slider).changed() {
                if let Err(e) = self.sequencer.lock().set_bpm(bpm) {
                    warn!(err = %e, "Tempo rejected");
                }
            }
        });

        // MIDI Port Selection
        let mut selected_port_changed = None;
        ui.horizontal(|ui| {
            ui.label("MIDI Output:");
            if self.available_midi_ports.is_empty() {
                ui.label("No MIDI ports available");
            } else {
                egui::ComboBox::from_label("")
                    .selected_text(
                        self.selected_port
                            .and_then(|i| self.available_midi_ports.get(i))
                            .map(String::as_str)
                            .unwrap_or("Select port..."),
                    )
                    .show_ui(ui, |ui| {
                        for (i, port_name) in self.available_midi_ports.iter().enumerate() {
                            if ui
                                .selectable_label(self.selected_port == Some(i), port_name)
                                .clicked()
                            {
                                selected_port_changed = Some(i);
                            }
                        }
                    });
            }
        });

        if let Some(port_idx) = selected_port_changed {
            match self.midi_output.connect(port_idx) {
                Ok(()) => self.selected_port = Some(port_idx),
                Err(e) => warn!(err = %e, "MIDI connection failed"),
            }
        }

        events
    }

    /// Paint the grid (columns are steps, rows are voices) and hit-test the pointer.
    fn grid_ui(&self, ui: &mut egui::Ui) -> Vec<InputEvent> {
        let length = self.voices.len();
        let views: Vec<Vec<Option<CellView>>> = {
            let seq = self.sequencer.lock();
            self.voices
                .iter()
                .map(|v| (0..length).map(|s| seq.cell_view(v.id(), s).ok()).collect())
                .collect()
        };

        let available = ui.available_size();
        let cell = ((available.x - LABEL_WIDTH).min(available.y) / length.max(1) as f32 - CELL_GAP)
            .max(4.0);
        let side = (cell + CELL_GAP) * length as f32;
        let (response, painter) =
            ui.allocate_painter(egui::vec2(side + LABEL_WIDTH, side), egui::Sense::click_and_drag());
        let origin = response.rect.min + egui::vec2(LABEL_WIDTH, 0.0);

        let (pointer_down, pointer_pos) = ui
            .ctx()
            .input(|i| (i.pointer.primary_down(), i.pointer.interact_pos()));

        let mut events = Vec::new();
        for (row, voice) in self.voices.iter().enumerate() {
            let y = origin.y + row as f32 * (cell + CELL_GAP);
            painter.text(
                egui::pos2(origin.x - 6.0, y + cell / 2.0),
                egui::Align2::RIGHT_CENTER,
                &self.row_labels[row],
                egui::FontId::monospace(12.0),
                egui::Color32::GRAY,
            );

            for step in 0..length {
                let x = origin.x + step as f32 * (cell + CELL_GAP);
                let rect = egui::Rect::from_min_size(egui::pos2(x, y), egui::vec2(cell, cell));

                let color = match views[row][step].map(|v| v.state()) {
                    Some(CellState::Active) => ON_COLOR,
                    Some(CellState::Stepping) => egui::Color32::from_gray(STEP_GRAY),
                    _ => egui::Color32::from_gray(OFF_GRAY),
                };
                painter.rect_filled(rect, 0.0, color);

                if pointer_down && pointer_pos.is_some_and(|p| rect.contains(p)) {
                    events.push(InputEvent::PointerDown {
                        voice: voice.id().clone(),
                        step,
                    });
                }
            }
        }

        events
    }
}

#[cfg(feature = "gui")]
impl eframe::App for SequencerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint();

        self.handle_playback_events();

        let mut events = Vec::new();
        ctx.input(|i| {
            if i.key_pressed(egui::Key::Space) {
                events.push(InputEvent::KeyPress(Key::Space));
            }
            if i.key_pressed(egui::Key::Escape) {
                events.push(InputEvent::KeyPress(Key::Escape));
            }
        });

        egui::TopBottomPanel::top("transport").show(ctx, |ui| {
            ui.heading("stepgrid");
            events.extend(self.transport_ui(ui));

            let (step, fired) = {
                let seq = self.sequencer.lock();
                (seq.current_step(), seq.engine().fired())
            };
            ui.horizontal(|ui| {
                match step {
                    Some(step) => ui.label(format!("Step {}/{}", step + 1, self.voices.len())),
                    None => ui.label("Not started"),
                };
                ui.label(format!("{} triggers", fired));
                if self.audio_output.is_silent() {
                    ui.colored_label(egui::Color32::YELLOW, "⚠ No audio device");
                }
            });
            ui.label("Space: play/pause   Esc: reset   Click cells to toggle");
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            events.extend(self.grid_ui(ui));
        });

        // Any release re-arms every cell.
        if ctx.input(|i| i.pointer.any_released()) {
            events.push(InputEvent::PointerUp);
        }

        for event in events {
            self.dispatch(event);
        }
    }
}
