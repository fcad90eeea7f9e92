/// Audio output using cpal: one enveloped oscillator per voice
use std::collections::HashMap;
use std::f32::consts::TAU;
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::Waveform;
use crate::sequencer::trigger::{Trigger, TriggerSink};
use crate::sequencer::voice::{Voice, VoiceId};

const MASTER_VOLUME: f32 = 0.3;

const ATTACK_SECS: f32 = 0.01;
const DECAY_SECS: f32 = 0.5;
const SUSTAIN_LEVEL: f32 = 0.2;
const RELEASE_SECS: f32 = 0.5;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no default output device")]
    NoDevice,
    #[error("failed to read output config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),
    #[error("failed to list output configs: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),
    #[error("unsupported sample format: {0:?}")]
    UnsupportedFormat(cpal::SampleFormat),
    #[error("failed to build output stream: {0}")]
    Build(#[from] cpal::BuildStreamError),
    #[error("failed to start output stream: {0}")]
    Play(#[from] cpal::PlayStreamError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    Attack,
    Decay,
    Release,
}

/// One-shot ADSR: attack, decay to sustain, then straight into release.
#[derive(Debug, Clone)]
struct Envelope {
    stage: Stage,
    level: f32,
}

impl Envelope {
    fn new() -> Self {
        Self {
            stage: Stage::Idle,
            level: 0.0,
        }
    }

    /// Restart from the current level so retriggers don't click.
    fn trigger(&mut self) {
        self.stage = Stage::Attack;
    }

    fn is_idle(&self) -> bool {
        self.stage == Stage::Idle
    }

    fn next(&mut self, sample_rate: f32) -> f32 {
        match self.stage {
            Stage::Idle => {}
            Stage::Attack => {
                self.level += 1.0 / (ATTACK_SECS * sample_rate);
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = Stage::Decay;
                }
            }
            Stage::Decay => {
                self.level -= (1.0 - SUSTAIN_LEVEL) / (DECAY_SECS * sample_rate);
                if self.level <= SUSTAIN_LEVEL {
                    self.level = SUSTAIN_LEVEL;
                    self.stage = Stage::Release;
                }
            }
            Stage::Release => {
                self.level -= SUSTAIN_LEVEL / (RELEASE_SECS * sample_rate);
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.stage = Stage::Idle;
                }
            }
        }
        self.level
    }
}

fn oscillator(waveform: Waveform, phase: f32) -> f32 {
    match waveform {
        Waveform::Sine => (phase * TAU).sin(),
        Waveform::Triangle => 4.0 * (phase - 0.5).abs() - 1.0,
        Waveform::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Sawtooth => 2.0 * phase - 1.0,
    }
}

#[derive(Debug, Clone)]
struct SynthVoice {
    frequency: f32,
    phase: f32,
    envelope: Envelope,
}

/// The voices the output stream renders, shared with the audio callback.
#[derive(Debug)]
struct VoiceBank {
    waveform: Waveform,
    sample_rate: f32,
    voices: Vec<SynthVoice>,
}

impl VoiceBank {
    fn new(voices: &[Voice], waveform: Waveform, sample_rate: f32) -> Self {
        Self {
            waveform,
            sample_rate,
            voices: voices
                .iter()
                .map(|v| SynthVoice {
                    frequency: v.frequency() as f32,
                    phase: 0.0,
                    envelope: Envelope::new(),
                })
                .collect(),
        }
    }

    fn next_sample(&mut self) -> f32 {
        let mut mix = 0.0;
        for voice in &mut self.voices {
            if voice.envelope.is_idle() {
                continue;
            }
            let level = voice.envelope.next(self.sample_rate);
            mix += oscillator(self.waveform, voice.phase) * level;
            voice.phase = (voice.phase + voice.frequency / self.sample_rate).fract();
        }
        (mix * MASTER_VOLUME).clamp(-1.0, 1.0)
    }

    /// Fill an interleaved buffer, same sample on every channel.
    fn render(&mut self, data: &mut [f32], channels: usize) {
        for frame in data.chunks_mut(channels.max(1)) {
            let sample = self.next_sample();
            frame.fill(sample);
        }
    }
}

/// Cheap, `Send` handle onto the oscillators. The playback thread triggers
/// voices through this directly instead of waiting on the UI.
#[derive(Clone)]
pub struct SynthHandle {
    bank: Arc<Mutex<VoiceBank>>,
    index: Arc<HashMap<VoiceId, usize>>,
}

impl SynthHandle {
    fn new(voices: &[Voice], waveform: Waveform, sample_rate: f32) -> Self {
        let index = voices
            .iter()
            .enumerate()
            .map(|(i, v)| (v.id().clone(), i))
            .collect();
        Self {
            bank: Arc::new(Mutex::new(VoiceBank::new(voices, waveform, sample_rate))),
            index: Arc::new(index),
        }
    }

    /// Play one envelope cycle on the voice's oscillator. Returns false for unknown voices.
    pub fn trigger_voice(&self, voice: &VoiceId) -> bool {
        let Some(&i) = self.index.get(voice) else {
            return false;
        };
        self.bank.lock().voices[i].envelope.trigger();
        true
    }
}

impl TriggerSink for SynthHandle {
    fn trigger(&mut self, trigger: Trigger) {
        if !self.trigger_voice(&trigger.voice) {
            warn!(voice = %trigger.voice, "Trigger for a voice with no oscillator");
        }
    }
}

/// Pick an f32 config, keeping the device's default rate when a range allows it.
fn f32_config(
    default: cpal::SupportedStreamConfig,
    ranges: impl IntoIterator<Item = cpal::SupportedStreamConfigRange>,
) -> Result<cpal::SupportedStreamConfig, AudioError> {
    if default.sample_format() == cpal::SampleFormat::F32 {
        return Ok(default);
    }

    let rate = default.sample_rate().0;
    ranges
        .into_iter()
        .filter(|range| range.sample_format() == cpal::SampleFormat::F32)
        .max_by_key(|range| {
            let covers_rate =
                range.min_sample_rate().0 <= rate && rate <= range.max_sample_rate().0;
            (covers_rate, range.channels() == default.channels())
        })
        .map(|range| {
            let rate = rate.clamp(range.min_sample_rate().0, range.max_sample_rate().0);
            range.with_sample_rate(cpal::SampleRate(rate))
        })
        .ok_or(AudioError::UnsupportedFormat(default.sample_format()))
}

pub struct AudioOutput {
    stream: Option<cpal::Stream>,
    synth: SynthHandle,
}

impl AudioOutput {
    /// Open the default output device with one oscillator per voice.
    pub fn new(voices: &[Voice], waveform: Waveform) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let config = f32_config(
            device.default_output_config()?,
            device.supported_output_configs()?,
        )?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;
        let synth = SynthHandle::new(voices, waveform, sample_rate);

        let bank = Arc::clone(&synth.bank);
        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                bank.lock().render(data, channels);
            },
            |err| error!(err = %err, "Audio stream error"),
            None,
        )?;
        stream.play()?;

        info!(
            device = %device.name().unwrap_or_default(),
            sample_rate,
            channels,
            "Audio output opened"
        );

        Ok(Self {
            stream: Some(stream),
            synth,
        })
    }

    /// Like `new`, but falls back to a silent output when no device can be opened.
    pub fn open_or_silent(voices: &[Voice], waveform: Waveform) -> Self {
        Self::new(voices, waveform).unwrap_or_else(|e| {
            warn!(err = %e, "Audio unavailable, continuing without sound");
            Self {
                stream: None,
                synth: SynthHandle::new(voices, waveform, 44_100.0),
            }
        })
    }

    pub fn is_silent(&self) -> bool {
        self.stream.is_none()
    }

    /// A handle that can trigger voices from another thread.
    pub fn synth(&self) -> SynthHandle {
        self.synth.clone()
    }
}
