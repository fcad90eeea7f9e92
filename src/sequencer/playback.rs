/// Playback engine - the tempo timer that drives the sequencer
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use super::trigger::{Trigger, TriggerSink};
use super::Sequencer;

/// Events kept for a UI that isn't polling. Anything past this is dropped.
const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    StepAdvanced(usize),
    Trigger(Trigger),
    /// The timer thread has exited
    Stopped,
}

/// Hands every trigger to the output on the timer thread, and mirrors it
/// onto the event channel for whoever is watching.
struct TimerSink<'a, S> {
    events: &'a SyncSender<PlaybackEvent>,
    output: &'a mut S,
}

impl<S: TriggerSink> TriggerSink for TimerSink<'_, S> {
    fn begin_step(&mut self, step: usize) {
        self.output.begin_step(step);
        let _ = self.events.try_send(PlaybackEvent::StepAdvanced(step));
    }

    fn trigger(&mut self, trigger: Trigger) {
        let _ = self.events.try_send(PlaybackEvent::Trigger(trigger.clone()));
        self.output.trigger(trigger);
    }
}

pub struct PlaybackEngine {
    sender: SyncSender<PlaybackEvent>,
    receiver: Receiver<PlaybackEvent>,
    is_running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PlaybackEngine {
    pub fn new() -> Self {
        let (sender, receiver) = sync_channel(EVENT_CAPACITY);

        Self {
            sender,
            receiver,
            is_running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Start the sequencer and arm the timer at its tempo. The first tick fires
    /// right away, then one per step period until stopped. `output` receives
    /// every trigger on the timer thread as it fires.
    pub fn start<S>(&mut self, sequencer: Arc<Mutex<Sequencer>>, mut output: S)
    where
        S: TriggerSink + Send + 'static,
    {
        if self.is_running() && sequencer.lock().is_playing() {
            return;
        }
        // A thread that saw a pause from elsewhere may still be winding down.
        self.stop();

        let period = {
            let mut seq = sequencer.lock();
            seq.start();
            seq.step_period()
        };

        self.is_running.store(true, Ordering::SeqCst);
        let is_running = Arc::clone(&self.is_running);
        let sender = self.sender.clone();

        self.handle = Some(thread::spawn(move || {
            debug!(period_ms = period.as_millis() as u64, "Timer armed");
            let mut sink = TimerSink {
                events: &sender,
                output: &mut output,
            };
            let mut next_tick = Instant::now();

            while is_running.load(Ordering::SeqCst) {
                let now = Instant::now();

                if now >= next_tick {
                    let result = sequencer.lock().tick(&mut sink);
                    match result {
                        Ok(Some(_)) => {}
                        // Paused or reset from elsewhere.
                        Ok(None) => break,
                        Err(e) => {
                            error!(err = %e, "Tick failed, stopping playback");
                            break;
                        }
                    }

                    // Absolute schedule so late wakeups don't accumulate drift.
                    next_tick += period;
                    if now > next_tick + period {
                        warn!("Timer fell behind, skipping ahead");
                        next_tick = now + period;
                    }
                }

                thread::sleep(Duration::from_millis(1));
            }

            is_running.store(false, Ordering::SeqCst);
            let _ = sender.try_send(PlaybackEvent::Stopped);
            debug!("Timer disarmed");
        }));
    }

    /// Disarm the timer and wait for the thread to exit. Must not be called
    /// while holding the sequencer lock.
    pub fn stop(&mut self) {
        self.is_running.store(false, Ordering::SeqCst);
        self.join();
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// Drain pending events. Only the latest step and what followed it are
    /// returned; older steps were already heard through the output.
    pub fn poll_events(&self) -> Vec<PlaybackEvent> {
        let mut events: Vec<PlaybackEvent> = self.receiver.try_iter().collect();
        if let Some(latest) = events
            .iter()
            .rposition(|e| matches!(e, PlaybackEvent::StepAdvanced(_)))
        {
            events.drain(..latest);
        }
        events
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Timer thread panicked");
            }
        }
    }
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
