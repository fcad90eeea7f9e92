/// Cyclic step cursor with transport state

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockState {
    #[default]
    Stopped,
    Running,
}

#[derive(Debug, Clone)]
pub struct StepClock {
    length: usize,
    /// `None` until the first tick after construction or reset.
    cursor: Option<usize>,
    state: ClockState,
}

impl StepClock {
    pub fn new(length: usize) -> Self {
        Self {
            length,
            cursor: None,
            state: ClockState::Stopped,
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Resume from wherever the cursor was left.
    pub fn start(&mut self) {
        self.state = ClockState::Running;
    }

    pub fn pause(&mut self) {
        self.state = ClockState::Stopped;
    }

    pub fn reset(&mut self) {
        self.state = ClockState::Stopped;
        self.cursor = None;
    }

    /// Advance the cursor by one step and return it. Every call while running
    /// advances, the first one included. Stopped clocks return `None`.
    pub fn tick(&mut self) -> Option<usize> {
        if !self.is_running() || self.length == 0 {
            return None;
        }

        let next = match self.cursor {
            Some(step) => (step + 1) % self.length,
            None => 0,
        };
        self.cursor = Some(next);
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visits_every_step_once() {
        let mut clock = StepClock::new(5);
        clock.start();

        let steps: Vec<usize> = (0..5).filter_map(|_| clock.tick()).collect();
        assert_eq!(steps, vec![0, 1, 2, 3, 4]);
        assert_eq!(clock.tick(), Some(0));
    }

    #[test]
    fn test_first_tick_after_start_advances() {
        let mut clock = StepClock::new(4);
        assert_eq!(clock.cursor(), None);
        clock.start();
        assert_eq!(clock.tick(), Some(0));
        assert_eq!(clock.cursor(), Some(0));

        // Same effect again after pause/resume
        clock.pause();
        clock.start();
        assert_eq!(clock.tick(), Some(1));
    }

    #[test]
    fn test_stopped_clock_does_not_advance() {
        let mut clock = StepClock::new(4);
        assert_eq!(clock.tick(), None);

        clock.start();
        clock.tick();
        clock.tick();
        clock.pause();
        assert_eq!(clock.tick(), None);
        assert_eq!(clock.cursor(), Some(1));
    }

    #[test]
    fn test_reset_returns_to_sentinel() {
        let mut clock = StepClock::new(3);
        clock.start();
        clock.tick();
        clock.tick();
        clock.reset();

        assert_eq!(clock.state(), ClockState::Stopped);
        assert_eq!(clock.cursor(), None);
        clock.start();
        assert_eq!(clock.tick(), Some(0));
    }

    #[test]
    fn test_single_step_loop() {
        let mut clock = StepClock::new(1);
        clock.start();
        assert_eq!(clock.tick(), Some(0));
        assert_eq!(clock.tick(), Some(0));
    }
}
