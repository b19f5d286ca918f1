use std::time::Duration;

use crate::component::Components;
use crate::config::SimulationConfig;
use crate::connection_manager::ConnectionManager;

/// Bounded relaxation over the component graph.
///
/// A step never looks for a fixed point. It runs a fixed number of evaluate-then-propagate
/// passes, so a feedback loop simply ends the step in whatever state the last pass left.
#[derive(Debug, Clone)]
pub struct Simulator {
    passes: u32,
    steps: u64,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(&SimulationConfig::default())
    }
}

impl Simulator {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            passes: config.passes,
            steps: 0,
        }
    }

    pub fn passes(&self) -> u32 {
        self.passes
    }

    /// Steps run since creation.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn step(&mut self, components: &mut Components, cm: &mut ConnectionManager) {
        for c in components.values_mut() {
            c.reset_inputs();
        }

        for _ in 0..self.passes {
            for c in components.values_mut() {
                c.evaluate();
            }
            cm.propagate(components);
        }

        self.steps += 1;
        log::debug!(
            "Simulation step {} over {} components, {} wires",
            self.steps,
            components.len(),
            cm.len()
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockState {
    Running,
    #[default]
    Stopped,
}

/// Fixed-interval driver for simulation steps, advanced by frame time.
///
/// Fires at most once per [`SimulationClock::advance`]; elapsed time beyond one interval is
/// dropped rather than replayed.
#[derive(Debug, Clone)]
pub struct SimulationClock {
    pub state: ClockState,
    interval: Duration,
    accumulator: Duration,
}

impl SimulationClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            state: ClockState::Stopped,
            interval,
            accumulator: Duration::ZERO,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    pub fn start(&mut self) {
        self.state = ClockState::Running;
        self.accumulator = Duration::ZERO;
    }

    /// Cancel the timer. Pending time is discarded.
    pub fn stop(&mut self) {
        self.state = ClockState::Stopped;
        self.accumulator = Duration::ZERO;
    }

    /// Returns true when a step is due.
    pub fn advance(&mut self, dt: Duration) -> bool {
        if !self.is_running() {
            return false;
        }

        self.accumulator += dt;
        if self.accumulator < self.interval {
            return false;
        }

        if self.interval.is_zero() {
            self.accumulator = Duration::ZERO;
        } else {
            while self.accumulator >= self.interval {
                self.accumulator -= self.interval;
            }
        }
        true
    }
}

/// Throttled redraw driver for purely visual effects.
#[derive(Debug, Clone)]
pub struct AnimationClock {
    pub state: ClockState,
    frame: Duration,
    since_frame: Duration,
    elapsed: Duration,
}

impl AnimationClock {
    pub fn new(frame: Duration) -> Self {
        Self {
            state: ClockState::Stopped,
            frame,
            since_frame: Duration::ZERO,
            elapsed: Duration::ZERO,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    pub fn start(&mut self) {
        if !self.is_running() {
            self.state = ClockState::Running;
            self.since_frame = Duration::ZERO;
        }
    }

    pub fn stop(&mut self) {
        self.state = ClockState::Stopped;
    }

    /// Animation time in seconds. Only advances on frames that were not throttled.
    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Returns true when a redraw frame is due.
    pub fn advance(&mut self, dt: Duration) -> bool {
        if !self.is_running() {
            return false;
        }
        self.since_frame += dt;
        if self.since_frame < self.frame {
            return false;
        }
        self.elapsed += self.since_frame;
        self.since_frame = Duration::ZERO;
        true
    }
}
