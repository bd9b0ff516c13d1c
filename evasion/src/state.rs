//! Per-step kinematic record and trajectories built from it.

use std::path::Path;

use csv::Writer;
use serde::{Deserialize, Serialize};

use crate::error::{EvasionError, Result};

/// Kinematic state of the vehicle at one discrete time step.
///
/// Acceleration and jerk are kept in the vehicle frame: index 0 is
/// longitudinal, index 1 is lateral (positive to the left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub time_step: usize,
    pub position: [f64; 2],
    pub velocity: [f64; 2],
    pub orientation: f64,
    pub acceleration: [f64; 2],
    pub jerk: [f64; 2],
}

impl VehicleState {
    pub fn new(time_step: usize, position: [f64; 2], speed: f64, orientation: f64) -> Self {
        Self {
            time_step,
            position,
            velocity: [speed * orientation.cos(), speed * orientation.sin()],
            orientation,
            acceleration: [0.0; 2],
            jerk: [0.0; 2],
        }
    }

    pub fn speed(&self) -> f64 {
        self.velocity[0].hypot(self.velocity[1])
    }

    // a copy of this state that stands still one step later
    pub(crate) fn stationary_successor(&self) -> Self {
        Self {
            time_step: self.time_step + 1,
            velocity: [0.0; 2],
            acceleration: [0.0; 2],
            jerk: [0.0; 2],
            ..*self
        }
    }
}

/// Time-ordered, contiguous sequence of states.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Trajectory {
    states: Vec<VehicleState>,
}

impl Trajectory {
    /// Builds a trajectory, rejecting gaps or reordering in the time steps.
    pub fn new(states: Vec<VehicleState>) -> Result<Self> {
        if let Some(w) = states.windows(2).find(|w| w[1].time_step != w[0].time_step + 1) {
            return Err(EvasionError::InvalidConfig(format!(
                "trajectory is not contiguous: step {} followed by {}",
                w[0].time_step, w[1].time_step
            )));
        }
        Ok(Self { states })
    }

    /// Straight-line reference at constant speed, `steps` steps after `start`.
    pub fn constant_velocity(start: VehicleState, steps: usize, dt: f64) -> Self {
        let mut states = Vec::with_capacity(steps + 1);
        let mut state = VehicleState {
            acceleration: [0.0; 2],
            jerk: [0.0; 2],
            ..start
        };
        states.push(state);
        for _ in 0..steps {
            state.time_step += 1;
            state.position[0] += state.velocity[0] * dt;
            state.position[1] += state.velocity[1] * dt;
            states.push(state);
        }
        Self { states }
    }

    pub(crate) fn push(&mut self, state: VehicleState) {
        debug_assert!(self.states.last().map_or(true, |s| s.time_step + 1 == state.time_step));
        self.states.push(state);
    }

    pub fn states(&self) -> &[VehicleState] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn first_step(&self) -> Option<usize> {
        self.states.first().map(|s| s.time_step)
    }

    pub fn final_step(&self) -> Option<usize> {
        self.states.last().map(|s| s.time_step)
    }

    pub fn last(&self) -> Option<&VehicleState> {
        self.states.last()
    }

    pub fn state_at(&self, time_step: usize) -> Option<&VehicleState> {
        let first = self.first_step()?;
        time_step.checked_sub(first).and_then(|i| self.states.get(i))
    }

    /// True if the trajectory covers every step up to and including `time_step`.
    pub fn reaches(&self, time_step: usize) -> bool {
        self.final_step().map_or(false, |s| s >= time_step)
    }

    /// States in `[from, until)`.
    pub fn slice(&self, from: usize, until: usize) -> Trajectory {
        let states = self
            .states
            .iter()
            .filter(|s| s.time_step >= from && s.time_step < until)
            .copied()
            .collect();
        Trajectory { states }
    }

    /// Appends `tail`, which must start right after the last state.
    pub fn concat(mut self, tail: &Trajectory) -> Result<Trajectory> {
        if let (Some(end), Some(start)) = (self.final_step(), tail.first_step()) {
            if start != end + 1 {
                return Err(EvasionError::InvalidConfig(format!(
                    "cannot append trajectory starting at {start} after step {end}"
                )));
            }
        }
        self.states.extend_from_slice(&tail.states);
        Ok(self)
    }

    pub fn save_to_csv<P: AsRef<Path>>(&self, filename: P) -> Result<()> {
        let mut wtr = Writer::from_path(filename)?;
        wtr.write_record([
            "time_step", "x", "y", "vx", "vy", "orientation", "a_long", "a_lat", "j_long", "j_lat",
        ])?;
        for s in &self.states {
            wtr.write_record(&[
                s.time_step.to_string(),
                s.position[0].to_string(),
                s.position[1].to_string(),
                s.velocity[0].to_string(),
                s.velocity[1].to_string(),
                s.orientation.to_string(),
                s.acceleration[0].to_string(),
                s.acceleration[1].to_string(),
                s.jerk[0].to_string(),
                s.jerk[1].to_string(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }
}
