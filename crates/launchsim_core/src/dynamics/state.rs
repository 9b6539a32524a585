//! Immutable vehicle state snapshots and the run history.

use crate::traits::Integrable;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul};

/// Instantaneous quantities recorded alongside the integrated state.
///
/// These are outputs of one evaluation of the dynamics pipeline; they are
/// never integrated.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    pub acceleration: f64,
    pub motor_speed: f64,
    pub motor_current: f64,
    /// Motor shaft torque (N*m).
    pub motor_torque: f64,
    pub battery_current: f64,
    pub drive_force: f64,
    /// Signed, negative while moving forward.
    pub drag_force: f64,
    /// Signed, negative while moving forward.
    pub rolling_resistance: f64,
    pub normal_force_front: f64,
    pub normal_force_rear: f64,
    pub tire_force_front: f64,
    pub tire_force_rear: f64,
    pub slip_ratio_rear: f64,
    /// Electrical power drawn from the accumulator (W).
    pub power_consumed: f64,
}

/// Full vehicle state at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationState {
    pub time: f64,
    pub position: f64,
    pub velocity: f64,
    pub wheel_speed_front: f64,
    pub wheel_speed_rear: f64,
    #[serde(flatten)]
    pub diagnostics: Diagnostics,
}

impl SimulationState {
    pub fn with_diagnostics(&self, diagnostics: Diagnostics) -> Self {
        Self {
            diagnostics,
            ..*self
        }
    }
}

/// Time-derivative of a [`SimulationState`].
///
/// Linear combinations act on the rates only; the diagnostics snapshot of the
/// left operand is carried through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DerivativeState {
    /// Always 1.
    pub time: f64,
    pub position: f64,
    pub velocity: f64,
    pub wheel_speed_front: f64,
    pub wheel_speed_rear: f64,
    pub diagnostics: Diagnostics,
}

impl Add for DerivativeState {
    type Output = DerivativeState;

    fn add(self, rhs: DerivativeState) -> DerivativeState {
        DerivativeState {
            time: self.time + rhs.time,
            position: self.position + rhs.position,
            velocity: self.velocity + rhs.velocity,
            wheel_speed_front: self.wheel_speed_front + rhs.wheel_speed_front,
            wheel_speed_rear: self.wheel_speed_rear + rhs.wheel_speed_rear,
            diagnostics: self.diagnostics,
        }
    }
}

impl Mul<f64> for DerivativeState {
    type Output = DerivativeState;

    fn mul(self, rhs: f64) -> DerivativeState {
        DerivativeState {
            time: self.time * rhs,
            position: self.position * rhs,
            velocity: self.velocity * rhs,
            wheel_speed_front: self.wheel_speed_front * rhs,
            wheel_speed_rear: self.wheel_speed_rear * rhs,
            diagnostics: self.diagnostics,
        }
    }
}

impl Integrable for SimulationState {
    type Rate = DerivativeState;

    /// Diagnostics are carried over from `self`; stage evaluations read the
    /// base state's acceleration from them.
    fn advanced(&self, rate: &DerivativeState, h: f64) -> Self {
        Self {
            time: self.time + h * rate.time,
            position: self.position + h * rate.position,
            velocity: self.velocity + h * rate.velocity,
            wheel_speed_front: self.wheel_speed_front + h * rate.wheel_speed_front,
            wheel_speed_rear: self.wheel_speed_rear + h * rate.wheel_speed_rear,
            diagnostics: self.diagnostics,
        }
    }
}

/// Interpolated passage of a distance mark.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Crossing {
    pub time: f64,
    pub velocity: f64,
}

/// Append-only sequence of accepted states, ordered by time.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct StateHistory {
    states: Vec<SimulationState>,
}

impl StateHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            states: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, state: SimulationState) {
        self.states.push(state);
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn first(&self) -> Option<&SimulationState> {
        self.states.first()
    }

    pub fn last(&self) -> Option<&SimulationState> {
        self.states.last()
    }

    pub fn get(&self, index: usize) -> Option<&SimulationState> {
        self.states.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SimulationState> {
        self.states.iter()
    }

    pub fn as_slice(&self) -> &[SimulationState] {
        &self.states
    }

    /// First passage of `distance`, linearly interpolated between the two
    /// states that bracket it. `None` if the run never got there.
    pub fn crossing(&self, distance: f64) -> Option<Crossing> {
        let after = self.states.iter().position(|s| s.position >= distance)?;
        let after_state = &self.states[after];
        let at_sample = Crossing {
            time: after_state.time,
            velocity: after_state.velocity,
        };
        if after == 0 {
            return Some(at_sample);
        }
        let before = &self.states[after - 1];
        let span = after_state.position - before.position;
        if span <= 0.0 {
            return Some(at_sample);
        }
        let fraction = (distance - before.position) / span;
        Some(Crossing {
            time: before.time + fraction * (after_state.time - before.time),
            velocity: before.velocity + fraction * (after_state.velocity - before.velocity),
        })
    }

    /// Extracts one scalar per state, in time order.
    pub fn series(&self, signal: impl Fn(&SimulationState) -> f64) -> Vec<f64> {
        self.states.iter().map(signal).collect()
    }
}

impl<'a> IntoIterator for &'a StateHistory {
    type Item = &'a SimulationState;
    type IntoIter = std::slice::Iter<'a, SimulationState>;

    fn into_iter(self) -> Self::IntoIter {
        self.states.iter()
    }
}

impl FromIterator<SimulationState> for StateHistory {
    fn from_iter<I: IntoIterator<Item = SimulationState>>(iter: I) -> Self {
        Self {
            states: iter.into_iter().collect(),
        }
    }
}
