//! Competition rule checks and acceleration-event scoring.

use crate::dynamics::state::{SimulationState, StateHistory};
use serde::{Deserialize, Serialize};

/// Accumulator outlet power limit (W).
pub const MAX_ACCUMULATOR_POWER: f64 = 80_000.0;

/// Longest run that still counts (s).
pub const MAX_RUN_TIME: f64 = 25.0;

pub const DEFAULT_MAX_POINTS: f64 = 75.0;

/// Share of the points awarded for completing the run at all.
const COMPLETION_SHARE: f64 = 0.05;

/// Tmax as a multiple of the fastest time.
const TMAX_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerCompliance {
    pub compliant: bool,
    /// Largest absolute power draw seen over the run (W).
    pub max_power_used: f64,
    /// Time of the first sample above the limit.
    pub first_violation: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeCompliance {
    pub compliant: bool,
    pub final_time: f64,
}

pub fn check_power_limit(history: &StateHistory, max_power: f64) -> PowerCompliance {
    let mut max_power_used: f64 = 0.0;
    let mut first_violation = None;
    for state in history {
        let power = state.diagnostics.power_consumed.abs();
        max_power_used = max_power_used.max(power);
        if first_violation.is_none() && power > max_power {
            first_violation = Some(state.time);
        }
    }

    PowerCompliance {
        compliant: first_violation.is_none(),
        max_power_used,
        first_violation,
    }
}

pub fn check_time_limit(final_state: &SimulationState, max_time: f64) -> TimeCompliance {
    TimeCompliance {
        compliant: final_state.time <= max_time,
        final_time: final_state.time,
    }
}

/// Tmax = 1.5 * fastest time.
pub fn t_max(fastest_time: f64) -> f64 {
    TMAX_FACTOR * fastest_time
}

/// Acceleration event score, clamped to `[0, max_points]`. Non-positive or
/// NaN inputs score zero.
///
/// `0.05 * P + 0.95 * P * (Tmax / t - 1) / 0.5`
pub fn acceleration_score(team_time: f64, fastest_time: f64, max_points: f64) -> f64 {
    if !(team_time > 0.0 && fastest_time > 0.0 && max_points > 0.0) {
        return 0.0;
    }
    let tmax = t_max(fastest_time);
    let performance = (tmax / team_time - 1.0) / (TMAX_FACTOR - 1.0);
    let score = COMPLETION_SHARE * max_points + (1.0 - COMPLETION_SHARE) * max_points * performance;
    score.clamp(0.0, max_points)
}
