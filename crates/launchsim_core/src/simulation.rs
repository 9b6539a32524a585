use crate::config::{ConfigError, VehicleConfig};
use crate::dynamics::solver::{DynamicsSolver, RunStatus};
use crate::dynamics::state::StateHistory;
use crate::rules::{
    acceleration_score, check_power_limit, check_time_limit, DEFAULT_MAX_POINTS,
    MAX_ACCUMULATOR_POWER, MAX_RUN_TIME,
};
use serde::{Deserialize, Serialize};

/// Rule limits a run is judged against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplianceLimits {
    pub max_power: f64,
    pub max_time: f64,
    pub max_points: f64,
}

impl Default for ComplianceLimits {
    fn default() -> Self {
        Self {
            max_power: MAX_ACCUMULATOR_POWER,
            max_time: MAX_RUN_TIME,
            max_points: DEFAULT_MAX_POINTS,
        }
    }
}

/// Summary of one acceleration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub status: RunStatus,
    pub compliant: bool,
    pub power_compliant: bool,
    pub time_compliant: bool,
    pub max_power_used: f64,
    pub first_power_violation: Option<f64>,
    pub final_time: f64,
    pub finish_time: Option<f64>,
    pub final_distance: f64,
    pub final_velocity: f64,
    pub score: Option<f64>,
    pub fastest_time: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct SimulationOutcome {
    pub result: SimulationResult,
    pub history: StateHistory,
}

/// A validated configuration ready to run.
#[derive(Debug, Clone)]
pub struct AccelerationSimulation {
    config: VehicleConfig,
    limits: ComplianceLimits,
}

impl AccelerationSimulation {
    pub fn new(config: VehicleConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            limits: ComplianceLimits::default(),
        })
    }

    pub fn with_limits(mut self, limits: ComplianceLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn config(&self) -> &VehicleConfig {
        &self.config
    }

    pub fn limits(&self) -> &ComplianceLimits {
        &self.limits
    }

    /// Runs once and judges the result. A score is only produced when the
    /// fastest reference time is known; a run that never finishes scores zero.
    pub fn run(&self, fastest_time: Option<f64>) -> SimulationOutcome {
        let solution = DynamicsSolver::new(&self.config).solve();
        let final_state = solution.final_state();

        let power = check_power_limit(&solution.history, self.limits.max_power);
        let time = check_time_limit(&final_state, self.limits.max_time);
        let finished = solution.finished();

        let score = fastest_time.map(|fastest| {
            if finished {
                acceleration_score(final_state.time, fastest, self.limits.max_points)
            } else {
                0.0
            }
        });

        let result = SimulationResult {
            status: solution.status,
            compliant: finished && power.compliant && time.compliant,
            power_compliant: power.compliant,
            time_compliant: time.compliant,
            max_power_used: power.max_power_used,
            first_power_violation: power.first_violation,
            final_time: final_state.time,
            finish_time: solution.finish_time,
            final_distance: final_state.position,
            final_velocity: final_state.velocity,
            score,
            fastest_time,
        };

        SimulationOutcome {
            result,
            history: solution.history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_run_is_compliant() {
        let simulation = AccelerationSimulation::new(VehicleConfig::baseline())
            .expect("baseline should validate");
        let outcome = simulation.run(Some(4.0));
        let result = &outcome.result;

        assert_eq!(result.status, RunStatus::Finished);
        assert!(result.compliant);
        assert!(result.power_compliant && result.time_compliant);
        assert!(result.max_power_used <= MAX_ACCUMULATOR_POWER + 1e-6);
        assert!(result.final_distance >= 75.0);
        let score = result.score.expect("score requested");
        assert!(score > 0.0 && score <= DEFAULT_MAX_POINTS);
        assert_eq!(outcome.history.len() as f64 - 1.0, (result.final_time / 0.001).round());
    }

    #[test]
    fn no_score_without_reference_time() {
        let simulation = AccelerationSimulation::new(VehicleConfig::baseline())
            .expect("baseline should validate");
        assert_eq!(simulation.run(None).result.score, None);
    }

    #[test]
    fn rejects_invalid_configuration() {
        let mut config = VehicleConfig::baseline();
        config.mass.total_mass = -1.0;
        let err = AccelerationSimulation::new(config).expect_err("should reject");
        assert!(format!("{err}").contains("total_mass"));
    }

    #[test]
    fn slow_run_fails_time_limit() {
        let mut config = VehicleConfig::baseline();
        config.simulation.target_distance = 400.0;
        config.simulation.max_time = 60.0;
        config.powertrain.max_power_accumulator_outlet = 2_000.0;
        let simulation = AccelerationSimulation::new(config).expect("config should validate");
        let result = simulation.run(Some(4.0)).result;

        assert!(result.final_time > MAX_RUN_TIME);
        assert!(!result.time_compliant);
        assert!(!result.compliant);
    }

    #[test]
    fn timed_out_run_scores_zero() {
        let mut config = VehicleConfig::baseline();
        config.simulation.max_time = 1.0;
        let simulation = AccelerationSimulation::new(config).expect("config should validate");
        let result = simulation.run(Some(4.0)).result;

        assert_eq!(result.status, RunStatus::TimedOut);
        assert!(result.time_compliant);
        assert!(!result.compliant);
        assert_eq!(result.score, Some(0.0));
    }

    #[test]
    fn tighter_power_limit_flags_violation() {
        let simulation = AccelerationSimulation::new(VehicleConfig::baseline())
            .expect("baseline should validate")
            .with_limits(ComplianceLimits {
                max_power: 50_000.0,
                ..ComplianceLimits::default()
            });
        let result = simulation.run(None).result;

        assert!(!result.power_compliant);
        assert!(result.first_power_violation.is_some());
    }
}
