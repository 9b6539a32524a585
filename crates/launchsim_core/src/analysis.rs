use crate::config::VehicleConfig;
use crate::dynamics::state::{Crossing, SimulationState, StateHistory};
use crate::simulation::SimulationResult;
use crate::sweep::{get_parameter, set_parameter, BatchRunner};
use anyhow::{anyhow, bail, Context, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Signals that can be extracted from a [`StateHistory`].
pub const SIGNALS: [&str; 19] = [
    "time",
    "position",
    "velocity",
    "wheel_speed_front",
    "wheel_speed_rear",
    "acceleration",
    "motor_speed",
    "motor_current",
    "motor_torque",
    "battery_current",
    "drive_force",
    "drag_force",
    "rolling_resistance",
    "normal_force_front",
    "normal_force_rear",
    "tire_force_front",
    "tire_force_rear",
    "slip_ratio_rear",
    "power_consumed",
];

pub fn signal_value(state: &SimulationState, name: &str) -> Option<f64> {
    let d = &state.diagnostics;
    let value = match name {
        "time" => state.time,
        "position" => state.position,
        "velocity" => state.velocity,
        "wheel_speed_front" => state.wheel_speed_front,
        "wheel_speed_rear" => state.wheel_speed_rear,
        "acceleration" => d.acceleration,
        "motor_speed" => d.motor_speed,
        "motor_current" => d.motor_current,
        "motor_torque" => d.motor_torque,
        "battery_current" => d.battery_current,
        "drive_force" => d.drive_force,
        "drag_force" => d.drag_force,
        "rolling_resistance" => d.rolling_resistance,
        "normal_force_front" => d.normal_force_front,
        "normal_force_rear" => d.normal_force_rear,
        "tire_force_front" => d.tire_force_front,
        "tire_force_rear" => d.tire_force_rear,
        "slip_ratio_rear" => d.slip_ratio_rear,
        "power_consumed" => d.power_consumed,
        _ => return None,
    };
    Some(value)
}

pub fn time_series(history: &StateHistory, name: &str) -> Result<Vec<f64>> {
    if !SIGNALS.contains(&name) {
        bail!("Unknown signal '{name}'.");
    }
    Ok(history.series(|state| signal_value(state, name).unwrap_or(f64::NAN)))
}

/// Every signal as a column, keyed by name.
pub fn extract_time_series(history: &StateHistory) -> BTreeMap<&'static str, Vec<f64>> {
    SIGNALS
        .iter()
        .map(|&name| {
            let column = history.series(|state| signal_value(state, name).unwrap_or(f64::NAN));
            (name, column)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignalStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub final_value: f64,
}

impl SignalStats {
    fn from_samples(samples: &[f64]) -> Option<Self> {
        let final_value = *samples.last()?;
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        Some(Self {
            min,
            max,
            mean,
            final_value,
        })
    }
}

/// Min, max, mean and final value of every signal. Empty for an empty history.
pub fn statistics(history: &StateHistory) -> BTreeMap<&'static str, SignalStats> {
    extract_time_series(history)
        .into_iter()
        .filter_map(|(name, column)| SignalStats::from_samples(&column).map(|stats| (name, stats)))
        .collect()
}

/// Distance marks reported as split times (m).
pub const SPLIT_DISTANCES: [f64; 2] = [25.0, 50.0];

/// Headline performance figures of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    /// Interpolated time and speed at each of [`SPLIT_DISTANCES`]; `None` for
    /// marks the run never reached.
    pub splits: Vec<(f64, Option<Crossing>)>,
    pub final_time: f64,
    pub final_velocity: f64,
    pub distance_traveled: f64,
    pub max_acceleration: f64,
    pub max_velocity: f64,
    /// Largest absolute accumulator power (W).
    pub max_power: f64,
    /// Final velocity over final time; zero for a run that never left t = 0.
    pub average_acceleration: f64,
}

impl PerformanceMetrics {
    pub fn split(&self, distance: f64) -> Option<Crossing> {
        self.splits
            .iter()
            .find(|(mark, _)| *mark == distance)
            .and_then(|(_, crossing)| *crossing)
    }
}

/// `None` for an empty history.
pub fn performance_metrics(history: &StateHistory) -> Option<PerformanceMetrics> {
    let last = history.last()?;
    let max_of = |signal: fn(&SimulationState) -> f64| {
        history.iter().map(signal).fold(f64::NEG_INFINITY, f64::max)
    };

    let average_acceleration = if history.len() > 1 && last.time > 0.0 {
        last.velocity / last.time
    } else {
        0.0
    };

    Some(PerformanceMetrics {
        splits: SPLIT_DISTANCES
            .iter()
            .map(|&mark| (mark, history.crossing(mark)))
            .collect(),
        final_time: last.time,
        final_velocity: last.velocity,
        distance_traveled: last.position,
        max_acceleration: max_of(|s| s.diagnostics.acceleration),
        max_velocity: max_of(|s| s.velocity),
        max_power: max_of(|s| s.diagnostics.power_consumed.abs()),
        average_acceleration,
    })
}

/// One line of a side-by-side comparison of runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub label: String,
    pub final_time: f64,
    pub final_distance: f64,
    pub final_velocity: f64,
    pub max_power_kw: f64,
    pub power_compliant: bool,
    pub time_compliant: bool,
    pub compliant: bool,
    /// Zero when the run was not scored.
    pub score: f64,
}

/// Lines up the key fields of several results. Without labels the rows are
/// named `Run 1`, `Run 2`, ...
pub fn compare_results(
    results: &[SimulationResult],
    labels: Option<&[String]>,
) -> Result<Vec<ComparisonRow>> {
    if let Some(labels) = labels {
        if labels.len() != results.len() {
            bail!("Got {} labels for {} results.", labels.len(), results.len());
        }
    }

    Ok(results
        .iter()
        .enumerate()
        .map(|(i, result)| ComparisonRow {
            label: labels.map_or_else(|| format!("Run {}", i + 1), |l| l[i].clone()),
            final_time: result.final_time,
            final_distance: result.final_distance,
            final_velocity: result.final_velocity,
            max_power_kw: result.max_power_used / 1000.0,
            power_compliant: result.power_compliant,
            time_compliant: result.time_compliant,
            compliant: result.compliant,
            score: result.score.unwrap_or(0.0),
        })
        .collect())
}

/// Scalar figure of merit extracted from a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    FinalTime,
    FinalVelocity,
    MaxPower,
    Score,
}

impl Metric {
    pub fn of(self, result: &SimulationResult) -> Option<f64> {
        match self {
            Metric::FinalTime => Some(result.final_time),
            Metric::FinalVelocity => Some(result.final_velocity),
            Metric::MaxPower => Some(result.max_power_used),
            Metric::Score => result.score,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SensitivityResult {
    pub parameter: String,
    pub metric: Metric,
    pub base_value: f64,
    pub values: Vec<f64>,
    pub metric_values: Vec<f64>,
    /// Mean of (% change in metric) / (% change in parameter).
    pub coefficient: f64,
}

fn metric_for(runner: &BatchRunner, config: &VehicleConfig, metric: Metric) -> Result<f64> {
    let result = runner.run_single(config)?;
    metric
        .of(&result)
        .ok_or_else(|| anyhow!("Metric {metric:?} is unavailable; set a fastest reference time."))
}

/// Sweeps one parameter and reports its mean elasticity.
///
/// The middle entry of `values` is the reference point; the others are
/// compared against it.
pub fn parameter_sensitivity(
    runner: &BatchRunner,
    path: &str,
    values: &[f64],
    metric: Metric,
) -> Result<SensitivityResult> {
    if values.len() < 2 {
        bail!("Sensitivity needs at least two parameter values.");
    }
    let base_index = values.len() / 2;
    let base_value = values[base_index];
    if base_value == 0.0 {
        bail!("Reference value of '{path}' is zero; elasticity is undefined.");
    }

    let metric_values = values
        .iter()
        .map(|&value| {
            let config = set_parameter(runner.base(), path, value)?;
            metric_for(runner, &config, metric)
                .with_context(|| format!("Failed to evaluate '{path}' = {value}"))
        })
        .collect::<Result<Vec<f64>>>()?;

    let base_metric = metric_values[base_index];
    if base_metric == 0.0 {
        bail!("Reference metric is zero; elasticity is undefined.");
    }

    let ratios: Vec<f64> = values
        .iter()
        .zip(&metric_values)
        .enumerate()
        .filter(|(i, (value, _))| *i != base_index && **value != base_value)
        .map(|(_, (value, metric_value))| {
            let param_change = (value - base_value) / base_value;
            let metric_change = (metric_value - base_metric) / base_metric;
            metric_change / param_change
        })
        .collect();
    if ratios.is_empty() {
        bail!("All sweep values equal the reference value.");
    }
    let coefficient = ratios.iter().sum::<f64>() / ratios.len() as f64;

    Ok(SensitivityResult {
        parameter: path.to_string(),
        metric,
        base_value,
        values: values.to_vec(),
        metric_values,
        coefficient,
    })
}

/// Orders results by descending absolute coefficient.
pub fn rank_sensitivities(results: &mut [SensitivityResult]) {
    results.sort_by(|a, b| b.coefficient.abs().total_cmp(&a.coefficient.abs()));
}

/// Central-difference elasticities: rows are metrics, columns parameters.
#[derive(Debug, Clone)]
pub struct SensitivityMatrix {
    pub parameters: Vec<String>,
    pub metrics: Vec<Metric>,
    pub elasticities: DMatrix<f64>,
}

impl SensitivityMatrix {
    pub fn elasticity(&self, metric: Metric, parameter: &str) -> Option<f64> {
        let row = self.metrics.iter().position(|&m| m == metric)?;
        let col = self.parameters.iter().position(|p| p == parameter)?;
        Some(self.elasticities[(row, col)])
    }

    /// Parameters ordered by the Euclidean norm of their column.
    pub fn ranking(&self) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = self
            .parameters
            .iter()
            .enumerate()
            .map(|(col, name)| (name.clone(), self.elasticities.column(col).norm()))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    /// Row-major nested vectors, for serialization.
    pub fn rows(&self) -> Vec<Vec<f64>> {
        self.elasticities
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect()
    }
}

pub fn sensitivity_matrix(
    runner: &BatchRunner,
    paths: &[&str],
    metrics: &[Metric],
    relative_step: f64,
) -> Result<SensitivityMatrix> {
    if paths.is_empty() || metrics.is_empty() {
        bail!("Sensitivity matrix needs at least one parameter and one metric.");
    }
    if !(relative_step > 0.0 && relative_step < 1.0) {
        bail!("Relative step must be in (0, 1).");
    }

    let base_result = runner.run_single(runner.base())?;
    let base_metrics = metrics
        .iter()
        .map(|m| {
            m.of(&base_result)
                .filter(|v| *v != 0.0)
                .ok_or_else(|| {
                    anyhow!("Metric {m:?} is unavailable or zero at the reference point.")
                })
        })
        .collect::<Result<Vec<f64>>>()?;

    let mut elasticities = DMatrix::zeros(metrics.len(), paths.len());
    for (col, path) in paths.iter().enumerate() {
        let value = get_parameter(runner.base(), path)?;
        if value == 0.0 {
            bail!("Reference value of '{path}' is zero; elasticity is undefined.");
        }
        let up = set_parameter(runner.base(), path, value * (1.0 + relative_step))?;
        let down = set_parameter(runner.base(), path, value * (1.0 - relative_step))?;
        let up = runner
            .run_single(&up)
            .with_context(|| format!("Failed to perturb '{path}' upward"))?;
        let down = runner
            .run_single(&down)
            .with_context(|| format!("Failed to perturb '{path}' downward"))?;

        for (row, metric) in metrics.iter().enumerate() {
            let (Some(hi), Some(lo)) = (metric.of(&up), metric.of(&down)) else {
                bail!("Metric {metric:?} is unavailable for '{path}'.");
            };
            elasticities[(row, col)] = (hi - lo) / (2.0 * relative_step * base_metrics[row]);
        }
    }

    Ok(SensitivityMatrix {
        parameters: paths.iter().map(|p| p.to_string()).collect(),
        metrics: metrics.to_vec(),
        elasticities,
    })
}
