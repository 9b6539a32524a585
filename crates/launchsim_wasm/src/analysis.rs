//! Scoring, sweep and sensitivity helpers for JavaScript hosts.

use crate::system::js_error;
use launchsim_core::analysis::{sensitivity_matrix, Metric};
use launchsim_core::rules::{self, DEFAULT_MAX_POINTS};
use launchsim_core::sweep::{BatchRunner, SweepPoint};
use launchsim_core::VehicleConfig;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[derive(Serialize)]
struct SensitivityPayload {
    parameters: Vec<String>,
    metrics: Vec<Metric>,
    elasticities: Vec<Vec<f64>>,
    ranking: Vec<(String, f64)>,
}

/// Event score for `team_time` against the fastest time (75 points by default).
#[wasm_bindgen]
pub fn acceleration_score(team_time: f64, fastest_time: f64, max_points: Option<f64>) -> f64 {
    rules::acceleration_score(team_time, fastest_time, max_points.unwrap_or(DEFAULT_MAX_POINTS))
}

#[wasm_bindgen]
pub fn baseline_config() -> Result<JsValue, JsValue> {
    to_value(&VehicleConfig::baseline()).map_err(|e| js_error("Serialization error", e))
}

/// No worker threads in a plain wasm32 build.
fn sequential_runner(config: VehicleConfig, fastest_time: Option<f64>) -> BatchRunner {
    BatchRunner::new(config)
        .with_fastest_time(fastest_time)
        .parallel(false)
}

fn runner_from(config: JsValue, fastest_time: Option<f64>) -> Result<BatchRunner, JsValue> {
    let config: VehicleConfig =
        from_value(config).map_err(|e| js_error("Invalid vehicle config", e))?;
    Ok(sequential_runner(config, fastest_time))
}

fn sweep_points(
    runner: &BatchRunner,
    path: &str,
    values: &[f64],
) -> Result<Vec<SweepPoint>, String> {
    runner.parameter_sweep(path, values).map_err(|e| format!("{e:#}"))
}

fn sensitivity_payload(
    runner: &BatchRunner,
    paths: &[String],
    relative_step: f64,
) -> Result<SensitivityPayload, String> {
    let paths: Vec<&str> = paths.iter().map(String::as_str).collect();
    let matrix = sensitivity_matrix(
        runner,
        &paths,
        &[Metric::FinalTime, Metric::FinalVelocity],
        relative_step,
    )
    .map_err(|e| format!("{e:#}"))?;

    Ok(SensitivityPayload {
        elasticities: matrix.rows(),
        ranking: matrix.ranking(),
        parameters: matrix.parameters,
        metrics: matrix.metrics,
    })
}

/// Runs the base configuration once per value of `path`.
#[wasm_bindgen]
pub fn parameter_sweep(
    config: JsValue,
    path: &str,
    values: Vec<f64>,
    fastest_time: Option<f64>,
) -> Result<JsValue, JsValue> {
    let runner = runner_from(config, fastest_time)?;
    let points = sweep_points(&runner, path, &values).map_err(|e| js_error("Sweep failed", e))?;
    to_value(&points).map_err(|e| js_error("Serialization error", e))
}

/// Final-time and final-velocity elasticities for each parameter path.
#[wasm_bindgen]
pub fn sensitivity(
    config: JsValue,
    paths: Vec<String>,
    relative_step: f64,
) -> Result<JsValue, JsValue> {
    let runner = runner_from(config, None)?;
    let payload = sensitivity_payload(&runner, &paths, relative_step)
        .map_err(|e| js_error("Sensitivity failed", e))?;
    to_value(&payload).map_err(|e| js_error("Serialization error", e))
}
