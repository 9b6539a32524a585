//! Parameter paths, sweeps and batch execution.
//!
//! Parameters are addressed as `category.name` (for example `mass.total_mass`)
//! and resolved through the serde representation of [`VehicleConfig`].

use crate::config::{ConfigError, VehicleConfig};
use crate::simulation::{AccelerationSimulation, ComplianceLimits, SimulationResult};
use anyhow::{bail, Result};
use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

fn split_path(path: &str) -> Result<(&str, &str), ConfigError> {
    match path.split_once('.') {
        Some((category, name))
            if !category.is_empty() && !name.is_empty() && !name.contains('.') =>
        {
            Ok((category, name))
        }
        _ => Err(ConfigError::MalformedPath(path.to_string())),
    }
}

/// Reads a numeric parameter.
pub fn get_parameter(config: &VehicleConfig, path: &str) -> Result<f64, ConfigError> {
    let (category, name) = split_path(path)?;
    let tree = serde_json::to_value(config)?;
    tree.get(category)
        .and_then(|section| section.get(name))
        .and_then(Value::as_f64)
        .ok_or_else(|| ConfigError::UnknownParameter(path.to_string()))
}

/// Returns a copy of `config` with one numeric parameter replaced.
///
/// The copy is not validated; sweeps may deliberately step outside the
/// feasible region and let the run report it.
pub fn set_parameter(
    config: &VehicleConfig,
    path: &str,
    value: f64,
) -> Result<VehicleConfig, ConfigError> {
    let (category, name) = split_path(path)?;
    let mut tree = serde_json::to_value(config)?;
    let slot = tree
        .get_mut(category)
        .and_then(|section| section.get_mut(name))
        .filter(|slot| slot.is_number())
        .ok_or_else(|| ConfigError::UnknownParameter(path.to_string()))?;
    *slot = Value::from(value);
    Ok(serde_json::from_value(tree)?)
}

/// One evaluated configuration of a sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SweepPoint {
    pub assignments: Vec<(String, f64)>,
    pub result: Option<SimulationResult>,
    /// Why the point produced no result, e.g. an infeasible configuration.
    pub error: Option<String>,
}

impl SweepPoint {
    fn new(assignments: Vec<(String, f64)>, outcome: Result<SimulationResult>) -> Self {
        match outcome {
            Ok(result) => Self {
                assignments,
                result: Some(result),
                error: None,
            },
            Err(err) => Self {
                assignments,
                result: None,
                error: Some(format!("{err:#}")),
            },
        }
    }
}

/// Runs many independent simulations of variations of one base vehicle.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    base: VehicleConfig,
    limits: ComplianceLimits,
    fastest_time: Option<f64>,
    parallel: bool,
}

impl BatchRunner {
    pub fn new(base: VehicleConfig) -> Self {
        Self {
            base,
            limits: ComplianceLimits::default(),
            fastest_time: None,
            parallel: true,
        }
    }

    pub fn with_fastest_time(mut self, fastest_time: Option<f64>) -> Self {
        self.fastest_time = fastest_time;
        self
    }

    pub fn with_limits(mut self, limits: ComplianceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Runs on the rayon pool when true, sequentially otherwise.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn base(&self) -> &VehicleConfig {
        &self.base
    }

    pub fn run_single(&self, config: &VehicleConfig) -> Result<SimulationResult> {
        let simulation = AccelerationSimulation::new(config.clone())?.with_limits(self.limits);
        Ok(simulation.run(self.fastest_time).result)
    }

    /// Results are returned in input order.
    pub fn run_batch(&self, configs: &[VehicleConfig]) -> Vec<Result<SimulationResult>> {
        info!(
            "running batch of {} simulations ({})",
            configs.len(),
            if self.parallel { "parallel" } else { "sequential" }
        );
        if self.parallel {
            configs.par_iter().map(|config| self.run_single(config)).collect()
        } else {
            configs.iter().map(|config| self.run_single(config)).collect()
        }
    }

    /// Varies one parameter of the base configuration.
    pub fn parameter_sweep(&self, path: &str, values: &[f64]) -> Result<Vec<SweepPoint>> {
        if values.is_empty() {
            bail!("Sweep over '{path}' needs at least one value.");
        }
        let assignments: Vec<Vec<(String, f64)>> = values
            .iter()
            .map(|&value| vec![(path.to_string(), value)])
            .collect();
        self.run_assignments(assignments)
    }

    /// Full-factorial sweep over several parameters.
    pub fn multi_parameter_sweep(
        &self,
        parameters: &BTreeMap<String, Vec<f64>>,
    ) -> Result<Vec<SweepPoint>> {
        if parameters.is_empty() {
            bail!("Multi-parameter sweep needs at least one parameter.");
        }
        let mut grid: Vec<Vec<(String, f64)>> = vec![Vec::new()];
        for (path, values) in parameters {
            if values.is_empty() {
                bail!("Sweep over '{path}' needs at least one value.");
            }
            grid = grid
                .into_iter()
                .flat_map(|partial| {
                    values.iter().map(move |&value| {
                        let mut next = partial.clone();
                        next.push((path.clone(), value));
                        next
                    })
                })
                .collect();
        }
        self.run_assignments(grid)
    }

    fn run_assignments(&self, grid: Vec<Vec<(String, f64)>>) -> Result<Vec<SweepPoint>> {
        let configs = grid
            .iter()
            .map(|assignments| {
                assignments
                    .iter()
                    .try_fold(self.base.clone(), |config, (path, value)| {
                        set_parameter(&config, path, *value)
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let points: Vec<SweepPoint> = grid
            .into_iter()
            .zip(self.run_batch(&configs))
            .map(|(assignments, outcome)| SweepPoint::new(assignments, outcome))
            .collect();

        for point in points.iter().filter(|p| p.error.is_some()) {
            warn!(
                "sweep point {:?} failed: {}",
                point.assignments,
                point.error.as_deref().unwrap_or_default()
            );
        }
        Ok(points)
    }
}
