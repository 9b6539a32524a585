//! Vehicle configuration: schema, defaults, validation and JSON loading.
//!
//! The dynamics core assumes a validated configuration. Everything that can
//! make the force models ill-defined (zero mass, zero radius, a power ceiling
//! above the regulatory limit, ...) is rejected here, before a solver is built.

use crate::solvers::RK4_STABILITY_LIMIT;
use crate::vehicle::tire::SLIP_VELOCITY_FLOOR;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Regulatory ceiling on accumulator outlet power (W).
pub const REGULATORY_POWER_LIMIT: f64 = 80_000.0;

/// Standard gravity (m/s^2).
pub const GRAVITY: f64 = 9.81;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid JSON or does not match the schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Only JSON documents are understood.
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// One or more physical invariants are violated.
    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),

    /// A parameter path was not of the form `category.parameter`.
    #[error("parameter path must look like 'category.parameter', got '{0}'")]
    MalformedPath(String),

    /// A parameter path does not name a numeric configuration field.
    #[error("unknown numeric parameter '{0}'")]
    UnknownParameter(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassConfig {
    /// Total mass including driver (kg).
    pub total_mass: f64,
    /// Longitudinal CG position measured rearward from the front axle (m).
    pub cg_x: f64,
    /// CG height above ground (m).
    pub cg_z: f64,
    pub wheelbase: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TireConfig {
    /// Loaded rolling radius (m).
    pub radius_loaded: f64,
    /// Peak friction coefficient.
    pub mu_max: f64,
    /// Slip ratio at which `mu_max` is reached.
    pub mu_slip_optimal: f64,
    #[serde(default = "default_rolling_resistance")]
    pub rolling_resistance_coeff: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowertrainConfig {
    /// Motor torque constant (N*m/A).
    pub motor_torque_constant: f64,
    /// Peak phase current (A).
    pub motor_max_current: f64,
    /// Motor speed above which no torque is produced (rad/s).
    pub motor_max_speed: f64,
    #[serde(default = "default_efficiency")]
    pub motor_efficiency: f64,
    pub battery_voltage_nominal: f64,
    /// Accumulator internal resistance (ohm).
    pub battery_internal_resistance: f64,
    pub battery_max_current: f64,
    pub gear_ratio: f64,
    #[serde(default = "default_efficiency")]
    pub drivetrain_efficiency: f64,
    /// Accumulator outlet power ceiling (W).
    #[serde(default = "default_max_power")]
    pub max_power_accumulator_outlet: f64,
    /// Rotational inertia of a single wheel (kg*m^2).
    #[serde(default = "default_wheel_inertia")]
    pub wheel_inertia: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AeroConfig {
    /// Drag area, Cd * A (m^2).
    pub cda: f64,
    /// Front downforce area, Cl * A (m^2).
    #[serde(default)]
    pub cl_front: f64,
    /// Rear downforce area, Cl * A (m^2).
    #[serde(default)]
    pub cl_rear: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SuspensionConfig {
    /// Validated and carried through serialization; the rigid-chassis load
    /// transfer in `MassProperties` does not read it.
    pub anti_squat_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Wheel torque ceiling during launch (N*m).
    pub launch_torque_limit: f64,
    pub target_slip_ratio: f64,
    /// Launch torque ramp (N*m/s).
    pub torque_ramp_rate: f64,
    pub traction_control_enabled: bool,
    /// Scale reduction per second per unit of excess slip.
    pub traction_control_gain: f64,
    /// Scale recovery per second while slip is on target.
    pub traction_control_recovery_rate: f64,
    pub traction_control_min_scale: f64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            launch_torque_limit: 1000.0,
            target_slip_ratio: 0.15,
            torque_ramp_rate: 5000.0,
            traction_control_enabled: true,
            traction_control_gain: 20.0,
            traction_control_recovery_rate: 2.0,
            traction_control_min_scale: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Air density (kg/m^3).
    pub air_density: f64,
    /// Track grade (rad), positive uphill.
    pub track_grade: f64,
    /// Multiplier applied to the tire peak friction.
    pub surface_mu_scaling: f64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            air_density: 1.225,
            track_grade: 0.0,
            surface_mu_scaling: 1.0,
        }
    }
}

/// Fixed-step integration settings for a single run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub dt: f64,
    pub max_time: f64,
    pub target_distance: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            dt: 0.001,
            max_time: 30.0,
            target_distance: 75.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleConfig {
    pub mass: MassConfig,
    pub tires: TireConfig,
    pub powertrain: PowertrainConfig,
    pub aerodynamics: AeroConfig,
    #[serde(default)]
    pub suspension: SuspensionConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub environment: EnvironmentConfig,
    #[serde(default)]
    pub simulation: SimulationSettings,
}

fn default_rolling_resistance() -> f64 {
    0.015
}

fn default_efficiency() -> f64 {
    0.95
}

fn default_max_power() -> f64 {
    REGULATORY_POWER_LIMIT
}

fn default_wheel_inertia() -> f64 {
    0.1
}

impl VehicleConfig {
    /// A representative electric car; identical to `configs/base_vehicle.json`.
    pub fn baseline() -> Self {
        Self {
            mass: MassConfig {
                total_mass: 280.0,
                cg_x: 0.85,
                cg_z: 0.28,
                wheelbase: 1.55,
            },
            tires: TireConfig {
                radius_loaded: 0.23,
                mu_max: 1.5,
                mu_slip_optimal: 0.15,
                rolling_resistance_coeff: 0.015,
            },
            powertrain: PowertrainConfig {
                motor_torque_constant: 0.5,
                motor_max_current: 250.0,
                motor_max_speed: 1800.0,
                motor_efficiency: 0.95,
                battery_voltage_nominal: 600.0,
                battery_internal_resistance: 0.1,
                battery_max_current: 200.0,
                gear_ratio: 5.0,
                drivetrain_efficiency: 0.95,
                max_power_accumulator_outlet: REGULATORY_POWER_LIMIT,
                wheel_inertia: 0.3,
            },
            aerodynamics: AeroConfig {
                cda: 1.1,
                cl_front: 1.0,
                cl_rear: 1.4,
            },
            suspension: SuspensionConfig::default(),
            control: ControlConfig::default(),
            environment: EnvironmentConfig::default(),
            simulation: SimulationSettings::default(),
        }
    }

    /// Parses a JSON document and validates it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: VehicleConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Stiffness (1/s) of the rear-wheel spin equation at launch: slip on its
    /// velocity floor, friction on the rising branch, and the rear axle
    /// carrying its grip-limited load. `None` for massless wheels, which roll
    /// with the road.
    pub fn wheel_spin_stiffness(&self) -> Option<f64> {
        let m = &self.mass;
        let t = &self.tires;
        let axle_inertia = 2.0 * self.powertrain.wheel_inertia;
        if axle_inertia <= 0.0 || t.mu_slip_optimal <= 0.0 || m.wheelbase <= 0.0 {
            return None;
        }

        let mu = t.mu_max * self.environment.surface_mu_scaling;
        let weight = m.total_mass * GRAVITY;
        let static_rear = weight * m.cg_x / m.wheelbase;
        // N_r = static + m*a*h/L with a = mu*N_r/m
        let headroom = 1.0 - mu * m.cg_z / m.wheelbase;
        let rear_load = if headroom > 0.0 {
            (static_rear / headroom).min(weight)
        } else {
            weight
        };

        let r = t.radius_loaded;
        Some(mu / t.mu_slip_optimal * rear_load * r * r / (axle_inertia * SLIP_VELOCITY_FLOOR))
    }

    /// Fails with every violated invariant at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let issues = self.issues();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(issues))
        }
    }

    /// Lists every violated invariant; empty when the configuration is usable.
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let mut require = |ok: bool, message: &str| {
            if !ok {
                issues.push(message.to_string());
            }
        };

        let m = &self.mass;
        require(m.total_mass > 0.0, "mass.total_mass must be positive");
        require(m.wheelbase > 0.0, "mass.wheelbase must be positive");
        require(
            m.cg_x >= 0.0 && m.cg_x <= m.wheelbase,
            "mass.cg_x must lie between the axles",
        );
        require(m.cg_z >= 0.0, "mass.cg_z must not be negative");

        let t = &self.tires;
        require(t.radius_loaded > 0.0, "tires.radius_loaded must be positive");
        require(t.mu_max > 0.0, "tires.mu_max must be positive");
        require(
            t.mu_slip_optimal > 0.0 && t.mu_slip_optimal < 1.0,
            "tires.mu_slip_optimal must be in (0, 1)",
        );
        require(
            t.rolling_resistance_coeff >= 0.0,
            "tires.rolling_resistance_coeff must not be negative",
        );

        let p = &self.powertrain;
        require(
            p.max_power_accumulator_outlet > 0.0,
            "powertrain.max_power_accumulator_outlet must be positive",
        );
        require(
            p.max_power_accumulator_outlet <= REGULATORY_POWER_LIMIT,
            "powertrain.max_power_accumulator_outlet exceeds the 80 kW limit",
        );
        require(
            p.motor_torque_constant > 0.0,
            "powertrain.motor_torque_constant must be positive",
        );
        require(
            p.motor_max_current > 0.0,
            "powertrain.motor_max_current must be positive",
        );
        require(
            p.motor_max_speed > 0.0,
            "powertrain.motor_max_speed must be positive",
        );
        require(
            p.motor_efficiency > 0.0 && p.motor_efficiency <= 1.0,
            "powertrain.motor_efficiency must be in (0, 1]",
        );
        require(
            p.drivetrain_efficiency > 0.0 && p.drivetrain_efficiency <= 1.0,
            "powertrain.drivetrain_efficiency must be in (0, 1]",
        );
        require(p.gear_ratio > 0.0, "powertrain.gear_ratio must be positive");
        require(
            p.battery_voltage_nominal > 0.0,
            "powertrain.battery_voltage_nominal must be positive",
        );
        require(
            p.battery_internal_resistance >= 0.0,
            "powertrain.battery_internal_resistance must not be negative",
        );
        require(
            p.battery_max_current > 0.0,
            "powertrain.battery_max_current must be positive",
        );
        require(
            2.0 * p.battery_internal_resistance * p.battery_max_current
                <= p.battery_voltage_nominal,
            "powertrain.battery_max_current is beyond the accumulator's maximum power point",
        );
        require(
            p.wheel_inertia >= 0.0,
            "powertrain.wheel_inertia must not be negative",
        );

        let a = &self.aerodynamics;
        require(a.cda >= 0.0, "aerodynamics.cda must not be negative");
        require(
            a.cl_front >= 0.0 && a.cl_rear >= 0.0,
            "aerodynamics downforce coefficients must not be negative",
        );

        require(
            (0.0..=1.0).contains(&self.suspension.anti_squat_ratio),
            "suspension.anti_squat_ratio must be in [0, 1]",
        );

        let c = &self.control;
        require(
            c.launch_torque_limit > 0.0,
            "control.launch_torque_limit must be positive",
        );
        require(
            c.target_slip_ratio > 0.0 && c.target_slip_ratio < 1.0,
            "control.target_slip_ratio must be in (0, 1)",
        );
        require(
            c.torque_ramp_rate > 0.0,
            "control.torque_ramp_rate must be positive",
        );
        require(
            c.traction_control_gain >= 0.0 && c.traction_control_recovery_rate >= 0.0,
            "control traction-control rates must not be negative",
        );
        require(
            c.traction_control_min_scale > 0.0 && c.traction_control_min_scale <= 1.0,
            "control.traction_control_min_scale must be in (0, 1]",
        );

        let e = &self.environment;
        require(
            e.air_density >= 0.0,
            "environment.air_density must not be negative",
        );
        require(
            e.track_grade.abs() < FRAC_PI_2,
            "environment.track_grade must be within (-pi/2, pi/2)",
        );
        require(
            e.surface_mu_scaling > 0.0,
            "environment.surface_mu_scaling must be positive",
        );

        let s = &self.simulation;
        require(s.dt > 0.0, "simulation.dt must be positive");
        require(s.max_time > 0.0, "simulation.max_time must be positive");
        require(s.dt < s.max_time, "simulation.dt must be smaller than max_time");
        require(
            s.target_distance > 0.0,
            "simulation.target_distance must be positive",
        );
        if let Some(stiffness) = self.wheel_spin_stiffness() {
            let ratio = stiffness * s.dt;
            require(
                ratio < RK4_STABILITY_LIMIT,
                &format!(
                    "simulation.dt is too coarse for the rear-wheel dynamics \
                     (k*dt = {ratio:.2}, must stay below {RK4_STABILITY_LIMIT})"
                ),
            );
        }

        issues
    }
}

/// Loads and validates a configuration file. Only `.json` is supported.
pub fn load_config(path: impl AsRef<Path>) -> Result<VehicleConfig, ConfigError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if extension != "json" {
        return Err(ConfigError::UnsupportedFormat(path.display().to_string()));
    }

    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    VehicleConfig::from_json_str(&text)
}
