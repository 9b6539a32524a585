//! The `launchsim_core` crate is the vehicle dynamics engine behind straight-line
//! acceleration studies: a car launches from rest and the engine integrates its
//! longitudinal motion until it covers the target distance or runs out of time.
//!
//! Key components:
//! - **Traits**: `Integrable`, `VectorField` and `Steppable` for the integrator, plus
//!   the swappable force-model interfaces in `vehicle`.
//! - **Vehicle**: aerodynamics, load transfer, tire slip/friction, an electric
//!   powertrain with the accumulator power ceiling, and launch/traction control.
//! - **Dynamics**: immutable state snapshots, the 13-step force pipeline, and the
//!   fixed-step RK4 `DynamicsSolver`.
//! - **Rules**: power and time compliance checks and event scoring.
//! - **Sweep / Analysis**: batch runs, parameter sweeps, statistics and
//!   sensitivity coefficients.

pub mod analysis;
pub mod config;
pub mod dynamics;
pub mod rules;
pub mod simulation;
pub mod solvers;
pub mod sweep;
pub mod traits;
pub mod vehicle;

pub use config::{load_config, ConfigError, VehicleConfig};
pub use dynamics::{DynamicsSolver, RunStatus, SimulationState, StateHistory};
pub use simulation::{AccelerationSimulation, SimulationOutcome, SimulationResult};
