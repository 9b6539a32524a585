//! State representation, the vehicle vector field, and the run driver.

pub mod solver;
pub mod state;

pub use solver::{DynamicsSolver, RunStatus, Solution, VehicleDynamics};
pub use state::{Crossing, DerivativeState, Diagnostics, SimulationState, StateHistory};
