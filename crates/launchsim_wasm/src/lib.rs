//! WebAssembly bindings for `launchsim_core`.
//!
//! Configurations and results cross the boundary as plain JS objects via
//! `serde-wasm-bindgen`; time series are returned as `Float64Array`s.

mod analysis;
mod system;

pub use analysis::{acceleration_score, baseline_config, parameter_sweep, sensitivity};
pub use system::WasmSimulation;
