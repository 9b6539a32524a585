//! Simulation object exposed to JavaScript.

use js_sys::Float64Array;
use launchsim_core::analysis::time_series;
use launchsim_core::{AccelerationSimulation, SimulationOutcome, VehicleConfig};
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WasmSimulation {
    simulation: AccelerationSimulation,
    outcome: Option<SimulationOutcome>,
}

pub(crate) fn js_error(context: &str, err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{}: {}", context, err))
}

/// Parses and validates a JSON vehicle description.
pub(crate) fn simulation_from_json(json: &str) -> Result<AccelerationSimulation, String> {
    let config = VehicleConfig::from_json_str(json).map_err(|e| e.to_string())?;
    AccelerationSimulation::new(config).map_err(|e| e.to_string())
}

impl WasmSimulation {
    fn completed(&self) -> Result<&SimulationOutcome, JsValue> {
        self.outcome
            .as_ref()
            .ok_or_else(|| JsValue::from_str("Simulation has not been run yet."))
    }
}

#[wasm_bindgen]
impl WasmSimulation {
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<WasmSimulation, JsValue> {
        console_error_panic_hook::set_once();

        let config: VehicleConfig =
            from_value(config).map_err(|e| js_error("Invalid vehicle config", e))?;
        let simulation =
            AccelerationSimulation::new(config).map_err(|e| js_error("Invalid vehicle config", e))?;
        Ok(WasmSimulation {
            simulation,
            outcome: None,
        })
    }

    pub fn from_json(json: &str) -> Result<WasmSimulation, JsValue> {
        console_error_panic_hook::set_once();

        let simulation =
            simulation_from_json(json).map_err(|e| js_error("Invalid vehicle config", e))?;
        Ok(WasmSimulation {
            simulation,
            outcome: None,
        })
    }

    /// Runs the acceleration event and returns the result summary.
    pub fn run(&mut self, fastest_time: Option<f64>) -> Result<JsValue, JsValue> {
        let outcome = self.simulation.run(fastest_time);
        let result = to_value(&outcome.result).map_err(|e| js_error("Serialization error", e))?;
        self.outcome = Some(outcome);
        Ok(result)
    }

    pub fn time_series(&self, name: &str) -> Result<Float64Array, JsValue> {
        let outcome = self.completed()?;
        let column = time_series(&outcome.history, name).map_err(|e| js_error("Time series", e))?;
        Ok(Float64Array::from(column.as_slice()))
    }

    pub fn history(&self) -> Result<JsValue, JsValue> {
        let outcome = self.completed()?;
        to_value(&outcome.history).map_err(|e| js_error("Serialization error", e))
    }

    pub fn config(&self) -> Result<JsValue, JsValue> {
        to_value(self.simulation.config()).map_err(|e| js_error("Serialization error", e))
    }
}


#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::WasmSimulation;
    use launchsim_core::VehicleConfig;
    use serde_wasm_bindgen::to_value;
    use wasm_bindgen_test::wasm_bindgen_test;

    #[wasm_bindgen_test]
    fn run_then_read_series() {
        let config = to_value(&VehicleConfig::baseline()).expect("config");
        let mut simulation = WasmSimulation::new(config).expect("simulation");
        assert!(simulation.time_series("velocity").is_err());

        simulation.run(Some(4.0)).expect("run");
        let velocity = simulation.time_series("velocity").expect("series");
        assert!(velocity.length() > 1);
        assert!(simulation.time_series("no_such_signal").is_err());
    }
}
