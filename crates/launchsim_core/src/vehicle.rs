//! Force models for the individual vehicle subsystems.
//!
//! Each subsystem sits behind a trait so the dynamics pipeline can be driven
//! by alternative models; the default implementations are built from a
//! [`VehicleConfig`](crate::config::VehicleConfig).

pub mod aerodynamics;
pub mod control;
pub mod mass_properties;
pub mod powertrain;
pub mod tire;

pub use aerodynamics::{AeroForces, QuadraticAero};
pub use control::LaunchTractionControl;
pub use mass_properties::{AxleLoads, MassProperties};
pub use powertrain::{ElectricPowertrain, TorqueDelivery};
pub use tire::{PiecewiseLinearTire, TireForce};

use crate::dynamics::state::SimulationState;

pub trait AerodynamicModel {
    /// Drag and per-axle downforce at the given forward speed.
    fn forces(&self, velocity: f64) -> AeroForces;
}

pub trait TireModel {
    /// Loaded rolling radius (m).
    fn radius(&self) -> f64;

    /// Peak friction coefficient available on the current surface.
    fn peak_friction(&self) -> f64;

    fn slip_ratio(&self, wheel_angular_velocity: f64, vehicle_velocity: f64) -> f64;

    fn longitudinal_force(&self, normal_force: f64, slip_ratio: f64, velocity: f64) -> TireForce;
}

pub trait PowertrainModel {
    /// Motor speed for a given driven-wheel speed (rad/s).
    fn motor_speed(&self, wheel_speed: f64) -> f64;

    /// Converts a requested wheel torque into delivered torque under the
    /// motor, accumulator and power limits.
    fn deliver(&self, requested_wheel_torque: f64, motor_speed: f64) -> TorqueDelivery;
}

/// Decides the wheel torque request.
///
/// `requested_torque` must be a pure function of its inputs so that every
/// Runge-Kutta stage sees the same vector field. Feedback state is advanced
/// only through `update`, once per accepted step.
pub trait ControlStrategy {
    fn requested_torque(
        &self,
        state: &SimulationState,
        max_tire_force: f64,
        tire_radius: f64,
    ) -> f64;

    fn update(&mut self, slip_ratio_rear: f64, dt: f64);

    fn reset(&mut self);
}
