//! The dynamics pipeline and the fixed-step driver that integrates it.

use crate::config::{SimulationSettings, VehicleConfig};
use crate::dynamics::state::{DerivativeState, Diagnostics, SimulationState, StateHistory};
use crate::solvers::Rk4;
use crate::traits::{Steppable, VectorField};
use crate::vehicle::{
    AerodynamicModel, ControlStrategy, ElectricPowertrain, LaunchTractionControl, MassProperties,
    PiecewiseLinearTire, PowertrainModel, QuadraticAero, TireModel,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Upper bound on history preallocation; longer runs grow the buffer.
const MAX_PREALLOCATED_STATES: usize = 1 << 16;

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    /// The target distance was reached.
    Finished,
    /// The time cutoff was reached first.
    TimedOut,
}

/// Vehicle equations of motion as a vector field over [`SimulationState`].
#[derive(Debug, Clone)]
pub struct VehicleDynamics<A, T, P, C> {
    mass: MassProperties,
    aero: A,
    tire: T,
    powertrain: P,
    control: C,
    effective_mass: f64,
    rear_axle_inertia: f64,
}

impl
    VehicleDynamics<QuadraticAero, PiecewiseLinearTire, ElectricPowertrain, LaunchTractionControl>
{
    pub fn new(config: &VehicleConfig) -> Self {
        Self::with_models(
            config,
            QuadraticAero::new(config),
            PiecewiseLinearTire::new(config),
            ElectricPowertrain::new(config),
            LaunchTractionControl::new(config),
        )
    }
}

impl<A, T: TireModel, P, C> VehicleDynamics<A, T, P, C> {
    pub fn with_models(
        config: &VehicleConfig,
        aero: A,
        tire: T,
        powertrain: P,
        control: C,
    ) -> Self {
        let radius = tire.radius();
        let wheel_inertia = config.powertrain.wheel_inertia;
        Self {
            mass: MassProperties::new(config),
            effective_mass: config.mass.total_mass + 4.0 * wheel_inertia / (radius * radius),
            rear_axle_inertia: 2.0 * wheel_inertia,
            aero,
            tire,
            powertrain,
            control,
        }
    }
}

impl<A, T, P, C> VehicleDynamics<A, T, P, C> {
    /// Vehicle mass plus the reflected rotational inertia of all four wheels.
    pub fn effective_mass(&self) -> f64 {
        self.effective_mass
    }

    pub fn tire(&self) -> &T {
        &self.tire
    }

    pub fn control(&self) -> &C {
        &self.control
    }

    pub fn control_mut(&mut self) -> &mut C {
        &mut self.control
    }
}

impl<A, T, P, C> VectorField<SimulationState> for VehicleDynamics<A, T, P, C>
where
    A: AerodynamicModel,
    T: TireModel,
    P: PowertrainModel,
    C: ControlStrategy,
{
    fn derivative(&self, state: &SimulationState) -> DerivativeState {
        let radius = self.tire.radius();
        let velocity = state.velocity;

        let aero = self.aero.forces(velocity);

        // Tire loads lag one evaluation behind the acceleration they cause.
        let provisional = self.mass.normal_forces(
            state.diagnostics.acceleration,
            aero.downforce_front,
            aero.downforce_rear,
        );

        // Front axle is undriven and rolls with the road.
        let wheel_speed_front = velocity.max(0.0) / radius;
        let wheel_speed_rear = state.wheel_speed_rear;

        let slip_front = self.tire.slip_ratio(wheel_speed_front, velocity);
        let slip_rear = self.tire.slip_ratio(wheel_speed_rear, velocity);
        let front = self.tire.longitudinal_force(provisional.front, slip_front, velocity);
        let rear = self.tire.longitudinal_force(provisional.rear, slip_rear, velocity);

        let motor_speed = self.powertrain.motor_speed(wheel_speed_rear);
        let max_tire_force = self.tire.peak_friction() * provisional.rear;
        let requested = self.control.requested_torque(state, max_tire_force, radius);
        let delivery = self.powertrain.deliver(requested, motor_speed);

        let drive_force = delivery.wheel_torque / radius;
        let rolling_resistance = front.rolling_resistance + rear.rolling_resistance;
        let net_force =
            drive_force + aero.drag + rolling_resistance - self.mass.grade_resistance();
        let acceleration = net_force / self.effective_mass;

        let loads = self
            .mass
            .normal_forces(acceleration, aero.downforce_front, aero.downforce_rear);

        let wheel_accel_front = acceleration / radius;
        let wheel_accel_rear = if self.rear_axle_inertia > 0.0 {
            (delivery.wheel_torque - rear.longitudinal * radius) / self.rear_axle_inertia
        } else {
            acceleration / radius
        };

        DerivativeState {
            time: 1.0,
            position: velocity,
            velocity: acceleration,
            wheel_speed_front: wheel_accel_front,
            wheel_speed_rear: wheel_accel_rear,
            diagnostics: Diagnostics {
                acceleration,
                motor_speed,
                motor_current: delivery.motor_current,
                motor_torque: delivery.motor_torque,
                battery_current: delivery.battery_current,
                drive_force,
                drag_force: aero.drag,
                rolling_resistance,
                normal_force_front: loads.front,
                normal_force_rear: loads.rear,
                tire_force_front: front.longitudinal,
                tire_force_rear: rear.longitudinal,
                slip_ratio_rear: slip_rear,
                power_consumed: delivery.power_consumed,
            },
        }
    }
}

/// Result of one [`DynamicsSolver::solve`] call.
#[derive(Debug, Clone, Serialize)]
pub struct Solution {
    pub status: RunStatus,
    pub history: StateHistory,
    /// Interpolated instant the target distance was crossed.
    pub finish_time: Option<f64>,
}

impl Solution {
    pub fn final_state(&self) -> SimulationState {
        self.history.last().copied().unwrap_or_default()
    }

    pub fn finished(&self) -> bool {
        self.status == RunStatus::Finished
    }
}

/// Fixed-step RK4 driver for a single acceleration run.
#[derive(Debug, Clone)]
pub struct DynamicsSolver<
    A = QuadraticAero,
    T = PiecewiseLinearTire,
    P = ElectricPowertrain,
    C = LaunchTractionControl,
> {
    dynamics: VehicleDynamics<A, T, P, C>,
    settings: SimulationSettings,
    stepper: Rk4,
    status: RunStatus,
}

impl DynamicsSolver {
    pub fn new(config: &VehicleConfig) -> Self {
        Self::with_dynamics(VehicleDynamics::new(config), config.simulation)
    }
}

impl<A, T, P, C> DynamicsSolver<A, T, P, C> {
    pub fn with_dynamics(
        dynamics: VehicleDynamics<A, T, P, C>,
        settings: SimulationSettings,
    ) -> Self {
        Self {
            dynamics,
            settings,
            stepper: Rk4,
            status: RunStatus::Running,
        }
    }

    pub fn dynamics(&self) -> &VehicleDynamics<A, T, P, C> {
        &self.dynamics
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    /// Status of the most recent run.
    pub fn status(&self) -> RunStatus {
        self.status
    }
}

impl<A, T, P, C> DynamicsSolver<A, T, P, C>
where
    A: AerodynamicModel,
    T: TireModel,
    P: PowertrainModel,
    C: ControlStrategy,
{
    /// Integrates from rest until the target distance or the time cutoff.
    ///
    /// The controller is reset first, so repeated calls are identical.
    pub fn solve(&mut self) -> Solution {
        let SimulationSettings {
            dt,
            max_time,
            target_distance,
        } = self.settings;

        self.dynamics.control_mut().reset();
        self.status = RunStatus::Running;
        debug!("starting run: dt = {dt}, max_time = {max_time}, target = {target_distance} m");

        let initial = SimulationState::default();
        let mut slope = self.dynamics.derivative(&initial);
        let mut state = initial.with_diagnostics(slope.diagnostics);

        let expected_steps = (max_time / dt).ceil().max(0.0) as usize + 1;
        let mut history = StateHistory::with_capacity(expected_steps.min(MAX_PREALLOCATED_STATES));
        history.push(state);

        while self.status == RunStatus::Running {
            if state.time >= max_time {
                self.status = RunStatus::TimedOut;
                break;
            }
            if state.position >= target_distance {
                self.status = RunStatus::Finished;
                break;
            }

            let next = self.stepper.step_from(&self.dynamics, &state, slope, dt);

            let slip_rear = self
                .dynamics
                .tire()
                .slip_ratio(next.wheel_speed_rear, next.velocity);
            self.dynamics.control_mut().update(slip_rear, dt);

            slope = self.dynamics.derivative(&next);
            state = next.with_diagnostics(slope.diagnostics);
            history.push(state);
        }

        let finish_time = match self.status {
            RunStatus::Finished => history.crossing(target_distance).map(|c| c.time),
            _ => None,
        };

        match self.status {
            RunStatus::TimedOut => warn!(
                "run timed out at {:.3} s after {:.2} m",
                state.time, state.position
            ),
            _ => debug!(
                "run finished in {:.3} s ({} steps), v = {:.2} m/s",
                state.time,
                history.len() - 1,
                state.velocity
            ),
        }

        Solution {
            status: self.status,
            history,
            finish_time,
        }
    }
}
