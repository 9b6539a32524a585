use crate::config::VehicleConfig;
use crate::dynamics::state::SimulationState;
use crate::vehicle::ControlStrategy;

/// Launch ramp, grip ceiling and a held traction-control scale.
#[derive(Debug, Clone)]
pub struct LaunchTractionControl {
    launch_torque_limit: f64,
    torque_ramp_rate: f64,
    target_slip_ratio: f64,
    traction_control_enabled: bool,
    gain: f64,
    recovery_rate: f64,
    min_scale: f64,
    torque_scale: f64,
}

impl LaunchTractionControl {
    pub fn new(config: &VehicleConfig) -> Self {
        let c = &config.control;
        Self {
            launch_torque_limit: c.launch_torque_limit,
            torque_ramp_rate: c.torque_ramp_rate,
            target_slip_ratio: c.target_slip_ratio,
            traction_control_enabled: c.traction_control_enabled,
            gain: c.traction_control_gain,
            recovery_rate: c.traction_control_recovery_rate,
            min_scale: c.traction_control_min_scale,
            torque_scale: 1.0,
        }
    }

    /// Launch torque ceiling at `time`: a linear ramp capped by the launch limit.
    pub fn ramp_ceiling(&self, time: f64) -> f64 {
        (self.torque_ramp_rate * time.max(0.0)).min(self.launch_torque_limit)
    }

    /// Current traction-control multiplier, in `[min_scale, 1]`.
    pub fn torque_scale(&self) -> f64 {
        self.torque_scale
    }

    /// Grip-limited wheel torque for a rear axle load, capped by the launch limit.
    pub fn optimal_launch_torque(
        &self,
        normal_force_rear: f64,
        mu_max: f64,
        tire_radius: f64,
    ) -> f64 {
        (mu_max * normal_force_rear * tire_radius).min(self.launch_torque_limit)
    }
}

impl ControlStrategy for LaunchTractionControl {
    fn requested_torque(
        &self,
        state: &SimulationState,
        max_tire_force: f64,
        tire_radius: f64,
    ) -> f64 {
        let ramp = self.ramp_ceiling(state.time);
        let grip = max_tire_force.max(0.0) * tire_radius;
        ramp.min(grip) * self.torque_scale
    }

    fn update(&mut self, slip_ratio_rear: f64, dt: f64) {
        if !self.traction_control_enabled {
            return;
        }
        let excess = slip_ratio_rear.abs() - self.target_slip_ratio;
        let next = if excess > 0.0 {
            self.torque_scale - self.gain * excess * dt
        } else {
            self.torque_scale + self.recovery_rate * dt
        };
        self.torque_scale = next.clamp(self.min_scale, 1.0);
    }

    fn reset(&mut self) {
        self.torque_scale = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::LaunchTractionControl;
    use crate::config::VehicleConfig;
    use crate::dynamics::state::SimulationState;
    use crate::vehicle::ControlStrategy;
    use approx::assert_relative_eq;

    fn control(enabled: bool) -> LaunchTractionControl {
        let mut config = VehicleConfig::baseline();
        config.control.launch_torque_limit = 1000.0;
        config.control.torque_ramp_rate = 5000.0;
        config.control.target_slip_ratio = 0.15;
        config.control.traction_control_enabled = enabled;
        config.control.traction_control_gain = 20.0;
        config.control.traction_control_recovery_rate = 2.0;
        config.control.traction_control_min_scale = 0.5;
        LaunchTractionControl::new(&config)
    }

    fn at(time: f64) -> SimulationState {
        SimulationState {
            time,
            ..SimulationState::default()
        }
    }

    #[test]
    fn ramp_grows_linearly_then_saturates() {
        let control = control(true);
        assert_eq!(control.ramp_ceiling(0.0), 0.0);
        assert_relative_eq!(control.ramp_ceiling(0.1), 500.0, epsilon = 1e-9);
        assert_eq!(control.ramp_ceiling(1.0), 1000.0);
    }

    #[test]
    fn request_is_capped_by_grip() {
        let control = control(true);
        // grip torque = 2000 N * 0.25 m
        let request = control.requested_torque(&at(1.0), 2000.0, 0.25);
        assert_relative_eq!(request, 500.0, epsilon = 1e-12);
    }

    #[test]
    fn request_is_pure_in_its_inputs() {
        let control = control(true);
        let first = control.requested_torque(&at(0.05), 5000.0, 0.25);
        let second = control.requested_torque(&at(0.05), 5000.0, 0.25);
        assert_eq!(first, second);
    }

    #[test]
    fn excess_slip_lowers_scale_until_floor() {
        let mut control = control(true);
        control.update(0.25, 0.01);
        // 1 - 20 * 0.1 * 0.01
        assert_relative_eq!(control.torque_scale(), 0.98, epsilon = 1e-12);

        for _ in 0..1000 {
            control.update(0.9, 0.01);
        }
        assert_eq!(control.torque_scale(), 0.5);
        assert_relative_eq!(control.requested_torque(&at(1.0), 1.0e6, 0.25), 500.0);
    }

    #[test]
    fn scale_recovers_when_slip_is_on_target() {
        let mut control = control(true);
        for _ in 0..100 {
            control.update(0.9, 0.01);
        }
        let reduced = control.torque_scale();
        control.update(0.1, 0.01);
        assert_relative_eq!(control.torque_scale(), reduced + 0.02, epsilon = 1e-12);

        for _ in 0..1000 {
            control.update(0.0, 0.01);
        }
        assert_eq!(control.torque_scale(), 1.0);
    }

    #[test]
    fn disabled_traction_control_ignores_slip() {
        let mut control = control(false);
        control.update(0.9, 0.1);
        assert_eq!(control.torque_scale(), 1.0);
    }

    #[test]
    fn reset_restores_full_scale() {
        let mut control = control(true);
        control.update(0.9, 0.1);
        assert!(control.torque_scale() < 1.0);
        control.reset();
        assert_eq!(control.torque_scale(), 1.0);
    }

    #[test]
    fn optimal_launch_torque_is_grip_limited() {
        let control = control(true);
        assert_relative_eq!(
            control.optimal_launch_torque(2000.0, 1.5, 0.25),
            750.0,
            epsilon = 1e-12
        );
        assert_eq!(control.optimal_launch_torque(1.0e5, 1.5, 0.25), 1000.0);
    }
}
