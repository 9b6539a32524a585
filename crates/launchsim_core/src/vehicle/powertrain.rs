use crate::config::VehicleConfig;
use crate::vehicle::PowertrainModel;
use serde::Serialize;

/// Outcome of one torque request.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TorqueDelivery {
    /// Torque at the driven wheels (N*m).
    pub wheel_torque: f64,
    /// Torque at the motor shaft (N*m).
    pub motor_torque: f64,
    pub motor_current: f64,
    pub battery_current: f64,
    /// Electrical power at the accumulator outlet (W).
    pub power_consumed: f64,
    /// True when the power ceiling rescaled the torque.
    pub power_limited: bool,
}

/// Single motor through a fixed reduction, fed from a resistive accumulator.
#[derive(Debug, Clone)]
pub struct ElectricPowertrain {
    torque_constant: f64,
    max_current: f64,
    max_speed: f64,
    motor_efficiency: f64,
    gear_ratio: f64,
    drivetrain_efficiency: f64,
    max_power: f64,
    battery_voltage: f64,
    battery_resistance: f64,
    battery_max_current: f64,
}

impl ElectricPowertrain {
    pub fn new(config: &VehicleConfig) -> Self {
        let p = &config.powertrain;
        Self {
            torque_constant: p.motor_torque_constant,
            max_current: p.motor_max_current,
            max_speed: p.motor_max_speed,
            motor_efficiency: p.motor_efficiency,
            gear_ratio: p.gear_ratio,
            drivetrain_efficiency: p.drivetrain_efficiency,
            max_power: p.max_power_accumulator_outlet,
            battery_voltage: p.battery_voltage_nominal,
            battery_resistance: p.battery_internal_resistance,
            battery_max_current: p.battery_max_current,
        }
    }

    pub fn max_motor_torque(&self) -> f64 {
        self.torque_constant * self.max_current
    }

    /// Accumulator outlet power for a shaft operating point.
    ///
    /// Losses add to the draw while motoring and reduce the return while
    /// regenerating.
    pub fn electrical_power(&self, motor_torque: f64, motor_speed: f64) -> f64 {
        let mechanical = motor_torque * motor_speed;
        let efficiency = self.motor_efficiency * self.drivetrain_efficiency;
        if mechanical >= 0.0 {
            mechanical / efficiency
        } else {
            mechanical * efficiency
        }
    }

    /// Outlet power available at the accumulator current limit.
    pub fn battery_power_limit(&self) -> f64 {
        let i = self.battery_max_current;
        self.battery_voltage * i - self.battery_resistance * i * i
    }

    /// Effective outlet power ceiling.
    pub fn power_ceiling(&self) -> f64 {
        self.max_power.min(self.battery_power_limit())
    }

    /// Accumulator current for a given outlet power, from `P = V*I - R*I^2`.
    pub fn battery_current(&self, power: f64) -> f64 {
        let v = self.battery_voltage;
        let r = self.battery_resistance;
        if r <= 0.0 || power <= 0.0 {
            return power / v;
        }
        let discriminant = v * v - 4.0 * r * power;
        if discriminant <= 0.0 {
            v / (2.0 * r)
        } else {
            (v - discriminant.sqrt()) / (2.0 * r)
        }
    }
}

impl PowertrainModel for ElectricPowertrain {
    fn motor_speed(&self, wheel_speed: f64) -> f64 {
        wheel_speed * self.gear_ratio
    }

    fn deliver(&self, requested_wheel_torque: f64, motor_speed: f64) -> TorqueDelivery {
        let reduction = self.gear_ratio * self.drivetrain_efficiency;
        let peak = self.max_motor_torque();

        let mut motor_torque = (requested_wheel_torque / reduction).clamp(-peak, peak);
        if motor_speed.abs() >= self.max_speed {
            motor_torque = 0.0;
        }

        // One proportional rescale; motoring and regeneration share the ceiling.
        let ceiling = self.power_ceiling();
        let unclamped = self.electrical_power(motor_torque, motor_speed);
        let power_limited = unclamped.abs() > ceiling;
        if power_limited {
            motor_torque *= ceiling / unclamped.abs();
        }

        let power_consumed = self
            .electrical_power(motor_torque, motor_speed)
            .clamp(-ceiling, ceiling);

        TorqueDelivery {
            wheel_torque: motor_torque * reduction,
            motor_torque,
            motor_current: motor_torque / self.torque_constant,
            battery_current: self.battery_current(power_consumed),
            power_consumed,
            power_limited,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ElectricPowertrain;
    use crate::config::VehicleConfig;
    use crate::vehicle::PowertrainModel;
    use approx::assert_relative_eq;

    fn powertrain() -> ElectricPowertrain {
        let mut config = VehicleConfig::baseline();
        let p = &mut config.powertrain;
        p.motor_torque_constant = 0.5;
        p.motor_max_current = 1000.0;
        p.motor_max_speed = 1000.0;
        p.motor_efficiency = 0.95;
        p.drivetrain_efficiency = 0.95;
        p.gear_ratio = 10.0;
        p.battery_voltage_nominal = 600.0;
        p.battery_internal_resistance = 0.01;
        p.battery_max_current = 300.0;
        p.max_power_accumulator_outlet = 80_000.0;
        ElectricPowertrain::new(&config)
    }

    #[test]
    fn motor_speed_follows_gear_ratio() {
        assert_relative_eq!(powertrain().motor_speed(50.0), 500.0);
    }

    #[test]
    fn power_ceiling_rescales_torque_proportionally() {
        let pt = powertrain();
        // 200 N*m at the shaft
        let requested = 200.0 * 10.0 * 0.95;
        let unclamped = pt.electrical_power(200.0, 500.0);
        assert_relative_eq!(unclamped, 110_803.3, epsilon = 0.1);

        let out = pt.deliver(requested, 500.0);
        assert!(out.power_limited);
        assert_relative_eq!(out.motor_torque / 200.0, 0.722, epsilon = 1e-3);
        assert_relative_eq!(out.power_consumed, 80_000.0, epsilon = 1e-6);
        assert_relative_eq!(out.motor_current, out.motor_torque / 0.5, epsilon = 1e-12);
        assert_relative_eq!(out.wheel_torque, out.motor_torque * 9.5, epsilon = 1e-9);
    }

    #[test]
    fn below_ceiling_torque_passes_through() {
        let pt = powertrain();
        let out = pt.deliver(950.0, 100.0);
        assert!(!out.power_limited);
        assert_relative_eq!(out.motor_torque, 100.0, epsilon = 1e-12);
        assert_relative_eq!(out.wheel_torque, 950.0, epsilon = 1e-9);
        assert_relative_eq!(out.power_consumed, 100.0 * 100.0 / 0.9025, epsilon = 1e-6);
    }

    #[test]
    fn motor_current_limit_caps_torque() {
        let pt = powertrain();
        let out = pt.deliver(1.0e5, 10.0);
        assert_relative_eq!(out.motor_torque, 500.0, epsilon = 1e-12);
        assert_relative_eq!(out.motor_current, 1000.0, epsilon = 1e-9);
    }

    #[test]
    fn no_torque_beyond_max_speed() {
        let out = powertrain().deliver(950.0, 1000.0);
        assert_eq!(out.motor_torque, 0.0);
        assert_eq!(out.wheel_torque, 0.0);
        assert_eq!(out.power_consumed, 0.0);
    }

    #[test]
    fn stationary_motor_draws_no_power() {
        let out = powertrain().deliver(950.0, 0.0);
        assert_eq!(out.power_consumed, 0.0);
        assert_relative_eq!(out.motor_torque, 100.0, epsilon = 1e-12);
    }

    #[test]
    fn regeneration_is_clamped_symmetrically() {
        let out = powertrain().deliver(-200.0 * 9.5, 800.0);
        assert!(out.power_limited);
        assert_relative_eq!(out.power_consumed, -80_000.0, epsilon = 1e-6);
        assert!(out.battery_current < 0.0);
    }

    #[test]
    fn accumulator_current_limit_lowers_ceiling() {
        let mut config = VehicleConfig::baseline();
        config.powertrain.battery_voltage_nominal = 400.0;
        config.powertrain.battery_internal_resistance = 0.1;
        config.powertrain.battery_max_current = 150.0;
        let pt = ElectricPowertrain::new(&config);
        // 400 * 150 - 0.1 * 150^2
        assert_relative_eq!(pt.power_ceiling(), 57_750.0, epsilon = 1e-9);

        let out = pt.deliver(1.0e4, 1000.0);
        assert!(out.power_limited);
        assert_relative_eq!(out.power_consumed, 57_750.0, epsilon = 1e-6);
        assert_relative_eq!(out.battery_current, 150.0, epsilon = 1e-6);
    }

    #[test]
    fn battery_current_accounts_for_internal_resistance() {
        let pt = powertrain();
        let current = pt.battery_current(60_000.0);
        let terminal_power = 600.0 * current - 0.01 * current * current;
        assert_relative_eq!(terminal_power, 60_000.0, epsilon = 1e-6);
        assert!(current > 60_000.0 / 600.0);
    }
}
