use crate::config::VehicleConfig;
use crate::vehicle::TireModel;
use serde::Serialize;

/// Velocity floor in the slip-ratio denominator (m/s).
///
/// Bounds the wheel-spin stiffness at launch so the default 1 ms step stays
/// inside the RK4 stability region.
pub const SLIP_VELOCITY_FLOOR: f64 = 1.0;

/// Friction at 100 % slip as a fraction of the peak.
pub const SLIDING_FRICTION_RATIO: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TireForce {
    /// Traction force, signed with the slip ratio (N).
    pub longitudinal: f64,
    /// Signed, opposing forward motion (N).
    pub rolling_resistance: f64,
}

/// Piecewise-linear friction curve: linear rise to the peak at the optimal
/// slip, then a linear fall to the sliding level at full slip.
#[derive(Debug, Clone)]
pub struct PiecewiseLinearTire {
    radius: f64,
    mu_max: f64,
    slip_optimal: f64,
    rolling_resistance_coeff: f64,
}

impl PiecewiseLinearTire {
    pub fn new(config: &VehicleConfig) -> Self {
        Self {
            radius: config.tires.radius_loaded,
            mu_max: config.tires.mu_max * config.environment.surface_mu_scaling,
            slip_optimal: config.tires.mu_slip_optimal,
            rolling_resistance_coeff: config.tires.rolling_resistance_coeff,
        }
    }

    /// Friction coefficient for a slip magnitude.
    pub fn friction_coefficient(&self, slip_ratio: f64) -> f64 {
        let slip = slip_ratio.abs();
        if slip <= self.slip_optimal {
            self.mu_max * slip / self.slip_optimal
        } else if slip >= 1.0 {
            self.mu_max * SLIDING_FRICTION_RATIO
        } else {
            let past_peak = (slip - self.slip_optimal) / (1.0 - self.slip_optimal);
            self.mu_max * (1.0 - (1.0 - SLIDING_FRICTION_RATIO) * past_peak)
        }
    }

    /// Rolling resistance fades in below the slip floor so a car at rest is
    /// never pushed backwards.
    pub fn rolling_resistance(&self, normal_force: f64, velocity: f64) -> f64 {
        let engagement = (velocity / SLIP_VELOCITY_FLOOR).clamp(0.0, 1.0);
        -self.rolling_resistance_coeff * normal_force * engagement
    }
}

impl TireModel for PiecewiseLinearTire {
    fn radius(&self) -> f64 {
        self.radius
    }

    fn peak_friction(&self) -> f64 {
        self.mu_max
    }

    fn slip_ratio(&self, wheel_angular_velocity: f64, vehicle_velocity: f64) -> f64 {
        (wheel_angular_velocity * self.radius - vehicle_velocity)
            / vehicle_velocity.max(SLIP_VELOCITY_FLOOR)
    }

    fn longitudinal_force(&self, normal_force: f64, slip_ratio: f64, velocity: f64) -> TireForce {
        let mu = self.friction_coefficient(slip_ratio);
        TireForce {
            longitudinal: mu * normal_force * slip_ratio.signum(),
            rolling_resistance: self.rolling_resistance(normal_force, velocity),
        }
    }
}
