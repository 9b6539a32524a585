use crate::config::VehicleConfig;
use crate::vehicle::AerodynamicModel;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AeroForces {
    /// Signed drag, opposing motion (N).
    pub drag: f64,
    pub downforce_front: f64,
    pub downforce_rear: f64,
}

/// Velocity-squared drag and downforce.
#[derive(Debug, Clone)]
pub struct QuadraticAero {
    cda: f64,
    cl_front: f64,
    cl_rear: f64,
    air_density: f64,
}

impl QuadraticAero {
    pub fn new(config: &VehicleConfig) -> Self {
        Self {
            cda: config.aerodynamics.cda,
            cl_front: config.aerodynamics.cl_front,
            cl_rear: config.aerodynamics.cl_rear,
            air_density: config.environment.air_density,
        }
    }

    /// q = rho * v^2 / 2
    pub fn dynamic_pressure(&self, velocity: f64) -> f64 {
        0.5 * self.air_density * velocity * velocity
    }
}

impl AerodynamicModel for QuadraticAero {
    fn forces(&self, velocity: f64) -> AeroForces {
        let q = self.dynamic_pressure(velocity);
        AeroForces {
            drag: -self.cda * q * velocity.signum(),
            downforce_front: (self.cl_front * q).max(0.0),
            downforce_rear: (self.cl_rear * q).max(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::QuadraticAero;
    use crate::config::VehicleConfig;
    use crate::vehicle::AerodynamicModel;
    use approx::assert_relative_eq;

    fn aero(cda: f64, cl_front: f64, cl_rear: f64) -> QuadraticAero {
        let mut config = VehicleConfig::baseline();
        config.aerodynamics.cda = cda;
        config.aerodynamics.cl_front = cl_front;
        config.aerodynamics.cl_rear = cl_rear;
        QuadraticAero::new(&config)
    }

    #[test]
    fn forces_vanish_at_rest() {
        let forces = aero(1.1, 1.0, 1.4).forces(0.0);
        assert_eq!(forces.drag, 0.0);
        assert_eq!(forces.downforce_front, 0.0);
        assert_eq!(forces.downforce_rear, 0.0);
    }

    #[test]
    fn drag_and_downforce_follow_dynamic_pressure() {
        let forces = aero(1.0, 1.0, 2.0).forces(20.0);
        // q = 0.5 * 1.225 * 400
        assert_relative_eq!(forces.drag, -245.0, epsilon = 1e-9);
        assert_relative_eq!(forces.downforce_front, 245.0, epsilon = 1e-9);
        assert_relative_eq!(forces.downforce_rear, 490.0, epsilon = 1e-9);
    }

    #[test]
    fn forces_scale_with_velocity_squared() {
        let model = aero(1.1, 1.0, 1.4);
        let slow = model.forces(10.0);
        let fast = model.forces(30.0);
        assert_relative_eq!(fast.drag / slow.drag, 9.0, epsilon = 1e-12);
        assert_relative_eq!(fast.downforce_rear / slow.downforce_rear, 9.0, epsilon = 1e-12);
    }
}
