use crate::config::{VehicleConfig, GRAVITY};
use serde::Serialize;

/// Normal force on each axle (N).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AxleLoads {
    pub front: f64,
    pub rear: f64,
}

/// Rigid-chassis static and longitudinal load transfer.
#[derive(Debug, Clone)]
pub struct MassProperties {
    mass: f64,
    cg_x: f64,
    cg_z: f64,
    wheelbase: f64,
    grade: f64,
}

impl MassProperties {
    pub fn new(config: &VehicleConfig) -> Self {
        Self {
            mass: config.mass.total_mass,
            cg_x: config.mass.cg_x,
            cg_z: config.mass.cg_z,
            wheelbase: config.mass.wheelbase,
            grade: config.environment.track_grade,
        }
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Weight component normal to the track.
    pub fn weight(&self) -> f64 {
        self.mass * GRAVITY * self.grade.cos()
    }

    /// Weight component along the track, positive uphill.
    pub fn grade_resistance(&self) -> f64 {
        self.mass * GRAVITY * self.grade.sin()
    }

    /// Static axle split from the CG position.
    pub fn static_loads(&self) -> AxleLoads {
        let weight = self.weight();
        let rear_fraction = self.cg_x / self.wheelbase;
        AxleLoads {
            front: weight * (1.0 - rear_fraction),
            rear: weight * rear_fraction,
        }
    }

    /// Load moved from front to rear axle under `acceleration`.
    pub fn load_transfer(&self, acceleration: f64) -> f64 {
        self.mass * acceleration * self.cg_z / self.wheelbase
    }

    /// Static split plus transfer plus downforce, each axle clamped at zero.
    pub fn normal_forces(
        &self,
        acceleration: f64,
        downforce_front: f64,
        downforce_rear: f64,
    ) -> AxleLoads {
        let loads = self.static_loads();
        let transfer = self.load_transfer(acceleration);
        AxleLoads {
            front: (loads.front - transfer + downforce_front).max(0.0),
            rear: (loads.rear + transfer + downforce_rear).max(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MassProperties;
    use crate::config::{VehicleConfig, GRAVITY};
    use approx::assert_relative_eq;

    fn model() -> MassProperties {
        let mut config = VehicleConfig::baseline();
        config.mass.total_mass = 250.0;
        config.mass.cg_x = 0.9;
        config.mass.cg_z = 0.3;
        config.mass.wheelbase = 1.5;
        MassProperties::new(&config)
    }

    #[test]
    fn static_split_follows_cg_position() {
        let loads = model().static_loads();
        let weight = 250.0 * GRAVITY;
        assert_relative_eq!(loads.front + loads.rear, weight, epsilon = 1e-9);
        assert_relative_eq!(loads.rear, weight * 0.6, epsilon = 1e-9);
    }

    #[test]
    fn acceleration_shifts_load_rearward() {
        let model = model();
        let at_rest = model.normal_forces(0.0, 0.0, 0.0);
        let launching = model.normal_forces(10.0, 0.0, 0.0);
        // 250 * 10 * 0.3 / 1.5
        assert_relative_eq!(launching.rear - at_rest.rear, 500.0, epsilon = 1e-9);
        assert_relative_eq!(at_rest.front - launching.front, 500.0, epsilon = 1e-9);
    }

    #[test]
    fn extreme_acceleration_unloads_front_without_going_negative() {
        let loads = model().normal_forces(100.0, 0.0, 0.0);
        assert_eq!(loads.front, 0.0);
        assert!(loads.rear > 0.0);
    }

    #[test]
    fn downforce_adds_to_each_axle() {
        let model = model();
        let base = model.normal_forces(5.0, 0.0, 0.0);
        let loaded = model.normal_forces(5.0, 100.0, 150.0);
        assert_relative_eq!(loaded.front - base.front, 100.0, epsilon = 1e-9);
        assert_relative_eq!(loaded.rear - base.rear, 150.0, epsilon = 1e-9);
    }

    #[test]
    fn grade_splits_weight() {
        let mut config = VehicleConfig::baseline();
        config.environment.track_grade = 0.1;
        let model = MassProperties::new(&config);
        let total = config.mass.total_mass * GRAVITY;
        assert_relative_eq!(model.weight().hypot(model.grade_resistance()), total, epsilon = 1e-9);
        assert!(model.grade_resistance() > 0.0);
    }
}
