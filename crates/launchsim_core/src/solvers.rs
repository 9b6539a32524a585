use crate::traits::{Integrable, Steppable, VectorField};

/// Largest `k * dt` for which RK4 stays stable on `y' = -k * y`.
pub const RK4_STABILITY_LIMIT: f64 = 2.78;

/// Classic Runge-Kutta 4th Order Solver
#[derive(Debug, Clone, Copy, Default)]
pub struct Rk4;

impl<S: Integrable> Steppable<S> for Rk4 {
    fn step_from(&self, field: &impl VectorField<S>, state: &S, k1: S::Rate, dt: f64) -> S {
        let half = 0.5 * dt;

        // k2 = f(y + dt*k1/2)
        let k2 = field.derivative(&state.advanced(&k1, half));

        // k3 = f(y + dt*k2/2)
        let k3 = field.derivative(&state.advanced(&k2, half));

        // k4 = f(y + dt*k3)
        let k4 = field.derivative(&state.advanced(&k3, dt));

        // y_next = y + dt/6 * (k1 + 2k2 + 2k3 + k4)
        let slope = (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (1.0 / 6.0);
        state.advanced(&slope, dt)
    }
}

#[cfg(test)]
mod tests {
    use super::Rk4;
    use crate::traits::{Integrable, Steppable, VectorField};
    use std::ops::{Add, Mul};

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Point {
        t: f64,
        x: f64,
        v: f64,
    }

    impl Add for Point {
        type Output = Point;

        fn add(self, rhs: Point) -> Point {
            Point {
                t: self.t + rhs.t,
                x: self.x + rhs.x,
                v: self.v + rhs.v,
            }
        }
    }

    impl Mul<f64> for Point {
        type Output = Point;

        fn mul(self, rhs: f64) -> Point {
            Point {
                t: self.t * rhs,
                x: self.x * rhs,
                v: self.v * rhs,
            }
        }
    }

    impl Integrable for Point {
        type Rate = Point;

        fn advanced(&self, rate: &Point, h: f64) -> Point {
            *self + *rate * h
        }
    }

    /// x' = rate * x, v unused.
    struct LinearSystem {
        rate: f64,
    }

    impl VectorField<Point> for LinearSystem {
        fn derivative(&self, state: &Point) -> Point {
            Point {
                t: 1.0,
                x: self.rate * state.x,
                v: 0.0,
            }
        }
    }

    /// x'' = accel
    struct ConstantAcceleration {
        accel: f64,
    }

    impl VectorField<Point> for ConstantAcceleration {
        fn derivative(&self, state: &Point) -> Point {
            Point {
                t: 1.0,
                x: state.v,
                v: self.accel,
            }
        }
    }

    fn integrate(field: &impl VectorField<Point>, start: Point, dt: f64, steps: usize) -> Point {
        let mut state = start;
        for _ in 0..steps {
            state = Rk4.step(field, &state, dt);
        }
        state
    }

    #[test]
    fn rk4_tracks_exponential_decay() {
        let system = LinearSystem { rate: -1.0 };
        let start = Point { t: 0.0, x: 1.0, v: 0.0 };
        let end = integrate(&system, start, 0.01, 100);

        assert!((end.t - 1.0).abs() < 1e-12);
        assert!((end.x - (-1.0f64).exp()).abs() < 1e-9);
    }

    #[test]
    fn rk4_error_shrinks_fourth_order() {
        let system = LinearSystem { rate: -2.0 };
        let start = Point { t: 0.0, x: 1.0, v: 0.0 };
        let exact = (-2.0f64 * 2.0).exp();

        let coarse = integrate(&system, start, 0.1, 20);
        let fine = integrate(&system, start, 0.05, 40);
        let ratio = (coarse.x - exact).abs() / (fine.x - exact).abs();

        assert!(ratio > 14.0 && ratio < 18.0, "ratio = {ratio}");
    }

    #[test]
    fn rk4_is_exact_for_constant_acceleration() {
        let system = ConstantAcceleration { accel: 20.0 };
        let start = Point { t: 0.0, x: 0.0, v: 0.0 };
        let end = integrate(&system, start, 0.25, 8);

        assert!((end.x - 0.5 * 20.0 * 4.0).abs() < 1e-10);
        assert!((end.v - 40.0).abs() < 1e-12);
    }

    #[test]
    fn step_from_matches_step_with_fresh_slope() {
        let system = LinearSystem { rate: 0.5 };
        let start = Point { t: 0.3, x: 2.0, v: 0.0 };
        let slope = system.derivative(&start);

        let reused = Rk4.step_from(&system, &start, slope, 0.1);
        let fresh = Rk4.step(&system, &start, 0.1);

        assert_eq!(reused, fresh);
        assert!((reused.t - 0.4).abs() < 1e-15);
    }

    #[test]
    fn step_leaves_base_state_untouched() {
        let system = LinearSystem { rate: 3.0 };
        let start = Point { t: 0.0, x: 1.0, v: 0.0 };
        let snapshot = start;
        let _ = Rk4.step(&system, &start, 0.2);

        assert_eq!(start, snapshot);
    }
}
