use std::ops::{Add, Mul};

/// A state value that an explicit integrator can advance along a rate.
///
/// States are immutable values: `advanced` returns a new state instead of
/// mutating `self`, so intermediate stages never alias the base state.
pub trait Integrable: Sized {
    /// Time-derivative of the integrated components.
    type Rate: Add<Output = Self::Rate> + Mul<f64, Output = Self::Rate>;

    /// Returns `self + h * rate` over the integrated components.
    fn advanced(&self, rate: &Self::Rate, h: f64) -> Self;
}

/// Represents a first-order system `dx/dt = f(x)`.
///
/// Time is part of the state, so non-autonomous fields read it from `state`.
pub trait VectorField<S: Integrable> {
    /// Evaluates the vector field at `state`.
    fn derivative(&self, state: &S) -> S::Rate;
}

/// A trait for solvers that can step a system forward.
pub trait Steppable<S: Integrable> {
    /// Performs one step of size dt, reusing a slope already evaluated at `state`.
    fn step_from(
        &self,
        field: &impl VectorField<S>,
        state: &S,
        slope: S::Rate,
        dt: f64,
    ) -> S;

    /// Performs one step of size dt.
    fn step(&self, field: &impl VectorField<S>, state: &S, dt: f64) -> S {
        let slope = field.derivative(state);
        self.step_from(field, state, slope, dt)
    }
}
