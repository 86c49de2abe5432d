//! Constraint - Solver-backed fasteners.
//!
//! A [`ConstraintAnimator`] mirrors its value into an external linear
//! constraint solver (the [`ConstraintScope`]). Value flows both ways, never
//! both at once:
//!
//! ```text
//!                  not constrained                     constrained
//!   cell ──evaluate_constraint_variable──▶ solver ──update_constraint_solution──▶ cell
//!           (push, cell is authoritative)           (pull, solver is authoritative)
//! ```
//!
//! The solver algorithm itself lives outside this crate.

use std::rc::Rc;

use crate::animator::Interpolate;
use crate::types::{FastenerId, Length};

pub mod animator;

pub use animator::ConstraintAnimator;

bitflags::bitflags! {
    /// Solver-related state of a [`ConstraintAnimator`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ConstraintFlags: u8 {
        const NONE = 0;
        /// The user handed authority over this cell to the solver.
        const CONSTRAINED = 1 << 0;
        /// Registered with the solver as a variable it must respect.
        const CONSTRAINING = 1 << 1;
    }
}

// =============================================================================
// Solver Capabilities
// =============================================================================

/// A cell the solver can read from and write back to.
pub trait ConstraintVariable {
    fn variable_id(&self) -> FastenerId;

    fn variable_name(&self) -> &str;

    /// Called by the solver before solving: push the cell's value in.
    fn evaluate_constraint_variable(&self);

    /// Called by the solver after solving with the variable's solution.
    fn update_constraint_solution(&self, value: f64);
}

/// The external linear-constraint solver, as seen by a cell.
///
/// Registration calls must be idempotent: mount/unmount sequences can repeat
/// them.
pub trait ConstraintScope {
    fn add_constraint_variable(&self, variable: Rc<dyn ConstraintVariable>);

    fn remove_constraint_variable(&self, variable: &dyn ConstraintVariable);

    fn set_constraint_variable(&self, variable: &dyn ConstraintVariable, value: f64);
}

// =============================================================================
// Numeric Projection
// =============================================================================

/// Values that can be expressed as a solver number.
pub trait ConstraintValue: Interpolate {
    fn to_number(&self) -> f64;

    /// Rebuild a value from a solver number, keeping whatever `like` carries
    /// besides the number (e.g. a length unit).
    fn from_number(number: f64, like: &Self) -> Self;
}

impl ConstraintValue for f64 {
    fn to_number(&self) -> f64 {
        *self
    }

    fn from_number(number: f64, _like: &Self) -> Self {
        number
    }
}

impl ConstraintValue for f32 {
    fn to_number(&self) -> f64 {
        *self as f64
    }

    fn from_number(number: f64, _like: &Self) -> Self {
        number as f32
    }
}

impl ConstraintValue for Length {
    fn to_number(&self) -> f64 {
        self.value
    }

    fn from_number(number: f64, like: &Self) -> Self {
        Length {
            value: number,
            unit: like.unit,
        }
    }
}
