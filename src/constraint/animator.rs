//! ConstraintAnimator - An animator mirrored into a constraint solver.
//!
//! # Constraining state machine
//!
//! The cell is registered with the solver (`CONSTRAINING`) exactly when:
//!
//! ```text
//! !CONSTRAINED && condition_count > 0 && MOUNTED
//! ```
//!
//! Every event (condition added/removed, `constrain`, mount, unmount) just
//! re-evaluates that predicate and starts or stops registration to match.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use super::{ConstraintFlags, ConstraintScope, ConstraintValue, ConstraintVariable};
use crate::animator::{AnimatorState, Timing};
use crate::error::{FastenerError, Result};
use crate::fastener::{graph, Fastener, FastenerCore};
use crate::property::ValueInlet;
use crate::types::{Affinity, FastenerConfig, FastenerId, Timestamp};

/// A tweening value cell backed by a solver variable.
pub struct ConstraintAnimator<T: ConstraintValue> {
    core: FastenerCore,
    anim: AnimatorState<T>,
    flags: Cell<ConstraintFlags>,
    condition_count: Cell<u32>,
    scope: Weak<dyn ConstraintScope>,
    this: Weak<Self>,
}

impl<T: ConstraintValue> ConstraintAnimator<T> {
    /// Create a cell that registers with `scope` when constraints reference it.
    pub fn new<S: ConstraintScope + 'static>(name: impl Into<String>, default: T, scope: &Rc<S>) -> Rc<Self> {
        Self::with_config(name, default, scope, FastenerConfig::default())
    }

    pub fn with_config<S: ConstraintScope + 'static>(
        name: impl Into<String>,
        default: T,
        scope: &Rc<S>,
        config: FastenerConfig,
    ) -> Rc<Self> {
        let name = name.into();
        let scope: Weak<S> = Rc::downgrade(scope);
        Rc::new_cyclic(|this: &Weak<Self>| {
            let fastener: Weak<dyn Fastener> = this.clone();
            Self {
                core: FastenerCore::new(name, config, fastener),
                anim: AnimatorState::new(default),
                flags: Cell::new(ConstraintFlags::NONE),
                condition_count: Cell::new(0),
                scope,
                this: this.clone(),
            }
        })
    }

    // -------------------------------------------------------------------------
    // Value
    // -------------------------------------------------------------------------

    pub fn value(&self) -> T {
        self.anim.value()
    }

    pub fn state(&self) -> T {
        self.anim.state()
    }

    pub fn default_value(&self) -> &T {
        self.anim.default_value()
    }

    pub fn affinity(&self) -> Affinity {
        self.core.affinity()
    }

    pub fn is_tweening(&self) -> bool {
        self.anim.is_tweening()
    }

    pub fn set_state(&self, state: T, timing: Option<Timing>, affinity: Affinity) -> bool {
        let accepted = self.anim.set_state(self, state, timing, affinity);
        if accepted {
            self.did_change_value();
        }
        accepted
    }

    pub fn set_value(&self, value: T, affinity: Affinity) -> bool {
        self.set_state(value, None, affinity)
    }

    pub fn observe(&self, observer: impl Fn(&T, &T) + 'static) {
        self.anim.observe(Rc::new(observer));
    }

    pub fn bind_inlet<I: ValueInlet<T> + 'static>(&self, inlet: &Rc<I>) {
        let inlet: Rc<dyn ValueInlet<T>> = inlet.clone();
        graph::bind_inlet(self, &self.anim.inlet, &inlet);
    }

    // -------------------------------------------------------------------------
    // Constraint state
    // -------------------------------------------------------------------------

    /// Whether the solver is authoritative over this cell.
    pub fn constrained(&self) -> bool {
        self.flags.get().contains(ConstraintFlags::CONSTRAINED)
    }

    /// Whether the cell is registered with the solver.
    pub fn constraining(&self) -> bool {
        self.flags.get().contains(ConstraintFlags::CONSTRAINING)
    }

    /// Number of solver constraints currently referencing this cell.
    pub fn condition_count(&self) -> u32 {
        self.condition_count.get()
    }

    /// Hand authority over this cell to the solver (`true`) or take it back.
    pub fn constrain(&self, constrained: bool) -> Result<()> {
        let flags = self.flags.get();
        if constrained {
            self.flags.set(flags | ConstraintFlags::CONSTRAINED);
        } else {
            self.flags.set(flags - ConstraintFlags::CONSTRAINED);
        }
        self.update_constraining(self.core.is_mounted())
    }

    /// A solver constraint started referencing this cell.
    pub fn add_constraint_condition(&self) -> Result<()> {
        self.condition_count.set(self.condition_count.get() + 1);
        self.update_constraining(self.core.is_mounted())
    }

    /// A solver constraint stopped referencing this cell.
    pub fn remove_constraint_condition(&self) -> Result<()> {
        self.condition_count
            .set(self.condition_count.get().saturating_sub(1));
        self.update_constraining(self.core.is_mounted())
    }

    fn update_constraining(&self, mounted: bool) -> Result<()> {
        let should = !self.constrained() && self.condition_count.get() > 0 && mounted;
        if should && !self.constraining() {
            self.start_constraining()?;
            self.update_constraint_variable();
        } else if !should && self.constraining() {
            self.stop_constraining();
        }
        Ok(())
    }

    fn start_constraining(&self) -> Result<()> {
        let scope = self
            .scope
            .upgrade()
            .ok_or_else(|| FastenerError::capability(self.core.name(), "constraint scope"))?;
        let Some(this) = self.this.upgrade() else {
            return Ok(());
        };
        let variable: Rc<dyn ConstraintVariable> = this;
        scope.add_constraint_variable(variable);
        self.flags.set(self.flags.get() | ConstraintFlags::CONSTRAINING);
        tracing::debug!(fastener = %self.core.name(), "start constraining");
        Ok(())
    }

    fn stop_constraining(&self) {
        if let Some(scope) = self.scope.upgrade() {
            scope.remove_constraint_variable(self);
        }
        self.flags.set(self.flags.get() - ConstraintFlags::CONSTRAINING);
        tracing::debug!(fastener = %self.core.name(), "stop constraining");
    }

    /// Push the resolved value into the solver.
    fn update_constraint_variable(&self) {
        let Some(scope) = self.scope.upgrade() else { return };
        let value = self.anim.resolved_value(&self.core);
        scope.set_constraint_variable(self, value.to_number());
    }

    fn did_change_value(&self) {
        if self.constraining() {
            self.update_constraint_variable();
        }
    }
}

impl<T: ConstraintValue> Fastener for ConstraintAnimator<T> {
    fn core(&self) -> &FastenerCore {
        &self.core
    }

    fn recohere(&self, t: Timestamp) {
        if self.anim.recohere(&self.core, t) {
            self.did_change_value();
        }
    }

    fn has_inlet(&self) -> bool {
        self.anim.inlet.is_bound()
    }

    fn unbind_inlet(&self) {
        graph::unbind_inlet(self, &self.anim.inlet);
    }

    fn did_mount(&self) {
        if let Err(err) = self.update_constraining(true) {
            tracing::error!(fastener = %self.core.name(), error = %err, "cannot start constraining on mount");
        }
    }

    fn will_unmount(&self) {
        if let Err(err) = self.update_constraining(false) {
            tracing::error!(fastener = %self.core.name(), error = %err, "cannot stop constraining on unmount");
        }
    }
}

impl<T: ConstraintValue> ValueInlet<T> for ConstraintAnimator<T> {
    fn exported_value(&self) -> T {
        self.value()
    }

    fn resolved_value(&self) -> T {
        self.anim.resolved_value(&self.core)
    }
}

impl<T: ConstraintValue> ConstraintVariable for ConstraintAnimator<T> {
    fn variable_id(&self) -> FastenerId {
        self.core.id()
    }

    fn variable_name(&self) -> &str {
        self.core.name()
    }

    fn evaluate_constraint_variable(&self) {
        if !self.constrained() && self.constraining() {
            self.update_constraint_variable();
        }
    }

    fn update_constraint_solution(&self, value: f64) {
        if !self.constrained() {
            return;
        }
        let state = self.anim.state();
        if state.to_number() != value {
            tracing::trace!(fastener = %self.core.name(), value, "solver update");
            self.anim
                .set_state(self, T::from_number(value, &state), None, Affinity::Reflexive);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
