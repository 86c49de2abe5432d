//! Property - A plain value fastener.
//!
//! A `Property<T>` holds a value that is either assigned directly (with an
//! [`Affinity`]) or derived from an inlet that exports the same value type,
//! optionally through a transform.
//!
//! # Example
//!
//! ```
//! use spark_fasteners::{Affinity, Fastener, Property};
//!
//! let parent = Property::new("font_size", 14.0_f64);
//! let child = Property::new("font_size", 0.0_f64);
//! child.set_transform(|size| Some(size * 1.5));
//! child.bind_inlet(&parent);
//!
//! parent.set_value(16.0, Affinity::Intrinsic);
//! child.recohere(1);
//! assert_eq!(child.value(), 24.0);
//! ```

use std::cell::RefCell;
use std::fmt::Display;
use std::rc::{Rc, Weak};
use std::str::FromStr;

use crate::error::{FastenerError, Result};
use crate::fastener::{graph, Fastener, FastenerCore, InletRef};
use crate::types::{Affinity, FastenerConfig, FastenerFlags, Timestamp};

// =============================================================================
// Value Inlet - What outlets read
// =============================================================================

/// A fastener that exports a value of type `T` to its outlets.
pub trait ValueInlet<T>: Fastener {
    /// Current value as seen by outlets.
    fn exported_value(&self) -> T;

    /// Value resolved through the inlet chain without waiting for a recohere.
    fn resolved_value(&self) -> T {
        self.exported_value()
    }
}

/// Value change callback: `(new, old)`.
pub type Observer<T> = Rc<dyn Fn(&T, &T)>;

/// Derivation mapping from the inlet's value. `None` means "no value".
pub type Transform<T> = Rc<dyn Fn(T) -> Option<T>>;

// =============================================================================
// Property
// =============================================================================

/// A reactive value cell.
pub struct Property<T: Clone + PartialEq + 'static> {
    core: FastenerCore,
    value: RefCell<T>,
    default: T,
    inlet: InletRef<dyn ValueInlet<T>>,
    transform: RefCell<Option<Transform<T>>>,
    observers: RefCell<Vec<Observer<T>>>,
}

impl<T: Clone + PartialEq + 'static> Property<T> {
    /// Create a property holding `default`.
    pub fn new(name: impl Into<String>, default: T) -> Rc<Self> {
        Self::with_config(name, default, FastenerConfig::default())
    }

    /// Create a property with explicit affinity/inheritance options.
    pub fn with_config(name: impl Into<String>, default: T, config: FastenerConfig) -> Rc<Self> {
        let name = name.into();
        Rc::new_cyclic(|this: &Weak<Self>| {
            let this: Weak<dyn Fastener> = this.clone();
            Self {
                core: FastenerCore::new(name, config, this),
                value: RefCell::new(default.clone()),
                default,
                inlet: InletRef::new(),
                transform: RefCell::new(None),
                observers: RefCell::new(Vec::new()),
            }
        })
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Current value. Never fails; a stale derived value is returned as is.
    pub fn value(&self) -> T {
        self.value.borrow().clone()
    }

    /// Value used when nothing else applies.
    pub fn default_value(&self) -> &T {
        &self.default
    }

    pub fn affinity(&self) -> Affinity {
        self.core.affinity()
    }

    /// The bound inlet, if any.
    pub fn inlet(&self) -> Option<Rc<dyn ValueInlet<T>>> {
        self.inlet.get()
    }

    /// The inlet's exported value, or an error naming this property.
    pub fn get_inlet_value(&self) -> Result<T> {
        self.inlet
            .get()
            .map(|inlet| inlet.exported_value())
            .ok_or_else(|| FastenerError::missing(self.core.name()))
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Assign `value` directly.
    ///
    /// Rejected (returns `false`) when `affinity` is lower than the current
    /// affinity. An accepted assignment leaves derived mode and invalidates
    /// outlets if the value changed.
    pub fn set_value(&self, value: T, affinity: Affinity) -> bool {
        if !self.core.accept_affinity(affinity) {
            return false;
        }
        self.set_derived(false);
        self.store(value);
        true
    }

    /// Parse and assign an external value.
    ///
    /// Unparsable input resets the property to its default. Returns whether
    /// the input parsed.
    pub fn set_str(&self, input: &str, affinity: Affinity) -> bool
    where
        T: FromStr,
        T::Err: Display,
    {
        match input.parse::<T>() {
            Ok(value) => {
                self.set_value(value, affinity);
                true
            }
            Err(err) => {
                tracing::warn!(
                    fastener = %self.core.name(),
                    input,
                    error = %err,
                    "unparsable value, using default"
                );
                self.set_value(self.default.clone(), affinity);
                false
            }
        }
    }

    /// Reset to the default value at `Transient` affinity, then re-derive if bound.
    pub fn reset(&self) {
        self.core.set_affinity(Affinity::Transient);
        self.store(self.default.clone());
        if self.inlet.is_bound() {
            self.set_derived(true);
        }
    }

    /// Install the derivation mapping applied to the inlet's value.
    pub fn set_transform(&self, transform: impl Fn(T) -> Option<T> + 'static) {
        *self.transform.borrow_mut() = Some(Rc::new(transform));
        if self.core.is_derived() {
            self.core.mark_decoherent();
        }
    }

    /// Register a change callback `(new, old)`.
    pub fn observe(&self, observer: impl Fn(&T, &T) + 'static) {
        self.observers.borrow_mut().push(Rc::new(observer));
    }

    // -------------------------------------------------------------------------
    // Binding
    // -------------------------------------------------------------------------

    /// Derive from `inlet` from now on (subject to affinity).
    pub fn bind_inlet<I: ValueInlet<T> + 'static>(&self, inlet: &Rc<I>) {
        let inlet: Rc<dyn ValueInlet<T>> = inlet.clone();
        graph::bind_inlet(self, &self.inlet, &inlet);
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn apply_transform(&self, incoming: T) -> T {
        let transform = self.transform.borrow().clone();
        match transform {
            Some(transform) => transform(incoming).unwrap_or_else(|| {
                tracing::warn!(fastener = %self.core.name(), "transform produced no value, using default");
                self.default.clone()
            }),
            None => incoming,
        }
    }

    fn store(&self, next: T) -> bool {
        let old = {
            let mut value = self.value.borrow_mut();
            if *value == next {
                return false;
            }
            std::mem::replace(&mut *value, next.clone())
        };
        let observers = self.observers.borrow().clone();
        for observer in observers {
            observer(&next, &old);
        }
        self.decohere();
        true
    }
}

impl<T: Clone + PartialEq + 'static> Fastener for Property<T> {
    fn core(&self) -> &FastenerCore {
        &self.core
    }

    fn recohere(&self, t: Timestamp) {
        if !self.core.is_derived() {
            self.core.set_coherent(t);
            return;
        }
        let Some(inlet) = self.inlet.get() else {
            // Inlet was dropped without unbinding; keep the last value
            self.core.remove_flags(FastenerFlags::DERIVED);
            self.core.set_coherent(t);
            return;
        };
        graph::pull_inlet(inlet.as_ref(), t);
        let next = self.apply_transform(inlet.exported_value());
        self.core.set_coherent(t);
        self.store(next);
    }

    fn has_inlet(&self) -> bool {
        self.inlet.is_bound()
    }

    fn unbind_inlet(&self) {
        graph::unbind_inlet(self, &self.inlet);
    }
}

impl<T: Clone + PartialEq + 'static> ValueInlet<T> for Property<T> {
    fn exported_value(&self) -> T {
        self.value()
    }

    fn resolved_value(&self) -> T {
        if self.core.is_derived() {
            if let Some(inlet) = self.inlet.get() {
                return self.apply_transform(inlet.resolved_value());
            }
        }
        self.value()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fastener::decohere_outlet;
    use crate::types::Length;
    use std::cell::Cell;

    fn config(affinity: Affinity) -> FastenerConfig {
        FastenerConfig::default().with_affinity(affinity)
    }

    #[test]
    fn test_bind_marks_decoherent_without_pulling() {
        let parent = Property::new("width", 10.0_f64);
        let child = Property::new("width", 0.0_f64);
        child.bind_inlet(&parent);

        assert!(child.core().is_derived());
        assert!(child.core().is_decoherent());
        assert_eq!(child.value(), 0.0);
        assert_eq!(parent.core().outlet_count(), 1);

        child.recohere(1);
        assert_eq!(child.value(), 10.0);
        assert!(!child.core().is_decoherent());
    }

    #[test]
    fn test_bind_is_idempotent() {
        let parent = Property::new("width", 10.0_f64);
        let child = Property::new("width", 0.0_f64);
        child.bind_inlet(&parent);
        child.bind_inlet(&parent);
        assert_eq!(parent.core().outlet_count(), 1);
    }

    #[test]
    fn test_override_precedence_extrinsic_outlet() {
        let parent = Property::with_config("color", 0_u32, config(Affinity::Transient));
        let child = Property::with_config("color", 0_u32, config(Affinity::Extrinsic));
        child.bind_inlet(&parent);
        // Transient inlet cannot take over an Extrinsic outlet
        assert!(!child.core().is_derived());

        parent.set_value(7, Affinity::Intrinsic);
        assert!(child.core().is_derived());
        assert!(child.core().is_decoherent());

        child.recohere(1);
        assert_eq!(child.value(), 7);
    }

    #[test]
    fn test_override_precedence_reflexive_outlet_untouched() {
        let parent = Property::with_config("color", 0_u32, config(Affinity::Transient));
        let child = Property::new("color", 0_u32);
        child.bind_inlet(&parent);
        child.set_value(3, Affinity::Reflexive);
        assert!(!child.core().is_derived());

        parent.set_value(7, Affinity::Intrinsic);
        assert!(!child.core().is_derived());

        child.recohere(1);
        assert_eq!(child.value(), 3);
    }

    #[test]
    fn test_decohere_outlet_direct() {
        let parent = Property::new("x", 0_i32);
        let child = Property::with_config("x", 0_i32, config(Affinity::Extrinsic));
        child.bind_inlet(&parent);
        assert!(!child.core().is_derived());

        decohere_outlet(Affinity::Intrinsic, child.as_ref());
        assert!(child.core().is_derived());

        let pinned = Property::with_config("x", 0_i32, config(Affinity::Reflexive));
        pinned.bind_inlet(&parent);
        decohere_outlet(Affinity::Intrinsic, pinned.as_ref());
        assert!(!pinned.core().is_derived());
    }

    #[test]
    fn test_recohere_chain_converges() {
        let a = Property::new("size", 1.0_f64);
        let b = Property::new("size", 0.0_f64);
        let c = Property::new("size", 0.0_f64);
        b.set_transform(|v| Some(v * 2.0));
        c.set_transform(|v| Some(v + 1.0));
        b.bind_inlet(&a);
        c.bind_inlet(&b);

        a.set_value(5.0, Affinity::Intrinsic);
        c.recohere(1);

        assert_eq!(b.value(), 10.0);
        assert_eq!(c.value(), 11.0);
        assert!(!b.core().is_decoherent());
        assert!(!c.core().is_decoherent());
    }

    #[test]
    fn test_decohere_is_idempotent() {
        let a = Property::new("size", 1.0_f64);
        let b = Property::new("size", 0.0_f64);
        let c = Property::new("size", 0.0_f64);
        b.bind_inlet(&a);
        c.bind_inlet(&b);
        c.recohere(1);

        a.decohere();
        let once = (b.core().flags(), c.core().flags());
        a.decohere();
        let twice = (b.core().flags(), c.core().flags());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_recohere_is_noop_when_not_derived() {
        let p = Property::new("gap", 4_u16);
        p.recohere(3);
        assert_eq!(p.value(), 4);
        assert_eq!(p.core().coherent_time(), Some(3));
    }

    #[test]
    fn test_lower_affinity_assignment_rejected() {
        let p = Property::new("gap", 0_u16);
        assert!(p.set_value(2, Affinity::Intrinsic));
        assert!(!p.set_value(5, Affinity::Extrinsic));
        assert_eq!(p.value(), 2);
        assert_eq!(p.affinity(), Affinity::Intrinsic);
    }

    #[test]
    fn test_unbind_leaves_derived_mode() {
        let parent = Property::new("gap", 1_u16);
        let child = Property::new("gap", 0_u16);
        child.bind_inlet(&parent);
        child.recohere(1);
        child.unbind_inlet();

        assert!(!child.core().is_derived());
        assert!(!child.has_inlet());
        assert_eq!(parent.core().outlet_count(), 0);
        assert_eq!(child.value(), 1);
        assert!(child.get_inlet_value().is_err());
    }

    #[test]
    fn test_non_inheriting_property_never_binds() {
        let parent = Property::new("gap", 1_u16);
        let child = Property::with_config("gap", 0_u16, FastenerConfig::default().with_inherits(false));
        child.bind_inlet(&parent);
        assert!(!child.has_inlet());
        assert_eq!(parent.core().outlet_count(), 0);
    }

    #[test]
    fn test_transform_failure_uses_default() {
        let parent = Property::new("ratio", 0.0_f64);
        let child = Property::new("ratio", 1.0_f64);
        child.set_transform(|v| if v > 0.0 { Some(1.0 / v) } else { None });
        child.bind_inlet(&parent);
        child.recohere(1);
        assert_eq!(child.value(), 1.0);

        parent.set_value(4.0, Affinity::Intrinsic);
        child.recohere(2);
        assert_eq!(child.value(), 0.25);
    }

    #[test]
    fn test_set_str_parse_failure_resets_to_default() {
        let p = Property::new("width", Length::px(5.0));
        assert!(p.set_str("20%", Affinity::Extrinsic));
        assert_eq!(p.value(), Length::pct(20.0));

        assert!(!p.set_str("wide", Affinity::Extrinsic));
        assert_eq!(p.value(), Length::px(5.0));
    }

    #[test]
    fn test_observers_see_new_and_old() {
        let p = Property::new("gap", 0_i32);
        let seen = Rc::new(Cell::new((0, 0)));
        let seen_clone = seen.clone();
        p.observe(move |new, old| seen_clone.set((*new, *old)));

        p.set_value(3, Affinity::Extrinsic);
        assert_eq!(seen.get(), (3, 0));

        // Unchanged value does not notify
        seen.set((9, 9));
        p.set_value(3, Affinity::Extrinsic);
        assert_eq!(seen.get(), (9, 9));
    }

    #[test]
    fn test_resolved_value_walks_chain() {
        let a = Property::new("z", 2_i32);
        let b = Property::new("z", 0_i32);
        let c = Property::new("z", 0_i32);
        b.bind_inlet(&a);
        c.bind_inlet(&b);
        c.set_transform(|v| Some(v * 10));
        // Nothing recohered yet
        assert_eq!(c.value(), 0);
        assert_eq!(c.resolved_value(), 20);
    }

    #[test]
    fn test_reset_rederives() {
        let parent = Property::new("z", 2_i32);
        let child = Property::new("z", 0_i32);
        child.bind_inlet(&parent);
        child.set_value(5, Affinity::Reflexive);
        assert!(!child.core().is_derived());

        child.reset();
        assert_eq!(child.affinity(), Affinity::Transient);
        assert!(child.core().is_derived());
        child.recohere(1);
        assert_eq!(child.value(), 2);
    }

    #[test]
    fn test_dropped_inlet_is_not_derived() {
        let child = Property::new("gap", 0.0_f64);
        {
            let parent = Property::new("gap", 4.0_f64);
            child.bind_inlet(&parent);
            child.recohere(1);
            assert!(child.is_derived());
        }
        // Flag is stale until the next recohere
        assert!(child.core().is_derived());
        assert!(!child.is_derived());

        child.core().mark_decoherent();
        child.recohere(2);
        assert!(!child.core().is_derived());
        assert_eq!(child.value(), 4.0);
    }

    #[test]
    fn test_unmount_unbinds_inlet() {
        let queue = crate::fastener::UpdateQueue::new();
        let parent = Property::new("gap", 0.0_f64);
        let child = Property::new("gap", 0.0_f64);
        child.mount(queue.context());
        child.bind_inlet(&parent);
        queue.recohere_fasteners(1);
        assert_eq!(parent.core().outlet_count(), 1);

        child.unmount();
        assert!(!child.has_inlet());
        assert!(!child.core().is_derived());
        assert_eq!(parent.core().outlet_count(), 0);

        parent.set_value(9.0, Affinity::Intrinsic);
        assert!(!child.core().is_decoherent());
        assert_eq!(child.value(), 0.0);
    }
}
