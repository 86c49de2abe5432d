//! Animator - A value fastener that tweens between states.
//!
//! An animator separates its *state* (the target) from its *value* (what is
//! currently shown). Setting a state with a [`Timing`] starts a tween; each
//! recohere pass advances it using the pass timestamp, and the animator keeps
//! re-marking itself decoherent until the tween completes.
//!
//! # Example
//!
//! ```
//! use spark_fasteners::{Affinity, Animator, Fastener, Timing, UpdateQueue};
//!
//! let queue = UpdateQueue::new();
//! let opacity = Animator::new("opacity", 0.0_f64);
//! opacity.mount(queue.context());
//!
//! opacity.set_state(1.0, Some(Timing::linear(100)), Affinity::Intrinsic);
//! queue.recohere_fasteners(1_000); // tween starts
//! queue.recohere_fasteners(1_050);
//! assert_eq!(opacity.value(), 0.5);
//! queue.recohere_fasteners(1_100);
//! assert_eq!(opacity.value(), 1.0);
//! assert!(!opacity.is_tweening());
//! ```

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::fastener::{graph, Fastener, FastenerCore, InletRef, UpdateFlags};
use crate::property::{Observer, ValueInlet};
use crate::types::{Affinity, FastenerConfig, FastenerFlags, Length, Timestamp};

pub mod timing;

pub use timing::{Easing, Timing};

// =============================================================================
// Interpolate
// =============================================================================

/// Values an animator can tween.
pub trait Interpolate: Clone + PartialEq + 'static {
    /// Value at progress `u` (0 = `self`, 1 = `to`).
    fn interpolate(&self, to: &Self, u: f64) -> Self;
}

impl Interpolate for f64 {
    fn interpolate(&self, to: &Self, u: f64) -> Self {
        self + (to - self) * u
    }
}

impl Interpolate for f32 {
    fn interpolate(&self, to: &Self, u: f64) -> Self {
        self + (to - self) * u as f32
    }
}

impl Interpolate for Length {
    /// Lengths in different units cannot be blended; they switch at the end.
    fn interpolate(&self, to: &Self, u: f64) -> Self {
        if self.unit == to.unit {
            Length {
                value: self.value.interpolate(&to.value, u),
                unit: to.unit,
            }
        } else if u >= 1.0 {
            *to
        } else {
            *self
        }
    }
}

impl Interpolate for String {
    fn interpolate(&self, to: &Self, u: f64) -> Self {
        if u >= 1.0 { to.clone() } else { self.clone() }
    }
}

impl Interpolate for bool {
    fn interpolate(&self, to: &Self, u: f64) -> Self {
        if u >= 1.0 { *to } else { *self }
    }
}

// =============================================================================
// Animator State (embedded)
// =============================================================================

struct Tween<T> {
    from: T,
    to: T,
    timing: Timing,
    start: Option<Timestamp>,
}

/// Value/state/tween bookkeeping shared by [`Animator`] and
/// [`ConstraintAnimator`](crate::constraint::ConstraintAnimator).
pub(crate) struct AnimatorState<T: Interpolate> {
    value: RefCell<T>,
    state: RefCell<T>,
    default: T,
    tween: RefCell<Option<Tween<T>>>,
    pub(crate) inlet: InletRef<dyn ValueInlet<T>>,
    observers: RefCell<Vec<Observer<T>>>,
}

impl<T: Interpolate> AnimatorState<T> {
    pub(crate) fn new(default: T) -> Self {
        Self {
            value: RefCell::new(default.clone()),
            state: RefCell::new(default.clone()),
            default,
            tween: RefCell::new(None),
            inlet: InletRef::new(),
            observers: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn value(&self) -> T {
        self.value.borrow().clone()
    }

    pub(crate) fn state(&self) -> T {
        self.state.borrow().clone()
    }

    pub(crate) fn default_value(&self) -> &T {
        &self.default
    }

    pub(crate) fn is_tweening(&self) -> bool {
        self.tween.borrow().is_some()
    }

    pub(crate) fn observe(&self, observer: Observer<T>) {
        self.observers.borrow_mut().push(observer);
    }

    /// Directly assign a new state. Returns `false` if rejected by affinity.
    pub(crate) fn set_state(
        &self,
        owner: &dyn Fastener,
        state: T,
        timing: Option<Timing>,
        affinity: Affinity,
    ) -> bool {
        let core = owner.core();
        if !core.accept_affinity(affinity) {
            return false;
        }
        owner.set_derived(false);
        self.animate_to(core, state, timing);
        true
    }

    fn animate_to(&self, core: &FastenerCore, state: T, timing: Option<Timing>) -> bool {
        *self.state.borrow_mut() = state.clone();
        let current = self.value();
        match timing {
            Some(timing) if timing.duration > 0 && current != state => {
                *self.tween.borrow_mut() = Some(Tween {
                    from: current,
                    to: state,
                    timing,
                    start: None,
                });
                request_frame(core);
                false
            }
            _ => {
                *self.tween.borrow_mut() = None;
                self.store(core, state)
            }
        }
    }

    /// Advance the tween or pull from the inlet. Returns whether the value changed.
    pub(crate) fn recohere(&self, core: &FastenerCore, t: Timestamp) -> bool {
        if core.is_derived() {
            if let Some(inlet) = self.inlet.get() {
                graph::pull_inlet(inlet.as_ref(), t);
                let incoming = inlet.exported_value();
                *self.state.borrow_mut() = incoming.clone();
                *self.tween.borrow_mut() = None;
                core.set_coherent(t);
                return self.store(core, incoming);
            }
            core.remove_flags(FastenerFlags::DERIVED);
        }

        let frame = {
            let mut tween = self.tween.borrow_mut();
            tween.as_mut().map(|tween| {
                let start = *tween.start.get_or_insert(t);
                let elapsed = t.saturating_sub(start);
                if elapsed >= tween.timing.duration {
                    (tween.to.clone(), true)
                } else {
                    let u = tween.timing.progress(elapsed);
                    (tween.from.interpolate(&tween.to, u), false)
                }
            })
        };

        core.set_coherent(t);
        let Some((value, done)) = frame else {
            return false;
        };
        if done {
            *self.tween.borrow_mut() = None;
        }
        let changed = self.store(core, value);
        if !done {
            request_frame(core);
        }
        changed
    }

    pub(crate) fn resolved_value(&self, core: &FastenerCore) -> T {
        if core.is_derived() {
            if let Some(inlet) = self.inlet.get() {
                return inlet.resolved_value();
            }
        }
        self.value()
    }

    fn store(&self, core: &FastenerCore, next: T) -> bool {
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
        graph::decohere_outlets(core);
        true
    }
}

/// Keep the animator scheduled for another frame.
fn request_frame(core: &FastenerCore) {
    core.mark_decoherent();
    if let Some(context) = core.context() {
        context.require_update(UpdateFlags::ANIMATE);
    }
}

// =============================================================================
// Animator
// =============================================================================

/// A tweening value cell.
pub struct Animator<T: Interpolate> {
    core: FastenerCore,
    anim: AnimatorState<T>,
}

impl<T: Interpolate> Animator<T> {
    pub fn new(name: impl Into<String>, default: T) -> Rc<Self> {
        Self::with_config(name, default, FastenerConfig::default())
    }

    pub fn with_config(name: impl Into<String>, default: T, config: FastenerConfig) -> Rc<Self> {
        let name = name.into();
        Rc::new_cyclic(|this: &Weak<Self>| {
            let this: Weak<dyn Fastener> = this.clone();
            Self {
                core: FastenerCore::new(name, config, this),
                anim: AnimatorState::new(default),
            }
        })
    }

    /// Currently shown value.
    pub fn value(&self) -> T {
        self.anim.value()
    }

    /// Target of the current (or last) tween.
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

    /// Set a new target state, tweening when `timing` is given.
    pub fn set_state(&self, state: T, timing: Option<Timing>, affinity: Affinity) -> bool {
        self.anim.set_state(self, state, timing, affinity)
    }

    /// Jump straight to `value`.
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

    pub fn inlet(&self) -> Option<Rc<dyn ValueInlet<T>>> {
        self.anim.inlet.get()
    }
}

impl<T: Interpolate> Fastener for Animator<T> {
    fn core(&self) -> &FastenerCore {
        &self.core
    }

    fn recohere(&self, t: Timestamp) {
        self.anim.recohere(&self.core, t);
    }

    fn has_inlet(&self) -> bool {
        self.anim.inlet.is_bound()
    }

    fn unbind_inlet(&self) {
        graph::unbind_inlet(self, &self.anim.inlet);
    }
}

impl<T: Interpolate> ValueInlet<T> for Animator<T> {
    fn exported_value(&self) -> T {
        self.value()
    }

    fn resolved_value(&self) -> T {
        self.anim.resolved_value(&self.core)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fastener::UpdateQueue;
    use crate::property::Property;

    #[test]
    fn test_set_without_timing_jumps() {
        let a = Animator::new("opacity", 0.0_f64);
        assert!(a.set_value(1.0, Affinity::Extrinsic));
        assert_eq!(a.value(), 1.0);
        assert_eq!(a.state(), 1.0);
        assert!(!a.is_tweening());
    }

    #[test]
    fn test_tween_advances_per_pass() {
        let queue = UpdateQueue::new();
        let a = Animator::new("opacity", 0.0_f64);
        a.mount(queue.context());

        a.set_state(1.0, Some(Timing::linear(100)), Affinity::Intrinsic);
        assert!(a.is_tweening());
        assert!(queue.update_flags().contains(UpdateFlags::ANIMATE));
        assert_eq!(a.value(), 0.0);
        assert_eq!(a.state(), 1.0);

        queue.recohere_fasteners(1_000);
        assert_eq!(a.value(), 0.0);
        assert!(queue.needs_update());

        queue.recohere_fasteners(1_025);
        assert_eq!(a.value(), 0.25);

        queue.recohere_fasteners(1_100);
        assert_eq!(a.value(), 1.0);
        assert!(!a.is_tweening());
        assert!(!a.core().is_decoherent());
        assert!(!queue.needs_update());
    }

    #[test]
    fn test_tween_decoheres_outlets_each_frame() {
        let queue = UpdateQueue::new();
        let a = Animator::new("left", 0.0_f64);
        let follower = Property::new("left", 0.0_f64);
        a.mount(queue.context());
        follower.mount(queue.context());
        follower.bind_inlet(&a);
        queue.recohere_fasteners(1);

        a.set_state(10.0, Some(Timing::linear(10)), Affinity::Intrinsic);
        queue.recohere_fasteners(100);
        queue.recohere_fasteners(105);
        assert_eq!(a.value(), 5.0);
        // Decohered during the pass; picked up by the next one
        assert!(follower.core().is_decoherent());

        // Follower pulls the animator, which advances once for this pass
        queue.recohere_fasteners(106);
        assert_eq!(a.value(), 6.0);
        assert_eq!(follower.value(), 6.0);
    }

    #[test]
    fn test_derived_animator_jumps_to_inlet() {
        let parent = Property::new("top", 3.0_f64);
        let a = Animator::new("top", 0.0_f64);
        a.bind_inlet(&parent);
        a.recohere(1);
        assert_eq!(a.value(), 3.0);
        assert_eq!(a.state(), 3.0);
    }

    #[test]
    fn test_lengths_in_other_units_switch_at_end() {
        let from = Length::px(10.0);
        let to = Length::pct(50.0);
        assert_eq!(from.interpolate(&to, 0.5), from);
        assert_eq!(from.interpolate(&to, 1.0), to);
        assert_eq!(
            Length::px(0.0).interpolate(&Length::px(10.0), 0.5),
            Length::px(5.0)
        );
    }
}
