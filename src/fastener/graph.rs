//! Derivation graph operations.
//!
//! The decohere wave (push, eager, flags only) and the recohere pull (lazy,
//! demand-driven) over fastener links, plus binding and generic traversal.
//!
//! ```text
//! decohere:   A ──▶ B ──▶ C        flags flip downstream, work is enqueued
//! recohere:   A ◀── B ◀── C        C pulls B, B pulls A, values flow down
//! ```

use std::rc::Rc;

use super::{Fastener, FastenerCore, InletRef};
use crate::theme::Theme;
use crate::types::{Affinity, Timestamp};

// =============================================================================
// Decohere - Invalidation wave
// =============================================================================

/// Invalidate every outlet of `inlet`.
///
/// Outlets are visited in registration order. Siblings are independent; no
/// ordering between them is guaranteed to specializations.
pub fn decohere_outlets(inlet: &FastenerCore) {
    let affinity = inlet.affinity();
    for outlet in inlet.outlets() {
        decohere_outlet(affinity, outlet.as_ref());
    }
}

/// Invalidate a single outlet of an inlet holding `inlet_affinity`.
///
/// - Not derived, and the inlet's effective affinity is at least the outlet's:
///   override, forcing the outlet into derived mode.
/// - Derived and still coherent: mark decoherent and keep propagating.
/// - Otherwise: nothing. Either work is already pending, or the outlet is
///   authoritative over its own value.
pub fn decohere_outlet(inlet_affinity: Affinity, outlet: &dyn Fastener) {
    let core = outlet.core();
    if !core.is_derived() {
        if inlet_affinity.overrides(core.affinity()) {
            tracing::trace!(
                outlet = %core.name(),
                inlet_affinity = ?inlet_affinity,
                outlet_affinity = ?core.affinity(),
                "override into derived mode"
            );
            outlet.set_derived(true);
        }
    } else if !core.is_decoherent() {
        tracing::trace!(outlet = %core.name(), "decohere");
        core.mark_decoherent();
        outlet.decohere();
    }
}

// =============================================================================
// Recohere - Demand-driven pull
// =============================================================================

/// Bring `inlet` up to date for pass `t` before an outlet reads from it.
///
/// A fastener already recohered during `t` is not recomputed, even if it
/// re-marked itself decoherent (e.g. a running tween).
pub fn pull_inlet<I: ?Sized + Fastener>(inlet: &I, t: Timestamp) {
    let core = inlet.core();
    if core.is_decoherent() && !core.is_coherent_at(t) {
        tracing::trace!(inlet = %core.name(), t, "pull");
        inlet.recohere(t);
    }
}

// =============================================================================
// Binding
// =============================================================================

/// Bind `outlet` to `inlet`, replacing any previous inlet.
///
/// Registers `outlet` in the inlet's outlet list and marks it decoherent. If
/// the inlet's effective affinity permits, the outlet also enters derived
/// mode. No value is pulled until the next recohere.
pub fn bind_inlet<I: ?Sized + Fastener>(outlet: &dyn Fastener, slot: &InletRef<I>, inlet: &Rc<I>) {
    let core = outlet.core();
    if !core.inherits() {
        tracing::trace!(outlet = %core.name(), "bind skipped: does not inherit");
        return;
    }
    if let Some(current) = slot.get() {
        if current.core().id() == inlet.core().id() {
            return;
        }
        unbind_inlet(outlet, slot);
    }

    slot.set(inlet);
    inlet.core().attach_outlet(core);
    tracing::trace!(outlet = %core.name(), inlet = %inlet.core().name(), "bind inlet");

    if inlet.core().affinity().overrides(core.affinity()) {
        outlet.set_derived(true);
    }
    core.mark_decoherent();
}

/// Clear `outlet`'s inlet and remove it from the inlet's outlet list.
pub fn unbind_inlet<I: ?Sized + Fastener>(outlet: &dyn Fastener, slot: &InletRef<I>) {
    let Some(weak) = slot.take() else { return };
    let core = outlet.core();
    if let Some(inlet) = weak.upgrade() {
        inlet.core().detach_outlet(core.id());
        tracing::trace!(outlet = %core.name(), inlet = %inlet.core().name(), "unbind inlet");
    }
    outlet.set_derived(false);
}

// =============================================================================
// Traversal
// =============================================================================

/// Visit every fastener reachable from `root` through outlet links, root first.
pub fn visit_outlets(root: &dyn Fastener, visit: &mut dyn FnMut(&dyn Fastener)) {
    visit(root);
    for outlet in root.core().outlets() {
        visit_outlets(outlet.as_ref(), visit);
    }
}

/// Apply `theme` to `root` and every fastener reachable through its outlets.
///
/// Independent of coherence: flags are not read or written.
pub fn apply_theme(root: &dyn Fastener, theme: &Theme) {
    visit_outlets(root, &mut |fastener| fastener.theme_fastener(theme));
}
