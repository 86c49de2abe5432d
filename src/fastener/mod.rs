//! Fastener - A single reactive cell in the derivation graph.
//!
//! A fastener holds a value, may derive that value from one upstream fastener
//! (its inlet), and feeds any number of downstream fasteners (its outlets).
//!
//! # Architecture
//!
//! ```text
//!            inlet (Weak)                 outlets (Vec<Weak>)
//!   parent ─────────────── fastener ─────────────────────── children
//!                             │
//!                             └── context (Weak) ── scheduler
//! ```
//!
//! Every link is non-owning. The owning component holds the `Rc`; dropping it
//! leaves dead `Weak`s behind that are pruned the next time the outlet list is
//! walked.
//!
//! Invalidation is eager and cheap ([`Fastener::decohere`] only flips flags and
//! enqueues work). Recomputation is lazy: the scheduler later calls
//! [`Fastener::recohere`] with the frame timestamp, and each fastener pulls
//! from its inlet chain on demand.
//!
//! # Preconditions
//!
//! Inlet/outlet wiring must be acyclic. Traversals do not track visited nodes,
//! so a cycle recurses without bound.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::theme::Theme;
use crate::types::{Affinity, FastenerConfig, FastenerFlags, FastenerId, Timestamp};

pub mod context;
pub mod graph;

pub use context::{FastenerContext, UpdateFlags, UpdateQueue};
pub use graph::{apply_theme, bind_inlet, decohere_outlet, decohere_outlets, unbind_inlet, visit_outlets};

// =============================================================================
// Fastener Trait
// =============================================================================

/// Node-level operations shared by every fastener kind.
///
/// Implementors only provide [`core`](Fastener::core),
/// [`recohere`](Fastener::recohere), and the inlet accessors. Everything else
/// has a default built on [`FastenerCore`].
pub trait Fastener {
    /// Shared state: flags, affinity, outlets, context.
    fn core(&self) -> &FastenerCore;

    /// Pull fresh state from the inlet chain and clear `DECOHERENT`.
    ///
    /// Never fails. An absent inlet or an unusable upstream value is a normal
    /// terminal state.
    fn recohere(&self, t: Timestamp);

    /// Whether an inlet is currently bound and alive.
    fn has_inlet(&self) -> bool;

    /// Clear the inlet and leave derived mode.
    fn unbind_inlet(&self);

    /// Whether the value currently comes from a live inlet.
    ///
    /// The `DERIVED` flag of a fastener whose inlet was dropped without
    /// unbinding is only cleared by its next recohere; this check does not
    /// wait for that.
    fn is_derived(&self) -> bool {
        self.core().is_derived() && self.has_inlet()
    }

    /// Propagate invalidation to every outlet.
    fn decohere(&self) {
        graph::decohere_outlets(self.core());
    }

    /// Enter or leave derived mode.
    ///
    /// Entering derived mode marks the fastener decoherent so the next pass
    /// pulls from the inlet. A fastener without an inlet never becomes derived.
    fn set_derived(&self, derived: bool) {
        let core = self.core();
        if derived {
            if !core.is_derived() && self.has_inlet() {
                core.insert_flags(FastenerFlags::DERIVED);
                core.mark_decoherent();
            }
        } else if core.is_derived() {
            core.remove_flags(FastenerFlags::DERIVED);
        }
    }

    /// Attach the scheduler and run [`did_mount`](Fastener::did_mount).
    fn mount(&self, context: Weak<dyn FastenerContext>) {
        self.core().mount(context);
        self.did_mount();
    }

    /// Run [`will_unmount`](Fastener::will_unmount), unbind the inlet, and
    /// detach the scheduler.
    fn unmount(&self) {
        self.will_unmount();
        self.unbind_inlet();
        self.core().unmount();
    }

    /// Hook: called after the fastener is mounted.
    fn did_mount(&self) {}

    /// Hook: called before the fastener is unmounted.
    fn will_unmount(&self) {}

    /// Hook: called for each node reached by [`apply_theme`].
    fn theme_fastener(&self, _theme: &Theme) {}

    fn name(&self) -> &str {
        self.core().name()
    }

    fn id(&self) -> FastenerId {
        self.core().id()
    }
}

// =============================================================================
// Fastener Core
// =============================================================================

/// State shared by every fastener kind, embedded as a field.
pub struct FastenerCore {
    id: FastenerId,
    name: String,
    flags: Cell<FastenerFlags>,
    affinity: Cell<Affinity>,
    coherent_time: Cell<Option<Timestamp>>,
    outlets: RefCell<Vec<(FastenerId, Weak<dyn Fastener>)>>,
    context: RefCell<Option<Weak<dyn FastenerContext>>>,
    this: Weak<dyn Fastener>,
}

impl FastenerCore {
    /// Create the core for a fastener under construction.
    ///
    /// `this` is the fastener's own weak handle, usually obtained from
    /// [`Rc::new_cyclic`].
    pub fn new(name: impl Into<String>, config: FastenerConfig, this: Weak<dyn Fastener>) -> Self {
        Self {
            id: FastenerId::next(),
            name: name.into(),
            flags: Cell::new(config.flags()),
            affinity: Cell::new(config.affinity),
            coherent_time: Cell::new(None),
            outlets: RefCell::new(Vec::new()),
            context: RefCell::new(None),
            this,
        }
    }

    pub fn id(&self) -> FastenerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Strong handle to the fastener that embeds this core, if still alive.
    pub fn this(&self) -> Option<Rc<dyn Fastener>> {
        self.this.upgrade()
    }

    // -------------------------------------------------------------------------
    // Flags
    // -------------------------------------------------------------------------

    pub fn flags(&self) -> FastenerFlags {
        self.flags.get()
    }

    pub fn insert_flags(&self, flags: FastenerFlags) {
        self.flags.set(self.flags.get() | flags);
    }

    pub fn remove_flags(&self, flags: FastenerFlags) {
        self.flags.set(self.flags.get() & !flags);
    }

    pub fn is_derived(&self) -> bool {
        self.flags().contains(FastenerFlags::DERIVED)
    }

    pub fn is_decoherent(&self) -> bool {
        self.flags().contains(FastenerFlags::DECOHERENT)
    }

    pub fn inherits(&self) -> bool {
        self.flags().contains(FastenerFlags::INHERITS)
    }

    pub fn is_mounted(&self) -> bool {
        self.flags().contains(FastenerFlags::MOUNTED)
    }

    // -------------------------------------------------------------------------
    // Affinity
    // -------------------------------------------------------------------------

    pub fn affinity(&self) -> Affinity {
        self.affinity.get()
    }

    pub fn set_affinity(&self, affinity: Affinity) {
        self.affinity.set(affinity);
    }

    /// Check whether an assignment at `affinity` may replace the current value,
    /// and raise/lower the stored affinity to match when it may.
    pub fn accept_affinity(&self, affinity: Affinity) -> bool {
        if affinity < self.affinity.get() {
            tracing::trace!(
                fastener = %self.name,
                current = ?self.affinity.get(),
                requested = ?affinity,
                "assignment rejected by affinity"
            );
            return false;
        }
        self.affinity.set(affinity);
        true
    }

    // -------------------------------------------------------------------------
    // Coherence
    // -------------------------------------------------------------------------

    /// Time of the last successful recohere.
    pub fn coherent_time(&self) -> Option<Timestamp> {
        self.coherent_time.get()
    }

    /// Mark pending recompute and notify the scheduler.
    ///
    /// Only the coherent -> decoherent transition enqueues, so repeated calls
    /// are harmless.
    pub fn mark_decoherent(&self) {
        if self.is_decoherent() {
            return;
        }
        self.insert_flags(FastenerFlags::DECOHERENT);
        self.notify_context();
    }

    /// Clear `DECOHERENT` and record the pass time.
    pub fn set_coherent(&self, t: Timestamp) {
        self.remove_flags(FastenerFlags::DECOHERENT);
        self.coherent_time.set(Some(t));
    }

    /// Whether this fastener was already recohered during pass `t`.
    pub fn is_coherent_at(&self, t: Timestamp) -> bool {
        self.coherent_time.get() == Some(t)
    }

    fn notify_context(&self) {
        let Some(context) = self.context() else { return };
        let Some(this) = self.this.upgrade() else { return };
        context.decohere_fastener(this);
    }

    // -------------------------------------------------------------------------
    // Mounting
    // -------------------------------------------------------------------------

    /// Scheduler context, if mounted and still alive.
    pub fn context(&self) -> Option<Rc<dyn FastenerContext>> {
        self.context.borrow().as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn mount(&self, context: Weak<dyn FastenerContext>) {
        *self.context.borrow_mut() = Some(context);
        self.insert_flags(FastenerFlags::MOUNTED);
        // Work requested before mounting still needs a pass
        if self.is_decoherent() {
            self.notify_context();
        }
    }

    pub(crate) fn unmount(&self) {
        self.remove_flags(FastenerFlags::MOUNTED);
        *self.context.borrow_mut() = None;
    }

    // -------------------------------------------------------------------------
    // Outlets
    // -------------------------------------------------------------------------

    /// Register `outlet` downstream of this fastener. No-op if already present.
    pub fn attach_outlet(&self, outlet: &FastenerCore) {
        let mut outlets = self.outlets.borrow_mut();
        if outlets.iter().any(|(id, _)| *id == outlet.id) {
            return;
        }
        outlets.push((outlet.id, outlet.this.clone()));
    }

    /// Remove `outlet` from this fastener's outlets. No-op if absent.
    pub fn detach_outlet(&self, outlet: FastenerId) {
        self.outlets.borrow_mut().retain(|(id, _)| *id != outlet);
    }

    /// Live outlets in registration order. Dead entries are pruned.
    pub fn outlets(&self) -> Vec<Rc<dyn Fastener>> {
        let mut outlets = self.outlets.borrow_mut();
        let mut live = Vec::with_capacity(outlets.len());
        outlets.retain(|(_, weak)| match weak.upgrade() {
            Some(outlet) => {
                live.push(outlet);
                true
            }
            None => false,
        });
        live
    }

    /// Number of live outlets.
    pub fn outlet_count(&self) -> usize {
        self.outlets().len()
    }

    pub fn has_outlet(&self, outlet: FastenerId) -> bool {
        self.outlets.borrow().iter().any(|(id, _)| *id == outlet)
    }
}

impl std::fmt::Debug for FastenerCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastenerCore")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("flags", &self.flags.get())
            .field("affinity", &self.affinity.get())
            .field("coherent_time", &self.coherent_time.get())
            .finish()
    }
}

// =============================================================================
// Inlet Reference
// =============================================================================

/// Non-owning slot for a fastener's single upstream source.
pub struct InletRef<I: ?Sized> {
    inlet: RefCell<Option<Weak<I>>>,
}

impl<I: ?Sized> Default for InletRef<I> {
    fn default() -> Self {
        Self {
            inlet: RefCell::new(None),
        }
    }
}

impl<I: ?Sized + Fastener> InletRef<I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bound inlet, if any and still alive.
    pub fn get(&self) -> Option<Rc<I>> {
        self.inlet.borrow().as_ref().and_then(Weak::upgrade)
    }

    /// Whether a live inlet is bound.
    pub fn is_bound(&self) -> bool {
        self.get().is_some()
    }

    pub(crate) fn set(&self, inlet: &Rc<I>) {
        *self.inlet.borrow_mut() = Some(Rc::downgrade(inlet));
    }

    pub(crate) fn take(&self) -> Option<Weak<I>> {
        self.inlet.borrow_mut().take()
    }
}
