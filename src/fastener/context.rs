//! Fastener Context - The scheduler seen from inside the graph.
//!
//! Fasteners never recompute on their own. When one becomes decoherent it hands
//! itself to its context, and the context's owner later runs one update pass:
//!
//! ```text
//! set_value ─▶ decohere ─▶ context.decohere_fastener(f) ─▶ queue
//!                                                            │
//! frame(t) ──────────────────────▶ queue.recohere_fasteners(t) ─▶ f.recohere(t)
//! ```
//!
//! [`UpdateQueue`] is the stock context. It also exposes spark-signals
//! signals so a host render effect can react to pending work.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use spark_signals::{signal, Signal};

use super::Fastener;
use crate::types::Timestamp;

bitflags::bitflags! {
    /// Kinds of work a fastener may request from its host.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct UpdateFlags: u8 {
        const NONE = 0;
        /// One or more fasteners need a recohere pass.
        const RECOHERE = 1 << 0;
        /// A tween is running; schedule another frame.
        const ANIMATE = 1 << 1;
    }
}

// =============================================================================
// Context Capability
// =============================================================================

/// Scheduler capability provided by the component that owns fasteners.
pub trait FastenerContext {
    /// Enqueue `fastener` for the next recohere pass.
    fn decohere_fastener(&self, fastener: Rc<dyn Fastener>);

    /// Ask the host for another update.
    fn require_update(&self, _flags: UpdateFlags) {}
}

// =============================================================================
// Update Queue
// =============================================================================

/// Pending-fastener queue with timestamp-keyed recohere passes.
///
/// # Example
///
/// ```
/// use spark_fasteners::{Affinity, Fastener, Property, UpdateQueue};
///
/// let queue = UpdateQueue::new();
/// let width = Property::new("width", 0.0_f64);
/// width.mount(queue.context());
///
/// let parent = Property::new("width", 0.0_f64);
/// width.bind_inlet(&parent);
/// assert!(queue.needs_update());
///
/// parent.set_value(12.0, Affinity::Intrinsic);
/// queue.recohere_fasteners(1);
/// assert_eq!(width.value(), 12.0);
/// ```
pub struct UpdateQueue {
    pending: RefCell<Vec<Weak<dyn Fastener>>>,
    flags: Cell<UpdateFlags>,
    needs_update: Signal<bool>,
    last_pass: Signal<Timestamp>,
}

impl UpdateQueue {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            pending: RefCell::new(Vec::new()),
            flags: Cell::new(UpdateFlags::NONE),
            needs_update: signal(false),
            last_pass: signal(0),
        })
    }

    /// Weak context handle to pass to [`Fastener::mount`].
    pub fn context(self: &Rc<Self>) -> Weak<dyn FastenerContext> {
        let weak: Weak<Self> = Rc::downgrade(self);
        weak
    }

    /// Whether any fastener is waiting for a pass (tracked read).
    pub fn needs_update(&self) -> bool {
        self.needs_update.get()
    }

    /// Signal that flips to `true` when work is enqueued.
    pub fn needs_update_signal(&self) -> Signal<bool> {
        self.needs_update.clone()
    }

    /// Timestamp of the last completed pass (tracked read).
    pub fn last_pass(&self) -> Timestamp {
        self.last_pass.get()
    }

    /// Work kinds requested since the last pass.
    pub fn update_flags(&self) -> UpdateFlags {
        self.flags.get()
    }

    /// Number of queued fasteners (dead entries included until the next pass).
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    /// Recohere every queued fastener with the shared timestamp `t`.
    ///
    /// Fasteners enqueued while the pass runs (including ones that re-marked
    /// themselves decoherent) wait for the next pass.
    pub fn recohere_fasteners(&self, t: Timestamp) {
        let batch = std::mem::take(&mut *self.pending.borrow_mut());
        self.flags.set(UpdateFlags::NONE);
        tracing::trace!(t, count = batch.len(), "recohere pass");

        for weak in batch {
            let Some(fastener) = weak.upgrade() else { continue };
            let core = fastener.core();
            if core.is_decoherent() && !core.is_coherent_at(t) {
                fastener.recohere(t);
            }
        }

        let remaining = !self.pending.borrow().is_empty();
        if remaining {
            self.flags.set(self.flags.get() | UpdateFlags::RECOHERE);
        }
        self.needs_update.set(remaining);
        self.last_pass.set(t);
    }

    /// Drop all queued work.
    pub fn clear(&self) {
        self.pending.borrow_mut().clear();
        self.flags.set(UpdateFlags::NONE);
        self.needs_update.set(false);
    }
}

impl FastenerContext for UpdateQueue {
    fn decohere_fastener(&self, fastener: Rc<dyn Fastener>) {
        self.pending.borrow_mut().push(Rc::downgrade(&fastener));
        self.require_update(UpdateFlags::RECOHERE);
    }

    fn require_update(&self, flags: UpdateFlags) {
        self.flags.set(self.flags.get() | flags);
        if !self.needs_update.get() {
            self.needs_update.set(true);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
