//! # spark-fasteners
//!
//! Reactive fastener graph for UI binding.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for host notification.
//!
//! ## Architecture
//!
//! A fastener is a single reactive cell. It may derive its value from one
//! upstream fastener (its inlet) and feeds any number of downstream fasteners
//! (its outlets). Invalidation is pushed eagerly; recomputation is pulled
//! lazily during an update pass driven by the owning component:
//!
//! ```text
//! set_value → decohere (flags only) → FastenerContext queue → recohere(t) → pull inlet chain
//! ```
//!
//! Affinity decides whether an inherited value may override a cell's own
//! value: a deliberate assignment is never clobbered by a weaker default.
//!
//! ## Modules
//!
//! - [`types`] - Core types (Affinity, FastenerFlags, FastenerConfig, Length)
//! - [`fastener`] - Fastener trait, shared core, graph walks, update queue
//! - [`property`] - Plain value cells
//! - [`animator`] - Tweening value cells
//! - [`constraint`] - Solver-backed animators
//! - [`css`] - Stylesheet/rule resource scopes and an in-memory CSS backend
//! - [`theme`] - Look tables applied across a fastener subtree
//!
//! ## Example
//!
//! ```
//! use spark_fasteners::{Affinity, Fastener, FastenerConfig, Property, UpdateQueue};
//!
//! let queue = UpdateQueue::new();
//! let parent = Property::new("font-size", 16.0_f64);
//! let child = Property::new("font-size", 12.0_f64);
//! child.mount(queue.context());
//! child.bind_inlet(&parent);
//!
//! // A user's own value is not clobbered by an inherited default
//! let pinned = Property::with_config(
//!     "font-size",
//!     20.0_f64,
//!     FastenerConfig::default().with_affinity(Affinity::Reflexive),
//! );
//! pinned.bind_inlet(&parent);
//!
//! parent.set_value(18.0, Affinity::Intrinsic);
//! queue.recohere_fasteners(1);
//! assert_eq!(child.value(), 18.0);
//! assert_eq!(pinned.value(), 20.0);
//! ```

pub mod animator;
pub mod constraint;
pub mod css;
pub mod error;
pub mod fastener;
pub mod property;
pub mod theme;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use error::{FastenerError, Result};

pub use fastener::{
    apply_theme, bind_inlet, decohere_outlet, decohere_outlets, unbind_inlet, visit_outlets,
    Fastener, FastenerContext, FastenerCore, InletRef, UpdateFlags, UpdateQueue,
};

pub use property::{Observer, Property, Transform, ValueInlet};

pub use animator::{Animator, Easing, Interpolate, Timing};

pub use constraint::{
    ConstraintAnimator, ConstraintFlags, ConstraintScope, ConstraintValue, ConstraintVariable,
};

pub use css::{
    same_css, same_css_opt, CssHandle, CssHooks, CssInlet, CssKind, CssMatch, CssResource,
    CssRule, CssRuleProvider, CssScope, CssValue, MemoryMediaRule, MemoryStyleRule, MemoryStyleSheet,
    StyleDeclarations,
};

pub use theme::{dark, dracula, get_preset, light, nord, preset_names, Theme};
