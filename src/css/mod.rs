//! CSS - Resource-scope fasteners over stylesheets and rules.
//!
//! A CSS fastener's payload is a handle to an external stylesheet or rule
//! object. The handle kinds form a tree:
//!
//! ```text
//! StyleSheet ─┬─ StyleRule          .button { color: red }
//!             └─ MediaRule ─┬─ StyleRule
//!                           └─ MediaRule ...
//! ```
//!
//! Grouping handles (stylesheets and media rules) provide
//! [`CssRuleProvider`]; style rules provide [`StyleDeclarations`]. The objects
//! behind the handles belong to the host (a browser, or the in-memory backend
//! in [`memory`]); fasteners only decide when to attach and detach them.

use std::fmt;
use std::rc::Rc;

use crate::error::Result;
use crate::fastener::Fastener;

pub mod memory;
pub mod rule;
pub mod scope;

pub use memory::{MemoryMediaRule, MemoryStyleRule, MemoryStyleSheet};
pub use rule::{CssRule, CssValue};
pub use scope::{CssHooks, CssMatch, CssScope};

// =============================================================================
// Resource Kinds
// =============================================================================

/// Kind of an external CSS object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CssKind {
    StyleSheet,
    MediaRule,
    StyleRule,
}

impl CssKind {
    /// Whether handles of this kind contain rules.
    pub fn is_grouping(self) -> bool {
        matches!(self, CssKind::StyleSheet | CssKind::MediaRule)
    }
}

// =============================================================================
// Resource Capabilities
// =============================================================================

/// An external stylesheet or rule object.
pub trait CssResource: fmt::Debug {
    fn kind(&self) -> CssKind;

    /// Serialized form, as the host would print it.
    fn css_text(&self) -> String;

    /// Rule container capability, for grouping kinds.
    fn rules(&self) -> Option<&dyn CssRuleProvider> {
        None
    }

    /// Declaration block capability, for style rules.
    fn style(&self) -> Option<&dyn StyleDeclarations> {
        None
    }
}

/// Shared handle to an external CSS object.
pub type CssHandle = Rc<dyn CssResource>;

/// Identity comparison of two handles.
pub fn same_css(a: &CssHandle, b: &CssHandle) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Identity comparison of two optional handles.
pub fn same_css_opt(a: Option<&CssHandle>, b: Option<&CssHandle>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => same_css(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Rule container: the resource-provider capability.
pub trait CssRuleProvider {
    /// Parse `text` and append it as a new rule.
    fn insert_rule(&self, text: &str) -> Result<CssHandle>;

    fn get_rule(&self, index: usize) -> Option<CssHandle>;

    fn rule_count(&self) -> usize;

    /// Remove `rule` by identity. Returns whether it was present.
    fn remove_rule(&self, rule: &CssHandle) -> bool;
}

/// A style rule's declaration block.
pub trait StyleDeclarations {
    fn selector(&self) -> String;

    fn get_property(&self, name: &str) -> Option<String>;

    fn set_property(&self, name: &str, value: &str);

    fn remove_property(&self, name: &str);
}

// =============================================================================
// CSS Inlet
// =============================================================================

/// A fastener that exports a CSS handle to its outlets.
pub trait CssInlet: Fastener {
    fn exported_css(&self) -> Option<CssHandle>;
}
