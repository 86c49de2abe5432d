//! CSS Rule - A fastener that creates its own rule inside the inlet's handle.
//!
//! The inlet exports a grouping handle (stylesheet or media rule). On the
//! first recohere that sees a new grouping handle, the rule inserts its text
//! into it and attaches the resulting rule; when the inlet moves to another
//! handle, the old rule is removed from its source and a new one is created.
//!
//! ```text
//! CssScope(sheet) ──▶ CssRule("@media print {}") ──▶ CssRule(".a { color: black }")
//!                          │ creates                       │ creates
//!                          ▼                               ▼
//!                 sheet: @media print { ──────────────▶ .a { color: black; } }
//! ```
//!
//! A rule is also the [`FastenerContext`] of its style animators. Their
//! decoherence is queued on the rule and bubbles up as the rule itself
//! becoming decoherent; the rule's recohere then runs the nested queue with
//! the same timestamp.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::scope::{CssBinding, CssHooks};
use super::{same_css_opt, CssHandle, CssInlet};
use crate::animator::{Animator, Interpolate};
use crate::error::Result;
use crate::fastener::{graph, Fastener, FastenerContext, FastenerCore, UpdateFlags, UpdateQueue};
use crate::theme::Theme;
use crate::types::{Affinity, FastenerConfig, FastenerFlags, Length, Timestamp};

// =============================================================================
// CSS Values
// =============================================================================

/// A value a style animator can write into a declaration.
pub trait CssValue: Interpolate {
    fn to_css(&self) -> String;
}

impl CssValue for f64 {
    fn to_css(&self) -> String {
        format!("{self}")
    }
}

impl CssValue for Length {
    fn to_css(&self) -> String {
        Length::to_css(self)
    }
}

impl CssValue for String {
    fn to_css(&self) -> String {
        self.clone()
    }
}

struct StyleSlot {
    property: String,
    fastener: Rc<dyn Fastener>,
    css_value: Box<dyn Fn() -> String>,
}

struct LookSlot {
    property: String,
    look: String,
    value: Option<String>,
}

// =============================================================================
// CSS Rule
// =============================================================================

/// Create-if-absent child rule.
pub struct CssRule<H: CssHooks = ()> {
    core: FastenerCore,
    binding: CssBinding<H>,
    rule_text: String,
    /// Grouping handle the current rule was inserted into.
    source: RefCell<Option<CssHandle>>,
    queue: Rc<UpdateQueue>,
    styles: RefCell<Vec<StyleSlot>>,
    looks: RefCell<Vec<LookSlot>>,
    this: Weak<Self>,
}

impl CssRule<()> {
    pub fn new(name: impl Into<String>, rule_text: impl Into<String>) -> Rc<Self> {
        Self::with_hooks(name, rule_text, (), FastenerConfig::default())
    }
}

impl<H: CssHooks> CssRule<H> {
    pub fn with_hooks(
        name: impl Into<String>,
        rule_text: impl Into<String>,
        hooks: H,
        config: FastenerConfig,
    ) -> Rc<Self> {
        let name = name.into();
        let rule_text = rule_text.into();
        Rc::new_cyclic(|this: &Weak<Self>| {
            let fastener: Weak<dyn Fastener> = this.clone();
            Self {
                core: FastenerCore::new(name, config, fastener),
                binding: CssBinding::new(hooks),
                rule_text,
                source: RefCell::new(None),
                queue: UpdateQueue::new(),
                styles: RefCell::new(Vec::new()),
                looks: RefCell::new(Vec::new()),
                this: this.clone(),
            }
        })
    }

    pub fn rule_text(&self) -> &str {
        &self.rule_text
    }

    /// Attached rule, if any. Never fails.
    pub fn css(&self) -> Option<CssHandle> {
        self.binding.css()
    }

    pub fn get_css(&self) -> Result<CssHandle> {
        self.binding.get_css(&self.core)
    }

    pub fn get_inlet_css(&self) -> Result<CssHandle> {
        self.binding.get_inlet_css(&self.core)
    }

    /// Grouping handle the attached rule lives in, if it was created here.
    pub fn source(&self) -> Option<CssHandle> {
        self.source.borrow().clone()
    }

    pub fn hooks(&self) -> &H {
        self.binding.hooks()
    }

    /// Queue of nested style fasteners.
    pub fn nested_queue(&self) -> &Rc<UpdateQueue> {
        &self.queue
    }

    /// Attach an existing rule, taking precedence over the inlet.
    pub fn attach_css(&self, css: CssHandle) {
        self.core.set_affinity(Affinity::Intrinsic);
        self.set_derived(false);
        self.swap(Some(css), None);
    }

    /// Detach the current rule, removing it from its source if it was created here.
    pub fn detach_css(&self) -> Option<CssHandle> {
        self.set_derived(false);
        let old = self.css();
        self.swap(None, None);
        old
    }

    /// Insert a nested rule. Only grouping rules (e.g. `@media`) support this.
    pub fn insert_rule(&self, text: &str) -> Result<CssHandle> {
        self.binding.insert_rule(&self.core, text)
    }

    pub fn bind_inlet<I: CssInlet + 'static>(&self, inlet: &Rc<I>) {
        let inlet: Rc<dyn CssInlet> = inlet.clone();
        graph::bind_inlet(self, &self.binding.inlet, &inlet);
    }

    pub fn inlet(&self) -> Option<Rc<dyn CssInlet>> {
        self.binding.inlet.get()
    }

    // -------------------------------------------------------------------------
    // Styles
    // -------------------------------------------------------------------------

    /// Create an animator that drives the declaration `property`.
    ///
    /// The animator is owned by this rule and scheduled through it. Its value
    /// is written whenever it changes and again each time a rule is attached.
    pub fn style_animator<T: CssValue>(&self, property: &str, default: T) -> Rc<Animator<T>> {
        let animator = Animator::new(format!("{}.{}", self.core.name(), property), default);
        let context: Weak<dyn FastenerContext> = self.this.clone();
        animator.mount(context);

        let rule = self.this.clone();
        let name = property.to_string();
        animator.observe(move |value: &T, _old: &T| {
            if let Some(rule) = rule.upgrade() {
                rule.write_declaration(&name, &value.to_css());
            }
        });

        let reader = animator.clone();
        let fastener: Rc<dyn Fastener> = animator.clone();
        self.styles.borrow_mut().push(StyleSlot {
            property: property.to_string(),
            fastener,
            css_value: Box::new(move || reader.value().to_css()),
        });
        self.write_declaration(property, &animator.value().to_css());
        animator
    }

    /// Number of style fasteners owned by this rule.
    pub fn style_count(&self) -> usize {
        self.styles.borrow().len()
    }

    /// Map the declaration `property` to a theme look.
    pub fn set_look(&self, property: &str, look: &str) {
        let mut looks = self.looks.borrow_mut();
        match looks.iter_mut().find(|slot| slot.property == property) {
            Some(slot) => {
                slot.look = look.to_string();
                slot.value = None;
            }
            None => looks.push(LookSlot {
                property: property.to_string(),
                look: look.to_string(),
                value: None,
            }),
        }
    }

    /// Current value of a declaration on the attached rule.
    pub fn declaration(&self, property: &str) -> Option<String> {
        let css = self.css()?;
        css.style()?.get_property(property)
    }

    fn write_declaration(&self, property: &str, value: &str) {
        let Some(css) = self.css() else { return };
        if let Some(style) = css.style() {
            style.set_property(property, value);
        }
    }

    /// Rewrite every known declaration into a freshly attached rule.
    fn apply_declarations(&self) {
        let Some(css) = self.css() else { return };
        let Some(style) = css.style() else { return };
        for slot in self.styles.borrow().iter() {
            style.set_property(&slot.property, &(slot.css_value)());
        }
        for slot in self.looks.borrow().iter() {
            if let Some(value) = &slot.value {
                style.set_property(&slot.property, value);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Swap the attached rule and remove the old one from the source it was
    /// created in.
    fn swap(&self, next: Option<CssHandle>, source: Option<CssHandle>) -> bool {
        let old = self.css();
        let old_source = self.source.replace(source);
        if !self.binding.replace(self, next) {
            return false;
        }
        if let (Some(old), Some(old_source)) = (old, old_source) {
            if let Some(rules) = old_source.rules() {
                rules.remove_rule(&old);
                tracing::debug!(fastener = %self.core.name(), "removed rule from previous source");
            }
        }
        self.apply_declarations();
        true
    }

    /// Create-if-absent mapping from the inlet's handle to this rule.
    fn transform_inlet_css(&self, incoming: Option<CssHandle>) -> (Option<CssHandle>, Option<CssHandle>) {
        let Some(source) = incoming else {
            return (None, None);
        };
        let Some(rules) = source.rules() else {
            tracing::warn!(
                fastener = %self.core.name(),
                kind = ?source.kind(),
                "inlet css cannot hold rules"
            );
            return (None, None);
        };
        let current = self.css();
        if current.is_some() && same_css_opt(self.source.borrow().as_ref(), Some(&source)) {
            return (current, Some(source));
        }
        match rules.insert_rule(&self.rule_text) {
            Ok(rule) => (Some(rule), Some(source)),
            Err(err) => {
                tracing::warn!(fastener = %self.core.name(), error = %err, "rule insertion failed");
                (None, None)
            }
        }
    }
}

impl<H: CssHooks> Fastener for CssRule<H> {
    fn core(&self) -> &FastenerCore {
        &self.core
    }

    fn recohere(&self, t: Timestamp) {
        if self.core.is_derived() {
            match self.binding.inlet.get() {
                Some(inlet) => {
                    graph::pull_inlet(inlet.as_ref(), t);
                    let (next, source) = self.transform_inlet_css(inlet.exported_css());
                    self.core.set_coherent(t);
                    self.swap(next, source);
                }
                None => {
                    self.core.remove_flags(FastenerFlags::DERIVED);
                    self.core.set_coherent(t);
                }
            }
        } else {
            self.core.set_coherent(t);
        }

        self.queue.recohere_fasteners(t);
        if !self.queue.is_empty() {
            self.core.mark_decoherent();
        }
    }

    fn has_inlet(&self) -> bool {
        self.binding.inlet.is_bound()
    }

    fn unbind_inlet(&self) {
        let derived = self.core.is_derived();
        graph::unbind_inlet(self, &self.binding.inlet);
        if derived {
            self.swap(None, None);
        }
    }

    fn theme_fastener(&self, theme: &Theme) {
        for slot in self.looks.borrow_mut().iter_mut() {
            slot.value = theme.get(&slot.look).map(str::to_string);
        }
        let Some(css) = self.css() else { return };
        self.apply_declarations();
        self.binding.hooks().theme_css(&css, theme);
    }
}

impl<H: CssHooks> CssInlet for CssRule<H> {
    fn exported_css(&self) -> Option<CssHandle> {
        self.css()
    }
}

impl<H: CssHooks> FastenerContext for CssRule<H> {
    fn decohere_fastener(&self, fastener: Rc<dyn Fastener>) {
        self.queue.decohere_fastener(fastener);
        self.core.mark_decoherent();
    }

    fn require_update(&self, flags: UpdateFlags) {
        if let Some(context) = self.core.context() {
            context.require_update(flags);
        }
    }
}

impl<H: CssHooks> Drop for CssRule<H> {
    fn drop(&mut self) {
        let fasteners: Vec<Rc<dyn Fastener>> = self
            .styles
            .get_mut()
            .iter()
            .map(|slot| slot.fastener.clone())
            .collect();
        for fastener in fasteners {
            fastener.unmount();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
