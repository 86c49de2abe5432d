//! CSS Scope - A fastener whose payload is an external CSS handle.
//!
//! Each scope is either detached (no handle) or attached (one handle). Every
//! transition runs the hook sequence in a fixed order:
//!
//! ```text
//! attach:  will_attach_css ─▶ (store) ─▶ on_attach_css ─▶ init_css ─▶ did_attach_css
//! detach:  will_detach_css ─▶ (clear) ─▶ on_detach_css ─▶ deinit_css ─▶ did_detach_css
//! ```
//!
//! Swapping one handle for another is always detach-then-attach inside one
//! call, and outlets are decohered once after the swap.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::{same_css_opt, CssHandle, CssInlet, CssKind};
use crate::error::{FastenerError, Result};
use crate::fastener::{graph, Fastener, FastenerCore, InletRef};
use crate::theme::Theme;
use crate::types::{Affinity, FastenerConfig, FastenerFlags, Timestamp};

// =============================================================================
// Lifecycle Hooks
// =============================================================================

/// Per-node lifecycle hooks. Every method defaults to a no-op.
pub trait CssHooks: 'static {
    fn will_attach_css(&self, _css: &CssHandle) {}
    fn on_attach_css(&self, _css: &CssHandle) {}
    fn init_css(&self, _css: &CssHandle) {}
    fn did_attach_css(&self, _css: &CssHandle) {}

    fn will_detach_css(&self, _css: &CssHandle) {}
    fn on_detach_css(&self, _css: &CssHandle) {}
    fn deinit_css(&self, _css: &CssHandle) {}
    fn did_detach_css(&self, _css: &CssHandle) {}

    /// Called by [`apply_theme`](crate::fastener::apply_theme) while attached.
    fn theme_css(&self, _css: &CssHandle, _theme: &Theme) {}
}

impl CssHooks for () {}

/// Which inlet handles a pass-through scope accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CssMatch {
    #[default]
    Any,
    Kind(CssKind),
    /// Stylesheets and media rules.
    Grouping,
}

impl CssMatch {
    pub fn matches(self, css: &CssHandle) -> bool {
        match self {
            CssMatch::Any => true,
            CssMatch::Kind(kind) => css.kind() == kind,
            CssMatch::Grouping => css.kind().is_grouping(),
        }
    }
}

// =============================================================================
// Binding (shared by scopes and rules)
// =============================================================================

/// Handle slot, inlet slot, and hooks of one CSS fastener.
pub(crate) struct CssBinding<H: CssHooks> {
    css: RefCell<Option<CssHandle>>,
    pub(crate) inlet: InletRef<dyn CssInlet>,
    hooks: H,
}

impl<H: CssHooks> CssBinding<H> {
    pub(crate) fn new(hooks: H) -> Self {
        Self {
            css: RefCell::new(None),
            inlet: InletRef::new(),
            hooks,
        }
    }

    pub(crate) fn css(&self) -> Option<CssHandle> {
        self.css.borrow().clone()
    }

    pub(crate) fn hooks(&self) -> &H {
        &self.hooks
    }

    pub(crate) fn get_css(&self, core: &FastenerCore) -> Result<CssHandle> {
        self.css().ok_or_else(|| FastenerError::missing(core.name()))
    }

    pub(crate) fn get_inlet_css(&self, core: &FastenerCore) -> Result<CssHandle> {
        self.inlet
            .get()
            .and_then(|inlet| inlet.exported_css())
            .ok_or_else(|| FastenerError::missing(core.name()))
    }

    /// Insert a rule into the attached grouping handle.
    pub(crate) fn insert_rule(&self, core: &FastenerCore, text: &str) -> Result<CssHandle> {
        let css = self.get_css(core)?;
        let rules = css
            .rules()
            .ok_or_else(|| FastenerError::capability(core.name(), "rule provider"))?;
        rules.insert_rule(text)
    }

    /// Swap the handle for `next`. Returns whether anything changed.
    pub(crate) fn replace(&self, owner: &dyn Fastener, next: Option<CssHandle>) -> bool {
        let current = self.css();
        if same_css_opt(current.as_ref(), next.as_ref()) {
            return false;
        }
        let core = owner.core();
        if let Some(old) = current {
            self.detach(core, &old);
        }
        if let Some(new) = next {
            self.attach(core, &new);
        }
        owner.decohere();
        true
    }

    fn attach(&self, core: &FastenerCore, css: &CssHandle) {
        tracing::debug!(fastener = %core.name(), kind = ?css.kind(), "attach css");
        self.hooks.will_attach_css(css);
        *self.css.borrow_mut() = Some(css.clone());
        self.hooks.on_attach_css(css);
        self.hooks.init_css(css);
        self.hooks.did_attach_css(css);
    }

    fn detach(&self, core: &FastenerCore, css: &CssHandle) {
        tracing::debug!(fastener = %core.name(), kind = ?css.kind(), "detach css");
        self.hooks.will_detach_css(css);
        *self.css.borrow_mut() = None;
        self.hooks.on_detach_css(css);
        self.hooks.deinit_css(css);
        self.hooks.did_detach_css(css);
    }
}

// =============================================================================
// CSS Scope
// =============================================================================

/// Pass-through resource scope: takes the inlet's handle when it matches.
pub struct CssScope<H: CssHooks = ()> {
    core: FastenerCore,
    binding: CssBinding<H>,
    matcher: CssMatch,
}

impl CssScope<()> {
    pub fn new(name: impl Into<String>, matcher: CssMatch) -> Rc<Self> {
        Self::with_hooks(name, matcher, (), FastenerConfig::default())
    }
}

impl<H: CssHooks> CssScope<H> {
    pub fn with_hooks(
        name: impl Into<String>,
        matcher: CssMatch,
        hooks: H,
        config: FastenerConfig,
    ) -> Rc<Self> {
        let name = name.into();
        Rc::new_cyclic(|this: &Weak<Self>| {
            let this: Weak<dyn Fastener> = this.clone();
            Self {
                core: FastenerCore::new(name, config, this),
                binding: CssBinding::new(hooks),
                matcher,
            }
        })
    }

    /// Attached handle, if any. Never fails.
    pub fn css(&self) -> Option<CssHandle> {
        self.binding.css()
    }

    /// Attached handle, or an error naming this scope.
    pub fn get_css(&self) -> Result<CssHandle> {
        self.binding.get_css(&self.core)
    }

    /// The inlet's exported handle, or an error naming this scope.
    pub fn get_inlet_css(&self) -> Result<CssHandle> {
        self.binding.get_inlet_css(&self.core)
    }

    pub fn hooks(&self) -> &H {
        self.binding.hooks()
    }

    pub fn matcher(&self) -> CssMatch {
        self.matcher
    }

    /// Replace the handle without touching affinity or derived mode.
    pub fn set_css(&self, css: Option<CssHandle>) -> bool {
        self.binding.replace(self, css)
    }

    /// Attach `css` as this scope's own handle, taking precedence over the inlet.
    pub fn attach_css(&self, css: CssHandle) {
        self.core.set_affinity(Affinity::Intrinsic);
        self.set_derived(false);
        self.binding.replace(self, Some(css));
    }

    /// Detach the current handle, returning it.
    pub fn detach_css(&self) -> Option<CssHandle> {
        self.set_derived(false);
        let old = self.css();
        self.binding.replace(self, None);
        old
    }

    /// Insert a rule into the attached stylesheet or media rule.
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
}

impl<H: CssHooks> Fastener for CssScope<H> {
    fn core(&self) -> &FastenerCore {
        &self.core
    }

    fn recohere(&self, t: Timestamp) {
        if !self.core.is_derived() {
            self.core.set_coherent(t);
            return;
        }
        let Some(inlet) = self.binding.inlet.get() else {
            self.core.remove_flags(FastenerFlags::DERIVED);
            self.core.set_coherent(t);
            return;
        };
        graph::pull_inlet(inlet.as_ref(), t);
        let next = inlet.exported_css().filter(|css| {
            let accepted = self.matcher.matches(css);
            if !accepted {
                tracing::warn!(
                    fastener = %self.core.name(),
                    kind = ?css.kind(),
                    matcher = ?self.matcher,
                    "inlet css has the wrong kind"
                );
            }
            accepted
        });
        self.core.set_coherent(t);
        self.binding.replace(self, next);
    }

    fn has_inlet(&self) -> bool {
        self.binding.inlet.is_bound()
    }

    fn unbind_inlet(&self) {
        let derived = self.core.is_derived();
        graph::unbind_inlet(self, &self.binding.inlet);
        if derived {
            self.binding.replace(self, None);
        }
    }

    fn theme_fastener(&self, theme: &Theme) {
        if let Some(css) = self.css() {
            self.binding.hooks().theme_css(&css, theme);
        }
    }
}

impl<H: CssHooks> CssInlet for CssScope<H> {
    fn exported_css(&self) -> Option<CssHandle> {
        self.css()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::{same_css, MemoryStyleRule, MemoryStyleSheet};
    use crate::fastener::{apply_theme, UpdateQueue};
    use crate::theme;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        log: RefCell<Vec<&'static str>>,
        themed: RefCell<Vec<String>>,
    }

    impl Recorder {
        fn take(&self) -> Vec<&'static str> {
            std::mem::take(&mut *self.log.borrow_mut())
        }
    }

    impl CssHooks for Recorder {
        fn will_attach_css(&self, _: &CssHandle) {
            self.log.borrow_mut().push("will_attach");
        }
        fn on_attach_css(&self, _: &CssHandle) {
            self.log.borrow_mut().push("on_attach");
        }
        fn init_css(&self, _: &CssHandle) {
            self.log.borrow_mut().push("init");
        }
        fn did_attach_css(&self, _: &CssHandle) {
            self.log.borrow_mut().push("did_attach");
        }
        fn will_detach_css(&self, _: &CssHandle) {
            self.log.borrow_mut().push("will_detach");
        }
        fn on_detach_css(&self, _: &CssHandle) {
            self.log.borrow_mut().push("on_detach");
        }
        fn deinit_css(&self, _: &CssHandle) {
            self.log.borrow_mut().push("deinit");
        }
        fn did_detach_css(&self, _: &CssHandle) {
            self.log.borrow_mut().push("did_detach");
        }
        fn theme_css(&self, _: &CssHandle, theme: &Theme) {
            self.themed.borrow_mut().push(theme.name.clone());
        }
    }

    fn recorded(name: &str, matcher: CssMatch) -> Rc<CssScope<Recorder>> {
        CssScope::with_hooks(name, matcher, Recorder::default(), FastenerConfig::default())
    }

    fn sheet() -> CssHandle {
        MemoryStyleSheet::new()
    }

    #[test]
    fn test_attach_runs_hooks_in_order() {
        let scope = recorded("sheet", CssMatch::Any);
        scope.attach_css(sheet());
        assert_eq!(
            scope.hooks().take(),
            vec!["will_attach", "on_attach", "init", "did_attach"]
        );
        assert_eq!(scope.core().affinity(), Affinity::Intrinsic);

        scope.detach_css();
        assert_eq!(
            scope.hooks().take(),
            vec!["will_detach", "on_detach", "deinit", "did_detach"]
        );
        assert!(scope.css().is_none());
    }

    #[test]
    fn test_swap_is_detach_then_attach() {
        let scope = recorded("sheet", CssMatch::Any);
        let first = sheet();
        scope.attach_css(first.clone());
        scope.hooks().take();

        // Same handle: nothing happens
        assert!(!scope.set_css(Some(first)));
        assert!(scope.hooks().take().is_empty());

        let second = sheet();
        assert!(scope.set_css(Some(second.clone())));
        assert_eq!(
            scope.hooks().take(),
            vec![
                "will_detach",
                "on_detach",
                "deinit",
                "did_detach",
                "will_attach",
                "on_attach",
                "init",
                "did_attach"
            ]
        );
        assert!(same_css(&scope.css().unwrap(), &second));
    }

    #[test]
    fn test_pass_through_follows_inlet() {
        let queue = UpdateQueue::new();
        let root = CssScope::new("root", CssMatch::Any);
        let child = recorded("child", CssMatch::Grouping);
        child.mount(queue.context());

        let handle = sheet();
        root.attach_css(handle.clone());
        child.bind_inlet(&root);
        assert!(child.core().is_derived());
        assert!(child.css().is_none());

        queue.recohere_fasteners(1);
        assert!(same_css(&child.css().unwrap(), &handle));
        assert_eq!(child.hooks().take().len(), 4);
    }

    #[test]
    fn test_wrong_kind_detaches_instead_of_failing() {
        let queue = UpdateQueue::new();
        let root = CssScope::new("root", CssMatch::Any);
        let child = recorded("child", CssMatch::Grouping);
        child.mount(queue.context());
        root.attach_css(sheet());
        child.bind_inlet(&root);
        queue.recohere_fasteners(1);
        assert!(child.css().is_some());
        child.hooks().take();

        // A plain style rule where a grouping rule is expected
        let rule: CssHandle = MemoryStyleRule::new(".a");
        root.set_css(Some(rule));
        queue.recohere_fasteners(2);

        assert!(child.css().is_none());
        assert_eq!(
            child.hooks().take(),
            vec!["will_detach", "on_detach", "deinit", "did_detach"]
        );
    }

    #[test]
    fn test_reflexive_outlet_keeps_own_handle() {
        let root = CssScope::new("root", CssMatch::Any);
        let own = sheet();
        let child = CssScope::with_hooks(
            "child",
            CssMatch::Any,
            (),
            FastenerConfig::default().with_affinity(Affinity::Reflexive),
        );
        child.set_css(Some(own.clone()));
        child.bind_inlet(&root);
        root.attach_css(sheet());

        assert!(!child.core().is_derived());
        child.recohere(1);
        assert!(same_css(&child.css().unwrap(), &own));
    }

    #[test]
    fn test_required_accessors() {
        let scope = CssScope::new("orphan", CssMatch::Any);
        let err = scope.get_css().unwrap_err();
        assert_eq!(
            err,
            FastenerError::RequiredValueMissing {
                fastener: "orphan".to_string()
            }
        );
        assert!(scope.get_inlet_css().is_err());

        let root = CssScope::new("root", CssMatch::Any);
        root.attach_css(sheet());
        scope.bind_inlet(&root);
        assert!(scope.get_inlet_css().is_ok());
    }

    #[test]
    fn test_insert_rule_needs_grouping_handle() {
        let scope = CssScope::new("scope", CssMatch::Any);
        assert!(matches!(
            scope.insert_rule(".a {}"),
            Err(FastenerError::RequiredValueMissing { .. })
        ));

        scope.attach_css(MemoryStyleRule::new(".a"));
        assert!(matches!(
            scope.insert_rule(".b {}"),
            Err(FastenerError::MissingCapability { .. })
        ));

        scope.attach_css(sheet());
        let rule = scope.insert_rule(".b { color: red }").unwrap();
        assert_eq!(rule.kind(), CssKind::StyleRule);
        assert!(matches!(
            scope.insert_rule("nonsense"),
            Err(FastenerError::Parse { .. })
        ));
    }

    #[test]
    fn test_unbind_detaches_derived_handle() {
        let root = CssScope::new("root", CssMatch::Any);
        let child = recorded("child", CssMatch::Any);
        root.attach_css(sheet());
        child.bind_inlet(&root);
        child.recohere(1);
        assert!(child.css().is_some());

        child.unbind_inlet();
        assert!(child.css().is_none());
        assert!(!child.core().is_derived());
        assert_eq!(root.core().outlet_count(), 0);
    }

    #[test]
    fn test_apply_theme_reaches_attached_subtree() {
        let root = recorded("root", CssMatch::Any);
        let left = recorded("left", CssMatch::Any);
        let right = recorded("right", CssMatch::Any);
        root.attach_css(sheet());
        left.bind_inlet(&root);
        right.bind_inlet(&root);
        left.recohere(1);

        apply_theme(&*root, &theme::dracula());

        assert_eq!(*root.hooks().themed.borrow(), vec!["dracula".to_string()]);
        assert_eq!(*left.hooks().themed.borrow(), vec!["dracula".to_string()]);
        // Reached, but detached: no handle to theme
        assert!(right.hooks().themed.borrow().is_empty());
    }
}
