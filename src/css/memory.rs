//! In-memory CSS backend.
//!
//! A small stand-in for the browser's CSSOM: enough to run resource scopes
//! headless (tests, server-side style generation). It understands two rule
//! shapes:
//!
//! ```text
//! selector { name: value; ... }
//! @media condition { }
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::{same_css, CssHandle, CssKind, CssResource, CssRuleProvider, StyleDeclarations};
use crate::error::{FastenerError, Result};

// =============================================================================
// Rule List (shared by sheets and media rules)
// =============================================================================

#[derive(Default)]
struct RuleList {
    rules: RefCell<Vec<CssHandle>>,
}

impl RuleList {
    fn insert(&self, text: &str) -> Result<CssHandle> {
        let rule = parse_rule(text)?;
        self.rules.borrow_mut().push(rule.clone());
        Ok(rule)
    }

    fn get(&self, index: usize) -> Option<CssHandle> {
        self.rules.borrow().get(index).cloned()
    }

    fn len(&self) -> usize {
        self.rules.borrow().len()
    }

    fn remove(&self, rule: &CssHandle) -> bool {
        let mut rules = self.rules.borrow_mut();
        let before = rules.len();
        rules.retain(|r| !same_css(r, rule));
        rules.len() != before
    }

    fn text(&self) -> String {
        self.rules
            .borrow()
            .iter()
            .map(|rule| rule.css_text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// =============================================================================
// Style Sheet
// =============================================================================

/// A stylesheet holding top-level rules.
#[derive(Default)]
pub struct MemoryStyleSheet {
    rules: RuleList,
}

impl MemoryStyleSheet {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }
}

impl fmt::Debug for MemoryStyleSheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStyleSheet")
            .field("rules", &self.rules.len())
            .finish()
    }
}

impl CssResource for MemoryStyleSheet {
    fn kind(&self) -> CssKind {
        CssKind::StyleSheet
    }

    fn css_text(&self) -> String {
        self.rules.text()
    }

    fn rules(&self) -> Option<&dyn CssRuleProvider> {
        Some(self)
    }
}

impl CssRuleProvider for MemoryStyleSheet {
    fn insert_rule(&self, text: &str) -> Result<CssHandle> {
        self.rules.insert(text)
    }

    fn get_rule(&self, index: usize) -> Option<CssHandle> {
        self.rules.get(index)
    }

    fn rule_count(&self) -> usize {
        self.rules.len()
    }

    fn remove_rule(&self, rule: &CssHandle) -> bool {
        self.rules.remove(rule)
    }
}

// =============================================================================
// Media Rule
// =============================================================================

/// An `@media` grouping rule.
pub struct MemoryMediaRule {
    condition: String,
    rules: RuleList,
}

impl MemoryMediaRule {
    pub fn new(condition: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            condition: condition.into(),
            rules: RuleList::default(),
        })
    }

    pub fn condition(&self) -> &str {
        &self.condition
    }
}

impl fmt::Debug for MemoryMediaRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryMediaRule")
            .field("condition", &self.condition)
            .field("rules", &self.rules.len())
            .finish()
    }
}

impl CssResource for MemoryMediaRule {
    fn kind(&self) -> CssKind {
        CssKind::MediaRule
    }

    fn css_text(&self) -> String {
        let body = self.rules.text();
        if body.is_empty() {
            format!("@media {} {{}}", self.condition)
        } else {
            format!("@media {} {{\n{}\n}}", self.condition, body)
        }
    }

    fn rules(&self) -> Option<&dyn CssRuleProvider> {
        Some(self)
    }
}

impl CssRuleProvider for MemoryMediaRule {
    fn insert_rule(&self, text: &str) -> Result<CssHandle> {
        self.rules.insert(text)
    }

    fn get_rule(&self, index: usize) -> Option<CssHandle> {
        self.rules.get(index)
    }

    fn rule_count(&self) -> usize {
        self.rules.len()
    }

    fn remove_rule(&self, rule: &CssHandle) -> bool {
        self.rules.remove(rule)
    }
}

// =============================================================================
// Style Rule
// =============================================================================

/// A style rule: selector plus ordered declarations.
pub struct MemoryStyleRule {
    selector: String,
    declarations: RefCell<Vec<(String, String)>>,
}

impl MemoryStyleRule {
    pub fn new(selector: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            selector: selector.into(),
            declarations: RefCell::new(Vec::new()),
        })
    }
}

impl fmt::Debug for MemoryStyleRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStyleRule")
            .field("selector", &self.selector)
            .field("declarations", &self.declarations.borrow())
            .finish()
    }
}

impl CssResource for MemoryStyleRule {
    fn kind(&self) -> CssKind {
        CssKind::StyleRule
    }

    fn css_text(&self) -> String {
        let declarations = self.declarations.borrow();
        if declarations.is_empty() {
            return format!("{} {{}}", self.selector);
        }
        let body = declarations
            .iter()
            .map(|(name, value)| format!("{name}: {value};"))
            .collect::<Vec<_>>()
            .join(" ");
        format!("{} {{ {} }}", self.selector, body)
    }

    fn style(&self) -> Option<&dyn StyleDeclarations> {
        Some(self)
    }
}

impl StyleDeclarations for MemoryStyleRule {
    fn selector(&self) -> String {
        self.selector.clone()
    }

    fn get_property(&self, name: &str) -> Option<String> {
        self.declarations
            .borrow()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    fn set_property(&self, name: &str, value: &str) {
        let mut declarations = self.declarations.borrow_mut();
        match declarations.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => declarations.push((name.to_string(), value.to_string())),
        }
    }

    fn remove_property(&self, name: &str) {
        self.declarations.borrow_mut().retain(|(n, _)| n != name);
    }
}

// =============================================================================
// Parsing
// =============================================================================

fn parse_error(text: &str, reason: &str) -> FastenerError {
    FastenerError::Parse {
        input: text.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse a single rule.
///
/// Declarations inside an `@media` body are not parsed; nested rules are
/// inserted through the media rule's own provider.
pub fn parse_rule(text: &str) -> Result<CssHandle> {
    let trimmed = text.trim();
    let open = trimmed
        .find('{')
        .ok_or_else(|| parse_error(text, "missing `{`"))?;
    let close = trimmed
        .rfind('}')
        .filter(|close| *close > open)
        .ok_or_else(|| parse_error(text, "missing `}`"))?;
    let head = trimmed[..open].trim();
    let body = trimmed[open + 1..close].trim();

    if let Some(condition) = head.strip_prefix("@media") {
        let condition = condition.trim();
        if condition.is_empty() {
            return Err(parse_error(text, "empty media condition"));
        }
        let rule: CssHandle = MemoryMediaRule::new(condition);
        return Ok(rule);
    }
    if head.is_empty() {
        return Err(parse_error(text, "empty selector"));
    }
    if head.starts_with('@') {
        return Err(parse_error(text, "unsupported at-rule"));
    }

    let rule = MemoryStyleRule::new(head);
    for declaration in body.split(';') {
        let declaration = declaration.trim();
        if declaration.is_empty() {
            continue;
        }
        let (name, value) = declaration
            .split_once(':')
            .ok_or_else(|| parse_error(text, "declaration without `:`"))?;
        rule.set_property(name.trim(), value.trim());
    }
    let rule: CssHandle = rule;
    Ok(rule)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_style_rule() {
        let rule = parse_rule(".button { color: red; padding: 4px }").unwrap();
        assert_eq!(rule.kind(), CssKind::StyleRule);
        let style = rule.style().unwrap();
        assert_eq!(style.selector(), ".button");
        assert_eq!(style.get_property("color").as_deref(), Some("red"));
        assert_eq!(style.get_property("padding").as_deref(), Some("4px"));
        assert_eq!(rule.css_text(), ".button { color: red; padding: 4px; }");
    }

    #[test]
    fn test_parse_media_rule() {
        let rule = parse_rule("@media (min-width: 600px) {}").unwrap();
        assert_eq!(rule.kind(), CssKind::MediaRule);
        assert!(rule.rules().is_some());
        assert!(rule.style().is_none());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_rule(".button").is_err());
        assert!(parse_rule("{ color: red }").is_err());
        assert!(parse_rule("@media {}").is_err());
        assert!(parse_rule("@font-face { }").is_err());
        assert!(parse_rule(".a { color red }").is_err());
        assert!(parse_rule(".a } {").is_err());
    }

    #[test]
    fn test_sheet_insert_get_remove() {
        let sheet = MemoryStyleSheet::new();
        let a = sheet.insert_rule(".a {}").unwrap();
        let b = sheet.insert_rule("@media print {}").unwrap();
        assert_eq!(sheet.rule_count(), 2);
        assert!(same_css(&sheet.get_rule(0).unwrap(), &a));
        assert!(sheet.get_rule(2).is_none());

        assert!(sheet.remove_rule(&a));
        assert!(!sheet.remove_rule(&a));
        assert_eq!(sheet.rule_count(), 1);
        assert!(same_css(&sheet.get_rule(0).unwrap(), &b));
    }

    #[test]
    fn test_declarations_update_in_place() {
        let rule = MemoryStyleRule::new(".a");
        rule.set_property("color", "red");
        rule.set_property("margin", "0");
        rule.set_property("color", "blue");
        assert_eq!(rule.css_text(), ".a { color: blue; margin: 0; }");
        rule.remove_property("color");
        assert_eq!(rule.get_property("color"), None);
    }

    #[test]
    fn test_nested_media_text() {
        let sheet = MemoryStyleSheet::new();
        let media = sheet.insert_rule("@media print {}").unwrap();
        media.rules().unwrap().insert_rule(".a { color: black }").unwrap();
        assert_eq!(
            sheet.css_text(),
            "@media print {\n.a { color: black; }\n}"
        );
    }
}
