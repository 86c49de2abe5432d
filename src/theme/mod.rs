//! Theme - Named looks applied across a fastener subtree.
//!
//! A theme maps *looks* (semantic names such as `"primary"` or
//! `"background"`) to CSS values. Fasteners decide which of their properties
//! take which look; [`apply_theme`](crate::fastener::apply_theme) walks the
//! outlet graph and lets every reachable fastener re-apply its looks.
//!
//! # Example
//!
//! ```
//! use spark_fasteners::theme::{get_preset, Theme};
//!
//! let dracula = get_preset("dracula").unwrap();
//! assert_eq!(dracula.get(Theme::BACKGROUND), Some("#282a36"));
//! ```

use std::collections::BTreeMap;

pub mod presets;

pub use presets::*;

/// A table of look name → CSS value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Theme {
    /// Theme name (e.g., "dracula", "nord").
    pub name: String,
    /// Theme description.
    pub description: String,
    looks: BTreeMap<String, String>,
}

impl Theme {
    pub const PRIMARY: &'static str = "primary";
    pub const SECONDARY: &'static str = "secondary";
    pub const ACCENT: &'static str = "accent";
    pub const SUCCESS: &'static str = "success";
    pub const WARNING: &'static str = "warning";
    pub const ERROR: &'static str = "error";
    pub const TEXT: &'static str = "text";
    pub const TEXT_MUTED: &'static str = "text_muted";
    pub const BACKGROUND: &'static str = "background";
    pub const SURFACE: &'static str = "surface";
    pub const BORDER: &'static str = "border";

    /// Create an empty theme.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            looks: BTreeMap::new(),
        }
    }

    /// Builder: set `look` to `value`.
    pub fn with(mut self, look: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(look, value);
        self
    }

    pub fn set(&mut self, look: impl Into<String>, value: impl Into<String>) {
        self.looks.insert(look.into(), value.into());
    }

    /// CSS value for `look`, if the theme defines it.
    pub fn get(&self, look: &str) -> Option<&str> {
        self.looks.get(look).map(String::as_str)
    }

    /// All defined looks in name order.
    pub fn looks(&self) -> impl Iterator<Item = (&str, &str)> {
        self.looks.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Overlay `other` on top of this theme.
    pub fn merged(&self, other: &Theme) -> Theme {
        let mut merged = self.clone();
        merged.name = other.name.clone();
        merged.description = other.description.clone();
        for (look, value) in other.looks() {
            merged.set(look, value);
        }
        merged
    }
}
