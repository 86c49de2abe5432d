//! Theme presets.
//!
//! - light (default)
//! - dark
//! - dracula
//! - nord

use super::Theme;

/// Light theme.
pub fn light() -> Theme {
    Theme::new("light", "Neutral light theme")
        .with(Theme::PRIMARY, "#2f6fde")
        .with(Theme::SECONDARY, "#7a4fd6")
        .with(Theme::ACCENT, "#e0a100")
        .with(Theme::SUCCESS, "#2e9e4f")
        .with(Theme::WARNING, "#d98a00")
        .with(Theme::ERROR, "#d23c3c")
        .with(Theme::TEXT, "#1d1f24")
        .with(Theme::TEXT_MUTED, "#6b7080")
        .with(Theme::BACKGROUND, "#ffffff")
        .with(Theme::SURFACE, "#f3f4f7")
        .with(Theme::BORDER, "#d5d8e0")
}

/// Dark theme.
pub fn dark() -> Theme {
    Theme::new("dark", "Neutral dark theme")
        .with(Theme::PRIMARY, "#5b8def")
        .with(Theme::SECONDARY, "#a07cf0")
        .with(Theme::ACCENT, "#f2c14e")
        .with(Theme::SUCCESS, "#4cc36f")
        .with(Theme::WARNING, "#f0a43a")
        .with(Theme::ERROR, "#ef5b5b")
        .with(Theme::TEXT, "#e6e8ee")
        .with(Theme::TEXT_MUTED, "#9096a6")
        .with(Theme::BACKGROUND, "#16181d")
        .with(Theme::SURFACE, "#1f2229")
        .with(Theme::BORDER, "#2e323c")
}

/// Dracula dark theme.
pub fn dracula() -> Theme {
    Theme::new("dracula", "Dracula dark theme")
        .with(Theme::PRIMARY, "#bd93f9")
        .with(Theme::SECONDARY, "#ff79c6")
        .with(Theme::ACCENT, "#f1fa8c")
        .with(Theme::SUCCESS, "#50fa7b")
        .with(Theme::WARNING, "#ffb86c")
        .with(Theme::ERROR, "#ff5555")
        .with(Theme::TEXT, "#f8f8f2")
        .with(Theme::TEXT_MUTED, "#6272a4")
        .with(Theme::BACKGROUND, "#282a36")
        .with(Theme::SURFACE, "#44475a")
        .with(Theme::BORDER, "#6272a4")
}

/// Nord arctic theme.
pub fn nord() -> Theme {
    Theme::new("nord", "Nord arctic theme")
        .with(Theme::PRIMARY, "#88c0d0")
        .with(Theme::SECONDARY, "#81a1c1")
        .with(Theme::ACCENT, "#d08770")
        .with(Theme::SUCCESS, "#a3be8c")
        .with(Theme::WARNING, "#ebcb8b")
        .with(Theme::ERROR, "#bf616a")
        .with(Theme::TEXT, "#d8dee9")
        .with(Theme::TEXT_MUTED, "#4c566a")
        .with(Theme::BACKGROUND, "#2e3440")
        .with(Theme::SURFACE, "#434c5e")
        .with(Theme::BORDER, "#4c566a")
}

/// Look up a preset by name.
pub fn get_preset(name: &str) -> Option<Theme> {
    match name {
        "light" => Some(light()),
        "dark" => Some(dark()),
        "dracula" => Some(dracula()),
        "nord" => Some(nord()),
        _ => None,
    }
}

/// Names of all presets.
pub fn preset_names() -> &'static [&'static str] {
    &["light", "dark", "dracula", "nord"]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_presets_resolve() {
        for name in preset_names() {
            let theme = get_preset(name).unwrap();
            assert_eq!(theme.name, *name);
            assert!(theme.get(Theme::BACKGROUND).is_some());
            assert!(theme.get(Theme::TEXT).is_some());
        }
        assert!(get_preset("missing").is_none());
    }
}
