//! Style sheet demo.
//!
//! Builds a small fastener tree over an in-memory stylesheet, animates a
//! declaration, switches themes, and prints the sheet after each step.
//!
//! Run with: cargo run --example style_sheet

use spark_fasteners::{
    apply_theme, get_preset, Affinity, CssMatch, CssResource, CssRule, CssScope, Fastener,
    Length, MemoryStyleSheet, Theme, Timing, UpdateQueue,
};

fn print_sheet(label: &str, sheet: &MemoryStyleSheet) {
    println!("--- {label} ---");
    println!("{}\n", sheet.css_text());
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .init();

    let queue = UpdateQueue::new();
    let sheet = MemoryStyleSheet::new();

    let root = CssScope::new("document", CssMatch::Any);
    root.attach_css(sheet.clone());

    let body = CssRule::new("body", "body { margin: 0 }");
    body.set_look("color", Theme::TEXT);
    body.set_look("background-color", Theme::BACKGROUND);
    body.mount(queue.context());
    body.bind_inlet(&root);

    let narrow = CssRule::new("narrow", "@media (max-width: 600px) {}");
    narrow.mount(queue.context());
    narrow.bind_inlet(&root);

    let panel = CssRule::new("panel", ".panel { display: flex }");
    let width = panel.style_animator("width", Length::px(320.0));
    panel.mount(queue.context());
    panel.bind_inlet(&narrow);

    // Creation is deferred until the first pass
    let mut t = 0;
    queue.recohere_fasteners(t);
    print_sheet("initial", &sheet);

    for name in ["light", "dracula"] {
        if let Some(theme) = get_preset(name) {
            apply_theme(&*root, &theme);
            print_sheet(&format!("theme {name}"), &sheet);
        }
    }

    width.set_state(Length::px(200.0), Some(Timing::linear(200)), Affinity::Intrinsic);
    while queue.needs_update() {
        t += 50;
        queue.recohere_fasteners(t);
        println!("t={t:>4}  width={}", width.value());
    }
    print_sheet("after tween", &sheet);
}
