use std::sync::OnceLock;

use regex::Regex;

fn leading_glyphs() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\p{L}\p{N}]+").expect("valid regex"))
}

fn non_word_runs() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^\p{L}\p{N}]+").expect("valid regex"))
}

/// Strip the icon glyphs (and any spacing after them) that prefix room
/// labels in the app, e.g. `"🛋️ Living_Room"` -> `"Living_Room"`.
pub fn clean_label(raw: &str) -> String {
    leading_glyphs().replace(raw, "").trim().to_string()
}

/// Identity key for a room label: glyph prefix removed, underscores as
/// spaces, whitespace collapsed, lower case. Idempotent.
pub fn normalize_label(raw: &str) -> String {
    clean_label(raw)
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Topic-safe identifier derived from a label, e.g. `"living_room"`.
pub fn entity_id(label: &str) -> String {
    let normalized = normalize_label(label);
    non_word_runs()
        .replace_all(&normalized, "_")
        .trim_matches('_')
        .to_string()
}
