//! Identifier normalization.
//!
//! Part numbers, model numbers, and order IDs arrive in many shapes
//! (`PS-8694830`, `ps 8694830`, `PS8694830`). Every comparison across user
//! text, session context, and indexed metadata goes through [`normalize`]
//! first so formatting differences never matter.

/// Canonicalize an identifier for comparison.
///
/// Lower-cases the input and removes hyphens and spaces. Pure and total:
/// empty input yields an empty string, and the function is idempotent.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| *c != '-' && *c != ' ')
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// [`normalize`] lifted over an optional identifier.
pub fn normalize_opt(text: Option<&str>) -> Option<String> {
    text.map(normalize)
}
