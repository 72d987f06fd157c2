//! Utility functions shared by the passes.
//!
//! - Selector token scanning (classes, ids, leading tags, attributes)
//! - Route slugs for chunk names
//! - Content hashing

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// Selector Tokens
// ---------------------------------------------------------------------------

static CLASS_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.([\w-]+)").unwrap());
static ID_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"#([\w-]+)").unwrap());
static LEADING_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([a-zA-Z][\w-]*)").unwrap());
static DATA_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\s*data-([\w-]+)").unwrap());

/// Comma-separated components of a selector list, trimmed.
///
/// Commas inside parentheses (`:is(.a, .b)`) do not split.
pub fn selector_components(selector: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in selector.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(selector[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(selector[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

/// Class names referenced by a selector, without the leading `.`.
pub fn class_tokens(selector: &str) -> impl Iterator<Item = &str> {
    CLASS_TOKEN
        .captures_iter(selector)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Ids referenced by a selector, without the leading `#`.
pub fn id_tokens(selector: &str) -> impl Iterator<Item = &str> {
    ID_TOKEN
        .captures_iter(selector)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
}

/// The bare tag name a selector component starts with, lowercased.
pub fn leading_tag(component: &str) -> Option<String> {
    LEADING_TAG
        .captures(component.trim_start())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
}

/// `data-*` attribute names referenced by a selector, prefix stripped.
pub fn data_attribute_tokens(selector: &str) -> impl Iterator<Item = &str> {
    DATA_ATTRIBUTE
        .captures_iter(selector)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Selectors that carry resets and theme variables: `:root`, `*`,
/// `html`, `body`.
pub fn is_global_component(component: &str) -> bool {
    let component = component.trim_start();
    if component.starts_with(":root") || component.starts_with('*') {
        return true;
    }
    matches!(leading_tag(component).as_deref(), Some("html" | "body"))
}

// ---------------------------------------------------------------------------
// Route Slugs
// ---------------------------------------------------------------------------

/// Derive a chunk name from a route path.
/// `/` → `-`, leading and trailing `-` stripped, empty → `index`.
pub fn route_slug(route: &str) -> String {
    let slug = route.replace('/', "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "index".to_string()
    } else {
        slug.to_string()
    }
}

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// Hex SHA-256 of `content`.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
