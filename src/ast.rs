//! CSS node model.
//!
//! Selectors and at-rule params are opaque strings. The framework only
//! emits a narrow subset of CSS, so a structured selector AST would buy
//! nothing the passes need.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single `property: value` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Declaration {
    pub property: String,
    pub value: String,
}

impl Declaration {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
        }
    }

    /// The deduplication / atomic-extraction key of this declaration.
    pub fn key(&self) -> DeclarationKey {
        DeclarationKey::new(&self.property, &self.value)
    }

    /// Whether this declares a custom property (`--name`).
    pub fn is_custom_property(&self) -> bool {
        self.property.starts_with("--")
    }
}

/// `(property, value)` after normalization: trimmed, no trailing `;`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclarationKey {
    pub property: String,
    pub value: String,
}

impl DeclarationKey {
    pub fn new(property: &str, value: &str) -> Self {
        Self {
            property: normalize(property),
            value: normalize(value),
        }
    }
}

impl fmt::Display for DeclarationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.property, self.value)
    }
}

fn normalize(s: &str) -> String {
    s.trim().trim_end_matches(';').trim_end().to_string()
}

/// A node of a parsed stylesheet.
///
/// `Rule` children are declarations only, so a rule can never contain an
/// at-rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CssNode {
    Declaration(Declaration),
    Rule {
        selector: String,
        children: Vec<Declaration>,
    },
    #[serde(rename = "atrule")]
    AtRule {
        name: String,
        params: String,
        children: Vec<CssNode>,
    },
}

impl CssNode {
    pub fn rule(selector: impl Into<String>, children: Vec<Declaration>) -> Self {
        CssNode::Rule {
            selector: selector.into(),
            children,
        }
    }

    pub fn at_rule(name: impl Into<String>, params: impl Into<String>, children: Vec<CssNode>) -> Self {
        CssNode::AtRule {
            name: name.into(),
            params: params.into(),
            children,
        }
    }

    pub fn is_rule(&self) -> bool {
        matches!(self, CssNode::Rule { .. })
    }

    /// Selector of a `Rule`, `None` for other variants.
    pub fn selector(&self) -> Option<&str> {
        match self {
            CssNode::Rule { selector, .. } => Some(selector),
            _ => None,
        }
    }

    /// `@font-face` and `@keyframes` (vendor prefixes included) define
    /// resources referenced by name rather than by selector.
    pub fn is_resource_at_rule(&self) -> bool {
        match self {
            CssNode::AtRule { name, .. } => {
                let bare = strip_vendor_prefix(name);
                bare.eq_ignore_ascii_case("font-face") || bare.eq_ignore_ascii_case("keyframes")
            }
            _ => false,
        }
    }
}

fn strip_vendor_prefix(name: &str) -> &str {
    if let Some(rest) = name.strip_prefix('-') {
        if let Some(idx) = rest.find('-') {
            return &rest[idx + 1..];
        }
    }
    name
}

/// Number of top-level `Rule` nodes.
pub fn count_rules(nodes: &[CssNode]) -> usize {
    nodes.iter().filter(|n| n.is_rule()).count()
}
