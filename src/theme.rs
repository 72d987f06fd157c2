//! Theme tokens rendered as a `:root` custom-property block.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ast::{CssNode, Declaration};
use crate::stringify::stringify;

/// Design tokens grouped by category (`colors`, `spacing`, …).
///
/// Each token becomes `--<category>-<key>: <value>` on `:root`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Theme {
    pub tokens: BTreeMap<String, BTreeMap<String, String>>,
}

impl Theme {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(
        mut self,
        category: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.tokens
            .entry(category.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.values().all(BTreeMap::is_empty)
    }

    /// The `:root` rule carrying every token.
    pub fn to_node(&self) -> CssNode {
        let declarations = self
            .tokens
            .iter()
            .flat_map(|(category, entries)| {
                entries
                    .iter()
                    .map(move |(key, value)| Declaration::new(format!("--{category}-{key}"), value))
            })
            .collect();
        CssNode::rule(":root", declarations)
    }

    /// The theme block as CSS; empty string when there are no tokens.
    pub fn to_css(&self, minify: bool) -> String {
        if self.is_empty() {
            return String::new();
        }
        stringify(&[self.to_node()], minify)
    }
}
