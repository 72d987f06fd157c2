//! Frequency-based atomic class extraction.
//!
//! A declaration used under at least [`ATOMIC_THRESHOLD`] distinct
//! selectors is factored into a single-declaration class. Below the
//! threshold one shared class costs more than the inlined copies.
//!
//! ```text
//! .a { padding: 16px; color: red }        ._3f9a1c2e { padding: 16px }
//! .b { padding: 16px; margin: 0 }    →    composed: .a → [_3f9a1c2e]
//! .c { padding: 16px }                              .b → [_3f9a1c2e] ...
//! ```

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ast::{CssNode, Declaration, DeclarationKey};
use crate::utils;

/// Minimum number of distinct selectors sharing a declaration.
pub const ATOMIC_THRESHOLD: usize = 3;

/// Hex digits of the content hash used in a class name.
const HASH_NAME_LEN: usize = 8;

/// How atomic classes are named.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AtomicNaming {
    /// `_` + SHA-256 prefix of `property:value`. Stable across builds.
    #[default]
    ContentHash,
    /// `_0`, `_1`, … in first-appearance order. Only stable for a fixed input.
    Sequential,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AtomicOptions {
    pub naming: AtomicNaming,
    /// Remove atomized declarations from the original rules.
    pub rewrite: bool,
}

/// Output of [`atomic_extract`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomicOutput {
    /// One single-declaration rule per minted class.
    pub atomic: Vec<CssNode>,
    /// Original selector → atomic classes covering its declarations.
    pub composed: IndexMap<String, Vec<String>>,
    /// Original nodes with atomized declarations removed. Only set when
    /// [`AtomicOptions::rewrite`] is requested; rules left empty are dropped.
    pub rewritten: Option<Vec<CssNode>>,
}

impl AtomicOutput {
    /// Atomic rules followed by the rewritten nodes, or by `original`
    /// when no rewrite was requested.
    pub fn into_nodes(self, original: Vec<CssNode>) -> Vec<CssNode> {
        let mut nodes = self.atomic;
        nodes.extend(self.rewritten.unwrap_or(original));
        nodes
    }
}

/// Factor frequently repeated declarations into atomic classes.
///
/// Only top-level rules are considered; rules nested in at-rules keep
/// their declarations since an atomic class cannot carry the guard.
pub fn atomic_extract(nodes: &[CssNode], options: &AtomicOptions) -> AtomicOutput {
    // Pass 1: declaration → distinct selectors using it.
    let mut users: IndexMap<DeclarationKey, IndexSet<&str>> = IndexMap::new();
    for node in nodes {
        if let CssNode::Rule { selector, children } = node {
            for decl in children {
                users.entry(decl.key()).or_default().insert(selector.as_str());
            }
        }
    }

    // Pass 2: mint a class per declaration at or above the threshold.
    let mut namer = Namer::new(options.naming);
    let minted: IndexMap<DeclarationKey, String> = users
        .iter()
        .filter(|(_, selectors)| selectors.len() >= ATOMIC_THRESHOLD)
        .map(|(key, _)| (key.clone(), namer.mint(key)))
        .collect();

    // Pass 3: one rule per class.
    let atomic = minted
        .iter()
        .map(|(key, class)| {
            CssNode::rule(
                format!(".{class}"),
                vec![Declaration::new(&key.property, &key.value)],
            )
        })
        .collect();

    // Pass 4: composition bookkeeping.
    let mut composed: IndexMap<String, Vec<String>> = IndexMap::new();
    for node in nodes {
        if let CssNode::Rule { selector, children } = node {
            for decl in children {
                if let Some(class) = minted.get(&decl.key()) {
                    let classes = composed.entry(selector.clone()).or_default();
                    if !classes.contains(class) {
                        classes.push(class.clone());
                    }
                }
            }
        }
    }

    let rewritten = options.rewrite.then(|| rewrite(nodes, &minted));

    debug!(
        candidates = users.len(),
        minted = minted.len(),
        "atomic extraction complete"
    );

    AtomicOutput {
        atomic,
        composed,
        rewritten,
    }
}

fn rewrite(nodes: &[CssNode], minted: &IndexMap<DeclarationKey, String>) -> Vec<CssNode> {
    nodes
        .iter()
        .filter_map(|node| match node {
            CssNode::Rule { selector, children } => {
                let remaining: Vec<Declaration> = children
                    .iter()
                    .filter(|d| !minted.contains_key(&d.key()))
                    .cloned()
                    .collect();
                (!remaining.is_empty()).then(|| CssNode::rule(selector.clone(), remaining))
            }
            other => Some(other.clone()),
        })
        .collect()
}

/// Hands out class names for one extraction run.
struct Namer {
    naming: AtomicNaming,
    next: usize,
    taken: HashMap<String, DeclarationKey>,
}

impl Namer {
    fn new(naming: AtomicNaming) -> Self {
        Self {
            naming,
            next: 0,
            taken: HashMap::new(),
        }
    }

    fn mint(&mut self, key: &DeclarationKey) -> String {
        match self.naming {
            AtomicNaming::Sequential => {
                let name = format!("_{}", self.next);
                self.next += 1;
                name
            }
            AtomicNaming::ContentHash => {
                let hash = utils::content_hash(&key.to_string());
                // Lengthen the prefix until it no longer collides.
                let mut len = HASH_NAME_LEN;
                loop {
                    let name = format!("_{}", &hash[..len.min(hash.len())]);
                    let collides = matches!(self.taken.get(&name), Some(owner) if owner != key);
                    if collides && len < hash.len() {
                        len += 2;
                        continue;
                    }
                    self.taken.insert(name.clone(), key.clone());
                    return name;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    const SEQUENTIAL: AtomicOptions = AtomicOptions {
        naming: AtomicNaming::Sequential,
        rewrite: false,
    };

    #[test]
    fn test_three_users_mint_a_class() {
        let nodes = parse(
            ".a { padding: 16px; color: red } .b { padding: 16px; margin: 0 } .c { padding: 16px; border: 0 }",
        );
        let out = atomic_extract(&nodes, &SEQUENTIAL);
        assert_eq!(
            out.atomic,
            vec![CssNode::rule("._0", vec![Declaration::new("padding", "16px")])]
        );
        for selector in [".a", ".b", ".c"] {
            assert_eq!(out.composed[selector], vec!["_0".to_string()]);
        }
        assert!(out.rewritten.is_none());
    }

    #[test]
    fn test_two_users_stay_inline() {
        let nodes = parse(".a { padding: 16px } .b { padding: 16px } .c { margin: 0 }");
        let out = atomic_extract(&nodes, &SEQUENTIAL);
        assert!(out.atomic.is_empty());
        assert!(out.composed.is_empty());
    }

    #[test]
    fn test_repeated_selector_counts_once() {
        let nodes = parse(".a { x: 1 } .a { x: 1 } .b { x: 1 }");
        assert!(atomic_extract(&nodes, &SEQUENTIAL).atomic.is_empty());
    }

    #[test]
    fn test_rules_inside_at_rules_ignored() {
        let nodes = parse(".a { x: 1 } .b { x: 1 } @media print { .c { x: 1 } }");
        assert!(atomic_extract(&nodes, &SEQUENTIAL).atomic.is_empty());
    }

    #[test]
    fn test_sequential_names_follow_first_appearance() {
        let nodes = parse(".a { m: 0; p: 1 } .b { p: 1; m: 0 } .c { p: 1; m: 0 }");
        let out = atomic_extract(&nodes, &SEQUENTIAL);
        assert_eq!(out.atomic[0].selector(), Some("._0"));
        assert_eq!(
            out.atomic[0],
            CssNode::rule("._0", vec![Declaration::new("m", "0")])
        );
        assert_eq!(out.composed[".b"], vec!["_1".to_string(), "_0".to_string()]);
    }

    #[test]
    fn test_content_hash_names_are_input_independent() {
        let options = AtomicOptions::default();
        let small = parse(".a { padding: 16px } .b { padding: 16px } .c { padding: 16px }");
        let large = parse(
            ".z { margin: 0 } .y { margin: 0 } .x { margin: 0 } .a { padding: 16px } .b { padding: 16px } .c { padding: 16px }",
        );
        let name_small = atomic_extract(&small, &options).composed[".a"][0].clone();
        let name_large = atomic_extract(&large, &options).composed[".a"][0].clone();
        assert_eq!(name_small, name_large);
        assert_eq!(name_small.len(), 1 + HASH_NAME_LEN);
        assert!(name_small.starts_with('_'));
    }

    #[test]
    fn test_rewrite_removes_atomized_declarations() {
        let nodes = parse(".a { p: 1; c: red } .b { p: 1 } .c { p: 1 } @media print { .d { p: 1 } }");
        let out = atomic_extract(
            &nodes,
            &AtomicOptions {
                naming: AtomicNaming::Sequential,
                rewrite: true,
            },
        );
        let rewritten = out.rewritten.clone().unwrap();
        assert_eq!(rewritten.len(), 2);
        assert_eq!(rewritten[0], CssNode::rule(".a", vec![Declaration::new("c", "red")]));
        assert!(matches!(rewritten[1], CssNode::AtRule { .. }));

        let nodes_out = out.into_nodes(nodes);
        assert_eq!(nodes_out[0].selector(), Some("._0"));
        assert_eq!(nodes_out.len(), 3);
    }

    #[test]
    fn test_namer_extends_colliding_prefix() {
        let mut namer = Namer::new(AtomicNaming::ContentHash);
        let a = DeclarationKey::new("padding", "16px");
        let b = DeclarationKey::new("margin", "0");
        let name_a = namer.mint(&a);
        // Force a collision by claiming b's short name for a different key.
        let hash_b = utils::content_hash(&b.to_string());
        namer
            .taken
            .insert(format!("_{}", &hash_b[..HASH_NAME_LEN]), a.clone());
        let name_b = namer.mint(&b);
        assert_eq!(name_b, format!("_{}", &hash_b[..HASH_NAME_LEN + 2]));
        assert_ne!(name_a, name_b);
    }
}
