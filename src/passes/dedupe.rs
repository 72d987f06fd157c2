//! Structural deduplication of rules.

use std::collections::HashMap;

use tracing::debug;

use crate::ast::{CssNode, Declaration};

/// Merge rules with identical declaration blocks.
///
/// The first rule carrying a given block is kept in place; each later
/// rule with the same block appends its selector to the first one
/// (joined by `, `) and is dropped. Non-rule nodes pass through in their
/// original position.
pub fn deduplicate(nodes: &[CssNode]) -> Vec<CssNode> {
    let mut out: Vec<CssNode> = Vec::with_capacity(nodes.len());
    // structural key → index of the kept rule in `out`
    let mut first_seen: HashMap<String, usize> = HashMap::new();
    let mut merged = 0usize;

    for node in nodes {
        let CssNode::Rule { selector, children } = node else {
            out.push(node.clone());
            continue;
        };

        let key = structural_key(children);
        match first_seen.get(&key) {
            Some(&index) => {
                if let CssNode::Rule {
                    selector: kept_selector,
                    ..
                } = &mut out[index]
                {
                    kept_selector.push_str(", ");
                    kept_selector.push_str(selector);
                }
                merged += 1;
            }
            None => {
                first_seen.insert(key, out.len());
                out.push(node.clone());
            }
        }
    }

    debug!(merged, "dedupe folded duplicate rules");
    out
}

/// Serialized declarations, in order.
fn structural_key(children: &[Declaration]) -> String {
    let mut key = String::new();
    for decl in children {
        key.push_str(&decl.key().to_string());
        key.push(';');
    }
    key
}
