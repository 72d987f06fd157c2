//! Dead-code elimination against a usage set.

use tracing::debug;

use crate::ast::CssNode;
use crate::usage::UsageInfo;
use crate::utils;

/// Drop rules whose selectors reference nothing in `usage`.
///
/// At-rules are always kept: media queries and keyframes are referenced
/// through the rules they guard, and their liveness is not analysed.
/// Surviving nodes keep their relative order.
pub fn purge(nodes: &[CssNode], usage: &UsageInfo) -> Vec<CssNode> {
    let kept: Vec<CssNode> = nodes
        .iter()
        .filter(|node| match node {
            CssNode::Rule { selector, .. } => is_selector_used(selector, usage),
            _ => true,
        })
        .cloned()
        .collect();

    debug!(
        before = nodes.len(),
        after = kept.len(),
        "purge removed {} rules",
        nodes.len() - kept.len()
    );
    kept
}

/// Whether any component of a selector list is referenced.
///
/// A component is used when one of its classes, ids, its leading tag or
/// one of its `data-*` attributes appears in `usage`, or when it is a
/// global selector (`:root`, `*`, `html`, `body`).
pub fn is_selector_used(selector: &str, usage: &UsageInfo) -> bool {
    utils::selector_components(selector)
        .into_iter()
        .any(|component| is_component_used(component, usage))
}

fn is_component_used(component: &str, usage: &UsageInfo) -> bool {
    if utils::is_global_component(component) {
        return true;
    }
    if utils::class_tokens(component).any(|c| usage.classes.contains(c)) {
        return true;
    }
    if utils::id_tokens(component).any(|id| usage.ids.contains(id)) {
        return true;
    }
    if let Some(tag) = utils::leading_tag(component) {
        if usage.tags.contains(&tag) {
            return true;
        }
    }
    utils::data_attribute_tokens(component).any(|a| usage.attributes.contains(a))
}
