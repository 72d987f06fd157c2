//! Route-based bundle splitting.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ast::CssNode;
use crate::parser::parse;
use crate::stringify::stringify;
use crate::utils;

/// Name of the chunk holding selectors used by more than one route.
pub const SHARED_CHUNK: &str = "shared";

/// A unit of split output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CssChunk {
    pub name: String,
    pub css: String,
    pub selectors: BTreeSet<String>,
}

/// Split a stylesheet into a shared chunk and one chunk per route.
///
/// A selector listed under more than one route goes to the `"shared"`
/// chunk, which is always emitted first. Route chunks follow in route
/// order, named by [`utils::route_slug`]. Base rules travel with the
/// shared chunk in document order: `@font-face`, `@keyframes`, `@page`, and rules
/// without class or id tokens (`:root`, `*`, `body`, `h1`, `[data-x]`).
pub fn split_by_route(
    all_css: &str,
    route_selectors: &BTreeMap<String, Vec<String>>,
    minify: bool,
) -> Vec<CssChunk> {
    let nodes = parse(all_css);

    let mut route_counts: HashMap<String, usize> = HashMap::new();
    for selectors in route_selectors.values() {
        let unique: BTreeSet<String> = selectors.iter().map(|s| normalize(s)).collect();
        for name in unique {
            *route_counts.entry(name).or_default() += 1;
        }
    }

    let shared: BTreeSet<String> = route_counts
        .into_iter()
        .filter(|&(_, count)| count > 1)
        .map(|(name, _)| name)
        .collect();

    let mut chunks = Vec::with_capacity(route_selectors.len() + 1);

    let shared_nodes = select_nodes(&nodes, true, |selector| {
        is_base_rule(selector) || rule_matches(selector, &shared)
    });
    chunks.push(CssChunk {
        name: SHARED_CHUNK.to_string(),
        css: stringify(&shared_nodes, minify),
        selectors: shared.clone(),
    });

    for (route, selectors) in route_selectors {
        let own: BTreeSet<String> = selectors
            .iter()
            .map(|s| normalize(s))
            .filter(|s| !shared.contains(s))
            .collect();
        let route_nodes = select_nodes(&nodes, false, |selector| {
            !is_base_rule(selector) && rule_matches(selector, &own)
        });
        debug!(route, rules = route_nodes.len(), "route chunk");
        chunks.push(CssChunk {
            name: utils::route_slug(route),
            css: stringify(&route_nodes, minify),
            selectors: own,
        });
    }

    chunks
}

/// First chunk name emitted more than once, e.g. a `/shared` route or
/// `/about` next to `/about/`. Writing such chunks to `<name>.css` would
/// overwrite one with the other.
pub fn duplicate_chunk_name(chunks: &[CssChunk]) -> Option<&str> {
    let mut seen = HashSet::new();
    chunks
        .iter()
        .map(|chunk| chunk.name.as_str())
        .find(|name| !seen.insert(*name))
}

fn normalize(name: &str) -> String {
    name.trim().trim_start_matches(['.', '#']).to_string()
}

/// Rules whose selector passes `keep`, in document order. At-rules holding
/// rules are narrowed to their matching children and dropped if none match.
/// `@font-face`, `@keyframes` and declaration-only at-rules (`@page`) are
/// kept only when `resources` is set.
fn select_nodes(
    nodes: &[CssNode],
    resources: bool,
    keep: impl Fn(&str) -> bool + Copy,
) -> Vec<CssNode> {
    nodes
        .iter()
        .filter_map(|node| match node {
            CssNode::Rule { selector, .. } => keep(selector).then(|| node.clone()),
            CssNode::AtRule { children, .. }
                if node.is_resource_at_rule() || children.iter().all(is_declaration) =>
            {
                resources.then(|| node.clone())
            }
            CssNode::AtRule {
                name,
                params,
                children,
            } => {
                let matching = select_nodes(children, resources, keep);
                (!matching.is_empty()).then(|| CssNode::at_rule(name, params, matching))
            }
            CssNode::Declaration(_) => None,
        })
        .collect()
}

fn is_declaration(node: &CssNode) -> bool {
    matches!(node, CssNode::Declaration(_))
}

/// Rules every page needs regardless of route.
fn is_base_rule(selector: &str) -> bool {
    let components = utils::selector_components(selector);
    components.iter().any(|c| utils::is_global_component(c))
        || components
            .iter()
            .all(|c| utils::class_tokens(c).next().is_none() && utils::id_tokens(c).next().is_none())
}

fn rule_matches(selector: &str, names: &BTreeSet<String>) -> bool {
    utils::class_tokens(selector)
        .chain(utils::id_tokens(selector))
        .any(|token| names.contains(token))
}
