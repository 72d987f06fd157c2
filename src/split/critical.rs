//! Critical / deferred partitioning for first paint.

use std::collections::HashSet;

use tracing::debug;

use crate::ast::CssNode;
use crate::stringify::stringify;
use crate::utils;

/// Options for [`split_critical`].
#[derive(Debug, Clone, Default)]
pub struct SplitOptions {
    pub minify: bool,
    /// Theme variable block prepended to the critical half.
    pub theme_css: Option<String>,
}

/// Stringified halves of a stylesheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CriticalSplit {
    pub critical: String,
    pub deferred: String,
}

/// Partition nodes into what first paint needs and what can load later.
///
/// A rule is critical when any comma component references a class in
/// `above_fold` (names with or without the leading `.`), or when it is a
/// `:root` block of custom properties. `@font-face` and `@keyframes` are
/// always critical; every other at-rule is deferred.
pub fn split_critical(
    nodes: &[CssNode],
    above_fold: &HashSet<String>,
    options: &SplitOptions,
) -> CriticalSplit {
    let wanted: HashSet<&str> = above_fold
        .iter()
        .map(|s| s.trim().trim_start_matches('.'))
        .collect();

    let (critical, deferred): (Vec<CssNode>, Vec<CssNode>) = nodes
        .iter()
        .cloned()
        .partition(|node| is_critical(node, &wanted));

    debug!(
        critical = critical.len(),
        deferred = deferred.len(),
        "critical split"
    );

    let mut critical_css = String::new();
    if let Some(theme) = options.theme_css.as_deref() {
        critical_css.push_str(theme);
        if !options.minify && !theme.ends_with('\n') && !critical.is_empty() {
            critical_css.push('\n');
        }
    }
    critical_css.push_str(&stringify(&critical, options.minify));

    CriticalSplit {
        critical: critical_css,
        deferred: stringify(&deferred, options.minify),
    }
}

fn is_critical(node: &CssNode, above_fold: &HashSet<&str>) -> bool {
    match node {
        CssNode::Rule { selector, children } => {
            if is_theme_rule(selector, children) {
                return true;
            }
            utils::selector_components(selector)
                .into_iter()
                .any(|component| utils::class_tokens(component).any(|c| above_fold.contains(c)))
        }
        CssNode::AtRule { .. } => node.is_resource_at_rule(),
        CssNode::Declaration(_) => false,
    }
}

fn is_theme_rule(selector: &str, children: &[crate::ast::Declaration]) -> bool {
    selector.trim() == ":root" && children.iter().any(|d| d.is_custom_property())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn fold(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    const CSS: &str = "\
        :root { --color-primary: #06f }
        .hero { color: red }
        .footer { color: blue }
        @font-face { font-family: Inter }
        @keyframes spin { to { transform: rotate(1turn) } }
        @media (max-width: 600px) { .hero { color: pink } }";

    #[test]
    fn test_split_hero_and_footer() {
        let split = split_critical(&parse(CSS), &fold(&["hero"]), &SplitOptions::default());
        assert!(split.critical.contains(".hero"));
        assert!(split.critical.contains("@font-face"));
        assert!(split.critical.contains("@keyframes spin"));
        assert!(split.critical.contains("--color-primary"));
        assert!(!split.critical.contains(".footer"));
        assert!(!split.critical.contains("@media"));

        assert!(split.deferred.contains(".footer"));
        assert!(split.deferred.contains("@media"));
        assert!(!split.deferred.contains("@font-face"));
    }

    #[test]
    fn test_leading_dot_accepted() {
        let split = split_critical(&parse(CSS), &fold(&[".footer"]), &SplitOptions::default());
        assert!(split.critical.contains(".footer"));
        assert!(!split.critical.contains(".hero {"));
    }

    #[test]
    fn test_selector_list_component_match() {
        let nodes = parse(".nav, .hero-title { margin: 0 }");
        let split = split_critical(&nodes, &fold(&["hero-title"]), &SplitOptions::default());
        assert!(split.deferred.is_empty());
    }

    #[test]
    fn test_empty_above_fold_defers_everything_but_globals() {
        let split = split_critical(&parse(CSS), &HashSet::new(), &SplitOptions::default());
        assert!(!split.critical.contains(".hero"));
        assert!(split.deferred.contains(".hero"));
        assert!(split.critical.contains(":root"));
    }

    #[test]
    fn test_theme_css_prepended() {
        let options = SplitOptions {
            minify: true,
            theme_css: Some(":root{--space-sm:4px}".into()),
        };
        let split = split_critical(&parse(".hero{color:red}"), &fold(&["hero"]), &options);
        assert_eq!(split.critical, ":root{--space-sm:4px}.hero{color:red}");
        assert_eq!(split.deferred, "");
    }
}
