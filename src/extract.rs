//! Extraction surface consumed by build tools.
//!
//! - `extract_css`: registry + theme through the optimizer
//! - `extract_critical_css`: above-the-fold subset for inlining
//! - `extract_to_file`: stylesheet and `.map` sibling on disk
//! - `analyze_css_bundle`: pattern-count statistics

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::optimize::retarget_source_map;
use crate::parser::parse;
use crate::registry::StyleRegistry;
use crate::split::critical::{split_critical, SplitOptions};
use crate::stringify::stringify;
use crate::theme::Theme;
use crate::usage::UsageInfo;
use crate::{OptimizeError, OptimizeOptions, OptimizeRequest, OptimizeResult};

/// Estimated gzip ratio applied to the minified size.
pub const GZIP_RATIO: f64 = 0.3;

// ---------------------------------------------------------------------------
// ExtractOptions
// ---------------------------------------------------------------------------

/// Inputs for [`extract_css`] and [`extract_critical_css`].
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions<'a> {
    pub registry: &'a StyleRegistry,
    /// Theme block, always prepended to the output.
    pub theme: Option<&'a Theme>,
    /// Selectors observed in markup; required for purge.
    pub usage: Option<&'a UsageInfo>,
    pub optimize: &'a OptimizeOptions,
}

/// The full registry stylesheet, theme first, run through the optimizer.
pub fn extract_css(options: &ExtractOptions<'_>) -> OptimizeResult {
    let input = source_css(options);
    debug!(bytes = input.len(), "extracting registry css");
    crate::optimize(OptimizeRequest {
        input,
        usage: options.usage.cloned(),
        options: options.optimize.clone(),
    })
}

/// Above-the-fold stylesheet for inlining into server-rendered HTML.
///
/// Classes found in `html` form the above-fold set. The theme block and
/// `@font-face` / `@keyframes` are always included.
pub fn extract_critical_css(html: &str, options: &ExtractOptions<'_>) -> String {
    let usage = UsageInfo::from_html(html);
    let above_fold: HashSet<String> = usage.classes.into_iter().collect();
    let nodes = parse(&options.registry.to_css(true));
    let split = split_critical(
        &nodes,
        &above_fold,
        &SplitOptions {
            minify: options.optimize.minify,
            theme_css: options
                .theme
                .map(|t| t.to_css(options.optimize.minify))
                .filter(|css| !css.is_empty()),
        },
    );
    split.critical
}

fn source_css(options: &ExtractOptions<'_>) -> String {
    let mut css = String::new();
    if let Some(theme) = options.theme {
        css.push_str(&theme.to_css(false));
    }
    css.push_str(&options.registry.to_css(false));
    css
}

// ---------------------------------------------------------------------------
// File emission
// ---------------------------------------------------------------------------

/// Write an optimized stylesheet to `path`.
///
/// When the result carries a source map, `<path>.map` is written too and
/// the stylesheet gets a `sourceMappingURL` trailer. A failed write leaves
/// `result` untouched, so callers can retry without recomputing.
pub async fn extract_to_file(
    path: impl AsRef<Path>,
    result: &OptimizeResult,
) -> Result<(), OptimizeError> {
    let path = path.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| OptimizeError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (css, map) = emitted_files(result, &file_name)?;
    if let Some(map) = map {
        write(&map_path_for(path), map.as_bytes()).await?;
    }

    write(path, css.as_bytes()).await?;
    info!(path = %path.display(), bytes = css.len(), "stylesheet written");
    Ok(())
}

/// Final stylesheet text for `file_name` plus its source map, if any.
/// The stylesheet gets a `sourceMappingURL` trailer when a map exists,
/// and the map's `file` is pointed at `file_name`.
pub(crate) fn emitted_files(
    result: &OptimizeResult,
    file_name: &str,
) -> Result<(String, Option<String>), OptimizeError> {
    match &result.sourcemap {
        Some(map) => {
            let css = format!("{}\n/*# sourceMappingURL={file_name}.map */\n", result.css);
            Ok((css, Some(retarget_source_map(map, file_name)?)))
        }
        None => Ok((result.css.clone(), None)),
    }
}

/// `<path>.map`
pub fn map_path_for(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".map");
    PathBuf::from(os)
}

async fn write(path: &Path, contents: &[u8]) -> Result<(), OptimizeError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| OptimizeError::Write {
            path: path.to_path_buf(),
            source,
        })
}

// ---------------------------------------------------------------------------
// Bundle analysis
// ---------------------------------------------------------------------------

/// Pattern-count statistics over a stylesheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleStats {
    pub total_size: usize,
    pub minified_size: usize,
    /// `minified_size × 0.3`, an estimate, not a compression run.
    pub gzip_size: usize,
    /// Distinct `.name` tokens.
    pub class_count: usize,
    /// `{` occurrences.
    pub rule_count: usize,
    /// `--name:` occurrences.
    pub theme_vars: usize,
}

static CLASS_SELECTOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.(-?[a-zA-Z_][\w-]*)").unwrap());
static THEME_VAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"--[\w-]+\s*:").unwrap());

/// Analyze an extracted stylesheet. Useful for spotting silent purge
/// misses: a class count far above what the markup uses means usage
/// scanning did not see it.
pub fn analyze_css_bundle(css: &str) -> BundleStats {
    let minified_size = stringify(&parse(css), true).len();
    let classes: BTreeSet<&str> = CLASS_SELECTOR
        .captures_iter(css)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect();

    BundleStats {
        total_size: css.len(),
        minified_size,
        gzip_size: (minified_size as f64 * GZIP_RATIO).round() as usize,
        class_count: classes.len(),
        rule_count: css.matches('{').count(),
        theme_vars: THEME_VAR.find_iter(css).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_counts() {
        let css = ":root { --a: 1; --b: 2 } .x { color: red } .y, .x:hover { margin: 0.5rem }";
        let stats = analyze_css_bundle(css);
        assert_eq!(stats.total_size, css.len());
        assert_eq!(stats.class_count, 2);
        assert_eq!(stats.rule_count, 3);
        assert_eq!(stats.theme_vars, 2);
        assert!(stats.minified_size < stats.total_size);
        assert_eq!(
            stats.gzip_size,
            (stats.minified_size as f64 * GZIP_RATIO).round() as usize
        );
    }

    #[test]
    fn test_analyze_empty() {
        assert_eq!(analyze_css_bundle(""), BundleStats::default());
    }

    #[test]
    fn test_map_path() {
        assert_eq!(map_path_for(Path::new("dist/app.css")), PathBuf::from("dist/app.css.map"));
    }

    #[test]
    fn test_extract_css_prepends_theme() {
        let registry = StyleRegistry::new("c");
        registry.register("color: red");
        let theme = Theme::new().with_token("colors", "fg", "black");
        let opts = OptimizeOptions {
            minify: true,
            ..Default::default()
        };
        let result = extract_css(&ExtractOptions {
            registry: &registry,
            theme: Some(&theme),
            usage: None,
            optimize: &opts,
        });
        assert_eq!(result.css, ":root{--colors-fg:black}.c0{color:red}");
    }

    #[test]
    fn test_extract_critical_uses_html_classes() {
        let registry = StyleRegistry::new("c");
        let hero = registry.register("font-size: 3rem");
        registry.register("color: gray");
        registry.register_global("@font-face { font-family: Inter }");
        let theme = Theme::new().with_token("space", "sm", "4px");
        let opts = OptimizeOptions {
            minify: true,
            ..Default::default()
        };
        let html = format!(r#"<section class="{}">Hi</section>"#, hero.class_name);
        let critical = extract_critical_css(
            &html,
            &ExtractOptions {
                registry: &registry,
                theme: Some(&theme),
                usage: None,
                optimize: &opts,
            },
        );
        assert_eq!(
            critical,
            ":root{--space-sm:4px}.c0{font-size:3rem}@font-face{font-family:Inter}"
        );
    }
}
