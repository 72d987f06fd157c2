//! Pipeline orchestration.
//!
//! 1. Parse the input
//! 2. purge → dedupe → atomic-extract, each when enabled
//! 3. Stringify (minified or pretty)
//! 4. Measure and return a sealed `OptimizeResult`

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ast::count_rules;
use crate::passes::atomic::{atomic_extract, AtomicOptions};
use crate::passes::{dedupe, purge};
use crate::{parser, stringify, Diagnostic, OptimizeRequest, OptimizeResult};

/// Size and pass metrics for one `optimize` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationReport {
    /// Input length in bytes.
    pub original_size: usize,
    /// Output length in bytes.
    pub optimized_size: usize,
    /// `original_size - optimized_size`; negative when output grew.
    pub savings: i64,
    /// Savings as a percentage of the input, 0 for empty input.
    pub savings_percent: f64,
    pub unused_rules_removed: usize,
    pub duplicates_removed: usize,
    pub atomic_classes_created: usize,
}

impl OptimizationReport {
    fn new(
        original_size: usize,
        optimized_size: usize,
        unused_rules_removed: usize,
        duplicates_removed: usize,
        atomic_classes_created: usize,
    ) -> Self {
        let savings = original_size as i64 - optimized_size as i64;
        let savings_percent = if original_size == 0 {
            0.0
        } else {
            savings as f64 / original_size as f64 * 100.0
        };
        Self {
            original_size,
            optimized_size,
            savings,
            savings_percent,
            unused_rules_removed,
            duplicates_removed,
            atomic_classes_created,
        }
    }
}

pub(crate) fn run(request: OptimizeRequest) -> OptimizeResult {
    let OptimizeRequest {
        input,
        usage,
        options,
    } = request;
    let mut diagnostics = Vec::new();

    let mut nodes = parser::parse(&input);

    let mut unused_rules_removed = 0;
    if options.purge {
        match usage.as_ref() {
            Some(usage) => {
                let before = count_rules(&nodes);
                nodes = purge::purge(&nodes, usage);
                unused_rules_removed = before - count_rules(&nodes);
            }
            None => {
                warn!("purge requested without usage info; skipping");
                diagnostics.push(Diagnostic::warning(
                    "Purge skipped: no usage info supplied",
                    "Pass HTML or JSX sources so unused rules can be detected",
                ));
            }
        }
    }

    let mut duplicates_removed = 0;
    if options.deduplicate {
        let before = count_rules(&nodes);
        nodes = dedupe::deduplicate(&nodes);
        duplicates_removed = before - count_rules(&nodes);
    }

    let mut composition = IndexMap::new();
    let mut atomic_classes_created = 0;
    if options.atomic {
        let atomic_options = AtomicOptions {
            naming: options.atomic_naming,
            rewrite: options.rewrite_atomic,
        };
        let output = atomic_extract(&nodes, &atomic_options);
        atomic_classes_created = output.atomic.len();
        composition = output.composed.clone();
        nodes = output.into_nodes(nodes);
    }

    let css = stringify::stringify(&nodes, options.minify);

    let report = OptimizationReport::new(
        input.len(),
        css.len(),
        unused_rules_removed,
        duplicates_removed,
        atomic_classes_created,
    );

    let sourcemap = options
        .sourcemap
        // `file` names the source until emission retargets it.
        .then(|| source_map_json(&options.source_name, &options.source_name));

    info!(
        original = report.original_size,
        optimized = report.optimized_size,
        purged = unused_rules_removed,
        deduped = duplicates_removed,
        atomic = atomic_classes_created,
        "css optimized"
    );
    diagnostics.push(Diagnostic::info(format!(
        "Optimized {} bytes → {} bytes ({:.1}% saved)",
        report.original_size, report.optimized_size, report.savings_percent
    )));

    OptimizeResult {
        css,
        report,
        composition,
        sourcemap,
        diagnostics,
    }
}

/// Minimal v3 source map: one source, no mappings.
pub fn source_map_json(source_name: &str, file: &str) -> String {
    serde_json::json!({
        "version": 3,
        "file": file,
        "sources": [source_name],
        "names": [],
        "mappings": "",
    })
    .to_string()
}

/// Point an existing map's `file` at the emitted stylesheet name.
pub fn retarget_source_map(map: &str, file: &str) -> Result<String, serde_json::Error> {
    let mut value: serde_json::Value = serde_json::from_str(map)?;
    if let Some(fields) = value.as_object_mut() {
        fields.insert("file".to_string(), serde_json::Value::from(file));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OptimizeOptions, UsageInfo};

    fn request(input: &str, options: OptimizeOptions) -> OptimizeRequest {
        OptimizeRequest {
            input: input.to_string(),
            usage: None,
            options,
        }
    }

    #[test]
    fn test_report_counts() {
        let input = ".a{x:1} .b{x:1} .c{x:1} .unused{y:2}";
        let result = crate::optimize(OptimizeRequest {
            input: input.into(),
            usage: Some(UsageInfo {
                classes: ["a", "b", "c"].iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }),
            options: OptimizeOptions {
                purge: true,
                deduplicate: true,
                atomic: true,
                minify: true,
                ..Default::default()
            },
        });
        assert_eq!(result.report.unused_rules_removed, 1);
        assert_eq!(result.report.duplicates_removed, 2);
        // After dedupe a single rule remains, so nothing reaches the threshold.
        assert_eq!(result.report.atomic_classes_created, 0);
        assert_eq!(result.css, ".a, .b, .c{x:1}");
        assert_eq!(result.report.original_size, input.len());
        assert_eq!(result.report.optimized_size, result.css.len());
    }

    #[test]
    fn test_purge_without_usage_warns() {
        let result = crate::optimize(request(
            ".a{x:1}",
            OptimizeOptions {
                purge: true,
                ..Default::default()
            },
        ));
        assert!(result.css.contains(".a"));
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.level == crate::DiagnosticLevel::Warning));
    }

    #[test]
    fn test_empty_input_report() {
        let result = crate::optimize(request("", OptimizeOptions::default()));
        assert_eq!(result.css, "");
        assert_eq!(result.report.savings, 0);
        assert_eq!(result.report.savings_percent, 0.0);
    }

    #[test]
    fn test_sourcemap_json_shape() {
        let map: serde_json::Value =
            serde_json::from_str(&source_map_json("app.css", "app.min.css")).unwrap();
        assert_eq!(map["version"], 3);
        assert_eq!(map["sources"][0], "app.css");
        assert_eq!(map["mappings"], "");
    }

    #[test]
    fn test_retarget_source_map_sets_file() {
        let map = retarget_source_map(&source_map_json("app.css", "app.css"), "app.min.css").unwrap();
        let map: serde_json::Value = serde_json::from_str(&map).unwrap();
        assert_eq!(map["file"], "app.min.css");
        assert_eq!(map["sources"][0], "app.css");
        assert!(retarget_source_map("not json", "x.css").is_err());
    }

    #[test]
    fn test_sourcemap_only_when_requested() {
        let off = crate::optimize(request(".a{x:1}", OptimizeOptions::default()));
        assert!(off.sourcemap.is_none());
        let on = crate::optimize(request(
            ".a{x:1}",
            OptimizeOptions {
                sourcemap: true,
                ..Default::default()
            },
        ));
        assert!(on.sourcemap.is_some());
    }

    #[test]
    fn test_negative_savings_when_output_grows() {
        let result = crate::optimize(request(".a{x:1}", OptimizeOptions::default()));
        assert!(result.report.savings < 0);
        assert!(result.report.savings_percent < 0.0);
    }
}
