//! # Zenith CSS
//!
//! Build-time CSS optimizer. Consumes the CSS emitted by the styling layer
//! plus a record of which selectors rendered markup actually uses, and
//! produces a smaller stylesheet.
//!
//! ```text
//! raw CSS → parse → purge → dedupe → atomic-extract → stringify
//!                                         ↘ split::critical / split::routes
//! ```
//!
//! Every pass is a pure function from a node list to a new node list.
//! The parser only has to round-trip CSS this framework emits itself, so
//! selectors and at-rule params stay opaque strings.

pub mod ast;
pub mod extract;
pub mod optimize;
pub mod parser;
pub mod passes;
pub mod plugin;
pub mod registry;
pub mod split;
pub mod stringify;
pub mod theme;
pub mod usage;
pub mod utils;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use ast::{CssNode, Declaration, DeclarationKey};
pub use extract::{analyze_css_bundle, extract_critical_css, extract_css, extract_to_file};
pub use optimize::OptimizationReport;
pub use parser::{parse, parse_declarations};
pub use passes::atomic::{atomic_extract, AtomicNaming, AtomicOptions, AtomicOutput};
pub use passes::dedupe::deduplicate;
pub use passes::purge::purge;
pub use registry::StyleRegistry;
pub use split::critical::{split_critical, CriticalSplit, SplitOptions};
pub use split::routes::{duplicate_chunk_name, split_by_route, CssChunk};
pub use stringify::stringify;
pub use theme::Theme;
pub use usage::UsageInfo;

// ---------------------------------------------------------------------------
// Build Mode
// ---------------------------------------------------------------------------

/// The build mode selects a preset of optimization passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Development: no passes, pretty output.
    Dev,
    /// Production: every pass enabled, minified output.
    Prod,
    /// Static Site Generation: production passes plus a source map.
    SSG,
}

// ---------------------------------------------------------------------------
// Diagnostic
// ---------------------------------------------------------------------------

/// A structured diagnostic emitted during optimization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    pub context: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    Error,
    Warning,
    Info,
}

impl Diagnostic {
    pub(crate) fn info(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Info,
            message: message.into(),
            context: None,
        }
    }

    pub(crate) fn warning(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            message: message.into(),
            context: Some(context.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// OptimizeOptions
// ---------------------------------------------------------------------------

/// Describes WHICH passes run. Every pass is independently toggleable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizeOptions {
    /// Drop rules not referenced by the supplied usage info.
    pub purge: bool,
    /// Merge rules with identical declaration blocks.
    pub deduplicate: bool,
    /// Factor declarations shared by 3+ rules into atomic classes.
    pub atomic: bool,
    /// How atomic classes are named.
    pub atomic_naming: AtomicNaming,
    /// Remove atomized declarations from the original rules.
    pub rewrite_atomic: bool,
    /// Stringify without non-essential whitespace.
    pub minify: bool,
    /// Produce a minimal source map alongside the CSS.
    pub sourcemap: bool,
    /// Source name recorded in the source map.
    pub source_name: String,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            purge: false,
            deduplicate: false,
            atomic: false,
            atomic_naming: AtomicNaming::default(),
            rewrite_atomic: false,
            minify: false,
            sourcemap: false,
            source_name: "styles.css".to_string(),
        }
    }
}

impl OptimizeOptions {
    /// Preset for a build mode.
    pub fn for_mode(mode: BuildMode) -> Self {
        match mode {
            BuildMode::Dev => Self::default(),
            BuildMode::Prod => Self {
                purge: true,
                deduplicate: true,
                atomic: true,
                minify: true,
                ..Self::default()
            },
            BuildMode::SSG => Self {
                sourcemap: true,
                ..Self::for_mode(BuildMode::Prod)
            },
        }
    }
}

// ---------------------------------------------------------------------------
// OptimizeRequest / OptimizeResult
// ---------------------------------------------------------------------------

/// Describes WHAT to optimize.
#[derive(Debug, Clone, Default)]
pub struct OptimizeRequest {
    /// Raw CSS text.
    pub input: String,
    /// Selectors observed in markup. `None` turns purge into a no-op.
    pub usage: Option<UsageInfo>,
    pub options: OptimizeOptions,
}

/// The output of one `optimize` call. Never mutated after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeResult {
    /// Final stylesheet.
    pub css: String,
    pub report: OptimizationReport,
    /// Original selector → atomic classes covering its declarations.
    pub composition: indexmap::IndexMap<String, Vec<String>>,
    /// Source map JSON, when requested.
    pub sourcemap: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

// ---------------------------------------------------------------------------
// OptimizeError
// ---------------------------------------------------------------------------

/// Errors raised at the I/O boundary. The transform itself never fails.
#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("Failed to create output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid source map: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run the optimization pipeline over a raw stylesheet.
///
/// Pass order is fixed: purge → dedupe → atomic-extract → stringify.
pub fn optimize(request: OptimizeRequest) -> OptimizeResult {
    optimize::run(request)
}
