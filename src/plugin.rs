//! Generic build-plugin shape and the CSS extraction plugin.
//!
//! Bundler adapters drive a [`BuildPlugin`] through three hooks:
//! 1. `setup` once per build
//! 2. `transform` per module: the CSS plugin scans it for usage
//! 3. `generate_bundle` at emission: the CSS plugin emits the stylesheet
//!
//! ```text
//! sources → transform() → ModuleCache ─┐
//! StyleRegistry + Theme ───────────────┴→ generate_bundle() → styles.css (+ .map)
//! ```

pub mod module_cache;

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::extract::{emitted_files, extract_css, ExtractOptions};
use crate::registry::StyleRegistry;
use crate::theme::Theme;
use crate::usage::UsageInfo;
use crate::OptimizeOptions;

pub use module_cache::ModuleCache;

// ---------------------------------------------------------------------------
// Bundle model
// ---------------------------------------------------------------------------

/// A file emitted into the bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedAsset {
    pub file_name: String,
    pub source: String,
}

/// The in-memory output bundle handed to `generate_bundle`.
#[derive(Debug, Clone, Default)]
pub struct OutputBundle {
    pub assets: Vec<EmittedAsset>,
}

impl OutputBundle {
    /// Add or overwrite an asset.
    pub fn emit_asset(&mut self, file_name: impl Into<String>, source: impl Into<String>) {
        let file_name = file_name.into();
        let source = source.into();
        match self.assets.iter_mut().find(|a| a.file_name == file_name) {
            Some(existing) => existing.source = source,
            None => self.assets.push(EmittedAsset { file_name, source }),
        }
    }

    pub fn get(&self, file_name: &str) -> Option<&EmittedAsset> {
        self.assets.iter().find(|a| a.file_name == file_name)
    }
}

// ---------------------------------------------------------------------------
// BuildPlugin
// ---------------------------------------------------------------------------

/// Hooks any bundler adapter can call. All but `name` are optional.
pub trait BuildPlugin: Send + Sync {
    fn name(&self) -> Cow<'static, str>;

    fn setup(&self) -> Result<()> {
        Ok(())
    }

    /// Returns replacement code, or `None` to leave the module unchanged.
    fn transform(&self, _code: &str, _id: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn generate_bundle(&self, _bundle: &mut OutputBundle) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CssExtractPlugin
// ---------------------------------------------------------------------------

/// Which scanner a module id maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Html,
    Jsx,
}

/// Scans modules for used selectors and emits the optimized stylesheet.
#[derive(Debug, Clone)]
pub struct CssExtractPlugin {
    registry: Arc<StyleRegistry>,
    theme: Option<Theme>,
    options: OptimizeOptions,
    file_name: String,
    modules: ModuleCache,
}

impl CssExtractPlugin {
    pub fn new(registry: Arc<StyleRegistry>, options: OptimizeOptions) -> Self {
        Self {
            registry,
            theme: None,
            options,
            file_name: "styles.css".to_string(),
            modules: ModuleCache::new(),
        }
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = Some(theme);
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Per-module usage collected so far.
    pub fn modules(&self) -> &ModuleCache {
        &self.modules
    }
}

impl BuildPlugin for CssExtractPlugin {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("zenith-css")
    }

    fn setup(&self) -> Result<()> {
        self.modules.clear();
        Ok(())
    }

    fn transform(&self, code: &str, id: &str) -> Result<Option<String>> {
        let Some(kind) = source_kind(id) else {
            return Ok(None);
        };
        let usage = match kind {
            SourceKind::Html => UsageInfo::from_html(code),
            SourceKind::Jsx => UsageInfo::from_jsx(code),
        };
        debug!(id, classes = usage.classes.len(), "scanned module");
        self.modules.insert(id, usage);
        Ok(None)
    }

    fn generate_bundle(&self, bundle: &mut OutputBundle) -> Result<()> {
        let usage = (!self.modules.is_empty()).then(|| self.modules.merged());
        let result = extract_css(&ExtractOptions {
            registry: &self.registry,
            theme: self.theme.as_ref(),
            usage: usage.as_ref(),
            optimize: &self.options,
        });

        let (css, map) = emitted_files(&result, &self.file_name)?;
        bundle.emit_asset(self.file_name.clone(), css);
        if let Some(map) = map {
            bundle.emit_asset(format!("{}.map", self.file_name), map);
        }
        Ok(())
    }
}

/// Skip dependency and output directories.
fn should_scan(id: &str) -> bool {
    const SKIPPED: [&str; 4] = ["node_modules", ".pnpm", "dist", ".cache"];
    !Path::new(id).components().any(|c| {
        let part = c.as_os_str().to_string_lossy();
        SKIPPED.iter().any(|skipped| part == *skipped)
    })
}

fn source_kind(id: &str) -> Option<SourceKind> {
    if !should_scan(id) {
        return None;
    }
    let ext = Path::new(id).extension()?.to_str()?;
    match ext {
        "html" | "htm" => Some(SourceKind::Html),
        "jsx" | "tsx" | "js" | "ts" | "mdx" | "zen" => Some(SourceKind::Jsx),
        _ => None,
    }
}
