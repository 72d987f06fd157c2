//! An explicit, passed-around store of registered styles.
//!
//! The styling layer registers declaration blocks here and receives a
//! class name back. Identical content always yields the same class.
//! Registries are independent of each other, so tests and parallel
//! builds never share naming state.

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;

use crate::ast::CssNode;
use crate::parser::{parse, parse_declarations};
use crate::stringify::stringify;
use crate::utils;

/// Handle to a registered style.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StyleHandle {
    pub id: usize,
    pub class_name: String,
}

#[derive(Debug, Clone)]
struct StyleEntry {
    id: usize,
    /// `None` for global blocks registered verbatim.
    class_name: Option<String>,
    nodes: Vec<CssNode>,
}

/// Thread-safe registry keyed by content hash.
#[derive(Debug)]
pub struct StyleRegistry {
    prefix: String,
    entries: DashMap<String, StyleEntry>,
    next_id: AtomicUsize,
}

impl StyleRegistry {
    /// Create an empty registry. Class names are `<prefix><id>`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            entries: DashMap::new(),
            next_id: AtomicUsize::new(0),
        }
    }

    /// Register a declaration body (`color: red; padding: 4px`) and get
    /// its class. Re-registering the same declarations returns the
    /// existing handle.
    pub fn register(&self, declarations: &str) -> StyleHandle {
        let parsed = parse_declarations(declarations);
        let key = format!("class:{}", utils::content_hash(&stringify_body(&parsed)));

        let entry = self.entries.entry(key).or_insert_with(|| {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let class_name = format!("{}{}", self.prefix, id);
            StyleEntry {
                id,
                class_name: Some(class_name.clone()),
                nodes: vec![CssNode::rule(format!(".{class_name}"), parsed)],
            }
        });

        StyleHandle {
            id: entry.id,
            class_name: entry.class_name.clone().unwrap_or_default(),
        }
    }

    /// Register a verbatim block (resets, keyframes, font-face). Returns
    /// its id; duplicate content is stored once.
    pub fn register_global(&self, css: &str) -> usize {
        let nodes = parse(css);
        let key = format!("global:{}", utils::content_hash(&stringify(&nodes, true)));
        let entry = self.entries.entry(key).or_insert_with(|| StyleEntry {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            class_name: None,
            nodes,
        });
        entry.id
    }

    /// Class name for a registered id.
    pub fn class_for(&self, id: usize) -> Option<String> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .and_then(|e| e.class_name.clone())
    }

    /// Reverse lookup: the declaration body behind a class name.
    pub fn lookup(&self, class_name: &str) -> Option<String> {
        self.entries
            .iter()
            .find(|e| e.class_name.as_deref() == Some(class_name))
            .map(|e| match e.nodes.first() {
                Some(CssNode::Rule { children, .. }) => stringify_body(children),
                _ => String::new(),
            })
    }

    /// All registered nodes in registration order.
    pub fn nodes(&self) -> Vec<CssNode> {
        let mut entries: Vec<StyleEntry> = self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by_key(|e| e.id);
        entries.into_iter().flat_map(|e| e.nodes).collect()
    }

    /// The registry rendered as a stylesheet, in registration order.
    pub fn to_css(&self, minify: bool) -> String {
        stringify(&self.nodes(), minify)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop everything. Ids restart from zero.
    pub fn clear(&self) {
        self.entries.clear();
        self.next_id.store(0, Ordering::SeqCst);
    }
}

impl Default for StyleRegistry {
    fn default() -> Self {
        Self::new("zx-")
    }
}

fn stringify_body(declarations: &[crate::ast::Declaration]) -> String {
    declarations
        .iter()
        .map(|d| d.key().to_string())
        .collect::<Vec<_>>()
        .join(";")
}
