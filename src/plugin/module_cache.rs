//! Thread-safe usage cache keyed by module id.
//!
//! The plugin writes each module's usage here during `transform`. A
//! re-transform in watch mode replaces the module's entry instead of
//! accumulating stale classes. `generate_bundle` reads the union.

use std::sync::Arc;

use dashmap::{DashMap, DashSet};

use crate::usage::UsageInfo;

/// Usage per module, with dirty tracking for watch-mode rebuilds.
#[derive(Debug, Clone, Default)]
pub struct ModuleCache {
    inner: Arc<DashMap<String, UsageInfo>>,
    /// Modules changed since the last `has_changed` check.
    dirty: Arc<DashSet<String>>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a module's usage. Returns the previous value.
    pub fn insert(&self, module_id: &str, usage: UsageInfo) -> Option<UsageInfo> {
        self.dirty.insert(module_id.to_string());
        self.inner.insert(module_id.to_string(), usage)
    }

    pub fn get(&self, module_id: &str) -> Option<UsageInfo> {
        self.inner.get(module_id).map(|u| u.value().clone())
    }

    /// Remove a module and mark it dirty (deleted file in watch mode).
    pub fn invalidate(&self, module_id: &str) -> Option<UsageInfo> {
        self.dirty.insert(module_id.to_string());
        self.inner.remove(module_id).map(|(_, usage)| usage)
    }

    /// Whether a module changed since the last check. Clears its flag.
    pub fn has_changed(&self, module_id: &str) -> bool {
        self.dirty.remove(module_id).is_some()
    }

    /// Whether any module changed since the last checks.
    pub fn any_changed(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Union of every module's usage.
    pub fn merged(&self) -> UsageInfo {
        self.inner.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drop everything between builds.
    pub fn clear(&self) {
        self.inner.clear();
        self.dirty.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(class: &str) -> UsageInfo {
        UsageInfo {
            classes: [class.to_string()].into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_replaces_module_usage() {
        let cache = ModuleCache::new();
        cache.insert("a.tsx", usage("old"));
        let previous = cache.insert("a.tsx", usage("new"));
        assert_eq!(previous, Some(usage("old")));
        assert_eq!(cache.merged(), usage("new"));
    }

    #[test]
    fn test_merged_is_union() {
        let cache = ModuleCache::new();
        cache.insert("a.tsx", usage("a"));
        cache.insert("b.tsx", usage("b"));
        assert_eq!(cache.merged().classes.len(), 2);
    }

    #[test]
    fn test_dirty_tracking() {
        let cache = ModuleCache::new();
        cache.insert("a.tsx", usage("a"));
        assert!(cache.has_changed("a.tsx"));
        assert!(!cache.has_changed("a.tsx"));
        cache.invalidate("a.tsx");
        assert!(cache.any_changed());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_thread_safety() {
        use std::thread;

        let cache = ModuleCache::new();
        let cache_clone = cache.clone();
        thread::spawn(move || {
            cache_clone.insert("thread.tsx", usage("t"));
        })
        .join()
        .unwrap();
        assert_eq!(cache.get("thread.tsx"), Some(usage("t")));
    }
}
