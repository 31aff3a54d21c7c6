//! Leaf provider resolving classes from overrides, then the library index.

use anyhow::Result;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use crate::index::LibraryIndex;
use crate::info::ClassInfo;
use crate::name;
use crate::provider::ClassProvider;

/// Resolves class names against explicitly injected overrides first, then
/// the package index. Overrides are memoized permanently; indexed results
/// are memoized per the `cache_all` flag (hits always, misses only when
/// `cache_all` is set).
pub struct ResolvingClassProvider {
    index: LibraryIndex,
    overrides: HashMap<String, Arc<ClassInfo>>,
    cache: DashMap<String, Option<Arc<ClassInfo>>>,
    cache_all: bool,
}

impl ResolvingClassProvider {
    pub(crate) fn new(
        index: LibraryIndex,
        overrides: HashMap<String, Arc<ClassInfo>>,
        cache_all: bool,
    ) -> Self {
        Self {
            index,
            overrides,
            cache: DashMap::new(),
            cache_all,
        }
    }
}

impl ClassProvider for ResolvingClassProvider {
    fn get_class(&self, class_name: &str) -> Option<Arc<ClassInfo>> {
        let key = name::normalize(class_name);
        if let Some(info) = self.overrides.get(&key) {
            return Some(Arc::clone(info));
        }
        if let Some(cached) = self.cache.get(&key) {
            return cached.value().clone();
        }

        let resolved = self
            .index
            .read_class(&key)
            .map(|bytes| Arc::new(ClassInfo::new(bytes)));
        if !self.cache_all && resolved.is_none() {
            return None;
        }
        // Concurrent first-time lookups may race the read; the first insert
        // wins and every caller observes that single cached outcome.
        match self.cache.entry(key) {
            Entry::Occupied(existing) => existing.get().clone(),
            Entry::Vacant(slot) => {
                slot.insert(resolved.clone());
                resolved
            }
        }
    }

    fn get_class_bytes(&self, class_name: &str) -> Option<Vec<u8>> {
        let key = name::normalize(class_name);
        if let Some(info) = self.overrides.get(&key) {
            return Some(info.bytes().to_vec());
        }
        // Consult (but never populate) the info cache so all lookups observe
        // the same outcome, including names already cached as absent.
        if let Some(cached) = self.cache.get(&key) {
            return cached.value().as_ref().map(|info| info.bytes().to_vec());
        }
        self.index.read_class(&key)
    }

    fn get_class_stream(&self, class_name: &str) -> Result<Option<Box<dyn Read + Send>>> {
        let key = name::normalize(class_name);
        if let Some(info) = self.overrides.get(&key) {
            return Ok(Some(Box::new(info.stream())));
        }
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached
                .value()
                .as_ref()
                .map(|info| Box::new(info.stream()) as Box<dyn Read + Send>));
        }
        self.index.open_class_stream(&key)
    }

    fn close(&self) -> Result<()> {
        self.index.close_all()
    }
}
