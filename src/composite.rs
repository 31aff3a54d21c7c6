//! Ordered first-match-wins aggregation of class providers.
//!
//! Precedence is positional: the first child that answers wins, irrespective
//! of later children. `get_class` outcomes are memoized so each name walks
//! the chain at most once per composite instance; byte and stream lookups
//! pass through uncached, since they are cheap and repeatable against the
//! owning child.

use anyhow::{Result, bail};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::io::Read;
use std::sync::Arc;

use crate::info::ClassInfo;
use crate::name;
use crate::provider::{ClassProvider, DiagnosticSink, log_sink};

pub struct CompositeClassProvider {
    providers: Vec<Box<dyn ClassProvider>>,
    cache: DashMap<String, Option<Arc<ClassInfo>>>,
    sink: DiagnosticSink,
}

impl CompositeClassProvider {
    /// Composes providers in the given precedence order, reporting
    /// unresolved names through the `log` facade.
    pub fn new(providers: Vec<Box<dyn ClassProvider>>) -> Self {
        Self::with_sink(providers, log_sink())
    }

    pub fn with_sink(providers: Vec<Box<dyn ClassProvider>>, sink: DiagnosticSink) -> Self {
        Self {
            providers,
            cache: DashMap::new(),
            sink,
        }
    }

    /// Discards all memoized outcomes so later lookups observe library
    /// contents that changed since the composite was built.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn resolve(&self, key: &str) -> Option<Arc<ClassInfo>> {
        self.providers.iter().find_map(|p| p.get_class(key))
    }
}

impl ClassProvider for CompositeClassProvider {
    fn get_class(&self, class_name: &str) -> Option<Arc<ClassInfo>> {
        let key = name::normalize(class_name);
        if let Some(cached) = self.cache.get(&key) {
            return cached.value().clone();
        }

        let resolved = self.resolve(&key);
        match self.cache.entry(key) {
            // another caller won the race; keep its outcome
            Entry::Occupied(existing) => existing.get().clone(),
            Entry::Vacant(slot) => {
                if resolved.is_none() {
                    (self.sink)(&format!("can't find class: {}", slot.key()));
                }
                slot.insert(resolved.clone());
                resolved
            }
        }
    }

    fn get_class_bytes(&self, class_name: &str) -> Option<Vec<u8>> {
        let key = name::normalize(class_name);
        self.providers.iter().find_map(|p| p.get_class_bytes(&key))
    }

    fn get_class_stream(&self, class_name: &str) -> Result<Option<Box<dyn Read + Send>>> {
        let key = name::normalize(class_name);
        for provider in &self.providers {
            if let Some(stream) = provider.get_class_stream(&key)? {
                return Ok(Some(stream));
            }
        }
        Ok(None)
    }

    /// Closes every child in sequence order. A failing child does not stop
    /// the remaining children from being closed; failures are aggregated.
    fn close(&self) -> Result<()> {
        let mut failures = Vec::new();
        for provider in &self.providers {
            if let Err(err) = provider.close() {
                failures.push(format!("{err:#}"));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            bail!(
                "failed to close {} provider(s): {}",
                failures.len(),
                failures.join("; ")
            );
        }
    }
}
