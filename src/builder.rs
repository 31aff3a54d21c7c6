//! Configuration surface for the resolving provider.

use anyhow::Result;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;

use crate::index::LibraryIndex;
use crate::info::ClassInfo;
use crate::name;
use crate::resolve::ResolvingClassProvider;

/// Accumulates libraries, injected classes and caching configuration, then
/// builds a [`ResolvingClassProvider`]. The index and overrides are immutable
/// once built; archive mounts opened here are owned by the product and
/// released by its `close`.
#[derive(Default)]
pub struct ClassProviderBuilder {
    index: LibraryIndex,
    overrides: HashMap<String, Arc<ClassInfo>>,
    cache_all: bool,
}

impl ClassProviderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one library root: a class directory or a jar/zip archive. A path
    /// that does not exist is skipped silently. Fails only when traversal or
    /// archive opening fails.
    pub fn add_library(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.index.add_library(path.as_ref())?;
        Ok(self)
    }

    /// Adds every element of a platform-separated classpath string, in
    /// order, as if each were passed to [`Self::add_library`].
    pub fn add_classpath(mut self, joined: impl AsRef<OsStr>) -> Result<Self> {
        for element in std::env::split_paths(joined.as_ref()) {
            self.index.add_library(&element)?;
        }
        Ok(self)
    }

    /// Injects a class directly as bytes, bypassing filesystem lookup. The
    /// first injection for a name wins; later calls with the same name are
    /// no-ops.
    pub fn add_class(mut self, class_name: &str, bytes: Vec<u8>) -> Self {
        self.overrides
            .entry(name::normalize(class_name))
            .or_insert_with(|| Arc::new(ClassInfo::new(bytes)));
        self
    }

    /// When set, every lookup outcome (hit or miss) is memoized; otherwise
    /// only resolved entries are, trading repeat misses for less memory.
    pub fn should_cache_all(mut self, cache_all: bool) -> Self {
        self.cache_all = cache_all;
        self
    }

    pub fn build(self) -> ResolvingClassProvider {
        ResolvingClassProvider::new(self.index, self.overrides, self.cache_all)
    }
}
