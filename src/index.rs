//! Package index over library roots.
//!
//! Each `add_library` call contributes one root (a directory tree or an
//! archive mount) and records, for every directory in it, which roots
//! contain a directory of that relative path. Lookup then only probes the
//! roots known to contain the class's package instead of every library on
//! the classpath. Contributions are additive: overlapping packages keep all
//! their roots, in the order the libraries were added.

use anyhow::{Context, Result, bail};
use ignore::WalkBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use crate::mount::ArchiveMount;
use crate::name;

const METADATA_PREFIX: &str = "META-INF";

/// One classpath element contributing classes to resolution.
pub enum LibraryRoot {
    Directory(PathBuf),
    Archive(ArchiveMount),
}

impl LibraryRoot {
    pub fn describe(&self) -> String {
        match self {
            LibraryRoot::Directory(dir) => dir.display().to_string(),
            LibraryRoot::Archive(mount) => mount.path().display().to_string(),
        }
    }

    /// Reads a root-relative file fully; `Ok(None)` when it does not exist.
    fn read(&self, relative: &str) -> Result<Option<Vec<u8>>> {
        match self {
            LibraryRoot::Directory(dir) => {
                let path = dir.join(relative);
                match std::fs::read(&path) {
                    Ok(bytes) => Ok(Some(bytes)),
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
                    Err(err) => Err(err)
                        .with_context(|| format!("failed to read class file: {}", path.display())),
                }
            }
            LibraryRoot::Archive(mount) => mount.read(relative),
        }
    }

    fn open_stream(&self, relative: &str) -> Result<Option<Box<dyn Read + Send>>> {
        match self {
            LibraryRoot::Directory(dir) => {
                let path = dir.join(relative);
                match File::open(&path) {
                    Ok(file) => Ok(Some(Box::new(file))),
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
                    Err(err) => Err(err)
                        .with_context(|| format!("failed to open class file: {}", path.display())),
                }
            }
            LibraryRoot::Archive(mount) => Ok(mount
                .read(relative)?
                .map(|bytes| Box::new(Cursor::new(bytes)) as Box<dyn Read + Send>)),
        }
    }

    fn close(&self) -> Result<()> {
        match self {
            LibraryRoot::Directory(_) => Ok(()),
            LibraryRoot::Archive(mount) => mount.close(),
        }
    }
}

/// Maps package-relative directory paths to the roots containing them.
/// Immutable once the owning provider is built.
#[derive(Default)]
pub struct LibraryIndex {
    roots: Vec<LibraryRoot>,
    packages: HashMap<String, Vec<usize>>,
}

impl LibraryIndex {
    /// Adds one library. Directories are indexed in place; regular files are
    /// opened as archive mounts; a path that is neither is silently skipped,
    /// since libraries may be optional in a build configuration.
    pub fn add_library(&mut self, path: &Path) -> Result<()> {
        if path.is_dir() {
            let root_id = self.roots.len();
            self.roots.push(LibraryRoot::Directory(path.to_path_buf()));
            self.index_directory(path.to_path_buf(), root_id)?;
        } else if path.is_file() {
            let mount = ArchiveMount::open(path)
                .with_context(|| format!("could not add library: {}", path.display()))?;
            let dirs: Vec<String> = mount
                .dir_paths()
                .filter(|dir| !is_metadata_path(dir))
                .map(str::to_string)
                .collect();
            let root_id = self.roots.len();
            self.roots.push(LibraryRoot::Archive(mount));
            let recorded = dirs.len();
            for dir in dirs {
                self.record(dir, root_id);
            }
            log::debug!("indexed {recorded} packages from {}", path.display());
        } else {
            log::debug!("skipping missing library: {}", path.display());
        }
        Ok(())
    }

    fn index_directory(&mut self, root_dir: PathBuf, root_id: usize) -> Result<()> {
        let walker = WalkBuilder::new(&root_dir)
            .hidden(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .build();

        let mut recorded = 0usize;
        for entry in walker {
            let entry = entry
                .with_context(|| format!("could not add library: {}", root_dir.display()))?;
            if !entry.file_type().is_some_and(|t| t.is_dir()) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&root_dir) else {
                continue;
            };
            let relative = relative.to_string_lossy().replace('\\', "/");
            if is_metadata_path(&relative) {
                continue;
            }
            self.record(relative, root_id);
            recorded += 1;
        }
        log::debug!("indexed {recorded} packages from {}", root_dir.display());
        Ok(())
    }

    fn record(&mut self, package: String, root_id: usize) {
        let candidates = self.packages.entry(package).or_default();
        if !candidates.contains(&root_id) {
            candidates.push(root_id);
        }
    }

    /// Resolves a normalized class name to its bytes: probe each root
    /// recorded for the class's package, first readable match wins.
    pub fn read_class(&self, normalized: &str) -> Option<Vec<u8>> {
        let relative = format!("{normalized}.class");
        let candidates = self.packages.get(name::package_path(normalized))?;
        for &root_id in candidates {
            let root = &self.roots[root_id];
            match root.read(&relative) {
                Ok(Some(bytes)) => return Some(bytes),
                Ok(None) => {}
                Err(err) => {
                    log::debug!("skipping unreadable candidate {}: {err:#}", root.describe());
                }
            }
        }
        None
    }

    /// Like `read_class` but yields a stream and surfaces open failures
    /// instead of skipping them.
    pub fn open_class_stream(&self, normalized: &str) -> Result<Option<Box<dyn Read + Send>>> {
        let relative = format!("{normalized}.class");
        let Some(candidates) = self.packages.get(name::package_path(normalized)) else {
            return Ok(None);
        };
        for &root_id in candidates {
            if let Some(stream) = self.roots[root_id].open_stream(&relative)? {
                return Ok(Some(stream));
            }
        }
        Ok(None)
    }

    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// Closes every root, continuing past failures so one bad mount cannot
    /// leak the handles behind it.
    pub fn close_all(&self) -> Result<()> {
        let mut failures = Vec::new();
        for root in &self.roots {
            if let Err(err) = root.close() {
                failures.push(format!("{}: {err:#}", root.describe()));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            bail!("failed to close {} root(s): {}", failures.len(), failures.join("; "));
        }
    }
}

fn is_metadata_path(relative: &str) -> bool {
    relative == METADATA_PREFIX
        || relative
            .strip_prefix(METADATA_PREFIX)
            .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::{SystemTime, UNIX_EPOCH};
    use zip::write::FileOptions;

    fn temp_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "class_resolver_test_{}_{}_{}",
            std::process::id(),
            nanos,
            name
        ))
    }

    fn write_jar(path: &Path, entries: &[(&str, &[u8])]) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        let mut zip = zip::ZipWriter::new(file);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for (name, content) in entries {
            zip.start_file(*name, options)?;
            zip.write_all(content)?;
        }
        zip.finish()?;
        Ok(())
    }

    #[test]
    fn indexes_directory_library() -> Result<()> {
        let base = temp_dir("index_dir");
        std::fs::create_dir_all(base.join("org/example/pkg"))?;
        std::fs::create_dir_all(base.join("META-INF/services"))?;
        std::fs::write(base.join("org/example/pkg/A.class"), b"alpha")?;
        std::fs::write(base.join("Top.class"), b"top")?;

        let mut index = LibraryIndex::default();
        index.add_library(&base)?;

        assert_eq!(index.root_count(), 1);
        assert_eq!(index.read_class("org/example/pkg/A"), Some(b"alpha".to_vec()));
        // default package resolves through the root ("") entry
        assert_eq!(index.read_class("Top"), Some(b"top".to_vec()));
        assert_eq!(index.read_class("org/example/pkg/B"), None);
        assert_eq!(index.read_class("org/elsewhere/A"), None);

        let _ = std::fs::remove_dir_all(base);
        Ok(())
    }

    #[test]
    fn indexes_archive_library() -> Result<()> {
        let base = temp_dir("index_jar");
        let jar = base.join("lib.jar");
        write_jar(
            &jar,
            &[
                ("org/example/A.class", b"from-jar"),
                ("META-INF/MANIFEST.MF", b""),
            ],
        )?;

        let mut index = LibraryIndex::default();
        index.add_library(&jar)?;

        assert_eq!(index.read_class("org/example/A"), Some(b"from-jar".to_vec()));
        assert_eq!(index.read_class("META-INF/MANIFEST"), None);

        index.close_all()?;
        let _ = std::fs::remove_dir_all(base);
        Ok(())
    }

    #[test]
    fn missing_library_is_a_silent_noop() -> Result<()> {
        let mut index = LibraryIndex::default();
        index.add_library(Path::new("/definitely/not/here.jar"))?;
        assert_eq!(index.root_count(), 0);
        assert_eq!(index.package_count(), 0);
        Ok(())
    }

    #[test]
    fn first_added_root_wins_on_overlap() -> Result<()> {
        let base = temp_dir("index_overlap");
        let first = base.join("first");
        let second = base.join("second");
        std::fs::create_dir_all(first.join("com/example"))?;
        std::fs::create_dir_all(second.join("com/example"))?;
        std::fs::write(first.join("com/example/A.class"), b"X")?;
        std::fs::write(second.join("com/example/A.class"), b"Y")?;
        std::fs::write(second.join("com/example/OnlySecond.class"), b"Z")?;

        let mut index = LibraryIndex::default();
        index.add_library(&first)?;
        index.add_library(&second)?;

        assert_eq!(index.read_class("com/example/A"), Some(b"X".to_vec()));
        // falls through to the second root when the first lacks the class
        assert_eq!(index.read_class("com/example/OnlySecond"), Some(b"Z".to_vec()));

        let _ = std::fs::remove_dir_all(base);
        Ok(())
    }

    #[test]
    fn metadata_directories_are_not_indexed() -> Result<()> {
        let base = temp_dir("index_meta");
        std::fs::create_dir_all(base.join("META-INF/versions"))?;
        std::fs::write(base.join("META-INF/versions/Hidden.class"), b"h")?;
        std::fs::create_dir_all(base.join("META-INFRA"))?;
        std::fs::write(base.join("META-INFRA/Visible.class"), b"v")?;

        let mut index = LibraryIndex::default();
        index.add_library(&base)?;

        assert_eq!(index.read_class("META-INF/versions/Hidden"), None);
        // only the exact reserved prefix is excluded
        assert_eq!(index.read_class("META-INFRA/Visible"), Some(b"v".to_vec()));

        let _ = std::fs::remove_dir_all(base);
        Ok(())
    }

    #[test]
    fn stream_lookup_matches_read() -> Result<()> {
        let base = temp_dir("index_stream");
        std::fs::create_dir_all(base.join("p"))?;
        std::fs::write(base.join("p/A.class"), b"stream-me")?;

        let mut index = LibraryIndex::default();
        index.add_library(&base)?;

        let mut out = Vec::new();
        index
            .open_class_stream("p/A")?
            .expect("stream should exist")
            .read_to_end(&mut out)?;
        assert_eq!(out, b"stream-me");
        assert!(index.open_class_stream("p/B")?.is_none());

        let _ = std::fs::remove_dir_all(base);
        Ok(())
    }
}
