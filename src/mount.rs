//! A jar/zip archive mounted as a virtual directory tree.
//!
//! The archive is mapped once at open; entry reads go through the central
//! directory of that single mapping rather than reopening the file per
//! lookup. The mount exclusively owns the handle: whoever opened it is the
//! only party allowed to close it, and close releases the mapping exactly
//! once no matter how many index entries reference the mount.

use anyhow::{Context, Result, bail};
use memmap2::Mmap;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use zip::ZipArchive;
use zip::result::ZipError;

pub struct ArchiveMount {
    path: PathBuf,
    // zip reads need exclusive access to seek within the shared mapping;
    // None once the mount has been closed.
    archive: Mutex<Option<ZipArchive<Cursor<Mmap>>>>,
    dirs: Vec<String>,
}

impl ArchiveMount {
    pub fn open(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("failed to open archive: {}", path.display()))?;
        // SAFETY: The file is opened read-only and the mapping lives inside
        // the archive handle, so it cannot outlive the mount that owns it.
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("failed to mmap archive: {}", path.display()))?;
        let archive = ZipArchive::new(Cursor::new(mmap))
            .with_context(|| format!("failed to read zip structure: {}", path.display()))?;

        let dirs = directory_paths(archive.file_names());
        Ok(Self {
            path: path.to_path_buf(),
            archive: Mutex::new(Some(archive)),
            dirs,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every directory path present in the archive, root (`""`) included.
    pub fn dir_paths(&self) -> impl Iterator<Item = &str> {
        self.dirs.iter().map(String::as_str)
    }

    /// Reads one entry fully. `Ok(None)` means the entry does not exist;
    /// `Err` means the archive is closed or the entry could not be read.
    pub fn read(&self, entry: &str) -> Result<Option<Vec<u8>>> {
        let mut guard = lock(&self.archive);
        let Some(archive) = guard.as_mut() else {
            bail!("archive mount is closed: {}", self.path.display());
        };
        match archive.by_name(entry) {
            Ok(mut file) => {
                let mut buf = Vec::with_capacity(file.size() as usize);
                file.read_to_end(&mut buf).with_context(|| {
                    format!("failed to read {entry} from {}", self.path.display())
                })?;
                Ok(Some(buf))
            }
            Err(ZipError::FileNotFound) => Ok(None),
            Err(err) => Err(err)
                .with_context(|| format!("failed to read {entry} from {}", self.path.display())),
        }
    }

    /// Releases the archive mapping. Safe to call more than once; only the
    /// first call drops the handle.
    pub fn close(&self) -> Result<()> {
        lock(&self.archive).take();
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A poisoned lock only means another thread panicked mid-read; the
    // archive state itself is never left partially written.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Collects every directory path implied by the entry list: explicit
/// directory entries plus all ancestors of file entries.
fn directory_paths<'a>(entries: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut dirs = BTreeSet::new();
    dirs.insert(String::new());
    for entry in entries {
        let components: Vec<&str> = entry.split('/').filter(|c| !c.is_empty()).collect();
        let dir_count = if entry.ends_with('/') {
            components.len()
        } else {
            components.len().saturating_sub(1)
        };
        for depth in 1..=dir_count {
            dirs.insert(components[..depth].join("/"));
        }
    }
    dirs.into_iter().collect()
}
