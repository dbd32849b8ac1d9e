//! On-disk render cache.
//!
//! # Layout
//!
//! ```text
//! <root>/
//! └── <CacheKey>/
//!     ├── tape.tape             normalized tape text, written once
//!     ├── tape.partial.tape     tape text while it is being written
//!     ├── render.gif            canonical render, produced at most once
//!     └── display-<name>.gif    aliases of render.gif, one per display name
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use rustc_hash::FxHashSet;

use super::key::CacheKey;
use super::link::publish;
use crate::diagnostic::CacheError;
use crate::tape::NormalizedTape;

/// File holding the normalized tape text.
pub const TAPE_FILE: &str = "tape.tape";
/// File holding the canonical render.
pub const RENDER_FILE: &str = "render.gif";
/// Tape text being written, renamed to [`TAPE_FILE`] once complete.
pub const PARTIAL_TAPE_FILE: &str = "tape.partial.tape";
/// Renderer output target, renamed to [`RENDER_FILE`] on success.
pub const PARTIAL_RENDER_FILE: &str = "render.partial.gif";
/// Prefix of display alias file names.
pub const DISPLAY_PREFIX: &str = "display-";
/// Extension shared by the render and its aliases.
pub const RENDER_EXTENSION: &str = "gif";

// =============================================================================
// CacheEntry
// =============================================================================

/// Paths of one cache entry. Constructing it touches nothing on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheEntry {
    /// Key naming the entry directory.
    pub key: CacheKey,
    /// The entry directory.
    pub dir: PathBuf,
}

impl CacheEntry {
    fn new(root: &Path, key: CacheKey) -> Self {
        let dir = root.join(key.as_str());
        Self { key, dir }
    }

    /// Normalized tape text.
    pub fn tape_file(&self) -> PathBuf {
        self.dir.join(TAPE_FILE)
    }

    /// Where the tape text is written before it is published.
    pub fn partial_tape_file(&self) -> PathBuf {
        self.dir.join(PARTIAL_TAPE_FILE)
    }

    /// Canonical render.
    pub fn render_file(&self) -> PathBuf {
        self.dir.join(RENDER_FILE)
    }

    /// Where the renderer writes before the result is published.
    pub fn partial_render_file(&self) -> PathBuf {
        self.dir.join(PARTIAL_RENDER_FILE)
    }

    /// Alias of the render under `display_name`.
    pub fn display_file(&self, display_name: &str) -> PathBuf {
        self.dir
            .join(format!("{DISPLAY_PREFIX}{display_name}.{RENDER_EXTENSION}"))
    }

    /// Whether the canonical render exists.
    pub fn is_rendered(&self) -> bool {
        self.render_file().is_file()
    }
}

// =============================================================================
// RenderCache
// =============================================================================

/// Content-addressed store of rendered tapes.
///
/// Each worker of a render run writes only into the directory of the entry it
/// was given, so disjoint entries need no locking. Two builds sharing one root
/// at the same time are not supported.
#[derive(Debug, Clone)]
pub struct RenderCache {
    root: PathBuf,
}

impl RenderCache {
    /// Use `root` as the cache directory. Nothing is created until needed.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The cache directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Paths of the entry for `key`.
    pub fn entry(&self, key: &CacheKey) -> CacheEntry {
        CacheEntry::new(&self.root, key.clone())
    }

    /// Create the entry directory and tape file for `key` if absent.
    ///
    /// The tape file is written only when it does not exist yet, so repeated
    /// references leave its modification time alone. The text goes to a
    /// partial file first; an interrupted write never leaves a short tape.
    pub fn ensure_entry(&self, key: &CacheKey, tape: &NormalizedTape) -> Result<CacheEntry, CacheError> {
        let entry = self.entry(key);
        fs::create_dir_all(&entry.dir).map_err(|e| CacheError::io(&entry.dir, e))?;

        let tape_file = entry.tape_file();
        if tape_file.is_file() {
            return Ok(entry);
        }

        let partial = entry.partial_tape_file();
        if let Err(e) = fs::write(&partial, tape.text()) {
            let _ = fs::remove_file(&partial);
            return Err(CacheError::io(&partial, e));
        }
        fs::rename(&partial, &tape_file).map_err(|e| CacheError::io(&tape_file, e))?;
        tracing::debug!(key = %key, "created cache entry");
        Ok(entry)
    }

    /// Whether the canonical render for `key` exists.
    pub fn is_rendered(&self, key: &CacheKey) -> bool {
        self.entry(key).is_rendered()
    }

    /// Expose the render of `key` under `display_name`, returning the alias path.
    pub fn publish_display(&self, key: &CacheKey, display_name: &str) -> Result<PathBuf, CacheError> {
        let entry = self.entry(key);
        publish(&entry, display_name)?;
        Ok(entry.display_file(display_name))
    }

    /// Keys of every entry directory currently on disk.
    pub fn keys(&self) -> Result<Vec<CacheKey>, CacheError> {
        let mut keys: Vec<CacheKey> = self
            .entry_dirs()?
            .iter()
            .filter_map(|dir| dir.file_name()?.to_str().and_then(CacheKey::parse))
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Delete entries outside `referenced` whose age reached `retention`.
    ///
    /// Age is measured from the entry directory's modification time. Returns
    /// the removed directories.
    pub fn evict_unreferenced(
        &self,
        referenced: &FxHashSet<CacheKey>,
        retention: TimeDelta,
    ) -> Result<Vec<PathBuf>, CacheError> {
        self.evict_unreferenced_at(referenced, retention, Utc::now())
    }

    fn evict_unreferenced_at(
        &self,
        referenced: &FxHashSet<CacheKey>,
        retention: TimeDelta,
        now: DateTime<Utc>,
    ) -> Result<Vec<PathBuf>, CacheError> {
        tracing::debug!(root = %self.root.display(), "cleaning up old VHS files");

        let mut evicted = Vec::new();
        for dir in self.entry_dirs()? {
            let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if referenced.contains(name) {
                continue;
            }

            let modified = fs::metadata(&dir)
                .and_then(|m| m.modified())
                .map_err(|e| CacheError::io(&dir, e))?;
            let age = now - DateTime::<Utc>::from(modified);
            if age >= retention {
                tracing::debug!(dir = %dir.display(), "removing unreferenced cache entry");
                fs::remove_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;
                evicted.push(dir);
            }
        }
        Ok(evicted)
    }

    fn entry_dirs(&self) -> Result<Vec<PathBuf>, CacheError> {
        fs::create_dir_all(&self.root).map_err(|e| CacheError::io(&self.root, e))?;
        let read = fs::read_dir(&self.root).map_err(|e| CacheError::io(&self.root, e))?;

        let mut dirs = Vec::new();
        for item in read {
            let item = item.map_err(|e| CacheError::io(&self.root, e))?;
            let is_dir = item
                .file_type()
                .map_err(|e| CacheError::io(item.path(), e))?
                .is_dir();
            if is_dir {
                dirs.push(item.path());
            }
        }
        Ok(dirs)
    }
}
