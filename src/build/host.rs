//! What the documentation framework provides to the build environment.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// The host documentation framework.
///
/// Documents are identified by name (`guide/install`), not by path.
pub trait DocumentHost {
    /// Root of the documentation sources.
    fn srcdir(&self) -> &Path;

    /// Source file of `document`, used in error locations.
    fn doc2path(&self, document: &str) -> PathBuf;

    /// Record that `document` must be re-read when `path` changes.
    fn note_dependency(&mut self, document: &str, path: &Path);

    /// Resolve a file name written in `document`.
    ///
    /// Names starting with `/` are relative to the source directory, others
    /// to the directory of the document's source file.
    fn relfn2path(&self, filename: &str, document: &str) -> PathBuf {
        if let Some(rooted) = filename.strip_prefix('/') {
            return self.srcdir().join(rooted);
        }
        let doc_path = self.doc2path(document);
        let base = doc_path.parent().unwrap_or_else(|| self.srcdir());
        base.join(filename)
    }
}

/// A host backed by a plain source directory.
///
/// Documents map to `<srcdir>/<name><suffix>`; dependencies are kept in
/// memory for the caller to inspect.
#[derive(Debug, Clone)]
pub struct DirHost {
    srcdir: PathBuf,
    suffix: String,
    dependencies: BTreeMap<String, BTreeSet<PathBuf>>,
}

impl DirHost {
    /// Documents are `<srcdir>/<name>.rst`.
    pub fn new(srcdir: impl Into<PathBuf>) -> Self {
        Self {
            srcdir: srcdir.into(),
            suffix: ".rst".to_owned(),
            dependencies: BTreeMap::new(),
        }
    }

    /// Use another source suffix, such as `.md`.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Files `document` depends on.
    pub fn dependencies(&self, document: &str) -> impl Iterator<Item = &Path> {
        self.dependencies
            .get(document)
            .into_iter()
            .flatten()
            .map(PathBuf::as_path)
    }
}

impl DocumentHost for DirHost {
    fn srcdir(&self) -> &Path {
        &self.srcdir
    }

    fn doc2path(&self, document: &str) -> PathBuf {
        self.srcdir.join(format!("{document}{}", self.suffix))
    }

    fn note_dependency(&mut self, document: &str, path: &Path) {
        self.dependencies
            .entry(document.to_owned())
            .or_default()
            .insert(path.to_path_buf());
    }
}
