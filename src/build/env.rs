//! Per-build environment tying the cache to the host's lifecycle.
//!
//! ```text
//! read phase (per document)            env-updated phase (once)
//! ─────────────────────────            ────────────────────────
//! purge_document(doc)                  evict unreferenced, aged entries
//! process_reference(..)  ──► record    pending = keys without render.gif
//!   normalize ─► key ─► ensure_entry   resolve renderer (only if pending)
//!   └─► placeholder URI                Scheduler::run(pending)
//! merge(partial tracker)               materialize display aliases
//! ```

use std::path::{Path, PathBuf};

use super::host::DocumentHost;
use super::placeholder::{ResolvedImage, placeholder_uri, resolve_placeholder};
use crate::cache::{CacheKey, RenderCache, materialize};
use crate::config::Config;
use crate::diagnostic::{BuildError, ResolutionError, TapeError};
use crate::render::{
    Installer, LogInstallReporter, ProgressSink, RenderJob, Renderer, ResolveOptions, Scheduler,
    resolve,
};
use crate::tape::{FileTape, INLINE_ORIGIN, InlineTape, NormalizedTape, Normalizer, TapeSource};
use crate::usage::{UsageRecord, UsageTracker};

/// How a document refers to a tape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapeRef<'a> {
    /// A tape file, named as written in the document.
    File(&'a str),
    /// Tape lines written in the document itself.
    Inline(&'a [String]),
}

/// Name under which a reference's render is published.
///
/// `demo.tape` and `demo.vhs` become `demo`; other file names are kept;
/// inline tapes are `inline`.
pub fn display_name_for(reference: &TapeRef<'_>) -> String {
    match reference {
        TapeRef::File(name) => {
            let file_name = Path::new(name)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(name);
            file_name
                .strip_suffix(".tape")
                .or_else(|| file_name.strip_suffix(".vhs"))
                .unwrap_or(file_name)
                .to_owned()
        }
        TapeRef::Inline(_) => "inline".to_owned(),
    }
}

/// Outcome of [`BuildEnv::env_updated`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    /// Entry directories removed by eviction.
    pub evicted: Vec<PathBuf>,
    /// Canonical renders produced.
    pub rendered: usize,
    /// Display aliases newly created.
    pub linked: usize,
}

/// Render cache state of one documentation build.
#[derive(Debug, Clone)]
pub struct BuildEnv {
    config: Config,
    srcdir: PathBuf,
    cache: RenderCache,
    usage: UsageTracker,
}

impl BuildEnv {
    /// Create an environment whose cache lives under `doctree_dir`.
    ///
    /// A relative `doctree_dir` is taken against the current directory, not
    /// against the renderer's working directory.
    pub fn new(config: Config, srcdir: impl Into<PathBuf>, doctree_dir: &Path) -> Self {
        let doctree_dir = std::path::absolute(doctree_dir).unwrap_or_else(|_| doctree_dir.to_path_buf());
        let cache = RenderCache::new(doctree_dir.join(&config.cache_dir_name));
        Self {
            config,
            srcdir: srcdir.into(),
            cache,
            usage: UsageTracker::new(),
        }
    }

    /// Resume from usage records of a previous build.
    pub fn with_usage(mut self, usage: UsageTracker) -> Self {
        self.usage = usage;
        self
    }

    /// Build configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The render cache.
    pub fn cache(&self) -> &RenderCache {
        &self.cache
    }

    /// References recorded so far.
    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    fn cwd(&self) -> &Path {
        self.config.cwd.as_deref().unwrap_or(&self.srcdir)
    }

    fn normalizer(&self) -> Normalizer {
        let srcdir = self
            .srcdir
            .canonicalize()
            .unwrap_or_else(|_| self.srcdir.clone());
        Normalizer::new(self.cwd()).with_srcdir(srcdir)
    }

    /// Handle a tape reference at `document:lineno`.
    ///
    /// Normalizes the tape (every file read is reported to the host as a
    /// dependency of `document`), creates its cache entry and records the
    /// usage. Returns the placeholder URI for the image node.
    pub fn process_reference<H>(
        &mut self,
        host: &mut H,
        document: &str,
        lineno: usize,
        reference: TapeRef<'_>,
    ) -> Result<String, BuildError>
    where
        H: DocumentHost + ?Sized,
    {
        let normalizer = self.normalizer();
        let tape_error = |source: TapeError| BuildError::Tape {
            document: document.to_owned(),
            lineno,
            source,
        };

        let (tape, origin) = match reference {
            TapeRef::File(name) => {
                let path = host.relfn2path(name, document);
                let origin = path
                    .strip_prefix(host.srcdir())
                    .unwrap_or(&path)
                    .display()
                    .to_string();
                let tape = normalize_into(&normalizer, &FileTape::new(path), host, document)
                    .map_err(tape_error)?;
                (tape, origin)
            }
            TapeRef::Inline(lines) => {
                let source = InlineTape::new(lines.iter().cloned());
                let tape = normalize_into(&normalizer, &source, host, document).map_err(tape_error)?;
                (tape, INLINE_ORIGIN.to_owned())
            }
        };

        let key = CacheKey::of(&tape);
        let entry = self.cache.ensure_entry(&key, &tape)?;
        let display_name = display_name_for(&reference);
        let uri = placeholder_uri(&entry.display_file(&display_name));

        self.usage.record(UsageRecord {
            document: document.to_owned(),
            lineno,
            key,
            display_name,
            origin,
        });
        Ok(uri)
    }

    /// Forget every reference of `document`, before it is read again.
    pub fn purge_document(&mut self, document: &str) -> usize {
        self.usage.purge(document)
    }

    /// Merge references collected by a parallel reader.
    pub fn merge(&mut self, other: &UsageTracker) {
        self.usage.merge(other);
    }

    /// Turn a placeholder URI into the final image reference.
    pub fn resolve_placeholder(&self, uri: &str) -> Option<ResolvedImage> {
        resolve_placeholder(uri)
    }

    /// Evict, render what is missing and publish display aliases.
    ///
    /// Resolves the renderer with [`resolve`], installing it through
    /// `installer` when allowed.
    pub fn env_updated<H>(
        &self,
        host: &H,
        installer: Option<&dyn Installer>,
        progress: &dyn ProgressSink,
    ) -> Result<BuildSummary, BuildError>
    where
        H: DocumentHost + ?Sized,
    {
        let reporter = LogInstallReporter::stderr(self.config.verbosity);
        self.env_updated_with(host, |options| resolve(options, installer, &reporter), progress)
    }

    /// Like [`BuildEnv::env_updated`], with a custom renderer factory.
    ///
    /// `make_renderer` is called at most once, and only when some referenced
    /// entry has no canonical render.
    pub fn env_updated_with<H, F, R>(
        &self,
        host: &H,
        make_renderer: F,
        progress: &dyn ProgressSink,
    ) -> Result<BuildSummary, BuildError>
    where
        H: DocumentHost + ?Sized,
        F: FnOnce(&ResolveOptions) -> Result<R, ResolutionError>,
        R: Renderer,
    {
        let evicted = self
            .cache
            .evict_unreferenced(&self.usage.referenced_keys(), self.config.retention)?;

        let groups = self.usage.grouped_by_key();
        let jobs: Vec<RenderJob> = groups
            .iter()
            .filter(|(key, _)| !self.cache.is_rendered(key))
            .filter_map(|(key, records)| {
                let first = records.first()?;
                Some(RenderJob {
                    entry: self.cache.entry(key),
                    doc_path: host.doc2path(&first.document),
                    lineno: first.lineno,
                    origin: first.origin.clone(),
                })
            })
            .collect();

        let mut rendered = 0;
        if !jobs.is_empty() {
            let options = ResolveOptions::from_config(&self.config, &self.srcdir);
            let renderer = make_renderer(&options)?;
            rendered = Scheduler::new(self.config.parallel).run(&jobs, &renderer, progress)?;
        }

        let mut linked = 0;
        for (key, records) in &groups {
            let mut names: Vec<&str> = records.iter().map(|r| r.display_name.as_str()).collect();
            names.sort_unstable();
            names.dedup();
            linked += materialize(&self.cache.entry(key), names)?.len();
        }

        Ok(BuildSummary {
            evicted,
            rendered,
            linked,
        })
    }
}

fn normalize_into<S, H>(
    normalizer: &Normalizer,
    source: &S,
    host: &mut H,
    document: &str,
) -> Result<NormalizedTape, TapeError>
where
    S: TapeSource + ?Sized,
    H: DocumentHost + ?Sized,
{
    normalizer.normalize_each(source, |path| host.note_dependency(document, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names() {
        assert_eq!(display_name_for(&TapeRef::File("tapes/demo.tape")), "demo");
        assert_eq!(display_name_for(&TapeRef::File("demo.vhs")), "demo");
        assert_eq!(display_name_for(&TapeRef::File("demo.txt")), "demo.txt");
        assert_eq!(display_name_for(&TapeRef::Inline(&[])), "inline");
    }

    #[test]
    fn test_relative_doctree_gives_absolute_cache_root() {
        let env = BuildEnv::new(Config::default(), "docs", Path::new("_build/doctrees"));
        let root = env.cache().root();
        assert!(root.is_absolute());
        assert!(root.ends_with("_build/doctrees/vhs_tapes_cache"));
        assert!(root.starts_with(std::env::current_dir().unwrap()));
    }
}
