//! Flattening `Source` inclusions and stripping comments.
//!
//! ```text
//! a.tape                       normalized
//! ┌──────────────────────┐     ┌──────────────┐
//! │ Source common.tape   │ ──► │ Set Width 80 │  (from common.tape)
//! │ # say hi             │     │ Type "hi"    │
//! │ Type "hi"  # greet   │     │ Enter        │
//! │ Enter                │     └──────────────┘
//! └──────────────────────┘
//! ```
//!
//! Inclusion is depth-first in source order, so the same tree of files always
//! yields the same lines.

use std::mem;
use std::path::{Path, PathBuf};

use super::comment::{source_directive, strip_comment};
use super::read::resolve_path;
use super::source::{INLINE_ORIGIN, RawTape, TapeSource};
use crate::diagnostic::{IncludeChain, IncludeStep, TapeError};

/// Comment-free, inclusion-free tape content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NormalizedTape {
    lines: Vec<String>,
}

impl NormalizedTape {
    /// Wrap already-cleaned lines.
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Cleaned instruction lines in order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Lines joined by a single newline, the text that is hashed and stored.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Whether the tape has no instructions at all.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// A normalized tape and every file opened to produce it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    /// The flattened tape.
    pub tape: NormalizedTape,
    /// Files read (or attempted) while flattening, in first-visit order.
    pub dependencies: Vec<PathBuf>,
}

/// Turns tape sources into [`NormalizedTape`]s.
#[derive(Debug, Clone)]
pub struct Normalizer {
    cwd: PathBuf,
    srcdir: Option<PathBuf>,
}

impl Normalizer {
    /// Create a normalizer resolving `Source` paths against `cwd`.
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            srcdir: None,
        }
    }

    /// Report origins relative to `srcdir` in diagnostics.
    pub fn with_srcdir(mut self, srcdir: impl Into<PathBuf>) -> Self {
        self.srcdir = Some(srcdir.into());
        self
    }

    /// Normalize a tape, collecting its dependencies.
    pub fn normalize<S: TapeSource + ?Sized>(&self, source: &S) -> Result<Normalized, TapeError> {
        let mut dependencies: Vec<PathBuf> = Vec::new();
        let tape = self.normalize_each(source, |path| {
            if !dependencies.iter().any(|p| p == path) {
                dependencies.push(path.to_path_buf());
            }
        })?;
        Ok(Normalized { tape, dependencies })
    }

    /// Normalize a tape, invoking `on_dependency` for every file opened.
    ///
    /// The callback also sees files that turn out to be missing, so a host
    /// can re-read the document once they appear.
    pub fn normalize_each<S, F>(&self, source: &S, mut on_dependency: F) -> Result<NormalizedTape, TapeError>
    where
        S: TapeSource + ?Sized,
        F: FnMut(&Path),
    {
        let mut walk = Walk {
            normalizer: self,
            source,
            stack: Vec::new(),
            chain: Vec::new(),
            on_dependency: &mut on_dependency,
            lines: Vec::new(),
        };
        walk.run()?;
        Ok(NormalizedTape::new(walk.lines))
    }

    fn label(&self, path: Option<&Path>) -> String {
        match path {
            None => INLINE_ORIGIN.to_owned(),
            Some(path) => self
                .srcdir
                .as_deref()
                .and_then(|srcdir| path.strip_prefix(srcdir).ok())
                .unwrap_or(path)
                .display()
                .to_string(),
        }
    }
}

/// Depth-first traversal state for one normalization.
struct Walk<'a, S: ?Sized> {
    normalizer: &'a Normalizer,
    source: &'a S,
    /// Canonical paths of the files currently being flattened.
    stack: Vec<PathBuf>,
    /// Directives leading to the file being flattened.
    chain: Vec<IncludeStep>,
    on_dependency: &'a mut dyn FnMut(&Path),
    lines: Vec<String>,
}

impl<S: TapeSource + ?Sized> Walk<'_, S> {
    fn run(&mut self) -> Result<(), TapeError> {
        if let Some(path) = self.source.path() {
            (self.on_dependency)(path);
        }
        let raw = self.source.lines(None)?;
        self.flatten(raw)
    }

    fn include(&mut self, path: &Path) -> Result<(), TapeError> {
        (self.on_dependency)(path);
        let raw = self.source.lines(Some(path))?;
        self.flatten(raw)
    }

    fn flatten(&mut self, raw: RawTape) -> Result<(), TapeError> {
        let entered = raw.path.as_deref().map(canonical);
        let origin = self.normalizer.label(entered.as_deref());
        if let Some(path) = &entered {
            self.stack.push(path.clone());
        }

        for (index, line) in raw.lines.iter().enumerate() {
            if let Some(directive) = source_directive(line) {
                let target = resolve_path(&self.normalizer.cwd, directive.path);
                self.chain.push(IncludeStep {
                    origin: origin.clone(),
                    directive: directive.text.trim().to_owned(),
                    lineno: index + 1,
                });
                if self.stack.contains(&target) {
                    return Err(TapeError::CircularInclude {
                        chain: IncludeChain(mem::take(&mut self.chain)),
                    });
                }
                self.include(&target)?;
                self.chain.pop();
            } else if let Some(kept) = strip_comment(line) {
                self.lines.push(kept.to_owned());
            }
        }

        if entered.is_some() {
            self.stack.pop();
        }
        Ok(())
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tape::{FileTape, InlineTape};
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn normalizer(dir: &TempDir) -> Normalizer {
        Normalizer::new(dir.path()).with_srcdir(dir.path().canonicalize().unwrap())
    }

    #[test]
    fn test_strips_comments_and_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.tape", "type hello\n# a comment\n\nSleep 1s   \n");

        let result = normalizer(&dir).normalize(&FileTape::new(&path)).unwrap();
        assert_eq!(result.tape.lines(), ["type hello", "Sleep 1s"]);
        assert_eq!(result.tape.text(), "type hello\nSleep 1s");
        assert_eq!(result.dependencies, vec![path]);
    }

    #[test]
    fn test_inline_with_include_depth_first() {
        let dir = TempDir::new().unwrap();
        write(&dir, "inner.tape", "Type inner\n");
        let outer = write(&dir, "outer.tape", "Type outer-start\nSource inner.tape\nType outer-end\n");

        let tape = InlineTape::new(["Type first", "Source 'outer.tape'", "Type last # done"]);
        let result = normalizer(&dir).normalize(&tape).unwrap();

        assert_eq!(
            result.tape.lines(),
            ["Type first", "Type outer-start", "Type inner", "Type outer-end", "Type last"]
        );
        assert_eq!(result.dependencies.len(), 2);
        assert_eq!(result.dependencies[0], outer.canonicalize().unwrap());
    }

    #[test]
    fn test_same_content_different_sources_equal() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.tape", "type hello\n# a comment\nSleep 1s\n");

        let from_file = normalizer(&dir).normalize(&FileTape::new(&path)).unwrap();
        let inline = InlineTape::new(["type hello   ", "Sleep 1s # pause"]);
        let from_inline = normalizer(&dir).normalize(&inline).unwrap();
        assert_eq!(from_file.tape, from_inline.tape);
    }

    #[test]
    fn test_repeated_include_is_not_a_cycle() {
        let dir = TempDir::new().unwrap();
        write(&dir, "common.tape", "Set Width 80\n");
        let path = write(&dir, "a.tape", "Source common.tape\nSource common.tape\n");

        let result = normalizer(&dir).normalize(&FileTape::new(&path)).unwrap();
        assert_eq!(result.tape.lines(), ["Set Width 80", "Set Width 80"]);
    }

    #[test]
    fn test_self_include_detected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.tape", "Type x\nSource a.tape\n");

        let err = normalizer(&dir).normalize(&FileTape::new(&path)).unwrap_err();
        match err {
            TapeError::CircularInclude { chain } => {
                assert_eq!(chain.steps().len(), 1);
                assert_eq!(chain.steps()[0].origin, "a.tape");
                assert_eq!(chain.steps()[0].lineno, 2);
                assert_eq!(chain.steps()[0].directive, "Source a.tape");
            }
            other => panic!("expected circular include, got {other}"),
        }
    }

    #[test]
    fn test_transitive_cycle_reports_chain() {
        let dir = TempDir::new().unwrap();
        write(&dir, "b.tape", "Source c.tape\n");
        write(&dir, "c.tape", "# loop back\nSource b.tape\n");
        let tape = InlineTape::new(["Source b.tape"]);

        let err = normalizer(&dir).normalize(&tape).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("-> <inline>:1: Source b.tape"));
        assert!(msg.contains("-> b.tape:1: Source c.tape"));
        assert!(msg.contains("-> c.tape:2: Source b.tape"));
    }

    #[test]
    fn test_missing_include_is_read_error_and_dependency() {
        let dir = TempDir::new().unwrap();
        let tape = InlineTape::new(["Source missing.tape"]);

        let mut seen = Vec::new();
        let err = normalizer(&dir)
            .normalize_each(&tape, |p| seen.push(p.to_path_buf()))
            .unwrap_err();
        assert!(matches!(err, TapeError::Read { .. }));
        assert_eq!(seen, vec![dir.path().join("missing.tape")]);
    }

    #[test]
    fn test_missing_top_level_file() {
        let dir = TempDir::new().unwrap();
        let err = normalizer(&dir)
            .normalize(&FileTape::new(dir.path().join("gone.tape")))
            .unwrap_err();
        assert!(err.to_string().contains("path does not exist"));
    }
}
