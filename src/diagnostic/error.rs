//! Error types for tape normalization, caching, renderer resolution and rendering.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

// ============================================================================
// Normalization
// ============================================================================

/// One `Source` directive on the active inclusion stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeStep {
    /// File (or `<inline>`) containing the directive.
    pub origin: String,
    /// The directive text as written.
    pub directive: String,
    /// 1-based line number of the directive in `origin`.
    pub lineno: usize,
}

/// Chain of `Source` directives, outermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeChain(pub Vec<IncludeStep>);

impl IncludeChain {
    /// Steps from outermost to innermost.
    pub fn steps(&self) -> &[IncludeStep] {
        &self.0
    }
}

impl fmt::Display for IncludeChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.0 {
            write!(f, "\n  -> {}:{}: {}", step.origin, step.lineno, step.directive)?;
        }
        Ok(())
    }
}

/// Errors raised while turning a tape into its normalized form.
///
/// These are local to the document that references the tape: the host
/// reports them at the reference and keeps building other pages.
#[derive(Debug, Error)]
pub enum TapeError {
    /// A tape file is missing, is not a regular file, or cannot be decoded.
    #[error("cannot read tape {}: {reason}", .path.display())]
    Read {
        /// The offending path.
        path: PathBuf,
        /// Human-readable reason.
        reason: String,
    },

    /// `Source` directives revisit a file already on the inclusion stack.
    #[error("circular include detected in this tape:{chain}")]
    CircularInclude {
        /// Directives from the top-level tape down to the one closing the cycle.
        chain: IncludeChain,
    },
}

impl TapeError {
    pub(crate) fn read(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Read {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Cache
// ============================================================================

/// Errors from the on-disk render cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem operation failed.
    #[error("cache I/O error at {}: {source}", .path.display())]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// A display alias was requested before the canonical render exists.
    #[error("entry {key} has no canonical render yet")]
    NotRendered {
        /// Key of the entry.
        key: String,
    },

    /// Usage records could not be persisted or restored.
    #[error("failed to persist usage records at {}: {source}", .path.display())]
    Persist {
        /// The state file.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// ============================================================================
// Renderer
// ============================================================================

/// A renderer binary that was found but could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedCandidate {
    /// Path of the binary.
    pub program: PathBuf,
    /// Why it was rejected.
    pub reason: String,
}

/// No compatible renderer is installed or installable.
///
/// Raised once, before any rendering begins, and fatal for the whole build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionError {
    /// Inclusive lower version bound that was requested.
    pub min_version: String,
    /// Exclusive upper version bound that was requested.
    pub max_version: String,
    /// Candidates that were probed and rejected.
    pub rejected: Vec<RejectedCandidate>,
    /// Installation failure, when installing was attempted.
    pub install_error: Option<String>,
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no compatible vhs binary found (need >= {}, < {})",
            self.min_version, self.max_version
        )?;
        for candidate in &self.rejected {
            write!(
                f,
                "\n  {}: {}",
                candidate.program.display(),
                candidate.reason
            )?;
        }
        if let Some(err) = &self.install_error {
            write!(f, "\n  installation failed: {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ResolutionError {}

/// A single render invocation failed.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The renderer process could not be started.
    #[error("failed to launch {}: {source}", .program.display())]
    Spawn {
        /// The renderer binary.
        program: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// The renderer ran and reported failure.
    #[error("vhs failed to render {} ({status}){output}", .tape.display())]
    Failed {
        /// The tape being rendered.
        tape: PathBuf,
        /// Exit status description.
        status: String,
        /// Captured stderr followed by stdout, indented for display.
        output: String,
    },
}

impl RenderError {
    /// Build a [`RenderError::Failed`] from raw process output.
    pub fn failed(tape: impl Into<PathBuf>, status: impl Into<String>, output: &str) -> Self {
        Self::Failed {
            tape: tape.into(),
            status: status.into(),
            output: indent_output(output),
        }
    }
}

fn indent_output(output: &str) -> String {
    let output = output.trim_end();
    if output.is_empty() {
        return String::new();
    }
    let mut result = String::from(":");
    for line in output.lines() {
        result.push_str("\n    ");
        result.push_str(line);
    }
    result
}

// ============================================================================
// Build
// ============================================================================

/// Top-level error of a documentation build step.
///
/// Every variant except [`BuildError::Tape`] aborts the build: renders that
/// already finished stay in the cache and are reused by the next run.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A tape referenced by `document` could not be normalized.
    #[error("{document}:{lineno}: {source}")]
    Tape {
        /// Document containing the reference.
        document: String,
        /// Line of the reference.
        lineno: usize,
        /// What went wrong.
        source: TapeError,
    },

    /// No usable renderer.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// Rendering a tape failed.
    #[error("at {}:{lineno}:\n{source}", .doc_path.display())]
    Render {
        /// Source file of the document owning the reference.
        doc_path: PathBuf,
        /// Line of the reference.
        lineno: usize,
        /// What went wrong.
        source: RenderError,
    },

    /// Cache store failure.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl BuildError {
    /// Whether this error must abort the whole build.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Tape { .. })
    }

    /// Originating document (or its source path) and line, when known.
    pub fn location(&self) -> Option<(String, usize)> {
        match self {
            Self::Tape {
                document, lineno, ..
            } => Some((document.clone(), *lineno)),
            Self::Render {
                doc_path, lineno, ..
            } => Some((doc_path.display().to_string(), *lineno)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> IncludeChain {
        IncludeChain(vec![
            IncludeStep {
                origin: "a.tape".into(),
                directive: "Source b.tape".into(),
                lineno: 2,
            },
            IncludeStep {
                origin: "b.tape".into(),
                directive: "Source a.tape".into(),
                lineno: 1,
            },
        ])
    }

    #[test]
    fn test_circular_include_display() {
        let err = TapeError::CircularInclude { chain: chain() };
        assert_eq!(
            err.to_string(),
            "circular include detected in this tape:\n  -> a.tape:2: Source b.tape\n  -> b.tape:1: Source a.tape"
        );
    }

    #[test]
    fn test_read_error_display() {
        let err = TapeError::read("/docs/missing.tape", "path does not exist");
        let msg = err.to_string();
        assert!(msg.contains("missing.tape"));
        assert!(msg.contains("path does not exist"));
    }

    #[test]
    fn test_render_error_in_build_error() {
        let err = BuildError::Render {
            doc_path: PathBuf::from("docs/index.rst"),
            lineno: 12,
            source: RenderError::failed("cache/abc/tape.tape", "exit status: 1", "bad command\n"),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("at docs/index.rst:12:\n"));
        assert!(msg.contains("exit status: 1"));
        assert!(msg.ends_with("\n    bad command"));
        assert!(err.is_fatal());
        assert_eq!(err.location(), Some(("docs/index.rst".into(), 12)));
    }

    #[test]
    fn test_tape_error_is_local() {
        let err = BuildError::Tape {
            document: "index".into(),
            lineno: 3,
            source: TapeError::read("x.tape", "path is not a file"),
        };
        assert!(!err.is_fatal());
        assert!(err.to_string().starts_with("index:3: "));
    }

    #[test]
    fn test_resolution_error_lists_candidates() {
        let err = ResolutionError {
            min_version: "0.5.0".into(),
            max_version: "2.0.0".into(),
            rejected: vec![RejectedCandidate {
                program: PathBuf::from("/usr/bin/vhs"),
                reason: "version 0.4.0 is out of range".into(),
            }],
            install_error: None,
        };
        let msg = err.to_string();
        assert!(msg.contains(">= 0.5.0, < 2.0.0"));
        assert!(msg.contains("/usr/bin/vhs: version 0.4.0 is out of range"));
    }
}
