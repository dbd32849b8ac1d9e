//! Where raw tape lines come from.
//!
//! A tape is either a file referenced by a document or a block of lines
//! written inline in the document. Both variants can also read any other
//! tape file on request, which is how `Source` directives are followed.

use std::path::{Path, PathBuf};

use super::read::read_lines;
use crate::diagnostic::TapeError;

/// Origin label used for inline tapes.
pub const INLINE_ORIGIN: &str = "<inline>";

/// Raw lines together with the file they were read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTape {
    /// File the lines came from, `None` for inline content.
    pub path: Option<PathBuf>,
    /// Lines exactly as written.
    pub lines: Vec<String>,
}

impl RawTape {
    /// Read a tape file.
    pub fn read(path: &Path) -> Result<Self, TapeError> {
        Ok(Self {
            path: Some(path.to_path_buf()),
            lines: read_lines(path)?,
        })
    }
}

/// Produces raw tape lines, either its own or those of an explicit path.
pub trait TapeSource {
    /// Lines of this tape when `path` is `None`, of the file at `path` otherwise.
    fn lines(&self, path: Option<&Path>) -> Result<RawTape, TapeError> {
        match path {
            Some(path) => RawTape::read(path),
            None => self.own_lines(),
        }
    }

    /// Lines of this tape.
    fn own_lines(&self) -> Result<RawTape, TapeError>;

    /// File backing this tape, if any.
    fn path(&self) -> Option<&Path> {
        None
    }
}

/// A tape stored in its own file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTape {
    path: PathBuf,
}

impl FileTape {
    /// Create a file tape. The path should already be absolute.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TapeSource for FileTape {
    fn own_lines(&self) -> Result<RawTape, TapeError> {
        RawTape::read(&self.path)
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// A tape written inline in a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineTape {
    lines: Vec<String>,
}

impl InlineTape {
    /// Create an inline tape from document content lines.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl TapeSource for InlineTape {
    fn own_lines(&self) -> Result<RawTape, TapeError> {
        Ok(RawTape {
            path: None,
            lines: self.lines.clone(),
        })
    }
}
