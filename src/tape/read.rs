//! Reading tape files from disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::diagnostic::TapeError;

/// Every line terminator, with `\r\n` taken as one.
static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\r\n|[\n\r\x0b\x0c\x1c-\x1e\x{85}\x{2028}\x{2029}]")
        .unwrap_or_else(|e| unreachable!("invalid line break pattern: {e}"))
});

/// Decode bytes as UTF-8, stripping BOM if present.
pub fn decode_utf8(buf: &[u8]) -> Option<&str> {
    let buf = buf.strip_prefix(b"\xef\xbb\xbf").unwrap_or(buf);
    std::str::from_utf8(buf).ok()
}

/// Read a tape file into lines.
///
/// Fails with [`TapeError::Read`] when the path is missing, is not a regular
/// file, cannot be read, or is not valid UTF-8.
pub fn read_lines(path: &Path) -> Result<Vec<String>, TapeError> {
    let meta = fs::metadata(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => TapeError::read(path, "path does not exist"),
        _ => TapeError::read(path, e.to_string()),
    })?;
    if !meta.is_file() {
        return Err(TapeError::read(path, "path is not a file"));
    }

    let bytes = fs::read(path).map_err(|e| TapeError::read(path, e.to_string()))?;
    let text = decode_utf8(&bytes).ok_or_else(|| TapeError::read(path, "invalid UTF-8"))?;
    Ok(split_lines(text))
}

/// Split `text` on any line terminator, without a trailing empty line.
pub fn split_lines(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = LINE_BREAK.split(text).map(str::to_owned).collect();
    if lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines
}

/// Resolve `path` against `base` into an absolute, canonical form.
///
/// Expands a leading `~` to the home directory, then tries `canonicalize()`
/// (resolves symlinks, `.`, `..`). A path that does not exist is returned
/// joined but not canonicalized, so the subsequent read reports it.
pub fn resolve_path(base: &Path, path: &str) -> PathBuf {
    let expanded = expand_home(path);
    let joined = if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    };
    joined.canonicalize().unwrap_or(joined)
}

fn expand_home(path: &str) -> PathBuf {
    let home = || std::env::var_os("HOME").map(PathBuf::from);
    if path == "~" {
        if let Some(home) = home() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = home()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}
