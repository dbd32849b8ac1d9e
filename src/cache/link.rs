//! Publishing display aliases of canonical renders.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::store::CacheEntry;
use crate::diagnostic::CacheError;

/// How an alias was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasKind {
    /// The alias already existed.
    Existing,
    /// Hard link to the canonical render.
    HardLink,
    /// Byte copy, used when the filesystem refused to link.
    Copy,
}

/// Create `alias` pointing at `target`, preferring a hard link.
///
/// Any linking failure (cross-device, unsupported filesystem) degrades to a
/// full copy. An alias that already exists, even as a dangling symlink, is
/// left alone.
pub fn link_or_copy(target: &Path, alias: &Path) -> Result<AliasKind, CacheError> {
    if fs::symlink_metadata(alias).is_ok() {
        tracing::debug!(target = %target.display(), alias = %alias.display(), "already linked");
        return Ok(AliasKind::Existing);
    }

    tracing::debug!(target = %target.display(), alias = %alias.display(), "make link");
    match fs::hard_link(target, alias) {
        Ok(()) => Ok(AliasKind::HardLink),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(AliasKind::Existing),
        Err(e) => {
            tracing::warn!(
                alias = %alias.display(),
                error = %e,
                "cannot hard link render, copying instead"
            );
            fs::copy(target, alias).map_err(|e| CacheError::io(alias, e))?;
            Ok(AliasKind::Copy)
        }
    }
}

/// Publish one display alias of a rendered entry.
pub fn publish(entry: &CacheEntry, display_name: &str) -> Result<AliasKind, CacheError> {
    if !entry.is_rendered() {
        return Err(CacheError::NotRendered {
            key: entry.key.to_string(),
        });
    }
    link_or_copy(&entry.render_file(), &entry.display_file(display_name))
}

/// Publish every display alias of a rendered entry.
///
/// Must run after the entry's canonical render exists. Returns the alias
/// paths that were newly created.
pub fn materialize<'a, I>(entry: &CacheEntry, display_names: I) -> Result<Vec<PathBuf>, CacheError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut created = Vec::new();
    for name in display_names {
        if publish(entry, name)? != AliasKind::Existing {
            created.push(entry.display_file(name));
        }
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheKey, RenderCache};
    use crate::tape::NormalizedTape;
    use tempfile::TempDir;

    fn rendered_entry(root: &TempDir) -> CacheEntry {
        let cache = RenderCache::new(root.path());
        let tape = NormalizedTape::new(vec!["Type hi".into()]);
        let entry = cache.ensure_entry(&CacheKey::of(&tape), &tape).unwrap();
        fs::write(entry.render_file(), b"GIF89a").unwrap();
        entry
    }

    #[test]
    fn test_materialize_creates_each_alias_once() {
        let root = TempDir::new().unwrap();
        let entry = rendered_entry(&root);

        let created = materialize(&entry, ["a", "inline"]).unwrap();
        assert_eq!(created.len(), 2);
        for name in ["a", "inline"] {
            assert_eq!(fs::read(entry.display_file(name)).unwrap(), b"GIF89a");
        }

        let again = materialize(&entry, ["a", "inline"]).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn test_publish_requires_render() {
        let root = TempDir::new().unwrap();
        let cache = RenderCache::new(root.path());
        let tape = NormalizedTape::new(vec!["Type nope".into()]);
        let key = CacheKey::of(&tape);
        cache.ensure_entry(&key, &tape).unwrap();

        let err = cache.publish_display(&key, "x").unwrap_err();
        assert!(matches!(err, CacheError::NotRendered { .. }));
    }

    #[test]
    fn test_link_or_copy_existing_alias_untouched() {
        let root = TempDir::new().unwrap();
        let entry = rendered_entry(&root);
        let alias = entry.display_file("kept");
        fs::write(&alias, b"old").unwrap();

        assert_eq!(link_or_copy(&entry.render_file(), &alias).unwrap(), AliasKind::Existing);
        assert_eq!(fs::read(&alias).unwrap(), b"old");
    }

    #[test]
    fn test_link_or_copy_missing_target_fails() {
        let root = TempDir::new().unwrap();
        let err = link_or_copy(&root.path().join("none.gif"), &root.path().join("alias.gif"));
        assert!(err.is_err());
    }
}
