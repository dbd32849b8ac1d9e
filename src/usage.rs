//! Which cache entries the current documentation tree references.
//!
//! The tracker belongs to one build environment. Its only mutation entry
//! points are [`UsageTracker::record`], [`UsageTracker::purge`] and
//! [`UsageTracker::merge`]; the host serializes calls to them.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::cache::CacheKey;
use crate::diagnostic::CacheError;

/// A tape reference found while reading a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Document containing the reference.
    pub document: String,
    /// Line of the reference in the document.
    pub lineno: usize,
    /// Key of the normalized tape.
    pub key: CacheKey,
    /// Name the render is published under for this reference.
    pub display_name: String,
    /// Referenced tape path, or `<inline>`.
    pub origin: String,
}

/// Value-deduplicated set of [`UsageRecord`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageTracker {
    records: FxHashSet<UsageRecord>,
}

impl UsageTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record. Returns `false` if an identical record was already present.
    pub fn record(&mut self, record: UsageRecord) -> bool {
        self.records.insert(record)
    }

    /// Drop every record of `document`, before it is read again.
    pub fn purge(&mut self, document: &str) -> usize {
        let before = self.records.len();
        self.records.retain(|r| r.document != document);
        before - self.records.len()
    }

    /// Union the records of a partial build into this tracker.
    ///
    /// Commutative and idempotent: merging the same partial result twice adds
    /// nothing the second time.
    pub fn merge(&mut self, other: &UsageTracker) {
        self.records.extend(other.records.iter().cloned());
    }

    /// Every key referenced by at least one record.
    pub fn referenced_keys(&self) -> FxHashSet<CacheKey> {
        self.records.iter().map(|r| r.key.clone()).collect()
    }

    /// Records grouped by key, each group sorted by document, line, name, origin.
    ///
    /// The first record of a group is the canonical origin used for error
    /// context when the key has to be rendered.
    pub fn grouped_by_key(&self) -> BTreeMap<CacheKey, Vec<UsageRecord>> {
        let mut groups: BTreeMap<CacheKey, Vec<UsageRecord>> = BTreeMap::new();
        for record in &self.records {
            groups.entry(record.key.clone()).or_default().push(record.clone());
        }
        for records in groups.values_mut() {
            records.sort_by(|a, b| {
                (&a.document, a.lineno, &a.display_name, &a.origin)
                    .cmp(&(&b.document, b.lineno, &b.display_name, &b.origin))
            });
        }
        groups
    }

    /// Iterate over all records in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &UsageRecord> {
        self.records.iter()
    }

    /// Number of distinct records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing is referenced.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Persist the records as JSON.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        let mut sorted: Vec<&UsageRecord> = self.records.iter().collect();
        sorted.sort();
        let json = serde_json::to_vec_pretty(&sorted).map_err(|source| CacheError::Persist {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|e| CacheError::io(path, e))
    }

    /// Restore records saved by [`UsageTracker::save`].
    pub fn load(path: &Path) -> Result<Self, CacheError> {
        let bytes = fs::read(path).map_err(|e| CacheError::io(path, e))?;
        let records: Vec<UsageRecord> =
            serde_json::from_slice(&bytes).map_err(|source| CacheError::Persist {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            records: records.into_iter().collect(),
        })
    }
}

impl Extend<UsageRecord> for UsageTracker {
    fn extend<T: IntoIterator<Item = UsageRecord>>(&mut self, iter: T) {
        self.records.extend(iter);
    }
}

impl FromIterator<UsageRecord> for UsageTracker {
    fn from_iter<T: IntoIterator<Item = UsageRecord>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
