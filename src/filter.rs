//! Hierarchical path filtering
//!
//! Paths are matched by ancestry rather than by glob: a prefix covers itself
//! and everything nested under it. A prefix written with a trailing `/`
//! covers only itself and true descendants, never the bare name.
//!
//! | prefix | candidate | matches |
//! |--------|-----------|---------|
//! | `a`    | `a`       | yes     |
//! | `a`    | `a/`      | yes     |
//! | `a`    | `a/b/c`   | yes     |
//! | `a`    | `aa/b`    | no      |
//! | `a/`   | `a`       | no      |
//! | `a/b`  | `a/`      | no      |
//!
//! [`SkipList`] builds on the same rule to keep a minimal set of excluded
//! roots, while [`file_is_included`] evaluates an inclusion set as-is.

use crate::utils::ARCHIVE_SEPARATOR;
use serde::{Deserialize, Serialize};

/// Whether `prefix` covers `candidate`
///
/// True when `candidate` equals `prefix`, or when `candidate` starts with
/// `prefix` followed by a separator (the separator is not doubled if
/// `prefix` already ends with one).
pub fn path_matches(prefix: &str, candidate: &str) -> bool {
    if candidate == prefix {
        return true;
    }
    if prefix.ends_with(ARCHIVE_SEPARATOR) {
        candidate.starts_with(prefix)
    } else {
        candidate
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with(ARCHIVE_SEPARATOR))
    }
}

/// Whether any path in `includes` covers `candidate`
///
/// An empty inclusion set includes nothing; callers that want "no filter"
/// should skip the check entirely.
pub fn file_is_included<S: AsRef<str>>(includes: &[S], candidate: &str) -> bool {
    includes
        .iter()
        .any(|prefix| path_matches(prefix.as_ref(), candidate))
}

/// Strip a single trailing separator for comparison purposes
fn normalize(path: &str) -> &str {
    path.strip_suffix(ARCHIVE_SEPARATOR).unwrap_or(path)
}

/// `true` if `path` lies strictly below `ancestor` (both normalized)
fn is_strictly_under(path: &str, ancestor: &str) -> bool {
    path.strip_prefix(ancestor)
        .is_some_and(|rest| rest.starts_with(ARCHIVE_SEPARATOR))
}

/// Ordered set of excluded path roots
///
/// The list never holds two entries where one is an ancestor of the other,
/// and never holds two entries that differ only by a trailing separator.
/// Adding a broader path evicts the narrower entries it subsumes; adding a
/// path already covered is a no-op.
///
/// # Example
///
/// ```rust
/// use archives::SkipList;
///
/// let mut skip = SkipList::new();
/// skip.add("a");
/// skip.add("b/c");
/// skip.add("c");
/// skip.add("b/c/d"); // covered by b/c
/// skip.add("b");     // replaces b/c
///
/// assert_eq!(skip.as_slice(), &["a", "c", "b"]);
/// assert!(skip.skips("b/x/y"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipList(Vec<String>);

impl SkipList {
    /// Create an empty skip list
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Add an exclusion root, keeping the list minimal
    pub fn add(&mut self, path: impl Into<String>) {
        let path = path.into();
        let new_norm = normalize(&path);

        let covered = self.0.iter().any(|existing| {
            let existing = normalize(existing);
            existing == new_norm || is_strictly_under(new_norm, existing)
        });
        if covered {
            return;
        }

        self.0
            .retain(|existing| !is_strictly_under(normalize(existing), new_norm));
        self.0.push(path);
    }

    /// Whether `candidate` falls under any excluded root
    pub fn skips(&self, candidate: &str) -> bool {
        file_is_included(&self.0, candidate)
    }

    /// Entries in insertion order
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Iterate over the entries in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list has no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for SkipList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut list = SkipList::new();
        list.extend(iter);
        list
    }
}

impl<S: Into<String>> Extend<S> for SkipList {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for path in iter {
            self.add(path);
        }
    }
}

impl<'a> IntoIterator for &'a SkipList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
