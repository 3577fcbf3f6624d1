//! Mapping on-disk paths to names inside an archive
//!
//! When a caller asks to archive `root_on_disk`, every path discovered under
//! it needs a canonical, forward-slash name in the archive. The caller can
//! relocate the root with `root_in_archive`:
//!
//! | root on disk | rename  | discovered | name in archive |
//! |--------------|---------|------------|-----------------|
//! | `a/b`        |         | `a/b/c`    | `b/c`           |
//! | `a/b/`       |         | `a/b/c`    | `c`             |
//! | `a/b`        | `foo`   | `a/b/c`    | `foo/c`         |
//! | `a`          | `foo/`  | `a/b/c`    | `foo/a/b/c`     |
//! | `a/`         | `foo`   | `a/b/c`    | `foo/b/c`       |
//!
//! A trailing separator on the root means "the contents, not the directory
//! itself". A trailing separator on the rename means "place the root inside
//! this directory" rather than "call the root this".

use crate::error::{ArchiveError, Result};
use crate::utils::is_separator;

/// Compute the in-archive name for a path found while walking a root
///
/// `name_on_disk` must have `root_on_disk` as a literal prefix, which is
/// what a directory walk rooted at `root_on_disk` produces. `root_in_archive`
/// may be empty or `"."` (keep the root's own name), a bare name (rename the
/// root) or a name ending in a separator (nest the root under it).
///
/// The result is always `/`-separated with no empty segments. An empty
/// result is possible for the root itself when only its contents were
/// requested.
///
/// # Errors
///
/// - [`ArchiveError::InvalidPath`] if `name_on_disk` does not start with `root_on_disk`
///
/// # Example
///
/// ```rust
/// use archives::name_on_disk_to_name_in_archive;
///
/// # fn main() -> archives::Result<()> {
/// assert_eq!(name_on_disk_to_name_in_archive("a/b/c", "a/b", "")?, "b/c");
/// assert_eq!(name_on_disk_to_name_in_archive("a/b/c", "a/b", "foo/")?, "foo/b/c");
/// # Ok(())
/// # }
/// ```
pub fn name_on_disk_to_name_in_archive(
    name_on_disk: &str,
    root_on_disk: &str,
    root_in_archive: &str,
) -> Result<String> {
    let beyond = name_on_disk.strip_prefix(root_on_disk).ok_or_else(|| {
        ArchiveError::invalid_path(format!(
            "{:?} is not under archive root {:?}",
            name_on_disk, root_on_disk
        ))
    })?;

    let root_has_trailing_sep = root_on_disk.ends_with(is_separator);
    if !root_has_trailing_sep && !beyond.is_empty() && !beyond.starts_with(is_separator) {
        return Err(ArchiveError::invalid_path(format!(
            "{:?} is not under archive root {:?}",
            name_on_disk, root_on_disk
        )));
    }

    let own_name = if root_has_trailing_sep {
        ""
    } else {
        base_name(root_on_disk)
    };

    let name = if root_in_archive.is_empty() || root_in_archive == "." {
        join_segments(&[own_name, beyond])
    } else if !root_in_archive.ends_with(is_separator) {
        join_segments(&[root_in_archive, beyond])
    } else {
        join_segments(&[root_in_archive, own_name, beyond])
    };

    Ok(name)
}

/// Last segment of a path, ignoring `.` and `..` which cannot name anything
fn base_name(path: &str) -> &str {
    let last = path.rsplit(is_separator).next().unwrap_or("");
    match last {
        "." | ".." => "",
        // Windows drive roots such as `C:` have no usable name either
        _ if cfg!(windows) && last.ends_with(':') => "",
        _ => last,
    }
}

/// Join path fragments with `/`, splitting on either separator and dropping
/// empty and `.` segments
fn join_segments(parts: &[&str]) -> String {
    let mut joined = String::new();
    for segment in parts
        .iter()
        .flat_map(|part| part.split(is_separator))
        .filter(|segment| !segment.is_empty() && *segment != ".")
    {
        if !joined.is_empty() {
            joined.push('/');
        }
        joined.push_str(segment);
    }
    joined
}
