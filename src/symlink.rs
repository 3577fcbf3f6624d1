//! Symbolic link resolution
//!
//! Follows a chain of symbolic links to the first non-link target. The walk
//! is iterative and bounded:
//!
//! - every path in the chain is remembered (after lexical cleaning); seeing
//!   one twice fails with [`ArchiveError::SymlinkLoop`]
//! - at most [`MAX_SYMLINK_DEPTH`] hops are taken; one more fails with
//!   [`ArchiveError::SymlinkDepthExceeded`]
//! - a target that cannot be stat'd fails with
//!   [`ArchiveError::DereferenceStat`]
//!
//! State lives only for the duration of one call. Filesystem contents can
//! change between calls, so nothing is cached.

use crate::error::{ArchiveError, Result};
use crate::utils::{clean_path, read_symlink};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Maximum number of hops taken while resolving one symlink chain
pub const MAX_SYMLINK_DEPTH: usize = 40;

/// Resolve `path`, which must be a symbolic link, to its final target
///
/// Relative link targets are resolved against the directory containing the
/// link. Returns the final target path and its metadata; the metadata never
/// describes a symlink.
///
/// # Errors
///
/// - [`ArchiveError::ReadLink`] if a link in the chain cannot be read
///   (including when `path` itself is not a symlink)
/// - [`ArchiveError::SymlinkLoop`] if the chain revisits a path
/// - [`ArchiveError::SymlinkDepthExceeded`] if the chain needs more than
///   [`MAX_SYMLINK_DEPTH`] hops
/// - [`ArchiveError::DereferenceStat`] if a target does not exist
///
/// # Example
///
/// ```rust,no_run
/// use archives::follow_symlink;
/// use std::path::Path;
///
/// # fn main() -> archives::Result<()> {
/// let (target, metadata) = follow_symlink(Path::new("current"))?;
/// println!("{} -> {} ({} bytes)", "current", target.display(), metadata.len());
/// # Ok(())
/// # }
/// ```
pub fn follow_symlink(path: &Path) -> Result<(PathBuf, fs::Metadata)> {
    let mut current = clean_path(path);
    let mut visited = HashSet::new();
    visited.insert(current.clone());
    let mut hops = 0;

    loop {
        let link_target = read_symlink(&current)?;
        let next = if link_target.is_absolute() {
            clean_path(&link_target)
        } else {
            let base = current.parent().unwrap_or_else(|| Path::new(""));
            clean_path(&base.join(&link_target))
        };

        if !visited.insert(next.clone()) {
            return Err(ArchiveError::SymlinkLoop { path: next });
        }
        if hops >= MAX_SYMLINK_DEPTH {
            return Err(ArchiveError::SymlinkDepthExceeded {
                path: path.to_path_buf(),
                limit: MAX_SYMLINK_DEPTH,
            });
        }

        let metadata = fs::symlink_metadata(&next).map_err(|source| {
            ArchiveError::DereferenceStat {
                path: next.clone(),
                source,
            }
        })?;
        hops += 1;

        if !metadata.file_type().is_symlink() {
            trace!("Resolved {:?} -> {:?} in {} hop(s)", path, next, hops);
            return Ok((next, metadata));
        }
        current = next;
    }
}
