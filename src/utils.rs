//! Utility functions for the archives library
//!
//! This module provides the small path and filesystem helpers shared by the
//! traversal, naming and format-driver layers.
//!
//! ## Categories of Utilities
//!
//! ### Archive Path Manipulation
//! - First-segment extraction and removal (`top_dir`, `trim_top_dir`)
//! - Separator normalization to forward slashes
//! - Lexical path cleaning (no filesystem access)
//!
//! ### File Operations
//! - Permission extraction and application (cross-platform)
//! - Symbolic link creation and reading
//!
//! ### Formatting
//! - Human-readable byte counts
//!
//! ## Example Usage
//!
//! ```rust
//! use archives::utils::{top_dir, trim_top_dir};
//!
//! assert_eq!(top_dir("a/b/c"), "a");
//! assert_eq!(trim_top_dir("a/b/c"), "b/c");
//! assert_eq!(top_dir("/abc/def"), "/abc");
//! assert_eq!(trim_top_dir("/abc/def"), "def");
//! ```

use crate::error::{ArchiveError, Result};
use std::fs;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};
use tracing::trace;

/// Separator used for every archive-facing name
pub const ARCHIVE_SEPARATOR: char = '/';

/// Whether `c` separates path segments on this host
///
/// Forward slash is always accepted; the host separator is accepted as well
/// so that on-disk paths can be handled without conversion.
#[inline]
pub fn is_separator(c: char) -> bool {
    c == ARCHIVE_SEPARATOR || c == MAIN_SEPARATOR
}

/// Return the first segment of a path
///
/// A leading separator is kept as part of the returned segment, so
/// `"/abc/def"` yields `"/abc"`. A path without any separator is returned
/// unchanged. Both separators accepted by [`is_separator`] split segments.
pub fn top_dir(path: &str) -> &str {
    let rest_start = usize::from(path.starts_with(is_separator));
    match path[rest_start..].find(is_separator) {
        Some(pos) => &path[..rest_start + pos],
        None => path,
    }
}

/// Return a path with its first segment and separator removed
///
/// A leading separator counts as the end of an empty first segment, so
/// `"/abc/def"` yields `"def"`. A path without any separator is returned
/// unchanged.
pub fn trim_top_dir(path: &str) -> &str {
    let path = path.strip_prefix(is_separator).unwrap_or(path);
    match path.find(is_separator) {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

/// Replace host separators with forward slashes
pub fn to_slash(path: &str) -> String {
    if MAIN_SEPARATOR == ARCHIVE_SEPARATOR {
        path.to_string()
    } else {
        path.replace(MAIN_SEPARATOR, "/")
    }
}

/// Borrow a path as UTF-8, failing with [`ArchiveError::PathConversion`]
pub fn path_to_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| ArchiveError::PathConversion(path.as_os_str().to_os_string()))
}

/// Lexically clean a path
///
/// Removes `.` components and folds `..` into the preceding normal
/// component without touching the filesystem. A `..` directly below the root
/// is dropped; leading `..` components of a relative path are kept.
///
/// # Example
///
/// ```rust
/// use archives::utils::clean_path;
/// use std::path::{Path, PathBuf};
///
/// assert_eq!(clean_path(Path::new("/tmp/sub/../target.txt")), PathBuf::from("/tmp/target.txt"));
/// assert_eq!(clean_path(Path::new("../a/./b")), PathBuf::from("../a/b"));
/// ```
pub fn clean_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

/// Get permission bits from metadata
///
/// Only the permission and special bits (`0o7777`) are returned; the file
/// type is tracked separately.
#[cfg(unix)]
pub fn get_permissions(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

/// Get permissions from metadata (Windows implementation)
#[cfg(windows)]
pub fn get_permissions(metadata: &fs::Metadata) -> u32 {
    // Map the read-only attribute onto unix-like permissions
    let mut mode = if metadata.permissions().readonly() { 0o444 } else { 0o644 };
    if metadata.is_dir() {
        mode |= 0o111;
    }
    mode
}

/// Set Unix permissions
#[cfg(unix)]
pub fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))?;
    Ok(())
}

/// Set permissions (Windows implementation)
#[cfg(windows)]
pub fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    // Only the read-only attribute can be expressed
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(mode & 0o200 == 0);
    fs::set_permissions(path, perms)?;
    Ok(())
}

/// Create a symlink (cross-platform)
#[cfg(unix)]
pub fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link)?;
    trace!("Created symlink {:?} -> {:?}", link, target);
    Ok(())
}

/// Create a symlink (Windows)
#[cfg(windows)]
pub fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    use std::os::windows::fs::{symlink_dir, symlink_file};

    // Relative targets are resolved against the link's directory
    let resolved = link
        .parent()
        .map(|dir| dir.join(target))
        .unwrap_or_else(|| target.to_path_buf());
    if resolved.is_dir() {
        symlink_dir(target, link)?;
    } else {
        symlink_file(target, link)?;
    }
    trace!("Created symlink {:?} -> {:?}", link, target);
    Ok(())
}

/// Read symlink target
pub fn read_symlink(path: &Path) -> Result<PathBuf> {
    fs::read_link(path).map_err(|source| ArchiveError::ReadLink {
        path: path.to_path_buf(),
        source,
    })
}

/// Format bytes in human-readable form
///
/// Uses binary units (1024-based).
///
/// ```rust
/// use archives::utils::format_bytes;
///
/// assert_eq!(format_bytes(1023), "1023 B");
/// assert_eq!(format_bytes(1536), "1.50 KB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}
