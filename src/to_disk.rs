//! Materializing extracted entries on disk
//!
//! [`write_to_disk`] is the usual body of an extraction callback: it turns
//! one [`FileEntry`] into a directory, file or symlink under a destination
//! directory.
//!
//! Names are sanitized before use. Only normal path components survive, so
//! `..`, absolute roots and drive prefixes can never place anything outside
//! the destination. Symlink targets are written verbatim, but an entry is
//! refused if any of its existing parents under the destination is a
//! symlink, so a link written by an earlier entry cannot redirect later ones.

use crate::error::{ArchiveError, Result};
use crate::types::{EntryKind, FileEntry};
use crate::utils::{create_symlink, set_permissions};
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tracing::trace;

/// Write `entry` below `dest` and return the path it was written to
///
/// Parent directories are created as needed and existing files or links
/// are replaced. Unix permission bits are applied; directories always keep
/// owner `rwx` so their contents can still be written. File modification
/// times are restored when the entry carries one.
///
/// # Errors
///
/// - [`ArchiveError::InvalidPath`] if nothing is left of the name after
///   sanitizing, or if the entry would be written through a symlink
/// - [`ArchiveError::Io`] for filesystem failures
///
/// # Example
///
/// ```rust,no_run
/// use archives::{write_to_disk, Context, Extractor, Visit, Zip};
/// use std::fs::File;
///
/// # fn main() -> archives::Result<()> {
/// Zip::new().extract(&Context::new(), File::open("backup.zip")?, |_ctx, entry| {
///     write_to_disk("restore", entry)?;
///     Ok(Visit::Continue)
/// })?;
/// # Ok(())
/// # }
/// ```
pub fn write_to_disk(dest: impl AsRef<Path>, mut entry: FileEntry<'_>) -> Result<PathBuf> {
    let relative = sanitize_path(&entry.name_in_archive).ok_or_else(|| {
        ArchiveError::invalid_path(format!(
            "{:?} has no usable path components",
            entry.name_in_archive
        ))
    })?;
    let dest = dest.as_ref();
    // a directory entry is written into its final component as well
    reject_symlinked_parents(dest, &relative, entry.is_dir())?;
    let path = dest.join(relative);
    let mode = entry.metadata.mode;

    match &entry.kind {
        EntryKind::Directory => {
            fs::create_dir_all(&path)?;
            set_permissions(&path, mode | 0o700)?;
            trace!("Created directory {:?}", path);
            return Ok(path);
        }
        EntryKind::Symlink { target } => {
            create_parent(&path)?;
            remove_existing(&path)?;
            create_symlink(Path::new(target), &path)?;
            return Ok(path);
        }
        EntryKind::File(_) => {}
    }

    create_parent(&path)?;
    remove_existing(&path)?;
    let modified = entry.metadata.modified.map(SystemTime::from);
    let mut output = File::create(&path)?;
    let copied = io::copy(&mut entry.open()?, &mut output)?;
    if let Some(modified) = modified {
        output.set_modified(modified)?;
    }
    drop(output);
    set_permissions(&path, mode)?;

    trace!("Wrote {:?} ({} bytes)", path, copied);
    Ok(path)
}

/// Keep only normal components of an archive name
fn sanitize_path(name: &str) -> Option<PathBuf> {
    let sanitized: PathBuf = name
        .split(['/', '\\'])
        .flat_map(|segment| Path::new(segment).components())
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect();

    if sanitized.as_os_str().is_empty() {
        None
    } else {
        Some(sanitized)
    }
}

/// Fail if an existing component of `relative` under `dest` is a symlink
///
/// The last component is only checked when `include_last` is set; a file
/// or link already there is replaced rather than written through.
fn reject_symlinked_parents(dest: &Path, relative: &Path, include_last: bool) -> Result<()> {
    let components: Vec<_> = relative.components().collect();
    let checked = if include_last {
        components.len()
    } else {
        components.len().saturating_sub(1)
    };

    let mut current = dest.to_path_buf();
    for component in &components[..checked] {
        current.push(component);
        match fs::symlink_metadata(&current) {
            Ok(metadata) if metadata.file_type().is_symlink() => {
                return Err(ArchiveError::invalid_path(format!(
                    "{:?} would be written through symlink {:?}",
                    relative, current
                )));
            }
            Ok(_) => {}
            // nothing deeper can exist yet
            Err(err) if err.kind() == io::ErrorKind::NotFound => break,
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Remove a file or link already at `path`; directories are left alone
fn remove_existing(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if !metadata.is_dir() => fs::remove_file(path)?,
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err.into()),
    }
    Ok(())
}
