//! Turning on-disk roots into a stream of archive entries
//!
//! [`files_from_disk`] walks each requested root and yields one
//! [`FileEntry`] per discovered file, directory or symlink, already carrying
//! its canonical name in the archive. The walk is lazy: nothing is read
//! until the returned [`DiskFiles`] iterator is polled, and a format driver
//! can consume it entry by entry without holding the whole tree in memory.
//!
//! ## Roots and renames
//!
//! Each root comes with a rename interpreted by
//! [`name_on_disk_to_name_in_archive`]. An empty rename keeps the root's own
//! base name; a trailing separator on the root (`"docs/"`) archives only its
//! contents.
//!
//! ## Symlinks
//!
//! Every walk uses `walkdir` with link following disabled, so each symlink,
//! including a symlinked root, is handled here:
//!
//! - `follow_symlinks = false` (default): the link becomes a symlink entry
//!   carrying its raw target text
//! - `follow_symlinks = true`: the chain is resolved with
//!   [`follow_symlink`]; a file target becomes a regular file entry, a
//!   directory target is walked under the link's archive name
//!
//! Following a link back into a directory that is already being walked
//! fails with [`ArchiveError::SymlinkLoop`] instead of recursing forever.
//!
//! ## Exclusion
//!
//! Excluded paths are matched against the slash-normalized path as
//! discovered on disk, before any symlink resolution. An excluded directory
//! is pruned with its whole subtree.
//!
//! ## Example
//!
//! ```rust,no_run
//! use archives::{files_from_disk, Context, FromDiskOptions};
//!
//! # fn main() -> archives::Result<()> {
//! let options = FromDiskOptions::new()
//!     .with_follow_symlinks(true)
//!     .with_exclude(["project/target"]);
//!
//! let ctx = Context::new();
//! for entry in files_from_disk(&ctx, &options, [("project", ""), ("README.md", "docs/")]) {
//!     let entry = entry?;
//!     println!("{} ({} bytes)", entry.name_in_archive, entry.size());
//! }
//! # Ok(())
//! # }
//! ```

use crate::context::Context;
use crate::error::{ArchiveError, Result};
use crate::filter::SkipList;
use crate::naming::name_on_disk_to_name_in_archive;
use crate::symlink::follow_symlink;
use crate::types::{EntryMetadata, FileEntry};
use crate::utils::{path_to_str, read_symlink, to_slash};
use std::collections::VecDeque;
use std::fs;
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Options controlling how files are gathered from disk
#[derive(Debug, Clone, Default)]
pub struct FromDiskOptions {
    /// Resolve symlinks and archive their targets instead of the links
    pub follow_symlinks: bool,
    /// Drop modification times and special mode bits from entries
    pub clear_attributes: bool,
    /// On-disk paths (and their subtrees) to leave out
    pub exclude: SkipList,
}

impl FromDiskOptions {
    /// Default options: links preserved, attributes kept, nothing excluded
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether symlinks are followed
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Set whether timestamps and special mode bits are cleared
    pub fn with_clear_attributes(mut self, clear: bool) -> Self {
        self.clear_attributes = clear;
        self
    }

    /// Exclude these on-disk paths
    ///
    /// Paths are normalized to forward slashes and added to the existing
    /// skip list, which keeps itself minimal.
    pub fn with_exclude<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for path in paths {
            self.exclude.add(to_slash(path.as_ref()));
        }
        self
    }

    fn snapshot(&self, metadata: &fs::Metadata) -> EntryMetadata {
        let snapshot = EntryMetadata::from_fs(metadata);
        if self.clear_attributes {
            snapshot.cleared()
        } else {
            snapshot
        }
    }
}

/// Walk `roots` and yield their entries lazily
///
/// `roots` pairs each on-disk path with its rename in the archive (empty
/// for "use the root's own name"). Roots are walked in the order given;
/// within a directory, entries are yielded sorted by file name, and a
/// directory always precedes its contents.
///
/// The iterator yields an error and then ends when a walk fails, a symlink
/// cannot be resolved, or `ctx` is cancelled.
pub fn files_from_disk<I, P, S>(ctx: &Context, options: &FromDiskOptions, roots: I) -> DiskFiles
where
    I: IntoIterator<Item = (P, S)>,
    P: Into<PathBuf>,
    S: Into<String>,
{
    DiskFiles {
        ctx: ctx.clone(),
        options: options.clone(),
        roots: roots
            .into_iter()
            .map(|(path, rename)| (path.into(), rename.into()))
            .collect(),
        frames: Vec::new(),
        stats: WalkStats::default(),
        started: Instant::now(),
        done: false,
    }
}

/// Canonical form of `root` if it is a real directory, not a link to one
fn canonical_dir(root: &Path) -> Option<PathBuf> {
    fs::symlink_metadata(root)
        .ok()
        .filter(|metadata| metadata.is_dir())
        .and_then(|_| fs::canonicalize(root).ok())
}

/// One active directory walk
struct Frame {
    walker: walkdir::IntoIter,
    root_on_disk: String,
    root_in_archive: String,
    /// Where `root_on_disk` was discovered; differs from it under a followed link
    discovered_root: String,
    /// Resolved root, used to detect followed links leading back into it
    canonical_root: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct WalkStats {
    files: usize,
    directories: usize,
    symlinks: usize,
    excluded: usize,
    bytes: u64,
}

/// Lazy sequence of entries discovered on disk
///
/// Created by [`files_from_disk`].
pub struct DiskFiles {
    ctx: Context,
    options: FromDiskOptions,
    roots: VecDeque<(PathBuf, String)>,
    /// Stack of walks; followed directory links push a nested walk
    frames: Vec<Frame>,
    stats: WalkStats,
    started: Instant,
    done: bool,
}

impl std::fmt::Debug for DiskFiles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskFiles")
            .field("options", &self.options)
            .field("pending_roots", &self.roots.len())
            .field("active_walks", &self.frames.len())
            .field("done", &self.done)
            .finish()
    }
}

impl DiskFiles {
    fn push_walk(&mut self, root: &Path, root_in_archive: String, discovered_root: Option<String>) -> Result<()> {
        let root_on_disk = path_to_str(root)?.to_string();
        let discovered_root = discovered_root.unwrap_or_else(|| root_on_disk.clone());
        let walker = WalkDir::new(root)
            .follow_links(false)
            .follow_root_links(false)
            .sort_by_file_name()
            .into_iter();

        trace!("Walking {:?} as {:?}", root_on_disk, root_in_archive);
        self.frames.push(Frame {
            walker,
            root_on_disk,
            root_in_archive,
            discovered_root,
            canonical_root: canonical_dir(root),
        });
        Ok(())
    }

    fn process(&mut self, entry: walkdir::DirEntry) -> Result<Option<FileEntry<'static>>> {
        let path = entry.path();
        let file_type = entry.file_type();
        let frame = self
            .frames
            .last_mut()
            .ok_or_else(|| ArchiveError::internal("walk entry without an active walk"))?;
        let name_on_disk = path_to_str(path)?;
        let discovered = match name_on_disk.strip_prefix(frame.root_on_disk.as_str()) {
            Some(beyond) => format!("{}{}", frame.discovered_root, beyond),
            None => name_on_disk.to_string(),
        };

        if !self.options.exclude.is_empty() && self.options.exclude.skips(&to_slash(&discovered)) {
            if file_type.is_dir() {
                frame.walker.skip_current_dir();
            }
            trace!("Excluded {:?}", discovered);
            self.stats.excluded += 1;
            return Ok(None);
        }

        let name = name_on_disk_to_name_in_archive(
            name_on_disk,
            &frame.root_on_disk,
            &frame.root_in_archive,
        )?;

        if file_type.is_symlink() {
            return self.symlink_entry(path, name, discovered);
        }

        let metadata = entry.metadata()?;
        if file_type.is_dir() {
            // contents-only roots have no name of their own
            if name.is_empty() {
                return Ok(None);
            }
            self.stats.directories += 1;
            return Ok(Some(FileEntry::directory(name, self.options.snapshot(&metadata))));
        }

        self.stats.files += 1;
        self.stats.bytes += metadata.len();
        Ok(Some(FileEntry::file(
            name,
            self.options.snapshot(&metadata),
            path,
        )))
    }

    fn symlink_entry(&mut self, path: &Path, name: String, discovered: String) -> Result<Option<FileEntry<'static>>> {
        if !self.options.follow_symlinks {
            let metadata = fs::symlink_metadata(path)?;
            let target = read_symlink(path)?;
            let target = target
                .into_os_string()
                .into_string()
                .map_err(ArchiveError::PathConversion)?;
            self.stats.symlinks += 1;
            return Ok(Some(FileEntry::symlink(
                name,
                self.options.snapshot(&metadata),
                target,
            )));
        }

        let (resolved, metadata) = follow_symlink(path)?;
        if metadata.is_dir() {
            self.check_directory_loop(path, &resolved)?;
            debug!("Following {:?} into {:?}", path, resolved);
            // the nested walk yields the directory entry itself
            self.push_walk(&resolved, name, Some(discovered))?;
            return Ok(None);
        }

        self.stats.files += 1;
        self.stats.bytes += metadata.len();
        Ok(Some(FileEntry::file(
            name,
            self.options.snapshot(&metadata),
            resolved,
        )))
    }

    /// Fail if walking `target` would re-enter a directory already being walked
    fn check_directory_loop(&self, link: &Path, target: &Path) -> Result<()> {
        let target = fs::canonicalize(target).map_err(|source| ArchiveError::DereferenceStat {
            path: target.to_path_buf(),
            source,
        })?;

        let link_parent = link
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let containing = fs::canonicalize(link_parent)?;

        let re_enters = containing.starts_with(&target)
            || self
                .frames
                .iter()
                .filter_map(|frame| frame.canonical_root.as_deref())
                .any(|root| root.starts_with(&target));

        if re_enters {
            return Err(ArchiveError::SymlinkLoop {
                path: link.to_path_buf(),
            });
        }
        Ok(())
    }

    fn finish(&mut self) {
        self.done = true;
        debug!(
            "Traversal finished: {} files, {} directories, {} symlinks, {} excluded, {} bytes in {:?}",
            self.stats.files,
            self.stats.directories,
            self.stats.symlinks,
            self.stats.excluded,
            self.stats.bytes,
            self.started.elapsed()
        );
    }

    fn fail(&mut self, err: ArchiveError) -> Option<Result<FileEntry<'static>>> {
        self.done = true;
        debug!("Traversal stopped: {}", err);
        Some(Err(err))
    }
}

impl Iterator for DiskFiles {
    type Item = Result<FileEntry<'static>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if let Err(err) = self.ctx.check() {
                return self.fail(err);
            }

            let next = match self.frames.last_mut() {
                Some(frame) => frame.walker.next(),
                None => match self.roots.pop_front() {
                    Some((root, rename)) => {
                        if let Err(err) = self.push_walk(&root, rename, None) {
                            return self.fail(err);
                        }
                        continue;
                    }
                    None => {
                        self.finish();
                        return None;
                    }
                },
            };

            match next {
                None => {
                    self.frames.pop();
                }
                Some(Err(err)) => return self.fail(err.into()),
                Some(Ok(entry)) => match self.process(entry) {
                    Ok(Some(file)) => return Some(Ok(file)),
                    Ok(None) => {}
                    Err(err) => return self.fail(err),
                },
            }
        }
    }
}

impl FusedIterator for DiskFiles {}
