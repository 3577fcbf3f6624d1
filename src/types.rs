//! Core data types used throughout the archives library
//!
//! This module contains the data structures exchanged between disk traversal,
//! format drivers and caller callbacks.
//!
//! ## Overview
//!
//! - **Entries**: [`FileEntry`] is one file, directory or symlink, either
//!   discovered on disk or read out of a container. Its [`EntryKind`] is a
//!   closed variant, so an entry is always exactly one of the three.
//! - **Metadata**: [`EntryMetadata`] is a snapshot taken once at discovery.
//! - **Control**: [`Visit`] lets an extraction callback skip or stop.
//! - **Listings**: [`EntrySummary`] is an owned, serializable view of an entry.
//!
//! ## Examples
//!
//! ```rust
//! use archives::types::{EntryMetadata, FileEntry};
//!
//! let link = FileEntry::symlink("docs/latest", EntryMetadata::default(), "v2/index.html");
//! assert!(link.is_symlink());
//! assert_eq!(link.link_target(), Some("v2/index.html"));
//! assert_eq!(link.name(), "latest");
//! ```

use crate::error::{ArchiveError, Result};
use crate::utils;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

/// File type bits of a unix mode
pub const S_IFMT: u32 = 0o170000;
/// Regular file type bits
pub const S_IFREG: u32 = 0o100000;
/// Directory type bits
pub const S_IFDIR: u32 = 0o040000;
/// Symbolic link type bits
pub const S_IFLNK: u32 = 0o120000;

/// Filesystem metadata captured when an entry is discovered
///
/// Never re-queried afterwards, so later filesystem changes cannot race
/// with the archive being written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Size in bytes (0 for directories)
    pub size: u64,
    /// Permission and special bits (`0o7777` mask, no file type bits)
    ///
    /// Drivers store what their container can carry; zip keeps only `0o777`.
    pub mode: u32,
    /// Last modification time, if known
    pub modified: Option<DateTime<Utc>>,
}

impl Default for EntryMetadata {
    fn default() -> Self {
        Self {
            size: 0,
            mode: 0o644,
            modified: None,
        }
    }
}

impl EntryMetadata {
    /// Snapshot metadata returned by `stat`/`lstat`
    pub fn from_fs(metadata: &fs::Metadata) -> Self {
        Self {
            size: if metadata.is_dir() { 0 } else { metadata.len() },
            mode: utils::get_permissions(metadata),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        }
    }

    /// Drop timestamps and special mode bits, keeping `0o777` permissions
    pub fn cleared(self) -> Self {
        Self {
            size: self.size,
            mode: self.mode & 0o777,
            modified: None,
        }
    }
}

/// Source of a regular file's content
pub enum FileContent<'a> {
    /// A file on disk, opened lazily
    Disk(PathBuf),
    /// The content of the container entry currently being visited
    Stream(&'a mut dyn Read),
}

impl fmt::Debug for FileContent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileContent::Disk(path) => f.debug_tuple("Disk").field(path).finish(),
            FileContent::Stream(_) => write!(f, "Stream(..)"),
        }
    }
}

/// What an entry is
#[derive(Debug)]
pub enum EntryKind<'a> {
    /// Regular file with readable content
    File(FileContent<'a>),
    /// Directory; carries no content
    Directory,
    /// Symbolic link
    Symlink {
        /// Raw link text, possibly relative; never resolved
        target: String,
    },
}

/// One file, directory or symlink moving between disk and an archive
///
/// Entries are produced by [`files_from_disk`](crate::files_from_disk) or by
/// a format driver's extraction, and consumed once by the destination.
#[derive(Debug)]
pub struct FileEntry<'a> {
    /// Forward-slash path of the entry inside the archive
    pub name_in_archive: String,
    /// Metadata snapshot taken at discovery
    pub metadata: EntryMetadata,
    /// File type and content
    pub kind: EntryKind<'a>,
}

impl<'a> FileEntry<'a> {
    /// Regular file whose content lives at `path` on disk
    pub fn file(
        name_in_archive: impl Into<String>,
        metadata: EntryMetadata,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name_in_archive: name_in_archive.into(),
            metadata,
            kind: EntryKind::File(FileContent::Disk(path.into())),
        }
    }

    /// Directory entry
    pub fn directory(name_in_archive: impl Into<String>, metadata: EntryMetadata) -> Self {
        Self {
            name_in_archive: name_in_archive.into(),
            metadata: EntryMetadata { size: 0, ..metadata },
            kind: EntryKind::Directory,
        }
    }

    /// Symbolic link entry with its raw target text
    pub fn symlink(
        name_in_archive: impl Into<String>,
        metadata: EntryMetadata,
        target: impl Into<String>,
    ) -> Self {
        Self {
            name_in_archive: name_in_archive.into(),
            metadata,
            kind: EntryKind::Symlink {
                target: target.into(),
            },
        }
    }
}

impl<'a> FileEntry<'a> {
    /// Regular file whose content is read from `reader`
    ///
    /// The reader is borrowed, so the entry cannot outlive it.
    pub fn from_reader(
        name_in_archive: impl Into<String>,
        metadata: EntryMetadata,
        reader: &'a mut dyn Read,
    ) -> Self {
        Self {
            name_in_archive: name_in_archive.into(),
            metadata,
            kind: EntryKind::File(FileContent::Stream(reader)),
        }
    }

    /// Base name of the entry (last path segment)
    pub fn name(&self) -> &str {
        self.name_in_archive
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or("")
    }

    /// Whether this is a regular file
    pub fn is_file(&self) -> bool {
        matches!(self.kind, EntryKind::File(_))
    }

    /// Whether this is a directory
    pub fn is_dir(&self) -> bool {
        matches!(self.kind, EntryKind::Directory)
    }

    /// Whether this is a symbolic link
    pub fn is_symlink(&self) -> bool {
        matches!(self.kind, EntryKind::Symlink { .. })
    }

    /// Raw symlink target; `Some` iff this entry is a symlink
    pub fn link_target(&self) -> Option<&str> {
        match &self.kind {
            EntryKind::Symlink { target } => Some(target),
            _ => None,
        }
    }

    /// Size in bytes from the metadata snapshot
    pub fn size(&self) -> u64 {
        self.metadata.size
    }

    /// Full unix mode: file type bits combined with permission bits
    pub fn unix_mode(&self) -> u32 {
        let type_bits = match self.kind {
            EntryKind::File(_) => S_IFREG,
            EntryKind::Directory => S_IFDIR,
            EntryKind::Symlink { .. } => S_IFLNK,
        };
        type_bits | (self.metadata.mode & 0o7777)
    }

    /// On-disk source path, if this is a regular file read from disk
    pub fn source_path(&self) -> Option<&Path> {
        match &self.kind {
            EntryKind::File(FileContent::Disk(path)) => Some(path),
            _ => None,
        }
    }

    /// Open the entry's content for reading
    ///
    /// Disk-backed files are opened here and closed when the returned reader
    /// is dropped.
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::NotAFile`] for directories and symlinks
    /// - [`ArchiveError::Io`] if the file on disk cannot be opened
    pub fn open(&mut self) -> Result<Box<dyn Read + '_>> {
        match &mut self.kind {
            EntryKind::File(FileContent::Disk(path)) => Ok(Box::new(File::open(path)?)),
            EntryKind::File(FileContent::Stream(reader)) => Ok(Box::new(&mut **reader)),
            _ => Err(ArchiveError::NotAFile {
                name: self.name_in_archive.clone(),
            }),
        }
    }

    /// Owned, serializable summary of this entry
    pub fn summary(&self) -> EntrySummary {
        EntrySummary {
            name: self.name_in_archive.clone(),
            kind: match self.kind {
                EntryKind::File(_) => EntryType::File,
                EntryKind::Directory => EntryType::Directory,
                EntryKind::Symlink { .. } => EntryType::Symlink,
            },
            size: self.metadata.size,
            mode: self.metadata.mode,
            modified: self.metadata.modified,
            link_target: self.link_target().map(str::to_string),
        }
    }
}

/// Entry type without content, for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link
    Symlink,
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryType::File => write!(f, "file"),
            EntryType::Directory => write!(f, "dir"),
            EntryType::Symlink => write!(f, "link"),
        }
    }
}

/// Owned snapshot of an entry, safe to keep after the callback returns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySummary {
    /// Name in the archive
    pub name: String,
    /// Entry type
    pub kind: EntryType,
    /// Size in bytes
    pub size: u64,
    /// Permission bits
    pub mode: u32,
    /// Modification time
    pub modified: Option<DateTime<Utc>>,
    /// Symlink target, for symlinks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_target: Option<String>,
}

/// What an extraction callback wants to happen next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visit {
    /// Keep going
    #[default]
    Continue,
    /// Skip the rest of this directory: the subtree for a directory entry,
    /// the containing directory for a file
    SkipDir,
    /// Stop extracting; not an error
    Stop,
}
