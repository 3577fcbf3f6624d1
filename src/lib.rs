//! # Archives - format-agnostic archiving
//!
//! Pack files from disk into archive streams and unpack archive streams into
//! typed entries.
//!
//! ## Overview
//!
//! The library sits between the filesystem and container formats:
//! - Walk on-disk roots into a lazy stream of [`FileEntry`] values, each with
//!   a canonical forward-slash name in the archive
//! - Preserve symlinks as symlink entries, or follow them with loop and
//!   depth bounds
//! - Prune trees with hierarchical include/exclude path matching
//! - Write entry streams into a container and read containers back as entry
//!   streams through a format driver ([`Zip`])
//!
//! ## Architecture
//!
//! - **Path utilities** ([`utils`]): first-segment helpers and path cleaning
//! - **Path filter** ([`filter`]): ancestor-aware matching and minimal skip lists
//! - **Archive naming** ([`naming`]): on-disk path to in-archive name
//! - **Symlink resolver** ([`symlink`]): bounded, iterative chain resolution
//! - **Disk traversal** ([`from_disk`]): roots to entries
//! - **Format drivers** ([`formats`]): entries to and from containers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use archives::{files_from_disk, write_to_disk, Archiver, Context, Extractor, FromDiskOptions, Visit, Zip};
//! use std::fs::File;
//!
//! # fn main() -> archives::Result<()> {
//! let ctx = Context::new();
//! let zip = Zip::new();
//!
//! // Archive ./project as "project/..." and ./notes.txt as "docs/notes.txt"
//! let files = files_from_disk(
//!     &ctx,
//!     &FromDiskOptions::new(),
//!     [("project", ""), ("notes.txt", "docs/")],
//! );
//! zip.archive(&ctx, File::create("backup.zip")?, files)?;
//!
//! // Unpack it again
//! zip.extract(&ctx, File::open("backup.zip")?, |_ctx, entry| {
//!     write_to_disk("restore", entry)?;
//!     Ok(Visit::Continue)
//! })?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Symlink Handling
//!
//! By default symlinks are archived as symlinks carrying their raw target
//! text. With [`FromDiskOptions::with_follow_symlinks`] the link is resolved
//! and its target archived in its place; resolution fails on loops and on
//! chains longer than [`MAX_SYMLINK_DEPTH`] hops.
//!
//! ## Cancellation
//!
//! Every operation takes a [`Context`]. Cancelling it stops traversal,
//! archiving and extraction at the next entry boundary with
//! [`ArchiveError::Cancelled`]. An archive interrupted this way is
//! incomplete and must be discarded.
//!
//! ## Error Handling
//!
//! All operations return `Result<T, ArchiveError>`. Symlink failures name the
//! offending path and limit; errors returned by extraction callbacks come
//! back to the caller unchanged.
//!
//! ## Module Organization
//!
//! - [`compression`]: per-entry compression strategy
//! - [`context`]: cancellation
//! - [`error`]: error types and handling
//! - [`filter`]: path matching and skip lists
//! - [`formats`]: format traits and the zip driver
//! - [`from_disk`]: disk traversal
//! - [`naming`]: archive path mapping
//! - [`symlink`]: symlink resolution
//! - [`to_disk`]: writing extracted entries
//! - [`types`]: entries and metadata
//! - [`utils`]: path and filesystem helpers

// Public API modules
pub mod compression;
pub mod context;
pub mod error;
pub mod filter;
pub mod formats;
pub mod from_disk;
pub mod naming;
pub mod symlink;
pub mod to_disk;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use compression::CompressionStrategy;
pub use context::Context;
pub use error::{ArchiveError, Result};
pub use filter::{file_is_included, path_matches, SkipList};
pub use formats::{Archiver, Extractor, Format, Zip};
pub use from_disk::{files_from_disk, DiskFiles, FromDiskOptions};
pub use naming::name_on_disk_to_name_in_archive;
pub use symlink::{follow_symlink, MAX_SYMLINK_DEPTH};
pub use to_disk::write_to_disk;
pub use types::*;
