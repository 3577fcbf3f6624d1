//! Zip format driver
//!
//! Writes and reads `.zip` containers through the `zip` crate, which owns
//! the byte-level framing and the deflate codec. This module maps
//! [`FileEntry`] values to container records and back:
//!
//! - directories are stored records whose name ends in `/`
//! - symlinks are stored records whose unix mode carries the symlink type
//!   bits and whose content is the raw link target
//! - regular files are stored or deflated per the [`CompressionStrategy`]
//!
//! Zip records only the `0o777` permission bits; setuid, setgid and sticky
//! bits in [`EntryMetadata::mode`] do not survive a round trip.
//!
//! Reading goes through the central directory, which is where the unix
//! mode bits live; that is why extraction needs a seekable source.
//!
//! ## Example
//!
//! ```rust,no_run
//! use archives::{files_from_disk, Archiver, Context, Extractor, FromDiskOptions, Visit, Zip};
//! use std::fs::File;
//!
//! # fn main() -> archives::Result<()> {
//! let ctx = Context::new();
//! let zip = Zip::new();
//!
//! let files = files_from_disk(&ctx, &FromDiskOptions::new(), [("project", "")]);
//! zip.archive(&ctx, File::create("project.zip")?, files)?;
//!
//! zip.extract(&ctx, File::open("project.zip")?, |_ctx, entry| {
//!     println!("{}", entry.name_in_archive);
//!     Ok(Visit::Continue)
//! })?;
//! # Ok(())
//! # }
//! ```

use super::{Archiver, Extractor, Format};
use crate::compression::{Compression, CompressionStats, CompressionStrategy};
use crate::context::Context;
use crate::error::{ArchiveError, Result};
use crate::filter::{file_is_included, SkipList};
use crate::types::{EntryMetadata, FileEntry, Visit, S_IFDIR, S_IFLNK, S_IFMT};
use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use std::io::{self, Read, Seek, Write};
use std::time::Instant;
use tracing::{debug, trace, warn};
use ::zip::write::SimpleFileOptions;
use ::zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Longest symlink target accepted when reading a container
pub const MAX_LINK_TARGET_LEN: usize = 4096;

/// Files at least this large are written with zip64 extensions
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Zip archiver and extractor
///
/// # Example
///
/// ```rust
/// use archives::{CompressionStrategy, Zip};
///
/// let zip = Zip::new()
///     .with_compression(CompressionStrategy::Best)
///     .with_continue_on_error(true)
///     .with_include(["docs"]);
/// assert!(zip.continue_on_error);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Zip {
    /// How regular files are compressed when archiving
    pub compression: CompressionStrategy,
    /// Skip source files that cannot be opened instead of failing
    pub continue_on_error: bool,
    /// Restrict extraction to these archive paths and their subtrees
    pub include: Option<Vec<String>>,
}

impl Zip {
    /// Driver with fast compression and no filters
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the compression strategy
    pub fn with_compression(mut self, compression: CompressionStrategy) -> Self {
        self.compression = compression;
        self
    }

    /// Set whether unreadable source files are skipped
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Only extract entries under these archive paths
    pub fn with_include<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    fn base_options(&self, entry: &FileEntry<'_>) -> SimpleFileOptions {
        let mut options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .unix_permissions(entry.metadata.mode & 0o777);
        if let Some(modified) = entry.metadata.modified.as_ref().and_then(to_zip_time) {
            options = options.last_modified_time(modified);
        }
        options
    }

    /// Write one entry; `Ok(false)` means it was skipped
    fn write_entry<W: Write + Seek>(
        &self,
        writer: &mut ZipWriter<W>,
        entry: &mut FileEntry<'_>,
        stats: &mut CompressionStats,
    ) -> Result<bool> {
        let mut name = archive_name(entry)?;
        let options = self.base_options(entry);

        if entry.is_dir() {
            if !name.ends_with('/') {
                name.push('/');
            }
            writer.add_directory(name.as_str(), options)?;
            trace!("Wrote directory {}", name);
            return Ok(true);
        }

        if let Some(target) = entry.link_target() {
            writer.add_symlink(name.as_str(), target, options)?;
            trace!("Wrote symlink {} -> {}", name, target);
            return Ok(true);
        }

        let size = entry.size();
        let compression = self.compression.decide(&name, size);
        let options = match compression {
            Compression::Store => options,
            Compression::Deflate { level } => options
                .compression_method(CompressionMethod::Deflated)
                .compression_level(level),
        }
        .large_file(size >= ZIP64_THRESHOLD);

        // open before writing the header so a failed open leaves no half entry
        let mut reader = match entry.open() {
            Ok(reader) => reader,
            Err(err) if self.continue_on_error => {
                warn!("Skipping {}: {}", name, err);
                return Ok(false);
            }
            Err(err) => return Err(err),
        };

        writer.start_file(name.as_str(), options)?;
        let copied = match io::copy(&mut reader, writer) {
            Ok(copied) => copied,
            Err(err) => {
                // drop the partial record so the finished container never holds it
                writer.abort_file()?;
                warn!("Aborted {} after a read error: {}", name, err);
                return Err(err.into());
            }
        };
        stats.record(compression, copied);
        trace!("Wrote file {} ({} bytes, {:?})", name, copied, compression);
        Ok(true)
    }
}

impl Format for Zip {
    fn name(&self) -> &'static str {
        "zip"
    }

    fn extension(&self) -> &'static str {
        ".zip"
    }

    fn media_type(&self) -> &'static str {
        "application/zip"
    }
}

impl Archiver for Zip {
    fn archive<'a, W, I>(&self, ctx: &Context, output: W, files: I) -> Result<W>
    where
        W: Write + Seek,
        I: IntoIterator<Item = Result<FileEntry<'a>>>,
    {
        let start = Instant::now();
        let mut writer = ZipWriter::new(output);
        let mut stats = CompressionStats::default();
        let mut written = 0usize;
        let mut skipped = 0usize;

        for file in files {
            ctx.check()?;
            let mut entry = file?;
            if self.write_entry(&mut writer, &mut entry, &mut stats)? {
                written += 1;
            } else {
                skipped += 1;
            }
        }

        let output = writer.finish()?;
        debug!(
            "Archived {} entries ({} compressed, {} stored, {} skipped, {} bytes) in {:?}",
            written,
            stats.files_compressed,
            stats.files_stored_raw,
            skipped,
            stats.bytes_in,
            start.elapsed()
        );
        Ok(output)
    }
}

impl Extractor for Zip {
    fn extract<R, F>(&self, ctx: &Context, source: R, mut handle: F) -> Result<()>
    where
        R: Read + Seek,
        F: FnMut(&Context, FileEntry<'_>) -> Result<Visit>,
    {
        let start = Instant::now();
        let mut archive = ZipArchive::new(source)?;
        let mut skip_dirs = SkipList::new();
        let mut visited = 0usize;

        for index in 0..archive.len() {
            ctx.check()?;

            let mut file = archive.by_index(index)?;
            let raw_name = file.name().to_string();

            if skip_dirs.skips(&raw_name) {
                continue;
            }
            if let Some(include) = &self.include {
                if !file_is_included(include, &raw_name) {
                    continue;
                }
            }

            let mode = file.unix_mode();
            let is_symlink = mode.is_some_and(|m| m & S_IFMT == S_IFLNK);
            let is_dir = !is_symlink && (file.is_dir() || mode.is_some_and(|m| m & S_IFMT == S_IFDIR));
            let name = raw_name.trim_end_matches('/').to_string();
            let metadata = EntryMetadata {
                size: if is_dir { 0 } else { file.size() },
                mode: match mode {
                    Some(mode) => mode & 0o7777,
                    None if is_dir => 0o755,
                    None => 0o644,
                },
                modified: file.last_modified().and_then(|time| from_zip_time(&time)),
            };

            let entry = if is_symlink {
                let target = read_link_target(&mut file, &name)?;
                FileEntry::symlink(name.clone(), metadata, target)
            } else if is_dir {
                FileEntry::directory(name.clone(), metadata)
            } else {
                FileEntry::from_reader(name.clone(), metadata, &mut file)
            };

            trace!("Extracting {}", name);
            visited += 1;
            match handle(ctx, entry)? {
                Visit::Continue => {}
                Visit::Stop => break,
                Visit::SkipDir if is_dir => skip_dirs.add(name),
                Visit::SkipDir => match name.rsplit_once('/') {
                    Some((parent, _)) => skip_dirs.add(parent),
                    // a top-level file has no directory left to skip
                    None => break,
                },
            }
        }

        debug!(
            "Extracted {} of {} entries in {:?}",
            visited,
            archive.len(),
            start.elapsed()
        );
        Ok(())
    }
}

/// Name to store for `entry`, falling back to its base name on disk
fn archive_name(entry: &FileEntry<'_>) -> Result<String> {
    if !entry.name_in_archive.is_empty() {
        return Ok(entry.name_in_archive.clone());
    }
    entry
        .source_path()
        .and_then(|path| path.file_name())
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| ArchiveError::invalid_path("entry has no name in archive"))
}

fn read_link_target(file: &mut impl Read, name: &str) -> Result<String> {
    let mut target = Vec::new();
    file.take(MAX_LINK_TARGET_LEN as u64 + 1)
        .read_to_end(&mut target)?;
    if target.len() > MAX_LINK_TARGET_LEN {
        return Err(ArchiveError::InvalidLinkTarget {
            name: name.to_string(),
        });
    }
    String::from_utf8(target).map_err(|_| ArchiveError::InvalidLinkTarget {
        name: name.to_string(),
    })
}

/// DOS time for `time`; `None` outside the 1980..=2107 range
fn to_zip_time(time: &DateTime<Utc>) -> Option<::zip::DateTime> {
    ::zip::DateTime::from_date_and_time(
        u16::try_from(time.year()).ok()?,
        time.month() as u8,
        time.day() as u8,
        time.hour() as u8,
        time.minute() as u8,
        time.second() as u8,
    )
    .ok()
}

fn from_zip_time(time: &::zip::DateTime) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(time.year().into(), time.month().into(), time.day().into())?
        .and_hms_opt(time.hour().into(), time.minute().into(), time.second().into())
        .map(|naive| naive.and_utc())
}
