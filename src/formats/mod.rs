//! Container format drivers
//!
//! A driver translates between a sequence of [`FileEntry`] values and one
//! concrete container byte format. Writing consumes entries in order;
//! reading surfaces entries in container order to a caller callback.
//!
//! Both directions poll the [`Context`] between entries and never in the
//! middle of one.

pub mod zip;

pub use self::zip::Zip;

use crate::context::Context;
use crate::error::Result;
use crate::types::{FileEntry, Visit};
use std::io::{Read, Seek, Write};

/// Identity of a container format
pub trait Format {
    /// Short name, e.g. `"zip"`
    fn name(&self) -> &'static str;

    /// Conventional file extension including the dot, e.g. `".zip"`
    fn extension(&self) -> &'static str;

    /// IANA media type
    fn media_type(&self) -> &'static str;
}

/// A format that can write archives
pub trait Archiver: Format {
    /// Write `files` into a new archive on `output`
    ///
    /// Entries are written in the order the iterator yields them. The first
    /// error item from `files` aborts the archive. Returns the finished
    /// writer.
    ///
    /// On cancellation or error the output holds an incomplete archive that
    /// must not be treated as valid.
    fn archive<'a, W, I>(&self, ctx: &Context, output: W, files: I) -> Result<W>
    where
        W: Write + Seek,
        I: IntoIterator<Item = Result<FileEntry<'a>>>;
}

/// A format that can read archives
pub trait Extractor: Format {
    /// Read the archive in `source`, calling `handle` once per entry
    ///
    /// Regular-file entries stream their content from the container and
    /// are only readable during the call. The callback's [`Visit`] decides
    /// whether extraction continues; an error from the callback ends
    /// extraction and is returned unchanged.
    fn extract<R, F>(&self, ctx: &Context, source: R, handle: F) -> Result<()>
    where
        R: Read + Seek,
        F: FnMut(&Context, FileEntry<'_>) -> Result<Visit>;
}
