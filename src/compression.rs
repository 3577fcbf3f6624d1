//! Per-entry compression policy for format drivers
//!
//! The codec itself belongs to the container library; this module only
//! decides, entry by entry, whether content is stored or deflated and at
//! which level.
//!
//! ## Compression Strategies
//!
//! - **None**: store everything, maximum speed
//! - **Fast**: deflate at level 1, small files stored (default)
//! - **Best**: deflate at level 9
//! - **Adaptive**: deflate unless the file is small or already compressed
//! - **Custom**: user-defined decision
//!
//! Directories and symlinks are always stored; only regular-file content is
//! subject to the strategy.
//!
//! ## Examples
//!
//! ```rust
//! use archives::compression::{default_skip_extensions, Compression, CompressionStrategy};
//!
//! let strategy = CompressionStrategy::Adaptive {
//!     min_size: 4096,
//!     skip_extensions: default_skip_extensions(),
//! };
//!
//! assert_eq!(strategy.decide("photos/cat.JPG", 1 << 20), Compression::Store);
//! assert!(matches!(strategy.decide("src/main.rs", 1 << 20), Compression::Deflate { .. }));
//! ```

use std::sync::Arc;

/// Files below this size are stored by [`CompressionStrategy::Fast`]
pub const FAST_MIN_SIZE: u64 = 1024;

/// Outcome of a compression decision for one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Store the bytes as-is
    Store,
    /// Deflate, optionally at an explicit level
    Deflate {
        /// Codec level; `None` uses the codec default
        level: Option<i64>,
    },
}

/// Strategy deciding how each regular file is compressed
///
/// # Examples
///
/// ```rust
/// use archives::compression::{Compression, CompressionStrategy};
/// use std::sync::Arc;
///
/// // Only compress text under docs/
/// let strategy = CompressionStrategy::Custom(Arc::new(|name, _size| {
///     name.starts_with("docs/")
/// }));
/// assert_eq!(strategy.decide("bin/tool", 10_000), Compression::Store);
/// ```
#[derive(Clone)]
pub enum CompressionStrategy {
    /// No compression
    None,

    /// Deflate level 1 for files of at least [`FAST_MIN_SIZE`] bytes (default)
    Fast,

    /// Deflate level 9 for every file
    Best,

    /// Deflate at the default level, skipping small and already-compressed files
    Adaptive {
        /// Store files smaller than this
        min_size: u64,
        /// Store files with these extensions (case-insensitive, no dot)
        skip_extensions: Vec<String>,
    },

    /// Custom decision: receives the name in the archive and the size, and
    /// returns whether to compress (at the default level)
    Custom(Arc<dyn Fn(&str, u64) -> bool + Send + Sync>),
}

impl Default for CompressionStrategy {
    fn default() -> Self {
        CompressionStrategy::Fast
    }
}

impl std::fmt::Debug for CompressionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Fast => write!(f, "Fast"),
            Self::Best => write!(f, "Best"),
            Self::Adaptive {
                min_size,
                skip_extensions,
            } => f
                .debug_struct("Adaptive")
                .field("min_size", min_size)
                .field("skip_extensions", skip_extensions)
                .finish(),
            Self::Custom(_) => write!(f, "Custom(Fn)"),
        }
    }
}

impl CompressionStrategy {
    /// Adaptive strategy with the default skip list and no size floor
    pub fn selective() -> Self {
        CompressionStrategy::Adaptive {
            min_size: 0,
            skip_extensions: default_skip_extensions(),
        }
    }

    /// Decide how to compress a regular file
    pub fn decide(&self, name_in_archive: &str, size: u64) -> Compression {
        let deflate = Compression::Deflate { level: None };
        match self {
            CompressionStrategy::None => Compression::Store,
            CompressionStrategy::Fast => {
                if size >= FAST_MIN_SIZE {
                    Compression::Deflate { level: Some(1) }
                } else {
                    Compression::Store
                }
            }
            CompressionStrategy::Best => Compression::Deflate { level: Some(9) },
            CompressionStrategy::Adaptive {
                min_size,
                skip_extensions,
            } => {
                if size < *min_size {
                    return Compression::Store;
                }
                match extension(name_in_archive) {
                    Some(ext) if skip_extensions.iter().any(|skip| skip.eq_ignore_ascii_case(ext)) => {
                        Compression::Store
                    }
                    _ => deflate,
                }
            }
            CompressionStrategy::Custom(func) => {
                if func(name_in_archive, size) {
                    deflate
                } else {
                    Compression::Store
                }
            }
        }
    }
}

/// Extension of the last path segment, without the dot
fn extension(name: &str) -> Option<&str> {
    let base = name.rsplit('/').next().unwrap_or(name);
    match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

/// Counters kept while writing an archive
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CompressionStats {
    /// Regular files written compressed
    pub files_compressed: usize,
    /// Regular files written stored
    pub files_stored_raw: usize,
    /// Content bytes read from sources
    pub bytes_in: u64,
}

impl CompressionStats {
    /// Record one regular file
    pub fn record(&mut self, compression: Compression, bytes: u64) {
        match compression {
            Compression::Store => self.files_stored_raw += 1,
            Compression::Deflate { .. } => self.files_compressed += 1,
        }
        self.bytes_in += bytes;
    }
}

/// Get default file extensions that should not be compressed
///
/// Lowercase extensions (without dots) of formats that are already
/// compressed.
pub fn default_skip_extensions() -> Vec<String> {
    vec![
        // Images
        "jpg", "jpeg", "png", "gif", "webp", "ico", "bmp", "heic",
        // Video
        "mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "m4v", "mpg", "mpeg",
        // Audio
        "mp3", "flac", "aac", "ogg", "wma", "m4a", "opus",
        // Archives
        "zip", "rar", "7z", "gz", "tgz", "bz2", "xz", "zst", "lz4", "lzma", "br", "sz",
        // Container formats that are zip inside
        "docx", "xlsx", "pptx", "odt", "jar", "apk", "epub",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
