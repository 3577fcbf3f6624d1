//! # Archives CLI
//!
//! Command-line front end for the archives library.
//!
//! ## Usage
//! ```bash
//! # Archive a directory, storing it as "site/..." inside the archive
//! archives archive site.zip ./public=site
//!
//! # Follow symlinks and skip build output
//! archives archive project.zip ./project --follow-symlinks --exclude ./project/target
//!
//! # List entries, optionally as JSON
//! archives list project.zip --json
//!
//! # Extract only part of an archive
//! archives extract project.zip -o restore --include project/src
//! ```

use anyhow::{bail, Context as _};
use archives::{
    files_from_disk, utils::format_bytes, write_to_disk, ArchiveError, Archiver, CompressionStrategy, Context,
    EntrySummary, EntryType, Extractor, FromDiskOptions, Visit, Zip,
};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use humantime::format_duration;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing_subscriber::EnvFilter;

/// Archives CLI - pack and unpack zip archives with symlink control
#[derive(Parser)]
#[command(name = "archives")]
#[command(version)]
#[command(about = "Pack files into archives and unpack them again")]
#[command(long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an archive from files on disk
    #[command(alias = "a")]
    Archive {
        /// Archive to write
        output: PathBuf,

        /// Paths to archive, optionally renamed with PATH=NAME
        #[arg(required = true)]
        paths: Vec<String>,

        /// Archive symlink targets instead of the links
        #[arg(long)]
        follow_symlinks: bool,

        /// Leave out these paths and everything under them
        #[arg(short, long)]
        exclude: Vec<String>,

        /// Compression strategy
        #[arg(long, value_enum, default_value = "fast")]
        compression: CompressionMode,

        /// Drop timestamps and special permission bits
        #[arg(long)]
        clear_attributes: bool,

        /// Skip files that cannot be read instead of failing
        #[arg(long)]
        continue_on_error: bool,

        /// Show progress
        #[arg(long)]
        progress: bool,
    },

    /// Extract an archive into a directory
    #[command(alias = "x")]
    Extract {
        /// Archive to read
        archive: PathBuf,

        /// Destination directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Only extract these archive paths
        #[arg(short, long)]
        include: Vec<String>,
    },

    /// List the entries of an archive
    #[command(alias = "ls")]
    List {
        /// Archive to read
        archive: PathBuf,

        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum CompressionMode {
    None,
    Fast,
    Best,
    Adaptive,
}

impl From<CompressionMode> for CompressionStrategy {
    fn from(mode: CompressionMode) -> Self {
        match mode {
            CompressionMode::None => CompressionStrategy::None,
            CompressionMode::Fast => CompressionStrategy::Fast,
            CompressionMode::Best => CompressionStrategy::Best,
            CompressionMode::Adaptive => CompressionStrategy::Adaptive {
                min_size: 4096,
                skip_extensions: archives::compression::default_skip_extensions(),
            },
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Set up logging; stdout is reserved for command output
    let filter = if cli.verbose {
        EnvFilter::new("archives=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Disable colors if needed
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli) {
        let message = match e.downcast_ref::<ArchiveError>() {
            Some(err) if err.is_symlink_error() || err.is_cancelled() => err.user_message(),
            _ => format!("{:#}", e),
        };
        eprintln!("{}: {}", "Error".red().bold(), message);
        std::process::exit(1);
    }
}

/// Main command runner
fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Archive {
            output,
            paths,
            follow_symlinks,
            exclude,
            compression,
            clear_attributes,
            continue_on_error,
            progress,
        } => {
            let options = FromDiskOptions::new()
                .with_follow_symlinks(follow_symlinks)
                .with_clear_attributes(clear_attributes)
                .with_exclude(exclude);
            let zip = Zip::new()
                .with_compression(compression.into())
                .with_continue_on_error(continue_on_error);
            cmd_archive(&output, &paths, &options, &zip, progress)
        }
        Commands::Extract {
            archive,
            output,
            include,
        } => cmd_extract(&archive, &output, include),
        Commands::List { archive, json } => cmd_list(&archive, json),
    }
}

/// Split `PATH=NAME` into the path on disk and its name in the archive
fn parse_root(arg: &str) -> anyhow::Result<(PathBuf, String)> {
    let (path, name) = match arg.split_once('=') {
        Some((path, name)) => (path, name),
        None => (arg, ""),
    };
    if path.is_empty() {
        bail!("empty path in {:?}", arg);
    }
    Ok((PathBuf::from(path), name.to_string()))
}

/// Write an archive next to its destination, then move it into place
fn cmd_archive(
    output: &Path,
    paths: &[String],
    options: &FromDiskOptions,
    zip: &Zip,
    show_progress: bool,
) -> anyhow::Result<()> {
    let roots = paths
        .iter()
        .map(|arg| parse_root(arg))
        .collect::<anyhow::Result<Vec<_>>>()?;

    println!("{}", "Creating archive...".blue().bold());
    let start = Instant::now();

    let progress = if show_progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {pos} entries {msg}")?);
        Some(pb)
    } else {
        None
    };

    let parent = output
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(parent)
        .with_context(|| format!("creating temporary file in {}", parent.display()))?;

    let ctx = Context::new();
    let mut count = 0u64;
    let mut bytes = 0u64;
    let files = files_from_disk(&ctx, options, roots).inspect(|entry| {
        if let Ok(entry) = entry {
            count += 1;
            bytes += entry.size();
            if let Some(pb) = &progress {
                pb.inc(1);
                pb.set_message(entry.name_in_archive.clone());
            }
        }
    });

    let mut writer = zip.archive(&ctx, BufWriter::new(temp.as_file_mut()), files)?;
    writer.flush()?;
    drop(writer);

    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }

    temp.persist(output)
        .with_context(|| format!("writing {}", output.display()))?;
    let archive_size = std::fs::metadata(output)?.len();

    println!(
        "{} Created {}",
        "✓".green().bold(),
        output.display().to_string().yellow().bold()
    );
    println!("  Entries: {}", count.to_string().cyan());
    println!("  Input: {}", format_bytes(bytes).cyan());
    println!("  Archive: {}", format_bytes(archive_size).cyan());
    println!("  Time: {}", format_duration(start.elapsed()).to_string().cyan());

    Ok(())
}

/// Extract entries to a directory
fn cmd_extract(archive: &Path, output: &Path, include: Vec<String>) -> anyhow::Result<()> {
    let source = File::open(archive).with_context(|| format!("opening {}", archive.display()))?;
    let zip = if include.is_empty() {
        Zip::new()
    } else {
        Zip::new().with_include(include)
    };

    println!("{}", "Extracting archive...".blue().bold());
    let start = Instant::now();
    let mut count = 0usize;

    zip.extract(&Context::new(), BufReader::new(source), |_ctx, entry| {
        write_to_disk(output, entry)?;
        count += 1;
        Ok(Visit::Continue)
    })?;

    println!(
        "{} Extracted {} entries into {}",
        "✓".green().bold(),
        count.to_string().cyan(),
        output.display().to_string().yellow()
    );
    println!("  Time: {}", format_duration(start.elapsed()).to_string().cyan());

    Ok(())
}

/// List archive entries
fn cmd_list(archive: &Path, json: bool) -> anyhow::Result<()> {
    let source = File::open(archive).with_context(|| format!("opening {}", archive.display()))?;
    let mut entries: Vec<EntrySummary> = Vec::new();

    Zip::new().extract(&Context::new(), BufReader::new(source), |_ctx, entry| {
        entries.push(entry.summary());
        Ok(Visit::Continue)
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for entry in &entries {
        let name = match entry.kind {
            EntryType::Directory => format!("{}/", entry.name).blue().bold(),
            EntryType::Symlink => entry.name.cyan(),
            EntryType::File => entry.name.normal(),
        };
        let target = entry
            .link_target
            .as_deref()
            .map(|target| format!(" -> {}", target))
            .unwrap_or_default();
        println!(
            "{:<4} {:04o} {:>10}  {}{}",
            entry.kind.to_string().dimmed(),
            entry.mode,
            format_bytes(entry.size),
            name,
            target
        );
    }
    println!(
        "\n{}",
        format!("{} entries", entries.len()).dimmed()
    );

    Ok(())
}
