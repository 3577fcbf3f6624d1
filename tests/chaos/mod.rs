//! Chaos testing for archives
//!
//! Feeds the drivers damaged containers, disappearing sources and hostile
//! symlink layouts, and checks that every failure surfaces as an error
//! rather than a panic or a silently incomplete result.

use ::archives::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;
use tempfile::TempDir;
use tracing::{info, warn};

/// Build a small archive whose single stored file contains `marker`
pub fn archive_with_marker(marker: &[u8]) -> Vec<u8> {
    let mut content = Cursor::new(marker.repeat(64));
    let size = content.get_ref().len() as u64;
    let entries = vec![Ok(FileEntry::from_reader(
        "payload.bin",
        EntryMetadata {
            size,
            ..EntryMetadata::default()
        },
        &mut content,
    ))];
    Zip::new()
        .with_compression(CompressionStrategy::None)
        .archive(&Context::new(), Cursor::new(Vec::new()), entries)
        .unwrap()
        .into_inner()
}

/// Read every entry, draining file content; returns the number of entries
pub fn drain(bytes: Vec<u8>) -> Result<usize> {
    let mut count = 0;
    Zip::new().extract(&Context::new(), Cursor::new(bytes), |_ctx, mut entry| {
        if entry.is_file() {
            let mut sink = Vec::new();
            entry.open()?.read_to_end(&mut sink)?;
        }
        count += 1;
        Ok(Visit::Continue)
    })?;
    Ok(count)
}

/// Random byte flips inside `range`
pub struct ChaosEngine {
    rng: StdRng,
}

impl ChaosEngine {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Flip one bit in each of `flips` distinct bytes
    pub fn corrupt(&mut self, bytes: &mut [u8], range: std::ops::Range<usize>, flips: usize) {
        for offset in rand::seq::index::sample(&mut self.rng, range.len(), flips) {
            let bit = self.rng.random_range(0..8);
            bytes[range.start + offset] ^= 1 << bit;
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn write_tree(root: &Path) {
    fs::create_dir_all(root.join("sub")).unwrap();
    fs::write(root.join("a.txt"), "a").unwrap();
    fs::write(root.join("sub").join("b.txt"), "b").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn test_truncated_archive() {
        let bytes = archive_with_marker(b"TRUNCATE");
        for keep in [0, 4, bytes.len() / 2, bytes.len() - 1] {
            let result = drain(bytes[..keep].to_vec());
            assert!(
                matches!(result, Err(ArchiveError::Zip(_))),
                "keeping {} bytes: {:?}",
                keep,
                result
            );
        }
    }

    #[test]
    fn test_not_an_archive() {
        let result = drain(b"this is plainly not a zip file".to_vec());
        assert!(matches!(result, Err(ArchiveError::Zip(_))));
    }

    #[test]
    #[traced_test]
    fn test_corrupted_content_is_detected() {
        let marker = b"CHAOSMARKER";
        let mut engine = ChaosEngine::new(7);

        for round in 0..20 {
            let mut bytes = archive_with_marker(marker);
            let start = find(&bytes, marker).unwrap();
            let end = start + marker.len() * 64;
            engine.corrupt(&mut bytes, start..end, 1 + round % 3);

            let result = drain(bytes);
            info!("round {}: {:?}", round, result);
            assert!(result.is_err(), "corruption in round {} went unnoticed", round);
        }
    }

    #[test]
    #[traced_test]
    fn test_source_disappears_before_archiving() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("tree");
        write_tree(&root);

        let ctx = Context::new();
        let entries: Vec<_> = files_from_disk(&ctx, &FromDiskOptions::new(), [(&root, "")])
            .collect::<Result<_>>()
            .unwrap();
        fs::remove_file(root.join("a.txt")).unwrap();
        warn!("removed a.txt after traversal");

        let strict = Zip::new().archive(
            &ctx,
            Cursor::new(Vec::new()),
            files_from_disk(&ctx, &FromDiskOptions::new(), [(&root, "")])
                .chain(std::iter::once(Ok(FileEntry::file(
                    "tree/a.txt",
                    EntryMetadata::default(),
                    root.join("a.txt"),
                )))),
        );
        assert!(matches!(strict, Err(ArchiveError::Io(_))));

        let lenient = Zip::new()
            .with_continue_on_error(true)
            .archive(&ctx, Cursor::new(Vec::new()), entries.into_iter().map(Ok))
            .unwrap();
        let count = drain(lenient.into_inner()).unwrap();
        // tree, tree/sub, tree/sub/b.txt
        assert_eq!(count, 3);
        assert!(logs_contain("removed a.txt"));
    }

    #[test]
    fn test_cancel_midway_through_archive() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("tree");
        write_tree(&root);

        let ctx = Context::new();
        let canceller = ctx.clone();
        let mut seen = 0;
        let files = files_from_disk(&ctx, &FromDiskOptions::new(), [(&root, "")]).inspect(|_| {
            seen += 1;
            if seen == 2 {
                canceller.cancel();
            }
        });

        let err = Zip::new()
            .archive(&ctx, Cursor::new(Vec::new()), files)
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loop_in_tree() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("tree");
        write_tree(&root);
        std::os::unix::fs::symlink("loop_b", root.join("loop_a")).unwrap();
        std::os::unix::fs::symlink("loop_a", root.join("loop_b")).unwrap();

        // preserved links are harmless
        let ctx = Context::new();
        let preserved: Result<Vec<_>> =
            files_from_disk(&ctx, &FromDiskOptions::new(), [(&root, "")]).collect();
        assert_eq!(preserved.unwrap().len(), 6);

        // followed links must fail loudly
        let options = FromDiskOptions::new().with_follow_symlinks(true);
        let err = Zip::new()
            .archive(&ctx, Cursor::new(Vec::new()), files_from_disk(&ctx, &options, [(&root, "")]))
            .unwrap_err();
        assert!(err.is_symlink_error());
        assert!(err.to_string().contains("symlink loop"));
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_link_cycle_terminates() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("tree");
        write_tree(&root);
        std::os::unix::fs::symlink(&root, root.join("sub").join("back_to_root")).unwrap();

        let options = FromDiskOptions::new().with_follow_symlinks(true);
        let result: Result<Vec<_>> =
            files_from_disk(&Context::new(), &options, [(&root, "")]).collect();
        assert!(matches!(result, Err(ArchiveError::SymlinkLoop { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_overlong_link_chain_in_tree() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("tree");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("end"), "end").unwrap();

        let mut previous = "end".to_string();
        for i in 0..=MAX_SYMLINK_DEPTH {
            let name = format!("hop{:02}", i);
            std::os::unix::fs::symlink(&previous, root.join(&name)).unwrap();
            previous = name;
        }

        let options = FromDiskOptions::new().with_follow_symlinks(true);
        let result: Result<Vec<_>> =
            files_from_disk(&Context::new(), &options, [(&root, "")]).collect();
        let err = result.unwrap_err();
        assert!(matches!(err, ArchiveError::SymlinkDepthExceeded { limit: 40, .. }));
    }

    #[test]
    fn test_failing_handler_leaves_earlier_entries() {
        let temp_dir = TempDir::new().unwrap();
        let restore = TempDir::new().unwrap();
        let root = temp_dir.path().join("tree");
        write_tree(&root);

        let ctx = Context::new();
        let mut archive = Zip::new()
            .archive(
                &ctx,
                Cursor::new(Vec::new()),
                files_from_disk(&ctx, &FromDiskOptions::new(), [(&root, "")]),
            )
            .unwrap();
        archive.set_position(0);

        let mut written = 0;
        let err = Zip::new()
            .extract(&ctx, archive, |_ctx, entry| {
                if written == 2 {
                    return Err(ArchiveError::handler("disk full"));
                }
                write_to_disk(restore.path(), entry)?;
                written += 1;
                Ok(Visit::Continue)
            })
            .unwrap_err();

        assert_eq!(err.to_string(), "disk full");
        // tree/ and tree/a.txt were committed before the failure
        assert!(restore.path().join("tree").join("a.txt").exists());
        assert!(!restore.path().join("tree").join("sub").exists());
    }
}
