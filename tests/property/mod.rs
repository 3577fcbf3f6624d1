//! Property-based testing for archives
//!
//! Uses proptest to verify path invariants across randomly generated
//! inputs, plus a filesystem round trip over generated trees.

use ::archives::utils::{top_dir, trim_top_dir};
use ::archives::*;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// A single path segment without separators
fn segment_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,8}".prop_map(|s| s),
        "dir[0-9]{1,2}".prop_map(|s| s),
        "[a-z]{1,5}\\.(txt|rs|md)".prop_map(|s| s),
    ]
}

/// Relative slash paths over a tiny alphabet, so prefixes collide often
fn overlapping_path_strategy() -> impl Strategy<Value = String> {
    (prop::collection::vec("[ab]{1,2}", 1..=3), any::<bool>()).prop_map(|(segments, trailing)| {
        let mut path = segments.join("/");
        if trailing {
            path.push('/');
        }
        path
    })
}

/// Relative file paths for generated trees
fn file_path_strategy() -> impl Strategy<Value = PathBuf> {
    (prop::collection::vec("d[0-3]", 0..=3), "f[0-9]{1,2}\\.bin").prop_map(|(dirs, file)| {
        let mut path = PathBuf::new();
        for dir in dirs {
            path.push(dir);
        }
        path.join(file)
    })
}

/// Write generated files under `root`, skipping paths that collide with a directory
fn write_files(root: &Path, files: &[(PathBuf, Vec<u8>)]) -> anyhow::Result<BTreeMap<String, Vec<u8>>> {
    let mut written = BTreeMap::new();
    for (path, content) in files {
        let full = root.join(path);
        if full.is_dir() || full.ancestors().skip(1).any(|a| a.is_file()) {
            continue;
        }
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, content)?;
        written.insert(path.to_string_lossy().replace('\\', "/"), content.clone());
    }
    Ok(written)
}

/// Relative path -> content for every file on disk under `root`
fn read_tree(root: &Path) -> anyhow::Result<BTreeMap<String, Vec<u8>>> {
    let mut tree = BTreeMap::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            let relative = entry.path().strip_prefix(root)?;
            tree.insert(
                relative.to_string_lossy().replace('\\', "/"),
                fs::read(entry.path())?,
            );
        }
    }
    Ok(tree)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_single_segment_is_its_own_top_dir(p in segment_strategy()) {
        prop_assert_eq!(top_dir(&p), p.as_str());
        prop_assert_eq!(trim_top_dir(&p), p.as_str());
    }

    #[test]
    fn prop_two_segments_split(a in segment_strategy(), b in segment_strategy()) {
        let joined = format!("{}/{}", a, b);
        prop_assert_eq!(top_dir(&joined), a.as_str());
        prop_assert_eq!(trim_top_dir(&joined), b.as_str());
    }

    #[test]
    fn prop_path_matches_itself(p in overlapping_path_strategy()) {
        prop_assert!(path_matches(&p, &p));
    }

    #[test]
    fn prop_path_matches_descendants(p in overlapping_path_strategy(), child in segment_strategy()) {
        let nested = format!("{}/{}", p.trim_end_matches('/'), child);
        prop_assert!(path_matches(&p, &nested));
        prop_assert!(file_is_included(&[p.as_str()], &nested));
    }

    #[test]
    fn prop_skip_list_add_is_idempotent(
        paths in prop::collection::vec(overlapping_path_strategy(), 0..8),
        extra in overlapping_path_strategy(),
    ) {
        let mut once: SkipList = paths.iter().cloned().collect();
        once.add(extra.clone());
        let mut twice = once.clone();
        twice.add(extra);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_skip_list_is_an_antichain(paths in prop::collection::vec(overlapping_path_strategy(), 0..12)) {
        let list: SkipList = paths.iter().cloned().collect();
        let entries = list.as_slice();
        for (i, a) in entries.iter().enumerate() {
            for (j, b) in entries.iter().enumerate() {
                if i != j {
                    prop_assert!(!path_matches(a, b), "{:?} covers {:?} in {:?}", a, b, entries);
                }
            }
        }
    }

    #[test]
    fn prop_skip_list_still_skips_everything_added(paths in prop::collection::vec(overlapping_path_strategy(), 1..12)) {
        let list: SkipList = paths.iter().cloned().collect();
        for path in &paths {
            let descendant = format!("{}/leaf", path.trim_end_matches('/'));
            prop_assert!(list.skips(&descendant), "{:?} lost from {:?}", path, list);
        }
    }

    #[test]
    fn prop_root_maps_to_its_base_name(segments in prop::collection::vec(segment_strategy(), 1..5)) {
        let root = segments.join("/");
        let name = name_on_disk_to_name_in_archive(&root, &root, "").unwrap();
        prop_assert_eq!(name.as_str(), segments[segments.len() - 1].as_str());
    }

    #[test]
    fn prop_archive_names_are_clean(
        root in prop::collection::vec(segment_strategy(), 1..4),
        beyond in prop::collection::vec(segment_strategy(), 0..4),
        rename in prop_oneof![Just(String::new()), Just(".".to_string()), "[a-z]{1,4}", "[a-z]{1,4}/"],
        contents_only in any::<bool>(),
    ) {
        let mut root_on_disk = root.join("/");
        let mut name_on_disk = root_on_disk.clone();
        for segment in &beyond {
            name_on_disk.push('/');
            name_on_disk.push_str(segment);
        }
        if contents_only {
            root_on_disk.push('/');
        }
        prop_assume!(name_on_disk.starts_with(&root_on_disk));

        let name = name_on_disk_to_name_in_archive(&name_on_disk, &root_on_disk, &rename).unwrap();
        prop_assert!(!name.contains("//"), "{:?}", name);
        prop_assert!(!name.ends_with('/'), "{:?}", name);
        prop_assert!(!name.starts_with('/'), "{:?}", name);
        if !beyond.is_empty() {
            let expected_tail = beyond.join("/");
            prop_assert!(name.ends_with(&expected_tail), "{:?} should end with {:?}", name, expected_tail);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_disk_round_trip(
        files in prop::collection::vec(
            (file_path_strategy(), prop::collection::vec(any::<u8>(), 0..2048)),
            1..12,
        ),
        follow_symlinks in any::<bool>(),
    ) {
        let source = TempDir::new().unwrap();
        let root = source.path().join("root");
        fs::create_dir_all(&root).unwrap();
        let expected = write_files(&root, &files).unwrap();

        let ctx = Context::new();
        let options = FromDiskOptions::new().with_follow_symlinks(follow_symlinks);
        let mut archive = Zip::new()
            .archive(&ctx, Cursor::new(Vec::new()), files_from_disk(&ctx, &options, [(&root, "r/")]))
            .unwrap();
        archive.set_position(0);

        // contents in the archive
        let mut in_archive = BTreeMap::new();
        Zip::new()
            .extract(&ctx, archive.clone(), |_ctx, mut entry| {
                if entry.is_file() {
                    let mut content = Vec::new();
                    entry.open()?.read_to_end(&mut content)?;
                    let name = entry.name_in_archive.trim_start_matches("r/root/").to_string();
                    in_archive.insert(name, content);
                }
                Ok(Visit::Continue)
            })
            .unwrap();
        prop_assert_eq!(&in_archive, &expected);

        // and again after writing to disk
        let restore = TempDir::new().unwrap();
        Zip::new()
            .extract(&ctx, archive, |_ctx, entry| {
                write_to_disk(restore.path(), entry)?;
                Ok(Visit::Continue)
            })
            .unwrap();
        prop_assert_eq!(read_tree(&restore.path().join("r").join("root")).unwrap(), expected);
    }
}
