//! Main test module for archives
//!
//! This module includes all test suites:
//! - Integration tests for complete archive/extract workflows
//! - Chaos tests for damaged inputs and disappearing files
//! - Property-based tests for path invariants

pub mod chaos;
pub mod property;

#[cfg(test)]
mod edge_cases {
    use ::archives::*;
    use std::fs;
    use std::io::{Cursor, Read};
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Archive `roots` and return (name, content) for every extracted entry
    fn round_trip<P: Into<PathBuf>>(options: &FromDiskOptions, roots: Vec<(P, &str)>) -> Vec<(String, Vec<u8>)> {
        let ctx = Context::new();
        let files = files_from_disk(&ctx, options, roots);
        let mut archive = Zip::new()
            .archive(&ctx, Cursor::new(Vec::new()), files)
            .unwrap();
        archive.set_position(0);

        let mut entries = Vec::new();
        Zip::new()
            .extract(&ctx, archive, |_ctx, mut entry| {
                let mut content = Vec::new();
                if entry.is_file() {
                    entry.open()?.read_to_end(&mut content)?;
                }
                entries.push((entry.name_in_archive.clone(), content));
                Ok(Visit::Continue)
            })
            .unwrap();
        entries
    }

    #[test]
    fn test_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let empty = temp_dir.path().join("empty");
        fs::create_dir(&empty).unwrap();

        let entries = round_trip(&FromDiskOptions::new(), vec![(&empty, "")]);
        assert_eq!(entries, vec![("empty".to_string(), Vec::new())]);
    }

    #[test]
    fn test_contents_only_of_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let root = format!("{}/", temp_dir.path().display());

        let ctx = Context::new();
        let count = files_from_disk(&ctx, &FromDiskOptions::new(), [(root, "")]).count();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_special_filenames() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("special");
        fs::create_dir(&root).unwrap();

        let special_names = vec![
            "file with spaces.txt",
            "file-with-dashes.txt",
            "file_with_underscores.txt",
            "file.multiple.dots.txt",
            "UPPERCASE.TXT",
            "文件.txt",
            "файл.txt",
            "emoji_😀.txt",
            ".hidden",
        ];
        for name in &special_names {
            fs::write(root.join(name), name.as_bytes()).unwrap();
        }

        let entries = round_trip(&FromDiskOptions::new(), vec![(&root, "")]);
        for name in &special_names {
            let expected = format!("special/{}", name);
            let (_, content) = entries
                .iter()
                .find(|(entry, _)| *entry == expected)
                .unwrap_or_else(|| panic!("missing {}", expected));
            assert_eq!(content, name.as_bytes());
        }
    }

    #[test]
    fn test_deep_nesting() {
        let temp_dir = TempDir::new().unwrap();
        let mut deep = temp_dir.path().join("deep");
        for i in 0..30 {
            deep = deep.join(format!("level{}", i));
        }
        fs::create_dir_all(&deep).unwrap();
        fs::write(deep.join("bottom.txt"), "bottom").unwrap();

        let entries = round_trip(&FromDiskOptions::new(), vec![(&temp_dir.path().join("deep"), "")]);
        let bottom = entries
            .iter()
            .find(|(name, _)| name.ends_with("level29/bottom.txt"))
            .unwrap();
        assert_eq!(bottom.0.matches('/').count(), 31);
        assert_eq!(bottom.1, b"bottom");
    }

    #[test]
    fn test_multiple_roots_with_renames() {
        let temp_dir = TempDir::new().unwrap();
        let docs = temp_dir.path().join("docs");
        let src = temp_dir.path().join("src");
        fs::create_dir_all(&docs).unwrap();
        fs::create_dir_all(&src).unwrap();
        fs::write(docs.join("guide.md"), "guide").unwrap();
        fs::write(src.join("lib.rs"), "lib").unwrap();
        let license = temp_dir.path().join("LICENSE");
        fs::write(&license, "MIT").unwrap();

        let entries = round_trip(
            &FromDiskOptions::new(),
            vec![(&docs, "manual"), (&src, "pkg/"), (&license, "")],
        );
        let names: Vec<&str> = entries.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(
            names,
            vec!["manual", "manual/guide.md", "pkg/src", "pkg/src/lib.rs", "LICENSE"]
        );
    }

    #[test]
    fn test_large_file() {
        let temp_dir = TempDir::new().unwrap();
        let big = temp_dir.path().join("big.bin");
        let content: Vec<u8> = (0..4 * 1024 * 1024u32).map(|i| (i % 251) as u8).collect();
        fs::write(&big, &content).unwrap();

        let entries = round_trip(&FromDiskOptions::new(), vec![(&big, "")]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].1, content);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_root_is_preserved() {
        let temp_dir = TempDir::new().unwrap();
        let real = temp_dir.path().join("real");
        fs::create_dir(&real).unwrap();
        fs::write(real.join("f"), "f").unwrap();
        let link = temp_dir.path().join("alias");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let ctx = Context::new();
        let entries: Vec<_> = files_from_disk(&ctx, &FromDiskOptions::new(), [(&link, "")])
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_symlink());
        assert_eq!(entries[0].link_target(), Some(real.to_str().unwrap()));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_root_is_followed() {
        let temp_dir = TempDir::new().unwrap();
        let real = temp_dir.path().join("real");
        fs::create_dir(&real).unwrap();
        fs::write(real.join("f"), "f").unwrap();
        let link = temp_dir.path().join("alias");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let options = FromDiskOptions::new().with_follow_symlinks(true);
        let entries = round_trip(&options, vec![(&link, "")]);
        let names: Vec<&str> = entries.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["alias", "alias/f"]);
    }
}
