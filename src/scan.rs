//! Card pair discovery and validation.
//!
//! A card is a `<name>.json` metadata document plus a `<name>.png` portrait
//! living side by side in the cards directory. The scanner classifies the
//! directory's immediate file entries by extension, pairs them up by base
//! name, and fails the whole build when any name exists in only one form;
//! there is no best-effort processing of the valid subset.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Scanner errors.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to read cards directory `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error(
        "unpaired card files: metadata without image [{}], image without metadata [{}]",
        .metadata_only.join(", "),
        .image_only.join(", ")
    )]
    Unpaired {
        metadata_only: Vec<String>,
        image_only: Vec<String>,
    },
}

/// A validated card pair on disk.
#[derive(Debug, Clone)]
pub struct CardSource {
    pub key: String,
    pub metadata_path: PathBuf,
    pub image_path: PathBuf,
}

/// Scan the cards directory and return every valid pair.
///
/// Only immediate file entries count; extension matching is exact
/// (`json`, `png`), everything else is ignored. Pairs come back in
/// lexicographic key order so the site model is deterministic across
/// platforms.
pub fn scan_cards(dir: &Path) -> Result<Vec<CardSource>, ScanError> {
    let io_err = |err| ScanError::Io(dir.to_path_buf(), err);

    let mut metadata_names = BTreeSet::new();
    let mut image_names = BTreeSet::new();

    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if !path.is_file() {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => {
                metadata_names.insert(stem.to_owned());
            }
            Some("png") => {
                image_names.insert(stem.to_owned());
            }
            _ => {}
        }
    }

    let metadata_only: Vec<String> = metadata_names.difference(&image_names).cloned().collect();
    let image_only: Vec<String> = image_names.difference(&metadata_names).cloned().collect();

    if !metadata_only.is_empty() || !image_only.is_empty() {
        return Err(ScanError::Unpaired {
            metadata_only,
            image_only,
        });
    }

    Ok(metadata_names
        .into_iter()
        .map(|key| CardSource {
            metadata_path: dir.join(format!("{key}.json")),
            image_path: dir.join(format!("{key}.png")),
            key,
        })
        .collect())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn valid_pairs_in_key_order() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "zoe.json");
        touch(tmp.path(), "zoe.png");
        touch(tmp.path(), "alice.png");
        touch(tmp.path(), "alice.json");

        let cards = scan_cards(tmp.path()).unwrap();
        let keys: Vec<&str> = cards.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["alice", "zoe"]);
        assert_eq!(cards[0].metadata_path, tmp.path().join("alice.json"));
        assert_eq!(cards[0].image_path, tmp.path().join("alice.png"));
    }

    #[test]
    fn metadata_without_image_fails() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "alice.json");
        touch(tmp.path(), "alice.png");
        touch(tmp.path(), "ghost.json");

        match scan_cards(tmp.path()).unwrap_err() {
            ScanError::Unpaired {
                metadata_only,
                image_only,
            } => {
                assert_eq!(metadata_only, vec!["ghost"]);
                assert!(image_only.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn both_difference_lists_reported() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "b.json");
        touch(tmp.path(), "a.json");
        touch(tmp.path(), "y.png");
        touch(tmp.path(), "x.png");

        match scan_cards(tmp.path()).unwrap_err() {
            ScanError::Unpaired {
                metadata_only,
                image_only,
            } => {
                assert_eq!(metadata_only, vec!["a", "b"]);
                assert_eq!(image_only, vec!["x", "y"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn mismatch_is_all_or_nothing() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "good.json");
        touch(tmp.path(), "good.png");
        touch(tmp.path(), "bad.png");

        // The valid pair must not be returned alongside the error
        assert!(scan_cards(tmp.path()).is_err());
    }

    #[test]
    fn unrelated_extensions_ignored() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "alice.json");
        touch(tmp.path(), "alice.png");
        touch(tmp.path(), "notes.txt");
        touch(tmp.path(), "alice.PNG");
        touch(tmp.path(), ".DS_Store");

        let cards = scan_cards(tmp.path()).unwrap();
        assert_eq!(cards.len(), 1);
    }

    #[test]
    fn directories_ignored() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "alice.json");
        touch(tmp.path(), "alice.png");
        fs::create_dir(tmp.path().join("stray.json")).unwrap();

        let cards = scan_cards(tmp.path()).unwrap();
        assert_eq!(cards.len(), 1);
    }

    #[test]
    fn empty_directory_is_valid() {
        let tmp = TempDir::new().unwrap();
        assert!(scan_cards(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_directory_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let gone = tmp.path().join("nope");
        assert!(matches!(scan_cards(&gone), Err(ScanError::Io(..))));
    }

    #[test]
    fn unpaired_display_names_both_lists() {
        let err = ScanError::Unpaired {
            metadata_only: vec!["a".into()],
            image_only: vec!["x".into(), "y".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("metadata without image [a]"));
        assert!(msg.contains("image without metadata [x, y]"));
    }
}
