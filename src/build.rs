//! Site building orchestration.
//!
//! A build runs the full pipeline from scratch:
//!
//! ```text
//! build_site()
//!     │
//!     ├── recreate_output()      clear and recreate the output directory
//!     │
//!     ├── scan_cards()           pair up <key>.json / <key>.png sources
//!     │
//!     ├── process_card() × N     embed metadata, write stamped PNG + pretty JSON
//!     │       (in parallel)
//!     │
//!     ├── render_index()         Handlebars template → index.html
//!     │
//!     └── copy_site_assets()     copy remaining site files
//! ```
//!
//! Recreating the output directory from scratch keeps it free of stale
//! artifacts from cards that were renamed or deleted since the last run.

use crate::{
    card::{self, Card},
    config::SiteConfig,
    log,
    render,
    scan::{self, CardSource},
};
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde_json::Value;
use std::{fs, io, path::Path};

/// Build the entire site, processing cards in parallel.
///
/// Returns the parsed cards so callers can reuse the site model without
/// re-reading the sources.
pub fn build_site(config: &SiteConfig) -> Result<Vec<Card>> {
    let output = &config.build.output;

    recreate_output(output)?;

    let sources = scan::scan_cards(&config.build.cards)?;
    log!("scan"; "found {} cards", sources.len());

    let cards = sources
        .par_iter()
        .map(|source| process_card(source, output))
        .collect::<Result<Vec<_>>>()?;

    let index = output.join(render::INDEX_FILE);
    let html = render::render_index(&config.build.site, &cards, false)?;
    fs::write(&index, html)
        .with_context(|| format!("failed to write `{}`", index.display()))?;

    let assets = render::copy_site_assets(&config.build.site, output)?;

    log!("build"; "{} cards, {} assets, done", cards.len(), assets);
    Ok(cards)
}

/// Parse every card source without touching the output directory.
///
/// The development index is rendered per request from this model, so edits
/// show up on reload even before a full rebuild finishes.
pub fn collect_cards(config: &SiteConfig) -> Result<Vec<Card>> {
    let sources = scan::scan_cards(&config.build.cards)?;
    sources
        .iter()
        .map(|source| {
            Ok(Card {
                key: source.key.clone(),
                metadata: read_metadata(source)?,
            })
        })
        .collect()
}

fn recreate_output(output: &Path) -> Result<()> {
    match fs::remove_dir_all(output) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(e).with_context(|| {
                format!("failed to clear output directory `{}`", output.display())
            });
        }
    }
    fs::create_dir_all(output)
        .with_context(|| format!("failed to create output directory `{}`", output.display()))
}

/// Stamp one card into the output directory.
///
/// Writes `<key>.png` with the metadata chunk embedded and `<key>.json` as a
/// pretty-printed copy of the metadata document.
fn process_card(source: &CardSource, output: &Path) -> Result<Card> {
    let metadata = read_metadata(source)?;

    let image = fs::read(&source.image_path)
        .with_context(|| format!("failed to read `{}`", source.image_path.display()))?;
    let stamped = card::embed_metadata(&image, &metadata)
        .with_context(|| format!("invalid PNG `{}`", source.image_path.display()))?;

    let png_target = output.join(format!("{}.png", source.key));
    fs::write(&png_target, stamped)
        .with_context(|| format!("failed to write `{}`", png_target.display()))?;

    let json_target = output.join(format!("{}.json", source.key));
    let pretty = serde_json::to_string_pretty(&metadata)?;
    fs::write(&json_target, pretty)
        .with_context(|| format!("failed to write `{}`", json_target.display()))?;

    Ok(Card {
        key: source.key.clone(),
        metadata,
    })
}

fn read_metadata(source: &CardSource) -> Result<Value> {
    let bytes = fs::read(&source.metadata_path)
        .with_context(|| format!("failed to read `{}`", source.metadata_path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse `{}`", source.metadata_path.display()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::png::{self, Chunk};
    use serde_json::json;
    use tempfile::TempDir;

    fn minimal_png() -> Vec<u8> {
        png::encode(&[
            Chunk::new(*b"IHDR", vec![0; 13]),
            Chunk::new(*b"IDAT", vec![1, 2, 3]),
            Chunk::new(*b"IEND", Vec::new()),
        ])
    }

    fn project(tmp: &TempDir) -> SiteConfig {
        let root = tmp.path();
        fs::create_dir(root.join("cards")).unwrap();
        fs::create_dir(root.join("site")).unwrap();
        fs::write(
            root.join("site").join(render::TEMPLATE_FILE),
            "{{#each cards}}{{key}}:{{name}};{{/each}}",
        )
        .unwrap();

        let mut config = SiteConfig::default();
        config.set_root(root);
        config
    }

    fn add_card(root: &Path, key: &str, metadata: &Value) {
        let cards = root.join("cards");
        fs::write(
            cards.join(format!("{key}.json")),
            serde_json::to_vec(metadata).unwrap(),
        )
        .unwrap();
        fs::write(cards.join(format!("{key}.png")), minimal_png()).unwrap();
    }

    #[test]
    fn build_produces_stamped_outputs() {
        let tmp = TempDir::new().unwrap();
        let config = project(&tmp);
        add_card(tmp.path(), "alice", &json!({"data": {"name": "Alice"}}));
        add_card(tmp.path(), "bob", &json!({"data": {"name": "Bob"}}));
        fs::write(tmp.path().join("site").join("style.css"), "body{}").unwrap();

        let cards = build_site(&config).unwrap();
        assert_eq!(cards.len(), 2);

        let output = tmp.path().join("dist");
        assert!(output.join("style.css").is_file());
        assert_eq!(
            fs::read_to_string(output.join("index.html")).unwrap(),
            "alice:Alice;bob:Bob;"
        );

        let stamped = fs::read(output.join("alice.png")).unwrap();
        let embedded = card::extract_metadata(&stamped).unwrap().unwrap();
        assert_eq!(embedded, json!({"data": {"name": "Alice"}}));

        // JSON copy is pretty-printed, unlike the compact embedded form
        let copy = fs::read_to_string(output.join("alice.json")).unwrap();
        assert_eq!(copy, "{\n  \"data\": {\n    \"name\": \"Alice\"\n  }\n}");
    }

    #[test]
    fn rebuild_drops_stale_outputs() {
        let tmp = TempDir::new().unwrap();
        let config = project(&tmp);
        add_card(tmp.path(), "alice", &json!({}));

        build_site(&config).unwrap();
        assert!(tmp.path().join("dist").join("alice.png").is_file());

        let cards = tmp.path().join("cards");
        fs::rename(cards.join("alice.json"), cards.join("renamed.json")).unwrap();
        fs::rename(cards.join("alice.png"), cards.join("renamed.png")).unwrap();
        build_site(&config).unwrap();

        let output = tmp.path().join("dist");
        assert!(!output.join("alice.png").exists());
        assert!(output.join("renamed.png").is_file());
    }

    #[test]
    fn unpaired_sources_fail_the_build() {
        let tmp = TempDir::new().unwrap();
        let config = project(&tmp);
        fs::write(tmp.path().join("cards").join("lonely.json"), "{}").unwrap();

        assert!(build_site(&config).is_err());
    }

    #[test]
    fn malformed_metadata_fails_the_build() {
        let tmp = TempDir::new().unwrap();
        let config = project(&tmp);
        let cards = tmp.path().join("cards");
        fs::write(cards.join("bad.json"), "{not json").unwrap();
        fs::write(cards.join("bad.png"), minimal_png()).unwrap();

        let err = build_site(&config).unwrap_err();
        assert!(format!("{err:#}").contains("bad.json"));
    }

    #[test]
    fn collect_cards_parses_without_writing() {
        let tmp = TempDir::new().unwrap();
        let config = project(&tmp);
        add_card(tmp.path(), "alice", &json!({"name": "Alice"}));

        let cards = collect_cards(&config).unwrap();
        assert_eq!(cards[0].key, "alice");
        assert_eq!(cards[0].metadata, json!({"name": "Alice"}));
        assert!(!tmp.path().join("dist").exists());
    }
}
