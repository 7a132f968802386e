//! Index page rendering and static asset copying.
//!
//! The site directory holds an `index.hbs` Handlebars template plus any
//! number of plain assets (stylesheets, scripts, images). The template sees
//! one record per card: the card key merged with the fields of the metadata
//! document's `data` object, so templates can write `{{key}}` and `{{name}}`
//! alike.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use handlebars::{Handlebars, handlebars_helper};
use serde_json::{Map, Value};

use crate::card::Card;

/// Template file name, resolved relative to the site directory.
pub const TEMPLATE_FILE: &str = "index.hbs";

/// Rendered page name in the output directory.
pub const INDEX_FILE: &str = "index.html";

// `(eq a b)` compares any two JSON values, mainly used by templates to
// branch on `environment`.
handlebars_helper!(eq: |a: Json, b: Json| a == b);

fn registry(site_dir: &Path) -> Result<Handlebars<'static>> {
    let template = site_dir.join(TEMPLATE_FILE);
    let mut handlebars = Handlebars::new();
    handlebars.register_helper("eq", Box::new(eq));
    handlebars
        .register_template_file("index", &template)
        .with_context(|| format!("failed to load template `{}`", template.display()))?;
    Ok(handlebars)
}

/// Flatten a card into a template record.
///
/// The key goes in first and the fields of the metadata `data` object
/// follow, so a `data.key` field shadows the file-derived one. Metadata
/// without an object-valued `data` field yields a key-only record.
fn card_record(card: &Card) -> Value {
    let mut record = Map::new();
    record.insert("key".to_owned(), Value::String(card.key.clone()));
    if let Some(Value::Object(fields)) = card.metadata.get("data") {
        for (name, value) in fields {
            record.insert(name.clone(), value.clone());
        }
    }
    Value::Object(record)
}

fn site_context(cards: &[Card], development: bool) -> Value {
    let mut context = Map::new();
    context.insert(
        "cards".to_owned(),
        Value::Array(cards.iter().map(card_record).collect()),
    );
    if development {
        context.insert(
            "environment".to_owned(),
            Value::String("development".to_owned()),
        );
    }
    Value::Object(context)
}

/// Render the index page for the given cards.
///
/// `development` adds `environment = "development"` to the template context;
/// production renders omit the field entirely.
pub fn render_index(site_dir: &Path, cards: &[Card], development: bool) -> Result<String> {
    let handlebars = registry(site_dir)?;
    handlebars
        .render("index", &site_context(cards, development))
        .context("failed to render index template")
}

/// Copy every immediate file of the site directory except the template into
/// the output directory. Subdirectories are left alone.
pub fn copy_site_assets(site_dir: &Path, output_dir: &Path) -> Result<usize> {
    let read_context = || format!("failed to read site directory `{}`", site_dir.display());

    let mut copied = 0;
    for entry in fs::read_dir(site_dir).with_context(read_context)? {
        let entry = entry.with_context(read_context)?;
        let path = entry.path();
        if !path.is_file() || entry.file_name() == TEMPLATE_FILE {
            continue;
        }
        let target = output_dir.join(entry.file_name());
        fs::copy(&path, &target)
            .with_context(|| format!("failed to copy `{}`", path.display()))?;
        copied += 1;
    }
    Ok(copied)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn site_with_template(template: &str) -> TempDir {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(TEMPLATE_FILE), template).unwrap();
        tmp
    }

    fn card(key: &str, metadata: Value) -> Card {
        Card {
            key: key.to_owned(),
            metadata,
        }
    }

    #[test]
    fn records_flatten_the_data_object_only() {
        let site = site_with_template("{{#each cards}}{{key}}={{name}}{{spec}};{{/each}}");
        let cards = vec![
            card("alice", json!({"spec": "v2", "data": {"name": "Alice"}})),
            card("bob", json!({"data": {"name": "Bob"}})),
        ];

        // `spec` sits outside `data` and must not leak into the record.
        let html = render_index(site.path(), &cards, false).unwrap();
        assert_eq!(html, "alice=Alice;bob=Bob;");
    }

    #[test]
    fn data_key_field_shadows_file_key() {
        let site = site_with_template("{{#each cards}}{{key}}{{/each}}");
        let cards = vec![card("from-file", json!({"data": {"key": "from-data"}}))];

        let html = render_index(site.path(), &cards, false).unwrap();
        assert_eq!(html, "from-data");
    }

    #[test]
    fn missing_or_scalar_data_yields_key_only_record() {
        let site = site_with_template("{{#each cards}}{{key}}:{{name}}.{{/each}}");
        let cards = vec![
            card("plain", json!({"name": "not picked up"})),
            card("scalar", json!({"data": 7})),
        ];

        let html = render_index(site.path(), &cards, false).unwrap();
        assert_eq!(html, "plain:.scalar:.");
    }

    #[test]
    fn environment_set_only_in_development() {
        let template = "{{#if (eq environment \"development\")}}dev{{else}}prod{{/if}}";
        let site = site_with_template(template);

        let dev = render_index(site.path(), &[], true).unwrap();
        let prod = render_index(site.path(), &[], false).unwrap();
        assert_eq!(dev, "dev");
        assert_eq!(prod, "prod");
    }

    #[test]
    fn eq_helper_compares_values() {
        let site = site_with_template("{{#if (eq 1 1)}}same{{/if}}{{#if (eq 1 2)}}bad{{/if}}");
        let html = render_index(site.path(), &[], false).unwrap();
        assert_eq!(html, "same");
    }

    #[test]
    fn missing_template_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(render_index(tmp.path(), &[], false).is_err());
    }

    #[test]
    fn assets_copied_without_template_or_directories() {
        let site = site_with_template("x");
        fs::write(site.path().join("style.css"), "body{}").unwrap();
        fs::write(site.path().join("logo.png"), b"img").unwrap();
        fs::create_dir(site.path().join("fonts")).unwrap();
        fs::write(site.path().join("fonts").join("a.woff"), b"f").unwrap();

        let out = TempDir::new().unwrap();
        let copied = copy_site_assets(site.path(), out.path()).unwrap();

        assert_eq!(copied, 2);
        assert!(out.path().join("style.css").is_file());
        assert!(out.path().join("logo.png").is_file());
        assert!(!out.path().join(TEMPLATE_FILE).exists());
        assert!(!out.path().join("fonts").exists());
    }
}
