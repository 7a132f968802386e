//! Site initialization module.
//!
//! Creates new site structure with default configuration.

use crate::{config::SiteConfig, log};
use anyhow::{Context, Result, bail};
use std::{fs, path::Path};

/// Files to write ignore patterns to
const IGNORE_FILES: &[&str] = &[".gitignore", ".ignore"];

/// Default config filename
const CONFIG_FILE: &str = "cardex.toml";

/// Default site directory structure
const SITE_DIRS: &[&str] = &["cards", "site"];

/// Starter files for a fresh site directory
const SITE_FILES: &[(&str, &str)] = &[
    ("site/index.hbs", include_str!("scaffold/index.hbs")),
    ("site/style.css", include_str!("scaffold/style.css")),
];

/// Create a new site with default structure
pub fn new_site(config: &SiteConfig, has_name: bool) -> Result<()> {
    let root = config.get_root();

    // Safety check: if no name was provided (init in current dir),
    // the directory must be completely empty
    if !has_name && !is_dir_empty(root)? {
        bail!(
            "Current directory is not empty. Use `cardex init <SITE_NAME>` to create in a subdirectory."
        );
    }

    init_site_structure(root)?;
    init_default_config(root)?;
    init_starter_files(root)?;

    let output = config
        .build
        .output
        .strip_prefix(root)
        .unwrap_or(&config.build.output);
    init_ignored_files(root, &[output])?;

    log!("init"; "created `{}`", root.display());
    Ok(())
}

/// Check if a directory is completely empty
fn is_dir_empty(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(true);
    }
    Ok(fs::read_dir(path)?.next().is_none())
}

/// Write default configuration file
fn init_default_config(root: &Path) -> Result<()> {
    let content = toml::to_string_pretty(&SiteConfig::default())?;
    fs::write(root.join(CONFIG_FILE), content)?;
    Ok(())
}

/// Create site directory structure
fn init_site_structure(root: &Path) -> Result<()> {
    for dir in SITE_DIRS {
        let path = root.join(dir);
        if path.exists() {
            bail!(
                "Path `{}` already exists. Try `cardex init <SITE_NAME>` instead.",
                path.display()
            );
        }
        fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
    }
    Ok(())
}

/// Write the starter template and stylesheet
fn init_starter_files(root: &Path) -> Result<()> {
    for (name, content) in SITE_FILES {
        let path = root.join(name);
        fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}

/// Initialize .gitignore and .ignore files with specified paths
fn init_ignored_files(root: &Path, paths: &[&Path]) -> Result<()> {
    let content = paths
        .iter()
        .filter_map(|p| p.to_str())
        .collect::<Vec<_>>()
        .join("\n");

    for filename in IGNORE_FILES {
        let path = root.join(filename);
        if !path.exists() {
            fs::write(&path, &content)?;
        }
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
