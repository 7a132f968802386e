//! Site configuration management for `cardex.toml`.
//!
//! # Sections
//!
//! | Section     | Purpose                                      |
//! |-------------|----------------------------------------------|
//! | `[build]`   | Directory layout (cards, site, output)       |
//! | `[serve]`   | Development server (port, interface, watch)  |
//!
//! # Example
//!
//! ```toml
//! [build]
//! cards = "cards"
//! site = "site"
//! output = "dist"
//!
//! [serve]
//! port = 9898
//! watch = true
//! ```

mod build;
pub mod defaults;
mod error;
mod serve;

use build::BuildConfig;
use error::ConfigError;
use serve::ServeConfig;

use crate::cli::{Cli, Commands};
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing cardex.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// CLI arguments reference
    #[serde(skip)]
    pub cli: Option<&'static Cli>,

    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Development server settings
    #[serde(default)]
    pub serve: ServeConfig,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        self.build.root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Set the root directory and anchor every build path to it.
    ///
    /// Relative directories from the config file become absolute; already
    /// absolute paths are kept as they are, so calling this twice is safe.
    pub fn set_root(&mut self, path: &Path) {
        let root = Self::normalize_path(path);
        self.build.cards = Self::normalize_path(&root.join(&self.build.cards));
        self.build.site = Self::normalize_path(&root.join(&self.build.site));
        self.build.output = Self::normalize_path(&root.join(&self.build.output));
        self.build.root = Some(root);
    }

    /// Get CLI arguments reference
    pub fn get_cli(&self) -> &'static Cli {
        self.cli.unwrap()
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &'static Cli) {
        self.cli = Some(cli);

        // Determine the final root path based on command
        let root = match &cli.command {
            Commands::Init { name: Some(name) } => {
                let base = cli
                    .root
                    .as_ref()
                    .cloned()
                    .unwrap_or_else(|| self.get_root().to_owned());
                base.join(name)
            }
            _ => cli
                .root
                .as_ref()
                .cloned()
                .unwrap_or_else(|| self.get_root().to_owned()),
        };

        // Directory overrides land before paths are anchored to the root
        Self::update_option(&mut self.build.cards, cli.cards.as_ref());
        Self::update_option(&mut self.build.site, cli.site.as_ref());
        Self::update_option(&mut self.build.output, cli.output.as_ref());

        self.set_root(&root);
        self.config_path = Self::normalize_path(&self.get_root().join(&cli.config));

        if let Commands::Serve {
            interface,
            port,
            watch,
        } = &cli.command
        {
            Self::update_option(&mut self.serve.interface, interface.as_ref());
            Self::update_option(&mut self.serve.port, port.as_ref());
            Self::update_option(&mut self.serve.watch, watch.as_ref());
        }
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            // For non-existent paths, manually make them absolute
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate configuration for the current command
    pub fn validate(&self) -> Result<()> {
        match &self.get_cli().command {
            Commands::Init { name: Some(_) } if self.get_root().exists() => {
                bail!("Path already exists: {}", self.get_root().display());
            }
            Commands::Init { .. } => {}
            _ => {
                if !self.build.cards.is_dir() {
                    bail!(ConfigError::Validation(format!(
                        "[build.cards] directory not found: {}",
                        self.build.cards.display()
                    )));
                }
                if !self.build.site.is_dir() {
                    bail!(ConfigError::Validation(format!(
                        "[build.site] directory not found: {}",
                        self.build.site.display()
                    )));
                }

                let template = self.build.site.join(crate::render::TEMPLATE_FILE);
                if !template.is_file() {
                    bail!(ConfigError::Validation(format!(
                        "Site template not found: {}",
                        template.display()
                    )));
                }
            }
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
