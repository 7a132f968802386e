//! `[build]` section configuration.
//!
//! Contains the directory layout the build pipeline works with.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[build]` section in cardex.toml - build pipeline configuration.
///
/// # Example
/// ```toml
/// [build]
/// cards = "cards"    # Card sources (.json + .png pairs)
/// site = "site"      # Index template and static assets
/// output = "dist"    # Build output directory
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Project root directory (usually set via CLI `--root`).
    #[serde(default = "defaults::build::root")]
    #[educe(Default = defaults::build::root())]
    pub root: Option<PathBuf>,

    /// Card sources directory, holding paired `.json` and `.png` files.
    #[serde(default = "defaults::build::cards")]
    #[educe(Default = defaults::build::cards())]
    pub cards: PathBuf,

    /// Site directory with the index template and static assets.
    #[serde(default = "defaults::build::site")]
    #[educe(Default = defaults::build::site())]
    pub site: PathBuf,

    /// Build output directory.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::super::SiteConfig;
    use std::path::PathBuf;

    #[test]
    fn test_build_config_defaults() {
        let config: SiteConfig = toml::from_str("").unwrap();

        assert_eq!(config.build.cards, PathBuf::from("cards"));
        assert_eq!(config.build.site, PathBuf::from("site"));
        assert_eq!(config.build.output, PathBuf::from("dist"));
        assert!(config.build.root.is_none());
    }

    #[test]
    fn test_build_paths_custom() {
        let config = r#"
            [build]
            cards = "decks"
            site = "theme"
            output = "out"
        "#;
        let config: SiteConfig = toml::from_str(config).unwrap();

        assert_eq!(config.build.cards, PathBuf::from("decks"));
        assert_eq!(config.build.site, PathBuf::from("theme"));
        assert_eq!(config.build.output, PathBuf::from("out"));
    }

    #[test]
    fn test_build_partial_override() {
        let config = r#"
            [build]
            output = "public"
        "#;
        let config: SiteConfig = toml::from_str(config).unwrap();

        assert_eq!(config.build.cards, PathBuf::from("cards"));
        assert_eq!(config.build.output, PathBuf::from("public"));
    }

    #[test]
    fn test_unknown_field_rejection() {
        let config = r#"
            [build]
            unknown_field = "should_fail"
        "#;
        let result: Result<SiteConfig, _> = toml::from_str(config);

        assert!(result.is_err());
    }
}
