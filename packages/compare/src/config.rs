//! Engine thresholds and link prefixes.
//!
//! Loaded once per run (from a TOML file or defaults), adjusted from the
//! command line, then passed by reference to every component.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::CompareError;

/// Tunable parameters of a reconciliation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Records closer than this (metres) share a display cluster.
    pub cluster_radius_m: f64,
    /// Maximum separation (metres) for a suggested match.
    pub suggest_distance_m: f64,
    /// Names qualify as similar when their edit distance is below this.
    pub suggest_edit_distance: usize,
    /// Also compare names with articles and company suffixes removed.
    pub normalize_names: bool,
    /// Linked pairs further apart than this (metres) are reported.
    pub distant_match_m: f64,
    /// Minimum establishments for a district to be reported.
    pub inhabited_threshold: u64,
    /// Number of districts analysed concurrently.
    pub concurrency: usize,
    /// Interquartile fence multiplier for the corrected bounding box.
    pub bbox_fence_multiplier: f64,
    /// URL prefixes used when rendering links.
    pub links: LinkConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cluster_radius_m: 3.5,
            suggest_distance_m: 250.0,
            suggest_edit_distance: 3,
            normalize_names: true,
            distant_match_m: 500.0,
            inhabited_threshold: 10,
            concurrency: 4,
            bbox_fence_multiplier: 3.0,
            links: LinkConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parses a configuration from TOML text. Missing keys take their
    /// default values.
    ///
    /// # Errors
    ///
    /// Returns [`CompareError::Config`] if the text is not valid TOML or a
    /// value has the wrong type.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, CompareError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Reads and parses a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`CompareError`] if the file cannot be read or parsed.
    pub fn from_toml_file(path: &Path) -> Result<Self, CompareError> {
        let config = Self::from_toml_str(&std::fs::read_to_string(path)?)?;
        log::info!("Loaded engine config from {}", path.display());
        Ok(config)
    }
}

/// Link prefixes for the map website, the FHRS website and the local
/// editor's remote-control endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Prefix for `<type>/<id>` map object pages.
    pub osm_url_prefix: String,
    /// Prefix for establishment pages, followed by the FHRS id.
    pub fhrs_url_prefix: String,
    /// Appended after the FHRS id.
    pub fhrs_url_suffix: String,
    /// Editor remote-control base URL.
    pub josm_url_prefix: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            osm_url_prefix: "http://www.openstreetmap.org/".to_string(),
            fhrs_url_prefix: "http://ratings.food.gov.uk/business/en-GB/".to_string(),
            fhrs_url_suffix: "/".to_string(),
            josm_url_prefix: "http://localhost:8111/".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn partial_toml_overrides_only_given_keys() {
        let config = EngineConfig::from_toml_str(
            r#"
            suggest_distance_m = 100.0
            concurrency = 8

            [links]
            josm_url_prefix = "http://127.0.0.1:8111/"
            "#,
        )
        .unwrap();

        assert!((config.suggest_distance_m - 100.0).abs() < f64::EPSILON);
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.suggest_edit_distance, 3);
        assert_eq!(config.links.josm_url_prefix, "http://127.0.0.1:8111/");
        assert_eq!(config.links.fhrs_url_suffix, "/");
    }

    #[test]
    fn wrong_types_are_rejected() {
        let err = EngineConfig::from_toml_str("concurrency = \"many\"").unwrap_err();
        assert!(matches!(err, CompareError::Config(_)));
    }
}
