#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reconciliation engine for OSM map entities and FHRS establishments.
//!
//! The run is batch shaped:
//!
//! 1. every entity and establishment is attributed to a district
//!    ([`assign`]), a global step that must finish first,
//! 2. the two datasets are full-outer-joined on the entity's `fhrs:id`
//!    and each row is classified ([`join`], [`classify`]),
//! 3. per-district analyses run independently and may run in parallel
//!    ([`engine::Engine::analyze_all`]): duplicates, suggested matches,
//!    distant matches, display clusters, statistics, postcode reports.
//!
//! Nothing mutates shared data after step 1, so the district workers
//! share the [`engine::Engine`] read-only behind an `Arc`.

pub mod assign;
pub mod classify;
pub mod cluster;
pub mod config;
pub mod distant;
pub mod duplicates;
pub mod engine;
pub mod join;
pub mod names;
pub mod postcode;
pub mod progress;
pub mod stats;
pub mod suggest;

#[cfg(test)]
pub(crate) mod test_support;

/// Errors raised by the reconciliation engine.
#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    /// A reference dataset the run cannot proceed without is absent or
    /// unusable.
    #[error("missing prerequisite dataset: {dataset}")]
    MissingPrerequisite {
        /// Name of the missing dataset.
        dataset: String,
    },

    /// Configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// A district worker panicked or was cancelled.
    #[error("District worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Returns `value` unless it is absent or blank.
///
/// Empty tag values carry no information and are treated as missing
/// throughout the engine.
pub(crate) fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
