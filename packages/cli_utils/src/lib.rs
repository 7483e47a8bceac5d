#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the FHRS/OSM binaries.
//!
//! [`init_logger`] installs a `pretty_env_logger` logger behind
//! `indicatif-log-bridge`, so log lines are printed above the progress bars
//! instead of tearing through them. [`IndicatifProgress`] renders the
//! engine's [`ProgressCallback`] updates.

use std::{sync::Arc, time::Duration};

use fhrs_osm_compare::progress::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

/// A [`ProgressBar`] driven through [`ProgressCallback`].
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Applied once the phase reports its total.
    counted_style: ProgressStyle,
}

impl IndicatifProgress {
    /// A spinner for a phase whose size is not known yet (loading,
    /// district assignment). Turns into a bar with ETA on `set_total`.
    #[must_use]
    pub fn phase_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        let counted_style = ProgressStyle::with_template(
            "  {msg} {wide_bar:.cyan/dim} {human_pos}/{human_len} {percent}% [{eta}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        Arc::new(Self { bar, counted_style })
    }

    /// A bar counting districts, for analysis and output writing.
    #[must_use]
    pub fn districts_bar(
        multi: &MultiProgress,
        message: &str,
        districts: u64,
    ) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new(districts));
        let counted_style = ProgressStyle::with_template(
            "{msg} {wide_bar:.green/dim} {pos}/{len} districts [{elapsed_precise}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
        bar.set_style(counted_style.clone());
        bar.set_message(message.to_string());

        Arc::new(Self { bar, counted_style })
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(self.counted_style.clone());
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Installs the global logger (level from `RUST_LOG`) and returns the
/// [`MultiProgress`] every bar must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    // Already set when called twice, e.g. from tests.
    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok();

    log::set_max_level(level);

    multi
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_total_switches_spinner_to_counted_bar() {
        let multi = MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden());
        let progress = IndicatifProgress::phase_bar(&multi, "Assigning districts");

        progress.set_total(10);
        progress.inc(4);
        progress.finish("done".to_string());
    }

    #[test]
    fn init_logger_tolerates_repeat_calls() {
        let _first = init_logger();
        let _second = init_logger();
    }
}
