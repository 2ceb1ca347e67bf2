//! Progress display for organization deletion jobs.
//!
//! Purely observational: nothing here influences when polling stops.

use crate::models::Organization;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// Bar length; positions are hundredths of a percent.
const BAR_SCALE: u64 = 10_000;

/// Round a percentage to two decimal places for display.
pub fn round_percent(percent: f64) -> f64 {
    (percent * 100.0).round() / 100.0
}

/// Receives job progress as it is polled.
pub trait ProgressReporter: Send + Sync {
    /// A deletion job for `org` is about to start.
    fn begin(&self, org: &Organization);

    /// Latest progress, already rounded to two decimals.
    fn update(&self, percent: f64);

    /// The current job reached 100%.
    fn finish(&self);

    /// The current job was given up on before completing.
    fn abandon(&self);
}

/// Terminal progress bar, one bar per organization.
pub struct TerminalProgress {
    style: ProgressStyle,
    bar: Mutex<Option<ProgressBar>>,
}

impl TerminalProgress {
    pub fn new() -> Self {
        let style = ProgressStyle::with_template("  [{bar:40.cyan/blue}] {msg:>7} | {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");

        Self {
            style,
            bar: Mutex::new(None),
        }
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for TerminalProgress {
    fn begin(&self, _org: &Organization) {
        let bar = ProgressBar::new(BAR_SCALE).with_style(self.style.clone());
        bar.set_message(format!("{:.2}%", 0.0));

        if let Ok(mut current) = self.bar.lock() {
            if let Some(previous) = current.replace(bar) {
                previous.abandon();
            }
        }
    }

    fn update(&self, percent: f64) {
        if let Ok(current) = self.bar.lock() {
            if let Some(bar) = current.as_ref() {
                let clamped = percent.clamp(0.0, 100.0);
                bar.set_position((clamped * 100.0).round() as u64);
                bar.set_message(format!("{:.2}%", percent));
            }
        }
    }

    fn finish(&self) {
        if let Ok(mut current) = self.bar.lock() {
            if let Some(bar) = current.take() {
                bar.finish();
            }
        }
    }

    fn abandon(&self) {
        if let Ok(mut current) = self.bar.lock() {
            if let Some(bar) = current.take() {
                bar.abandon();
            }
        }
    }
}

/// Log-only reporter for non-interactive runs.
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn begin(&self, org: &Organization) {
        tracing::debug!(org_id = org.id, "Tracking deletion job");
    }

    fn update(&self, percent: f64) {
        tracing::info!(progress = percent, "Deletion job progress {:.2}%", percent);
    }

    fn finish(&self) {
        tracing::debug!("Deletion job tracking finished");
    }

    fn abandon(&self) {
        tracing::warn!("Deletion job abandoned before completion");
    }
}
