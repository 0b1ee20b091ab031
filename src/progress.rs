//! # Progress Display Module
//!
//! Questo modulo mostra l'avanzamento di un job di compressione.
//!
//! ## Responsabilità:
//! - Progress bar `indicatif` 0-100 alimentata dagli snapshot della sessione
//! - Cadenza del tick dal profilo di performance (`eco` più lento, `beast` più reattivo)
//! - Riepilogo finale delle statistiche
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:04] [██████████████████████░░░░░░░░░░░░░░░░░░] 55% clip.mp4
//! ```

use crate::config::PerformanceProfile;
use crate::file_manager::FileManager;
use crate::session::ProcessingStats;
use indicatif::{ProgressBar, ProgressStyle};

/// Manages the progress bar of one job
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress bar ticking at the profile's cadence
    pub fn new(profile: PerformanceProfile) -> Self {
        let bar = ProgressBar::new(100);

        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
                .unwrap()
                .progress_chars("=>-"),
        );

        bar.enable_steady_tick(profile.tick_interval());

        Self { bar }
    }

    /// Move to a percentage (0-100)
    pub fn set_position(&self, percent: f64) {
        self.bar.set_position(percent.clamp(0.0, 100.0).round() as u64);
    }

    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Stop and clear the bar, e.g. on failure
    pub fn abandon(&self, message: &str) {
        self.bar.abandon_with_message(message.to_string());
    }
}

/// One-line summary of a finished job
pub fn format_summary(stats: &ProcessingStats) -> String {
    format!(
        "{} → {} ({:.2}% saved) in {:.2}s",
        FileManager::format_size(stats.original_size),
        FileManager::format_size(stats.compressed_size),
        stats.compression_ratio,
        stats.time_elapsed
    )
}
