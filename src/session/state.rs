//! # Session State Module
//!
//! Macchina a stati pura della sessione di compressione.
//!
//! ## Responsabilità:
//! - Transizioni sincrone: selezione, avvio job, progress, esito, reset
//! - `JobTicket`: ogni job ha una generazione; gli esiti con ticket non corrente vengono scartati
//! - Statistiche (`ProcessingStats`) e artefatto finale (`CompressionResult`)
//! - Snapshot della configurazione all'avvio (`JobSettings`) e normalizzazione del formato raster

use crate::config::{CompressionConfig, PerformanceProfile, TargetFormat};
use crate::error::{FailureKind, PressError, PressResult};
use crate::image_processor::RasterFormat;
use crate::media::{MediaAsset, MediaKind};
use crate::session::preview::{PreviewRegistry, PreviewResource};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Shown when the selected file is neither an image nor a video
pub const UNSUPPORTED_MESSAGE: &str = "Unsupported file type. Please choose an image or a video.";

/// Shown for every job failure; the structured kind stays in the snapshot
pub const JOB_FAILED_MESSAGE: &str = "Corrupt or unsupported media";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Idle,
    Processing,
    Completed,
    Error,
}

/// Identifies one job; invalidated by the next job, a reset or a new selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobTicket {
    generation: u64,
}

/// Statistics of a finished job
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStats {
    pub original_size: u64,
    pub compressed_size: u64,
    /// Percentage saved; negative when the output grew
    pub compression_ratio: f64,
    /// Seconds from job start to settlement
    pub time_elapsed: f64,
}

impl ProcessingStats {
    pub fn new(original_size: u64, compressed_size: u64, elapsed: Duration) -> Self {
        Self {
            original_size,
            compressed_size,
            compression_ratio: Self::compression_ratio(original_size, compressed_size),
            time_elapsed: elapsed.as_secs_f64(),
        }
    }

    pub fn compression_ratio(original_size: u64, compressed_size: u64) -> f64 {
        if original_size == 0 {
            return 0.0;
        }
        (original_size as f64 - compressed_size as f64) / original_size as f64 * 100.0
    }
}

/// Artifact of a successful job
#[derive(Debug, Clone)]
pub struct CompressionResult {
    pub bytes: Arc<[u8]>,
    pub size: u64,
    pub extension: &'static str,
    pub content_type: &'static str,
}

/// Config frozen at job start
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JobSettings {
    pub kind: MediaKind,
    /// Quality scalar 0.0-1.0
    pub quality: f64,
    pub scale: f64,
    pub raster_format: RasterFormat,
}

impl JobSettings {
    pub fn snapshot(config: &CompressionConfig, kind: MediaKind) -> Self {
        Self {
            kind,
            quality: config.quality_scalar(),
            scale: config.scale,
            raster_format: raster_format_for(config.format),
        }
    }

    pub fn output_extension(&self) -> &'static str {
        match self.kind {
            MediaKind::Video => "mp4",
            _ => self.raster_format.extension(),
        }
    }

    pub fn output_content_type(&self) -> &'static str {
        match self.kind {
            MediaKind::Video => "video/mp4",
            _ => self.raster_format.content_type(),
        }
    }
}

/// `jpeg` and `original` encode as JPEG, anything else as WebP
pub fn raster_format_for(format: TargetFormat) -> RasterFormat {
    match format {
        TargetFormat::Jpeg | TargetFormat::Original => RasterFormat::Jpeg,
        TargetFormat::Webp | TargetFormat::Mp4 => RasterFormat::Webp,
    }
}

/// What observers see after every transition
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub status: JobStatus,
    pub progress: f64,
    pub asset_name: Option<String>,
    pub asset_kind: Option<MediaKind>,
    pub error: Option<String>,
    pub failure: Option<FailureKind>,
    pub stats: Option<ProcessingStats>,
    pub original_preview: Option<String>,
    pub compressed_preview: Option<String>,
    pub config: CompressionConfig,
}

pub struct SessionState {
    registry: PreviewRegistry,
    config: CompressionConfig,
    asset: Option<MediaAsset>,
    status: JobStatus,
    progress: f64,
    error: Option<String>,
    failure: Option<FailureKind>,
    stats: Option<ProcessingStats>,
    result: Option<CompressionResult>,
    original_preview: Option<PreviewResource>,
    compressed_preview: Option<PreviewResource>,
    generation: u64,
}

impl SessionState {
    pub fn new(config: CompressionConfig, registry: PreviewRegistry) -> Self {
        Self {
            registry,
            config,
            asset: None,
            status: JobStatus::Idle,
            progress: 0.0,
            error: None,
            failure: None,
            stats: None,
            result: None,
            original_preview: None,
            compressed_preview: None,
            generation: 0,
        }
    }

    /// Replaces the current asset.
    ///
    /// An unsupported kind moves the session to `Error` and leaves the
    /// previous asset and previews in place.
    pub fn select_asset(&mut self, asset: MediaAsset) -> PressResult<()> {
        self.abandon_job();

        let default_format = match asset.kind() {
            MediaKind::Image => TargetFormat::Webp,
            MediaKind::Video => TargetFormat::Mp4,
            MediaKind::Unknown => {
                warn!("Rejected {} ({})", asset.name(), asset.content_type());
                let err = PressError::UnsupportedInput(asset.content_type().to_string());
                self.status = JobStatus::Error;
                self.error = Some(UNSUPPORTED_MESSAGE.to_string());
                self.failure = Some(err.kind());
                return Err(err);
            }
        };

        self.original_preview = None;
        self.compressed_preview = None;
        self.result = None;
        self.stats = None;
        self.progress = 0.0;
        self.error = None;
        self.failure = None;

        let extension = preview_extension(asset.content_type());
        match self.registry.create(asset.payload(), extension) {
            Ok(preview) => self.original_preview = Some(preview),
            Err(e) => {
                self.asset = None;
                self.status = JobStatus::Error;
                self.error = Some(e.to_string());
                self.failure = Some(e.kind());
                return Err(e);
            }
        }

        info!("Selected {} ({} bytes)", asset.name(), asset.size());
        self.config.format = default_format;
        self.asset = Some(asset);
        self.status = JobStatus::Idle;
        Ok(())
    }

    /// Moves to `Processing` and hands out what the job needs.
    pub fn begin_job(&mut self) -> PressResult<(JobTicket, MediaAsset, JobSettings)> {
        let asset = match self.asset {
            Some(ref asset) => asset.clone(),
            None => return Err(PressError::InvalidState("no asset selected".to_string())),
        };
        if self.status == JobStatus::Processing {
            return Err(PressError::InvalidState("a job is already running".to_string()));
        }
        if asset.kind() == MediaKind::Unknown {
            return Err(PressError::InvalidState("asset kind is not supported".to_string()));
        }

        self.generation += 1;
        self.status = JobStatus::Processing;
        self.progress = 0.0;
        self.error = None;
        self.failure = None;
        self.stats = None;
        self.result = None;
        self.compressed_preview = None;

        let settings = JobSettings::snapshot(&self.config, asset.kind());
        debug!("Job {} started with {:?}", self.generation, settings);

        Ok((JobTicket { generation: self.generation }, asset, settings))
    }

    /// Applies a progress value. Returns false when the update was ignored.
    pub fn report_progress(&mut self, ticket: JobTicket, progress: f64) -> bool {
        if !self.is_current(ticket) || progress.is_nan() {
            return false;
        }
        self.progress = progress.clamp(0.0, 100.0);
        true
    }

    /// Settles the job successfully. Returns false for a stale ticket.
    pub fn complete(&mut self, ticket: JobTicket, settings: &JobSettings, bytes: Vec<u8>, elapsed: Duration) -> bool {
        if !self.is_current(ticket) {
            debug!("Discarding stale completion of job {}", ticket.generation);
            return false;
        }

        let original_size = self.asset.as_ref().map_or(0, MediaAsset::size);
        let preview = match self.registry.create(&bytes, settings.output_extension()) {
            Ok(preview) => preview,
            Err(e) => return self.fail(ticket, &e),
        };

        let stats = ProcessingStats::new(original_size, bytes.len() as u64, elapsed);
        info!(
            "Job {} completed: {} -> {} bytes ({:.1}%)",
            ticket.generation, stats.original_size, stats.compressed_size, stats.compression_ratio
        );

        self.result = Some(CompressionResult {
            size: bytes.len() as u64,
            bytes: bytes.into(),
            extension: settings.output_extension(),
            content_type: settings.output_content_type(),
        });
        self.compressed_preview = Some(preview);
        self.stats = Some(stats);
        self.progress = 100.0;
        self.status = JobStatus::Completed;
        true
    }

    /// Settles the job with a failure. Returns false for a stale ticket.
    pub fn fail(&mut self, ticket: JobTicket, err: &PressError) -> bool {
        if !self.is_current(ticket) {
            debug!("Discarding stale failure of job {}: {}", ticket.generation, err);
            return false;
        }

        warn!("Job {} failed: {}", ticket.generation, err);
        self.error = Some(JOB_FAILED_MESSAGE.to_string());
        self.failure = Some(err.kind());
        self.status = JobStatus::Error;
        true
    }

    /// Back to `Idle` with no asset. Preferences are kept.
    pub fn reset(&mut self) {
        self.abandon_job();
        self.original_preview = None;
        self.compressed_preview = None;
        self.asset = None;
        self.result = None;
        self.stats = None;
        self.progress = 0.0;
        self.error = None;
        self.failure = None;
        self.status = JobStatus::Idle;
    }

    pub fn set_quality(&mut self, quality: u8) -> PressResult<()> {
        self.update_config(|config| config.quality = quality)
    }

    pub fn set_scale(&mut self, scale: f64) -> PressResult<()> {
        self.update_config(|config| config.scale = scale)
    }

    pub fn set_format(&mut self, format: TargetFormat) {
        self.config.format = format;
    }

    pub fn set_strip_metadata(&mut self, strip: bool) {
        self.config.strip_metadata = strip;
    }

    pub fn set_profile(&mut self, profile: PerformanceProfile) {
        self.config.profile = profile;
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn asset(&self) -> Option<&MediaAsset> {
        self.asset.as_ref()
    }

    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    pub fn result(&self) -> Option<&CompressionResult> {
        self.result.as_ref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            progress: self.progress,
            asset_name: self.asset.as_ref().map(|a| a.name().to_string()),
            asset_kind: self.asset.as_ref().map(MediaAsset::kind),
            error: self.error.clone(),
            failure: self.failure,
            stats: self.stats.clone(),
            original_preview: self.original_preview.as_ref().map(PreviewResource::uri),
            compressed_preview: self.compressed_preview.as_ref().map(PreviewResource::uri),
            config: self.config.clone(),
        }
    }

    fn is_current(&self, ticket: JobTicket) -> bool {
        ticket.generation == self.generation && self.status == JobStatus::Processing
    }

    fn abandon_job(&mut self) {
        if self.status == JobStatus::Processing {
            info!("Abandoning job {}", self.generation);
        }
        self.generation += 1;
    }

    fn update_config(&mut self, apply: impl FnOnce(&mut CompressionConfig)) -> PressResult<()> {
        let mut candidate = self.config.clone();
        apply(&mut candidate);
        candidate
            .validate()
            .map_err(|e| PressError::Validation(e.to_string()))?;
        self.config = candidate;
        Ok(())
    }
}

fn preview_extension(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "video/quicktime" => "mov",
        "video/webm" => "webm",
        "video/mp4" => "mp4",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn state(dir: &TempDir) -> (SessionState, PreviewRegistry) {
        let registry = PreviewRegistry::in_dir(dir.path());
        (SessionState::new(CompressionConfig::default(), registry.clone()), registry)
    }

    fn image() -> MediaAsset {
        MediaAsset::new("photo.png", "image/png", vec![7; 2_000])
    }

    #[test]
    fn test_compression_ratio() {
        assert_eq!(ProcessingStats::compression_ratio(1_000_000, 250_000), 75.0);
        assert_eq!(ProcessingStats::compression_ratio(0, 10), 0.0);
        assert_eq!(ProcessingStats::compression_ratio(100, 150), -50.0);
    }

    #[test]
    fn test_stats_serialize_camel_case() {
        let stats = ProcessingStats::new(1_000_000, 250_000, Duration::from_millis(1500));
        let json = serde_json::to_value(&stats).unwrap();

        assert_eq!(json["originalSize"], 1_000_000);
        assert_eq!(json["compressedSize"], 250_000);
        assert_eq!(json["compressionRatio"], 75.0);
        assert_eq!(json["timeElapsed"], 1.5);
    }

    #[test]
    fn test_raster_format_normalization() {
        assert_eq!(raster_format_for(TargetFormat::Jpeg), RasterFormat::Jpeg);
        assert_eq!(raster_format_for(TargetFormat::Original), RasterFormat::Jpeg);
        assert_eq!(raster_format_for(TargetFormat::Webp), RasterFormat::Webp);
        assert_eq!(raster_format_for(TargetFormat::Mp4), RasterFormat::Webp);
    }

    #[test]
    fn test_select_picks_default_format() {
        let dir = TempDir::new().unwrap();
        let (mut state, _) = state(&dir);

        state.select_asset(image()).unwrap();
        assert_eq!(state.config().format, TargetFormat::Webp);
        assert_eq!(state.status(), JobStatus::Idle);
        assert!(state.snapshot().original_preview.is_some());

        state
            .select_asset(MediaAsset::new("clip.mov", "video/quicktime", vec![1; 64]))
            .unwrap();
        assert_eq!(state.config().format, TargetFormat::Mp4);
    }

    #[test]
    fn test_unsupported_selection() {
        let dir = TempDir::new().unwrap();
        let (mut state, registry) = state(&dir);

        let err = state
            .select_asset(MediaAsset::new("notes.txt", "text/plain", b"hello".to_vec()))
            .unwrap_err();
        assert!(matches!(err, PressError::UnsupportedInput(_)));

        let snapshot = state.snapshot();
        assert_eq!(snapshot.status, JobStatus::Error);
        assert_eq!(snapshot.failure, Some(FailureKind::UnsupportedInput));
        assert_eq!(snapshot.error.as_deref(), Some(UNSUPPORTED_MESSAGE));
        assert!(snapshot.original_preview.is_none());
        assert_eq!(registry.live_count(), 0);
        assert!(state.begin_job().is_err());
    }

    #[test]
    fn test_reselect_keeps_one_original_preview() {
        let dir = TempDir::new().unwrap();
        let (mut state, registry) = state(&dir);

        state.select_asset(image()).unwrap();
        state.select_asset(MediaAsset::new("b.jpg", "image/jpeg", vec![3; 10])).unwrap();

        assert_eq!(registry.live_count(), 1);
        assert_eq!(state.snapshot().asset_name.as_deref(), Some("b.jpg"));
    }

    #[test]
    fn test_begin_job_requires_asset() {
        let dir = TempDir::new().unwrap();
        let (mut state, _) = state(&dir);

        assert!(matches!(state.begin_job(), Err(PressError::InvalidState(_))));
        assert_eq!(state.status(), JobStatus::Idle);
    }

    #[test]
    fn test_single_job_at_a_time() {
        let dir = TempDir::new().unwrap();
        let (mut state, _) = state(&dir);
        state.select_asset(image()).unwrap();

        state.begin_job().unwrap();
        assert!(matches!(state.begin_job(), Err(PressError::InvalidState(_))));
        assert_eq!(state.status(), JobStatus::Processing);
    }

    #[test]
    fn test_progress_then_completion() {
        let dir = TempDir::new().unwrap();
        let (mut state, registry) = state(&dir);
        state.select_asset(image()).unwrap();

        let (ticket, _, settings) = state.begin_job().unwrap();
        assert!(state.report_progress(ticket, 30.0));
        assert!(state.report_progress(ticket, 90.0));
        assert_eq!(state.snapshot().progress, 90.0);

        assert!(state.complete(ticket, &settings, vec![1; 500], Duration::from_millis(10)));

        let snapshot = state.snapshot();
        assert_eq!(snapshot.status, JobStatus::Completed);
        assert_eq!(snapshot.progress, 100.0);
        assert_eq!(snapshot.stats.as_ref().unwrap().compression_ratio, 75.0);
        assert!(snapshot.compressed_preview.unwrap().ends_with(".webp"));
        assert_eq!(registry.live_count(), 2);

        let result = state.result().unwrap();
        assert_eq!(result.size, 500);
        assert_eq!(result.extension, "webp");
    }

    #[test]
    fn test_progress_ignored_outside_processing() {
        let dir = TempDir::new().unwrap();
        let (mut state, _) = state(&dir);
        state.select_asset(image()).unwrap();

        let before = state.snapshot();
        assert!(!state.report_progress(JobTicket { generation: state.generation }, 42.0));
        assert_eq!(state.snapshot(), before);

        let (ticket, _, settings) = state.begin_job().unwrap();
        state.complete(ticket, &settings, vec![0; 10], Duration::ZERO);

        let before = state.snapshot();
        assert!(!state.report_progress(ticket, 10.0));
        assert_eq!(state.snapshot(), before);
    }

    #[test]
    fn test_late_settlement_after_reset_is_discarded() {
        let dir = TempDir::new().unwrap();
        let (mut state, registry) = state(&dir);
        state.select_asset(image()).unwrap();

        let (ticket, _, settings) = state.begin_job().unwrap();
        state.reset();

        assert!(!state.complete(ticket, &settings, vec![0; 10], Duration::ZERO));
        assert!(!state.fail(ticket, &PressError::Decode("late".into())));
        assert!(!state.report_progress(ticket, 50.0));

        let snapshot = state.snapshot();
        assert_eq!(snapshot.status, JobStatus::Idle);
        assert!(snapshot.asset_name.is_none());
        assert!(snapshot.stats.is_none());
        assert!(state.result().is_none());
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_settlement_after_reselect_is_discarded() {
        let dir = TempDir::new().unwrap();
        let (mut state, _) = state(&dir);
        state.select_asset(image()).unwrap();

        let (ticket, _, settings) = state.begin_job().unwrap();
        state.select_asset(MediaAsset::new("next.png", "image/png", vec![1; 4])).unwrap();

        assert!(!state.complete(ticket, &settings, vec![0; 10], Duration::ZERO));
        assert_eq!(state.status(), JobStatus::Idle);
        assert_eq!(state.snapshot().asset_name.as_deref(), Some("next.png"));
    }

    #[test]
    fn test_failure_collapses_message() {
        let dir = TempDir::new().unwrap();
        let (mut state, _) = state(&dir);
        state.select_asset(image()).unwrap();

        let (ticket, _, _) = state.begin_job().unwrap();
        assert!(state.fail(ticket, &PressError::Decode("bad huffman table".into())));

        let snapshot = state.snapshot();
        assert_eq!(snapshot.status, JobStatus::Error);
        assert_eq!(snapshot.error.as_deref(), Some(JOB_FAILED_MESSAGE));
        assert_eq!(snapshot.failure, Some(FailureKind::Decode));
        assert!(snapshot.stats.is_none());
    }

    #[test]
    fn test_settings_frozen_at_start() {
        let dir = TempDir::new().unwrap();
        let (mut state, _) = state(&dir);
        state.select_asset(image()).unwrap();
        state.set_format(TargetFormat::Original);
        state.set_quality(50).unwrap();

        let (_, _, settings) = state.begin_job().unwrap();
        state.set_quality(90).unwrap();
        state.set_format(TargetFormat::Webp);

        assert_eq!(settings.quality, 0.5);
        assert_eq!(settings.raster_format, RasterFormat::Jpeg);
        assert_eq!(settings.output_extension(), "jpg");
    }

    #[test]
    fn test_setters_validate() {
        let dir = TempDir::new().unwrap();
        let (mut state, _) = state(&dir);

        assert!(matches!(state.set_quality(0), Err(PressError::Validation(_))));
        assert!(matches!(state.set_scale(1.5), Err(PressError::Validation(_))));
        assert_eq!(state.config().quality, 80);

        state.set_scale(0.5).unwrap();
        state.set_profile(PerformanceProfile::Eco);
        state.set_strip_metadata(false);
        assert_eq!(state.config().scale, 0.5);
        assert_eq!(state.config().profile, PerformanceProfile::Eco);
        assert!(!state.config().strip_metadata);
    }

    #[test]
    fn test_reset_keeps_preferences() {
        let dir = TempDir::new().unwrap();
        let (mut state, _) = state(&dir);
        state.set_quality(42).unwrap();
        state.select_asset(image()).unwrap();

        state.reset();
        assert_eq!(state.config().quality, 42);
        assert_eq!(state.status(), JobStatus::Idle);
        assert!(state.asset().is_none());
    }
}
