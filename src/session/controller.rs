//! # Session Controller Module
//!
//! Driver async della macchina a stati della sessione.
//!
//! ## Responsabilità:
//! - Possiede lo `SessionState` dietro un mutex condiviso con il task del job
//! - Avvia un job alla volta su un task tokio, scegliendo la trasformazione per tipo di asset
//! - Pubblica uno `SessionSnapshot` su un canale `watch` dopo ogni transizione
//! - Annulla il job in corso su `reset` e su una nuova selezione (`AbortHandle`)

use crate::config::{CompressionConfig, Config, PerformanceProfile, TargetFormat};
use crate::error::PressResult;
use crate::media::{MediaAsset, MediaKind};
use crate::session::preview::PreviewRegistry;
use crate::session::state::{CompressionResult, SessionSnapshot, SessionState};
use crate::session::transform::{MediaTransform, ProgressSink, RasterTransform, TranscodeTransform};
use crate::transcode::Transcoder;
use crate::video_processor::FfmpegLoader;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error};

/// Owns one compression session and runs its jobs.
///
/// Every transition publishes a fresh [`SessionSnapshot`] to subscribers.
pub struct SessionController {
    state: Arc<Mutex<SessionState>>,
    updates: Arc<watch::Sender<SessionSnapshot>>,
    registry: PreviewRegistry,
    raster: Arc<dyn MediaTransform>,
    video: Arc<dyn MediaTransform>,
    job: Mutex<Option<AbortHandle>>,
}

impl SessionController {
    pub fn new(config: &Config) -> Self {
        let loader = FfmpegLoader::new(config.ffmpeg_path.clone(), config.ffprobe_path.clone());
        let transcoder = Transcoder::new(Arc::new(loader), config.transcode_timeout());

        Self::with_transforms(
            config.compression.clone(),
            PreviewRegistry::new(),
            Arc::new(RasterTransform::from_config(config)),
            Arc::new(TranscodeTransform::new(transcoder)),
        )
    }

    pub fn with_transforms(
        compression: CompressionConfig,
        registry: PreviewRegistry,
        raster: Arc<dyn MediaTransform>,
        video: Arc<dyn MediaTransform>,
    ) -> Self {
        let state = SessionState::new(compression, registry.clone());
        let (updates, _) = watch::channel(state.snapshot());

        Self {
            state: Arc::new(Mutex::new(state)),
            updates: Arc::new(updates),
            registry,
            raster,
            video,
            job: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        lock(&self.state).snapshot()
    }

    /// Replaces the asset, cancelling any running job.
    pub fn select_asset(&self, asset: MediaAsset) -> PressResult<()> {
        self.abort_job();
        let mut state = lock(&self.state);
        let outcome = state.select_asset(asset);
        self.updates.send_replace(state.snapshot());
        outcome
    }

    /// Starts a job for the current asset.
    ///
    /// The returned handle resolves once the job has settled or been
    /// cancelled by `reset` / `select_asset`.
    pub fn start_job(&self) -> PressResult<JoinHandle<()>> {
        let (ticket, asset, settings) = {
            let mut state = lock(&self.state);
            let job = state.begin_job()?;
            self.updates.send_replace(state.snapshot());
            job
        };

        let transform = match asset.kind() {
            MediaKind::Video => Arc::clone(&self.video),
            _ => Arc::clone(&self.raster),
        };

        let progress_state = Arc::clone(&self.state);
        let progress_updates = Arc::clone(&self.updates);
        let sink: ProgressSink = Arc::new(move |progress| {
            let mut state = lock(&progress_state);
            if state.report_progress(ticket, progress) {
                progress_updates.send_replace(state.snapshot());
            }
        });

        let state = Arc::clone(&self.state);
        let updates = Arc::clone(&self.updates);
        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let outcome = transform.apply(&asset, &settings, sink).await;

            let mut state = lock(&state);
            let settled = match outcome {
                Ok(bytes) => state.complete(ticket, &settings, bytes, started.elapsed()),
                Err(e) => {
                    error!("Compression of {} failed: {}", asset.name(), e);
                    state.fail(ticket, &e)
                }
            };
            if settled {
                updates.send_replace(state.snapshot());
            }
        });

        *lock(&self.job) = Some(handle.abort_handle());
        Ok(handle)
    }

    /// Cancels any running job and clears the session.
    pub fn reset(&self) {
        self.abort_job();
        let mut state = lock(&self.state);
        state.reset();
        self.updates.send_replace(state.snapshot());
    }

    pub fn set_quality(&self, quality: u8) -> PressResult<()> {
        self.update(|state| state.set_quality(quality))
    }

    pub fn set_scale(&self, scale: f64) -> PressResult<()> {
        self.update(|state| state.set_scale(scale))
    }

    pub fn set_format(&self, format: TargetFormat) {
        let _ = self.update(|state| {
            state.set_format(format);
            Ok(())
        });
    }

    pub fn set_strip_metadata(&self, strip: bool) {
        let _ = self.update(|state| {
            state.set_strip_metadata(strip);
            Ok(())
        });
    }

    pub fn set_profile(&self, profile: PerformanceProfile) {
        let _ = self.update(|state| {
            state.set_profile(profile);
            Ok(())
        });
    }

    /// Artifact of the last successful job
    pub fn result(&self) -> Option<CompressionResult> {
        lock(&self.state).result().cloned()
    }

    pub fn live_previews(&self) -> usize {
        self.registry.live_count()
    }

    fn update(&self, apply: impl FnOnce(&mut SessionState) -> PressResult<()>) -> PressResult<()> {
        let mut state = lock(&self.state);
        apply(&mut state)?;
        self.updates.send_replace(state.snapshot());
        Ok(())
    }

    fn abort_job(&self) {
        if let Some(job) = lock(&self.job).take() {
            if !job.is_finished() {
                debug!("Cancelling running job");
                job.abort();
            }
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.abort_job();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
