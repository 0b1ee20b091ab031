//! # Media Transform Module
//!
//! Trasformazioni eseguite dalla sessione, una per tipo di asset.
//!
//! ## Implementazioni:
//! - `RasterTransform`: ritardo cosmetico per input piccoli, poi compressione raster offloaded
//! - `TranscodeTransform`: transcodifica video tramite worker isolato, con progress

use crate::config::Config;
use crate::error::PressResult;
use crate::image_processor::{RasterCompressor, RasterOptions};
use crate::media::MediaAsset;
use crate::session::state::JobSettings;
use crate::transcode::Transcoder;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Receives progress percentages (0-100) while a transform runs
pub type ProgressSink = Arc<dyn Fn(f64) + Send + Sync>;

#[async_trait]
pub trait MediaTransform: Send + Sync {
    async fn apply(&self, asset: &MediaAsset, settings: &JobSettings, progress: ProgressSink) -> PressResult<Vec<u8>>;
}

/// Still images through the raster compressor
pub struct RasterTransform {
    cosmetic_delay: Duration,
    delay_threshold: u64,
}

impl RasterTransform {
    pub fn new(cosmetic_delay: Duration, delay_threshold: u64) -> Self {
        Self {
            cosmetic_delay,
            delay_threshold,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.cosmetic_delay(), config.cosmetic_delay_threshold)
    }
}

#[async_trait]
impl MediaTransform for RasterTransform {
    async fn apply(&self, asset: &MediaAsset, settings: &JobSettings, _progress: ProgressSink) -> PressResult<Vec<u8>> {
        if asset.size() < self.delay_threshold && !self.cosmetic_delay.is_zero() {
            debug!("Small input, waiting {:?} before compressing", self.cosmetic_delay);
            tokio::time::sleep(self.cosmetic_delay).await;
        }

        let options = RasterOptions {
            quality: settings.quality,
            scale: settings.scale,
            format: settings.raster_format,
        };
        RasterCompressor::compress_offloaded(asset.shared_payload(), options).await
    }
}

/// Video through an isolated transcoding worker
pub struct TranscodeTransform {
    transcoder: Transcoder,
}

impl TranscodeTransform {
    pub fn new(transcoder: Transcoder) -> Self {
        Self { transcoder }
    }
}

#[async_trait]
impl MediaTransform for TranscodeTransform {
    async fn apply(&self, asset: &MediaAsset, settings: &JobSettings, progress: ProgressSink) -> PressResult<Vec<u8>> {
        self.transcoder
            .transcode(asset.payload(), settings.quality, move |p| progress(p))
            .await
    }
}
