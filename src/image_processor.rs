//! # Image Processing Module
//!
//! Questo modulo implementa il compressore raster: decodifica, ridimensiona e
//! ricodifica un'immagine interamente in memoria.
//!
//! ## Pipeline di compressione
//!
//! 1. **Decodifica**: `image::load_from_memory` (JPEG, PNG, WebP, GIF, BMP)
//! 2. **Dimensioni target**: `floor(w * scale)` × `floor(h * scale)`
//! 3. **Resample**: filtro Lanczos3 quando `scale != 1`
//! 4. **Encoding**: JPEG (`image`) oppure WebP lossy (`webp`)
//!
//! ## Formati di output
//!
//! | Formato | Encoder                          | Qualità              |
//! |---------|----------------------------------|----------------------|
//! | JPEG    | `image::codecs::jpeg::JpegEncoder` | `round(q * 100)` 1-100 |
//! | WebP    | `webp::Encoder` (lossy)          | `q * 100` 0-100      |
//!
//! ## Metadata
//!
//! La ricodifica parte dai soli pixel: EXIF, ICC e qualunque altro metadata
//! della sorgente non arrivano mai nell'output.
//!
//! ## Progress
//!
//! Nessun progress incrementale: dal punto di vista del chiamante la
//! compressione è un'unica unità di lavoro atomica.
//!
//! ## Esempio:
//! ```rust,ignore
//! let options = RasterOptions { quality: 0.8, scale: 0.5, format: RasterFormat::Webp };
//! let bytes = RasterCompressor::compress(&payload, &options)?;
//! ```

use crate::error::{PressError, PressResult};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GenericImageView};
use std::sync::Arc;

/// Largest side libwebp can encode
const WEBP_MAX_DIMENSION: u32 = 16383;
use tracing::debug;

/// Concrete raster output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Jpeg,
    Webp,
}

impl RasterFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            RasterFormat::Jpeg => "jpg",
            RasterFormat::Webp => "webp",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            RasterFormat::Jpeg => "image/jpeg",
            RasterFormat::Webp => "image/webp",
        }
    }
}

/// Options for one raster compression
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterOptions {
    /// Encoder quality 0.0-1.0
    pub quality: f64,
    /// Resize factor in (0, 1]
    pub scale: f64,
    pub format: RasterFormat,
}

/// Decode / resample / re-encode for still images
pub struct RasterCompressor;

impl RasterCompressor {
    /// Computes `floor(w * scale)` × `floor(h * scale)`.
    ///
    /// Fails with `InvalidDimensions` when the scale is outside (0, 1] or when
    /// either side collapses to zero.
    pub fn target_dimensions(width: u32, height: u32, scale: f64) -> PressResult<(u32, u32)> {
        if !(scale > 0.0 && scale <= 1.0) {
            return Err(PressError::InvalidDimensions { width: 0, height: 0, scale });
        }

        let target_width = (f64::from(width) * scale).floor() as u32;
        let target_height = (f64::from(height) * scale).floor() as u32;

        if target_width == 0 || target_height == 0 {
            return Err(PressError::InvalidDimensions {
                width: target_width,
                height: target_height,
                scale,
            });
        }

        Ok((target_width, target_height))
    }

    /// Compresses an encoded image payload. Blocks the calling thread.
    pub fn compress(payload: &[u8], options: &RasterOptions) -> PressResult<Vec<u8>> {
        let decoded = image::load_from_memory(payload)
            .map_err(|e| PressError::Decode(e.to_string()))?;

        let (width, height) = decoded.dimensions();
        let (target_width, target_height) =
            Self::target_dimensions(width, height, options.scale)?;

        let surface = if (target_width, target_height) == (width, height) {
            decoded
        } else {
            debug!(
                "Resampling {}x{} -> {}x{} (scale {})",
                width, height, target_width, target_height, options.scale
            );
            let resized = decoded.resize_exact(target_width, target_height, FilterType::Lanczos3);
            drop(decoded);
            resized
        };

        let output = match options.format {
            RasterFormat::Jpeg => Self::encode_jpeg(&surface, options.quality)?,
            RasterFormat::Webp => Self::encode_webp(&surface, options.quality)?,
        };

        debug!(
            "Raster compression produced {} bytes ({:?}, quality {:.2})",
            output.len(),
            options.format,
            options.quality
        );

        Ok(output)
    }

    /// Runs [`RasterCompressor::compress`] on tokio's blocking pool.
    pub async fn compress_offloaded(payload: Arc<[u8]>, options: RasterOptions) -> PressResult<Vec<u8>> {
        tokio::task::spawn_blocking(move || Self::compress(&payload, &options))
            .await
            .map_err(|e| PressError::Encode(format!("raster task aborted: {}", e)))?
    }

    fn encode_jpeg(surface: &DynamicImage, quality: f64) -> PressResult<Vec<u8>> {
        let quality = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
        let rgb = surface.to_rgb8();

        let mut output = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut output, quality);
        encoder
            .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
            .map_err(|e| PressError::Encode(format!("JPEG encoding error: {}", e)))?;

        Ok(output)
    }

    fn encode_webp(surface: &DynamicImage, quality: f64) -> PressResult<Vec<u8>> {
        let quality = (quality * 100.0).clamp(0.0, 100.0) as f32;
        // webp::Encoder only accepts 8-bit RGB/RGBA layouts
        let rgba = DynamicImage::ImageRgba8(surface.to_rgba8());

        let (width, height) = rgba.dimensions();
        if width > WEBP_MAX_DIMENSION || height > WEBP_MAX_DIMENSION {
            return Err(PressError::Encode(format!(
                "WebP output {}x{} exceeds the {} px limit",
                width, height, WEBP_MAX_DIMENSION
            )));
        }

        let encoder = webp::Encoder::from_image(&rgba)
            .map_err(|e| PressError::Encode(format!("WebP encoding error: {}", e)))?;
        let memory = encoder
            .encode_simple(false, quality)
            .map_err(|e| PressError::Encode(format!("WebP encoding error: {:?}", e)))?;

        Ok(memory.to_vec())
    }
}
