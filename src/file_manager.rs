//! # File Management Module
//!
//! Questo modulo gestisce l'ingresso e l'uscita dei file sul filesystem.
//!
//! ## Responsabilità:
//! - Lettura del file scelto e costruzione del `MediaAsset`
//! - Determinazione del MIME type dall'estensione
//! - Nome del file di output (`ghostpress_optimized_<millis>.<ext>`)
//! - Scrittura dell'artefatto compresso
//! - Formattazione human-readable delle dimensioni
//!
//! ## MIME types riconosciuti:
//! - **Immagini**: JPG, JPEG, PNG, WebP, GIF, BMP
//! - **Video**: MP4, MOV, WebM
//! - Tutto il resto: `application/octet-stream` (rifiutato dalla sessione)
//!
//! ## Esempio:
//! ```rust,ignore
//! let asset = FileManager::load_asset(Path::new("photo.png")).await?;
//! let output = FileManager::output_file_name(result.extension);
//! FileManager::write_output(Path::new(&output), &result.bytes).await?;
//! ```

use crate::media::MediaAsset;
use anyhow::{Context, Result};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;
use tracing::debug;

/// Fallback MIME type for unrecognized extensions
pub const UNKNOWN_CONTENT_TYPE: &str = "application/octet-stream";

/// Manages file input and output
pub struct FileManager;

impl FileManager {
    /// Read a file into a media asset
    pub async fn load_asset(path: &Path) -> Result<MediaAsset> {
        let payload = fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let content_type = Self::content_type_for_path(path);

        debug!("Loaded {} ({}, {} bytes)", name, content_type, payload.len());
        Ok(MediaAsset::new(name, content_type, payload))
    }

    /// MIME type from the file extension
    pub fn content_type_for_path(path: &Path) -> &'static str {
        let Some(ext) = path.extension() else {
            return UNKNOWN_CONTENT_TYPE;
        };

        match ext.to_string_lossy().to_lowercase().as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "webp" => "image/webp",
            "gif" => "image/gif",
            "bmp" => "image/bmp",
            "mp4" => "video/mp4",
            "mov" => "video/quicktime",
            "webm" => "video/webm",
            _ => UNKNOWN_CONTENT_TYPE,
        }
    }

    /// Default download name for an artifact
    pub fn output_file_name(extension: &str) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        Self::output_file_name_at(millis, extension)
    }

    pub fn output_file_name_at(millis: u128, extension: &str) -> String {
        format!("ghostpress_optimized_{}.{}", millis, extension)
    }

    /// Write the artifact, creating parent directories as needed
    pub async fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}
