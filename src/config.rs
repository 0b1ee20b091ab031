//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `CompressionConfig`, le preferenze utente di un job
//! - Definisce `Config`, la configurazione complessiva (preferenze + runtime)
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//!
//! ## Parametri di compressione:
//! - `quality`: Qualità 1-100 (default: 80), mappata su 0.0-1.0
//! - `scale`: Fattore di scala 0.1-1.0 (default: 1.0, solo immagini)
//! - `format`: `webp` | `jpeg` | `mp4` | `original` (default: `original`)
//! - `strip_metadata`: Rimozione metadata (default: true)
//! - `profile`: `eco` | `beast`, solo cadenza del feedback visivo (default: `beast`)
//!
//! ## Parametri runtime:
//! - `cosmetic_delay_ms`: Ritardo estetico per immagini piccole (default: 800)
//! - `cosmetic_delay_threshold`: Soglia in byte per il ritardo (default: 1_000_000)
//! - `transcode_timeout_secs`: Timeout transcodifica video (default: 600)
//! - `ffmpeg_path` / `ffprobe_path`: Override dei binari (default: risoluzione automatica)
//!
//! ## Esempio:
//! ```rust,ignore
//! let mut config = Config::default();
//! config.compression.quality = 65;
//! config.validate()?;
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Output format requested by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Webp,
    Jpeg,
    Mp4,
    Original,
}

/// Advisory performance profile; only drives progress display cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceProfile {
    Eco,
    Beast,
}

impl PerformanceProfile {
    /// Tick interval used by progress displays
    pub fn tick_interval(&self) -> Duration {
        match self {
            PerformanceProfile::Eco => Duration::from_millis(250),
            PerformanceProfile::Beast => Duration::from_millis(80),
        }
    }
}

/// User preferences for a compression job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionConfig {
    /// Quality (1-100)
    pub quality: u8,
    /// Resize factor (0.1-1.0, images only)
    pub scale: f64,
    /// Target output format
    pub format: TargetFormat,
    /// Drop source metadata from the output. Both the raster and the video
    /// path always strip it; `false` is kept only as a stored preference.
    pub strip_metadata: bool,
    /// Performance profile
    pub profile: PerformanceProfile,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            quality: 80,
            scale: 1.0,
            format: TargetFormat::Original,
            strip_metadata: true,
            profile: PerformanceProfile::Beast,
        }
    }
}

impl CompressionConfig {
    pub const MIN_SCALE: f64 = 0.1;
    pub const MAX_SCALE: f64 = 1.0;

    /// Validate compression parameters
    pub fn validate(&self) -> Result<()> {
        if self.quality == 0 || self.quality > 100 {
            return Err(anyhow::anyhow!("Quality must be between 1 and 100"));
        }

        if !(Self::MIN_SCALE..=Self::MAX_SCALE).contains(&self.scale) {
            return Err(anyhow::anyhow!("Scale must be between 0.1 and 1.0"));
        }

        Ok(())
    }

    /// Quality as the engine-independent scalar 0.0-1.0
    pub fn quality_scalar(&self) -> f64 {
        f64::from(self.quality) / 100.0
    }
}

/// Configuration for the compression application
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Job preferences
    pub compression: CompressionConfig,
    /// Cosmetic delay before small raster jobs (milliseconds)
    pub cosmetic_delay_ms: u64,
    /// Raster inputs below this size get the cosmetic delay (bytes)
    pub cosmetic_delay_threshold: u64,
    /// Upper bound for one video transcode (seconds)
    pub transcode_timeout_secs: u64,
    /// Explicit ffmpeg binary (None = resolve from environment/PATH)
    pub ffmpeg_path: Option<PathBuf>,
    /// Explicit ffprobe binary (None = resolve from environment/PATH)
    pub ffprobe_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            compression: CompressionConfig::default(),
            cosmetic_delay_ms: 800,
            cosmetic_delay_threshold: 1_000_000,
            transcode_timeout_secs: 600,
            ffmpeg_path: None,
            ffprobe_path: None,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        self.compression.validate()?;

        if self.transcode_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Transcode timeout must be greater than 0"));
        }

        if let Some(ref ffmpeg) = self.ffmpeg_path {
            if !ffmpeg.exists() {
                return Err(anyhow::anyhow!("ffmpeg binary does not exist: {}", ffmpeg.display()));
            }
        }

        Ok(())
    }

    pub fn cosmetic_delay(&self) -> Duration {
        Duration::from_millis(self.cosmetic_delay_ms)
    }

    pub fn transcode_timeout(&self) -> Duration {
        Duration::from_secs(self.transcode_timeout_secs)
    }

    /// Default config file location (`<config dir>/ghostpress/config.json`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ghostpress").join("config.json"))
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.compression.quality = 0;
        assert!(config.validate().is_err());

        config.compression.quality = 101;
        assert!(config.validate().is_err());

        config.compression.quality = 80;
        config.compression.scale = 0.05;
        assert!(config.validate().is_err());

        config.compression.scale = 1.5;
        assert!(config.validate().is_err());

        config.compression.scale = 0.5;
        config.transcode_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.compression.quality, 80);
        assert_eq!(config.compression.scale, 1.0);
        assert_eq!(config.compression.format, TargetFormat::Original);
        assert!(config.compression.strip_metadata);
        assert_eq!(config.compression.profile, PerformanceProfile::Beast);
        assert_eq!(config.cosmetic_delay_ms, 800);
        assert_eq!(config.cosmetic_delay_threshold, 1_000_000);
        assert_eq!(config.transcode_timeout(), Duration::from_secs(600));
    }

    #[test]
    fn test_quality_scalar() {
        let config = CompressionConfig { quality: 65, ..Default::default() };
        assert!((config.quality_scalar() - 0.65).abs() < f64::EPSILON);
    }

    #[test]
    fn test_format_serialization() {
        assert_eq!(serde_json::to_string(&TargetFormat::Webp).unwrap(), "\"webp\"");
        assert_eq!(serde_json::to_string(&PerformanceProfile::Eco).unwrap(), "\"eco\"");
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.json");

        let original_config = Config {
            compression: CompressionConfig {
                quality: 55,
                scale: 0.5,
                format: TargetFormat::Jpeg,
                strip_metadata: true,
                profile: PerformanceProfile::Eco,
            },
            cosmetic_delay_ms: 0,
            transcode_timeout_secs: 30,
            ..Default::default()
        };

        original_config.save_to_file(&config_path).await.unwrap();

        let loaded_config = Config::from_file(&config_path).await.unwrap();

        assert_eq!(loaded_config.compression, original_config.compression);
        assert_eq!(loaded_config.cosmetic_delay_ms, 0);
        assert_eq!(loaded_config.transcode_timeout_secs, 30);
    }

    #[tokio::test]
    async fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::from_file(&temp_dir.path().join("absent.json")).await.unwrap();
        assert_eq!(config.compression, CompressionConfig::default());
    }

    #[tokio::test]
    async fn test_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        tokio::fs::write(&path, r#"{"cosmetic_delay_ms": 10}"#).await.unwrap();

        let config = Config::from_file(&path).await.unwrap();
        assert_eq!(config.cosmetic_delay_ms, 10);
        assert_eq!(config.compression.quality, 80);
    }
}
