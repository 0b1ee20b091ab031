//! # Error Types Module
//!
//! Questo modulo definisce la tassonomia degli errori della pipeline di compressione.
//!
//! ## Responsabilità:
//! - Definisce `PressError` per categorizzare tutti i fallimenti di un job
//! - Fornisce `FailureKind`, la forma copiabile dell'errore conservata nello stato
//! - Integra con `thiserror` per messaggi e conversioni automatiche
//!
//! ## Categorie di errori:
//! - `UnsupportedInput`: tipo di media non riconosciuto (prima del job)
//! - `Decode` / `InvalidDimensions` / `Encode`: percorso raster
//! - `RuntimeLoad` / `Transcode` / `ChannelFault` / `Timeout`: percorso video
//! - `InvalidState` / `Validation`: errori del chiamante
//! - `Io`: errori di I/O (preview, file di output)
//!
//! ## Esempio:
//! ```rust,ignore
//! if width == 0 || height == 0 {
//!     return Err(PressError::InvalidDimensions { width, height, scale });
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Custom error types for media compression
#[derive(thiserror::Error, Debug)]
pub enum PressError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported input type: {0}")]
    UnsupportedInput(String),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Scale {scale} collapses target size to {width}x{height}")]
    InvalidDimensions { width: u32, height: u32, scale: f64 },

    #[error("Encoder rejected output: {0}")]
    Encode(String),

    #[error("Codec runtime failed to load: {0}")]
    RuntimeLoad(String),

    #[error("Transcode failed: {0}")]
    Transcode(String),

    #[error("Worker channel fault: {0}")]
    ChannelFault(String),

    #[error("Transcode timed out after {0}s")]
    Timeout(u64),

    #[error("Invalid session state: {0}")]
    InvalidState(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Structured failure kind kept alongside the generic user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Io,
    UnsupportedInput,
    Decode,
    InvalidDimensions,
    Encode,
    RuntimeLoad,
    Transcode,
    ChannelFault,
    Timeout,
    InvalidState,
    Validation,
}

impl PressError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PressError::Io(_) => FailureKind::Io,
            PressError::UnsupportedInput(_) => FailureKind::UnsupportedInput,
            PressError::Decode(_) => FailureKind::Decode,
            PressError::InvalidDimensions { .. } => FailureKind::InvalidDimensions,
            PressError::Encode(_) => FailureKind::Encode,
            PressError::RuntimeLoad(_) => FailureKind::RuntimeLoad,
            PressError::Transcode(_) => FailureKind::Transcode,
            PressError::ChannelFault(_) => FailureKind::ChannelFault,
            PressError::Timeout(_) => FailureKind::Timeout,
            PressError::InvalidState(_) => FailureKind::InvalidState,
            PressError::Validation(_) => FailureKind::Validation,
        }
    }

    /// Detail text without the variant prefix, as sent across the worker channel
    pub fn reason(&self) -> String {
        match self {
            PressError::UnsupportedInput(reason)
            | PressError::Decode(reason)
            | PressError::Encode(reason)
            | PressError::RuntimeLoad(reason)
            | PressError::Transcode(reason)
            | PressError::ChannelFault(reason)
            | PressError::InvalidState(reason)
            | PressError::Validation(reason) => reason.clone(),
            other => other.to_string(),
        }
    }

    /// Rebuilds the error of a failed worker event.
    ///
    /// Runtime load failures keep their kind; anything else the codec reports
    /// is a transcode failure.
    pub fn from_worker(kind: Option<FailureKind>, reason: String) -> Self {
        match kind {
            Some(FailureKind::RuntimeLoad) => PressError::RuntimeLoad(reason),
            _ => PressError::Transcode(reason),
        }
    }
}

pub type PressResult<T> = Result<T, PressError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(PressError::Decode("x".into()).kind(), FailureKind::Decode);
        assert_eq!(
            PressError::InvalidDimensions { width: 0, height: 3, scale: 0.1 }.kind(),
            FailureKind::InvalidDimensions
        );
        assert_eq!(PressError::ChannelFault("gone".into()).kind(), FailureKind::ChannelFault);
    }

    #[test]
    fn test_worker_failure_round_trip() {
        let err = PressError::RuntimeLoad("ffmpeg is required".into());
        let rebuilt = PressError::from_worker(Some(err.kind()), err.reason());
        assert!(matches!(rebuilt, PressError::RuntimeLoad(ref r) if r == "ffmpeg is required"));

        assert!(matches!(
            PressError::from_worker(Some(FailureKind::Io), "disk full".into()),
            PressError::Transcode(_)
        ));
        assert!(matches!(PressError::from_worker(None, "x".into()), PressError::Transcode(_)));
        assert_eq!(PressError::Timeout(5).reason(), "Transcode timed out after 5s");
    }

    #[test]
    fn test_messages_carry_reason() {
        let err = PressError::Transcode("moov atom not found".into());
        assert!(err.to_string().contains("moov atom not found"));
    }
}
