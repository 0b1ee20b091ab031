//! # Media Asset Module
//!
//! Rappresenta il file scelto dall'utente e la sua classificazione.
//!
//! ## Responsabilità:
//! - `MediaKind`: classificazione `Image` | `Video` | `Unknown` dal MIME type
//! - `MediaAsset`: riferimento immutabile al payload (condiviso via `Arc`)
//!
//! Un asset non viene mai modificato: una nuova selezione lo sostituisce
//! interamente, un reset lo rimuove.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Media kind derived from the content type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaKind {
    Image,
    Video,
    Unknown,
}

impl MediaKind {
    /// Classify a MIME type (`image/*`, `video/*`, anything else)
    pub fn from_content_type(content_type: &str) -> Self {
        let content_type = content_type.trim().to_ascii_lowercase();
        if content_type.starts_with("image/") {
            MediaKind::Image
        } else if content_type.starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::Unknown
        }
    }
}

/// Immutable reference to the user's input
#[derive(Debug, Clone)]
pub struct MediaAsset {
    name: String,
    content_type: String,
    kind: MediaKind,
    payload: Arc<[u8]>,
}

impl MediaAsset {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, payload: Vec<u8>) -> Self {
        let content_type = content_type.into();
        let kind = MediaKind::from_content_type(&content_type);
        Self {
            name: name.into(),
            content_type,
            kind,
            payload: payload.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Shared handle to the payload, for handing to a background job
    pub fn shared_payload(&self) -> Arc<[u8]> {
        Arc::clone(&self.payload)
    }

    pub fn size(&self) -> u64 {
        self.payload.len() as u64
    }
}
