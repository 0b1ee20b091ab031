//! # Worker Protocol Module
//!
//! Protocollo tra l'orchestratore e il worker di transcodifica.
//!
//! I nomi dei campi e i tre tag di risposta sono condivisi da tutti i capi
//! del canale e non devono cambiare: `{file, qualityParam}` per le richieste,
//! `{type: "progress" | "done" | "error", ...}` per le risposte. Il tipo di
//! fallimento strutturato viaggia solo in-process.

use crate::error::{FailureKind, PressError};
use serde::{Deserialize, Serialize};

/// Codec quality parameter for the highest requested quality
pub const QUALITY_PARAM_MIN: u8 = 18;
/// Codec quality parameter for the lowest requested quality
pub const QUALITY_PARAM_MAX: u8 = 51;

/// Maps a quality scalar (0.0-1.0) to the codec's inverse quality scale.
///
/// `1.0 -> 18`, `0.0 -> 51`, monotonically decreasing in between.
pub fn quality_param(quality: f64) -> u8 {
    let quality = if quality.is_nan() { 0.0 } else { quality.clamp(0.0, 1.0) };
    let span = f64::from(QUALITY_PARAM_MAX - QUALITY_PARAM_MIN);
    (f64::from(QUALITY_PARAM_MAX) - quality * span).floor() as u8
}

/// Request sent to the worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscodeRequest {
    pub file: Vec<u8>,
    #[serde(rename = "qualityParam")]
    pub quality_param: u8,
}

/// Event emitted by the worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerEvent {
    /// Fraction of the job done, 0.0-1.0
    #[serde(rename = "progress")]
    Progress { progress: f64 },

    #[serde(rename = "done")]
    Done { blob: Vec<u8> },

    #[serde(rename = "error")]
    Failed {
        error: String,
        /// In-process only; never on the wire
        #[serde(skip)]
        kind: Option<FailureKind>,
    },
}

impl WorkerEvent {
    /// Failure event carrying the structured kind of `err`
    pub fn failed(err: &PressError) -> Self {
        WorkerEvent::Failed {
            error: err.reason(),
            kind: Some(err.kind()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkerEvent::Progress { .. })
    }
}
