//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON (una riga per evento)
//! per l'integrazione con altri processi.
//!
//! ## Tipi di messaggi:
//! - `start`: Asset selezionato e configurazione del job
//! - `progress`: Percentuale corrente
//! - `complete`: Statistiche finali e percorso dell'output
//! - `error`: Errore durante elaborazione (messaggio + tipo strutturato)

use crate::config::CompressionConfig;
use crate::error::FailureKind;
use crate::media::MediaKind;
use crate::session::ProcessingStats;
use serde::Serialize;
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage {
    /// Inizio del job
    Start {
        name: String,
        kind: MediaKind,
        size: u64,
        config: CompressionConfig,
    },

    /// Progresso corrente
    Progress { percentage: f64 },

    /// Job completato
    Complete {
        output: PathBuf,
        #[serde(flatten)]
        stats: ProcessingStats,
    },

    /// Errore
    Error {
        message: String,
        kind: Option<FailureKind>,
    },
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(name: &str, kind: MediaKind, size: u64, config: &CompressionConfig) -> Self {
        Self::Start {
            name: name.to_string(),
            kind,
            size,
            config: config.clone(),
        }
    }

    pub fn progress(percentage: f64) -> Self {
        Self::Progress { percentage }
    }

    pub fn complete(output: PathBuf, stats: ProcessingStats) -> Self {
        Self::Complete { output, stats }
    }

    pub fn error(message: impl Into<String>, kind: Option<FailureKind>) -> Self {
        Self::Error {
            message: message.into(),
            kind,
        }
    }
}
