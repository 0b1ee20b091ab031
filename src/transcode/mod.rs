//! # Transcoding Module
//!
//! Percorso video della pipeline, separato in sottomoduli:
//! - `protocol`: Messaggi scambiati con il worker e mappatura della qualità
//! - `worker`: Unità di esecuzione isolata e canale verso di essa
//! - `orchestrator`: Protocollo single-shot richiesta/progress/risposta

pub mod orchestrator;
pub mod protocol;
pub mod worker;

pub use orchestrator::Transcoder;
pub use protocol::{quality_param, TranscodeRequest, WorkerEvent};
pub use worker::{CodecRuntime, ProgressReporter, RuntimeLoader, WorkerChannel};
