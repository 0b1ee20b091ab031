//! # Compression Session Module
//!
//! Gestisce il ciclo di vita di una sessione di compressione.
//!
//! ## Sottomoduli:
//! - `state`: Macchina a stati pura (selezione, job, reset, statistiche)
//! - `preview`: Risorse di anteprima rilasciabili (file temporanei)
//! - `transform`: Trasformazioni raster e video selezionate per tipo di asset
//! - `controller`: Driver async che esegue i job e notifica gli osservatori
//!
//! ## Flusso:
//! 1. `select_asset` → anteprima originale, formato di default, `Idle`
//! 2. `start_job` → `Processing`, snapshot della configurazione
//! 3. Progress → solo per il job corrente
//! 4. Esito → `Completed` con statistiche, oppure `Error` con messaggio generico
//!
//! `reset` e una nuova selezione annullano il job in corso: i suoi esiti
//! tardivi vengono scartati.

pub mod controller;
pub mod preview;
pub mod state;
pub mod transform;

pub use controller::SessionController;
pub use preview::{PreviewRegistry, PreviewResource};
pub use state::{
    CompressionResult, JobSettings, JobStatus, JobTicket, ProcessingStats, SessionSnapshot, SessionState,
};
pub use transform::{MediaTransform, ProgressSink, RasterTransform, TranscodeTransform};
