//! # GhostPress Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Preferenze di compressione, configurazione e validazione
//! - `error`: Tipo di errore della pipeline e tipo di fallimento strutturato
//! - `media`: Asset selezionato e classificazione per MIME type
//! - `file_manager`: Lettura input, nome e scrittura dell'output
//! - `image_processor`: Compressione raster (decode, resize, JPEG/WebP)
//! - `transcode`: Worker isolato e orchestratore della transcodifica video
//! - `video_processor`: Runtime di codec basato su FFmpeg
//! - `session`: Macchina a stati della sessione e driver async
//! - `platform`: Risoluzione dei comandi esterni
//! - `progress` / `json_output`: Presentazione dell'avanzamento
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use ghostpress::{Config, FileManager, SessionController};
//!
//! let controller = SessionController::new(&Config::default());
//! controller.select_asset(FileManager::load_asset(&path).await?)?;
//! controller.start_job()?.await?;
//! let result = controller.result();
//! ```

pub mod config;
pub mod error;
pub mod file_manager;
pub mod image_processor;
pub mod json_output;
pub mod media;
pub mod platform;
pub mod progress;
pub mod session;
pub mod transcode;
pub mod video_processor;

pub use config::{CompressionConfig, Config, PerformanceProfile, TargetFormat};
pub use error::{FailureKind, PressError, PressResult};
pub use file_manager::FileManager;
pub use media::{MediaAsset, MediaKind};
pub use session::{JobStatus, ProcessingStats, SessionController, SessionSnapshot};
