//! # GhostPress - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento della configurazione e applicazione degli override CLI
//! - Esecuzione di un job di compressione tramite `SessionController`
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (file, quality, scale, format, etc.)
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose, `RUST_LOG` se presente)
//! 3. Carica la configurazione e applica gli override
//! 4. Seleziona l'asset e avvia il job
//! 5. Mostra l'avanzamento (progress bar o JSON) e scrive l'output
//!
//! ## Esempio di utilizzo:
//! ```bash
//! ghostpress photo.png --quality 70 --scale 0.5 --format jpeg --verbose
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ghostpress::json_output::JsonMessage;
use ghostpress::progress::{format_summary, ProgressManager};
use ghostpress::{Config, FileManager, JobStatus, PerformanceProfile, SessionController, TargetFormat};

#[derive(Parser)]
#[command(name = "ghostpress")]
#[command(about = "Compress an image or a video with live progress")]
struct Args {
    /// Image or video to compress
    input: PathBuf,

    /// Quality (1-100)
    #[arg(short, long)]
    quality: Option<u8>,

    /// Resize factor (0.1-1.0, images only)
    #[arg(short, long)]
    scale: Option<f64>,

    /// Output format (defaults to webp for images, mp4 for videos)
    #[arg(short, long, value_enum)]
    format: Option<TargetFormat>,

    /// Performance profile
    #[arg(short, long, value_enum)]
    profile: Option<PerformanceProfile>,

    /// Output file (default: ghostpress_optimized_<millis>.<ext>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file (default: <config dir>/ghostpress/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Persist the effective preferences to the configuration file
    #[arg(long)]
    save_config: bool,

    /// Emit JSON lines instead of a progress bar
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

enum Display {
    Bar(ProgressManager),
    Json,
}

impl Display {
    fn progress(&self, percent: f64) {
        match self {
            Display::Bar(bar) => bar.set_position(percent),
            Display::Json => JsonMessage::progress(percent).emit(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Load configuration and apply overrides
    let config_path = args.config.clone().or_else(Config::default_path);
    let mut config = match config_path {
        Some(ref path) => Config::from_file(path).await?,
        None => Config::default(),
    };

    if let Some(quality) = args.quality {
        config.compression.quality = quality;
    }
    if let Some(scale) = args.scale {
        config.compression.scale = scale;
    }
    if let Some(profile) = args.profile {
        config.compression.profile = profile;
    }
    config.validate()?;

    if args.save_config {
        let path = config_path
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("No configuration directory available, pass --config"))?;
        config.save_to_file(path).await?;
        info!("Saved configuration to {}", path.display());
    }

    if !args.input.is_file() {
        return Err(anyhow::anyhow!("Input file does not exist: {}", args.input.display()));
    }

    let asset = FileManager::load_asset(&args.input).await?;
    let controller = SessionController::new(&config);

    if let Err(e) = controller.select_asset(asset) {
        let snapshot = controller.snapshot();
        let message = snapshot.error.unwrap_or_else(|| e.to_string());
        if args.json {
            JsonMessage::error(message.clone(), snapshot.failure).emit();
        }
        return Err(anyhow::anyhow!(message));
    }
    if let Some(format) = args.format {
        controller.set_format(format);
    }

    let snapshot = controller.snapshot();
    let display = if args.json {
        JsonMessage::start(
            &args.input.display().to_string(),
            snapshot.asset_kind.unwrap_or(ghostpress::MediaKind::Unknown),
            std::fs::metadata(&args.input)?.len(),
            &snapshot.config,
        )
        .emit();
        Display::Json
    } else {
        let bar = ProgressManager::new(snapshot.config.profile);
        bar.set_message(snapshot.asset_name.as_deref().unwrap_or_default());
        Display::Bar(bar)
    };

    // Render progress until the job settles
    let mut updates = controller.subscribe();
    let job = controller.start_job()?;
    let render_display = match display {
        Display::Bar(ref bar) => Display::Bar(bar.clone()),
        Display::Json => Display::Json,
    };
    let render = tokio::spawn(async move {
        let mut last = f64::NAN;
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            if snapshot.status == JobStatus::Processing && snapshot.progress != last {
                last = snapshot.progress;
                render_display.progress(snapshot.progress);
            }
        }
    });

    job.await?;
    render.abort();

    let snapshot = controller.snapshot();
    match (snapshot.status, snapshot.stats, controller.result()) {
        (JobStatus::Completed, Some(stats), Some(result)) => {
            let output = args
                .output
                .clone()
                .unwrap_or_else(|| PathBuf::from(FileManager::output_file_name(result.extension)));
            FileManager::write_output(&output, &result.bytes).await?;

            match display {
                Display::Bar(bar) => {
                    bar.set_position(100.0);
                    bar.finish(&format_summary(&stats));
                    info!("Saved {}", output.display());
                }
                Display::Json => JsonMessage::complete(output, stats).emit(),
            }
            Ok(())
        }
        _ => {
            let message = snapshot
                .error
                .unwrap_or_else(|| "Compression did not complete".to_string());
            match display {
                Display::Bar(bar) => bar.abandon(&message),
                Display::Json => JsonMessage::error(message.clone(), snapshot.failure).emit(),
            }
            Err(anyhow::anyhow!(message))
        }
    }
}
