//! # Video Processing Module
//!
//! Questo modulo fornisce il runtime di codec usato dal worker di transcodifica.
//!
//! ## Responsabilità:
//! - Caricamento del runtime: risoluzione e verifica del binario `ffmpeg`
//! - Compressione video con FFmpeg (H.264, CRF dal parametro di qualità)
//! - Lettura del progress da `-progress pipe:1` e conversione in frazione 0-1
//! - Analisi della durata con `ffprobe` (opzionale)
//!
//! ## Pipeline di compressione:
//! 1. Scrive il payload in una directory temporanea (`input.mp4`)
//! 2. Legge la durata con ffprobe, se disponibile
//! 3. Comprime con FFmpeg:
//!    - Codec video: libx264
//!    - Preset: ultrafast
//!    - CRF: `qualityParam` della richiesta (18-51)
//!    - Audio: copiato senza ricodifica
//!    - Metadata globali della sorgente: rimossi (`-map_metadata -1`)
//! 4. Legge `output.mp4` e lo restituisce come blob
//!
//! La directory temporanea viene rimossa quando esce dallo scope, anche in caso
//! di errore. Il processo figlio viene terminato se il worker viene abbattuto.
//!
//! ## Progress:
//! Senza durata nota non viene emesso progress: resta solo l'evento terminale.
//!
//! ## Esempio:
//! ```rust,ignore
//! let loader = FfmpegLoader::new(None, None);
//! let transcoder = Transcoder::new(Arc::new(loader), Duration::from_secs(600));
//! ```

use crate::error::{PressError, PressResult};
use crate::platform::PlatformCommands;
use crate::transcode::{CodecRuntime, ProgressReporter, RuntimeLoader, TranscodeRequest};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Lines of ffmpeg stderr kept in a failure reason
const STDERR_TAIL_LINES: usize = 12;

/// Loads the ffmpeg-backed codec runtime
pub struct FfmpegLoader {
    ffmpeg_path: Option<PathBuf>,
    ffprobe_path: Option<PathBuf>,
}

impl FfmpegLoader {
    pub fn new(ffmpeg_path: Option<PathBuf>, ffprobe_path: Option<PathBuf>) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
        }
    }
}

#[async_trait]
impl RuntimeLoader for FfmpegLoader {
    async fn load(&self) -> PressResult<Box<dyn CodecRuntime>> {
        let platform = PlatformCommands::instance();

        let ffmpeg = platform
            .resolve("ffmpeg", self.ffmpeg_path.as_deref())
            .ok_or_else(|| PressError::RuntimeLoad("ffmpeg is required for video processing".to_string()))?;

        let output = Command::new(&ffmpeg)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| PressError::RuntimeLoad(format!("failed to execute {}: {}", ffmpeg.display(), e)))?;

        if !output.status.success() {
            return Err(PressError::RuntimeLoad(format!(
                "{} -version exited with {}",
                ffmpeg.display(),
                output.status
            )));
        }

        let version = String::from_utf8_lossy(&output.stdout);
        info!("Loaded codec runtime: {}", version.lines().next().unwrap_or("ffmpeg"));

        let ffprobe = platform.resolve("ffprobe", self.ffprobe_path.as_deref());
        if ffprobe.is_none() {
            warn!("ffprobe not found, video progress will not be reported");
        }

        Ok(Box::new(FfmpegRuntime { ffmpeg, ffprobe }))
    }
}

/// ffmpeg codec runtime
pub struct FfmpegRuntime {
    ffmpeg: PathBuf,
    ffprobe: Option<PathBuf>,
}

#[async_trait]
impl CodecRuntime for FfmpegRuntime {
    async fn transcode(
        &mut self,
        request: TranscodeRequest,
        progress: &ProgressReporter,
    ) -> PressResult<Vec<u8>> {
        let workdir = tempfile::Builder::new().prefix("ghostpress-").tempdir()?;
        let input_path = workdir.path().join("input.mp4");
        let output_path = workdir.path().join("output.mp4");

        let TranscodeRequest { file, quality_param } = request;
        tokio::fs::write(&input_path, &file).await?;
        drop(file);

        let duration = match self.ffprobe {
            Some(ref ffprobe) => probe_duration(ffprobe, &input_path).await,
            None => None,
        };
        debug!("Input duration: {:?}", duration);

        self.compress_video(&input_path, &output_path, quality_param, duration, progress)
            .await?;

        let blob = tokio::fs::read(&output_path).await?;
        Ok(blob)
    }
}

impl FfmpegRuntime {
    async fn compress_video(
        &self,
        input_path: &Path,
        output_path: &Path,
        crf: u8,
        duration: Option<f64>,
        progress: &ProgressReporter,
    ) -> PressResult<()> {
        debug!("Compressing video with CRF {}", crf);

        let mut child = Command::new(&self.ffmpeg)
            .args(ffmpeg_args(input_path, output_path, crf))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PressError::Transcode(format!("failed to execute {}: {}", self.ffmpeg.display(), e)))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let read_progress = async {
            if let Some(stdout) = stdout {
                let mut lines = BufReader::new(stdout).lines();
                while let Some(line) = lines.next_line().await? {
                    if let Some(fraction) = parse_progress_line(&line, duration) {
                        progress.report(fraction);
                    }
                }
            }
            Ok::<_, std::io::Error>(())
        };

        let read_stderr = async {
            let mut buffer = String::new();
            if let Some(mut stderr) = stderr {
                stderr.read_to_string(&mut buffer).await?;
            }
            Ok::<_, std::io::Error>(buffer)
        };

        let start_time = std::time::Instant::now();
        let (progress_result, stderr_result) = tokio::join!(read_progress, read_stderr);
        let status = child.wait().await?;
        progress_result?;
        let stderr_output = stderr_result.unwrap_or_default();

        if !status.success() {
            warn!(
                "FFmpeg failed after {:.1}s: {}",
                start_time.elapsed().as_secs_f64(),
                stderr_output.trim()
            );
            return Err(PressError::Transcode(failure_reason(&stderr_output, &status.to_string())));
        }

        info!("Video compression completed in {:.1}s", start_time.elapsed().as_secs_f64());
        Ok(())
    }
}

/// Arguments for one H.264 transcode. Source metadata is never carried over.
fn ffmpeg_args(input_path: &Path, output_path: &Path, crf: u8) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-y", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(input_path.into());

    let crf = crf.to_string();
    args.extend(
        [
            "-map_metadata", "-1",
            "-c:v", "libx264",
            "-crf", crf.as_str(),
            "-preset", "ultrafast",
            "-c:a", "copy",
            "-progress", "pipe:1",
            "-nostats",
            "-loglevel", "error",
        ]
        .into_iter()
        .map(OsString::from),
    );
    args.push(output_path.into());
    args
}

/// Reads the container duration (seconds) with ffprobe
async fn probe_duration(ffprobe: &Path, video_path: &Path) -> Option<f64> {
    let output = Command::new(ffprobe)
        .args(["-v", "quiet", "-print_format", "json", "-show_format"])
        .arg(video_path)
        .stdin(Stdio::null())
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        debug!("ffprobe failed: {}", String::from_utf8_lossy(&output.stderr));
        return None;
    }

    parse_probe_duration(&String::from_utf8_lossy(&output.stdout))
}

/// Extracts `format.duration` from ffprobe's JSON output
fn parse_probe_duration(json: &str) -> Option<f64> {
    let info: serde_json::Value = serde_json::from_str(json).ok()?;
    info["format"]["duration"]
        .as_str()
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
}

/// Converts one `-progress` line into a fraction of `duration`.
///
/// ffmpeg writes both `out_time_us` and `out_time_ms`, both in microseconds.
fn parse_progress_line(line: &str, duration: Option<f64>) -> Option<f64> {
    let (key, value) = line.trim().split_once('=')?;

    match key {
        "progress" if value == "end" => Some(1.0),
        "out_time_us" | "out_time_ms" => {
            let duration = duration?;
            let micros = value.parse::<i64>().ok().filter(|m| *m >= 0)?;
            Some((micros as f64 / 1_000_000.0 / duration).clamp(0.0, 1.0))
        }
        _ => None,
    }
}

fn failure_reason(stderr: &str, status: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return format!("ffmpeg exited with {}", status);
    }
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
