//! # Transcode Orchestrator Module
//!
//! Transcodifica single-shot su un canale worker nuovo per ogni chiamata.
//!
//! ## Garanzie:
//! - Progress inoltrato come percentuale, così come lo riporta il motore
//! - `100.0` finale prima di restituire il blob
//! - Timeout sull'intero scambio
//! - Il worker viene abbattuto prima di restituire, qualunque sia l'esito

use crate::error::{PressError, PressResult};
use crate::transcode::protocol::{quality_param, TranscodeRequest, WorkerEvent};
use crate::transcode::worker::{RuntimeLoader, WorkerChannel};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Runs one transcode per call, each on its own worker unit.
#[derive(Clone)]
pub struct Transcoder {
    loader: Arc<dyn RuntimeLoader>,
    timeout: Duration,
}

impl Transcoder {
    pub fn new(loader: Arc<dyn RuntimeLoader>, timeout: Duration) -> Self {
        Self { loader, timeout }
    }

    /// Transcodes `payload` at `quality` (0.0-1.0).
    ///
    /// Progress is forwarded as a percentage exactly as the engine reports it,
    /// without smoothing, and followed by a final `100.0` on success. The
    /// worker is torn down before this returns, whatever the outcome.
    pub async fn transcode<F>(&self, payload: &[u8], quality: f64, on_progress: F) -> PressResult<Vec<u8>>
    where
        F: Fn(f64) + Send + Sync,
    {
        let request = TranscodeRequest {
            file: payload.to_vec(),
            quality_param: quality_param(quality),
        };
        info!(
            "Starting transcode of {} bytes (quality param {})",
            request.file.len(),
            request.quality_param
        );

        let mut channel = WorkerChannel::spawn(Arc::clone(&self.loader));

        let exchange = async {
            channel.send(request).await?;
            loop {
                match channel.next_event().await? {
                    Some(WorkerEvent::Progress { progress }) => on_progress(progress * 100.0),
                    Some(WorkerEvent::Done { blob }) => {
                        on_progress(100.0);
                        return Ok(blob);
                    }
                    Some(WorkerEvent::Failed { error, kind }) => return Err(PressError::from_worker(kind, error)),
                    None => {
                        return Err(PressError::ChannelFault(
                            "channel closed before a terminal event".to_string(),
                        ))
                    }
                }
            }
        };

        let outcome = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("Transcode timed out after {:?}", self.timeout);
                Err(PressError::Timeout(self.timeout.as_secs()))
            }
        };

        channel.terminate();

        match &outcome {
            Ok(blob) => debug!("Transcode produced {} bytes", blob.len()),
            Err(e) => warn!("Transcode failed: {}", e),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcode::worker::testing::{Script, ScriptedLoader};
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    fn transcoder(loader: ScriptedLoader) -> Transcoder {
        Transcoder::new(Arc::new(loader), Duration::from_secs(5))
    }

    async fn run(transcoder: &Transcoder) -> (PressResult<Vec<u8>>, Vec<f64>) {
        let seen = Mutex::new(Vec::new());
        let result = transcoder
            .transcode(&[1, 2, 3], 0.8, |p| seen.lock().unwrap().push(p))
            .await;
        (result, seen.into_inner().unwrap())
    }

    #[tokio::test]
    async fn test_success_forces_final_hundred() {
        let transcoder = transcoder(ScriptedLoader::new(Script::Succeed(vec![0.3, 0.9], vec![4, 2])));
        let (result, seen) = run(&transcoder).await;

        assert_eq!(result.unwrap(), vec![4, 2]);
        assert_eq!(seen.len(), 3);
        assert!((seen[0] - 30.0).abs() < 1e-9);
        assert!((seen[1] - 90.0).abs() < 1e-9);
        assert_eq!(seen[2], 100.0);
    }

    #[tokio::test]
    async fn test_non_monotonic_progress_passes_through() {
        let transcoder = transcoder(ScriptedLoader::new(Script::Succeed(vec![0.5, 0.25], vec![])));
        let (_, seen) = run(&transcoder).await;

        assert!((seen[0] - 50.0).abs() < 1e-9);
        assert!((seen[1] - 25.0).abs() < 1e-9);
        assert_eq!(seen[2], 100.0);
    }

    #[tokio::test]
    async fn test_codec_failure_carries_reason() {
        let transcoder = transcoder(ScriptedLoader::new(Script::Fail(vec![0.1], "invalid data".into())));
        let (result, seen) = run(&transcoder).await;

        match result {
            Err(PressError::Transcode(reason)) => assert!(reason.contains("invalid data")),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(seen.len(), 1);
    }

    #[tokio::test]
    async fn test_runtime_load_failure_rejects() {
        let mut loader = ScriptedLoader::new(Script::Succeed(vec![], vec![]));
        loader.fail_load = true;
        let (result, seen) = run(&transcoder(loader)).await;

        match result {
            Err(PressError::RuntimeLoad(reason)) => assert!(reason.contains("core assets unreachable")),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(seen.is_empty());
    }

    #[tokio::test]
    async fn test_worker_crash_is_channel_fault() {
        let (result, _) = run(&transcoder(ScriptedLoader::new(Script::Panic))).await;
        assert!(matches!(result, Err(PressError::ChannelFault(_))));
    }

    #[tokio::test]
    async fn test_timeout_tears_worker_down() {
        let loader = ScriptedLoader::new(Script::Hang);
        let dropped = Arc::clone(&loader.dropped);
        let transcoder = Transcoder::new(Arc::new(loader), Duration::from_millis(50));

        let (result, _) = run(&transcoder).await;
        assert!(matches!(result, Err(PressError::Timeout(_))));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_one_worker_per_call() {
        let loader = ScriptedLoader::new(Script::Succeed(vec![], vec![1]));
        let loads = Arc::clone(&loader.loads);
        let transcoder = transcoder(loader);

        tokio_test::assert_ok!(run(&transcoder).await.0);
        tokio_test::assert_ok!(run(&transcoder).await.0);
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }
}
