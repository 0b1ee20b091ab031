//! # Transcode Worker Module
//!
//! Worker di transcodifica isolato e canale per comunicare con esso.
//!
//! ## Responsabilità:
//! - Il worker è un task tokio dedicato che possiede un runtime di codec
//! - Il runtime viene caricato al primo messaggio e tenuto per tutta la vita del worker
//! - Tutto attraversa il confine come [`TranscodeRequest`] / [`WorkerEvent`]
//! - Il worker viene abbattuto dopo l'evento terminale, su fault e sul drop del canale

use crate::error::{PressError, PressResult};
use crate::transcode::protocol::{TranscodeRequest, WorkerEvent};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A loaded codec runtime able to run one transcode at a time.
#[async_trait]
pub trait CodecRuntime: Send {
    /// Transcodes `request.file`, reporting fractions 0.0-1.0 as it goes.
    async fn transcode(
        &mut self,
        request: TranscodeRequest,
        progress: &ProgressReporter,
    ) -> PressResult<Vec<u8>>;
}

/// Loads a codec runtime. Expensive and fallible.
#[async_trait]
pub trait RuntimeLoader: Send + Sync {
    async fn load(&self) -> PressResult<Box<dyn CodecRuntime>>;
}

/// Handle given to a runtime for emitting progress events.
#[derive(Clone)]
pub struct ProgressReporter {
    events: mpsc::UnboundedSender<WorkerEvent>,
}

impl ProgressReporter {
    pub fn report(&self, fraction: f64) {
        let _ = self.events.send(WorkerEvent::Progress { progress: fraction });
    }
}

/// Channel to one isolated worker unit.
///
/// Once a terminal event has been handed out, or a fault detected, the worker
/// is torn down and the channel yields nothing more.
pub struct WorkerChannel {
    requests: mpsc::Sender<TranscodeRequest>,
    events: mpsc::UnboundedReceiver<WorkerEvent>,
    handle: Option<JoinHandle<()>>,
    finished: bool,
}

impl WorkerChannel {
    /// Spawns a new worker unit on the current tokio runtime.
    pub fn spawn(loader: Arc<dyn RuntimeLoader>) -> Self {
        let (request_tx, request_rx) = mpsc::channel(1);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_worker(loader, request_rx, event_tx));
        debug!("Spawned transcoding worker");

        Self {
            requests: request_tx,
            events: event_rx,
            handle: Some(handle),
            finished: false,
        }
    }

    pub async fn send(&self, request: TranscodeRequest) -> PressResult<()> {
        if self.finished {
            return Err(PressError::ChannelFault("worker already terminated".to_string()));
        }
        self.requests
            .send(request)
            .await
            .map_err(|_| PressError::ChannelFault("worker is not accepting requests".to_string()))
    }

    /// Next event from the worker, `Ok(None)` once the channel has finished.
    pub async fn next_event(&mut self) -> PressResult<Option<WorkerEvent>> {
        if self.finished {
            return Ok(None);
        }

        match self.events.recv().await {
            Some(event) => {
                if event.is_terminal() {
                    self.terminate();
                }
                Ok(Some(event))
            }
            None => {
                let reason = match self.handle.take() {
                    Some(handle) => match handle.await {
                        Err(e) if e.is_panic() => "worker panicked".to_string(),
                        Err(e) => format!("worker stopped: {}", e),
                        Ok(()) => "worker exited without a terminal event".to_string(),
                    },
                    None => "worker already terminated".to_string(),
                };
                warn!("Transcoding channel fault: {}", reason);
                self.terminate();
                Err(PressError::ChannelFault(reason))
            }
        }
    }

    /// Tears the worker down. Idempotent.
    pub fn terminate(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Transcoding worker terminated");
        }
        self.finished = true;
        self.events.close();
    }

    pub fn is_terminated(&self) -> bool {
        self.finished
    }
}

impl Drop for WorkerChannel {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn run_worker(
    loader: Arc<dyn RuntimeLoader>,
    mut requests: mpsc::Receiver<TranscodeRequest>,
    events: mpsc::UnboundedSender<WorkerEvent>,
) {
    let mut runtime: Option<Box<dyn CodecRuntime>> = None;

    while let Some(request) = requests.recv().await {
        if runtime.is_none() {
            match loader.load().await {
                Ok(loaded) => runtime = Some(loaded),
                Err(e) => {
                    warn!("Codec runtime load failed: {}", e);
                    if events.send(WorkerEvent::failed(&e)).is_err() {
                        break;
                    }
                    continue;
                }
            }
        }

        let Some(codec) = runtime.as_mut() else {
            continue;
        };

        let reporter = ProgressReporter {
            events: events.clone(),
        };
        let event = match codec.transcode(request, &reporter).await {
            Ok(blob) => WorkerEvent::Done { blob },
            Err(e) => WorkerEvent::failed(&e),
        };

        if events.send(event).is_err() {
            break;
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted runtimes shared by the transcode and session tests.

    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Clone)]
    pub enum Script {
        /// Report each fraction, then succeed with the blob
        Succeed(Vec<f64>, Vec<u8>),
        /// Report each fraction, then fail with the reason
        Fail(Vec<f64>, String),
        /// Never finish
        Hang,
        Panic,
    }

    pub struct ScriptedLoader {
        pub script: Script,
        pub fail_load: bool,
        pub loads: Arc<AtomicUsize>,
        pub dropped: Arc<AtomicBool>,
    }

    impl ScriptedLoader {
        pub fn new(script: Script) -> Self {
            Self {
                script,
                fail_load: false,
                loads: Arc::new(AtomicUsize::new(0)),
                dropped: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    struct ScriptedRuntime {
        script: Script,
        dropped: Arc<AtomicBool>,
    }

    impl Drop for ScriptedRuntime {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl RuntimeLoader for ScriptedLoader {
        async fn load(&self) -> PressResult<Box<dyn CodecRuntime>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail_load {
                return Err(PressError::RuntimeLoad("core assets unreachable".to_string()));
            }
            Ok(Box::new(ScriptedRuntime {
                script: self.script.clone(),
                dropped: Arc::clone(&self.dropped),
            }))
        }
    }

    #[async_trait]
    impl CodecRuntime for ScriptedRuntime {
        async fn transcode(
            &mut self,
            _request: TranscodeRequest,
            progress: &ProgressReporter,
        ) -> PressResult<Vec<u8>> {
            match &self.script {
                Script::Succeed(steps, blob) => {
                    for step in steps {
                        progress.report(*step);
                    }
                    Ok(blob.clone())
                }
                Script::Fail(steps, reason) => {
                    for step in steps {
                        progress.report(*step);
                    }
                    Err(PressError::Transcode(reason.clone()))
                }
                Script::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
                Script::Panic => panic!("codec crashed"),
            }
        }
    }
}
