//! # Preview Module
//!
//! Risorse di anteprima rilasciabili per mostrare un blob senza salvarlo.
//!
//! ## Responsabilità:
//! - Ogni anteprima è un file temporaneo esposto come URI `file://`
//! - Il drop della risorsa cancella il file
//! - `PreviewRegistry` conta le anteprime ancora vive

use crate::error::PressResult;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::debug;

/// Creates preview resources and tracks how many are alive
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    live: Arc<AtomicUsize>,
    dir: Option<PathBuf>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose previews live under `dir` instead of the system temp dir
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            live: Arc::new(AtomicUsize::new(0)),
            dir: Some(dir.into()),
        }
    }

    pub fn create(&self, bytes: &[u8], extension: &str) -> PressResult<PreviewResource> {
        let suffix = format!(".{}", extension);
        let mut builder = tempfile::Builder::new();
        builder.prefix("ghostpress-preview-").suffix(&suffix);

        let mut file = match self.dir {
            Some(ref dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(bytes)?;
        file.flush()?;

        self.live.fetch_add(1, Ordering::SeqCst);
        debug!("Created preview {}", file.path().display());

        Ok(PreviewResource {
            file,
            live: Arc::clone(&self.live),
        })
    }

    pub fn live_count(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// A live preview; released on drop
#[derive(Debug)]
pub struct PreviewResource {
    file: NamedTempFile,
    live: Arc<AtomicUsize>,
}

impl PreviewResource {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn uri(&self) -> String {
        format!("file://{}", self.file.path().display())
    }
}

impl Drop for PreviewResource {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        debug!("Released preview {}", self.file.path().display());
    }
}
