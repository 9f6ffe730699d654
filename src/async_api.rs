use crate::export::{DocumentExporter, ExportedDocument};
use crate::map_view::ViewHandle;
use crate::{Error, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tokio::sync::oneshot;

/// An async-friendly exporter backed by worker threads.
///
/// Capture and PDF serialization are blocking; each request runs on its own
/// thread and resolves through a oneshot channel so async callers are never
/// blocked. Overlapping requests share the exporter and therefore its
/// single-flight guard.
#[derive(Clone)]
pub struct AsyncExporter {
    exporter: Arc<DocumentExporter>,
}

impl AsyncExporter {
    pub fn new(exporter: DocumentExporter) -> Self {
        Self {
            exporter: Arc::new(exporter),
        }
    }

    pub fn exporter(&self) -> &DocumentExporter {
        &self.exporter
    }

    /// Export on a worker thread.
    pub async fn export(&self, root: Option<ViewHandle>) -> Result<ExportedDocument> {
        let exporter = Arc::clone(&self.exporter);
        self.run(move || exporter.export(root.as_ref())).await
    }

    /// Export and write the file into `dir`, returning its path.
    pub async fn export_to(&self, root: Option<ViewHandle>, dir: PathBuf) -> Result<PathBuf> {
        let exporter = Arc::clone(&self.exporter);
        self.run(move || exporter.export(root.as_ref())?.save_to(&dir))
            .await
    }

    async fn run<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (resp_tx, resp_rx) = oneshot::channel();
        thread::spawn(move || {
            let _ = resp_tx.send(job());
        });
        resp_rx
            .await
            .map_err(|_| Error::DocumentError("export worker stopped unexpectedly".into()))?
    }
}
