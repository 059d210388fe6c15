use crate::config::Config;
use crate::mutations::{EditCommand, EditOutcome};
use crate::session::{IngestOutcome, ProjectSession, SessionResult, SessionStatus};
use placesync_document::{Document, DocumentStore, PlaceFileStore};
use placesync_projection::FileKind;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Shared handle to the one project session
///
/// Command handling and watch ingestion both go through the same lock, so no
/// two mutations of the document or the projection ever overlap.
#[derive(Clone)]
pub struct WorkspaceServer {
    session: Arc<Mutex<ProjectSession>>,
    _pump: Arc<PumpGuard>,
}

struct PumpGuard(JoinHandle<()>);

impl Drop for PumpGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl WorkspaceServer {
    /// Must be called from within a tokio runtime
    pub fn new(config: &Config) -> Self {
        Self::with_store(
            PlaceFileStore::new(&config.projects_dir),
            config.unpack_dir.clone(),
            config.debounce(),
        )
    }

    pub fn with_store(
        store: impl DocumentStore + 'static,
        unpack_dir: PathBuf,
        debounce: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = ProjectSession::new(unpack_dir, store).with_watch_events(tx);
        let closing = session.closing_flag();
        let session = Arc::new(Mutex::new(session));

        let pump = tokio::spawn(pump_watch_events(session.clone(), rx, closing, debounce));

        Self {
            session,
            _pump: Arc::new(PumpGuard(pump)),
        }
    }

    pub async fn status(&self) -> SessionStatus {
        self.session.lock().await.status()
    }

    pub async fn list_projects(&self) -> SessionResult<Vec<String>> {
        self.session.lock().await.list_projects()
    }

    pub async fn open_project(&self, name: &str) -> SessionResult<String> {
        self.session.lock().await.open_project(name)
    }

    pub async fn close_project(&self) -> SessionResult<()> {
        self.session.lock().await.close_project()
    }

    pub async fn apply_edit(&self, command: &EditCommand) -> SessionResult<EditOutcome> {
        self.session.lock().await.apply_edit(command)
    }

    /// Copy of the open document
    pub async fn document(&self) -> Option<Document> {
        self.session.lock().await.document().cloned()
    }

    /// Pick up a projection left by a previous run. Failure only means there
    /// was nothing to restore.
    pub async fn restore(&self) -> Option<String> {
        match self.session.lock().await.restore() {
            Ok(name) => Some(name),
            Err(e) => {
                tracing::info!("Nothing to restore: {}", e);
                None
            }
        }
    }
}

/// Drain watch notifications into the session
///
/// A burst of notifications is collected for `debounce` and applied once per
/// distinct path.
async fn pump_watch_events(
    session: Arc<Mutex<ProjectSession>>,
    mut events: mpsc::UnboundedReceiver<PathBuf>,
    closing: Arc<AtomicBool>,
    debounce: Duration,
) {
    while let Some(first) = events.recv().await {
        if FileKind::from_path(&first).is_none() {
            continue;
        }

        tokio::time::sleep(debounce).await;

        let mut pending = BTreeSet::from([first]);
        while let Ok(path) = events.try_recv() {
            if FileKind::from_path(&path).is_some() {
                pending.insert(path);
            }
        }

        if closing.load(Ordering::SeqCst) {
            tracing::trace!("Dropping {} notifications during close", pending.len());
            continue;
        }

        let mut session = session.lock().await;
        for path in pending {
            match session.ingest(&path) {
                Ok(IngestOutcome::Applied(changed)) if !changed.is_empty() => {
                    tracing::debug!("{}: {} properties changed", path.display(), changed.len());
                }
                Ok(IngestOutcome::Unresolved) => {
                    tracing::debug!("Dropped change to {}: no matching node", path.display());
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Failed to sync {}: {}", path.display(), e),
            }
        }
    }

    tracing::debug!("Watch event channel closed");
}
