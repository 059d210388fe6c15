//! # Project Session
//!
//! Owns the open document, its projection on disk and the watch over it.
//!
//! ```text
//!            open_project                close_project
//!   Closed ───────────────▶ Open+Watching ───────────▶ Closed
//!     │                          ▲
//!     └────── restore ───────────┘
//! ```
//!
//! Every method takes `&mut self`; callers serialize access through one lock,
//! so edits, watch ingestion and lifecycle changes never interleave.

use crate::mutations::{apply_edit, EditCommand, EditError, EditOutcome};
use crate::watcher::{ProjectWatcher, WatcherError};
use chrono::{DateTime, Utc};
use placesync_document::{Document, DocumentError, DocumentStore};
use placesync_projection::{
    apply_properties, apply_script, unpack_document, FileKind, FolderId, ProjectionError,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

pub const METADATA_FILE: &str = "project.json";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("No project is open")]
    NotOpen,

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),

    #[error("Edit error: {0}")]
    Edit(#[from] EditError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Watcher error: {0}")]
    Watch(#[from] WatcherError),

    #[error("Project metadata error: {0}")]
    Metadata(String),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Persisted at the projection root while a project is open
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetadata {
    pub name: String,
    #[serde(default)]
    pub opened_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub is_open: bool,
    pub is_watching: bool,
    pub project_name: Option<String>,
    pub unpack_path: Option<PathBuf>,
}

/// What became of one inbound file notification
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// Properties that changed on the node (empty if the file matched)
    Applied(Vec<String>),
    ScriptUpdated,
    /// Content is what the session itself last wrote
    Echo,
    /// No node matches the owning folder
    Unresolved,
    /// Not a synced file, no open project, or the file is gone
    Ignored,
}

pub struct ProjectSession {
    unpack_path: PathBuf,
    store: Box<dyn DocumentStore>,
    project_name: Option<String>,
    document: Option<Document>,
    watcher: Option<ProjectWatcher>,
    watch_events: Option<mpsc::UnboundedSender<PathBuf>>,
    closing: Arc<AtomicBool>,
    recent_writes: HashMap<PathBuf, String>,
}

impl ProjectSession {
    pub fn new(unpack_path: impl Into<PathBuf>, store: impl DocumentStore + 'static) -> Self {
        Self {
            unpack_path: unpack_path.into(),
            store: Box::new(store),
            project_name: None,
            document: None,
            watcher: None,
            watch_events: None,
            closing: Arc::new(AtomicBool::new(false)),
            recent_writes: HashMap::new(),
        }
    }

    /// Forward projection changes to `events` whenever a project is open
    pub fn with_watch_events(mut self, events: mpsc::UnboundedSender<PathBuf>) -> Self {
        self.watch_events = Some(events);
        self
    }

    /// Raised for the duration of a close
    pub fn closing_flag(&self) -> Arc<AtomicBool> {
        self.closing.clone()
    }

    pub fn is_open(&self) -> bool {
        self.document.is_some()
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    pub fn project_name(&self) -> Option<&str> {
        self.project_name.as_deref()
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn unpack_path(&self) -> &Path {
        &self.unpack_path
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            is_open: self.is_open(),
            is_watching: self.is_watching(),
            project_name: self.project_name.clone(),
            unpack_path: self.is_open().then(|| self.unpack_path.clone()),
        }
    }

    pub fn list_projects(&self) -> SessionResult<Vec<String>> {
        Ok(self.store.list()?)
    }

    /// Load `name`, project it from scratch and start watching
    ///
    /// An unknown project leaves the session untouched. A project already open
    /// is closed (and saved) before `name` is loaded, so reopening the same
    /// project picks up its unsaved edits.
    pub fn open_project(&mut self, name: &str) -> SessionResult<String> {
        if !self.store.exists(name) {
            tracing::warn!("Project not found: {}", name);
            return Err(SessionError::ProjectNotFound(name.to_string()));
        }

        if self.is_open() {
            self.close_project()?;
        }

        let document = self.store.load(name)?;

        let count = match self.project(&document, name) {
            Ok(count) => count,
            Err(e) => {
                tracing::error!("Unpacking {} failed: {}", name, e);
                self.discard_projection();
                return Err(e);
            }
        };

        self.project_name = Some(name.to_string());
        self.document = Some(document);
        self.start_watching();

        tracing::info!(
            "Opened project {} ({} nodes in {})",
            name,
            count,
            self.unpack_path.display()
        );
        Ok(name.to_string())
    }

    /// Save the document, stop watching and delete the projection
    ///
    /// Closing when nothing is open succeeds without doing anything.
    pub fn close_project(&mut self) -> SessionResult<()> {
        let Some(name) = self.project_name.clone() else {
            return Ok(());
        };

        self.closing.store(true, Ordering::SeqCst);

        if let Some(document) = &self.document {
            if let Err(e) = self.store.save(&name, document) {
                self.closing.store(false, Ordering::SeqCst);
                tracing::error!("Saving {} failed, project stays open: {}", name, e);
                return Err(e.into());
            }
        }

        self.watcher = None;
        self.discard_projection();

        self.project_name = None;
        self.document = None;
        self.recent_writes.clear();
        self.closing.store(false, Ordering::SeqCst);

        tracing::info!("Closed project {}", name);
        Ok(())
    }

    /// Re-open the project recorded in an existing projection
    ///
    /// The projection on disk is reused as is.
    pub fn restore(&mut self) -> SessionResult<String> {
        let path = self.metadata_path();
        let text = std::fs::read_to_string(&path)
            .map_err(|e| SessionError::Metadata(format!("{}: {}", path.display(), e)))?;
        let metadata: ProjectMetadata =
            serde_json::from_str(&text).map_err(|e| SessionError::Metadata(e.to_string()))?;

        if let Some(current) = self.project_name() {
            return Ok(current.to_string());
        }
        if !self.store.exists(&metadata.name) {
            return Err(SessionError::ProjectNotFound(metadata.name));
        }

        let document = self.store.load(&metadata.name)?;
        self.project_name = Some(metadata.name.clone());
        self.document = Some(document);
        self.start_watching();

        tracing::info!("Restored project {}", metadata.name);
        Ok(metadata.name)
    }

    /// Apply an edit command to the document and the projection
    pub fn apply_edit(&mut self, command: &EditCommand) -> SessionResult<EditOutcome> {
        let Some(document) = self.document.as_mut() else {
            return Err(SessionError::NotOpen);
        };

        let applied = apply_edit(document, &self.unpack_path, command)?;

        if let EditCommand::Delete { .. } = command {
            self.recent_writes.retain(|path, _| path.exists());
        }
        for (path, contents) in applied.writes {
            self.recent_writes.insert(path, contents);
        }

        Ok(applied.outcome)
    }

    /// Fold the current contents of a changed file back into the document
    pub fn ingest(&mut self, path: &Path) -> SessionResult<IngestOutcome> {
        if self.closing.load(Ordering::SeqCst) {
            return Ok(IngestOutcome::Ignored);
        }
        let Some(document) = self.document.as_mut() else {
            return Ok(IngestOutcome::Ignored);
        };
        let Some(kind) = FileKind::from_path(path) else {
            return Ok(IngestOutcome::Ignored);
        };

        let Some(node_path) = FolderId::of_file(path)
            .and_then(|id| document.find_by(|node| id.matches(&node.name, &node.class_name)))
        else {
            tracing::debug!("No node for {}", path.display());
            return Ok(IngestOutcome::Unresolved);
        };

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(IngestOutcome::Ignored);
            }
            Err(e) => return Err(e.into()),
        };

        if self.recent_writes.get(path) == Some(&text) {
            tracing::trace!("Skipping echo of own write to {}", path.display());
            return Ok(IngestOutcome::Echo);
        }
        self.recent_writes.remove(path);

        let Some(node) = document.node_mut(&node_path) else {
            return Ok(IngestOutcome::Unresolved);
        };

        match kind {
            FileKind::Properties => {
                let changed = apply_properties(node, &text)?;
                if !changed.is_empty() {
                    tracing::info!("Synced {} from disk: {}", node.name, changed.join(", "));
                }
                Ok(IngestOutcome::Applied(changed))
            }
            FileKind::Script => {
                if apply_script(node, &text) {
                    tracing::info!("Synced source of {} from disk", node.name);
                    Ok(IngestOutcome::ScriptUpdated)
                } else {
                    Ok(IngestOutcome::Ignored)
                }
            }
        }
    }

    fn metadata_path(&self) -> PathBuf {
        self.unpack_path.join(METADATA_FILE)
    }

    /// Fresh projection directory holding `document` and its metadata
    fn project(&self, document: &Document, name: &str) -> SessionResult<usize> {
        match std::fs::remove_dir_all(&self.unpack_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        std::fs::create_dir_all(&self.unpack_path)?;

        let count = unpack_document(document, &self.unpack_path)?;

        let metadata = ProjectMetadata {
            name: name.to_string(),
            opened_at: Some(Utc::now()),
        };
        let json = serde_json::to_string_pretty(&metadata)
            .map_err(|e| SessionError::Metadata(e.to_string()))?;
        std::fs::write(self.metadata_path(), json)?;

        Ok(count)
    }

    fn discard_projection(&self) {
        match std::fs::remove_dir_all(&self.unpack_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "Failed to delete projection {}: {}",
                self.unpack_path.display(),
                e
            ),
        }
    }

    fn start_watching(&mut self) {
        let Some(events) = &self.watch_events else {
            return;
        };
        match ProjectWatcher::new(&self.unpack_path, events.clone()) {
            Ok(watcher) => self.watcher = Some(watcher),
            Err(e) => tracing::error!(
                "Failed to watch {}, disk edits will not sync: {}",
                self.unpack_path.display(),
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use placesync_document::{Node, PlaceFileStore, PropertyValue};
    use tempfile::TempDir;

    struct Fixture {
        temp_dir: TempDir,
        session: ProjectSession,
    }

    impl Fixture {
        fn unpacked(&self) -> PathBuf {
            self.temp_dir.path().join("unpacked")
        }

        fn store(&self) -> PlaceFileStore {
            PlaceFileStore::new(self.temp_dir.path().join("projects"))
        }
    }

    fn fixture() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let store = PlaceFileStore::new(temp_dir.path().join("projects"));
        store
            .save(
                "Town",
                &Document::with_children(vec![
                    Node::new("Spawn", "SpawnLocation").with_property("Enabled", true)
                ]),
            )
            .unwrap();
        let session = ProjectSession::new(temp_dir.path().join("unpacked"), store);
        Fixture { temp_dir, session }
    }

    fn spawn_file(root: &Path) -> PathBuf {
        let folder = std::fs::read_dir(root)
            .unwrap()
            .map(|e| e.unwrap().path())
            .find(|p| p.is_dir())
            .unwrap();
        folder.join("properties.yaml")
    }

    #[test]
    fn test_open_and_status() {
        let mut fx = fixture();
        assert_eq!(fx.session.open_project("Town").unwrap(), "Town");

        let status = fx.session.status();
        assert!(status.is_open);
        assert_eq!(status.project_name.as_deref(), Some("Town"));
        assert_eq!(status.unpack_path, Some(fx.unpacked()));
        assert!(fx.unpacked().join(METADATA_FILE).is_file());
    }

    #[test]
    fn test_open_unknown_project_changes_nothing() {
        let mut fx = fixture();
        assert!(matches!(
            fx.session.open_project("Nowhere"),
            Err(SessionError::ProjectNotFound(_))
        ));
        assert!(!fx.session.is_open());
        assert!(!fx.unpacked().exists());

        fx.session.open_project("Town").unwrap();
        assert!(fx.session.open_project("Nowhere").is_err());
        assert_eq!(fx.session.project_name(), Some("Town"));
    }

    #[test]
    fn test_close_when_closed_is_noop() {
        let mut fx = fixture();
        fx.session.close_project().unwrap();
        fx.session.close_project().unwrap();
        assert!(!fx.session.is_open());
    }

    #[test]
    fn test_close_persists_and_deletes() {
        let mut fx = fixture();
        fx.session.open_project("Town").unwrap();

        let file = spawn_file(&fx.unpacked());
        std::fs::write(&file, "enabled: false\n").unwrap();
        fx.session.ingest(&file).unwrap();

        fx.session.close_project().unwrap();
        assert!(!fx.unpacked().exists());
        assert!(!fx.session.is_open());
        assert!(fx.session.status().unpack_path.is_none());

        let saved = fx.store().load("Town").unwrap();
        assert_eq!(
            saved.children()[0].property("Enabled"),
            Some(&PropertyValue::Bool(false))
        );
    }

    #[test]
    fn test_reopen_replaces_projection() {
        let mut fx = fixture();
        fx.session.open_project("Town").unwrap();
        let stray = fx.unpacked().join("stray.txt");
        std::fs::write(&stray, "left behind").unwrap();

        fx.session.open_project("Town").unwrap();
        assert!(!stray.exists());
        assert!(spawn_file(&fx.unpacked()).is_file());
    }

    #[test]
    fn test_reopen_keeps_unsaved_edits() {
        let mut fx = fixture();
        fx.session.open_project("Town").unwrap();

        let file = spawn_file(&fx.unpacked());
        std::fs::write(&file, "enabled: false\n").unwrap();
        fx.session.ingest(&file).unwrap();

        fx.session.open_project("Town").unwrap();
        assert_eq!(
            fx.session.document().unwrap().children()[0].property("Enabled"),
            Some(&PropertyValue::Bool(false))
        );
        let text = std::fs::read_to_string(spawn_file(&fx.unpacked())).unwrap();
        assert_eq!(text.trim(), "enabled: false");

        fx.session.close_project().unwrap();
        let saved = fx.store().load("Town").unwrap();
        assert_eq!(
            saved.children()[0].property("Enabled"),
            Some(&PropertyValue::Bool(false))
        );
    }

    #[test]
    fn test_restore_from_metadata() {
        let mut fx = fixture();
        fx.session.open_project("Town").unwrap();

        // A fresh process over the same directories
        let mut restored = ProjectSession::new(fx.unpacked(), fx.store());
        assert_eq!(restored.restore().unwrap(), "Town");
        assert!(restored.is_open());
        assert_eq!(restored.document().unwrap().len(), 1);
    }

    #[test]
    fn test_restore_without_metadata_fails() {
        let mut fx = fixture();
        assert!(matches!(fx.session.restore(), Err(SessionError::Metadata(_))));

        std::fs::create_dir_all(fx.unpacked()).unwrap();
        std::fs::write(fx.unpacked().join(METADATA_FILE), "{not json").unwrap();
        assert!(matches!(fx.session.restore(), Err(SessionError::Metadata(_))));
        assert!(!fx.session.is_open());
    }

    #[test]
    fn test_restore_unknown_project_fails() {
        let mut fx = fixture();
        std::fs::create_dir_all(fx.unpacked()).unwrap();
        std::fs::write(fx.unpacked().join(METADATA_FILE), r#"{"name":"Gone"}"#).unwrap();
        assert!(matches!(
            fx.session.restore(),
            Err(SessionError::ProjectNotFound(_))
        ));
        assert!(!fx.session.is_open());
    }

    #[test]
    fn test_edit_requires_open_project() {
        let mut fx = fixture();
        let command = EditCommand::Delete { path: "Spawn.SpawnLocation.x".into() };
        assert!(matches!(fx.session.apply_edit(&command), Err(SessionError::NotOpen)));
    }

    #[test]
    fn test_own_write_is_not_reingested() {
        let mut fx = fixture();
        fx.session.open_project("Town").unwrap();
        let file = spawn_file(&fx.unpacked());
        let folder = file.parent().unwrap().file_name().unwrap().to_string_lossy().to_string();

        let command = EditCommand::ModifyProperty {
            path: folder,
            property: "Enabled".into(),
            value: "false".into(),
        };
        fx.session.apply_edit(&command).unwrap();
        assert_eq!(fx.session.ingest(&file).unwrap(), IngestOutcome::Echo);

        // An external edit after that is applied normally
        std::fs::write(&file, "enabled: true\n").unwrap();
        assert_eq!(
            fx.session.ingest(&file).unwrap(),
            IngestOutcome::Applied(vec!["Enabled".to_string()])
        );

        // Writing back the applier's exact text is now a real edit
        std::fs::write(&file, "enabled: false\n").unwrap();
        assert_eq!(
            fx.session.ingest(&file).unwrap(),
            IngestOutcome::Applied(vec!["Enabled".to_string()])
        );
    }

    #[test]
    fn test_ingest_ignores_other_files() {
        let mut fx = fixture();
        fx.session.open_project("Town").unwrap();
        let metadata = fx.unpacked().join(METADATA_FILE);
        assert_eq!(fx.session.ingest(&metadata).unwrap(), IngestOutcome::Ignored);
    }

    #[test]
    fn test_ingest_when_closed_is_ignored() {
        let mut fx = fixture();
        let path = fx.unpacked().join("Spawn.SpawnLocation.abcd1234/properties.yaml");
        assert_eq!(fx.session.ingest(&path).unwrap(), IngestOutcome::Ignored);
    }
}
