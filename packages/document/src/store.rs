//! # Document Store
//!
//! Loads and saves whole documents by project name. The session only talks to
//! the [`DocumentStore`] trait; [`PlaceFileStore`] is the on-disk backend.

use crate::error::{DocumentError, DocumentResult};
use crate::node::Document;
use std::path::PathBuf;

pub const PLACE_EXTENSION: &str = "place";

/// Wholesale load/save of documents keyed by project name
pub trait DocumentStore: Send + Sync {
    fn exists(&self, name: &str) -> bool;

    fn load(&self, name: &str) -> DocumentResult<Document>;

    fn save(&self, name: &str, doc: &Document) -> DocumentResult<()>;

    /// Names of every available project, sorted
    fn list(&self) -> DocumentResult<Vec<String>>;
}

/// One MessagePack file per project: `<dir>/<name>.place`
#[derive(Debug, Clone)]
pub struct PlaceFileStore {
    dir: PathBuf,
}

impl PlaceFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, PLACE_EXTENSION))
    }
}

impl DocumentStore for PlaceFileStore {
    fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    fn load(&self, name: &str) -> DocumentResult<Document> {
        let path = self.path_for(name);
        if !path.is_file() {
            return Err(DocumentError::NotFound(name.to_string()));
        }
        let bytes = std::fs::read(&path)?;
        let doc = rmp_serde::from_slice(&bytes)?;
        tracing::debug!("Loaded document {} from {}", name, path.display());
        Ok(doc)
    }

    fn save(&self, name: &str, doc: &Document) -> DocumentResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let bytes = rmp_serde::to_vec(doc)?;

        // Write beside the target, then rename over it
        let path = self.path_for(name);
        let tmp = path.with_extension(format!("{}.tmp", PLACE_EXTENSION));
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, &path)?;

        tracing::debug!("Saved document {} ({} bytes)", name, bytes.len());
        Ok(())
    }

    fn list(&self) -> DocumentResult<Vec<String>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().map(|e| e == PLACE_EXTENSION).unwrap_or(false) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
