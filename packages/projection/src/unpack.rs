//! # Unpack Engine
//!
//! Depth-first, pre-order materialization of nodes into folders. Any I/O
//! failure aborts the whole walk.

use crate::codec::encode_properties;
use crate::error::{ProjectionError, ProjectionResult};
use crate::layout::{is_script_class, FileKind, FolderId, SOURCE_PROPERTY};
use placesync_document::{Document, Node, PropertyValue};
use std::path::{Path, PathBuf};

const MAX_SUFFIX_ATTEMPTS: usize = 8;

/// Project every root-level child of `doc` under `root`. Returns the number of
/// folders created.
pub fn unpack_document(doc: &Document, root: &Path) -> ProjectionResult<usize> {
    for child in doc.children() {
        unpack(child, root)?;
    }
    Ok(doc.len())
}

/// Project `node` and its subtree beneath `parent_dir`, returning the new folder
pub fn unpack(node: &Node, parent_dir: &Path) -> ProjectionResult<PathBuf> {
    let dir = create_folder(node, parent_dir)?;

    write_properties(&dir, node)?;
    if let Some(source) = script_source(node) {
        write_script(&dir, source)?;
    }

    for child in &node.children {
        unpack(child, &dir)?;
    }

    Ok(dir)
}

/// Overwrite `properties.yaml` in `dir` with the node's current properties.
/// Returns the file path and the text written.
pub fn write_properties(dir: &Path, node: &Node) -> ProjectionResult<(PathBuf, String)> {
    let path = dir.join(FileKind::Properties.file_name());
    let text = encode_properties(node)?;
    std::fs::write(&path, &text).map_err(|e| ProjectionError::io(&path, e))?;
    Ok((path, text))
}

/// Overwrite `code.lua` in `dir` with `source`, verbatim
pub fn write_script(dir: &Path, source: &str) -> ProjectionResult<PathBuf> {
    let path = dir.join(FileKind::Script.file_name());
    std::fs::write(&path, source).map_err(|e| ProjectionError::io(&path, e))?;
    Ok(path)
}

fn script_source(node: &Node) -> Option<&str> {
    if !is_script_class(&node.class_name) {
        return None;
    }
    match node.property(SOURCE_PROPERTY)? {
        PropertyValue::String(source) => Some(source),
        _ => None,
    }
}

fn create_folder(node: &Node, parent_dir: &Path) -> ProjectionResult<PathBuf> {
    let mut last_err = None;

    for _ in 0..MAX_SUFFIX_ATTEMPTS {
        let dir = parent_dir.join(FolderId::generate(&node.name, &node.class_name).to_string());
        match std::fs::create_dir(&dir) {
            Ok(()) => return Ok(dir),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                tracing::debug!("Folder {} exists, drawing a new suffix", dir.display());
                last_err = Some(ProjectionError::io(&dir, e));
            }
            Err(e) => return Err(ProjectionError::io(&dir, e)),
        }
    }

    Err(last_err.unwrap_or_else(|| {
        ProjectionError::io(
            parent_dir,
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "no free folder suffix"),
        )
    }))
}
