//! # Edit Commands
//!
//! Structured edits delivered over the control channel. Each one is applied to
//! the in-memory document and to the projection in the same step.
//!
//! ## Target resolution
//!
//! `path` names a projected folder, either a bare folder id
//! (`Door.Part.0c5e9a11`) or a path relative to the projection root. The node
//! is the first one, in pre-order, whose name and class match the folder id.
//! The suffix is not consulted, so duplicate siblings resolve to the first.
//!
//! ## Semantics
//!
//! - `modify` + `property`: coerce and assign, then rewrite the whole
//!   `properties.yaml`
//! - `modify` + `script`: assign `Source`, write `code.lua` verbatim
//! - `delete`: drop the subtree and its folder; either may already be gone
//! - `create`: recognized, not supported

use placesync_document::Document;
use placesync_projection::ingest::{apply_script, resolve_property};
use placesync_projection::{coerce_text_onto, write_properties, write_script, FolderId, ProjectionError};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// A parsed edit command
#[derive(Debug, Clone, PartialEq)]
pub enum EditCommand {
    ModifyProperty {
        path: String,
        property: String,
        value: String,
    },
    ModifyScript {
        path: String,
        source: String,
    },
    Delete {
        path: String,
    },
    Create {
        path: String,
    },
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Unknown target: {0}")]
    UnknownTarget(String),

    #[error("Path escapes the projection: {0}")]
    InvalidPath(String),

    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What applying a command did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    /// No node matched the path; nothing changed
    Unresolved,
    /// The action is known but not implemented
    Unsupported,
}

/// Result of [`apply_edit`], with the files it wrote and their contents
#[derive(Debug)]
pub struct EditApplied {
    pub outcome: EditOutcome,
    pub writes: Vec<(PathBuf, String)>,
}

impl EditApplied {
    fn outcome(outcome: EditOutcome) -> Self {
        Self {
            outcome,
            writes: Vec::new(),
        }
    }
}

fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, EditError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(EditError::MissingField(field))
}

impl EditCommand {
    /// Build a command from the raw protocol fields
    pub fn parse(
        path: Option<&str>,
        action: Option<&str>,
        target: Option<&str>,
        value: Option<&str>,
        property: Option<&str>,
    ) -> Result<Self, EditError> {
        let path = required(path, "path")?.to_string();

        match required(action, "action")? {
            "modify" => match required(target, "target")? {
                "property" => Ok(EditCommand::ModifyProperty {
                    path,
                    property: required(property, "property")?.to_string(),
                    value: required(value, "value")?.to_string(),
                }),
                "script" => Ok(EditCommand::ModifyScript {
                    path,
                    source: required(value, "value")?.to_string(),
                }),
                other => Err(EditError::UnknownTarget(other.to_string())),
            },
            "delete" => Ok(EditCommand::Delete { path }),
            "create" => Ok(EditCommand::Create { path }),
            other => Err(EditError::UnknownAction(other.to_string())),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            EditCommand::ModifyProperty { path, .. }
            | EditCommand::ModifyScript { path, .. }
            | EditCommand::Delete { path }
            | EditCommand::Create { path } => path,
        }
    }

    /// Protocol name of the action
    pub fn action(&self) -> &'static str {
        match self {
            EditCommand::ModifyProperty { .. } | EditCommand::ModifyScript { .. } => "modify",
            EditCommand::Delete { .. } => "delete",
            EditCommand::Create { .. } => "create",
        }
    }
}

/// Apply `command` to `doc` and to the projection rooted at `root`
pub fn apply_edit(doc: &mut Document, root: &Path, command: &EditCommand) -> Result<EditApplied, EditError> {
    let relative = checked_relative(command.path())?;

    if let EditCommand::Create { .. } = command {
        tracing::warn!("Edit action 'create' is not supported ({})", command.path());
        return Ok(EditApplied::outcome(EditOutcome::Unsupported));
    }

    let folder = locate_folder(root, relative);
    let node_path = FolderId::of_folder(relative)
        .and_then(|id| doc.find_by(|node| id.matches(&node.name, &node.class_name)));

    let Some(node_path) = node_path else {
        tracing::debug!("No node matches {}", command.path());
        if let (EditCommand::Delete { .. }, Some(folder)) = (command, &folder) {
            remove_folder(folder)?;
        }
        return Ok(EditApplied::outcome(EditOutcome::Unresolved));
    };

    let mut applied = EditApplied::outcome(EditOutcome::Applied);

    match command {
        EditCommand::ModifyProperty { property, value, .. } => {
            let Some(node) = doc.node_mut(&node_path) else {
                return Ok(EditApplied::outcome(EditOutcome::Unresolved));
            };

            match resolve_property(node, property) {
                Some(name) => {
                    let coerced = node
                        .properties
                        .get(&name)
                        .and_then(|existing| coerce_text_onto(existing, value));
                    match coerced {
                        Some(coerced) => {
                            tracing::info!("Set {}.{} = {:?}", node.name, name, coerced);
                            node.properties.insert(name, coerced);
                        }
                        None => tracing::warn!("Property {}.{} is not editable", node.name, name),
                    }
                }
                None => tracing::debug!("{} has no property {}", node.name, property),
            }

            match &folder {
                Some(folder) => applied.writes.push(write_properties(folder, node)?),
                None => tracing::warn!("No projected folder for {}", command.path()),
            }
        }

        EditCommand::ModifyScript { source, .. } => {
            let Some(node) = doc.node_mut(&node_path) else {
                return Ok(EditApplied::outcome(EditOutcome::Unresolved));
            };

            if apply_script(node, source) {
                tracing::info!("Updated source of {} ({} bytes)", node.name, source.len());
                match &folder {
                    Some(folder) => {
                        let written = write_script(folder, source)?;
                        applied.writes.push((written, source.clone()));
                    }
                    None => tracing::warn!("No projected folder for {}", command.path()),
                }
            } else {
                tracing::debug!("{} has no source property", node.name);
            }
        }

        EditCommand::Delete { .. } => {
            if let Some(removed) = doc.remove(&node_path) {
                tracing::info!(
                    "Deleted {} ({}) and {} descendants",
                    removed.name,
                    removed.class_name,
                    removed.subtree_len() - 1
                );
            }
            if let Some(folder) = &folder {
                remove_folder(folder)?;
            }
        }

        EditCommand::Create { .. } => applied.outcome = EditOutcome::Unsupported,
    }

    Ok(applied)
}

/// Reject absolute paths and parent components
fn checked_relative(path: &str) -> Result<&Path, EditError> {
    let relative = Path::new(path);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

    if escapes {
        Err(EditError::InvalidPath(path.to_string()))
    } else {
        Ok(relative)
    }
}

/// Find the folder on disk. A bare folder id of a nested node is searched for
/// through the whole projection.
fn locate_folder(root: &Path, relative: &Path) -> Option<PathBuf> {
    let direct = root.join(relative);
    if direct.is_dir() {
        return Some(direct);
    }
    if relative.components().count() != 1 {
        return None;
    }
    find_dir_named(root, relative.as_os_str())
}

fn find_dir_named(dir: &Path, name: &std::ffi::OsStr) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if path.file_name() == Some(name) {
            return Some(path);
        }
        if let Some(found) = find_dir_named(&path, name) {
            return Some(found);
        }
    }
    None
}

fn remove_folder(folder: &Path) -> Result<(), EditError> {
    match std::fs::remove_dir_all(folder) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
