//! # Command Router
//!
//! Maps control channel envelopes onto the session and builds the replies.
//!
//! | Command         | Reply fields                                   |
//! |-----------------|------------------------------------------------|
//! | `status`        | `projectOpen`, `currentProject`, `unpackedPath` |
//! | `list-projects` | `projects`                                     |
//! | `open-project`  | `status: "opened"`, `project`                  |
//! | `close-project` | `status: "closed"`                             |
//! | `edit`          | `status: "edited"`, `path`, `action`           |
//!
//! Anything that fails gets no reply at all; the caller is expected to time
//! out.

use crate::mutations::EditOutcome;
use crate::protocol::{Command, Envelope};
use crate::server::WorkspaceServer;
use crate::session::SessionError;
use serde_json::{json, Value};

#[derive(Clone)]
pub struct CommandRouter {
    server: WorkspaceServer,
}

impl CommandRouter {
    pub fn new(server: WorkspaceServer) -> Self {
        Self { server }
    }

    pub fn server(&self) -> &WorkspaceServer {
        &self.server
    }

    /// Handle one inbound text message, returning the reply to send, if any
    pub async fn handle(&self, text: &str) -> Option<String> {
        let envelope = Envelope::parse(text)?;

        let command = match Command::from_envelope(&envelope) {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!("Ignoring command: {}", e);
                return None;
            }
        };

        tracing::debug!("Handling {:?} (id {:?})", command, envelope.id);
        let fields = self.dispatch(command).await?;
        Some(envelope.response(fields))
    }

    async fn dispatch(&self, command: Command) -> Option<Value> {
        match command {
            Command::Status => {
                let status = self.server.status().await;
                Some(json!({
                    "projectOpen": status.is_open,
                    "currentProject": status.project_name,
                    "unpackedPath": status.unpack_path.map(|p| p.display().to_string()),
                }))
            }

            Command::ListProjects => match self.server.list_projects().await {
                Ok(projects) => Some(json!({ "projects": projects })),
                Err(e) => {
                    tracing::error!("Failed to list projects: {}", e);
                    None
                }
            },

            Command::OpenProject { name } => match self.server.open_project(&name).await {
                Ok(project) => Some(json!({ "status": "opened", "project": project })),
                Err(SessionError::ProjectNotFound(_)) => None,
                Err(e) => {
                    tracing::error!("Failed to open {}: {}", name, e);
                    None
                }
            },

            Command::CloseProject => match self.server.close_project().await {
                Ok(()) => Some(json!({ "status": "closed" })),
                Err(e) => {
                    tracing::error!("Failed to close project: {}", e);
                    None
                }
            },

            Command::Edit(edit) => {
                let status = match self.server.apply_edit(&edit).await {
                    Ok(EditOutcome::Applied) => "edited",
                    Ok(EditOutcome::Unsupported) => "unsupported",
                    // Acknowledged like an applied edit, nothing changed
                    Ok(EditOutcome::Unresolved) => {
                        tracing::debug!("Edit of {} matched no node", edit.path());
                        "edited"
                    }
                    Err(SessionError::NotOpen) => {
                        tracing::warn!("Edit of {} with no project open", edit.path());
                        return None;
                    }
                    Err(e) => {
                        tracing::error!("Edit of {} failed: {}", edit.path(), e);
                        return None;
                    }
                };
                Some(json!({
                    "status": status,
                    "path": edit.path(),
                    "action": edit.action(),
                }))
            }
        }
    }
}
