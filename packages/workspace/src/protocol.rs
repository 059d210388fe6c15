//! Control channel envelopes
//!
//! ```json
//! {"type": "cli", "command": "open-project", "id": "test1234", "args": {"name": "Town"}}
//! ```
//!
//! Command arguments are read from `args`, falling back to fields at the top
//! level of the envelope.

use crate::mutations::{EditCommand, EditError};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// The only envelope type that carries commands
pub const CLI_TYPE: &str = "cli";
pub const RESPONSE_TYPE: &str = "response";

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Envelope has no command")]
    MissingCommand,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("Invalid edit: {0}")]
    Edit(#[from] EditError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub command: Option<String>,
    /// Opaque, echoed back unchanged
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub args: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Envelope {
    /// Decode a command envelope. Undecodable text and other envelope types
    /// give `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let envelope: Envelope = match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!("Dropping undecodable message: {}", e);
                return None;
            }
        };

        if envelope.kind != CLI_TYPE {
            tracing::trace!("Ignoring message of type {}", envelope.kind);
            return None;
        }
        Some(envelope)
    }

    /// String argument by name
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args
            .as_ref()
            .and_then(|args| args.get(name))
            .or_else(|| self.extra.get(name))
            .and_then(Value::as_str)
    }

    /// Response envelope for this request carrying `fields`
    pub fn response(&self, fields: Value) -> String {
        let mut body = Map::new();
        body.insert("type".into(), Value::from(RESPONSE_TYPE));
        body.insert(
            "command".into(),
            self.command.clone().map(Value::from).unwrap_or(Value::Null),
        );
        body.insert("id".into(), self.id.clone().unwrap_or(Value::Null));
        if let Value::Object(fields) = fields {
            body.extend(fields);
        }
        Value::Object(body).to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Status,
    ListProjects,
    OpenProject { name: String },
    CloseProject,
    Edit(EditCommand),
}

impl Command {
    pub fn from_envelope(envelope: &Envelope) -> Result<Self, ProtocolError> {
        let command = envelope
            .command
            .as_deref()
            .ok_or(ProtocolError::MissingCommand)?;

        match command {
            "status" => Ok(Command::Status),
            "list-projects" => Ok(Command::ListProjects),
            "open-project" => {
                let name = envelope
                    .arg("name")
                    .filter(|name| !name.is_empty())
                    .ok_or(ProtocolError::MissingArgument("name"))?;
                Ok(Command::OpenProject { name: name.to_string() })
            }
            "close-project" => Ok(Command::CloseProject),
            "edit" => Ok(Command::Edit(EditCommand::parse(
                envelope.arg("path"),
                envelope.arg("action"),
                envelope.arg("target"),
                envelope.arg("value"),
                envelope.arg("property"),
            )?)),
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}
