//! # Placesync Workspace
//!
//! The running service: one [`ProjectSession`] behind a [`WorkspaceServer`],
//! driven by edit commands from the control channel and by changes to the
//! projection on disk.
//!
//! ```text
//!   relay hub ◀──ws──▶ ControlClient ──▶ CommandRouter ──┐
//!                                                        ▼
//!   projection dir ──notify──▶ ProjectWatcher ──▶ WorkspaceServer ──▶ ProjectSession
//! ```

pub mod client;
pub mod config;
pub mod mutations;
pub mod protocol;
pub mod relay;
pub mod router;
pub mod server;
pub mod session;
pub mod watcher;

pub use client::ControlClient;
pub use config::{Config, DEFAULT_CONFIG_NAME};
pub use mutations::{apply_edit, EditApplied, EditCommand, EditError, EditOutcome};
pub use protocol::{Command, Envelope, ProtocolError};
pub use relay::RelayHub;
pub use router::CommandRouter;
pub use server::WorkspaceServer;
pub use session::{
    IngestOutcome, ProjectMetadata, ProjectSession, SessionError, SessionResult, SessionStatus,
    METADATA_FILE,
};
pub use watcher::{ProjectWatcher, WatcherError, WatcherResult};
