//! # Placesync Projection
//!
//! Maps document nodes onto a plain directory tree and back.
//!
//! ```text
//! unpacked/
//!   project.json
//!   Spawn.SpawnLocation.3f9a01c2/
//!     properties.yaml
//!   Main.Script.77b0e1d4/
//!     properties.yaml
//!     code.lua
//!     Helper.ModuleScript.0c5e9a11/
//!       properties.yaml
//!       code.lua
//! ```
//!
//! Only scalar-safe properties reach `properties.yaml`. References and
//! unrecognized structured values stay in the document and are never written
//! out, so the projection is deliberately lossy.

pub mod codec;
pub mod coerce;
pub mod ingest;
pub mod layout;
pub mod unpack;

mod error;

pub use codec::{decode_properties, encode_properties, export_value, property_key};
pub use coerce::{coerce_onto, coerce_text, coerce_text_onto};
pub use error::{ProjectionError, ProjectionResult};
pub use ingest::{apply_properties, apply_script};
pub use layout::{
    is_script_class, sanitize_name, FileKind, FolderId, PROPERTIES_FILE, SCRIPT_CLASSES,
    SCRIPT_FILE, SOURCE_PROPERTY,
};
pub use unpack::{unpack, unpack_document, write_properties, write_script};
