//! # Placesync Document
//!
//! In-memory model of a place document and the store that loads and saves it.
//!
//! ```text
//! DataModel (root)
//!  ├── Workspace
//!  │    ├── Spawn (SpawnLocation)
//!  │    └── Baseplate (Part)
//!  └── ServerScriptService
//!       └── Main (Script)
//! ```
//!
//! Nodes own their children. There are no parent pointers; a node's position
//! is addressed by a [`NodePath`] of child indices from the root.

mod error;
mod node;
mod store;
mod value;

pub use error::{DocumentError, DocumentResult};
pub use node::{Document, Node, NodePath};
pub use store::{DocumentStore, PlaceFileStore, PLACE_EXTENSION};
pub use value::{PropertyValue, Vector3};
