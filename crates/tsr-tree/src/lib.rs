//! TSR Settings Tree
//!
//! The data model shared by desired configuration, remote responses and
//! reported state.
//!
//! # Core Concepts
//!
//! - [`SettingsTree`]: named fields, each [`Field::Absent`], [`Field::Null`],
//!   [`Field::Unknown`] or [`Field::Known`]
//! - [`Schema`]: declared field names, wire names and [`Kind`]s
//! - [`wire`]: schema-driven JSON codec for the remote's camelCase form
//! - [`SettingsHash`]: order-independent Blake3 hash for change detection
//! - [`FieldPath`]: dotted addressing within a tree
//!
//! # Example
//!
//! ```rust
//! use tsr_tree::{Field, FieldPath, SettingsTree};
//!
//! let mut desired = SettingsTree::new();
//! let path: FieldPath = "power_platform.search.disable_docs_search".parse().unwrap();
//! desired.set_path(&path, true).unwrap();
//!
//! assert_eq!(desired.get_path(&path), &Field::from(true));
//! assert!(desired.get("walk_me_opt_out").is_absent());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod field;
mod hash;
mod identifier;
mod path;
mod schema;
mod tree;
pub mod wire;

pub use field::{Field, Value};
pub use hash::{HashError, SettingsHash};
pub use identifier::{Identifier, IdentifierError};
pub use path::{FieldPath, PathError};
pub use schema::{camel_case, FieldSpec, Kind, Schema};
pub use tree::{SettingsTree, TreeError};
pub use wire::WireError;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
