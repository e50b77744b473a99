//! TSR Reconciliation Engine
//!
//! Turns a partially declared configuration and a fully populated remote
//! tree into the state reported back to the orchestrator.
//!
//! # Pipeline
//!
//! 1. [`ConfiguredMask::extract`] marks which fields the caller manages
//! 2. [`Merger::merge`] adopts remote values for exactly those fields
//! 3. [`Normalizer::normalize`] restores sentinels the remote echoes as null
//!
//! [`substitute_cleared_identifiers`] prepares update payloads, and
//! [`Reconciler`] bundles all of it behind one schema.
//!
//! # Example
//!
//! ```rust
//! use tsr_reconcile::Reconciler;
//! use tsr_tree::{Schema, SettingsTree};
//!
//! let engine = Reconciler::new(Schema::new().bool("a").bool("b"));
//! let desired = SettingsTree::new().with("a", true);
//! let remote = SettingsTree::new().with("a", false).with("b", true);
//!
//! let state = engine.reconcile(&desired, &remote).unwrap();
//! assert_eq!(state.tree, SettingsTree::new().with("a", false));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod mask;
mod merge;
mod normalize;
mod reconciler;
mod transition;

pub use mask::{ConfiguredMask, Scope};
pub use merge::{MergeError, Merged, Merger, MismatchPolicy, ShapeMismatch, Side};
pub use normalize::{Normalizer, SentinelRule};
pub use reconciler::{Reconciled, Reconciler};
pub use transition::substitute_cleared_identifiers;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
