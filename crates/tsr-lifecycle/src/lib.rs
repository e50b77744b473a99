//! TSR Lifecycle - tenant settings as a managed resource
//!
//! Drives create, read, update and restore of the Power Platform tenant
//! settings singleton:
//! - Captures the remote object as a baseline before the first write
//! - Reports only the fields the configuration manages
//! - Clears routing identifiers with the zero sentinel
//! - Restores the baseline on destroy, since the remote cannot delete
//!
//! # Example
//!
//! ```rust,ignore
//! use tsr_lifecycle::{CallOptions, EngineConfig, FileBaselineSlot, ResourceState, SettingsResource};
//!
//! # async fn example(api: impl tsr_lifecycle::SettingsApi) -> Result<(), Box<dyn std::error::Error>> {
//! let resource = SettingsResource::new(api, FileBaselineSlot::new("baseline.json"), EngineConfig::new());
//!
//! let plan = ResourceState::planned(desired_settings());
//! let outcome = resource.create(&plan, CallOptions::default()).await;
//! for diagnostic in &outcome.diagnostics {
//!     println!("{}: {}", diagnostic.summary, diagnostic.detail);
//! }
//! let state = outcome.into_result()?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod api;
pub mod baseline;
pub mod config;
pub mod datasource;
pub mod error;
pub mod resource;
pub mod state;
pub mod tenant;

pub use api::{endpoints, SettingsApi, TenantInfo};
pub use baseline::{BaselineSlot, BaselineSnapshot, FileBaselineSlot};
pub use config::{ConfigError, EngineConfig, Timeouts};
pub use datasource::SettingsDataSource;
pub use error::{ApiError, Diagnostic, LifecycleError, Severity, SnapshotError};
pub use resource::{SettingsResource, RESTORE_WARNING_DETAIL, RESTORE_WARNING_SUMMARY};
pub use state::{CallOptions, Operation, Outcome, ResourceState};
pub use tenant::{
    tenant_reconciler, tenant_sentinel_rules, tenant_settings_schema, ROUTING_ENVIRONMENT_GROUP,
    ROUTING_SECURITY_GROUP,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
