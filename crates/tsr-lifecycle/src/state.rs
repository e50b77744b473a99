//! Lifecycle state, outcomes and per-call options

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use tsr_tree::SettingsTree;

use crate::error::{Diagnostic, LifecycleError};

/// The four lifecycle operations
///
/// Destruction is modelled as [`Operation::Restore`]: the remote has no
/// delete primitive, so teardown writes the captured baseline back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Read,
    Update,
    Restore,
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Restore => "restore",
        })
    }
}

/// State tracked by the orchestrator for one managed resource
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ResourceState {
    /// Tenant id; `None` while still unknown in a plan
    pub id: Option<String>,
    /// Reported settings, using configuration field names
    #[serde(default)]
    pub settings: SettingsTree,
}

impl ResourceState {
    #[must_use]
    pub fn new(id: impl Into<String>, settings: SettingsTree) -> Self {
        Self {
            id: Some(id.into()),
            settings,
        }
    }

    /// Plan whose id is not yet known
    #[must_use]
    pub fn planned(settings: SettingsTree) -> Self {
        Self { id: None, settings }
    }
}

/// Result of a lifecycle call plus the diagnostics to show the user
#[derive(Debug)]
pub struct Outcome<T> {
    pub result: Result<T, LifecycleError>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Outcome<T> {
    #[inline]
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Diagnostics of warning severity
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    /// Diagnostics of error severity
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    /// Drop diagnostics and keep the result
    ///
    /// # Errors
    /// Returns the lifecycle error if the call failed.
    pub fn into_result(self) -> Result<T, LifecycleError> {
        self.result
    }
}

/// Caller-supplied options for a single lifecycle call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Bound on each fetch/send; the configured default when `None`
    pub timeout: Option<Duration>,
}

impl CallOptions {
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
