//! Error types for the settings lifecycle
//!
//! Provides error handling for:
//! - Transport failures reported by the API client
//! - Baseline snapshot capture and restore failures
//! - Shape mismatches and wire encoding failures
//! - User-visible diagnostics

use std::time::Duration;

use tsr_reconcile::MergeError;
use tsr_tree::{SettingsHash, WireError};

use crate::state::Operation;

/// Failure reported by the API client
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The remote object does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Network, authentication or remote-side failure
    #[error("transport error: {message}")]
    Transport { message: String, transient: bool },

    /// The remote refused the request
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl ApiError {
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether the API client may reasonably retry
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::NotFound(_) => false,
            Self::Transport { transient, .. } => *transient,
            Self::Rejected { status, .. } => *status == 429 || *status >= 500,
        }
    }
}

/// Baseline snapshot errors, always fatal to the operation
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("no baseline snapshot was captured for this resource")]
    Missing,

    #[error("baseline storage failed: {0}")]
    Storage(String),

    #[error("baseline snapshot could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("baseline snapshot is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),

    #[error("baseline hash mismatch: recorded {recorded}, computed {computed}")]
    HashMismatch {
        recorded: SettingsHash,
        computed: SettingsHash,
    },
}

/// Main lifecycle error type
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// API client failure, carried unchanged
    #[error("{operation} failed: {source}")]
    Api {
        operation: Operation,
        #[source]
        source: ApiError,
    },

    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: Operation, after: Duration },

    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("merge error: {0}")]
    Merge(#[from] MergeError),

    #[error("wire error: {0}")]
    Wire(#[from] WireError),
}

impl LifecycleError {
    #[inline]
    #[must_use]
    pub fn api(operation: Operation, source: ApiError) -> Self {
        Self::Api { operation, source }
    }

    /// The API client error, if that is what failed
    #[inline]
    #[must_use]
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Not-found means "drop from state", not a reconciliation failure
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_not_found)
    }

    /// Check if error is retryable by the caller
    ///
    /// Advisory only; the engine itself never retries.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api { source, .. } => source.is_transient(),
            Self::Timeout { .. } => true,
            Self::Snapshot(_) | Self::Merge(_) | Self::Wire(_) => false,
        }
    }
}

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// User-visible message attached to a lifecycle outcome
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
}

impl Diagnostic {
    #[must_use]
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
