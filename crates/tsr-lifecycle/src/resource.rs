//! Tenant settings resource lifecycle
//!
//! Sequences the four operations over a [`SettingsApi`] and a
//! [`BaselineSlot`]:
//!
//! - **create** captures the remote object as the baseline, then writes
//! - **read** reconciles the remote object against the tracked state's mask
//! - **update** writes the plan, substituting the zero sentinel for cleared
//!   identifiers
//! - **restore** (destroy) writes the baseline back for managed fields
//!
//! # Concurrency
//!
//! The remote settings object is a tenant-wide singleton with no
//! concurrency token. Every write sends only the managed fields and the
//! remote applies them over its current state, so resources managing
//! disjoint fields do not clobber each other. Two writers managing the same
//! field are last-writer-wins, and nothing here detects it.

use std::future::Future;

use serde_json::Value as Json;
use tsr_reconcile::{Reconciled, Reconciler};
use tsr_tree::{wire, SettingsTree};

use crate::api::SettingsApi;
use crate::baseline::{BaselineSlot, BaselineSnapshot};
use crate::config::EngineConfig;
use crate::error::{ApiError, Diagnostic, LifecycleError, SnapshotError};
use crate::state::{CallOptions, Operation, Outcome, ResourceState};
use crate::tenant::tenant_reconciler;

pub(crate) mod summary {
    pub(crate) const READ_IN_CREATE: &str = "Unable to Read Tenant Settings in Create";
    pub(crate) const STORE_IN_CREATE: &str = "Unable to Store Original Settings in Create";
    pub(crate) const CREATE: &str = "Unable to Create Tenant Settings";
    pub(crate) const READ: &str = "Unable to Read Tenant Settings";
    pub(crate) const TENANT_IN_READ: &str = "Unable to Read Tenant Information in Read";
    pub(crate) const TENANT_IN_PLAN: &str = "Unable to Read Tenant Information";
    pub(crate) const UPDATE: &str = "Unable to Update Tenant Settings";
    pub(crate) const LOAD_IN_DELETE: &str = "Unable to Unmarshal Original Settings in Delete";
    pub(crate) const DELETE: &str = "Unable to Restore Tenant Settings in Delete";
    pub(crate) const MISMATCH: &str = "Skipped Mismatched Tenant Setting";
}

/// Warning emitted by every restore, whatever its result
pub const RESTORE_WARNING_SUMMARY: &str = "Tenant Settings Cannot Be Deleted";
pub const RESTORE_WARNING_DETAIL: &str = "Tenant Settings cannot be permanently deleted in Power Platform. \
     Deleting this resource will attempt to restore settings to their previous values and remove \
     this configuration from Terraform state.";

pub(crate) struct Failure {
    summary: &'static str,
    error: LifecycleError,
}

pub(crate) fn failed(summary: &'static str) -> impl FnOnce(LifecycleError) -> Failure {
    move |error| Failure { summary, error }
}

pub(crate) fn conclude<T>(
    operation: Operation,
    result: Result<T, Failure>,
    mut diagnostics: Vec<Diagnostic>,
) -> Outcome<T> {
    let result = result.map_err(|Failure { summary, error }| {
        tracing::error!("Tenant settings {} failed: {}", operation, error);
        diagnostics.push(Diagnostic::error(summary, error.to_string()));
        error
    });
    Outcome {
        result,
        diagnostics,
    }
}

/// Run an API call under the operation's timeout
pub(crate) async fn bounded<T>(
    config: &EngineConfig,
    operation: Operation,
    options: CallOptions,
    call: impl Future<Output = Result<T, ApiError>>,
) -> Result<T, LifecycleError> {
    let after = options
        .timeout
        .unwrap_or_else(|| config.timeouts.for_operation(operation));
    match tokio::time::timeout(after, call).await {
        Ok(result) => result.map_err(|source| LifecycleError::api(operation, source)),
        Err(_) => Err(LifecycleError::Timeout { operation, after }),
    }
}

/// The tenant settings resource
#[derive(Debug)]
pub struct SettingsResource<A, S> {
    api: A,
    slot: S,
    reconciler: Reconciler,
    config: EngineConfig,
}

impl<A: SettingsApi, S: BaselineSlot> SettingsResource<A, S> {
    /// Resource over the tenant settings schema
    #[must_use]
    pub fn new(api: A, slot: S, config: EngineConfig) -> Self {
        Self {
            api,
            slot,
            reconciler: tenant_reconciler(config.mismatch_policy),
            config,
        }
    }

    /// Replace the reconciler (other schemas or sentinel rules)
    #[must_use]
    pub fn with_reconciler(mut self, reconciler: Reconciler) -> Self {
        self.reconciler = reconciler;
        self
    }

    #[inline]
    #[must_use]
    pub fn api(&self) -> &A {
        &self.api
    }

    #[inline]
    #[must_use]
    pub fn slot(&self) -> &S {
        &self.slot
    }

    #[inline]
    #[must_use]
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fill an unknown plan id with the tenant id
    pub async fn plan_id(&self, plan: ResourceState, options: CallOptions) -> Outcome<ResourceState> {
        let result = self.try_plan_id(plan, options).await;
        conclude(Operation::Read, result, Vec::new())
    }

    async fn try_plan_id(&self, plan: ResourceState, options: CallOptions) -> Result<ResourceState, Failure> {
        if plan.id.is_some() {
            return Ok(plan);
        }
        let tenant = bounded(&self.config, Operation::Read, options, self.api.fetch_tenant())
            .await
            .map_err(failed(summary::TENANT_IN_PLAN))?;
        Ok(ResourceState {
            id: Some(tenant.tenant_id),
            ..plan
        })
    }

    /// Capture the baseline, write the plan and report reconciled state
    pub async fn create(&self, plan: &ResourceState, options: CallOptions) -> Outcome<ResourceState> {
        tracing::info!("Creating tenant settings");
        let mut diagnostics = Vec::new();
        let result = self.try_create(plan, options, &mut diagnostics).await;
        if result.is_ok() {
            tracing::info!("Tenant settings created");
        }
        conclude(Operation::Create, result, diagnostics)
    }

    async fn try_create(
        &self,
        plan: &ResourceState,
        options: CallOptions,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<ResourceState, Failure> {
        let original = bounded(&self.config, Operation::Create, options, self.api.fetch_settings())
            .await
            .map_err(failed(summary::READ_IN_CREATE))?;

        let snapshot = BaselineSnapshot::capture(original);
        let bytes = snapshot
            .to_bytes()
            .map_err(|e| failed(summary::STORE_IN_CREATE)(e.into()))?;
        self.slot
            .put_baseline(bytes)
            .await
            .map_err(|e| failed(summary::STORE_IN_CREATE)(e.into()))?;
        tracing::debug!("Captured baseline {}", snapshot.hash().short());

        let id = match &plan.id {
            Some(id) => id.clone(),
            None => {
                bounded(&self.config, Operation::Create, options, self.api.fetch_tenant())
                    .await
                    .map_err(failed(summary::CREATE))?
                    .tenant_id
            }
        };

        let response = self
            .send(Operation::Create, options, &plan.settings)
            .await
            .map_err(failed(summary::CREATE))?;
        let reconciled = self
            .reconciler
            .reconcile(&plan.settings, &response)
            .map_err(|e| failed(summary::CREATE)(e.into()))?;
        Ok(ResourceState::new(id, report(reconciled, diagnostics)))
    }

    /// Reconcile the remote object against tracked state
    ///
    /// `Ok(None)` means the remote object is gone and the resource should
    /// be dropped from state.
    pub async fn read(&self, prior: &ResourceState, options: CallOptions) -> Outcome<Option<ResourceState>> {
        tracing::debug!("Reading tenant settings");
        let mut diagnostics = Vec::new();
        let result = self.try_read(prior, options, &mut diagnostics).await;
        conclude(Operation::Read, result, diagnostics)
    }

    async fn try_read(
        &self,
        prior: &ResourceState,
        options: CallOptions,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Option<ResourceState>, Failure> {
        let remote = match self.fetch(Operation::Read, options).await {
            Ok(remote) => remote,
            Err(e) if e.is_not_found() => {
                tracing::info!("Tenant settings not found, removing from state");
                return Ok(None);
            }
            Err(e) => return Err(failed(summary::READ)(e)),
        };
        let tenant = match bounded(&self.config, Operation::Read, options, self.api.fetch_tenant()).await {
            Ok(tenant) => tenant,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(failed(summary::TENANT_IN_READ)(e)),
        };

        let reconciled = self
            .reconciler
            .reconcile(&prior.settings, &remote)
            .map_err(|e| failed(summary::READ)(e.into()))?;
        Ok(Some(ResourceState::new(
            tenant.tenant_id,
            report(reconciled, diagnostics),
        )))
    }

    /// Write the plan and report reconciled state
    ///
    /// Identifiers set in `prior` but dropped from `plan` are sent as the
    /// zero sentinel, since an absent field would leave them untouched.
    pub async fn update(
        &self,
        prior: &ResourceState,
        plan: &ResourceState,
        options: CallOptions,
    ) -> Outcome<ResourceState> {
        tracing::info!("Updating tenant settings");
        let mut diagnostics = Vec::new();
        let result = self.try_update(prior, plan, options, &mut diagnostics).await;
        conclude(Operation::Update, result, diagnostics)
    }

    async fn try_update(
        &self,
        prior: &ResourceState,
        plan: &ResourceState,
        options: CallOptions,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<ResourceState, Failure> {
        let (payload, cleared) = self.reconciler.preprocess(&prior.settings, &plan.settings);
        for path in &cleared {
            tracing::debug!("Clearing {} with the zero sentinel", path);
        }

        let response = self
            .send(Operation::Update, options, &payload)
            .await
            .map_err(failed(summary::UPDATE))?;
        let reconciled = self
            .reconciler
            .reconcile_with(&plan.settings, &payload, &response)
            .map_err(|e| failed(summary::UPDATE)(e.into()))?;

        Ok(ResourceState {
            id: plan.id.clone().or_else(|| prior.id.clone()),
            settings: report(reconciled, diagnostics),
        })
    }

    /// Restore managed fields to the captured baseline
    ///
    /// Nothing is removed remotely. A warning saying so is always part of
    /// the outcome.
    pub async fn delete(&self, prior: &ResourceState, options: CallOptions) -> Outcome<()> {
        tracing::warn!("Tenant settings cannot be deleted; restoring baseline");
        let diagnostics = vec![Diagnostic::warning(
            RESTORE_WARNING_SUMMARY,
            RESTORE_WARNING_DETAIL,
        )];
        let result = self.try_restore(prior, options).await;
        if result.is_ok() {
            tracing::info!("Tenant settings restored to baseline");
        }
        conclude(Operation::Restore, result, diagnostics)
    }

    async fn try_restore(&self, prior: &ResourceState, options: CallOptions) -> Result<(), Failure> {
        let baseline = self
            .load_baseline()
            .await
            .map_err(failed(summary::LOAD_IN_DELETE))?;

        let (payload, cleared) = self.reconciler.restore_payload(&prior.settings, &baseline);
        for path in &cleared {
            tracing::debug!("Clearing {} to match baseline", path);
        }

        self.send(Operation::Restore, options, &payload)
            .await
            .map_err(failed(summary::DELETE))?;
        Ok(())
    }

    /// State for an imported resource: the id and nothing managed yet
    #[must_use]
    pub fn import(&self, id: impl Into<String>) -> ResourceState {
        ResourceState::new(id, SettingsTree::new())
    }

    async fn load_baseline(&self) -> Result<SettingsTree, LifecycleError> {
        let bytes = self
            .slot
            .get_baseline()
            .await?
            .ok_or(SnapshotError::Missing)?;
        let snapshot = BaselineSnapshot::from_bytes(&bytes)?;
        tracing::debug!("Loaded baseline {}", snapshot.hash().short());
        Ok(wire::decode(self.reconciler.schema(), snapshot.settings())?)
    }

    async fn fetch(&self, operation: Operation, options: CallOptions) -> Result<SettingsTree, LifecycleError> {
        let json = bounded(&self.config, operation, options, self.api.fetch_settings()).await?;
        Ok(wire::decode(self.reconciler.schema(), &json)?)
    }

    async fn send(
        &self,
        operation: Operation,
        options: CallOptions,
        settings: &SettingsTree,
    ) -> Result<SettingsTree, LifecycleError> {
        let payload: Json = wire::encode(self.reconciler.schema(), settings)?;
        let response = bounded(&self.config, operation, options, self.api.send_settings(payload)).await?;
        Ok(wire::decode(self.reconciler.schema(), &response)?)
    }
}

fn report(reconciled: Reconciled, diagnostics: &mut Vec<Diagnostic>) -> SettingsTree {
    for mismatch in &reconciled.mismatches {
        diagnostics.push(Diagnostic::warning(summary::MISMATCH, mismatch.to_string()));
    }
    for path in &reconciled.restored_sentinels {
        tracing::debug!("Restored sentinel at {}", path);
    }
    reconciled.tree
}
