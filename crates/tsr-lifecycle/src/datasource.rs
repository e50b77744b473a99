//! Read-only view of the full tenant settings object
//!
//! Unlike [`SettingsResource::read`](crate::SettingsResource::read) there is
//! no configured mask: every declared field the remote returns is reported.

use tsr_tree::{wire, Schema, SettingsTree};

use crate::api::SettingsApi;
use crate::config::EngineConfig;
use crate::error::LifecycleError;
use crate::resource::{bounded, conclude, failed, summary};
use crate::state::{CallOptions, Operation, Outcome};
use crate::tenant::tenant_settings_schema;

/// Data source over the tenant settings object
#[derive(Debug)]
pub struct SettingsDataSource<A> {
    api: A,
    schema: Schema,
    config: EngineConfig,
}

impl<A: SettingsApi> SettingsDataSource<A> {
    #[must_use]
    pub fn new(api: A, config: EngineConfig) -> Self {
        Self {
            api,
            schema: tenant_settings_schema().clone(),
            config,
        }
    }

    #[must_use]
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Every declared field currently set remotely
    pub async fn read_all(&self, options: CallOptions) -> Outcome<SettingsTree> {
        let result = self.fetch(options).await.map_err(failed(summary::READ));
        conclude(Operation::Read, result, Vec::new())
    }

    async fn fetch(&self, options: CallOptions) -> Result<SettingsTree, LifecycleError> {
        let json = bounded(&self.config, Operation::Read, options, self.api.fetch_settings()).await?;
        tracing::debug!("Fetched tenant settings for data source");
        Ok(wire::decode(&self.schema, &json)?)
    }
}
