//! API client contract consumed by the lifecycle
//!
//! Transport, authentication, retry and pagination live behind
//! [`SettingsApi`]. Implementations exchange the remote's camelCase JSON;
//! the lifecycle does its own schema decoding.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::error::ApiError;

/// Remote routes of the tenant settings service
pub mod endpoints {
    /// `GET`: tenant identity and geography
    pub const TENANT: &str = "/providers/Microsoft.BusinessAppPlatform/tenant";
    /// `POST`: full tenant settings object
    pub const LIST_TENANT_SETTINGS: &str = "/providers/Microsoft.BusinessAppPlatform/listTenantSettings";
    /// `POST`: partial update, responds with the full object
    pub const UPDATE_TENANT_SETTINGS: &str =
        "/providers/Microsoft.BusinessAppPlatform/scopes/admin/updateTenantSettings";

    pub const API_VERSION_PARAM: &str = "api-version";
    pub const TENANT_API_VERSION: &str = "2020-08-01";
    pub const SETTINGS_API_VERSION: &str = "2023-06-01";
}

/// Tenant identity returned by [`endpoints::TENANT`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TenantInfo {
    pub tenant_id: String,
    pub state: String,
    pub location: String,
    pub aad_country_geo: String,
    pub data_storage_geo: String,
    pub aad_data_boundary: String,
    #[serde(rename = "fedRAMPHighCertificationRequired")]
    pub fed_ramp_high_certification_required: bool,
}

/// Access to the tenant-wide settings object
///
/// Both settings calls return the remote's full object. Not-found must be
/// reported as [`ApiError::NotFound`], distinct from other failures.
#[async_trait]
pub trait SettingsApi: Send + Sync {
    /// Current full settings object
    async fn fetch_settings(&self) -> Result<Json, ApiError>;

    /// Apply a partial settings object and return the resulting full object
    async fn send_settings(&self, settings: Json) -> Result<Json, ApiError>;

    /// Tenant identity
    async fn fetch_tenant(&self) -> Result<TenantInfo, ApiError>;
}

#[async_trait]
impl<T: SettingsApi + ?Sized> SettingsApi for Arc<T> {
    async fn fetch_settings(&self) -> Result<Json, ApiError> {
        (**self).fetch_settings().await
    }

    async fn send_settings(&self, settings: Json) -> Result<Json, ApiError> {
        (**self).send_settings(settings).await
    }

    async fn fetch_tenant(&self) -> Result<TenantInfo, ApiError> {
        (**self).fetch_tenant().await
    }
}
