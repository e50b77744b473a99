//! Testing utilities for the TSR workspace
//!
//! In-memory fakes for the settings API and the baseline slot, plus tenant
//! settings fixtures.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Map, Value as Json};
use tsr_lifecycle::{
    tenant_settings_schema, ApiError, BaselineSlot, EngineConfig, SettingsApi, SettingsResource,
    SnapshotError, TenantInfo,
};
use tsr_tree::{wire, FieldPath, Identifier, SettingsTree};

pub const TENANT_ID: &str = "6c7a4b1e-2f0d-4a8e-9b3c-5d1e7f2a9c40";
pub const SECURITY_GROUP_ID: &str = "3f2c9d8e-1b4a-4c6d-8e7f-0a1b2c3d4e5f";
pub const ENVIRONMENT_GROUP_ID: &str = "9a8b7c6d-5e4f-4a3b-8c2d-1e0f9a8b7c6d";

#[derive(Debug, Default)]
struct ServiceState {
    settings: Map<String, Json>,
    sent: Vec<Json>,
    fetches: usize,
    fail_fetch: Option<ApiError>,
    fail_send: Option<ApiError>,
    fail_tenant: Option<ApiError>,
    delay: Option<Duration>,
}

/// In-memory tenant settings service
///
/// Applies partial updates by deep merge and answers with the full object,
/// storing the zero identifier as null the way the real service does.
/// Clones share state, so a test can keep a handle while a resource owns
/// another.
#[derive(Debug, Clone)]
pub struct FakeSettingsService {
    inner: Arc<Mutex<ServiceState>>,
    tenant: TenantInfo,
}

impl FakeSettingsService {
    pub fn new(settings: Json) -> Self {
        let settings = match settings {
            Json::Object(map) => map,
            other => panic!("fake settings must be an object, got {other}"),
        };
        Self {
            inner: Arc::new(Mutex::new(ServiceState {
                settings,
                ..ServiceState::default()
            })),
            tenant: tenant_info(),
        }
    }

    pub fn with_tenant(mut self, tenant: TenantInfo) -> Self {
        self.tenant = tenant;
        self
    }

    /// Current full object
    pub fn settings(&self) -> Json {
        Json::Object(self.inner.lock().settings.clone())
    }

    /// Current full object decoded with the tenant schema
    pub fn settings_tree(&self) -> SettingsTree {
        wire::decode(tenant_settings_schema(), &self.settings()).unwrap()
    }

    /// Payloads received by `send_settings`, oldest first
    pub fn sent(&self) -> Vec<Json> {
        self.inner.lock().sent.clone()
    }

    pub fn send_count(&self) -> usize {
        self.inner.lock().sent.len()
    }

    pub fn fetch_count(&self) -> usize {
        self.inner.lock().fetches
    }

    /// Change the remote behind the engine's back
    pub fn edit(&self, f: impl FnOnce(&mut Map<String, Json>)) {
        f(&mut self.inner.lock().settings);
    }

    pub fn fail_fetch(&self, error: ApiError) {
        self.inner.lock().fail_fetch = Some(error);
    }

    pub fn fail_send(&self, error: ApiError) {
        self.inner.lock().fail_send = Some(error);
    }

    pub fn fail_tenant(&self, error: ApiError) {
        self.inner.lock().fail_tenant = Some(error);
    }

    pub fn clear_failures(&self) {
        let mut state = self.inner.lock();
        state.fail_fetch = None;
        state.fail_send = None;
        state.fail_tenant = None;
    }

    /// Delay every call by `delay`
    pub fn set_delay(&self, delay: Duration) {
        self.inner.lock().delay = Some(delay);
    }

    async fn pause(&self) {
        let delay = self.inner.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn apply_patch(target: &mut Map<String, Json>, patch: &Map<String, Json>, zero: &str) {
    for (key, value) in patch {
        if let Json::Object(inner) = value {
            let slot = target
                .entry(key.clone())
                .or_insert_with(|| Json::Object(Map::new()));
            if !slot.is_object() {
                *slot = Json::Object(Map::new());
            }
            if let Json::Object(existing) = slot {
                apply_patch(existing, inner, zero);
            }
        } else if value.as_str() == Some(zero) {
            target.insert(key.clone(), Json::Null);
        } else {
            target.insert(key.clone(), value.clone());
        }
    }
}

#[async_trait]
impl SettingsApi for FakeSettingsService {
    async fn fetch_settings(&self) -> Result<Json, ApiError> {
        self.pause().await;
        let mut state = self.inner.lock();
        state.fetches += 1;
        if let Some(error) = &state.fail_fetch {
            return Err(error.clone());
        }
        Ok(Json::Object(state.settings.clone()))
    }

    async fn send_settings(&self, settings: Json) -> Result<Json, ApiError> {
        self.pause().await;
        let mut state = self.inner.lock();
        if let Some(error) = &state.fail_send {
            return Err(error.clone());
        }
        let Json::Object(patch) = &settings else {
            return Err(ApiError::Rejected {
                status: 400,
                message: "settings payload must be an object".to_string(),
            });
        };
        let zero = Identifier::ZERO.to_string();
        apply_patch(&mut state.settings, patch, &zero);
        state.sent.push(settings.clone());
        Ok(Json::Object(state.settings.clone()))
    }

    async fn fetch_tenant(&self) -> Result<TenantInfo, ApiError> {
        self.pause().await;
        if let Some(error) = &self.inner.lock().fail_tenant {
            return Err(error.clone());
        }
        Ok(self.tenant.clone())
    }
}

#[derive(Debug, Default)]
struct SlotState {
    bytes: Option<Vec<u8>>,
    puts: usize,
    failing: bool,
}

/// In-memory baseline slot
#[derive(Debug, Clone, Default)]
pub struct MemoryBaselineSlot {
    inner: Arc<Mutex<SlotState>>,
}

impl MemoryBaselineSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot whose writes always fail
    pub fn failing() -> Self {
        let slot = Self::default();
        slot.inner.lock().failing = true;
        slot
    }

    pub fn stored(&self) -> Option<Vec<u8>> {
        self.inner.lock().bytes.clone()
    }

    pub fn put_count(&self) -> usize {
        self.inner.lock().puts
    }

    /// Overwrite the stored bytes directly
    pub fn replace(&self, bytes: Vec<u8>) {
        self.inner.lock().bytes = Some(bytes);
    }
}

#[async_trait]
impl BaselineSlot for MemoryBaselineSlot {
    async fn put_baseline(&self, bytes: Vec<u8>) -> Result<(), SnapshotError> {
        let mut state = self.inner.lock();
        if state.failing {
            return Err(SnapshotError::Storage("slot is read-only".to_string()));
        }
        state.puts += 1;
        state.bytes = Some(bytes);
        Ok(())
    }

    async fn get_baseline(&self) -> Result<Option<Vec<u8>>, SnapshotError> {
        Ok(self.inner.lock().bytes.clone())
    }
}

pub fn tenant_info() -> TenantInfo {
    TenantInfo {
        tenant_id: TENANT_ID.to_string(),
        state: "Enabled".to_string(),
        location: "unitedstates".to_string(),
        aad_country_geo: "unitedstates".to_string(),
        data_storage_geo: "unitedstates".to_string(),
        aad_data_boundary: "none".to_string(),
        fed_ramp_high_certification_required: false,
    }
}

/// Tree from configuration-named JSON
pub fn settings(json: Json) -> SettingsTree {
    SettingsTree::from_json(&json).unwrap()
}

pub fn path(dotted: &str) -> FieldPath {
    dotted.parse().unwrap()
}

/// Every declared tenant setting, as a tenant might have it before management
pub fn baseline_settings() -> SettingsTree {
    settings(json!({
        "walk_me_opt_out": false,
        "disable_newsletter_sendout": false,
        "disable_environment_creation_by_non_admin_users": false,
        "disable_portals_creation_by_non_admin_users": false,
        "disable_trial_environment_creation_by_non_admin_users": false,
        "disable_capacity_allocation_by_environment_admins": false,
        "disable_support_tickets_visible_by_all_users": false,
        "power_platform": {
            "search": {
                "disable_docs_search": false,
                "disable_community_search": false,
                "disable_bing_video_search": false
            },
            "teams_integration": {
                "share_with_colleagues_user_limit": 10000
            },
            "power_apps": {
                "disable_copilot": false,
                "disable_share_with_everyone": false,
                "enable_guests_to_make": false,
                "disable_maker_match": false,
                "disable_unused_license_assignment": false,
                "disable_create_from_image": false,
                "disable_create_from_figma": false,
                "disable_connection_sharing_with_everyone": false,
                "enable_canvas_app_insights": false
            },
            "power_automate": {
                "disable_copilot": false,
                "disable_copilot_with_bing": false,
                "allow_use_of_hosted_browser": true,
                "disable_flow_resubmission": false
            },
            "environments": {
                "disable_preferred_data_location_for_teams_environment": false
            },
            "governance": {
                "additional_admin_digest_email_recipients": null,
                "disable_admin_digest": false,
                "disable_developer_environment_creation_by_non_admin_users": false,
                "enable_default_environment_routing": true,
                "environment_routing_all_makers": false,
                "environment_routing_target_environment_group_id": null,
                "environment_routing_target_security_group_id": SECURITY_GROUP_ID,
                "policy": {
                    "enable_desktop_flow_data_policy_management": false
                }
            },
            "licensing": {
                "disable_billing_policy_creation_by_non_admin_users": false,
                "enable_tenant_capacity_report_for_environment_admins": false,
                "storage_capacity_consumption_warning_threshold": 85,
                "enable_tenant_licensing_report_for_environment_admins": false,
                "disable_use_of_unassigned_ai_builder_credits": false,
                "apply_auto_claim_to_only_managed_environments": false,
                "apply_power_automate_auto_claim_to_only_managed_environments": false
            },
            "champions": {
                "disable_champions_invitation_reachout": false,
                "disable_skills_match_invitation_reachout": false
            },
            "intelligence": {
                "disable_copilot": false,
                "enable_open_ai_bot_publishing": false,
                "basic_copilot_feedback": false,
                "additional_copilot_feedback": false
            },
            "model_experimentation": {
                "enable_model_data_sharing": false,
                "disable_data_logging": false
            },
            "catalog_settings": {
                "power_catalog_audience_setting": "All"
            },
            "user_management_settings": {
                "enable_delete_disabled_user_in_all_environments": false
            },
            "product_feedback": {
                "disable_user_survey_feedback": false,
                "disable_microsoft_follow_up": false,
                "disable_attachments": false,
                "disable_microsoft_surveys_send": false
            }
        }
    }))
}

/// [`baseline_settings`] in wire form, plus fields the schema does not declare
pub fn full_remote_settings() -> Json {
    let mut remote = wire::encode(tenant_settings_schema(), &baseline_settings()).unwrap();
    remote["disableCopilotStudioAuthorsSecurityGroupId"] = json!(false);
    remote["powerPlatform"]["powerPages"] = json!({});
    remote
}

pub fn fake_service() -> FakeSettingsService {
    FakeSettingsService::new(full_remote_settings())
}

pub fn tenant_resource(
    api: &FakeSettingsService,
    slot: &MemoryBaselineSlot,
) -> SettingsResource<FakeSettingsService, MemoryBaselineSlot> {
    SettingsResource::new(api.clone(), slot.clone(), EngineConfig::default())
}
