//! Power Platform tenant settings schema
//!
//! Field names are what users write in configuration; wire names follow the
//! remote's camelCase, with explicit overrides where its casing is irregular.
//! Product feedback is configured under `power_platform` but lives at the
//! root of the remote object.

use once_cell::sync::Lazy;
use tsr_reconcile::{MismatchPolicy, Reconciler, SentinelRule};
use tsr_tree::{FieldPath, FieldSpec, Kind, Schema};

/// Security group that new environments are routed to
pub const ROUTING_SECURITY_GROUP: &str =
    "power_platform.governance.environment_routing_target_security_group_id";
/// Environment group that new environments are routed to
pub const ROUTING_ENVIRONMENT_GROUP: &str =
    "power_platform.governance.environment_routing_target_environment_group_id";

static SCHEMA: Lazy<Schema> = Lazy::new(build_schema);

/// Declared shape of the tenant settings object
#[must_use]
pub fn tenant_settings_schema() -> &'static Schema {
    &SCHEMA
}

/// Zero-identifier sentinels the remote echoes back as null
#[must_use]
pub fn tenant_sentinel_rules() -> Vec<SentinelRule> {
    [ROUTING_SECURITY_GROUP, ROUTING_ENVIRONMENT_GROUP]
        .into_iter()
        .map(|path| SentinelRule::zero_identifier(FieldPath::new(path.split('.').map(str::to_string).collect())))
        .collect()
}

/// Reconciler for tenant settings under the given mismatch policy
#[must_use]
pub fn tenant_reconciler(policy: MismatchPolicy) -> Reconciler {
    tenant_sentinel_rules()
        .into_iter()
        .fold(
            Reconciler::new(tenant_settings_schema().clone()),
            Reconciler::with_rule,
        )
        .with_policy(policy)
}

fn renamed(name: &str, wire: &str, kind: Kind) -> FieldSpec {
    FieldSpec::new(name, kind).with_wire(wire)
}

fn at_root(name: &str, wire: &str) -> FieldSpec {
    FieldSpec::new(name, Kind::Bool).with_wire_path(FieldPath::single(wire))
}

fn build_schema() -> Schema {
    let search = Schema::new()
        .bool("disable_docs_search")
        .bool("disable_community_search")
        .bool("disable_bing_video_search");

    let teams_integration = Schema::new().int("share_with_colleagues_user_limit");

    let power_apps = Schema::new()
        .bool("disable_copilot")
        .bool("disable_share_with_everyone")
        .bool("enable_guests_to_make")
        .bool("disable_maker_match")
        .bool("disable_unused_license_assignment")
        .bool("disable_create_from_image")
        .bool("disable_create_from_figma")
        .bool("disable_connection_sharing_with_everyone")
        .bool("enable_canvas_app_insights");

    let power_automate = Schema::new()
        .bool("disable_copilot")
        .bool("disable_copilot_with_bing")
        .with_field(renamed(
            "allow_use_of_hosted_browser",
            "enableComputerUseSharedMachines",
            Kind::Bool,
        ))
        .with_field(renamed(
            "disable_flow_resubmission",
            "disableFlowRunResubmission",
            Kind::Bool,
        ));

    let environments = Schema::new().bool("disable_preferred_data_location_for_teams_environment");

    let governance = Schema::new()
        .string("additional_admin_digest_email_recipients")
        .bool("disable_admin_digest")
        .bool("disable_developer_environment_creation_by_non_admin_users")
        .bool("enable_default_environment_routing")
        .bool("environment_routing_all_makers")
        .identifier("environment_routing_target_environment_group_id")
        .identifier("environment_routing_target_security_group_id")
        .object(
            "policy",
            Schema::new().bool("enable_desktop_flow_data_policy_management"),
        );

    let licensing = Schema::new()
        .bool("disable_billing_policy_creation_by_non_admin_users")
        .bool("enable_tenant_capacity_report_for_environment_admins")
        .int("storage_capacity_consumption_warning_threshold")
        .bool("enable_tenant_licensing_report_for_environment_admins")
        .with_field(renamed(
            "disable_use_of_unassigned_ai_builder_credits",
            "disableUseOfUnassignedAIBuilderCredits",
            Kind::Bool,
        ))
        .bool("apply_auto_claim_to_only_managed_environments")
        .with_field(renamed(
            "apply_power_automate_auto_claim_to_only_managed_environments",
            "applyPAutoAutoClaimToOnlyManagedEnvironments",
            Kind::Bool,
        ));

    let champions = Schema::new()
        .bool("disable_champions_invitation_reachout")
        .bool("disable_skills_match_invitation_reachout");

    let intelligence = Schema::new()
        .bool("disable_copilot")
        .bool("enable_open_ai_bot_publishing")
        .with_field(renamed(
            "basic_copilot_feedback",
            "disableCopilotFeedback",
            Kind::Bool,
        ))
        .with_field(renamed(
            "additional_copilot_feedback",
            "disableCopilotFeedbackMetadata",
            Kind::Bool,
        ));

    let model_experimentation = Schema::new()
        .bool("enable_model_data_sharing")
        .bool("disable_data_logging");

    let catalog_settings = Schema::new().string("power_catalog_audience_setting");

    let user_management_settings = Schema::new().with_field(renamed(
        "enable_delete_disabled_user_in_all_environments",
        "enableDeleteDisabledUserinAllEnvironments",
        Kind::Bool,
    ));

    let product_feedback = Schema::new()
        .with_field(at_root("disable_user_survey_feedback", "disableSurveyFeedback"))
        .with_field(at_root("disable_microsoft_follow_up", "disableNPSCommentsReachout"))
        .with_field(at_root("disable_attachments", "disableSurveyScreenshots"))
        .with_field(at_root("disable_microsoft_surveys_send", "disableUserInitiatedFeedback"));

    let power_platform = Schema::new()
        .object("search", search)
        .object("teams_integration", teams_integration)
        .object("power_apps", power_apps)
        .object("power_automate", power_automate)
        .object("environments", environments)
        .object("governance", governance)
        .object("licensing", licensing)
        .object("power_pages", Schema::new())
        .object("champions", champions)
        .object("intelligence", intelligence)
        .object("model_experimentation", model_experimentation)
        .object("catalog_settings", catalog_settings)
        .object("user_management_settings", user_management_settings)
        .object("product_feedback", product_feedback);

    Schema::new()
        .bool("walk_me_opt_out")
        .bool("disable_newsletter_sendout")
        .bool("disable_environment_creation_by_non_admin_users")
        .bool("disable_portals_creation_by_non_admin_users")
        .bool("disable_trial_environment_creation_by_non_admin_users")
        .bool("disable_capacity_allocation_by_environment_admins")
        .bool("disable_support_tickets_visible_by_all_users")
        .object("power_platform", power_platform)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_fields_are_identifiers() {
        let schema = tenant_settings_schema();
        for rule in tenant_sentinel_rules() {
            assert_eq!(schema.resolve(rule.path()).unwrap().kind(), &Kind::Identifier);
        }
    }

    #[test]
    fn irregular_wire_names() {
        let schema = tenant_settings_schema();
        let spec = |p: &str| schema.resolve(&p.parse().unwrap()).unwrap().wire().to_string();
        assert_eq!(
            spec("power_platform.product_feedback.disable_microsoft_follow_up"),
            "disableNPSCommentsReachout"
        );
        assert_eq!(
            spec("power_platform.user_management_settings.enable_delete_disabled_user_in_all_environments"),
            "enableDeleteDisabledUserinAllEnvironments"
        );
        assert_eq!(
            spec("power_platform.licensing.disable_use_of_unassigned_ai_builder_credits"),
            "disableUseOfUnassignedAIBuilderCredits"
        );
        assert_eq!(spec("power_platform.search.disable_docs_search"), "disableDocsSearch");
    }

    #[test]
    fn wire_locations_are_unique() {
        let schema = tenant_settings_schema();
        let mut wires: Vec<String> = schema
            .leaf_paths()
            .into_iter()
            .map(|(path, _)| schema.wire_path_of(&path).unwrap().to_string())
            .collect();
        let total = wires.len();
        wires.sort_unstable();
        wires.dedup();
        assert_eq!(wires.len(), total);
    }

    #[test]
    fn product_feedback_lives_at_wire_root() {
        let schema = tenant_settings_schema();
        let wire = |p: &str| schema.wire_path_of(&p.parse().unwrap()).unwrap().to_string();
        assert_eq!(
            wire("power_platform.product_feedback.disable_user_survey_feedback"),
            "disableSurveyFeedback"
        );
        assert_eq!(
            wire("power_platform.product_feedback.disable_attachments"),
            "disableSurveyScreenshots"
        );
        assert_eq!(
            wire("power_platform.product_feedback.disable_microsoft_surveys_send"),
            "disableUserInitiatedFeedback"
        );
        assert_eq!(
            wire("power_platform.governance.environment_routing_all_makers"),
            "powerPlatform.governance.environmentRoutingAllMakers"
        );
        assert!(schema.get("disable_survey_feedback").is_none());
    }

    #[test]
    fn reconciler_carries_rules() {
        let engine = tenant_reconciler(MismatchPolicy::Fail);
        assert_eq!(engine.normalizer().rules().len(), 2);
        assert_eq!(engine.policy(), MismatchPolicy::Fail);
    }
}
