//! Mask, merge and normalize in one pass
//!
//! [`Reconciler`] bundles a resource's schema, sentinel rules and mismatch
//! policy so the lifecycle layer can turn (desired, remote) into the state
//! it reports.

use tsr_tree::{FieldPath, Schema, SettingsTree};

use crate::mask::ConfiguredMask;
use crate::merge::{MergeError, Merged, Merger, MismatchPolicy, ShapeMismatch};
use crate::normalize::{Normalizer, SentinelRule};
use crate::transition::substitute_cleared_identifiers;

/// Result of a reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciled {
    /// The tree to report as state
    pub tree: SettingsTree,
    /// Mismatches skipped during the merge
    pub mismatches: Vec<ShapeMismatch>,
    /// Fields whose sentinel was restored
    pub restored_sentinels: Vec<FieldPath>,
}

/// Schema-bound reconciliation engine
#[derive(Debug, Clone)]
pub struct Reconciler {
    schema: Schema,
    normalizer: Normalizer,
    policy: MismatchPolicy,
}

impl Reconciler {
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            normalizer: Normalizer::new(),
            policy: MismatchPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_rule(mut self, rule: SentinelRule) -> Self {
        self.normalizer = self.normalizer.with_rule(rule);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_policy(mut self, policy: MismatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[inline]
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    #[inline]
    #[must_use]
    pub fn policy(&self) -> MismatchPolicy {
        self.policy
    }

    #[inline]
    #[must_use]
    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Mask of a desired configuration
    #[inline]
    #[must_use]
    pub fn mask(&self, configured: &SettingsTree) -> ConfiguredMask {
        ConfiguredMask::extract(configured)
    }

    /// Reconcile `remote` against `configured`
    ///
    /// # Errors
    /// Returns [`MergeError`] when the policy is [`MismatchPolicy::Fail`] and
    /// a shape mismatch is found.
    pub fn reconcile(
        &self,
        configured: &SettingsTree,
        remote: &SettingsTree,
    ) -> Result<Reconciled, MergeError> {
        self.reconcile_with(configured, configured, remote)
    }

    /// Reconcile with separate mask and sentinel sources
    ///
    /// The mask (and configured shape) come from `scope`; sentinels are
    /// restored where `sentinels` holds them. Update uses this to report the
    /// plan's scope while honouring sentinels that were substituted into the
    /// payload.
    ///
    /// # Errors
    /// See [`Reconciler::reconcile`].
    pub fn reconcile_with(
        &self,
        scope: &SettingsTree,
        sentinels: &SettingsTree,
        remote: &SettingsTree,
    ) -> Result<Reconciled, MergeError> {
        let mask = self.mask(scope);
        tracing::debug!("Reconciling {} in-scope fields", mask.leaf_count());

        let Merged { mut tree, mismatches } = Merger::new(&self.schema)
            .with_policy(self.policy)
            .merge(scope, &mask, remote)?;
        let restored_sentinels = self.normalizer.normalize(sentinels, &mut tree);

        Ok(Reconciled {
            tree,
            mismatches,
            restored_sentinels,
        })
    }

    /// Outgoing payload for an update from `prior` to `planned`
    #[must_use]
    pub fn preprocess(&self, prior: &SettingsTree, planned: &SettingsTree) -> (SettingsTree, Vec<FieldPath>) {
        substitute_cleared_identifiers(&self.schema, prior, planned)
    }

    /// Outgoing payload putting the fields `prior` manages back to `baseline`
    ///
    /// Baseline nulls are sent as null; identifiers the baseline lacks are
    /// cleared with the zero sentinel.
    #[must_use]
    pub fn restore_payload(
        &self,
        prior: &SettingsTree,
        baseline: &SettingsTree,
    ) -> (SettingsTree, Vec<FieldPath>) {
        let restored = self.mask(prior).restrict(baseline);
        substitute_cleared_identifiers(&self.schema, prior, &restored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tsr_tree::{Field, Identifier};

    const GROUP: &str = "governance.security_group_id";

    fn reconciler() -> Reconciler {
        Reconciler::new(
            Schema::new().bool("walk_me_opt_out").object(
                "governance",
                Schema::new()
                    .identifier("security_group_id")
                    .bool("disable_admin_digest"),
            ),
        )
        .with_rule(SentinelRule::zero_identifier(GROUP.parse().unwrap()))
    }

    #[test]
    fn reconcile_scopes_and_normalizes() {
        let configured = SettingsTree::new().with(
            "governance",
            SettingsTree::new().with("security_group_id", Identifier::ZERO),
        );
        let remote = SettingsTree::new().with("walk_me_opt_out", true).with(
            "governance",
            SettingsTree::new()
                .with("security_group_id", Field::Null)
                .with("disable_admin_digest", false),
        );
        let out = reconciler().reconcile(&configured, &remote).unwrap();
        assert_eq!(out.tree, configured);
        assert_eq!(out.restored_sentinels, vec![GROUP.parse::<FieldPath>().unwrap()]);
    }

    #[test]
    fn update_flow_reports_substituted_sentinel() {
        let engine = reconciler();
        let prior = SettingsTree::new().with(
            "governance",
            SettingsTree::new().with("security_group_id", Identifier::generate()),
        );
        let planned = SettingsTree::new().with(
            "governance",
            SettingsTree::new().with("disable_admin_digest", true),
        );
        let (payload, cleared) = engine.preprocess(&prior, &planned);
        assert_eq!(cleared.len(), 1);

        let remote = SettingsTree::new().with(
            "governance",
            SettingsTree::new()
                .with("security_group_id", Field::Null)
                .with("disable_admin_digest", true),
        );
        let out = engine.reconcile_with(&planned, &payload, &remote).unwrap();
        assert_eq!(
            out.tree,
            SettingsTree::new().with(
                "governance",
                SettingsTree::new()
                    .with("disable_admin_digest", true)
                    .with("security_group_id", Identifier::ZERO)
            )
        );
    }

    #[test]
    fn restore_sends_baseline_nulls() {
        let engine = reconciler();
        let prior = SettingsTree::new().with(
            "governance",
            SettingsTree::new()
                .with("security_group_id", Identifier::generate())
                .with("disable_admin_digest", true),
        );
        let baseline = SettingsTree::new().with("walk_me_opt_out", false).with(
            "governance",
            SettingsTree::new().with("disable_admin_digest", Field::Null),
        );
        let (payload, cleared) = engine.restore_payload(&prior, &baseline);
        assert_eq!(
            payload,
            SettingsTree::new().with(
                "governance",
                SettingsTree::new()
                    .with("disable_admin_digest", Field::Null)
                    .with("security_group_id", Identifier::ZERO)
            )
        );
        assert_eq!(cleared, vec![GROUP.parse::<FieldPath>().unwrap()]);
    }

    #[test]
    fn policy_is_configurable() {
        let engine = reconciler().with_policy(MismatchPolicy::Fail);
        let configured = SettingsTree::new().with("walk_me_opt_out", true);
        let remote = SettingsTree::new().with("walk_me_opt_out", 1_i64);
        assert!(engine.reconcile(&configured, &remote).is_err());
        assert_eq!(engine.policy(), MismatchPolicy::Fail);
    }
}
