//! Selective merge of remote values into the configured shape
//!
//! The [`Merger`] walks a schema, the desired configuration, its mask and
//! the remote tree in lockstep. Per declared field:
//!
//! - out of scope: absent, no recursion
//! - in-scope scalar: the remote value verbatim, or absent when the remote
//!   reports null or nothing
//! - in-scope section: recurse; a null remote section yields an empty one
//! - in-scope list: the remote list verbatim
//!
//! Remote fields the schema does not declare never surface. A node whose
//! configured or remote value disagrees with the declared kind is a
//! [`ShapeMismatch`], handled according to the [`MismatchPolicy`].

use std::fmt::{self, Display, Formatter};

use tsr_tree::{Field, FieldPath, Kind, Schema, SettingsTree};

use crate::mask::{ConfiguredMask, Scope};

/// What to do with a node whose shape disagrees with the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchPolicy {
    /// Abort the merge with [`MergeError::ShapeMismatch`]
    Fail,
    /// Log, record in [`Merged::mismatches`] and leave the field absent
    #[default]
    Skip,
}

/// Which input carried the offending value
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Configured,
    Remote,
}

/// A node where a value does not match its declared kind
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ShapeMismatch {
    pub path: FieldPath,
    pub side: Side,
    pub expected: &'static str,
    pub found: &'static str,
}

impl Display for ShapeMismatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let side = match self.side {
            Side::Configured => "configured",
            Side::Remote => "remote",
        };
        write!(
            f,
            "{side} value at {} is {}, expected {}",
            self.path, self.found, self.expected
        )
    }
}

/// Merge output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Merged {
    pub tree: SettingsTree,
    /// Mismatches skipped under [`MismatchPolicy::Skip`]
    pub mismatches: Vec<ShapeMismatch>,
}

/// Errors that abort a merge
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    #[error("shape mismatch: {0}")]
    ShapeMismatch(ShapeMismatch),
}

/// Stateless schema-driven merger
#[derive(Debug, Clone, Copy)]
pub struct Merger<'a> {
    schema: &'a Schema,
    policy: MismatchPolicy,
}

impl<'a> Merger<'a> {
    #[inline]
    #[must_use]
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            policy: MismatchPolicy::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_policy(mut self, policy: MismatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Merge `remote` into the shape of `configured`, restricted to `mask`
    ///
    /// # Errors
    /// Returns [`MergeError::ShapeMismatch`] under [`MismatchPolicy::Fail`].
    pub fn merge(
        &self,
        configured: &SettingsTree,
        mask: &ConfiguredMask,
        remote: &SettingsTree,
    ) -> Result<Merged, MergeError> {
        let mut mismatches = Vec::new();
        let tree = self.merge_section(
            self.schema,
            configured,
            mask,
            remote,
            &FieldPath::root(),
            &mut mismatches,
        )?;
        Ok(Merged { tree, mismatches })
    }

    fn merge_section(
        &self,
        schema: &Schema,
        configured: &SettingsTree,
        mask: &ConfiguredMask,
        remote: &SettingsTree,
        path: &FieldPath,
        mismatches: &mut Vec<ShapeMismatch>,
    ) -> Result<SettingsTree, MergeError> {
        let mut out = SettingsTree::new();
        for spec in schema.iter() {
            let Some(scope) = mask.scope(spec.name()) else {
                continue;
            };
            let here = path.child(spec.name());
            let ours = configured.get(spec.name());
            let theirs = remote.get(spec.name());

            if let Some(found) = mismatched(spec.kind(), ours) {
                self.report(here, Side::Configured, spec.kind(), found, mismatches)?;
                continue;
            }
            if let Some(found) = mismatched(spec.kind(), theirs) {
                self.report(here, Side::Remote, spec.kind(), found, mismatches)?;
                continue;
            }

            match spec.kind() {
                Kind::Object(inner) => {
                    let none = ConfiguredMask::empty();
                    let blank = SettingsTree::new();
                    let inner_mask = match scope {
                        Scope::Section(section) => section,
                        Scope::Leaf => &none,
                    };
                    let section = self.merge_section(
                        inner,
                        ours.object().unwrap_or(&blank),
                        inner_mask,
                        theirs.object().unwrap_or(&blank),
                        &here,
                        mismatches,
                    )?;
                    out.set(spec.name(), section);
                }
                _ => {
                    if let Field::Known(value) = theirs {
                        out.set(spec.name(), value.clone());
                    }
                }
            }
        }
        Ok(out)
    }

    fn report(
        &self,
        path: FieldPath,
        side: Side,
        expected: &Kind,
        found: &'static str,
        mismatches: &mut Vec<ShapeMismatch>,
    ) -> Result<(), MergeError> {
        let mismatch = ShapeMismatch {
            path,
            side,
            expected: expected.name(),
            found,
        };
        match self.policy {
            MismatchPolicy::Fail => Err(MergeError::ShapeMismatch(mismatch)),
            MismatchPolicy::Skip => {
                tracing::warn!("Skipping field with mismatched shape: {}", mismatch);
                mismatches.push(mismatch);
                Ok(())
            }
        }
    }
}

fn mismatched(kind: &Kind, field: &Field) -> Option<&'static str> {
    match field {
        Field::Known(value) if !kind.admits(value) => Some(value.kind_name()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn schema() -> Schema {
        Schema::new()
            .bool("walk_me_opt_out")
            .int("limit")
            .list("rules")
            .object(
                "search",
                Schema::new()
                    .bool("disable_docs_search")
                    .bool("disable_community_search"),
            )
            .object("pages", Schema::new())
    }

    fn remote() -> SettingsTree {
        SettingsTree::new()
            .with("walk_me_opt_out", false)
            .with("limit", 10_i64)
            .with("rules", vec![SettingsTree::new().with("name", "r1")])
            .with(
                "search",
                SettingsTree::new()
                    .with("disable_docs_search", false)
                    .with("disable_community_search", true),
            )
            .with("pages", SettingsTree::new())
            .with("undeclared", true)
    }

    fn merge(configured: &SettingsTree, remote: &SettingsTree) -> Merged {
        let schema = schema();
        Merger::new(&schema)
            .merge(configured, &ConfiguredMask::extract(configured), remote)
            .unwrap()
    }

    #[test]
    fn adopts_remote_values_for_in_scope_leaves() {
        let configured = SettingsTree::new()
            .with("walk_me_opt_out", true)
            .with("search", SettingsTree::new().with("disable_docs_search", true));
        let merged = merge(&configured, &remote());
        assert_eq!(
            merged.tree,
            SettingsTree::new()
                .with("walk_me_opt_out", false)
                .with("search", SettingsTree::new().with("disable_docs_search", false))
        );
        assert!(merged.mismatches.is_empty());
    }

    #[test]
    fn remote_null_scalar_becomes_absent() {
        let configured = SettingsTree::new().with("limit", Field::Null);
        let remote = remote().with("limit", Field::Null);
        assert!(merge(&configured, &remote).tree.is_empty());
    }

    #[test]
    fn remote_null_section_yields_empty_section() {
        let configured = SettingsTree::new()
            .with("search", SettingsTree::new().with("disable_docs_search", true));
        let remote = remote().with("search", Field::Null);
        assert_eq!(
            merge(&configured, &remote).tree,
            SettingsTree::new().with("search", SettingsTree::new())
        );
    }

    #[test]
    fn null_configured_section_is_empty_in_scope() {
        let configured = SettingsTree::new().with("search", Field::Null);
        assert_eq!(
            merge(&configured, &remote()).tree,
            SettingsTree::new().with("search", SettingsTree::new())
        );
    }

    #[test]
    fn lists_are_taken_wholesale() {
        let configured = SettingsTree::new().with("rules", Vec::<SettingsTree>::new());
        assert_eq!(
            merge(&configured, &remote()).tree.get("rules"),
            remote().get("rules")
        );
    }

    #[test]
    fn undeclared_fields_never_surface() {
        let configured = SettingsTree::new().with("undeclared", true);
        assert!(merge(&configured, &remote()).tree.is_empty());
    }

    #[test]
    fn empty_mask_yields_empty_tree() {
        let schema = schema();
        let configured = SettingsTree::new().with("walk_me_opt_out", true);
        let merged = Merger::new(&schema)
            .merge(&configured, &ConfiguredMask::empty(), &remote())
            .unwrap();
        assert!(merged.tree.is_empty());
    }

    #[test]
    fn skip_policy_records_mismatch() {
        let configured = SettingsTree::new()
            .with("walk_me_opt_out", true)
            .with("limit", 1_i64);
        let remote = remote().with("walk_me_opt_out", "nope");
        let merged = merge(&configured, &remote);
        assert_eq!(merged.tree, SettingsTree::new().with("limit", 10_i64));
        assert_eq!(
            merged.mismatches,
            vec![ShapeMismatch {
                path: "walk_me_opt_out".parse().unwrap(),
                side: Side::Remote,
                expected: "bool",
                found: "string",
            }]
        );
    }

    #[test]
    fn fail_policy_aborts() {
        let schema = schema();
        let configured = SettingsTree::new().with("search", true);
        let err = Merger::new(&schema)
            .with_policy(MismatchPolicy::Fail)
            .merge(&configured, &ConfiguredMask::extract(&configured), &remote())
            .unwrap_err();
        let MergeError::ShapeMismatch(mismatch) = err;
        assert_eq!(mismatch.side, Side::Configured);
        assert_eq!(mismatch.expected, "object");
        assert_eq!(mismatch.to_string(), "configured value at search is bool, expected object");
    }

    #[test]
    fn policy_deserializes_snake_case() {
        let policy: MismatchPolicy = serde_json::from_str("\"fail\"").unwrap();
        assert_eq!(policy, MismatchPolicy::Fail);
        assert_eq!(MismatchPolicy::default(), MismatchPolicy::Skip);
    }
}
