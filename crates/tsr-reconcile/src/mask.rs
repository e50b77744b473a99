//! Field mask extraction
//!
//! A [`ConfiguredMask`] records which fields of a desired configuration are
//! in scope. A leaf is in scope when it and every ancestor section are
//! present (a null leaf counts). A section that is present but names no
//! leaves is still in scope, as an empty section.

use indexmap::IndexMap;
use tsr_tree::{Field, FieldPath, SettingsTree, Value};

/// Scope of one masked field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Scalar, list or null: adopt the remote value wholesale
    Leaf,
    /// Mentioned section with its own mask
    Section(ConfiguredMask),
}

/// Parallel tree of in-scope fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfiguredMask {
    fields: IndexMap<String, Scope>,
}

impl ConfiguredMask {
    /// Mask with nothing in scope
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Derive the mask of a desired configuration
    ///
    /// Absent and unknown fields are out of scope.
    #[must_use]
    pub fn extract(configured: &SettingsTree) -> Self {
        let fields = configured
            .fields()
            .filter_map(|(name, field)| {
                let scope = match field {
                    Field::Known(Value::Object(section)) => Scope::Section(Self::extract(section)),
                    Field::Null | Field::Known(_) => Scope::Leaf,
                    Field::Absent | Field::Unknown => return None,
                };
                Some((name.to_string(), scope))
            })
            .collect();
        Self { fields }
    }

    #[inline]
    #[must_use]
    pub fn scope(&self, name: &str) -> Option<&Scope> {
        self.fields.get(name)
    }

    /// Nested mask of a mentioned section
    #[inline]
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&ConfiguredMask> {
        match self.fields.get(name) {
            Some(Scope::Section(mask)) => Some(mask),
            _ => None,
        }
    }

    /// Number of top-level entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether a path names an in-scope leaf or section
    #[must_use]
    pub fn contains(&self, path: &FieldPath) -> bool {
        let Some((leaf, parents)) = path.segments().split_last() else {
            return true;
        };
        let mut mask = self;
        for segment in parents {
            match mask.section(segment) {
                Some(next) => mask = next,
                None => return false,
            }
        }
        mask.fields.contains_key(leaf)
    }

    /// In-scope leaves plus mentioned sections that hold no leaves
    #[must_use]
    pub fn paths(&self) -> Vec<FieldPath> {
        let mut out = Vec::new();
        self.collect(&FieldPath::root(), &mut out);
        out
    }

    fn collect(&self, prefix: &FieldPath, out: &mut Vec<FieldPath>) {
        for (name, scope) in &self.fields {
            let path = prefix.child(name.clone());
            match scope {
                Scope::Section(mask) if !mask.is_empty() => mask.collect(&path, out),
                _ => out.push(path),
            }
        }
    }

    /// Copy of `tree` holding only in-scope fields
    ///
    /// Unlike a merge, null leaves are kept as null, so the result can be
    /// sent to put a field back to "unset". Fields `tree` lacks stay absent,
    /// and a section is only entered where `tree` holds it as an object.
    #[must_use]
    pub fn restrict(&self, tree: &SettingsTree) -> SettingsTree {
        let mut out = SettingsTree::new();
        for (name, scope) in &self.fields {
            let field = tree.get(name);
            match (scope, field) {
                (Scope::Leaf, Field::Null | Field::Known(_)) => out.set(name.clone(), field.clone()),
                (Scope::Section(mask), Field::Known(Value::Object(section))) => {
                    out.set(name.clone(), mask.restrict(section));
                }
                _ => {}
            }
        }
        out
    }

    /// Count of in-scope leaves, recursively
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.fields
            .values()
            .map(|scope| match scope {
                Scope::Leaf => 1,
                Scope::Section(mask) => mask.leaf_count(),
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> FieldPath {
        s.parse().unwrap()
    }

    fn configured() -> SettingsTree {
        SettingsTree::new()
            .with("walk_me_opt_out", Field::Null)
            .with("disable_survey_feedback", Field::Unknown)
            .with(
                "power_platform",
                SettingsTree::new()
                    .with("search", SettingsTree::new().with("disable_docs_search", true))
                    .with("power_pages", SettingsTree::new())
                    .with("governance", Field::Null),
            )
    }

    #[test]
    fn null_leaf_is_in_scope() {
        let mask = ConfiguredMask::extract(&configured());
        assert_eq!(mask.scope("walk_me_opt_out"), Some(&Scope::Leaf));
    }

    #[test]
    fn unknown_and_absent_are_out_of_scope() {
        let mask = ConfiguredMask::extract(&configured());
        assert!(mask.scope("disable_survey_feedback").is_none());
        assert!(mask.scope("disable_newsletter_sendout").is_none());
    }

    #[test]
    fn empty_section_stays_in_scope() {
        let mask = ConfiguredMask::extract(&configured());
        assert!(mask.contains(&path("power_platform.power_pages")));
        assert_eq!(
            mask.section("power_platform").and_then(|m| m.section("power_pages")),
            Some(&ConfiguredMask::empty())
        );
    }

    #[test]
    fn contains_walks_sections() {
        let mask = ConfiguredMask::extract(&configured());
        assert!(mask.contains(&path("power_platform.search.disable_docs_search")));
        assert!(!mask.contains(&path("power_platform.search.disable_community_search")));
        assert!(!mask.contains(&path("walk_me_opt_out.child")));
        assert!(mask.contains(&FieldPath::root()));
    }

    #[test]
    fn paths_and_counts() {
        let mask = ConfiguredMask::extract(&configured());
        let paths: Vec<String> = mask.paths().iter().map(ToString::to_string).collect();
        assert_eq!(
            paths,
            vec![
                "walk_me_opt_out",
                "power_platform.search.disable_docs_search",
                "power_platform.power_pages",
                "power_platform.governance",
            ]
        );
        assert_eq!(mask.leaf_count(), 3);
    }

    #[test]
    fn restrict_keeps_nulls_in_scope() {
        let mask = ConfiguredMask::extract(&configured());
        let baseline = SettingsTree::new()
            .with("walk_me_opt_out", Field::Null)
            .with("disable_newsletter_sendout", true)
            .with(
                "power_platform",
                SettingsTree::new()
                    .with(
                        "search",
                        SettingsTree::new()
                            .with("disable_docs_search", Field::Null)
                            .with("disable_community_search", false),
                    )
                    .with("governance", SettingsTree::new().with("disable_admin_digest", false)),
            );
        assert_eq!(
            mask.restrict(&baseline),
            SettingsTree::new().with("walk_me_opt_out", Field::Null).with(
                "power_platform",
                SettingsTree::new()
                    .with("search", SettingsTree::new().with("disable_docs_search", Field::Null))
                    .with("governance", SettingsTree::new().with("disable_admin_digest", false)),
            )
        );
    }

    #[test]
    fn restrict_skips_what_the_tree_lacks() {
        let mask = ConfiguredMask::extract(&configured());
        let baseline = SettingsTree::new()
            .with("walk_me_opt_out", Field::Unknown)
            .with("power_platform", Field::Null);
        assert!(mask.restrict(&baseline).is_empty());
    }

    #[test]
    fn empty_tree_gives_empty_mask() {
        assert!(ConfiguredMask::extract(&SettingsTree::new()).is_empty());
    }
}
