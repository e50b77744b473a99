//! Sentinel normalization
//!
//! Some fields use a reserved value (the all-zero identifier) to mean "no
//! restriction", and the remote echoes that value back as null, exactly as
//! it reports an unset field. When the caller explicitly configured the
//! sentinel and the merge came back absent or null, the normalizer restores
//! the sentinel so the orchestrator does not see the field drift.

use tsr_tree::{Field, FieldPath, Identifier, SettingsTree, Value};

/// One field whose sentinel the remote reports as null
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentinelRule {
    path: FieldPath,
    sentinel: Value,
}

impl SentinelRule {
    #[must_use]
    pub fn new(path: FieldPath, sentinel: impl Into<Value>) -> Self {
        Self {
            path,
            sentinel: sentinel.into(),
        }
    }

    /// Rule for an identifier field using [`Identifier::ZERO`]
    #[must_use]
    pub fn zero_identifier(path: FieldPath) -> Self {
        Self::new(path, Identifier::ZERO)
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    #[inline]
    #[must_use]
    pub fn sentinel(&self) -> &Value {
        &self.sentinel
    }
}

/// Applies [`SentinelRule`]s to merge output
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    rules: Vec<SentinelRule>,
}

impl Normalizer {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_rule(mut self, rule: SentinelRule) -> Self {
        self.rules.push(rule);
        self
    }

    #[inline]
    #[must_use]
    pub fn rules(&self) -> &[SentinelRule] {
        &self.rules
    }

    /// Restore configured sentinels the remote echoed as null
    ///
    /// A rule fires only when `configured` holds the sentinel at its path,
    /// the merged value there is absent or null, and the parent section
    /// exists in `merged`. Returns the paths that were rewritten.
    pub fn normalize(&self, configured: &SettingsTree, merged: &mut SettingsTree) -> Vec<FieldPath> {
        let mut restored = Vec::new();
        for rule in &self.rules {
            let Field::Known(value) = configured.get_path(&rule.path) else {
                continue;
            };
            if value != &rule.sentinel {
                continue;
            }
            let current = merged.get_path(&rule.path);
            if !(current.is_absent() || current.is_null()) {
                continue;
            }
            if !parent_present(merged, &rule.path) {
                continue;
            }
            match merged.set_path(&rule.path, rule.sentinel.clone()) {
                Ok(()) => restored.push(rule.path.clone()),
                Err(e) => tracing::debug!("Sentinel for {} not restored: {}", rule.path, e),
            }
        }
        restored
    }
}

fn parent_present(tree: &SettingsTree, path: &FieldPath) -> bool {
    match path.parent() {
        Some(parent) if !parent.is_root() => tree.get_path(&parent).object().is_some(),
        _ => true,
    }
}
