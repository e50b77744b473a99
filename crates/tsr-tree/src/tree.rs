//! The recursive settings tree
//!
//! [`SettingsTree`] is shared by desired configuration, remote responses and
//! reported state. It stores only fields that are not absent, so a missing
//! key and an explicit [`Field::Absent`] are the same thing, while
//! [`Field::Null`] remains distinct.
//!
//! Equality is structural and order-independent: two trees holding the same
//! fields in a different insertion order compare equal and hash equal.

use indexmap::IndexMap;
use serde_json::{Map, Number, Value as Json};

use crate::field::{Field, Value};
use crate::hash::SettingsHash;
use crate::path::FieldPath;

static ABSENT: Field = Field::Absent;

/// A set of named, individually optional fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsTree {
    fields: IndexMap<String, Field>,
}

impl SettingsTree {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of non-absent fields
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

    /// Field state by name; missing names are [`Field::Absent`]
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> &Field {
        self.fields.get(name).unwrap_or(&ABSENT)
    }

    /// Set a field. Setting [`Field::Absent`] removes it.
    pub fn set(&mut self, name: impl Into<String>, field: impl Into<Field>) {
        let name = name.into();
        match field.into() {
            Field::Absent => {
                self.fields.shift_remove(&name);
            }
            field => {
                self.fields.insert(name, field);
            }
        }
    }

    /// Builder form of [`SettingsTree::set`]
    #[inline]
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, field: impl Into<Field>) -> Self {
        self.set(name, field);
        self
    }

    /// Remove a field, returning its previous state
    pub fn remove(&mut self, name: &str) -> Field {
        self.fields.shift_remove(name).unwrap_or_default()
    }

    /// Iterate non-absent fields in insertion order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    /// Mutable access to a nested section
    pub fn section_mut(&mut self, name: &str) -> Option<&mut SettingsTree> {
        match self.fields.get_mut(name) {
            Some(Field::Known(Value::Object(tree))) => Some(tree),
            _ => None,
        }
    }

    /// Field state at a dotted path
    ///
    /// Any ancestor that is not a known object makes the result absent.
    #[must_use]
    pub fn get_path(&self, path: &FieldPath) -> &Field {
        let Some((leaf, parents)) = path.segments().split_last() else {
            return &ABSENT;
        };
        let mut node = self;
        for segment in parents {
            match node.get(segment).object() {
                Some(next) => node = next,
                None => return &ABSENT,
            }
        }
        node.get(leaf)
    }

    /// Set the field at a dotted path, creating intermediate sections
    ///
    /// Absent, null and unknown ancestors are replaced by empty sections.
    ///
    /// # Errors
    /// Returns error for the root path, or when an ancestor holds a
    /// non-object value.
    pub fn set_path(&mut self, path: &FieldPath, field: impl Into<Field>) -> Result<(), TreeError> {
        let Some((leaf, parents)) = path.segments().split_last() else {
            return Err(TreeError::EmptyPath);
        };
        let mut node = self;
        for (depth, segment) in parents.iter().enumerate() {
            let entry = node.fields.entry(segment.clone()).or_insert(Field::Absent);
            if !matches!(entry, Field::Known(_)) {
                *entry = Field::Known(Value::Object(SettingsTree::new()));
            }
            let Field::Known(Value::Object(next)) = entry else {
                return Err(TreeError::ScalarAncestor {
                    path: FieldPath::new(path.segments()[..=depth].to_vec()),
                });
            };
            node = next;
        }
        node.set(leaf.clone(), field);
        Ok(())
    }

    /// Stable hash over the tree's JSON form
    #[inline]
    #[must_use]
    pub fn content_hash(&self) -> SettingsHash {
        SettingsHash::of_json(&self.to_json())
    }

    /// Schema-less JSON form
    ///
    /// Null fields become JSON null; unknown fields are skipped since they
    /// have no JSON representation.
    #[must_use]
    pub fn to_json(&self) -> Json {
        let mut map = Map::new();
        for (name, field) in &self.fields {
            match field {
                Field::Absent | Field::Unknown => {}
                Field::Null => {
                    map.insert(name.clone(), Json::Null);
                }
                Field::Known(value) => {
                    map.insert(name.clone(), value_to_json(value));
                }
            }
        }
        Json::Object(map)
    }

    /// Build a tree from a JSON object without a schema
    ///
    /// # Errors
    /// Returns error if the input is not an object, holds a non-integer
    /// number, or holds a list whose items are not objects.
    pub fn from_json(json: &Json) -> Result<Self, TreeError> {
        tree_from_json(json, &FieldPath::root())
    }
}

pub(crate) fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::Number(Number::from(*i)),
        Value::String(s) => Json::String(s.clone()),
        Value::Object(tree) => tree.to_json(),
        Value::List(items) => Json::Array(items.iter().map(SettingsTree::to_json).collect()),
    }
}

fn tree_from_json(json: &Json, path: &FieldPath) -> Result<SettingsTree, TreeError> {
    let Json::Object(map) = json else {
        return Err(TreeError::ExpectedObject {
            path: path.clone(),
            found: json_kind(json),
        });
    };
    let mut tree = SettingsTree::new();
    for (name, item) in map {
        let field = field_from_json(item, &path.child(name.clone()))?;
        tree.set(name.clone(), field);
    }
    Ok(tree)
}

pub(crate) fn field_from_json(json: &Json, path: &FieldPath) -> Result<Field, TreeError> {
    let value = match json {
        Json::Null => return Ok(Field::Null),
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => Value::Int(n.as_i64().ok_or_else(|| TreeError::UnsupportedNumber {
            path: path.clone(),
        })?),
        Json::String(s) => Value::String(s.clone()),
        Json::Object(_) => Value::Object(tree_from_json(json, path)?),
        Json::Array(items) => Value::List(
            items
                .iter()
                .map(|item| match item {
                    Json::Object(_) => tree_from_json(item, path),
                    _ => Err(TreeError::UnsupportedListItem { path: path.clone() }),
                })
                .collect::<Result<_, _>>()?,
        ),
    };
    Ok(Field::Known(value))
}

pub(crate) fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "list",
        Json::Object(_) => "object",
    }
}

impl serde::Serialize for SettingsTree {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for SettingsTree {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let json = Json::deserialize(deserializer)?;
        Self::from_json(&json).map_err(serde::de::Error::custom)
    }
}

/// Errors raised while building or editing trees
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("expected an object at {path}, found {found}")]
    ExpectedObject { path: FieldPath, found: &'static str },

    /// Floats and out-of-range integers have no settings representation
    #[error("unsupported number at {path} (only 64-bit integers are allowed)")]
    UnsupportedNumber { path: FieldPath },

    #[error("list items at {path} must be objects")]
    UnsupportedListItem { path: FieldPath },

    #[error("cannot set the root of a tree")]
    EmptyPath,

    #[error("ancestor {path} holds a non-object value")]
    ScalarAncestor { path: FieldPath },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn path(s: &str) -> FieldPath {
        s.parse().unwrap()
    }

    #[test]
    fn missing_field_reads_absent() {
        let tree = SettingsTree::new().with("a", true);
        assert!(tree.get("b").is_absent());
        assert_eq!(tree.get("a"), &Field::from(true));
    }

    #[test]
    fn setting_absent_removes() {
        let mut tree = SettingsTree::new().with("a", true).with("b", Field::Null);
        tree.set("a", Field::Absent);
        assert_eq!(tree.len(), 1);
        assert!(tree.get("b").is_null());
    }

    #[test]
    fn equality_ignores_order() {
        let one = SettingsTree::new().with("a", true).with("b", 2_i64);
        let two = SettingsTree::new().with("b", 2_i64).with("a", true);
        assert_eq!(one, two);
        assert_eq!(one.content_hash(), two.content_hash());
    }

    #[test]
    fn null_and_absent_differ() {
        let null = SettingsTree::new().with("a", Field::Null);
        let absent = SettingsTree::new();
        assert_ne!(null, absent);
        assert_ne!(null.content_hash(), absent.content_hash());
    }

    #[test]
    fn set_path_creates_sections() {
        let mut tree = SettingsTree::new();
        tree.set_path(&path("power_platform.search.disable_docs_search"), true)
            .unwrap();
        assert_eq!(
            tree.get_path(&path("power_platform.search.disable_docs_search")),
            &Field::from(true)
        );
        assert!(tree.get_path(&path("power_platform.search.other")).is_absent());
    }

    #[test]
    fn set_path_replaces_null_ancestor() {
        let mut tree = SettingsTree::new().with("section", Field::Null);
        tree.set_path(&path("section.leaf"), 1_i64).unwrap();
        assert_eq!(tree.get_path(&path("section.leaf")), &Field::from(1_i64));
    }

    #[test]
    fn set_path_rejects_scalar_ancestor() {
        let mut tree = SettingsTree::new().with("section", true);
        let err = tree.set_path(&path("section.leaf"), 1_i64).unwrap_err();
        assert_eq!(err, TreeError::ScalarAncestor { path: path("section") });
        assert_eq!(
            SettingsTree::new().set_path(&FieldPath::root(), true),
            Err(TreeError::EmptyPath)
        );
    }

    #[test]
    fn json_conversion_keeps_null() {
        let json = json!({
            "a": true,
            "b": null,
            "c": { "d": 5, "e": "x" },
            "f": [ { "g": false } ]
        });
        let tree = SettingsTree::from_json(&json).unwrap();
        assert!(tree.get("b").is_null());
        assert_eq!(tree.get_path(&path("c.d")), &Field::from(5_i64));
        assert_eq!(tree.to_json(), json);
    }

    #[test]
    fn json_rejects_floats_and_scalar_lists() {
        assert!(matches!(
            SettingsTree::from_json(&json!({ "a": { "b": 1.5 } })),
            Err(TreeError::UnsupportedNumber { path: p }) if p.to_string() == "a.b"
        ));
        assert!(matches!(
            SettingsTree::from_json(&json!({ "a": [1, 2] })),
            Err(TreeError::UnsupportedListItem { .. })
        ));
        assert!(matches!(
            SettingsTree::from_json(&json!([])),
            Err(TreeError::ExpectedObject { found: "list", .. })
        ));
    }

    #[test]
    fn unknown_is_not_serialized() {
        let tree = SettingsTree::new().with("a", Field::Unknown).with("b", true);
        assert_eq!(tree.to_json(), json!({ "b": true }));
    }

    #[test]
    fn serde_round_trip() {
        let tree = SettingsTree::new()
            .with("a", true)
            .with("nested", SettingsTree::new().with("b", "text"));
        let text = serde_json::to_string(&tree).unwrap();
        let back: SettingsTree = serde_json::from_str(&text).unwrap();
        assert_eq!(back, tree);
    }
}
