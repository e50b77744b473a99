//! Schema-driven wire codec
//!
//! The remote speaks camelCase JSON; configuration and state use the
//! snake_case names declared in a [`Schema`]. Decoding is lenient, since the
//! remote may know fields the schema does not, and keeps values whose JSON
//! type disagrees with the schema so the merge can report them. Encoding is
//! strict: a tree field the schema does not declare is a caller error.

use serde_json::{Map, Value as Json};

use crate::field::{Field, Value};
use crate::path::FieldPath;
use crate::schema::{Kind, Schema};
use crate::tree::{field_from_json, json_kind, value_to_json, SettingsTree, TreeError};

/// Decode a remote JSON object into a tree keyed by configuration names
///
/// Keys the schema does not declare are dropped; declared keys missing from
/// the document stay absent. Anchored fields are read from their absolute
/// location, so a section made only of anchored fields decodes even when
/// its own key is missing.
///
/// # Errors
/// Returns error if `json` is not an object, or a value has no settings
/// representation (floats, lists of scalars).
pub fn decode(schema: &Schema, json: &Json) -> Result<SettingsTree, WireError> {
    decode_at(schema, json, json, &FieldPath::root())
}

fn decode_at(
    schema: &Schema,
    json: &Json,
    root: &Json,
    path: &FieldPath,
) -> Result<SettingsTree, WireError> {
    let Json::Object(map) = json else {
        return Err(WireError::ExpectedObject {
            path: path.clone(),
            found: json_kind(json),
        });
    };
    let mut tree = SettingsTree::new();
    for spec in schema.iter() {
        let here = path.child(spec.name());
        let item = match spec.wire_path() {
            Some(anchored) => lookup(root, anchored),
            None => map.get(spec.wire()),
        };
        let field = match (spec.kind(), item) {
            (Kind::Object(inner), Some(item @ Json::Object(_))) => {
                Field::Known(Value::Object(decode_at(inner, item, root, &here)?))
            }
            (Kind::Object(inner), None) => {
                let section = decode_at(inner, &Json::Object(Map::new()), root, &here)?;
                if section.is_empty() {
                    continue;
                }
                Field::Known(Value::Object(section))
            }
            (_, Some(item)) => field_from_json(item, &here)?,
            (_, None) => continue,
        };
        tree.set(spec.name(), field);
    }
    Ok(tree)
}

fn lookup<'a>(root: &'a Json, path: &FieldPath) -> Option<&'a Json> {
    path.iter().try_fold(root, |node, segment| node.get(segment))
}

/// Encode a tree into the remote's JSON form
///
/// Null fields are sent as JSON null; unknown fields are not sent. Sections
/// left with nothing to send are dropped, and anchored fields are written
/// at their absolute location.
///
/// # Errors
/// Returns [`WireError::UndeclaredField`] for a field missing from the schema.
pub fn encode(schema: &Schema, tree: &SettingsTree) -> Result<Json, WireError> {
    let mut anchored = Vec::new();
    let mut root = encode_at(schema, tree, &FieldPath::root(), &mut anchored)?;
    for (path, json) in anchored {
        insert_at(&mut root, &path, json);
    }
    Ok(Json::Object(root))
}

fn encode_at(
    schema: &Schema,
    tree: &SettingsTree,
    path: &FieldPath,
    anchored: &mut Vec<(FieldPath, Json)>,
) -> Result<Map<String, Json>, WireError> {
    let mut map = Map::new();
    for (name, field) in tree.fields() {
        let here = path.child(name);
        let spec = schema
            .get(name)
            .ok_or_else(|| WireError::UndeclaredField { path: here.clone() })?;
        let json = match field {
            Field::Absent | Field::Unknown => continue,
            Field::Null => Json::Null,
            Field::Known(Value::Object(inner)) => match spec.kind() {
                Kind::Object(nested) => {
                    let section = encode_at(nested, inner, &here, anchored)?;
                    if section.is_empty() {
                        continue;
                    }
                    Json::Object(section)
                }
                _ => inner.to_json(),
            },
            Field::Known(value) => value_to_json(value),
        };
        match spec.wire_path() {
            Some(location) => anchored.push((location.clone(), json)),
            None => {
                map.insert(spec.wire().to_string(), json);
            }
        }
    }
    Ok(map)
}

fn insert_at(root: &mut Map<String, Json>, path: &FieldPath, json: Json) {
    let Some((leaf, parents)) = path.segments().split_last() else {
        return;
    };
    let mut node = root;
    for segment in parents {
        let slot = node
            .entry(segment.clone())
            .or_insert_with(|| Json::Object(Map::new()));
        if !slot.is_object() {
            *slot = Json::Object(Map::new());
        }
        let Json::Object(next) = slot else {
            return;
        };
        node = next;
    }
    node.insert(leaf.clone(), json);
}

/// Errors raised by the wire codec
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("expected an object at {path}, found {found}")]
    ExpectedObject { path: FieldPath, found: &'static str },

    #[error("field {path} is not declared in the schema")]
    UndeclaredField { path: FieldPath },

    #[error("malformed value: {0}")]
    Tree(#[from] TreeError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new()
            .bool("walk_me_opt_out")
            .with_field(
                FieldSpec::new("disable_nps_comments_reachout", Kind::Bool)
                    .with_wire("disableNPSCommentsReachout"),
            )
            .object(
                "power_platform",
                Schema::new()
                    .object("search", Schema::new().bool("disable_docs_search"))
                    .object(
                        "teams_integration",
                        Schema::new().int("share_with_colleagues_user_limit"),
                    ),
            )
            .list("assignments")
    }

    fn anchored_schema() -> Schema {
        Schema::new().bool("walk_me_opt_out").object(
            "power_platform",
            Schema::new().object(
                "product_feedback",
                Schema::new()
                    .with_field(
                        FieldSpec::new("disable_attachments", Kind::Bool)
                            .with_wire_path("disableSurveyScreenshots".parse().unwrap()),
                    )
                    .with_field(
                        FieldSpec::new("disable_microsoft_follow_up", Kind::Bool)
                            .with_wire_path("disableNPSCommentsReachout".parse().unwrap()),
                    ),
            ),
        )
    }

    #[test]
    fn decode_maps_wire_names() {
        let json = json!({
            "walkMeOptOut": false,
            "disableNPSCommentsReachout": true,
            "powerPlatform": {
                "search": { "disableDocsSearch": true },
                "teamsIntegration": { "shareWithColleaguesUserLimit": 10000 }
            },
            "somethingNew": 1
        });
        let tree = decode(&schema(), &json).unwrap();
        assert_eq!(tree.get("walk_me_opt_out"), &Field::from(false));
        assert_eq!(tree.get("disable_nps_comments_reachout"), &Field::from(true));
        assert_eq!(
            tree.get_path(&"power_platform.teams_integration.share_with_colleagues_user_limit".parse().unwrap()),
            &Field::from(10_000_i64)
        );
        assert!(tree.get("somethingNew").is_absent());
        assert!(tree.get("assignments").is_absent());
    }

    #[test]
    fn decode_keeps_null_and_mismatched_values() {
        let json = json!({ "walkMeOptOut": "yes", "powerPlatform": null });
        let tree = decode(&schema(), &json).unwrap();
        assert_eq!(tree.get("walk_me_opt_out"), &Field::from("yes"));
        assert!(tree.get("power_platform").is_null());
    }

    #[test]
    fn encode_round_trips_declared_fields() {
        let json = json!({
            "walkMeOptOut": true,
            "powerPlatform": { "search": { "disableDocsSearch": null } },
            "assignments": [ { "principal": "a" } ]
        });
        let tree = decode(&schema(), &json).unwrap();
        assert_eq!(encode(&schema(), &tree).unwrap(), json);
    }

    #[test]
    fn encode_skips_unknown() {
        let tree = SettingsTree::new()
            .with("walk_me_opt_out", Field::Unknown)
            .with("disable_nps_comments_reachout", false);
        assert_eq!(
            encode(&schema(), &tree).unwrap(),
            json!({ "disableNPSCommentsReachout": false })
        );
    }

    #[test]
    fn encode_drops_sections_with_nothing_to_send() {
        let tree = SettingsTree::new().with("walk_me_opt_out", true).with(
            "power_platform",
            SettingsTree::new()
                .with("search", SettingsTree::new())
                .with(
                    "teams_integration",
                    SettingsTree::new().with("share_with_colleagues_user_limit", Field::Unknown),
                ),
        );
        assert_eq!(encode(&schema(), &tree).unwrap(), json!({ "walkMeOptOut": true }));
    }

    #[test]
    fn anchored_fields_live_at_document_root() {
        let json = json!({
            "walkMeOptOut": false,
            "disableSurveyScreenshots": true,
            "disableNPSCommentsReachout": null,
            "powerPlatform": {}
        });
        let tree = decode(&anchored_schema(), &json).unwrap();
        let section: FieldPath = "power_platform.product_feedback".parse().unwrap();
        assert_eq!(
            tree.get_path(&section.child("disable_attachments")),
            &Field::from(true)
        );
        assert!(tree.get_path(&section.child("disable_microsoft_follow_up")).is_null());

        let planned = SettingsTree::new().with(
            "power_platform",
            SettingsTree::new().with(
                "product_feedback",
                SettingsTree::new().with("disable_attachments", false),
            ),
        );
        assert_eq!(
            encode(&anchored_schema(), &planned).unwrap(),
            json!({ "disableSurveyScreenshots": false })
        );
    }

    #[test]
    fn anchored_section_absent_without_its_fields() {
        let tree = decode(&anchored_schema(), &json!({ "walkMeOptOut": true })).unwrap();
        assert!(tree.get("power_platform").is_absent());
    }

    #[test]
    fn encode_rejects_undeclared() {
        let tree = SettingsTree::new().with(
            "power_platform",
            SettingsTree::new().with("bogus", true),
        );
        assert_eq!(
            encode(&schema(), &tree),
            Err(WireError::UndeclaredField {
                path: "power_platform.bogus".parse().unwrap()
            })
        );
    }

    #[test]
    fn decode_requires_object() {
        assert!(matches!(
            decode(&schema(), &json!(true)),
            Err(WireError::ExpectedObject { found: "bool", .. })
        ));
    }
}
