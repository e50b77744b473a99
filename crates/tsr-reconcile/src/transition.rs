//! Cleared-identifier substitution for outgoing payloads
//!
//! Sending an absent field tells the remote "leave it alone", so a plan that
//! drops a previously set identifier would never clear it. Before sending,
//! every identifier field that is known in the prior tree and absent or null
//! in the planned tree is rewritten to [`Identifier::ZERO`], which the
//! remote treats as cleared.

use tsr_tree::{Field, FieldPath, Identifier, Kind, Schema, SettingsTree};

/// Planned tree with cleared identifiers rewritten to the zero sentinel
///
/// Only fields whose ancestor sections are known objects in the prior tree
/// are considered. A section the plan drops or nulls is rebuilt holding just
/// its cleared identifiers; an unknown planned section is left alone.
/// Returns the rewritten tree and the affected paths.
#[must_use]
pub fn substitute_cleared_identifiers(
    schema: &Schema,
    prior: &SettingsTree,
    planned: &SettingsTree,
) -> (SettingsTree, Vec<FieldPath>) {
    let mut out = planned.clone();
    let mut cleared = Vec::new();
    substitute(schema, prior, &mut out, &FieldPath::root(), &mut cleared);
    (out, cleared)
}

fn substitute(
    schema: &Schema,
    prior: &SettingsTree,
    planned: &mut SettingsTree,
    path: &FieldPath,
    cleared: &mut Vec<FieldPath>,
) {
    for spec in schema.iter() {
        match spec.kind() {
            Kind::Identifier => {
                let was_set = matches!(prior.get(spec.name()), Field::Known(_));
                let now = planned.get(spec.name());
                if was_set && (now.is_absent() || now.is_null()) {
                    planned.set(spec.name(), Identifier::ZERO);
                    cleared.push(path.child(spec.name()));
                }
            }
            Kind::Object(inner) => {
                let Some(prior_section) = prior.get(spec.name()).object() else {
                    continue;
                };
                let here = path.child(spec.name());
                let dropped = {
                    let now = planned.get(spec.name());
                    now.is_absent() || now.is_null()
                };
                if dropped {
                    let mut rebuilt = SettingsTree::new();
                    substitute(inner, prior_section, &mut rebuilt, &here, cleared);
                    if !rebuilt.is_empty() {
                        planned.set(spec.name(), rebuilt);
                    }
                } else if let Some(section) = planned.section_mut(spec.name()) {
                    substitute(inner, prior_section, section, &here, cleared);
                }
            }
            _ => {}
        }
    }
}
