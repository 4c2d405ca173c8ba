//! Plain data types exchanged with the plugin host.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A change to a single top-level attribute during a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// The attribute that changed.
    pub path: String,
    /// The value before the change (None if creating).
    pub before: Option<Value>,
    /// The value after the change (None if removed).
    pub after: Option<Value>,
}

impl AttributeChange {
    /// Create a new attribute change.
    pub fn new(path: impl Into<String>, before: Option<Value>, after: Option<Value>) -> Self {
        Self {
            path: path.into(),
            before,
            after,
        }
    }

    /// Create a change for a new attribute.
    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, None, Some(value))
    }

    /// Create a change for a removed attribute.
    pub fn removed(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, Some(value), None)
    }

    /// Create a change for a modified attribute.
    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        Self::new(path, Some(before), Some(after))
    }
}

/// Compare two object states attribute by attribute.
///
/// `null` and an absent key are treated alike, at any depth. Keys are
/// visited in sorted order so the result is deterministic.
pub fn diff_attributes(prior: &Value, planned: &Value) -> Vec<AttributeChange> {
    let empty = serde_json::Map::new();
    let before = prior.as_object().unwrap_or(&empty);
    let after = planned.as_object().unwrap_or(&empty);

    let mut keys: Vec<&String> = before.keys().chain(after.keys()).collect();
    keys.sort();
    keys.dedup();

    keys.into_iter()
        .filter_map(|key| {
            let old = before.get(key).filter(|v| !v.is_null());
            let new = after.get(key).filter(|v| !v.is_null());
            match (old, new) {
                (None, Some(new)) => Some(AttributeChange::added(key.clone(), new.clone())),
                (Some(old), None) => Some(AttributeChange::removed(key.clone(), old.clone())),
                (Some(old), Some(new)) if without_nulls(old) != without_nulls(new) => {
                    Some(AttributeChange::modified(
                        key.clone(),
                        old.clone(),
                        new.clone(),
                    ))
                }
                _ => None,
            }
        })
        .collect()
}

fn without_nulls(value: &Value) -> Value {
    match value {
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), without_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(without_nulls).collect()),
        other => other.clone(),
    }
}

/// The result of a plan operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// The planned state after the operation.
    pub planned_state: Value,
    /// The list of attribute changes.
    pub changes: Vec<AttributeChange>,
    /// Whether the object must be destroyed and recreated.
    pub requires_replace: bool,
}

impl PlanResult {
    /// Create a plan result with no changes.
    pub fn no_change(state: Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
        }
    }

    /// Create a plan result with changes.
    pub fn with_changes(
        planned_state: Value,
        changes: Vec<AttributeChange>,
        requires_replace: bool,
    ) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace,
        }
    }

    /// Whether the plan changes anything.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// An object adopted into management by import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// The resource type.
    pub resource_type: String,
    /// The imported state.
    pub state: Value,
}

impl ImportedResource {
    /// Create a new imported resource.
    pub fn new(resource_type: impl Into<String>, state: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// Provider metadata: the names of everything the provider manages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// List of resource type names.
    pub resources: Vec<String>,
    /// List of data source type names.
    pub data_sources: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_change_constructors() {
        let added = AttributeChange::added("comment", json!("lab"));
        assert!(added.before.is_none());
        assert_eq!(added.after, Some(json!("lab")));

        let removed = AttributeChange::removed("comment", json!("old"));
        assert_eq!(removed.before, Some(json!("old")));
        assert!(removed.after.is_none());
    }

    #[test]
    fn test_diff_attributes() {
        let prior = json!({
            "ref": "grid:servicerestart:group/abc:dhcp",
            "name": "dhcp",
            "comment": "old",
            "mode": null,
            "members": ["a"]
        });
        let planned = json!({
            "ref": "grid:servicerestart:group/abc:dhcp",
            "name": "dhcp",
            "comment": "new",
            "members": ["a"],
            "extattrs": {"Site": "nyc"}
        });

        let changes = diff_attributes(&prior, &planned);
        assert_eq!(
            changes,
            vec![
                AttributeChange::modified("comment", json!("old"), json!("new")),
                AttributeChange::added("extattrs", json!({"Site": "nyc"})),
            ]
        );
    }

    #[test]
    fn test_diff_attributes_from_null() {
        let changes = diff_attributes(&Value::Null, &json!({"name": "x"}));
        assert_eq!(changes, vec![AttributeChange::added("name", json!("x"))]);

        let changes = diff_attributes(&json!({"name": "x"}), &Value::Null);
        assert_eq!(changes, vec![AttributeChange::removed("name", json!("x"))]);
    }

    #[test]
    fn test_diff_attributes_ignores_nested_nulls() {
        let prior = json!({"vip_setting": {"address": "10.0.0.2", "dscp": null}});
        let planned = json!({"vip_setting": {"address": "10.0.0.2"}});
        assert!(diff_attributes(&prior, &planned).is_empty());

        let planned = json!({"vip_setting": {"address": "10.0.0.3"}});
        assert_eq!(diff_attributes(&prior, &planned).len(), 1);
    }

    #[test]
    fn test_plan_result() {
        let no_change = PlanResult::no_change(json!({"name": "x"}));
        assert!(!no_change.has_changes());
        assert!(!no_change.requires_replace);

        let with_changes = PlanResult::with_changes(
            json!({"name": "y"}),
            vec![AttributeChange::modified("name", json!("x"), json!("y"))],
            true,
        );
        assert!(with_changes.has_changes());
        assert!(with_changes.requires_replace);
    }

    #[test]
    fn test_imported_resource() {
        let imported = ImportedResource::new(
            "grid_member",
            json!({"ref": "member/b25lLnZpcnR1YWxfbm9kZSQw:infoblox.localdomain"}),
        );
        assert_eq!(imported.resource_type, "grid_member");
        assert!(imported.state["ref"].as_str().is_some());
    }
}
