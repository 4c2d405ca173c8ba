//! Configuration validation against a [`Schema`].
//!
//! Runs before any network call: a resource configuration that fails here
//! never reaches the appliance.
//!
//! # Example
//!
//! ```
//! use grid_provider::schema::{Attribute, Schema};
//! use grid_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute("extattrs", Attribute::optional_string_map());
//!
//! assert!(validate(&schema, &json!({"name": "dhcp-restart"})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "x", "extattrs": {"Site": 1}}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("extattrs.Site".to_string()));
//! ```

use crate::schema::{
    Attribute, AttributeType, Block, BlockNestingMode, Diagnostic, NestedBlock, Schema,
};
use serde_json::Value;

/// Validate a configuration value against a schema.
///
/// Returns one diagnostic per problem; an empty list means the value is valid.
///
/// - Required attributes must be present and non-null
/// - Computed-only attributes and blocks are skipped
/// - Attribute types must match the schema
/// - Arguments the schema does not know about are rejected
/// - Nested blocks are checked recursively against `max_items`
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

/// Validate a value, returning Ok if valid or Err with the diagnostics.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return,
        _ => {
            let mut diag = Diagnostic::error("Expected object")
                .with_detail(format!("Got {}", type_name(value)));
            if !path.is_empty() {
                diag = diag.with_attribute(path);
            }
            diagnostics.push(diag);
            return;
        }
    };

    for (name, attr) in &block.attributes {
        validate_attribute(attr, obj.get(name), &join_path(path, name), diagnostics);
    }

    for (name, nested) in &block.blocks {
        if nested.computed {
            continue;
        }
        validate_nested_block(nested, obj.get(name), &join_path(path, name), diagnostics);
    }

    for name in obj.keys() {
        if !block.attributes.contains_key(name) && !block.blocks.contains_key(name) {
            let attr_path = join_path(path, name);
            diagnostics.push(
                Diagnostic::error(format!("Unsupported argument '{}'", attr_path))
                    .with_detail("An argument with this name is not expected here")
                    .with_attribute(attr_path),
            );
        }
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.is_computed_only() {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        }
        Some(v) => validate_type(&attr.attr_type, v, path, diagnostics),
    }
}

fn validate_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        }
        AttributeType::Int64 => {
            if value.as_i64().is_none() {
                diagnostics.push(type_error(path, "int64", value));
            }
        }
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        }
        AttributeType::List(element_type) => match value.as_array() {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    validate_type(element_type, item, &format!("{}.{}", path, i), diagnostics);
                }
            }
            None => diagnostics.push(type_error(path, "list", value)),
        },
        AttributeType::Map(value_type) => match value.as_object() {
            Some(entries) => {
                for (key, entry) in entries {
                    validate_type(value_type, entry, &format!("{}.{}", path, key), diagnostics);
                }
            }
            None => diagnostics.push(type_error(path, "map", value)),
        },
    }
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match (nested.nesting_mode, value) {
        (_, None) | (_, Some(Value::Null)) => {}
        (BlockNestingMode::Single, Some(v)) => validate_block(&nested.block, v, path, diagnostics),
        (BlockNestingMode::List, Some(Value::Array(items))) => {
            let len = items.len() as u32;
            if nested.max_items > 0 && len > nested.max_items {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' allows at most {} item(s), got {}",
                        path, nested.max_items, len
                    ))
                    .with_attribute(path),
                );
            }
            for (i, item) in items.iter().enumerate() {
                validate_block(&nested.block, item, &format!("{}.{}", path, i), diagnostics);
            }
        }
        (BlockNestingMode::List, Some(v)) => diagnostics.push(
            Diagnostic::error(format!("Expected list for block '{}'", path))
                .with_detail(format!("Got {}", type_name(v)))
                .with_attribute(path),
        ),
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, type_name(got)))
        .with_attribute(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Block, NestedBlock, Schema};
    use serde_json::json;

    fn member_like_schema() -> Schema {
        Schema::v0()
            .with_attribute("ref", Attribute::computed_string())
            .with_attribute("host_name", Attribute::required_string())
            .with_attribute("enable_ha", Attribute::optional_computed_bool())
            .with_attribute("members", Attribute::optional_string_list())
            .with_attribute("extattrs", Attribute::optional_string_map())
            .with_block(
                "vip_setting",
                NestedBlock::single(
                    Block::new()
                        .with_attribute("address", Attribute::optional_string())
                        .with_attribute("dscp", Attribute::optional_computed_int64()),
                ),
            )
            .with_block(
                "bgp_as",
                NestedBlock::list(
                    Block::new().with_attribute("as", Attribute::optional_computed_int64()),
                )
                .with_max_items(1),
            )
            .with_block(
                "cloud_info",
                NestedBlock::single(
                    Block::new().with_attribute("usage", Attribute::computed_string()),
                )
                .computed(),
            )
    }

    #[test]
    fn test_valid_configuration() {
        let schema = member_like_schema();
        let diagnostics = validate(
            &schema,
            &json!({
                "host_name": "member1.example.com",
                "enable_ha": false,
                "members": ["a", "b"],
                "extattrs": {"Site": "nyc"},
                "vip_setting": {"address": "10.0.0.2", "dscp": 0},
                "bgp_as": [{"as": 65001}]
            }),
        );
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    }

    #[test]
    fn test_missing_required() {
        let schema = member_like_schema();
        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("host_name".to_string()));

        let diagnostics = validate(&schema, &json!({"host_name": null}));
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_computed_only_skipped() {
        let schema = member_like_schema();
        let diagnostics = validate(
            &schema,
            &json!({"host_name": "m", "ref": 12, "cloud_info": "anything"}),
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_wrong_types() {
        let schema = member_like_schema();
        let diagnostics = validate(
            &schema,
            &json!({
                "host_name": 1,
                "enable_ha": "yes",
                "members": "a",
                "extattrs": {"Site": 1}
            }),
        );
        let mut paths: Vec<_> = diagnostics
            .iter()
            .filter_map(|d| d.attribute.clone())
            .collect();
        paths.sort();
        assert_eq!(paths, vec!["enable_ha", "extattrs.Site", "host_name", "members"]);
    }

    #[test]
    fn test_nested_blocks() {
        let schema = member_like_schema();
        let diagnostics = validate(
            &schema,
            &json!({
                "host_name": "m",
                "vip_setting": {"address": 5},
                "bgp_as": [{"as": 1}, {"as": 2}]
            }),
        );
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics
            .iter()
            .any(|d| d.attribute.as_deref() == Some("vip_setting.address")));
        assert!(diagnostics
            .iter()
            .any(|d| d.summary.contains("at most 1 item(s), got 2")));

        let diagnostics = validate(&schema, &json!({"host_name": "m", "bgp_as": {"as": 1}}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected list"));
    }

    #[test]
    fn test_unsupported_argument() {
        let schema = member_like_schema();
        let diagnostics = validate(&schema, &json!({"host_name": "m", "hostname": "typo"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Unsupported argument 'hostname'");
    }

    #[test]
    fn test_validate_result() {
        let schema = member_like_schema();
        assert!(validate_result(&schema, &json!({"host_name": "m"})).is_ok());
        assert!(validate_result(&schema, &json!([])).is_err());
    }
}
