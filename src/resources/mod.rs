//! Grid object types and the machinery that manages them.
//!
//! Each object type is a [`GridResource`]: a state model plus a pair of
//! pure mapping functions, `expand` (model to request payload) and
//! `flatten` (response object to model). The generic
//! [`adapter::ResourceAdapter`] adds everything the object types share:
//! the `ref` attribute, extensible attribute reconciliation, identity
//! fallback on read, idempotent delete and import.
//!
//! [`ResourceRegistry`] is built once per provider and owns one adapter per
//! type, with its schema constructed up front.

pub mod adapter;
pub mod cloudapi;
pub mod dashboard;
pub mod member;
pub mod servicerestart_group;

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ProviderError;
use crate::schema::{ProviderSchema, Schema};

pub use adapter::{ResourceAdapter, ResourceHandler};

/// A Grid object type.
pub trait GridResource: Send + Sync + 'static {
    /// State model holding the object's own attributes.
    ///
    /// `ref`, `extattrs` and `extattrs_all` are managed by the adapter and
    /// must not appear here.
    type Model: Serialize + DeserializeOwned + Default + Send + Sync;

    /// Resource type name exposed to users.
    const TYPE_NAME: &'static str;

    /// WAPI object type.
    const OBJECT_TYPE: &'static str;

    /// Fields requested on every call.
    const RETURN_FIELDS: &'static [&'static str];

    /// Whether the object type carries extensible attributes.
    const EXTATTRS: bool = true;

    /// Whether exactly one instance exists per Grid. Singletons are adopted
    /// on create and forgotten on delete.
    const SINGLETON: bool = false;

    /// Schema of the object's own attributes.
    fn schema() -> Schema;

    /// Build the request payload for a planned model.
    fn expand(model: &Self::Model) -> Map<String, Value>;

    /// Build a model from an object returned by the appliance.
    fn flatten(object: &Value) -> Result<Self::Model, ProviderError>;
}

/// All resource adapters of the provider, keyed by type name.
pub struct ResourceRegistry {
    handlers: BTreeMap<&'static str, Box<dyn ResourceHandler>>,
}

impl ResourceRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// The registry of every Grid object type this provider manages.
    pub fn standard() -> Self {
        Self::new()
            .with::<servicerestart_group::ServiceRestartGroup>()
            .with::<cloudapi::CloudApiTenant>()
            .with::<cloudapi::CloudApiVm>()
            .with::<member::Member>()
            .with::<dashboard::Dashboard>()
    }

    /// Register an object type.
    pub fn with<R: GridResource>(mut self) -> Self {
        self.handlers
            .insert(R::TYPE_NAME, Box::new(ResourceAdapter::<R>::new()));
        self
    }

    /// Look up the handler for a resource type.
    pub fn get(&self, resource_type: &str) -> Result<&dyn ResourceHandler, ProviderError> {
        self.handlers
            .get(resource_type)
            .map(|handler| &**handler)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    /// Look up the handler backing a data source.
    pub fn data_source(
        &self,
        data_source_type: &str,
    ) -> Result<&dyn ResourceHandler, ProviderError> {
        self.handlers
            .get(data_source_type)
            .filter(|handler| handler.data_source_schema().is_some())
            .map(|handler| &**handler)
            .ok_or_else(|| {
                ProviderError::UnknownResource(format!(
                    "Unknown data source type: {}",
                    data_source_type
                ))
            })
    }

    /// Schemas of every registered resource and data source.
    pub fn provider_schema(&self, provider: Schema) -> ProviderSchema {
        let initial = ProviderSchema::new().with_provider_config(provider);
        self.handlers.iter().fold(initial, |acc, (name, handler)| {
            let acc = acc.with_resource(*name, handler.schema().clone());
            match handler.data_source_schema() {
                Some(schema) => acc.with_data_source(*name, schema.clone()),
                None => acc,
            }
        })
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

// =========================================================================
// Field mapping helpers shared by the object types
// =========================================================================

pub(crate) fn str_field(object: &Value, name: &str) -> Option<String> {
    object.get(name).and_then(Value::as_str).map(str::to_string)
}

pub(crate) fn i64_field(object: &Value, name: &str) -> Option<i64> {
    object.get(name).and_then(Value::as_i64)
}

pub(crate) fn bool_field(object: &Value, name: &str) -> Option<bool> {
    object.get(name).and_then(Value::as_bool)
}

pub(crate) fn str_list_field(object: &Value, name: &str) -> Option<Vec<String>> {
    object.get(name).and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    })
}

/// Flatten a nested object, if present.
pub(crate) fn nested<T>(
    object: &Value,
    name: &str,
    flatten: fn(&Value) -> T,
) -> Option<T> {
    object.get(name).filter(|v| v.is_object()).map(flatten)
}

/// Flatten a list of nested objects, if present.
pub(crate) fn nested_list<T>(
    object: &Value,
    name: &str,
    flatten: fn(&Value) -> T,
) -> Option<Vec<T>> {
    object
        .get(name)
        .and_then(Value::as_array)
        .map(|items| items.iter().map(flatten).collect())
}

/// Insert a field into a payload when it is set.
pub(crate) fn put<T>(body: &mut Map<String, Value>, name: &str, value: &Option<T>)
where
    T: Clone + Into<Value>,
{
    if let Some(value) = value {
        body.insert(name.to_string(), value.clone().into());
    }
}

/// Insert an expanded nested object into a payload when it is set.
pub(crate) fn put_nested<T>(
    body: &mut Map<String, Value>,
    name: &str,
    value: &Option<T>,
    expand: fn(&T) -> Map<String, Value>,
) {
    if let Some(value) = value {
        body.insert(name.to_string(), Value::Object(expand(value)));
    }
}

/// Insert a list of expanded nested objects into a payload when it is set.
pub(crate) fn put_nested_list<T>(
    body: &mut Map<String, Value>,
    name: &str,
    value: &Option<Vec<T>>,
    expand: fn(&T) -> Map<String, Value>,
) {
    if let Some(items) = value {
        let items = items.iter().map(|item| Value::Object(expand(item))).collect();
        body.insert(name.to_string(), Value::Array(items));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_standard_registry() {
        let registry = ResourceRegistry::standard();
        for name in [
            "grid_servicerestart_group",
            "grid_cloudapi_tenant",
            "grid_cloudapi_vm",
            "grid_member",
            "grid_dashboard",
        ] {
            assert!(registry.get(name).is_ok(), "{} not registered", name);
        }
        assert!(matches!(
            registry.get("grid_widget"),
            Err(ProviderError::UnknownResource(_))
        ));
    }

    #[test]
    fn test_data_sources_only_for_extattr_types() {
        let registry = ResourceRegistry::standard();
        assert!(registry.data_source("grid_member").is_ok());
        assert!(registry.data_source("grid_cloudapi_vm").is_ok());
        assert!(registry.data_source("grid_dashboard").is_err());
        assert!(registry.data_source("grid_cloudapi_tenant").is_err());
    }

    #[test]
    fn test_provider_schema_lists_everything() {
        let schema = ResourceRegistry::standard().provider_schema(Schema::v0());
        assert_eq!(schema.resources.len(), 5);
        assert_eq!(schema.data_sources.len(), 3);
        let member = &schema.resources["grid_member"];
        assert!(member.block.attributes.contains_key("ref"));
        assert!(member.block.attributes.contains_key("extattrs"));
        assert!(member.block.attributes.contains_key("extattrs_all"));
        let dashboard = &schema.resources["grid_dashboard"];
        assert!(!dashboard.block.attributes.contains_key("extattrs"));
    }

    #[test]
    fn test_field_helpers() {
        let object = json!({
            "name": "dhcp",
            "position": 3,
            "is_default": true,
            "members": ["a", "b", 4],
            "vip_setting": {"address": "10.0.0.2"},
            "bgp_as": [{"as": 1}, {"as": 2}]
        });
        assert_eq!(str_field(&object, "name"), Some("dhcp".to_string()));
        assert_eq!(str_field(&object, "position"), None);
        assert_eq!(i64_field(&object, "position"), Some(3));
        assert_eq!(bool_field(&object, "is_default"), Some(true));
        assert_eq!(
            str_list_field(&object, "members"),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(
            nested(&object, "vip_setting", |v| str_field(v, "address")),
            Some(Some("10.0.0.2".to_string()))
        );
        assert_eq!(
            nested_list(&object, "bgp_as", |v| i64_field(v, "as")),
            Some(vec![Some(1), Some(2)])
        );
        assert_eq!(nested(&object, "missing", |v| v.clone()), None);
    }

    #[test]
    fn test_put_helpers() {
        let mut body = Map::new();
        put(&mut body, "name", &Some("dhcp".to_string()));
        put::<String>(&mut body, "comment", &None);
        put(&mut body, "members", &Some(vec!["a".to_string()]));
        put_nested_list(&mut body, "items", &Some(vec![1_i64, 2]), |n| {
            let mut m = Map::new();
            m.insert("n".to_string(), json!(n));
            m
        });
        assert_eq!(
            Value::Object(body),
            json!({"name": "dhcp", "members": ["a"], "items": [{"n": 1}, {"n": 2}]})
        );
    }
}
