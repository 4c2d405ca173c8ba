//! Extensible attribute reconciliation.
//!
//! Grid objects carry a server-side map of extensible attributes. Only part
//! of it belongs to the user: the appliance adds inherited and default
//! entries, and the provider stamps every object it manages with a
//! [`TRACKING_KEY`] so the object can be found again when its reference
//! changes. Two views are therefore kept in state:
//!
//! - `extattrs`: exactly the keys the user declared, values as the server
//!   reports them.
//! - `extattrs_all`: everything the server reported, tracking key included.
//!
//! Every function here is pure; the adapters decide when to call them.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::error::ProviderError;

/// Reserved attribute that correlates a managed object with local state.
pub const TRACKING_KEY: &str = "Terraform Internal ID";

/// Flat attribute name to value map, the state representation.
pub type AttributeMap = BTreeMap<String, String>;

/// The two attribute views stored after every mutation or read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciled {
    /// Keys the user owns, values taken from the server.
    pub declared: AttributeMap,
    /// Everything the server returned.
    pub all: AttributeMap,
}

/// Ensure the map carries a tracking identifier.
///
/// An existing identifier is kept verbatim; otherwise a fresh UUID is
/// inserted. Calling this twice yields the same identifier.
pub fn add_internal_id(declared: Option<&AttributeMap>) -> AttributeMap {
    let mut map = declared.cloned().unwrap_or_default();
    if tracking_id(&map).is_none() {
        let id = Uuid::new_v4().to_string();
        debug!(tracking_id = %id, "Generated tracking identifier");
        map.insert(TRACKING_KEY.to_string(), id);
    }
    map
}

/// Carry server-side attributes onto an outgoing request.
///
/// The result holds every key of `declared` and of `all`; where both have a
/// key, the declared value wins. Sending this instead of `declared` alone
/// keeps an update from deleting attributes the user never touched.
pub fn add_inherited_ext_attrs(declared: &AttributeMap, all: &AttributeMap) -> AttributeMap {
    let mut merged = all.clone();
    merged.extend(declared.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Drop from `all` the keys the user removed from their configuration.
///
/// A key is removed when it was in the previous declared view and is no
/// longer declared. The tracking key is never dropped.
pub fn drop_removed(
    all: &AttributeMap,
    prior_declared: Option<&AttributeMap>,
    declared: &AttributeMap,
) -> AttributeMap {
    let Some(prior) = prior_declared else {
        return all.clone();
    };
    all.iter()
        .filter(|(key, _)| {
            key.as_str() == TRACKING_KEY || !prior.contains_key(*key) || declared.contains_key(*key)
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Split a server response into the declared and all views.
///
/// The declared view holds the keys of `declared` that the server still
/// reports; values always come from `response`.
pub fn remove_inherited_ext_attrs(declared: &AttributeMap, response: AttributeMap) -> Reconciled {
    let owned = response
        .iter()
        .filter(|(key, _)| declared.contains_key(*key))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Reconciled {
        declared: owned,
        all: response,
    }
}

/// The tracking identifier carried by a map, if present and non-empty.
pub fn tracking_id(map: &AttributeMap) -> Option<&str> {
    map.get(TRACKING_KEY)
        .map(String::as_str)
        .filter(|id| !id.is_empty())
}

/// A copy of the map without the tracking key.
pub fn without_tracking_key(map: &AttributeMap) -> AttributeMap {
    map.iter()
        .filter(|(key, _)| key.as_str() != TRACKING_KEY)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Convert the appliance's `{"name": {"value": v}}` shape to a flat map.
///
/// Missing or null input yields an empty map. Non-string scalars are
/// rendered with their JSON text.
pub fn from_wire(wire: Option<&Value>) -> Result<AttributeMap, ProviderError> {
    let entries = match wire {
        None | Some(Value::Null) => return Ok(AttributeMap::new()),
        Some(Value::Object(entries)) => entries,
        Some(other) => {
            return Err(ProviderError::InvalidRequest(format!(
                "extattrs must be an object, got {}",
                other
            )))
        }
    };

    entries
        .iter()
        .map(|(name, entry)| {
            let value = entry.get("value").ok_or_else(|| {
                ProviderError::InvalidRequest(format!("extattr '{}' has no value", name))
            })?;
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Ok((name.clone(), text))
        })
        .collect()
}

/// Convert a flat map to the appliance's `{"name": {"value": v}}` shape.
pub fn to_wire(map: &AttributeMap) -> Value {
    let entries: Map<String, Value> = map
        .iter()
        .map(|(name, value)| {
            let mut entry = Map::new();
            entry.insert("value".to_string(), Value::String(value.clone()));
            (name.clone(), Value::Object(entry))
        })
        .collect();
    Value::Object(entries)
}
