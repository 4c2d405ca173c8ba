//! The generic lifecycle shared by every Grid object type.
//!
//! [`ResourceAdapter`] wraps a [`GridResource`] and implements the
//! object-safe [`ResourceHandler`] the provider dispatches to. State
//! documents carry three attributes the adapter manages itself:
//!
//! - `ref`: the appliance's reference for the object.
//! - `extattrs`: the user's declared extensible attributes.
//! - `extattrs_all`: every extensible attribute the appliance reported.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use super::GridResource;
use crate::client::{GridApi, ListQuery, RequestOptions};
use crate::error::ProviderError;
use crate::extattrs::{self, AttributeMap};
use crate::resolver::{self, Resolution};
use crate::schema::{Attribute, NestedBlock, Schema};
use crate::types::{diff_attributes, PlanResult};

const REF: &str = "ref";
const EXTATTRS: &str = "extattrs";
const EXTATTRS_ALL: &str = "extattrs_all";

/// Object-safe lifecycle of one resource type.
#[async_trait::async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Resource type name.
    fn type_name(&self) -> &'static str;

    /// Full resource schema, managed attributes included.
    fn schema(&self) -> &Schema;

    /// Data source schema, when the type can be searched.
    fn data_source_schema(&self) -> Option<&Schema>;

    /// Compute the planned state and the attribute changes.
    fn plan(&self, prior: Option<&Value>, proposed: Value) -> Result<PlanResult, ProviderError>;

    /// Create the object described by `planned`.
    async fn create(&self, api: &dyn GridApi, planned: Value) -> Result<Value, ProviderError>;

    /// Refresh state. `Null` means the object is gone.
    async fn read(&self, api: &dyn GridApi, state: Value) -> Result<Value, ProviderError>;

    /// Apply `planned` to the object recorded in `prior`.
    async fn update(
        &self,
        api: &dyn GridApi,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete the object. A missing object is not an error.
    async fn delete(&self, api: &dyn GridApi, state: Value) -> Result<(), ProviderError>;

    /// Adopt an existing object by reference.
    async fn import(&self, api: &dyn GridApi, reference: &str) -> Result<Value, ProviderError>;

    /// Search objects of the type.
    async fn read_data_source(&self, api: &dyn GridApi, config: Value)
        -> Result<Value, ProviderError>;
}

/// Attributes of a state document owned by the adapter.
#[derive(Debug, Default, Deserialize)]
struct Managed {
    #[serde(rename = "ref", default)]
    reference: Option<String>,
    #[serde(default)]
    extattrs: Option<AttributeMap>,
    #[serde(default)]
    extattrs_all: Option<AttributeMap>,
}

impl Managed {
    fn from_state(state: &Value) -> Result<Self, ProviderError> {
        Ok(serde_json::from_value(state.clone())?)
    }

    fn reference(&self) -> Option<&str> {
        self.reference.as_deref().filter(|r| !r.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
struct SearchConfig {
    #[serde(default)]
    filters: Option<BTreeMap<String, String>>,
    #[serde(default)]
    extattrfilters: Option<BTreeMap<String, String>>,
}

/// Lifecycle implementation for a [`GridResource`].
pub struct ResourceAdapter<R: GridResource> {
    schema: Schema,
    data_source_schema: Option<Schema>,
    options: RequestOptions,
    _resource: PhantomData<fn() -> R>,
}

impl<R: GridResource> ResourceAdapter<R> {
    /// Build the adapter and its schemas.
    pub fn new() -> Self {
        let mut schema = R::schema().with_attribute(
            REF,
            Attribute::computed_string()
                .with_description("Reference of the object on the appliance"),
        );
        if R::EXTATTRS {
            schema = schema
                .with_attribute(
                    EXTATTRS,
                    Attribute::optional_string_map()
                        .with_description("Extensible attributes managed by this configuration"),
                )
                .with_attribute(
                    EXTATTRS_ALL,
                    Attribute::computed_string_map().with_description(
                        "Every extensible attribute of the object, inherited ones included",
                    ),
                );
        }

        let data_source_schema = R::EXTATTRS.then(|| {
            Schema::v0()
                .with_attribute(
                    "filters",
                    Attribute::optional_string_map().with_description("Field filters"),
                )
                .with_attribute(
                    "extattrfilters",
                    Attribute::optional_string_map()
                        .with_description("Extensible attribute filters"),
                )
                .with_block("result", NestedBlock::list(schema.block.clone()).computed())
        });

        let mut fields: Vec<&str> = R::RETURN_FIELDS.to_vec();
        if R::EXTATTRS {
            fields.push(EXTATTRS);
        }

        Self {
            schema,
            data_source_schema,
            options: RequestOptions::with_fields(&fields),
            _resource: PhantomData,
        }
    }

    /// Build a state document from an appliance object.
    ///
    /// `declared` selects the `extattrs` view; `None` keeps it null.
    fn to_state(
        &self,
        object: &Value,
        declared: Option<&AttributeMap>,
    ) -> Result<Value, ProviderError> {
        let model = R::flatten(object)?;
        let mut state = match serde_json::to_value(model)? {
            Value::Object(fields) => fields,
            other => {
                return Err(ProviderError::InvalidRequest(format!(
                    "{} model must serialize to an object, got {}",
                    R::TYPE_NAME,
                    other
                )))
            }
        };
        state.insert(
            REF.to_string(),
            object.get("_ref").cloned().unwrap_or(Value::Null),
        );

        if R::EXTATTRS {
            let response = extattrs::from_wire(object.get(EXTATTRS))?;
            let empty = AttributeMap::new();
            let reconciled =
                extattrs::remove_inherited_ext_attrs(declared.unwrap_or(&empty), response);
            let declared_view = match declared {
                Some(_) => serde_json::to_value(reconciled.declared)?,
                None => Value::Null,
            };
            state.insert(EXTATTRS.to_string(), declared_view);
            state.insert(EXTATTRS_ALL.to_string(), serde_json::to_value(reconciled.all)?);
        }

        Ok(Value::Object(state))
    }

    fn model(state: &Value) -> Result<R::Model, ProviderError> {
        Ok(serde_json::from_value(state.clone())?)
    }

    async fn adopt_singleton(
        &self,
        api: &dyn GridApi,
        body: Map<String, Value>,
    ) -> Result<Value, ProviderError> {
        let existing = api
            .list(R::OBJECT_TYPE, &ListQuery::new(), &self.options)
            .await?;
        let Some(current) = existing.into_iter().next() else {
            return Err(ProviderError::NotFound(format!(
                "no {} object exists on the appliance",
                R::OBJECT_TYPE
            )));
        };
        let reference = object_reference(&current)?;
        info!(resource_type = R::TYPE_NAME, reference, "Adopting singleton object");
        let updated = api
            .update(reference, &Value::Object(body), &self.options)
            .await?;
        self.to_state(&updated, None)
    }
}

impl<R: GridResource> Default for ResourceAdapter<R> {
    fn default() -> Self {
        Self::new()
    }
}

fn object_reference(object: &Value) -> Result<&str, ProviderError> {
    object
        .get("_ref")
        .and_then(Value::as_str)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| ProviderError::InvalidRequest("object returned without '_ref'".to_string()))
}

#[async_trait::async_trait]
impl<R: GridResource> ResourceHandler for ResourceAdapter<R> {
    fn type_name(&self) -> &'static str {
        R::TYPE_NAME
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn data_source_schema(&self) -> Option<&Schema> {
        self.data_source_schema.as_ref()
    }

    fn plan(&self, prior: Option<&Value>, proposed: Value) -> Result<PlanResult, ProviderError> {
        if proposed.is_null() {
            let changes = prior
                .map(|prior| diff_attributes(prior, &Value::Null))
                .unwrap_or_default();
            return Ok(PlanResult::with_changes(Value::Null, changes, false));
        }

        let Value::Object(mut planned) = proposed else {
            return Err(ProviderError::Validation(format!(
                "{} configuration must be an object",
                R::TYPE_NAME
            )));
        };

        let Some(prior) = prior else {
            let planned = Value::Object(planned);
            let changes = diff_attributes(&Value::Null, &planned);
            return Ok(PlanResult::with_changes(planned, changes, false));
        };

        if let Some(prior_fields) = prior.as_object() {
            self.schema.block.carry_forward(&mut planned, prior_fields);
        }

        let planned = Value::Object(planned);
        let changes = diff_attributes(prior, &planned);
        let requires_replace = changes.iter().any(|c| self.schema.forces_new(&c.path));
        if requires_replace {
            debug!(resource_type = R::TYPE_NAME, "Plan requires replacement");
        }
        Ok(PlanResult::with_changes(planned, changes, requires_replace))
    }

    #[instrument(skip_all, fields(resource_type = R::TYPE_NAME))]
    async fn create(&self, api: &dyn GridApi, planned: Value) -> Result<Value, ProviderError> {
        let managed = Managed::from_state(&planned)?;
        let mut body = R::expand(&Self::model(&planned)?);

        if R::SINGLETON {
            return self.adopt_singleton(api, body).await;
        }

        if R::EXTATTRS {
            let outgoing = extattrs::add_internal_id(managed.extattrs.as_ref());
            debug!(tracking_id = extattrs::tracking_id(&outgoing), "Stamped tracking identifier");
            body.insert(EXTATTRS.to_string(), extattrs::to_wire(&outgoing));
        }

        let created = api
            .create(R::OBJECT_TYPE, &Value::Object(body), &self.options)
            .await?;
        info!(reference = ?created.get("_ref"), "Created object");
        self.to_state(&created, managed.extattrs.as_ref())
    }

    #[instrument(skip_all, fields(resource_type = R::TYPE_NAME))]
    async fn read(&self, api: &dyn GridApi, state: Value) -> Result<Value, ProviderError> {
        let managed = Managed::from_state(&state)?;
        let all = if R::EXTATTRS {
            managed.extattrs_all.as_ref()
        } else {
            None
        };

        let resolution =
            resolver::resolve(api, R::OBJECT_TYPE, managed.reference(), all, &self.options)
                .await?;
        match resolution {
            Resolution::Direct(object) => self.to_state(&object, managed.extattrs.as_ref()),
            Resolution::Adopted(object) => {
                info!(
                    previous = managed.reference(),
                    reference = ?object.get("_ref"),
                    "Object found under a new reference"
                );
                self.to_state(&object, managed.extattrs.as_ref())
            }
            Resolution::Removed => {
                info!(reference = managed.reference(), "Object is gone, dropping from state");
                Ok(Value::Null)
            }
        }
    }

    #[instrument(skip_all, fields(resource_type = R::TYPE_NAME))]
    async fn update(
        &self,
        api: &dyn GridApi,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let prior_managed = Managed::from_state(&prior)?;
        let planned_managed = Managed::from_state(&planned)?;
        let reference = planned_managed
            .reference()
            .or_else(|| prior_managed.reference())
            .ok_or_else(|| {
                ProviderError::FailedPrecondition(format!(
                    "{} state has no reference to update",
                    R::TYPE_NAME
                ))
            })?
            .to_string();

        let mut body = R::expand(&Self::model(&planned)?);
        body.retain(|name, _| !self.schema.forces_new(name));

        if R::EXTATTRS {
            let declared = planned_managed.extattrs.clone().unwrap_or_default();
            let all = prior_managed.extattrs_all.clone().unwrap_or_default();
            let kept = extattrs::drop_removed(&all, prior_managed.extattrs.as_ref(), &declared);
            let merged = extattrs::add_inherited_ext_attrs(&declared, &kept);
            let outgoing = extattrs::add_internal_id(Some(&merged));
            body.insert(EXTATTRS.to_string(), extattrs::to_wire(&outgoing));
        }

        let updated = api
            .update(&reference, &Value::Object(body), &self.options)
            .await?;
        info!(reference = %reference, "Updated object");
        self.to_state(&updated, planned_managed.extattrs.as_ref())
    }

    #[instrument(skip_all, fields(resource_type = R::TYPE_NAME))]
    async fn delete(&self, api: &dyn GridApi, state: Value) -> Result<(), ProviderError> {
        if R::SINGLETON {
            info!("Singleton object is only removed from state");
            return Ok(());
        }

        let managed = Managed::from_state(&state)?;
        let Some(reference) = managed.reference() else {
            warn!("State has no reference, nothing to delete");
            return Ok(());
        };

        match api.delete(reference).await {
            Ok(()) => {
                info!(reference, "Deleted object");
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                debug!(reference, "Object already gone");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    #[instrument(skip_all, fields(resource_type = R::TYPE_NAME, reference = %reference))]
    async fn import(&self, api: &dyn GridApi, reference: &str) -> Result<Value, ProviderError> {
        if reference.is_empty() {
            return Err(ProviderError::InvalidRequest(
                "import id must be an object reference".to_string(),
            ));
        }

        let object = api.get(reference, &self.options).await?;
        if !R::EXTATTRS {
            return self.to_state(&object, None);
        }

        let all = extattrs::from_wire(object.get(EXTATTRS))?;
        let declared = extattrs::without_tracking_key(&all);
        let outgoing =
            extattrs::add_internal_id(Some(&extattrs::add_inherited_ext_attrs(&declared, &all)));

        let mut body = Map::new();
        body.insert(EXTATTRS.to_string(), extattrs::to_wire(&outgoing));
        let updated = api.update(reference, &Value::Object(body), &self.options).await?;
        info!(
            tracking_id = extattrs::tracking_id(&outgoing),
            "Imported object"
        );
        self.to_state(&updated, Some(&declared))
    }

    #[instrument(skip_all, fields(data_source = R::TYPE_NAME))]
    async fn read_data_source(
        &self,
        api: &dyn GridApi,
        config: Value,
    ) -> Result<Value, ProviderError> {
        if self.data_source_schema.is_none() {
            return Err(ProviderError::Unimplemented(format!(
                "{} cannot be searched",
                R::TYPE_NAME
            )));
        }

        let search: SearchConfig = serde_json::from_value(config.clone())?;
        let mut query = ListQuery::new();
        for (name, value) in search.filters.unwrap_or_default() {
            query = query.field(name, value);
        }
        for (name, value) in search.extattrfilters.unwrap_or_default() {
            query = query.extattr(name, value);
        }

        let objects = api.list(R::OBJECT_TYPE, &query, &self.options).await?;
        debug!(count = objects.len(), "Search returned objects");
        let result = objects
            .iter()
            .map(|object| {
                let all = extattrs::from_wire(object.get(EXTATTRS))?;
                self.to_state(object, Some(&extattrs::without_tracking_key(&all)))
            })
            .collect::<Result<Vec<_>, ProviderError>>()?;

        let mut state = match config {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        state.insert("result".to_string(), Value::Array(result));
        Ok(Value::Object(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extattrs::TRACKING_KEY;
    use crate::resources::servicerestart_group::ServiceRestartGroup;
    use crate::testing::MockGrid;
    use serde_json::json;

    const OBJECT: &str = "grid:servicerestart:group";

    fn adapter() -> ResourceAdapter<ServiceRestartGroup> {
        ResourceAdapter::new()
    }

    fn config(extattrs: Value) -> Value {
        json!({"name": "dhcp-restart", "service": "DHCP", "extattrs": extattrs})
    }

    async fn created(grid: &MockGrid, extattrs: Value) -> Value {
        let adapter = adapter();
        let plan = adapter.plan(None, config(extattrs)).unwrap();
        adapter.create(grid, plan.planned_state).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_stamps_tracking_key() {
        let grid = MockGrid::new();
        let state = created(&grid, json!({"Site": "nyc"})).await;

        let sent = grid.last_body().unwrap();
        let id = sent["extattrs"][TRACKING_KEY]["value"].as_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
        assert_eq!(sent["extattrs"]["Site"]["value"], "nyc");

        assert_eq!(state["extattrs"], json!({"Site": "nyc"}));
        assert_eq!(state["extattrs_all"][TRACKING_KEY], id);
        assert!(state["ref"].as_str().unwrap().starts_with(OBJECT));
    }

    #[tokio::test]
    async fn test_create_without_extattrs_keeps_declared_view_null() {
        let grid = MockGrid::new();
        let adapter = adapter();
        let state = adapter
            .create(&grid, json!({"name": "dhcp-restart", "service": "DHCP"}))
            .await
            .unwrap();
        assert!(state["extattrs"].is_null());
        assert!(extattrs::tracking_id(
            &serde_json::from_value(state["extattrs_all"].clone()).unwrap()
        )
        .is_some());
    }

    #[tokio::test]
    async fn test_inherited_attributes_stay_out_of_declared_view() {
        let grid = MockGrid::new();
        grid.inherit_on_create("Region", "us-east");
        let state = created(&grid, json!({"Site": "nyc"})).await;

        assert_eq!(state["extattrs"], json!({"Site": "nyc"}));
        assert_eq!(state["extattrs_all"]["Region"], "us-east");

        let refreshed = adapter().read(&grid, state.clone()).await.unwrap();
        assert_eq!(refreshed, state);
    }

    #[tokio::test]
    async fn test_plan_after_create_has_no_changes() {
        let grid = MockGrid::new();
        let state = created(&grid, json!({"Site": "nyc"})).await;

        let plan = adapter()
            .plan(Some(&state), config(json!({"Site": "nyc"})))
            .unwrap();
        assert!(!plan.has_changes(), "unexpected changes: {:?}", plan.changes);
        assert_eq!(plan.planned_state["ref"], state["ref"]);
    }

    #[tokio::test]
    async fn test_plan_replaces_on_force_new_change() {
        let grid = MockGrid::new();
        let state = created(&grid, json!({})).await;

        let proposed = json!({"name": "dhcp-restart", "service": "DNS", "extattrs": {}});
        let plan = adapter().plan(Some(&state), proposed).unwrap();
        assert!(plan.requires_replace);

        let proposed = json!({"name": "renamed", "service": "DHCP", "extattrs": {}});
        let plan = adapter().plan(Some(&state), proposed).unwrap();
        assert!(plan.has_changes());
        assert!(!plan.requires_replace);
    }

    #[test]
    fn test_plan_destroy() {
        let prior = json!({"name": "dhcp-restart", "ref": "x"});
        let plan = adapter().plan(Some(&prior), Value::Null).unwrap();
        assert!(plan.planned_state.is_null());
        assert_eq!(plan.changes.len(), 2);
    }

    #[tokio::test]
    async fn test_update_preserves_inherited_and_tracking_key() {
        let grid = MockGrid::new();
        let state = created(&grid, json!({"Site": "nyc"})).await;
        let reference = state["ref"].as_str().unwrap().to_string();
        grid.set_extattr(&reference, "Owner", "infra");
        let state = adapter().read(&grid, state).await.unwrap();
        let id = state["extattrs_all"][TRACKING_KEY].clone();

        let adapter = adapter();
        let plan = adapter
            .plan(Some(&state), config(json!({"Site": "sfo"})))
            .unwrap();
        let updated = adapter
            .update(&grid, state, plan.planned_state)
            .await
            .unwrap();

        assert_eq!(updated["extattrs"], json!({"Site": "sfo"}));
        assert_eq!(updated["extattrs_all"]["Owner"], "infra");
        assert_eq!(updated["extattrs_all"][TRACKING_KEY], id);
    }

    #[tokio::test]
    async fn test_update_honours_removed_attribute() {
        let grid = MockGrid::new();
        let state = created(&grid, json!({"Site": "nyc", "Rack": "r1"})).await;

        let adapter = adapter();
        let plan = adapter
            .plan(Some(&state), config(json!({"Site": "nyc"})))
            .unwrap();
        let updated = adapter
            .update(&grid, state, plan.planned_state)
            .await
            .unwrap();

        assert_eq!(updated["extattrs"], json!({"Site": "nyc"}));
        assert!(updated["extattrs_all"].get("Rack").is_none());
        assert!(updated["extattrs_all"].get(TRACKING_KEY).is_some());
    }

    #[tokio::test]
    async fn test_update_does_not_send_force_new_attributes() {
        let grid = MockGrid::new();
        let state = created(&grid, json!({})).await;

        let adapter = adapter();
        let proposed = json!({
            "name": "dhcp-restart",
            "service": "DHCP",
            "comment": "nightly",
            "extattrs": {}
        });
        let plan = adapter.plan(Some(&state), proposed).unwrap();
        let updated = adapter
            .update(&grid, state, plan.planned_state)
            .await
            .unwrap();

        let sent = grid.last_body().unwrap();
        assert!(sent.get("service").is_none());
        assert_eq!(sent["comment"], "nightly");
        assert_eq!(updated["comment"], "nightly");
    }

    #[tokio::test]
    async fn test_read_follows_renamed_object() {
        let grid = MockGrid::new();
        let state = created(&grid, json!({"Site": "nyc"})).await;
        let moved = grid.rereference(state["ref"].as_str().unwrap()).unwrap();

        let refreshed = adapter().read(&grid, state).await.unwrap();
        assert_eq!(refreshed["ref"], moved);
        assert_eq!(refreshed["extattrs"], json!({"Site": "nyc"}));
    }

    #[tokio::test]
    async fn test_read_removed_object_returns_null() {
        let grid = MockGrid::new();
        let state = created(&grid, json!({"Site": "nyc"})).await;
        grid.remove(state["ref"].as_str().unwrap());

        let refreshed = adapter().read(&grid, state).await.unwrap();
        assert!(refreshed.is_null());
    }

    #[tokio::test]
    async fn test_delete_tolerates_missing_object() {
        let grid = MockGrid::new();
        let state = created(&grid, json!({})).await;
        let adapter = adapter();

        adapter.delete(&grid, state.clone()).await.unwrap();
        assert_eq!(grid.count(OBJECT), 0);

        adapter.delete(&grid, state).await.unwrap();
        assert_eq!(grid.delete_calls(), 2);
    }

    #[tokio::test]
    async fn test_delete_reports_other_failures() {
        let grid = MockGrid::new();
        let state = created(&grid, json!({})).await;
        let adapter = adapter();

        grid.fail_deletes_with(500);
        let err = adapter.delete(&grid, state.clone()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Api { status: 500, .. }));

        grid.fail_deletes_with(403);
        let err = adapter.delete(&grid, state).await.unwrap_err();
        assert!(matches!(err, ProviderError::PermissionDenied(_)));
        assert_eq!(grid.count(OBJECT), 1);
    }

    #[tokio::test]
    async fn test_import_stamps_and_declares_server_attributes() {
        let grid = MockGrid::new();
        let reference = grid.insert(
            OBJECT,
            json!({"name": "legacy", "service": "DNS", "extattrs": {"Site": {"value": "nyc"}}}),
        );

        let state = adapter().import(&grid, &reference).await.unwrap();
        assert_eq!(state["extattrs"], json!({"Site": "nyc"}));
        assert_eq!(state["name"], "legacy");
        assert!(state["extattrs_all"][TRACKING_KEY].is_string());

        let stored = grid.object(&reference).unwrap();
        assert!(stored["extattrs"][TRACKING_KEY]["value"].is_string());
        assert_eq!(grid.update_calls(), 1);
    }

    #[tokio::test]
    async fn test_import_keeps_existing_tracking_key() {
        let grid = MockGrid::new();
        let reference = grid.insert(
            OBJECT,
            json!({"name": "legacy", "extattrs": {TRACKING_KEY: {"value": "abc-123"}}}),
        );

        let state = adapter().import(&grid, &reference).await.unwrap();
        assert_eq!(state["extattrs_all"][TRACKING_KEY], "abc-123");
        assert_eq!(state["extattrs"], json!({}));
    }

    #[tokio::test]
    async fn test_import_missing_reference_fails() {
        let grid = MockGrid::new();
        let err = adapter()
            .import(&grid, "grid:servicerestart:group/missing:x")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(adapter().import(&grid, "").await.is_err());
    }

    #[tokio::test]
    async fn test_data_source_filters_and_hides_tracking_key() {
        let grid = MockGrid::new();
        grid.insert(
            OBJECT,
            json!({
                "name": "a",
                "extattrs": {"Site": {"value": "nyc"}, TRACKING_KEY: {"value": "1"}}
            }),
        );
        grid.insert(
            OBJECT,
            json!({"name": "b", "extattrs": {"Site": {"value": "sfo"}}}),
        );

        let found = adapter()
            .read_data_source(&grid, json!({"extattrfilters": {"Site": "nyc"}}))
            .await
            .unwrap();
        let result = found["result"].as_array().unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0]["name"], "a");
        assert_eq!(result[0]["extattrs"], json!({"Site": "nyc"}));
        assert_eq!(found["extattrfilters"], json!({"Site": "nyc"}));

        let all = adapter().read_data_source(&grid, json!({})).await.unwrap();
        assert_eq!(all["result"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_schema_has_managed_attributes() {
        let adapter = adapter();
        let schema = adapter.schema();
        assert!(schema.block.attributes[REF].flags.is_computed_only());
        assert!(schema.block.attributes[EXTATTRS].flags.optional);
        assert!(schema.block.attributes[EXTATTRS_ALL].flags.is_computed_only());
        assert!(adapter.options.return_fields.contains(&"extattrs".to_string()));
        let data_source = adapter.data_source_schema().unwrap();
        assert!(data_source.block.blocks["result"].computed);
    }
}
