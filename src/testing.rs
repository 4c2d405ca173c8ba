//! Testing utilities for the provider.
//!
//! - [`MockGrid`]: an in-memory [`GridApi`] that assigns references, honours
//!   field and extensible attribute filters, and records call counts.
//! - [`ProviderTester`]: drives a [`ProviderService`] through plan and CRUD
//!   lifecycles without a plugin host.
//!
//! # Example
//!
//! ```ignore
//! use grid_provider::testing::{MockGrid, ProviderTester};
//! use grid_provider::GridProvider;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn creates_a_group() {
//!     let grid = MockGrid::new();
//!     let tester = ProviderTester::new(GridProvider::with_api(grid.shared()));
//!
//!     let state = tester
//!         .lifecycle_create("grid_servicerestart_group", json!({"name": "dhcp", "service": "DHCP"}))
//!         .await
//!         .unwrap();
//!     assert!(state["ref"].is_string());
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{Map, Value};

use crate::client::{ApiError, GridApi, ListQuery, RequestOptions};
use crate::error::ProviderError;
use crate::extattrs;
use crate::schema::{has_errors, Diagnostic};
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanResult};

// =========================================================================
// In-memory appliance
// =========================================================================

#[derive(Debug, Default)]
struct GridState {
    objects: BTreeMap<String, (String, Map<String, Value>)>,
    next_id: u64,
    inherited: Vec<(String, String)>,
    list_failure: Option<u16>,
    delete_failure: Option<u16>,
    get_calls: usize,
    list_calls: usize,
    update_calls: usize,
    delete_calls: usize,
    last_body: Option<Value>,
}

/// In-memory stand-in for the appliance.
///
/// Clones share the same store, so a test can keep one handle for
/// inspection and give another to the provider.
#[derive(Debug, Clone, Default)]
pub struct MockGrid {
    state: Arc<Mutex<GridState>>,
}

impl MockGrid {
    /// Create an empty appliance.
    pub fn new() -> Self {
        Self::default()
    }

    /// A shared handle suitable for [`crate::GridProvider::with_api`].
    pub fn shared(&self) -> Arc<dyn GridApi> {
        Arc::new(self.clone())
    }

    fn lock(&self) -> MutexGuard<'_, GridState> {
        // A panic in another test thread must not cascade.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store an object directly, returning its reference.
    pub fn insert(&self, object_type: &str, object: Value) -> String {
        let mut state = self.lock();
        let fields = object.as_object().cloned().unwrap_or_default();
        store(&mut state, object_type, fields)
    }

    /// Remove an object out of band.
    pub fn remove(&self, reference: &str) -> Option<Value> {
        self.lock()
            .objects
            .remove(reference)
            .map(|(_, fields)| Value::Object(fields))
    }

    /// Move an object to a new reference out of band, as a rename does.
    pub fn rereference(&self, reference: &str) -> Option<String> {
        let mut state = self.lock();
        let (object_type, fields) = state.objects.remove(reference)?;
        Some(store(&mut state, &object_type, fields))
    }

    /// The stored object for a reference, `_ref` included.
    pub fn object(&self, reference: &str) -> Option<Value> {
        self.lock()
            .objects
            .get(reference)
            .map(|(_, fields)| with_ref(reference, fields))
    }

    /// Set an extensible attribute on a stored object, as inheritance would.
    pub fn set_extattr(&self, reference: &str, name: &str, value: &str) {
        let mut state = self.lock();
        if let Some((_, fields)) = state.objects.get_mut(reference) {
            let entry = fields
                .entry("extattrs".to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(attrs) = entry {
                attrs.insert(name.to_string(), serde_json::json!({ "value": value }));
            }
        }
    }

    /// Attributes the appliance adds to every created object.
    pub fn inherit_on_create(&self, name: &str, value: &str) {
        self.lock()
            .inherited
            .push((name.to_string(), value.to_string()));
    }

    /// Overwrite top-level fields of a stored object, as appliance defaults do.
    pub fn patch(&self, reference: &str, changes: Value) {
        let mut state = self.lock();
        if let (Some((_, fields)), Value::Object(changes)) =
            (state.objects.get_mut(reference), changes)
        {
            fields.extend(changes);
        }
    }

    /// Make every subsequent list call fail with the given HTTP status.
    pub fn fail_lists_with(&self, status: u16) {
        self.lock().list_failure = Some(status);
    }

    /// Make every subsequent delete call fail with the given HTTP status.
    pub fn fail_deletes_with(&self, status: u16) {
        self.lock().delete_failure = Some(status);
    }

    /// Number of objects of a type.
    pub fn count(&self, object_type: &str) -> usize {
        self.lock()
            .objects
            .values()
            .filter(|(kind, _)| kind == object_type)
            .count()
    }

    /// Number of get calls served.
    pub fn get_calls(&self) -> usize {
        self.lock().get_calls
    }

    /// Number of list calls served.
    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }

    /// Number of update calls served.
    pub fn update_calls(&self) -> usize {
        self.lock().update_calls
    }

    /// Number of delete calls served.
    pub fn delete_calls(&self) -> usize {
        self.lock().delete_calls
    }

    /// Body of the most recent create or update.
    pub fn last_body(&self) -> Option<Value> {
        self.lock().last_body.clone()
    }
}

fn store(state: &mut GridState, object_type: &str, fields: Map<String, Value>) -> String {
    state.next_id += 1;
    let label = fields
        .get("name")
        .or_else(|| fields.get("host_name"))
        .and_then(Value::as_str)
        .unwrap_or(object_type)
        .to_string();
    let reference = format!("{}/ZG5zLm9iamVjdCQ{}:{}", object_type, state.next_id, label);
    state
        .objects
        .insert(reference.clone(), (object_type.to_string(), fields));
    reference
}

fn with_ref(reference: &str, fields: &Map<String, Value>) -> Value {
    let mut object = fields.clone();
    object.insert("_ref".to_string(), Value::String(reference.to_string()));
    Value::Object(object)
}

fn not_found(reference: &str) -> ApiError {
    ApiError::Status {
        status: 404,
        body: format!("AdmConDataNotFoundError: Reference {} not found", reference),
    }
}

fn matches_query(fields: &Map<String, Value>, query: &ListQuery) -> bool {
    let plain = query.fields.iter().all(|(name, expected)| {
        fields.get(name).and_then(Value::as_str) == Some(expected.as_str())
    });
    let attrs = extattrs::from_wire(fields.get("extattrs")).unwrap_or_default();
    let extended = query
        .extattrs
        .iter()
        .all(|(name, expected)| attrs.get(name) == Some(expected));
    plain && extended
}

#[async_trait::async_trait]
impl GridApi for MockGrid {
    async fn create(
        &self,
        object_type: &str,
        body: &Value,
        _options: &RequestOptions,
    ) -> Result<Value, ApiError> {
        let mut state = self.lock();
        state.last_body = Some(body.clone());
        let mut fields = body
            .as_object()
            .cloned()
            .ok_or_else(|| ApiError::Decode("body must be an object".to_string()))?;
        if !state.inherited.is_empty() {
            let entry = fields
                .entry("extattrs".to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(attrs) = entry {
                for (name, value) in &state.inherited {
                    attrs
                        .entry(name.clone())
                        .or_insert_with(|| serde_json::json!({ "value": value }));
                }
            }
        }
        let reference = store(&mut state, object_type, fields);
        let (_, stored) = &state.objects[&reference];
        Ok(with_ref(&reference, stored))
    }

    async fn get(&self, reference: &str, _options: &RequestOptions) -> Result<Value, ApiError> {
        let mut state = self.lock();
        state.get_calls += 1;
        state
            .objects
            .get(reference)
            .map(|(_, fields)| with_ref(reference, fields))
            .ok_or_else(|| not_found(reference))
    }

    async fn update(
        &self,
        reference: &str,
        body: &Value,
        _options: &RequestOptions,
    ) -> Result<Value, ApiError> {
        let mut state = self.lock();
        state.update_calls += 1;
        state.last_body = Some(body.clone());
        let (_, fields) = state
            .objects
            .get_mut(reference)
            .ok_or_else(|| not_found(reference))?;
        if let Some(changes) = body.as_object() {
            for (name, value) in changes {
                fields.insert(name.clone(), value.clone());
            }
        }
        let updated = with_ref(reference, fields);
        Ok(updated)
    }

    async fn delete(&self, reference: &str) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.delete_calls += 1;
        if let Some(status) = state.delete_failure {
            return Err(ApiError::Status {
                status,
                body: "delete failed".to_string(),
            });
        }
        state
            .objects
            .remove(reference)
            .map(|_| ())
            .ok_or_else(|| not_found(reference))
    }

    async fn list(
        &self,
        object_type: &str,
        query: &ListQuery,
        _options: &RequestOptions,
    ) -> Result<Vec<Value>, ApiError> {
        let mut state = self.lock();
        state.list_calls += 1;
        if let Some(status) = state.list_failure {
            return Err(ApiError::Status {
                status,
                body: "list failed".to_string(),
            });
        }
        Ok(state
            .objects
            .iter()
            .filter(|(_, (kind, fields))| kind == object_type && matches_query(fields, query))
            .map(|(reference, (_, fields))| with_ref(reference, fields))
            .collect())
    }
}

// =========================================================================
// Provider harness
// =========================================================================

/// A test harness for [`ProviderService`] implementations.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Configure the provider, failing on error diagnostics.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Validate a resource configuration, failing on error diagnostics.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, config.clone(), config)
            .await
    }

    /// Plan an update from prior state to a new configuration.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), config.clone(), config)
            .await
    }

    /// Create an object.
    pub async fn create(
        &self,
        resource_type: &str,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned).await
    }

    /// Refresh an object's state.
    pub async fn read(&self, resource_type: &str, state: Value) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, state).await
    }

    /// Update an object.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.update(resource_type, prior_state, planned).await
    }

    /// Delete an object.
    pub async fn delete(&self, resource_type: &str, state: Value) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, state).await
    }

    /// Import an object by reference.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Read a data source.
    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read_data_source(data_source_type, config).await
    }

    /// Plan, create, then read back.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self.plan_create(resource_type, config).await?;
        let created = self.create(resource_type, plan.planned_state).await?;
        self.read(resource_type, created).await
    }

    /// Plan an update, apply it, then read back.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self
            .plan_update(resource_type, prior_state.clone(), config)
            .await?;
        let updated = self
            .update(resource_type, prior_state, plan.planned_state)
            .await?;
        self.read(resource_type, updated).await
    }

    /// Create, update, then delete; returns the state after the update.
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<Value, ProviderError> {
        let created = self.lifecycle_create(resource_type, initial_config).await?;
        let updated = self
            .lifecycle_update(resource_type, created, updated_config)
            .await?;
        self.delete(resource_type, updated.clone()).await?;
        Ok(updated)
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    if has_errors(&diagnostics) {
        Err(TestError::Diagnostics(
            diagnostics.into_iter().filter(Diagnostic::is_error).collect(),
        ))
    } else {
        Ok(())
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that a plan indicates no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan requires replacement.
///
/// # Panics
///
/// Panics if the plan does not require replacement.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, but it does not"
    );
}

/// Assert that a plan changes a specific attribute.
///
/// # Panics
///
/// Panics if the plan does not change the attribute.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    assert!(
        plan.changes.iter().any(|c| c.path == path),
        "Expected plan to change attribute '{}'. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain an error with the given summary substring.
///
/// # Panics
///
/// Panics if no error diagnostic contains the substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    assert!(
        diagnostics
            .iter()
            .any(|d| d.is_error() && d.summary.contains(substring)),
        "Expected an error containing '{}'. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}
