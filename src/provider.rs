//! [`GridProvider`]: the [`ProviderService`] for Grid objects.
//!
//! The provider owns a [`ResourceRegistry`] built once at construction and,
//! after `configure`, a [`GridApi`] client shared by every operation.

use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::client::{GridApi, GridClient};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::resources::{ResourceHandler, ResourceRegistry};
use crate::schema::{Diagnostic, ProviderSchema};
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanResult};
use crate::validation;

/// Provider managing Grid objects over WAPI.
pub struct GridProvider {
    registry: ResourceRegistry,
    api: RwLock<Option<Arc<dyn GridApi>>>,
}

impl GridProvider {
    /// A provider that connects to the appliance on `configure`.
    pub fn new() -> Self {
        Self {
            registry: ResourceRegistry::standard(),
            api: RwLock::new(None),
        }
    }

    /// A provider already bound to an API client.
    pub fn with_api(api: Arc<dyn GridApi>) -> Self {
        Self {
            registry: ResourceRegistry::standard(),
            api: RwLock::new(Some(api)),
        }
    }

    /// The resource registry.
    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    fn api(&self) -> Result<Arc<dyn GridApi>, ProviderError> {
        let guard = self
            .api
            .read()
            .map_err(|_| ProviderError::FailedPrecondition("provider state poisoned".to_string()))?;
        guard.clone().ok_or_else(|| {
            ProviderError::FailedPrecondition("provider has not been configured".to_string())
        })
    }

    fn set_api(&self, api: Arc<dyn GridApi>) -> Result<(), ProviderError> {
        let mut guard = self
            .api
            .write()
            .map_err(|_| ProviderError::FailedPrecondition("provider state poisoned".to_string()))?;
        *guard = Some(api);
        Ok(())
    }

    fn handler(&self, resource_type: &str) -> Result<&dyn ResourceHandler, ProviderError> {
        self.registry.get(resource_type)
    }
}

impl Default for GridProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ProviderService for GridProvider {
    fn schema(&self) -> ProviderSchema {
        self.registry.provider_schema(ProviderConfig::schema())
    }

    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validation::validate(&ProviderConfig::schema(), &config))
    }

    #[instrument(skip_all)]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let config = match ProviderConfig::from_value(&config) {
            Ok(config) => config,
            Err(diagnostics) => return Ok(diagnostics),
        };
        let client = GridClient::new(&config)
            .map_err(|e| ProviderError::Configuration(format!("cannot build WAPI client: {}", e)))?;
        info!(host = %config.host_url, wapi_version = %config.wapi_version, "Provider configured");
        self.set_api(Arc::new(client))?;
        Ok(vec![])
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let handler = self.handler(resource_type)?;
        Ok(validation::validate(handler.schema(), &config))
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let plan = self
            .handler(resource_type)?
            .plan(prior_state.as_ref(), proposed_state)?;
        debug!(
            resource_type,
            changes = plan.changes.len(),
            requires_replace = plan.requires_replace,
            "Planned"
        );
        Ok(plan)
    }

    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let handler = self.handler(resource_type)?;
        handler.create(self.api()?.as_ref(), planned_state).await
    }

    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        let handler = self.handler(resource_type)?;
        handler.read(self.api()?.as_ref(), current_state).await
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let handler = self.handler(resource_type)?;
        handler
            .update(self.api()?.as_ref(), prior_state, planned_state)
            .await
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let handler = self.handler(resource_type)?;
        handler.delete(self.api()?.as_ref(), current_state).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let handler = self.handler(resource_type)?;
        let state = handler.import(self.api()?.as_ref(), id).await?;
        Ok(vec![ImportedResource::new(resource_type, state)])
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let handler = self.registry.data_source(data_source_type)?;
        Ok(handler
            .data_source_schema()
            .map(|schema| validation::validate(schema, &config))
            .unwrap_or_default())
    }

    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let handler = self.registry.data_source(data_source_type)?;
        handler.read_data_source(self.api()?.as_ref(), config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extattrs::TRACKING_KEY;
    use crate::testing::{
        assert_error_contains, assert_plan_changes_attribute, assert_plan_no_changes,
        assert_plan_replaces, MockGrid, ProviderTester, TestError,
    };
    use serde_json::json;

    const GROUP: &str = "grid_servicerestart_group";

    fn tester() -> (MockGrid, ProviderTester<GridProvider>) {
        let grid = MockGrid::new();
        let tester = ProviderTester::new(GridProvider::with_api(grid.shared()));
        (grid, tester)
    }

    #[test]
    fn test_metadata_lists_resources() {
        let (_, tester) = tester();
        assert_eq!(
            tester.resource_types(),
            vec![
                "grid_cloudapi_tenant",
                "grid_cloudapi_vm",
                "grid_dashboard",
                "grid_member",
                "grid_servicerestart_group",
            ]
        );
        let metadata = tester.provider().metadata();
        assert_eq!(
            metadata.data_sources,
            vec!["grid_cloudapi_vm", "grid_member", "grid_servicerestart_group"]
        );
        assert!(tester.provider().schema().provider.block.attributes["password"]
            .flags
            .sensitive);
    }

    #[test]
    fn test_validate_provider_config() {
        let provider = GridProvider::new();
        let diagnostics = tokio_test::block_on(provider.validate_provider_config(json!({
            "host_url": "https://gm.example.com",
            "timeout_secs": "soon"
        })))
        .unwrap();
        assert_error_contains(&diagnostics, "timeout_secs");

        let diagnostics = tokio_test::block_on(
            provider.validate_provider_config(json!({"wapi_version": "v2.12"})),
        )
        .unwrap();
        assert!(diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_operations_before_configure_fail() {
        let provider = GridProvider::new();
        let err = provider
            .read(GROUP, json!({"ref": "grid:servicerestart:group/x:y"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::FailedPrecondition(_)));
    }

    #[tokio::test]
    async fn test_configure_reports_invalid_settings() {
        let tester = ProviderTester::new(GridProvider::new());
        let err = tester
            .configure(json!({"host_url": "gm.example.com", "username": "admin", "password": "x"}))
            .await
            .unwrap_err();
        match err {
            TestError::Diagnostics(diagnostics) => {
                assert_error_contains(&diagnostics, "host_url");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_configure_builds_client() {
        let tester = ProviderTester::new(GridProvider::new());
        tester
            .configure(json!({
                "host_url": "https://gm.example.com",
                "username": "admin",
                "password": "secret"
            }))
            .await
            .unwrap();
        assert!(tester.provider().api().is_ok());
    }

    #[tokio::test]
    async fn test_validate_resource_config() {
        let (_, tester) = tester();
        tester
            .validate_resource_config(GROUP, json!({"name": "dhcp", "service": "DHCP"}))
            .await
            .unwrap();

        let diagnostics = tester
            .provider()
            .validate_resource_config(GROUP, json!({"name": "dhcp", "colour": "blue"}))
            .await
            .unwrap();
        assert_error_contains(&diagnostics, "Unsupported argument");
        assert_error_contains(&diagnostics, "service");

        let err = tester
            .provider()
            .validate_resource_config("grid_widget", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let (grid, tester) = tester();
        let initial = json!({"name": "dhcp", "service": "DHCP", "extattrs": {"Site": "nyc"}});
        let updated = json!({
            "name": "dhcp",
            "service": "DHCP",
            "comment": "nightly",
            "extattrs": {"Site": "sfo"}
        });

        let state = tester.lifecycle_crud(GROUP, initial, updated).await.unwrap();
        assert_eq!(state["comment"], "nightly");
        assert_eq!(state["extattrs"], json!({"Site": "sfo"}));
        assert!(state["extattrs_all"][TRACKING_KEY].is_string());
        assert_eq!(grid.count("grid:servicerestart:group"), 0);
    }

    #[tokio::test]
    async fn test_plans() {
        let (_, tester) = tester();
        let config = json!({"name": "dhcp", "service": "DHCP", "extattrs": {"Site": "nyc"}});
        let state = tester.lifecycle_create(GROUP, config.clone()).await.unwrap();

        let plan = tester.plan_update(GROUP, state.clone(), config).await.unwrap();
        assert_plan_no_changes(&plan);

        let moved = json!({"name": "dhcp", "service": "DNS", "extattrs": {"Site": "nyc"}});
        let plan = tester.plan_update(GROUP, state.clone(), moved).await.unwrap();
        assert_plan_replaces(&plan);

        let tagged = json!({"name": "dhcp", "service": "DHCP", "extattrs": {"Site": "sfo"}});
        let plan = tester.plan_update(GROUP, state, tagged).await.unwrap();
        assert_plan_changes_attribute(&plan, "extattrs");
        assert!(!plan.requires_replace);
    }

    #[tokio::test]
    async fn test_out_of_band_delete_drops_state() {
        let (grid, tester) = tester();
        let state = tester
            .lifecycle_create("grid_member", json!({"host_name": "m1.example.com"}))
            .await
            .unwrap();
        grid.remove(state["ref"].as_str().unwrap());

        let refreshed = tester.read("grid_member", state).await.unwrap();
        assert!(refreshed.is_null());
    }

    #[tokio::test]
    async fn test_import() {
        let (grid, tester) = tester();
        let reference = grid.insert(
            "member",
            json!({"host_name": "m1.example.com", "extattrs": {"Site": {"value": "nyc"}}}),
        );

        let imported = tester.import_resource("grid_member", &reference).await.unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].resource_type, "grid_member");
        assert_eq!(imported[0].state["extattrs"], json!({"Site": "nyc"}));
        assert_eq!(imported[0].state["ref"], reference);
    }

    #[tokio::test]
    async fn test_data_source() {
        let (grid, tester) = tester();
        grid.insert(
            "member",
            json!({"host_name": "m1.example.com", "extattrs": {"Site": {"value": "nyc"}}}),
        );
        grid.insert("member", json!({"host_name": "m2.example.com"}));

        let config = json!({"filters": {"host_name": "m2.example.com"}});
        let diagnostics = tester
            .provider()
            .validate_data_source_config("grid_member", config.clone())
            .await
            .unwrap();
        assert!(diagnostics.is_empty());

        let found = tester.read_data_source("grid_member", config).await.unwrap();
        let result = found["result"].as_array().unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0]["host_name"], "m2.example.com");

        let err = tester
            .read_data_source("grid_dashboard", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }
}
