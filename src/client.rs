//! REST client for the appliance's WAPI.
//!
//! [`GridApi`] is the seam the resource adapters talk to; [`GridClient`] is
//! the `reqwest` implementation and [`crate::testing::MockGrid`] an
//! in-memory one for tests.
//!
//! # Request layout
//!
//! - create / list: `{base}/{object_type}`
//! - get / update / delete: `{base}/{reference}`
//! - field selection: `_return_fields+=a,b,c`
//! - response shape: `_return_as_object=1` wraps every body as `{"result": ...}`
//! - extensible attribute search: `*<name>=<value>`

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::ProviderConfig;

/// Errors raised by a [`GridApi`] call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The appliance answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, usually the WAPI error document.
        body: String,
    },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether the appliance reported the object as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }
}

/// Field selection and response shape for a single call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Fields returned in addition to the object's defaults.
    pub return_fields: Vec<String>,
    /// Ask for the `{"result": ...}` envelope.
    pub return_as_object: bool,
}

impl RequestOptions {
    /// Options requesting the given fields wrapped in a result envelope.
    pub fn with_fields(fields: &[&str]) -> Self {
        Self {
            return_fields: fields.iter().map(|f| f.to_string()).collect(),
            return_as_object: true,
        }
    }

    fn query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if !self.return_fields.is_empty() {
            query.push(("_return_fields+".to_string(), self.return_fields.join(",")));
        }
        if self.return_as_object {
            query.push(("_return_as_object".to_string(), "1".to_string()));
        }
        query
    }
}

/// Search criteria for [`GridApi::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Plain field filters, `name=value`.
    pub fields: Vec<(String, String)>,
    /// Extensible attribute filters, `*name=value`.
    pub extattrs: Vec<(String, String)>,
}

impl ListQuery {
    /// An empty query matching every object of the type.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field filter.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Add an extensible attribute filter.
    pub fn extattr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extattrs.push((name.into(), value.into()));
        self
    }

    fn query(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .cloned()
            .chain(
                self.extattrs
                    .iter()
                    .map(|(name, value)| (format!("*{}", name), value.clone())),
            )
            .collect()
    }
}

/// Operations the adapters need from the appliance.
///
/// Every call is a single blocking round-trip; nothing is retried.
#[async_trait::async_trait]
pub trait GridApi: Send + Sync {
    /// Create an object and return it.
    async fn create(
        &self,
        object_type: &str,
        body: &Value,
        options: &RequestOptions,
    ) -> Result<Value, ApiError>;

    /// Fetch an object by reference.
    async fn get(&self, reference: &str, options: &RequestOptions) -> Result<Value, ApiError>;

    /// Update an object by reference and return it.
    async fn update(
        &self,
        reference: &str,
        body: &Value,
        options: &RequestOptions,
    ) -> Result<Value, ApiError>;

    /// Delete an object by reference.
    async fn delete(&self, reference: &str) -> Result<(), ApiError>;

    /// Search objects of a type.
    async fn list(
        &self,
        object_type: &str,
        query: &ListQuery,
        options: &RequestOptions,
    ) -> Result<Vec<Value>, ApiError>;
}

/// WAPI client over HTTPS with basic authentication.
#[derive(Debug, Clone)]
pub struct GridClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl GridClient {
    /// Build a client from resolved provider configuration.
    pub fn new(config: &ProviderConfig) -> Result<Self, ApiError> {
        if config.insecure_skip_verify {
            warn!(host = %config.host_url, "TLS certificate verification disabled");
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, ApiError> {
        let response = request
            .basic_auth(&self.username, Some(&self.password))
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), body = %body, "WAPI request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Strip the `{"result": ...}` envelope when it was requested.
fn unwrap_result(body: Value, options: &RequestOptions) -> Value {
    match body {
        Value::Object(mut map) if options.return_as_object && map.contains_key("result") => {
            map.remove("result").unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[async_trait::async_trait]
impl GridApi for GridClient {
    #[instrument(skip(self, body, options), fields(object_type = %object_type))]
    async fn create(
        &self,
        object_type: &str,
        body: &Value,
        options: &RequestOptions,
    ) -> Result<Value, ApiError> {
        let request = self
            .http
            .post(self.url(object_type))
            .query(&options.query())
            .json(body);
        Ok(unwrap_result(self.send(request).await?, options))
    }

    #[instrument(skip(self, options), fields(reference = %reference))]
    async fn get(&self, reference: &str, options: &RequestOptions) -> Result<Value, ApiError> {
        let request = self.http.get(self.url(reference)).query(&options.query());
        Ok(unwrap_result(self.send(request).await?, options))
    }

    #[instrument(skip(self, body, options), fields(reference = %reference))]
    async fn update(
        &self,
        reference: &str,
        body: &Value,
        options: &RequestOptions,
    ) -> Result<Value, ApiError> {
        let request = self
            .http
            .put(self.url(reference))
            .query(&options.query())
            .json(body);
        Ok(unwrap_result(self.send(request).await?, options))
    }

    #[instrument(skip(self), fields(reference = %reference))]
    async fn delete(&self, reference: &str) -> Result<(), ApiError> {
        self.send(self.http.delete(self.url(reference))).await?;
        Ok(())
    }

    #[instrument(skip(self, query, options), fields(object_type = %object_type))]
    async fn list(
        &self,
        object_type: &str,
        query: &ListQuery,
        options: &RequestOptions,
    ) -> Result<Vec<Value>, ApiError> {
        let request = self
            .http
            .get(self.url(object_type))
            .query(&query.query())
            .query(&options.query());
        match unwrap_result(self.send(request).await?, options) {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            other => Err(ApiError::Decode(format!("expected a list, got {}", other))),
        }
    }
}
