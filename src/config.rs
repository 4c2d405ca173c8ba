//! Provider configuration.
//!
//! The host passes the provider block as JSON to `configure`. Any of the
//! connection settings may instead come from the environment, which keeps
//! credentials out of configuration files.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::schema::{Attribute, Diagnostic, Schema};

/// Environment variable consulted when `host_url` is not configured.
pub const ENV_HOST_URL: &str = "GRID_HOST_URL";
/// Environment variable consulted when `username` is not configured.
pub const ENV_USERNAME: &str = "GRID_USERNAME";
/// Environment variable consulted when `password` is not configured.
pub const ENV_PASSWORD: &str = "GRID_PASSWORD";
/// Environment variable consulted when `wapi_version` is not configured.
pub const ENV_WAPI_VERSION: &str = "GRID_WAPI_VERSION";

/// WAPI version used when none is configured.
pub const DEFAULT_WAPI_VERSION: &str = "v2.13.6";
/// Request timeout used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    host_url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    wapi_version: Option<String>,
    insecure_skip_verify: Option<bool>,
    timeout_secs: Option<u64>,
}

/// Resolved connection settings for the appliance.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Base URL of the Grid Master, e.g. `https://gm.example.com`.
    pub host_url: String,
    /// WAPI user name.
    pub username: String,
    /// WAPI password.
    pub password: String,
    /// WAPI version segment of every request path.
    pub wapi_version: String,
    /// Accept self-signed appliance certificates.
    pub insecure_skip_verify: bool,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("host_url", &self.host_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("wapi_version", &self.wapi_version)
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProviderConfig {
    /// Schema of the provider configuration block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_description("Connection settings for the Grid Master")
            .with_attribute(
                "host_url",
                Attribute::optional_string()
                    .with_description(format!("Grid Master URL. Falls back to {}", ENV_HOST_URL)),
            )
            .with_attribute(
                "username",
                Attribute::optional_string()
                    .with_description(format!("WAPI user. Falls back to {}", ENV_USERNAME)),
            )
            .with_attribute(
                "password",
                Attribute::optional_string()
                    .sensitive()
                    .with_description(format!("WAPI password. Falls back to {}", ENV_PASSWORD)),
            )
            .with_attribute(
                "wapi_version",
                Attribute::optional_string().with_description(format!(
                    "WAPI version. Falls back to {}, then {}",
                    ENV_WAPI_VERSION, DEFAULT_WAPI_VERSION
                )),
            )
            .with_attribute(
                "insecure_skip_verify",
                Attribute::optional_computed_bool(),
            )
            .with_attribute("timeout_secs", Attribute::optional_computed_int64())
    }

    /// Resolve configuration from the provider block and the process environment.
    pub fn from_value(config: &Value) -> Result<Self, Vec<Diagnostic>> {
        Self::resolve(config, |name| std::env::var(name).ok())
    }

    /// Resolve configuration with an explicit environment lookup.
    pub fn resolve<F>(config: &Value, env: F) -> Result<Self, Vec<Diagnostic>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: RawConfig = match config {
            Value::Null => RawConfig::default(),
            other => serde_json::from_value(other.clone()).map_err(|e| {
                vec![Diagnostic::error("Invalid provider configuration").with_detail(e.to_string())]
            })?,
        };

        let mut diagnostics = Vec::new();
        let mut required = |value: Option<String>, attribute: &str, env_name: &str| {
            match value.or_else(|| env(env_name)).filter(|v| !v.is_empty()) {
                Some(v) => v,
                None => {
                    diagnostics.push(
                        Diagnostic::error(format!("Missing provider setting '{}'", attribute))
                            .with_detail(format!(
                                "Set '{}' in the provider block or the {} environment variable",
                                attribute, env_name
                            ))
                            .with_attribute(attribute),
                    );
                    String::new()
                }
            }
        };

        let host_url = required(raw.host_url, "host_url", ENV_HOST_URL);
        let username = required(raw.username, "username", ENV_USERNAME);
        let password = required(raw.password, "password", ENV_PASSWORD);

        if !host_url.is_empty()
            && !(host_url.starts_with("http://") || host_url.starts_with("https://"))
        {
            diagnostics.push(
                Diagnostic::error("Invalid provider setting 'host_url'")
                    .with_detail(format!("'{}' is not an http(s) URL", host_url))
                    .with_attribute("host_url"),
            );
        }

        if raw.timeout_secs == Some(0) {
            diagnostics.push(
                Diagnostic::error("Invalid provider setting 'timeout_secs'")
                    .with_detail("The request timeout must be at least one second")
                    .with_attribute("timeout_secs"),
            );
        }

        if !diagnostics.is_empty() {
            return Err(diagnostics);
        }

        let wapi_version = raw
            .wapi_version
            .or_else(|| env(ENV_WAPI_VERSION))
            .unwrap_or_else(|| DEFAULT_WAPI_VERSION.to_string());

        Ok(Self {
            host_url: host_url.trim_end_matches('/').to_string(),
            username,
            password,
            wapi_version,
            insecure_skip_verify: raw.insecure_skip_verify.unwrap_or(false),
            timeout: Duration::from_secs(raw.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        })
    }

    /// Root of every WAPI request, e.g. `https://gm.example.com/wapi/v2.13.6`.
    pub fn base_url(&self) -> String {
        format!("{}/wapi/{}", self.host_url, self.wapi_version)
    }
}
