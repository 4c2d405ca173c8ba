//! Grid Provider
//!
//! An infrastructure provider managing Grid configuration objects of a
//! network appliance through its REST API (WAPI). A plugin host drives it
//! through the [`ProviderService`] trait with JSON configuration and state
//! documents.
//!
//! # Overview
//!
//! - **Resources**: service restart groups, cloud tenants and virtual
//!   machines, Grid members and the Grid dashboard ([`resources`])
//! - **Extensible attributes**: the user's declared attributes are kept
//!   apart from inherited ones, and every managed object carries a tracking
//!   identifier ([`extattrs`])
//! - **Identity fallback**: a stale reference is recovered by searching for
//!   the tracking identifier ([`resolver`])
//! - **REST client**: [`GridApi`] and its `reqwest` implementation
//!   [`GridClient`]
//! - **Testing**: an in-memory appliance and a lifecycle harness
//!   ([`testing`])
//!
//! # Quick Start
//!
//! ```ignore
//! use grid_provider::{GridProvider, ProviderService};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     grid_provider::init_logging();
//!
//!     let provider = GridProvider::new();
//!     provider
//!         .configure(json!({
//!             "host_url": "https://gm.example.com",
//!             "username": "admin",
//!             "password": "infoblox",
//!         }))
//!         .await?;
//!
//!     let config = json!({
//!         "name": "dhcp-nightly",
//!         "service": "DHCP",
//!         "extattrs": {"Site": "nyc"},
//!     });
//!     let plan = provider
//!         .plan("grid_servicerestart_group", None, config.clone(), config)
//!         .await?;
//!     let state = provider
//!         .create("grid_servicerestart_group", plan.planned_state)
//!         .await?;
//!     println!("{}", state["ref"]);
//!     Ok(())
//! }
//! ```
//!
//! # State Conventions
//!
//! Every resource state carries `ref`, the appliance's reference for the
//! object. Resources with extensible attributes also carry `extattrs` (the
//! keys the user declared) and `extattrs_all` (everything the appliance
//! reported, the `Terraform Internal ID` tracking key included). A read that
//! returns `null` means the object is gone.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod extattrs;
pub mod logging;
pub mod provider;
pub mod resolver;
pub mod resources;
pub mod schema;
pub mod service;
pub mod testing;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use client::{ApiError, GridApi, GridClient, ListQuery, RequestOptions};
pub use config::ProviderConfig;
pub use error::ProviderError;
pub use extattrs::{AttributeMap, TRACKING_KEY};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::GridProvider;
pub use resources::{GridResource, ResourceRegistry};
pub use schema::ProviderSchema;
pub use service::ProviderService;
pub use types::{AttributeChange, ImportedResource, PlanResult, ProviderMetadata};
pub use validation::{validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
