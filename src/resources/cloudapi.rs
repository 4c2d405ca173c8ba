//! Cloud platform objects: `grid_cloudapi_tenant` and `grid_cloudapi_vm`.
//!
//! Both are mostly populated by the cloud adaptor that owns them; users set
//! the name and comment, everything else is read back.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{bool_field, i64_field, nested, put, str_field, GridResource};
use crate::error::ProviderError;
use crate::schema::{Attribute, Block, NestedBlock, Schema};

/// Ownership and delegation of a cloud object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudInfo {
    /// GM, NONE or CP.
    pub authority_type: Option<String>,
    /// NONE, RECLAIMABLE, ROOT or SUBTREE.
    pub delegated_scope: Option<String>,
    /// Cloud management platform.
    pub mgmt_platform: Option<String>,
    /// Whether the cloud adaptor owns the object.
    pub owned_by_adaptor: Option<bool>,
    /// ADAPTER, DELEGATED or NONE.
    pub usage: Option<String>,
    /// Tenant the object belongs to.
    pub tenant: Option<String>,
    /// Member the object is delegated to.
    pub delegated_member: Option<DelegatedMember>,
}

/// A member a cloud object is delegated to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DelegatedMember {
    /// Member host name.
    pub name: Option<String>,
    /// Member IPv4 address.
    pub ipv4addr: Option<String>,
    /// Member IPv6 address.
    pub ipv6addr: Option<String>,
}

fn flatten_delegated_member(object: &Value) -> DelegatedMember {
    DelegatedMember {
        name: str_field(object, "name"),
        ipv4addr: str_field(object, "ipv4addr"),
        ipv6addr: str_field(object, "ipv6addr"),
    }
}

fn flatten_cloud_info(object: &Value) -> CloudInfo {
    CloudInfo {
        authority_type: str_field(object, "authority_type"),
        delegated_scope: str_field(object, "delegated_scope"),
        mgmt_platform: str_field(object, "mgmt_platform"),
        owned_by_adaptor: bool_field(object, "owned_by_adaptor"),
        usage: str_field(object, "usage"),
        tenant: str_field(object, "tenant"),
        delegated_member: nested(object, "delegated_member", flatten_delegated_member),
    }
}

fn cloud_info_block() -> NestedBlock {
    let delegated_member = Block::new()
        .with_attribute("name", Attribute::computed_string())
        .with_attribute("ipv4addr", Attribute::computed_string())
        .with_attribute("ipv6addr", Attribute::computed_string());

    let cloud_info = Block::new()
        .with_description("Ownership and delegation of the object")
        .with_attribute("authority_type", Attribute::computed_string())
        .with_attribute("delegated_scope", Attribute::computed_string())
        .with_attribute("mgmt_platform", Attribute::computed_string())
        .with_attribute("owned_by_adaptor", Attribute::computed_bool())
        .with_attribute("usage", Attribute::computed_string())
        .with_attribute("tenant", Attribute::computed_string())
        .with_block(
            "delegated_member",
            NestedBlock::single(delegated_member).computed(),
        );

    NestedBlock::single(cloud_info).computed()
}

fn expand_named(name: &Option<String>, comment: &Option<String>) -> Map<String, Value> {
    let mut body = Map::new();
    put(&mut body, "name", name);
    put(&mut body, "comment", comment);
    body
}

// =========================================================================
// Tenant
// =========================================================================

/// Cloud tenant.
pub struct CloudApiTenant;

/// State model of a cloud tenant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenantModel {
    /// Tenant name.
    pub name: Option<String>,
    /// Free-form comment.
    pub comment: Option<String>,
    /// Identifier assigned by the cloud platform.
    pub id: Option<String>,
    /// Ownership and delegation.
    pub cloud_info: Option<CloudInfo>,
    /// Creation time, seconds since the epoch.
    pub created_ts: Option<i64>,
    /// Time of the last event, seconds since the epoch.
    pub last_event_ts: Option<i64>,
    /// Networks owned by the tenant.
    pub network_count: Option<i64>,
    /// Virtual machines owned by the tenant.
    pub vm_count: Option<i64>,
}

impl GridResource for CloudApiTenant {
    type Model = TenantModel;

    const TYPE_NAME: &'static str = "grid_cloudapi_tenant";
    const OBJECT_TYPE: &'static str = "grid:cloudapi:tenant";
    const RETURN_FIELDS: &'static [&'static str] = &[
        "name",
        "comment",
        "id",
        "cloud_info",
        "created_ts",
        "last_event_ts",
        "network_count",
        "vm_count",
    ];
    const EXTATTRS: bool = false;

    fn schema() -> Schema {
        Schema::v0()
            .with_description("A tenant of a cloud platform")
            .with_attribute(
                "name",
                Attribute::required_string().with_description("Name of the tenant"),
            )
            .with_attribute("comment", Attribute::optional_computed_string())
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("created_ts", Attribute::computed_int64())
            .with_attribute("last_event_ts", Attribute::computed_int64())
            .with_attribute("network_count", Attribute::computed_int64())
            .with_attribute("vm_count", Attribute::computed_int64())
            .with_block("cloud_info", cloud_info_block())
    }

    fn expand(model: &TenantModel) -> Map<String, Value> {
        expand_named(&model.name, &model.comment)
    }

    fn flatten(object: &Value) -> Result<TenantModel, ProviderError> {
        Ok(TenantModel {
            name: str_field(object, "name"),
            comment: str_field(object, "comment"),
            id: str_field(object, "id"),
            cloud_info: nested(object, "cloud_info", flatten_cloud_info),
            created_ts: i64_field(object, "created_ts"),
            last_event_ts: i64_field(object, "last_event_ts"),
            network_count: i64_field(object, "network_count"),
            vm_count: i64_field(object, "vm_count"),
        })
    }
}

// =========================================================================
// Virtual machine
// =========================================================================

/// Cloud virtual machine.
pub struct CloudApiVm;

/// State model of a cloud virtual machine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VmModel {
    /// VM name.
    pub name: Option<String>,
    /// Free-form comment.
    pub comment: Option<String>,
    /// Identifier assigned by the cloud platform.
    pub id: Option<String>,
    /// Availability zone.
    pub availability_zone: Option<String>,
    /// Guest host name.
    pub hostname: Option<String>,
    /// Guest operating system.
    pub operating_system: Option<String>,
    /// MAC address of the primary interface.
    pub primary_mac_address: Option<String>,
    /// Address of the subnet the VM sits in.
    pub subnet_address: Option<String>,
    /// Prefix length of that subnet.
    pub subnet_cidr: Option<i64>,
    /// Name of the owning tenant.
    pub tenant_name: Option<String>,
    /// Instance type.
    pub vm_type: Option<String>,
    /// Name of the VPC.
    pub vpc_name: Option<String>,
    /// Ownership and delegation.
    pub cloud_info: Option<CloudInfo>,
    /// First discovery, seconds since the epoch.
    pub first_seen: Option<i64>,
    /// Last discovery, seconds since the epoch.
    pub last_seen: Option<i64>,
    /// Networks the VM is attached to.
    pub network_count: Option<i64>,
}

impl GridResource for CloudApiVm {
    type Model = VmModel;

    const TYPE_NAME: &'static str = "grid_cloudapi_vm";
    const OBJECT_TYPE: &'static str = "grid:cloudapi:vm";
    const RETURN_FIELDS: &'static [&'static str] = &[
        "name",
        "comment",
        "id",
        "availability_zone",
        "hostname",
        "operating_system",
        "primary_mac_address",
        "subnet_address",
        "subnet_cidr",
        "tenant_name",
        "vm_type",
        "vpc_name",
        "cloud_info",
        "first_seen",
        "last_seen",
        "network_count",
    ];

    fn schema() -> Schema {
        let computed = [
            "id",
            "availability_zone",
            "hostname",
            "operating_system",
            "primary_mac_address",
            "subnet_address",
            "tenant_name",
            "vm_type",
            "vpc_name",
        ];
        let schema = Schema::v0()
            .with_description("A virtual machine of a cloud platform")
            .with_attribute(
                "name",
                Attribute::required_string().with_description("Name of the virtual machine"),
            )
            .with_attribute("comment", Attribute::optional_computed_string())
            .with_attribute("subnet_cidr", Attribute::computed_int64())
            .with_attribute("first_seen", Attribute::computed_int64())
            .with_attribute("last_seen", Attribute::computed_int64())
            .with_attribute("network_count", Attribute::computed_int64())
            .with_block("cloud_info", cloud_info_block());
        computed.into_iter().fold(schema, |schema, name| {
            schema.with_attribute(name, Attribute::computed_string())
        })
    }

    fn expand(model: &VmModel) -> Map<String, Value> {
        expand_named(&model.name, &model.comment)
    }

    fn flatten(object: &Value) -> Result<VmModel, ProviderError> {
        Ok(VmModel {
            name: str_field(object, "name"),
            comment: str_field(object, "comment"),
            id: str_field(object, "id"),
            availability_zone: str_field(object, "availability_zone"),
            hostname: str_field(object, "hostname"),
            operating_system: str_field(object, "operating_system"),
            primary_mac_address: str_field(object, "primary_mac_address"),
            subnet_address: str_field(object, "subnet_address"),
            subnet_cidr: i64_field(object, "subnet_cidr"),
            tenant_name: str_field(object, "tenant_name"),
            vm_type: str_field(object, "vm_type"),
            vpc_name: str_field(object, "vpc_name"),
            cloud_info: nested(object, "cloud_info", flatten_cloud_info),
            first_seen: i64_field(object, "first_seen"),
            last_seen: i64_field(object, "last_seen"),
            network_count: i64_field(object, "network_count"),
        })
    }
}
