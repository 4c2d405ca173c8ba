//! `grid_member`: an appliance (physical or virtual) joined to the Grid.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{
    bool_field, i64_field, nested, nested_list, put, put_nested, put_nested_list, str_field,
    GridResource,
};
use crate::error::ProviderError;
use crate::schema::{Attribute, Block, NestedBlock, Schema};

/// Grid member.
pub struct Member;

/// State model of a Grid member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberModel {
    /// Fully qualified host name; changing it replaces the member.
    pub host_name: Option<String>,
    /// Free-form comment.
    pub comment: Option<String>,
    /// IPV4, IPV6 or BOTH.
    pub config_addr_type: Option<String>,
    /// VNIOS, INFOBLOX or CLOUD.
    pub platform: Option<String>,
    /// ALL_V4, ALL_V6 or CUSTOM.
    pub service_type_configuration: Option<String>,
    /// Whether the member may be promoted to Grid Master.
    pub master_candidate: Option<bool>,
    /// Whether the member is an HA pair.
    pub enable_ha: Option<bool>,
    /// Upgrade group the member belongs to.
    pub upgrade_group: Option<String>,
    /// IPv4 network settings.
    pub vip_setting: Option<VipSetting>,
    /// BGP autonomous systems served by anycast.
    pub bgp_as: Option<Vec<BgpAs>>,
}

/// IPv4 network settings of a member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VipSetting {
    /// Interface address.
    pub address: Option<String>,
    /// Default gateway.
    pub gateway: Option<String>,
    /// Subnet mask.
    pub subnet_mask: Option<String>,
    /// Whether this is the primary interface.
    pub primary: Option<bool>,
    /// DSCP value.
    pub dscp: Option<i64>,
    /// Whether `dscp` overrides the Grid default.
    pub use_dscp: Option<bool>,
}

/// A BGP autonomous system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BgpAs {
    /// AS number.
    #[serde(rename = "as")]
    pub as_number: Option<i64>,
    /// Hold-down timer in seconds.
    pub holddown: Option<i64>,
    /// Keep-alive timer in seconds.
    pub keepalive: Option<i64>,
    /// Whether link detection is on.
    pub link_detect: Option<bool>,
    /// NONE or MD5.
    pub authentication_mode: Option<String>,
    /// BFD template name.
    pub bfd_template: Option<String>,
    /// Peers of this AS.
    pub neighbors: Option<Vec<BgpNeighbor>>,
}

/// A BGP peer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BgpNeighbor {
    /// LAN_HA or LAN2.
    pub interface: Option<String>,
    /// Peer address.
    pub neighbor_ip: Option<String>,
    /// Peer AS number.
    pub remote_as: Option<i64>,
    /// NONE or MD5.
    pub authentication_mode: Option<String>,
    /// Free-form comment.
    pub comment: Option<String>,
    /// Whether the peer is more than one hop away.
    pub multihop: Option<bool>,
    /// TTL for multi-hop sessions.
    pub multihop_ttl: Option<i64>,
    /// BFD template name.
    pub bfd_template: Option<String>,
    /// Whether BFD is on.
    pub enable_bfd: Option<bool>,
}

fn expand_vip(vip: &VipSetting) -> Map<String, Value> {
    let mut body = Map::new();
    put(&mut body, "address", &vip.address);
    put(&mut body, "gateway", &vip.gateway);
    put(&mut body, "subnet_mask", &vip.subnet_mask);
    put(&mut body, "primary", &vip.primary);
    put(&mut body, "dscp", &vip.dscp);
    put(&mut body, "use_dscp", &vip.use_dscp);
    body
}

fn flatten_vip(object: &Value) -> VipSetting {
    VipSetting {
        address: str_field(object, "address"),
        gateway: str_field(object, "gateway"),
        subnet_mask: str_field(object, "subnet_mask"),
        primary: bool_field(object, "primary"),
        dscp: i64_field(object, "dscp"),
        use_dscp: bool_field(object, "use_dscp"),
    }
}

fn expand_neighbor(neighbor: &BgpNeighbor) -> Map<String, Value> {
    let mut body = Map::new();
    put(&mut body, "interface", &neighbor.interface);
    put(&mut body, "neighbor_ip", &neighbor.neighbor_ip);
    put(&mut body, "remote_as", &neighbor.remote_as);
    put(&mut body, "authentication_mode", &neighbor.authentication_mode);
    put(&mut body, "comment", &neighbor.comment);
    put(&mut body, "multihop", &neighbor.multihop);
    put(&mut body, "multihop_ttl", &neighbor.multihop_ttl);
    put(&mut body, "bfd_template", &neighbor.bfd_template);
    put(&mut body, "enable_bfd", &neighbor.enable_bfd);
    body
}

fn flatten_neighbor(object: &Value) -> BgpNeighbor {
    BgpNeighbor {
        interface: str_field(object, "interface"),
        neighbor_ip: str_field(object, "neighbor_ip"),
        remote_as: i64_field(object, "remote_as"),
        authentication_mode: str_field(object, "authentication_mode"),
        comment: str_field(object, "comment"),
        multihop: bool_field(object, "multihop"),
        multihop_ttl: i64_field(object, "multihop_ttl"),
        bfd_template: str_field(object, "bfd_template"),
        enable_bfd: bool_field(object, "enable_bfd"),
    }
}

fn expand_bgp_as(bgp: &BgpAs) -> Map<String, Value> {
    let mut body = Map::new();
    put(&mut body, "as", &bgp.as_number);
    put(&mut body, "holddown", &bgp.holddown);
    put(&mut body, "keepalive", &bgp.keepalive);
    put(&mut body, "link_detect", &bgp.link_detect);
    put(&mut body, "authentication_mode", &bgp.authentication_mode);
    put(&mut body, "bfd_template", &bgp.bfd_template);
    put_nested_list(&mut body, "neighbors", &bgp.neighbors, expand_neighbor);
    body
}

fn flatten_bgp_as(object: &Value) -> BgpAs {
    BgpAs {
        as_number: i64_field(object, "as"),
        holddown: i64_field(object, "holddown"),
        keepalive: i64_field(object, "keepalive"),
        link_detect: bool_field(object, "link_detect"),
        authentication_mode: str_field(object, "authentication_mode"),
        bfd_template: str_field(object, "bfd_template"),
        neighbors: nested_list(object, "neighbors", flatten_neighbor),
    }
}

fn neighbor_block() -> Block {
    Block::new()
        .with_attribute("interface", Attribute::required_string())
        .with_attribute("neighbor_ip", Attribute::required_string())
        .with_attribute("remote_as", Attribute::optional_computed_int64())
        .with_attribute("authentication_mode", Attribute::optional_computed_string())
        .with_attribute("comment", Attribute::optional_computed_string())
        .with_attribute("multihop", Attribute::optional_computed_bool())
        .with_attribute("multihop_ttl", Attribute::optional_computed_int64())
        .with_attribute("bfd_template", Attribute::optional_computed_string())
        .with_attribute("enable_bfd", Attribute::optional_computed_bool())
}

fn bgp_as_block() -> Block {
    Block::new()
        .with_attribute("as", Attribute::optional_computed_int64())
        .with_attribute("holddown", Attribute::optional_computed_int64())
        .with_attribute("keepalive", Attribute::optional_computed_int64())
        .with_attribute("link_detect", Attribute::optional_computed_bool())
        .with_attribute("authentication_mode", Attribute::optional_computed_string())
        .with_attribute("bfd_template", Attribute::optional_computed_string())
        .with_block("neighbors", NestedBlock::list(neighbor_block()))
}

impl GridResource for Member {
    type Model = MemberModel;

    const TYPE_NAME: &'static str = "grid_member";
    const OBJECT_TYPE: &'static str = "member";
    const RETURN_FIELDS: &'static [&'static str] = &[
        "host_name",
        "comment",
        "config_addr_type",
        "platform",
        "service_type_configuration",
        "master_candidate",
        "enable_ha",
        "upgrade_group",
        "vip_setting",
        "bgp_as",
    ];

    fn schema() -> Schema {
        let vip = Block::new()
            .with_attribute("address", Attribute::optional_computed_string())
            .with_attribute("gateway", Attribute::optional_computed_string())
            .with_attribute("subnet_mask", Attribute::optional_computed_string())
            .with_attribute("primary", Attribute::optional_computed_bool())
            .with_attribute("dscp", Attribute::optional_computed_int64())
            .with_attribute("use_dscp", Attribute::optional_computed_bool());

        Schema::v0()
            .with_description("A Grid member")
            .with_attribute(
                "host_name",
                Attribute::required_string()
                    .with_description("Fully qualified host name of the member")
                    .with_force_new(),
            )
            .with_attribute("comment", Attribute::optional_computed_string())
            .with_attribute("config_addr_type", Attribute::optional_computed_string())
            .with_attribute("platform", Attribute::optional_computed_string())
            .with_attribute(
                "service_type_configuration",
                Attribute::optional_computed_string(),
            )
            .with_attribute("master_candidate", Attribute::optional_computed_bool())
            .with_attribute("enable_ha", Attribute::optional_computed_bool())
            .with_attribute("upgrade_group", Attribute::optional_computed_string())
            .with_block("vip_setting", NestedBlock::single(vip))
            .with_block("bgp_as", NestedBlock::list(bgp_as_block()))
    }

    fn expand(model: &MemberModel) -> Map<String, Value> {
        let mut body = Map::new();
        put(&mut body, "host_name", &model.host_name);
        put(&mut body, "comment", &model.comment);
        put(&mut body, "config_addr_type", &model.config_addr_type);
        put(&mut body, "platform", &model.platform);
        put(
            &mut body,
            "service_type_configuration",
            &model.service_type_configuration,
        );
        put(&mut body, "master_candidate", &model.master_candidate);
        put(&mut body, "enable_ha", &model.enable_ha);
        put(&mut body, "upgrade_group", &model.upgrade_group);
        put_nested(&mut body, "vip_setting", &model.vip_setting, expand_vip);
        put_nested_list(&mut body, "bgp_as", &model.bgp_as, expand_bgp_as);
        body
    }

    fn flatten(object: &Value) -> Result<MemberModel, ProviderError> {
        Ok(MemberModel {
            host_name: str_field(object, "host_name"),
            comment: str_field(object, "comment"),
            config_addr_type: str_field(object, "config_addr_type"),
            platform: str_field(object, "platform"),
            service_type_configuration: str_field(object, "service_type_configuration"),
            master_candidate: bool_field(object, "master_candidate"),
            enable_ha: bool_field(object, "enable_ha"),
            upgrade_group: str_field(object, "upgrade_group"),
            vip_setting: nested(object, "vip_setting", flatten_vip),
            bgp_as: nested_list(object, "bgp_as", flatten_bgp_as),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::adapter::{ResourceAdapter, ResourceHandler};
    use crate::testing::MockGrid;
    use serde_json::json;

    fn member_object() -> Value {
        json!({
            "_ref": "member/b25lLnZpcnR1YWxfbm9kZSQx:m1.example.com",
            "host_name": "m1.example.com",
            "config_addr_type": "IPV4",
            "platform": "VNIOS",
            "vip_setting": {
                "address": "10.0.0.2",
                "gateway": "10.0.0.1",
                "subnet_mask": "255.255.255.0",
                "primary": true,
                "dscp": 0,
                "use_dscp": false
            },
            "bgp_as": [{
                "as": 65001,
                "holddown": 16,
                "keepalive": 4,
                "link_detect": false,
                "neighbors": [{
                    "interface": "LAN_HA",
                    "neighbor_ip": "10.0.0.254",
                    "remote_as": 65002,
                    "multihop": false,
                    "enable_bfd": true
                }]
            }]
        })
    }

    #[test]
    fn test_flatten_nested_settings() {
        let model = Member::flatten(&member_object()).unwrap();
        let vip = model.vip_setting.as_ref().unwrap();
        assert_eq!(vip.address.as_deref(), Some("10.0.0.2"));
        assert_eq!(vip.primary, Some(true));

        let bgp = &model.bgp_as.as_ref().unwrap()[0];
        assert_eq!(bgp.as_number, Some(65001));
        let neighbor = &bgp.neighbors.as_ref().unwrap()[0];
        assert_eq!(neighbor.remote_as, Some(65002));
        assert_eq!(neighbor.enable_bfd, Some(true));
    }

    #[test]
    fn test_state_uses_as_key() {
        let model = Member::flatten(&member_object()).unwrap();
        let state = serde_json::to_value(&model).unwrap();
        assert_eq!(state["bgp_as"][0]["as"], 65001);
        assert!(state["bgp_as"][0].get("as_number").is_none());

        let back: MemberModel = serde_json::from_value(state).unwrap();
        assert_eq!(back, model);
    }

    #[test]
    fn test_expand_payload() {
        let model = Member::flatten(&member_object()).unwrap();
        let body = Value::Object(Member::expand(&model));
        assert_eq!(body["host_name"], "m1.example.com");
        assert_eq!(body["bgp_as"][0]["as"], 65001);
        assert_eq!(body["bgp_as"][0]["neighbors"][0]["neighbor_ip"], "10.0.0.254");
        assert_eq!(body["vip_setting"], member_object()["vip_setting"]);
        assert!(body.get("comment").is_none());
    }

    #[tokio::test]
    async fn test_host_name_change_replaces() {
        let grid = MockGrid::new();
        let adapter = ResourceAdapter::<Member>::new();
        let config = json!({
            "host_name": "m1.example.com",
            "vip_setting": {
                "address": "10.0.0.2",
                "gateway": "10.0.0.1",
                "subnet_mask": "255.255.255.0"
            }
        });
        let plan = adapter.plan(None, config).unwrap();
        let state = adapter.create(&grid, plan.planned_state).await.unwrap();
        assert_eq!(state["vip_setting"]["address"], "10.0.0.2");

        let renamed = json!({"host_name": "m2.example.com"});
        let plan = adapter.plan(Some(&state), renamed).unwrap();
        assert!(plan.requires_replace);
        assert_eq!(plan.planned_state["vip_setting"], state["vip_setting"]);

        let commented = json!({"host_name": "m1.example.com", "comment": "rack 4"});
        let plan = adapter.plan(Some(&state), commented).unwrap();
        assert!(!plan.requires_replace);
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.changes[0].path, "comment");
    }

    #[tokio::test]
    async fn test_server_defaults_in_nested_blocks_plan_no_changes() {
        let grid = MockGrid::new();
        let adapter = ResourceAdapter::<Member>::new();
        let config = json!({
            "host_name": "m1.example.com",
            "vip_setting": {
                "address": "10.0.0.2",
                "gateway": "10.0.0.1",
                "subnet_mask": "255.255.255.0"
            },
            "bgp_as": [{"as": 65001}]
        });

        let plan = adapter.plan(None, config.clone()).unwrap();
        let state = adapter.create(&grid, plan.planned_state).await.unwrap();
        let reference = state["ref"].as_str().unwrap();
        grid.patch(
            reference,
            json!({
                "vip_setting": {
                    "address": "10.0.0.2",
                    "gateway": "10.0.0.1",
                    "subnet_mask": "255.255.255.0",
                    "primary": true,
                    "dscp": 0,
                    "use_dscp": false
                },
                "bgp_as": [{"as": 65001, "holddown": 16, "keepalive": 4}]
            }),
        );

        let state = adapter.read(&grid, state).await.unwrap();
        assert_eq!(state["vip_setting"]["primary"], true);
        assert_eq!(state["bgp_as"][0]["keepalive"], 4);

        let plan = adapter.plan(Some(&state), config).unwrap();
        assert!(plan.changes.is_empty(), "unexpected changes: {:?}", plan.changes);
        assert_eq!(plan.planned_state["vip_setting"], state["vip_setting"]);

        let moved = json!({
            "host_name": "m1.example.com",
            "vip_setting": {
                "address": "10.0.0.3",
                "gateway": "10.0.0.1",
                "subnet_mask": "255.255.255.0"
            },
            "bgp_as": [{"as": 65001}]
        });
        let plan = adapter.plan(Some(&state), moved).unwrap();
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.changes[0].path, "vip_setting");
        assert_eq!(plan.planned_state["vip_setting"]["dscp"], 0);
        assert_eq!(plan.planned_state["vip_setting"]["address"], "10.0.0.3");
    }
}
