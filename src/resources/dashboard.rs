//! `grid_dashboard`: the Grid-wide security dashboard thresholds.
//!
//! There is exactly one dashboard object per Grid. Creating the resource
//! takes over that object; destroying it leaves the object in place.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{i64_field, put, GridResource};
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};

/// Grid dashboard settings.
pub struct Dashboard;

const THRESHOLDS: [&str; 12] = [
    "analytics_tunneling_event_critical_threshold",
    "analytics_tunneling_event_warning_threshold",
    "atp_critical_event_critical_threshold",
    "atp_critical_event_warning_threshold",
    "atp_major_event_critical_threshold",
    "atp_major_event_warning_threshold",
    "atp_warning_event_critical_threshold",
    "atp_warning_event_warning_threshold",
    "rpz_blocked_hit_critical_threshold",
    "rpz_blocked_hit_warning_threshold",
    "rpz_substituted_hit_critical_threshold",
    "rpz_substituted_hit_warning_threshold",
];

/// State model of the dashboard: event counts at which each indicator
/// turns warning or critical.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardModel {
    pub analytics_tunneling_event_critical_threshold: Option<i64>,
    pub analytics_tunneling_event_warning_threshold: Option<i64>,
    pub atp_critical_event_critical_threshold: Option<i64>,
    pub atp_critical_event_warning_threshold: Option<i64>,
    pub atp_major_event_critical_threshold: Option<i64>,
    pub atp_major_event_warning_threshold: Option<i64>,
    pub atp_warning_event_critical_threshold: Option<i64>,
    pub atp_warning_event_warning_threshold: Option<i64>,
    pub rpz_blocked_hit_critical_threshold: Option<i64>,
    pub rpz_blocked_hit_warning_threshold: Option<i64>,
    pub rpz_substituted_hit_critical_threshold: Option<i64>,
    pub rpz_substituted_hit_warning_threshold: Option<i64>,
}

impl DashboardModel {
    fn thresholds(&self) -> [&Option<i64>; 12] {
        [
            &self.analytics_tunneling_event_critical_threshold,
            &self.analytics_tunneling_event_warning_threshold,
            &self.atp_critical_event_critical_threshold,
            &self.atp_critical_event_warning_threshold,
            &self.atp_major_event_critical_threshold,
            &self.atp_major_event_warning_threshold,
            &self.atp_warning_event_critical_threshold,
            &self.atp_warning_event_warning_threshold,
            &self.rpz_blocked_hit_critical_threshold,
            &self.rpz_blocked_hit_warning_threshold,
            &self.rpz_substituted_hit_critical_threshold,
            &self.rpz_substituted_hit_warning_threshold,
        ]
    }
}

impl GridResource for Dashboard {
    type Model = DashboardModel;

    const TYPE_NAME: &'static str = "grid_dashboard";
    const OBJECT_TYPE: &'static str = "grid:dashboard";
    const RETURN_FIELDS: &'static [&'static str] = &THRESHOLDS;
    const EXTATTRS: bool = false;
    const SINGLETON: bool = true;

    fn schema() -> Schema {
        THRESHOLDS.iter().fold(
            Schema::v0().with_description("Security dashboard thresholds of the Grid"),
            |schema, name| schema.with_attribute(*name, Attribute::optional_computed_int64()),
        )
    }

    fn expand(model: &DashboardModel) -> Map<String, Value> {
        let mut body = Map::new();
        for (name, value) in THRESHOLDS.iter().zip(model.thresholds()) {
            put(&mut body, name, value);
        }
        body
    }

    fn flatten(object: &Value) -> Result<DashboardModel, ProviderError> {
        Ok(DashboardModel {
            analytics_tunneling_event_critical_threshold: i64_field(
                object,
                "analytics_tunneling_event_critical_threshold",
            ),
            analytics_tunneling_event_warning_threshold: i64_field(
                object,
                "analytics_tunneling_event_warning_threshold",
            ),
            atp_critical_event_critical_threshold: i64_field(
                object,
                "atp_critical_event_critical_threshold",
            ),
            atp_critical_event_warning_threshold: i64_field(
                object,
                "atp_critical_event_warning_threshold",
            ),
            atp_major_event_critical_threshold: i64_field(
                object,
                "atp_major_event_critical_threshold",
            ),
            atp_major_event_warning_threshold: i64_field(
                object,
                "atp_major_event_warning_threshold",
            ),
            atp_warning_event_critical_threshold: i64_field(
                object,
                "atp_warning_event_critical_threshold",
            ),
            atp_warning_event_warning_threshold: i64_field(
                object,
                "atp_warning_event_warning_threshold",
            ),
            rpz_blocked_hit_critical_threshold: i64_field(
                object,
                "rpz_blocked_hit_critical_threshold",
            ),
            rpz_blocked_hit_warning_threshold: i64_field(
                object,
                "rpz_blocked_hit_warning_threshold",
            ),
            rpz_substituted_hit_critical_threshold: i64_field(
                object,
                "rpz_substituted_hit_critical_threshold",
            ),
            rpz_substituted_hit_warning_threshold: i64_field(
                object,
                "rpz_substituted_hit_warning_threshold",
            ),
        })
    }
}
