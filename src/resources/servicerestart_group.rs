//! `grid_servicerestart_group`: a group of members whose DHCP or DNS
//! services restart together.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{
    bool_field, i64_field, nested, put, put_nested, str_field, str_list_field, GridResource,
};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, NestedBlock, Schema};

/// Service restart group.
pub struct ServiceRestartGroup;

/// State model of a service restart group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceRestartGroupModel {
    /// Group name.
    pub name: Option<String>,
    /// Free-form comment.
    pub comment: Option<String>,
    /// DHCP or DNS.
    pub service: Option<String>,
    /// Member host names.
    pub members: Option<Vec<String>>,
    /// Restart order.
    pub mode: Option<String>,
    /// Periodic restart, if any.
    pub recurring_schedule: Option<RecurringSchedule>,
    /// Whether this is the appliance's default group.
    pub is_default: Option<bool>,
    /// Order among the groups.
    pub position: Option<i64>,
}

/// Periodic restart of the group's services.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecurringSchedule {
    /// Services restarted.
    pub services: Option<Vec<String>>,
    /// Restart order.
    pub mode: Option<String>,
    /// Restart even when nothing changed.
    pub force: Option<bool>,
    /// When to restart.
    pub schedule: Option<ScheduleSetting>,
}

/// When a recurring restart runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSetting {
    /// DAILY, WEEKLY or MONTHLY.
    pub frequency: Option<String>,
    /// Days of a weekly schedule.
    pub weekdays: Option<Vec<String>>,
    /// Hour the restart runs at.
    pub hour_of_day: Option<i64>,
    /// Minute the restart runs at.
    pub minutes_past_hour: Option<i64>,
    /// Time zone of the schedule.
    pub time_zone: Option<String>,
    /// ONCE or RECUR.
    pub repeat: Option<String>,
    /// Whether the schedule is suspended.
    pub disable: Option<bool>,
}

fn expand_schedule(schedule: &ScheduleSetting) -> Map<String, Value> {
    let mut body = Map::new();
    put(&mut body, "frequency", &schedule.frequency);
    put(&mut body, "weekdays", &schedule.weekdays);
    put(&mut body, "hour_of_day", &schedule.hour_of_day);
    put(&mut body, "minutes_past_hour", &schedule.minutes_past_hour);
    put(&mut body, "time_zone", &schedule.time_zone);
    put(&mut body, "repeat", &schedule.repeat);
    put(&mut body, "disable", &schedule.disable);
    body
}

fn flatten_schedule(object: &Value) -> ScheduleSetting {
    ScheduleSetting {
        frequency: str_field(object, "frequency"),
        weekdays: str_list_field(object, "weekdays"),
        hour_of_day: i64_field(object, "hour_of_day"),
        minutes_past_hour: i64_field(object, "minutes_past_hour"),
        time_zone: str_field(object, "time_zone"),
        repeat: str_field(object, "repeat"),
        disable: bool_field(object, "disable"),
    }
}

fn expand_recurring(recurring: &RecurringSchedule) -> Map<String, Value> {
    let mut body = Map::new();
    put(&mut body, "services", &recurring.services);
    put(&mut body, "mode", &recurring.mode);
    put(&mut body, "force", &recurring.force);
    put_nested(&mut body, "schedule", &recurring.schedule, expand_schedule);
    body
}

fn flatten_recurring(object: &Value) -> RecurringSchedule {
    RecurringSchedule {
        services: str_list_field(object, "services"),
        mode: str_field(object, "mode"),
        force: bool_field(object, "force"),
        schedule: nested(object, "schedule", flatten_schedule),
    }
}

fn schedule_block() -> Block {
    Block::new()
        .with_attribute(
            "frequency",
            Attribute::required_string().with_description("DAILY, WEEKLY or MONTHLY"),
        )
        .with_attribute("weekdays", Attribute::optional_string_list())
        .with_attribute("hour_of_day", Attribute::optional_computed_int64())
        .with_attribute("minutes_past_hour", Attribute::optional_computed_int64())
        .with_attribute("time_zone", Attribute::optional_computed_string())
        .with_attribute("repeat", Attribute::optional_computed_string())
        .with_attribute("disable", Attribute::optional_computed_bool())
}

impl GridResource for ServiceRestartGroup {
    type Model = ServiceRestartGroupModel;

    const TYPE_NAME: &'static str = "grid_servicerestart_group";
    const OBJECT_TYPE: &'static str = "grid:servicerestart:group";
    const RETURN_FIELDS: &'static [&'static str] = &[
        "name",
        "comment",
        "service",
        "members",
        "mode",
        "recurring_schedule",
        "is_default",
        "position",
    ];

    fn schema() -> Schema {
        let recurring = Block::new()
            .with_attribute(
                "services",
                Attribute::new(
                    AttributeType::list(AttributeType::String),
                    AttributeFlags::optional(),
                ),
            )
            .with_attribute("mode", Attribute::optional_computed_string())
            .with_attribute("force", Attribute::optional_computed_bool())
            .with_block("schedule", NestedBlock::single(schedule_block()));

        Schema::v0()
            .with_description("A group of members whose services restart together")
            .with_attribute(
                "name",
                Attribute::required_string().with_description("Name of the restart group"),
            )
            .with_attribute("comment", Attribute::optional_computed_string())
            .with_attribute(
                "service",
                Attribute::required_string()
                    .with_description("Service restarted by the group: DHCP or DNS")
                    .with_force_new(),
            )
            .with_attribute(
                "members",
                Attribute::optional_string_list().with_description("Host names of the members"),
            )
            .with_attribute(
                "mode",
                Attribute::optional_computed_string()
                    .with_description("GROUPED, SEQUENTIAL or SIMULTANEOUS"),
            )
            .with_attribute("is_default", Attribute::computed_bool())
            .with_attribute("position", Attribute::computed_int64())
            .with_block("recurring_schedule", NestedBlock::single(recurring))
    }

    fn expand(model: &ServiceRestartGroupModel) -> Map<String, Value> {
        let mut body = Map::new();
        put(&mut body, "name", &model.name);
        put(&mut body, "comment", &model.comment);
        put(&mut body, "service", &model.service);
        put(&mut body, "members", &model.members);
        put(&mut body, "mode", &model.mode);
        put_nested(
            &mut body,
            "recurring_schedule",
            &model.recurring_schedule,
            expand_recurring,
        );
        body
    }

    fn flatten(object: &Value) -> Result<ServiceRestartGroupModel, ProviderError> {
        Ok(ServiceRestartGroupModel {
            name: str_field(object, "name"),
            comment: str_field(object, "comment"),
            service: str_field(object, "service"),
            members: str_list_field(object, "members"),
            mode: str_field(object, "mode"),
            recurring_schedule: nested(object, "recurring_schedule", flatten_recurring),
            is_default: bool_field(object, "is_default"),
            position: i64_field(object, "position"),
        })
    }
}
