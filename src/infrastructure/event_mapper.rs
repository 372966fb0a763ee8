use crate::domain::models::{
    parse_kilometers, parse_minutes, Category, EventDetail, EventOverrides, EventRecord, SportType,
};
use chrono::NaiveDateTime;

pub const WIRE_MINUTE_FORMAT: &str = "%Y-%m-%dT%H:%M";

const WIRE_PARSE_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WireEvent {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub category: Option<String>,
    pub all_day: Option<bool>,
    pub duration: Option<f64>,
    pub distance: Option<f64>,
    pub sport_description: Option<String>,
    pub sport_type: Option<String>,
    pub file_path: Option<String>,
    pub notifications: Option<Vec<u32>>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WirePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    pub description: String,
    pub start_time: String,
    pub end_time: String,
    pub category: Category,
    pub all_day: bool,
    pub duration: Option<i64>,
    pub distance: Option<f64>,
    pub sport_description: Option<String>,
    pub sport_type: Option<SportType>,
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications: Option<Vec<u32>>,
}

/// Normalizes an event plus a partial edit into the wire shape. The
/// resolved category alone decides which field group survives: switching
/// away from SPORT nulls every sport field even if stale values linger in
/// the base record.
pub fn build_payload(base: &EventRecord, overrides: &EventOverrides) -> WirePayload {
    let category = overrides.category.unwrap_or(base.category);
    let start = overrides.start.unwrap_or(base.start);
    let end = overrides.end.unwrap_or(base.end);

    let description;
    let all_day;
    let duration;
    let distance;
    let sport_description;
    let sport_type;

    if category.is_sport() {
        let text = overrides
            .sport_description
            .clone()
            .or_else(|| base.sport_description().map(ToOwned::to_owned))
            .unwrap_or_default();
        duration = match overrides.duration.as_deref() {
            Some(raw) => parse_minutes(raw),
            None => base.duration_min(),
        };
        distance = match overrides.distance.as_deref() {
            Some(raw) => parse_kilometers(raw),
            None => base.distance_km(),
        };
        sport_type = Some(overrides.sport_type.or(base.sport_type()).unwrap_or(SportType::Other));
        description = text.clone();
        sport_description = Some(text);
        all_day = false;
    } else {
        description = overrides
            .description
            .clone()
            .or_else(|| base.description().map(ToOwned::to_owned))
            .unwrap_or_default();
        all_day = overrides.all_day.unwrap_or(base.all_day());
        duration = None;
        distance = None;
        sport_description = None;
        sport_type = None;
    }

    WirePayload {
        id: base.id,
        title: overrides.title.clone().unwrap_or_else(|| base.title.clone()),
        description,
        start_time: start.format(WIRE_MINUTE_FORMAT).to_string(),
        end_time: end.format(WIRE_MINUTE_FORMAT).to_string(),
        category,
        all_day,
        duration,
        distance,
        sport_description,
        sport_type,
        file_path: overrides.file_path.clone().or_else(|| base.file_path.clone()),
        notifications: overrides.notifications.clone(),
    }
}

/// Maps one collaborator event into the in-memory model. Records whose
/// timestamps do not parse are dropped, not surfaced as partial data.
pub fn decode_wire_event(event: &WireEvent) -> Option<EventRecord> {
    let start = parse_wire_timestamp(event.start_time.as_deref()?)?;
    let end = parse_wire_timestamp(event.end_time.as_deref()?)?;

    let category = event
        .category
        .as_deref()
        .map(Category::from_wire)
        .unwrap_or(Category::Other);

    let detail = if category.is_sport() {
        EventDetail::Sport {
            sport_type: event
                .sport_type
                .as_deref()
                .map(SportType::from_wire)
                .unwrap_or(SportType::Other),
            duration_min: event.duration.map(|minutes| minutes.round() as i64),
            distance_km: event.distance,
            description: event
                .sport_description
                .clone()
                .or_else(|| event.description.clone())
                .unwrap_or_default(),
        }
    } else {
        EventDetail::Plain {
            description: event.description.clone().unwrap_or_default(),
            all_day: event.all_day.unwrap_or(false),
        }
    };

    Some(EventRecord {
        id: event.id,
        title: event.title.clone().unwrap_or_default(),
        category,
        start,
        end,
        detail,
        file_path: event.file_path.clone(),
        notifications: event.notifications.clone().unwrap_or_default(),
    })
}

fn parse_wire_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    WIRE_PARSE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
}
