use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const NOTIFY_LEAD_MINUTES: [u32; 8] = [5, 15, 30, 60, 120, 1440, 2880, 10080];
pub const DEFAULT_NOTIFY_LEAD: u32 = 60;

const DEFAULT_SLOT_MINUTES: i64 = 30;
const FALLBACK_SPAN_MINUTES: i64 = 60;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Sport,
    Work,
    School,
    Rest,
    Other,
}

impl Category {
    pub fn is_sport(self) -> bool {
        matches!(self, Category::Sport)
    }

    pub fn from_wire(value: &str) -> Category {
        match value.trim().to_ascii_uppercase().as_str() {
            "SPORT" => Category::Sport,
            "WORK" => Category::Work,
            "SCHOOL" => Category::School,
            "REST" => Category::Rest,
            _ => Category::Other,
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            Category::Sport => "SPORT",
            Category::Work => "WORK",
            Category::School => "SCHOOL",
            Category::Rest => "REST",
            Category::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SportType {
    Running,
    Cycling,
    Swimming,
    Other,
}

pub const SPORT_ORDER: [SportType; 4] = [
    SportType::Running,
    SportType::Cycling,
    SportType::Swimming,
    SportType::Other,
];

impl SportType {
    pub fn from_wire(value: &str) -> SportType {
        match value.trim().to_ascii_uppercase().as_str() {
            "RUNNING" => SportType::Running,
            "CYCLING" => SportType::Cycling,
            "SWIMMING" => SportType::Swimming,
            _ => SportType::Other,
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            SportType::Running => "RUNNING",
            SportType::Cycling => "CYCLING",
            SportType::Swimming => "SWIMMING",
            SportType::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum EventDetail {
    Sport {
        sport_type: SportType,
        duration_min: Option<i64>,
        distance_km: Option<f64>,
        description: String,
    },
    Plain {
        description: String,
        all_day: bool,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventRecord {
    pub id: Option<i64>,
    pub title: String,
    pub category: Category,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub detail: EventDetail,
    pub file_path: Option<String>,
    pub notifications: Vec<u32>,
}

impl EventRecord {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.title, "event.title")?;
        if self.category.is_sport() != matches!(self.detail, EventDetail::Sport { .. }) {
            return Err("event.detail must match event.category".to_string());
        }
        validate_notifications(&self.notifications, "event.notifications")?;
        Ok(())
    }

    pub fn all_day(&self) -> bool {
        match &self.detail {
            EventDetail::Sport { .. } => false,
            EventDetail::Plain { all_day, .. } => *all_day,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match &self.detail {
            EventDetail::Plain { description, .. } => Some(description),
            EventDetail::Sport { .. } => None,
        }
    }

    pub fn sport_description(&self) -> Option<&str> {
        match &self.detail {
            EventDetail::Sport { description, .. } => Some(description),
            EventDetail::Plain { .. } => None,
        }
    }

    pub fn sport_type(&self) -> Option<SportType> {
        match &self.detail {
            EventDetail::Sport { sport_type, .. } => Some(*sport_type),
            EventDetail::Plain { .. } => None,
        }
    }

    pub fn duration_min(&self) -> Option<i64> {
        match &self.detail {
            EventDetail::Sport { duration_min, .. } => *duration_min,
            EventDetail::Plain { .. } => None,
        }
    }

    pub fn distance_km(&self) -> Option<f64> {
        match &self.detail {
            EventDetail::Sport { distance_km, .. } => *distance_km,
            EventDetail::Plain { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub category: Category,
    pub all_day: bool,
    pub duration: String,
    pub distance: String,
    pub sport_description: String,
    pub sport_type: SportType,
    pub file_path: Option<String>,
    pub notifications: Vec<u32>,
}

impl EventDraft {
    pub fn for_slot(start: NaiveDateTime, end: NaiveDateTime) -> EventDraft {
        EventDraft {
            title: String::new(),
            description: String::new(),
            start,
            end,
            category: Category::Other,
            all_day: false,
            duration: String::new(),
            distance: String::new(),
            sport_description: String::new(),
            sport_type: SportType::Other,
            file_path: None,
            notifications: vec![DEFAULT_NOTIFY_LEAD],
        }
    }

    pub fn from_record(record: &EventRecord) -> EventDraft {
        EventDraft {
            title: record.title.clone(),
            description: record.description().unwrap_or_default().to_string(),
            start: record.start,
            end: record.end,
            category: record.category,
            all_day: record.all_day(),
            duration: record
                .duration_min()
                .map(|minutes| minutes.to_string())
                .unwrap_or_default(),
            distance: record
                .distance_km()
                .map(|km| km.to_string())
                .unwrap_or_default(),
            sport_description: record.sport_description().unwrap_or_default().to_string(),
            sport_type: record.sport_type().unwrap_or(SportType::Other),
            file_path: record.file_path.clone(),
            notifications: record.notifications.clone(),
        }
    }

    pub fn set_category(&mut self, category: Category) {
        self.category = category;
        if category.is_sport() {
            self.all_day = false;
        }
    }

    pub fn set_duration(&mut self, raw: &str) {
        self.duration = raw.to_string();
        if let Some(minutes) = parse_minutes(raw) {
            self.end = self.start + Duration::minutes(minutes);
        }
    }

    pub fn set_start(&mut self, new_start: NaiveDateTime) {
        if let Some(minutes) = parse_minutes(&self.duration) {
            self.start = new_start;
            self.end = new_start + Duration::minutes(minutes);
            return;
        }

        // Keep an end the user picked by hand; only the untouched default
        // slot span is re-derived.
        let span_minutes = (self.end - self.start).num_minutes();
        let manually_changed_end = (span_minutes - DEFAULT_SLOT_MINUTES).abs() > 1;
        if !manually_changed_end {
            self.end = new_start + Duration::minutes(FALLBACK_SPAN_MINUTES);
        }
        self.start = new_start;
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.title, "event.title")?;
        validate_notifications(&self.notifications, "event.notifications")?;
        Ok(())
    }

    pub fn to_record(&self, id: Option<i64>) -> EventRecord {
        let detail = if self.category.is_sport() {
            EventDetail::Sport {
                sport_type: self.sport_type,
                duration_min: parse_minutes(&self.duration),
                distance_km: parse_kilometers(&self.distance),
                description: self.sport_description.clone(),
            }
        } else {
            EventDetail::Plain {
                description: self.description.clone(),
                all_day: self.all_day,
            }
        };

        EventRecord {
            id,
            title: self.title.trim().to_string(),
            category: self.category,
            start: self.start,
            end: self.end,
            detail,
            file_path: self.file_path.clone(),
            notifications: self.notifications.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventOverrides {
    pub title: Option<String>,
    pub category: Option<Category>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub all_day: Option<bool>,
    pub description: Option<String>,
    pub sport_description: Option<String>,
    pub sport_type: Option<SportType>,
    pub duration: Option<String>,
    pub distance: Option<String>,
    pub file_path: Option<String>,
    pub notifications: Option<Vec<u32>>,
}

impl EventOverrides {
    pub fn times(start: NaiveDateTime, end: NaiveDateTime) -> EventOverrides {
        EventOverrides {
            start: Some(start),
            end: Some(end),
            ..EventOverrides::default()
        }
    }

    pub fn from_draft(draft: &EventDraft) -> EventOverrides {
        EventOverrides {
            title: Some(draft.title.clone()),
            category: Some(draft.category),
            start: Some(draft.start),
            end: Some(draft.end),
            all_day: Some(draft.all_day),
            description: Some(draft.description.clone()),
            sport_description: Some(draft.sport_description.clone()),
            sport_type: Some(draft.sport_type),
            duration: Some(draft.duration.clone()),
            distance: Some(draft.distance.clone()),
            file_path: draft.file_path.clone(),
            notifications: Some(draft.notifications.clone()),
        }
    }
}

pub fn parse_minutes(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|minutes| minutes.is_finite())
        .map(|minutes| minutes.round() as i64)
}

pub fn parse_kilometers(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|km| km.is_finite())
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

fn validate_notifications(values: &[u32], field_name: &str) -> Result<(), String> {
    for value in values {
        if !NOTIFY_LEAD_MINUTES.contains(value) {
            return Err(format!("{field_name} contains unsupported lead time {value}"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fixed_time(value: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M").expect("valid datetime")
    }

    fn sample_sport_record() -> EventRecord {
        EventRecord {
            id: Some(1),
            title: "Morning run".to_string(),
            category: Category::Sport,
            start: fixed_time("2024-06-03T08:00"),
            end: fixed_time("2024-06-03T08:30"),
            detail: EventDetail::Sport {
                sport_type: SportType::Running,
                duration_min: Some(30),
                distance_km: Some(5.0),
                description: "easy pace".to_string(),
            },
            file_path: None,
            notifications: vec![60],
        }
    }

    fn sample_plain_record() -> EventRecord {
        EventRecord {
            id: Some(2),
            title: "Team meeting".to_string(),
            category: Category::Work,
            start: fixed_time("2024-06-03T10:00"),
            end: fixed_time("2024-06-03T11:00"),
            detail: EventDetail::Plain {
                description: "weekly sync".to_string(),
                all_day: false,
            },
            file_path: None,
            notifications: vec![15, 60],
        }
    }

    #[test]
    fn validate_accepts_coherent_records() {
        assert!(sample_sport_record().validate().is_ok());
        assert!(sample_plain_record().validate().is_ok());
    }

    #[test]
    fn validate_rejects_detail_category_mismatch() {
        let mut record = sample_sport_record();
        record.category = Category::Rest;
        assert!(record.validate().is_err());
    }

    #[test]
    fn validate_rejects_unsupported_lead_time() {
        let mut record = sample_plain_record();
        record.notifications = vec![60, 42];
        assert!(record.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_title() {
        let mut record = sample_plain_record();
        record.title = "   ".to_string();
        assert!(record.validate().is_err());
    }

    #[test]
    fn sport_records_are_never_all_day() {
        assert!(!sample_sport_record().all_day());
    }

    #[test]
    fn for_slot_defaults_to_single_reminder() {
        let draft =
            EventDraft::for_slot(fixed_time("2024-06-03T08:00"), fixed_time("2024-06-03T08:30"));
        assert_eq!(draft.category, Category::Other);
        assert_eq!(draft.notifications, vec![DEFAULT_NOTIFY_LEAD]);
        assert!(!draft.all_day);
    }

    #[test]
    fn switching_to_sport_clears_all_day() {
        let mut draft =
            EventDraft::for_slot(fixed_time("2024-06-03T08:00"), fixed_time("2024-06-03T08:30"));
        draft.all_day = true;
        draft.set_category(Category::Sport);
        assert!(!draft.all_day);

        draft.all_day = true;
        draft.set_category(Category::Rest);
        assert!(draft.all_day);
    }

    #[test]
    fn set_duration_rederives_end() {
        let mut draft =
            EventDraft::for_slot(fixed_time("2024-06-03T08:00"), fixed_time("2024-06-03T08:30"));
        draft.set_duration("45");
        assert_eq!(draft.end, fixed_time("2024-06-03T08:45"));

        draft.set_duration("not-a-number");
        assert_eq!(draft.end, fixed_time("2024-06-03T08:45"));
    }

    #[test]
    fn set_start_keeps_explicit_duration() {
        let mut draft =
            EventDraft::for_slot(fixed_time("2024-06-03T08:00"), fixed_time("2024-06-03T08:30"));
        draft.set_duration("30");
        draft.set_start(fixed_time("2024-06-03T09:00"));
        assert_eq!(draft.end, fixed_time("2024-06-03T09:30"));
    }

    #[test]
    fn set_start_rederives_untouched_slot_span() {
        let mut draft =
            EventDraft::for_slot(fixed_time("2024-06-03T08:00"), fixed_time("2024-06-03T08:30"));
        draft.set_start(fixed_time("2024-06-03T09:00"));
        assert_eq!(draft.end, fixed_time("2024-06-03T10:00"));
    }

    #[test]
    fn set_start_preserves_manually_chosen_end() {
        let mut draft =
            EventDraft::for_slot(fixed_time("2024-06-03T08:00"), fixed_time("2024-06-03T08:30"));
        draft.end = fixed_time("2024-06-03T11:15");
        draft.set_start(fixed_time("2024-06-03T09:00"));
        assert_eq!(draft.end, fixed_time("2024-06-03T11:15"));
    }

    #[test]
    fn to_record_parses_sport_fields() {
        let mut draft =
            EventDraft::for_slot(fixed_time("2024-06-03T08:00"), fixed_time("2024-06-03T08:30"));
        draft.title = "Intervals".to_string();
        draft.set_category(Category::Sport);
        draft.sport_type = SportType::Cycling;
        draft.duration = "90".to_string();
        draft.distance = "oops".to_string();

        let record = draft.to_record(None);
        assert_eq!(record.sport_type(), Some(SportType::Cycling));
        assert_eq!(record.duration_min(), Some(90));
        assert_eq!(record.distance_km(), None);
        assert!(record.validate().is_ok());
    }

    #[test]
    fn wire_parsing_is_lenient_about_unknown_values() {
        assert_eq!(Category::from_wire("sport"), Category::Sport);
        assert_eq!(Category::from_wire("whatever"), Category::Other);
        assert_eq!(SportType::from_wire(" swimming "), SportType::Swimming);
        assert_eq!(SportType::from_wire(""), SportType::Other);
    }

    proptest! {
        #[test]
        fn duration_edits_always_rederive_end(minutes in 1i64..10_000i64) {
            let mut draft = EventDraft::for_slot(
                fixed_time("2024-06-03T08:00"),
                fixed_time("2024-06-03T08:30"),
            );
            draft.set_duration(&minutes.to_string());
            prop_assert_eq!((draft.end - draft.start).num_minutes(), minutes);
            prop_assert!(draft.end >= draft.start);
        }
    }
}
