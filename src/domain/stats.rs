use crate::domain::models::{EventDetail, EventRecord, SportType, SPORT_ORDER};
use crate::domain::period::{week_start, DateInterval, Period};
use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::collections::BTreeMap;

/// Read-only view of one sport event, normalized for aggregation: a
/// missing duration falls back to the start/end span, a missing distance
/// to zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SportActivity {
    pub sport_type: SportType,
    pub start: NaiveDateTime,
    pub duration_min: i64,
    pub distance_km: f64,
}

impl SportActivity {
    pub fn from_record(record: &EventRecord) -> Option<SportActivity> {
        let EventDetail::Sport {
            sport_type,
            duration_min,
            distance_km,
            ..
        } = &record.detail
        else {
            return None;
        };

        let span_minutes = (record.end - record.start).num_minutes().max(0);
        Some(SportActivity {
            sport_type: *sport_type,
            start: record.start,
            duration_min: duration_min.unwrap_or(span_minutes),
            distance_km: distance_km.unwrap_or(0.0),
        })
    }
}

pub fn sport_activities(records: &[EventRecord]) -> Vec<SportActivity> {
    records.iter().filter_map(SportActivity::from_record).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SportFilter {
    All,
    Only(SportType),
}

impl SportFilter {
    pub fn from_key(key: &str) -> Option<SportFilter> {
        match key.trim().to_ascii_uppercase().as_str() {
            "ALL" => Some(SportFilter::All),
            "RUNNING" => Some(SportFilter::Only(SportType::Running)),
            "CYCLING" => Some(SportFilter::Only(SportType::Cycling)),
            "SWIMMING" => Some(SportFilter::Only(SportType::Swimming)),
            "OTHER" => Some(SportFilter::Only(SportType::Other)),
            _ => None,
        }
    }

    pub fn matches(self, sport_type: SportType) -> bool {
        match self {
            SportFilter::All => true,
            SportFilter::Only(only) => only == sport_type,
        }
    }
}

pub fn select(
    activities: &[SportActivity],
    interval: Option<&DateInterval>,
    filter: SportFilter,
) -> Vec<SportActivity> {
    activities
        .iter()
        .filter(|activity| filter.matches(activity.sport_type))
        .filter(|activity| interval.map(|window| window.contains(activity.start)).unwrap_or(true))
        .copied()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedBucket {
    pub label: String,
    pub value: f64,
}

/// Trend series bucketed by the granularity the period dictates: calendar
/// days for day/week/month, ISO weeks for year, data-bearing months for
/// all. Day/week buckets are zero-seeded so gaps plot as zero.
pub fn trend_series(
    activities: &[SportActivity],
    period: Period,
    interval: Option<&DateInterval>,
) -> Vec<AggregatedBucket> {
    if activities.is_empty() {
        return Vec::new();
    }

    match period {
        Period::Day | Period::Week | Period::Month => {
            let Some(interval) = interval else {
                return Vec::new();
            };
            let days = interval.days();
            let mut sums: BTreeMap<chrono::NaiveDate, f64> =
                days.iter().map(|day| (*day, 0.0)).collect();
            for activity in activities {
                if let Some(sum) = sums.get_mut(&activity.start.date()) {
                    *sum += activity.distance_km;
                }
            }
            days.iter()
                .map(|day| AggregatedBucket {
                    label: day.format("%-d.%-m.").to_string(),
                    value: round2(sums[day]),
                })
                .collect()
        }
        Period::Year => {
            let Some(interval) = interval else {
                return Vec::new();
            };
            let mut sums: BTreeMap<(i32, u32), f64> = BTreeMap::new();
            let mut monday = week_start(interval.start.date());
            while monday.and_time(NaiveTime::MIN) < interval.end {
                let iso = monday.iso_week();
                sums.insert((iso.year(), iso.week()), 0.0);
                monday = monday + Duration::days(7);
            }
            for activity in activities {
                let iso = activity.start.date().iso_week();
                if let Some(sum) = sums.get_mut(&(iso.year(), iso.week())) {
                    *sum += activity.distance_km;
                }
            }
            sums.into_iter()
                .map(|((_, week), value)| AggregatedBucket {
                    label: format!("W{week:02}"),
                    value: round2(value),
                })
                .collect()
        }
        Period::All => {
            let mut sums: BTreeMap<String, f64> = BTreeMap::new();
            for activity in activities {
                let key = activity.start.format("%Y-%m").to_string();
                *sums.entry(key).or_insert(0.0) += activity.distance_km;
            }
            sums.into_iter()
                .map(|(label, value)| AggregatedBucket {
                    label,
                    value: round2(value),
                })
                .collect()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Totals {
    pub distance_km: f64,
    pub duration_min: i64,
    pub activities: usize,
}

pub fn totals(activities: &[SportActivity]) -> Totals {
    Totals {
        distance_km: activities.iter().map(|activity| activity.distance_km).sum(),
        duration_min: activities.iter().map(|activity| activity.duration_min).sum(),
        activities: activities.len(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SportMinutes {
    pub sport_type: SportType,
    pub minutes: i64,
}

pub fn duration_by_sport(activities: &[SportActivity]) -> Vec<SportMinutes> {
    SPORT_ORDER
        .iter()
        .map(|sport_type| SportMinutes {
            sport_type: *sport_type,
            minutes: minutes_for(activities, *sport_type),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SportShare {
    pub sport_type: SportType,
    pub minutes: i64,
    pub percent: i64,
}

/// Share of total time per sport. The divisor is floored to 1 so an empty
/// or zero-duration selection reports all-zero percentages instead of
/// dividing by zero.
pub fn distribution(activities: &[SportActivity]) -> Vec<SportShare> {
    let total: i64 = SPORT_ORDER
        .iter()
        .map(|sport_type| minutes_for(activities, *sport_type))
        .sum();
    let divisor = total.max(1);

    SPORT_ORDER
        .iter()
        .map(|sport_type| {
            let minutes = minutes_for(activities, *sport_type);
            SportShare {
                sport_type: *sport_type,
                minutes,
                percent: ((100.0 * minutes as f64) / divisor as f64).round() as i64,
            }
        })
        .collect()
}

fn minutes_for(activities: &[SportActivity], sport_type: SportType) -> i64 {
    activities
        .iter()
        .filter(|activity| activity.sport_type == sport_type)
        .map(|activity| activity.duration_min)
        .sum()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
