use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Week,
    Month,
    Year,
    All,
}

impl Period {
    pub fn from_key(key: &str) -> Option<Period> {
        match key.trim().to_ascii_lowercase().as_str() {
            "day" => Some(Period::Day),
            "week" => Some(Period::Week),
            "month" => Some(Period::Month),
            "year" => Some(Period::Year),
            "all" => Some(Period::All),
            _ => None,
        }
    }

    pub fn as_key(self) -> &'static str {
        match self {
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
            Period::Year => "year",
            Period::All => "all",
        }
    }

    /// Half-open wall-clock interval around `now`; `All` is unbounded.
    /// Anchored on the instant passed in, so selection changes must
    /// re-resolve.
    pub fn resolve(self, now: NaiveDateTime) -> Option<DateInterval> {
        let today = now.date();
        match self {
            Period::Day => {
                let start = midnight(today);
                Some(DateInterval {
                    start,
                    end: start + Duration::days(1),
                })
            }
            Period::Week => {
                let start = midnight(week_start(today));
                Some(DateInterval {
                    start,
                    end: start + Duration::days(7),
                })
            }
            Period::Month => {
                let start = first_of_month(today.year(), today.month());
                let end = if today.month() == 12 {
                    first_of_month(today.year() + 1, 1)
                } else {
                    first_of_month(today.year(), today.month() + 1)
                };
                Some(DateInterval {
                    start: midnight(start),
                    end: midnight(end),
                })
            }
            Period::Year => Some(DateInterval {
                start: midnight(first_of_month(today.year(), 1)),
                end: midnight(first_of_month(today.year() + 1, 1)),
            }),
            Period::All => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateInterval {
    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Calendar days spanning the interval, partial last day included.
    pub fn days(&self) -> Vec<NaiveDate> {
        let mut days = Vec::new();
        let mut day = self.start.date();
        while midnight(day) < self.end {
            days.push(day);
            let Some(next) = day.succ_opt() else {
                break;
            };
            day = next;
        }
        days
    }
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).expect("valid calendar date")
}
