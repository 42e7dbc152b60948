//! Per-fetch context: who is looking, and which dates are in range.

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::entity::{Entity, UserId};

/// Identity a fetch is performed for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Viewer {
    /// System or superuser fetch. No visibility checks at all.
    #[default]
    Unrestricted,
    User(UserId),
}

impl Viewer {
    pub fn user(name: impl Into<String>) -> Self {
        Viewer::User(UserId::new(name))
    }
}

/// Transient fetch parameters, threaded through every resolution step.
#[derive(Debug, Clone, Default)]
pub struct FetchContext {
    pub viewer: Viewer,
    pub date_range: Option<DateRange>,
}

impl FetchContext {
    pub fn unrestricted() -> Self {
        Self::default()
    }

    pub fn for_user(name: impl Into<String>) -> Self {
        Self {
            viewer: Viewer::user(name),
            date_range: None,
        }
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }
}

/// Restriction of the base entity set on one date attribute.
///
/// Bounds are whole days: `start` counts from 00:00:00 and `end` runs up
/// to 23:59:59, both inclusive. A missing bound is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub field: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(field: impl Into<String>, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self {
            field: field.into(),
            start,
            end,
        }
    }

    pub fn lower_bound(&self) -> Option<NaiveDateTime> {
        self.start.and_then(|d| d.and_hms_opt(0, 0, 0))
    }

    pub fn upper_bound(&self) -> Option<NaiveDateTime> {
        self.end.and_then(|d| d.and_hms_opt(23, 59, 59))
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.lower_bound().map_or(true, |lo| at >= lo)
            && self.upper_bound().map_or(true, |hi| at <= hi)
    }

    /// Whether the entity's `field` falls in the range. Entities without a
    /// date in that field never match.
    pub fn matches(&self, entity: &Entity) -> bool {
        entity
            .field(&self.field)
            .as_datetime()
            .is_some_and(|at| self.contains(at))
    }

    /// Build a range from a named relative period, evaluated against `today`.
    pub fn for_period(field: impl Into<String>, period: Period, today: NaiveDate) -> Self {
        let (start, end) = period.bounds(today);
        Self::new(field, Some(start), Some(end))
    }
}

/// Named relative periods accepted by the date-range restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    CurrentYear,
    PreviousYear,
    CurrentQuarter,
    PreviousQuarter,
    CurrentMonth,
    PreviousMonth,
    /// The last `n` days, today included.
    LastDays(u32),
}

impl Period {
    /// Parse `current_year`, `previous_month`, `last_30_days`, ...
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "current_year" => Some(Period::CurrentYear),
            "previous_year" => Some(Period::PreviousYear),
            "current_quarter" => Some(Period::CurrentQuarter),
            "previous_quarter" => Some(Period::PreviousQuarter),
            "current_month" => Some(Period::CurrentMonth),
            "previous_month" => Some(Period::PreviousMonth),
            other => other
                .strip_prefix("last_")
                .and_then(|rest| rest.strip_suffix("_days"))
                .and_then(|n| n.parse().ok())
                .filter(|n| *n > 0)
                .map(Period::LastDays),
        }
    }

    /// First and last day of the period.
    pub fn bounds(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            Period::CurrentYear => year_bounds(today.year()),
            Period::PreviousYear => year_bounds(today.year() - 1),
            Period::CurrentMonth => month_bounds(first_of_month(today)),
            Period::PreviousMonth => month_bounds(shift_months(first_of_month(today), -1)),
            Period::CurrentQuarter => quarter_bounds(first_of_quarter(today)),
            Period::PreviousQuarter => quarter_bounds(shift_months(first_of_quarter(today), -3)),
            Period::LastDays(n) => {
                let start = today
                    .checked_sub_days(Days::new(u64::from(n.saturating_sub(1))))
                    .unwrap_or(NaiveDate::MIN);
                (start, today)
            }
        }
    }
}

fn year_bounds(year: i32) -> (NaiveDate, NaiveDate) {
    let start = NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN);
    let end = NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(NaiveDate::MAX);
    (start, end)
}

fn first_of_month(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}

fn first_of_quarter(day: NaiveDate) -> NaiveDate {
    let month = (day.month0() / 3) * 3 + 1;
    NaiveDate::from_ymd_opt(day.year(), month, 1).unwrap_or(day)
}

fn shift_months(day: NaiveDate, months: i32) -> NaiveDate {
    let shifted = if months >= 0 {
        day.checked_add_months(Months::new(months as u32))
    } else {
        day.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted.unwrap_or(day)
}

fn month_bounds(first: NaiveDate) -> (NaiveDate, NaiveDate) {
    span_bounds(first, 1)
}

fn quarter_bounds(first: NaiveDate) -> (NaiveDate, NaiveDate) {
    span_bounds(first, 3)
}

fn span_bounds(first: NaiveDate, months: u32) -> (NaiveDate, NaiveDate) {
    let end = first
        .checked_add_months(Months::new(months))
        .and_then(|next| next.pred_opt())
        .unwrap_or(first);
    (first, end)
}
