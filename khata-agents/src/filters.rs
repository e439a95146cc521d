//! Turns relative date phrases and amount comparisons into concrete
//! predicates over `created_at` and `amount`.
//!
//! Date ranges are half-open `[start, end)` and anchored to local midnight of
//! the clock passed in, so callers decide which time zone "today" means.
//! Weeks start on Monday.

use crate::error::{ToolError, ToolResult};
use chrono::{
    DateTime, Datelike, Days, Duration, LocalResult, Months, NaiveDate, NaiveTime, TimeZone, Utc,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Half-open interval over creation timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePhrase {
    Today,
    Yesterday,
    ThisWeek,
    LastWeek,
    ThisMonth,
    LastMonth,
    AllTime,
}

impl FromStr for DatePhrase {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .to_lowercase()
            .replace(['_', '-'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        match normalized.as_str() {
            "today" => Ok(DatePhrase::Today),
            "yesterday" => Ok(DatePhrase::Yesterday),
            "this week" | "current week" => Ok(DatePhrase::ThisWeek),
            "last week" | "previous week" => Ok(DatePhrase::LastWeek),
            "this month" | "current month" => Ok(DatePhrase::ThisMonth),
            "last month" | "previous month" => Ok(DatePhrase::LastMonth),
            "all" | "all time" => Ok(DatePhrase::AllTime),
            _ => Err(ToolError::invalid_filter(format!(
                "Unrecognized date filter '{}'. Use today, yesterday, this week, last week, this month, last month or all time",
                s.trim()
            ))),
        }
    }
}

impl DatePhrase {
    /// Concrete range for this phrase at `now`; `AllTime` has no range
    pub fn resolve<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> ToolResult<Option<DateRange>> {
        let tz = now.timezone();
        let today = now.date_naive();

        let (from, to) = match self {
            DatePhrase::AllTime => return Ok(None),
            DatePhrase::Today => (today, add_days(today, 1)?),
            DatePhrase::Yesterday => (sub_days(today, 1)?, today),
            DatePhrase::ThisWeek => {
                let monday = start_of_week(today)?;
                (monday, add_days(monday, 7)?)
            }
            DatePhrase::LastWeek => {
                let monday = start_of_week(today)?;
                (sub_days(monday, 7)?, monday)
            }
            DatePhrase::ThisMonth => {
                let first = start_of_month(today);
                (first, add_month(first)?)
            }
            DatePhrase::LastMonth => {
                let first = start_of_month(today);
                let previous = first
                    .checked_sub_months(Months::new(1))
                    .ok_or_else(out_of_range)?;
                (previous, first)
            }
        };

        Ok(Some(DateRange {
            start: local_midnight(&tz, from),
            end: local_midnight(&tz, to),
        }))
    }
}

/// Parses and resolves a relative date phrase in one step
pub fn resolve_date_filter<Tz: TimeZone>(
    phrase: &str,
    now: &DateTime<Tz>,
) -> ToolResult<Option<DateRange>> {
    phrase.parse::<DatePhrase>()?.resolve(now)
}

/// Inclusive calendar-day range `start_date..=end_date` in the zone of `tz`
pub fn resolve_custom_range<Tz: TimeZone>(
    start_date: &str,
    end_date: &str,
    tz: &Tz,
) -> ToolResult<DateRange> {
    let from = parse_day(start_date)?;
    let to = parse_day(end_date)?;

    if to < from {
        return Err(ToolError::invalid_filter(format!(
            "End date {} is before start date {}",
            to, from
        )));
    }

    Ok(DateRange {
        start: local_midnight(tz, from),
        end: local_midnight(tz, add_days(to, 1)?),
    })
}

/// Comparison the user asked for against a single amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AmountComparison {
    Above,
    Below,
    Equal,
}

impl FromStr for AmountComparison {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['_', '-'], " ").as_str() {
            "above" | "greater" | "greater than" | "more" | "more than" | "over" | "gt" => {
                Ok(AmountComparison::Above)
            }
            "below" | "less" | "less than" | "under" | "lt" => Ok(AmountComparison::Below),
            "equal" | "equals" | "equal to" | "exactly" | "eq" => Ok(AmountComparison::Equal),
            _ => Err(ToolError::invalid_filter(format!(
                "Unrecognized amount comparison '{}'. Use above, below or equal",
                s.trim()
            ))),
        }
    }
}

/// Differences below half a cent count as equal
pub const AMOUNT_EPSILON: f64 = 0.005;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum AmountPredicate {
    GreaterThan(f64),
    LessThan(f64),
    EqualTo(f64),
    AtLeast(f64),
    AtMost(f64),
}

impl AmountPredicate {
    pub fn describe(&self, currency: &str) -> String {
        match *self {
            AmountPredicate::GreaterThan(v) => format!("above {}{}", currency, v),
            AmountPredicate::LessThan(v) => format!("below {}{}", currency, v),
            AmountPredicate::EqualTo(v) => format!("equal to {}{}", currency, v),
            AmountPredicate::AtLeast(v) => format!("min: {}{}", currency, v),
            AmountPredicate::AtMost(v) => format!("max: {}{}", currency, v),
        }
    }
}

/// Builds the amount predicates for a listing request.
///
/// `comparison` is the raw word from the model; anything that is not a known
/// comparison is an `InvalidFilter`.
pub fn resolve_amount_filters(
    comparison: Option<&str>,
    value: Option<f64>,
    amount_min: Option<f64>,
    amount_max: Option<f64>,
) -> ToolResult<Vec<AmountPredicate>> {
    let mut predicates = Vec::new();

    let comparison = comparison
        .filter(|word| !word.trim().is_empty())
        .map(str::parse::<AmountComparison>)
        .transpose()?;

    match (comparison, value) {
        (Some(comparison), Some(value)) => {
            let value = check_threshold("amount_value", value)?;
            predicates.push(match comparison {
                AmountComparison::Above => AmountPredicate::GreaterThan(value),
                AmountComparison::Below => AmountPredicate::LessThan(value),
                AmountComparison::Equal => AmountPredicate::EqualTo(value),
            });
        }
        (Some(_), None) => {
            return Err(ToolError::invalid_filter(
                "Amount comparison given without an amount to compare against",
            ))
        }
        (None, Some(_)) => {
            return Err(ToolError::invalid_filter(
                "Amount given without saying above, below or equal",
            ))
        }
        (None, None) => {}
    }

    let min = amount_min
        .map(|v| check_threshold("amount_min", v))
        .transpose()?;
    let max = amount_max
        .map(|v| check_threshold("amount_max", v))
        .transpose()?;

    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(ToolError::invalid_filter(format!(
                "Minimum amount {} is greater than maximum amount {}",
                min, max
            )));
        }
    }

    predicates.extend(min.map(AmountPredicate::AtLeast));
    predicates.extend(max.map(AmountPredicate::AtMost));

    Ok(predicates)
}

fn check_threshold(field: &str, value: f64) -> ToolResult<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(ToolError::invalid_filter(format!(
            "{} must be a non-negative number",
            field
        )));
    }
    Ok(value)
}

fn parse_day(input: &str) -> ToolResult<NaiveDate> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(input, "%Y/%m/%d"))
        .map_err(|_| {
            ToolError::invalid_filter(format!(
                "Invalid date '{}', expected YYYY-MM-DD",
                input
            ))
        })
}

fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(at) => at.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        // Midnight skipped by a DST jump; the day starts an hour later
        LocalResult::None => tz
            .from_local_datetime(&(midnight + Duration::hours(1)))
            .earliest()
            .map(|at| at.with_timezone(&Utc))
            .unwrap_or_else(|| midnight.and_utc()),
    }
}

fn start_of_week(day: NaiveDate) -> ToolResult<NaiveDate> {
    sub_days(day, u64::from(day.weekday().num_days_from_monday()))
}

fn start_of_month(day: NaiveDate) -> NaiveDate {
    day - Days::new(u64::from(day.day0()))
}

fn add_month(day: NaiveDate) -> ToolResult<NaiveDate> {
    day.checked_add_months(Months::new(1)).ok_or_else(out_of_range)
}

fn add_days(day: NaiveDate, days: u64) -> ToolResult<NaiveDate> {
    day.checked_add_days(Days::new(days)).ok_or_else(out_of_range)
}

fn sub_days(day: NaiveDate, days: u64) -> ToolResult<NaiveDate> {
    day.checked_sub_days(Days::new(days)).ok_or_else(out_of_range)
}

fn out_of_range() -> ToolError {
    ToolError::invalid_filter("Date is out of the supported range")
}
