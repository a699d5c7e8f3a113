use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};

/// Calendar period identifiers used to detect day and month boundaries.
///
/// Keys are taken in UTC so that they do not jump around with daylight saving time.
#[must_use]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PeriodKeys {
    /// `YYYY-MM-DD`.
    pub day: String,

    /// `YYYY-MM`.
    pub month: String,
}

impl PeriodKeys {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { day: now.format("%Y-%m-%d").to_string(), month: now.format("%Y-%m").to_string() }
    }
}

/// Number of days in the month identified by the `YYYY-MM` key.
pub fn days_in_month(month_key: &str) -> Option<u32> {
    let first_day = NaiveDate::parse_from_str(&format!("{month_key}-01"), "%Y-%m-%d").ok()?;
    Some(days_in_month_of(first_day))
}

/// Number of days in the month containing the date.
pub fn days_in_month_of(date: NaiveDate) -> u32 {
    let first_day = date.with_day(1).unwrap_or(date);
    first_day
        .checked_add_months(Months::new(1))
        .and_then(|next_month| u32::try_from((next_month - first_day).num_days()).ok())
        .unwrap_or(0)
}
