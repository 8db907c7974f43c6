//! Calendar segmentation of a bar stream for periodic profiles.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::historical::structs::{Bar, TimestampSec};
use crate::volume_profile::errors::ProfileError;

/// Rows reserved for each period by default
pub const DEFAULT_ROWS_PER_PERIOD: u32 = 24;
/// Global row cap across all periods by default
pub const DEFAULT_MAX_TOTAL_ROWS: u32 = 6000;

/// Calendar bucket a bar belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarPeriod {
    /// One calendar day
    Session,
    /// Weeks start on Sunday
    Week,
    Month,
    Quarter,
    Year,
    Decade,
}

impl CalendarPeriod {
    fn local_date(time: TimestampSec, offset: FixedOffset) -> Result<NaiveDate, ProfileError> {
        DateTime::from_timestamp(time, 0)
            .map(|utc| utc.with_timezone(&offset).date_naive())
            .ok_or(ProfileError::InvalidTimestamp(time))
    }

    /// First local date of the bucket containing `date`.
    fn first_day(self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            CalendarPeriod::Session => Some(date),
            CalendarPeriod::Week => {
                date.checked_sub_signed(Duration::days(date.weekday().num_days_from_sunday() as i64))
            }
            CalendarPeriod::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1),
            CalendarPeriod::Quarter => {
                NaiveDate::from_ymd_opt(date.year(), date.month0() / 3 * 3 + 1, 1)
            }
            CalendarPeriod::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1),
            CalendarPeriod::Decade => NaiveDate::from_ymd_opt(date.year().div_euclid(10) * 10, 1, 1),
        }
    }

    /// Identifier shared by every timestamp in the same bucket.
    pub fn bucket_key(self, time: TimestampSec, offset: FixedOffset) -> Result<i64, ProfileError> {
        let date = Self::local_date(time, offset)?;
        self.first_day(date)
            .map(|first| first.num_days_from_ce() as i64)
            .ok_or(ProfileError::InvalidTimestamp(time))
    }

    /// Local midnight starting the bucket that contains `time`, in unix seconds.
    pub fn bucket_start(self, time: TimestampSec, offset: FixedOffset) -> Result<TimestampSec, ProfileError> {
        let date = Self::local_date(time, offset)?;
        let first = self.first_day(date).ok_or(ProfileError::InvalidTimestamp(time))?;
        let midnight = first
            .and_hms_opt(0, 0, 0)
            .ok_or(ProfileError::InvalidTimestamp(time))?;
        Ok(midnight.and_utc().timestamp() - offset.local_minus_utc() as i64)
    }
}

/// Row reservation limits for periodic segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentBudget {
    pub rows_per_period: u32,
    pub max_total_rows: u32,
}

impl Default for SegmentBudget {
    fn default() -> Self {
        Self {
            rows_per_period: DEFAULT_ROWS_PER_PERIOD,
            max_total_rows: DEFAULT_MAX_TOTAL_ROWS,
        }
    }
}

impl SegmentBudget {
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.rows_per_period == 0 {
            return Err(ProfileError::InvalidSegmentBudget(
                "rows_per_period must be positive".to_string(),
            ));
        }
        if self.max_total_rows == 0 {
            return Err(ProfileError::InvalidSegmentBudget(
                "max_total_rows must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Most periods the budget can hold.
    pub fn max_periods(&self) -> u32 {
        self.max_total_rows / self.rows_per_period.max(1)
    }
}

/// A maximal run of bars sharing one calendar bucket. Times are those of the
/// first and last bar in the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodBoundary {
    pub start_time: TimestampSec,
    pub end_time: TimestampSec,
    pub bars: Vec<Bar>,
}

/// Output of [`split_into_periods`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSegmentation {
    pub periods: Vec<PeriodBoundary>,
    /// The row budget ran out and trailing bars were dropped
    pub truncated: bool,
    pub rows_reserved: u32,
    pub bars_dropped: usize,
}

/// Split ascending bars into calendar buckets.
///
/// Every new bucket reserves `rows_per_period` rows. When a bucket would push
/// the reservation past `max_total_rows`, segmentation stops and the remaining
/// bars are dropped with `truncated` set.
pub fn split_into_periods(
    bars: &[Bar],
    period: CalendarPeriod,
    offset: FixedOffset,
    budget: SegmentBudget,
) -> Result<PeriodSegmentation, ProfileError> {
    budget.validate()?;

    let mut periods: Vec<PeriodBoundary> = Vec::new();
    let mut current_key: Option<i64> = None;
    let mut rows_reserved: u32 = 0;
    let mut truncated = false;
    let mut bars_dropped = 0;

    for (i, bar) in bars.iter().enumerate() {
        let key = period.bucket_key(bar.time, offset)?;

        if current_key != Some(key) {
            let reserved = rows_reserved.saturating_add(budget.rows_per_period);
            if reserved > budget.max_total_rows {
                truncated = true;
                bars_dropped = bars.len() - i;
                break;
            }
            rows_reserved = reserved;
            current_key = Some(key);
            periods.push(PeriodBoundary {
                start_time: bar.time,
                end_time: bar.time,
                bars: Vec::new(),
            });
        }

        if let Some(current) = periods.last_mut() {
            current.end_time = bar.time;
            current.bars.push(*bar);
        }
    }

    if truncated {
        warn!(
            "Period segmentation truncated: {} {:?} periods kept, {} bars dropped (row budget {} of {})",
            periods.len(),
            period,
            bars_dropped,
            rows_reserved,
            budget.max_total_rows
        );
    } else {
        debug!(
            "Split {} bars into {} {:?} periods ({} rows reserved)",
            bars.len(),
            periods.len(),
            period,
            rows_reserved
        );
    }

    Ok(PeriodSegmentation {
        periods,
        truncated,
        rows_reserved,
        bars_dropped,
    })
}
