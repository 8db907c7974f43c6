use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::historical::structs::{Bar, TimestampSec};
use crate::volume_profile::errors::ProfileError;
use crate::volume_profile::periods::CalendarPeriod;

const MINUTES_PER_DAY: u32 = 1440;

/// Which price extreme an anchored profile starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorMode {
    HighestHigh,
    LowestLow,
}

/// Chosen profile start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorPoint {
    /// Index into the bar slice the anchor was searched in
    pub index: usize,
    pub time: TimestampSec,
    pub price: f64,
}

/// Calendar period an auto-anchored profile resets on, by chart resolution.
pub fn auto_anchor_period(chart_resolution_minutes: u32) -> CalendarPeriod {
    match chart_resolution_minutes {
        m if m < MINUTES_PER_DAY => CalendarPeriod::Session,
        m if m <= MINUTES_PER_DAY => CalendarPeriod::Month,
        m if m <= 10 * MINUTES_PER_DAY => CalendarPeriod::Quarter,
        m if m <= 60 * MINUTES_PER_DAY => CalendarPeriod::Year,
        _ => CalendarPeriod::Decade,
    }
}

/// Highest high or lowest low among the last `length` bars. The earliest bar
/// wins a tie.
pub fn find_high_low_anchor(bars: &[Bar], length: usize, mode: AnchorMode) -> Option<AnchorPoint> {
    if length == 0 {
        return None;
    }

    let first = bars.len().saturating_sub(length);
    let mut best: Option<AnchorPoint> = None;

    for (index, bar) in bars.iter().enumerate().skip(first) {
        let price = match mode {
            AnchorMode::HighestHigh => bar.high,
            AnchorMode::LowestLow => bar.low,
        };
        let better = match (best, mode) {
            (None, _) => true,
            (Some(current), AnchorMode::HighestHigh) => price > current.price,
            (Some(current), AnchorMode::LowestLow) => price < current.price,
        };
        if better {
            best = Some(AnchorPoint {
                index,
                time: bar.time,
                price,
            });
        }
    }

    best
}

/// First bar of the calendar bucket that contains the last bar.
pub fn calendar_anchor(
    bars: &[Bar],
    period: CalendarPeriod,
    offset: FixedOffset,
) -> Result<Option<AnchorPoint>, ProfileError> {
    let Some(last) = bars.last() else {
        return Ok(None);
    };

    let start = period.bucket_start(last.time, offset)?;
    let index = bars.partition_point(|bar| bar.time < start);

    Ok(bars.get(index).map(|bar| AnchorPoint {
        index,
        time: bar.time,
        price: bar.open,
    }))
}
