use chrono::FixedOffset;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::historical::structs::{Bar, TimestampSec};
use crate::volume_profile::classifier::classify_all;
use crate::volume_profile::distribution::{distribute_all, is_clamped};
use crate::volume_profile::errors::ProfileError;
use crate::volume_profile::periods::{split_into_periods, CalendarPeriod, SegmentBudget};
use crate::volume_profile::precision::BinGrid;
use crate::volume_profile::structs::{
    Bin, ProfileSettings, RangeOverride, VolumeProfile, VolumeProfileConfig,
};
use crate::volume_profile::value_area::calculate_value_area;

/// Build a volume profile from scratch.
///
/// Pipeline: resolve the price range, lay out the tick-aligned bin grid,
/// classify bars left to right, spread each bar's volume over the bins it
/// overlaps, pick the POC and expand the value area around it. The bin buffer
/// lives only for this call and the caller's bars are never modified.
///
/// Empty input yields [`VolumeProfile::empty`], not an error.
pub fn build_profile(
    bars: &[Bar],
    settings: &ProfileSettings,
    range: &RangeOverride,
) -> Result<VolumeProfile, ProfileError> {
    settings.validate()?;

    if bars.is_empty() {
        debug!("No bars supplied, returning empty profile");
        return Ok(VolumeProfile::empty());
    }

    let (range_high, range_low) = resolve_price_range(bars, range)?;
    let grid = BinGrid::new(range_low, range_high, settings.rows_layout, settings.tick_size)?;

    let mut bins = grid.allocate_bins();
    let directions = classify_all(bars);
    distribute_all(&mut bins, &grid, bars, &directions);

    let clamped = bars.iter().filter(|bar| is_clamped(&grid, bar)).count();
    if clamped > 0 {
        debug!(
            "{} of {} bars extend past [{}, {}] and were clamped into edge bins",
            clamped,
            bars.len(),
            range_low,
            range_high
        );
    }

    let total_volume: f64 = bins.iter().map(|bin| bin.total_volume).sum();
    let poc_index = find_poc(&bins);
    let value_area = calculate_value_area(&bins, poc_index, total_volume, settings.value_area_pct);

    let profile = VolumeProfile {
        poc_price: bins[poc_index].price_center,
        vah_price: bins[value_area.vah_index].price_end,
        val_price: bins[value_area.val_index].price_start,
        poc_index,
        vah_index: value_area.vah_index,
        val_index: value_area.val_index,
        total_volume,
        va_volume: value_area.va_volume,
        range_high,
        range_low,
        row_size: grid.row_size,
        num_rows: grid.num_rows,
        ltf_bars_used: bars.len(),
        ltf_tf: None,
        bins,
    };

    debug!(
        "Built profile from {} bars: {} rows of {}, POC={:.4}, VA=[{:.4}, {:.4}] ({:.1}% of {:.2})",
        profile.ltf_bars_used,
        profile.num_rows,
        profile.row_size,
        profile.poc_price,
        profile.val_price,
        profile.vah_price,
        profile.value_area_percentage() * 100.0,
        profile.total_volume
    );

    Ok(profile)
}

/// Price bounds from the overrides, falling back to the bars' extremes per side.
pub fn resolve_price_range(bars: &[Bar], range: &RangeOverride) -> Result<(f64, f64), ProfileError> {
    let (scanned_high, scanned_low) = bars.iter().fold(
        (f64::NEG_INFINITY, f64::INFINITY),
        |(high, low), bar| (high.max(bar.high), low.min(bar.low)),
    );

    let high = range.high.unwrap_or(scanned_high);
    let low = range.low.unwrap_or(scanned_low);

    if !(high.is_finite() && low.is_finite()) || high < low {
        return Err(ProfileError::InvalidPriceRange { high, low });
    }

    Ok((high, low))
}

/// Index of the heaviest bin. Ties go to the lowest index.
pub fn find_poc(bins: &[Bin]) -> usize {
    let mut poc_index = 0;
    let mut max_volume = match bins.first() {
        Some(bin) => bin.total_volume,
        None => return 0,
    };

    for (i, bin) in bins.iter().enumerate().skip(1) {
        if bin.total_volume > max_volume {
            max_volume = bin.total_volume;
            poc_index = i;
        }
    }

    poc_index
}

/// Profile of the bars at or after `anchor_time`.
pub fn build_anchored_profile(
    bars: &[Bar],
    anchor_time: TimestampSec,
    settings: &ProfileSettings,
) -> Result<VolumeProfile, ProfileError> {
    let start = bars.partition_point(|bar| bar.time < anchor_time);
    debug!(
        "Anchored profile at {}: {} of {} bars in scope",
        anchor_time,
        bars.len() - start,
        bars.len()
    );
    build_profile(&bars[start..], settings, &RangeOverride::none())
}

/// One profile of a periodic layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodProfile {
    pub start_time: TimestampSec,
    pub end_time: TimestampSec,
    pub profile: VolumeProfile,
}

/// Profiles for consecutive calendar periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodProfiles {
    pub period: CalendarPeriod,
    pub profiles: Vec<PeriodProfile>,
    /// Trailing periods were dropped by the row budget
    pub truncated: bool,
    pub bars_dropped: usize,
}

/// Segment bars by calendar period and build each period's profile independently.
///
/// Periods are built on the rayon pool; output order follows the segmentation.
pub fn build_period_profiles(
    bars: &[Bar],
    period: CalendarPeriod,
    offset: FixedOffset,
    budget: SegmentBudget,
    settings: &ProfileSettings,
) -> Result<PeriodProfiles, ProfileError> {
    settings.validate()?;
    let segmentation = split_into_periods(bars, period, offset, budget)?;

    let profiles = segmentation
        .periods
        .par_iter()
        .map(|boundary| {
            build_profile(&boundary.bars, settings, &RangeOverride::none()).map(|profile| PeriodProfile {
                start_time: boundary.start_time,
                end_time: boundary.end_time,
                profile,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    info!(
        "Built {} {:?} profiles from {} bars{}",
        profiles.len(),
        period,
        bars.len(),
        if segmentation.truncated { " (truncated by row budget)" } else { "" }
    );

    Ok(PeriodProfiles {
        period,
        profiles,
        truncated: segmentation.truncated,
        bars_dropped: segmentation.bars_dropped,
    })
}

/// Profile builder bound to one set of settings, typically resolved per asset.
#[derive(Debug, Clone)]
pub struct ProfileCalculator {
    settings: ProfileSettings,
}

impl ProfileCalculator {
    pub fn new(settings: ProfileSettings) -> Result<Self, ProfileError> {
        settings.validate()?;
        Ok(Self { settings })
    }

    /// Calculator with `symbol`'s overrides applied on top of `config`.
    pub fn for_asset(symbol: &str, config: &VolumeProfileConfig) -> Result<Self, ProfileError> {
        Self::new(config.resolve_for_asset(symbol))
    }

    pub fn settings(&self) -> &ProfileSettings {
        &self.settings
    }

    pub fn build(&self, bars: &[Bar], range: &RangeOverride) -> Result<VolumeProfile, ProfileError> {
        build_profile(bars, &self.settings, range)
    }

    pub fn build_anchored(&self, bars: &[Bar], anchor_time: TimestampSec) -> Result<VolumeProfile, ProfileError> {
        build_anchored_profile(bars, anchor_time, &self.settings)
    }

    pub fn build_periods(
        &self,
        bars: &[Bar],
        period: CalendarPeriod,
        offset: FixedOffset,
        budget: SegmentBudget,
    ) -> Result<PeriodProfiles, ProfileError> {
        build_period_profiles(bars, period, offset, budget, &self.settings)
    }
}
