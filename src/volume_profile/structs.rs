use std::collections::HashMap;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::volume_profile::classifier::BarDirection;
use crate::volume_profile::errors::ProfileError;
use crate::volume_profile::periods::SegmentBudget;
use crate::volume_profile::resolution::{ResolutionLadder, DEFAULT_MAX_LTF_BARS};

/// Default number of rows in count mode
pub const DEFAULT_ROW_COUNT: u32 = 24;
/// Default share of total volume the value area must cover
pub const DEFAULT_VALUE_AREA_PCT: f64 = 0.70;

/// How bin height is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RowsLayout {
    /// Fixed number of rows; the row height is derived from the price range and
    /// rounded to the tick grid.
    Count { rows: u32 },
    /// Fixed row height in price units; `None` means one tick per row.
    TickWidth {
        #[serde(default)]
        row_size: Option<f64>,
    },
}

impl Default for RowsLayout {
    fn default() -> Self {
        RowsLayout::Count { rows: DEFAULT_ROW_COUNT }
    }
}

/// Everything a single profile computation needs besides the bars and range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileSettings {
    pub tick_size: f64,
    pub rows_layout: RowsLayout,
    /// Fraction in (0, 1].
    pub value_area_pct: f64,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            tick_size: 0.01,
            rows_layout: RowsLayout::default(),
            value_area_pct: DEFAULT_VALUE_AREA_PCT,
        }
    }
}

impl ProfileSettings {
    pub fn new(tick_size: f64, rows_layout: RowsLayout, value_area_pct: f64) -> Self {
        Self {
            tick_size,
            rows_layout,
            value_area_pct,
        }
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        if !(self.tick_size.is_finite() && self.tick_size > 0.0) {
            return Err(ProfileError::InvalidTickSize(self.tick_size));
        }

        match self.rows_layout {
            RowsLayout::Count { rows } if rows == 0 => {
                return Err(ProfileError::InvalidRowCount(rows));
            }
            RowsLayout::TickWidth { row_size: Some(size) } if !(size.is_finite() && size > 0.0) => {
                return Err(ProfileError::InvalidRowSize(size));
            }
            _ => {}
        }

        if !(self.value_area_pct > 0.0 && self.value_area_pct <= 1.0) {
            return Err(ProfileError::InvalidValueAreaPercentage(self.value_area_pct));
        }

        Ok(())
    }
}

/// Optional caller-supplied price bounds. A missing side is taken from the bars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeOverride {
    pub high: Option<f64>,
    pub low: Option<f64>,
}

impl RangeOverride {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn fixed(high: f64, low: f64) -> Self {
        Self {
            high: Some(high),
            low: Some(low),
        }
    }
}

/// One horizontal price row of the histogram, covering `[price_start, price_end)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    pub price_start: f64,
    pub price_end: f64,
    pub price_center: f64,
    pub up_volume: f64,
    pub down_volume: f64,
    pub total_volume: f64,
    pub delta_volume: f64,
}

impl Bin {
    pub fn new(price_start: f64, row_size: f64) -> Self {
        Self {
            price_start,
            price_end: price_start + row_size,
            price_center: price_start + row_size / 2.0,
            up_volume: 0.0,
            down_volume: 0.0,
            total_volume: 0.0,
            delta_volume: 0.0,
        }
    }

    /// Credit `volume` to this bin. Neutral volume is split evenly between up and down.
    pub fn add_volume(&mut self, direction: BarDirection, volume: f64) {
        match direction {
            BarDirection::Up => self.up_volume += volume,
            BarDirection::Down => self.down_volume += volume,
            BarDirection::Neutral => {
                self.up_volume += volume / 2.0;
                self.down_volume += volume / 2.0;
            }
        }
        self.total_volume += volume;
        self.delta_volume = self.up_volume - self.down_volume;
    }
}

/// Result of one profile computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeProfile {
    pub bins: Vec<Bin>,
    pub poc_index: usize,
    pub poc_price: f64,
    pub vah_index: usize,
    pub vah_price: f64,
    pub val_index: usize,
    pub val_price: f64,
    pub total_volume: f64,
    pub va_volume: f64,
    pub range_high: f64,
    pub range_low: f64,
    pub row_size: f64,
    pub num_rows: usize,
    pub ltf_bars_used: usize,
    pub ltf_tf: Option<String>,
}

impl VolumeProfile {
    /// Zero-valued profile returned for empty input.
    pub fn empty() -> Self {
        Self {
            bins: Vec::new(),
            poc_index: 0,
            poc_price: 0.0,
            vah_index: 0,
            vah_price: 0.0,
            val_index: 0,
            val_price: 0.0,
            total_volume: 0.0,
            va_volume: 0.0,
            range_high: 0.0,
            range_low: 0.0,
            row_size: 0.0,
            num_rows: 0,
            ltf_bars_used: 0,
            ltf_tf: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Tag the profile with the timeframe label of the bars it was built from.
    pub fn with_ltf_tf(mut self, label: impl Into<String>) -> Self {
        self.ltf_tf = Some(label.into());
        self
    }

    pub fn poc_bin(&self) -> Option<&Bin> {
        self.bins.get(self.poc_index)
    }

    /// Share of total volume inside the value area, 0 for an empty profile.
    pub fn value_area_percentage(&self) -> f64 {
        if self.total_volume > 0.0 {
            self.va_volume / self.total_volume
        } else {
            0.0
        }
    }
}

/// Asset-specific overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_layout: Option<RowsLayout>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_area_pct: Option<f64>,
}

/// Volume profile configuration as read from the `[volume_profile]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeProfileConfig {
    pub tick_size: f64,
    pub rows_layout: RowsLayout,
    pub value_area_pct: f64,
    /// Bar budget for lower-timeframe selection
    pub max_ltf_bars: u32,
    pub rows_per_period: u32,
    pub max_total_rows: u32,
    /// Offset applied before calendar bucketing, in minutes east of UTC
    pub utc_offset_minutes: i32,
    pub resolution_ladder: ResolutionLadder,
    pub asset_overrides: HashMap<String, AssetConfig>,
}

impl Default for VolumeProfileConfig {
    fn default() -> Self {
        let budget = SegmentBudget::default();
        Self {
            tick_size: 0.01,
            rows_layout: RowsLayout::default(),
            value_area_pct: DEFAULT_VALUE_AREA_PCT,
            max_ltf_bars: DEFAULT_MAX_LTF_BARS,
            rows_per_period: budget.rows_per_period,
            max_total_rows: budget.max_total_rows,
            utc_offset_minutes: 0,
            resolution_ladder: ResolutionLadder::standard(),
            asset_overrides: HashMap::new(),
        }
    }
}

impl VolumeProfileConfig {
    /// Resolve settings for a specific asset, applying overrides if they exist
    pub fn resolve_for_asset(&self, symbol: &str) -> ProfileSettings {
        let asset_override = self.asset_overrides.get(symbol);

        ProfileSettings {
            tick_size: asset_override
                .and_then(|c| c.tick_size)
                .unwrap_or(self.tick_size),
            rows_layout: asset_override
                .and_then(|c| c.rows_layout)
                .unwrap_or(self.rows_layout),
            value_area_pct: asset_override
                .and_then(|c| c.value_area_pct)
                .unwrap_or(self.value_area_pct),
        }
    }

    pub fn segment_budget(&self) -> SegmentBudget {
        SegmentBudget {
            rows_per_period: self.rows_per_period,
            max_total_rows: self.max_total_rows,
        }
    }

    pub fn utc_offset(&self) -> Result<FixedOffset, ProfileError> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or(ProfileError::InvalidUtcOffset(self.utc_offset_minutes))
    }

    /// Validate the global settings and every asset override
    pub fn validate(&self) -> Result<(), ProfileError> {
        self.resolve_for_asset("").validate()?;
        self.segment_budget().validate()?;
        self.utc_offset()?;

        if self.max_ltf_bars == 0 {
            return Err(ProfileError::InvalidResolutionLadder(
                "max_ltf_bars must be positive".to_string(),
            ));
        }

        for symbol in self.asset_overrides.keys() {
            self.resolve_for_asset(symbol).validate()?;
        }

        Ok(())
    }
}
