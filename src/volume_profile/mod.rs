/// Volume Profile Module
///
/// Builds price-by-volume histograms from OHLCV bars: tick-aligned bin grids,
/// even per-bar volume distribution with up/down attribution, POC and value
/// area, plus lower-timeframe selection, calendar segmentation and anchoring.
pub mod anchor;
pub mod calculator;
pub mod classifier;
pub mod distribution;
pub mod errors;
pub mod fingerprint;
pub mod periods;
pub mod precision;
pub mod resolution;
pub mod structs;
pub mod validation;
pub mod value_area;

pub use anchor::{auto_anchor_period, calendar_anchor, find_high_low_anchor, AnchorMode, AnchorPoint};
pub use calculator::{
    build_anchored_profile, build_period_profiles, build_profile, PeriodProfile, PeriodProfiles,
    ProfileCalculator,
};
pub use classifier::{classify, classify_all, BarDirection};
pub use errors::ProfileError;
pub use fingerprint::profile_fingerprint;
pub use periods::{split_into_periods, CalendarPeriod, PeriodBoundary, PeriodSegmentation, SegmentBudget};
pub use precision::BinGrid;
pub use resolution::{select_ltf_tf, InstrumentKind, Resolution, ResolutionLadder};
pub use structs::{
    AssetConfig, Bin, ProfileSettings, RangeOverride, RowsLayout, VolumeProfile, VolumeProfileConfig,
};
pub use validation::{validate_profile, ProfileValidationReport};
pub use value_area::{calculate_value_area, ValueAreaBounds};
