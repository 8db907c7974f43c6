use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::historical::structs::Bar;
use crate::volume_profile::distribution::is_clamped;
use crate::volume_profile::precision::{row_ticks, BinGrid};
use crate::volume_profile::structs::{Bin, ProfileSettings, RowsLayout, VolumeProfile};

/// Relative tolerance for volume sums
const VOLUME_TOLERANCE: f64 = 1e-9;
/// Tolerance for bin edges, in row heights
const EDGE_TOLERANCE: f64 = 1e-6;

/// Shape of the volume histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionMetrics {
    pub total_rows: usize,
    pub non_zero_rows: usize,
    pub max_volume: f64,
    pub min_volume: f64,
    pub average_volume: f64,
    /// Gini coefficient of bin volumes, 0 = flat, 1 = all in one bin
    pub volume_concentration: f64,
}

/// Outcome of checking a profile against the bars and settings it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub expected_volume: f64,
    pub distributed_volume: f64,
    pub clamped_bars: usize,
    pub metrics: DistributionMetrics,
}

impl ProfileValidationReport {
    fn add_error(&mut self, error: String) {
        self.is_valid = false;
        self.errors.push(error);
    }

    fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }
}

pub fn calculate_distribution_metrics(bins: &[Bin]) -> DistributionMetrics {
    let total_rows = bins.len();
    let volumes: Vec<f64> = bins.iter().map(|b| b.total_volume).collect();
    let total_volume: f64 = volumes.iter().sum();

    let non_zero_rows = volumes.iter().filter(|&&v| v > 0.0).count();
    let max_volume = volumes.iter().copied().fold(0.0, f64::max);
    let min_volume = if volumes.is_empty() {
        0.0
    } else {
        volumes.iter().copied().fold(f64::INFINITY, f64::min)
    };
    let average_volume = if total_rows > 0 { total_volume / total_rows as f64 } else { 0.0 };

    let volume_concentration = if total_volume > 0.0 {
        let mut sorted = volumes;
        sorted.sort_by(|a, b| a.total_cmp(b));

        let weighted: f64 = sorted
            .iter()
            .enumerate()
            .map(|(i, &v)| (i as f64 + 1.0) * v)
            .sum();
        let n = total_rows as f64;
        let gini = (2.0 * weighted) / (total_volume * n) - (n + 1.0) / n;
        gini.clamp(0.0, 1.0)
    } else {
        0.0
    };

    DistributionMetrics {
        total_rows,
        non_zero_rows,
        max_volume,
        min_volume,
        average_volume,
        volume_concentration,
    }
}

fn volumes_match(expected: f64, actual: f64) -> bool {
    (expected - actual).abs() <= VOLUME_TOLERANCE * expected.abs().max(1.0)
}

/// Re-check every structural property of `profile` against its inputs.
///
/// Errors mark broken invariants. Warnings flag legal but notable outcomes, such
/// as clamped bars or a value area that ran out of volume before its target.
pub fn validate_profile(profile: &VolumeProfile, bars: &[Bar], settings: &ProfileSettings) -> ProfileValidationReport {
    let expected_volume: f64 = bars.iter().map(|b| b.volume).sum();
    let distributed_volume: f64 = profile.bins.iter().map(|b| b.total_volume).sum();

    let mut report = ProfileValidationReport {
        is_valid: true,
        errors: Vec::new(),
        warnings: Vec::new(),
        expected_volume,
        distributed_volume,
        clamped_bars: 0,
        metrics: calculate_distribution_metrics(&profile.bins),
    };

    if let Err(e) = settings.validate() {
        report.add_error(format!("Settings rejected: {}", e));
        return report;
    }

    if bars.is_empty() {
        if !profile.is_empty() || profile.total_volume != 0.0 {
            report.add_error("Profile of empty input must be empty".to_string());
        }
        return report;
    }

    if profile.is_empty() {
        report.add_error(format!("Profile has no bins for {} bars", bars.len()));
        return report;
    }

    check_volumes(profile, bars, &mut report);
    check_grid(profile, settings, &mut report);
    check_levels(profile, settings, &mut report);

    let grid = BinGrid {
        range_low: profile.range_low,
        range_high: profile.range_high,
        row_size: profile.row_size,
        num_rows: profile.num_rows,
    };
    report.clamped_bars = bars.iter().filter(|bar| is_clamped(&grid, bar)).count();
    if report.clamped_bars > 0 {
        report.add_warning(format!(
            "{} bars extend outside [{}, {}] and were clamped into edge bins",
            report.clamped_bars, profile.range_low, profile.range_high
        ));
    }

    if !report.is_valid {
        warn!("Profile validation failed: {}", report.errors.join("; "));
    }

    report
}

fn check_volumes(profile: &VolumeProfile, bars: &[Bar], report: &mut ProfileValidationReport) {
    if !volumes_match(report.expected_volume, report.distributed_volume) {
        report.add_error(format!(
            "Volume not conserved: bars carry {}, bins hold {}",
            report.expected_volume, report.distributed_volume
        ));
    }
    if !volumes_match(report.distributed_volume, profile.total_volume) {
        report.add_error(format!(
            "Total volume {} differs from bin sum {}",
            profile.total_volume, report.distributed_volume
        ));
    }
    if profile.ltf_bars_used != bars.len() {
        report.add_error(format!(
            "ltf_bars_used is {} but {} bars were supplied",
            profile.ltf_bars_used,
            bars.len()
        ));
    }

    for (i, bin) in profile.bins.iter().enumerate() {
        if bin.total_volume < 0.0 || bin.up_volume < 0.0 || bin.down_volume < 0.0 {
            report.add_error(format!("Bin {} has negative volume", i));
        }
        if !volumes_match(bin.total_volume, bin.up_volume + bin.down_volume) {
            report.add_error(format!(
                "Bin {} up {} + down {} != total {}",
                i, bin.up_volume, bin.down_volume, bin.total_volume
            ));
        }
    }
}

fn check_grid(profile: &VolumeProfile, settings: &ProfileSettings, report: &mut ProfileValidationReport) {
    if profile.bins.len() != profile.num_rows {
        report.add_error(format!(
            "num_rows is {} but {} bins exist",
            profile.num_rows,
            profile.bins.len()
        ));
    }

    let tick_aligned = match settings.rows_layout {
        RowsLayout::Count { .. } | RowsLayout::TickWidth { row_size: None } => true,
        RowsLayout::TickWidth { row_size: Some(_) } => false,
    };
    if tick_aligned {
        let ticks = row_ticks(profile.row_size, settings.tick_size) as f64;
        if (ticks * settings.tick_size - profile.row_size).abs() > EDGE_TOLERANCE * settings.tick_size {
            report.add_error(format!(
                "Row size {} is not a multiple of tick {}",
                profile.row_size, settings.tick_size
            ));
        }
    }

    let edge_tolerance = EDGE_TOLERANCE * profile.row_size;
    for (i, bin) in profile.bins.iter().enumerate() {
        let expected_start = profile.range_low + i as f64 * profile.row_size;
        if (bin.price_start - expected_start).abs() > edge_tolerance
            || (bin.price_end - bin.price_start - profile.row_size).abs() > edge_tolerance
        {
            report.add_error(format!(
                "Bin {} spans [{}, {}), expected to start at {} with height {}",
                i, bin.price_start, bin.price_end, expected_start, profile.row_size
            ));
        }
    }

    if let Some(top) = profile.bins.last() {
        if top.price_end + edge_tolerance < profile.range_high {
            report.add_error(format!(
                "Bins end at {} below range high {}",
                top.price_end, profile.range_high
            ));
        }
    }
}

fn check_levels(profile: &VolumeProfile, settings: &ProfileSettings, report: &mut ProfileValidationReport) {
    let bins = &profile.bins;
    let (Some(poc), Some(_), Some(_)) = (
        bins.get(profile.poc_index),
        bins.get(profile.vah_index),
        bins.get(profile.val_index),
    ) else {
        report.add_error(format!(
            "Level indices out of range: poc {}, vah {}, val {} with {} bins",
            profile.poc_index,
            profile.vah_index,
            profile.val_index,
            bins.len()
        ));
        return;
    };

    if let Some(i) = bins.iter().position(|b| b.total_volume > poc.total_volume) {
        report.add_error(format!("Bin {} holds more volume than POC bin {}", i, profile.poc_index));
    }
    if let Some(i) = bins[..profile.poc_index]
        .iter()
        .position(|b| b.total_volume == poc.total_volume)
    {
        report.add_error(format!("POC tie must resolve to lowest bin {}, got {}", i, profile.poc_index));
    }

    if !(profile.val_index <= profile.poc_index && profile.poc_index <= profile.vah_index) {
        report.add_error(format!(
            "Value area [{}, {}] does not contain POC {}",
            profile.val_index, profile.vah_index, profile.poc_index
        ));
        return;
    }

    let window_volume: f64 = bins[profile.val_index..=profile.vah_index]
        .iter()
        .map(|b| b.total_volume)
        .sum();
    if !volumes_match(window_volume, profile.va_volume) {
        report.add_error(format!(
            "Value area volume {} differs from window sum {}",
            profile.va_volume, window_volume
        ));
    }

    let target = profile.total_volume * settings.value_area_pct;
    if profile.va_volume < target && !volumes_match(target, profile.va_volume) {
        report.add_warning(format!(
            "Value area holds {:.2}% of volume, short of the {:.2}% target",
            profile.value_area_percentage() * 100.0,
            settings.value_area_pct * 100.0
        ));
    }
}
