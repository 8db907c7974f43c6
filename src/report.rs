//! Turns loaded bars plus configuration into the JSON document the binary prints.

use serde::Serialize;
use tracing::{info, warn};

use crate::config::{AppConfig, ProfileMode};
use crate::historical::errors::DataError;
use crate::historical::structs::{Bar, TimeRange};
use crate::volume_profile::anchor::{auto_anchor_period, calendar_anchor, find_high_low_anchor, AnchorPoint};
use crate::volume_profile::calculator::{PeriodProfile, ProfileCalculator};
use crate::volume_profile::resolution::{select_ltf_tf, Resolution};
use crate::volume_profile::structs::{ProfileSettings, VolumeProfile};
use crate::volume_profile::validation::validate_profile;

#[derive(Debug, Clone, Serialize)]
pub struct ProfileReport {
    pub symbol: String,
    pub mode: ProfileMode,
    pub bars_loaded: usize,
    pub time_range: Option<TimeRange>,
    /// Finest timeframe that keeps the loaded span under the bar budget
    pub recommended_ltf: Resolution,
    pub settings: ProfileSettings,
    /// Digest of the bars, settings and range override that produced this report
    pub fingerprint: String,
    pub anchor: Option<AnchorPoint>,
    /// Periodic mode dropped trailing periods to respect the row budget
    pub truncated: bool,
    pub profiles: Vec<PeriodProfile>,
    /// Every profile passed the structural checks
    pub all_valid: bool,
}

/// Build the profiles `config.input.mode` asks for over `bars`.
pub fn generate_report(config: &AppConfig, bars: &[Bar]) -> Result<ProfileReport, DataError> {
    config.validate()?;
    let input = &config.input;
    let vp_config = &config.volume_profile;
    let calculator = ProfileCalculator::for_asset(&input.symbol, vp_config)?;
    let settings = *calculator.settings();
    let offset = vp_config.utc_offset()?;
    let time_range = TimeRange::of_bars(bars);

    let span_minutes = time_range.map_or(0.0, |range| range.span_minutes());
    let recommended_ltf = select_ltf_tf(
        &vp_config.resolution_ladder,
        span_minutes,
        input.chart_resolution_minutes,
        input.instrument,
        vp_config.max_ltf_bars,
    )
    .clone();

    let mut anchor = None;
    let mut truncated = false;
    let range = input.range_override();

    let profiles = match input.mode {
        ProfileMode::Visible => vec![single_period(bars, calculator.build(bars, &range)?)],
        ProfileMode::Periodic => {
            let period = input
                .period
                .unwrap_or_else(|| auto_anchor_period(input.chart_resolution_minutes));
            let result = calculator.build_periods(bars, period, offset, vp_config.segment_budget())?;
            truncated = result.truncated;
            if truncated {
                warn!(
                    "{} bars beyond the row budget were left out of the {:?} profiles",
                    result.bars_dropped, period
                );
            }
            result.profiles
        }
        ProfileMode::Anchored => {
            anchor = match input.anchor.high_low_mode() {
                Some(mode) => find_high_low_anchor(bars, input.anchor_length, mode),
                None => {
                    let period = input
                        .period
                        .unwrap_or_else(|| auto_anchor_period(input.chart_resolution_minutes));
                    calendar_anchor(bars, period, offset)?
                }
            };
            match anchor {
                Some(point) => {
                    let anchored = &bars[point.index..];
                    vec![single_period(anchored, calculator.build(anchored, &range)?)]
                }
                None => Vec::new(),
            }
        }
    };

    let profiles: Vec<PeriodProfile> = match &input.bars_timeframe {
        Some(label) => profiles
            .into_iter()
            .map(|p| PeriodProfile {
                profile: p.profile.with_ltf_tf(label.as_str()),
                ..p
            })
            .collect(),
        None => profiles,
    };

    let all_valid = profiles.iter().all(|p| {
        let window = match (input.mode, anchor) {
            (ProfileMode::Anchored, Some(point)) => &bars[point.index..],
            (ProfileMode::Periodic, _) => period_window(bars, p),
            _ => bars,
        };
        profile_is_valid(p, window, &settings)
    });

    info!(
        "Generated {:?} report for '{}': {} profiles from {} bars, recommended LTF {}",
        input.mode,
        input.symbol,
        profiles.len(),
        bars.len(),
        recommended_ltf.label
    );

    Ok(ProfileReport {
        symbol: input.symbol.clone(),
        mode: input.mode,
        bars_loaded: bars.len(),
        time_range,
        recommended_ltf,
        fingerprint: settings.fingerprint(bars, &range),
        settings,
        anchor,
        truncated,
        profiles,
        all_valid,
    })
}

fn single_period(bars: &[Bar], profile: VolumeProfile) -> PeriodProfile {
    PeriodProfile {
        start_time: bars.first().map_or(0, |b| b.time),
        end_time: bars.last().map_or(0, |b| b.time),
        profile,
    }
}

/// Bars of one calendar period. Equal timestamps always share a bucket, so
/// slicing by time matches the segmentation.
fn period_window<'a>(bars: &'a [Bar], period: &PeriodProfile) -> &'a [Bar] {
    let start = bars.partition_point(|b| b.time < period.start_time);
    let end = bars.partition_point(|b| b.time <= period.end_time);
    &bars[start..end]
}

/// Validate a profile against exactly the bars it was built from.
fn profile_is_valid(period: &PeriodProfile, window: &[Bar], settings: &ProfileSettings) -> bool {
    let report = validate_profile(&period.profile, window, settings);
    for warning in &report.warnings {
        warn!("Profile {}..{}: {}", period.start_time, period.end_time, warning);
    }
    report.is_valid
}
