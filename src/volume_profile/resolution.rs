//! Lower-timeframe selection under a bar budget.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::volume_profile::errors::ProfileError;

/// Default cap on bars requested at the selected resolution
pub const DEFAULT_MAX_LTF_BARS: u32 = 5000;

/// One rung of the resolution ladder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub label: String,
    pub minutes: u32,
}

impl Resolution {
    pub fn new(label: impl Into<String>, minutes: u32) -> Self {
        Self {
            label: label.into(),
            minutes,
        }
    }
}

/// Kind of instrument the profile is built for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    #[default]
    Standard,
    Futures,
    Spread,
}

/// Non-empty, strictly ascending list of resolutions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Resolution>", into = "Vec<Resolution>")]
pub struct ResolutionLadder {
    rungs: Vec<Resolution>,
}

impl ResolutionLadder {
    pub fn new(rungs: Vec<Resolution>) -> Result<Self, ProfileError> {
        if rungs.is_empty() {
            return Err(ProfileError::InvalidResolutionLadder(
                "ladder must contain at least one resolution".to_string(),
            ));
        }
        if let Some(rung) = rungs.iter().find(|r| r.minutes == 0) {
            return Err(ProfileError::InvalidResolutionLadder(format!(
                "resolution {} has zero minutes",
                rung.label
            )));
        }
        if let Some(pair) = rungs.windows(2).find(|w| w[1].minutes <= w[0].minutes) {
            return Err(ProfileError::InvalidResolutionLadder(format!(
                "resolutions must be strictly ascending: {} ({}m) follows {} ({}m)",
                pair[1].label, pair[1].minutes, pair[0].label, pair[0].minutes
            )));
        }

        Ok(Self { rungs })
    }

    /// 1m, 3m, 5m, 15m, 30m, 60m, 240m, 1D
    pub fn standard() -> Self {
        Self {
            rungs: vec![
                Resolution::new("1", 1),
                Resolution::new("3", 3),
                Resolution::new("5", 5),
                Resolution::new("15", 15),
                Resolution::new("30", 30),
                Resolution::new("60", 60),
                Resolution::new("240", 240),
                Resolution::new("1D", 1440),
            ],
        }
    }

    pub fn rungs(&self) -> &[Resolution] {
        &self.rungs
    }

    pub fn finest(&self) -> &Resolution {
        &self.rungs[0]
    }

    pub fn coarsest(&self) -> &Resolution {
        &self.rungs[self.rungs.len() - 1]
    }

    /// Finest rung whose estimated bar count for `span_minutes` stays under
    /// `max_bars`, or the coarsest rung when none does.
    pub fn select_for_span(&self, span_minutes: f64, max_bars: u32) -> &Resolution {
        self.rungs
            .iter()
            .find(|rung| span_minutes / (rung.minutes as f64) < max_bars as f64)
            .unwrap_or_else(|| self.coarsest())
    }

    /// Rung one step finer than `chart_minutes`, or the finest rung when the
    /// chart is already at or below it.
    pub fn one_step_finer(&self, chart_minutes: u32) -> &Resolution {
        self.rungs
            .iter()
            .rev()
            .find(|rung| rung.minutes < chart_minutes)
            .unwrap_or_else(|| self.finest())
    }
}

impl Default for ResolutionLadder {
    fn default() -> Self {
        Self::standard()
    }
}

impl TryFrom<Vec<Resolution>> for ResolutionLadder {
    type Error = ProfileError;

    fn try_from(rungs: Vec<Resolution>) -> Result<Self, Self::Error> {
        Self::new(rungs)
    }
}

impl From<ResolutionLadder> for Vec<Resolution> {
    fn from(ladder: ResolutionLadder) -> Self {
        ladder.rungs
    }
}

/// Pick the timeframe to source profile bars from.
///
/// Futures and spreads skip the budget search and use the rung just below the
/// chart resolution.
pub fn select_ltf_tf<'a>(
    ladder: &'a ResolutionLadder,
    span_minutes: f64,
    chart_minutes: u32,
    instrument: InstrumentKind,
    max_bars: u32,
) -> &'a Resolution {
    let selected = match instrument {
        InstrumentKind::Futures | InstrumentKind::Spread => ladder.one_step_finer(chart_minutes),
        InstrumentKind::Standard => ladder.select_for_span(span_minutes, max_bars),
    };

    debug!(
        "Selected LTF {} for span {:.0}m (chart {}m, {:?}, budget {})",
        selected.label, span_minutes, chart_minutes, instrument, max_bars
    );
    selected
}
