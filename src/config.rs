//! TOML configuration for the `vprofile_engine` binary.
//!
//! ```toml
//! [logging]
//! log_dir = "logs"
//! rotation = "daily"
//!
//! [volume_profile]
//! tick_size = 0.25
//! rows_layout = { mode = "count", rows = 24 }
//!
//! [input]
//! csv_path = "bars.csv"
//! symbol = "ES"
//! mode = "periodic"
//! period = "session"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::historical::errors::DataError;
use crate::logging::LoggingConfig;
use crate::volume_profile::anchor::AnchorMode;
use crate::volume_profile::periods::CalendarPeriod;
use crate::volume_profile::resolution::InstrumentKind;
use crate::volume_profile::structs::{RangeOverride, VolumeProfileConfig};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
/// Bars scanned for a high/low anchor by default
pub const DEFAULT_ANCHOR_LENGTH: usize = 200;

/// Which profile layout the binary produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileMode {
    /// One profile over every loaded bar
    #[default]
    Visible,
    /// One profile per calendar period
    Periodic,
    /// One profile from an anchor bar to the end
    Anchored,
}

/// How the anchored mode picks its start bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorRule {
    /// Start of the calendar period containing the last bar
    #[default]
    Auto,
    HighestHigh,
    LowestLow,
}

impl AnchorRule {
    pub fn high_low_mode(self) -> Option<AnchorMode> {
        match self {
            AnchorRule::Auto => None,
            AnchorRule::HighestHigh => Some(AnchorMode::HighestHigh),
            AnchorRule::LowestLow => Some(AnchorMode::LowestLow),
        }
    }
}

/// `[input]` table: where the bars come from and what to build from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub csv_path: PathBuf,
    /// Looked up in `volume_profile.asset_overrides`
    pub symbol: String,
    pub mode: ProfileMode,
    /// Periodic bucket or calendar anchor period; derived from the chart
    /// resolution when absent
    pub period: Option<CalendarPeriod>,
    pub anchor: AnchorRule,
    pub anchor_length: usize,
    pub chart_resolution_minutes: u32,
    pub instrument: InstrumentKind,
    /// Timeframe label of the CSV bars, copied onto each profile
    pub bars_timeframe: Option<String>,
    /// Price bounds for visible mode only
    pub range_high: Option<f64>,
    pub range_low: Option<f64>,
    /// JSON goes to stdout when unset
    pub output_path: Option<PathBuf>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("bars.csv"),
            symbol: String::new(),
            mode: ProfileMode::Visible,
            period: None,
            anchor: AnchorRule::Auto,
            anchor_length: DEFAULT_ANCHOR_LENGTH,
            chart_resolution_minutes: 60,
            instrument: InstrumentKind::Standard,
            bars_timeframe: None,
            range_high: None,
            range_low: None,
            output_path: None,
        }
    }
}

impl InputConfig {
    pub fn range_override(&self) -> RangeOverride {
        RangeOverride {
            high: self.range_high,
            low: self.range_low,
        }
    }
}

/// Full TOML configuration structure
#[derive(Debug, Clone, Deserialize)]
struct TomlConfig {
    logging: Option<LoggingConfig>,
    volume_profile: Option<VolumeProfileConfig>,
    input: Option<InputConfig>,
}

/// Resolved application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub volume_profile: VolumeProfileConfig,
    pub input: InputConfig,
}

impl AppConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, DataError> {
        let toml_config: TomlConfig = toml::from_str(content)?;
        let config = Self {
            logging: toml_config.logging.unwrap_or_default(),
            volume_profile: toml_config.volume_profile.unwrap_or_default(),
            input: toml_config.input.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DataError> {
        self.volume_profile.validate()?;

        if self.input.chart_resolution_minutes == 0 {
            return Err(DataError::Validation(
                "input.chart_resolution_minutes must be positive".to_string(),
            ));
        }
        if self.input.mode == ProfileMode::Anchored
            && self.input.anchor != AnchorRule::Auto
            && self.input.anchor_length == 0
        {
            return Err(DataError::Validation(
                "input.anchor_length must be positive for high/low anchors".to_string(),
            ));
        }
        let has_range = self.input.range_high.is_some() || self.input.range_low.is_some();
        if has_range && self.input.mode != ProfileMode::Visible {
            return Err(DataError::Validation(format!(
                "input.range_high/range_low only apply to visible mode, not {:?}",
                self.input.mode
            )));
        }
        if let (Some(high), Some(low)) = (self.input.range_high, self.input.range_low) {
            if high < low {
                return Err(DataError::Validation(format!(
                    "input.range_high {} is below input.range_low {}",
                    high, low
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogRotation;
    use crate::volume_profile::structs::RowsLayout;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config.logging, LoggingConfig::default());
        assert_eq!(config.input.mode, ProfileMode::Visible);
        assert_eq!(config.input.anchor_length, DEFAULT_ANCHOR_LENGTH);
        assert_eq!(config.volume_profile.max_ltf_bars, 5000);
    }

    #[test]
    fn test_full_toml() {
        let config = AppConfig::from_toml_str(
            r#"
            [logging]
            rotation = "hourly"

            [volume_profile]
            tick_size = 0.25
            rows_layout = { mode = "tick_width", row_size = 1.0 }

            [volume_profile.asset_overrides.NQ]
            tick_size = 0.5

            [input]
            csv_path = "data/es.csv"
            symbol = "NQ"
            mode = "anchored"
            anchor = "lowest_low"
            anchor_length = 50
            instrument = "futures"
            bars_timeframe = "5"
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.rotation, LogRotation::Hourly);
        assert_eq!(config.input.mode, ProfileMode::Anchored);
        assert_eq!(config.input.anchor.high_low_mode(), Some(AnchorMode::LowestLow));
        assert_eq!(config.input.instrument, InstrumentKind::Futures);

        let settings = config.volume_profile.resolve_for_asset(&config.input.symbol);
        assert_eq!(settings.tick_size, 0.5);
        assert_eq!(settings.rows_layout, RowsLayout::TickWidth { row_size: Some(1.0) });
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let result = AppConfig::from_toml_str(
            r#"
            [volume_profile]
            tick_size = 0.0
            "#,
        );
        assert!(matches!(result, Err(DataError::Profile(_))));

        let result = AppConfig::from_toml_str(
            r#"
            [input]
            range_high = 10.0
            range_low = 20.0
            "#,
        );
        assert!(matches!(result, Err(DataError::Validation(_))));

        let result = AppConfig::from_toml_str(
            r#"
            [input]
            mode = "anchored"
            range_low = 5.0
            "#,
        );
        assert!(matches!(result, Err(DataError::Validation(_))));

        let result = AppConfig::from_toml_str(
            r#"
            [input]
            mode = "sideways"
            "#,
        );
        assert!(matches!(result, Err(DataError::Toml(_))));
    }
}
