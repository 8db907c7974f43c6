use std::fs;
use std::io::Read;
use std::path::Path;

use chrono::DateTime;
use tracing::{debug, info};

use crate::historical::errors::DataError;
use crate::historical::structs::{Bar, TimestampSec};

/// Load bars from a CSV file with a `time,open,high,low,close,volume` header.
pub fn load_bars_from_csv(path: &Path) -> Result<Vec<Bar>, DataError> {
    let file = fs::File::open(path).map_err(DataError::Io)?;
    let bars = read_bars(file)?;
    info!("Loaded {} bars from {}", bars.len(), path.display());
    Ok(bars)
}

/// Parse bars from any CSV source and check they are usable as engine input.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<Bar>, DataError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut bars = Vec::new();
    for record in csv_reader.deserialize() {
        let bar: Bar = record?;
        bars.push(bar);
    }

    validate_bar_sequence(&bars)?;
    debug!("Parsed {} bars from CSV", bars.len());
    Ok(bars)
}

/// Bars must be time-ascending with finite prices, `low <= high` and non-negative volume.
pub fn validate_bar_sequence(bars: &[Bar]) -> Result<(), DataError> {
    for (i, bar) in bars.iter().enumerate() {
        let prices = [bar.open, bar.high, bar.low, bar.close, bar.volume];
        if prices.iter().any(|v| !v.is_finite()) {
            return Err(DataError::Validation(format!(
                "Bar {} at {} has a non-finite field",
                i,
                format_timestamp(bar.time)
            )));
        }
        if bar.low > bar.high {
            return Err(DataError::Validation(format!(
                "Bar {} at {} has low {} above high {}",
                i,
                format_timestamp(bar.time),
                bar.low,
                bar.high
            )));
        }
        if bar.volume < 0.0 {
            return Err(DataError::Validation(format!(
                "Bar {} at {} has negative volume {}",
                i,
                format_timestamp(bar.time),
                bar.volume
            )));
        }
    }

    if let Some(pos) = bars.windows(2).position(|w| w[1].time < w[0].time) {
        return Err(DataError::Validation(format!(
            "Bars are not ascending: {} follows {}",
            format_timestamp(bars[pos + 1].time),
            format_timestamp(bars[pos].time)
        )));
    }

    Ok(())
}

pub fn format_timestamp(timestamp: TimestampSec) -> String {
    match DateTime::from_timestamp(timestamp, 0) {
        Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => format!("{}s", timestamp),
    }
}
