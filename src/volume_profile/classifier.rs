use serde::{Deserialize, Serialize};

use crate::historical::structs::Bar;

/// Direction a bar's volume is credited to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarDirection {
    Up,
    Down,
    Neutral,
}

/// Classify one bar.
///
/// A bar closing above its open is up and one closing below is down. A doji is
/// decided by its close against the previous bar's close, and when those are
/// equal it inherits `prev_direction`. A leading doji with no previous bar is
/// neutral.
pub fn classify(bar: &Bar, prev_bar: Option<&Bar>, prev_direction: BarDirection) -> BarDirection {
    if !bar.is_doji() {
        return if bar.close > bar.open {
            BarDirection::Up
        } else {
            BarDirection::Down
        };
    }

    match prev_bar {
        None => BarDirection::Neutral,
        Some(prev) if bar.close > prev.close => BarDirection::Up,
        Some(prev) if bar.close < prev.close => BarDirection::Down,
        Some(_) => prev_direction,
    }
}

/// Classify a bar sequence left to right.
///
/// The carried direction is the last non-neutral result, so the direction of
/// bar `i` only ever depends on bars `0..=i`.
pub fn classify_all(bars: &[Bar]) -> Vec<BarDirection> {
    bars.iter()
        .enumerate()
        .scan(BarDirection::Neutral, |carried, (i, bar)| {
            let prev_bar = i.checked_sub(1).map(|p| &bars[p]);
            let direction = classify(bar, prev_bar, *carried);
            if direction != BarDirection::Neutral {
                *carried = direction;
            }
            Some(direction)
        })
        .collect()
}
