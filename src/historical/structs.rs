use serde::{Deserialize, Serialize};

/// Unix time in seconds.
pub type TimestampSec = i64;

/// One OHLCV bar as supplied by the data layer.
///
/// Bars are treated as immutable input. Every engine entry point takes them by
/// shared slice and copies whatever it needs to keep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub time: TimestampSec,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(time: TimestampSec, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Close equals open.
    pub fn is_doji(&self) -> bool {
        self.close == self.open
    }
}

/// Inclusive time window in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: TimestampSec,
    pub end: TimestampSec,
}

impl TimeRange {
    pub fn new(start: TimestampSec, end: TimestampSec) -> Self {
        Self { start, end }
    }

    /// Window covered by an ascending bar slice, `None` when empty.
    pub fn of_bars(bars: &[Bar]) -> Option<Self> {
        match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some(Self::new(first.time, last.time)),
            _ => None,
        }
    }

    pub fn span_minutes(&self) -> f64 {
        (self.end - self.start).max(0) as f64 / 60.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doji_detection() {
        assert!(Bar::new(0, 10.0, 11.0, 9.0, 10.0, 1.0).is_doji());
        assert!(!Bar::new(0, 10.0, 11.0, 9.0, 10.5, 1.0).is_doji());
    }

    #[test]
    fn test_time_range_of_bars() {
        assert_eq!(TimeRange::of_bars(&[]), None);

        let bars = vec![
            Bar::new(1_700_000_000, 1.0, 1.0, 1.0, 1.0, 1.0),
            Bar::new(1_700_003_600, 1.0, 1.0, 1.0, 1.0, 1.0),
        ];
        let range = TimeRange::of_bars(&bars).unwrap();
        assert_eq!(range.start, 1_700_000_000);
        assert_eq!(range.end, 1_700_003_600);
        assert_eq!(range.span_minutes(), 60.0);
    }
}
