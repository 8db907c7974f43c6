use std::path::{Path, PathBuf};

use vprofile_engine::historical::structs::Bar;

/// 2024-01-01 00:00:00 UTC, a Monday
pub const BASE_TIME: i64 = 1_704_067_200;

/// Create a one-minute bar spanning one price unit either side of `price`
pub fn create_sample_bar(time: i64, price: f64, volume: f64) -> Bar {
    Bar::new(time, price, price + 1.0, price - 1.0, price + 0.5, volume)
}

/// Create a bar whose close equals its open
#[allow(dead_code)]
pub fn create_doji_bar(time: i64, price: f64, volume: f64) -> Bar {
    Bar::new(time, price, price + 0.5, price - 0.5, price, volume)
}

/// Create a deterministic random walk of `count` one-minute bars.
///
/// Uses a fixed LCG seed so every run sees the same bars.
pub fn create_realistic_bars(count: usize, start_price: f64) -> Vec<Bar> {
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = move || {
        state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        (state >> 33) as f64 / (1u64 << 31) as f64
    };

    let mut price = start_price;
    (0..count)
        .map(|i| {
            let open = price;
            let close = (open + (next() - 0.5) * 4.0).max(1.0);
            let high = open.max(close) + next() * 2.0;
            let low = (open.min(close) - next() * 2.0).max(0.5);
            let volume = 100.0 + (next() * 900.0).round();
            price = close;
            Bar::new(BASE_TIME + i as i64 * 60, open, high, low, close, volume)
        })
        .collect()
}

/// Write bars as a `time,open,high,low,close,volume` CSV under `dir`
#[allow(dead_code)]
pub fn write_bars_csv(dir: &Path, bars: &[Bar]) -> PathBuf {
    let path = dir.join("bars.csv");
    let mut writer = csv::Writer::from_path(&path).unwrap();
    for bar in bars {
        writer.serialize(bar).unwrap();
    }
    writer.flush().unwrap();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_sample_bar() {
        let bar = create_sample_bar(BASE_TIME, 100.0, 10.0);
        assert_eq!(bar.high, 101.0);
        assert_eq!(bar.low, 99.0);
        assert_eq!(bar.close, 100.5);
    }

    #[test]
    fn test_create_realistic_bars() {
        let bars = create_realistic_bars(50, 100.0);
        assert_eq!(bars.len(), 50);
        assert_eq!(bars, create_realistic_bars(50, 100.0));

        for pair in bars.windows(2) {
            assert!(pair[1].time > pair[0].time);
        }
        for bar in &bars {
            assert!(bar.low <= bar.open.min(bar.close));
            assert!(bar.high >= bar.open.max(bar.close));
            assert!(bar.volume >= 100.0);
        }
    }
}
