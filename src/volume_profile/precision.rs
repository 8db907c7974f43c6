//! Tick-aligned row sizing.
//!
//! Bin heights are always whole multiples of the instrument tick. In count mode
//! the raw height `range / rows` is snapped to the tick grid with a quarter-tick
//! bias (fractions above 0.25 round up) and the row count is then re-derived
//! from the snapped height, so the requested count is a target rather than a
//! guarantee.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::volume_profile::errors::ProfileError;
use crate::volume_profile::structs::{Bin, RowsLayout};

/// Fractional tick above which a raw row height rounds up.
const ROUND_UP_THRESHOLD: f64 = 0.25;

/// Relative slack when dividing a range into rows, absorbs float noise such as
/// `(12.3 - 12.0) / 0.1 == 3.000000000000007`.
const ROW_COUNT_EPSILON: f64 = 1e-9;

/// Number of ticks in one row after rounding `raw_row_size`. Never less than 1.
pub fn row_ticks(raw_row_size: f64, tick_size: f64) -> u64 {
    let ticks_per_row = raw_row_size / tick_size;
    if !ticks_per_row.is_finite() || ticks_per_row <= 0.0 {
        return 1;
    }

    let whole = ticks_per_row.floor();
    let frac = ticks_per_row - whole;
    let ticks = if frac > ROUND_UP_THRESHOLD { whole + 1.0 } else { whole };

    (ticks as u64).max(1)
}

/// Snap a raw row height to a positive multiple of `tick_size`.
pub fn round_row_size(raw_row_size: f64, tick_size: f64) -> f64 {
    row_ticks(raw_row_size, tick_size) as f64 * tick_size
}

/// `ceil(price_range / row_size)`, at least 1.
pub fn rows_for_range(price_range: f64, row_size: f64) -> usize {
    let rows = price_range / row_size;
    if !rows.is_finite() || rows <= 0.0 {
        return 1;
    }

    let nearest = rows.round();
    let rows = if (rows - nearest).abs() <= ROW_COUNT_EPSILON * nearest.max(1.0) {
        nearest
    } else {
        rows.ceil()
    };

    (rows as usize).max(1)
}

/// Row layout resolved against a concrete price range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinGrid {
    pub range_low: f64,
    pub range_high: f64,
    pub row_size: f64,
    pub num_rows: usize,
}

impl BinGrid {
    pub fn new(
        range_low: f64,
        range_high: f64,
        layout: RowsLayout,
        tick_size: f64,
    ) -> Result<Self, ProfileError> {
        if !(tick_size.is_finite() && tick_size > 0.0) {
            return Err(ProfileError::InvalidTickSize(tick_size));
        }
        if !(range_low.is_finite() && range_high.is_finite()) || range_high < range_low {
            return Err(ProfileError::InvalidPriceRange {
                high: range_high,
                low: range_low,
            });
        }

        let price_range = range_high - range_low;
        let (row_size, num_rows) = match layout {
            RowsLayout::Count { rows } => {
                if rows == 0 {
                    return Err(ProfileError::InvalidRowCount(rows));
                }
                let raw_row_size = price_range / rows as f64;
                let row_size = round_row_size(raw_row_size, tick_size);
                (row_size, rows_for_range(price_range, row_size))
            }
            RowsLayout::TickWidth { row_size } => {
                let row_size = row_size.unwrap_or(tick_size);
                if !(row_size.is_finite() && row_size > 0.0) {
                    return Err(ProfileError::InvalidRowSize(row_size));
                }
                (row_size, rows_for_range(price_range, row_size))
            }
        };

        debug!(
            "Bin grid: range [{}, {}], layout {:?}, tick {} -> row_size {}, rows {}",
            range_low, range_high, layout, tick_size, row_size, num_rows
        );

        Ok(Self {
            range_low,
            range_high,
            row_size,
            num_rows,
        })
    }

    /// Upper edge of the last bin.
    pub fn covered_high(&self) -> f64 {
        self.range_low + self.num_rows as f64 * self.row_size
    }

    /// Index of the bin containing `price`, clamped into `[0, num_rows - 1]`.
    pub fn bin_index(&self, price: f64) -> usize {
        let last = self.num_rows.saturating_sub(1);
        let offset = ((price - self.range_low) / self.row_size).floor();
        if offset.is_nan() || offset <= 0.0 {
            0
        } else if offset >= last as f64 {
            last
        } else {
            offset as usize
        }
    }

    /// Inclusive bin span touched by a `[low, high]` price interval.
    pub fn bin_span(&self, low: f64, high: f64) -> (usize, usize) {
        let start = self.bin_index(low);
        let end = self.bin_index(high);
        (start.min(end), start.max(end))
    }

    /// Fresh zero-volume bins covering `[range_low, covered_high())`.
    pub fn allocate_bins(&self) -> Vec<Bin> {
        (0..self.num_rows)
            .map(|i| Bin::new(self.range_low + i as f64 * self.row_size, self.row_size))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_row_size_quarter_tick_rule() {
        // 1.5 ticks -> up
        assert_eq!(round_row_size(1.5, 1.0), 2.0);
        // exactly 0.25 past a whole tick -> down
        assert_eq!(round_row_size(2.25, 1.0), 2.0);
        // just over a quarter -> up
        assert_eq!(round_row_size(2.26, 1.0), 3.0);
        // below one tick clamps to one tick
        assert_eq!(round_row_size(0.1, 1.0), 1.0);
        assert_eq!(round_row_size(0.0, 0.25), 0.25);
    }

    #[test]
    fn test_round_row_size_absorbs_float_noise() {
        assert_eq!(row_ticks(0.30000000000000004, 0.1), 3);
        assert_eq!(row_ticks(0.7, 0.1), 7);
    }

    #[test]
    fn test_row_size_tick_alignment() {
        let ticks = [0.125, 0.25, 0.5, 1.0, 2.0, 5.0];
        let raws = [0.01, 0.3, 0.9, 1.0, 1.26, 3.75, 7.1, 12.5, 99.99, 1234.5];

        for &tick in &ticks {
            for &raw in &raws {
                let size = round_row_size(raw, tick);
                assert_eq!(size % tick, 0.0, "raw {} tick {}", raw, tick);
                assert!(size >= tick, "raw {} tick {}", raw, tick);
            }
        }
    }

    #[test]
    fn test_count_mode_rederives_row_count() {
        // range 3, 2 rows -> raw 1.5 -> rounded to 2 -> ceil(3/2) = 2
        let grid = BinGrid::new(9.0, 12.0, RowsLayout::Count { rows: 2 }, 1.0).unwrap();
        assert_eq!(grid.row_size, 2.0);
        assert_eq!(grid.num_rows, 2);

        // range 10, 4 rows -> raw 2.5 -> rounded to 3 -> ceil(10/3) = 4
        let grid = BinGrid::new(0.0, 10.0, RowsLayout::Count { rows: 4 }, 1.0).unwrap();
        assert_eq!(grid.row_size, 3.0);
        assert_eq!(grid.num_rows, 4);

        // range 10, 8 rows -> raw 1.25 -> rounded down to 1 -> 10 rows
        let grid = BinGrid::new(0.0, 10.0, RowsLayout::Count { rows: 8 }, 1.0).unwrap();
        assert_eq!(grid.row_size, 1.0);
        assert_eq!(grid.num_rows, 10);
    }

    #[test]
    fn test_tick_width_mode() {
        let grid = BinGrid::new(100.0, 101.0, RowsLayout::TickWidth { row_size: None }, 0.25).unwrap();
        assert_eq!(grid.row_size, 0.25);
        assert_eq!(grid.num_rows, 4);

        let grid = BinGrid::new(100.0, 101.1, RowsLayout::TickWidth { row_size: Some(0.5) }, 0.1).unwrap();
        assert_eq!(grid.row_size, 0.5);
        assert_eq!(grid.num_rows, 3);
    }

    #[test]
    fn test_row_count_tolerates_float_noise() {
        let grid = BinGrid::new(12.0, 12.3, RowsLayout::TickWidth { row_size: None }, 0.1).unwrap();
        assert_eq!(grid.num_rows, 3);
    }

    #[test]
    fn test_zero_width_range_has_one_row() {
        let grid = BinGrid::new(50.0, 50.0, RowsLayout::Count { rows: 24 }, 0.5).unwrap();
        assert_eq!(grid.num_rows, 1);
        assert_eq!(grid.row_size, 0.5);

        let grid = BinGrid::new(50.0, 50.0, RowsLayout::TickWidth { row_size: None }, 0.5).unwrap();
        assert_eq!(grid.num_rows, 1);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            BinGrid::new(0.0, 1.0, RowsLayout::default(), 0.0),
            Err(ProfileError::InvalidTickSize(_))
        ));
        assert!(matches!(
            BinGrid::new(2.0, 1.0, RowsLayout::default(), 0.1),
            Err(ProfileError::InvalidPriceRange { .. })
        ));
        assert!(matches!(
            BinGrid::new(0.0, 1.0, RowsLayout::Count { rows: 0 }, 0.1),
            Err(ProfileError::InvalidRowCount(0))
        ));
    }

    #[test]
    fn test_bin_index_clamps_to_edges() {
        let grid = BinGrid::new(9.0, 12.0, RowsLayout::Count { rows: 2 }, 1.0).unwrap();

        assert_eq!(grid.bin_index(9.0), 0);
        assert_eq!(grid.bin_index(10.99), 0);
        assert_eq!(grid.bin_index(11.0), 1);
        assert_eq!(grid.bin_index(12.0), 1);
        assert_eq!(grid.bin_index(2.0), 0);
        assert_eq!(grid.bin_index(500.0), 1);
        assert_eq!(grid.bin_span(12.5, 8.0), (0, 1));
    }

    #[test]
    fn test_allocated_bins_are_contiguous() {
        let grid = BinGrid::new(9.0, 12.0, RowsLayout::Count { rows: 2 }, 1.0).unwrap();
        let bins = grid.allocate_bins();

        assert_eq!(bins.len(), 2);
        assert_eq!((bins[0].price_start, bins[0].price_end), (9.0, 11.0));
        assert_eq!((bins[1].price_start, bins[1].price_end), (11.0, 13.0));
        assert_eq!(grid.covered_high(), 13.0);
        assert!(bins.iter().all(|b| b.total_volume == 0.0));
    }
}
