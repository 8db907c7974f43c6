use crate::historical::structs::Bar;
use crate::volume_profile::classifier::BarDirection;
use crate::volume_profile::precision::BinGrid;
use crate::volume_profile::structs::Bin;

/// Spread one bar's volume evenly over every bin its `[low, high]` range touches.
///
/// Bars reaching outside the grid are clamped onto the edge bins, so the full
/// volume always lands somewhere. Returns the number of bins touched.
pub fn distribute_bar(bins: &mut [Bin], grid: &BinGrid, bar: &Bar, direction: BarDirection) -> usize {
    if bins.is_empty() {
        return 0;
    }

    let (start_bin, end_bin) = grid.bin_span(bar.low, bar.high);
    let end_bin = end_bin.min(bins.len() - 1);
    let start_bin = start_bin.min(end_bin);
    let touched = end_bin - start_bin + 1;
    let volume_per_bin = bar.volume / touched as f64;

    for bin in &mut bins[start_bin..=end_bin] {
        bin.add_volume(direction, volume_per_bin);
    }

    touched
}

/// Distribute every bar with its matching direction. `directions` is indexed like `bars`.
pub fn distribute_all(bins: &mut [Bin], grid: &BinGrid, bars: &[Bar], directions: &[BarDirection]) {
    for (bar, &direction) in bars.iter().zip(directions) {
        distribute_bar(bins, grid, bar, direction);
    }
}

/// Whether a bar lies partly outside the grid's nominal `[range_low, range_high]`.
pub fn is_clamped(grid: &BinGrid, bar: &Bar) -> bool {
    bar.low < grid.range_low || bar.high > grid.range_high
}
