use sha2::{Digest, Sha256};

use crate::historical::structs::Bar;
use crate::volume_profile::structs::{ProfileSettings, RangeOverride, RowsLayout};

/// SHA-256 hex digest identifying one profile computation.
///
/// Covers the settings, the range override and every bar field by exact bit
/// pattern, so two inputs share a fingerprint only if `build_profile` would
/// see identical data.
pub fn profile_fingerprint(bars: &[Bar], settings: &ProfileSettings, range: &RangeOverride) -> String {
    let mut hasher = Sha256::new();

    hasher.update(settings.tick_size.to_bits().to_le_bytes());
    match settings.rows_layout {
        RowsLayout::Count { rows } => {
            hasher.update([0u8]);
            hasher.update(rows.to_le_bytes());
        }
        RowsLayout::TickWidth { row_size } => {
            hasher.update([1u8]);
            update_optional(&mut hasher, row_size);
        }
    }
    hasher.update(settings.value_area_pct.to_bits().to_le_bytes());

    update_optional(&mut hasher, range.high);
    update_optional(&mut hasher, range.low);

    hasher.update((bars.len() as u64).to_le_bytes());
    for bar in bars {
        hasher.update(bar.time.to_le_bytes());
        for value in [bar.open, bar.high, bar.low, bar.close, bar.volume] {
            hasher.update(value.to_bits().to_le_bytes());
        }
    }

    format!("{:x}", hasher.finalize())
}

fn update_optional(hasher: &mut Sha256, value: Option<f64>) {
    match value {
        Some(v) => {
            hasher.update([1u8]);
            hasher.update(v.to_bits().to_le_bytes());
        }
        None => hasher.update([0u8]),
    }
}

impl ProfileSettings {
    /// See [`profile_fingerprint`].
    pub fn fingerprint(&self, bars: &[Bar], range: &RangeOverride) -> String {
        profile_fingerprint(bars, self, range)
    }
}
