use serde::{Deserialize, Serialize};

use crate::volume_profile::structs::Bin;

/// Bounds of the value area as bin indices, plus the volume it holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueAreaBounds {
    pub vah_index: usize,
    pub val_index: usize,
    pub va_volume: f64,
}

/// Expand outward from the POC until the window holds `value_area_pct` of `total_volume`.
///
/// Each step looks at the bin just above and just below the current window and
/// takes the heavier one. Equal neighbours are both taken in the same step. The
/// expansion stops once both neighbours are empty or missing, even if the target
/// was not reached.
pub fn calculate_value_area(
    bins: &[Bin],
    poc_index: usize,
    total_volume: f64,
    value_area_pct: f64,
) -> ValueAreaBounds {
    let Some(poc) = bins.get(poc_index) else {
        return ValueAreaBounds {
            vah_index: poc_index,
            val_index: poc_index,
            va_volume: 0.0,
        };
    };

    let target = total_volume * value_area_pct;
    let mut vah = poc_index;
    let mut val = poc_index;
    let mut va_volume = poc.total_volume;

    while va_volume < target {
        let above = bins.get(vah + 1).map_or(0.0, |b| b.total_volume);
        let below = val.checked_sub(1).and_then(|i| bins.get(i)).map_or(0.0, |b| b.total_volume);

        if above == 0.0 && below == 0.0 {
            break;
        }

        if above > below {
            vah += 1;
            va_volume += above;
        } else if below > above {
            val -= 1;
            va_volume += below;
        } else {
            vah += 1;
            val -= 1;
            va_volume += above + below;
        }
    }

    ValueAreaBounds {
        vah_index: vah,
        val_index: val,
        va_volume,
    }
}
