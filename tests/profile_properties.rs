use vprofile_engine::historical::structs::Bar;
use vprofile_engine::volume_profile::precision::round_row_size;
use vprofile_engine::volume_profile::{
    build_period_profiles, build_profile, calculate_value_area, classify_all, select_ltf_tf,
    validate_profile, BarDirection, CalendarPeriod, InstrumentKind, ProfileSettings, RangeOverride,
    ResolutionLadder, RowsLayout, SegmentBudget,
};

mod fixtures;
use fixtures::{create_doji_bar, create_realistic_bars, create_sample_bar, BASE_TIME};

fn layouts() -> Vec<RowsLayout> {
    vec![
        RowsLayout::Count { rows: 1 },
        RowsLayout::Count { rows: 7 },
        RowsLayout::Count { rows: 24 },
        RowsLayout::Count { rows: 300 },
        RowsLayout::TickWidth { row_size: None },
        RowsLayout::TickWidth { row_size: Some(1.3) },
    ]
}

#[test]
fn test_volume_is_conserved_for_every_layout() {
    let bars = create_realistic_bars(500, 250.0);
    let expected: f64 = bars.iter().map(|b| b.volume).sum();

    for layout in layouts() {
        let settings = ProfileSettings::new(0.1, layout, 0.70);
        let profile = build_profile(&bars, &settings, &RangeOverride::none()).unwrap();
        let distributed: f64 = profile.bins.iter().map(|b| b.total_volume).sum();

        assert!(
            (distributed - expected).abs() <= 1e-9 * expected,
            "{:?}: {} vs {}",
            layout,
            distributed,
            expected
        );
    }
}

#[test]
fn test_volume_is_conserved_with_clamping() {
    let bars = create_realistic_bars(200, 100.0);
    let expected: f64 = bars.iter().map(|b| b.volume).sum();
    let settings = ProfileSettings::new(0.25, RowsLayout::Count { rows: 10 }, 0.70);

    let profile = build_profile(&bars, &settings, &RangeOverride::fixed(101.0, 99.0)).unwrap();
    assert!((profile.total_volume - expected).abs() <= 1e-9 * expected);

    let report = validate_profile(&profile, &bars, &settings);
    assert!(report.is_valid, "errors: {:?}", report.errors);
    assert!(report.clamped_bars > 0);
}

#[test]
fn test_poc_is_first_maximum() {
    let bars = create_realistic_bars(400, 50.0);

    for layout in layouts() {
        let settings = ProfileSettings::new(0.05, layout, 0.70);
        let profile = build_profile(&bars, &settings, &RangeOverride::none()).unwrap();
        let poc_volume = profile.bins[profile.poc_index].total_volume;

        assert!(profile.bins.iter().all(|b| b.total_volume <= poc_volume));
        assert!(profile.bins[..profile.poc_index]
            .iter()
            .all(|b| b.total_volume < poc_volume));
    }
}

#[test]
fn test_value_area_contains_poc_and_meets_target() {
    let bars = create_realistic_bars(400, 75.0);

    for pct in [0.3, 0.5, 0.7, 0.9, 1.0] {
        for layout in layouts() {
            let settings = ProfileSettings::new(0.1, layout, pct);
            let profile = build_profile(&bars, &settings, &RangeOverride::none()).unwrap();

            assert!(profile.val_index <= profile.poc_index);
            assert!(profile.poc_index <= profile.vah_index);

            let target = profile.total_volume * pct;
            let exhausted = (profile.va_volume - profile.total_volume).abs() <= 1e-9 * profile.total_volume;
            let below_empty = profile.val_index == 0 || profile.bins[profile.val_index - 1].total_volume == 0.0;
            let above_empty = profile.vah_index + 1 == profile.bins.len()
                || profile.bins[profile.vah_index + 1].total_volume == 0.0;
            assert!(
                profile.va_volume >= target - 1e-9 * target || exhausted || (below_empty && above_empty),
                "{:?} at {}: {} < {}",
                layout,
                pct,
                profile.va_volume,
                target
            );
        }
    }
}

#[test]
fn test_row_size_is_tick_aligned() {
    for tick in [0.01, 0.05, 0.25, 1.0, 5.0] {
        for raw in [0.001, 0.013, 0.37, 1.0, 2.6, 17.9, 123.456] {
            let size = round_row_size(raw, tick);
            let ticks = size / tick;

            assert!(size >= tick, "{} at tick {} gave {}", raw, tick, size);
            assert!((ticks - ticks.round()).abs() < 1e-9, "{} at tick {} gave {}", raw, tick, size);
        }
    }
}

#[test]
fn test_classification_is_prefix_stable() {
    let mut bars = create_realistic_bars(60, 20.0);
    // sprinkle dojis that must inherit
    for i in (5..60).step_by(7) {
        let prev_close = bars[i - 1].close;
        bars[i] = Bar::new(bars[i].time, prev_close, prev_close + 0.5, prev_close - 0.5, prev_close, 10.0);
    }

    let full = classify_all(&bars);
    for k in 0..=bars.len() {
        assert_eq!(classify_all(&bars[..k]), full[..k]);
    }
}

#[test]
fn test_scenario_single_bar_two_rows() {
    let bars = vec![Bar::new(BASE_TIME, 10.0, 12.0, 9.0, 11.0, 100.0)];
    let settings = ProfileSettings::new(1.0, RowsLayout::Count { rows: 2 }, 0.70);
    let profile = build_profile(&bars, &settings, &RangeOverride::none()).unwrap();

    assert_eq!((profile.range_high, profile.range_low), (12.0, 9.0));
    assert_eq!(profile.row_size, 2.0);
    assert_eq!(profile.num_rows, 2);
    assert_eq!(profile.bins[0].price_start, 9.0);
    assert_eq!(profile.bins[1].price_end, 13.0);
    assert_eq!(profile.bins[0].total_volume, 50.0);
    assert_eq!(profile.bins[1].total_volume, 50.0);
    assert_eq!(profile.poc_index, 0);
}

#[test]
fn test_scenario_doji_inherits_previous_direction() {
    let first = create_sample_bar(BASE_TIME, 100.0, 10.0); // close 100.5 > open
    let doji = Bar::new(BASE_TIME + 60, 100.5, 101.0, 100.0, 100.5, 10.0);
    let directions = classify_all(&[first, doji]);

    assert_eq!(directions, vec![BarDirection::Up, BarDirection::Up]);

    let lone_doji = create_doji_bar(BASE_TIME, 50.0, 5.0);
    assert_eq!(classify_all(&[lone_doji]), vec![BarDirection::Neutral]);
}

#[test]
fn test_scenario_value_area_expansion() {
    let bars: Vec<Bar> = [10.0, 50.0, 20.0, 15.0, 5.0]
        .iter()
        .enumerate()
        .map(|(i, &volume)| {
            let low = 100.0 + i as f64;
            Bar::new(BASE_TIME + i as i64 * 60, low, low + 0.5, low, low + 0.5, volume)
        })
        .collect();
    let settings = ProfileSettings::new(1.0, RowsLayout::TickWidth { row_size: None }, 0.70);
    let profile = build_profile(&bars, &settings, &RangeOverride::none()).unwrap();

    assert_eq!(profile.poc_index, 1);
    assert_eq!(profile.vah_index, 2);
    assert_eq!(profile.val_index, 1);
    assert_eq!(profile.va_volume, 70.0);

    let direct = calculate_value_area(&profile.bins, 1, 100.0, 0.70);
    assert_eq!((direct.vah_index, direct.val_index, direct.va_volume), (2, 1, 70.0));
}

#[test]
fn test_scenario_six_thousand_bar_span_selects_three_minutes() {
    let ladder = ResolutionLadder::standard();
    let selected = select_ltf_tf(&ladder, 6000.0, 60, InstrumentKind::Standard, 5000);
    assert_eq!(selected.label, "3");
}

#[test]
fn test_value_area_tie_takes_both_sides() {
    // bins: 10 | 30 | 40 | 30 | 10, target 84 of 120 -> one step adds both 30s
    let bars: Vec<Bar> = [10.0, 30.0, 40.0, 30.0, 10.0]
        .iter()
        .enumerate()
        .map(|(i, &volume)| {
            let low = i as f64 * 2.0;
            Bar::new(BASE_TIME + i as i64 * 60, low, low + 1.0, low, low + 1.0, volume)
        })
        .collect();
    let settings = ProfileSettings::new(2.0, RowsLayout::TickWidth { row_size: None }, 0.70);
    let profile = build_profile(&bars, &settings, &RangeOverride::none()).unwrap();

    assert_eq!(profile.poc_index, 2);
    assert_eq!((profile.val_index, profile.vah_index), (1, 3));
    assert_eq!(profile.va_volume, 100.0);
}

#[test]
fn test_profile_is_deterministic() {
    let bars = create_realistic_bars(300, 40.0);
    let settings = ProfileSettings::new(0.1, RowsLayout::Count { rows: 24 }, 0.70);

    let a = build_profile(&bars, &settings, &RangeOverride::none()).unwrap();
    let b = build_profile(&bars, &settings, &RangeOverride::none()).unwrap();
    assert_eq!(a, b);
    assert_eq!(
        settings.fingerprint(&bars, &RangeOverride::none()),
        settings.fingerprint(&bars, &RangeOverride::none())
    );
}

#[test]
fn test_period_profiles_truncate_at_budget() {
    // 5 days of hourly bars, budget for 3 sessions
    let bars: Vec<Bar> = (0..5 * 24)
        .map(|h| create_sample_bar(BASE_TIME + h * 3600, 100.0 + (h % 24) as f64, 10.0))
        .collect();
    let settings = ProfileSettings::new(0.5, RowsLayout::Count { rows: 24 }, 0.70);
    let budget = SegmentBudget {
        rows_per_period: 24,
        max_total_rows: 72,
    };
    let utc = chrono::FixedOffset::east_opt(0).unwrap();

    let result = build_period_profiles(&bars, CalendarPeriod::Session, utc, budget, &settings).unwrap();
    assert_eq!(result.profiles.len(), 3);
    assert!(result.truncated);
    assert_eq!(result.bars_dropped, 48);
    for period in &result.profiles {
        assert_eq!(period.profile.ltf_bars_used, 24);
    }
}
