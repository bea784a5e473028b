//! Property tests for grids, aggregation, heatmaps and agreement.

mod support;

use chrono::{DateTime, Duration, FixedOffset};
use proptest::prelude::*;

use osmose_rust::models::Timebin;
use osmose_rust::services::{
    aggregate, build_grid, build_heatmap, compare, concordance, Resolution,
};

use support::{selection, ts};

fn origin() -> DateTime<FixedOffset> {
    ts("2023-02-11T12:34:56+01:00")
}

/// Detection offsets in seconds around the origin, some outside any grid.
fn detections_strategy() -> impl Strategy<Value = Vec<DateTime<FixedOffset>>> {
    prop::collection::vec(-7_200i64..200_000, 0..200)
        .prop_map(|secs| secs.into_iter().map(|s| origin() + Duration::seconds(s)).collect())
}

/// Detections snapped to a 10 s timebin.
fn timebin_detections_strategy() -> impl Strategy<Value = Vec<DateTime<FixedOffset>>> {
    prop::collection::vec(0i64..8_640, 0..60).prop_map(|slots| {
        let start = ts("2023-02-11T12:00:00+01:00");
        slots
            .into_iter()
            .map(|slot| start + Duration::seconds(slot * 10))
            .collect()
    })
}

proptest! {
    #[test]
    fn prop_fixed_grid_monotonic_covering_and_evenly_spaced(
        span_s in 0i64..400_000,
        bin_minutes in 1u32..1_440,
    ) {
        let begin = origin();
        let end = begin + Duration::seconds(span_s);
        let grid = build_grid(begin, end, Resolution::Minutes { bin_minutes }, Timebin::new(10)).unwrap();
        let b = grid.boundaries();

        prop_assert!(b.len() >= 2);
        prop_assert!(b[0] <= begin);
        prop_assert!(b[b.len() - 1] >= end);
        for pair in b.windows(2) {
            prop_assert_eq!((pair[1] - pair[0]).num_seconds(), i64::from(bin_minutes) * 60);
        }
    }

    #[test]
    fn prop_calendar_grid_monotonic_and_covering(
        span_days in 0i64..800,
        mode in 0usize..3,
    ) {
        let resolution = [Resolution::Days, Resolution::Weeks, Resolution::Months][mode];
        let begin = origin();
        let end = begin + Duration::days(span_days);
        let grid = build_grid(begin, end, resolution, Timebin::new(60)).unwrap();
        let b = grid.boundaries();

        prop_assert!(b[0] <= begin);
        prop_assert!(b[b.len() - 1] >= end);
        prop_assert!(b.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn prop_aggregation_conserves_in_range_detections(
        detections in detections_strategy(),
        span_s in 600i64..150_000,
        bin_minutes in 1u32..600,
    ) {
        let grid = build_grid(
            origin(),
            origin() + Duration::seconds(span_s),
            Resolution::Minutes { bin_minutes },
            Timebin::new(10),
        )
        .unwrap();

        let in_range = detections
            .iter()
            .filter(|d| **d >= grid.begin() && **d < grid.end())
            .count() as u64;
        let result = aggregate(&detections, &grid);

        prop_assert_eq!(result.total(), in_range);
        prop_assert_eq!(result.total() + result.dropped as u64, detections.len() as u64);
    }

    #[test]
    fn prop_aggregation_is_idempotent(detections in detections_strategy()) {
        let grid = build_grid(
            origin(),
            origin() + Duration::days(2),
            Resolution::Days,
            Timebin::new(10),
        )
        .unwrap();
        prop_assert_eq!(aggregate(&detections, &grid), aggregate(&detections, &grid));
    }

    #[test]
    fn prop_heatmap_total_matches_in_range_count(
        detections in detections_strategy(),
        span_s in 0i64..300_000,
        offset_h in -11i32..12,
    ) {
        let begin = origin();
        let end = begin + Duration::seconds(span_s);
        let offset = FixedOffset::east_opt(offset_h * 3600).unwrap();

        let matrix = build_heatmap(&detections, begin, end, offset).unwrap();
        let in_range = detections.iter().filter(|d| **d >= begin && **d < end).count() as u64;

        prop_assert_eq!(matrix.total(), in_range);
        prop_assert_eq!(matrix.cells.len(), 24);
    }

    #[test]
    fn prop_agreement_is_symmetric(
        a in timebin_detections_strategy(),
        b in timebin_detections_strategy(),
    ) {
        let ab = concordance(&a, &b);
        let ba = concordance(&b, &a);
        prop_assert_eq!(ab.agreement_pct, ba.agreement_pct);
        prop_assert!((0.0..=100.0).contains(&ab.agreement_pct));

        let grid = build_grid(
            ts("2023-02-11T12:00:00+01:00"),
            ts("2023-02-12T12:00:00+01:00"),
            Resolution::Minutes { bin_minutes: 60 },
            Timebin::new(10),
        )
        .unwrap();
        let sel_a = selection("expert", "Whistle", 10, a);
        let sel_b = selection("detector", "Whistle", 10, b);
        let r_ab = compare(&sel_a, &sel_b, &grid).unwrap().correlation;
        let r_ba = compare(&sel_b, &sel_a, &grid).unwrap().correlation;
        match (r_ab, r_ba) {
            (Some(x), Some(y)) => prop_assert!((x - y).abs() < 1e-12),
            (None, None) => {}
            _ => prop_assert!(false, "correlation defined on one side only"),
        }
    }

    #[test]
    fn prop_self_agreement_is_total(a in timebin_detections_strategy()) {
        let grid = build_grid(
            ts("2023-02-11T12:00:00+01:00"),
            ts("2023-02-12T12:00:00+01:00"),
            Resolution::Minutes { bin_minutes: 60 },
            Timebin::new(10),
        )
        .unwrap();
        let sel = selection("expert", "Whistle", 10, a);
        let result = compare(&sel, &sel, &grid).unwrap();

        prop_assert_eq!(result.agreement_pct, 100.0);
        if let Some(r) = result.correlation {
            prop_assert!((r - 1.0).abs() < 1e-9);
        }
    }
}
