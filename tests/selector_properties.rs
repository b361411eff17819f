//! Property-based tests for tile selection and caching

use fast_tiletrack::core::{
    Chromosome, Genome, LocusScore, TileConfig, TileSelector, ViewMode, WindowFunction,
};
use fast_tiletrack::formats::IntervalDataSource;
use proptest::prelude::*;
use std::sync::Arc;

const CHR_LENGTH: i64 = 16_384;

fn genome() -> Arc<Genome> {
    Arc::new(
        Genome::new(
            "test",
            vec![
                Chromosome::new("chr1", CHR_LENGTH as u64),
                Chromosome::new("chr2", 5_000),
            ],
        )
        .unwrap(),
    )
}

/// Sorted, non-overlapping features inside chr1
fn arb_features() -> impl Strategy<Value = Vec<(i64, i64, f32)>> {
    prop::collection::vec((0i64..400, 1i64..300, -10.0f32..10.0), 1..100).prop_map(|parts| {
        let mut pos = 0;
        let mut features = Vec::new();
        for (gap, len, value) in parts {
            let start = pos + gap;
            let end = (start + len).min(CHR_LENGTH);
            if start >= end {
                break;
            }
            features.push((start, end, value));
            pos = end;
        }
        features
    })
}

fn arb_window_function() -> impl Strategy<Value = WindowFunction> {
    prop::sample::select(WindowFunction::ALL.to_vec())
}

fn source(features: &[(i64, i64, f32)]) -> IntervalDataSource {
    let mut source = IntervalDataSource::new();
    for &(s, e, v) in features {
        source.add("chr1", s, e, v, None);
    }
    source
}

fn selector(
    features: &[(i64, i64, f32)],
    window_function: WindowFunction,
) -> TileSelector<IntervalDataSource> {
    let config = TileConfig {
        bins_per_tile: 100,
        ..TileConfig::default()
    };
    let selector = TileSelector::with_config(genome(), source(features), config);
    selector.set_window_function(window_function);
    selector
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: a range split on a tile boundary returns the same scores
    #[test]
    fn prop_split_at_tile_boundary(
        features in arb_features(),
        wf in arb_window_function(),
        zoom in 1u32..5,
        split in 1u64..16,
    ) {
        let selector = selector(&features, wf);
        let n_tiles = 1u64 << zoom;
        let boundary = (split % n_tiles).max(1) as i64 * (CHR_LENGTH / n_tiles as i64);

        let whole = selector.summary_scores_for_range("chr1", 0i64, CHR_LENGTH, zoom).unwrap();
        let mut parts = selector.summary_scores_for_range("chr1", 0i64, boundary, zoom).unwrap();
        parts.extend(selector.summary_scores_for_range("chr1", boundary, CHR_LENGTH, zoom).unwrap());

        prop_assert_eq!(whole, parts);
    }

    /// Property: aggregated scores are ordered and disjoint across tiles
    #[test]
    fn prop_scores_ordered_and_disjoint(features in arb_features(), zoom in 0u32..6) {
        let selector = selector(&features, WindowFunction::Mean);
        let scores = selector.summary_scores_for_range("chr1", 0i64, CHR_LENGTH, zoom).unwrap();

        for pair in scores.windows(2) {
            prop_assert!(pair[0].end() <= pair[1].start(),
                "{:?} overlaps {:?}", pair[0], pair[1]);
        }
        let represented: usize = scores
            .iter()
            .map(|s| match s {
                LocusScore::Named(_) => 1,
                LocusScore::Composite(c) => c.feature_count,
            })
            .sum();
        // A feature crossing a tile boundary is counted once per tile
        prop_assert!(represented >= features.len());
    }

    /// Property: switching the window function never serves cached scores
    /// computed under the previous one
    #[test]
    fn prop_window_function_switch_not_stale(
        features in arb_features(),
        first in arb_window_function(),
        second in arb_window_function(),
        zoom in 0u32..4,
        start in 0i64..CHR_LENGTH,
        len in 1i64..4000,
    ) {
        let end = start + len;
        let switched = selector(&features, first);
        switched.summary_scores_for_range("chr1", start, end, zoom).unwrap();
        switched.set_window_function(second);
        let after = switched.summary_scores_for_range("chr1", start, end, zoom).unwrap();

        let fresh = selector(&features, second);
        let expected = fresh.summary_scores_for_range("chr1", start, end, zoom).unwrap();
        prop_assert_eq!(after, expected);
    }

    /// Property: the cache never holds more tiles than its capacity
    #[test]
    fn prop_cache_bounded(
        features in arb_features(),
        capacity in 1usize..8,
        queries in prop::collection::vec((0i64..CHR_LENGTH, 1i64..CHR_LENGTH, 0u32..6), 1..20),
    ) {
        let config = TileConfig {
            bins_per_tile: 50,
            cache_capacity: capacity,
            ..TileConfig::default()
        };
        let selector = TileSelector::with_config(genome(), source(&features), config);
        for (start, len, zoom) in queries {
            selector.summary_scores_for_range("chr1", start, start + len, zoom).unwrap();
            prop_assert!(selector.cache().len() <= capacity);
        }
    }

    /// Property: repeated queries return identical scores from the cache
    #[test]
    fn prop_cached_results_stable(
        features in arb_features(),
        wf in arb_window_function(),
        zoom in 0u32..6,
        start in 0i64..CHR_LENGTH,
        len in 1i64..CHR_LENGTH,
    ) {
        let selector = selector(&features, wf);
        let first = selector.summary_scores_for_range("chr1", start, start + len, zoom).unwrap();
        let second = selector.summary_scores_for_range("chr1", start, start + len, zoom).unwrap();
        prop_assert_eq!(first, second);
    }
}

#[test]
fn test_gene_list_mode_matches_single_tile() {
    let features = [(0, 10, 1.0), (10, 20, 3.0), (100, 150, 5.0)];
    let selector = selector(&features, WindowFunction::Max);
    selector.set_view_mode(ViewMode::GeneList);

    let scores = selector.summary_scores_for_range("chr1", 0i64, 200i64, 3).unwrap();
    assert!(selector.cache().is_empty());
    assert!(scores.iter().all(|s| s.end().base <= 200));
    assert_eq!(scores.last().map(|s| s.value()), Some(5.0));
}

#[test]
fn test_unknown_chromosome_is_empty() {
    let selector = selector(&[(0, 10, 1.0)], WindowFunction::Mean);
    assert!(selector
        .summary_scores_for_range("chrUn", 0i64, 100i64, 0)
        .unwrap()
        .is_empty());
    assert!(selector
        .summary_scores_for_range("chr2", 0i64, 100i64, 0)
        .unwrap()
        .is_empty());
}

#[test]
fn test_concurrent_queries_agree() {
    let features: Vec<(i64, i64, f32)> = (0..500)
        .map(|i| (i * 30, i * 30 + 20, (i % 17) as f32))
        .collect();
    let shared = selector(&features, WindowFunction::Median);
    let reference = selector(&features, WindowFunction::Median);

    let ranges: Vec<(i64, i64, u32)> = (0..16)
        .map(|i| ((i * 997) % CHR_LENGTH, (i * 997) % CHR_LENGTH + 2500, (i % 5) as u32))
        .collect();
    let expected: Vec<Vec<LocusScore>> = ranges
        .iter()
        .map(|&(s, e, z)| reference.summary_scores_for_range("chr1", s, e, z).unwrap())
        .collect();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    ranges
                        .iter()
                        .map(|&(s, e, z)| shared.summary_scores_for_range("chr1", s, e, z).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
    assert!(shared.cache().len() <= shared.cache().capacity());
}

#[test]
fn test_export_covers_every_chromosome() {
    let selector = selector(&[(0, 100, 2.0), (CHR_LENGTH - 10, CHR_LENGTH, 4.0)], WindowFunction::Mean);
    let exported = selector.export(2).unwrap();

    let names: Vec<&str> = exported.iter().map(|(c, _)| c.as_str()).collect();
    assert!(names.contains(&"chr1") && names.contains(&"chr2"));
    let chr1 = &exported.iter().find(|(c, _)| c == "chr1").unwrap().1;
    assert_eq!(chr1.len(), 2);
    assert_eq!(chr1[1].end().base, CHR_LENGTH);
}
