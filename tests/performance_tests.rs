//! Performance tests for tilescan
//!
//! Timing thresholds are generous so the tests stay CI-friendly; the read
//! bounds are exact.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tilescan::{BoundingBox, MemoryBackend, Metric, Point, SpatialConfig, SpatialIndex};

fn germany() -> SpatialConfig {
    SpatialConfig::new(BoundingBox::new(46.988, 4.997, 55.022, 15.148), 25_000.0)
        .with_metric(Metric::Equirectangular)
}

fn random_point(rng: &mut StdRng, region: &BoundingBox) -> Point {
    Point::new(
        rng.gen_range(region.min_lat..region.max_lat),
        rng.gen_range(region.min_lon..region.max_lon),
    )
}

fn populated(count: usize, config: SpatialConfig) -> SpatialIndex<MemoryBackend> {
    let region = config.region;
    let index = SpatialIndex::new(config, MemoryBackend::new()).unwrap();
    let mut rng = StdRng::seed_from_u64(2024);
    for i in 0..count {
        index
            .index(format!("poi:{}", i), random_point(&mut rng, &region))
            .unwrap();
    }
    index
}

#[test]
fn test_indexing_performance() {
    let num_points = 10_000;

    let start = Instant::now();
    let index = populated(num_points, germany());
    let duration = start.elapsed();

    println!("Indexed {} points in {:?}", num_points, duration);
    println!(
        "Rate: {:.2} ops/sec",
        num_points as f64 / duration.as_secs_f64()
    );

    let stats = index.port().stats().unwrap();
    assert_eq!(stats.entity_count, num_points);
    assert_eq!(stats.key_count, num_points * 6);
    assert!(duration < Duration::from_secs(20));
}

#[test]
fn test_query_reads_are_bounded() {
    let index = populated(10_000, germany());
    let oversample = index.config().oversample;
    let mut rng = StdRng::seed_from_u64(5);
    let region = index.config().region;

    for count in [1usize, 5, 20, 100] {
        let before = index.port().stats().unwrap();
        let outcome = index
            .nearest(random_point(&mut rng, &region), count)
            .unwrap();
        let after = index.port().stats().unwrap();

        let read = after.entries_read - before.entries_read;
        assert_eq!(after.scan_count - before.scan_count, 4);
        assert!(
            read <= (4 * count * oversample) as u64,
            "count {} read {} entries",
            count,
            read
        );
        assert!(outcome.len() <= count);
    }
}

#[test]
fn test_default_read_budget_is_twice_count_per_direction() {
    let mut rng = StdRng::seed_from_u64(7);
    let region = germany().region;
    let query = random_point(&mut rng, &region);

    for (oversample, per_direction) in [(SpatialConfig::DEFAULT_OVERSAMPLE, 2usize), (1, 1)] {
        let index = populated(10_000, germany().with_oversample(oversample));
        for count in [1usize, 10, 50] {
            let before = index.port().stats().unwrap().entries_read;
            index.nearest(query, count).unwrap();
            let read = index.port().stats().unwrap().entries_read - before;
            assert!(
                read <= (4 * per_direction * count) as u64,
                "oversample {} count {} read {} entries",
                oversample,
                count,
                read
            );
        }
    }
}

#[test]
fn test_query_performance() {
    let index = populated(10_000, germany());
    let mut rng = StdRng::seed_from_u64(6);
    let region = index.config().region;
    let queries: Vec<Point> = (0..1_000).map(|_| random_point(&mut rng, &region)).collect();

    let start = Instant::now();
    let mut found = 0;
    for query in &queries {
        found += index.nearest(*query, 10).unwrap().len();
    }
    let duration = start.elapsed();

    println!("Ran {} queries in {:?}", queries.len(), duration);
    assert_eq!(found, queries.len() * 10);
    assert!(duration < Duration::from_secs(20));
}

#[test]
fn test_concurrent_queries() {
    let index = Arc::new(populated(5_000, germany().with_parallel_scans(true)));
    let start = Instant::now();

    let handles: Vec<_> = (0..4u64)
        .map(|t| {
            let index = Arc::clone(&index);
            thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(t);
                let region = index.config().region;
                for _ in 0..200 {
                    let outcome = index.nearest(random_point(&mut rng, &region), 5).unwrap();
                    assert!(outcome.is_complete());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let duration = start.elapsed();
    println!("Ran 800 concurrent queries in {:?}", duration);
    assert_eq!(index.port().stats().unwrap().scan_count, 800 * 4);
    assert!(duration < Duration::from_secs(30));
}
