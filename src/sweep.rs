//! Sweep executor.
//!
//! Runs the planned directional scans against the storage port, merges their
//! hits by entity and measures every surviving candidate against the query
//! point with the configured planar metric.

use crate::error::{Result, SpatialError};
use crate::grid::Grid;
use crate::planner::{Direction, ScanSpec};
use crate::spatial::Point;
use crate::storage::{IndexedEntry, RangeScanPort, ScanRequest};
use crate::types::{Consistency, EntityId};
use rustc_hash::FxHashSet;

/// A candidate found by the sweep, with its distance from the query point.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    pub id: EntityId,
    pub point: Point,
    pub distance: f64,
}

/// What one directional scan produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanStatus {
    Completed {
        returned: usize,
        /// Axis offset of the furthest entry returned, if any.
        frontier: Option<f64>,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectionReport {
    pub direction: Direction,
    pub status: ScanStatus,
}

impl DirectionReport {
    pub fn failed(&self) -> bool {
        matches!(self.status, ScanStatus::Failed { .. })
    }
}

/// Merged candidates plus one report per directional scan, in plan order.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepOutcome {
    pub results: Vec<ScanResult>,
    pub reports: Vec<DirectionReport>,
}

impl SweepOutcome {
    pub fn failed_directions(&self) -> impl Iterator<Item = Direction> + '_ {
        self.reports
            .iter()
            .filter(|report| report.failed())
            .map(|report| report.direction)
    }
}

/// Issues directional scans against one storage port.
pub struct SweepExecutor<'a, P: ?Sized> {
    grid: &'a Grid,
    storage: &'a P,
    consistency: Consistency,
    parallel: bool,
}

impl<'a, P: RangeScanPort + ?Sized> SweepExecutor<'a, P> {
    pub fn new(grid: &'a Grid, storage: &'a P) -> Self {
        Self {
            grid,
            storage,
            consistency: Consistency::default(),
            parallel: false,
        }
    }

    pub fn consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = consistency;
        self
    }

    /// Run the scans of one query on separate threads.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Execute `specs` and merge their hits.
    ///
    /// A scan that fails leaves its direction empty and is reported as
    /// failed; only when every scan fails is the whole sweep an error.
    pub fn execute(&self, specs: &[ScanSpec], query_point: &Point) -> Result<SweepOutcome> {
        let scanned = if self.parallel {
            self.scan_parallel(specs)
        } else {
            specs.iter().map(|spec| self.scan_one(spec)).collect()
        };

        let query = self.grid.projection().project(query_point);
        let mut seen = FxHashSet::default();
        let mut results = Vec::new();
        let mut reports = Vec::with_capacity(specs.len());
        let mut last_error = None;

        for (spec, scanned) in specs.iter().zip(scanned) {
            let status = match scanned {
                Ok(entries) => {
                    let frontier = entries.last().map(|entry| {
                        let position = self
                            .grid
                            .projection()
                            .project(&entry.point())
                            .coordinate(spec.axis);
                        spec.direction.offset(spec.origin, position)
                    });
                    let returned = entries.len();
                    for entry in entries {
                        if seen.insert(entry.id.clone()) {
                            let point = entry.point();
                            let distance = query.distance(&self.grid.projection().project(&point));
                            results.push(ScanResult {
                                id: entry.id,
                                point,
                                distance,
                            });
                        }
                    }
                    ScanStatus::Completed { returned, frontier }
                }
                Err(err) => {
                    log::warn!("{} scan failed: {}", spec.direction, err);
                    let error = err.to_string();
                    last_error = Some(error.clone());
                    ScanStatus::Failed { error }
                }
            };
            reports.push(DirectionReport {
                direction: spec.direction,
                status,
            });
        }

        if !specs.is_empty() && reports.iter().all(DirectionReport::failed) {
            return Err(SpatialError::StorageUnavailable {
                attempted: specs.len(),
                last_error: last_error.unwrap_or_default(),
            });
        }

        Ok(SweepOutcome { results, reports })
    }

    fn scan_one(&self, spec: &ScanSpec) -> Result<Vec<IndexedEntry>> {
        self.storage
            .scan(&ScanRequest::from_spec(spec, self.consistency))
    }

    fn scan_parallel(&self, specs: &[ScanSpec]) -> Vec<Result<Vec<IndexedEntry>>> {
        std::thread::scope(|scope| {
            let handles: Vec<_> = specs
                .iter()
                .map(|spec| scope.spawn(move || self.scan_one(spec)))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(SpatialError::ScanFailed("scan thread panicked".into())))
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::BoundingBox;
    use crate::storage::MemoryBackend;
    use crate::types::SpatialConfig;

    fn setup(points: &[(&str, f64, f64)]) -> (Grid, MemoryBackend) {
        let config = SpatialConfig::new(BoundingBox::new(-10.0, -10.0, 10.0, 10.0), 5.0);
        let grid = Grid::new(&config).unwrap();
        let backend = MemoryBackend::new();
        for &(id, lat, lon) in points {
            let keys = grid.encode(&Point::new(lat, lon)).unwrap();
            backend.put(&id.into(), &keys).unwrap();
        }
        (grid, backend)
    }

    #[test]
    fn test_execute_merges_duplicates() {
        let (grid, backend) = setup(&[("a", 0.0, 0.0), ("b", 1.0, 1.0), ("c", -2.0, 0.5)]);
        let query = Point::new(0.0, 0.0);
        let specs = grid.plan_scans(&grid.locate(&query).unwrap(), 10, 5.0);
        let outcome = SweepExecutor::new(&grid, &backend).execute(&specs, &query).unwrap();

        let mut ids: Vec<String> = outcome.results.iter().map(|r| r.id.to_string()).collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(outcome.reports.len(), 4);
        assert_eq!(outcome.failed_directions().count(), 0);

        let b = outcome.results.iter().find(|r| r.id == "b".into()).unwrap();
        assert!((b.distance - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_frontier_is_axis_offset_of_last_entry() {
        let (grid, backend) = setup(&[("a", 1.0, 3.0), ("b", 2.0, -4.0), ("c", 4.0, 0.0)]);
        let query = Point::new(0.0, 0.0);
        let specs = grid.plan_scans(&grid.locate(&query).unwrap(), 2, 5.0);
        let outcome = SweepExecutor::new(&grid, &backend).execute(&specs, &query).unwrap();

        assert_eq!(outcome.reports[0].direction, Direction::North);
        assert_eq!(
            outcome.reports[0].status,
            ScanStatus::Completed {
                returned: 2,
                frontier: Some(2.0)
            }
        );
        assert_eq!(
            outcome.reports[1].status,
            ScanStatus::Completed {
                returned: 0,
                frontier: None
            }
        );
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let points: Vec<(String, f64, f64)> = (0..40)
            .map(|i| (format!("p{i}"), (i as f64 * 0.37) % 9.0, (i as f64 * 0.73) % 9.0 - 4.5))
            .collect();
        let borrowed: Vec<(&str, f64, f64)> =
            points.iter().map(|(id, lat, lon)| (id.as_str(), *lat, *lon)).collect();
        let (grid, backend) = setup(&borrowed);
        let query = Point::new(2.0, 0.0);
        let specs = grid.plan_scans(&grid.locate(&query).unwrap(), 6, 5.0);

        let sequential = SweepExecutor::new(&grid, &backend).execute(&specs, &query).unwrap();
        let parallel = SweepExecutor::new(&grid, &backend)
            .parallel(true)
            .execute(&specs, &query)
            .unwrap();
        assert_eq!(sequential, parallel);
    }
}
