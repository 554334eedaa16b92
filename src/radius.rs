//! Guaranteed-correctness radius.
//!
//! Every unseen point on the north side of the query has a latitude offset at
//! least as large as the north scan's frontier, and likewise for the other
//! three directions. The smallest of the four frontiers is therefore a
//! distance within which nothing can have been missed.

use crate::planner::ScanSpec;
use crate::sweep::{DirectionReport, ScanStatus};

/// What a single direction proves, as an axis distance from the query.
///
/// A scan that filled its limit proves only up to its furthest entry. A scan
/// that came back short saw everything within its reach. A failed scan proves
/// nothing.
pub fn direction_bound(spec: &ScanSpec, status: &ScanStatus) -> f64 {
    match status {
        ScanStatus::Failed { .. } => 0.0,
        ScanStatus::Completed { returned, frontier } if *returned >= spec.limit => frontier
            .map(|offset| offset.max(0.0).min(spec.exhausted_bound()))
            .unwrap_or(0.0),
        ScanStatus::Completed { .. } => spec.exhausted_bound(),
    }
}

/// The minimum of the per-direction bounds over all planned scans.
///
/// `reports` must be in the same order as `specs`, as produced by
/// [`SweepExecutor::execute`](crate::sweep::SweepExecutor::execute).
pub fn guaranteed_radius(specs: &[ScanSpec], reports: &[DirectionReport]) -> f64 {
    specs
        .iter()
        .zip(reports)
        .map(|(spec, report)| {
            debug_assert_eq!(spec.direction, report.direction);
            direction_bound(spec, &report.status)
        })
        .fold(f64::INFINITY, f64::min)
}
