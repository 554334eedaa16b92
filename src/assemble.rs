//! Result assembly.

use crate::planner::Direction;
use crate::sweep::ScanResult;
use crate::types::EntityId;
use smallvec::SmallVec;

/// Directions whose scans failed during a query.
///
/// Reported on the outcome instead of as an error: the answer is still
/// usable, and its radius already accounts for the missing directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialScanFailure {
    pub failed: SmallVec<[Direction; 4]>,
}

/// The answer to a proximity query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    /// Closest first; ties ordered by entity id.
    pub results: Vec<ScanResult>,
    /// Distance within which the results are proven complete. Every indexed
    /// point missing from `results` is at least this far from the query.
    pub radius: f64,
    pub partial_failure: Option<PartialScanFailure>,
}

impl QueryOutcome {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// True when no directional scan failed.
    pub fn is_complete(&self) -> bool {
        self.partial_failure.is_none()
    }

    /// Results within the guaranteed radius.
    pub fn verified(&self) -> impl Iterator<Item = &ScanResult> {
        self.results
            .iter()
            .take_while(move |result| result.distance <= self.radius)
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.results.iter().map(|result| result.id.clone()).collect()
    }
}

/// Sort `results` by distance, keep the first `count` and attach `radius`.
///
/// Candidates cut by the truncation are known points, so the reported radius
/// never extends past the first of them.
pub fn assemble(mut results: Vec<ScanResult>, count: usize, radius: f64) -> QueryOutcome {
    results.sort_by(|a, b| a.distance.total_cmp(&b.distance).then_with(|| a.id.cmp(&b.id)));

    let radius = match results.get(count) {
        Some(first_cut) => radius.min(first_cut.distance),
        None => radius,
    };
    results.truncate(count);

    QueryOutcome {
        results,
        radius,
        partial_failure: None,
    }
}
