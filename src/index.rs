use crate::assemble::{PartialScanFailure, QueryOutcome, assemble};
use crate::encoding::EncodedKeys;
use crate::error::{Result, SpatialError};
use crate::grid::Grid;
use crate::radius::guaranteed_radius;
use crate::spatial::Point;
use crate::storage::RangeScanPort;
use crate::sweep::SweepExecutor;
use crate::types::{Consistency, EntityId, SpatialConfig};
use smallvec::SmallVec;
use std::sync::Arc;

/// A nearest-neighbour request.
///
/// # Examples
///
/// ```rust
/// use tilescan::{Consistency, Point, ProximityQuery};
///
/// let query = ProximityQuery::new(Point::new(52.52, 13.405), 5)
///     .within(25_000.0)
///     .excluding("store:berlin-mitte")
///     .with_consistency(Consistency::Strong);
/// assert_eq!(query.count, 5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityQuery {
    pub point: Point,
    pub count: usize,
    /// Ignore candidates further away than this; also caps the scans.
    pub max_distance: Option<f64>,
    /// Leave this entity out of the results, e.g. the record the query is
    /// centred on.
    pub exclude: Option<EntityId>,
    pub consistency: Consistency,
}

impl ProximityQuery {
    pub fn new(point: Point, count: usize) -> Self {
        Self {
            point,
            count,
            max_distance: None,
            exclude: None,
            consistency: Consistency::default(),
        }
    }

    pub fn within(mut self, max_distance: f64) -> Self {
        self.max_distance = Some(max_distance);
        self
    }

    pub fn excluding(mut self, id: impl Into<EntityId>) -> Self {
        self.exclude = Some(id.into());
        self
    }

    pub fn with_consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = consistency;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.count == 0 {
            return Err(SpatialError::invalid("count must be at least 1"));
        }
        if let Some(max_distance) = self.max_distance {
            if max_distance.is_nan() || max_distance <= 0.0 {
                return Err(SpatialError::invalid(format!(
                    "max_distance must be positive, got {max_distance}"
                )));
            }
        }
        Ok(())
    }
}

/// Proximity index for one spatial field.
///
/// Owns the field's configuration and talks to the storage port that holds
/// the owning records. Index entities when they are saved, deindex them when
/// they are deleted and ask for the entities nearest a point with
/// [`SpatialIndex::query`].
///
/// # Examples
///
/// ```rust
/// use tilescan::{BoundingBox, EntityId, MemoryBackend, Point, SpatialConfig, SpatialIndex};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let region = BoundingBox::new(-10.0, -10.0, 10.0, 10.0);
/// let index = SpatialIndex::new(SpatialConfig::new(region, 5.0), MemoryBackend::new())?;
///
/// index.index("a", Point::new(0.0, 1.0))?;
/// index.index("b", Point::new(3.0, 3.0))?;
/// index.index("c", Point::new(-0.5, 0.0))?;
///
/// let outcome = index.nearest(Point::new(0.0, 0.0), 2)?;
/// assert_eq!(outcome.ids(), vec![EntityId::from("c"), EntityId::from("a")]);
/// assert!(outcome.radius >= 1.0);
/// # Ok(())
/// # }
/// ```
pub struct SpatialIndex<P> {
    config: Arc<SpatialConfig>,
    grid: Grid,
    port: P,
}

impl<P: RangeScanPort> SpatialIndex<P> {
    pub fn new(config: SpatialConfig, port: P) -> Result<Self> {
        let grid = Grid::new(&config)?;
        Ok(Self {
            config: Arc::new(config),
            grid,
            port,
        })
    }

    pub fn config(&self) -> &SpatialConfig {
        &self.config
    }

    /// Shared handle to the configuration.
    pub fn shared_config(&self) -> Arc<SpatialConfig> {
        Arc::clone(&self.config)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    /// Compute the keys for `point` without storing anything.
    pub fn encode(&self, point: &Point) -> Result<EncodedKeys> {
        self.grid.encode(point)
    }

    /// Index `point` for entity `id`, replacing whatever was stored before.
    ///
    /// Points outside the region are rejected before anything is written.
    pub fn index(&self, id: impl Into<EntityId>, point: Point) -> Result<EncodedKeys> {
        let id = id.into();
        let keys = match self.grid.encode(&point) {
            Ok(keys) => keys,
            Err(err) => {
                log::warn!("not indexing {}: {}", id, err);
                return Err(err);
            }
        };
        self.port.put(&id, &keys)?;
        log::debug!("indexed {} at {}", id, point);
        Ok(keys)
    }

    /// Remove entity `id` from the index. Returns whether it was indexed.
    pub fn deindex(&self, id: &EntityId) -> Result<bool> {
        let removed = self.port.delete(id)?;
        log::debug!("deindexed {} (present: {})", id, removed);
        Ok(removed)
    }

    /// The `count` indexed entities nearest to `point`.
    pub fn nearest(&self, point: Point, count: usize) -> Result<QueryOutcome> {
        self.query(&ProximityQuery::new(point, count))
    }

    /// Answer a proximity query.
    ///
    /// Argument and region checks happen before any scan is issued. When some
    /// but not all directional scans fail, the outcome carries a
    /// [`PartialScanFailure`] and a correspondingly smaller radius.
    pub fn query(&self, query: &ProximityQuery) -> Result<QueryOutcome> {
        query.validate()?;
        if !self.port.supports(query.consistency) {
            return Err(SpatialError::invalid(format!(
                "storage does not support {:?} reads",
                query.consistency
            )));
        }
        let planar = match self.grid.locate(&query.point) {
            Ok(planar) => planar,
            Err(err) => {
                log::warn!("rejecting query at {}: {}", query.point, err);
                return Err(err);
            }
        };

        let clip = match query.max_distance {
            Some(max_distance) => self.config.max_radius.min(max_distance),
            None => self.config.max_radius,
        };
        let limit = query.count.saturating_mul(self.config.oversample);
        let specs = self.grid.plan_scans(&planar, limit, clip);
        for spec in &specs {
            log::trace!(
                "{} scan on {}: [{:?}, {:?}] limit {} reach {}",
                spec.direction,
                spec.axis,
                spec.lower,
                spec.upper,
                spec.limit,
                spec.reach
            );
        }

        let sweep = SweepExecutor::new(&self.grid, &self.port)
            .consistency(query.consistency)
            .parallel(self.config.parallel_scans)
            .execute(&specs, &query.point)?;
        let radius = guaranteed_radius(&specs, &sweep.reports);
        let failed: SmallVec<[_; 4]> = sweep.failed_directions().collect();

        let candidates = sweep
            .results
            .into_iter()
            .filter(|result| query.exclude.as_ref() != Some(&result.id))
            .filter(|result| query.max_distance.is_none_or(|max| result.distance <= max))
            .collect();
        let mut outcome = assemble(candidates, query.count, radius);
        if let Some(max_distance) = query.max_distance {
            outcome.radius = outcome.radius.min(max_distance);
        }
        if !failed.is_empty() {
            outcome.partial_failure = Some(PartialScanFailure { failed });
        }

        log::debug!(
            "query at {} for {}: {} results, guaranteed radius {}",
            query.point,
            query.count,
            outcome.len(),
            outcome.radius
        );
        Ok(outcome)
    }
}
