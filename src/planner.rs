//! Range-scan planning.
//!
//! A scan along one axis only bounds distance along that axis: points in the
//! same latitude band can be arbitrarily far away in longitude. Four scans,
//! one per compass direction, bound both axes at once, and ranking their
//! union by true distance turns "near in projection" into "near in the plane"
//! for at most four times the per-direction limit in reads.

use crate::encoding::AxisKey;
use crate::error::{Result, SpatialError};
use crate::grid::{Axis, Grid, PlanarPoint};
use crate::spatial::Point;
use crate::types::SpatialConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    pub fn axis(&self) -> Axis {
        match self {
            Direction::North | Direction::South => Axis::NorthSouth,
            Direction::East | Direction::West => Axis::EastWest,
        }
    }

    pub fn order(&self) -> ScanOrder {
        match self {
            Direction::North | Direction::East => ScanOrder::Ascending,
            Direction::South | Direction::West => ScanOrder::Descending,
        }
    }

    /// Distance along the axis from `origin` to `position`, signed so that
    /// positions in this direction are non-negative.
    pub fn offset(&self, origin: f64, position: f64) -> f64 {
        match self.order() {
            ScanOrder::Ascending => position - origin,
            ScanOrder::Descending => origin - position,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanOrder {
    Ascending,
    Descending,
}

/// One planned directional range scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSpec {
    pub direction: Direction,
    pub axis: Axis,
    /// Inclusive key bounds; `None` leaves that end open.
    pub lower: Option<AxisKey>,
    pub upper: Option<AxisKey>,
    pub order: ScanOrder,
    pub limit: usize,
    /// Query position on `axis`, in plane units.
    pub origin: f64,
    /// Axis distance from `origin` that the bounds cover.
    pub reach: f64,
    /// No indexed point can exist beyond `reach` because the region ends there.
    pub reaches_region_edge: bool,
}

impl ScanSpec {
    /// What this direction proves when the scan came back short of `limit`.
    pub fn exhausted_bound(&self) -> f64 {
        if self.reaches_region_edge {
            f64::INFINITY
        } else {
            self.reach
        }
    }
}

impl Grid {
    /// Plan the four directional scans for `query` with a per-direction
    /// `limit`, clipping every scan to `clip` along its axis.
    pub fn plan_scans(&self, query: &PlanarPoint, limit: usize, clip: f64) -> Vec<ScanSpec> {
        Direction::ALL
            .iter()
            .map(|&direction| {
                let axis = direction.axis();
                let tiling = self.tiling(axis);
                let origin = query.coordinate(axis);
                let tile = tiling.central_tile(origin);
                let (below, above) = tiling.margins(tile, origin);
                let (region_low, region_high) = tiling.region_extent();

                let (lower, upper, reach, reaches_region_edge) = match direction.order() {
                    ScanOrder::Ascending => {
                        let reach = clip.min(above);
                        (
                            AxisKey::new(tile, origin),
                            AxisKey::new(tile, origin + clip),
                            reach,
                            origin + reach > region_high,
                        )
                    }
                    ScanOrder::Descending => {
                        let reach = clip.min(below);
                        (
                            AxisKey::new(tile, origin - clip),
                            AxisKey::new(tile, origin),
                            reach,
                            origin - reach < region_low,
                        )
                    }
                };

                ScanSpec {
                    direction,
                    axis,
                    lower: Some(lower),
                    upper: Some(upper),
                    order: direction.order(),
                    limit,
                    origin,
                    reach,
                    reaches_region_edge,
                }
            })
            .collect()
    }
}

/// Plan the scans answering a `count`-nearest query around `query_point`.
///
/// Each direction fetches `count * config.oversample` entries and is clipped
/// to `config.max_radius`.
pub fn plan(query_point: &Point, count: usize, config: &SpatialConfig) -> Result<Vec<ScanSpec>> {
    if count == 0 {
        return Err(SpatialError::invalid("count must be at least 1"));
    }
    let grid = Grid::new(config)?;
    let planar = grid.locate(query_point)?;
    let limit = count.saturating_mul(config.oversample);
    Ok(grid.plan_scans(&planar, limit, config.max_radius))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::BoundingBox;

    fn config() -> SpatialConfig {
        SpatialConfig::new(BoundingBox::new(-10.0, -10.0, 10.0, 10.0), 5.0)
    }

    #[test]
    fn test_plan_emits_four_directions() {
        let specs = plan(&Point::new(1.0, 2.0), 3, &config()).unwrap();
        let directions: Vec<Direction> = specs.iter().map(|s| s.direction).collect();
        assert_eq!(directions, Direction::ALL.to_vec());
        assert!(specs.iter().all(|s| s.limit == 6));

        let north = &specs[0];
        assert_eq!(north.axis, Axis::NorthSouth);
        assert_eq!(north.order, ScanOrder::Ascending);
        assert_eq!(north.origin, 1.0);
        assert_eq!(north.lower.unwrap().position(), 1.0);
        assert_eq!(north.upper.unwrap().position(), 6.0);

        let west = &specs[3];
        assert_eq!(west.axis, Axis::EastWest);
        assert_eq!(west.order, ScanOrder::Descending);
        assert_eq!(west.lower.unwrap().position(), -3.0);
        assert_eq!(west.upper.unwrap().position(), 2.0);
    }

    #[test]
    fn test_scans_stay_within_one_tile() {
        for spec in plan(&Point::new(-3.3, 8.8), 1, &config()).unwrap() {
            let (lower, upper) = (spec.lower.unwrap(), spec.upper.unwrap());
            assert_eq!(lower.tile(), upper.tile());
            assert!(lower <= upper);
        }
    }

    #[test]
    fn test_reach_is_clipped_to_max_radius() {
        let specs = plan(&Point::new(0.0, 0.0), 1, &config()).unwrap();
        for spec in &specs {
            assert_eq!(spec.reach, 5.0);
            assert!(!spec.reaches_region_edge);
            assert_eq!(spec.exhausted_bound(), 5.0);
        }
    }

    #[test]
    fn test_region_edge_makes_exhaustion_unbounded() {
        let wide = SpatialConfig::new(BoundingBox::new(-10.0, -10.0, 10.0, 10.0), 20.0);
        for spec in plan(&Point::new(0.0, 0.0), 1, &wide).unwrap() {
            assert!(spec.reaches_region_edge, "{} should reach the edge", spec.direction);
            assert_eq!(spec.exhausted_bound(), f64::INFINITY);
        }
    }

    #[test]
    fn test_plan_rejects_zero_count() {
        assert!(matches!(
            plan(&Point::new(0.0, 0.0), 0, &config()),
            Err(SpatialError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_plan_rejects_query_outside_region() {
        assert!(matches!(
            plan(&Point::new(0.0, -11.0), 1, &config()),
            Err(SpatialError::OutOfRegion { .. })
        ));
    }

    #[test]
    fn test_direction_offset() {
        assert_eq!(Direction::North.offset(1.0, 3.5), 2.5);
        assert_eq!(Direction::South.offset(1.0, -0.5), 1.5);
        assert_eq!(Direction::West.offset(0.0, -2.0), 2.0);
    }
}
