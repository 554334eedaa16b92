//! Grid quantizer.
//!
//! Points are projected onto a plane and each axis is covered by a family of
//! overlapping tiles: a tile is `max_radius * tile_overlap_factor` wide and a
//! new one starts every `max_radius`, so every position belongs to
//! `tile_overlap_factor` tiles per axis. A query point always sits at least
//! `max_radius` inside one of its tiles when the factor is 3 or more, which is
//! what lets a scan confined to a single tile prove completeness.

use crate::error::{Result, SpatialError};
use crate::spatial::{BoundingBox, Point};
use crate::types::{Metric, SpatialConfig};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// One of the two independently sortable spatial axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// Latitude, projected to the plane's y coordinate.
    NorthSouth,
    /// Longitude, projected to the plane's x coordinate.
    EastWest,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::NorthSouth => write!(f, "NS"),
            Axis::EastWest => write!(f, "EW"),
        }
    }
}

/// A point on the projection plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarPoint {
    pub x: f64,
    pub y: f64,
}

impl PlanarPoint {
    pub fn coordinate(&self, axis: Axis) -> f64 {
        match axis {
            Axis::NorthSouth => self.y,
            Axis::EastWest => self.x,
        }
    }

    pub fn distance(&self, other: &PlanarPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Linear map from degrees to plane units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    x_scale: f64,
    y_scale: f64,
}

impl Projection {
    pub fn new(metric: Metric, region: &BoundingBox) -> Self {
        match metric {
            Metric::Planar => Self {
                x_scale: 1.0,
                y_scale: 1.0,
            },
            Metric::Equirectangular => {
                let meters_per_degree = EARTH_RADIUS_M.to_radians();
                let reference_lat = region.center().lat.to_radians();
                Self {
                    x_scale: meters_per_degree * reference_lat.cos(),
                    y_scale: meters_per_degree,
                }
            }
        }
    }

    pub fn project(&self, point: &Point) -> PlanarPoint {
        PlanarPoint {
            x: point.lon * self.x_scale,
            y: point.lat * self.y_scale,
        }
    }
}

/// The overlapping tile family along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisTiling {
    axis: Axis,
    origin: f64,
    stride: f64,
    span: u32,
    /// Region extent on this axis, in plane units.
    low: f64,
    high: f64,
}

impl AxisTiling {
    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn stride(&self) -> f64 {
        self.stride
    }

    /// Lower and upper edge of `tile`; the upper edge is exclusive.
    pub fn extent(&self, tile: i64) -> (f64, f64) {
        let start = self.origin + tile as f64 * self.stride;
        (start, start + f64::from(self.span) * self.stride)
    }

    /// Every tile whose extent contains `position`, ascending.
    pub fn tiles_containing(&self, position: f64) -> SmallVec<[i64; 4]> {
        let last = ((position - self.origin) / self.stride).floor() as i64;
        let first = last - i64::from(self.span) + 1;
        (first..=last).collect()
    }

    /// Distance from `position` to the lower and upper edge of `tile`.
    pub fn margins(&self, tile: i64, position: f64) -> (f64, f64) {
        let (start, end) = self.extent(tile);
        (position - start, end - position)
    }

    /// The tile in which `position` sits most centrally.
    pub fn central_tile(&self, position: f64) -> i64 {
        let mut best = None;
        for tile in self.tiles_containing(position) {
            let (below, above) = self.margins(tile, position);
            let clearance = below.min(above);
            match best {
                Some((_, c)) if c >= clearance => {}
                _ => best = Some((tile, clearance)),
            }
        }
        // tiles_containing is never empty because span >= 1
        best.map(|(tile, _)| tile).unwrap_or_default()
    }

    /// Lower and upper bound of the region on this axis.
    pub fn region_extent(&self) -> (f64, f64) {
        (self.low, self.high)
    }
}

/// Tiles a point belongs to, per axis.
///
/// Derived from the point and the configuration on every write; never stored
/// on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileAssignment {
    pub north_south: SmallVec<[i64; 4]>,
    pub east_west: SmallVec<[i64; 4]>,
}

impl TileAssignment {
    pub fn tiles(&self, axis: Axis) -> &[i64] {
        match axis {
            Axis::NorthSouth => &self.north_south,
            Axis::EastWest => &self.east_west,
        }
    }
}

/// Projection and tilings derived from a validated [`SpatialConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    region: BoundingBox,
    projection: Projection,
    north_south: AxisTiling,
    east_west: AxisTiling,
}

impl Grid {
    pub fn new(config: &SpatialConfig) -> Result<Self> {
        config.validate()?;
        let region = config.region;
        let projection = Projection::new(config.metric, &region);
        let lower = projection.project(&Point::new(region.min_lat, region.min_lon));
        let upper = projection.project(&Point::new(region.max_lat, region.max_lon));
        let tiling = |axis: Axis| AxisTiling {
            axis,
            origin: lower.coordinate(axis),
            stride: config.max_radius,
            span: config.tile_overlap_factor,
            low: lower.coordinate(axis),
            high: upper.coordinate(axis),
        };
        Ok(Self {
            region,
            projection,
            north_south: tiling(Axis::NorthSouth),
            east_west: tiling(Axis::EastWest),
        })
    }

    pub fn region(&self) -> &BoundingBox {
        &self.region
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn tiling(&self, axis: Axis) -> &AxisTiling {
        match axis {
            Axis::NorthSouth => &self.north_south,
            Axis::EastWest => &self.east_west,
        }
    }

    /// Project `point`, rejecting it when it lies outside the region.
    pub fn locate(&self, point: &Point) -> Result<PlanarPoint> {
        if let Some(reason) = self.region.rejection(point) {
            return Err(SpatialError::OutOfRegion {
                point: *point,
                reason,
            });
        }
        Ok(self.projection.project(point))
    }

    pub fn assign(&self, point: &Point) -> Result<TileAssignment> {
        let planar = self.locate(point)?;
        Ok(TileAssignment {
            north_south: self.north_south.tiles_containing(planar.y),
            east_west: self.east_west.tiles_containing(planar.x),
        })
    }
}

/// Every tile, on both axes, that `point` belongs to.
pub fn assign_tiles(point: &Point, config: &SpatialConfig) -> Result<TileAssignment> {
    Grid::new(config)?.assign(point)
}
