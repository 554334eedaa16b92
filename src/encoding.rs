//! Sortable index keys.
//!
//! An [`AxisKey`] packs a tile index and a projected position into one `u128`
//! whose unsigned order is (tile, position). A single range scan over keys of
//! one tile therefore walks every point of that tile band in positional
//! order.

use crate::error::Result;
use crate::grid::{Axis, Grid};
use crate::spatial::Point;
use crate::types::SpatialConfig;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

const SIGN_BIT: u64 = 1 << 63;

/// Order-preserving map from `f64` to `u64` (NaN excluded by the caller).
fn sortable_bits(value: f64) -> u64 {
    // fold -0.0 into 0.0 so equal positions get equal keys
    let bits = (value + 0.0).to_bits();
    if bits & SIGN_BIT != 0 {
        !bits
    } else {
        bits | SIGN_BIT
    }
}

fn from_sortable_bits(bits: u64) -> f64 {
    if bits & SIGN_BIT != 0 {
        f64::from_bits(bits & !SIGN_BIT)
    } else {
        f64::from_bits(!bits)
    }
}

/// A sortable scalar ordering points by (tile, position) along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AxisKey(u128);

impl AxisKey {
    pub const MIN: AxisKey = AxisKey(u128::MIN);
    pub const MAX: AxisKey = AxisKey(u128::MAX);

    pub fn new(tile: i64, position: f64) -> Self {
        let tile_bits = (tile as u64) ^ SIGN_BIT;
        AxisKey((u128::from(tile_bits) << 64) | u128::from(sortable_bits(position)))
    }

    pub fn tile(&self) -> i64 {
        (((self.0 >> 64) as u64) ^ SIGN_BIT) as i64
    }

    pub fn position(&self) -> f64 {
        from_sortable_bits(self.0 as u64)
    }

    /// The smallest key that sorts after this one, if any.
    pub fn successor(&self) -> Option<AxisKey> {
        self.0.checked_add(1).map(AxisKey)
    }
}

impl fmt::Display for AxisKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.tile(), self.position())
    }
}

/// The index annotation persisted alongside an entity's record.
///
/// Written when the entity is saved, overwritten on every update and removed
/// with the entity. Each axis holds one key per tile the point belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedKeys {
    pub coordinates: Point,
    pub north_south: SmallVec<[AxisKey; 4]>,
    pub east_west: SmallVec<[AxisKey; 4]>,
}

impl EncodedKeys {
    pub fn keys(&self, axis: Axis) -> &[AxisKey] {
        match axis {
            Axis::NorthSouth => &self.north_south,
            Axis::EastWest => &self.east_west,
        }
    }

    /// The key stored for `tile` on `axis`, if the point belongs to that tile.
    pub fn key_in_tile(&self, axis: Axis, tile: i64) -> Option<AxisKey> {
        self.keys(axis).iter().copied().find(|key| key.tile() == tile)
    }
}

impl Grid {
    /// Encode `point` into its per-axis keys.
    pub fn encode(&self, point: &Point) -> Result<EncodedKeys> {
        let planar = self.locate(point)?;
        let keys = |axis: Axis| {
            let position = planar.coordinate(axis);
            self.tiling(axis)
                .tiles_containing(position)
                .into_iter()
                .map(|tile| AxisKey::new(tile, position))
                .collect::<SmallVec<[AxisKey; 4]>>()
        };
        Ok(EncodedKeys {
            coordinates: *point,
            north_south: keys(Axis::NorthSouth),
            east_west: keys(Axis::EastWest),
        })
    }
}

/// Encode `point` under `config`.
pub fn encode(point: &Point, config: &SpatialConfig) -> Result<EncodedKeys> {
    Grid::new(config)?.encode(point)
}
