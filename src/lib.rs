//! # tilescan - proximity search over ordered key-value storage
//!
//! tilescan answers "which indexed entities are closest to this point?" on
//! top of any store that can only do ordered range scans with a limit. Each
//! point is written as a handful of sortable keys, one per overlapping tile
//! and axis. A query becomes four bounded scans, one per compass direction,
//! and every answer comes with a radius within which it is provably
//! complete.
//!
//! ## Features
//!
//! - **Overlapping tiles**: each point lands in several tiles per axis, so a
//!   query always reads from a tile that covers its whole search distance
//! - **Correctness radius**: results are tagged with the distance up to
//!   which nothing can have been missed
//! - **Partial failures**: a failed directional scan shrinks the radius
//!   instead of failing the query
//! - **Pluggable storage**: implement [`RangeScanPort`] for your store, or use
//!   the bundled [`MemoryBackend`]
//!
//! ## Quick Start
//!
//! ```rust
//! use tilescan::{BoundingBox, EntityId, MemoryBackend, Point, ProximityQuery, SpatialConfig, SpatialIndex};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SpatialConfig::new(BoundingBox::new(-10.0, -10.0, 10.0, 10.0), 5.0);
//! let index = SpatialIndex::new(config, MemoryBackend::new())?;
//!
//! index.index("origin", Point::new(0.0, 0.0))?;
//! index.index("north", Point::new(1.0, 0.0))?;
//! index.index("east", Point::new(0.0, 1.0))?;
//! index.index("far", Point::new(3.0, 3.0))?;
//!
//! let query = ProximityQuery::new(Point::new(0.0, 0.0), 2).excluding("origin");
//! let outcome = index.query(&query)?;
//! assert_eq!(outcome.ids(), vec![EntityId::from("east"), EntityId::from("north")]);
//! assert!(outcome.radius >= 1.0);
//! assert!(outcome.is_complete());
//! # Ok(())
//! # }
//! ```

pub mod assemble;
pub mod encoding;
pub mod error;
pub mod grid;
pub mod index;
pub mod planner;
pub mod radius;
pub mod spatial;
pub mod storage;
pub mod sweep;
pub mod types;

// Re-export the facade
pub use index::{ProximityQuery, SpatialIndex};

pub use error::{Result, SpatialError};

// Re-export spatial and configuration types
pub use spatial::{BoundingBox, Point};
pub use types::{Consistency, EntityId, Metric, SpatialConfig};

// Re-export pipeline stages for callers driving their own storage
pub use assemble::{PartialScanFailure, QueryOutcome, assemble};
pub use encoding::{AxisKey, EncodedKeys, encode};
pub use grid::{Axis, Grid, TileAssignment, assign_tiles};
pub use planner::{Direction, ScanOrder, ScanSpec, plan};
pub use radius::guaranteed_radius;
pub use sweep::{ScanResult, SweepExecutor, SweepOutcome};

// Re-export storage types
pub use storage::{IndexedEntry, MemoryBackend, RangeScanPort, ScanRequest, StorageStats};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    pub use crate::{
        BoundingBox, EntityId, MemoryBackend, Point, ProximityQuery, QueryOutcome, RangeScanPort,
        Result, SpatialConfig, SpatialError, SpatialIndex,
    };
}
