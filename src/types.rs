use crate::error::{Result, SpatialError};
use crate::spatial::BoundingBox;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// How distances are measured once points are projected onto the plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Degrees are used directly as plane units; `max_radius` is in degrees.
    #[default]
    Planar,
    /// Equirectangular projection around the region's centre latitude;
    /// `max_radius` and all reported distances are in meters.
    Equirectangular,
}

/// Read consistency requested from the storage port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Consistency {
    /// Recent writes may not be visible yet.
    #[default]
    Eventual,
    /// Every acknowledged write is visible to the scan.
    Strong,
}

/// Per-field configuration of the proximity index.
///
/// Set once when the field is defined and shared read-only by every
/// operation on it. Construct with [`SpatialConfig::new`] and adjust with the
/// `with_*` setters; [`SpatialConfig::validate`] checks the result.
///
/// # Examples
///
/// ```rust
/// use tilescan::{BoundingBox, Metric, SpatialConfig};
///
/// let germany = BoundingBox::new(46.988, 4.997, 55.022, 15.148);
/// let config = SpatialConfig::new(germany, 100_000.0)
///     .with_metric(Metric::Equirectangular)
///     .with_oversample(3);
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.tile_width(), 300_000.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialConfig {
    /// Region all indexed points are guaranteed to fall into.
    pub region: BoundingBox,

    /// Largest distance for which correctness is ever claimed.
    pub max_radius: f64,

    /// How many times wider than `max_radius` each tile is. A new tile starts
    /// every `max_radius`, so every point belongs to this many tiles per axis.
    /// Capped at [`SpatialConfig::MAX_OVERLAP`].
    #[serde(default = "default_overlap")]
    pub tile_overlap_factor: u32,

    /// Each directional scan fetches `count * oversample` entries, so a query
    /// reads at most `4 * count * oversample` entries. The default of 2 gives
    /// `8 * count`; set it to 1 to fetch exactly `count` per direction.
    #[serde(default = "default_oversample")]
    pub oversample: usize,

    #[serde(default)]
    pub metric: Metric,

    /// Issue the four directional scans of a query concurrently.
    #[serde(default)]
    pub parallel_scans: bool,
}

fn default_overlap() -> u32 {
    SpatialConfig::DEFAULT_OVERLAP
}

fn default_oversample() -> usize {
    SpatialConfig::DEFAULT_OVERSAMPLE
}

impl SpatialConfig {
    pub const DEFAULT_OVERLAP: u32 = 3;
    pub const DEFAULT_OVERSAMPLE: usize = 2;
    /// Every indexed point writes this many keys per axis at most.
    pub const MAX_OVERLAP: u32 = 64;

    pub fn new(region: BoundingBox, max_radius: f64) -> Self {
        Self {
            region,
            max_radius,
            tile_overlap_factor: Self::DEFAULT_OVERLAP,
            oversample: Self::DEFAULT_OVERSAMPLE,
            metric: Metric::default(),
            parallel_scans: false,
        }
    }

    /// Derive a planar configuration from a grid subdivision of `region`.
    ///
    /// The radius is the smaller of the two cell sizes, so a query never
    /// claims correctness past one cell in either direction.
    pub fn from_grid_dimensions(region: BoundingBox, rows: u32, cols: u32) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(SpatialError::invalid("grid dimensions must be positive"));
        }
        region.validate()?;
        let cell_lat = region.lat_span() / f64::from(rows);
        let cell_lon = region.lon_span() / f64::from(cols);
        Ok(Self::new(region, cell_lat.min(cell_lon)))
    }

    pub fn with_overlap(mut self, factor: u32) -> Self {
        self.tile_overlap_factor = factor;
        self
    }

    pub fn with_oversample(mut self, oversample: usize) -> Self {
        self.oversample = oversample;
        self
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_parallel_scans(mut self, parallel: bool) -> Self {
        self.parallel_scans = parallel;
        self
    }

    /// Width of one tile: `max_radius * tile_overlap_factor`.
    pub fn tile_width(&self) -> f64 {
        self.max_radius * f64::from(self.tile_overlap_factor)
    }

    /// Reject malformed configurations.
    pub fn validate(&self) -> Result<()> {
        self.region.validate()?;
        if !self.max_radius.is_finite() || self.max_radius <= 0.0 {
            return Err(SpatialError::invalid(format!(
                "max_radius must be positive and finite, got {}",
                self.max_radius
            )));
        }
        if self.tile_overlap_factor < 1 {
            return Err(SpatialError::invalid("tile_overlap_factor must be at least 1"));
        }
        if self.tile_overlap_factor > Self::MAX_OVERLAP {
            return Err(SpatialError::invalid(format!(
                "tile_overlap_factor must be at most {}, got {}",
                Self::MAX_OVERLAP,
                self.tile_overlap_factor
            )));
        }
        if self.oversample < 1 {
            return Err(SpatialError::invalid("oversample must be at least 1"));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SpatialError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a TOML configuration document.
    #[cfg(feature = "toml")]
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| SpatialError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file, picking the format from its extension.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&text),
            #[cfg(feature = "toml")]
            Some("toml") => Self::from_toml_str(&text),
            other => Err(SpatialError::Config(format!(
                "unsupported configuration format: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }
}

/// Identity of the record that owns an indexed point.
///
/// Ordering is bytewise; ties between equally distant results are broken by
/// this ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EntityId(Bytes);

impl EntityId {
    pub fn new(id: impl Into<Bytes>) -> Self {
        Self(id.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(Bytes::copy_from_slice(id.as_bytes()))
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(Bytes::from(id))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}
