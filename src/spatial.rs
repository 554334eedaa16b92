//! Geographic primitives.
//!
//! This module provides the point and bounding box types every other part of
//! the crate works with.

use crate::error::{Result, SpatialError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A geographic point representing a location on Earth's surface.
///
/// `Point` stores latitude and longitude in decimal degrees. It is a plain
/// value: once created it is never mutated, and whatever record embeds it owns
/// it.
///
/// # Examples
///
/// ```rust
/// use tilescan::Point;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let berlin = Point::try_new(52.5200, 13.4050)?;
/// let hamburg: Point = "53.5511,9.9937".parse()?;
///
/// let distance_km = berlin.distance_to(&hamburg) / 1000.0;
/// assert!(distance_km > 250.0 && distance_km < 260.0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Latitude in decimal degrees (-90.0 to +90.0)
    pub lat: f64,
    /// Longitude in decimal degrees (-180.0 to +180.0)
    pub lon: f64,
}

impl Point {
    /// Creates a new point without validating it.
    ///
    /// Use [`Point::try_new`] for values that come from outside the program.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Creates a new point, rejecting NaN and out-of-range coordinates.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tilescan::Point;
    ///
    /// assert!(Point::try_new(48.1351, 11.5820).is_ok());
    /// assert!(Point::try_new(91.0, 0.0).is_err());
    /// assert!(Point::try_new(f64::NAN, 0.0).is_err());
    /// ```
    pub fn try_new(lat: f64, lon: f64) -> Result<Self> {
        if lat.is_nan() || lon.is_nan() {
            return Err(SpatialError::invalid("coordinates must not be NaN"));
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(SpatialError::invalid(format!(
                "latitude {lat} is outside [-90, 90]"
            )));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(SpatialError::invalid(format!(
                "longitude {lon} is outside [-180, 180]"
            )));
        }
        Ok(Self { lat, lon })
    }

    /// Calculate the distance between two points using the Haversine formula.
    ///
    /// The result is the great-circle distance in meters. The proximity
    /// engine ranks with its configured planar metric instead; this is for
    /// callers that want a surface distance for display.
    pub fn distance_to(&self, other: &Point) -> f64 {
        const EARTH_RADIUS_M: f64 = 6_371_000.0;
        const TO_RAD: f64 = std::f64::consts::PI / 180.0;

        let lat1 = self.lat * TO_RAD;
        let lat2 = other.lat * TO_RAD;
        let dlat = (other.lat - self.lat) * TO_RAD;
        let dlon = (other.lon - self.lon) * TO_RAD;

        let sin_half_dlat = (dlat * 0.5).sin();
        let sin_half_dlon = (dlon * 0.5).sin();

        let a =
            sin_half_dlat * sin_half_dlat + lat1.cos() * lat2.cos() * sin_half_dlon * sin_half_dlon;
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_M * c
    }

    /// Check if this point is within the given bounding box (edges included).
    pub fn within(&self, bounds: &BoundingBox) -> bool {
        bounds.contains(self)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

/// Parses `"lat,lon"`, the textual form points are stored and submitted in.
impl FromStr for Point {
    type Err = SpatialError;

    fn from_str(s: &str) -> Result<Self> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| SpatialError::invalid(format!("expected \"lat,lon\", got {s:?}")))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| SpatialError::invalid(format!("invalid latitude {lat:?}")))?;
        let lon: f64 = lon
            .trim()
            .parse()
            .map_err(|_| SpatialError::invalid(format!("invalid longitude {lon:?}")))?;
        Point::try_new(lat, lon)
    }
}

/// A bounding box defined by minimum and maximum latitude and longitude coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Create a new bounding box
    pub fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Check whether `point` lies inside the box, edges included.
    pub fn contains(&self, point: &Point) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lon >= self.min_lon
            && point.lon <= self.max_lon
    }

    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min_lat + self.max_lat) * 0.5,
            (self.min_lon + self.max_lon) * 0.5,
        )
    }

    /// Explain why `point` is outside the box, or `None` when it is inside.
    pub(crate) fn rejection(&self, point: &Point) -> Option<&'static str> {
        if point.lat.is_nan() || point.lon.is_nan() {
            Some("coordinates are NaN")
        } else if point.lat < self.min_lat || point.lat > self.max_lat {
            Some("latitude out of range")
        } else if point.lon < self.min_lon || point.lon > self.max_lon {
            Some("longitude out of range")
        } else {
            None
        }
    }

    /// Check the box itself: coordinates in range and a non-empty extent.
    pub fn validate(&self) -> Result<()> {
        let corners = [self.min_lat, self.min_lon, self.max_lat, self.max_lon];
        if corners.iter().any(|c| !c.is_finite()) {
            return Err(SpatialError::invalid("region bounds must be finite"));
        }
        for lat in [self.min_lat, self.max_lat] {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(SpatialError::invalid(format!(
                    "region latitude {lat} must be between -90 and 90"
                )));
            }
        }
        for lon in [self.min_lon, self.max_lon] {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(SpatialError::invalid(format!(
                    "region longitude {lon} must be between -180 and 180"
                )));
            }
        }
        if self.min_lat >= self.max_lat || self.min_lon >= self.max_lon {
            return Err(SpatialError::invalid(format!(
                "region {self} has an empty extent"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}] x [{}, {}]",
            self.min_lat, self.max_lat, self.min_lon, self.max_lon
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_creation() {
        let point = Point::new(40.7128, -74.0060);
        assert_eq!(point.lat, 40.7128);
        assert_eq!(point.lon, -74.0060);
    }

    #[test]
    fn test_try_new_rejects_invalid_coordinates() {
        assert!(Point::try_new(90.0, 180.0).is_ok());
        assert!(Point::try_new(-90.0, -180.0).is_ok());
        assert!(Point::try_new(90.1, 0.0).is_err());
        assert!(Point::try_new(0.0, -180.5).is_err());
        assert!(Point::try_new(0.0, f64::NAN).is_err());
    }

    #[test]
    fn test_distance_calculation() {
        let new_york = Point::new(40.7128, -74.0060);
        let london = Point::new(51.5074, -0.1278);

        let distance = new_york.distance_to(&london);
        // Distance should be approximately 5585 km
        assert!((distance - 5_585_000.0).abs() < 50_000.0);
        assert!(new_york.distance_to(&new_york) < 1e-6);
    }

    #[test]
    fn test_parse_point() {
        let point: Point = " 52.52 , 13.405 ".parse().unwrap();
        assert_eq!(point, Point::new(52.52, 13.405));

        assert!("52.52".parse::<Point>().is_err());
        assert!("abc,13.4".parse::<Point>().is_err());
        assert!("NaN,13.4".parse::<Point>().is_err());
        assert!("95.0,13.4".parse::<Point>().is_err());
    }

    #[test]
    fn test_point_display() {
        let point = Point::new(40.7128, -74.0060);
        assert_eq!(format!("{}", point), "(40.712800, -74.006000)");
    }

    #[test]
    fn test_bounding_box_contains_and_rejection() {
        let germany = BoundingBox::new(46.988, 4.997, 55.022, 15.148);
        let berlin = Point::new(52.52, 13.405);
        let paris = Point::new(48.8566, 2.3522);
        let oslo = Point::new(59.91, 10.75);

        assert!(germany.contains(&berlin));
        assert!(berlin.within(&germany));
        assert!(germany.rejection(&berlin).is_none());
        assert_eq!(germany.rejection(&paris), Some("longitude out of range"));
        assert_eq!(germany.rejection(&oslo), Some("latitude out of range"));
    }

    #[test]
    fn test_bounding_box_validate() {
        assert!(BoundingBox::new(-10.0, -10.0, 10.0, 10.0).validate().is_ok());
        assert!(BoundingBox::new(10.0, -10.0, 10.0, 10.0).validate().is_err());
        assert!(BoundingBox::new(-95.0, -10.0, 10.0, 10.0).validate().is_err());
        assert!(BoundingBox::new(-10.0, -10.0, 10.0, 190.0).validate().is_err());
        assert!(BoundingBox::new(-10.0, f64::NAN, 10.0, 10.0).validate().is_err());
    }
}
