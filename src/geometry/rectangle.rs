//! Lat/lon bounding boxes.

use crate::compute::distance;
use crate::compute::encoding::{MAX_LAT_INCL, MAX_LON_INCL, MIN_LAT_INCL, MIN_LON_INCL, TOLERANCE};
use crate::compute::validation::{check_latitude, check_longitude};
use crate::error::{Result, SpatioError};
use crate::geometry::Polygon;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A lat/lon rectangle with inclusive bounds, in degrees.
///
/// A rectangle crosses the dateline when `min_lon > max_lon`; it then covers
/// `[min_lon, 180] ∪ [-180, max_lon]`.
///
/// # Examples
///
/// ```
/// use spatio_points::Rectangle;
///
/// let rect = Rectangle::new(-10.0, 10.0, 170.0, -170.0).unwrap();
/// assert!(rect.crosses_dateline());
/// assert!(rect.contains(0.0, 175.0));
/// assert!(rect.contains(0.0, -175.0));
/// assert!(!rect.contains(0.0, 0.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Rectangle {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Result<Self> {
        check_latitude(min_lat)?;
        check_latitude(max_lat)?;
        check_longitude(min_lon)?;
        check_longitude(max_lon)?;
        if min_lat > max_lat {
            return Err(SpatioError::invalid(format!(
                "maxLat {} cannot be less than minLat {}",
                max_lat, min_lat
            )));
        }
        Ok(Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        })
    }

    #[inline]
    pub fn crosses_dateline(&self) -> bool {
        self.min_lon > self.max_lon
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        if lat < self.min_lat || lat > self.max_lat {
            return false;
        }
        if self.crosses_dateline() {
            lon >= self.min_lon || lon <= self.max_lon
        } else {
            lon >= self.min_lon && lon <= self.max_lon
        }
    }

    /// Splits a dateline-crossing rectangle into its west and east halves.
    pub fn split_dateline(&self) -> (Rectangle, Option<Rectangle>) {
        if !self.crosses_dateline() {
            return (*self, None);
        }
        let west = Rectangle {
            max_lon: MAX_LON_INCL,
            ..*self
        };
        let east = Rectangle {
            min_lon: MIN_LON_INCL,
            ..*self
        };
        (west, Some(east))
    }

    /// Bounding box of a circle; see [`distance::circle_to_bbox`].
    pub fn from_point_distance(center_lat: f64, center_lon: f64, radius_meters: f64) -> Result<Self> {
        distance::circle_to_bbox(center_lat, center_lon, radius_meters)
    }

    /// See [`distance::axis_lat`].
    pub fn axis_lat(center_lat: f64, radius_meters: f64) -> f64 {
        distance::axis_lat(center_lat, radius_meters)
    }

    /// Union of the bounding boxes of the polygons.
    pub fn from_polygons(polygons: &[Polygon]) -> Result<Self> {
        if polygons.is_empty() {
            return Err(SpatioError::invalid("polygons must not be empty"));
        }
        let mut rect = Rectangle {
            min_lat: f64::INFINITY,
            max_lat: f64::NEG_INFINITY,
            min_lon: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
        };
        for polygon in polygons {
            rect.min_lat = rect.min_lat.min(polygon.min_lat());
            rect.max_lat = rect.max_lat.max(polygon.max_lat());
            rect.min_lon = rect.min_lon.min(polygon.min_lon());
            rect.max_lon = rect.max_lon.max(polygon.max_lon());
        }
        Ok(rect)
    }

    /// Like [`Rectangle::from_polygons`], widened by [`TOLERANCE`] and clamped
    /// to the valid range.
    pub fn from_polygons_with_tolerance(polygons: &[Polygon]) -> Result<Self> {
        let rect = Self::from_polygons(polygons)?;
        Ok(Rectangle {
            min_lat: (rect.min_lat - TOLERANCE).max(MIN_LAT_INCL),
            max_lat: (rect.max_lat + TOLERANCE).min(MAX_LAT_INCL),
            min_lon: (rect.min_lon - TOLERANCE).max(MIN_LON_INCL),
            max_lon: (rect.max_lon + TOLERANCE).min(MAX_LON_INCL),
        })
    }

    /// Converts to a `geo::Rect`. Returns `None` for dateline-crossing
    /// rectangles, which `geo` cannot express.
    pub fn to_geo_rect(&self) -> Option<geo::Rect<f64>> {
        if self.crosses_dateline() {
            return None;
        }
        Some(geo::Rect::new(
            geo::coord! { x: self.min_lon, y: self.min_lat },
            geo::coord! { x: self.max_lon, y: self.max_lat },
        ))
    }
}

impl TryFrom<geo::Rect<f64>> for Rectangle {
    type Error = SpatioError;

    fn try_from(rect: geo::Rect<f64>) -> Result<Self> {
        let (min, max) = (rect.min(), rect.max());
        Rectangle::new(min.y, max.y, min.x, max.x)
    }
}

impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rectangle(lat={} TO {} lon={} TO {}",
            self.min_lat, self.max_lat, self.min_lon, self.max_lon
        )?;
        if self.crosses_dateline() {
            write!(f, " [crosses dateline!]")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_inverted_latitudes() {
        let err = Rectangle::new(10.0, -10.0, 0.0, 1.0).unwrap_err();
        assert!(err.to_string().contains("cannot be less than minLat"));
        assert!(Rectangle::new(0.0, 0.0, 5.0, 5.0).is_ok());
    }

    #[test]
    fn test_rejects_invalid_coordinates() {
        assert!(Rectangle::new(-91.0, 0.0, 0.0, 1.0).is_err());
        assert!(Rectangle::new(0.0, 1.0, 0.0, 181.0).is_err());
        assert!(Rectangle::new(f64::NAN, 1.0, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        let rect = Rectangle::new(-1.0, 1.0, -2.0, 2.0).unwrap();
        assert!(rect.contains(-1.0, -2.0));
        assert!(rect.contains(1.0, 2.0));
        assert!(!rect.contains(1.0000001, 0.0));
    }

    #[test]
    fn test_split_dateline() {
        let rect = Rectangle::new(-5.0, 5.0, 170.0, -170.0).unwrap();
        let (west, east) = rect.split_dateline();
        let east = east.unwrap();
        assert_eq!(west.min_lon, 170.0);
        assert_eq!(west.max_lon, 180.0);
        assert_eq!(east.min_lon, -180.0);
        assert_eq!(east.max_lon, -170.0);

        let plain = Rectangle::new(-5.0, 5.0, -10.0, 10.0).unwrap();
        assert_eq!(plain.split_dateline(), (plain, None));
    }

    #[test]
    fn test_from_polygons() {
        let a = Polygon::new(
            vec![0.0, 0.0, 1.0, 1.0, 0.0],
            vec![0.0, 1.0, 1.0, 0.0, 0.0],
        )
        .unwrap();
        let b = Polygon::new(
            vec![5.0, 5.0, 6.0, 6.0, 5.0],
            vec![-3.0, -2.0, -2.0, -3.0, -3.0],
        )
        .unwrap();
        let rect = Rectangle::from_polygons(&[a.clone(), b]).unwrap();
        assert_eq!(rect.min_lat, 0.0);
        assert_eq!(rect.max_lat, 6.0);
        assert_eq!(rect.min_lon, -3.0);
        assert_eq!(rect.max_lon, 1.0);

        let wide = Rectangle::from_polygons_with_tolerance(&[a]).unwrap();
        assert_eq!(wide.min_lat, -TOLERANCE);
        assert!(Rectangle::from_polygons(&[]).is_err());
    }

    #[test]
    fn test_geo_rect_conversion() {
        let rect = Rectangle::new(10.0, 20.0, -5.0, 5.0).unwrap();
        let geo_rect = rect.to_geo_rect().unwrap();
        assert_eq!(geo_rect.min().x, -5.0);
        assert_eq!(geo_rect.max().y, 20.0);
        assert_eq!(Rectangle::try_from(geo_rect).unwrap(), rect);

        let crossing = Rectangle::new(0.0, 1.0, 179.0, -179.0).unwrap();
        assert!(crossing.to_geo_rect().is_none());
    }

    #[test]
    fn test_display_marks_dateline() {
        let rect = Rectangle::new(0.0, 1.0, 179.0, -179.0).unwrap();
        assert!(rect.to_string().contains("crosses dateline"));
    }
}
