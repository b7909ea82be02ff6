use geo::Point;
use serde::{Deserialize, Serialize};

/// A geographic position in degrees, latitude first.
///
/// The index works in (lat, lon) order throughout, which is the opposite of
/// `geo`'s (x, y). Conversions swap the axes.
///
/// # Examples
///
/// ```
/// use spatio_types::point::LatLon;
/// use geo::Point;
///
/// let paris = LatLon::new(48.8566, 2.3522);
/// let p: Point = paris.into();
/// assert_eq!(p.y(), 48.8566);
/// assert_eq!(LatLon::from(p), paris);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    /// Latitude in degrees, [-90, 90]
    pub lat: f64,
    /// Longitude in degrees, [-180, 180]
    pub lon: f64,
}

impl LatLon {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// True when both coordinates are finite and inside the valid ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

impl From<LatLon> for Point<f64> {
    fn from(value: LatLon) -> Self {
        Point::new(value.lon, value.lat)
    }
}

impl From<Point<f64>> for LatLon {
    fn from(value: Point<f64>) -> Self {
        LatLon::new(value.y(), value.x())
    }
}

impl From<(f64, f64)> for LatLon {
    fn from((lat, lon): (f64, f64)) -> Self {
        LatLon::new(lat, lon)
    }
}
