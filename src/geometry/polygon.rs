//! Closed lat/lon polygons with optional holes.

use crate::compute::validation::{is_valid_latitude, is_valid_longitude};
use crate::error::{Result, SpatioError};
use crate::geometry::{Rectangle, edge_crosses_box, ray_crosses_edge};
use serde::{Deserialize, Serialize};
use spatio_types::{LatLon, Relation};
use std::fmt;

/// A closed ring of vertices plus optional holes.
///
/// The first and last vertex must be identical. Winding order does not
/// matter: containment uses the even-odd rule in planar degree space.
/// Holes may not have holes of their own.
///
/// # Examples
///
/// ```
/// use spatio_points::Polygon;
/// use spatio_types::Relation;
///
/// let square = Polygon::new(
///     vec![0.0, 0.0, 10.0, 10.0, 0.0],
///     vec![0.0, 10.0, 10.0, 0.0, 0.0],
/// )
/// .unwrap();
/// assert!(square.contains(5.0, 5.0));
/// assert!(!square.contains(15.0, 5.0));
/// assert_eq!(square.relate(2.0, 3.0, 2.0, 3.0), Relation::Inside);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PolygonRings", into = "PolygonRings")]
pub struct Polygon {
    lats: Vec<f64>,
    lons: Vec<f64>,
    holes: Vec<Polygon>,
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

/// Unvalidated serde form of [`Polygon`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PolygonRings {
    lats: Vec<f64>,
    lons: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    holes: Vec<PolygonRings>,
}

impl Polygon {
    pub fn new(lats: Vec<f64>, lons: Vec<f64>) -> Result<Self> {
        Self::with_holes(lats, lons, Vec::new())
    }

    pub fn with_holes(lats: Vec<f64>, lons: Vec<f64>, holes: Vec<Polygon>) -> Result<Self> {
        if lats.is_empty() {
            return Err(SpatioError::invalid("polyLats must not be null"));
        }
        if lons.is_empty() {
            return Err(SpatioError::invalid("polyLons must not be null"));
        }
        if lats.len() != lons.len() {
            return Err(SpatioError::invalid(
                "polyLats and polyLons must be equal length",
            ));
        }
        if lats.len() < 4 {
            return Err(SpatioError::invalid("at least 4 polygon points required"));
        }
        let last = lats.len() - 1;
        if lats[0] != lats[last] {
            return Err(SpatioError::invalid(format!(
                "first and last points of the polygon must be the same (it must close itself): polyLats[0]={} polyLats[{}]={}",
                lats[0], last, lats[last]
            )));
        }
        if lons[0] != lons[last] {
            return Err(SpatioError::invalid(format!(
                "first and last points of the polygon must be the same (it must close itself): polyLons[0]={} polyLons[{}]={}",
                lons[0], last, lons[last]
            )));
        }
        if holes.iter().any(|hole| !hole.holes.is_empty()) {
            return Err(SpatioError::invalid(
                "holes may not contain holes: polygons may not nest.",
            ));
        }

        let mut min_lat = f64::INFINITY;
        let mut max_lat = f64::NEG_INFINITY;
        let mut min_lon = f64::INFINITY;
        let mut max_lon = f64::NEG_INFINITY;
        for (i, (&lat, &lon)) in lats.iter().zip(lons.iter()).enumerate() {
            if !is_valid_latitude(lat) {
                return Err(SpatioError::invalid(format!(
                    "invalid latitude {} at polyLats[{}]",
                    lat, i
                )));
            }
            if !is_valid_longitude(lon) {
                return Err(SpatioError::invalid(format!(
                    "invalid longitude {} at polyLons[{}]",
                    lon, i
                )));
            }
            min_lat = min_lat.min(lat);
            max_lat = max_lat.max(lat);
            min_lon = min_lon.min(lon);
            max_lon = max_lon.max(lon);
        }

        Ok(Self {
            lats,
            lons,
            holes,
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        })
    }

    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    pub fn holes(&self) -> &[Polygon] {
        &self.holes
    }

    /// Number of vertices, including the closing one.
    pub fn num_points(&self) -> usize {
        self.lats.len()
    }

    pub fn vertices(&self) -> impl Iterator<Item = LatLon> + '_ {
        self.lats
            .iter()
            .zip(self.lons.iter())
            .map(|(&lat, &lon)| LatLon::new(lat, lon))
    }

    pub fn min_lat(&self) -> f64 {
        self.min_lat
    }

    pub fn max_lat(&self) -> f64 {
        self.max_lat
    }

    pub fn min_lon(&self) -> f64 {
        self.min_lon
    }

    pub fn max_lon(&self) -> f64 {
        self.max_lon
    }

    pub fn bounding_box(&self) -> Rectangle {
        Rectangle {
            min_lat: self.min_lat,
            max_lat: self.max_lat,
            min_lon: self.min_lon,
            max_lon: self.max_lon,
        }
    }

    /// True if the point is inside the outer ring and outside every hole.
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        if latitude < self.min_lat
            || latitude > self.max_lat
            || longitude < self.min_lon
            || longitude > self.max_lon
        {
            return false;
        }
        self.ring_contains(latitude, longitude)
            && !self.holes.iter().any(|hole| hole.contains(latitude, longitude))
    }

    fn ring_contains(&self, latitude: f64, longitude: f64) -> bool {
        let mut inside = false;
        for i in 1..self.lats.len() {
            if ray_crosses_edge(
                self.lats[i - 1],
                self.lons[i - 1],
                self.lats[i],
                self.lons[i],
                latitude,
                longitude,
            ) {
                inside = !inside;
            }
        }
        inside
    }

    /// Relation of the rectangle to this polygon.
    pub fn relate(&self, min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Relation {
        if max_lon < self.min_lon
            || min_lon > self.max_lon
            || max_lat < self.min_lat
            || min_lat > self.max_lat
        {
            return Relation::Outside;
        }
        // the rectangle encloses us
        if min_lat <= self.min_lat
            && max_lat >= self.max_lat
            && min_lon <= self.min_lon
            && max_lon >= self.max_lon
        {
            return Relation::Crosses;
        }
        for hole in &self.holes {
            match hole.relate(min_lat, max_lat, min_lon, max_lon) {
                Relation::Crosses => return Relation::Crosses,
                Relation::Inside => return Relation::Outside,
                Relation::Outside => {}
            }
        }

        match self.corners_inside(min_lat, max_lat, min_lon, max_lon) {
            4 if self.crosses(min_lat, max_lat, min_lon, max_lon) => Relation::Crosses,
            4 => Relation::Inside,
            0 if self.crosses(min_lat, max_lat, min_lon, max_lon) => Relation::Crosses,
            0 => Relation::Outside,
            _ => Relation::Crosses,
        }
    }

    /// Counts the rectangle corners inside the polygon. Stops early once the
    /// count can no longer be 0 or 4.
    fn corners_inside(&self, min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> usize {
        let corners = [
            (min_lat, min_lon),
            (min_lat, max_lon),
            (max_lat, max_lon),
            (max_lat, min_lon),
        ];
        let mut count = 0;
        for (i, &(lat, lon)) in corners.iter().enumerate() {
            if self.contains(lat, lon) {
                count += 1;
            }
            if count != 0 && count != i + 1 {
                return count;
            }
        }
        count
    }

    fn crosses(&self, min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> bool {
        (1..self.lats.len()).any(|i| {
            edge_crosses_box(
                self.lats[i - 1],
                self.lons[i - 1],
                self.lats[i],
                self.lons[i],
                min_lat,
                max_lat,
                min_lon,
                max_lon,
            )
        })
    }

    /// True if any of the polygons contains the point.
    pub fn contains_any(polygons: &[Polygon], latitude: f64, longitude: f64) -> bool {
        polygons.iter().any(|p| p.contains(latitude, longitude))
    }

    /// Multi-polygon relation: the first relation that is not `Outside`.
    ///
    /// Assumes non-overlapping polygons: a rectangle crossing one polygon is
    /// reported as crossing even if another polygon contains it.
    pub fn relate_any(
        polygons: &[Polygon],
        min_lat: f64,
        max_lat: f64,
        min_lon: f64,
        max_lon: f64,
    ) -> Relation {
        polygons
            .iter()
            .map(|p| p.relate(min_lat, max_lat, min_lon, max_lon))
            .find(|r| !r.is_outside())
            .unwrap_or(Relation::Outside)
    }
}

impl TryFrom<PolygonRings> for Polygon {
    type Error = SpatioError;

    fn try_from(rings: PolygonRings) -> Result<Self> {
        let holes = rings
            .holes
            .into_iter()
            .map(Polygon::try_from)
            .collect::<Result<Vec<_>>>()?;
        Polygon::with_holes(rings.lats, rings.lons, holes)
    }
}

impl From<Polygon> for PolygonRings {
    fn from(polygon: Polygon) -> Self {
        PolygonRings {
            lats: polygon.lats,
            lons: polygon.lons,
            holes: polygon.holes.into_iter().map(PolygonRings::from).collect(),
        }
    }
}

fn ring_from_line_string(ring: &geo::LineString<f64>) -> (Vec<f64>, Vec<f64>) {
    ring.coords().map(|c| (c.y, c.x)).unzip()
}

impl TryFrom<&geo::Polygon<f64>> for Polygon {
    type Error = SpatioError;

    fn try_from(polygon: &geo::Polygon<f64>) -> Result<Self> {
        let holes = polygon
            .interiors()
            .iter()
            .map(|ring| {
                let (lats, lons) = ring_from_line_string(ring);
                Polygon::new(lats, lons)
            })
            .collect::<Result<Vec<_>>>()?;
        let (lats, lons) = ring_from_line_string(polygon.exterior());
        Polygon::with_holes(lats, lons, holes)
    }
}

impl From<&Polygon> for geo::Polygon<f64> {
    fn from(polygon: &Polygon) -> Self {
        fn ring(p: &Polygon) -> geo::LineString<f64> {
            p.lons
                .iter()
                .zip(p.lats.iter())
                .map(|(&x, &y)| geo::coord! { x: x, y: y })
                .collect()
        }
        geo::Polygon::new(ring(polygon), polygon.holes.iter().map(ring).collect())
    }
}

impl fmt::Display for Polygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Polygon(")?;
        for (i, v) in self.vertices().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "[{}, {}]", v.lat, v.lon)?;
        }
        if !self.holes.is_empty() {
            write!(f, ", holes={}", self.holes.len())?;
        }
        write!(f, ")")
    }
}
