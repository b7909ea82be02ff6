//! Points within a radius of a center.

use crate::compute::distance::{
    AXIS_LAT_ERROR, axis_lat, circle_to_bbox, haversin_meters, haversin_meters_from_sort_key,
    haversin_sort_key,
};
use crate::compute::encoding::{
    decode_lat_lon_ints, decode_latitude, decode_longitude, latitude_to_int, longitude_to_int,
};
use crate::error::Result;
use crate::geometry::Rectangle;
use crate::query::ShapePredicate;
use spatio_types::Relation;

/// Great-circle distance query.
///
/// Cells are pruned against the circle's bounding box first, then resolved
/// with corner distances where that is provably exact. Points in crossing
/// cells get the exact haversine test.
#[derive(Debug, Clone)]
pub struct DistanceQuery {
    center_lat: f64,
    center_lon: f64,
    radius_meters: f64,
    bbox: Rectangle,
    min_lat: i32,
    max_lat: i32,
    lon_ranges: [(i32, i32); 2],
    num_lon_ranges: usize,
    /// latitude where the circle is widest in longitude
    axis_lat: f64,
    /// sort keys above this are always farther than the radius
    max_partial_distance: f64,
}

impl DistanceQuery {
    pub fn new(center_lat: f64, center_lon: f64, radius_meters: f64) -> Result<Self> {
        let bbox = circle_to_bbox(center_lat, center_lon, radius_meters)?;

        let min_lon = longitude_to_int(bbox.min_lon);
        let max_lon = longitude_to_int(bbox.max_lon);
        let (lon_ranges, num_lon_ranges) = if bbox.crosses_dateline() {
            ([(min_lon, i32::MAX), (i32::MIN, max_lon)], 2)
        } else {
            ([(min_lon, max_lon); 2], 1)
        };

        // unless the box spans half the globe, the circle is narrower than
        // the box along the center's parallel and meridian. The box is
        // symmetric around the center, so at most one side wraps, and a
        // wrapped side is bounded by the other; a full-world box fails both.
        let max_partial_distance = if bbox.max_lon - center_lon < 90.0
            && center_lon - bbox.min_lon < 90.0
        {
            haversin_sort_key(center_lat, center_lon, center_lat, bbox.max_lon).max(
                haversin_sort_key(center_lat, center_lon, bbox.max_lat, center_lon),
            )
        } else {
            f64::INFINITY
        };

        Ok(Self {
            center_lat,
            center_lon,
            radius_meters,
            bbox,
            min_lat: latitude_to_int(bbox.min_lat),
            max_lat: latitude_to_int(bbox.max_lat),
            lon_ranges,
            num_lon_ranges,
            axis_lat: axis_lat(center_lat, radius_meters),
            max_partial_distance,
        })
    }

    pub fn center(&self) -> (f64, f64) {
        (self.center_lat, self.center_lon)
    }

    pub fn radius_meters(&self) -> f64 {
        self.radius_meters
    }

    pub fn bounding_box(&self) -> &Rectangle {
        &self.bbox
    }

    #[inline]
    fn lon_ranges(&self) -> &[(i32, i32)] {
        &self.lon_ranges[..self.num_lon_ranges]
    }

    fn within_radius(&self, lat: f64, lon: f64) -> bool {
        haversin_meters(self.center_lat, self.center_lon, lat, lon) <= self.radius_meters
    }

    /// Relation of a decoded cell that overlaps the bounding box.
    fn relate_cell(&self, min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Relation {
        // center longitude shifted onto the cell's side of the dateline
        let center_lon = if max_lon < self.center_lon - 180.0 {
            self.center_lon - 360.0
        } else if min_lon > self.center_lon + 180.0 {
            self.center_lon + 360.0
        } else {
            self.center_lon
        };
        let corners = [
            (min_lat, min_lon),
            (min_lat, max_lon),
            (max_lat, min_lon),
            (max_lat, max_lon),
        ];

        if (center_lon < min_lon || center_lon > max_lon)
            && (self.axis_lat + AXIS_LAT_ERROR < min_lat || self.axis_lat - AXIS_LAT_ERROR > max_lat)
            && corners.iter().all(|&(lat, lon)| !self.within_radius(lat, lon))
        {
            return Relation::Outside;
        }
        if max_lon - center_lon < 90.0
            && center_lon - min_lon < 90.0
            && corners.iter().all(|&(lat, lon)| self.within_radius(lat, lon))
        {
            return Relation::Inside;
        }
        Relation::Crosses
    }
}

impl ShapePredicate for DistanceQuery {
    fn relate(&self, min_packed: &[u8], max_packed: &[u8]) -> Relation {
        let (min_lat, min_lon) = decode_lat_lon_ints(min_packed);
        let (max_lat, max_lon) = decode_lat_lon_ints(max_packed);
        if max_lat < self.min_lat || min_lat > self.max_lat {
            return Relation::Outside;
        }
        if !self
            .lon_ranges()
            .iter()
            .any(|&(lower, upper)| max_lon >= lower && min_lon <= upper)
        {
            return Relation::Outside;
        }
        self.relate_cell(
            decode_latitude(min_lat),
            decode_latitude(max_lat),
            decode_longitude(min_lon),
            decode_longitude(max_lon),
        )
    }

    fn matches(&self, packed: &[u8]) -> bool {
        let (lat, lon) = decode_lat_lon_ints(packed);
        if lat < self.min_lat
            || lat > self.max_lat
            || !self
                .lon_ranges()
                .iter()
                .any(|&(lower, upper)| lon >= lower && lon <= upper)
        {
            return false;
        }
        let sort_key = haversin_sort_key(
            self.center_lat,
            self.center_lon,
            decode_latitude(lat),
            decode_longitude(lon),
        );
        if sort_key > self.max_partial_distance {
            return false;
        }
        haversin_meters_from_sort_key(sort_key) <= self.radius_meters
    }
}
