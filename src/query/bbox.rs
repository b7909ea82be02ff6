//! Lat/lon box query.

use crate::compute::encoding::{
    decode_lat_lon_ints, decode_latitude, decode_longitude, encode_latitude,
    encode_latitude_ceil, encode_longitude, encode_longitude_ceil,
};
use crate::error::Result;
use crate::geometry::Rectangle;
use crate::query::ShapePredicate;
use spatio_types::Relation;

/// Points inside a rectangle, boundaries included.
///
/// A box with `min_lon > max_lon` crosses the dateline and is matched as two
/// longitude ranges. Bounds are compared in encoded space: a point matches
/// when its quantized coordinates lie in the box.
#[derive(Debug, Clone)]
pub struct BoxQuery {
    rect: Rectangle,
    min_lat: i32,
    max_lat: i32,
    lon_ranges: [(i32, i32); 2],
    num_lon_ranges: usize,
}

impl BoxQuery {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Result<Self> {
        Self::from_rectangle(Rectangle::new(min_lat, max_lat, min_lon, max_lon)?)
    }

    pub fn from_rectangle(rect: Rectangle) -> Result<Self> {
        let min_lat = encode_latitude_ceil(rect.min_lat)?;
        let max_lat = encode_latitude(rect.max_lat)?;
        let lower_lon = encode_longitude_ceil(rect.min_lon)?;
        let upper_lon = encode_longitude(rect.max_lon)?;

        // a lower bound above the largest encodable value saturates; nothing
        // at or beyond it exists
        let lat_empty = decode_latitude(min_lat) < rect.min_lat;
        let lower_lon_empty = decode_longitude(lower_lon) < rect.min_lon;

        let (lon_ranges, num_lon_ranges) = match (rect.crosses_dateline(), lower_lon_empty) {
            _ if lat_empty => ([(0, 0); 2], 0),
            (true, false) => ([(lower_lon, i32::MAX), (i32::MIN, upper_lon)], 2),
            (true, true) => ([(i32::MIN, upper_lon); 2], 1),
            (false, false) => ([(lower_lon, upper_lon); 2], 1),
            (false, true) => ([(0, 0); 2], 0),
        };
        Ok(Self {
            rect,
            min_lat,
            max_lat,
            lon_ranges,
            num_lon_ranges,
        })
    }

    pub fn rectangle(&self) -> &Rectangle {
        &self.rect
    }

    #[inline]
    fn lon_ranges(&self) -> &[(i32, i32)] {
        &self.lon_ranges[..self.num_lon_ranges]
    }
}

impl ShapePredicate for BoxQuery {
    fn relate(&self, min_packed: &[u8], max_packed: &[u8]) -> Relation {
        let (min_lat, min_lon) = decode_lat_lon_ints(min_packed);
        let (max_lat, max_lon) = decode_lat_lon_ints(max_packed);
        if max_lat < self.min_lat || min_lat > self.max_lat {
            return Relation::Outside;
        }
        let lat_within = min_lat >= self.min_lat && max_lat <= self.max_lat;

        let mut overlaps = false;
        for &(lower, upper) in self.lon_ranges() {
            if max_lon < lower || min_lon > upper {
                continue;
            }
            if lat_within && min_lon >= lower && max_lon <= upper {
                return Relation::Inside;
            }
            overlaps = true;
        }
        if overlaps {
            Relation::Crosses
        } else {
            Relation::Outside
        }
    }

    fn matches(&self, packed: &[u8]) -> bool {
        let (lat, lon) = decode_lat_lon_ints(packed);
        lat >= self.min_lat
            && lat <= self.max_lat
            && self
                .lon_ranges()
                .iter()
                .any(|&(lower, upper)| lon >= lower && lon <= upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::encoding::{decode_lat_lon, encode_lat_lon};
    use crate::random::{next_box, next_latitude, next_longitude};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_matches_decoded_points() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..200 {
            let rect = next_box(&mut rng);
            let query = BoxQuery::from_rectangle(rect).unwrap();
            for _ in 0..100 {
                let packed = encode_lat_lon(next_latitude(&mut rng), next_longitude(&mut rng)).unwrap();
                let (lat, lon) = decode_lat_lon(&packed);
                assert_eq!(query.matches(&packed), rect.contains(lat, lon), "{} ({}, {})", rect, lat, lon);
            }
        }
    }

    #[test]
    fn test_relate_is_sound() {
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        for _ in 0..200 {
            let query = BoxQuery::from_rectangle(next_box(&mut rng)).unwrap();
            let cell = crate::random::next_simple_box(&mut rng);
            let min = encode_lat_lon(cell.min_lat, cell.min_lon).unwrap();
            let max = encode_lat_lon(cell.max_lat, cell.max_lon).unwrap();
            let relation = query.relate(&min, &max);
            for _ in 0..50 {
                let lat = rand::Rng::gen_range(&mut rng, cell.min_lat..=cell.max_lat);
                let lon = rand::Rng::gen_range(&mut rng, cell.min_lon..=cell.max_lon);
                let packed = encode_lat_lon(lat, lon).unwrap();
                match relation {
                    Relation::Inside => assert!(query.matches(&packed)),
                    Relation::Outside => assert!(!query.matches(&packed)),
                    Relation::Crosses => {}
                }
            }
        }
    }

    #[test]
    fn test_dateline_box() {
        let query = BoxQuery::new(-10.0, 10.0, 170.0, -170.0).unwrap();
        assert!(query.matches(&encode_lat_lon(0.0, 175.0).unwrap()));
        assert!(query.matches(&encode_lat_lon(0.0, -175.0).unwrap()));
        assert!(query.matches(&encode_lat_lon(0.0, 180.0).unwrap()));
        assert!(!query.matches(&encode_lat_lon(0.0, 0.0).unwrap()));

        let west = (encode_lat_lon(-5.0, 171.0).unwrap(), encode_lat_lon(5.0, 179.0).unwrap());
        assert_eq!(query.relate(&west.0, &west.1), Relation::Inside);
        let middle = (encode_lat_lon(-5.0, -100.0).unwrap(), encode_lat_lon(5.0, 100.0).unwrap());
        assert_eq!(query.relate(&middle.0, &middle.1), Relation::Outside);
        let spanning = (encode_lat_lon(-5.0, -175.0).unwrap(), encode_lat_lon(5.0, 175.0).unwrap());
        assert_eq!(query.relate(&spanning.0, &spanning.1), Relation::Crosses);
    }

    #[test]
    fn test_invalid_boxes() {
        assert!(BoxQuery::new(10.0, -10.0, 0.0, 1.0).is_err());
        assert!(BoxQuery::new(-91.0, 10.0, 0.0, 1.0).is_err());
        assert!(BoxQuery::new(0.0, 10.0, f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_bounds_past_last_encoded_value() {
        let north = encode_lat_lon(90.0, 0.0).unwrap();
        assert!(!BoxQuery::new(90.0, 90.0, -1.0, 1.0).unwrap().matches(&north));
        assert!(BoxQuery::new(89.0, 90.0, -1.0, 1.0).unwrap().matches(&north));

        let east = encode_lat_lon(0.0, 180.0).unwrap();
        let west = encode_lat_lon(0.0, -180.0).unwrap();
        let query = BoxQuery::new(-1.0, 1.0, 180.0, -179.0).unwrap();
        assert!(!query.matches(&east));
        assert!(query.matches(&west));
        assert!(!BoxQuery::new(-1.0, 1.0, 180.0, 180.0).unwrap().matches(&east));
    }

    #[test]
    fn test_point_box() {
        let query = BoxQuery::new(45.0, 45.0, 45.0, 45.0).unwrap();
        let packed = encode_lat_lon(45.0, 45.0).unwrap();
        let (lat, lon) = decode_lat_lon(&packed);
        assert_eq!(query.matches(&packed), lat == 45.0 && lon == 45.0);
    }
}
