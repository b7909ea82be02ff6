//! Great-circle distance on a spherical earth.
//!
//! Distances are compared through a haversine "sort key": a monotonic proxy
//! that skips the `asin`/`sqrt` of a full haversine evaluation. Keys convert
//! to meters with [`haversin_meters_from_sort_key`].

use crate::compute::encoding::{MAX_LAT_INCL, MAX_LON_INCL, MIN_LAT_INCL, MIN_LON_INCL};
use crate::compute::validation::{check_lat_lon, check_radius};
use crate::error::Result;
use crate::geometry::Rectangle;
use std::f64::consts::{FRAC_PI_2, PI};

/// Mean earth radius in meters.
pub const EARTH_MEAN_RADIUS_METERS: f64 = 6_371_008.7714;

/// Maximum error of [`axis_lat`], in degrees.
pub const AXIS_LAT_ERROR: f64 = 0.1 / EARTH_MEAN_RADIUS_METERS * (180.0 / PI);

// added to every radius before it becomes an angle
const RADIUS_EPSILON_METERS: f64 = 7E-2;

const SORT_KEY_MASK: u64 = 0xFFFF_FFFF_FFFF_FFF8;

/// Monotonic proxy for the distance between two points.
///
/// The three low mantissa bits are cleared so that tiny rounding differences
/// between evaluation orders collapse into ties.
///
/// # Examples
///
/// ```
/// use spatio_points::compute::distance::{haversin_meters_from_sort_key, haversin_sort_key};
///
/// let near = haversin_sort_key(0.0, 0.0, 0.0, 1.0);
/// let far = haversin_sort_key(0.0, 0.0, 0.0, 2.0);
/// assert!(near < far);
/// let meters = haversin_meters_from_sort_key(near);
/// assert!((meters - 111_195.0).abs() < 10.0);
/// ```
#[inline]
pub fn haversin_sort_key(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let x1 = lat1.to_radians();
    let x2 = lat2.to_radians();
    let h1 = 1.0 - (x1 - x2).cos();
    let h2 = 1.0 - (lon1 - lon2).to_radians().cos();
    let h = h1 + x1.cos() * x2.cos() * h2;
    f64::from_bits(h.to_bits() & SORT_KEY_MASK)
}

/// Converts a sort key into meters.
#[inline]
pub fn haversin_meters_from_sort_key(sort_key: f64) -> f64 {
    EARTH_MEAN_RADIUS_METERS * 2.0 * (sort_key * 0.5).sqrt().min(1.0).asin()
}

/// Haversine distance in meters between two points.
#[inline]
pub fn haversin_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    haversin_meters_from_sort_key(haversin_sort_key(lat1, lon1, lat2, lon2))
}

/// Bounding box of all points within `radius_meters` of the center.
///
/// Longitudes wrap across the dateline, producing a rectangle with
/// `min_lon > max_lon`. A circle that reaches a pole spans every longitude.
///
/// # Examples
///
/// ```
/// use spatio_points::compute::distance::circle_to_bbox;
///
/// let bbox = circle_to_bbox(0.0, 179.9, 50_000.0).unwrap();
/// assert!(bbox.crosses_dateline());
/// assert!(bbox.contains(0.0, -179.9));
///
/// let polar = circle_to_bbox(89.9, 0.0, 50_000.0).unwrap();
/// assert_eq!(polar.max_lat, 90.0);
/// assert_eq!(polar.min_lon, -180.0);
/// ```
pub fn circle_to_bbox(center_lat: f64, center_lon: f64, radius_meters: f64) -> Result<Rectangle> {
    check_lat_lon(center_lat, center_lon)?;
    check_radius(radius_meters)?;

    let rad_lat = center_lat.to_radians();
    let rad_lon = center_lon.to_radians();
    let rad_distance = (radius_meters + RADIUS_EPSILON_METERS) / EARTH_MEAN_RADIUS_METERS;
    let min_lat = rad_lat - rad_distance;
    let max_lat = rad_lat + rad_distance;

    if min_lat > -FRAC_PI_2 && max_lat < FRAC_PI_2 {
        let delta_lon = (rad_distance.sin() / rad_lat.cos()).asin();
        let mut min_lon = rad_lon - delta_lon;
        if min_lon < -PI {
            min_lon += 2.0 * PI;
        }
        let mut max_lon = rad_lon + delta_lon;
        if max_lon > PI {
            max_lon -= 2.0 * PI;
        }
        Ok(Rectangle {
            min_lat: clamp_lat(min_lat.to_degrees()),
            max_lat: clamp_lat(max_lat.to_degrees()),
            min_lon: clamp_lon(min_lon.to_degrees()),
            max_lon: clamp_lon(max_lon.to_degrees()),
        })
    } else {
        // a pole is within the distance
        Ok(Rectangle {
            min_lat: clamp_lat(min_lat.to_degrees()),
            max_lat: clamp_lat(max_lat.to_degrees()),
            min_lon: MIN_LON_INCL,
            max_lon: MAX_LON_INCL,
        })
    }
}

/// Latitude at which the circle touches the meridians bounding its bbox.
///
/// Along either tangent meridian, the circle only covers latitudes close to
/// this value (within [`AXIS_LAT_ERROR`]). Returns the pole when the circle
/// covers it.
pub fn axis_lat(center_lat: f64, radius_meters: f64) -> f64 {
    let mut l1 = center_lat.to_radians();
    let r = (radius_meters + RADIUS_EPSILON_METERS) / EARTH_MEAN_RADIUS_METERS;
    if l1.abs() + r >= FRAC_PI_2 {
        return if center_lat >= 0.0 {
            MAX_LAT_INCL
        } else {
            MIN_LAT_INCL
        };
    }

    // right triangle: pole, circle center, tangent point
    l1 = if center_lat >= 0.0 {
        FRAC_PI_2 - l1
    } else {
        l1 + FRAC_PI_2
    };
    let l2 = (l1.cos() / r.cos()).min(1.0).acos();

    let axis = if center_lat >= 0.0 {
        FRAC_PI_2 - l2
    } else {
        l2 - FRAC_PI_2
    };
    clamp_lat(axis.to_degrees())
}

/// Smallest sort key from a point to any point of a rectangle.
///
/// Zero when the point is inside. The rectangle must not cross the dateline.
/// The minimum over a rectangle seen from outside is reached on its border, so
/// each edge is minimized in closed form: along a parallel the nearest
/// longitude is the point's own, along a meridian the nearest latitude is
/// `atan2(sin lat, cos lat cos dlon)`. Callers comparing against stored keys
/// should leave a small relative slack for rounding.
pub fn min_sort_key_to_box(lat: f64, lon: f64, rect: &Rectangle) -> f64 {
    debug_assert!(!rect.crosses_dateline());
    if rect.contains(lat, lon) {
        return 0.0;
    }
    let mut best = f64::INFINITY;
    for edge_lat in [rect.min_lat, rect.max_lat] {
        best = best.min(min_along_parallel(lat, lon, edge_lat, rect.min_lon, rect.max_lon));
    }
    for edge_lon in [rect.min_lon, rect.max_lon] {
        best = best.min(min_along_meridian(lat, lon, edge_lon, rect.min_lat, rect.max_lat));
    }
    best
}

fn min_along_parallel(lat: f64, lon: f64, edge_lat: f64, min_lon: f64, max_lon: f64) -> f64 {
    let mut best = haversin_sort_key(lat, lon, edge_lat, min_lon)
        .min(haversin_sort_key(lat, lon, edge_lat, max_lon));
    for candidate in [lon - 360.0, lon, lon + 360.0] {
        if candidate >= min_lon && candidate <= max_lon {
            best = best.min(haversin_sort_key(lat, lon, edge_lat, candidate));
        }
    }
    best
}

fn min_along_meridian(lat: f64, lon: f64, edge_lon: f64, min_lat: f64, max_lat: f64) -> f64 {
    let mut best = haversin_sort_key(lat, lon, min_lat, edge_lon)
        .min(haversin_sort_key(lat, lon, max_lat, edge_lon));
    let rad_lat = lat.to_radians();
    let delta_lon = (edge_lon - lon).to_radians();
    let nearest = rad_lat.sin().atan2(rad_lat.cos() * delta_lon.cos()).to_degrees();
    if nearest >= min_lat && nearest <= max_lat {
        best = best.min(haversin_sort_key(lat, lon, nearest, edge_lon));
    }
    best
}

#[inline]
fn clamp_lat(lat: f64) -> f64 {
    lat.clamp(MIN_LAT_INCL, MAX_LAT_INCL)
}

#[inline]
fn clamp_lon(lon: f64) -> f64 {
    lon.clamp(MIN_LON_INCL, MAX_LON_INCL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{next_latitude, next_longitude};
    use geo::{Distance, Haversine, Point};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_sort_key_matches_geo_haversine() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..1000 {
            let (lat1, lon1) = (next_latitude(&mut rng), next_longitude(&mut rng));
            let (lat2, lon2) = (next_latitude(&mut rng), next_longitude(&mut rng));
            let ours = haversin_meters(lat1, lon1, lat2, lon2);
            let theirs = Haversine.distance(Point::new(lon1, lat1), Point::new(lon2, lat2));
            // geo uses a slightly different earth radius
            assert!(
                (ours - theirs).abs() <= theirs * 1e-5 + 1e-3,
                "{} vs {}",
                ours,
                theirs
            );
        }
    }

    #[test]
    fn test_sort_key_is_zero_for_same_point() {
        assert_eq!(haversin_sort_key(10.0, 20.0, 10.0, 20.0), 0.0);
        assert_eq!(haversin_meters(-45.0, 180.0, -45.0, -180.0), 0.0);
    }

    #[test]
    fn test_basic_distance() {
        let meters = haversin_meters(18.0, -65.0, 18.313694, -65.227444);
        assert!(meters < 50_000.0);
        assert!(meters > 40_000.0);
    }

    #[test]
    fn test_circle_bbox_contains_circle() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..500 {
            let lat = next_latitude(&mut rng);
            let lon = next_longitude(&mut rng);
            let radius = rng.gen_range(0.0..2_000_000.0);
            let bbox = circle_to_bbox(lat, lon, radius).unwrap();
            for _ in 0..50 {
                let p_lat = next_latitude(&mut rng);
                let p_lon = next_longitude(&mut rng);
                if haversin_meters(lat, lon, p_lat, p_lon) <= radius {
                    assert!(
                        bbox.contains(p_lat, p_lon),
                        "bbox {} misses ({}, {})",
                        bbox,
                        p_lat,
                        p_lon
                    );
                }
            }
        }
    }

    #[test]
    fn test_circle_bbox_edge_points() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..500 {
            let lat = rng.gen_range(-80.0..80.0);
            let lon = next_longitude(&mut rng);
            let radius = rng.gen_range(1.0..500_000.0);
            let bbox = circle_to_bbox(lat, lon, radius).unwrap();
            // points placed on the circle along the four compass directions
            let dlat = (radius / EARTH_MEAN_RADIUS_METERS).to_degrees();
            for p_lat in [lat - dlat, lat + dlat] {
                if (-90.0..=90.0).contains(&p_lat) {
                    assert!(bbox.contains(p_lat, lon));
                }
            }
        }
    }

    #[test]
    fn test_circle_bbox_rejects_bad_input() {
        assert!(circle_to_bbox(91.0, 0.0, 10.0).is_err());
        assert!(circle_to_bbox(0.0, 0.0, -1.0).is_err());
        assert!(circle_to_bbox(0.0, 0.0, f64::NAN).is_err());
    }

    #[test]
    fn test_axis_lat_is_on_tangent_meridian() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        for _ in 0..200 {
            let lat = rng.gen_range(-70.0..70.0);
            let radius = rng.gen_range(1_000.0..1_000_000.0);
            let axis = axis_lat(lat, radius);
            let bbox = circle_to_bbox(lat, 0.0, radius).unwrap();
            // the tangent point is at the circle's widest longitude
            let d = haversin_meters(lat, 0.0, axis, bbox.max_lon);
            assert!((d - radius).abs() < 1.0, "distance {} radius {}", d, radius);
            assert!(axis.abs() >= lat.abs());
        }
    }

    #[test]
    fn test_axis_lat_at_poles() {
        assert_eq!(axis_lat(89.0, 200_000.0), 90.0);
        assert_eq!(axis_lat(-89.0, 200_000.0), -90.0);
    }

    #[test]
    fn test_min_sort_key_to_box_is_a_lower_bound() {
        let mut rng = ChaCha8Rng::seed_from_u64(23);
        for _ in 0..300 {
            let lat = next_latitude(&mut rng);
            let lon = next_longitude(&mut rng);
            let lat_a = next_latitude(&mut rng);
            let lat_b = next_latitude(&mut rng);
            let lon_a = next_longitude(&mut rng);
            let lon_b = next_longitude(&mut rng);
            let rect = Rectangle {
                min_lat: lat_a.min(lat_b),
                max_lat: lat_a.max(lat_b),
                min_lon: lon_a.min(lon_b),
                max_lon: lon_a.max(lon_b),
            };
            let bound = min_sort_key_to_box(lat, lon, &rect);
            for _ in 0..100 {
                let p_lat = rng.gen_range(rect.min_lat..=rect.max_lat);
                let p_lon = rng.gen_range(rect.min_lon..=rect.max_lon);
                let key = haversin_sort_key(lat, lon, p_lat, p_lon);
                assert!(bound <= key * (1.0 + 1e-9), "bound {} key {}", bound, key);
            }
        }
    }

    #[test]
    fn test_min_sort_key_inside_is_zero() {
        let rect = Rectangle {
            min_lat: -1.0,
            max_lat: 1.0,
            min_lon: -1.0,
            max_lon: 1.0,
        };
        assert_eq!(min_sort_key_to_box(0.5, 0.5, &rect), 0.0);
        assert!(min_sort_key_to_box(5.0, 0.0, &rect) > 0.0);
    }
}
