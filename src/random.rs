//! Random coordinates, boxes and polygons for randomized tests and benches.
//!
//! Values lean toward the interesting cases: exact bounds, zero, a coarse
//! lattice that produces duplicates, and one-ulp neighbors. Every function
//! takes its generator explicitly, so a seeded `ChaCha8Rng` makes a whole run
//! reproducible.
//!
//! ```
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//! use spatio_points::random::{next_latitude, next_polygon};
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let lat = next_latitude(&mut rng);
//! assert!((-90.0..=90.0).contains(&lat));
//! let polygon = next_polygon(&mut rng);
//! assert!(polygon.num_points() >= 4);
//! ```

use crate::compute::distance::haversin_meters;
use crate::compute::encoding::{
    MAX_LAT_INCL, MAX_LON_INCL, MIN_LAT_INCL, MIN_LON_INCL, double_to_sortable_long,
    sortable_long_to_double,
};
use crate::compute::validation::{check_lat_lon, is_valid_latitude, is_valid_longitude};
use crate::compute::EARTH_MEAN_RADIUS_METERS;
use crate::error::{Result, SpatioError};
use crate::geometry::{Polygon, Rectangle};
use rand::Rng;
use std::f64::consts::PI;

pub fn next_latitude(rng: &mut impl Rng) -> f64 {
    next_double(rng, MIN_LAT_INCL, MAX_LAT_INCL)
}

pub fn next_longitude(rng: &mut impl Rng) -> f64 {
    next_double(rng, MIN_LON_INCL, MAX_LON_INCL)
}

/// A double in `[low, high]`, biased toward edges and duplicates.
fn next_double(rng: &mut impl Rng, low: f64, high: f64) -> f64 {
    debug_assert!(low.is_finite() && high.is_finite() && low <= high);
    if low == high {
        return low;
    }

    let base = match rng.gen_range(0..17) {
        0 => {
            // uniform over the representable doubles, not the reals
            let bits = rng.gen_range(double_to_sortable_long(low)..=double_to_sortable_long(high));
            sortable_long_to_double(bits)
        }
        1 => low,
        2 => high,
        3 if low <= 0.0 && high >= 0.0 => 0.0,
        4 => low + (high - low) / 360.0 * rng.gen_range(0..360) as f64,
        _ => low + (high - low) * rng.r#gen::<f64>(),
    };
    let base = base.clamp(low, high);

    match rng.gen_range(0..17) {
        0 => base.next_up().min(high),
        1 => base.next_down().max(low),
        _ => base,
    }
}

/// A latitude usually within half a degree of `other`.
pub fn next_latitude_near(rng: &mut impl Rng, other: f64) -> f64 {
    match rng.gen_range(0..11) {
        10 => next_latitude(rng),
        0..5 => next_double(rng, other, (other + 0.5).min(MAX_LAT_INCL)),
        _ => next_double(rng, (other - 0.5).max(MIN_LAT_INCL), other),
    }
}

/// A longitude usually within half a degree of `other`.
pub fn next_longitude_near(rng: &mut impl Rng, other: f64) -> f64 {
    match rng.gen_range(0..11) {
        10 => next_longitude(rng),
        0..5 => next_double(rng, other, (other + 0.5).min(MAX_LON_INCL)),
        _ => next_double(rng, (other - 0.5).max(MIN_LON_INCL), other),
    }
}

/// A latitude in `[min, max]` widened by 1%, or occasionally anywhere.
pub fn next_latitude_around(rng: &mut impl Rng, min: f64, max: f64) -> f64 {
    if rng.gen_range(0..47) == 0 {
        return next_latitude(rng);
    }
    let slack = (max - min) / 100.0;
    next_double(
        rng,
        (min - slack).max(MIN_LAT_INCL),
        (max + slack).min(MAX_LAT_INCL),
    )
}

/// A longitude in `[min, max]` widened by 1%, or occasionally anywhere.
pub fn next_longitude_around(rng: &mut impl Rng, min: f64, max: f64) -> f64 {
    if rng.gen_range(0..47) == 0 {
        return next_longitude(rng);
    }
    let slack = (max - min) / 100.0;
    next_double(
        rng,
        (min - slack).max(MIN_LON_INCL),
        (max + slack).min(MAX_LON_INCL),
    )
}

/// A box anywhere; may cross the dateline.
pub fn next_box(rng: &mut impl Rng) -> Rectangle {
    let (lat0, lat1) = (next_latitude(rng), next_latitude(rng));
    let (lon0, lon1) = (next_longitude(rng), next_longitude(rng));
    box_from_corners(lat0, lat1, lon0, lon1, true)
}

/// A box anywhere that does not cross the dateline.
pub fn next_simple_box(rng: &mut impl Rng) -> Rectangle {
    let (lat0, lat1) = (next_latitude(rng), next_latitude(rng));
    let (lon0, lon1) = (next_longitude(rng), next_longitude(rng));
    box_from_corners(lat0, lat1, lon0, lon1, false)
}

pub fn next_box_near(rng: &mut impl Rng, lat: f64, lon: f64) -> Rectangle {
    let (lat0, lat1) = (next_latitude_near(rng, lat), next_latitude_near(rng, lat));
    let (lon0, lon1) = (next_longitude_near(rng, lon), next_longitude_near(rng, lon));
    box_from_corners(lat0, lat1, lon0, lon1, true)
}

pub fn next_simple_box_near(rng: &mut impl Rng, lat: f64, lon: f64) -> Rectangle {
    let (lat0, lat1) = (next_latitude_near(rng, lat), next_latitude_near(rng, lat));
    let (lon0, lon1) = (next_longitude_near(rng, lon), next_longitude_near(rng, lon));
    box_from_corners(lat0, lat1, lon0, lon1, false)
}

fn box_from_corners(lat0: f64, lat1: f64, lon0: f64, lon1: f64, can_cross_dateline: bool) -> Rectangle {
    let (min_lon, max_lon) = if can_cross_dateline || lon0 <= lon1 {
        (lon0, lon1)
    } else {
        (lon1, lon0)
    };
    Rectangle {
        min_lat: lat0.min(lat1),
        max_lat: lat0.max(lat1),
        min_lon,
        max_lon,
    }
}

/// A regular `gons`-gon around the center with every vertex within 10 cm of
/// `radius_meters` from it.
///
/// Fails when a vertex would cross a pole or the dateline.
pub fn create_regular_polygon(
    center_lat: f64,
    center_lon: f64,
    radius_meters: f64,
    gons: usize,
) -> Result<Polygon> {
    check_lat_lon(center_lat, center_lon)?;
    if gons < 3 {
        return Err(SpatioError::invalid(format!(
            "a polygon needs at least 3 sides (got: {})",
            gons
        )));
    }

    let mut lats = Vec::with_capacity(gons + 1);
    let mut lons = Vec::with_capacity(gons + 1);
    for i in 0..gons {
        let angle = (360.0 - i as f64 * (360.0 / gons as f64)).to_radians();
        let (x, y) = (angle.cos(), angle.sin());

        // walk out along the spoke, halving the step at every overshoot
        let mut factor = 2.0;
        let mut step = 1.0;
        let mut last = 0i8;
        let mut found = false;
        for _ in 0..10_000 {
            let lat = center_lat + y * factor;
            let lon = center_lon + x * factor;
            check_lat_lon(lat, lon)?;
            let distance = haversin_meters(center_lat, center_lon, lat, lon);
            if (distance - radius_meters).abs() < 0.1 {
                lats.push(lat);
                lons.push(lon);
                found = true;
                break;
            }
            if distance > radius_meters {
                factor -= step;
                if last == 1 {
                    step /= 2.0;
                }
                last = -1;
            } else {
                factor += step;
                if last == -1 {
                    step /= 2.0;
                }
                last = 1;
            }
        }
        if !found {
            return Err(SpatioError::invalid(format!(
                "no vertex at {} meters from ({}, {})",
                radius_meters, center_lat, center_lon
            )));
        }
    }

    lats.push(lats[0]);
    lons.push(lons[0]);
    Polygon::new(lats, lons)
}

/// A polygon anywhere: a star, a regular n-gon, a box or a triangle. It
/// never crosses the dateline.
pub fn next_polygon(rng: &mut impl Rng) -> Polygon {
    if rng.gen_bool(0.5) {
        return surprise_polygon(rng, None);
    }
    if rng.gen_range(0..10) == 1 {
        // slow to build, so only now and then
        loop {
            let gons = rng.gen_range(4..=500);
            // covers at most half of the earth
            let radius = rng.r#gen::<f64>() * EARTH_MEAN_RADIUS_METERS * PI / 2.0 + 1.0;
            let (lat, lon) = (next_latitude(rng), next_longitude(rng));
            if let Ok(polygon) = create_regular_polygon(lat, lon, radius, gons) {
                return polygon;
            }
        }
    }
    loop {
        let rect = next_simple_box(rng);
        if let Ok(polygon) = box_or_triangle(rng, &rect) {
            return polygon;
        }
    }
}

/// Like [`next_polygon`], but close to the given point.
pub fn next_polygon_near(rng: &mut impl Rng, lat: f64, lon: f64) -> Polygon {
    if rng.gen_bool(0.5) {
        return surprise_polygon(rng, Some((lat, lon)));
    }
    loop {
        let rect = next_simple_box_near(rng, lat, lon);
        if let Ok(polygon) = box_or_triangle(rng, &rect) {
            return polygon;
        }
    }
}

fn box_or_triangle(rng: &mut impl Rng, rect: &Rectangle) -> Result<Polygon> {
    if rng.gen_bool(0.5) {
        Polygon::new(
            vec![rect.min_lat, rect.max_lat, rect.max_lat, rect.min_lat, rect.min_lat],
            vec![rect.min_lon, rect.min_lon, rect.max_lon, rect.max_lon, rect.min_lon],
        )
    } else {
        Polygon::new(
            vec![rect.min_lat, rect.max_lat, rect.max_lat, rect.min_lat],
            vec![rect.min_lon, rect.min_lon, rect.max_lon, rect.min_lon],
        )
    }
}

/// A star-shaped polygon of up to 20 degrees radius, possibly wrapping over
/// a pole.
fn surprise_polygon(rng: &mut impl Rng, near: Option<(f64, f64)>) -> Polygon {
    'attempt: loop {
        let (center_lat, center_lon) = match near {
            Some((lat, lon)) => (next_latitude_near(rng, lat), next_longitude_near(rng, lon)),
            None => (next_latitude(rng), next_longitude(rng)),
        };
        let radius = 0.1 + 20.0 * rng.r#gen::<f64>();
        let radius_delta = rng.r#gen::<f64>();

        let mut lats = Vec::new();
        let mut lons = Vec::new();
        let mut angle = 0.0f64;
        loop {
            angle += rng.r#gen::<f64>() * 40.0;
            if angle > 360.0 {
                break;
            }
            let len = radius * (1.0 - radius_delta + radius_delta * rng.r#gen::<f64>());
            let mut lat = center_lat + len * angle.to_radians().cos();
            let mut lon = center_lon + len * angle.to_radians().sin();
            if lon <= MIN_LON_INCL || lon >= MAX_LON_INCL {
                continue 'attempt;
            }
            if lat > MAX_LAT_INCL {
                // over the north pole
                lat = 180.0 - lat;
                lon = 180.0 - lon;
            } else if lat < MIN_LAT_INCL {
                // over the south pole
                lat = -180.0 - lat;
                lon = 180.0 - lon;
            }
            if lon <= MIN_LON_INCL || lon >= MAX_LON_INCL {
                continue 'attempt;
            }
            if !is_valid_latitude(lat) || !is_valid_longitude(lon) {
                continue 'attempt;
            }
            lats.push(lat);
            lons.push(lon);
        }
        if lats.len() < 3 {
            continue;
        }
        lats.push(lats[0]);
        lons.push(lons[0]);
        if let Ok(polygon) = Polygon::new(lats, lons) {
            return polygon;
        }
    }
}
