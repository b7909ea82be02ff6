//! Planar lat/lon shapes and the structures that accelerate them.
//!
//! All relations are computed in degree space, treating latitude and
//! longitude as planar axes. [`Polygon`] is the reference implementation;
//! [`EdgeTree`] and [`PolygonGrid`] answer the same questions faster and must
//! agree with it.

pub mod edge_tree;
#[cfg(feature = "geojson")]
pub mod geojson;
pub mod grid;
pub mod polygon;
pub mod rectangle;

pub use edge_tree::EdgeTree;
pub use grid::{GridStats, PolygonGrid};
pub use polygon::Polygon;
pub use rectangle::Rectangle;

/// Sign of the turn a -> b -> c: positive counter-clockwise, negative
/// clockwise, zero when collinear. Not robust against round-off.
#[inline]
pub(crate) fn orient(ax: f64, ay: f64, bx: f64, by: f64, cx: f64, cy: f64) -> i32 {
    let v1 = (bx - ax) * (cy - ay);
    let v2 = (cx - ax) * (by - ay);
    if v1 > v2 {
        1
    } else if v1 < v2 {
        -1
    } else {
        0
    }
}

/// One step of even-odd ray casting: true when the eastward ray from the
/// point crosses edge (lat1, lon1) -> (lat2, lon2).
#[inline]
pub(crate) fn ray_crosses_edge(
    lat1: f64,
    lon1: f64,
    lat2: f64,
    lon2: f64,
    latitude: f64,
    longitude: f64,
) -> bool {
    (lat1 > latitude) != (lat2 > latitude)
        && longitude < (lon1 - lon2) * (latitude - lat2) / (lat1 - lat2) + lon2
}

/// True when edge (lat1, lon1) -> (lat2, lon2) intersects or touches the
/// boundary of the box.
#[allow(clippy::too_many_arguments)]
#[inline]
pub(crate) fn edge_crosses_box(
    lat1: f64,
    lon1: f64,
    lat2: f64,
    lon2: f64,
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
) -> bool {
    let (cy, cx, dy, dx) = (lat1, lon1, lat2, lon2);

    // edge entirely to one side of the box
    if (cy < min_lat && dy < min_lat)
        || (cy > max_lat && dy > max_lat)
        || (cx < min_lon && dx < min_lon)
        || (cx > max_lon && dx > max_lon)
    {
        return false;
    }

    let box_edges = [
        (min_lon, max_lat, max_lon, max_lat),
        (max_lon, max_lat, max_lon, min_lat),
        (max_lon, min_lat, min_lon, min_lat),
        (min_lon, min_lat, min_lon, max_lat),
    ];
    box_edges.iter().any(|&(ax, ay, bx, by)| {
        orient(cx, cy, dx, dy, ax, ay) * orient(cx, cy, dx, dy, bx, by) <= 0
            && orient(ax, ay, bx, by, cx, cy) * orient(ax, ay, bx, by, dx, dy) <= 0
    })
}
