//! Polygon input from GeoJSON text.

use crate::error::{Result, SpatioError};
use crate::geometry::Polygon;
use ::geojson::{Feature, GeoJson, Geometry, Value};

/// Parses every Polygon and MultiPolygon in a GeoJSON document.
///
/// Accepts bare geometries, features, feature collections and geometry
/// collections. Positions are `[lon, lat]`; the first ring of each polygon is
/// the shell, the rest are holes.
///
/// # Examples
///
/// ```
/// use spatio_points::geometry::geojson::polygons_from_geojson;
///
/// let text = r#"{
///     "type": "Polygon",
///     "coordinates": [[[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]]]
/// }"#;
/// let polygons = polygons_from_geojson(text).unwrap();
/// assert!(polygons[0].contains(5.0, 5.0));
/// ```
pub fn polygons_from_geojson(text: &str) -> Result<Vec<Polygon>> {
    let geojson: GeoJson = text
        .parse()
        .map_err(|e: ::geojson::Error| SpatioError::invalid(format!("invalid GeoJSON: {}", e)))?;

    let mut polygons = Vec::new();
    match &geojson {
        GeoJson::Geometry(geometry) => collect_geometry(geometry, &mut polygons)?,
        GeoJson::Feature(feature) => collect_feature(feature, &mut polygons)?,
        GeoJson::FeatureCollection(collection) => {
            for feature in &collection.features {
                collect_feature(feature, &mut polygons)?;
            }
        }
    }

    if polygons.is_empty() {
        return Err(SpatioError::invalid("GeoJSON contains no polygons"));
    }
    Ok(polygons)
}

fn collect_feature(feature: &Feature, out: &mut Vec<Polygon>) -> Result<()> {
    match &feature.geometry {
        Some(geometry) => collect_geometry(geometry, out),
        None => Ok(()),
    }
}

fn collect_geometry(geometry: &Geometry, out: &mut Vec<Polygon>) -> Result<()> {
    match &geometry.value {
        Value::Polygon(rings) => out.push(polygon_from_rings(rings)?),
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                out.push(polygon_from_rings(rings)?);
            }
        }
        Value::GeometryCollection(geometries) => {
            for geometry in geometries {
                collect_geometry(geometry, out)?;
            }
        }
        _ => {
            return Err(SpatioError::invalid(
                "GeoJSON geometry must be a Polygon or MultiPolygon",
            ));
        }
    }
    Ok(())
}

fn polygon_from_rings(rings: &[Vec<Vec<f64>>]) -> Result<Polygon> {
    let (shell, holes) = rings
        .split_first()
        .ok_or_else(|| SpatioError::invalid("GeoJSON polygon has no rings"))?;
    let holes = holes
        .iter()
        .map(|ring| {
            let (lats, lons) = ring_coordinates(ring)?;
            Polygon::new(lats, lons)
        })
        .collect::<Result<Vec<_>>>()?;
    let (lats, lons) = ring_coordinates(shell)?;
    Polygon::with_holes(lats, lons, holes)
}

fn ring_coordinates(ring: &[Vec<f64>]) -> Result<(Vec<f64>, Vec<f64>)> {
    let mut lats = Vec::with_capacity(ring.len());
    let mut lons = Vec::with_capacity(ring.len());
    for position in ring {
        if position.len() < 2 {
            return Err(SpatioError::invalid(
                "GeoJSON position needs longitude and latitude",
            ));
        }
        lons.push(position[0]);
        lats.push(position[1]);
    }
    Ok((lats, lons))
}
