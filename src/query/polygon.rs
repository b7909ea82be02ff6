//! Points inside one or more polygons.

use crate::compute::encoding::decode_lat_lon_ints;
use crate::config::Config;
use crate::error::{Result, SpatioError};
use crate::geometry::{Polygon, PolygonGrid};
use crate::query::ShapePredicate;
use spatio_types::Relation;

/// Matches points inside any of the polygons (holes excluded).
///
/// The grid over the polygons' bounding box is built once, here, and shared
/// by every traversal that uses this query.
#[derive(Debug, Clone)]
pub struct PolygonQuery {
    polygons: Vec<Polygon>,
    grid: PolygonGrid,
}

impl PolygonQuery {
    pub fn new(polygons: Vec<Polygon>) -> Result<Self> {
        Self::with_config(polygons, &Config::default())
    }

    pub fn with_config(polygons: Vec<Polygon>, config: &Config) -> Result<Self> {
        config.validate().map_err(SpatioError::Config)?;
        let grid = PolygonGrid::from_polygons(&polygons, config.grid_size)?;
        Ok(Self { polygons, grid })
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn grid(&self) -> &PolygonGrid {
        &self.grid
    }
}

impl ShapePredicate for PolygonQuery {
    fn relate(&self, min_packed: &[u8], max_packed: &[u8]) -> Relation {
        let (min_lat, min_lon) = decode_lat_lon_ints(min_packed);
        let (max_lat, max_lon) = decode_lat_lon_ints(max_packed);
        let (grid_min_lat, grid_max_lat, grid_min_lon, grid_max_lon) = self.grid.bounds();
        if min_lat <= grid_min_lat
            && max_lat >= grid_max_lat
            && min_lon <= grid_min_lon
            && max_lon >= grid_max_lon
        {
            // the cell encloses every polygon
            return Relation::Crosses;
        }
        self.grid.relate(min_lat, max_lat, min_lon, max_lon)
    }

    fn matches(&self, packed: &[u8]) -> bool {
        let (lat, lon) = decode_lat_lon_ints(packed);
        self.grid.contains(lat, lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::encoding::{decode_lat_lon, encode_lat_lon};
    use crate::random::{next_latitude_around, next_longitude_around, next_polygon};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn square() -> Polygon {
        Polygon::new(
            vec![0.0, 0.0, 10.0, 10.0, 0.0],
            vec![0.0, 10.0, 10.0, 0.0, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn test_square() {
        let query = PolygonQuery::new(vec![square()]).unwrap();
        assert!(query.matches(&encode_lat_lon(5.0, 5.0).unwrap()));
        assert!(!query.matches(&encode_lat_lon(15.0, 15.0).unwrap()));

        let cell = |min: f64, max: f64| {
            (
                encode_lat_lon(min, min).unwrap(),
                encode_lat_lon(max, max).unwrap(),
            )
        };
        let (min, max) = cell(2.0, 8.0);
        assert_eq!(query.relate(&min, &max), Relation::Inside);
        let (min, max) = cell(-5.0, 15.0);
        assert_eq!(query.relate(&min, &max), Relation::Crosses);
        let (min, max) = cell(20.0, 30.0);
        assert_eq!(query.relate(&min, &max), Relation::Outside);
    }

    #[test]
    fn test_matches_polygon_contains() {
        let mut rng = ChaCha8Rng::seed_from_u64(31);
        for _ in 0..50 {
            let polygon = next_polygon(&mut rng);
            let query = PolygonQuery::new(vec![polygon.clone()]).unwrap();
            for _ in 0..200 {
                let lat = next_latitude_around(&mut rng, polygon.min_lat(), polygon.max_lat());
                let lon = next_longitude_around(&mut rng, polygon.min_lon(), polygon.max_lon());
                let packed = encode_lat_lon(lat, lon).unwrap();
                let (q_lat, q_lon) = decode_lat_lon(&packed);
                assert_eq!(query.matches(&packed), polygon.contains(q_lat, q_lon));
            }
        }
    }

    #[test]
    fn test_config_grid_size() {
        let config = Config::default().with_grid_size(8);
        let query = PolygonQuery::with_config(vec![square()], &config).unwrap();
        assert_eq!(query.grid().size(), 8);

        let bad = Config::default().with_grid_size(12);
        let err = PolygonQuery::with_config(vec![square()], &bad).unwrap_err();
        assert!(matches!(err, SpatioError::Config(_)));
    }

    #[test]
    fn test_empty_polygon_list() {
        let err = PolygonQuery::new(vec![]).unwrap_err();
        assert!(err.to_string().contains("polygons must not be empty"));
    }
}
