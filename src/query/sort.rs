//! Matching docs ordered by distance from an origin.
//!
//! A doc's distance is the smallest over its matching points. With a limit,
//! the key of the `limit`-th best doc so far becomes a bound: cells whose
//! nearest corner or edge is past it are skipped, and so are single points.

use crate::compute::distance::{haversin_sort_key, min_sort_key_to_box};
use crate::compute::encoding::{
    BYTES_PER_DIM, LAT_LON_DIMS, decode_lat_lon_ints, decode_latitude, decode_longitude,
};
use crate::compute::validation::check_lat_lon;
use crate::error::{Result, SpatioError};
use crate::geometry::Rectangle;
use crate::points::nearest::BOUND_SLACK;
use crate::points::{DocId, IntersectVisitor, NearestHit, PointValues};
use crate::query::ShapePredicate;
use log::trace;
use rustc_hash::FxHashMap;
use spatio_types::Relation;

/// Visitor keeping the smallest sort key of each matching doc.
#[derive(Debug)]
pub struct DistanceSorter<'p, P: ?Sized> {
    predicate: &'p P,
    lat: f64,
    lon: f64,
    limit: Option<usize>,
    best: FxHashMap<DocId, f64>,
    /// no point with a larger key can reach the top `limit`
    bound: f64,
    updates: usize,
}

impl<'p, P: ShapePredicate + ?Sized> DistanceSorter<'p, P> {
    pub fn new(predicate: &'p P, lat: f64, lon: f64, limit: Option<usize>) -> Result<Self> {
        check_lat_lon(lat, lon)?;
        if limit == Some(0) {
            return Err(SpatioError::invalid("limit must be at least 1 (got: 0)"));
        }
        Ok(Self {
            predicate,
            lat,
            lon,
            limit,
            best: FxHashMap::default(),
            bound: f64::INFINITY,
            updates: 0,
        })
    }

    /// Hits nearest first, ties by doc id, cut to the limit.
    pub fn into_hits(self) -> Vec<NearestHit> {
        let mut hits: Vec<NearestHit> = self
            .best
            .into_iter()
            .map(|(doc_id, sort_key)| NearestHit { doc_id, sort_key })
            .collect();
        hits.sort_unstable();
        if let Some(limit) = self.limit {
            hits.truncate(limit);
        }
        hits
    }

    fn record(&mut self, doc_id: DocId, sort_key: f64) {
        let improved = match self.best.get_mut(&doc_id) {
            Some(current) if sort_key < *current => {
                *current = sort_key;
                true
            }
            Some(_) => false,
            None => {
                self.best.insert(doc_id, sort_key);
                true
            }
        };
        if !improved {
            return;
        }
        let Some(limit) = self.limit else {
            return;
        };
        self.updates += 1;
        // amortized: one selection per `limit` updates
        if self.best.len() >= limit && self.updates >= limit {
            self.updates = 0;
            let mut keys: Vec<f64> = self.best.values().copied().collect();
            let (_, kth, _) = keys.select_nth_unstable_by(limit - 1, f64::total_cmp);
            self.bound = self.bound.min(*kth);
        }
    }
}

impl<P: ShapePredicate + ?Sized> IntersectVisitor for DistanceSorter<'_, P> {
    // compare never answers Inside, so every point comes with its value
    fn visit(&mut self, _doc_id: DocId) {}

    fn visit_by_packed_value(&mut self, doc_id: DocId, packed_value: &[u8]) {
        let (lat, lon) = decode_lat_lon_ints(packed_value);
        let sort_key = haversin_sort_key(self.lat, self.lon, decode_latitude(lat), decode_longitude(lon));
        if sort_key > self.bound || !self.predicate.matches(packed_value) {
            return;
        }
        self.record(doc_id, sort_key);
    }

    fn compare(&self, min_packed_value: &[u8], max_packed_value: &[u8]) -> Relation {
        if self.predicate.relate(min_packed_value, max_packed_value) == Relation::Outside {
            return Relation::Outside;
        }
        if self.bound.is_finite() {
            let (min_lat, min_lon) = decode_lat_lon_ints(min_packed_value);
            let (max_lat, max_lon) = decode_lat_lon_ints(max_packed_value);
            let cell = Rectangle {
                min_lat: decode_latitude(min_lat),
                max_lat: decode_latitude(max_lat),
                min_lon: decode_longitude(min_lon),
                max_lon: decode_longitude(max_lon),
            };
            if min_sort_key_to_box(self.lat, self.lon, &cell) * BOUND_SLACK > self.bound {
                return Relation::Outside;
            }
        }
        Relation::Crosses
    }

    fn grow(&mut self, count: usize) {
        if self.limit.is_none() {
            self.best.reserve(count);
        }
    }
}

/// Docs of `field` matching the predicate, nearest to `(lat, lon)` first.
///
/// Each doc appears once, at the distance of its nearest matching point.
/// Equally distant docs come out by ascending doc id. With `limit`, only the
/// first `limit` hits are returned, and subtrees that cannot reach them are
/// never read.
///
/// # Examples
///
/// ```
/// use spatio_points::query::{self, BoxQuery};
/// use spatio_points::PointsBuilder;
///
/// let mut builder = PointsBuilder::new();
/// builder.add_lat_lon("location", 0, 48.8566, 2.3522).unwrap();
/// builder.add_lat_lon("location", 1, 51.5074, -0.1278).unwrap();
/// builder.add_lat_lon("location", 2, 52.5200, 13.4050).unwrap();
/// let reader = builder.build().unwrap();
///
/// let europe = BoxQuery::new(45.0, 55.0, -5.0, 15.0).unwrap();
/// let hits = query::search_by_distance(&reader, "location", &europe, 51.0, 0.0, Some(2)).unwrap();
/// let docs: Vec<u32> = hits.iter().map(|h| h.doc_id).collect();
/// assert_eq!(docs, vec![1, 0]);
/// ```
pub fn search_by_distance<R, P>(
    reader: &R,
    field: &str,
    predicate: &P,
    lat: f64,
    lon: f64,
    limit: Option<usize>,
) -> Result<Vec<NearestHit>>
where
    R: PointValues + ?Sized,
    P: ShapePredicate + ?Sized,
{
    let num_dims = reader.num_dimensions(field)?;
    let bytes_per_dim = reader.bytes_per_dimension(field)?;
    if num_dims != LAT_LON_DIMS || bytes_per_dim != BYTES_PER_DIM {
        return Err(SpatioError::invalid(format!(
            "field \"{}\" holds {} dims x {} bytes, sorting by distance needs lat/lon points",
            field, num_dims, bytes_per_dim
        )));
    }
    predicate.check_compatible(field, num_dims, bytes_per_dim)?;

    let mut sorter = DistanceSorter::new(predicate, lat, lon, limit)?;
    reader.intersect(field, &mut sorter)?;
    trace!(
        "search_by_distance({}, {}, limit={:?}) on {}: {} candidate docs, final bound {}",
        lat,
        lon,
        limit,
        field,
        sorter.best.len(),
        sorter.bound
    );
    Ok(sorter.into_hits())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::PointsBuilder;
    use crate::compute::encoding::{decode_lat_lon, encode_lat_lon};
    use crate::config::Config;
    use crate::points::PointsReader;
    use crate::query::{BoxQuery, DistanceQuery};
    use crate::random::{next_latitude, next_longitude};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    /// Multi-valued docs: doc `i` owns every point with index `i % docs`.
    fn build(points: &[(f64, f64)], docs: u32) -> PointsReader {
        let config = Config::default().with_max_points_in_leaf_node(16);
        let mut builder = PointsBuilder::new().config(config);
        for (i, &(lat, lon)) in points.iter().enumerate() {
            builder.add_lat_lon("location", i as u32 % docs, lat, lon).unwrap();
        }
        builder.build().unwrap()
    }

    fn brute_force<P: ShapePredicate>(
        points: &[(f64, f64)],
        docs: u32,
        predicate: &P,
        lat: f64,
        lon: f64,
        limit: Option<usize>,
    ) -> Vec<NearestHit> {
        let mut best: FxHashMap<DocId, f64> = FxHashMap::default();
        for (i, &(p_lat, p_lon)) in points.iter().enumerate() {
            let packed = encode_lat_lon(p_lat, p_lon).unwrap();
            if !predicate.matches(&packed) {
                continue;
            }
            let (q_lat, q_lon) = decode_lat_lon(&packed);
            let key = haversin_sort_key(lat, lon, q_lat, q_lon);
            let entry = best.entry(i as u32 % docs).or_insert(key);
            *entry = entry.min(key);
        }
        let mut hits: Vec<NearestHit> = best
            .into_iter()
            .map(|(doc_id, sort_key)| NearestHit { doc_id, sort_key })
            .collect();
        hits.sort();
        if let Some(limit) = limit {
            hits.truncate(limit);
        }
        hits
    }

    #[test]
    fn test_matches_brute_force() {
        let mut rng = ChaCha8Rng::seed_from_u64(31);
        let points: Vec<(f64, f64)> = (0..3000)
            .map(|_| (next_latitude(&mut rng), next_longitude(&mut rng)))
            .collect();
        let reader = build(&points, 1000);
        let world = BoxQuery::new(-90.0, 90.0, -180.0, 180.0).unwrap();
        for _ in 0..30 {
            let lat = next_latitude(&mut rng);
            let lon = next_longitude(&mut rng);
            let limit = match rng.gen_range(0..3) {
                0 => None,
                _ => Some(rng.gen_range(1..50)),
            };
            let hits = search_by_distance(&reader, "location", &world, lat, lon, limit).unwrap();
            assert_eq!(
                hits,
                brute_force(&points, 1000, &world, lat, lon, limit),
                "origin ({}, {}) limit {:?}",
                lat,
                lon,
                limit
            );
        }
    }

    #[test]
    fn test_filtered_by_distance_query() {
        let mut rng = ChaCha8Rng::seed_from_u64(32);
        let points: Vec<(f64, f64)> = (0..2000)
            .map(|_| (rng.gen_range(30.0..50.0), rng.gen_range(-20.0..20.0)))
            .collect();
        let reader = build(&points, 700);
        let circle = DistanceQuery::new(40.0, 0.0, 800_000.0).unwrap();
        for limit in [None, Some(1), Some(10), Some(5000)] {
            let hits = search_by_distance(&reader, "location", &circle, 45.0, 5.0, limit).unwrap();
            assert_eq!(hits, brute_force(&points, 700, &circle, 45.0, 5.0, limit));
        }
        let all = search_by_distance(&reader, "location", &circle, 45.0, 5.0, None).unwrap();
        let mut docs: Vec<DocId> = all.iter().map(|h| h.doc_id).collect();
        docs.sort_unstable();
        assert_eq!(docs, crate::query::search(&reader, "location", &circle).unwrap());
    }

    #[test]
    fn test_nearest_value_of_multi_valued_doc() {
        let mut builder = PointsBuilder::new();
        builder.add_lat_lon("location", 0, 10.0, 10.0).unwrap();
        builder.add_lat_lon("location", 0, 0.5, 0.0).unwrap();
        builder.add_lat_lon("location", 1, 1.0, 0.0).unwrap();
        builder.add_lat_lon("location", 2, 1.0, 0.0).unwrap();
        let reader = builder.build().unwrap();

        let world = BoxQuery::new(-90.0, 90.0, -180.0, 180.0).unwrap();
        let hits = search_by_distance(&reader, "location", &world, 0.0, 0.0, None).unwrap();
        let docs: Vec<DocId> = hits.iter().map(|h| h.doc_id).collect();
        assert_eq!(docs, vec![0, 1, 2]);
        assert!((hits[0].distance_meters() - 55_597.0).abs() < 10.0);
        assert_eq!(hits[1].sort_key, hits[2].sort_key);

        // only the far value of doc 0 lies in the box
        let north = BoxQuery::new(5.0, 15.0, 5.0, 15.0).unwrap();
        let hits = search_by_distance(&reader, "location", &north, 0.0, 0.0, Some(3)).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].distance_meters() > 1_000_000.0);
    }

    #[test]
    fn test_invalid_arguments() {
        let mut builder = PointsBuilder::new();
        builder.add_lat_lon("location", 0, 0.0, 0.0).unwrap();
        builder.add_packed("value", 0, &[0, 0, 0, 1]).unwrap();
        let reader = builder.build().unwrap();
        let world = BoxQuery::new(-90.0, 90.0, -180.0, 180.0).unwrap();

        let err = search_by_distance(&reader, "location", &world, 0.0, 0.0, Some(0)).unwrap_err();
        assert!(err.to_string().contains("limit must be at least 1"));
        assert!(search_by_distance(&reader, "location", &world, 91.0, 0.0, None).is_err());
        let err = search_by_distance(&reader, "value", &world, 0.0, 0.0, None).unwrap_err();
        assert!(matches!(err, SpatioError::InvalidArgument(_)));
        assert!(search_by_distance(&reader, "nope", &world, 0.0, 0.0, None).is_err());
    }
}
