use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use spatio_points::compute::distance::{haversin_meters, haversin_sort_key};
use spatio_points::compute::encoding::{decode_lat_lon, encode_lat_lon, int_to_sortable_bytes};
use spatio_points::random::{
    next_latitude, next_latitude_near, next_longitude, next_longitude_near, next_polygon,
    next_polygon_near,
};
use spatio_points::{
    BoxQuery, Config, DistanceQuery, DocId, NearestSegment, Polygon, PolygonQuery, PointValues,
    PointsBuilder, PointsReader, RangeQuery, nearest, query,
};

fn five_points() -> PointsReader {
    let mut builder = PointsBuilder::new();
    let points = [
        (0.0, 0.0),
        (10.0, 10.0),
        (-10.0, -10.0),
        (45.0, 45.0),
        (-45.0, -45.0),
    ];
    for (doc, &(lat, lon)) in points.iter().enumerate() {
        builder
            .add_lat_lon("location", doc as DocId, lat, lon)
            .unwrap();
    }
    builder.build().unwrap()
}

fn random_reader(rng: &mut ChaCha8Rng, count: u32, leaf_size: usize) -> (PointsReader, Vec<(f64, f64)>) {
    let config = Config::default().with_max_points_in_leaf_node(leaf_size);
    let mut builder = PointsBuilder::new().config(config);
    let mut points = Vec::with_capacity(count as usize);
    for doc in 0..count {
        let lat = next_latitude(rng);
        let lon = next_longitude(rng);
        builder.add_lat_lon("location", doc, lat, lon).unwrap();
        points.push(decode_lat_lon(&encode_lat_lon(lat, lon).unwrap()));
    }
    (builder.build().unwrap(), points)
}

#[test]
fn test_box_query() {
    let reader = five_points();
    let query = BoxQuery::new(-15.0, 15.0, -15.0, 15.0).unwrap();
    assert_eq!(
        query::search(&reader, "location", &query).unwrap(),
        vec![0, 1, 2]
    );

    let nothing = BoxQuery::new(60.0, 70.0, 60.0, 70.0).unwrap();
    assert!(query::search(&reader, "location", &nothing).unwrap().is_empty());
}

#[test]
fn test_polygon_query() {
    let reader = five_points();
    let square = Polygon::new(
        vec![-1.0, -1.0, 11.0, 11.0, -1.0],
        vec![-1.0, 11.0, 11.0, -1.0, -1.0],
    )
    .unwrap();
    let query = PolygonQuery::new(vec![square]).unwrap();
    assert_eq!(query::search(&reader, "location", &query).unwrap(), vec![0, 1]);
}

#[test]
fn test_polygon_with_hole() {
    let reader = five_points();
    let hole = Polygon::new(
        vec![-1.0, -1.0, 1.0, 1.0, -1.0],
        vec![-1.0, 1.0, 1.0, -1.0, -1.0],
    )
    .unwrap();
    let outer = Polygon::with_holes(
        vec![-20.0, -20.0, 20.0, 20.0, -20.0],
        vec![-20.0, 20.0, 20.0, -20.0, -20.0],
        vec![hole],
    )
    .unwrap();
    let query = PolygonQuery::new(vec![outer]).unwrap();
    assert_eq!(query::search(&reader, "location", &query).unwrap(), vec![1, 2]);
}

#[test]
fn test_distance_query_basics() {
    let mut builder = PointsBuilder::new();
    builder.add_lat_lon("location", 0, 18.313694, -65.227444).unwrap();
    builder.add_lat_lon("location", 1, 19.0, -65.0).unwrap();
    let reader = builder.build().unwrap();

    let query = DistanceQuery::new(18.0, -65.0, 50_000.0).unwrap();
    assert_eq!(query::search(&reader, "location", &query).unwrap(), vec![0]);
}

#[test]
fn test_distance_query_rejects_bad_radius() {
    let err = DistanceQuery::new(18.0, 19.0, -1.0).unwrap_err();
    assert!(err.to_string().contains("radiusMeters"));
    assert!(err.to_string().contains("is invalid"));
}

#[test]
fn test_box_query_brute_force() {
    let mut rng = ChaCha8Rng::seed_from_u64(100);
    let (reader, points) = random_reader(&mut rng, 5_000, 64);
    for _ in 0..50 {
        let rect = spatio_points::random::next_box(&mut rng);
        let query = BoxQuery::from_rectangle(rect).unwrap();
        let expected: Vec<DocId> = points
            .iter()
            .enumerate()
            .filter(|&(_, &(lat, lon))| rect.contains(lat, lon))
            .map(|(doc, _)| doc as DocId)
            .collect();
        assert_eq!(
            query::search(&reader, "location", &query).unwrap(),
            expected,
            "{}",
            rect
        );
    }
}

#[test]
fn test_polygon_query_brute_force() {
    let mut rng = ChaCha8Rng::seed_from_u64(101);
    let (reader, points) = random_reader(&mut rng, 5_000, 64);
    for i in 0..30 {
        let polygon = if i % 2 == 0 {
            next_polygon(&mut rng)
        } else {
            let (lat, lon) = points[rng.gen_range(0..points.len())];
            next_polygon_near(&mut rng, lat, lon)
        };
        let query = PolygonQuery::new(vec![polygon.clone()]).unwrap();
        let expected: Vec<DocId> = points
            .iter()
            .enumerate()
            .filter(|&(_, &(lat, lon))| polygon.contains(lat, lon))
            .map(|(doc, _)| doc as DocId)
            .collect();
        assert_eq!(query::search(&reader, "location", &query).unwrap(), expected);
    }
}

#[test]
fn test_distance_query_brute_force() {
    let mut rng = ChaCha8Rng::seed_from_u64(102);
    let (reader, points) = random_reader(&mut rng, 5_000, 64);
    for _ in 0..50 {
        let lat = next_latitude(&mut rng);
        let lon = next_longitude(&mut rng);
        let radius = rng.gen_range(1_000.0..5_000_000.0);
        let query = DistanceQuery::new(lat, lon, radius).unwrap();
        let expected: Vec<DocId> = points
            .iter()
            .enumerate()
            .filter(|&(_, &(p_lat, p_lon))| haversin_meters(lat, lon, p_lat, p_lon) <= radius)
            .map(|(doc, _)| doc as DocId)
            .collect();
        assert_eq!(query::search(&reader, "location", &query).unwrap(), expected);
    }
}

#[test]
fn test_polar_cap_on_dateline() {
    let mut builder = PointsBuilder::new();
    builder.add_lat_lon("location", 0, 85.0, 180.0).unwrap();
    builder.add_lat_lon("location", 1, 89.0, 0.0).unwrap();
    builder.add_lat_lon("location", 2, 82.0, 90.0).unwrap();
    builder.add_lat_lon("location", 3, 60.0, 180.0).unwrap();
    let reader = builder.build().unwrap();

    for lon in [180.0, -180.0] {
        let query = DistanceQuery::new(80.0, lon, 2_000_000.0).unwrap();
        assert_eq!(query::search(&reader, "location", &query).unwrap(), vec![0, 1, 2]);
    }
}

#[test]
fn test_distance_query_brute_force_at_poles_and_dateline() {
    let mut rng = ChaCha8Rng::seed_from_u64(103);
    let (reader, points) = random_reader(&mut rng, 5_000, 64);
    for i in 0..60 {
        let lat = match i % 3 {
            0 => 90.0 - rng.gen_range(0.0..10.0),
            1 => -90.0 + rng.gen_range(0.0..10.0),
            _ => next_latitude(&mut rng),
        };
        let lon = if i % 2 == 0 { 180.0 } else { -180.0 };
        let radius = rng.gen_range(1_000.0..25_000_000.0);
        let query = DistanceQuery::new(lat, lon, radius).unwrap();
        let expected: Vec<DocId> = points
            .iter()
            .enumerate()
            .filter(|&(_, &(p_lat, p_lon))| haversin_meters(lat, lon, p_lat, p_lon) <= radius)
            .map(|(doc, _)| doc as DocId)
            .collect();
        assert_eq!(
            query::search(&reader, "location", &query).unwrap(),
            expected,
            "center ({}, {}) radius {}",
            lat,
            lon,
            radius
        );
    }
}

#[test]
fn test_search_by_distance_inside_polygon() {
    let mut rng = ChaCha8Rng::seed_from_u64(104);
    let (reader, points) = random_reader(&mut rng, 5_000, 64);
    let square = Polygon::new(
        vec![-30.0, -30.0, 30.0, 30.0, -30.0],
        vec![-60.0, 60.0, 60.0, -60.0, -60.0],
    )
    .unwrap();
    let query = PolygonQuery::new(vec![square.clone()]).unwrap();

    let hits = query::search_by_distance(&reader, "location", &query, 10.0, 20.0, Some(25)).unwrap();
    let mut expected: Vec<(f64, DocId)> = points
        .iter()
        .enumerate()
        .filter(|&(_, &(lat, lon))| square.contains(lat, lon))
        .map(|(doc, &(lat, lon))| (haversin_sort_key(10.0, 20.0, lat, lon), doc as DocId))
        .collect();
    expected.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    expected.truncate(25);

    let docs: Vec<DocId> = hits.iter().map(|h| h.doc_id).collect();
    let expected_docs: Vec<DocId> = expected.iter().map(|&(_, doc)| doc).collect();
    assert_eq!(docs, expected_docs);
    assert!(hits.windows(2).all(|w| w[0].sort_key <= w[1].sort_key));
}

#[test]
fn test_range_query_on_builder_field() {
    let mut builder = PointsBuilder::new();
    let mut packed = [0u8; 8];
    for doc in 0..1_000u32 {
        let x = doc as i32 - 500;
        let y = (doc as i32 * 7) % 100;
        int_to_sortable_bytes(x, &mut packed, 0);
        int_to_sortable_bytes(y, &mut packed, 4);
        builder.add_point("xy", doc, 2, &packed).unwrap();
    }
    let reader = builder.build().unwrap();
    assert_eq!(reader.num_dimensions("xy").unwrap(), 2);

    let query = RangeQuery::ints(&[-10, 0], &[10, 49]).unwrap();
    let expected: Vec<DocId> = (0..1_000u32)
        .filter(|&doc| {
            let x = doc as i32 - 500;
            let y = (doc as i32 * 7) % 100;
            (-10..=10).contains(&x) && y < 50
        })
        .collect();
    assert_eq!(query::search(&reader, "xy", &query).unwrap(), expected);

    let one_dim = RangeQuery::ints(&[0], &[1]).unwrap();
    assert!(query::search(&reader, "xy", &one_dim).is_err());
}

#[test]
fn test_nearest_across_segments() {
    let mut rng = ChaCha8Rng::seed_from_u64(103);
    let center_lat = next_latitude(&mut rng);
    let center_lon = next_longitude(&mut rng);

    let mut readers = Vec::new();
    let mut all_points = Vec::new();
    let mut doc_base = 0u32;
    for _ in 0..3 {
        let config = Config::default().with_max_points_in_leaf_node(32);
        let mut builder = PointsBuilder::new().config(config);
        let count = rng.gen_range(100..1_000u32);
        for doc in 0..count {
            let lat = next_latitude_near(&mut rng, center_lat);
            let lon = next_longitude_near(&mut rng, center_lon);
            builder.add_lat_lon("location", doc, lat, lon).unwrap();
            let (q_lat, q_lon) = decode_lat_lon(&encode_lat_lon(lat, lon).unwrap());
            all_points.push((doc_base + doc, q_lat, q_lon));
        }
        readers.push((builder.build().unwrap(), doc_base));
        doc_base += count;
    }

    let segments: Vec<NearestSegment> = readers
        .iter()
        .map(|(reader, base)| {
            NearestSegment::new(reader.tree("location").unwrap()).with_doc_base(*base)
        })
        .collect();

    let n = 25;
    let hits = nearest(center_lat, center_lon, &segments, n, &Config::default().nearest).unwrap();

    let mut expected: Vec<(f64, DocId)> = all_points
        .iter()
        .map(|&(doc, lat, lon)| (haversin_meters(center_lat, center_lon, lat, lon), doc))
        .collect();
    expected.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    expected.truncate(n);

    let actual: Vec<DocId> = hits.iter().map(|hit| hit.doc_id).collect();
    let wanted: Vec<DocId> = expected.iter().map(|&(_, doc)| doc).collect();
    assert_eq!(actual, wanted);
    for (hit, (meters, _)) in hits.iter().zip(&expected) {
        assert!((hit.distance_meters() - meters).abs() < 1e-3);
    }
}

#[test]
fn test_concurrent_queries() {
    let mut rng = ChaCha8Rng::seed_from_u64(104);
    let (reader, points) = random_reader(&mut rng, 10_000, 128);
    let boxes: Vec<_> = (0..8)
        .map(|_| spatio_points::random::next_box(&mut rng))
        .collect();

    std::thread::scope(|scope| {
        for rect in &boxes {
            let reader = &reader;
            let points = &points;
            scope.spawn(move || {
                let query = BoxQuery::from_rectangle(*rect).unwrap();
                let expected = points
                    .iter()
                    .filter(|&&(lat, lon)| rect.contains(lat, lon))
                    .count();
                for _ in 0..5 {
                    assert_eq!(query::count(reader, "location", &query).unwrap(), expected);
                }
            });
        }
    });
}
