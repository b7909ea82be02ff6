use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use spatio_points::random::{
    create_regular_polygon, next_latitude, next_latitude_near, next_longitude,
    next_longitude_near,
};
use spatio_points::{
    BoxQuery, Config, DistanceQuery, NearestSegment, PointsBuilder, PointsReader, PolygonQuery,
    nearest, query,
};

fn build_reader(count: u32, rng: &mut ChaCha8Rng) -> PointsReader {
    let mut builder = PointsBuilder::new();
    for doc in 0..count {
        let lat = next_latitude_near(rng, 40.0);
        let lon = next_longitude_near(rng, -74.0);
        builder.add_lat_lon("location", doc, lat, lon).unwrap();
    }
    builder.build().unwrap()
}

fn benchmark_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");

    for count in [1_000u32, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::new("lat_lon", count), &count, |b, &count| {
            let mut rng = ChaCha8Rng::seed_from_u64(1);
            let points: Vec<(f64, f64)> = (0..count)
                .map(|_| (next_latitude(&mut rng), next_longitude(&mut rng)))
                .collect();
            b.iter(|| {
                let mut builder = PointsBuilder::new();
                for (doc, &(lat, lon)) in points.iter().enumerate() {
                    builder.add_lat_lon("location", doc as u32, lat, lon).unwrap();
                }
                black_box(builder.build().unwrap())
            })
        });
    }

    group.finish();
}

fn benchmark_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("queries");
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let reader = build_reader(100_000, &mut rng);

    let box_query = BoxQuery::new(39.5, 40.5, -74.5, -73.5).unwrap();
    group.bench_function("box", |b| {
        b.iter(|| query::search(&reader, "location", black_box(&box_query)).unwrap())
    });

    let distance_query = DistanceQuery::new(40.0, -74.0, 50_000.0).unwrap();
    group.bench_function("distance_50km", |b| {
        b.iter(|| query::search(&reader, "location", black_box(&distance_query)).unwrap())
    });

    for gons in [4usize, 64, 1_000] {
        let polygon = create_regular_polygon(40.0, -74.0, 50_000.0, gons).unwrap();
        let polygon_query = PolygonQuery::new(vec![polygon]).unwrap();
        group.bench_with_input(
            BenchmarkId::new("polygon", gons),
            &polygon_query,
            |b, polygon_query| {
                b.iter(|| query::search(&reader, "location", black_box(polygon_query)).unwrap())
            },
        );
    }

    group.finish();
}

fn benchmark_nearest(c: &mut Criterion) {
    let mut group = c.benchmark_group("nearest");
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let reader = build_reader(100_000, &mut rng);
    let tree = reader.tree("location").unwrap();
    let segments = [NearestSegment::new(tree)];
    let config = Config::default().nearest;

    for n in [1usize, 10, 100] {
        group.bench_with_input(BenchmarkId::new("top_n", n), &n, |b, &n| {
            b.iter(|| nearest(black_box(40.0), black_box(-74.0), &segments, n, &config).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_build, benchmark_queries, benchmark_nearest);
criterion_main!(benches);
