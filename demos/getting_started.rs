use spatio_points::{
    BoxQuery, Config, DistanceQuery, NearestSegment, Polygon, PolygonQuery, PointsBuilder, nearest,
    query,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug to see tree and grid builds)
    env_logger::init();

    println!("=== spatio-points - Getting Started ===\n");

    let cities = [
        ("New York", 40.7128, -74.0060),
        ("London", 51.5074, -0.1278),
        ("Paris", 48.8566, 2.3522),
        ("Berlin", 52.5200, 13.4050),
        ("Tokyo", 35.6762, 139.6503),
        ("Sydney", -33.8688, 151.2093),
        ("Suva", -18.1416, 178.4419),
    ];

    let mut builder = PointsBuilder::new();
    for (doc, &(_, lat, lon)) in cities.iter().enumerate() {
        builder.add_lat_lon("location", doc as u32, lat, lon)?;
    }
    let reader = builder.build()?;
    println!("✓ Indexed {} cities\n", cities.len());

    let name = |doc: u32| cities[doc as usize].0;

    // === BOX ===
    println!("1. Box query (western Europe)");
    let europe = BoxQuery::new(45.0, 55.0, -5.0, 15.0)?;
    for doc in query::search(&reader, "location", &europe)? {
        println!("   - {}", name(doc));
    }
    println!();

    // === DISTANCE ===
    println!("2. Within 500 km of London");
    let near_london = DistanceQuery::new(51.5074, -0.1278, 500_000.0)?;
    for doc in query::search(&reader, "location", &near_london)? {
        println!("   - {}", name(doc));
    }
    println!();

    // === POLYGON ===
    println!("3. Polygon query (western Pacific)");
    let pacific = Polygon::new(
        vec![-40.0, -40.0, 40.0, -40.0],
        vec![130.0, 179.0, 140.0, 130.0],
    )?;
    let pacific = PolygonQuery::new(vec![pacific])?;
    for doc in query::search(&reader, "location", &pacific)? {
        println!("   - {}", name(doc));
    }
    println!();

    // === NEAREST ===
    println!("4. Three nearest cities to Brussels");
    let tree = reader.tree("location")?;
    let hits = nearest(
        50.8503,
        4.3517,
        &[NearestSegment::new(tree)],
        3,
        &Config::default().nearest,
    )?;
    for hit in hits {
        println!(
            "   - {} ({:.0} km)",
            name(hit.doc_id),
            hit.distance_meters() / 1000.0
        );
    }
    println!();

    // === DISTANCE SORT ===
    println!("5. Western Europe, nearest to Brussels first");
    for hit in query::search_by_distance(&reader, "location", &europe, 50.8503, 4.3517, None)? {
        println!(
            "   - {} ({:.0} km)",
            name(hit.doc_id),
            hit.distance_meters() / 1000.0
        );
    }

    Ok(())
}
