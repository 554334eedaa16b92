use tilescan::{
    BoundingBox, MemoryBackend, Metric, Point, ProximityQuery, SpatialConfig, SpatialError,
    SpatialIndex,
};

const CITIES: &[(&str, f64, f64)] = &[
    ("berlin", 52.5200, 13.4050),
    ("potsdam", 52.3906, 13.0645),
    ("hamburg", 53.5511, 9.9937),
    ("bremen", 53.0793, 8.8017),
    ("hanover", 52.3759, 9.7320),
    ("leipzig", 51.3397, 12.3731),
    ("dresden", 51.0504, 13.7373),
    ("cologne", 50.9375, 6.9603),
    ("dusseldorf", 51.2277, 6.7735),
    ("frankfurt", 50.1109, 8.6821),
    ("stuttgart", 48.7758, 9.1829),
    ("nuremberg", 49.4521, 11.0767),
    ("munich", 48.1351, 11.5820),
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🚀 tilescan Proximity Demo");

    // Every indexed point must fall inside this region
    let germany = BoundingBox::new(46.988, 4.997, 55.022, 15.148);
    let config = match std::env::args().nth(1) {
        Some(path) => SpatialConfig::load(path)?,
        None => SpatialConfig::new(germany, 150_000.0).with_metric(Metric::Equirectangular),
    };
    println!(
        "Region {} with max radius {:.0} and {} tiles per axis",
        config.region, config.max_radius, config.tile_overlap_factor
    );

    let index = SpatialIndex::new(config, MemoryBackend::new())?;

    println!("\n🌍 Indexing cities:");
    for &(name, lat, lon) in CITIES {
        let keys = index.index(name, Point::new(lat, lon))?;
        println!(
            "  {:<12} {} keys",
            name,
            keys.north_south.len() + keys.east_west.len()
        );
    }

    println!("\n🎯 Nearest to Potsdam:");
    let potsdam = Point::new(52.3906, 13.0645);
    let outcome = index.query(&ProximityQuery::new(potsdam, 3).excluding("potsdam"))?;
    for result in &outcome.results {
        println!(
            "  {:<12} {:>7.1} km (great circle {:>7.1} km)",
            result.id.to_string(),
            result.distance / 1000.0,
            potsdam.distance_to(&result.point) / 1000.0
        );
    }
    println!("  complete within {:.1} km", outcome.radius / 1000.0);

    println!("\n📏 Bounded search around Frankfurt (200 km):");
    let frankfurt = Point::new(50.1109, 8.6821);
    let nearby = index.query(
        &ProximityQuery::new(frankfurt, 10)
            .within(200_000.0)
            .excluding("frankfurt"),
    )?;
    println!(
        "  {} cities, verified: {:?}",
        nearby.len(),
        nearby.verified().map(|r| r.id.to_string()).collect::<Vec<_>>()
    );

    println!("\n🚫 Outside the region:");
    match index.nearest(Point::new(48.8566, 2.3522), 1) {
        Err(err @ SpatialError::OutOfRegion { .. }) => println!("  Paris rejected: {}", err),
        other => println!("  unexpected: {:?}", other.map(|o| o.ids())),
    }

    println!("\n🗑️  Deindexing Berlin:");
    index.deindex(&"berlin".into())?;
    let outcome = index.query(&ProximityQuery::new(potsdam, 1).excluding("potsdam"))?;
    println!("  nearest to Potsdam is now {:?}", outcome.ids());

    let stats = index.port().stats()?;
    println!("\n📈 Storage Statistics:");
    println!("  Entities: {}", stats.entity_count);
    println!("  Keys: {}", stats.key_count);
    println!("  Scans served: {}", stats.scan_count);
    println!("  Entries read: {}", stats.entries_read);

    println!("\n✅ Demo completed successfully!");
    Ok(())
}
