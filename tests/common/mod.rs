use geo::Point;
use mapcluster::Annotation;

/// Route worker logs through the test harness; run with `RUST_LOG=debug` to
/// see recompute and superseding activity.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Test annotation whose identity is its id; the coordinate never
/// participates in equality or hashing.
#[derive(Clone, Debug)]
pub struct Pin {
    pub id: u32,
    pub lon: f64,
    pub lat: f64,
}

impl PartialEq for Pin {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Pin {}

impl std::hash::Hash for Pin {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Annotation for Pin {
    fn coordinate(&self) -> Point {
        Point::new(self.lon, self.lat)
    }
}

pub fn pin(id: u32, lon: f64, lat: f64) -> Pin {
    Pin { id, lon, lat }
}

/// A 10×10 lattice of pins filling a 300×300 region: four per 60-unit cell.
pub fn lattice_100() -> Vec<Pin> {
    (0..100)
        .map(|i| {
            pin(
                i,
                (i % 10) as f64 * 30.0 + 15.0,
                (i / 10) as f64 * 30.0 + 15.0,
            )
        })
        .collect()
}
