//! Shared fixtures for unit tests.

use geo::Point;

use crate::types::Annotation;

/// A minimal annotation whose identity is its id, not its location.
#[derive(Clone, Debug)]
pub(crate) struct Pin {
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

pub(crate) fn pin(id: u32, lon: f64, lat: f64) -> Pin {
    Pin { id, lon, lat }
}
