//! Pluggable reducer strategies: one populated cell in, one representative
//! coordinate out.
//!
//! The pipeline hands every reducer the member coordinates in a
//! deterministic order, so all strategies are order-independent for a given
//! member set. Strategies are selectable by name through [`reducer`], which
//! lets a configuration file pick one without touching code.

use geo::{Distance, Haversine, Point};
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Computes the representative coordinate for the members of one cell.
///
/// Contract: `coordinates` is non-empty and deterministically ordered; the
/// result must be a pure function of the coordinate set. An empty input is a
/// partitioner contract violation, not a runtime condition.
pub trait ClusterReducer: Send + Sync {
    /// Registry name of this strategy.
    fn name(&self) -> &'static str;

    /// Representative coordinate for the given member coordinates.
    fn reduce(&self, coordinates: &[Point]) -> Point;
}

fn centroid(coordinates: &[Point]) -> Point {
    let n = coordinates.len() as f64;
    let (sum_x, sum_y) = coordinates
        .iter()
        .fold((0.0, 0.0), |(x, y), p| (x + p.x(), y + p.y()));
    Point::new(sum_x / n, sum_y / n)
}

/// Arithmetic mean of all member coordinates (the default).
#[derive(Debug, Clone, Copy, Default)]
pub struct CenterOfMass;

impl ClusterReducer for CenterOfMass {
    fn name(&self) -> &'static str {
        "center_of_mass"
    }

    fn reduce(&self, coordinates: &[Point]) -> Point {
        debug_assert!(!coordinates.is_empty(), "reducer invoked on empty cell");
        centroid(coordinates)
    }
}

/// The member coordinate closest (great-circle) to the center of mass.
///
/// Unlike [`CenterOfMass`], the representative is always an actual input
/// point, so the cluster marker sits exactly on one of its members.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestToCentroid;

impl ClusterReducer for NearestToCentroid {
    fn name(&self) -> &'static str {
        "nearest_to_centroid"
    }

    fn reduce(&self, coordinates: &[Point]) -> Point {
        debug_assert!(!coordinates.is_empty(), "reducer invoked on empty cell");
        let center = centroid(coordinates);
        // Ties resolve to the earliest coordinate in the deterministic order.
        *coordinates
            .iter()
            .min_by(|a, b| {
                Haversine
                    .distance(**a, center)
                    .total_cmp(&Haversine.distance(**b, center))
            })
            .unwrap()
    }
}

/// The first member in the deterministic order.
///
/// Cheapest of the strategies, and the representative never moves while that
/// member stays in the cell; useful when stability matters more than visual
/// centering.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstMember;

impl ClusterReducer for FirstMember {
    fn name(&self) -> &'static str {
        "first_member"
    }

    fn reduce(&self, coordinates: &[Point]) -> Point {
        debug_assert!(!coordinates.is_empty(), "reducer invoked on empty cell");
        coordinates[0]
    }
}

type ReducerCtor = fn() -> Arc<dyn ClusterReducer>;

static REGISTRY: Lazy<FxHashMap<&'static str, ReducerCtor>> = Lazy::new(|| {
    let mut registry: FxHashMap<&'static str, ReducerCtor> = FxHashMap::default();
    registry.insert("center_of_mass", || Arc::new(CenterOfMass));
    registry.insert("nearest_to_centroid", || Arc::new(NearestToCentroid));
    registry.insert("first_member", || Arc::new(FirstMember));
    registry
});

/// Look up a reducer strategy by registry name.
pub fn reducer(name: &str) -> Option<Arc<dyn ClusterReducer>> {
    REGISTRY.get(name).map(|ctor| ctor())
}
