//! The pure clustering pipeline: partition → reduce → diff.
//!
//! Everything here is a function of its inputs; the controller owns all
//! shared state and calls [`recompute`] from its worker thread with an
//! immutable copy of the working set.

pub mod diff;
pub mod grid;

use geo::Point;
use rustc_hash::FxHashSet;

use crate::config::Config;
use crate::projection::Projection;
use crate::reduce::ClusterReducer;
use crate::types::{Annotation, Cluster, ClusterKey, Snapshot, identity_hash};
use diff::ClusterDiff;

/// Deterministic total order over members: coordinate first (by bit
/// pattern, so NaN-free inputs order totally), identity hash as the
/// tie-break for co-located annotations. Reducers see members in this order,
/// which makes every strategy order-independent for a given member set.
fn sort_members<A: Annotation>(members: &mut [A]) {
    members.sort_by(|a, b| {
        let (ca, cb) = (a.coordinate(), b.coordinate());
        ca.x()
            .total_cmp(&cb.x())
            .then_with(|| ca.y().total_cmp(&cb.y()))
            .then_with(|| identity_hash(a).cmp(&identity_hash(b)))
    });
}

fn unique_location_count<A: Annotation>(members: &[A]) -> usize {
    let mut locations: FxHashSet<(u64, u64)> = FxHashSet::default();
    for member in members {
        let c = member.coordinate();
        locations.insert((c.x().to_bits(), c.y().to_bits()));
    }
    locations.len()
}

/// Distinct identities can collide in `FxHasher`; a duplicate key would merge
/// two markers and break key ordering within the snapshot, so probe to the
/// next free value. Emission order is deterministic, so the probed keys are
/// too.
fn singleton<A: Annotation>(annotation: &A, used_keys: &mut FxHashSet<u64>) -> Cluster<A> {
    let mut key = identity_hash(annotation);
    while !used_keys.insert(key) {
        key = key.wrapping_add(1);
    }
    Cluster::new(
        ClusterKey::Singleton(key),
        annotation.coordinate(),
        vec![annotation.clone()],
    )
}

/// Runs one full clustering cycle and diffs the result against `previous`.
///
/// The working-set copy, viewport, and zoom are read once up front; the
/// returned snapshot reflects exactly that triple. A degenerate viewport
/// yields an empty snapshot rather than an error, and with clustering
/// disabled (zoom above the configured maximum, or non-positive cell size)
/// every in-region annotation becomes a singleton cluster.
pub(crate) fn recompute<A: Annotation>(
    previous: &Snapshot<A>,
    annotations: &[A],
    projection: &dyn Projection,
    config: &Config,
    reducer: &dyn ClusterReducer,
    generation: u64,
) -> (Snapshot<A>, ClusterDiff<A>) {
    let zoom = projection.zoom_level();
    let scale_factor = projection.scale_factor(zoom);
    let visible = projection.visible_region();

    if visible.width() <= 0.0
        || visible.height() <= 0.0
        || !scale_factor.is_finite()
        || scale_factor <= 0.0
    {
        let snapshot = Snapshot::empty(generation);
        let changes = diff::diff(previous, snapshot.clusters(), config.reuse_policy);
        return (snapshot, changes);
    }

    let padded = grid::padded_region(visible, config.margin_factor);
    let mut candidates: Vec<Cluster<A>> = Vec::new();
    let mut singleton_keys: FxHashSet<u64> = FxHashSet::default();

    if config.clustering_enabled_at(zoom) {
        let cells = grid::partition(
            annotations,
            projection,
            visible,
            config.margin_factor,
            config.cell_size_points,
            scale_factor,
        );

        // Process cells in index order so candidate order (and thus the
        // diff) never depends on hash iteration.
        let mut cells: Vec<_> = cells.into_iter().collect();
        cells.sort_by_key(|(index, _)| *index);

        let min_unique = config.min_unique_locations_for_clustering;
        for (index, members) in cells {
            let mut members: Vec<A> = members.into_vec();
            sort_members(&mut members);

            if min_unique > 0 && unique_location_count(&members) < min_unique {
                candidates.extend(members.iter().map(|a| singleton(a, &mut singleton_keys)));
                continue;
            }

            let coordinates: Vec<Point> = members.iter().map(A::coordinate).collect();
            let representative = reducer.reduce(&coordinates);
            candidates.push(Cluster::new(ClusterKey::Cell(index), representative, members));
        }
    } else {
        // Clustering disabled: every in-region annotation is its own
        // cluster, still filtered against the padded region.
        let mut in_region: Vec<A> = annotations
            .iter()
            .filter(|a| {
                let p = projection.project(a.coordinate());
                p.x().is_finite()
                    && p.y().is_finite()
                    && p.x() >= padded.min().x
                    && p.x() <= padded.max().x
                    && p.y() >= padded.min().y
                    && p.y() <= padded.max().y
            })
            .cloned()
            .collect();
        sort_members(&mut in_region);
        candidates.extend(in_region.iter().map(|a| singleton(a, &mut singleton_keys)));
    }

    candidates.sort_by_key(Cluster::key);
    let changes = diff::diff(previous, &candidates, config.reuse_policy);
    let snapshot = Snapshot::new(candidates, padded, zoom, generation);
    (snapshot, changes)
}
