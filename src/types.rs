//! Core data model: annotations, cells, clusters, and snapshots.
//!
//! Annotations are externally owned; the engine only groups references to
//! them. Clusters and snapshots are derived values, recomputed from the
//! working set whenever the viewport, zoom, or point set changes.

use geo::{Point, Rect};
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A point annotation owned by the caller.
///
/// Identity is whatever the implementor's `Eq`/`Hash` say it is — typically a
/// stable id, never the coordinate. The engine never mutates annotations and
/// never compares coordinates to decide identity, so two annotations at the
/// same location remain distinct and moving an annotation does not change
/// which annotation it is.
///
/// # Examples
///
/// ```rust
/// use geo::Point;
/// use mapcluster::Annotation;
///
/// #[derive(Clone, Debug)]
/// struct Pin {
///     id: u64,
///     lon: f64,
///     lat: f64,
/// }
///
/// impl PartialEq for Pin {
///     fn eq(&self, other: &Self) -> bool {
///         self.id == other.id
///     }
/// }
/// impl Eq for Pin {}
///
/// impl std::hash::Hash for Pin {
///     fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
///         self.id.hash(state);
///     }
/// }
///
/// impl Annotation for Pin {
///     fn coordinate(&self) -> Point {
///         Point::new(self.lon, self.lat)
///     }
/// }
/// ```
pub trait Annotation: Clone + Eq + Hash + Send + Sync + 'static {
    /// Geographic coordinate of the annotation (lon/lat).
    fn coordinate(&self) -> Point;
}

/// Integer grid cell indices in projected space.
///
/// Derived as `floor(projected / cell_size)` per axis. Two points share a
/// cell iff their indices match. Indices are global (anchored at the
/// projected origin), so panning the viewport does not renumber cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellIndex {
    pub row: i64,
    pub col: i64,
}

impl CellIndex {
    pub fn new(row: i64, col: i64) -> Self {
        Self { row, col }
    }
}

/// Stable synthetic key for a cluster.
///
/// Clustered cells are keyed by their grid indices; singleton clusters are
/// keyed by a hash of the member's identity so a singleton keeps the same key
/// while it stays a singleton, regardless of which cell it falls in. Hash
/// collisions between distinct identities are disambiguated per snapshot, so
/// keys are always unique within one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClusterKey {
    Cell(CellIndex),
    Singleton(u64),
}

/// Hash of an annotation's caller-defined identity, used for singleton keys
/// and deterministic member ordering. `FxHasher` is seed-free, so the value
/// is stable across runs for a given `Hash` implementation.
pub(crate) fn identity_hash<A: Annotation>(annotation: &A) -> u64 {
    let mut hasher = FxHasher::default();
    annotation.hash(&mut hasher);
    hasher.finish()
}

/// A derived grouping of one or more annotations sharing a grid cell.
///
/// Members are unique and non-empty; the representative coordinate comes from
/// the configured [`ClusterReducer`](crate::reduce::ClusterReducer). A
/// cluster with exactly one member is a singleton and exposes that member
/// directly via [`Cluster::single_member`], so callers can treat it like an
/// unclustered point.
#[derive(Debug, Clone)]
pub struct Cluster<A: Annotation> {
    key: ClusterKey,
    coordinate: Point,
    members: Vec<A>,
}

impl<A: Annotation> Cluster<A> {
    /// Invariant: `members` is non-empty, unique, and deterministically
    /// ordered by the pipeline.
    pub(crate) fn new(key: ClusterKey, coordinate: Point, members: Vec<A>) -> Self {
        debug_assert!(!members.is_empty(), "cluster must have at least one member");
        Self {
            key,
            coordinate,
            members,
        }
    }

    /// Stable key identifying this cluster within a snapshot.
    pub fn key(&self) -> ClusterKey {
        self.key
    }

    /// Representative coordinate chosen by the reducer strategy.
    pub fn coordinate(&self) -> Point {
        self.coordinate
    }

    /// Member annotations, in deterministic order.
    pub fn members(&self) -> &[A] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether this cluster stands for a single annotation.
    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }

    /// The sole member, if this is a singleton cluster.
    pub fn single_member(&self) -> Option<&A> {
        if self.members.len() == 1 {
            self.members.first()
        } else {
            None
        }
    }

    pub fn contains(&self, annotation: &A) -> bool {
        self.members.iter().any(|m| m == annotation)
    }

    /// Geographic rectangle bounding all member coordinates.
    ///
    /// Useful for driving a zoom-to-cluster action after selecting a cluster
    /// marker.
    pub fn bounding_region(&self) -> Rect {
        let first = self.members[0].coordinate();
        let (mut min_x, mut min_y) = (first.x(), first.y());
        let (mut max_x, mut max_y) = (first.x(), first.y());
        for member in &self.members[1..] {
            let c = member.coordinate();
            min_x = min_x.min(c.x());
            min_y = min_y.min(c.y());
            max_x = max_x.max(c.x());
            max_y = max_y.max(c.y());
        }
        Rect::new((min_x, min_y), (max_x, max_y))
    }
}

/// The complete, immutable cluster set for one computed
/// (region, zoom, point-set) triple.
///
/// The controller holds exactly one current snapshot and replaces it
/// atomically on each applied recompute; a snapshot is never mutated after
/// construction.
#[derive(Debug, Clone)]
pub struct Snapshot<A: Annotation> {
    clusters: Vec<Cluster<A>>,
    region: Rect,
    zoom: f64,
    generation: u64,
}

impl<A: Annotation> Snapshot<A> {
    /// Invariant: `clusters` is sorted by key and member sets are disjoint.
    pub(crate) fn new(clusters: Vec<Cluster<A>>, region: Rect, zoom: f64, generation: u64) -> Self {
        debug_assert!(clusters.windows(2).all(|w| w[0].key() < w[1].key()));
        Self {
            clusters,
            region,
            zoom,
            generation,
        }
    }

    /// Snapshot with no clusters, used before the first recompute and for
    /// degenerate viewports.
    pub(crate) fn empty(generation: u64) -> Self {
        Self {
            clusters: Vec::new(),
            region: Rect::new((0.0, 0.0), (0.0, 0.0)),
            zoom: 0.0,
            generation,
        }
    }

    /// Clusters in deterministic (key) order.
    pub fn clusters(&self) -> &[Cluster<A>] {
        &self.clusters
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Padded projected region this snapshot was computed for.
    pub fn region(&self) -> Rect {
        self.region
    }

    /// Zoom level this snapshot was computed at.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Logical timestamp of the working set this snapshot reflects.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Finds the cluster containing the given annotation, by scanning
    /// membership. Identity is the annotation's own `Eq`.
    pub fn find(&self, annotation: &A) -> Option<&Cluster<A>> {
        self.clusters.iter().find(|c| c.contains(annotation))
    }

    /// Total number of annotations across all clusters.
    pub fn annotation_count(&self) -> usize {
        self.clusters.iter().map(Cluster::len).sum()
    }
}

/// Counters describing controller activity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterStats {
    /// Number of recomputes whose result was applied.
    pub recompute_count: u64,
    /// Number of in-flight recomputes discarded because a newer request
    /// superseded them.
    pub superseded_count: u64,
    /// Clusters in the current snapshot.
    pub cluster_count: usize,
    /// Size of the working annotation set.
    pub annotation_count: usize,
}
