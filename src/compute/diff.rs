//! Cluster differ: classifies candidate clusters against the previous
//! snapshot so markers can be reused and animated instead of destroyed and
//! recreated.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::ReusePolicy;
use crate::types::{Annotation, Cluster, ClusterKey, Snapshot};

/// Result of diffing a candidate cluster set against the previous snapshot.
///
/// Every candidate is classified exactly once (added or retained), every
/// previous cluster exactly once (removed or retained). `retained` pairs the
/// previous cluster with its continuation so the rendering layer can update
/// the existing marker in place.
#[derive(Debug, Clone)]
pub struct ClusterDiff<A: Annotation> {
    pub added: Vec<Cluster<A>>,
    pub removed: Vec<Cluster<A>>,
    pub retained: Vec<(Cluster<A>, Cluster<A>)>,
}

impl<A: Annotation> ClusterDiff<A> {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.retained.is_empty()
    }
}

/// Classifies `candidates` against `previous` under the given reuse policy.
///
/// Candidates must be in deterministic (key) order; the result is then
/// identical on every call for the same inputs. Matching never reorders the
/// groups: `added` follows candidate order, `removed` follows previous
/// snapshot order.
pub fn diff<A: Annotation>(
    previous: &Snapshot<A>,
    candidates: &[Cluster<A>],
    policy: ReusePolicy,
) -> ClusterDiff<A> {
    match policy {
        ReusePolicy::Never => ClusterDiff {
            added: candidates.to_vec(),
            removed: previous.clusters().to_vec(),
            retained: Vec::new(),
        },
        ReusePolicy::CellIdentity => diff_by_key(previous, candidates),
        ReusePolicy::MemberOverlap { min_fraction } => {
            diff_by_overlap(previous, candidates, min_fraction)
        }
    }
}

fn diff_by_key<A: Annotation>(previous: &Snapshot<A>, candidates: &[Cluster<A>]) -> ClusterDiff<A> {
    let previous_by_key: FxHashMap<ClusterKey, &Cluster<A>> = previous
        .clusters()
        .iter()
        .map(|c| (c.key(), c))
        .collect();

    let mut matched: FxHashSet<ClusterKey> = FxHashSet::default();
    let mut added = Vec::new();
    let mut retained = Vec::new();

    for candidate in candidates {
        match previous_by_key.get(&candidate.key()) {
            Some(old) => {
                matched.insert(candidate.key());
                retained.push(((*old).clone(), candidate.clone()));
            }
            None => added.push(candidate.clone()),
        }
    }

    let removed = previous
        .clusters()
        .iter()
        .filter(|c| !matched.contains(&c.key()))
        .cloned()
        .collect();

    ClusterDiff {
        added,
        removed,
        retained,
    }
}

fn diff_by_overlap<A: Annotation>(
    previous: &Snapshot<A>,
    candidates: &[Cluster<A>],
    min_fraction: f64,
) -> ClusterDiff<A> {
    let previous_clusters = previous.clusters();
    let mut claimed = vec![false; previous_clusters.len()];

    let index_by_key: FxHashMap<ClusterKey, usize> = previous_clusters
        .iter()
        .enumerate()
        .map(|(i, c)| (c.key(), i))
        .collect();
    let mut index_by_member: FxHashMap<&A, usize> = FxHashMap::default();
    for (i, cluster) in previous_clusters.iter().enumerate() {
        for member in cluster.members() {
            index_by_member.insert(member, i);
        }
    }

    let mut added = Vec::new();
    let mut retained = Vec::new();

    for candidate in candidates {
        // Key equality is always a sufficient match.
        if let Some(&i) = index_by_key.get(&candidate.key())
            && !claimed[i]
        {
            claimed[i] = true;
            retained.push((previous_clusters[i].clone(), candidate.clone()));
            continue;
        }

        // Otherwise look for the previous cluster sharing the most members.
        let mut votes: FxHashMap<usize, usize> = FxHashMap::default();
        for member in candidate.members() {
            if let Some(&i) = index_by_member.get(member)
                && !claimed[i]
            {
                *votes.entry(i).or_insert(0) += 1;
            }
        }
        // Ties break toward the smallest previous key, for determinism.
        let best = votes.iter().max_by(|(ia, ca), (ib, cb)| {
            ca.cmp(cb).then_with(|| {
                previous_clusters[**ib]
                    .key()
                    .cmp(&previous_clusters[**ia].key())
            })
        });

        match best {
            Some((&i, &overlap)) => {
                let denom = previous_clusters[i].len().max(candidate.len()) as f64;
                if overlap as f64 / denom >= min_fraction {
                    claimed[i] = true;
                    retained.push((previous_clusters[i].clone(), candidate.clone()));
                } else {
                    added.push(candidate.clone());
                }
            }
            None => added.push(candidate.clone()),
        }
    }

    let removed = previous_clusters
        .iter()
        .zip(&claimed)
        .filter(|(_, claimed)| !**claimed)
        .map(|(c, _)| c.clone())
        .collect();

    ClusterDiff {
        added,
        removed,
        retained,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{Pin, pin};
    use crate::types::CellIndex;
    use geo::{Point, Rect};

    fn cell_cluster(row: i64, col: i64, members: Vec<Pin>) -> Cluster<Pin> {
        let coordinate = members[0].coordinate();
        Cluster::new(ClusterKey::Cell(CellIndex::new(row, col)), coordinate, members)
    }

    fn snapshot(clusters: Vec<Cluster<Pin>>) -> Snapshot<Pin> {
        Snapshot::new(clusters, Rect::new((0.0, 0.0), (300.0, 300.0)), 0.0, 1)
    }

    fn assert_sound(diff: &ClusterDiff<Pin>, previous: &Snapshot<Pin>, candidates: &[Cluster<Pin>]) {
        // Every candidate classified exactly once.
        assert_eq!(diff.added.len() + diff.retained.len(), candidates.len());
        // Every previous cluster classified exactly once.
        assert_eq!(diff.removed.len() + diff.retained.len(), previous.len());
        // added ∩ retained(new) = ∅, removed ∩ retained(old) = ∅.
        for (old, new) in &diff.retained {
            assert!(!diff.added.iter().any(|c| c.key() == new.key()));
            assert!(!diff.removed.iter().any(|c| c.key() == old.key()));
        }
    }

    #[test]
    fn test_never_policy_treats_everything_as_new() {
        let previous = snapshot(vec![cell_cluster(0, 0, vec![pin(1, 10.0, 10.0)])]);
        let candidates = vec![cell_cluster(0, 0, vec![pin(1, 10.0, 10.0)])];

        let result = diff(&previous, &candidates, ReusePolicy::Never);
        assert_eq!(result.added.len(), 1);
        assert_eq!(result.removed.len(), 1);
        assert!(result.retained.is_empty());
        assert_sound(&result, &previous, &candidates);
    }

    #[test]
    fn test_cell_identity_retains_matching_cells() {
        let previous = snapshot(vec![
            cell_cluster(0, 0, vec![pin(1, 10.0, 10.0), pin(2, 20.0, 20.0)]),
            cell_cluster(0, 1, vec![pin(3, 70.0, 10.0)]),
        ]);
        // Same cell (0,0) with slightly different membership, cell (0,1)
        // gone, cell (1, 1) new.
        let candidates = vec![
            cell_cluster(0, 0, vec![pin(1, 10.0, 10.0)]),
            cell_cluster(1, 1, vec![pin(4, 70.0, 70.0)]),
        ];

        let result = diff(&previous, &candidates, ReusePolicy::CellIdentity);
        assert_eq!(result.retained.len(), 1);
        assert_eq!(
            result.retained[0].0.key(),
            ClusterKey::Cell(CellIndex::new(0, 0))
        );
        assert_eq!(result.added.len(), 1);
        assert_eq!(result.added[0].key(), ClusterKey::Cell(CellIndex::new(1, 1)));
        assert_eq!(result.removed.len(), 1);
        assert_eq!(
            result.removed[0].key(),
            ClusterKey::Cell(CellIndex::new(0, 1))
        );
        assert_sound(&result, &previous, &candidates);
    }

    #[test]
    fn test_member_overlap_matches_across_cells() {
        // The same three members moved to a neighboring cell; key equality
        // fails but the member sets are identical.
        let members = vec![pin(1, 10.0, 10.0), pin(2, 20.0, 20.0), pin(3, 30.0, 30.0)];
        let previous = snapshot(vec![cell_cluster(0, 0, members.clone())]);
        let candidates = vec![cell_cluster(0, 1, members)];

        let identity = diff(&previous, &candidates, ReusePolicy::CellIdentity);
        assert!(identity.retained.is_empty());

        let overlap = diff(
            &previous,
            &candidates,
            ReusePolicy::MemberOverlap { min_fraction: 0.5 },
        );
        assert_eq!(overlap.retained.len(), 1);
        assert!(overlap.added.is_empty());
        assert!(overlap.removed.is_empty());
        assert_sound(&overlap, &previous, &candidates);
    }

    #[test]
    fn test_member_overlap_below_threshold_is_added() {
        let previous = snapshot(vec![cell_cluster(
            0,
            0,
            vec![pin(1, 10.0, 10.0), pin(2, 20.0, 20.0), pin(3, 30.0, 30.0), pin(4, 40.0, 40.0)],
        )]);
        // Only one of four members carried over to a different cell.
        let candidates = vec![cell_cluster(
            2,
            2,
            vec![pin(1, 130.0, 130.0), pin(5, 140.0, 140.0)],
        )];

        let result = diff(
            &previous,
            &candidates,
            ReusePolicy::MemberOverlap { min_fraction: 0.5 },
        );
        assert_eq!(result.added.len(), 1);
        assert_eq!(result.removed.len(), 1);
        assert!(result.retained.is_empty());
        assert_sound(&result, &previous, &candidates);
    }

    #[test]
    fn test_member_overlap_claims_each_previous_cluster_once() {
        let previous = snapshot(vec![cell_cluster(
            0,
            0,
            vec![pin(1, 10.0, 10.0), pin(2, 20.0, 20.0)],
        )]);
        // The previous cluster split into two candidates; only one may
        // continue it.
        let candidates = vec![
            cell_cluster(0, 1, vec![pin(1, 70.0, 10.0)]),
            cell_cluster(0, 2, vec![pin(2, 130.0, 10.0)]),
        ];

        let result = diff(
            &previous,
            &candidates,
            ReusePolicy::MemberOverlap { min_fraction: 0.5 },
        );
        assert_eq!(result.retained.len(), 1);
        assert_eq!(result.added.len(), 1);
        assert!(result.removed.is_empty());
        assert_sound(&result, &previous, &candidates);
    }

    #[test]
    fn test_diff_is_deterministic() {
        let previous = snapshot(vec![
            cell_cluster(0, 0, vec![pin(1, 10.0, 10.0), pin(2, 20.0, 20.0)]),
            cell_cluster(1, 0, vec![pin(3, 10.0, 70.0), pin(4, 20.0, 80.0)]),
        ]);
        let candidates = vec![
            cell_cluster(0, 1, vec![pin(1, 70.0, 10.0), pin(3, 80.0, 20.0)]),
            cell_cluster(1, 1, vec![pin(2, 70.0, 70.0), pin(4, 80.0, 80.0)]),
        ];

        let policy = ReusePolicy::MemberOverlap { min_fraction: 0.25 };
        let first = diff(&previous, &candidates, policy);
        for _ in 0..10 {
            let again = diff(&previous, &candidates, policy);
            let keys = |d: &ClusterDiff<Pin>| {
                (
                    d.added.iter().map(|c| c.key()).collect::<Vec<_>>(),
                    d.removed.iter().map(|c| c.key()).collect::<Vec<_>>(),
                    d.retained
                        .iter()
                        .map(|(o, n)| (o.key(), n.key()))
                        .collect::<Vec<_>>(),
                )
            };
            assert_eq!(keys(&again), keys(&first));
        }
    }

    #[test]
    fn test_empty_previous_snapshot() {
        let previous = Snapshot::empty(0);
        let candidates = vec![cell_cluster(0, 0, vec![pin(1, 10.0, 10.0)])];

        for policy in [
            ReusePolicy::Never,
            ReusePolicy::CellIdentity,
            ReusePolicy::MemberOverlap { min_fraction: 0.5 },
        ] {
            let result = diff(&previous, &candidates, policy);
            assert_eq!(result.added.len(), 1);
            assert!(result.removed.is_empty());
            assert!(result.retained.is_empty());
        }
    }
}
