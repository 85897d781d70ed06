//! Advisory animation strategies driven by the differ's classification.
//!
//! The engine never animates anything itself; it translates a diff into a
//! list of [`Transition`]s that the rendering layer may apply. Strategies are
//! selectable by name through [`animation_strategy`].

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::compute::diff::ClusterDiff;
use crate::types::{Annotation, ClusterKey};

/// How the differ classified a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Newly materialized this cycle.
    Added,
    /// Present in the previous snapshot, gone from the new one.
    Removed,
    /// Continues a previous cluster; updated in place.
    Retained,
}

/// One cluster's classification, keyed for marker lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterChange {
    pub key: ClusterKey,
    pub kind: ChangeKind,
}

impl<A: Annotation> ClusterDiff<A> {
    /// Key-level view of this diff, in deterministic order (added, removed,
    /// retained, each sorted by key within its group).
    pub fn changes(&self) -> Vec<ClusterChange> {
        let mut changes = Vec::with_capacity(self.added.len() + self.removed.len() + self.retained.len());
        changes.extend(self.added.iter().map(|c| ClusterChange {
            key: c.key(),
            kind: ChangeKind::Added,
        }));
        changes.extend(self.removed.iter().map(|c| ClusterChange {
            key: c.key(),
            kind: ChangeKind::Removed,
        }));
        changes.extend(self.retained.iter().map(|(_, new)| ClusterChange {
            key: new.key(),
            kind: ChangeKind::Retained,
        }));
        changes
    }
}

/// Visual effect the rendering layer should apply to one marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    FadeIn,
    FadeOut,
    /// Reposition smoothly without an add/remove animation.
    Move,
    None,
}

/// A planned visual transition for one cluster marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub key: ClusterKey,
    pub effect: Effect,
}

/// Maps diff classifications to visual transitions. Purely advisory; the
/// rendering layer owns execution.
pub trait AnimationStrategy: Send + Sync {
    /// Registry name of this strategy.
    fn name(&self) -> &'static str;

    /// Plan transitions for the given changes.
    fn plan(&self, changes: &[ClusterChange]) -> Vec<Transition>;
}

/// Fade added markers in, removed markers out, and move retained ones
/// (the default).
#[derive(Debug, Clone, Copy, Default)]
pub struct FadeAnimator;

impl AnimationStrategy for FadeAnimator {
    fn name(&self) -> &'static str {
        "fade"
    }

    fn plan(&self, changes: &[ClusterChange]) -> Vec<Transition> {
        changes
            .iter()
            .map(|change| Transition {
                key: change.key,
                effect: match change.kind {
                    ChangeKind::Added => Effect::FadeIn,
                    ChangeKind::Removed => Effect::FadeOut,
                    ChangeKind::Retained => Effect::Move,
                },
            })
            .collect()
    }
}

/// No animation: markers appear, disappear, and jump in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAnimator;

impl AnimationStrategy for NoAnimator {
    fn name(&self) -> &'static str {
        "none"
    }

    fn plan(&self, changes: &[ClusterChange]) -> Vec<Transition> {
        changes
            .iter()
            .map(|change| Transition {
                key: change.key,
                effect: Effect::None,
            })
            .collect()
    }
}

type StrategyCtor = fn() -> Arc<dyn AnimationStrategy>;

static REGISTRY: Lazy<FxHashMap<&'static str, StrategyCtor>> = Lazy::new(|| {
    let mut registry: FxHashMap<&'static str, StrategyCtor> = FxHashMap::default();
    registry.insert("fade", || Arc::new(FadeAnimator));
    registry.insert("none", || Arc::new(NoAnimator));
    registry
});

/// Look up an animation strategy by registry name.
pub fn animation_strategy(name: &str) -> Option<Arc<dyn AnimationStrategy>> {
    REGISTRY.get(name).map(|ctor| ctor())
}
