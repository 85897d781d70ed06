//! Compute-thread loop: pick up the latest inputs, run the pipeline, apply
//! the result unless a newer request superseded it.

use std::sync::Arc;

use super::{Phase, Shared};
use crate::compute;
use crate::types::Annotation;

pub(crate) fn run<A: Annotation>(shared: Arc<Shared<A>>) {
    loop {
        // Wait for a trigger, then capture an immutable copy of the inputs.
        let (generation, annotations, config, reducer) = {
            let mut state = shared.state.lock();
            while !state.dirty && !state.closed {
                shared.wake.wait(&mut state);
            }
            if state.closed {
                return;
            }
            state.dirty = false;
            state.phase = Phase::Computing;
            (
                state.generation,
                state.annotations.iter().cloned().collect::<Vec<A>>(),
                state.config.clone(),
                state.reducer.clone(),
            )
        };

        // The pipeline runs without any lock held; mutations and queries
        // proceed concurrently against the previous snapshot.
        let previous = shared.snapshot.read().clone();
        let (snapshot, diff) = compute::recompute(
            &previous,
            &annotations,
            shared.projection.as_ref(),
            &config,
            reducer.as_ref(),
            generation,
        );

        let (snapshot, completions, delegate, animator) = {
            let mut state = shared.state.lock();
            if state.closed {
                return;
            }
            if state.generation != generation {
                // Superseded while computing: drop the stale result. The
                // superseding trigger already re-marked the state dirty, so
                // the loop immediately recomputes with the latest inputs.
                state.stats.superseded_count += 1;
                log::debug!("discarding superseded clustering result (generation {generation})");
                continue;
            }

            state.phase = Phase::Applying;
            let snapshot = Arc::new(snapshot);
            *shared.snapshot.write() = snapshot.clone();
            let completions = std::mem::take(&mut state.pending);
            state.stats.recompute_count += 1;
            state.stats.cluster_count = snapshot.len();
            state.stats.annotation_count = state.annotations.len();
            (
                snapshot,
                completions,
                state.delegate.clone(),
                state.animator.clone(),
            )
        };

        log::debug!(
            "applied clustering generation {generation}: {} clusters from {} annotations",
            snapshot.len(),
            annotations.len()
        );

        // Observers run outside the lock, still within the Applying phase so
        // wait_until_idle() covers them.
        if let Some(delegate) = delegate {
            let transitions = animator.plan(&diff.changes());
            delegate.clusters_changed(&snapshot, &diff, &transitions);
        }
        for completion in completions {
            completion();
        }

        {
            let mut state = shared.state.lock();
            if state.phase == Phase::Applying {
                state.phase = Phase::Idle;
            }
        }
        shared.settled.notify_all();
    }
}
