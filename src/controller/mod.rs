//! The cluster controller: owns the working annotation set and the current
//! snapshot, and serializes mutations against recomputation.
//!
//! Mutations apply to the working set synchronously under the state lock and
//! bump a generation counter; a dedicated worker thread picks up the latest
//! inputs and runs the partition → reduce → diff pipeline off the caller's
//! path. A result is applied only if its generation is still current — a
//! newer request supersedes the in-flight computation, whose result is then
//! discarded on arrival (there is no partial cancellation). Completion
//! callbacks for all operations folded into one applied cycle fire together,
//! in issue order.

use parking_lot::{Condvar, Mutex, RwLock};
use rustc_hash::FxHashSet;
use std::sync::Arc;
use std::thread;

use crate::animation::{AnimationStrategy, FadeAnimator, Transition};
use crate::compute::diff::ClusterDiff;
use crate::config::Config;
use crate::error::{ClusterError, Result};
use crate::projection::Projection;
use crate::reduce::{CenterOfMass, ClusterReducer};
use crate::types::{Annotation, Cluster, ClusterStats, Snapshot};

mod worker;

/// Completion callback for a mutation or refresh operation.
///
/// Fires exactly once, after the recompute cycle that folded the operation
/// in has been applied (or immediately on [`ClusterController::close`] if
/// the controller shuts down first). Runs on the compute thread.
pub type Completion = Box<dyn FnOnce() + Send + 'static>;

/// Rendering-layer boundary, driven after every applied recompute.
///
/// The controller holds the delegate as a plain shared reference and never
/// manages its lifetime beyond that. Called on the compute thread.
pub trait ClusterDelegate<A: Annotation>: Send + Sync {
    /// The current snapshot was atomically replaced. `diff` classifies every
    /// cluster against the previous snapshot; `transitions` is the advisory
    /// animation plan for those changes.
    fn clusters_changed(
        &self,
        snapshot: &Snapshot<A>,
        diff: &ClusterDiff<A>,
        transitions: &[Transition],
    );
}

/// Controller lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No recompute pending or running.
    Idle,
    /// The worker is running the pipeline.
    Computing,
    /// A finished result is being applied and observers notified.
    Applying,
}

pub(crate) struct ControllerState<A: Annotation> {
    pub annotations: FxHashSet<A>,
    pub config: Config,
    pub reducer: Arc<dyn ClusterReducer>,
    pub animator: Arc<dyn AnimationStrategy>,
    pub delegate: Option<Arc<dyn ClusterDelegate<A>>>,
    /// Monotonic logical timestamp of the working set; a computation is
    /// applied only if the generation it captured is still current.
    pub generation: u64,
    /// A trigger arrived that the worker has not picked up yet.
    pub dirty: bool,
    pub closed: bool,
    pub phase: Phase,
    /// Completions for operations not yet folded into an applied cycle,
    /// in issue order.
    pub pending: Vec<Completion>,
    pub stats: ClusterStats,
}

pub(crate) struct Shared<A: Annotation> {
    pub state: Mutex<ControllerState<A>>,
    /// Wakes the worker when a trigger arrives or the controller closes.
    pub wake: Condvar,
    /// Signals observers waiting for the controller to settle.
    pub settled: Condvar,
    /// Current snapshot; replaced atomically, never mutated in place.
    pub snapshot: RwLock<Arc<Snapshot<A>>>,
    pub projection: Arc<dyn Projection>,
}

/// Clusters a dynamic set of annotations for display on a pannable/zoomable
/// map, recomputing off the interactive path whenever the point set,
/// viewport, or zoom changes.
///
/// # Examples
///
/// ```rust
/// use geo::{Point, Rect};
/// use mapcluster::{Annotation, ClusterController, PlanarProjection};
/// use std::sync::Arc;
///
/// #[derive(Clone, PartialEq, Eq, Hash)]
/// struct Pin(u32, i64, i64);
///
/// impl Annotation for Pin {
///     fn coordinate(&self) -> Point {
///         Point::new(self.1 as f64, self.2 as f64)
///     }
/// }
///
/// let projection = Arc::new(PlanarProjection::new(
///     Rect::new((0.0, 0.0), (300.0, 300.0)),
///     1.0,
/// ));
/// let controller = ClusterController::new(projection);
///
/// controller.add_annotations(vec![Pin(1, 10, 10), Pin(2, 20, 20)])?;
/// controller.wait_until_idle();
///
/// let snapshot = controller.snapshot();
/// assert_eq!(snapshot.len(), 1);
/// assert_eq!(snapshot.clusters()[0].len(), 2);
/// # Ok::<(), mapcluster::ClusterError>(())
/// ```
pub struct ClusterController<A: Annotation> {
    shared: Arc<Shared<A>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl<A: Annotation> ClusterController<A> {
    /// Creates a controller with the default configuration, reducer
    /// (center-of-mass), and animation strategy (fade).
    pub fn new(projection: Arc<dyn Projection>) -> Self {
        Self::spawn(
            projection,
            Config::default(),
            Arc::new(CenterOfMass),
            Arc::new(FadeAnimator),
            None,
        )
    }

    /// Creates a controller with a custom configuration.
    pub fn with_config(projection: Arc<dyn Projection>, config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::spawn(
            projection,
            config,
            Arc::new(CenterOfMass),
            Arc::new(FadeAnimator),
            None,
        ))
    }

    /// Builder for full control over strategies and delegate wiring.
    pub fn builder() -> crate::builder::ClusterControllerBuilder<A> {
        crate::builder::ClusterControllerBuilder::new()
    }

    pub(crate) fn spawn(
        projection: Arc<dyn Projection>,
        config: Config,
        reducer: Arc<dyn ClusterReducer>,
        animator: Arc<dyn AnimationStrategy>,
        delegate: Option<Arc<dyn ClusterDelegate<A>>>,
    ) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(ControllerState {
                annotations: FxHashSet::default(),
                config,
                reducer,
                animator,
                delegate,
                generation: 0,
                dirty: false,
                closed: false,
                phase: Phase::Idle,
                pending: Vec::new(),
                stats: ClusterStats::default(),
            }),
            wake: Condvar::new(),
            settled: Condvar::new(),
            snapshot: RwLock::new(Arc::new(Snapshot::empty(0))),
            projection,
        });

        let worker_shared = shared.clone();
        let worker = thread::spawn(move || worker::run(worker_shared));

        Self {
            shared,
            worker: Some(worker),
        }
    }

    /// Applies a mutation to the working set synchronously, records the
    /// completion, and triggers a recompute.
    fn mutate<M>(&self, completion: Option<Completion>, apply: M) -> Result<()>
    where
        M: FnOnce(&mut ControllerState<A>),
    {
        {
            let mut state = self.shared.state.lock();
            if state.closed {
                return Err(ClusterError::ControllerClosed);
            }
            apply(&mut state);
            state.generation += 1;
            state.dirty = true;
            state.stats.annotation_count = state.annotations.len();
            if let Some(completion) = completion {
                state.pending.push(completion);
            }
        }
        self.shared.wake.notify_one();
        Ok(())
    }

    /// Adds annotations to the working set and triggers a recompute.
    /// Adding an already-present annotation is idempotent.
    pub fn add_annotations<I>(&self, annotations: I) -> Result<()>
    where
        I: IntoIterator<Item = A>,
    {
        self.mutate(None, |state| {
            state.annotations.extend(annotations);
        })
    }

    /// Like [`Self::add_annotations`], with a completion callback that fires
    /// once the clustering that includes this operation has been applied.
    pub fn add_annotations_with<I, F>(&self, annotations: I, completion: F) -> Result<()>
    where
        I: IntoIterator<Item = A>,
        F: FnOnce() + Send + 'static,
    {
        self.mutate(Some(Box::new(completion)), |state| {
            state.annotations.extend(annotations);
        })
    }

    /// Removes annotations from the working set and triggers a recompute.
    /// Removing a non-member is a no-op.
    pub fn remove_annotations<I>(&self, annotations: I) -> Result<()>
    where
        I: IntoIterator<Item = A>,
    {
        self.mutate(None, |state| {
            for annotation in annotations {
                state.annotations.remove(&annotation);
            }
        })
    }

    /// Like [`Self::remove_annotations`], with a completion callback.
    pub fn remove_annotations_with<I, F>(&self, annotations: I, completion: F) -> Result<()>
    where
        I: IntoIterator<Item = A>,
        F: FnOnce() + Send + 'static,
    {
        self.mutate(Some(Box::new(completion)), |state| {
            for annotation in annotations {
                state.annotations.remove(&annotation);
            }
        })
    }

    /// Replaces the entire working set and triggers a recompute.
    pub fn replace_annotations<I>(&self, annotations: I) -> Result<()>
    where
        I: IntoIterator<Item = A>,
    {
        self.mutate(None, |state| {
            state.annotations = annotations.into_iter().collect();
        })
    }

    /// Like [`Self::replace_annotations`], with a completion callback.
    pub fn replace_annotations_with<I, F>(&self, annotations: I, completion: F) -> Result<()>
    where
        I: IntoIterator<Item = A>,
        F: FnOnce() + Send + 'static,
    {
        self.mutate(Some(Box::new(completion)), |state| {
            state.annotations = annotations.into_iter().collect();
        })
    }

    /// Triggers a recompute against the current viewport and zoom without
    /// changing the working set. Call after panning or zooming the
    /// projection, or when the view reappears.
    pub fn refresh(&self) -> Result<()> {
        self.mutate(None, |_| {})
    }

    /// Like [`Self::refresh`], with a completion callback.
    pub fn refresh_with<F>(&self, completion: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.mutate(Some(Box::new(completion)), |_| {})
    }

    /// The current snapshot. Cheap; snapshots are immutable and shared.
    pub fn snapshot(&self) -> Arc<Snapshot<A>> {
        self.shared.snapshot.read().clone()
    }

    /// Finds the cluster containing the given annotation in the current
    /// snapshot. Always observes a fully-formed snapshot, never a
    /// half-applied one.
    pub fn find_cluster(&self, annotation: &A) -> Option<Cluster<A>> {
        self.shared.snapshot.read().find(annotation).cloned()
    }

    /// Current zoom level as reported by the projection.
    pub fn zoom_level(&self) -> f64 {
        self.shared.projection.zoom_level()
    }

    pub fn stats(&self) -> ClusterStats {
        self.shared.state.lock().stats.clone()
    }

    pub fn config(&self) -> Config {
        self.shared.state.lock().config.clone()
    }

    /// Replaces the configuration and triggers a recompute.
    pub fn set_config(&self, config: Config) -> Result<()> {
        config.validate()?;
        self.mutate(None, |state| {
            state.config = config;
        })
    }

    /// Swaps the reducer strategy and triggers a recompute.
    pub fn set_reducer(&self, reducer: Arc<dyn ClusterReducer>) -> Result<()> {
        self.mutate(None, |state| {
            state.reducer = reducer;
        })
    }

    /// Swaps the animation strategy. Takes effect from the next applied
    /// recompute.
    pub fn set_animation_strategy(&self, animator: Arc<dyn AnimationStrategy>) -> Result<()> {
        self.mutate(None, |state| {
            state.animator = animator;
        })
    }

    /// Installs the rendering-layer delegate.
    pub fn set_delegate(&self, delegate: Arc<dyn ClusterDelegate<A>>) -> Result<()> {
        self.mutate(None, |state| {
            state.delegate = Some(delegate);
        })
    }

    /// Blocks until every issued operation has been folded into an applied
    /// snapshot and its callbacks have run. Returns immediately if the
    /// controller is closed.
    pub fn wait_until_idle(&self) {
        let mut state = self.shared.state.lock();
        while !state.closed
            && (state.dirty || state.phase != Phase::Idle || !state.pending.is_empty())
        {
            self.shared.settled.wait(&mut state);
        }
    }

    /// Shuts the controller down. Outstanding completion callbacks fire
    /// immediately (their operations were applied to the working set, even
    /// if no snapshot reflecting them will ever be published); subsequent
    /// operations return [`ClusterError::ControllerClosed`].
    pub fn close(&self) -> Result<()> {
        let pending = {
            let mut state = self.shared.state.lock();
            if state.closed {
                return Err(ClusterError::ControllerClosed);
            }
            state.closed = true;
            std::mem::take(&mut state.pending)
        };
        self.shared.wake.notify_all();
        self.shared.settled.notify_all();
        for completion in pending {
            completion();
        }
        Ok(())
    }
}

impl<A: Annotation> Drop for ClusterController<A> {
    fn drop(&mut self) {
        let _ = self.close();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
