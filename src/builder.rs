//! Builder for controller configuration and strategy wiring.

use std::sync::Arc;

use crate::animation::{AnimationStrategy, FadeAnimator, animation_strategy};
use crate::config::Config;
use crate::controller::{ClusterController, ClusterDelegate};
use crate::error::{ClusterError, Result};
use crate::projection::Projection;
use crate::reduce::{CenterOfMass, ClusterReducer, reducer};
use crate::types::Annotation;

/// Builder for [`ClusterController`] with custom strategies and delegate.
///
/// # Examples
///
/// ```rust
/// use geo::{Point, Rect};
/// use mapcluster::{Annotation, ClusterController, Config, PlanarProjection};
/// use std::sync::Arc;
///
/// #[derive(Clone, PartialEq, Eq, Hash)]
/// struct Pin(u32);
///
/// impl Annotation for Pin {
///     fn coordinate(&self) -> Point {
///         Point::new(0.0, 0.0)
///     }
/// }
///
/// let projection = Arc::new(PlanarProjection::new(
///     Rect::new((0.0, 0.0), (300.0, 300.0)),
///     1.0,
/// ));
/// let controller: ClusterController<Pin> = ClusterController::builder()
///     .config(Config::default().with_cell_size_points(80.0))
///     .reducer_named("nearest_to_centroid")?
///     .animation_strategy_named("none")?
///     .build(projection)?;
/// # Ok::<(), mapcluster::ClusterError>(())
/// ```
pub struct ClusterControllerBuilder<A: Annotation> {
    config: Config,
    reducer: Arc<dyn ClusterReducer>,
    animator: Arc<dyn AnimationStrategy>,
    delegate: Option<Arc<dyn ClusterDelegate<A>>>,
}

impl<A: Annotation> ClusterControllerBuilder<A> {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            reducer: Arc::new(CenterOfMass),
            animator: Arc::new(FadeAnimator),
            delegate: None,
        }
    }

    /// Set the engine configuration. Validated at build time.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Set the reducer strategy.
    pub fn reducer(mut self, reducer: Arc<dyn ClusterReducer>) -> Self {
        self.reducer = reducer;
        self
    }

    /// Set the reducer strategy by registry name
    /// (`center_of_mass`, `nearest_to_centroid`, `first_member`).
    pub fn reducer_named(mut self, name: &str) -> Result<Self> {
        self.reducer = reducer(name).ok_or_else(|| ClusterError::UnknownStrategy(name.to_string()))?;
        Ok(self)
    }

    /// Set the animation strategy.
    pub fn animation_strategy(mut self, animator: Arc<dyn AnimationStrategy>) -> Self {
        self.animator = animator;
        self
    }

    /// Set the animation strategy by registry name (`fade`, `none`).
    pub fn animation_strategy_named(mut self, name: &str) -> Result<Self> {
        self.animator = animation_strategy(name)
            .ok_or_else(|| ClusterError::UnknownStrategy(name.to_string()))?;
        Ok(self)
    }

    /// Install the rendering-layer delegate up front.
    pub fn delegate(mut self, delegate: Arc<dyn ClusterDelegate<A>>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    /// Validate the configuration and start the controller (spawning its
    /// compute thread).
    pub fn build(self, projection: Arc<dyn Projection>) -> Result<ClusterController<A>> {
        self.config.validate()?;
        Ok(ClusterController::spawn(
            projection,
            self.config,
            self.reducer,
            self.animator,
            self.delegate,
        ))
    }
}

impl<A: Annotation> Default for ClusterControllerBuilder<A> {
    fn default() -> Self {
        Self::new()
    }
}
