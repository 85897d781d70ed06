//! Grid-based annotation clustering for pannable/zoomable maps.
//!
//! `mapcluster` partitions a working set of geo-located annotations into a
//! screen-space grid whose cell size follows the zoom level, reduces each
//! populated cell to one representative cluster, and diffs the result
//! against the previous clustering so markers can be reused and animated
//! instead of destroyed and recreated. Recomputation runs on a dedicated
//! thread and is applied atomically; a newer viewport or point-set change
//! supersedes an in-flight computation rather than racing it.
//!
//! ```rust
//! use geo::{Point, Rect};
//! use mapcluster::{Annotation, ClusterController, PlanarProjection};
//! use std::sync::Arc;
//!
//! #[derive(Clone, PartialEq, Eq, Hash)]
//! struct Pin(u32, i64, i64);
//!
//! impl Annotation for Pin {
//!     fn coordinate(&self) -> Point {
//!         Point::new(self.1 as f64, self.2 as f64)
//!     }
//! }
//!
//! let projection = Arc::new(PlanarProjection::new(
//!     Rect::new((0.0, 0.0), (300.0, 300.0)),
//!     1.0,
//! ));
//! let controller = ClusterController::new(projection);
//! controller.add_annotations((0..100).map(|i| Pin(i, (i as i64 % 10) * 30, (i as i64 / 10) * 30)))?;
//! controller.wait_until_idle();
//! assert_eq!(controller.snapshot().annotation_count(), 100);
//! # Ok::<(), mapcluster::ClusterError>(())
//! ```

pub mod animation;
pub mod builder;
pub mod compute;
pub mod config;
pub mod controller;
pub mod error;
pub mod projection;
pub mod reduce;
pub mod types;

#[cfg(test)]
pub(crate) mod test_util;

pub use builder::ClusterControllerBuilder;
pub use controller::{ClusterController, ClusterDelegate, Completion, Phase};
pub use error::{ClusterError, Result};

pub use config::{Config, ReusePolicy};

pub use types::{Annotation, CellIndex, Cluster, ClusterKey, ClusterStats, Snapshot};

pub use projection::{MercatorProjection, PlanarProjection, Projection, region_around};

pub use reduce::{CenterOfMass, ClusterReducer, FirstMember, NearestToCentroid, reducer};

pub use animation::{
    AnimationStrategy, ChangeKind, ClusterChange, Effect, FadeAnimator, NoAnimator, Transition,
    animation_strategy,
};

pub use compute::diff::ClusterDiff;
pub use compute::grid::{cell_index, cell_size_projected, padded_region, partition};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{ClusterController, ClusterControllerBuilder, ClusterError, Result};

    pub use geo::{Point, Rect};

    pub use crate::{Annotation, Cluster, ClusterKey, Snapshot};

    pub use crate::{Config, ReusePolicy};

    pub use crate::{MercatorProjection, PlanarProjection, Projection};

    pub use crate::{ClusterDelegate, ClusterDiff};

    pub use crate::reduce::{CenterOfMass, ClusterReducer, FirstMember, NearestToCentroid};

    pub use crate::animation::{AnimationStrategy, FadeAnimator, NoAnimator};
}
