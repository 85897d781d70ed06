//! Projection boundary between the map surface and the clustering engine.
//!
//! The engine never talks to a map view directly. It sees the map through the
//! [`Projection`] trait: geographic↔projected conversion, the visible region
//! in projected space, and a points-per-projected-unit scale factor for the
//! current zoom. Two adapters are provided: [`MercatorProjection`] for the
//! usual Web-Mercator tile maps and [`PlanarProjection`] for flat coordinate
//! spaces (indoor maps, game worlds, tests).

use geo::{Point, Rect};
use parking_lot::RwLock;
use std::f64::consts::PI;

/// Web-Mercator tile edge in screen points at zoom 0.
const TILE_SIZE: f64 = 256.0;

/// Meters per degree of latitude (and of longitude at the equator).
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Coordinate projection and viewport query interface.
///
/// Implementations must be cheap to query and safe to call from the compute
/// thread; the engine reads the viewport once per recompute, so a projection
/// backed by a live map view should return a consistent triple of region,
/// zoom, and scale.
pub trait Projection: Send + Sync {
    /// Convert a geographic coordinate (lon/lat) to projected space.
    fn project(&self, coordinate: Point) -> Point;

    /// Convert a projected coordinate back to geographic space.
    fn unproject(&self, projected: Point) -> Point;

    /// Currently visible region, in projected space.
    fn visible_region(&self) -> Rect;

    /// Screen points per projected unit at the given zoom level.
    fn scale_factor(&self, zoom: f64) -> f64;

    /// Current zoom level. 0 means the entire map width fits the viewport;
    /// the value increases while zooming in.
    fn zoom_level(&self) -> f64;
}

#[derive(Debug, Clone, Copy)]
struct Viewport {
    /// Geographic center of the viewport.
    center: Point,
    zoom: f64,
    width_points: f64,
    height_points: f64,
}

/// Web-Mercator projection onto the unit square, tile size 256.
///
/// The viewport (center, zoom, size in points) is held behind a lock so a
/// single shared adapter can be panned and zoomed while a controller is
/// using it; call [`crate::ClusterController::refresh`] after changing it.
///
/// # Examples
///
/// ```rust
/// use geo::Point;
/// use mapcluster::MercatorProjection;
/// use mapcluster::Projection;
///
/// let projection = MercatorProjection::new(Point::new(0.0, 0.0), 10.0, 320.0, 480.0);
/// let projected = projection.project(Point::new(13.4, 52.5));
/// let round_trip = projection.unproject(projected);
/// assert!((round_trip.x() - 13.4).abs() < 1e-9);
/// assert!((round_trip.y() - 52.5).abs() < 1e-9);
/// ```
pub struct MercatorProjection {
    viewport: RwLock<Viewport>,
}

impl MercatorProjection {
    pub fn new(center: Point, zoom: f64, width_points: f64, height_points: f64) -> Self {
        Self {
            viewport: RwLock::new(Viewport {
                center,
                zoom,
                width_points,
                height_points,
            }),
        }
    }

    /// Pan the viewport to a new geographic center.
    pub fn set_center(&self, center: Point) {
        self.viewport.write().center = center;
    }

    /// Change the zoom level.
    pub fn set_zoom(&self, zoom: f64) {
        self.viewport.write().zoom = zoom;
    }

    /// Resize the viewport, in screen points.
    pub fn set_viewport_size(&self, width_points: f64, height_points: f64) {
        let mut viewport = self.viewport.write();
        viewport.width_points = width_points;
        viewport.height_points = height_points;
    }
}

impl Projection for MercatorProjection {
    fn project(&self, coordinate: Point) -> Point {
        let x = (coordinate.x() + 180.0) / 360.0;
        let lat_rad = coordinate.y().to_radians();
        let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0;
        Point::new(x, y)
    }

    fn unproject(&self, projected: Point) -> Point {
        let lon = projected.x() * 360.0 - 180.0;
        let lat = (PI * (1.0 - 2.0 * projected.y())).sinh().atan().to_degrees();
        Point::new(lon, lat)
    }

    fn visible_region(&self) -> Rect {
        let viewport = *self.viewport.read();
        let center = self.project(viewport.center);
        let scale = self.scale_factor(viewport.zoom);
        let half_width = viewport.width_points / scale / 2.0;
        let half_height = viewport.height_points / scale / 2.0;
        Rect::new(
            (center.x() - half_width, center.y() - half_height),
            (center.x() + half_width, center.y() + half_height),
        )
    }

    fn scale_factor(&self, zoom: f64) -> f64 {
        TILE_SIZE * 2f64.powf(zoom)
    }

    fn zoom_level(&self) -> f64 {
        self.viewport.read().zoom
    }
}

#[derive(Debug, Clone, Copy)]
struct PlanarState {
    region: Rect,
    zoom: f64,
    points_per_unit: f64,
}

/// Identity projection over a caller-defined region.
///
/// Geographic and projected space coincide, and the scale factor is
/// `points_per_unit * 2^zoom`. With `points_per_unit = 1` and zoom 0 the
/// visible region is measured directly in screen points, which makes cell
/// geometry easy to reason about.
pub struct PlanarProjection {
    state: RwLock<PlanarState>,
}

impl PlanarProjection {
    pub fn new(region: Rect, points_per_unit: f64) -> Self {
        Self {
            state: RwLock::new(PlanarState {
                region,
                zoom: 0.0,
                points_per_unit,
            }),
        }
    }

    pub fn set_region(&self, region: Rect) {
        self.state.write().region = region;
    }

    pub fn set_zoom(&self, zoom: f64) {
        self.state.write().zoom = zoom;
    }
}

impl Projection for PlanarProjection {
    fn project(&self, coordinate: Point) -> Point {
        coordinate
    }

    fn unproject(&self, projected: Point) -> Point {
        projected
    }

    fn visible_region(&self) -> Rect {
        self.state.read().region
    }

    fn scale_factor(&self, zoom: f64) -> f64 {
        self.state.read().points_per_unit * 2f64.powf(zoom)
    }

    fn zoom_level(&self) -> f64 {
        self.state.read().zoom
    }
}

/// Geographic rectangle spanning the given north-south and east-west
/// distances around a center coordinate.
///
/// Backs "select this annotation and zoom to a region around it" behavior in
/// the rendering layer. Uses the spherical small-distance approximation,
/// which is plenty for viewport-sized regions away from the poles.
pub fn region_around(center: Point, latitudinal_meters: f64, longitudinal_meters: f64) -> Rect {
    let half_lat = latitudinal_meters / METERS_PER_DEGREE / 2.0;
    let cos_lat = center.y().to_radians().cos().max(1e-12);
    let half_lon = longitudinal_meters / (METERS_PER_DEGREE * cos_lat) / 2.0;
    Rect::new(
        (center.x() - half_lon, center.y() - half_lat),
        (center.x() + half_lon, center.y() + half_lat),
    )
}
