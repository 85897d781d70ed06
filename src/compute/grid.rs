//! Grid partitioner: buckets annotations into projected-space cells.
//!
//! Pure functions of their inputs. Cell size in projected units depends on
//! the current scale factor, so it is recomputed on every call rather than
//! cached across zoom changes.

use geo::{Point, Rect};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::projection::Projection;
use crate::types::{Annotation, CellIndex};

/// Per-cell member storage. Most populated cells hold a handful of
/// annotations, so keep them inline.
pub(crate) type CellMembers<A> = SmallVec<[A; 4]>;

/// Cell edge length in projected units for the given screen-point cell size.
pub fn cell_size_projected(cell_size_points: f64, scale_factor: f64) -> f64 {
    cell_size_points / scale_factor
}

/// Visible region expanded symmetrically by `margin_factor` of its size in
/// each dimension, so annotations just outside the viewport still cluster
/// with on-screen ones.
pub fn padded_region(visible: Rect, margin_factor: f64) -> Rect {
    let dx = visible.width() * margin_factor;
    let dy = visible.height() * margin_factor;
    Rect::new(
        (visible.min().x - dx, visible.min().y - dy),
        (visible.max().x + dx, visible.max().y + dy),
    )
}

/// Grid cell containing a projected coordinate. Pure: the same coordinate
/// and cell size always produce the same index.
pub fn cell_index(projected: Point, cell_size: f64) -> CellIndex {
    CellIndex {
        row: (projected.y() / cell_size).floor() as i64,
        col: (projected.x() / cell_size).floor() as i64,
    }
}

fn region_contains(region: &Rect, p: Point) -> bool {
    p.x() >= region.min().x
        && p.x() <= region.max().x
        && p.y() >= region.min().y
        && p.y() <= region.max().y
}

/// Buckets annotations into grid cells covering the padded visible region.
///
/// Only annotations whose projected coordinate falls inside the padded
/// region are bucketed; the rest are excluded from this cycle entirely.
/// Every bucket in the output is non-empty. Returns an empty mapping when
/// the cell size is non-positive or the region has no area.
pub fn partition<A: Annotation>(
    annotations: &[A],
    projection: &dyn Projection,
    visible: Rect,
    margin_factor: f64,
    cell_size_points: f64,
    scale_factor: f64,
) -> FxHashMap<CellIndex, CellMembers<A>> {
    let mut cells: FxHashMap<CellIndex, CellMembers<A>> = FxHashMap::default();

    if cell_size_points <= 0.0 || !scale_factor.is_finite() || scale_factor <= 0.0 {
        return cells;
    }
    if visible.width() <= 0.0 || visible.height() <= 0.0 {
        return cells;
    }

    let padded = padded_region(visible, margin_factor);
    let cell_size = cell_size_projected(cell_size_points, scale_factor);

    for annotation in annotations {
        let projected = projection.project(annotation.coordinate());
        if !projected.x().is_finite() || !projected.y().is_finite() {
            log::warn!("skipping annotation with non-finite projected coordinate");
            continue;
        }
        if !region_contains(&padded, projected) {
            continue;
        }
        cells
            .entry(cell_index(projected, cell_size))
            .or_default()
            .push(annotation.clone());
    }

    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::PlanarProjection;
    use crate::test_util::{Pin, pin};

    fn planar() -> PlanarProjection {
        PlanarProjection::new(Rect::new((0.0, 0.0), (300.0, 300.0)), 1.0)
    }

    #[test]
    fn test_cell_size_recomputed_from_scale() {
        assert_eq!(cell_size_projected(60.0, 1.0), 60.0);
        assert_eq!(cell_size_projected(60.0, 256.0), 60.0 / 256.0);
    }

    #[test]
    fn test_cell_index_is_pure() {
        let p = Point::new(119.9, 60.0);
        let first = cell_index(p, 60.0);
        assert_eq!(first, CellIndex::new(1, 1));
        for _ in 0..10 {
            assert_eq!(cell_index(p, 60.0), first);
        }
        // Negative coordinates floor toward negative infinity.
        assert_eq!(cell_index(Point::new(-0.1, -0.1), 60.0), CellIndex::new(-1, -1));
    }

    #[test]
    fn test_padded_region() {
        let visible = Rect::new((0.0, 0.0), (100.0, 200.0));
        let padded = padded_region(visible, 0.5);
        assert_eq!(padded.min().x, -50.0);
        assert_eq!(padded.min().y, -100.0);
        assert_eq!(padded.max().x, 150.0);
        assert_eq!(padded.max().y, 300.0);

        // Zero margin leaves the region unchanged.
        assert_eq!(padded_region(visible, 0.0), visible);
    }

    #[test]
    fn test_partition_completeness() {
        let projection = planar();
        let visible = projection.visible_region();
        let annotations: Vec<Pin> = (0..100)
            .map(|i| pin(i, (i % 10) as f64 * 30.0 + 15.0, (i / 10) as f64 * 30.0 + 15.0))
            .collect();

        let cells = partition(&annotations, &projection, visible, 0.0, 60.0, 1.0);

        // Every in-region point lands in exactly one bucket.
        let total: usize = cells.values().map(|members| members.len()).sum();
        assert_eq!(total, 100);
        assert!(cells.values().all(|members| !members.is_empty()));

        for annotation in &annotations {
            let expected = cell_index(annotation.coordinate(), 60.0);
            let holders = cells
                .iter()
                .filter(|(_, members)| members.contains(annotation))
                .map(|(idx, _)| *idx)
                .collect::<Vec<_>>();
            assert_eq!(holders, vec![expected]);
        }
    }

    #[test]
    fn test_partition_excludes_out_of_region_points() {
        let projection = planar();
        let visible = projection.visible_region();
        let annotations = vec![
            pin(1, 150.0, 150.0),  // inside
            pin(2, 400.0, 150.0),  // outside, inside 0.5 margin
            pin(3, 1000.0, 150.0), // far outside
        ];

        let no_margin = partition(&annotations, &projection, visible, 0.0, 60.0, 1.0);
        let total: usize = no_margin.values().map(|m| m.len()).sum();
        assert_eq!(total, 1);

        let with_margin = partition(&annotations, &projection, visible, 0.5, 60.0, 1.0);
        let total: usize = with_margin.values().map(|m| m.len()).sum();
        assert_eq!(total, 2);
        assert!(!with_margin.values().any(|m| m.contains(&pin(3, 0.0, 0.0))));
    }

    #[test]
    fn test_partition_degenerate_inputs() {
        let projection = planar();
        let visible = projection.visible_region();
        let annotations = vec![pin(1, 150.0, 150.0)];

        assert!(partition(&annotations, &projection, visible, 0.5, 0.0, 1.0).is_empty());
        assert!(partition(&annotations, &projection, visible, 0.5, -10.0, 1.0).is_empty());
        assert!(partition(&annotations, &projection, visible, 0.5, 60.0, 0.0).is_empty());

        let empty_region = Rect::new((10.0, 10.0), (10.0, 10.0));
        assert!(partition(&annotations, &projection, empty_region, 0.5, 60.0, 1.0).is_empty());
    }

    #[test]
    fn test_partition_skips_non_finite_coordinates() {
        let projection = planar();
        let visible = projection.visible_region();
        let annotations = vec![pin(1, f64::NAN, 150.0), pin(2, 150.0, 150.0)];

        let cells = partition(&annotations, &projection, visible, 0.0, 60.0, 1.0);
        let total: usize = cells.values().map(|m| m.len()).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_partition_groups_by_cell() {
        let projection = planar();
        let visible = projection.visible_region();
        // Two points in cell (0, 0), one in cell (0, 1).
        let annotations = vec![pin(1, 10.0, 10.0), pin(2, 50.0, 50.0), pin(3, 70.0, 10.0)];

        let cells = partition(&annotations, &projection, visible, 0.0, 60.0, 1.0);
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[&CellIndex::new(0, 0)].len(), 2);
        assert_eq!(cells[&CellIndex::new(0, 1)].len(), 1);
    }
}
