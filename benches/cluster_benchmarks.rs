use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use geo::{Point, Rect};
use mapcluster::{Annotation, ClusterController, PlanarProjection, Projection, partition};
use std::sync::Arc;

#[derive(Clone, Debug)]
struct Pin {
    id: u32,
    lon: f64,
    lat: f64,
}

impl PartialEq for Pin {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Pin {}

impl std::hash::Hash for Pin {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Annotation for Pin {
    fn coordinate(&self) -> Point {
        Point::new(self.lon, self.lat)
    }
}

fn pins(count: u32) -> Vec<Pin> {
    (0..count)
        .map(|i| Pin {
            id: i,
            lon: (i as f64 * 37.21) % 300.0,
            lat: (i as f64 * 53.77) % 300.0,
        })
        .collect()
}

fn benchmark_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition");
    let projection = PlanarProjection::new(Rect::new((0.0, 0.0), (300.0, 300.0)), 1.0);
    let visible = projection.visible_region();

    for count in [100, 1_000, 10_000] {
        let annotations = pins(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &annotations, |b, annotations| {
            b.iter(|| {
                partition(
                    black_box(annotations),
                    &projection,
                    visible,
                    0.5,
                    60.0,
                    1.0,
                )
            })
        });
    }

    group.finish();
}

fn benchmark_full_recompute(c: &mut Criterion) {
    let mut group = c.benchmark_group("recompute");
    group.sample_size(20);

    for count in [1_000, 10_000] {
        let annotations = pins(count);
        group.bench_with_input(
            BenchmarkId::from_parameter(count),
            &annotations,
            |b, annotations| {
                let projection = Arc::new(PlanarProjection::new(
                    Rect::new((0.0, 0.0), (300.0, 300.0)),
                    1.0,
                ));
                let controller = ClusterController::new(projection);
                b.iter(|| {
                    controller.replace_annotations(annotations.clone()).unwrap();
                    controller.wait_until_idle();
                    black_box(controller.snapshot().len())
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_partition, benchmark_full_recompute);
criterion_main!(benches);
