use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;

use glam::{Mat4, Vec3};
use meadow::grass::config::{BladeRanges, Placement};
use meadow::grass::cull::CullSettings;
use meadow::grass::generator::generate_with;
use meadow::grass::BladeCuller;

fn bench_generate_plane(c: &mut Criterion) {
    let ranges = BladeRanges::default();
    c.bench_function("generate_plane_4000", |b| {
        b.iter(|| {
            let mut rng = StdRng::seed_from_u64(1);
            generate_with(&mut rng, Placement::Plane, black_box(4000), 30.0, &ranges)
        });
    });
}

fn bench_generate_heart(c: &mut Criterion) {
    let ranges = BladeRanges::default();
    c.bench_function("generate_heart_4000", |b| {
        b.iter(|| {
            let mut rng = StdRng::seed_from_u64(1);
            generate_with(&mut rng, Placement::Heart, black_box(4000), 30.0, &ranges)
        });
    });
}

fn bench_host_cull(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(2);
    let blades = generate_with(&mut rng, Placement::Plane, 4000, 30.0, &BladeRanges::default());
    let mut culler = BladeCuller::new(blades);

    let eye = Vec3::new(0.0, 8.0, 25.0);
    let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);
    let projection = Mat4::perspective_rh(45f32.to_radians(), 16.0 / 9.0, 0.1, 40.0);
    let uniforms = CullSettings::default().uniforms(view, projection, eye, 0.016, 3.0, culler.total_blades());

    c.bench_function("host_cull_4000", |b| {
        b.iter(|| culler.cull(black_box(&uniforms)).len());
    });
}

criterion_group!(benches, bench_generate_plane, bench_generate_heart, bench_host_cull);
criterion_main!(benches);
