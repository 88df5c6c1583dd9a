//! Benchmarks for the per-frame CPU work: field update, collisions, render.
//!
//! Run with: `cargo bench`

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use handfield::collision::CollisionResolver;
use handfield::config::DeviceTier;
use handfield::field::{FrameContext, ParticleField};
use handfield::formation::{FormationCache, FormationKind, FormationRequest};
use handfield::gesture::classify;
use handfield::interaction::Intents;
use handfield::particle::SpawnKind;
use handfield::render::{render_particles, DrawList};
use handfield::synthetic::{Pose, SyntheticHand};

const CANVAS: Vec2 = Vec2::new(1280.0, 720.0);

fn populated(count: usize, rng: &mut SmallRng) -> ParticleField {
    let mut field = ParticleField::new(count);
    while !field.is_full() {
        let pos = Vec2::new(rng.gen::<f32>() * CANVAS.x, rng.gen::<f32>() * CANVAS.y);
        field.spawn(SpawnKind::Draw, pos, rng);
    }
    field
}

fn intents_for(name: &str) -> Intents {
    let center = CANVAS * 0.5;
    let mut intents = Intents::default();
    match name {
        "attract" => intents.attract = Some(center),
        "orbit" => intents.orbit = Some(center),
        "circle" => intents.formation = Some(FormationRequest::new(FormationKind::Circle, center)),
        _ => {}
    }
    intents
}

fn bench_field_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("field_update");

    for name in ["idle", "attract", "orbit", "circle"] {
        for count in [1000, 3000] {
            group.bench_with_input(BenchmarkId::new(name, count), &count, |b, &count| {
                let mut rng = SmallRng::seed_from_u64(1);
                let mut field = populated(count, &mut rng);
                let mut formation = FormationCache::new();
                let intents = intents_for(name);
                let mut frame = 0u64;
                b.iter(|| {
                    frame += 1;
                    let ctx = FrameContext {
                        intents: &intents,
                        canvas: CANVAS,
                        now: Duration::from_millis(frame * 16),
                        tier: DeviceTier::Desktop,
                    };
                    field.update(&ctx, &mut formation, &mut rng);
                    black_box(field.len())
                })
            });
        }
    }

    group.finish();
}

fn bench_collisions(c: &mut Criterion) {
    let mut group = c.benchmark_group("collisions");

    for count in [1000, 3000] {
        group.bench_with_input(BenchmarkId::new("resolve", count), &count, |b, &count| {
            let mut rng = SmallRng::seed_from_u64(2);
            let mut field = populated(count, &mut rng);
            let mut resolver = CollisionResolver::new(14.0, 0.7);
            b.iter(|| black_box(resolver.resolve(field.particles_mut())))
        });
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(3);
    let field = populated(3000, &mut rng);
    let mut list = DrawList::new();

    c.bench_function("render_particles_3000", |b| {
        b.iter(|| {
            render_particles(&mut list, field.particles(), None);
            black_box(list.circles.len())
        })
    });
}

fn bench_classify(c: &mut Criterion) {
    let hands: Vec<_> = Pose::ALL.iter().map(|&p| SyntheticHand::new(p).build()).collect();

    c.bench_function("classify_all_poses", |b| {
        b.iter(|| {
            for hand in &hands {
                black_box(classify(black_box(hand)));
            }
        })
    });
}

criterion_group!(
    benches,
    bench_field_update,
    bench_collisions,
    bench_render,
    bench_classify,
);
criterion_main!(benches);
