//! End-to-end scenarios driven through the public API with synthetic hands.

use std::time::Duration;

use approx::assert_relative_eq;
use handfield::collision::CollisionResolver;
use handfield::config::EngineConfig;
use handfield::field::{ParticleField, BLAST_RADIUS};
use handfield::gesture::{classify, Gesture, PINCH_RATIO};
use handfield::interaction::{Impulse, InteractionState};
use handfield::landmarks::{
    ChannelSource, HandFrame, HandLandmarks, LandmarkSource, ScriptedSource, INDEX_TIP, THUMB_TIP,
};
use handfield::particle::{MotionState, Particle};
use handfield::solid::SolidController;
use handfield::synthetic::{Pose, SyntheticHand};
use handfield::{Engine, EngineMode, SourceError, Vec2};
use rand::rngs::SmallRng;
use rand::SeedableRng;

const CANVAS: Vec2 = Vec2::new(1000.0, 800.0);

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn pair(pose: Pose) -> HandFrame {
    HandFrame::two(
        SyntheticHand::new(pose).at(Vec2::new(0.3, 0.5)).build(),
        SyntheticHand::new(pose).at(Vec2::new(0.7, 0.5)).build(),
    )
}

fn hand_at(pose: Pose, screen: Vec2) -> HandLandmarks {
    SyntheticHand::new(pose).at_screen(screen, CANVAS).build()
}

// ============================================================================
// Classification
// ============================================================================

#[test]
fn test_curled_hand_with_touching_tips_is_pinch_not_fist() {
    let fist = SyntheticHand::new(Pose::Fist).build();
    let threshold = PINCH_RATIO * fist.hand_size();
    let index_tip = fist[INDEX_TIP];

    for step in 0..20 {
        let gap = threshold * step as f32 / 20.0;
        for dir in [Vec2::X, Vec2::Y, Vec2::new(-0.6, 0.8)] {
            let hand = SyntheticHand::new(Pose::Fist)
                .with_landmark(THUMB_TIP, index_tip + dir * gap)
                .build();
            assert_eq!(classify(&hand), Gesture::Pinch, "gap {gap}");
        }
    }

    // Just past the threshold the same hand is a fist again.
    let hand = SyntheticHand::new(Pose::Fist)
        .with_landmark(THUMB_TIP, index_tip + Vec2::X * threshold * 1.2)
        .build();
    assert_ne!(classify(&hand), Gesture::Pinch);
}

// ============================================================================
// Solid swipes and zoom
// ============================================================================

fn count_impulses(xs: &[f32], y: f32) -> (usize, f32) {
    let mut solid = SolidController::new();
    let mut impulses = 0;
    let mut prev = solid.velocity();
    for (i, &x) in xs.iter().enumerate() {
        solid.observe(&hand_at(Pose::Open, Vec2::new(x, y)), CANVAS, ms(i as u64 * 16));
        if solid.velocity() != prev {
            impulses += 1;
        }
        prev = solid.velocity();
    }
    (impulses, solid.velocity().y)
}

#[test]
fn test_swipe_across_zone_emits_one_impulse() {
    let y = CANVAS.y * 0.5;

    let (count, spin) = count_impulses(&[150.0, 300.0, 470.0, 530.0, 700.0, 850.0, 950.0], y);
    assert_eq!(count, 1);
    assert!(spin > 0.0);

    let (count, spin) = count_impulses(&[850.0, 700.0, 530.0, 470.0, 300.0, 150.0, 50.0], y);
    assert_eq!(count, 1);
    assert!(spin < 0.0);
}

#[test]
fn test_swipe_that_backs_out_emits_nothing() {
    let (count, _) = count_impulses(&[150.0, 300.0, 470.0, 490.0, 300.0, 150.0], CANVAS.y * 0.5);
    assert_eq!(count, 0);
}

#[test]
fn test_pinch_held_one_second_zooms_exactly_once() {
    let at = Vec2::new(300.0, 300.0);
    let mut source = ScriptedSource::new();
    source.repeat(HandFrame::one(hand_at(Pose::Pinch, at)), 101);
    source.repeat(HandFrame::one(hand_at(Pose::Open, at)), 150);

    let mut engine = Engine::new(EngineConfig::default().with_seed(5), source);
    engine.set_mode(EngineMode::Solid);
    engine.resize(CANVAS.x, CANVAS.y);
    engine.start(ms(0)).unwrap();

    // Pinch from 0 ms to 1000 ms inclusive.
    let mut t = 0;
    for _ in 0..101 {
        engine.tick(ms(t));
        t += 10;
    }
    assert_eq!(engine.solid().target_scale(), 1.0);

    // Release and keep the hand open well past another second.
    for _ in 0..150 {
        engine.tick(ms(t));
        t += 10;
    }
    assert_relative_eq!(engine.solid().target_scale(), 1.1, epsilon = 1e-6);
}

// ============================================================================
// Particle ceiling
// ============================================================================

/// Cycles through every spawning gesture, 250 frames each.
struct SpawnPressure {
    frame: usize,
}

impl LandmarkSource for SpawnPressure {
    fn open(&mut self) -> Result<(), SourceError> {
        Ok(())
    }

    fn poll(&mut self) -> Option<HandFrame> {
        let phase = (self.frame / 250) % 6;
        self.frame += 1;
        Some(match phase {
            0 => pair(Pose::Peace),
            1 => pair(Pose::Open),
            2 => pair(Pose::Fist),
            3 => HandFrame::one(SyntheticHand::new(Pose::Three).build()),
            4 => pair(Pose::Point),
            _ => pair(Pose::Pinch),
        })
    }
}

#[test]
fn test_particle_ceiling_holds_under_stress() {
    let ceiling = 400;
    let config = EngineConfig::default().with_max_particles(ceiling).with_seed(11);
    let mut engine = Engine::new(config, SpawnPressure { frame: 0 });
    engine.resize(CANVAS.x, CANVAS.y);
    engine.start(ms(0)).unwrap();
    assert!(engine.field().len() <= ceiling);

    let mut peak = 0;
    for i in 1..=10_000u64 {
        engine.tick(ms(i * 16));
        let len = engine.field().len();
        assert!(len <= ceiling, "frame {i}: {len} particles");
        peak = peak.max(len);
    }
    assert_eq!(peak, ceiling);
}

// ============================================================================
// Formation retargeting
// ============================================================================

fn assert_targets_current<S: LandmarkSource>(engine: &Engine<S>) {
    let generation = engine.formation().generation();
    let mut assigned = 0;
    for p in engine.field().particles() {
        if let MotionState::Formation { generation: g, .. } = p.motion {
            assert_eq!(g, generation, "particle kept a stale target");
            assigned += 1;
        }
    }
    assert!(assigned > 0);
}

#[test]
fn test_formation_change_reassigns_every_target() {
    let mut source = ScriptedSource::new();
    source.repeat(pair(Pose::Peace), 30);
    source.repeat(pair(Pose::Point), 30);
    source.repeat(HandFrame::one(SyntheticHand::new(Pose::Point).build()), 30);

    let config = EngineConfig::default()
        .with_seed(2)
        .with_site_name("HANDS")
        .with_phrases(["HELLO", "WORLD"]);
    let mut engine = Engine::new(config, source);
    engine.resize(CANVAS.x, CANVAS.y);
    engine.start(ms(0)).unwrap();

    let mut t = 0;
    let mut generations = Vec::new();
    for _ in 0..3 {
        for _ in 0..30 {
            t += 16;
            engine.tick(ms(t));
            assert_targets_current(&engine);
        }
        generations.push(engine.formation().generation());
    }
    assert!(generations.windows(2).all(|w| w[1] > w[0]));
}

// ============================================================================
// Collisions
// ============================================================================

#[test]
fn test_collision_pass_leaves_separated_particles_alone() {
    let mut particles: Vec<Particle> = (0..10)
        .flat_map(|i| (0..10).map(move |j| (i, j)))
        .map(|(i, j)| {
            let mut p = Particle::new(Vec2::new(100.0 + i as f32 * 6.0, 100.0 + j as f32 * 6.0));
            p.size = 2.5;
            p.vel = Vec2::new(0.3, -0.2);
            p
        })
        .collect();
    let before = particles.clone();

    let mut resolver = CollisionResolver::new(14.0, 0.7);
    for _ in 0..3 {
        assert_eq!(resolver.resolve(&mut particles), 0);
    }
    assert_eq!(particles, before);
}

// ============================================================================
// Fist release blast
// ============================================================================

#[test]
fn test_fist_then_open_blasts_nearby_particles() {
    let mut rng = SmallRng::seed_from_u64(9);
    let config = EngineConfig::default();
    let mut state = InteractionState::new();
    let fist = SyntheticHand::new(Pose::Fist).build();
    let palm = fist.palm_screen(CANVAS);

    let mut t = 0;
    for _ in 0..60 {
        t += 16;
        let impulses = state.update(&HandFrame::one(fist), CANVAS, ms(t), &config, &mut rng);
        assert!(!impulses.iter().any(|i| matches!(i, Impulse::Blast { .. })));
    }
    let open = HandFrame::one(SyntheticHand::new(Pose::Open).build());
    let impulses = state.update(&open, CANVAS, ms(t + 16), &config, &mut rng);
    let blast = impulses
        .iter()
        .find(|i| matches!(i, Impulse::Blast { .. }))
        .expect("fist release should blast");
    assert_eq!(blast, &Impulse::Blast { center: palm });

    let mut field = ParticleField::new(100);
    for dist in [100.0, 300.0, 500.0, BLAST_RADIUS + 100.0] {
        assert!(field.push(Particle::new(palm + Vec2::new(dist, 0.0))));
    }
    assert!(field.apply_impulse(blast, &mut rng));

    let speeds: Vec<f32> = field.particles().iter().map(|p| p.vel.x).collect();
    assert!(speeds[0] > speeds[1] && speeds[1] > speeds[2] && speeds[2] > 0.0);
    assert_eq!(field.particles()[3].vel, Vec2::ZERO);
    // Pushed straight away from the palm.
    assert!(field.particles()[..3].iter().all(|p| p.vel.y == 0.0));
}

#[test]
fn test_engine_shows_blast_marker() {
    let mut source = ScriptedSource::new();
    source.repeat(HandFrame::one(SyntheticHand::new(Pose::Fist).build()), 60);
    source.push(HandFrame::one(SyntheticHand::new(Pose::Open).build()));

    let mut engine = Engine::new(EngineConfig::default().with_seed(4), source);
    engine.resize(CANVAS.x, CANVAS.y);
    engine.start(ms(0)).unwrap();
    for i in 1..=61 {
        engine.tick(ms(i * 16));
    }
    let marker = engine.blast_marker().expect("blast marker");
    assert_eq!(marker.center, Vec2::new(500.0, 400.0));
    assert!(!engine.draw_list().rings.is_empty());

    // Gone after its 500 ms lifetime.
    engine.tick(ms(61 * 16 + 600));
    assert!(engine.blast_marker().is_none());
}

// ============================================================================
// No hands at all
// ============================================================================

#[test]
fn test_session_without_hands_keeps_idling() {
    let mut source = ScriptedSource::new();
    source.repeat(HandFrame::empty(), 300);
    // Followed by tracker silence.

    let config = EngineConfig::default().with_seed(8).with_max_particles(20_000);
    let mut engine = Engine::new(config, source);
    engine.resize(CANVAS.x, CANVAS.y);
    engine.start(ms(0)).unwrap();
    let seeded = engine.field().len();
    let start: Vec<Vec2> = engine.field().particles().iter().map(|p| p.pos).collect();

    for i in 1..=600 {
        let list = engine.tick(ms(i * 16)).expect("running");
        assert!(!list.circles.is_empty());
        assert!(engine.intents().is_idle());
    }

    assert!(engine.field().len() > seeded, "ambient particles should trickle in");
    let moved = engine
        .field()
        .particles()
        .iter()
        .zip(&start)
        .filter(|(p, s)| p.pos.distance(**s) > 0.5)
        .count();
    assert!(moved > seeded / 2);
}

#[test]
fn test_solid_without_hands_spins_idly() {
    let mut engine = Engine::new(EngineConfig::default().with_seed(8), ScriptedSource::new());
    engine.set_mode(EngineMode::Solid);
    engine.start(ms(0)).unwrap();
    let yaw = engine.solid().rotation().y;
    for i in 1..=60 {
        let list = engine.tick(ms(i * 16)).expect("running");
        assert!(!list.circles.is_empty());
    }
    assert!(engine.solid().rotation().y > yaw);
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
fn test_destroy_releases_the_landmark_stream() {
    let (tx, source) = ChannelSource::pair();
    let mut engine = Engine::new(EngineConfig::default().with_seed(3), source);
    engine.resize(CANVAS.x, CANVAS.y);
    engine.start(ms(0)).unwrap();
    tx.send(HandFrame::one(hand_at(Pose::Open, CANVAS * 0.5))).unwrap();
    engine.tick(ms(16));

    engine.destroy();

    // The engine is still alive, but the stream is not.
    let accepted = (0..10_000).filter(|_| tx.send(HandFrame::empty()).is_ok()).count();
    assert_eq!(accepted, 0);
    assert!(engine.tick(ms(32)).is_none());
}
