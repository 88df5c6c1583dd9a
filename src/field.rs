//! The live particle set and its per-frame update.
//!
//! Each frame the field steers particles according to the active
//! [`Intents`], in priority order:
//!
//! 1. **Formation**: spring toward an assigned point of the formation cloud.
//! 2. **Orbit**: capture into a tilted planet-and-ring around the two-hand
//!    midpoint, or spiral in from outside the capture zone.
//! 3. **Attract**: swirl toward the palm, with an orbit correction close in.
//! 4. **Idle**: depth-scaled jitter and a slow depth wave.
//!
//! Afterwards velocities are clamped, positions integrated, and expired or
//! far off-canvas particles removed. The particle count never exceeds the
//! configured ceiling: spawns past it are silently dropped.
//!
//! One-shot [`Impulse`]s from the gesture layer are applied separately with
//! [`ParticleField::apply_impulse`].

use std::f32::consts::{FRAC_PI_2, PI, TAU};
use std::time::Duration;

use glam::{Vec2, Vec3};
use image::GrayImage;
use rand::Rng;

use crate::config::DeviceTier;
use crate::formation::FormationCache;
use crate::glyphs;
use crate::interaction::{Impulse, Intents};
use crate::landmarks::{INDEX_MCP, LANDMARK_COUNT, MIDDLE_MCP, PINKY_MCP, RING_MCP, THUMB_CMC, WRIST};
use crate::particle::{random_direction, MotionState, OrbitRole, Particle, SpawnKind};

// ============================================================================
// Tuning
// ============================================================================

/// Velocity clamp, px per frame.
pub const MAX_SPEED: f32 = 18.0;

const FORMATION_DAMPING: f32 = 0.82;
const FORMATION_DEPTH_EASE: f32 = 0.05;

const ORBIT_DAMPING: f32 = 0.91;
const ORBIT_TILT: f32 = -0.35;
/// Orbit angular speed, radians per millisecond.
const ORBIT_SPIN: f32 = 0.0008;
const ORBIT_RING_SHARE: f64 = 0.4;

const ATTRACT_DAMPING: f32 = 0.92;
const ATTRACT_SWIRL: f32 = 0.4;
const ATTRACT_CORE: f32 = 30.0;

const EPHEMERAL_GRAVITY: f32 = 0.03;
const EPHEMERAL_DRAG: f32 = 0.992;
const PERMANENT_DRAG: f32 = 0.93;
const JITTER: f32 = 0.08;
const JITTER_LIFT: f32 = 0.015;

const SNOW_GRAVITY: f32 = 0.3;
const SNOW_DRAG: f32 = 0.995;

const REPEL_SOLID: f32 = 42.0;
const REPEL_SOFT: f32 = 140.0;
const PALM_KICK: f32 = 8.0;

pub const BLAST_RADIUS: f32 = 600.0;

const RIBBON_ROW_GAP: f32 = 3.0;
const RIBBON_DAMPING: f32 = 0.82;

/// How often ambient particles trickle in.
pub const AMBIENT_INTERVAL: Duration = Duration::from_millis(2000);
const AMBIENT_COUNT: usize = 2;

/// Bones the repel pass collides against, plus palm cross-braces.
#[rustfmt::skip]
pub const HAND_SEGMENTS: [(usize, usize); 27] = [
    (0, 1), (1, 2), (2, 3), (3, 4), (0, 5), (5, 6), (6, 7), (7, 8),
    (5, 9), (9, 10), (10, 11), (11, 12), (9, 13), (13, 14), (14, 15), (15, 16),
    (13, 17), (17, 18), (18, 19), (19, 20), (0, 17),
    (1, 5), (0, 9), (5, 13), (5, 17), (1, 9), (9, 17),
];

/// Landmarks outlining the palm.
pub const PALM_POLYGON: [usize; 6] = [WRIST, THUMB_CMC, INDEX_MCP, MIDDLE_MCP, RING_MCP, PINKY_MCP];

/// Orbit geometry for one device tier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitGeometry {
    pub body_radius: f32,
    pub ring_inner: f32,
    pub ring_outer: f32,
}

impl OrbitGeometry {
    pub fn for_tier(tier: DeviceTier) -> Self {
        Self {
            body_radius: tier.pick(80.0, 45.0),
            ring_inner: tier.pick(150.0, 85.0),
            ring_outer: tier.pick(220.0, 125.0),
        }
    }

    /// Particles closer than this are captured into the orbit.
    pub fn capture_radius(&self) -> f32 {
        self.ring_outer * 2.0
    }

    /// Captured particles further than this are released.
    pub fn release_radius(&self) -> f32 {
        self.capture_radius() * 1.3
    }
}

/// Everything a frame update needs besides the particles.
#[derive(Clone, Copy, Debug)]
pub struct FrameContext<'a> {
    pub intents: &'a Intents,
    pub canvas: Vec2,
    pub now: Duration,
    pub tier: DeviceTier,
}

impl FrameContext<'_> {
    #[inline]
    fn now_ms(&self) -> f32 {
        self.now.as_secs_f32() * 1000.0
    }
}

// ============================================================================
// ParticleField
// ============================================================================

/// The mutable particle set.
#[derive(Debug)]
pub struct ParticleField {
    particles: Vec<Particle>,
    max_particles: usize,
    last_ambient: Duration,
}

impl ParticleField {
    pub fn new(max_particles: usize) -> Self {
        Self {
            particles: Vec::with_capacity(max_particles),
            max_particles,
            last_ambient: Duration::ZERO,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    #[inline]
    pub fn max_particles(&self) -> usize {
        self.max_particles
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.particles.len() >= self.max_particles
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    /// Add an already built particle. Returns `false` at the ceiling.
    pub fn push(&mut self, particle: Particle) -> bool {
        if self.is_full() {
            return false;
        }
        self.particles.push(particle);
        true
    }

    /// Spawn one particle of `kind`. Returns `false` at the ceiling.
    pub fn spawn<R: Rng>(&mut self, kind: SpawnKind, pos: Vec2, rng: &mut R) -> bool {
        if self.is_full() {
            return false;
        }
        self.particles.push(Particle::spawn(kind, pos, rng));
        true
    }

    /// Rasterise `text` across the whole canvas and seed one permanent
    /// particle per lit sample. Returns how many were spawned.
    ///
    /// Canvases larger than [`glyphs::MAX_MASK_SIDE`] are rasterised in a
    /// centred window of that size.
    pub fn spawn_text<R: Rng>(&mut self, text: &str, canvas: Vec2, rng: &mut R) -> usize {
        let area = canvas.clamp(Vec2::ONE, Vec2::splat(glyphs::MAX_MASK_SIDE as f32));
        let mut mask = GrayImage::new(area.x as u32, area.y as u32);
        let font_size = (area.x * 0.108).min(area.y * 0.21);
        let cell = (font_size * 0.1).min(glyphs::fit_cell_size(text, area.x * 0.95, area.y));
        glyphs::draw_text(&mut mask, text, area * 0.5, cell);

        let offset = ((canvas - area) * 0.5).max(Vec2::ZERO);
        let samples: Vec<Vec2> = glyphs::sample_mask(&mask, 4, 128)
            .into_iter()
            .map(|p| p + offset)
            .collect();
        if samples.is_empty() {
            return 0;
        }
        let (min, max) = samples
            .iter()
            .fold((Vec2::splat(f32::MAX), Vec2::splat(f32::MIN)), |(lo, hi), p| {
                (lo.min(*p), hi.max(*p))
            });
        let extent = (max - min).max(Vec2::ONE);

        let mut spawned = 0;
        for pt in samples {
            let n = (pt - min) / extent;
            let base_depth = 0.5 + 0.4 * (n.x * PI * 2.5).sin();
            let noise = (rng.gen::<f32>() - 0.5) * 0.08;
            let depth = (base_depth + noise + n.y * 0.1).clamp(0.05, 0.98);
            if !self.spawn(SpawnKind::Text { depth, base_depth }, pt, rng) {
                break;
            }
            spawned += 1;
        }
        spawned
    }

    /// Trickle in ambient particles every [`AMBIENT_INTERVAL`].
    pub fn spawn_ambient<R: Rng>(&mut self, now: Duration, canvas: Vec2, rng: &mut R) {
        if now.saturating_sub(self.last_ambient) <= AMBIENT_INTERVAL {
            return;
        }
        self.last_ambient = now;
        for _ in 0..AMBIENT_COUNT {
            let pos = Vec2::new(rng.gen::<f32>() * canvas.x, rng.gen::<f32>() * canvas.y);
            self.spawn(SpawnKind::Draw, pos, rng);
        }
    }

    /// Restart the ambient timer.
    pub fn reset_ambient(&mut self, now: Duration) {
        self.last_ambient = now;
    }

    // ------------------------------------------------------------------------
    // Impulses
    // ------------------------------------------------------------------------

    /// Apply a one-shot effect. Returns `true` if any particle was affected.
    pub fn apply_impulse<R: Rng>(&mut self, impulse: &Impulse, rng: &mut R) -> bool {
        match impulse {
            Impulse::Repel { skeleton } => {
                self.repel_from_hand(skeleton, rng);
                !self.particles.is_empty()
            }
            Impulse::Blast { center } => self.blast(*center, rng),
            Impulse::Ribbon { trail, wind } => {
                self.pull_onto_ribbon(trail, *wind);
                !self.particles.is_empty()
            }
            Impulse::Burst { center, count } => {
                let mut any = false;
                for _ in 0..*count {
                    any |= self.spawn(SpawnKind::Burst, *center, rng);
                }
                any
            }
        }
    }

    /// Push particles out of a hand silhouette given in canvas pixels.
    pub fn repel_from_hand<R: Rng>(&mut self, skeleton: &[Vec2; LANDMARK_COUNT], rng: &mut R) {
        let palm_poly = PALM_POLYGON.map(|i| skeleton[i]);
        let palm_center = palm_poly.iter().copied().sum::<Vec2>() / palm_poly.len() as f32;

        for p in &mut self.particles {
            if point_in_polygon(p.pos, &palm_poly) {
                let away = p.pos - palm_center;
                let dist = away.length();
                if dist > 0.01 {
                    let n = away / dist;
                    p.vel += n * PALM_KICK;
                    p.pos += n * 6.0;
                } else {
                    p.vel += random_direction(rng) * PALM_KICK;
                }
                continue;
            }

            let mut min_dist = f32::INFINITY;
            let mut normal = Vec2::ZERO;
            for &(a, b) in &HAND_SEGMENTS {
                let closest = closest_point_on_segment(p.pos, skeleton[a], skeleton[b]);
                let d = p.pos - closest;
                let dist = d.length();
                if dist < min_dist {
                    min_dist = dist;
                    normal = if dist > 0.01 { d / dist } else { Vec2::ZERO };
                }
            }

            // Always push away from the palm side of the bone.
            if normal.dot(p.pos - palm_center) < 0.0 {
                normal = -normal;
            }

            if min_dist < REPEL_SOLID && min_dist > 0.01 {
                let push = REPEL_SOLID - min_dist;
                p.pos += normal * push * 0.5;
                let approach = p.vel.dot(normal);
                if approach < 0.0 {
                    p.vel -= 1.8 * approach * normal;
                }
                p.vel += normal * 3.0;
            } else if min_dist < REPEL_SOFT {
                let falloff = (REPEL_SOFT - min_dist) / (REPEL_SOFT - REPEL_SOLID);
                p.vel += normal * falloff * falloff * 4.0;
            }
        }
    }

    /// Radial kick within [`BLAST_RADIUS`] of `center`, stronger close in.
    pub fn blast<R: Rng>(&mut self, center: Vec2, rng: &mut R) -> bool {
        let mut hit = false;
        for p in &mut self.particles {
            let d = p.pos - center;
            let dist = d.length();
            if dist > 1.0 && dist < BLAST_RADIUS {
                hit = true;
                let falloff = (1.0 - dist / BLAST_RADIUS).max(0.1);
                let force = (20.0 + rng.gen::<f32>() * 12.0) * falloff;
                p.vel += d / dist * force;
            }
        }
        hit
    }

    /// Pull all particles onto a two-row ribbon laid along `trail`, evenly by
    /// arc length, newest end first, with a travelling flutter.
    pub fn pull_onto_ribbon(&mut self, trail: &[Vec2], wind: f32) {
        let Some(&last) = trail.last() else {
            return;
        };

        let mut lengths = Vec::with_capacity(trail.len());
        lengths.push(0.0f32);
        for w in trail.windows(2) {
            let prev = lengths[lengths.len() - 1];
            lengths.push(prev + w[0].distance(w[1]));
        }
        let total_len = lengths[lengths.len() - 1];
        let total = if total_len > 0.0 { total_len } else { 1.0 };
        let end = trail.len() - 1;

        let count = self.particles.len();
        let half = count.div_ceil(2);

        for (i, p) in self.particles.iter_mut().enumerate() {
            let row = i % 2;
            let idx = i / 2;
            let t = if half > 1 { idx as f32 / (half - 1) as f32 } else { 0.5 };
            let back = (1.0 - t) * total;

            let mut seg = 0;
            for j in (1..=end).rev() {
                if lengths[end] - lengths[j] >= back {
                    seg = j;
                    break;
                }
            }
            let anchor = if trail.len() == 1 { last } else { trail[seg] };

            let mut perp = Vec2::Y;
            if seg < end {
                let dir = trail[seg + 1] - trail[seg];
                let len = dir.length();
                if len > 0.5 {
                    perp = Vec2::new(-dir.y, dir.x) / len;
                }
            }

            let flutter = (t * 8.0 + wind).sin() * t * 8.0 + (t * 14.0 + wind * 1.5).sin() * t * 3.0;
            let row_offset = if row == 0 { RIBBON_ROW_GAP } else { -RIBBON_ROW_GAP };
            let target = anchor + perp * (flutter + row_offset);

            let d = target - p.pos;
            let dist = d.length();
            let pull = if dist > 300.0 {
                0.07
            } else if dist > 100.0 {
                0.1
            } else {
                0.15
            };
            p.vel += d * pull;
            p.vel *= RIBBON_DAMPING;
        }
    }

    // ------------------------------------------------------------------------
    // Frame update
    // ------------------------------------------------------------------------

    /// Advance every particle one frame.
    pub fn update<R: Rng>(&mut self, ctx: &FrameContext<'_>, formation: &mut FormationCache, rng: &mut R) {
        let intents = ctx.intents;

        match &intents.formation {
            Some(request) => {
                if formation.ensure(&request.kind, ctx.canvas, ctx.tier, self.max_particles) {
                    for p in &mut self.particles {
                        if matches!(p.motion, MotionState::Formation { .. }) {
                            p.motion = MotionState::Idle;
                        }
                    }
                }
                let needed = formation.points().len().saturating_sub(self.particles.len());
                for _ in 0..needed {
                    if !self.spawn(SpawnKind::Formation, request.anchor, rng) {
                        break;
                    }
                }
            }
            None => formation.clear(),
        }

        if intents.snow {
            let count = ctx.tier.pick(30, 15);
            for _ in 0..count {
                let pos = Vec2::new(rng.gen::<f32>() * ctx.canvas.x, -10.0 - rng.gen::<f32>() * 60.0);
                if !self.spawn(SpawnKind::Snow, pos, rng) {
                    break;
                }
            }
        }

        let orbit = OrbitGeometry::for_tier(ctx.tier);
        let points = formation.points();
        let generation = formation.generation();
        let steering = intents.is_steering();
        let now_ms = ctx.now_ms();

        for i in 0..self.particles.len() {
            let p = &mut self.particles[i];
            let zf = p.depth_factor();

            if p.life > 0.3 {
                let pos = p.pos;
                if let Some(trail) = &mut p.trail {
                    trail.push(pos);
                }
            }

            if intents.snow && !steering {
                let floor = ctx.canvas.y - p.size * 2.0;
                if p.pos.y < floor {
                    p.vel.y += SNOW_GRAVITY;
                    p.vel.x += (rng.gen::<f32>() - 0.5) * 0.15;
                    p.vel.y *= SNOW_DRAG;
                } else {
                    p.pos.y = floor;
                    p.vel.y = 0.0;
                    p.vel.x *= 0.9;
                }
            }

            match (&intents.formation, intents.orbit, intents.attract) {
                (Some(request), _, _) if !points.is_empty() => {
                    steer_formation(p, i, request.anchor, points, generation, ctx.canvas, rng);
                }
                (_, Some(center), _) => steer_orbit(p, center, &orbit, zf, now_ms, rng),
                (_, None, Some(target)) => steer_attract(p, target, zf),
                _ => {}
            }

            integrate(p, ctx, steering, now_ms, rng);
        }

        let canvas = ctx.canvas;
        self.particles
            .retain(|p| !p.is_expired() && !p.is_out_of_bounds(canvas));
    }
}

// ============================================================================
// Steering
// ============================================================================

fn steer_formation<R: Rng>(
    p: &mut Particle,
    index: usize,
    anchor: Vec2,
    points: &[Vec2],
    generation: u64,
    canvas: Vec2,
    rng: &mut R,
) {
    let (offset, depth) = match p.motion {
        MotionState::Formation { offset, depth, generation: g } if g == generation => (offset, depth),
        _ => {
            let offset = points[index % points.len()];
            let wave = (offset.x / (canvas.x * 0.45) * PI * 2.5).sin();
            let depth = (0.7 + 0.2 * wave + (rng.gen::<f32>() - 0.5) * 0.06).clamp(0.45, 0.95);
            p.motion = MotionState::Formation {
                offset,
                depth,
                generation,
            };
            (offset, depth)
        }
    };

    let d = anchor + offset - p.pos;
    let dist = d.length();
    let pull = if dist > 200.0 {
        0.06
    } else if dist > 50.0 {
        0.10
    } else {
        0.14
    };
    p.vel += d * pull;
    p.vel *= FORMATION_DAMPING;
    p.z += (depth - p.z) * FORMATION_DEPTH_EASE;
}

fn steer_orbit<R: Rng>(p: &mut Particle, center: Vec2, geo: &OrbitGeometry, zf: f32, now_ms: f32, rng: &mut R) {
    if matches!(p.motion, MotionState::Formation { .. }) {
        p.motion = MotionState::Idle;
    }

    let d = center - p.pos;
    let dist = d.length();
    let capture = geo.capture_radius();

    if dist < capture && !matches!(p.motion, MotionState::Orbit { .. }) {
        let role = if rng.gen_bool(ORBIT_RING_SHARE) {
            OrbitRole::Ring
        } else {
            OrbitRole::Body
        };
        p.motion = MotionState::Orbit {
            role,
            phi: (2.0 * rng.gen::<f32>() - 1.0).clamp(-1.0, 1.0).acos(),
            theta: rng.gen::<f32>() * TAU,
        };
    }
    if dist >= geo.release_radius() {
        p.motion = MotionState::Idle;
    }

    if let MotionState::Orbit { role, phi, theta } = p.motion {
        let theta = theta + now_ms * ORBIT_SPIN;
        let (sin_t, cos_t) = ORBIT_TILT.sin_cos();
        let (local, radius) = match role {
            OrbitRole::Ring => {
                let r = geo.ring_inner + phi / PI * (geo.ring_outer - geo.ring_inner);
                (Vec3::new(r * theta.cos(), 0.0, r * theta.sin()), geo.ring_outer)
            }
            OrbitRole::Body => {
                let r = geo.body_radius;
                (
                    Vec3::new(r * phi.sin() * theta.cos(), r * phi.cos(), r * phi.sin() * theta.sin()),
                    r,
                )
            }
        };
        let target = center + Vec2::new(local.x, local.y * cos_t - local.z * sin_t);
        let target_z = 0.5 + (local.y * sin_t + local.z * cos_t) / radius * 0.47;

        let influence = (1.0 - dist / capture).max(0.2);
        let pull = (0.04 + 0.08 * influence) * zf;
        p.vel += (target - p.pos) * pull;
        p.z += (target_z - p.z) * (0.05 + 0.1 * influence);
    } else if dist > 5.0 {
        let strength = (600.0 / (dist + 10.0)).min(3.5) * zf;
        let spiral = 0.5 * (80.0 / (dist + 20.0)).min(1.0);
        let angle = d.y.atan2(d.x) + spiral;
        p.vel += Vec2::from_angle(angle) * strength;
    }
    p.vel *= ORBIT_DAMPING;
}

fn steer_attract(p: &mut Particle, target: Vec2, zf: f32) {
    p.motion = MotionState::Idle;

    let d = target - p.pos;
    let dist = d.length();
    if dist > 3.0 {
        let strength = (130.0 / (dist + 15.0)).min(2.0) * zf;
        p.vel += Vec2::from_angle(d.y.atan2(d.x) + ATTRACT_SWIRL) * strength;
    }
    p.vel *= ATTRACT_DAMPING;

    if dist < ATTRACT_CORE {
        let out_angle = (p.pos.y - target.y).atan2(p.pos.x - target.x);
        let push_out = (ATTRACT_CORE - dist) * 0.1 * zf;
        p.vel += Vec2::from_angle(out_angle) * push_out;
        p.vel += Vec2::from_angle(out_angle + FRAC_PI_2) * 0.5 * zf;
    }
}

fn integrate<R: Rng>(p: &mut Particle, ctx: &FrameContext<'_>, steering: bool, now_ms: f32, rng: &mut R) {
    let speed = p.vel.length();
    if speed > MAX_SPEED {
        p.vel *= MAX_SPEED / speed;
    }
    if !p.vel.is_finite() {
        p.vel = random_direction(rng);
    }
    p.pos += p.vel;

    if p.permanent {
        let zf = p.depth_factor();
        p.vel *= PERMANENT_DRAG;
        p.vel.x += (rng.gen::<f32>() - 0.5) * JITTER * zf;
        p.vel.y += ((rng.gen::<f32>() - 0.5) * JITTER - JITTER_LIFT) * zf;

        if !steering {
            p.motion = MotionState::Idle;
        }
        match p.base_depth {
            Some(base) if !steering && ctx.intents.formation.is_none() => {
                let wave = ((base - 0.5) * TAU + now_ms * 0.0006).sin();
                let target = 0.5 + 0.42 * wave;
                p.z += (target - p.z) * 0.02;
            }
            _ => {
                p.z = (p.z + (rng.gen::<f32>() - 0.5) * 0.012).clamp(0.02, 1.0);
            }
        }
    } else {
        p.vel.y += EPHEMERAL_GRAVITY;
        p.vel *= EPHEMERAL_DRAG;
        p.life -= p.decay;
        p.alpha = p.life.max(0.0);
    }

    p.z = p.z.clamp(0.0, 1.0);
}

// ============================================================================
// Geometry helpers
// ============================================================================

fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < 0.001 {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

fn point_in_polygon(p: Vec2, vertices: &[Vec2]) -> bool {
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (vi, vj) = (vertices[i], vertices[j]);
        if (vi.y > p.y) != (vj.y > p.y) && p.x < (vj.x - vi.x) * (p.y - vi.y) / (vj.y - vi.y) + vi.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formation::{FormationKind, FormationRequest};
    use crate::landmarks::INDEX_TIP;
    use crate::synthetic::{Pose, SyntheticHand};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    const CANVAS: Vec2 = Vec2::new(1000.0, 800.0);

    fn ctx(intents: &Intents, ms: u64) -> FrameContext<'_> {
        FrameContext {
            intents,
            canvas: CANVAS,
            now: Duration::from_millis(ms),
            tier: DeviceTier::Desktop,
        }
    }

    fn field_with(n: usize, rng: &mut SmallRng) -> ParticleField {
        let mut field = ParticleField::new(3000);
        for _ in 0..n {
            let pos = Vec2::new(rng.gen::<f32>() * CANVAS.x, rng.gen::<f32>() * CANVAS.y);
            field.spawn(SpawnKind::Draw, pos, rng);
        }
        field
    }

    #[test]
    fn test_spawn_respects_ceiling() {
        let mut rng = SmallRng::seed_from_u64(0);
        let mut field = ParticleField::new(10);
        for _ in 0..50 {
            field.spawn(SpawnKind::Draw, Vec2::ZERO, &mut rng);
        }
        assert_eq!(field.len(), 10);
        assert!(!field.spawn(SpawnKind::Draw, Vec2::ZERO, &mut rng));
    }

    #[test]
    fn test_spawn_text_seeds_permanent_particles() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut field = ParticleField::new(3000);
        let n = field.spawn_text("KATOV", CANVAS, &mut rng);
        assert!(n > 100);
        assert!(field.particles().iter().all(|p| p.permanent && p.base_depth.is_some()));
    }

    #[test]
    fn test_spawn_text_on_huge_canvas_stays_centred() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut field = ParticleField::new(3000);
        let canvas = Vec2::new(1.0e6, 5.0e5);
        let n = field.spawn_text("KATOV", canvas, &mut rng);
        assert!(n > 0);
        let mean = field.particles().iter().map(|p| p.pos).sum::<Vec2>() / n as f32;
        assert!((mean - canvas * 0.5).length() < glyphs::MAX_MASK_SIDE as f32);
    }

    #[test]
    fn test_ambient_trickle() {
        let mut rng = SmallRng::seed_from_u64(2);
        let mut field = ParticleField::new(3000);
        field.spawn_ambient(Duration::from_millis(1000), CANVAS, &mut rng);
        assert_eq!(field.len(), 0);
        field.spawn_ambient(Duration::from_millis(2100), CANVAS, &mut rng);
        assert_eq!(field.len(), 2);
        field.spawn_ambient(Duration::from_millis(2200), CANVAS, &mut rng);
        assert_eq!(field.len(), 2);
    }

    #[test]
    fn test_idle_keeps_depth_in_range() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut field = field_with(200, &mut rng);
        let mut cache = FormationCache::new();
        let intents = Intents::default();
        for frame in 0..300 {
            field.update(&ctx(&intents, frame * 16), &mut cache, &mut rng);
        }
        assert!(!field.is_empty());
        for p in field.particles() {
            assert!((0.0..=1.0).contains(&p.z));
            assert!(p.vel.length() <= MAX_SPEED + 1.0);
        }
    }

    #[test]
    fn test_ephemeral_particles_expire() {
        let mut rng = SmallRng::seed_from_u64(4);
        let mut field = ParticleField::new(100);
        for _ in 0..20 {
            field.spawn(SpawnKind::Burst, CANVAS * 0.5, &mut rng);
        }
        let mut cache = FormationCache::new();
        let intents = Intents::default();
        for frame in 0..200 {
            field.update(&ctx(&intents, frame * 16), &mut cache, &mut rng);
        }
        assert!(field.is_empty());
    }

    #[test]
    fn test_formation_pulls_particles_to_targets() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut field = ParticleField::new(3000);
        let mut cache = FormationCache::new();
        let anchor = CANVAS * 0.5;
        let intents = Intents {
            formation: Some(FormationRequest::new(FormationKind::Circle, anchor)),
            ..Intents::default()
        };
        for frame in 0..200 {
            field.update(&ctx(&intents, frame * 16), &mut cache, &mut rng);
        }
        assert!(field.len() >= cache.points().len());
        let radius = CANVAS.min_element() * 0.2;
        let on_ring = field
            .particles()
            .iter()
            .filter(|p| ((p.pos - anchor).length() - radius).abs() < 10.0)
            .count();
        assert!(on_ring as f32 > field.len() as f32 * 0.8);
    }

    #[test]
    fn test_attract_gathers_particles() {
        let mut rng = SmallRng::seed_from_u64(6);
        let mut field = field_with(300, &mut rng);
        let mut cache = FormationCache::new();
        let target = Vec2::new(300.0, 300.0);
        let intents = Intents {
            attract: Some(target),
            ..Intents::default()
        };
        let before: f32 = field.particles().iter().map(|p| p.pos.distance(target)).sum();
        for frame in 0..300 {
            field.update(&ctx(&intents, frame * 16), &mut cache, &mut rng);
        }
        let after: f32 = field.particles().iter().map(|p| p.pos.distance(target)).sum();
        assert!(after < before * 0.6);
    }

    #[test]
    fn test_orbit_captures_nearby_particles() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut field = ParticleField::new(3000);
        let center = CANVAS * 0.5;
        for _ in 0..200 {
            field.spawn(SpawnKind::Draw, center + random_direction(&mut rng) * 100.0, &mut rng);
        }
        let mut cache = FormationCache::new();
        let intents = Intents {
            orbit: Some(center),
            ..Intents::default()
        };
        field.update(&ctx(&intents, 0), &mut cache, &mut rng);
        let captured = field
            .particles()
            .iter()
            .filter(|p| matches!(p.motion, MotionState::Orbit { .. }))
            .count();
        assert_eq!(captured, field.len());
        let rings = field
            .particles()
            .iter()
            .filter(|p| matches!(p.motion, MotionState::Orbit { role: OrbitRole::Ring, .. }))
            .count();
        assert!(rings > 40 && rings < 120, "ring share {rings}/200");
    }

    #[test]
    fn test_snow_settles_on_floor() {
        let mut rng = SmallRng::seed_from_u64(8);
        let mut field = ParticleField::new(500);
        let mut cache = FormationCache::new();
        let intents = Intents {
            snow: true,
            ..Intents::default()
        };
        for frame in 0..200 {
            field.update(&ctx(&intents, frame * 16), &mut cache, &mut rng);
        }
        assert_eq!(field.len(), 500);
        let settled = field
            .particles()
            .iter()
            .filter(|p| p.pos.y > CANVAS.y - 10.0)
            .count();
        assert!(settled > 250);
    }

    #[test]
    fn test_blast_scales_with_distance() {
        let mut rng = SmallRng::seed_from_u64(9);
        let mut field = ParticleField::new(10);
        let center = Vec2::new(500.0, 400.0);
        field.push(Particle::new(center + Vec2::new(50.0, 0.0)));
        field.push(Particle::new(center + Vec2::new(500.0, 0.0)));
        field.push(Particle::new(center + Vec2::new(0.0, 700.0)));
        assert!(field.blast(center, &mut rng));

        let p = field.particles();
        assert!(p[0].vel.x > p[1].vel.x);
        assert!(p[1].vel.x > 0.0);
        assert_eq!(p[2].vel, Vec2::ZERO);
    }

    #[test]
    fn test_repel_pushes_particles_off_the_hand() {
        let mut rng = SmallRng::seed_from_u64(10);
        let hand = SyntheticHand::new(Pose::Open).build();
        let skeleton = hand.screen_points(CANVAS);
        let mut field = ParticleField::new(10);
        // Just beside the index fingertip.
        let start = skeleton[INDEX_TIP] + Vec2::new(5.0, 0.0);
        field.push(Particle::new(start));
        field.repel_from_hand(&skeleton, &mut rng);
        let p = &field.particles()[0];
        assert!(p.vel.length() > 1.0);
        assert!(p.pos.distance(skeleton[INDEX_TIP]) > 5.0);
    }

    #[test]
    fn test_ribbon_lines_particles_along_trail() {
        let mut field = ParticleField::new(100);
        for i in 0..40 {
            field.push(Particle::new(Vec2::new(i as f32 * 10.0, 600.0)));
        }
        let trail: Vec<Vec2> = (0..20).map(|i| Vec2::new(100.0 + i as f32 * 20.0, 200.0)).collect();
        for _ in 0..60 {
            field.pull_onto_ribbon(&trail, 0.0);
            for p in field.particles_mut() {
                p.pos += p.vel;
            }
        }
        for p in field.particles() {
            assert!((p.pos.y - 200.0).abs() < 30.0, "{:?}", p.pos);
        }
    }

    #[test]
    fn test_point_in_polygon() {
        let square = [
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
        ];
        assert!(point_in_polygon(Vec2::new(5.0, 5.0), &square));
        assert!(!point_in_polygon(Vec2::new(15.0, 5.0), &square));
    }
}
