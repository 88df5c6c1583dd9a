//! Particle record and spawn presets.
//!
//! Particles come in two lifetimes:
//!
//! - **Permanent** (ambient drift, startup text, formation fill):
//!   `life` stays at 1, they never fade, only a mode reset removes them.
//! - **Ephemeral** (bursts, snow): `life` decays every frame and the
//!   particle is dropped at zero.
//!
//! Either kind is culled once it leaves the canvas by more than
//! [`CULL_MARGIN`] pixels.
//!
//! While a formation, orbit or idle drift is active a particle carries a
//! [`MotionState`] describing which one it is following. The three are
//! mutually exclusive, so switching behaviour always replaces the whole state.

use std::collections::VecDeque;
use std::f32::consts::TAU;

use glam::{Vec2, Vec3};
use rand::Rng;

/// Pixels outside the canvas before a particle is culled.
pub const CULL_MARGIN: f32 = 200.0;

/// Positions remembered per trail.
pub const TRAIL_LENGTH: usize = 8;

/// Soft grey-blue palette shared by every spawn kind.
pub const PALETTE: [[u8; 3]; 3] = [[200, 200, 210], [190, 195, 205], [210, 210, 215]];

/// Which part of the two-hand "planet" a particle belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrbitRole {
    Body,
    Ring,
}

/// What a particle is currently steering toward.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum MotionState {
    /// Free drift.
    #[default]
    Idle,
    /// Assigned to one point of the active formation.
    Formation {
        /// Offset from the formation anchor.
        offset: Vec2,
        /// Depth to ease toward.
        depth: f32,
        /// Formation cache generation the offset was taken from.
        generation: u64,
    },
    /// Captured by the two-hand orbit.
    Orbit {
        role: OrbitRole,
        /// Polar angle; for ring particles it selects the ring radius.
        phi: f32,
        /// Azimuth at t = 0.
        theta: f32,
    },
}

/// Bounded history of recent positions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Trail {
    points: VecDeque<Vec2>,
}

impl Trail {
    pub fn new() -> Self {
        Self {
            points: VecDeque::with_capacity(TRAIL_LENGTH + 1),
        }
    }

    pub fn push(&mut self, p: Vec2) {
        self.points.push_back(p);
        if self.points.len() > TRAIL_LENGTH {
            self.points.pop_front();
        }
    }

    /// Oldest first.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Vec2> + '_ {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Spawn presets.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpawnKind {
    /// Permanent, slow random drift, anywhere in depth.
    Draw,
    /// Ephemeral spark thrown from the two-fist midpoint.
    Burst,
    /// Ephemeral flake falling in from above the canvas.
    Snow,
    /// Permanent filler spawned around a formation anchor.
    Formation,
    /// Permanent startup-text particle with a persisted base depth.
    Text { depth: f32, base_depth: f32 },
}

/// A single particle.
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Pseudo-depth in `[0, 1]`, 1 is nearest. Only scales size and alpha.
    pub z: f32,
    /// Radius in pixels (before depth scaling).
    pub size: f32,
    /// Linear RGB in `[0, 1]`.
    pub color: Vec3,
    pub alpha: f32,
    pub life: f32,
    /// Life lost per frame; 0 for permanent particles.
    pub decay: f32,
    pub permanent: bool,
    pub trail: Option<Trail>,
    /// Rest depth for the idle depth wave (startup text only).
    pub base_depth: Option<f32>,
    pub motion: MotionState,
}

impl Particle {
    /// Bare permanent particle at rest.
    pub fn new(pos: Vec2) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            z: 0.5,
            size: 1.0,
            color: palette_color(0),
            alpha: 1.0,
            life: 1.0,
            decay: 0.0,
            permanent: true,
            trail: None,
            base_depth: None,
            motion: MotionState::Idle,
        }
    }

    /// Create a particle of the given kind at `pos`.
    pub fn spawn<R: Rng>(kind: SpawnKind, pos: Vec2, rng: &mut R) -> Self {
        let mut p = Self::new(pos);
        p.color = palette_color(rng.gen_range(0..PALETTE.len()));

        match kind {
            SpawnKind::Draw => {
                p.vel = Vec2::new(rng.gen::<f32>() - 0.5, rng.gen::<f32>() - 0.5) * 0.3;
                p.size = rng.gen_range(0.9..2.7);
                p.z = rng.gen_range(0.05..1.0);
            }
            SpawnKind::Burst => {
                p.pos += Vec2::new(rng.gen::<f32>() - 0.5, rng.gen::<f32>() - 0.5) * 10.0;
                p.vel = random_direction(rng) * rng.gen_range(4.0..14.0);
                p.size = rng.gen_range(0.9..2.7);
                p.decay = rng.gen_range(0.012..0.027);
                p.permanent = false;
                p.trail = Some(Trail::new());
                p.z = rng.gen_range(0.2..1.0);
            }
            SpawnKind::Snow => {
                p.vel = Vec2::new((rng.gen::<f32>() - 0.5) * 2.0, rng.gen_range(8.0..18.0));
                p.size = rng.gen_range(0.5..1.7);
                p.permanent = false;
                p.trail = Some(Trail::new());
                p.z = rng.gen_range(0.2..1.0);
            }
            SpawnKind::Formation => {
                p.pos += Vec2::new(rng.gen::<f32>() - 0.5, rng.gen::<f32>() - 0.5) * 40.0;
                p.size = rng.gen_range(0.9..2.1);
            }
            SpawnKind::Text { depth, base_depth } => {
                p.pos += Vec2::new(rng.gen::<f32>() - 0.5, rng.gen::<f32>() - 0.5) * 2.0;
                p.size = rng.gen_range(0.9..2.1);
                p.z = depth.clamp(0.0, 1.0);
                p.base_depth = Some(base_depth);
            }
        }
        p
    }

    /// Force multiplier from depth: near particles react more.
    #[inline]
    pub fn depth_factor(&self) -> f32 {
        0.15 + 0.85 * self.z
    }

    /// Ephemeral particle whose life ran out.
    #[inline]
    pub fn is_expired(&self) -> bool {
        !self.permanent && self.life <= 0.0
    }

    /// Further than [`CULL_MARGIN`] outside a `canvas`-sized area.
    #[inline]
    pub fn is_out_of_bounds(&self, canvas: Vec2) -> bool {
        self.pos.x < -CULL_MARGIN
            || self.pos.y < -CULL_MARGIN
            || self.pos.x > canvas.x + CULL_MARGIN
            || self.pos.y > canvas.y + CULL_MARGIN
    }
}

pub fn palette_color(index: usize) -> Vec3 {
    let [r, g, b] = PALETTE[index % PALETTE.len()];
    Vec3::new(r as f32, g as f32, b as f32) / 255.0
}

/// Uniformly distributed unit vector.
pub fn random_direction<R: Rng>(rng: &mut R) -> Vec2 {
    Vec2::from_angle(rng.gen_range(0.0..TAU))
}
