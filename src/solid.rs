//! Rotation and zoom control for the solid-shape mode.
//!
//! Only the first tracked hand drives the solid.
//!
//! # Swipes
//!
//! A circular zone of radius `0.15 * min(W, H)` sits at the canvas centre.
//! A swipe is a palm path that starts outside the zone, enters it, and leaves
//! on the opposite side of the centre on at least one axis. Each completed
//! crossing adds one angular impulse whose size grows with palm speed:
//!
//! ```text
//! impulse = min(0.07, 0.012 + 0.01 * distance_px / max(50, elapsed_ms))
//! ```
//!
//! Horizontal crossings spin about the vertical axis; vertical crossings tip
//! about the horizontal axis. Angular velocity is capped at 0.1 rad/frame per
//! axis and decays with friction.
//!
//! # Zoom
//!
//! Zoom only reacts while the palm is still (moved less than 25 px since the
//! last frame). Holding a pinch for a second arms zoom-in; from then on every
//! pinch-to-open transition grows the target scale by 10%. Holding an open
//! hand for a second arms zoom-out, where every open-to-pinch transition
//! shrinks it by 10%. The displayed scale eases toward the target.

use std::time::Duration;

use glam::{Mat3, Vec2, Vec3};

use crate::gesture::is_pinching;
use crate::landmarks::HandLandmarks;

pub const REST_PITCH: f32 = -0.4;
pub const REST_YAW: f32 = 0.6;

/// Zone radius as a fraction of the canvas' shorter side.
pub const ZONE_FRACTION: f32 = 0.15;

const IMPULSE_BASE: f32 = 0.012;
const IMPULSE_MAX: f32 = 0.07;
const IMPULSE_PER_SPEED: f32 = 0.01;
const MIN_SWIPE_MS: f32 = 50.0;
const MAX_ANGULAR_VELOCITY: f32 = 0.1;

const FRICTION_ACTIVE: f32 = 0.99;
const FRICTION_IDLE: f32 = 0.985;
const IDLE_SPIN: f32 = 0.003;
const IDLE_THRESHOLD: f32 = 0.0002;

const STILL_PX: f32 = 25.0;
const ZOOM_HOLD: Duration = Duration::from_millis(1000);
const ZOOM_STEP: f32 = 1.1;
const MIN_SCALE: f32 = 0.3;
const MAX_SCALE: f32 = 3.0;
const SCALE_EASE: f32 = 0.3;

/// Armed zoom direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ZoomDirection {
    #[default]
    None,
    In,
    Out,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
enum SwipePhase {
    /// Waiting for the palm to be outside the zone.
    #[default]
    Idle,
    Outside,
    Crossing {
        entry: Vec2,
        since: Duration,
    },
}

/// Solid-mode state: orientation, angular velocity, zoom and gesture
/// bookkeeping.
#[derive(Clone, Debug)]
pub struct SolidController {
    /// (pitch, yaw) in radians.
    rotation: Vec2,
    velocity: Vec2,
    scale: f32,
    target_scale: f32,
    prev_palm: Option<Vec2>,
    hand_active: bool,
    zoom_pinched: bool,
    zoom_hold_start: Option<Duration>,
    zoom_direction: ZoomDirection,
    swipe: SwipePhase,
}

impl Default for SolidController {
    fn default() -> Self {
        Self::new()
    }
}

impl SolidController {
    pub fn new() -> Self {
        Self {
            rotation: Vec2::new(REST_PITCH, REST_YAW),
            velocity: Vec2::ZERO,
            scale: 1.0,
            target_scale: 1.0,
            prev_palm: None,
            hand_active: false,
            zoom_pinched: false,
            zoom_hold_start: None,
            zoom_direction: ZoomDirection::None,
            swipe: SwipePhase::Idle,
        }
    }

    /// (pitch, yaw) in radians.
    pub fn rotation(&self) -> Vec2 {
        self.rotation
    }

    /// Angular velocity (pitch, yaw) in radians per frame.
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn target_scale(&self) -> f32 {
        self.target_scale
    }

    pub fn zoom_direction(&self) -> ZoomDirection {
        self.zoom_direction
    }

    pub fn hand_active(&self) -> bool {
        self.hand_active
    }

    /// Model-space to view-space rotation (pitch first, then yaw).
    pub fn rotation_matrix(&self) -> Mat3 {
        Mat3::from_rotation_y(self.rotation.y) * Mat3::from_rotation_x(self.rotation.x)
    }

    /// Rotate and scale a model-space point into view space.
    pub fn transform(&self, p: Vec3) -> Vec3 {
        let r = self.rotation_matrix() * p;
        Vec3::new(r.x * self.scale, r.y * self.scale, r.z)
    }

    /// Feed one frame of the driving hand.
    pub fn observe(&mut self, hand: &HandLandmarks, canvas: Vec2, now: Duration) {
        let palm = hand.palm_screen(canvas);
        let center = canvas * 0.5;
        let zone = canvas.min_element() * ZONE_FRACTION;
        let in_zone = palm.distance(center) < zone;

        self.track_swipe(palm, center, in_zone, now);

        let still = self
            .prev_palm
            .map_or(true, |prev| prev.distance(palm) < STILL_PX);
        self.prev_palm = Some(palm);

        if still {
            self.track_zoom(is_pinching(hand), now);
        } else {
            self.zoom_hold_start = None;
        }

        self.hand_active = true;
    }

    fn track_swipe(&mut self, palm: Vec2, center: Vec2, in_zone: bool, now: Duration) {
        if self.prev_palm.is_none() {
            self.swipe = if in_zone { SwipePhase::Idle } else { SwipePhase::Outside };
            return;
        }

        match self.swipe {
            SwipePhase::Idle if !in_zone => self.swipe = SwipePhase::Outside,
            SwipePhase::Outside if in_zone => {
                self.swipe = SwipePhase::Crossing { entry: palm, since: now };
            }
            SwipePhase::Crossing { entry, since } if !in_zone => {
                let entry_rel = entry - center;
                let exit_rel = palm - center;
                let crossed_x = entry_rel.x * exit_rel.x < 0.0;
                let crossed_y = entry_rel.y * exit_rel.y < 0.0;

                if crossed_x || crossed_y {
                    let elapsed_ms = (now.saturating_sub(since).as_secs_f32() * 1000.0).max(MIN_SWIPE_MS);
                    let speed = palm.distance(entry) / elapsed_ms;
                    let impulse = (IMPULSE_BASE + speed * IMPULSE_PER_SPEED).min(IMPULSE_MAX);

                    if crossed_x {
                        self.velocity.y += exit_rel.x.signum() * impulse;
                    }
                    if crossed_y {
                        self.velocity.x += if exit_rel.y > 0.0 { -impulse } else { impulse };
                    }
                    self.velocity = self
                        .velocity
                        .clamp(Vec2::splat(-MAX_ANGULAR_VELOCITY), Vec2::splat(MAX_ANGULAR_VELOCITY));
                    log::trace!("swipe impulse {impulse:.4}, velocity {:?}", self.velocity);
                }
                self.swipe = SwipePhase::Outside;
            }
            _ => {}
        }
    }

    fn track_zoom(&mut self, pinched: bool, now: Duration) {
        if pinched != self.zoom_pinched {
            let was_pinched = self.zoom_pinched;
            self.zoom_pinched = pinched;
            self.zoom_hold_start = Some(now);

            match self.zoom_direction {
                ZoomDirection::In if was_pinched && !pinched => {
                    self.target_scale = (self.target_scale * ZOOM_STEP).min(MAX_SCALE);
                }
                ZoomDirection::Out if !was_pinched && pinched => {
                    self.target_scale = (self.target_scale / ZOOM_STEP).max(MIN_SCALE);
                }
                _ => {}
            }
        }

        let held = self
            .zoom_hold_start
            .is_some_and(|start| now.saturating_sub(start) >= ZOOM_HOLD);
        if !held {
            return;
        }

        let armed = match (self.zoom_direction, pinched) {
            (ZoomDirection::None, true) | (ZoomDirection::Out, true) => Some(ZoomDirection::In),
            (ZoomDirection::None, false) | (ZoomDirection::In, false) => Some(ZoomDirection::Out),
            _ => None,
        };
        if let Some(direction) = armed {
            log::debug!("zoom {direction:?} armed");
            self.zoom_direction = direction;
            self.zoom_hold_start = None;
        }
    }

    /// Advance one frame: apply inertia, ease the scale, and idle-spin when
    /// nothing is driving the solid.
    pub fn step(&mut self) {
        self.rotation += self.velocity;
        let friction = if self.hand_active { FRICTION_ACTIVE } else { FRICTION_IDLE };
        self.velocity *= friction;
        self.scale += (self.target_scale - self.scale) * SCALE_EASE;

        if !self.hand_active
            && self.velocity.x.abs() < IDLE_THRESHOLD
            && self.velocity.y.abs() < IDLE_THRESHOLD
        {
            self.velocity.y = IDLE_SPIN;
        }
        self.hand_active = false;
    }

    /// Forget the tracked hand: swipe, stillness and zoom arming start over.
    /// Orientation, velocity and scale are kept.
    pub fn release_hand(&mut self) {
        self.prev_palm = None;
        self.hand_active = false;
        self.zoom_pinched = false;
        self.zoom_hold_start = None;
        self.zoom_direction = ZoomDirection::None;
        self.swipe = SwipePhase::Idle;
    }

    /// Back to the rest pose.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{Pose, SyntheticHand};
    use approx::assert_relative_eq;

    const CANVAS: Vec2 = Vec2::new(1000.0, 800.0);

    fn hand_at(pose: Pose, screen: Vec2) -> HandLandmarks {
        SyntheticHand::new(pose).at_screen(screen, CANVAS).build()
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_horizontal_swipe_spins_yaw() {
        let mut solid = SolidController::new();
        let y = CANVAS.y * 0.5;
        let mut t = 0;
        for x in [200.0, 350.0, 480.0, 520.0, 650.0, 800.0] {
            solid.observe(&hand_at(Pose::Open, Vec2::new(x, y)), CANVAS, ms(t));
            t += 16;
        }
        assert!(solid.velocity().y > 0.0);
        assert_eq!(solid.velocity().x, 0.0);
        assert!(solid.velocity().y <= IMPULSE_MAX);
    }

    #[test]
    fn test_swipe_requires_crossing() {
        let mut solid = SolidController::new();
        let y = CANVAS.y * 0.5;
        // Enter from the left, leave back out the left.
        for (i, x) in [200.0, 430.0, 460.0, 430.0, 200.0].into_iter().enumerate() {
            solid.observe(&hand_at(Pose::Open, Vec2::new(x, y)), CANVAS, ms(i as u64 * 16));
        }
        assert_eq!(solid.velocity(), Vec2::ZERO);
    }

    #[test]
    fn test_upward_swipe_tips_pitch() {
        let mut solid = SolidController::new();
        let x = CANVAS.x * 0.5;
        for (i, y) in [700.0, 500.0, 420.0, 380.0, 300.0, 100.0].into_iter().enumerate() {
            solid.observe(&hand_at(Pose::Open, Vec2::new(x, y)), CANVAS, ms(i as u64 * 16));
        }
        assert!(solid.velocity().x > 0.0);
    }

    #[test]
    fn test_zoom_in_after_pinch_hold() {
        let mut solid = SolidController::new();
        let at = Vec2::new(300.0, 300.0);
        let mut t = 0;
        for _ in 0..70 {
            solid.observe(&hand_at(Pose::Pinch, at), CANVAS, ms(t));
            t += 16;
        }
        assert_eq!(solid.zoom_direction(), ZoomDirection::In);
        assert_eq!(solid.target_scale(), 1.0);

        solid.observe(&hand_at(Pose::Open, at), CANVAS, ms(t));
        assert_relative_eq!(solid.target_scale(), 1.1);
    }

    #[test]
    fn test_moving_palm_blocks_zoom() {
        let mut solid = SolidController::new();
        let mut t = 0;
        for i in 0..80 {
            let x = if i % 2 == 0 { 200.0 } else { 260.0 };
            solid.observe(&hand_at(Pose::Pinch, Vec2::new(x, 200.0)), CANVAS, ms(t));
            t += 16;
        }
        assert_eq!(solid.zoom_direction(), ZoomDirection::None);
    }

    #[test]
    fn test_idle_spin_and_scale_ease() {
        let mut solid = SolidController::new();
        solid.step();
        assert_eq!(solid.velocity().y, IDLE_SPIN);
        let yaw = solid.rotation().y;
        solid.step();
        assert!(solid.rotation().y > yaw);
    }

    #[test]
    fn test_release_hand_keeps_orientation() {
        let mut solid = SolidController::new();
        solid.step();
        solid.step();
        let rot = solid.rotation();
        solid.release_hand();
        assert_eq!(solid.rotation(), rot);
        solid.reset();
        assert_eq!(solid.rotation(), Vec2::new(REST_PITCH, REST_YAW));
    }

    #[test]
    fn test_transform_matches_axis_rotations() {
        let mut solid = SolidController::new();
        solid.rotation = Vec2::new(0.0, std::f32::consts::FRAC_PI_2);
        let p = solid.transform(Vec3::X);
        assert_relative_eq!(p.z, -1.0, epsilon = 1e-5);
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-5);
    }
}
