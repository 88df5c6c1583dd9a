//! Frame rendering into a backend-neutral draw list.
//!
//! The render functions are pure: they read particle or solid state and
//! write a [`DrawList`] describing the frame. Nothing here mutates the
//! simulation. A backend then either uploads the instance slices straight to
//! GPU buffers (both instance structs are `Pod`) or replays the list through
//! the [`Canvas`] trait.
//!
//! Circles are composited additively, rings with ordinary alpha blending.
//! Within each list, instances are already ordered back to front.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use image::{Rgb, RgbImage};

use crate::geometry::ShapeGeometry;
use crate::interaction::BlastMarker;
use crate::particle::Particle;
use crate::solid::{SolidController, ZONE_FRACTION};

/// Canvas clear colour, `#06060f`.
pub const BACKGROUND: [f32; 3] = [6.0 / 255.0, 6.0 / 255.0, 15.0 / 255.0];

/// A filled, soft-edged disc.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CircleInstance {
    pub center: [f32; 2],
    pub radius: f32,
    pub alpha: f32,
    pub color: [f32; 3],
    pub _pad: f32,
}

impl CircleInstance {
    pub fn new(center: Vec2, radius: f32, color: Vec3, alpha: f32) -> Self {
        Self {
            center: center.to_array(),
            radius,
            alpha,
            color: color.to_array(),
            _pad: 0.0,
        }
    }
}

/// A circle outline, optionally dashed.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct RingStroke {
    pub center: [f32; 2],
    pub radius: f32,
    pub width: f32,
    pub color: [f32; 3],
    pub alpha: f32,
    /// Dash and gap length along the circumference in pixels; 0 dash is solid.
    pub dash: f32,
    pub gap: f32,
    pub _pad: [f32; 2],
}

impl RingStroke {
    pub fn solid(center: Vec2, radius: f32, width: f32, alpha: f32) -> Self {
        Self {
            center: center.to_array(),
            radius,
            width,
            color: [1.0; 3],
            alpha,
            ..Self::default()
        }
    }

    pub fn dashed(mut self, dash: f32, gap: f32) -> Self {
        self.dash = dash;
        self.gap = gap;
        self
    }

    /// Whether arc length `s` (pixels from angle 0) falls on a dash.
    pub fn is_lit(&self, s: f32) -> bool {
        if self.dash <= 0.0 {
            return true;
        }
        s.rem_euclid(self.dash + self.gap) < self.dash
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlendMode {
    Additive,
    Alpha,
}

/// Everything needed to draw one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawList {
    pub background: [f32; 3],
    /// Drawn first, additively, in order.
    pub circles: Vec<CircleInstance>,
    /// Drawn after the circles with alpha blending.
    pub rings: Vec<RingStroke>,
}

impl Default for DrawList {
    fn default() -> Self {
        Self {
            background: BACKGROUND,
            circles: Vec::new(),
            rings: Vec::new(),
        }
    }
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty the list, keeping allocations.
    pub fn clear(&mut self) {
        self.background = BACKGROUND;
        self.circles.clear();
        self.rings.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.circles.is_empty() && self.rings.is_empty()
    }

    /// Draw through an immediate-mode backend.
    pub fn replay<C: Canvas + ?Sized>(&self, canvas: &mut C) {
        canvas.clear(self.background);
        canvas.set_blend(BlendMode::Additive);
        for c in &self.circles {
            canvas.fill_circle(c);
        }
        canvas.set_blend(BlendMode::Alpha);
        for r in &self.rings {
            canvas.stroke_ring(r);
        }
    }
}

/// Immediate-mode drawing backend.
pub trait Canvas {
    fn clear(&mut self, color: [f32; 3]);
    fn set_blend(&mut self, mode: BlendMode);
    fn fill_circle(&mut self, circle: &CircleInstance);
    fn stroke_ring(&mut self, ring: &RingStroke);
}

// ============================================================================
// Particle mode
// ============================================================================

/// Size multiplier for a particle at depth `z`.
#[inline]
pub fn particle_depth_scale(z: f32) -> f32 {
    0.2 + 2.0 * z * z
}

/// Alpha multiplier for a particle at depth `z`.
#[inline]
pub fn particle_depth_alpha(z: f32) -> f32 {
    0.4 + 0.6 * z
}

/// Draw particles back to front, trails first, then the blast marker.
pub fn render_particles(
    list: &mut DrawList,
    particles: &[Particle],
    blast: Option<(&BlastMarker, f32)>,
) {
    list.clear();

    let mut order: Vec<usize> = (0..particles.len()).collect();
    order.sort_by(|&a, &b| particles[a].z.total_cmp(&particles[b].z));

    for i in order {
        let p = &particles[i];
        let depth_scale = particle_depth_scale(p.z);
        let depth_alpha = particle_depth_alpha(p.z);

        let alpha = p.alpha;
        let base_size = if p.permanent {
            p.size
        } else {
            p.size * (0.3 + 0.7 * p.alpha)
        };

        if let Some(trail) = &p.trail {
            let n = trail.len() as f32;
            for (k, pos) in trail.iter().enumerate() {
                let fade = (k + 1) as f32 / (n + 1.0);
                list.circles.push(CircleInstance::new(
                    *pos,
                    base_size * depth_scale * (0.3 + 0.5 * fade),
                    p.color,
                    alpha * depth_alpha * fade * 0.5,
                ));
            }
        }

        list.circles.push(CircleInstance::new(
            p.pos,
            base_size * depth_scale,
            p.color,
            alpha * depth_alpha,
        ));
    }

    if let Some((marker, t)) = blast {
        list.rings.push(RingStroke::solid(
            marker.center,
            20.0 + 180.0 * t,
            2.0,
            0.35 * (1.0 - t),
        ));
    }
}

// ============================================================================
// Solid mode
// ============================================================================

/// Draw a solid through `solid`'s current rotation and zoom, plus the
/// dashed interaction-zone ring.
pub fn render_solid(
    list: &mut DrawList,
    geometry: &ShapeGeometry,
    solid: &SolidController,
    scale: f32,
    canvas: Vec2,
    now_ms: f32,
) {
    list.clear();
    let center = canvas * 0.5;
    let rot = solid.rotation_matrix();

    let facing: Vec<f32> = geometry
        .normals
        .iter()
        .map(|n| (-(rot * *n).z).max(0.0))
        .collect();

    let mut points: Vec<(Vec3, usize)> = geometry
        .points
        .iter()
        .enumerate()
        .map(|(i, pt)| (solid.transform(pt.pos), i))
        .collect();
    points.sort_by(|a, b| a.0.z.total_cmp(&b.0.z));

    for (view, i) in points {
        let pt = &geometry.points[i];
        let depth = ((view.z + scale) / (2.0 * scale)).clamp(0.0, 1.0);
        let twinkle = 0.7 + 0.3 * (pt.twinkle + now_ms * 0.003).sin();
        let face_alpha = 0.15 + 0.85 * facing.get(pt.face).copied().unwrap_or(0.0);

        let (base_size, base_alpha) = if pt.is_edge { (2.0, 1.0) } else { (1.2, 0.6) };
        let size = base_size * (0.3 + 1.7 * depth);
        let alpha = base_alpha * (0.2 + 0.8 * depth) * twinkle * face_alpha;

        let [r, g, b] = geometry.face_color(pt.face);
        let color = Vec3::new(r as f32, g as f32, b as f32) / 255.0;
        list.circles.push(CircleInstance::new(center + view.truncate(), size, color, alpha));
    }

    let zone = canvas.min_element() * ZONE_FRACTION;
    list.rings.push(RingStroke::solid(center, zone, 1.0, 0.08).dashed(6.0, 6.0));
}

// ============================================================================
// Software canvas
// ============================================================================

/// CPU rasteriser over an `RgbImage`, for headless rendering and tests.
pub struct ImageCanvas {
    image: RgbImage,
    blend: BlendMode,
}

impl ImageCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbImage::new(width, height),
            blend: BlendMode::Alpha,
        }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    fn blend_pixel(&mut self, x: i64, y: i64, color: [f32; 3], alpha: f32) {
        let (w, h) = self.image.dimensions();
        if x < 0 || y < 0 || x >= w as i64 || y >= h as i64 {
            return;
        }
        let px = self.image.get_pixel_mut(x as u32, y as u32);
        for (c, src) in px.0.iter_mut().zip(color) {
            let dst = *c as f32 / 255.0;
            let out = match self.blend {
                BlendMode::Additive => dst + src * alpha,
                BlendMode::Alpha => dst * (1.0 - alpha) + src * alpha,
            };
            *c = (out.clamp(0.0, 1.0) * 255.0).round() as u8;
        }
    }
}

impl Canvas for ImageCanvas {
    fn clear(&mut self, color: [f32; 3]) {
        let px = Rgb(color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8));
        for p in self.image.pixels_mut() {
            *p = px;
        }
    }

    fn set_blend(&mut self, mode: BlendMode) {
        self.blend = mode;
    }

    fn fill_circle(&mut self, circle: &CircleInstance) {
        let c = Vec2::from(circle.center);
        let r = circle.radius.max(0.5);
        let (x0, x1) = ((c.x - r).floor() as i64, (c.x + r).ceil() as i64);
        let (y0, y1) = ((c.y - r).floor() as i64, (c.y + r).ceil() as i64);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let d = Vec2::new(x as f32 + 0.5, y as f32 + 0.5).distance(c);
                let coverage = (r + 0.5 - d).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.blend_pixel(x, y, circle.color, circle.alpha * coverage);
                }
            }
        }
    }

    fn stroke_ring(&mut self, ring: &RingStroke) {
        let c = Vec2::from(ring.center);
        let outer = ring.radius + ring.width * 0.5 + 1.0;
        let (x0, x1) = ((c.x - outer).floor() as i64, (c.x + outer).ceil() as i64);
        let (y0, y1) = ((c.y - outer).floor() as i64, (c.y + outer).ceil() as i64);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let d = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - c;
                let coverage = (ring.width * 0.5 + 0.5 - (d.length() - ring.radius).abs()).clamp(0.0, 1.0);
                if coverage <= 0.0 {
                    continue;
                }
                let arc = d.y.atan2(d.x).rem_euclid(std::f32::consts::TAU) * ring.radius;
                if ring.is_lit(arc) {
                    self.blend_pixel(x, y, ring.color, ring.alpha * coverage);
                }
            }
        }
    }
}
