//! Formation point clouds.
//!
//! A formation is a set of 2D offsets (centred on `(0, 0)`) that live
//! particles morph toward, translated by a screen-space anchor. Outlines
//! (square, circle) are generated analytically; filled shapes (smiley,
//! heart) and text are drawn into a coverage mask and grid-sampled, with the
//! sampling step growing until the cloud fits under the particle ceiling.
//!
//! [`FormationCache`] keeps the current cloud and only regenerates it when
//! the requested kind changes.

use std::f32::consts::{PI, TAU};

use glam::Vec2;
use image::{GrayImage, Luma};

use crate::config::DeviceTier;
use crate::glyphs;

/// Coverage threshold for text masks.
const TEXT_THRESHOLD: u8 = 128;
/// Coverage threshold for drawn shapes; lower so antialiased edges count.
const SHAPE_THRESHOLD: u8 = 60;
const SHAPE_START_STEP: u32 = 3;
const SQUARE_EDGE_STEP: f32 = 3.0;
/// Canvas side used for sizing shapes. Keeps shape masks under
/// [`glyphs::MAX_MASK_SIDE`] however large the canvas gets.
const MAX_SHAPE_SIDE: f32 = 3600.0;

/// What to form.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FormationKind {
    Square,
    Circle,
    Smiley,
    Heart,
    Text(String),
}

impl FormationKind {
    pub fn text(text: impl Into<String>) -> Self {
        FormationKind::Text(text.into())
    }
}

/// A formation to hold this frame, centred on `anchor` (canvas pixels).
#[derive(Clone, Debug, PartialEq)]
pub struct FormationRequest {
    pub kind: FormationKind,
    pub anchor: Vec2,
}

impl FormationRequest {
    pub fn new(kind: FormationKind, anchor: Vec2) -> Self {
        Self { kind, anchor }
    }
}

// ============================================================================
// Generators
// ============================================================================

/// Square outline of side `size`, one point every 3 px along each edge.
pub fn square_points(size: f32) -> Vec<Vec2> {
    let half = size * 0.5;
    let mut points = Vec::new();
    let mut i = -half;
    while i <= half {
        points.push(Vec2::new(i, -half));
        points.push(Vec2::new(i, half));
        points.push(Vec2::new(-half, i));
        points.push(Vec2::new(half, i));
        i += SQUARE_EDGE_STEP;
    }
    points
}

/// Circle outline, `⌊2.5·r⌋` evenly spaced points.
pub fn circle_points(radius: f32) -> Vec<Vec2> {
    let count = (radius * 2.5).floor().max(0.0) as usize;
    (0..count)
        .map(|i| Vec2::from_angle(i as f32 / count as f32 * TAU) * radius)
        .collect()
}

/// Smiley face: thick outline, two oval eyes and a wide smile.
pub fn smiley_points(radius: f32, limit: usize) -> Vec<Vec2> {
    let mut mask = shape_mask(radius);
    let c = mask_center(&mask);
    let r = radius;

    stroke_arc(&mut mask, c, r, r * 0.12, None);
    fill_ellipse(&mut mask, c + Vec2::new(-0.32 * r, -0.2 * r), Vec2::new(0.08 * r, 0.14 * r));
    fill_ellipse(&mut mask, c + Vec2::new(0.32 * r, -0.2 * r), Vec2::new(0.08 * r, 0.14 * r));
    stroke_arc(&mut mask, c, r * 0.52, r * 0.1, Some((0.2 * PI, 0.8 * PI)));

    glyphs::sample_centered(&mask, SHAPE_THRESHOLD, SHAPE_START_STEP, limit)
}

/// Filled heart from the classic parametric curve, with a slight outline.
pub fn heart_points(radius: f32, limit: usize) -> Vec<Vec2> {
    let mut mask = shape_mask(radius);
    let c = mask_center(&mask);
    // The outline stroke fattens the curve by ~4 %.
    let scale = radius * 0.065 * 1.04;

    let mut outline = Vec::new();
    let mut t = 0.0f32;
    while t <= TAU {
        let (s, _) = t.sin_cos();
        let hx = 16.0 * s.powi(3);
        let hy = -(13.0 * t.cos() - 5.0 * (2.0 * t).cos() - 2.0 * (3.0 * t).cos() - (4.0 * t).cos());
        outline.push(c + Vec2::new(hx, hy) * scale);
        t += 0.01;
    }
    fill_polygon(&mut mask, &outline);

    glyphs::sample_centered(&mask, SHAPE_THRESHOLD, SHAPE_START_STEP, limit)
}

/// Text laid out in the block font, sized from the canvas width.
pub fn text_points(text: &str, canvas_width: f32, tier: DeviceTier, limit: usize) -> Vec<Vec2> {
    let width = tier.pick((canvas_width * 0.9).min(800.0), (canvas_width * 0.7).min(500.0));
    let width = width.max(1.0);
    let height = (width * 0.4).max(1.0);
    let mut mask = GrayImage::new(width as u32, height as u32);
    if mask.width() == 0 || mask.height() == 0 {
        return Vec::new();
    }

    let cell = glyphs::fit_cell_size(text, width * 0.9, height * 0.7);
    let c = mask_center(&mask);
    glyphs::draw_text(&mut mask, text, c, cell);

    glyphs::sample_centered(&mask, TEXT_THRESHOLD, tier.pick(3, 2), limit)
}

/// Generate the point cloud for `kind` on a canvas of size `canvas`.
pub fn generate(kind: &FormationKind, canvas: Vec2, tier: DeviceTier, limit: usize) -> Vec<Vec2> {
    let min_side = canvas.x.min(canvas.y).min(MAX_SHAPE_SIDE);
    match kind {
        FormationKind::Square => square_points(min_side * tier.pick(0.35, 0.30)),
        FormationKind::Circle => circle_points(min_side * tier.pick(0.20, 0.15)),
        FormationKind::Smiley => smiley_points(min_side * tier.pick(0.25, 0.15), limit),
        FormationKind::Heart => heart_points(min_side * tier.pick(0.28, 0.18), limit),
        FormationKind::Text(text) => text_points(text, canvas.x, tier, limit),
    }
}

// ============================================================================
// Raster helpers
// ============================================================================

fn shape_mask(radius: f32) -> GrayImage {
    let size = (radius * 3.0).ceil().clamp(1.0, glyphs::MAX_MASK_SIDE as f32) as u32;
    GrayImage::new(size, size)
}

fn mask_center(mask: &GrayImage) -> Vec2 {
    Vec2::new(mask.width() as f32, mask.height() as f32) * 0.5
}

/// Raise a pixel's coverage, never lower it.
fn cover(mask: &mut GrayImage, x: u32, y: u32, coverage: f32) {
    let value = (coverage.clamp(0.0, 1.0) * 255.0) as u8;
    let px = mask.get_pixel_mut(x, y);
    px.0[0] = px.0[0].max(value);
}

/// Stroke a circle (or an arc between two angles, with round caps).
fn stroke_arc(mask: &mut GrayImage, center: Vec2, radius: f32, width: f32, span: Option<(f32, f32)>) {
    let half = width * 0.5;
    let (w, h) = mask.dimensions();
    let ends = span.map(|(a, b)| {
        (
            center + Vec2::from_angle(a) * radius,
            center + Vec2::from_angle(b) * radius,
        )
    });

    for y in 0..h {
        for x in 0..w {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let d = p - center;
            let dist = match (span, ends) {
                (Some((a, b)), Some((e0, e1))) => {
                    let angle = d.y.atan2(d.x).rem_euclid(TAU);
                    if angle >= a && angle <= b {
                        (d.length() - radius).abs()
                    } else {
                        p.distance(e0).min(p.distance(e1))
                    }
                }
                _ => (d.length() - radius).abs(),
            };
            let coverage = half + 0.5 - dist;
            if coverage > 0.0 {
                cover(mask, x, y, coverage);
            }
        }
    }
}

fn fill_ellipse(mask: &mut GrayImage, center: Vec2, radii: Vec2) {
    let (w, h) = mask.dimensions();
    let min_r = radii.x.min(radii.y).max(1e-3);
    let x0 = (center.x - radii.x - 1.0).max(0.0) as u32;
    let y0 = (center.y - radii.y - 1.0).max(0.0) as u32;
    let x1 = ((center.x + radii.x + 1.0).max(0.0) as u32).min(w);
    let y1 = ((center.y + radii.y + 1.0).max(0.0) as u32).min(h);

    for y in y0..y1 {
        for x in x0..x1 {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - center;
            let q = (p / radii.max(Vec2::splat(1e-3))).length();
            let coverage = (1.0 - q) * min_r + 0.5;
            if coverage > 0.0 {
                cover(mask, x, y, coverage);
            }
        }
    }
}

/// Even-odd scanline fill.
fn fill_polygon(mask: &mut GrayImage, vertices: &[Vec2]) {
    if vertices.len() < 3 {
        return;
    }
    let (w, h) = mask.dimensions();
    let mut crossings = Vec::new();

    for y in 0..h {
        let sy = y as f32 + 0.5;
        crossings.clear();
        let mut j = vertices.len() - 1;
        for i in 0..vertices.len() {
            let (a, b) = (vertices[i], vertices[j]);
            if (a.y > sy) != (b.y > sy) {
                crossings.push(a.x + (sy - a.y) * (b.x - a.x) / (b.y - a.y));
            }
            j = i;
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        for pair in crossings.chunks_exact(2) {
            let start = pair[0].round().max(0.0) as u32;
            let end = (pair[1].round().max(0.0) as u32).min(w);
            for x in start..end {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
    }
}

// ============================================================================
// FormationCache
// ============================================================================

/// The active formation's point cloud.
///
/// Every regeneration bumps [`generation`](Self::generation), which particles
/// record when they take a target so stale assignments can be detected.
#[derive(Debug, Default)]
pub struct FormationCache {
    kind: Option<FormationKind>,
    points: Vec<Vec2>,
    generation: u64,
}

impl FormationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure the cache holds the cloud for `kind`.
    ///
    /// Returns `true` when the cloud was regenerated.
    pub fn ensure(&mut self, kind: &FormationKind, canvas: Vec2, tier: DeviceTier, limit: usize) -> bool {
        if self.kind.as_ref() == Some(kind) {
            return false;
        }
        self.points = generate(kind, canvas, tier, limit);
        self.kind = Some(kind.clone());
        self.generation += 1;
        log::trace!(
            "formation {:?} regenerated: {} points (generation {})",
            kind,
            self.points.len(),
            self.generation
        );
        true
    }

    /// Drop the cloud. The next `ensure` always regenerates.
    pub fn clear(&mut self) {
        self.kind = None;
        self.points.clear();
    }

    pub fn kind(&self) -> Option<&FormationKind> {
        self.kind.as_ref()
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
