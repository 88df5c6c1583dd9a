//! Bitmap font and coverage-mask sampling.
//!
//! Text formations are produced the same way as the rasterised shapes:
//! draw into an 8-bit coverage mask (`image::GrayImage`), then sample lit
//! pixels on a regular grid. The font is a blocky 5×7 uppercase face, which
//! reads well as a particle cloud.

use glam::Vec2;
use image::{GrayImage, Luma};

pub const GLYPH_WIDTH: u32 = 5;
pub const GLYPH_HEIGHT: u32 = 7;
/// Blank columns between glyphs.
pub const GLYPH_SPACING: u32 = 1;

/// Upper bound on either side of a coverage mask, in pixels.
pub const MAX_MASK_SIDE: u32 = 4096;

/// Largest sampling step tried before giving up on fitting the point budget.
pub const MAX_SAMPLE_STEP: u32 = 11;

/// Rows of a 5-column glyph, bit 4 is the leftmost column.
pub fn glyph(c: char) -> [u8; 7] {
    match c.to_ascii_uppercase() {
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x0A, 0x04, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '!' => [0x04, 0x04, 0x04, 0x04, 0x04, 0x00, 0x04],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        ',' => [0x00, 0x00, 0x00, 0x00, 0x0C, 0x04, 0x08],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '\'' => [0x04, 0x04, 0x08, 0x00, 0x00, 0x00, 0x00],
        ' ' => [0x00; 7],
        // '?' and anything the face doesn't cover
        _ => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04],
    }
}

/// Width of `text` in font cells (glyph columns plus spacing).
pub fn text_columns(text: &str) -> u32 {
    let n = text.chars().count() as u32;
    if n == 0 {
        0
    } else {
        n * (GLYPH_WIDTH + GLYPH_SPACING) - GLYPH_SPACING
    }
}

/// Largest cell size (px) at which `text` fits inside `max_w × max_h`.
pub fn fit_cell_size(text: &str, max_w: f32, max_h: f32) -> f32 {
    let cols = text_columns(text).max(1) as f32;
    (max_w / cols).min(max_h / GLYPH_HEIGHT as f32).max(1.0)
}

/// Draw `text` centred on `center` with square cells of `cell` pixels.
pub fn draw_text(mask: &mut GrayImage, text: &str, center: Vec2, cell: f32) {
    let width = text_columns(text) as f32 * cell;
    let height = GLYPH_HEIGHT as f32 * cell;
    let origin = center - Vec2::new(width, height) * 0.5;

    for (i, c) in text.chars().enumerate() {
        let rows = glyph(c);
        let col0 = (i as u32 * (GLYPH_WIDTH + GLYPH_SPACING)) as f32;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                let min = origin + Vec2::new((col0 + col as f32) * cell, row as f32 * cell);
                fill_rect(mask, min, min + Vec2::splat(cell));
            }
        }
    }
}

fn fill_rect(mask: &mut GrayImage, min: Vec2, max: Vec2) {
    let (w, h) = mask.dimensions();
    let x0 = min.x.round().max(0.0) as u32;
    let y0 = min.y.round().max(0.0) as u32;
    let x1 = (max.x.round().max(0.0) as u32).min(w);
    let y1 = (max.y.round().max(0.0) as u32).min(h);
    for y in y0..y1 {
        for x in x0..x1 {
            mask.put_pixel(x, y, Luma([255]));
        }
    }
}

/// Grid-sample pixels whose coverage exceeds `threshold`, in mask coordinates.
pub fn sample_mask(mask: &GrayImage, step: u32, threshold: u8) -> Vec<Vec2> {
    let step = step.max(1) as usize;
    let (w, h) = mask.dimensions();
    let mut points = Vec::new();
    for y in (0..h).step_by(step) {
        for x in (0..w).step_by(step) {
            if mask.get_pixel(x, y).0[0] > threshold {
                points.push(Vec2::new(x as f32, y as f32));
            }
        }
    }
    points
}

/// Sample with a growing step until at most `limit` points remain, then
/// centre them on the mask. Gives up growing at [`MAX_SAMPLE_STEP`].
pub fn sample_centered(mask: &GrayImage, threshold: u8, start_step: u32, limit: usize) -> Vec<Vec2> {
    let (w, h) = mask.dimensions();
    let center = Vec2::new(w as f32, h as f32) * 0.5;
    let mut step = start_step.max(1);
    let mut points = sample_mask(mask, step, threshold);
    while points.len() > limit && step < MAX_SAMPLE_STEP {
        step += 1;
        points = sample_mask(mask, step, threshold);
    }
    for p in &mut points {
        *p -= center;
    }
    points
}
