//! Pairwise particle separation on a uniform grid.
//!
//! Particles are bucketed into square cells; each cell is tested against
//! itself and the four neighbours "ahead" of it (right column and the cell
//! below), so every close pair is visited exactly once per pass. Overlapping
//! pairs are pushed apart symmetrically and, if they are still approaching,
//! lose part of their closing velocity.
//!
//! Cells are walked in first-insertion order, which makes a pass
//! deterministic for a given particle order.

use std::collections::HashMap;

use glam::Vec2;

use crate::particle::Particle;

/// Neighbour offsets covering each unordered cell pair once.
const HALF_NEIGHBOURHOOD: [(i32, i32); 5] = [(0, 0), (0, 1), (1, -1), (1, 0), (1, 1)];

/// Pairs closer than this (squared) are treated as coincident and skipped.
const MIN_DIST_SQ: f32 = 0.001;

/// Reusable collision pass.
#[derive(Debug, Clone)]
pub struct CollisionResolver {
    cell_size: f32,
    restitution: f32,
    cells: HashMap<(i32, i32), Vec<usize>>,
    order: Vec<(i32, i32)>,
}

impl CollisionResolver {
    pub fn new(cell_size: f32, restitution: f32) -> Self {
        Self {
            cell_size: cell_size.max(1.0),
            restitution,
            cells: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    #[inline]
    fn cell_of(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        )
    }

    fn rebuild(&mut self, particles: &[Particle]) {
        for bucket in self.cells.values_mut() {
            bucket.clear();
        }
        self.order.clear();

        for (i, p) in particles.iter().enumerate() {
            let cell = self.cell_of(p.pos);
            let bucket = self.cells.entry(cell).or_default();
            if bucket.is_empty() {
                self.order.push(cell);
            }
            bucket.push(i);
        }
    }

    /// Separate overlapping particles in place. Returns the number of pairs
    /// that were pushed apart.
    pub fn resolve(&mut self, particles: &mut [Particle]) -> usize {
        if particles.len() < 2 {
            return 0;
        }
        self.rebuild(particles);

        let mut resolved = 0;
        for &(cx, cy) in &self.order {
            let Some(cell) = self.cells.get(&(cx, cy)) else {
                continue;
            };
            for (dx, dy) in HALF_NEIGHBOURHOOD {
                let Some(neighbour) = self.cells.get(&(cx + dx, cy + dy)) else {
                    continue;
                };
                let same_cell = dx == 0 && dy == 0;
                for (i, &a) in cell.iter().enumerate() {
                    let start = if same_cell { i + 1 } else { 0 };
                    for &b in &neighbour[start..] {
                        if separate(particles, a, b, self.restitution) {
                            resolved += 1;
                        }
                    }
                }
            }
        }
        resolved
    }
}

fn separate(particles: &mut [Particle], a: usize, b: usize, restitution: f32) -> bool {
    let (pa, pb) = (&particles[a], &particles[b]);
    let d = pb.pos - pa.pos;
    let dist_sq = d.length_squared();
    let min_dist = pa.size + pb.size;
    if dist_sq >= min_dist * min_dist || dist_sq <= MIN_DIST_SQ {
        return false;
    }

    let dist = dist_sq.sqrt();
    let n = d / dist;
    let overlap = (min_dist - dist) * 0.5;
    let closing = (pa.vel - pb.vel).dot(n);

    let pa = &mut particles[a];
    pa.pos -= n * overlap;
    if closing > 0.0 {
        pa.vel -= n * closing * restitution;
    }
    let pb = &mut particles[b];
    pb.pos += n * overlap;
    if closing > 0.0 {
        pb.vel += n * closing * restitution;
    }
    true
}
