//! Point-cloud solids for the rotating-shape mode.
//!
//! Every solid is a set of surface points in model space (centred on the
//! origin, +y down like the canvas), grouped into faces. Each face carries
//! a base colour and an outward normal; the renderer dims faces turned away
//! from the viewer using that normal.
//!
//! | Shape    | Faces                     |
//! |----------|---------------------------|
//! | cube     | 6 planar faces            |
//! | sphere   | 8 latitude bands          |
//! | pyramid  | 4 sides and a base        |
//! | cylinder | 6 side segments, 2 caps   |
//! | torus    | 6 segments                |
//! | cone     | 6 side segments, a base   |
//!
//! Sizes scale with [`DeviceTier`]: [`shape_scale`] is 150 px on desktop and
//! 100 px on mobile, and point densities drop on mobile too.

use std::f32::consts::{PI, TAU};
use std::fmt;
use std::str::FromStr;

use glam::Vec3;
use rand::Rng;

use crate::config::DeviceTier;
use crate::error::EngineError;

/// Half-extent of a solid in model units for the given tier.
pub fn shape_scale(tier: DeviceTier) -> f32 {
    tier.pick(150.0, 100.0)
}

/// The selectable solids.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    #[default]
    Cube,
    Sphere,
    Pyramid,
    Cylinder,
    Torus,
    Cone,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 6] = [
        ShapeKind::Cube,
        ShapeKind::Sphere,
        ShapeKind::Pyramid,
        ShapeKind::Cylinder,
        ShapeKind::Torus,
        ShapeKind::Cone,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ShapeKind::Cube => "cube",
            ShapeKind::Sphere => "sphere",
            ShapeKind::Pyramid => "pyramid",
            ShapeKind::Cylinder => "cylinder",
            ShapeKind::Torus => "torus",
            ShapeKind::Cone => "cone",
        }
    }

    /// The next shape in [`ShapeKind::ALL`], wrapping around.
    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|&k| k == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShapeKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| EngineError::UnknownShape(s.to_string()))
    }
}

/// One surface sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapePoint {
    pub pos: Vec3,
    /// Lies on a face boundary; drawn larger and brighter.
    pub is_edge: bool,
    /// Index into [`ShapeGeometry::colors`] and [`ShapeGeometry::normals`].
    pub face: usize,
    /// Twinkle phase in radians.
    pub twinkle: f32,
}

/// A solid's points plus per-face colour and normal.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShapeGeometry {
    pub points: Vec<ShapePoint>,
    pub colors: Vec<[u8; 3]>,
    pub normals: Vec<Vec3>,
}

impl ShapeGeometry {
    pub fn face_count(&self) -> usize {
        self.normals.len()
    }

    /// Colour of `face`, falling back to the first face.
    pub fn face_color(&self, face: usize) -> [u8; 3] {
        self.colors
            .get(face)
            .or_else(|| self.colors.first())
            .copied()
            .unwrap_or([255, 255, 255])
    }

    fn push<R: Rng>(&mut self, pos: Vec3, is_edge: bool, face: usize, rng: &mut R) {
        self.points.push(ShapePoint {
            pos,
            is_edge,
            face,
            twinkle: rng.gen::<f32>() * TAU,
        });
    }
}

/// All six solids, generated once.
#[derive(Clone, Debug)]
pub struct ShapeLibrary {
    tier: DeviceTier,
    shapes: [ShapeGeometry; 6],
}

impl ShapeLibrary {
    pub fn new<R: Rng>(tier: DeviceTier, rng: &mut R) -> Self {
        let shapes = ShapeKind::ALL.map(|kind| generate(kind, tier, &mut *rng));
        log::debug!(
            "generated shape library: {}",
            ShapeKind::ALL
                .iter()
                .zip(&shapes)
                .map(|(k, g)| format!("{k}={}", g.points.len()))
                .collect::<Vec<_>>()
                .join(" ")
        );
        Self { tier, shapes }
    }

    pub fn get(&self, kind: ShapeKind) -> &ShapeGeometry {
        let i = ShapeKind::ALL.iter().position(|&k| k == kind).unwrap_or(0);
        &self.shapes[i]
    }

    pub fn scale(&self) -> f32 {
        shape_scale(self.tier)
    }
}

/// Build the point cloud for one solid.
pub fn generate<R: Rng>(kind: ShapeKind, tier: DeviceTier, rng: &mut R) -> ShapeGeometry {
    let s = shape_scale(tier);
    match kind {
        ShapeKind::Cube => cube(s, tier, rng),
        ShapeKind::Sphere => sphere(s, tier, rng),
        ShapeKind::Pyramid => pyramid(s, tier, rng),
        ShapeKind::Cylinder => cylinder(s, tier, rng),
        ShapeKind::Torus => torus(s, tier, rng),
        ShapeKind::Cone => cone(s, tier, rng),
    }
}

// ============================================================================
// Generators
// ============================================================================

fn cube<R: Rng>(s: f32, tier: DeviceTier, rng: &mut R) -> ShapeGeometry {
    let n = tier.pick(14, 10);
    let (x, y, z) = (Vec3::X * 2.0 * s, Vec3::Y * 2.0 * s, Vec3::Z * 2.0 * s);
    let faces = [
        (Vec3::new(-s, -s, -s), x, y),
        (Vec3::new(-s, -s, s), x, y),
        (Vec3::new(-s, -s, -s), x, z),
        (Vec3::new(-s, s, -s), x, z),
        (Vec3::new(-s, -s, -s), y, z),
        (Vec3::new(s, -s, -s), y, z),
    ];

    let mut g = ShapeGeometry::default();
    for (face, (origin, u_axis, v_axis)) in faces.into_iter().enumerate() {
        for i in 0..=n {
            for j in 0..=n {
                let (u, v) = (i as f32 / n as f32, j as f32 / n as f32);
                let edge = i == 0 || i == n || j == 0 || j == n;
                g.push(origin + u_axis * u + v_axis * v, edge, face, rng);
            }
        }
    }
    g.colors = vec![
        [200, 200, 210],
        [180, 200, 230],
        [200, 210, 190],
        [210, 195, 210],
        [195, 205, 215],
        [215, 205, 195],
    ];
    g.normals = vec![
        Vec3::NEG_Z,
        Vec3::Z,
        Vec3::NEG_Y,
        Vec3::Y,
        Vec3::NEG_X,
        Vec3::X,
    ];
    g
}

fn sphere<R: Rng>(r: f32, tier: DeviceTier, rng: &mut R) -> ShapeGeometry {
    const BANDS: usize = 8;
    let lon_steps = tier.pick(26, 18);
    let lat_steps = tier.pick(18, 12);
    let meridian_stride = lon_steps / 4;

    let mut g = ShapeGeometry::default();
    for i in 0..=lat_steps {
        let t = i as f32 / lat_steps as f32;
        let phi = t * PI;
        let pole = i == 0 || i == lat_steps;
        let band = ((t * BANDS as f32).floor() as usize).min(BANDS - 1);
        for j in 0..lon_steps {
            let theta = j as f32 / lon_steps as f32 * TAU;
            let pos = Vec3::new(
                r * phi.sin() * theta.cos(),
                r * phi.cos(),
                r * phi.sin() * theta.sin(),
            );
            g.push(pos, pole || j % meridian_stride == 0, band, rng);
        }
    }
    for b in 0..BANDS {
        let t = b as f32 / (BANDS - 1) as f32;
        g.colors.push(rgb(180.0 + 30.0 * t, 195.0 + 15.0 * (t * PI).sin(), 220.0 - 30.0 * t));
        let mid = (b as f32 + 0.5) / BANDS as f32 * PI;
        g.normals.push(Vec3::new(0.0, mid.cos(), mid.sin()));
    }
    g
}

fn pyramid<R: Rng>(s: f32, tier: DeviceTier, rng: &mut R) -> ShapeGeometry {
    let n = tier.pick(14, 10);
    let h = s * 1.4;
    let apex = Vec3::new(0.0, -h, 0.0);
    let floor = h * 0.4;
    let base = [
        Vec3::new(-s, floor, -s),
        Vec3::new(s, floor, -s),
        Vec3::new(s, floor, s),
        Vec3::new(-s, floor, s),
    ];

    let mut g = ShapeGeometry::default();
    for face in 0..4 {
        let (b0, b1) = (base[face], base[(face + 1) % 4]);
        for i in 0..=n {
            for j in 0..=n {
                let (u, v) = (i as f32 / n as f32, j as f32 / n as f32);
                let along = b0.lerp(b1, u * (1.0 - v));
                let edge = i == 0 || i == n || j == 0 || j == n;
                g.push(along.lerp(apex, v), edge, face, rng);
            }
        }
    }
    for i in 0..=n {
        for j in 0..=n {
            let (u, v) = (i as f32 / n as f32, j as f32 / n as f32);
            let edge = i == 0 || i == n || j == 0 || j == n;
            g.push(Vec3::new(-s + 2.0 * s * u, floor, -s + 2.0 * s * v), edge, 4, rng);
        }
    }

    g.colors = vec![
        [220, 195, 180],
        [195, 210, 200],
        [200, 195, 220],
        [210, 210, 195],
        [190, 200, 210],
    ];
    g.normals = [
        Vec3::new(0.0, 0.4, -1.0),
        Vec3::new(1.0, 0.4, 0.0),
        Vec3::new(0.0, 0.4, 1.0),
        Vec3::new(-1.0, 0.4, 0.0),
    ]
    .iter()
    .map(|n| n.normalize())
    .collect();
    g.normals.push(Vec3::Y);
    g
}

fn cylinder<R: Rng>(scale: f32, tier: DeviceTier, rng: &mut R) -> ShapeGeometry {
    const SEGMENTS: usize = 6;
    let r = scale * 0.7;
    let h = scale;
    let ang_steps = tier.pick(30, 20);
    let h_steps = tier.pick(16, 10);
    let cap_steps = tier.pick(10, 6);

    let mut g = ShapeGeometry::default();
    for i in 0..=h_steps {
        let y = -h + 2.0 * h * i as f32 / h_steps as f32;
        for j in 0..ang_steps {
            let t = j as f32 / ang_steps as f32;
            let theta = t * TAU;
            let seg = ((t * SEGMENTS as f32).floor() as usize).min(SEGMENTS - 1);
            let edge = i == 0 || i == h_steps;
            g.push(Vec3::new(r * theta.cos(), y, r * theta.sin()), edge, seg, rng);
        }
    }
    for (cap, y) in [-h, h].into_iter().enumerate() {
        disc(&mut g, r, y, ang_steps, cap_steps, SEGMENTS + cap, rng);
    }

    for s in 0..SEGMENTS {
        let t = s as f32 / SEGMENTS as f32;
        g.colors.push(rgb(
            190.0 + 25.0 * (t * TAU).cos(),
            200.0 + 15.0 * (t * TAU).sin(),
            210.0 + 10.0 * (t * PI).cos(),
        ));
        let mid = (s as f32 + 0.5) / SEGMENTS as f32 * TAU;
        g.normals.push(Vec3::new(mid.cos(), 0.0, mid.sin()));
    }
    g.colors.push([195, 205, 220]);
    g.normals.push(Vec3::NEG_Y);
    g.colors.push([210, 200, 195]);
    g.normals.push(Vec3::Y);
    g
}

fn torus<R: Rng>(scale: f32, tier: DeviceTier, rng: &mut R) -> ShapeGeometry {
    const SEGMENTS: usize = 6;
    let major = scale * 0.8;
    let minor = scale * 0.35;
    let maj_steps = tier.pick(32, 20);
    let min_steps = tier.pick(16, 10);

    let mut g = ShapeGeometry::default();
    for i in 0..maj_steps {
        let t = i as f32 / maj_steps as f32;
        let phi = t * TAU;
        let seg = ((t * SEGMENTS as f32).floor() as usize).min(SEGMENTS - 1);
        for j in 0..=min_steps {
            let theta = j as f32 / min_steps as f32 * TAU;
            let ring = major + minor * theta.cos();
            let pos = Vec3::new(ring * phi.cos(), minor * theta.sin(), ring * phi.sin());
            g.push(pos, j == 0 || j == min_steps, seg, rng);
        }
    }
    for s in 0..SEGMENTS {
        let t = s as f32 / SEGMENTS as f32;
        g.colors.push(rgb(
            200.0 + 20.0 * (t * TAU).sin(),
            195.0 + 20.0 * (t * PI).cos(),
            210.0 + 15.0 * (t * PI * 3.0).sin(),
        ));
        let mid = (s as f32 + 0.5) / SEGMENTS as f32 * TAU;
        g.normals.push(Vec3::new(mid.cos(), 0.0, mid.sin()));
    }
    g
}

fn cone<R: Rng>(scale: f32, tier: DeviceTier, rng: &mut R) -> ShapeGeometry {
    const SEGMENTS: usize = 6;
    let r = scale * 0.8;
    let h = scale * 1.3;
    let ang_steps = tier.pick(30, 20);
    let h_steps = tier.pick(18, 12);
    let cap_steps = tier.pick(10, 6);

    let mut g = ShapeGeometry::default();
    for i in 0..=h_steps {
        let t = i as f32 / h_steps as f32;
        let y = h * 0.5 - h * t;
        let ring = r * (1.0 - t);
        if ring < 1.0 && i < h_steps {
            continue;
        }
        let count = ((ang_steps as f32 * (1.0 - t).max(0.1)).floor() as usize).max(1);
        let stride = count / 4;
        for j in 0..count {
            let u = j as f32 / count as f32;
            let theta = u * TAU;
            let seg = ((u * SEGMENTS as f32).floor() as usize).min(SEGMENTS - 1);
            let edge = i == 0 || i == h_steps || (stride > 0 && j % stride == 0);
            g.push(Vec3::new(ring * theta.cos(), y, ring * theta.sin()), edge, seg, rng);
        }
    }
    disc(&mut g, r, h * 0.5, ang_steps, cap_steps, SEGMENTS, rng);

    let slope = r.atan2(h);
    for s in 0..SEGMENTS {
        let t = s as f32 / SEGMENTS as f32;
        g.colors.push(rgb(
            205.0 + 15.0 * (t * TAU).cos(),
            200.0 + 15.0 * (t * TAU).sin(),
            195.0 + 20.0 * t,
        ));
        let mid = (s as f32 + 0.5) / SEGMENTS as f32 * TAU;
        g.normals.push(Vec3::new(mid.cos() * slope.cos(), -slope.sin(), mid.sin() * slope.cos()));
    }
    g.colors.push([195, 205, 215]);
    g.normals.push(Vec3::Y);
    g
}

/// Concentric rings filling a flat disc at height `y`.
fn disc<R: Rng>(
    g: &mut ShapeGeometry,
    radius: f32,
    y: f32,
    ang_steps: usize,
    rings: usize,
    face: usize,
    rng: &mut R,
) {
    for ri in 0..=rings {
        let t = ri as f32 / rings as f32;
        let r = t * radius;
        let count = ((ang_steps as f32 * t).floor() as usize).max(1);
        for j in 0..count {
            let theta = j as f32 / count as f32 * TAU;
            g.push(Vec3::new(r * theta.cos(), y, r * theta.sin()), ri == rings, face, rng);
        }
    }
}

fn rgb(r: f32, g: f32, b: f32) -> [u8; 3] {
    [r, g, b].map(|c| c.round().clamp(0.0, 255.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_shape_names_round_trip() {
        for kind in ShapeKind::ALL {
            assert_eq!(kind.as_str().parse::<ShapeKind>().unwrap(), kind);
        }
        assert_eq!("TORUS".parse::<ShapeKind>().unwrap(), ShapeKind::Torus);
        assert!(matches!(
            "dodecahedron".parse::<ShapeKind>(),
            Err(EngineError::UnknownShape(_))
        ));
    }

    #[test]
    fn test_next_wraps() {
        assert_eq!(ShapeKind::Cube.next(), ShapeKind::Sphere);
        assert_eq!(ShapeKind::Cone.next(), ShapeKind::Cube);
    }

    #[test]
    fn test_faces_are_consistent() {
        let mut rng = SmallRng::seed_from_u64(0);
        for tier in [DeviceTier::Desktop, DeviceTier::Mobile] {
            let lib = ShapeLibrary::new(tier, &mut rng);
            for kind in ShapeKind::ALL {
                let g = lib.get(kind);
                assert!(!g.points.is_empty(), "{kind}");
                assert_eq!(g.colors.len(), g.normals.len(), "{kind}");
                assert!(g.points.iter().all(|p| p.face < g.face_count()), "{kind}");
                assert!(g.points.iter().any(|p| p.is_edge), "{kind}");
                for n in &g.normals {
                    assert_relative_eq!(n.length(), 1.0, epsilon = 1e-4);
                }
            }
        }
    }

    #[test]
    fn test_cube_point_count() {
        let mut rng = SmallRng::seed_from_u64(1);
        let cube = generate(ShapeKind::Cube, DeviceTier::Desktop, &mut rng);
        assert_eq!(cube.points.len(), 6 * 15 * 15);
        let s = shape_scale(DeviceTier::Desktop);
        assert!(cube
            .points
            .iter()
            .all(|p| p.pos.abs().max_element() <= s + 1e-3));
    }

    #[test]
    fn test_sphere_points_on_surface() {
        let mut rng = SmallRng::seed_from_u64(2);
        let sphere = generate(ShapeKind::Sphere, DeviceTier::Mobile, &mut rng);
        for p in &sphere.points {
            assert_relative_eq!(p.pos.length(), 100.0, epsilon = 1e-2);
        }
    }
}
