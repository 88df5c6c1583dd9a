//! Synthetic hand poses.
//!
//! Builds plausible 21-point skeletons for each gesture so the engine can be
//! driven without a camera: scenario tests, benches and the mouse-driven
//! viewer all use it.
//!
//! ```
//! use glam::Vec2;
//! use handfield::gesture::{classify, Gesture};
//! use handfield::synthetic::{Pose, SyntheticHand};
//!
//! let hand = SyntheticHand::new(Pose::Fist).at(Vec2::new(0.3, 0.6)).build();
//! assert_eq!(classify(&hand), Gesture::Fist);
//! ```

use glam::Vec2;

use crate::gesture::Gesture;
use crate::landmarks::{
    HandLandmarks, INDEX_MCP, INDEX_TIP, LANDMARK_COUNT, MIDDLE_MCP, PINKY_MCP, RING_MCP,
    THUMB_CMC, THUMB_IP, THUMB_MCP, THUMB_TIP, WRIST,
};

/// Hand shapes the builder knows how to pose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pose {
    Open,
    Fist,
    Thumbs,
    Pinch,
    Point,
    Peace,
    Three,
    /// Index and pinky raised; classifies as [`Gesture::Other`].
    Horns,
}

impl Pose {
    pub const ALL: [Pose; 8] = [
        Pose::Open,
        Pose::Fist,
        Pose::Thumbs,
        Pose::Pinch,
        Pose::Point,
        Pose::Peace,
        Pose::Three,
        Pose::Horns,
    ];

    /// The label [`classify`](crate::gesture::classify) gives this pose.
    pub fn gesture(self) -> Gesture {
        match self {
            Pose::Open => Gesture::Open,
            Pose::Fist => Gesture::Fist,
            Pose::Thumbs => Gesture::Thumbs,
            Pose::Pinch => Gesture::Pinch,
            Pose::Point => Gesture::Point,
            Pose::Peace => Gesture::Peace,
            Pose::Three => Gesture::Three,
            Pose::Horns => Gesture::Other,
        }
    }

    /// Extended state of index, middle, ring, pinky.
    fn fingers(self) -> [bool; 4] {
        match self {
            Pose::Open => [true; 4],
            Pose::Fist | Pose::Thumbs | Pose::Pinch => [false; 4],
            Pose::Point => [true, false, false, false],
            Pose::Peace => [true, true, false, false],
            Pose::Three => [true, true, true, false],
            Pose::Horns => [true, false, false, true],
        }
    }
}

// Offsets from the palm (middle MCP), normalized units, y down.
const WRIST_OFFSET: Vec2 = Vec2::new(0.0, 0.18);
const MCP_OFFSETS: [Vec2; 4] = [
    Vec2::new(-0.05, 0.01),
    Vec2::new(0.0, 0.0),
    Vec2::new(0.04, 0.01),
    Vec2::new(0.08, 0.03),
];
const FINGER_MCPS: [usize; 4] = [INDEX_MCP, MIDDLE_MCP, RING_MCP, PINKY_MCP];
// pip, dip, tip y offsets from the finger's MCP
const EXTENDED: [f32; 3] = [-0.05, -0.08, -0.11];
const CURLED: [f32; 3] = [-0.03, 0.0, 0.03];

/// Builder for a single synthetic hand.
#[derive(Clone, Debug)]
pub struct SyntheticHand {
    pose: Pose,
    palm: Vec2,
    overrides: Vec<(usize, Vec2)>,
}

impl SyntheticHand {
    /// A hand in `pose`, palm at the centre of the camera frame.
    pub fn new(pose: Pose) -> Self {
        Self {
            pose,
            palm: Vec2::splat(0.5),
            overrides: Vec::new(),
        }
    }

    /// Place the palm at a normalized camera position.
    pub fn at(mut self, palm: Vec2) -> Self {
        self.palm = palm;
        self
    }

    /// Place the palm so that it lands on `screen` once mirrored onto a
    /// canvas of size `canvas`.
    pub fn at_screen(self, screen: Vec2, canvas: Vec2) -> Self {
        let palm = Vec2::new(1.0 - screen.x / canvas.x, screen.y / canvas.y);
        self.at(palm)
    }

    /// Override one landmark after posing.
    pub fn with_landmark(mut self, index: usize, point: Vec2) -> Self {
        self.overrides.push((index, point));
        self
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn build(&self) -> HandLandmarks {
        let p = self.palm;
        let mut pts = [p; LANDMARK_COUNT];

        pts[WRIST] = p + WRIST_OFFSET;

        for ((&mcp_idx, &offset), &up) in FINGER_MCPS
            .iter()
            .zip(MCP_OFFSETS.iter())
            .zip(self.pose.fingers().iter())
        {
            let mcp = p + offset;
            pts[mcp_idx] = mcp;
            let joints = if up { EXTENDED } else { CURLED };
            for (k, dy) in joints.iter().enumerate() {
                pts[mcp_idx + 1 + k] = mcp + Vec2::new(0.0, *dy);
            }
        }

        let thumb: [Vec2; 4] = match self.pose {
            Pose::Thumbs => [
                Vec2::new(-0.06, 0.13),
                Vec2::new(-0.09, 0.06),
                Vec2::new(-0.09, -0.03),
                Vec2::new(-0.09, -0.08),
            ],
            Pose::Pinch => [
                Vec2::new(-0.06, 0.12),
                Vec2::new(-0.10, 0.04),
                Vec2::new(-0.08, -0.02),
                Vec2::new(-0.065, -0.035),
            ],
            _ => [
                Vec2::new(-0.06, 0.13),
                Vec2::new(-0.10, 0.09),
                Vec2::new(-0.12, 0.06),
                Vec2::new(-0.14, 0.05),
            ],
        };
        for (idx, offset) in [THUMB_CMC, THUMB_MCP, THUMB_IP, THUMB_TIP]
            .into_iter()
            .zip(thumb)
        {
            pts[idx] = p + offset;
        }

        if self.pose == Pose::Pinch {
            // Index bends forward to meet the thumb.
            pts[INDEX_TIP] = p + Vec2::new(-0.06, -0.04);
        }

        for &(idx, point) in &self.overrides {
            pts[idx] = point;
        }

        HandLandmarks::new(pts)
    }
}

impl From<Pose> for SyntheticHand {
    fn from(pose: Pose) -> Self {
        SyntheticHand::new(pose)
    }
}

/// Two hands meeting at `center` with thumb tips and index tips touching,
/// the way people frame a heart with both hands.
pub fn heart_pair(center: Vec2) -> (HandLandmarks, HandLandmarks) {
    let thumb = center + Vec2::new(0.0, 0.05);
    let index = center + Vec2::new(0.0, -0.05);
    let side = Vec2::new(0.1, 0.0);

    let hand = |dir: f32| {
        let nudge = Vec2::new(0.01 * dir, 0.0);
        SyntheticHand::new(Pose::Open)
            .at(center + side * dir)
            .with_landmark(THUMB_TIP, thumb + nudge)
            .with_landmark(INDEX_TIP, index + nudge)
            .build()
    };
    (hand(-1.0), hand(1.0))
}
