//! Single-hand gesture classification.
//!
//! [`classify`] is a pure function of one frame's landmarks. It looks at
//! which fingers are extended (tip well above its PIP joint; y grows
//! downward), whether the tips are folded below the palm, whether the thumb
//! is raised and how close the thumb and index tips are relative to the size
//! of the hand.
//!
//! Resolution order:
//!
//! 1. `Pinch` when the thumb and index tips touch. This wins over a fist
//!    because a pinching hand always has its other fingers curled.
//! 2. `Fist` / `Thumbs` when all four fingers are down or folded below the
//!    palm; `Thumbs` if the thumb tip is raised above its IP joint and the
//!    index knuckle.
//! 3. Finger-count combinations: `Open`, `Point`, `Peace`, `Three`.
//! 4. Anything else is `Other`.

use std::fmt;

use crate::landmarks::{
    HandLandmarks, INDEX_MCP, INDEX_PIP, INDEX_TIP, MIDDLE_PIP, MIDDLE_TIP, PALM, PINKY_PIP,
    PINKY_TIP, RING_PIP, RING_TIP, THUMB_IP, THUMB_TIP,
};

/// How far (normalized y) a fingertip must sit above its PIP joint to count as up.
pub const FINGER_UP_MARGIN: f32 = 0.04;

/// How far the thumb tip must rise above its IP joint and the index MCP.
pub const THUMB_UP_MARGIN: f32 = 0.03;

/// Thumb-to-index distance, as a fraction of hand size, below which the hand pinches.
pub const PINCH_RATIO: f32 = 0.35;

const MIN_HAND_SIZE: f32 = 1e-3;

/// Discrete gesture label for one hand in one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Gesture {
    /// No hand tracked.
    #[default]
    None,
    Fist,
    /// Fist with the thumb raised.
    Thumbs,
    /// Thumb and index tips touching.
    Pinch,
    /// All four fingers extended.
    Open,
    /// Index only.
    Point,
    /// Index and middle.
    Peace,
    /// Index, middle and ring.
    Three,
    /// Tracked, but no known combination.
    Other,
}

impl Gesture {
    /// `Fist` or `Thumbs`; both attract and both arm the open-hand blast.
    #[inline]
    pub fn is_fist_like(self) -> bool {
        matches!(self, Gesture::Fist | Gesture::Thumbs)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Gesture::None => "none",
            Gesture::Fist => "fist",
            Gesture::Thumbs => "thumbs",
            Gesture::Pinch => "pinch",
            Gesture::Open => "open",
            Gesture::Point => "point",
            Gesture::Peace => "peace",
            Gesture::Three => "three",
            Gesture::Other => "other",
        }
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which of the four non-thumb fingers are extended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FingerStates {
    pub index: bool,
    pub middle: bool,
    pub ring: bool,
    pub pinky: bool,
}

impl FingerStates {
    /// Number of extended fingers.
    pub fn count(self) -> usize {
        [self.index, self.middle, self.ring, self.pinky]
            .into_iter()
            .filter(|&up| up)
            .count()
    }
}

#[inline]
fn finger_up(hand: &HandLandmarks, tip: usize, pip: usize) -> bool {
    hand[tip].y < hand[pip].y - FINGER_UP_MARGIN
}

pub fn finger_states(hand: &HandLandmarks) -> FingerStates {
    FingerStates {
        index: finger_up(hand, INDEX_TIP, INDEX_PIP),
        middle: finger_up(hand, MIDDLE_TIP, MIDDLE_PIP),
        ring: finger_up(hand, RING_TIP, RING_PIP),
        pinky: finger_up(hand, PINKY_TIP, PINKY_PIP),
    }
}

/// Thumb tip raised above both its IP joint and the index knuckle.
pub fn is_thumb_up(hand: &HandLandmarks) -> bool {
    let tip = hand[THUMB_TIP].y;
    tip < hand[THUMB_IP].y - THUMB_UP_MARGIN && tip < hand[INDEX_MCP].y - THUMB_UP_MARGIN
}

/// Thumb and index tips closer than [`PINCH_RATIO`] of the hand size.
///
/// Shared by the classifier and the solid-mode zoom channel.
pub fn is_pinching(hand: &HandLandmarks) -> bool {
    let size = hand.hand_size().max(MIN_HAND_SIZE);
    hand[THUMB_TIP].distance(hand[INDEX_TIP]) < PINCH_RATIO * size
}

fn tips_below_palm(hand: &HandLandmarks) -> bool {
    let palm_y = hand[PALM].y;
    [INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP]
        .iter()
        .all(|&tip| hand[tip].y > palm_y)
}

/// Classify one hand. Pure: the same landmarks always give the same label.
pub fn classify(hand: &HandLandmarks) -> Gesture {
    if is_pinching(hand) {
        return Gesture::Pinch;
    }

    let fingers = finger_states(hand);
    let is_fist = fingers.count() == 0 || tips_below_palm(hand);
    if is_fist {
        return if is_thumb_up(hand) {
            Gesture::Thumbs
        } else {
            Gesture::Fist
        };
    }

    match (fingers.index, fingers.middle, fingers.ring, fingers.pinky) {
        (true, true, true, true) => Gesture::Open,
        (true, false, false, false) => Gesture::Point,
        (true, true, false, false) => Gesture::Peace,
        (true, true, true, false) => Gesture::Three,
        _ => Gesture::Other,
    }
}
