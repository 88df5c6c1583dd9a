//! Per-hand tracking state.

use std::collections::VecDeque;

use glam::Vec2;

use crate::gesture::{classify, Gesture};
use crate::landmarks::{HandLandmarks, INDEX_TIP, THUMB_TIP};

/// Most pinch samples kept for the ribbon.
pub const TRAIL_CAPACITY: usize = 50;

/// A new pinch sample is appended only once the pinch moved this far (px);
/// closer samples replace the newest one.
pub const TRAIL_MIN_STEP: f32 = 3.0;

/// Low-pass factor for the index fingertip.
pub const TIP_SMOOTHING: f32 = 0.45;

/// State for one tracked hand slot (0 or 1).
#[derive(Clone, Debug, Default)]
pub struct HandState {
    gesture: Gesture,
    prev_gesture: Gesture,
    /// `None` until the first observation after a reset.
    smoothed_tip: Option<Vec2>,
    pinch_trail: VecDeque<Vec2>,
}

impl HandState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take in a new observation of this hand and classify it.
    ///
    /// Shifts the current gesture into `prev_gesture`, smooths the index tip
    /// and drops the pinch trail once the hand stops pinching.
    pub fn observe(&mut self, hand: &HandLandmarks, canvas: Vec2) -> Gesture {
        let raw_tip = hand.to_screen(INDEX_TIP, canvas);
        self.smoothed_tip = Some(match self.smoothed_tip {
            Some(tip) => tip + (raw_tip - tip) * TIP_SMOOTHING,
            None => raw_tip,
        });

        self.prev_gesture = self.gesture;
        self.gesture = classify(hand);

        if self.gesture != Gesture::Pinch {
            self.pinch_trail.clear();
        }
        self.gesture
    }

    /// Append a pinch sample to the trail.
    pub fn record_pinch(&mut self, point: Vec2) {
        match self.pinch_trail.back_mut() {
            Some(last) if last.distance(point) <= TRAIL_MIN_STEP => *last = point,
            _ => self.pinch_trail.push_back(point),
        }
        while self.pinch_trail.len() > TRAIL_CAPACITY {
            self.pinch_trail.pop_front();
        }
    }

    /// Back to neutral: used when the hand leaves the frame.
    pub fn reset(&mut self) {
        self.gesture = Gesture::None;
        self.prev_gesture = Gesture::None;
        self.smoothed_tip = None;
        self.pinch_trail.clear();
    }

    #[inline]
    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    #[inline]
    pub fn prev_gesture(&self) -> Gesture {
        self.prev_gesture
    }

    /// Opened the hand right after a fist: the blast trigger.
    #[inline]
    pub fn released_fist(&self) -> bool {
        self.gesture == Gesture::Open && self.prev_gesture.is_fist_like()
    }

    #[inline]
    pub fn smoothed_tip(&self) -> Option<Vec2> {
        self.smoothed_tip
    }

    pub fn pinch_trail(&self) -> &VecDeque<Vec2> {
        &self.pinch_trail
    }
}

/// Midpoint of thumb and index tips in canvas pixels.
pub fn pinch_point(hand: &HandLandmarks, canvas: Vec2) -> Vec2 {
    (hand.to_screen(THUMB_TIP, canvas) + hand.to_screen(INDEX_TIP, canvas)) * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{Pose, SyntheticHand};

    const CANVAS: Vec2 = Vec2::new(800.0, 600.0);

    #[test]
    fn test_observe_shifts_gestures() {
        let mut state = HandState::new();
        state.observe(&SyntheticHand::new(Pose::Fist).build(), CANVAS);
        state.observe(&SyntheticHand::new(Pose::Open).build(), CANVAS);
        assert_eq!(state.prev_gesture(), Gesture::Fist);
        assert_eq!(state.gesture(), Gesture::Open);
        assert!(state.released_fist());
    }

    #[test]
    fn test_tip_smoothing_converges() {
        let mut state = HandState::new();
        let hand = SyntheticHand::new(Pose::Point).build();
        let target = hand.to_screen(INDEX_TIP, CANVAS);
        assert_eq!(state.smoothed_tip(), None);
        state.observe(&hand, CANVAS);
        assert_eq!(state.smoothed_tip(), Some(target));

        let moved = SyntheticHand::new(Pose::Point).at(Vec2::new(0.2, 0.5)).build();
        let moved_target = moved.to_screen(INDEX_TIP, CANVAS);
        state.observe(&moved, CANVAS);
        let expected = target + (moved_target - target) * TIP_SMOOTHING;
        assert!(state.smoothed_tip().unwrap().distance(expected) < 1e-3);
        for _ in 0..40 {
            state.observe(&moved, CANVAS);
        }
        assert!(state.smoothed_tip().unwrap().distance(moved_target) < 0.01);
    }

    #[test]
    fn test_reset_forgets_smoothed_tip() {
        let mut state = HandState::new();
        let before = SyntheticHand::new(Pose::Point).at(Vec2::new(0.2, 0.5)).build();
        for _ in 0..10 {
            state.observe(&before, CANVAS);
        }
        state.reset();
        assert_eq!(state.smoothed_tip(), None);

        // The hand comes back elsewhere: no pull toward the old position.
        let after = SyntheticHand::new(Pose::Point).at(Vec2::new(0.8, 0.5)).build();
        state.observe(&after, CANVAS);
        assert_eq!(state.smoothed_tip(), Some(after.to_screen(INDEX_TIP, CANVAS)));
    }

    #[test]
    fn test_trail_replaces_close_samples() {
        let mut state = HandState::new();
        state.record_pinch(Vec2::new(0.0, 0.0));
        state.record_pinch(Vec2::new(1.0, 1.0));
        assert_eq!(state.pinch_trail().len(), 1);
        assert_eq!(state.pinch_trail()[0], Vec2::new(1.0, 1.0));
        state.record_pinch(Vec2::new(10.0, 1.0));
        assert_eq!(state.pinch_trail().len(), 2);
    }

    #[test]
    fn test_trail_is_bounded() {
        let mut state = HandState::new();
        for i in 0..200 {
            state.record_pinch(Vec2::new(i as f32 * 5.0, 0.0));
        }
        assert_eq!(state.pinch_trail().len(), TRAIL_CAPACITY);
        assert_eq!(state.pinch_trail().back(), Some(&Vec2::new(995.0, 0.0)));
    }

    #[test]
    fn test_trail_cleared_when_pinch_ends() {
        let mut state = HandState::new();
        state.observe(&SyntheticHand::new(Pose::Pinch).build(), CANVAS);
        state.record_pinch(Vec2::new(5.0, 5.0));
        state.observe(&SyntheticHand::new(Pose::Open).build(), CANVAS);
        assert!(state.pinch_trail().is_empty());
    }

    #[test]
    fn test_reset() {
        let mut state = HandState::new();
        state.observe(&SyntheticHand::new(Pose::Fist).build(), CANVAS);
        state.reset();
        assert_eq!(state.gesture(), Gesture::None);
        assert_eq!(state.prev_gesture(), Gesture::None);
        assert!(!state.released_fist());
    }
}
