//! Gesture → intent state machine.
//!
//! Runs once per *delivered* landmark frame (not per display frame). Each
//! delivery rebuilds the global [`Intents`] from scratch, so a formation,
//! orbit or attraction only persists while the gesture producing it does.
//! Effects that act on particles exactly once per delivery (skeleton repel,
//! blast, ribbon pull, spark bursts) are returned as [`Impulse`]s for the
//! field to apply.
//!
//! # Single hand
//!
//! | Gesture | Effect |
//! |---------|--------|
//! | `point` | square formation |
//! | `peace` | circle formation |
//! | `three` | smiley formation |
//! | `fist`, `thumbs` | attract to palm |
//! | `pinch` | ribbon along the pinch trail |
//! | `open` | repel from the hand skeleton; blast if the hand was a fist |
//!
//! # Two hands
//!
//! Evaluated after the per-hand pass and overriding it, first match wins:
//! heart (thumb tips and index tips touching), both `three` → smiley, both
//! `peace` → site name, both `point` → random phrase, both `fist` → spark
//! burst, both `pinch` → orbit, both `open` → snow plus repel.

use std::time::Duration;

use glam::Vec2;
use rand::Rng;

use crate::config::EngineConfig;
use crate::formation::{FormationKind, FormationRequest};
use crate::gesture::Gesture;
use crate::hand::{pinch_point, HandState};
use crate::landmarks::{HandFrame, HandLandmarks, LANDMARK_COUNT, INDEX_TIP, MAX_HANDS, THUMB_TIP};

/// Normalized distance under which both thumb tips, and both index tips,
/// count as touching for the heart gesture.
pub const HEART_TOUCH_DISTANCE: f32 = 0.08;

/// How strongly formations follow the hands: 0 pins them to the canvas
/// centre, 1 puts them under the palm.
pub const ANCHOR_FOLLOW: f32 = 0.25;

/// Sparks per delivery while both fists are held.
pub const BURST_COUNT: usize = 4;

/// How long the blast ring stays on screen.
pub const BLAST_MARKER_DURATION: Duration = Duration::from_millis(500);

/// Global steering state for the particle field.
///
/// The field checks these in priority order: formation, orbit, attract.
/// Snow only changes particle physics when none of the others is active.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Intents {
    pub formation: Option<FormationRequest>,
    /// Centre of the two-hand orbit.
    pub orbit: Option<Vec2>,
    /// Palm to attract toward.
    pub attract: Option<Vec2>,
    pub snow: bool,
}

impl Intents {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Nothing is steering the particles.
    pub fn is_idle(&self) -> bool {
        self.formation.is_none() && self.orbit.is_none() && self.attract.is_none() && !self.snow
    }

    /// Something other than snow holds the particles.
    pub fn is_steering(&self) -> bool {
        self.formation.is_some() || self.orbit.is_some() || self.attract.is_some()
    }
}

/// One-shot effects applied once per delivery.
#[derive(Clone, Debug, PartialEq)]
pub enum Impulse {
    /// Push particles out of the hand silhouette.
    Repel { skeleton: [Vec2; LANDMARK_COUNT] },
    /// Radial kick away from the palm.
    Blast { center: Vec2 },
    /// Pull every particle onto a two-row ribbon following the pinch trail.
    Ribbon { trail: Vec<Vec2>, wind: f32 },
    /// Throw `count` sparks from `center`.
    Burst { center: Vec2, count: usize },
}

/// Expanding ring drawn where a blast went off.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlastMarker {
    pub center: Vec2,
    pub started: Duration,
}

impl BlastMarker {
    /// `0..1` over the marker's lifetime, `None` once expired.
    pub fn progress(&self, now: Duration) -> Option<f32> {
        let elapsed = now.saturating_sub(self.started);
        let t = elapsed.as_secs_f32() / BLAST_MARKER_DURATION.as_secs_f32();
        (t < 1.0).then_some(t)
    }
}

/// Resolved two-hand gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PairGesture {
    Heart,
    BothThree,
    BothPeace,
    BothPoint,
    BothFist,
    BothPinch,
    BothOpen,
}

/// Resolve two hands into a pair gesture, if any.
pub fn pair_gesture(
    a: &HandLandmarks,
    b: &HandLandmarks,
    ga: Gesture,
    gb: Gesture,
) -> Option<PairGesture> {
    let thumbs_touch = a[THUMB_TIP].distance(b[THUMB_TIP]) < HEART_TOUCH_DISTANCE;
    let indexes_touch = a[INDEX_TIP].distance(b[INDEX_TIP]) < HEART_TOUCH_DISTANCE;
    if thumbs_touch && indexes_touch {
        return Some(PairGesture::Heart);
    }
    if ga != gb {
        return None;
    }
    match ga {
        Gesture::Three => Some(PairGesture::BothThree),
        Gesture::Peace => Some(PairGesture::BothPeace),
        Gesture::Point => Some(PairGesture::BothPoint),
        Gesture::Fist => Some(PairGesture::BothFist),
        Gesture::Pinch => Some(PairGesture::BothPinch),
        Gesture::Open => Some(PairGesture::BothOpen),
        _ => None,
    }
}

/// Formation anchor: canvas centre nudged toward `target`.
#[inline]
pub fn formation_anchor(target: Vec2, canvas: Vec2) -> Vec2 {
    let center = canvas * 0.5;
    center + (target - center) * ANCHOR_FOLLOW
}

/// Hand slots plus everything the gesture layer remembers between deliveries.
#[derive(Debug, Default)]
pub struct InteractionState {
    hands: [HandState; MAX_HANDS],
    intents: Intents,
    prev_pair: Option<PairGesture>,
    phrase: Option<String>,
}

impl InteractionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intents(&self) -> &Intents {
        &self.intents
    }

    pub fn hand(&self, slot: usize) -> &HandState {
        &self.hands[slot]
    }

    /// Phrase currently shown for the both-point gesture.
    pub fn phrase(&self) -> Option<&str> {
        self.phrase.as_deref()
    }

    /// Clear every hand-driven state: no hands in view, or a mode switch.
    pub fn reset(&mut self) {
        for hand in &mut self.hands {
            hand.reset();
        }
        self.intents.clear();
        self.prev_pair = None;
    }

    /// Process one delivered frame and return the impulses to apply.
    pub fn update<R: Rng>(
        &mut self,
        frame: &HandFrame,
        canvas: Vec2,
        now: Duration,
        config: &EngineConfig,
        rng: &mut R,
    ) -> Vec<Impulse> {
        let mut impulses = Vec::new();

        if frame.is_empty() {
            self.reset();
            return impulses;
        }

        self.intents.clear();
        let count = frame.len();

        for (slot, hand) in frame.hands().iter().enumerate() {
            self.single_hand(slot, hand, count, canvas, now, &mut impulses);
        }

        if let [a, b] = frame.hands() {
            self.two_hands(a, b, canvas, config, rng, &mut impulses);
        } else {
            self.prev_pair = None;
        }

        for slot in count..MAX_HANDS {
            self.hands[slot].reset();
        }

        impulses
    }

    fn single_hand(
        &mut self,
        slot: usize,
        hand: &HandLandmarks,
        count: usize,
        canvas: Vec2,
        now: Duration,
        impulses: &mut Vec<Impulse>,
    ) {
        let state = &mut self.hands[slot];
        let gesture = state.observe(hand, canvas);
        let palm = hand.palm_screen(canvas);
        let anchor = formation_anchor(palm, canvas);
        let alone = count == 1;

        match gesture {
            Gesture::Point if alone => {
                self.intents.formation = Some(FormationRequest::new(FormationKind::Square, anchor));
            }
            Gesture::Peace if alone => {
                self.intents.formation = Some(FormationRequest::new(FormationKind::Circle, anchor));
            }
            Gesture::Three if alone => {
                self.intents.formation = Some(FormationRequest::new(FormationKind::Smiley, anchor));
            }
            Gesture::Fist | Gesture::Thumbs => self.intents.attract = Some(palm),
            Gesture::Pinch if !alone => self.intents.attract = Some(palm),
            Gesture::Pinch => {
                state.record_pinch(pinch_point(hand, canvas));
                impulses.push(Impulse::Ribbon {
                    trail: state.pinch_trail().iter().copied().collect(),
                    wind: now.as_secs_f32() * 1000.0 * 0.003,
                });
            }
            Gesture::Open => {
                impulses.push(Impulse::Repel {
                    skeleton: hand.screen_points(canvas),
                });
                if state.released_fist() {
                    impulses.push(Impulse::Blast { center: palm });
                }
            }
            _ => {}
        }
    }

    fn two_hands<R: Rng>(
        &mut self,
        a: &HandLandmarks,
        b: &HandLandmarks,
        canvas: Vec2,
        config: &EngineConfig,
        rng: &mut R,
        impulses: &mut Vec<Impulse>,
    ) {
        let pair = pair_gesture(a, b, self.hands[0].gesture(), self.hands[1].gesture());
        let mid = (a.palm_screen(canvas) + b.palm_screen(canvas)) * 0.5;
        let anchor = formation_anchor(mid, canvas);
        let form = |kind| Some(FormationRequest::new(kind, anchor));

        match pair {
            Some(PairGesture::Heart) => self.intents.formation = form(FormationKind::Heart),
            Some(PairGesture::BothThree) => self.intents.formation = form(FormationKind::Smiley),
            Some(PairGesture::BothPeace) => {
                self.intents.formation = form(FormationKind::text(config.site_name.clone()));
            }
            Some(PairGesture::BothPoint) => {
                if self.prev_pair != Some(PairGesture::BothPoint) || self.phrase.is_none() {
                    self.phrase = pick_phrase(&config.phrases, self.phrase.as_deref(), rng);
                }
                if let Some(phrase) = &self.phrase {
                    self.intents.formation = form(FormationKind::text(phrase.clone()));
                }
            }
            Some(PairGesture::BothFist) => impulses.push(Impulse::Burst {
                center: mid,
                count: BURST_COUNT,
            }),
            Some(PairGesture::BothPinch) => self.intents.orbit = Some(anchor),
            Some(PairGesture::BothOpen) => {
                self.intents.snow = true;
                self.intents.orbit = None;
                impulses.push(Impulse::Repel {
                    skeleton: a.screen_points(canvas),
                });
                impulses.push(Impulse::Repel {
                    skeleton: b.screen_points(canvas),
                });
            }
            None => {}
        }

        self.prev_pair = pair;
    }
}

/// Random phrase, never the same as `last` when there is a choice.
fn pick_phrase<R: Rng>(phrases: &[String], last: Option<&str>, rng: &mut R) -> Option<String> {
    let candidates: Vec<&String> = phrases
        .iter()
        .filter(|p| phrases.len() == 1 || Some(p.as_str()) != last)
        .collect();
    if candidates.is_empty() {
        return phrases.first().cloned();
    }
    Some(candidates[rng.gen_range(0..candidates.len())].clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{heart_pair, Pose, SyntheticHand};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    const CANVAS: Vec2 = Vec2::new(1000.0, 800.0);

    fn run(state: &mut InteractionState, frame: HandFrame, rng: &mut SmallRng) -> Vec<Impulse> {
        state.update(&frame, CANVAS, Duration::from_millis(16), &EngineConfig::default(), rng)
    }

    fn one(pose: Pose) -> HandFrame {
        HandFrame::one(SyntheticHand::new(pose).build())
    }

    fn pair(pose: Pose) -> HandFrame {
        HandFrame::two(
            SyntheticHand::new(pose).at(Vec2::new(0.3, 0.5)).build(),
            SyntheticHand::new(pose).at(Vec2::new(0.7, 0.5)).build(),
        )
    }

    #[test]
    fn test_single_hand_formations() {
        let mut rng = SmallRng::seed_from_u64(0);
        let mut state = InteractionState::new();
        for (pose, kind) in [
            (Pose::Point, FormationKind::Square),
            (Pose::Peace, FormationKind::Circle),
            (Pose::Three, FormationKind::Smiley),
        ] {
            run(&mut state, one(pose), &mut rng);
            let formation = state.intents().formation.as_ref().unwrap();
            assert_eq!(formation.kind, kind);
            // Palm at the centre of the camera frame → anchor at canvas centre.
            assert!((formation.anchor - CANVAS * 0.5).length() < 1e-3);
        }
    }

    #[test]
    fn test_fist_attracts_to_palm() {
        let mut rng = SmallRng::seed_from_u64(0);
        let mut state = InteractionState::new();
        let hand = SyntheticHand::new(Pose::Fist).at(Vec2::new(0.2, 0.3)).build();
        run(&mut state, HandFrame::one(hand), &mut rng);
        assert_eq!(state.intents().attract, Some(hand.palm_screen(CANVAS)));
    }

    #[test]
    fn test_open_after_fist_blasts_once() {
        let mut rng = SmallRng::seed_from_u64(0);
        let mut state = InteractionState::new();
        run(&mut state, one(Pose::Fist), &mut rng);
        let impulses = run(&mut state, one(Pose::Open), &mut rng);
        assert!(impulses.iter().any(|i| matches!(i, Impulse::Blast { .. })));
        assert!(impulses.iter().any(|i| matches!(i, Impulse::Repel { .. })));

        let impulses = run(&mut state, one(Pose::Open), &mut rng);
        assert!(!impulses.iter().any(|i| matches!(i, Impulse::Blast { .. })));
    }

    #[test]
    fn test_single_pinch_draws_ribbon() {
        let mut rng = SmallRng::seed_from_u64(0);
        let mut state = InteractionState::new();
        let impulses = run(&mut state, one(Pose::Pinch), &mut rng);
        assert!(matches!(&impulses[..], [Impulse::Ribbon { trail, .. }] if trail.len() == 1));
        assert!(state.intents().is_idle());
    }

    #[test]
    fn test_heart_overrides_hand_gestures() {
        let mut rng = SmallRng::seed_from_u64(0);
        let mut state = InteractionState::new();
        let (a, b) = heart_pair(Vec2::new(0.5, 0.5));
        run(&mut state, HandFrame::two(a, b), &mut rng);
        let formation = state.intents().formation.as_ref().unwrap();
        assert_eq!(formation.kind, FormationKind::Heart);
    }

    #[test]
    fn test_two_hand_table() {
        let mut rng = SmallRng::seed_from_u64(0);
        let mut state = InteractionState::new();

        run(&mut state, pair(Pose::Three), &mut rng);
        assert_eq!(state.intents().formation.as_ref().unwrap().kind, FormationKind::Smiley);

        run(&mut state, pair(Pose::Peace), &mut rng);
        assert_eq!(
            state.intents().formation.as_ref().unwrap().kind,
            FormationKind::text("KATOV")
        );

        run(&mut state, pair(Pose::Pinch), &mut rng);
        assert!(state.intents().orbit.is_some());
        assert!(state.intents().formation.is_none());

        let impulses = run(&mut state, pair(Pose::Fist), &mut rng);
        assert!(impulses
            .iter()
            .any(|i| matches!(i, Impulse::Burst { count: BURST_COUNT, .. })));

        let impulses = run(&mut state, pair(Pose::Open), &mut rng);
        assert!(state.intents().snow);
        assert!(state.intents().orbit.is_none());
        let repels = impulses.iter().filter(|i| matches!(i, Impulse::Repel { .. })).count();
        assert!(repels >= 2);
    }

    #[test]
    fn test_phrase_held_until_gesture_changes() {
        let mut rng = SmallRng::seed_from_u64(9);
        let mut state = InteractionState::new();
        run(&mut state, pair(Pose::Point), &mut rng);
        let first = state.phrase().unwrap().to_string();
        for _ in 0..10 {
            run(&mut state, pair(Pose::Point), &mut rng);
            assert_eq!(state.phrase(), Some(first.as_str()));
        }

        run(&mut state, pair(Pose::Open), &mut rng);
        run(&mut state, pair(Pose::Point), &mut rng);
        assert_ne!(state.phrase(), Some(first.as_str()));
    }

    #[test]
    fn test_empty_frame_clears_everything() {
        let mut rng = SmallRng::seed_from_u64(0);
        let mut state = InteractionState::new();
        run(&mut state, one(Pose::Fist), &mut rng);
        assert!(!state.intents().is_idle());
        run(&mut state, HandFrame::empty(), &mut rng);
        assert!(state.intents().is_idle());
        assert_eq!(state.hand(0).gesture(), Gesture::None);
    }

    #[test]
    fn test_blast_marker_expires() {
        let marker = BlastMarker {
            center: Vec2::ZERO,
            started: Duration::from_millis(100),
        };
        assert_eq!(marker.progress(Duration::from_millis(100)), Some(0.0));
        assert!(marker.progress(Duration::from_millis(350)).is_some());
        assert!(marker.progress(Duration::from_millis(600)).is_none());
    }

    #[test]
    fn test_pick_phrase_avoids_repeat() {
        let mut rng = SmallRng::seed_from_u64(4);
        let phrases = vec!["A".to_string(), "B".to_string()];
        for _ in 0..20 {
            assert_eq!(pick_phrase(&phrases, Some("A"), &mut rng).as_deref(), Some("B"));
        }
        assert_eq!(pick_phrase(&["X".to_string()], Some("X"), &mut rng).as_deref(), Some("X"));
        assert_eq!(pick_phrase(&[], None, &mut rng), None);
    }
}
