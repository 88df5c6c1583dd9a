//! Hand landmark input.
//!
//! A pose tracker delivers, at its own cadence, zero to two hands per result.
//! Each hand is 21 normalized `(x, y)` keypoints in a fixed skeletal order
//! (wrist, then four joints per finger from thumb to pinky). The engine never
//! estimates poses itself; it polls a [`LandmarkSource`] once per tick and
//! works with whatever was delivered most recently.
//!
//! Two sources ship with the crate:
//!
//! | Source | Use |
//! |--------|-----|
//! | [`ScriptedSource`] | Pre-recorded frame sequences for tests and replays |
//! | [`ChannelSource`] | A tracker running on another thread, publishing over `mpsc` |
//!
//! # Example
//!
//! ```
//! use handfield::landmarks::{ChannelSource, HandFrame, LandmarkSource};
//!
//! let (publisher, mut source) = ChannelSource::pair();
//! source.open().unwrap();
//!
//! publisher.send(HandFrame::empty()).unwrap();
//! assert!(source.poll().is_some());
//! assert!(source.poll().is_none()); // nothing new since the last poll
//! ```

use std::collections::VecDeque;
use std::ops::Index;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;

// ============================================================================
// Landmark indices
// ============================================================================

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

/// Keypoints per hand.
pub const LANDMARK_COUNT: usize = 21;

/// Most hands a single frame may carry; extra hands are dropped.
pub const MAX_HANDS: usize = 2;

/// The landmark used as "the palm" everywhere (middle-finger MCP).
pub const PALM: usize = MIDDLE_MCP;

// ============================================================================
// HandLandmarks
// ============================================================================

/// One tracked hand: 21 normalized points, `(0, 0)` top-left of the camera
/// image, `(1, 1)` bottom-right.
///
/// The camera image is mirrored relative to the display, so screen mapping
/// flips the x axis (see [`HandLandmarks::to_screen`]).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HandLandmarks {
    points: [Vec2; LANDMARK_COUNT],
}

impl HandLandmarks {
    pub fn new(points: [Vec2; LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    /// Build from a slice, as delivered by most trackers.
    ///
    /// Returns `None` unless the slice holds exactly 21 points.
    pub fn from_slice(points: &[Vec2]) -> Option<Self> {
        let points: [Vec2; LANDMARK_COUNT] = points.try_into().ok()?;
        Some(Self { points })
    }

    #[inline]
    pub fn points(&self) -> &[Vec2; LANDMARK_COUNT] {
        &self.points
    }

    /// Normalized palm position.
    #[inline]
    pub fn palm(&self) -> Vec2 {
        self.points[PALM]
    }

    /// Wrist to palm distance in normalized units. Used as the hand's scale.
    #[inline]
    pub fn hand_size(&self) -> f32 {
        self.points[WRIST].distance(self.points[PALM])
    }

    /// Map landmark `index` to canvas pixels, mirroring x.
    #[inline]
    pub fn to_screen(&self, index: usize, canvas: Vec2) -> Vec2 {
        mirror_to_screen(self.points[index], canvas)
    }

    /// Palm position in canvas pixels.
    #[inline]
    pub fn palm_screen(&self, canvas: Vec2) -> Vec2 {
        self.to_screen(PALM, canvas)
    }

    /// All 21 points in canvas pixels.
    pub fn screen_points(&self, canvas: Vec2) -> [Vec2; LANDMARK_COUNT] {
        self.points.map(|p| mirror_to_screen(p, canvas))
    }

    /// Copy with one point replaced.
    pub fn with_point(mut self, index: usize, point: Vec2) -> Self {
        self.points[index] = point;
        self
    }
}

impl Index<usize> for HandLandmarks {
    type Output = Vec2;

    #[inline]
    fn index(&self, index: usize) -> &Vec2 {
        &self.points[index]
    }
}

#[inline]
fn mirror_to_screen(p: Vec2, canvas: Vec2) -> Vec2 {
    Vec2::new((1.0 - p.x) * canvas.x, p.y * canvas.y)
}

// ============================================================================
// HandFrame
// ============================================================================

/// One tracker result: zero, one or two hands.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HandFrame {
    hands: Vec<HandLandmarks>,
}

impl HandFrame {
    /// Frame from any number of hands; only the first [`MAX_HANDS`] are kept.
    pub fn new(hands: impl IntoIterator<Item = HandLandmarks>) -> Self {
        Self {
            hands: hands.into_iter().take(MAX_HANDS).collect(),
        }
    }

    /// A result with no hands in view.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn one(hand: HandLandmarks) -> Self {
        Self { hands: vec![hand] }
    }

    pub fn two(first: HandLandmarks, second: HandLandmarks) -> Self {
        Self {
            hands: vec![first, second],
        }
    }

    #[inline]
    pub fn hands(&self) -> &[HandLandmarks] {
        &self.hands
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.hands.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }
}

// ============================================================================
// LandmarkSource
// ============================================================================

/// Anything that can feed hand frames to the engine.
///
/// The engine calls [`open`](Self::open) once from `start()`,
/// [`poll`](Self::poll) once per tick and [`close`](Self::close) on teardown.
/// `poll` must never block.
pub trait LandmarkSource {
    /// Acquire the underlying input (camera, tracker, channel).
    fn open(&mut self) -> Result<(), SourceError>;

    /// The newest frame delivered since the previous poll, if any.
    fn poll(&mut self) -> Option<HandFrame>;

    /// Release the input. Must be safe to call more than once.
    fn close(&mut self) {}
}

impl<S: LandmarkSource + ?Sized> LandmarkSource for Box<S> {
    fn open(&mut self) -> Result<(), SourceError> {
        (**self).open()
    }

    fn poll(&mut self) -> Option<HandFrame> {
        (**self).poll()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

// ============================================================================
// ScriptedSource
// ============================================================================

/// Plays back a fixed sequence of deliveries, one per poll.
///
/// Each step is either a delivered frame or a gap (`None`) where the tracker
/// had nothing new. Once the script runs out every poll is a gap.
#[derive(Clone, Debug, Default)]
pub struct ScriptedSource {
    steps: VecDeque<Option<HandFrame>>,
    failure: Option<String>,
    open: bool,
    closes: usize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source whose `open()` fails with [`SourceError::Unavailable`].
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Queue one delivered frame.
    pub fn push(&mut self, frame: HandFrame) -> &mut Self {
        self.steps.push_back(Some(frame));
        self
    }

    /// Queue the same frame for `count` consecutive polls.
    pub fn repeat(&mut self, frame: HandFrame, count: usize) -> &mut Self {
        self.steps
            .extend(std::iter::repeat(Some(frame)).take(count));
        self
    }

    /// Queue a poll that delivers nothing.
    pub fn push_gap(&mut self) -> &mut Self {
        self.steps.push_back(None);
        self
    }

    /// Steps not yet consumed.
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// How many times `close()` has been called.
    pub fn close_count(&self) -> usize {
        self.closes
    }
}

impl LandmarkSource for ScriptedSource {
    fn open(&mut self) -> Result<(), SourceError> {
        if let Some(reason) = &self.failure {
            return Err(SourceError::Unavailable(reason.clone()));
        }
        self.open = true;
        Ok(())
    }

    fn poll(&mut self) -> Option<HandFrame> {
        if !self.open {
            return None;
        }
        self.steps.pop_front().flatten()
    }

    fn close(&mut self) {
        self.open = false;
        self.closes += 1;
    }
}

// ============================================================================
// ChannelSource
// ============================================================================

/// Receives frames from a tracker thread over an `mpsc` channel.
///
/// Polling drains the channel and keeps only the newest frame, so a tracker
/// that runs faster than the display never builds up latency.
///
/// [`close`](LandmarkSource::close) drops the receiving end, so every later
/// `send` on the publisher fails, and joins the tracker thread started by
/// [`spawn`](Self::spawn). Trackers must return once a send fails.
#[derive(Debug)]
pub struct ChannelSource {
    rx: Option<Receiver<HandFrame>>,
    tracker: Option<JoinHandle<()>>,
    pending: Option<HandFrame>,
    open: bool,
}

impl ChannelSource {
    pub fn new(rx: Receiver<HandFrame>) -> Self {
        Self {
            rx: Some(rx),
            tracker: None,
            pending: None,
            open: false,
        }
    }

    /// Create a connected publisher / source pair.
    pub fn pair() -> (Sender<HandFrame>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self::new(rx))
    }

    /// Run `tracker` on its own thread and return the receiving end.
    ///
    /// The thread owns the sender; when `tracker` returns the source reports
    /// [`SourceError::Disconnected`] on the next `open()`.
    pub fn spawn<F>(tracker: F) -> Self
    where
        F: FnOnce(Sender<HandFrame>) + Send + 'static,
    {
        let (tx, mut source) = Self::pair();
        source.tracker = Some(thread::spawn(move || tracker(tx)));
        source
    }
}

impl LandmarkSource for ChannelSource {
    fn open(&mut self) -> Result<(), SourceError> {
        let rx = self.rx.as_ref().ok_or(SourceError::Disconnected)?;
        match rx.try_recv() {
            Ok(frame) => self.pending = Some(frame),
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => return Err(SourceError::Disconnected),
        }
        self.open = true;
        Ok(())
    }

    fn poll(&mut self) -> Option<HandFrame> {
        if !self.open {
            return None;
        }
        let rx = self.rx.as_ref()?;
        let mut latest = self.pending.take();
        loop {
            match rx.try_recv() {
                Ok(frame) => latest = Some(frame),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if latest.is_none() {
                        log::debug!("landmark publisher gone; no further frames");
                    }
                    break;
                }
            }
        }
        latest
    }

    fn close(&mut self) {
        self.open = false;
        self.pending = None;
        self.rx = None;
        if let Some(tracker) = self.tracker.take() {
            if tracker.join().is_err() {
                log::warn!("landmark tracker thread panicked");
            }
        }
    }
}

impl Drop for ChannelSource {
    fn drop(&mut self) {
        self.close();
    }
}
