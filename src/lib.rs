//! # handfield - gesture-driven particle field
//!
//! Hand poses from a landmark tracker steer a field of particles: fists pull
//! them in, open hands push them away, and finger combinations morph them
//! into outlines and text. A second mode swaps the field for a rotatable 3D
//! solid that you spin with swipes and zoom with held pinches.
//!
//! The crate is the engine core. It does not talk to a camera or a window:
//! hand landmarks come in through the [`LandmarkSource`] trait, and each
//! frame goes out as a [`DrawList`] of circles and rings. The optional
//! `viewer` feature adds a winit + wgpu desktop host driven by mouse and
//! keyboard.
//!
//! ## Quick Start
//!
//! ```
//! use std::time::Duration;
//! use handfield::prelude::*;
//!
//! let mut source = ScriptedSource::new();
//! source.repeat(HandFrame::one(SyntheticHand::new(Pose::Peace).build()), 60);
//!
//! let mut engine = Engine::new(EngineConfig::for_tier(DeviceTier::Desktop).with_seed(42), source);
//! engine.start(Duration::ZERO)?;
//!
//! let mut time = Time::fixed(Duration::from_millis(16));
//! for _ in 0..60 {
//!     time.update();
//!     engine.tick(time.now());
//! }
//! assert!(engine.intents().formation.is_some());
//! # Ok::<(), EngineError>(())
//! ```
//!
//! ## Gestures
//!
//! | One hand | Effect |
//! |----------|--------|
//! | fist / thumbs | attract to the palm |
//! | open | repel along the hand skeleton (blast if it was a fist) |
//! | point | square outline |
//! | peace | circle outline |
//! | three | smiley |
//! | pinch | draw a ribbon along the pinch trail |
//!
//! | Two hands | Effect |
//! |-----------|--------|
//! | heart (thumbs and index tips touching) | heart outline |
//! | both three | smiley |
//! | both peace | site name |
//! | both point | random phrase |
//! | both fist | spark burst |
//! | both pinch | planet with ring |
//! | both open | snow, plus repel |
//!
//! ## Frame pipeline
//!
//! Every [`Engine::tick`] runs poll → classify → intents → field update →
//! collisions → render, single-threaded and in that order. Trackers usually
//! run on their own thread and hand frames over with [`ChannelSource`]; the
//! engine never blocks on them.
//!
//! ## Hardware tiers
//!
//! [`DeviceTier::Mobile`] lowers the particle ceiling, thins the solid point
//! clouds, shrinks formations and skips the collision pass.

pub mod collision;
pub mod config;
pub mod engine;
pub mod error;
pub mod field;
pub mod formation;
pub mod geometry;
pub mod gesture;
pub mod glyphs;
pub mod hand;
pub mod interaction;
pub mod landmarks;
pub mod particle;
pub mod render;
pub mod solid;
pub mod synthetic;
pub mod time;

#[cfg(feature = "viewer")]
pub mod viewer;

pub use config::{DeviceTier, EngineConfig};
pub use engine::{Engine, EngineMode};
pub use error::{EngineError, SourceError};
pub use geometry::ShapeKind;
pub use gesture::Gesture;
pub use landmarks::{ChannelSource, HandFrame, HandLandmarks, LandmarkSource, ScriptedSource};
pub use render::{BlendMode, Canvas, CircleInstance, DrawList, RingStroke};

pub use glam::{Vec2, Vec3};

/// Everything needed to embed an engine.
pub mod prelude {
    pub use crate::config::{DeviceTier, EngineConfig};
    pub use crate::engine::{Engine, EngineMode};
    pub use crate::error::{EngineError, SourceError};
    pub use crate::geometry::ShapeKind;
    pub use crate::gesture::Gesture;
    pub use crate::landmarks::{ChannelSource, HandFrame, HandLandmarks, LandmarkSource, ScriptedSource};
    pub use crate::render::{BlendMode, Canvas, CircleInstance, DrawList, RingStroke};
    pub use crate::synthetic::{Pose, SyntheticHand};
    pub use crate::time::Time;
    pub use glam::{Vec2, Vec3};
}
