//! The engine context and its host-facing lifecycle.
//!
//! An [`Engine`] owns everything one running instance needs: the landmark
//! source, the particle field, gesture state, the solid controller and the
//! draw list for the current frame. Nothing is global, so several engines
//! (or tests) can run side by side.
//!
//! # Lifecycle
//!
//! ```text
//! new ──start()──▶ running ──destroy()──▶ destroyed
//!        │                      ▲
//!        └── Err: stays stopped ┘ (host may call start() again)
//! ```
//!
//! Each [`tick`](Engine::tick) runs, in order: poll the source, classify and
//! update intents, apply impulses, update the particle field, resolve
//! collisions, render. In solid mode the middle steps are replaced by the
//! swipe/zoom controller.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use handfield::synthetic::{Pose, SyntheticHand};
//! use handfield::{Engine, EngineConfig, HandFrame, ScriptedSource};
//!
//! let mut source = ScriptedSource::new();
//! source.repeat(HandFrame::one(SyntheticHand::new(Pose::Fist).build()), 30);
//!
//! let mut engine = Engine::new(EngineConfig::default().with_seed(1), source);
//! engine.start(Duration::ZERO)?;
//! for frame in 1..=30 {
//!     let list = engine.tick(Duration::from_millis(frame * 16)).expect("running");
//!     assert!(!list.circles.is_empty());
//! }
//! assert!(engine.intents().attract.is_some());
//! # Ok::<(), handfield::EngineError>(())
//! ```

use std::time::Duration;

use glam::Vec2;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::collision::CollisionResolver;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::field::{FrameContext, ParticleField};
use crate::formation::FormationCache;
use crate::geometry::{ShapeKind, ShapeLibrary};
use crate::interaction::{BlastMarker, Impulse, InteractionState, Intents};
use crate::landmarks::LandmarkSource;
use crate::render::{render_particles, render_solid, DrawList};
use crate::solid::SolidController;

/// Canvas size used until the host calls [`Engine::resize`].
pub const DEFAULT_CANVAS: Vec2 = Vec2::new(1280.0, 720.0);

/// Which scene the engine drives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EngineMode {
    /// Free particle field steered by hand gestures.
    #[default]
    Particles,
    /// A single rotatable, zoomable solid.
    Solid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lifecycle {
    Stopped,
    Running,
    Destroyed,
}

/// One engine instance.
pub struct Engine<S: LandmarkSource> {
    config: EngineConfig,
    source: S,
    lifecycle: Lifecycle,
    mode: EngineMode,
    canvas: Vec2,
    rng: SmallRng,

    field: ParticleField,
    formation: FormationCache,
    interaction: InteractionState,
    collisions: CollisionResolver,
    blast: Option<BlastMarker>,

    shapes: ShapeLibrary,
    shape: ShapeKind,
    solid: SolidController,

    draw: DrawList,
}

impl<S: LandmarkSource> Engine<S> {
    pub fn new(config: EngineConfig, source: S) -> Self {
        let mut rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let shapes = ShapeLibrary::new(config.tier, &mut rng);

        Self {
            field: ParticleField::new(config.max_particles),
            collisions: CollisionResolver::new(config.collision_cell_size, config.restitution),
            formation: FormationCache::new(),
            interaction: InteractionState::new(),
            blast: None,
            shapes,
            shape: ShapeKind::default(),
            solid: SolidController::new(),
            draw: DrawList::new(),
            lifecycle: Lifecycle::Stopped,
            mode: EngineMode::default(),
            canvas: DEFAULT_CANVAS,
            rng,
            source,
            config,
        }
    }

    // ------------------------------------------------------------------------
    // Host surface
    // ------------------------------------------------------------------------

    /// Acquire the landmark input and begin running.
    ///
    /// On failure the error is logged once and returned; the engine stays
    /// stopped and does not retry. Calling `start` on a running engine is a
    /// no-op.
    pub fn start(&mut self, now: Duration) -> Result<(), EngineError> {
        match self.lifecycle {
            Lifecycle::Destroyed => return Err(EngineError::Destroyed),
            Lifecycle::Running => return Ok(()),
            Lifecycle::Stopped => {}
        }

        if let Err(err) = self.source.open() {
            log::error!("landmark input failed to open: {err}");
            return Err(err.into());
        }

        self.lifecycle = Lifecycle::Running;
        self.field.reset_ambient(now);
        if self.mode == EngineMode::Particles {
            self.seed_site_name();
        }
        log::info!(
            "engine started: {:?} tier, {:?} mode, {}x{} canvas",
            self.config.tier,
            self.mode,
            self.canvas.x,
            self.canvas.y
        );
        Ok(())
    }

    /// Stop for good: release the input and drop all particle and gesture
    /// state. Safe to call more than once.
    pub fn destroy(&mut self) {
        if self.lifecycle == Lifecycle::Destroyed {
            return;
        }
        self.source.close();
        self.field.clear();
        self.formation.clear();
        self.interaction.reset();
        self.solid.reset();
        self.blast = None;
        self.draw.clear();
        self.lifecycle = Lifecycle::Destroyed;
        log::info!("engine destroyed");
    }

    /// Switch scenes. Resets every continuous gesture state and rebuilds the
    /// particle set.
    pub fn set_mode(&mut self, mode: EngineMode) {
        if mode == self.mode {
            return;
        }
        log::debug!("mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;

        self.interaction.reset();
        self.solid.reset();
        self.formation.clear();
        self.blast = None;
        self.field.clear();
        self.draw.clear();

        if mode == EngineMode::Particles && self.is_running() {
            self.seed_site_name();
        }
    }

    /// Swap the solid's geometry. Rotation and zoom carry over.
    pub fn set_shape(&mut self, shape: ShapeKind) {
        if shape != self.shape {
            log::debug!("shape {} -> {}", self.shape, shape);
            self.shape = shape;
        }
    }

    /// [`set_shape`](Self::set_shape) by name. Unknown names leave the
    /// current shape in place.
    pub fn set_shape_named(&mut self, name: &str) -> Result<(), EngineError> {
        match name.parse::<ShapeKind>() {
            Ok(shape) => {
                self.set_shape(shape);
                Ok(())
            }
            Err(err) => {
                log::warn!("{err}");
                Err(err)
            }
        }
    }

    /// Set the canvas size in pixels.
    pub fn resize(&mut self, width: f32, height: f32) {
        let canvas = Vec2::new(width.max(1.0), height.max(1.0));
        if canvas != self.canvas {
            log::debug!("resize {}x{}", canvas.x, canvas.y);
            self.canvas = canvas;
            self.formation.clear();
        }
    }

    /// Run one display frame. Returns `None` unless running.
    pub fn tick(&mut self, now: Duration) -> Option<&DrawList> {
        if !self.is_running() {
            return None;
        }
        match self.mode {
            EngineMode::Particles => self.tick_particles(now),
            EngineMode::Solid => self.tick_solid(now),
        }
        Some(&self.draw)
    }

    // ------------------------------------------------------------------------
    // Frame steps
    // ------------------------------------------------------------------------

    fn tick_particles(&mut self, now: Duration) {
        if let Some(frame) = self.source.poll() {
            let impulses = self
                .interaction
                .update(&frame, self.canvas, now, &self.config, &mut self.rng);
            for impulse in &impulses {
                let hit = self.field.apply_impulse(impulse, &mut self.rng);
                if let Impulse::Blast { center } = impulse {
                    if hit {
                        self.blast = Some(BlastMarker {
                            center: *center,
                            started: now,
                        });
                    }
                }
            }
        }

        self.field.spawn_ambient(now, self.canvas, &mut self.rng);

        let ctx = FrameContext {
            intents: self.interaction.intents(),
            canvas: self.canvas,
            now,
            tier: self.config.tier,
        };
        self.field.update(&ctx, &mut self.formation, &mut self.rng);

        if self.config.collisions {
            self.collisions.resolve(self.field.particles_mut());
        }

        if self.blast.is_some_and(|marker| marker.progress(now).is_none()) {
            self.blast = None;
        }
        let blast = self
            .blast
            .as_ref()
            .and_then(|marker| marker.progress(now).map(|t| (marker, t)));
        render_particles(&mut self.draw, self.field.particles(), blast);
    }

    fn tick_solid(&mut self, now: Duration) {
        if let Some(frame) = self.source.poll() {
            match frame.hands().first() {
                Some(hand) => self.solid.observe(hand, self.canvas, now),
                None => self.solid.release_hand(),
            }
        }
        self.solid.step();

        render_solid(
            &mut self.draw,
            self.shapes.get(self.shape),
            &self.solid,
            self.shapes.scale(),
            self.canvas,
            now.as_secs_f32() * 1000.0,
        );
    }

    fn seed_site_name(&mut self) {
        let spawned = self
            .field
            .spawn_text(&self.config.site_name, self.canvas, &mut self.rng);
        log::debug!("seeded {spawned} particles for {:?}", self.config.site_name);
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle == Lifecycle::Running
    }

    pub fn is_destroyed(&self) -> bool {
        self.lifecycle == Lifecycle::Destroyed
    }

    pub fn mode(&self) -> EngineMode {
        self.mode
    }

    pub fn shape(&self) -> ShapeKind {
        self.shape
    }

    pub fn canvas(&self) -> Vec2 {
        self.canvas
    }

    pub fn field(&self) -> &ParticleField {
        &self.field
    }

    pub fn intents(&self) -> &Intents {
        self.interaction.intents()
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    pub fn formation(&self) -> &FormationCache {
        &self.formation
    }

    pub fn solid(&self) -> &SolidController {
        &self.solid
    }

    pub fn shapes(&self) -> &ShapeLibrary {
        &self.shapes
    }

    /// Active blast marker, if one is still animating.
    pub fn blast_marker(&self) -> Option<&BlastMarker> {
        self.blast.as_ref()
    }

    /// Draw list from the most recent tick.
    pub fn draw_list(&self) -> &DrawList {
        &self.draw
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

impl<S: LandmarkSource> Drop for Engine<S> {
    fn drop(&mut self) {
        self.destroy();
    }
}
