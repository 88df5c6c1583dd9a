//! Desktop viewer: winit window, wgpu rendering, mouse-driven hands.
//!
//! There is no camera here. [`MouseHands`] stands in for the pose tracker and
//! synthesizes a hand under the cursor in whichever pose is selected, so
//! every gesture can be tried with a mouse and keyboard.
//!
//! | Input | Effect |
//! |-------|--------|
//! | move cursor | move the hand (leaving the window removes it) |
//! | `1`-`8` | open, fist, thumbs, pinch, point, peace, three, horns |
//! | hold left button | make a fist (release over an open pose to blast) |
//! | hold `Shift` | add a mirrored second hand in the same pose |
//! | `H` | toggle the two-hand heart |
//! | `M` | switch between particles and solid |
//! | `S` | next solid shape |
//! | `Esc` | quit |

mod gpu;

use std::path::Path;
use std::sync::Arc;

use glam::Vec2;
use thiserror::Error;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

use crate::config::EngineConfig;
use crate::engine::{Engine, EngineMode};
use crate::error::{EngineError, SourceError};
use crate::landmarks::{HandFrame, LandmarkSource};
use crate::synthetic::{heart_pair, Pose, SyntheticHand};
use crate::time::Time;

use gpu::GpuState;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),
}

/// Read an [`EngineConfig`] from a JSON file. Missing fields take the
/// desktop defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<EngineConfig, ViewerError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let config = serde_json::from_str(&text)?;
    Ok(config)
}

// ============================================================================
// MouseHands
// ============================================================================

/// Landmark source driven by the mouse cursor.
#[derive(Debug)]
pub struct MouseHands {
    open: bool,
    canvas: Vec2,
    cursor: Option<Vec2>,
    pose: Pose,
    grabbing: bool,
    paired: bool,
    heart: bool,
}

impl MouseHands {
    pub fn new(canvas: Vec2) -> Self {
        Self {
            open: false,
            canvas,
            cursor: None,
            pose: Pose::Open,
            grabbing: false,
            paired: false,
            heart: false,
        }
    }

    pub fn set_canvas(&mut self, canvas: Vec2) {
        self.canvas = canvas.max(Vec2::ONE);
    }

    /// Cursor position in canvas pixels, or `None` once it leaves the window.
    pub fn set_cursor(&mut self, cursor: Option<Vec2>) {
        self.cursor = cursor;
    }

    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn set_grabbing(&mut self, grabbing: bool) {
        self.grabbing = grabbing;
    }

    pub fn set_paired(&mut self, paired: bool) {
        self.paired = paired;
    }

    pub fn toggle_heart(&mut self) -> bool {
        self.heart = !self.heart;
        self.heart
    }

    /// The frame the tracker would report right now.
    pub fn frame(&self) -> HandFrame {
        let Some(cursor) = self.cursor else {
            return HandFrame::empty();
        };
        let palm = Vec2::new(1.0 - cursor.x / self.canvas.x, cursor.y / self.canvas.y);

        if self.heart {
            let (left, right) = heart_pair(palm);
            return HandFrame::two(left, right);
        }

        let pose = if self.grabbing { Pose::Fist } else { self.pose };
        let hand = SyntheticHand::new(pose).at(palm).build();
        if self.paired {
            let mirrored = SyntheticHand::new(pose)
                .at(Vec2::new(1.0 - palm.x, palm.y))
                .build();
            HandFrame::two(hand, mirrored)
        } else {
            HandFrame::one(hand)
        }
    }
}

impl LandmarkSource for MouseHands {
    fn open(&mut self) -> Result<(), SourceError> {
        self.open = true;
        Ok(())
    }

    fn poll(&mut self) -> Option<HandFrame> {
        self.open.then(|| self.frame())
    }

    fn close(&mut self) {
        self.open = false;
    }
}

// ============================================================================
// App
// ============================================================================

struct App {
    window: Option<Arc<Window>>,
    gpu_state: Option<GpuState>,
    engine: Engine<MouseHands>,
    time: Time,
    failure: Option<ViewerError>,
}

impl App {
    fn new(config: EngineConfig) -> Self {
        let engine = Engine::new(config, MouseHands::new(Vec2::new(1280.0, 720.0)));
        Self {
            window: None,
            gpu_state: None,
            engine,
            time: Time::new(),
            failure: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: ViewerError) {
        log::error!("{err}");
        self.failure = Some(err);
        event_loop.exit();
    }

    fn resize(&mut self, size: winit::dpi::PhysicalSize<u32>) {
        if let Some(gpu_state) = &mut self.gpu_state {
            gpu_state.resize(size);
        }
        let canvas = Vec2::new(size.width as f32, size.height as f32);
        self.engine.resize(canvas.x, canvas.y);
        self.engine.source_mut().set_canvas(canvas);
    }

    fn update_title(&self) {
        if let Some(window) = &self.window {
            let title = match self.engine.mode() {
                EngineMode::Particles => format!(
                    "handfield - particles - {:?} - {} particles",
                    self.engine.source().pose(),
                    self.engine.field().len()
                ),
                EngineMode::Solid => format!("handfield - solid - {}", self.engine.shape()),
            };
            window.set_title(&title);
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if event.state != ElementState::Pressed {
            return;
        }
        match &event.logical_key {
            Key::Named(NamedKey::Escape) => event_loop.exit(),
            Key::Character(c) => match c.to_lowercase().as_str() {
                "m" => {
                    let next = match self.engine.mode() {
                        EngineMode::Particles => EngineMode::Solid,
                        EngineMode::Solid => EngineMode::Particles,
                    };
                    self.engine.set_mode(next);
                }
                "s" => {
                    let next = self.engine.shape().next();
                    self.engine.set_shape(next);
                }
                "h" => {
                    let on = self.engine.source_mut().toggle_heart();
                    log::info!("heart {}", if on { "on" } else { "off" });
                }
                digit => {
                    let pose = digit
                        .parse::<usize>()
                        .ok()
                        .and_then(|n| n.checked_sub(1))
                        .and_then(|i| Pose::ALL.get(i).copied());
                    if let Some(pose) = pose {
                        self.engine.source_mut().set_pose(pose);
                    }
                }
            },
            _ => {}
        }
        self.update_title();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title("handfield")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => return self.fail(event_loop, err.into()),
        };
        self.window = Some(window.clone());

        match pollster::block_on(GpuState::new(window.clone())) {
            Ok(gpu_state) => self.gpu_state = Some(gpu_state),
            Err(err) => return self.fail(event_loop, err),
        }

        self.resize(window.inner_size());
        self.time.reset();
        if let Err(err) = self.engine.start(self.time.now()) {
            return self.fail(event_loop, err.into());
        }
        self.update_title();
        window.request_redraw();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                self.resize(physical_size);
            }
            WindowEvent::CursorMoved { position, .. } => {
                let cursor = Vec2::new(position.x as f32, position.y as f32);
                self.engine.source_mut().set_cursor(Some(cursor));
            }
            WindowEvent::CursorLeft { .. } => {
                self.engine.source_mut().set_cursor(None);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Left {
                    self.engine
                        .source_mut()
                        .set_grabbing(state == ElementState::Pressed);
                }
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.engine
                    .source_mut()
                    .set_paired(modifiers.state().shift_key());
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.handle_key(event_loop, &event);
            }
            WindowEvent::RedrawRequested => {
                self.time.update();
                if let (Some(list), Some(gpu_state)) =
                    (self.engine.tick(self.time.now()), &mut self.gpu_state)
                {
                    match gpu_state.render(list) {
                        Ok(_) => {}
                        Err(wgpu::SurfaceError::Lost) => gpu_state.resize(winit::dpi::PhysicalSize {
                            width: gpu_state.config.width,
                            height: gpu_state.config.height,
                        }),
                        Err(wgpu::SurfaceError::OutOfMemory) => event_loop.exit(),
                        Err(e) => log::warn!("render error: {e:?}"),
                    }
                }
                if self.time.frame() % 60 == 0 {
                    self.update_title();
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.engine.destroy();
    }
}

/// Open a window and run the engine until it is closed.
pub fn run(config: EngineConfig) -> Result<(), ViewerError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.failure.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::{classify, Gesture};

    fn source() -> MouseHands {
        let mut hands = MouseHands::new(Vec2::new(1000.0, 500.0));
        hands.open().unwrap();
        hands
    }

    #[test]
    fn test_no_cursor_means_no_hands() {
        let mut hands = source();
        assert!(hands.poll().unwrap().is_empty());
    }

    #[test]
    fn test_closed_source_delivers_nothing() {
        let mut hands = MouseHands::new(Vec2::new(1000.0, 500.0));
        hands.set_cursor(Some(Vec2::new(10.0, 10.0)));
        assert!(hands.poll().is_none());
    }

    #[test]
    fn test_palm_lands_under_cursor() {
        let mut hands = source();
        let canvas = Vec2::new(1000.0, 500.0);
        hands.set_cursor(Some(Vec2::new(250.0, 100.0)));
        let frame = hands.poll().unwrap();
        let palm = frame.hands()[0].palm_screen(canvas);
        assert!(palm.distance(Vec2::new(250.0, 100.0)) < 1e-3);
    }

    #[test]
    fn test_grab_overrides_pose() {
        let mut hands = source();
        hands.set_cursor(Some(Vec2::new(500.0, 250.0)));
        hands.set_pose(Pose::Open);
        hands.set_grabbing(true);
        let frame = hands.frame();
        assert_eq!(classify(&frame.hands()[0]), Gesture::Fist);
    }

    #[test]
    fn test_shift_adds_mirrored_hand() {
        let mut hands = source();
        hands.set_cursor(Some(Vec2::new(200.0, 250.0)));
        hands.set_pose(Pose::Peace);
        hands.set_paired(true);
        let frame = hands.frame();
        assert_eq!(frame.len(), 2);
        let a = frame.hands()[0].palm();
        let b = frame.hands()[1].palm();
        assert!((a.x + b.x - 1.0).abs() < 1e-5);
        assert_eq!(a.y, b.y);
    }

    #[test]
    fn test_heart_toggle() {
        let mut hands = source();
        hands.set_cursor(Some(Vec2::new(500.0, 250.0)));
        assert!(hands.toggle_heart());
        assert_eq!(hands.frame().len(), 2);
        assert!(!hands.toggle_heart());
        assert_eq!(hands.frame().len(), 1);
    }
}
