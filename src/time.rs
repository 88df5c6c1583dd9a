//! Frame clock for driving the engine.
//!
//! The engine itself never reads the wall clock: every [`Engine::tick`]
//! receives a timestamp measured from an arbitrary origin. `Time` is the
//! host-side source of those timestamps. It runs on the wall clock in a real
//! frame loop, or steps by a fixed delta for tests and headless runs.
//!
//! [`Engine::tick`]: crate::Engine::tick
//!
//! # Example
//!
//! ```
//! use handfield::time::Time;
//! use std::time::Duration;
//!
//! let mut time = Time::fixed(Duration::from_millis(16));
//! time.update();
//! time.update();
//! assert_eq!(time.now(), Duration::from_millis(32));
//! assert_eq!(time.frame(), 2);
//! ```

use std::time::{Duration, Instant};

#[derive(Debug)]
enum Clock {
    Wall { start: Instant, last_frame: Instant },
    Fixed { step: Duration },
}

/// Frame timing: elapsed time, delta time, frame count and FPS.
#[derive(Debug)]
pub struct Time {
    clock: Clock,
    /// Elapsed time at the last `update()`.
    elapsed: Duration,
    /// Time between the last two updates.
    delta: Duration,
    frame_count: u64,
    fps: f32,
    fps_frame_count: u64,
    fps_window_start: Duration,
    fps_update_interval: Duration,
}

impl Time {
    /// Wall-clock timer starting now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self::with_clock(Clock::Wall {
            start: now,
            last_frame: now,
        })
    }

    /// Deterministic timer that advances by `step` on every `update()`.
    pub fn fixed(step: Duration) -> Self {
        Self::with_clock(Clock::Fixed { step })
    }

    fn with_clock(clock: Clock) -> Self {
        Self {
            clock,
            elapsed: Duration::ZERO,
            delta: Duration::ZERO,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_window_start: Duration::ZERO,
            fps_update_interval: Duration::from_millis(500),
        }
    }

    /// Advance one frame. Call once per display frame.
    ///
    /// Returns the new elapsed time.
    pub fn update(&mut self) -> Duration {
        match &mut self.clock {
            Clock::Wall { start, last_frame } => {
                let now = Instant::now();
                self.delta = now.duration_since(*last_frame);
                self.elapsed = now.duration_since(*start);
                *last_frame = now;
            }
            Clock::Fixed { step } => {
                self.delta = *step;
                self.elapsed += *step;
            }
        }
        self.frame_count += 1;

        let window = self.elapsed.saturating_sub(self.fps_window_start);
        if window >= self.fps_update_interval {
            let frames = self.frame_count - self.fps_frame_count;
            self.fps = frames as f32 / window.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_window_start = self.elapsed;
        }

        self.elapsed
    }

    /// Advance by an explicit amount, regardless of the clock kind.
    ///
    /// Useful to script pauses (e.g. "hold the pose for one second").
    pub fn advance(&mut self, delta: Duration) -> Duration {
        self.delta = delta;
        self.elapsed += delta;
        self.frame_count += 1;
        if let Clock::Wall { start, last_frame } = &mut self.clock {
            // Keep wall-clock updates monotonic after a manual jump.
            *start = start.checked_sub(delta).unwrap_or(*start);
            *last_frame = Instant::now();
        }
        self.elapsed
    }

    /// Elapsed time at the last update; this is the timestamp to hand to the engine.
    #[inline]
    pub fn now(&self) -> Duration {
        self.elapsed
    }

    /// Time between the last two updates.
    #[inline]
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Frames since start.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Frames per second, refreshed every half second.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Reset to zero elapsed time and frame count.
    pub fn reset(&mut self) {
        if let Clock::Wall { start, last_frame } = &mut self.clock {
            let now = Instant::now();
            *start = now;
            *last_frame = now;
        }
        self.elapsed = Duration::ZERO;
        self.delta = Duration::ZERO;
        self.frame_count = 0;
        self.fps = 0.0;
        self.fps_frame_count = 0;
        self.fps_window_start = Duration::ZERO;
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}
