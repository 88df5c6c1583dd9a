//! Error types for handfield.
//!
//! Only the host-facing surface can fail: acquiring the landmark input and
//! selecting a shape by name. Everything that happens inside a frame is
//! infallible by construction (degenerate geometry is guarded, spawns past
//! the particle ceiling are dropped).

use thiserror::Error;

/// Failures reported by a [`LandmarkSource`](crate::landmarks::LandmarkSource).
#[derive(Debug, Error)]
pub enum SourceError {
    /// The camera / pose tracker could not be opened (permission denied,
    /// device busy, model failed to load, ...).
    #[error("landmark input unavailable: {0}")]
    Unavailable(String),
    /// The producer side of a channel-backed source has gone away.
    #[error("landmark publisher disconnected")]
    Disconnected,
}

/// Errors surfaced to the embedding host.
#[derive(Debug, Error)]
pub enum EngineError {
    /// `start()` could not acquire the input stream. Reported once; the engine
    /// does not retry on its own.
    #[error("failed to start engine: {0}")]
    Input(#[from] SourceError),
    /// `set_shape_named()` was given a name outside the closed shape set.
    #[error("unknown shape `{0}` (expected cube, sphere, pyramid, cylinder, torus or cone)")]
    UnknownShape(String),
    /// The engine was destroyed and cannot be restarted.
    #[error("engine has been destroyed")]
    Destroyed,
}
