//! Engine configuration.
//!
//! Lower-powered devices get a smaller particle ceiling, sparser shape point
//! clouds, smaller formations and no collision pass. All of that hangs off
//! [`DeviceTier`], a static capability flag chosen by the host.
//!
//! # Example
//!
//! ```
//! use handfield::{DeviceTier, EngineConfig};
//!
//! let config = EngineConfig::for_tier(DeviceTier::Mobile)
//!     .with_site_name("HELLO")
//!     .with_seed(7);
//!
//! assert_eq!(config.max_particles, 1000);
//! assert!(!config.collisions);
//! ```

use serde::{Deserialize, Serialize};

/// Hardware tier of the host device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceTier {
    /// Full density, collisions on.
    #[default]
    Desktop,
    /// Reduced density and ceiling, collisions off.
    Mobile,
}

impl DeviceTier {
    /// Select between a desktop and a mobile value.
    #[inline]
    pub fn pick<T>(self, desktop: T, mobile: T) -> T {
        match self {
            DeviceTier::Desktop => desktop,
            DeviceTier::Mobile => mobile,
        }
    }

    /// Whether this is the reduced tier.
    #[inline]
    pub fn is_mobile(self) -> bool {
        self == DeviceTier::Mobile
    }
}

/// Engine configuration.
///
/// Use [`EngineConfig::for_tier`] for tier defaults, then override
/// individual values with the `with_*` methods.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Hardware tier; drives density, formation sizes and snow rate.
    pub tier: DeviceTier,
    /// Hard ceiling on live particles. Spawns beyond it are dropped.
    pub max_particles: usize,
    /// Run the pairwise collision pass each frame.
    pub collisions: bool,
    /// Bucket size of the collision grid in pixels.
    pub collision_cell_size: f32,
    /// Restitution applied to approaching particle pairs (< 1 is lossy).
    pub restitution: f32,
    /// Text shown at startup and for the both-peace gesture.
    pub site_name: String,
    /// Phrases picked at random for the both-point gesture.
    pub phrases: Vec<String>,
    /// Seed for the engine RNG. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::for_tier(DeviceTier::Desktop)
    }
}

impl EngineConfig {
    /// Defaults for the given hardware tier.
    pub fn for_tier(tier: DeviceTier) -> Self {
        Self {
            tier,
            max_particles: tier.pick(3000, 1000),
            collisions: !tier.is_mobile(),
            collision_cell_size: 14.0,
            restitution: 0.7,
            site_name: "KATOV".to_string(),
            phrases: vec![
                "SALOM".to_string(),
                "YOQDIMI?".to_string(),
                "ZERIKMAYAPSIZMI?".to_string(),
            ],
            seed: None,
        }
    }

    /// Set the particle ceiling.
    pub fn with_max_particles(mut self, max: usize) -> Self {
        self.max_particles = max;
        self
    }

    /// Enable or disable the collision pass.
    pub fn with_collisions(mut self, enabled: bool) -> Self {
        self.collisions = enabled;
        self
    }

    /// Set the text used for the startup formation and the both-peace gesture.
    pub fn with_site_name(mut self, name: impl Into<String>) -> Self {
        self.site_name = name.into();
        self
    }

    /// Replace the random phrase pool.
    pub fn with_phrases<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.phrases = phrases.into_iter().map(Into::into).collect();
        self
    }

    /// Seed the engine RNG for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
