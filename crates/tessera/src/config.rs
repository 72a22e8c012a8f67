//! # Sample Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so a file
//! only lists what it changes:
//!
//! ```toml
//! seed = 7
//! ships = 6
//! ticks = 1200
//!
//! [world]
//! max_objects = 4096
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tessera_core::WorldConfig;

use crate::error::{SampleError, SampleResult};

/// Most players a sample arena supports.
pub const MAX_PLAYERS: u8 = 16;

/// Settings for one sample simulation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SampleConfig {
    /// Seed for ship placement. Same seed, same run.
    pub seed: u64,
    /// Ticks to simulate.
    pub ticks: u32,
    /// Simulated seconds per tick.
    pub delta_seconds: f32,
    /// Ships in the arena, one per player.
    pub ships: u8,
    /// Radius of the ring ships start on.
    pub arena_radius: f32,
    /// Drift speed of ships, units per second.
    pub ship_speed: f32,
    /// Starting health of every ship.
    pub ship_health: u32,
    /// Ticks between two shots of the same ship.
    pub fire_interval_ticks: u32,
    /// Projectile speed, units per second.
    pub projectile_speed: f32,
    /// Ticks before an unspent projectile disappears.
    pub projectile_lifetime_ticks: u32,
    /// Health removed per hit.
    pub projectile_damage: u32,
    /// Hit radius around each ship.
    pub collision_radius: f32,
    /// Fragments spawned when a ship is destroyed.
    pub debris_per_wreck: u32,
    /// Settings of the underlying world.
    pub world: WorldConfig,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            seed: 0x7e55_e7a,
            ticks: 1_800,
            delta_seconds: 1.0 / 60.0,
            ships: 4,
            arena_radius: 30.0,
            ship_speed: 0.5,
            ship_health: 300,
            fire_interval_ticks: 20,
            projectile_speed: 40.0,
            projectile_lifetime_ticks: 90,
            projectile_damage: 100,
            collision_radius: 1.5,
            debris_per_wreck: 12,
            world: WorldConfig::default(),
        }
    }
}

impl SampleConfig {
    /// Parses a configuration from TOML text and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`SampleError::InvalidConfig`] if the text does not parse or
    /// a value is out of range.
    pub fn from_toml_str(text: &str) -> SampleResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| SampleError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`SampleError::Io`] if the file cannot be read, otherwise the
    /// errors of [`SampleConfig::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> SampleResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SampleError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks value ranges, including the nested world settings.
    ///
    /// # Errors
    ///
    /// Returns [`SampleError::InvalidConfig`] describing the first invalid
    /// value.
    pub fn validate(&self) -> SampleResult<()> {
        if self.ships == 0 || self.ships > MAX_PLAYERS {
            return Err(SampleError::InvalidConfig(format!(
                "ships must be between 1 and {MAX_PLAYERS}, got {}",
                self.ships
            )));
        }
        if !is_positive(self.delta_seconds) {
            return Err(SampleError::InvalidConfig(
                "delta_seconds must be positive".to_string(),
            ));
        }
        if !is_positive(self.arena_radius) || !is_positive(self.collision_radius) {
            return Err(SampleError::InvalidConfig(
                "arena_radius and collision_radius must be positive".to_string(),
            ));
        }
        if self.fire_interval_ticks == 0 {
            return Err(SampleError::InvalidConfig(
                "fire_interval_ticks must be at least 1".to_string(),
            ));
        }
        self.world
            .validate()
            .map_err(|e| SampleError::InvalidConfig(e.to_string()))
    }
}

fn is_positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}
