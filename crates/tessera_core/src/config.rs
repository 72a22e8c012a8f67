//! # World Configuration
//!
//! Sizing and limits for a [`World`](crate::World), loaded once at startup
//! from TOML.
//!
//! ```toml
//! initial_object_capacity = 4096
//! initial_component_capacity = 1024
//! max_objects = 0              # 0 = unbounded
//! max_hierarchy_depth = 64
//! queue_warning_threshold = 10000
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{WorldError, WorldResult};

/// Configuration for a world.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldConfig {
    /// Object slots reserved at creation.
    pub initial_object_capacity: usize,
    /// Component slots reserved per registered component type.
    pub initial_component_capacity: usize,
    /// Hard limit on object slots. `0` for none.
    pub max_objects: usize,
    /// Hard limit on component slots per type. `0` for none.
    pub max_components_per_type: usize,
    /// Deepest allowed hierarchy level (roots are level 0).
    pub max_hierarchy_depth: u32,
    /// Pending queue length above which each drain logs a warning.
    pub queue_warning_threshold: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            initial_object_capacity: 1024,
            initial_component_capacity: 256,
            max_objects: 0,
            max_components_per_type: 0,
            max_hierarchy_depth: 256,
            queue_warning_threshold: 10_000,
        }
    }
}

impl WorldConfig {
    /// Parses a configuration from TOML text and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Config`] if the text does not parse or a value is
    /// out of range.
    pub fn from_toml_str(text: &str) -> WorldResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| WorldError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Config`] if the file cannot be read or is invalid.
    pub fn from_toml_file(path: impl AsRef<Path>) -> WorldResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| WorldError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Config`] describing the first invalid value.
    pub fn validate(&self) -> WorldResult<()> {
        if self.max_hierarchy_depth == 0 {
            return Err(WorldError::Config(
                "max_hierarchy_depth must be at least 1".to_string(),
            ));
        }
        if self.max_objects != 0 && self.initial_object_capacity > self.max_objects {
            return Err(WorldError::Config(format!(
                "initial_object_capacity {} exceeds max_objects {}",
                self.initial_object_capacity, self.max_objects
            )));
        }
        if self.max_components_per_type != 0
            && self.initial_component_capacity > self.max_components_per_type
        {
            return Err(WorldError::Config(format!(
                "initial_component_capacity {} exceeds max_components_per_type {}",
                self.initial_component_capacity, self.max_components_per_type
            )));
        }
        Ok(())
    }
}
