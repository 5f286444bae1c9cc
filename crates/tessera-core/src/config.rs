// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Host-supplied configuration for registries and event buses.
//!
//! The host decides the pool chunk size, the component-type bound and the
//! event-bus capacities once, at construction time. Values can be built in
//! code or loaded from a RON document; missing fields fall back to defaults.
//!
//! ```ron
//! (
//!     registry: (chunk_size: 16384, max_component_types: 64),
//!     events: (events: 32, listeners_per_event: 32),
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ecs::TypeMask;
use crate::error::ConfigError;

/// Storage parameters for an entity registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Size in bytes of each component pool chunk.
    pub chunk_size: usize,
    /// Maximum number of distinct component types the registry may index.
    pub max_component_types: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            chunk_size: 16 * 1024,
            max_component_types: 64,
        }
    }
}

impl RegistryConfig {
    /// Largest accepted `chunk_size`. Any chunk up to this size plus its
    /// alignment padding still fits a valid allocation layout.
    pub const MAX_CHUNK_SIZE: usize = isize::MAX as usize / 2;

    /// Checks the bounds the registry relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be non-zero".into()));
        }
        if self.chunk_size > Self::MAX_CHUNK_SIZE {
            return Err(ConfigError::Invalid(format!(
                "chunk_size must be at most {}, got {}",
                Self::MAX_CHUNK_SIZE,
                self.chunk_size
            )));
        }
        if self.max_component_types == 0 || self.max_component_types > TypeMask::CAPACITY {
            return Err(ConfigError::Invalid(format!(
                "max_component_types must be in 1..={}, got {}",
                TypeMask::CAPACITY,
                self.max_component_types
            )));
        }
        Ok(())
    }
}

/// Capacity parameters for an event bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventBusConfig {
    /// Number of distinct event slots.
    pub events: usize,
    /// Maximum number of listeners per event slot.
    pub listeners_per_event: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            events: 32,
            listeners_per_event: 32,
        }
    }
}

impl EventBusConfig {
    /// Checks the bounds the bus relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.events == 0 || self.events > usize::from(u16::MAX) {
            return Err(ConfigError::Invalid(format!(
                "events must be in 1..={}, got {}",
                u16::MAX,
                self.events
            )));
        }
        if self.listeners_per_event == 0 {
            return Err(ConfigError::Invalid(
                "listeners_per_event must be non-zero".into(),
            ));
        }
        if self
            .events
            .checked_mul(self.listeners_per_event)
            .map_or(true, |total| total > u32::MAX as usize)
        {
            return Err(ConfigError::Invalid(
                "events * listeners_per_event overflows the listener table".into(),
            ));
        }
        Ok(())
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Entity registry parameters.
    pub registry: RegistryConfig,
    /// Event bus parameters.
    pub events: EventBusConfig,
}

impl CoreConfig {
    /// Parses and validates a RON document.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: CoreConfig = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ron_str(&text)?;
        log::info!("Loaded core config from {}", path.display());
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.registry.validate()?;
        self.events.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(CoreConfig::default().validate().is_ok());
    }

    #[test]
    fn parses_partial_document() {
        let config = CoreConfig::from_ron_str("(registry: (chunk_size: 256))").unwrap();
        assert_eq!(config.registry.chunk_size, 256);
        assert_eq!(config.registry.max_component_types, 64);
        assert_eq!(config.events, EventBusConfig::default());
    }

    #[test]
    fn rejects_zero_chunk_size() {
        let err = CoreConfig::from_ron_str("(registry: (chunk_size: 0))").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_oversized_chunk_size() {
        let config = RegistryConfig {
            chunk_size: usize::MAX,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let largest = RegistryConfig {
            chunk_size: RegistryConfig::MAX_CHUNK_SIZE,
            ..Default::default()
        };
        assert!(largest.validate().is_ok());
    }

    #[test]
    fn rejects_type_bound_beyond_mask_capacity() {
        let config = RegistryConfig {
            max_component_types: TypeMask::CAPACITY + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_malformed_text() {
        let err = CoreConfig::from_ron_str("(registry: ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = CoreConfig::load("/definitely/not/here.ron").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
