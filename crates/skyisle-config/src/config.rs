//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Upper bound accepted for `generation.objects_max`.
pub const MAX_OBJECTS_PER_SYSTEM: u32 = 10_000;

/// Top-level generator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// World identity and vertical extent.
    pub world: WorldConfig,
    /// Per-system object placement.
    pub generation: GenerationConfig,
    /// Background chunk worker pool.
    pub workers: WorkerConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// World configuration. Changing any of these for an existing world changes
/// what gets generated where.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// World seed every random stream is derived from.
    pub seed: u64,
    /// Edge length of a system cell, in chunks. Must be positive.
    pub system_size_chunks: i32,
    /// Lowest block Y of a chunk column.
    pub min_y: i32,
    /// Number of block layers in a chunk column.
    pub height: u32,
}

/// Object placement within a system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    /// Fewest objects placed per system.
    pub objects_min: u32,
    /// Most objects placed per system.
    pub objects_max: u32,
    /// Lowest center Y of a placed object.
    pub spawn_height_min: i32,
    /// Highest center Y of a placed object.
    pub spawn_height_max: i32,
    /// Minimum gap in blocks between two objects of the same system.
    pub min_spacing: f64,
    /// Positions tried per slot before the slot is left empty.
    pub placement_attempts: u32,
    /// Catalog file to load instead of the built-in catalog.
    pub catalog_path: Option<PathBuf>,
}

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of generation threads (0 = one per CPU core, minus one).
    pub threads: usize,
    /// Maximum queued chunk requests before `submit` rejects.
    pub queue_capacity: usize,
    /// Maximum finished chunks waiting to be drained.
    pub result_capacity: usize,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Write a JSON log file next to the config in debug builds.
    pub file_logging: bool,
}

// --- Default implementations ---

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED_1515_u64,
            system_size_chunks: 50,
            min_y: -64,
            height: 384,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            objects_min: 600,
            objects_max: 800,
            spawn_height_min: 10,
            spawn_height_max: 250,
            min_spacing: 2.0,
            placement_attempts: 8,
            catalog_path: None,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            queue_capacity: 256,
            result_capacity: 256,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            file_logging: true,
        }
    }
}

/// Default config directory: `<platform config dir>/skyisle`, falling back to
/// `./skyisle` where the platform has none.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skyisle")
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Checks the settings generation depends on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: String| {
            Err(ConfigError::InvalidValue { field, reason })
        };

        if self.world.system_size_chunks <= 0 {
            return invalid(
                "world.system_size_chunks",
                format!("must be positive, got {}", self.world.system_size_chunks),
            );
        }
        if self.world.height == 0 {
            return invalid("world.height", "must be positive".to_string());
        }
        let gen_cfg = &self.generation;
        if gen_cfg.objects_min > gen_cfg.objects_max {
            return invalid(
                "generation.objects_min",
                format!("{} exceeds objects_max {}", gen_cfg.objects_min, gen_cfg.objects_max),
            );
        }
        if gen_cfg.objects_max > MAX_OBJECTS_PER_SYSTEM {
            return invalid(
                "generation.objects_max",
                format!(
                    "{} exceeds the limit of {}",
                    gen_cfg.objects_max, MAX_OBJECTS_PER_SYSTEM
                ),
            );
        }
        if gen_cfg.spawn_height_min > gen_cfg.spawn_height_max {
            return invalid(
                "generation.spawn_height_min",
                format!(
                    "{} exceeds spawn_height_max {}",
                    gen_cfg.spawn_height_min, gen_cfg.spawn_height_max
                ),
            );
        }
        if !gen_cfg.min_spacing.is_finite() || gen_cfg.min_spacing < 0.0 {
            return invalid(
                "generation.min_spacing",
                format!("must be a non-negative number, got {}", gen_cfg.min_spacing),
            );
        }
        if gen_cfg.placement_attempts == 0 {
            return invalid("generation.placement_attempts", "must be at least 1".to_string());
        }
        if self.workers.queue_capacity == 0 || self.workers.result_capacity == 0 {
            return invalid("workers", "channel capacities must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("system_size_chunks: 50"));
        assert!(ron_str.contains("placement_attempts: 8"));
    }

    #[test]
    fn test_default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(world: (seed: 42), debug: ())";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.world.seed, 42);
        assert_eq!(config.world.system_size_chunks, 50);
        assert_eq!(config.generation, GenerationConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.world.system_size_chunks = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "world.system_size_chunks", .. })
        ));

        let mut config = Config::default();
        config.generation.objects_min = 10;
        config.generation.objects_max = 5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "generation.objects_min", .. })
        ));

        let mut config = Config::default();
        config.generation.objects_min = 0;
        config.generation.objects_max = u32::MAX;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "generation.objects_max", .. })
        ));

        let mut config = Config::default();
        config.generation.objects_max = MAX_OBJECTS_PER_SYSTEM;
        config.validate().unwrap();

        let mut config = Config::default();
        config.generation.min_spacing = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.world.seed = 1234;
        config.generation.catalog_path = Some(PathBuf::from("catalogs/custom.ron"));

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join("config.ron").exists());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let result: Result<Config, _> = ron::from_str("{{not valid}}");
        assert!(result.is_err());
    }
}
