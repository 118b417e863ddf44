//! Configuration structs with defaults, validation and RON persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name of the persisted configuration.
pub const CONFIG_FILE: &str = "config.ron";

/// Largest accepted `streaming.load_radius`, in tiles.
pub const MAX_LOAD_RADIUS: u32 = 64;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// World generation settings.
    pub generation: GenerationConfig,
    /// Tile streaming settings.
    pub streaming: StreamingConfig,
    /// Level-of-detail settings.
    pub lod: LodConfig,
    /// Instance batching and horizon settings.
    pub batching: BatchingConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// World generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    /// Session seed passed to every generation call.
    pub session_seed: u64,
    /// Tile edge length in world units.
    pub tile_size: f32,
    /// Elevation of flat ground, and the base height of the heightmap.
    pub ground_level: f32,
    /// Sample elevation from a noise heightmap instead of flat ground.
    pub heightmap: bool,
    /// Heightmap noise seed.
    pub heightmap_seed: u32,
    /// Heightmap first-octave amplitude in world units.
    pub heightmap_amplitude: f64,
    /// Heightmap first-octave frequency.
    pub heightmap_frequency: f64,
    /// Heightmap octave count.
    pub heightmap_octaves: u32,
}

/// Tile streaming configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamingConfig {
    /// Tiles within this radius of the viewer are loaded. At most
    /// [`MAX_LOAD_RADIUS`].
    pub load_radius: u32,
    /// Tiles beyond this radius are unloaded. Must exceed `load_radius`.
    pub unload_radius: u32,
    /// Tiles generated per tick.
    pub loads_per_tick: u32,
    /// Tiles released per tick.
    pub unloads_per_tick: u32,
}

/// Level-of-detail configuration. Bands are `[close, medium, far]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LodConfig {
    /// Mosques and minarets.
    pub landmark: [f32; 3],
    /// Houses, shops and tents.
    pub building: [f32; 3],
    /// Trees and crops.
    pub vegetation: [f32; 3],
    /// Fence posts, wells and props.
    pub prop: [f32; 3],
    /// Horizon silhouettes.
    pub skyline: [f32; 3],
    /// Extra distance past a threshold before the tier changes. 0 disables
    /// hysteresis.
    pub hysteresis_margin: f32,
    /// Viewer travel before tiers are re-selected.
    pub gate_distance: f32,
}

/// Instance batching and horizon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BatchingConfig {
    /// Upper bound on instances per batch.
    pub max_instances_per_batch: usize,
    /// Number of horizon silhouettes.
    pub horizon_count: u32,
    /// Horizon ring radius in world units.
    pub horizon_radius: f32,
    /// Fraction of horizon silhouettes that are trees.
    pub horizon_tree_fraction: f32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Number of simulation ticks the headless driver runs.
    pub ticks: u32,
    /// Viewer walking speed in world units per second.
    pub viewer_speed: f32,
}

// --- Default implementations ---

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            session_seed: 1000,
            tile_size: 64.0,
            ground_level: 0.0,
            heightmap: true,
            heightmap_seed: 7,
            heightmap_amplitude: 6.0,
            heightmap_frequency: 0.004,
            heightmap_octaves: 4,
        }
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            load_radius: 3,
            unload_radius: 5,
            loads_per_tick: 4,
            unloads_per_tick: 8,
        }
    }
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            landmark: [30.0, 80.0, 200.0],
            building: [20.0, 60.0, 150.0],
            vegetation: [15.0, 45.0, 120.0],
            prop: [10.0, 30.0, 70.0],
            skyline: [100.0, 300.0, 600.0],
            hysteresis_margin: 2.0,
            gate_distance: 2.0,
        }
    }
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            max_instances_per_batch: 4096,
            horizon_count: 96,
            horizon_radius: 900.0,
            horizon_tree_fraction: 0.35,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            ticks: 600,
            viewer_speed: 8.0,
        }
    }
}

// --- Validation ---

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.into(),
    }
}

fn check_bands(field: &'static str, bands: [f32; 3]) -> Result<(), ConfigError> {
    if bands.iter().any(|b| !b.is_finite() || *b <= 0.0) {
        return Err(invalid(field, format!("bands must be positive, got {bands:?}")));
    }
    if bands.windows(2).any(|w| w[1] <= w[0]) {
        return Err(invalid(
            field,
            format!("bands must be strictly increasing, got {bands:?}"),
        ));
    }
    Ok(())
}

impl Config {
    /// Reject values no subsystem can work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.generation;
        if !g.tile_size.is_finite() || g.tile_size < 16.0 {
            return Err(invalid(
                "generation.tile_size",
                format!("must be at least 16, got {}", g.tile_size),
            ));
        }
        if !g.ground_level.is_finite() {
            return Err(invalid("generation.ground_level", "must be finite"));
        }

        let s = &self.streaming;
        if s.load_radius > MAX_LOAD_RADIUS {
            return Err(invalid(
                "streaming.load_radius",
                format!("must be at most {MAX_LOAD_RADIUS}, got {}", s.load_radius),
            ));
        }
        if s.unload_radius <= s.load_radius {
            return Err(invalid(
                "streaming.unload_radius",
                format!(
                    "must exceed load_radius ({} <= {})",
                    s.unload_radius, s.load_radius
                ),
            ));
        }
        if s.loads_per_tick == 0 {
            return Err(invalid("streaming.loads_per_tick", "must be at least 1"));
        }

        let l = &self.lod;
        check_bands("lod.landmark", l.landmark)?;
        check_bands("lod.building", l.building)?;
        check_bands("lod.vegetation", l.vegetation)?;
        check_bands("lod.prop", l.prop)?;
        check_bands("lod.skyline", l.skyline)?;
        if !l.hysteresis_margin.is_finite() || l.hysteresis_margin < 0.0 {
            return Err(invalid("lod.hysteresis_margin", "must be a non-negative number"));
        }
        if !l.gate_distance.is_finite() || l.gate_distance < 0.0 {
            return Err(invalid("lod.gate_distance", "must be a non-negative number"));
        }

        if self.batching.max_instances_per_batch == 0 {
            return Err(invalid("batching.max_instances_per_batch", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.batching.horizon_tree_fraction) {
            return Err(invalid("batching.horizon_tree_fraction", "must be in [0, 1]"));
        }
        Ok(())
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let config = Self::read(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    fn read(config_path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(config_path).map_err(ConfigError::ReadError)?;
        let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Re-read the file: `Some(new_config)` if it changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = Self::read(&config_dir.join(CONFIG_FILE))?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}
