use serde::Deserialize;
use std::f32::consts::PI;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

// --- Error Type ---
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("unsupported config format '{0}', expected .json or .toml")]
    UnsupportedFormat(String),
    #[error("invalid config: {0}")]
    Validation(String),
}

// --- Enums for Choices ---
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SerializerType {
    #[default]
    Json,
    Binary,
    Null,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    #[default]
    Stdio,
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

// --- Configuration Sections ---

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct WorldSettings {
    #[serde(default = "default_world_size")]
    pub width: f32,
    #[serde(default = "default_world_size")]
    pub height: f32,
    /// Cell size of the spatial index; must divide both dimensions.
    #[serde(default = "default_index_step")]
    pub index_step: f32,
}

fn default_world_size() -> f32 { 500.0 }
fn default_index_step() -> f32 { 10.0 }

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            width: default_world_size(),
            height: default_world_size(),
            index_step: default_index_step(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ClockSettings {
    /// Ticks per wall-clock second.
    #[serde(default = "default_frequency")]
    pub frequency: f32,
    /// Game seconds simulated by one tick; also the integration step.
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: f32,
}

fn default_frequency() -> f32 { 30.0 }
fn default_tick_seconds() -> f32 { 1.0 }

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            frequency: default_frequency(),
            tick_seconds: default_tick_seconds(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct AntSettings {
    /// Distance travelled per game second.
    #[serde(default = "default_velocity")]
    pub velocity: f32,
    #[serde(default = "default_vision_distance")]
    pub vision_distance: f32,
    #[serde(default = "default_interaction_distance")]
    pub interaction_distance: f32,
    /// Largest random turn taken while wandering, in radians.
    #[serde(default = "default_noise_rotation")]
    pub noise_rotation: f32,
    #[serde(default = "default_food_max")]
    pub food_max: f32,
    #[serde(default = "default_food_low")]
    pub food_low: f32,
    #[serde(default = "default_food_max")]
    pub initial_food: f32,
    #[serde(default = "default_food_depletion")]
    pub food_depletion_per_minute: f32,
    #[serde(default = "default_food_consumption")]
    pub food_consumption_per_second: f32,
    #[serde(default = "default_carry_capacity")]
    pub carry_capacity: f32,
    /// How far a jobless worker wanders from home.
    #[serde(default = "default_roaming_max_distance")]
    pub roaming_max_distance: f32,
    #[serde(default = "default_corpse_remains")]
    pub corpse_remains: f32,
    #[serde(default = "default_corpse_decay")]
    pub corpse_decay_per_minute: f32,
}

fn default_velocity() -> f32 { 1.0 }
fn default_vision_distance() -> f32 { 40.0 }
fn default_interaction_distance() -> f32 { 10.0 }
fn default_noise_rotation() -> f32 { PI / 8.0 }
fn default_food_max() -> f32 { 100.0 }
fn default_food_low() -> f32 { 20.0 }
fn default_food_depletion() -> f32 { 1.0 }
fn default_food_consumption() -> f32 { 5.0 }
fn default_carry_capacity() -> f32 { 10.0 }
fn default_roaming_max_distance() -> f32 { 100.0 }
fn default_corpse_remains() -> f32 { 20.0 }
fn default_corpse_decay() -> f32 { 10.0 }

impl Default for AntSettings {
    fn default() -> Self {
        Self {
            velocity: default_velocity(),
            vision_distance: default_vision_distance(),
            interaction_distance: default_interaction_distance(),
            noise_rotation: default_noise_rotation(),
            food_max: default_food_max(),
            food_low: default_food_low(),
            initial_food: default_food_max(),
            food_depletion_per_minute: default_food_depletion(),
            food_consumption_per_second: default_food_consumption(),
            carry_capacity: default_carry_capacity(),
            roaming_max_distance: default_roaming_max_distance(),
            corpse_remains: default_corpse_remains(),
            corpse_decay_per_minute: default_corpse_decay(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct TrailSettings {
    /// Spacing between consecutive marks of a trail.
    #[serde(default = "default_adjacent_distance")]
    pub adjacent_distance: f32,
}

fn default_adjacent_distance() -> f32 { default_vision_distance() / 2.0 }

impl Default for TrailSettings {
    fn default() -> Self {
        Self {
            adjacent_distance: default_adjacent_distance(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PheromoneSettings {
    #[serde(default = "default_pheromone_step")]
    pub step: f32,
    #[serde(default = "default_pheromone_deposit")]
    pub deposit: f32,
    /// Subtracted from every cell once per tick.
    #[serde(default = "default_pheromone_evaporation")]
    pub evaporation: f32,
}

fn default_pheromone_step() -> f32 { 5.0 }
fn default_pheromone_deposit() -> f32 { 10.0 }
fn default_pheromone_evaporation() -> f32 { 0.05 }

impl Default for PheromoneSettings {
    fn default() -> Self {
        Self {
            step: default_pheromone_step(),
            deposit: default_pheromone_deposit(),
            evaporation: default_pheromone_evaporation(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct FoodSourceConfig {
    pub x: f32,
    pub y: f32,
    pub amount: f32,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ColonySettings {
    /// Defaults to the world center.
    #[serde(default)]
    pub home: Option<Point>,
    #[serde(default = "default_home_storage")]
    pub home_storage: f32,
    #[serde(default = "default_scouts")]
    pub scouts: u32,
    #[serde(default = "default_workers")]
    pub workers: u32,
    #[serde(default = "default_food_sources")]
    pub food_sources: Vec<FoodSourceConfig>,
    /// Fixed seed for reproducible runs; random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_home_storage() -> f32 { 500.0 }
fn default_scouts() -> u32 { 1 }
fn default_workers() -> u32 { 4 }
fn default_food_sources() -> Vec<FoodSourceConfig> {
    vec![
        FoodSourceConfig { x: 400.0, y: 120.0, amount: 200.0 },
        FoodSourceConfig { x: 110.0, y: 380.0, amount: 150.0 },
    ]
}

impl Default for ColonySettings {
    fn default() -> Self {
        Self {
            home: None,
            home_storage: default_home_storage(),
            scouts: default_scouts(),
            workers: default_workers(),
            food_sources: default_food_sources(),
            seed: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SerializerConfig {
    #[serde(rename = "type", default)]
    pub serializer_type: SerializerType,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SenderConfig {
    #[serde(rename = "type", default)]
    pub sender_type: SenderType,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct TransportConfig {
    #[serde(default)]
    pub serializer: SerializerConfig,
    #[serde(default)]
    pub sender: SenderConfig,
    /// A frame is emitted once every this many ticks.
    #[serde(default = "default_every_ticks")]
    pub every_ticks: u32,
}

fn default_every_ticks() -> u32 { 1 }

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            serializer: SerializerConfig::default(),
            sender: SenderConfig::default(),
            every_ticks: default_every_ticks(),
        }
    }
}

// --- Top-Level Config Struct ---

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub world: WorldSettings,
    #[serde(default)]
    pub clock: ClockSettings,
    #[serde(default)]
    pub ant: AntSettings,
    #[serde(default)]
    pub trail: TrailSettings,
    #[serde(default)]
    pub pheromone: PheromoneSettings,
    #[serde(default)]
    pub colony: ColonySettings,
    #[serde(default)]
    pub transport: TransportConfig,
}

impl Config {
    /// How far a scout may extend a trail before giving up and rescanning:
    /// the distance walked on a low-mark fuel reserve.
    pub fn trail_max_distance(&self) -> f32 {
        let ant = &self.ant;
        ant.food_low / ant.food_depletion_per_minute * ant.velocity * 60.0
    }

    pub fn home_position(&self) -> Point {
        self.colony.home.unwrap_or(Point {
            x: self.world.width / 2.0,
            y: self.world.height / 2.0,
        })
    }
}

// --- Loading ---

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads a config file, picking the parser from the extension.
    pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
        let format = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => ConfigFormat::Json,
            Some("toml") => ConfigFormat::Toml,
            other => return Err(ConfigError::UnsupportedFormat(other.unwrap_or("").to_string())),
        };
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content, format)
    }

    pub fn from_str(content: &str, format: ConfigFormat) -> Result<Config, ConfigError> {
        let config: Config = match format {
            ConfigFormat::Json => serde_json::from_str(content)?,
            ConfigFormat::Toml => toml::from_str(content)?,
        };
        Self::validate(&config)?;
        Ok(config)
    }

    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let world = &config.world;
        positive("world.width", world.width)?;
        positive("world.height", world.height)?;
        positive("world.index_step", world.index_step)?;
        divides("world.index_step", world.index_step, world.width, world.height)?;
        positive("pheromone.step", config.pheromone.step)?;
        divides("pheromone.step", config.pheromone.step, world.width, world.height)?;
        non_negative("pheromone.deposit", config.pheromone.deposit)?;
        non_negative("pheromone.evaporation", config.pheromone.evaporation)?;

        if !config.clock.frequency.is_finite() || config.clock.frequency < 0.0 {
            return Err(ConfigError::Validation(format!(
                "clock.frequency must be finite and non-negative, got {}",
                config.clock.frequency
            )));
        }
        positive("clock.tick_seconds", config.clock.tick_seconds)?;

        let ant = &config.ant;
        positive("ant.velocity", ant.velocity)?;
        positive("ant.vision_distance", ant.vision_distance)?;
        positive("ant.interaction_distance", ant.interaction_distance)?;
        non_negative("ant.noise_rotation", ant.noise_rotation)?;
        positive("ant.food_max", ant.food_max)?;
        positive("ant.food_low", ant.food_low)?;
        positive("ant.initial_food", ant.initial_food)?;
        positive("ant.food_depletion_per_minute", ant.food_depletion_per_minute)?;
        positive("ant.food_consumption_per_second", ant.food_consumption_per_second)?;
        positive("ant.carry_capacity", ant.carry_capacity)?;
        positive("ant.roaming_max_distance", ant.roaming_max_distance)?;
        non_negative("ant.corpse_remains", ant.corpse_remains)?;
        positive("ant.corpse_decay_per_minute", ant.corpse_decay_per_minute)?;
        if ant.food_low >= ant.food_max {
            return Err(ConfigError::Validation(format!(
                "ant.food_low ({}) must be below ant.food_max ({})",
                ant.food_low, ant.food_max
            )));
        }
        if ant.initial_food > ant.food_max {
            return Err(ConfigError::Validation(format!(
                "ant.initial_food ({}) exceeds ant.food_max ({})",
                ant.initial_food, ant.food_max
            )));
        }
        positive("trail.adjacent_distance", config.trail.adjacent_distance)?;

        let colony = &config.colony;
        non_negative("colony.home_storage", colony.home_storage)?;
        let home = config.home_position();
        inside_world("colony.home", home.x, home.y, world)?;
        for (i, source) in colony.food_sources.iter().enumerate() {
            inside_world(&format!("colony.food_sources[{}]", i), source.x, source.y, world)?;
            non_negative(&format!("colony.food_sources[{}].amount", i), source.amount)?;
        }

        if config.transport.every_ticks == 0 {
            return Err(ConfigError::Validation(
                "transport.every_ticks cannot be zero.".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    ConfigLoader::from_file(path)
}

fn positive(name: &str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!("{} must be positive, got {}", name, value)))
    }
}

fn non_negative(name: &str, value: f32) -> Result<(), ConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!("{} must not be negative, got {}", name, value)))
    }
}

fn divides(name: &str, step: f32, width: f32, height: f32) -> Result<(), ConfigError> {
    if (width / step).fract() == 0.0 && (height / step).fract() == 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "world size {}x{} must be a multiple of {} ({})",
            width, height, name, step
        )))
    }
}

fn inside_world(name: &str, x: f32, y: f32, world: &WorldSettings) -> Result<(), ConfigError> {
    if (0.0..=world.width).contains(&x) && (0.0..=world.height).contains(&y) {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "{} at ({}, {}) is outside the {}x{} world",
            name, x, y, world.width, world.height
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn json_file(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn empty_json_uses_defaults() {
        let file = json_file("{}");
        let config = load_config(file.path()).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.world.width, 500.0);
        assert_eq!(config.world.index_step, 10.0);
        assert_eq!(config.clock.frequency, 30.0);
        assert_eq!(config.ant.vision_distance, 40.0);
        assert_eq!(config.trail.adjacent_distance, 20.0);
        assert_eq!(config.pheromone.step, 5.0);
        assert_eq!(config.colony.scouts, 1);
        assert_eq!(config.colony.workers, 4);
        assert_eq!(config.transport.serializer.serializer_type, SerializerType::Json);
        assert_eq!(config.transport.sender.sender_type, SenderType::Stdio);
    }

    #[test]
    fn load_valid_json_config() {
        let file = json_file(
            r#"{
              "world": { "width": 200.0, "height": 100.0, "index_step": 20.0 },
              "clock": { "frequency": 60.0 },
              "colony": {
                "workers": 2,
                "seed": 9,
                "food_sources": [ { "x": 20.0, "y": 30.0, "amount": 50.0 } ]
              },
              "transport": {
                "serializer": { "type": "binary" },
                "sender": { "type": "null" },
                "every_ticks": 5
              }
            }"#,
        );
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.world.width, 200.0);
        assert_eq!(config.clock.frequency, 60.0);
        assert_eq!(config.colony.workers, 2);
        assert_eq!(config.colony.seed, Some(9));
        assert_eq!(config.colony.food_sources.len(), 1);
        assert_eq!(config.home_position(), Point { x: 100.0, y: 50.0 });
        assert_eq!(config.transport.serializer.serializer_type, SerializerType::Binary);
        assert_eq!(config.transport.sender.sender_type, SenderType::Null);
        assert_eq!(config.transport.every_ticks, 5);
    }

    #[test]
    fn load_valid_toml_config() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("colony.toml");
        file.write_str(
            r#"
            [ant]
            velocity = 2.0
            carry_capacity = 15.0

            [colony]
            home = { x = 40.0, y = 60.0 }
            scouts = 3
            "#,
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();

        assert_eq!(config.ant.velocity, 2.0);
        assert_eq!(config.ant.carry_capacity, 15.0);
        assert_eq!(config.ant.food_max, 100.0);
        assert_eq!(config.colony.scouts, 3);
        assert_eq!(config.home_position(), Point { x: 40.0, y: 60.0 });
        temp.close().unwrap();
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("colony.yaml");
        file.write_str("world: {}").unwrap();
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(ext)) if ext == "yaml"));
    }

    #[test]
    fn missing_file_reports_path() {
        let temp = assert_fs::TempDir::new().unwrap();
        let missing = temp.child("missing.json");
        let result = load_config(missing.path());
        assert!(matches!(result, Err(ConfigError::Io { path, .. }) if path == missing.path()));
    }

    #[test]
    fn grid_step_must_divide_world() {
        let file = json_file(r#"{ "world": { "width": 105.0, "height": 100.0 } }"#);
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn food_low_must_be_below_max() {
        let mut config = Config::default();
        config.ant.food_low = 100.0;
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn zero_constants_are_rejected() {
        let mut config = Config::default();
        config.ant.velocity = 0.0;
        assert!(ConfigLoader::validate(&config).is_err());

        let mut config = Config::default();
        config.transport.every_ticks = 0;
        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn food_source_outside_world_is_rejected() {
        let mut config = Config::default();
        config.colony.food_sources.push(FoodSourceConfig {
            x: 501.0,
            y: 10.0,
            amount: 10.0,
        });
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let result = ConfigLoader::from_str("{ not json", ConfigFormat::Json);
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[test]
    fn trail_max_distance_follows_fuel_budget() {
        let config = Config::default();
        // 20 food at 1 per minute, walking 1 per second
        assert_eq!(config.trail_max_distance(), 1200.0);
    }
}
