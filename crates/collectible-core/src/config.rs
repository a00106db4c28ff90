//! Configuration loading and typed config structures for a collectible session.
//!
//! The canonical configuration lives in `collectible-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror the
//! YAML structure, and provides a loader that reads and validates the file.
//! Every field has a default, so an empty file is a valid configuration.

use std::path::Path;

use serde::Deserialize;

/// Environment variable that overrides `logging.level`.
pub const LOG_LEVEL_ENV: &str = "COLLECTIBLE_LOG";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is out of range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level session configuration.
///
/// Mirrors the structure of `collectible-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SessionConfig {
    /// Session-level settings (name, seed, timing).
    #[serde(default)]
    pub session: SessionSettings,

    /// Authority spawn policy parameters.
    #[serde(default)]
    pub spawn: SpawnConfig,

    /// Collectible entity configuration used by the binder.
    #[serde(default)]
    pub binder: BinderConfig,

    /// Avatar bots driven by the headless engine.
    #[serde(default)]
    pub bots: BotConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SessionConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `COLLECTIBLE_LOG` overrides `logging.level` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.logging.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.spawn.half_extent.is_finite() || self.spawn.half_extent < 0.0 {
            return Err(invalid("spawn.half_extent must be finite and non-negative"));
        }
        if !self.spawn.height.is_finite() {
            return Err(invalid("spawn.height must be finite"));
        }
        if self.spawn.anchor_name.is_empty() {
            return Err(invalid("spawn.anchor_name must not be empty"));
        }
        if self.spawn.max_live_items == 0 {
            return Err(invalid("spawn.max_live_items must be at least 1"));
        }
        for (name, value) in [
            ("binder.trigger_radius", self.binder.trigger_radius),
            ("binder.collider_radius", self.binder.collider_radius),
            ("binder.visual_scale", self.binder.visual_scale),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid {
                    reason: format!("{name} must be finite and positive"),
                });
            }
        }
        if !self.bots.speed.is_finite() || self.bots.speed < 0.0 {
            return Err(invalid("bots.speed must be finite and non-negative"));
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.to_owned(),
    }
}

/// Session-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionSettings {
    /// Human-readable session name.
    #[serde(default = "default_session_name")]
    pub name: String,

    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Real-time milliseconds per tick.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Stop after this many ticks (0 = unlimited).
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            name: default_session_name(),
            seed: default_seed(),
            tick_interval_ms: default_tick_interval_ms(),
            max_ticks: default_max_ticks(),
        }
    }
}

/// Authority spawn policy configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpawnConfig {
    /// Spawn positions are drawn from `[-half_extent, half_extent]` on both
    /// horizontal axes.
    #[serde(default = "default_half_extent")]
    pub half_extent: f32,

    /// Fixed height of every spawn position.
    #[serde(default = "default_spawn_height")]
    pub height: f32,

    /// Name of the scene object whose root becomes the spawn parent.
    #[serde(default = "default_anchor_name")]
    pub anchor_name: String,

    /// Live item cap. The policy no-ops while this many items are live.
    #[serde(default = "default_max_live_items")]
    pub max_live_items: usize,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            half_extent: default_half_extent(),
            height: default_spawn_height(),
            anchor_name: default_anchor_name(),
            max_live_items: default_max_live_items(),
        }
    }
}

/// Configuration of materialized collectible entities.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BinderConfig {
    /// Radius of the overlap trigger sphere.
    #[serde(default = "default_trigger_radius")]
    pub trigger_radius: f32,

    /// Radius of the physical collision sphere.
    #[serde(default = "default_collider_radius")]
    pub collider_radius: f32,

    /// Uniform scale of the visual mesh.
    #[serde(default = "default_visual_scale")]
    pub visual_scale: f32,

    /// Whether collectibles cast shadows.
    #[serde(default = "default_true")]
    pub cast_shadows: bool,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            trigger_radius: default_trigger_radius(),
            collider_radius: default_collider_radius(),
            visual_scale: default_visual_scale(),
            cast_shadows: true,
        }
    }
}

/// Headless avatar bot configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BotConfig {
    /// Number of non-authority participants, each with one bot avatar.
    #[serde(default = "default_bot_count")]
    pub count: u32,

    /// Distance an avatar moves per tick.
    #[serde(default = "default_bot_speed")]
    pub speed: f32,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            count: default_bot_count(),
            speed: default_bot_speed(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    /// Override the log level with `COLLECTIBLE_LOG` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(LOG_LEVEL_ENV) {
            self.level = val;
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_session_name() -> String {
    "collectible-session".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_tick_interval_ms() -> u64 {
    50
}

const fn default_max_ticks() -> u64 {
    600
}

const fn default_half_extent() -> f32 {
    10.0
}

const fn default_spawn_height() -> f32 {
    0.5
}

fn default_anchor_name() -> String {
    "collectible-anchor".to_owned()
}

const fn default_max_live_items() -> usize {
    1
}

const fn default_trigger_radius() -> f32 {
    0.5
}

const fn default_collider_radius() -> f32 {
    0.25
}

const fn default_visual_scale() -> f32 {
    1.0
}

const fn default_bot_count() -> u32 {
    3
}

const fn default_bot_speed() -> f32 {
    0.75
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}
